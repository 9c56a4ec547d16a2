use markers::path::PathComponent;
use markers::transcript::{Block, Sentence};
use markers::{Key, LeafKey, Path, Selector, Transcript, parse_path};
use tracing::debug;

use crate::error::ResolveError;
use crate::options::{MultiMatch, ResolverOptions};
use crate::scope::{Scope, Searchable};
use crate::target::{Anchor, Target, TargetKind};

/// Parse `raw` and resolve it against `transcript`.
pub fn resolve_str(
    transcript: &Transcript,
    raw: &str,
    options: &ResolverOptions,
) -> Result<Target, ResolveError> {
    let path = parse_path(raw)?;
    resolve(transcript, &path, options)
}

/// Resolve a parsed path to exactly one target, or explain why not.
///
/// Resolution only reads the transcript, so the same inputs always produce
/// the same result.
pub fn resolve(
    transcript: &Transcript,
    path: &Path,
    options: &ResolverOptions,
) -> Result<Target, ResolveError> {
    let _span = tracing::debug_span!("resolve", path = %path.raw).entered();

    check_anchors(path)?;

    let scope = path
        .components
        .iter()
        .try_fold(Scope::Transcript, |scope, component| {
            let next = step(transcript, path, scope, component, options)?;
            debug!(
                component = path.fragment(component),
                scope = next.describe(),
                candidates = next.candidate_count(),
                "step"
            );
            Ok::<_, ResolveError>(next)
        })?;

    finish(path, scope, options)
}

/// Goals, hypotheses and messages only exist relative to a sentence.
fn check_anchors(path: &Path) -> Result<(), ResolveError> {
    let mut anchored = false;
    for component in &path.components {
        match component.key {
            Key::Sentence => anchored = true,
            Key::Goal | Key::Hypothesis | Key::Message if !anchored => {
                return Err(ResolveError::MissingAnchor {
                    fragment: path.fragment(component).to_string(),
                });
            }
            _ => {}
        }
    }
    Ok(())
}

fn step<'a>(
    transcript: &'a Transcript,
    path: &'a Path,
    scope: Scope<'a>,
    component: &'a PathComponent,
    options: &ResolverOptions,
) -> Result<Scope<'a>, ResolveError> {
    match (component.key, scope) {
        (Key::Block, Scope::Transcript) => select_blocks(transcript, path, component),

        (Key::Sentence, Scope::Transcript) => {
            let candidates: Vec<(usize, &Block)> = transcript.blocks.iter().enumerate().collect();
            select_sentence(&candidates, path, component, options)
        }
        (Key::Sentence, Scope::Blocks { candidates, .. }) => {
            select_sentence(&candidates, path, component, options)
        }

        (Key::Goal, Scope::Sentence { anchor, sentence }) => {
            let (index, goal) = pick(
                matching(sentence.active_goals(), &component.selector),
                path,
                component,
                options,
                Some(sentence.input.as_str()),
            )?;
            Ok(Scope::Goal {
                anchor: anchor.goal(index),
                sentence,
                goal,
            })
        }

        (Key::Hypothesis, Scope::Sentence { anchor, sentence }) => {
            let goal = sentence.active_goals().first().ok_or_else(|| ResolveError::NoMatch {
                noun: Key::Goal.noun(),
                searched: "0".to_string(),
                fragment: path.fragment(component).to_string(),
                context: Some(sentence.input.clone()),
            })?;
            let (index, hypothesis) = pick(
                matching(&goal.hypotheses, &component.selector),
                path,
                component,
                options,
                Some(sentence.input.as_str()),
            )?;
            Ok(Scope::Hypothesis {
                anchor: anchor.goal(0).hypothesis(index),
                hypothesis,
            })
        }
        (
            Key::Hypothesis,
            Scope::Goal {
                anchor,
                sentence,
                goal,
            },
        ) => {
            let (index, hypothesis) = pick(
                matching(&goal.hypotheses, &component.selector),
                path,
                component,
                options,
                Some(sentence.input.as_str()),
            )?;
            Ok(Scope::Hypothesis {
                anchor: anchor.hypothesis(index),
                hypothesis,
            })
        }

        (Key::Message, Scope::Sentence { anchor, sentence }) => {
            let (index, message) = pick(
                matching(&sentence.messages, &component.selector),
                path,
                component,
                options,
                Some(sentence.input.as_str()),
            )?;
            Ok(Scope::Message {
                anchor: anchor.message(index),
                message,
            })
        }

        (Key::Leaf(leaf), scope) => {
            project(path, scope, leaf, component, options).map(Scope::Leaf)
        }

        (key, scope) => Err(ResolveError::mismatch(
            format!(
                "Incompatible components: a {} cannot be selected from {}",
                key.noun(),
                scope.describe()
            ),
            path.fragment(component),
        )),
    }
}

fn select_blocks<'a>(
    transcript: &'a Transcript,
    path: &Path,
    component: &'a PathComponent,
) -> Result<Scope<'a>, ResolveError> {
    let candidates = matching(&transcript.blocks, &component.selector);
    if candidates.is_empty() {
        return Err(no_match(path, component, None));
    }
    // Every match is kept, under either policy: a later `.s` may narrow them.
    Ok(Scope::Blocks {
        candidates,
        by: component,
    })
}

fn select_sentence<'a>(
    candidates: &[(usize, &'a Block)],
    path: &Path,
    component: &PathComponent,
    options: &ResolverOptions,
) -> Result<Scope<'a>, ResolveError> {
    let mut per_block: Vec<(usize, Vec<(usize, &'a Sentence)>)> = candidates
        .iter()
        .map(|&(index, block)| (index, matching(&block.sentences, &component.selector)))
        .filter(|(_, found)| !found.is_empty())
        .collect();

    if per_block.len() > 1 && options.multi_match == MultiMatch::Ambiguous {
        return Err(ResolveError::Ambiguous {
            noun: Key::Sentence.noun(),
            searched: component.selector.searched(),
            candidates: per_block.len(),
            across_blocks: true,
            fragment: path.fragment(component).to_string(),
        });
    }

    if per_block.is_empty() {
        return Err(no_match(path, component, None));
    }
    let (block, found) = per_block.swap_remove(0);
    let (index, sentence) = pick(found, path, component, options, None)?;
    Ok(Scope::Sentence {
        anchor: Anchor::block(block).sentence(index),
        sentence,
    })
}

/// All items the selector accepts, with their positions.
fn matching<'a, T: Searchable>(items: &'a [T], selector: &Selector) -> Vec<(usize, &'a T)> {
    match selector {
        Selector::None => items.iter().enumerate().collect(),
        Selector::Index(index) => items.get(*index).map(|item| (*index, item)).into_iter().collect(),
        Selector::Name(name) => items
            .iter()
            .enumerate()
            .filter(|(_, item)| item.is_named(name))
            .collect(),
        Selector::Pattern(pattern) => items
            .iter()
            .enumerate()
            .filter(|(_, item)| pattern.matches(&item.search_text()))
            .collect(),
    }
}

/// Settle on one candidate according to the multi-match policy.
fn pick<'a, T>(
    found: Vec<(usize, &'a T)>,
    path: &Path,
    component: &PathComponent,
    options: &ResolverOptions,
    context: Option<&str>,
) -> Result<(usize, &'a T), ResolveError> {
    let count = found.len();
    let first = found
        .into_iter()
        .next()
        .ok_or_else(|| no_match(path, component, context))?;
    if count > 1 && options.multi_match == MultiMatch::Ambiguous {
        return Err(ResolveError::Ambiguous {
            noun: component.key.noun(),
            searched: component.selector.searched(),
            candidates: count,
            across_blocks: false,
            fragment: path.fragment(component).to_string(),
        });
    }
    Ok(first)
}

fn no_match(path: &Path, component: &PathComponent, context: Option<&str>) -> ResolveError {
    let fragment = path.fragment(component).to_string();
    match &component.selector {
        Selector::Name(name) => ResolveError::UnknownReference {
            noun: component.key.noun(),
            name: name.clone(),
            fragment,
        },
        selector => ResolveError::NoMatch {
            noun: component.key.noun(),
            searched: selector.searched(),
            fragment,
            context: context.map(str::to_string),
        },
    }
}

/// Project a node onto one of its text fields.
fn project(
    path: &Path,
    scope: Scope<'_>,
    leaf: LeafKey,
    component: &PathComponent,
    options: &ResolverOptions,
) -> Result<Target, ResolveError> {
    let (text, origin, anchor) = match (&scope, leaf) {
        (Scope::Blocks { candidates, by }, LeafKey::Input | LeafKey::Name) => {
            let (index, block) = single_block(path, candidates, by, options)?;
            let text = match leaf {
                LeafKey::Input => Some(block.input_text()),
                _ => block.name.clone(),
            };
            (text, Key::Block, Anchor::block(index))
        }
        (Scope::Sentence { anchor, sentence }, LeafKey::Input) => {
            (Some(sentence.input.clone()), Key::Sentence, *anchor)
        }
        (Scope::Sentence { anchor, sentence }, LeafKey::Output) => {
            (Some(sentence.outputs_text()), Key::Sentence, *anchor)
        }
        (Scope::Goal { anchor, goal, .. }, LeafKey::Conclusion) => {
            (Some(goal.conclusion.clone()), Key::Goal, *anchor)
        }
        (Scope::Goal { anchor, goal, .. }, LeafKey::Name) => {
            (goal.name.clone(), Key::Goal, *anchor)
        }
        (Scope::Hypothesis { anchor, hypothesis }, LeafKey::Body) => {
            (hypothesis.body.clone(), Key::Hypothesis, *anchor)
        }
        (Scope::Hypothesis { anchor, hypothesis }, LeafKey::Name) => {
            (Some(hypothesis.names_text()), Key::Hypothesis, *anchor)
        }
        (Scope::Hypothesis { anchor, hypothesis }, LeafKey::Type) => {
            (Some(hypothesis.ty.clone()), Key::Hypothesis, *anchor)
        }
        (Scope::Message { anchor, message }, LeafKey::Body) => {
            (Some(message.contents.clone()), Key::Message, *anchor)
        }
        (scope, _) => {
            return Err(ResolveError::mismatch(
                format!(
                    "`.{}` is not defined on {}",
                    component.key.token(),
                    scope.describe()
                ),
                path.fragment(component),
            ));
        }
    };
    Ok(Target {
        text,
        kind: TargetKind::Leaf,
        origin,
        field: Some(leaf),
        anchor,
    })
}

/// The one block a path ends on. Several surviving candidates are
/// ambiguous unless the policy takes the first.
fn single_block<'a>(
    path: &Path,
    candidates: &[(usize, &'a Block)],
    by: &PathComponent,
    options: &ResolverOptions,
) -> Result<(usize, &'a Block), ResolveError> {
    match candidates {
        [only] => Ok(*only),
        [first, ..] if options.multi_match == MultiMatch::First => Ok(*first),
        _ => Err(ResolveError::Ambiguous {
            noun: Key::Block.noun(),
            searched: by.selector.searched(),
            candidates: candidates.len(),
            across_blocks: false,
            fragment: path.fragment(by).to_string(),
        }),
    }
}

fn finish(path: &Path, scope: Scope<'_>, options: &ResolverOptions) -> Result<Target, ResolveError> {
    match scope {
        Scope::Leaf(target) => Ok(target),
        Scope::Blocks { candidates, by } => {
            let (index, block) = single_block(path, &candidates, by, options)?;
            Ok(Target {
                text: Some(block.input_text()),
                kind: TargetKind::Structural,
                origin: Key::Block,
                field: None,
                anchor: Anchor::block(index),
            })
        }
        scope => scope
            .structural()
            .ok_or_else(|| ResolveError::mismatch("Empty path", path.raw.as_str())),
    }
}
