//! Visibility flags attached to code-block directives, e.g. `none .s(Lemma).in unfold`.

use crate::ErrorKind;
use crate::parser::{ParseError, parse_path};
use crate::path::{Key, Path, Selector};
use crate::transcript::{Block, Sentence, Visibility};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    Input,
    Output,
    Unfold,
    Goals,
    Messages,
    Hyps,
    Ccls,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagKeyword {
    All,
    None,
    /// Queries and display use the goals from before execution.
    Before,
    Set(Toggle, bool),
}

impl FlagKeyword {
    pub fn from_token(token: &str) -> Option<FlagKeyword> {
        let (name, value) = match token.strip_prefix("no-") {
            Some(rest) => (rest, false),
            None => (token, true),
        };
        let toggle = match name {
            "all" if value => return Some(FlagKeyword::All),
            "none" if value => return Some(FlagKeyword::None),
            "before" if value => return Some(FlagKeyword::Before),
            "fold" if value => return Some(FlagKeyword::Set(Toggle::Unfold, false)),
            "in" => Toggle::Input,
            "out" => Toggle::Output,
            "unfold" => Toggle::Unfold,
            "goals" => Toggle::Goals,
            "messages" => Toggle::Messages,
            "hyps" => Toggle::Hyps,
            "ccls" => Toggle::Ccls,
            _ => return None,
        };
        Some(FlagKeyword::Set(toggle, value))
    }

    fn apply(self, visibility: &mut Visibility) {
        match self {
            FlagKeyword::All => {
                *visibility = Visibility {
                    unfold: visibility.unfold,
                    goals_before: visibility.goals_before,
                    ..Visibility::default()
                };
            }
            FlagKeyword::None => {
                *visibility = Visibility {
                    goals_before: visibility.goals_before,
                    ..Visibility::hidden()
                };
            }
            FlagKeyword::Before => visibility.goals_before = true,
            FlagKeyword::Set(toggle, value) => {
                let field = match toggle {
                    Toggle::Input => &mut visibility.input,
                    Toggle::Output => &mut visibility.output,
                    Toggle::Unfold => &mut visibility.unfold,
                    Toggle::Goals => &mut visibility.goals,
                    Toggle::Messages => &mut visibility.messages,
                    Toggle::Hyps => &mut visibility.hyps,
                    Toggle::Ccls => &mut visibility.ccls,
                };
                *field = value;
            }
        }
    }
}

/// One flag, optionally restricted to the blocks/sentences a selector picks.
#[derive(Debug, Clone, PartialEq)]
pub struct FlagEntry {
    pub raw: String,
    pub scope: Option<Path>,
    pub keyword: FlagKeyword,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlagList {
    pub entries: Vec<FlagEntry>,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FlagError {
    #[error("Unrecognized directive flags: {}", .0.join(", "))]
    Unrecognized(Vec<String>),

    #[error("`{fragment}` is not supported in visibility annotations (in `{token}`)")]
    Unsupported { token: String, fragment: String },

    #[error("Missing flag after `{0}`")]
    MissingFlag(String),

    #[error(transparent)]
    Path(#[from] ParseError),

    #[error("Cannot show output of '{input}' without `.in` or `.unfold`")]
    HiddenOutput { input: String },
}

impl FlagError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FlagError::Unrecognized(_) | FlagError::MissingFlag(_) => ErrorKind::SyntaxError,
            FlagError::Unsupported { .. } | FlagError::HiddenOutput { .. } => {
                ErrorKind::PolicyViolation
            }
            FlagError::Path(err) => err.kind,
        }
    }

    /// The offending part of the flag list, verbatim.
    pub fn fragment(&self) -> String {
        match self {
            FlagError::Unrecognized(tokens) => tokens.join(" "),
            FlagError::Unsupported { fragment, .. } => fragment.clone(),
            FlagError::MissingFlag(token) => token.clone(),
            FlagError::Path(err) => err.fragment.clone(),
            FlagError::HiddenOutput { input } => input.clone(),
        }
    }
}

/// Split a flag list on whitespace that is not inside `(…)` or `{…}`.
fn split_tokens(raw: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut depth = 0i32;
    let mut start: Option<usize> = None;
    let mut escaped = false;

    for (i, c) in raw.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '(' | '{' => depth += 1,
            ')' | '}' => depth -= 1,
            c if c.is_whitespace() && depth <= 0 => {
                if let Some(s) = start.take() {
                    tokens.push(&raw[s..i]);
                }
                continue;
            }
            _ => {}
        }
        if start.is_none() {
            start = Some(i);
        }
    }
    if let Some(s) = start {
        tokens.push(&raw[s..]);
    }
    tokens
}

/// Byte index of the last `.` outside any brackets.
fn last_top_level_dot(token: &str) -> Option<usize> {
    let mut depth = 0i32;
    let mut escaped = false;
    let mut last = None;
    for (i, c) in token.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '(' | '{' => depth += 1,
            ')' | '}' => depth -= 1,
            '.' if depth == 0 => last = Some(i),
            _ => {}
        }
    }
    last
}

fn first_word(token: &str) -> &str {
    let rest = token.trim_start_matches('.');
    let end = rest
        .find(|c: char| !(c.is_alphanumeric() || c == '_'))
        .unwrap_or(rest.len());
    &rest[..end]
}

/// Reject any component other than `.io` and `.s`.
fn check_scope(token: &str, path: &Path) -> Result<(), FlagError> {
    match path
        .components
        .iter()
        .find(|c| !matches!(c.key, Key::Block | Key::Sentence))
    {
        Some(component) => Err(FlagError::Unsupported {
            token: token.to_string(),
            fragment: path.fragment(component).to_string(),
        }),
        None => Ok(()),
    }
}

fn parse_dotted(token: &str) -> Result<FlagEntry, FlagError> {
    if let Some(dot) = last_top_level_dot(token) {
        if let Some(keyword) = FlagKeyword::from_token(&token[dot + 1..]) {
            let scope = if dot == 0 {
                None
            } else {
                let path = parse_path(&token[..dot])?;
                check_scope(token, &path)?;
                Some(path)
            };
            return Ok(FlagEntry {
                raw: token.to_string(),
                scope,
                keyword,
            });
        }
    }

    // No trailing flag: diagnose the token as a plain path.
    let path = parse_path(token)?;
    check_scope(token, &path)?;
    Err(FlagError::MissingFlag(token.to_string()))
}

/// Parse a directive's flag list.
///
/// Unknown bare words and dotted tokens that do not start with a path
/// component are collected and reported together.
pub fn parse_flags(raw: &str) -> Result<FlagList, FlagError> {
    let mut entries = Vec::new();
    let mut unrecognized = Vec::new();

    for token in split_tokens(raw) {
        if token.starts_with('.') {
            let word = first_word(token);
            if Key::from_token(word).is_none() && FlagKeyword::from_token(word).is_none() {
                unrecognized.push(token.to_string());
                continue;
            }
            entries.push(parse_dotted(token)?);
        } else if let Some(keyword) = FlagKeyword::from_token(token) {
            entries.push(FlagEntry {
                raw: token.to_string(),
                scope: None,
                keyword,
            });
        } else {
            unrecognized.push(token.to_string());
        }
    }

    if !unrecognized.is_empty() {
        return Err(FlagError::Unrecognized(unrecognized));
    }
    Ok(FlagList { entries })
}

fn selector_matches(selector: &Selector, index: usize, name: Option<&str>, text: &str) -> bool {
    match selector {
        Selector::None => true,
        Selector::Index(i) => *i == index,
        Selector::Name(n) => name == Some(n.as_str()),
        Selector::Pattern(pattern) => pattern.matches(text),
    }
}

fn scope_matches(
    scope: &Path,
    block_index: usize,
    block: &Block,
    sentence_index: usize,
    sentence: &Sentence,
) -> bool {
    scope.components.iter().all(|component| match component.key {
        Key::Block => selector_matches(
            &component.selector,
            block_index,
            block.name.as_deref(),
            &block.input_text(),
        ),
        Key::Sentence => {
            selector_matches(&component.selector, sentence_index, None, &sentence.input)
        }
        _ => false,
    })
}

/// Set the visibility of every sentence of `block` from `flags`, left to
/// right, then check that no sentence shows output it has no way to reveal.
pub fn apply_flags(
    block_index: usize,
    block: &mut Block,
    flags: &FlagList,
) -> Result<(), Vec<FlagError>> {
    let mut errors = Vec::new();
    let snapshot = block.clone();

    for (sentence_index, sentence) in block.sentences.iter_mut().enumerate() {
        let mut visibility = Visibility::default();
        for entry in &flags.entries {
            let applies = match &entry.scope {
                None => true,
                Some(scope) => {
                    scope_matches(scope, block_index, &snapshot, sentence_index, sentence)
                }
            };
            if applies {
                entry.keyword.apply(&mut visibility);
            }
        }
        sentence.visibility = visibility;

        if sentence.has_outputs() && visibility.output && !visibility.input && !visibility.unfold
        {
            errors.push(FlagError::HiddenOutput {
                input: sentence.input.clone(),
            });
        }
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}
