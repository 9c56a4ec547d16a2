use markers::{Key, Pattern, Transcript, parse_path};

use crate::error::ResolveError;
use crate::options::ResolverOptions;
use crate::resolve::resolve;
use crate::target::{Anchor, Target, TargetKind};

/// The three ways a literate document consumes a resolved target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerKind {
    /// A link to a transcript position.
    Reference,
    /// Literal text spliced into prose.
    Quotation,
    /// A pass/fail check on the transcript.
    Assertion,
}

impl ConsumerKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ConsumerKind::Reference => "reference",
            ConsumerKind::Quotation => "quotation",
            ConsumerKind::Assertion => "assertion",
        }
    }
}

/// A resolved cross-reference.
#[derive(Debug, Clone, PartialEq)]
pub struct Reference {
    pub anchor: Anchor,
    pub title: Option<String>,
    pub target: Target,
}

/// Split `label <.path>` into its label and path. Plain paths come back
/// unchanged with no label.
pub fn split_title(raw: &str) -> (Option<&str>, &str) {
    let trimmed = raw.trim();
    let Some(inner) = trimmed.strip_suffix('>') else {
        return (None, trimmed);
    };
    match inner.find("<.") {
        Some(open) => (Some(inner[..open].trim()), &inner[open + 1..]),
        None => (None, trimmed),
    }
}

/// Check a resolved target against what `kind` is willing to accept.
pub fn apply_policy(kind: ConsumerKind, target: &Target, fragment: &str) -> Result<(), ResolveError> {
    match kind {
        ConsumerKind::Reference => Ok(()),
        ConsumerKind::Quotation => {
            let whole_node = matches!(target.origin, Key::Sentence | Key::Goal | Key::Block);
            if target.kind == TargetKind::Structural && whole_node {
                return Err(ResolveError::policy(
                    format!("Cannot quote a full {} inline", target.origin.noun()),
                    fragment,
                ));
            }
            require_text(target, fragment).map(|_| ())
        }
        ConsumerKind::Assertion => require_text(target, fragment).map(|_| ()),
    }
}

fn require_text<'t>(target: &'t Target, fragment: &str) -> Result<&'t str, ResolveError> {
    target.text().ok_or_else(|| ResolveError::NullTarget {
        fragment: fragment.to_string(),
    })
}

fn reject_title(raw: &str, kind: ConsumerKind) -> Result<&str, ResolveError> {
    match split_title(raw) {
        (None, path) => Ok(path),
        (Some(_), _) => Err(ResolveError::policy(
            format!("Title syntax `label <path>` is not allowed in a {}", kind.as_str()),
            raw.trim(),
        )),
    }
}

/// Resolve a path for use as a link.
pub fn reference(
    transcript: &Transcript,
    raw: &str,
    allow_title: bool,
    options: &ResolverOptions,
) -> Result<Reference, ResolveError> {
    let (title, raw_path) = if allow_title {
        split_title(raw)
    } else {
        (None, reject_title(raw, ConsumerKind::Reference)?)
    };
    let path = parse_path(raw_path)?;
    let target = resolve(transcript, &path, options)?;
    apply_policy(ConsumerKind::Reference, &target, &path.raw)?;
    Ok(Reference {
        anchor: target.anchor,
        title: title.filter(|t| !t.is_empty()).map(str::to_string),
        target,
    })
}

/// Resolve a path to the literal text to splice into prose.
pub fn quote(
    transcript: &Transcript,
    raw: &str,
    options: &ResolverOptions,
) -> Result<String, ResolveError> {
    let path = parse_path(reject_title(raw, ConsumerKind::Quotation)?)?;
    let target = resolve(transcript, &path, options)?;
    let fragment = path.last().map_or(path.raw.as_str(), |c| path.fragment(c));
    apply_policy(ConsumerKind::Quotation, &target, fragment)?;
    Ok(require_text(&target, fragment)?.to_string())
}

/// Resolve a path and, if given, check its text against `expected`.
pub fn assert_path(
    transcript: &Transcript,
    raw: &str,
    expected: Option<&Pattern>,
    options: &ResolverOptions,
) -> Result<Target, ResolveError> {
    let path = parse_path(reject_title(raw, ConsumerKind::Assertion)?)?;
    let target = resolve(transcript, &path, options)?;
    let fragment = path.last().map_or(path.raw.as_str(), |c| path.fragment(c));
    apply_policy(ConsumerKind::Assertion, &target, fragment)?;
    if let Some(expected) = expected {
        let actual = require_text(&target, fragment)?;
        if !expected.matches(actual) {
            return Err(ResolveError::Mismatch {
                expected: expected.to_string(),
                actual: actual.to_string(),
                fragment: path.raw.clone(),
            });
        }
    }
    Ok(target)
}
