use std::fmt;
use std::ops::Range;

use markers::ErrorKind;
use markers::flags::FlagError;
use markers::parser::ParseError;

/// Why a path could not be resolved or was rejected by its consumer.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ResolveError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("Missing `.s(…)` sentence component in path")]
    MissingAnchor { fragment: String },

    #[error("No {noun} matches '{searched}'")]
    NoMatch {
        noun: &'static str,
        searched: String,
        fragment: String,
        /// Input of the nearest enclosing sentence, when there is one.
        context: Option<String>,
    },

    #[error("No match: expected '{expected}', got '{actual}'")]
    Mismatch {
        expected: String,
        actual: String,
        fragment: String,
    },

    #[error("{}", ambiguity(.noun, .searched, .candidates, .across_blocks))]
    Ambiguous {
        noun: &'static str,
        searched: String,
        candidates: usize,
        /// The candidates live in different blocks.
        across_blocks: bool,
        fragment: String,
    },

    #[error("Unknown {noun} '{name}'")]
    UnknownReference {
        noun: &'static str,
        name: String,
        fragment: String,
    },

    #[error("{message}")]
    ComponentMismatch { message: String, fragment: String },

    #[error("Target is null")]
    NullTarget { fragment: String },

    #[error("{message}")]
    PolicyViolation { message: String, fragment: String },

    #[error(transparent)]
    Flags(#[from] FlagError),
}

fn ambiguity(noun: &str, searched: &str, candidates: &usize, across_blocks: &bool) -> String {
    if *across_blocks {
        format!(
            "Ambiguous {} '{}': matches in {} blocks; add a `.io` block selector",
            noun, searched, candidates
        )
    } else {
        format!("Ambiguous {} '{}': {} candidates match", noun, searched, candidates)
    }
}

impl ResolveError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ResolveError::Parse(err) => err.kind,
            ResolveError::MissingAnchor { .. } => ErrorKind::MissingAnchor,
            ResolveError::NoMatch { .. } | ResolveError::Mismatch { .. } => ErrorKind::NoMatch,
            ResolveError::Ambiguous { .. } => ErrorKind::Ambiguous,
            ResolveError::UnknownReference { .. } => ErrorKind::UnknownReference,
            ResolveError::ComponentMismatch { .. } => ErrorKind::ComponentMismatch,
            ResolveError::NullTarget { .. } => ErrorKind::NullTarget,
            ResolveError::PolicyViolation { .. } => ErrorKind::PolicyViolation,
            ResolveError::Flags(err) => err.kind(),
        }
    }

    /// The offending sub-expression, verbatim.
    pub fn fragment(&self) -> String {
        match self {
            ResolveError::Parse(err) => err.fragment.clone(),
            ResolveError::Flags(err) => err.fragment(),
            ResolveError::MissingAnchor { fragment }
            | ResolveError::NoMatch { fragment, .. }
            | ResolveError::Mismatch { fragment, .. }
            | ResolveError::Ambiguous { fragment, .. }
            | ResolveError::UnknownReference { fragment, .. }
            | ResolveError::ComponentMismatch { fragment, .. }
            | ResolveError::NullTarget { fragment }
            | ResolveError::PolicyViolation { fragment, .. } => fragment.clone(),
        }
    }

    /// Extra text that helps locate the failure, such as the searched sentence.
    pub fn context(&self) -> Option<&str> {
        match self {
            ResolveError::NoMatch { context, .. } => context.as_deref(),
            _ => None,
        }
    }

    pub(crate) fn policy(message: impl Into<String>, fragment: impl Into<String>) -> Self {
        ResolveError::PolicyViolation {
            message: message.into(),
            fragment: fragment.into(),
        }
    }

    pub(crate) fn mismatch(message: impl Into<String>, fragment: impl Into<String>) -> Self {
        ResolveError::ComponentMismatch {
            message: message.into(),
            fragment: fragment.into(),
        }
    }
}

/// A resolution error tied to the place in a literate document that caused it.
#[derive(Debug, Clone)]
pub struct DiagnosticError {
    pub error: ResolveError,
    pub span: Option<Range<usize>>,
    pub source_id: usize,
}

impl DiagnosticError {
    pub fn new(error: ResolveError, span: Range<usize>, source_id: usize) -> Self {
        DiagnosticError {
            error,
            span: Some(span),
            source_id,
        }
    }
}

impl From<ResolveError> for DiagnosticError {
    fn from(error: ResolveError) -> Self {
        DiagnosticError {
            error,
            span: None,
            source_id: 0,
        }
    }
}

impl fmt::Display for DiagnosticError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.error.fmt(f)
    }
}

impl std::error::Error for DiagnosticError {}
