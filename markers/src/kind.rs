use std::fmt;

/// Category tag carried by every parse, resolution, and policy error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The path or a selector cannot be parsed, or uses a form its key does not support.
    SyntaxError,
    /// A goal, hypothesis, or message component has no sentence to hang off.
    MissingAnchor,
    /// A selector matched nothing.
    NoMatch,
    /// A selector matched more than one candidate where one is required.
    Ambiguous,
    /// A named lookup failed because no such name exists.
    UnknownReference,
    /// A component was applied to a node that does not carry it.
    ComponentMismatch,
    /// Resolution reached a node whose value is legitimately absent.
    NullTarget,
    /// A grammatically valid query rejected by the consumer's rules.
    PolicyViolation,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::SyntaxError => "syntax-error",
            ErrorKind::MissingAnchor => "missing-anchor",
            ErrorKind::NoMatch => "no-match",
            ErrorKind::Ambiguous => "ambiguous",
            ErrorKind::UnknownReference => "unknown-reference",
            ErrorKind::ComponentMismatch => "component-mismatch",
            ErrorKind::NullTarget => "null-target",
            ErrorKind::PolicyViolation => "policy-violation",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
