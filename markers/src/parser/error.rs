use std::ops::Range;

use codespan_reporting::diagnostic::{Diagnostic, Label, Severity};

use crate::ErrorKind;

/// A path that could not be parsed, with the offending sub-expression.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct ParseError {
    pub kind: ErrorKind,
    pub message: String,
    /// The offending sub-expression, verbatim.
    pub fragment: String,
    /// Byte span of `fragment` within the raw path.
    pub span: Range<usize>,
    pub notes: Vec<String>,
}

impl ParseError {
    pub fn syntax(message: impl Into<String>, raw: &str, span: Range<usize>) -> Self {
        Self::new(ErrorKind::SyntaxError, message, raw, span)
    }

    pub fn mismatch(message: impl Into<String>, raw: &str, span: Range<usize>) -> Self {
        Self::new(ErrorKind::ComponentMismatch, message, raw, span)
    }

    pub fn new(
        kind: ErrorKind,
        message: impl Into<String>,
        raw: &str,
        span: Range<usize>,
    ) -> Self {
        ParseError {
            kind,
            message: message.into(),
            fragment: raw.get(span.clone()).unwrap_or(raw).to_string(),
            span,
            notes: Vec::new(),
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Convert to a codespan-reporting Diagnostic. `offset` is the byte
    /// position of the raw path inside file `file_id`.
    pub fn to_diagnostic(&self, file_id: usize, offset: usize) -> Diagnostic<usize> {
        let span = offset + self.span.start..offset + self.span.end;
        Diagnostic::new(Severity::Error)
            .with_message(&self.message)
            .with_code(self.kind.as_str())
            .with_labels(vec![Label::primary(file_id, span)])
            .with_notes(self.notes.clone())
    }
}
