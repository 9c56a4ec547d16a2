use std::fmt;

use regex::Regex;

use crate::path::SelectorForm;

/// A textual search pattern, written `(…)` or `{…}` in a path.
#[derive(Debug, Clone)]
pub enum Pattern {
    /// Case-sensitive containment.
    Substring(String),
    /// `*` matches any run of characters; anchored at both ends. `\*` and
    /// `\\` stand for a literal star and backslash.
    Wildcard(Wildcard),
}

#[derive(Debug, Clone)]
pub struct Wildcard {
    source: String,
    regex: Option<Regex>,
}

/// The literal runs between unescaped stars.
fn literal_runs(source: &str) -> Vec<String> {
    let mut runs = Vec::new();
    let mut run = String::new();
    let mut chars = source.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' if matches!(chars.peek(), Some('*' | '\\')) => run.extend(chars.next()),
            '*' => runs.push(std::mem::take(&mut run)),
            c => run.push(c),
        }
    }
    runs.push(run);
    runs
}

impl Wildcard {
    pub fn new(source: impl Into<String>) -> Self {
        let source = source.into();
        let body: Vec<String> = literal_runs(&source)
            .iter()
            .map(|run| regex::escape(run))
            .collect();
        let regex = Regex::new(&format!("(?s)^{}$", body.join(".*"))).ok();
        Wildcard { source, regex }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    fn matches(&self, text: &str) -> bool {
        self.regex.as_ref().is_some_and(|re| re.is_match(text))
    }
}

impl Pattern {
    pub fn substring(text: impl Into<String>) -> Self {
        Pattern::Substring(text.into())
    }

    pub fn wildcard(text: impl Into<String>) -> Self {
        Pattern::Wildcard(Wildcard::new(text))
    }

    /// Parse an expected value as written in an assertion: `{…}` is a
    /// wildcard, anything else is a plain substring.
    pub fn from_expected(text: &str) -> Self {
        let text = text.trim();
        match text.strip_prefix('{').and_then(|t| t.strip_suffix('}')) {
            Some(inner) => Pattern::wildcard(inner),
            None => Pattern::substring(text),
        }
    }

    pub fn matches(&self, text: &str) -> bool {
        match self {
            Pattern::Substring(needle) => text.contains(needle.as_str()),
            Pattern::Wildcard(wildcard) => wildcard.matches(text),
        }
    }

    pub fn source(&self) -> &str {
        match self {
            Pattern::Substring(s) => s,
            Pattern::Wildcard(w) => w.source(),
        }
    }

    /// The literal part of the pattern: what error messages quote.
    pub fn search_text(&self) -> String {
        match self {
            Pattern::Substring(s) => s.clone(),
            Pattern::Wildcard(w) => literal_runs(w.source()).concat(),
        }
    }

    pub fn form(&self) -> SelectorForm {
        match self {
            Pattern::Substring(_) => SelectorForm::Substring,
            Pattern::Wildcard(_) => SelectorForm::Wildcard,
        }
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Pattern::Substring(a), Pattern::Substring(b)) => a == b,
            (Pattern::Wildcard(a), Pattern::Wildcard(b)) => a.source == b.source,
            _ => false,
        }
    }
}

/// Renders the pattern back in path syntax, escaping its delimiters.
impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (open, close) = match self {
            Pattern::Substring(_) => ('(', ')'),
            Pattern::Wildcard(_) => ('{', '}'),
        };
        write!(f, "{}", open)?;
        // A wildcard source already carries its backslash escapes.
        let escape_backslash = matches!(self, Pattern::Substring(_));
        for c in self.source().chars() {
            if c == open || c == close || (c == '\\' && escape_backslash) {
                write!(f, "\\")?;
            }
            write!(f, "{}", c)?;
        }
        write!(f, "{}", close)
    }
}
