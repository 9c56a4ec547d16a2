use std::fmt;
use std::ops::Range;

use crate::pattern::Pattern;

/// The kind of node (or scalar field) a path component addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Block,
    Sentence,
    Goal,
    Hypothesis,
    Message,
    Leaf(LeafKey),
}

/// Terminal projections of a node onto one of its text fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LeafKey {
    Input,
    Output,
    Conclusion,
    Body,
    Name,
    Type,
}

/// The syntactic shape of a selector, used by the per-key legality table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectorForm {
    Index,
    Name,
    Substring,
    Wildcard,
}

/// Which selector forms each structural key accepts. Leaf keys accept none.
static SELECTOR_TABLE: &[(Key, &[SelectorForm])] = &[
    (
        Key::Block,
        &[SelectorForm::Index, SelectorForm::Name, SelectorForm::Substring],
    ),
    (
        Key::Sentence,
        &[SelectorForm::Index, SelectorForm::Substring, SelectorForm::Wildcard],
    ),
    (
        Key::Goal,
        &[
            SelectorForm::Index,
            SelectorForm::Name,
            SelectorForm::Substring,
            SelectorForm::Wildcard,
        ],
    ),
    (
        Key::Hypothesis,
        &[
            SelectorForm::Index,
            SelectorForm::Name,
            SelectorForm::Substring,
            SelectorForm::Wildcard,
        ],
    ),
    (
        Key::Message,
        &[SelectorForm::Index, SelectorForm::Substring, SelectorForm::Wildcard],
    ),
];

impl Key {
    pub fn from_token(token: &str) -> Option<Key> {
        let key = match token {
            "io" => Key::Block,
            "s" => Key::Sentence,
            "g" => Key::Goal,
            "h" => Key::Hypothesis,
            "msg" => Key::Message,
            "in" => Key::Leaf(LeafKey::Input),
            "out" => Key::Leaf(LeafKey::Output),
            "ccl" => Key::Leaf(LeafKey::Conclusion),
            "body" => Key::Leaf(LeafKey::Body),
            "name" => Key::Leaf(LeafKey::Name),
            "type" => Key::Leaf(LeafKey::Type),
            _ => return None,
        };
        Some(key)
    }

    pub fn token(self) -> &'static str {
        match self {
            Key::Block => "io",
            Key::Sentence => "s",
            Key::Goal => "g",
            Key::Hypothesis => "h",
            Key::Message => "msg",
            Key::Leaf(LeafKey::Input) => "in",
            Key::Leaf(LeafKey::Output) => "out",
            Key::Leaf(LeafKey::Conclusion) => "ccl",
            Key::Leaf(LeafKey::Body) => "body",
            Key::Leaf(LeafKey::Name) => "name",
            Key::Leaf(LeafKey::Type) => "type",
        }
    }

    /// Human-readable noun used in error messages ("No goal matches …").
    pub fn noun(self) -> &'static str {
        match self {
            Key::Block => "block",
            Key::Sentence => "sentence",
            Key::Goal => "goal",
            Key::Hypothesis => "hypothesis",
            Key::Message => "message",
            Key::Leaf(_) => "field",
        }
    }

    pub fn is_leaf(self) -> bool {
        matches!(self, Key::Leaf(_))
    }

    pub fn allowed_selectors(self) -> &'static [SelectorForm] {
        SELECTOR_TABLE
            .iter()
            .find(|(key, _)| *key == self)
            .map(|(_, forms)| *forms)
            .unwrap_or(&[])
    }

    pub fn accepts(self, form: SelectorForm) -> bool {
        self.allowed_selectors().contains(&form)
    }
}

impl SelectorForm {
    pub fn describe(self) -> &'static str {
        match self {
            SelectorForm::Index => "`#N` indices",
            SelectorForm::Name => "`#name` lookups",
            SelectorForm::Substring => "`(…)` searches",
            SelectorForm::Wildcard => "`{…}` wildcard searches",
        }
    }
}

/// How a structural component picks among candidates.
#[derive(Debug, Clone, PartialEq)]
pub enum Selector {
    None,
    Index(usize),
    Name(String),
    Pattern(Pattern),
}

impl Selector {
    pub fn form(&self) -> Option<SelectorForm> {
        match self {
            Selector::None => None,
            Selector::Index(_) => Some(SelectorForm::Index),
            Selector::Name(_) => Some(SelectorForm::Name),
            Selector::Pattern(pattern) => Some(pattern.form()),
        }
    }

    /// The value quoted back in "No … matches '…'" errors.
    pub fn searched(&self) -> String {
        match self {
            Selector::None => String::new(),
            Selector::Index(index) => index.to_string(),
            Selector::Name(name) => name.clone(),
            Selector::Pattern(pattern) => pattern.search_text(),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::None => Ok(()),
            Selector::Index(index) => write!(f, "#{}", index),
            Selector::Name(name) => write!(f, "#{}", name),
            Selector::Pattern(pattern) => write!(f, "{}", pattern),
        }
    }
}

/// One `.key[selector]` unit of a path.
#[derive(Debug, Clone, PartialEq)]
pub struct PathComponent {
    pub key: Key,
    pub selector: Selector,
    /// Byte span of the component in the raw path string.
    pub span: Range<usize>,
}

impl fmt::Display for PathComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ".{}{}", self.key.token(), self.selector)
    }
}

/// A parsed path expression. Always holds at least one component.
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    pub raw: String,
    pub components: Vec<PathComponent>,
}

impl Path {
    /// The raw text of a component, exactly as the author wrote it.
    pub fn fragment(&self, component: &PathComponent) -> &str {
        self.raw.get(component.span.clone()).unwrap_or("")
    }

    pub fn last(&self) -> Option<&PathComponent> {
        self.components.last()
    }

    pub fn contains_key(&self, key: Key) -> bool {
        self.components.iter().any(|c| c.key == key)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for component in &self.components {
            write!(f, "{}", component)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_rejects_wildcards() {
        assert!(Key::Block.accepts(SelectorForm::Substring));
        assert!(!Key::Block.accepts(SelectorForm::Wildcard));
        assert!(!Key::Sentence.accepts(SelectorForm::Name));
    }

    #[test]
    fn search_keys_take_both_pattern_families() {
        for key in [Key::Sentence, Key::Goal, Key::Hypothesis, Key::Message] {
            assert!(key.accepts(SelectorForm::Substring), "{:?}", key);
            assert!(key.accepts(SelectorForm::Wildcard), "{:?}", key);
            assert!(key.accepts(SelectorForm::Index), "{:?}", key);
        }
        assert_eq!(
            Key::Block.allowed_selectors(),
            &[SelectorForm::Index, SelectorForm::Name, SelectorForm::Substring]
        );
    }

    #[test]
    fn leaves_accept_no_selector() {
        for token in ["in", "out", "ccl", "body", "name", "type"] {
            let key = Key::from_token(token).expect("known leaf");
            assert!(key.is_leaf());
            assert!(key.allowed_selectors().is_empty());
            assert_eq!(key.token(), token);
        }
    }
}
