use serde::Deserialize;

/// What to do when a search selector matches several candidates in one scope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MultiMatch {
    /// Report the path as ambiguous.
    #[default]
    Ambiguous,
    /// Keep the first candidate in document order.
    First,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ResolverOptions {
    pub multi_match: MultiMatch,
}

impl ResolverOptions {
    pub fn first_match() -> Self {
        ResolverOptions {
            multi_match: MultiMatch::First,
        }
    }
}
