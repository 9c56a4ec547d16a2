use std::fmt;

use markers::{Key, LeafKey};

/// Whether a target is a scalar field or a whole node rendered as text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    Leaf,
    Structural,
}

/// Stable position of a node inside a transcript, usable as a link anchor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Anchor {
    pub block: usize,
    pub sentence: Option<usize>,
    pub goal: Option<usize>,
    pub hypothesis: Option<usize>,
    pub message: Option<usize>,
}

impl Anchor {
    pub fn block(block: usize) -> Self {
        Anchor {
            block,
            ..Default::default()
        }
    }

    pub fn sentence(self, index: usize) -> Self {
        Anchor {
            sentence: Some(index),
            ..self
        }
    }

    pub fn goal(self, index: usize) -> Self {
        Anchor {
            goal: Some(index),
            ..self
        }
    }

    pub fn hypothesis(self, index: usize) -> Self {
        Anchor {
            hypothesis: Some(index),
            ..self
        }
    }

    pub fn message(self, index: usize) -> Self {
        Anchor {
            message: Some(index),
            ..self
        }
    }
}

/// Renders as `m-b0-s3-g0-h1`.
impl fmt::Display for Anchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m-b{}", self.block)?;
        let parts = [
            ("s", self.sentence),
            ("g", self.goal),
            ("h", self.hypothesis),
            ("msg", self.message),
        ];
        for (prefix, index) in parts {
            if let Some(index) = index {
                write!(f, "-{}{}", prefix, index)?;
            }
        }
        Ok(())
    }
}

/// The result of resolving a path.
#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    /// `None` when the addressed field is legitimately absent, such as the
    /// body of a hypothesis without a definition.
    pub text: Option<String>,
    pub kind: TargetKind,
    /// The structural key of the node the target was taken from.
    pub origin: Key,
    /// The leaf projection, if any.
    pub field: Option<LeafKey>,
    pub anchor: Anchor,
}

impl Target {
    pub fn is_null(&self) -> bool {
        self.text.is_none()
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }
}
