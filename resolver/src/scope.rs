use markers::Key;
use markers::path::PathComponent;
use markers::transcript::{Block, Goal, Hypothesis, Message, Sentence};

use crate::target::{Anchor, Target, TargetKind};

/// Where a walk stands after consuming a prefix of a path.
#[derive(Debug, Clone)]
pub(crate) enum Scope<'a> {
    Transcript,
    /// Blocks still in play. More than one survives only while a later
    /// component may narrow the choice.
    Blocks {
        candidates: Vec<(usize, &'a Block)>,
        by: &'a PathComponent,
    },
    Sentence {
        anchor: Anchor,
        sentence: &'a Sentence,
    },
    Goal {
        anchor: Anchor,
        sentence: &'a Sentence,
        goal: &'a Goal,
    },
    Hypothesis {
        anchor: Anchor,
        hypothesis: &'a Hypothesis,
    },
    Message {
        anchor: Anchor,
        message: &'a Message,
    },
    Leaf(Target),
}

impl<'a> Scope<'a> {
    pub fn describe(&self) -> &'static str {
        match self {
            Scope::Transcript => "the transcript",
            Scope::Blocks { .. } => "a block",
            Scope::Sentence { .. } => "a sentence",
            Scope::Goal { .. } => "a goal",
            Scope::Hypothesis { .. } => "a hypothesis",
            Scope::Message { .. } => "a message",
            Scope::Leaf(_) => "a field",
        }
    }

    pub fn candidate_count(&self) -> usize {
        match self {
            Scope::Transcript => 0,
            Scope::Blocks { candidates, .. } => candidates.len(),
            _ => 1,
        }
    }

    /// Render a structural scope as a target carrying its natural text.
    /// Returns `None` for scopes that are not a single node. Block
    /// candidates go through the multi-match policy instead.
    pub fn structural(&self) -> Option<Target> {
        let (text, origin, anchor) = match self {
            Scope::Transcript | Scope::Blocks { .. } | Scope::Leaf(_) => return None,
            Scope::Sentence { anchor, sentence } => {
                (sentence.input.clone(), Key::Sentence, *anchor)
            }
            Scope::Goal { anchor, goal, .. } => (goal.to_string(), Key::Goal, *anchor),
            Scope::Hypothesis { anchor, hypothesis } => {
                (hypothesis.to_string(), Key::Hypothesis, *anchor)
            }
            Scope::Message { anchor, message } => (message.contents.clone(), Key::Message, *anchor),
        };
        Some(Target {
            text: Some(text),
            kind: TargetKind::Structural,
            origin,
            field: None,
            anchor,
        })
    }
}

/// Text a search selector is matched against, and the names a `#name`
/// selector looks up.
pub(crate) trait Searchable {
    fn search_text(&self) -> String;

    fn is_named(&self, _name: &str) -> bool {
        false
    }
}

impl Searchable for Block {
    fn search_text(&self) -> String {
        self.input_text()
    }

    fn is_named(&self, name: &str) -> bool {
        self.name.as_deref() == Some(name)
    }
}

impl Searchable for Sentence {
    fn search_text(&self) -> String {
        self.input.clone()
    }
}

impl Searchable for Goal {
    fn search_text(&self) -> String {
        self.conclusion.clone()
    }

    fn is_named(&self, name: &str) -> bool {
        self.name.as_deref() == Some(name)
    }
}

impl Searchable for Hypothesis {
    fn search_text(&self) -> String {
        self.to_string()
    }

    fn is_named(&self, name: &str) -> bool {
        self.has_name(name)
    }
}

impl Searchable for Message {
    fn search_text(&self) -> String {
        self.contents.clone()
    }
}
