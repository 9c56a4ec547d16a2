pub mod visibility;

use std::fmt;

use serde::Deserialize;

pub use visibility::Visibility;

/// A fully executed transcript: the captured output of every code block of a
/// literate document, in document order.
///
/// Built once by the transcript producer and never mutated while paths are
/// being resolved against it.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Transcript {
    #[serde(default)]
    pub blocks: Vec<Block>,
}

impl Transcript {
    pub fn new(blocks: Vec<Block>) -> Self {
        Transcript { blocks }
    }

    /// Look up a block by its user-assigned name.
    pub fn block_named(&self, name: &str) -> Option<(usize, &Block)> {
        self.blocks
            .iter()
            .enumerate()
            .find(|(_, block)| block.name.as_deref() == Some(name))
    }
}

/// One executed compilation unit.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Block {
    /// Optional user-assigned name, unique within a transcript.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub sentences: Vec<Sentence>,
}

impl Block {
    pub fn new(sentences: Vec<Sentence>) -> Self {
        Block {
            name: None,
            sentences,
        }
    }

    pub fn named(name: impl Into<String>, sentences: Vec<Sentence>) -> Self {
        Block {
            name: Some(name.into()),
            sentences,
        }
    }

    /// Concatenated input of every sentence, one per line.
    pub fn input_text(&self) -> String {
        self.sentences
            .iter()
            .map(|s| s.input.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// One executed input command and everything it produced.
///
/// In degraded producer mode only `input` is populated; the goal and message
/// collections stay empty.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Sentence {
    pub input: String,
    /// Goals after execution.
    #[serde(default)]
    pub goals: Vec<Goal>,
    /// Goals before execution.
    #[serde(default)]
    pub goals_before: Vec<Goal>,
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub visibility: Visibility,
}

impl Sentence {
    pub fn new(input: impl Into<String>) -> Self {
        Sentence {
            input: input.into(),
            ..Default::default()
        }
    }

    pub fn with_goals(mut self, goals: Vec<Goal>) -> Self {
        self.goals = goals;
        self
    }

    pub fn with_goals_before(mut self, goals: Vec<Goal>) -> Self {
        self.goals_before = goals;
        self
    }

    pub fn with_messages(mut self, messages: Vec<Message>) -> Self {
        self.messages = messages;
        self
    }

    /// The goal set that path queries see: pre-execution goals when the
    /// sentence is annotated with `before`, post-execution goals otherwise.
    pub fn active_goals(&self) -> &[Goal] {
        if self.visibility.goals_before {
            &self.goals_before
        } else {
            &self.goals
        }
    }

    /// Whether the sentence produced output of a kind its visibility shows.
    pub fn has_outputs(&self) -> bool {
        (self.visibility.goals && !self.active_goals().is_empty())
            || (self.visibility.messages && !self.messages.is_empty())
    }

    /// Natural text of the sentence's visible outputs: messages first, then
    /// goals, separated by blank lines.
    pub fn outputs_text(&self) -> String {
        let visibility = self.visibility;
        let messages = self
            .messages
            .iter()
            .filter(|_| visibility.messages)
            .map(|m| m.contents.clone());
        let goals = self
            .active_goals()
            .iter()
            .filter(|_| visibility.goals)
            .map(|g| g.shown(visibility.hyps, visibility.ccls));
        messages
            .chain(goals)
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

const RULE: &str = "============================";

/// One proof obligation.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Goal {
    #[serde(default)]
    pub name: Option<String>,
    pub conclusion: String,
    #[serde(default)]
    pub hypotheses: Vec<Hypothesis>,
}

impl Goal {
    pub fn new(conclusion: impl Into<String>) -> Self {
        Goal {
            name: None,
            conclusion: conclusion.into(),
            hypotheses: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_hypothesis(mut self, hypothesis: Hypothesis) -> Self {
        self.hypotheses.push(hypothesis);
        self
    }

    /// The natural form, keeping only the parts asked for.
    pub fn shown(&self, hyps: bool, ccl: bool) -> String {
        let mut lines: Vec<String> = Vec::new();
        if hyps {
            lines.extend(self.hypotheses.iter().map(|h| h.to_string()));
        }
        if ccl {
            lines.push(RULE.to_string());
            lines.push(self.conclusion.clone());
        }
        lines.join("\n")
    }
}

/// A named assumption or local definition.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Hypothesis {
    pub names: Vec<String>,
    /// `None` for hypotheses introduced without a definition.
    #[serde(default)]
    pub body: Option<String>,
    #[serde(rename = "type")]
    pub ty: String,
}

impl Hypothesis {
    pub fn new(names: &[&str], ty: impl Into<String>) -> Self {
        Hypothesis {
            names: names.iter().map(|n| n.to_string()).collect(),
            body: None,
            ty: ty.into(),
        }
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn has_name(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    pub fn names_text(&self) -> String {
        self.names.join(", ")
    }
}

/// A diagnostic emitted while executing a sentence.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Message {
    pub contents: String,
}

impl Message {
    pub fn new(contents: impl Into<String>) -> Self {
        Message {
            contents: contents.into(),
        }
    }
}

impl fmt::Display for Hypothesis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.names_text())?;
        if let Some(body) = &self.body {
            write!(f, " := {}", body)?;
        }
        write!(f, " : {}", self.ty)
    }
}

impl fmt::Display for Goal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.shown(true, true))
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.contents)
    }
}
