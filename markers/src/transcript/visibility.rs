use serde::Deserialize;

/// Display flags attached to a sentence by the directive that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Visibility {
    pub input: bool,
    pub output: bool,
    /// Outputs are rendered expanded rather than behind the input.
    pub unfold: bool,
    pub goals: bool,
    pub messages: bool,
    pub hyps: bool,
    pub ccls: bool,
    /// Queries see the goals as they were before the sentence ran.
    pub goals_before: bool,
}

impl Visibility {
    /// Input and output hidden; the starting point of the `none` flag.
    /// The per-kind toggles stay on so a later `out` shows everything.
    pub fn hidden() -> Self {
        Visibility {
            input: false,
            output: false,
            ..Visibility::default()
        }
    }
}

impl Default for Visibility {
    fn default() -> Self {
        Visibility {
            input: true,
            output: true,
            unfold: false,
            goals: true,
            messages: true,
            hyps: true,
            ccls: true,
            goals_before: false,
        }
    }
}
