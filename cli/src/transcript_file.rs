use std::path::Path;

use markers::Transcript;

/// Read a TOML transcript produced by the prover front end.
pub fn load(path: &Path) -> Result<Transcript, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read '{}': {}", path.display(), e))?;
    parse(&content).map_err(|e| format!("{}: {}", path.display(), e))
}

pub fn parse(content: &str) -> Result<Transcript, String> {
    toml::from_str(content).map_err(|e| format!("TOML parse error: {}", e))
}
