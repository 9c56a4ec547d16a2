pub mod flags;
pub mod kind;
pub mod literate;
pub mod parser;
pub mod path;
pub mod pattern;
pub mod transcript;

pub use kind::ErrorKind;
pub use parser::{ParseError, parse_path};
pub use path::{Key, LeafKey, Path, PathComponent, Selector};
pub use pattern::Pattern;
pub use transcript::Transcript;
