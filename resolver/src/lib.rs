pub mod check;
pub mod contract;
pub mod error;
pub mod options;
pub mod resolve;
mod scope;
pub mod target;

pub use check::{Outcome, Report, check_document};
pub use contract::{ConsumerKind, Reference, apply_policy, assert_path, quote, reference};
pub use error::{DiagnosticError, ResolveError};
pub use options::{MultiMatch, ResolverOptions};
pub use resolve::{resolve, resolve_str};
pub use target::{Anchor, Target, TargetKind};
