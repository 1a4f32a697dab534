mod graph;
pub(crate) mod loader;
mod model;
mod validator;

pub use graph::PolicyGraph;
pub use loader::{ContentFormat, ContentSource, PRIMARY_ORIGIN, builtin_sources};
pub use model::{GridPosition, Policy, PolicyBranch};
pub use validator::{GraphValidator, Severity, ValidationReport, Violation};
