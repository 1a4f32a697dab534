mod docs;
mod error;
mod policy;
mod ruleset;
mod unique;

pub use docs::{
    ATTRIBUTION_COLOR, DocLine, DocumentationAssembler, Documented, ERROR_COLOR, LineAssembly,
    NodeHeader, Styling, assemble_lines, branch_link, policy_link, unique_lines,
};
pub use error::{GraphError, KeyKind, MalformedReason, UniqueError};
pub use policy::{
    ContentFormat, ContentSource, GraphValidator, GridPosition, PRIMARY_ORIGIN, Policy,
    PolicyBranch, PolicyGraph, Severity, ValidationReport, Violation, builtin_sources,
};
pub use ruleset::{LoadedRuleset, Ruleset, RulesetBuilder, SourceSet, load_builtin};
pub use unique::{
    ParameterType, ParameterValue, Slot, Stat, StatAmount, TemplateTable, UniqueEntry, UniqueList,
    UniqueStatement, UniqueTarget, UniqueTemplate,
};
