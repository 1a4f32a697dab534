mod assembler;
mod generator;
mod line;

pub use assembler::{DocumentationAssembler, Documented, LineAssembly, NodeHeader, assemble_lines};
pub use generator::{ATTRIBUTION_COLOR, ERROR_COLOR, branch_link, policy_link, unique_lines};
pub use line::{DocLine, Styling};
