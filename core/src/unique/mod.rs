mod parameter;
mod parser;
mod scanner;
mod statement;
mod template;

pub use parameter::{ParameterType, ParameterValue, Stat, StatAmount};
pub use statement::{UniqueEntry, UniqueList, UniqueStatement};
pub use template::{Slot, TemplateTable, UniqueTarget, UniqueTemplate};
