use tracing::warn;

use super::scanner::scan;
use super::statement::{UniqueEntry, UniqueList, UniqueStatement};
use super::template::{Resolution, TemplateTable, UniqueTarget};
use crate::error::UniqueError;

impl TemplateTable {
    /// Parses one effect sentence against the table.
    pub fn parse(&self, text: &str) -> Result<UniqueStatement, UniqueError> {
        self.parse_as(text, UniqueTarget::Effect)
    }

    /// Parses every sentence of a node. Failures are kept next to the statements
    /// instead of aborting the rest.
    pub fn parse_all<S: AsRef<str>>(&self, texts: &[S]) -> UniqueList {
        texts
            .iter()
            .map(|text| {
                let text = text.as_ref();
                match self.parse(text) {
                    Ok(statement) => UniqueEntry::Parsed(statement),
                    Err(error) => {
                        warn!(unique = text, %error, "ユニークを解析できませんでした");
                        UniqueEntry::Malformed {
                            text: text.to_string(),
                            error,
                        }
                    }
                }
            })
            .collect()
    }

    fn parse_as(&self, text: &str, target: UniqueTarget) -> Result<UniqueStatement, UniqueError> {
        let scanned = scan(text).map_err(|reason| UniqueError::Malformed {
            text: text.to_string(),
            reason,
        })?;
        let template = match self.resolve(&scanned, target) {
            Resolution::Found(template) | Resolution::FixedMismatch(template) => template.clone(),
            Resolution::WrongArity(template) => {
                return Err(UniqueError::ArityMismatch {
                    text: text.to_string(),
                    kind: template.kind().to_string(),
                    expected: template.slots().len(),
                    found: scanned.segments.len(),
                });
            }
            Resolution::Unknown => {
                return Err(UniqueError::UnknownKind {
                    text: text.to_string(),
                    skeleton: scanned.skeleton,
                });
            }
        };
        let parameters = template
            .bind(scanned.segments)
            .map_err(|reason| UniqueError::Malformed {
                text: text.to_string(),
                reason,
            })?;
        let conditionals = scanned
            .conditionals
            .iter()
            .map(|clause| {
                self.parse_as(clause, UniqueTarget::Conditional)
                    .map_err(|source| UniqueError::Conditional {
                        text: text.to_string(),
                        source: Box::new(source),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(UniqueStatement::new(
            text.to_string(),
            template,
            parameters,
            conditionals,
        ))
    }
}
