use std::sync::Arc;

use super::parameter::ParameterValue;
use super::template::UniqueTemplate;
use crate::error::UniqueError;

/// A parsed unique sentence. Built once at load time and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniqueStatement {
    text: String,
    template: Arc<UniqueTemplate>,
    parameters: Vec<String>,
    conditionals: Vec<UniqueStatement>,
}

impl UniqueStatement {
    pub(crate) fn new(
        text: String,
        template: Arc<UniqueTemplate>,
        parameters: Vec<String>,
        conditionals: Vec<UniqueStatement>,
    ) -> Self {
        Self {
            text,
            template,
            parameters,
            conditionals,
        }
    }

    /// The sentence exactly as the content declared it.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn kind(&self) -> &str {
        self.template.kind()
    }

    pub fn template(&self) -> &UniqueTemplate {
        &self.template
    }

    pub fn parameters(&self) -> &[String] {
        &self.parameters
    }

    /// Conditional clauses in declaration order; all of them must hold for the effect to apply.
    pub fn conditionals(&self) -> &[UniqueStatement] {
        &self.conditionals
    }

    pub fn value(&self, index: usize) -> Option<ParameterValue> {
        let raw = self.parameters.get(index)?;
        let ty = self.template.parameter_types().nth(index)?;
        ty.decode(raw)
    }

    /// Human readable form: brackets removed, each conditional in parentheses.
    pub fn display_text(&self) -> String {
        let mut text = self.template.render(&self.parameters);
        for conditional in &self.conditionals {
            text.push_str(" (");
            text.push_str(&conditional.display_text());
            text.push(')');
        }
        text
    }
}

/// One declared unique of a node, kept in declaration order whether or not it parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UniqueEntry {
    Parsed(UniqueStatement),
    Malformed { text: String, error: UniqueError },
}

impl UniqueEntry {
    pub fn text(&self) -> &str {
        match self {
            UniqueEntry::Parsed(statement) => statement.text(),
            UniqueEntry::Malformed { text, .. } => text,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UniqueList {
    entries: Vec<UniqueEntry>,
}

impl UniqueList {
    pub fn entries(&self) -> &[UniqueEntry] {
        &self.entries
    }

    pub fn statements(&self) -> impl Iterator<Item = &UniqueStatement> {
        self.entries.iter().filter_map(|entry| match entry {
            UniqueEntry::Parsed(statement) => Some(statement),
            UniqueEntry::Malformed { .. } => None,
        })
    }

    pub fn errors(&self) -> impl Iterator<Item = &UniqueError> {
        self.entries.iter().filter_map(|entry| match entry {
            UniqueEntry::Malformed { error, .. } => Some(error),
            UniqueEntry::Parsed(_) => None,
        })
    }

    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<UniqueEntry> for UniqueList {
    fn from_iter<I: IntoIterator<Item = UniqueEntry>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
