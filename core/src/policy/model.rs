use std::collections::BTreeMap;

use crate::docs::DocLine;
use crate::unique::UniqueList;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GridPosition {
    pub row: i32,
    pub column: i32,
}

/// A single adoptable policy.
///
/// The branch's completion node is the one policy without any layout
/// coordinates. It becomes available once every other policy of the branch
/// has been adopted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policy {
    name: String,
    branch: String,
    uniques: UniqueList,
    requires: Vec<String>,
    row: Option<i32>,
    column: Option<i32>,
    origin: Option<String>,
    authored: Vec<DocLine>,
}

impl Policy {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            branch: String::new(),
            uniques: UniqueList::default(),
            requires: Vec::new(),
            row: None,
            column: None,
            origin: None,
            authored: Vec::new(),
        }
    }

    pub fn at(mut self, row: i32, column: i32) -> Self {
        self.row = Some(row);
        self.column = Some(column);
        self
    }

    pub fn with_layout(mut self, row: Option<i32>, column: Option<i32>) -> Self {
        self.row = row;
        self.column = column;
        self
    }

    /// Duplicate names are dropped, first occurrence wins.
    pub fn with_requires<I, S>(mut self, requires: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.requires.clear();
        for name in requires {
            let name = name.into();
            if !self.requires.contains(&name) {
                self.requires.push(name);
            }
        }
        self
    }

    pub fn with_uniques(mut self, uniques: UniqueList) -> Self {
        self.uniques = uniques;
        self
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    pub fn with_authored(mut self, lines: Vec<DocLine>) -> Self {
        self.authored = lines;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the owning branch; filled in when the branch takes the policy.
    pub fn branch(&self) -> &str {
        &self.branch
    }

    pub fn uniques(&self) -> &UniqueList {
        &self.uniques
    }

    pub fn requires(&self) -> &[String] {
        &self.requires
    }

    pub fn row(&self) -> Option<i32> {
        self.row
    }

    pub fn column(&self) -> Option<i32> {
        self.column
    }

    pub fn position(&self) -> Option<GridPosition> {
        Some(GridPosition {
            row: self.row?,
            column: self.column?,
        })
    }

    pub fn is_completion(&self) -> bool {
        self.row.is_none() && self.column.is_none()
    }

    /// Only one of row/column given.
    pub fn has_partial_layout(&self) -> bool {
        self.row.is_some() != self.column.is_some()
    }

    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }

    pub fn authored(&self) -> &[DocLine] {
        &self.authored
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyBranch {
    name: String,
    era: String,
    priorities: BTreeMap<String, i32>,
    uniques: UniqueList,
    policies: Vec<Policy>,
    origin: Option<String>,
    authored: Vec<DocLine>,
}

impl PolicyBranch {
    pub fn new(name: impl Into<String>, era: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            era: era.into(),
            priorities: BTreeMap::new(),
            uniques: UniqueList::default(),
            policies: Vec::new(),
            origin: None,
            authored: Vec::new(),
        }
    }

    pub fn with_priority(mut self, label: impl Into<String>, weight: i32) -> Self {
        self.priorities.insert(label.into(), weight);
        self
    }

    pub fn with_priorities(mut self, priorities: BTreeMap<String, i32>) -> Self {
        self.priorities = priorities;
        self
    }

    pub fn with_uniques(mut self, uniques: UniqueList) -> Self {
        self.uniques = uniques;
        self
    }

    pub fn with_policy(mut self, mut policy: Policy) -> Self {
        policy.branch = self.name.clone();
        self.policies.push(policy);
        self
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    pub fn with_authored(mut self, lines: Vec<DocLine>) -> Self {
        self.authored = lines;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn era(&self) -> &str {
        &self.era
    }

    /// Victory-orientation weights for the AI; stored as declared.
    pub fn priorities(&self) -> &BTreeMap<String, i32> {
        &self.priorities
    }

    /// Effects granted while any policy of the branch is adopted.
    pub fn uniques(&self) -> &UniqueList {
        &self.uniques
    }

    pub fn policies(&self) -> &[Policy] {
        &self.policies
    }

    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }

    pub fn authored(&self) -> &[DocLine] {
        &self.authored
    }

    pub fn completion_nodes(&self) -> impl Iterator<Item = &Policy> {
        self.policies.iter().filter(|policy| policy.is_completion())
    }

    pub(crate) fn adopt_policies(&mut self) {
        for policy in &mut self.policies {
            policy.branch = self.name.clone();
        }
    }
}
