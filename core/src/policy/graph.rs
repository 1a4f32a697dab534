use std::collections::HashMap;

use super::model::{Policy, PolicyBranch};
use crate::error::{GraphError, KeyKind};

/// Name-indexed view over the declared branches.
///
/// The index is built once; every query after that is a lookup. Branches and
/// their policies keep declaration order.
#[derive(Debug, Clone, Default)]
pub struct PolicyGraph {
    branches: Vec<PolicyBranch>,
    branch_index: HashMap<String, usize>,
    policy_index: HashMap<String, (usize, usize)>,
    unlocks: HashMap<String, Vec<String>>,
}

impl PolicyGraph {
    pub fn new(mut branches: Vec<PolicyBranch>) -> Result<Self, GraphError> {
        let mut branch_index = HashMap::new();
        let mut policy_index = HashMap::new();
        for (b, branch) in branches.iter_mut().enumerate() {
            branch.adopt_policies();
            if branch_index.insert(branch.name().to_string(), b).is_some() {
                return Err(GraphError::DuplicateKey {
                    kind: KeyKind::Branch,
                    name: branch.name().to_string(),
                });
            }
            for (p, policy) in branch.policies().iter().enumerate() {
                if policy_index.insert(policy.name().to_string(), (b, p)).is_some() {
                    return Err(GraphError::DuplicateKey {
                        kind: KeyKind::Policy,
                        name: policy.name().to_string(),
                    });
                }
            }
        }

        let mut unlocks: HashMap<String, Vec<String>> = HashMap::new();
        for policy in branches.iter().flat_map(|branch| branch.policies()) {
            for required in policy.requires() {
                unlocks
                    .entry(required.clone())
                    .or_default()
                    .push(policy.name().to_string());
            }
        }

        Ok(Self {
            branches,
            branch_index,
            policy_index,
            unlocks,
        })
    }

    pub fn branch(&self, name: &str) -> Option<&PolicyBranch> {
        self.branch_index.get(name).map(|&idx| &self.branches[idx])
    }

    pub fn policy(&self, name: &str) -> Option<&Policy> {
        self.policy_index
            .get(name)
            .map(|&(b, p)| &self.branches[b].policies()[p])
    }

    pub fn contains_policy(&self, name: &str) -> bool {
        self.policy_index.contains_key(name)
    }

    pub fn branches(&self) -> &[PolicyBranch] {
        &self.branches
    }

    /// Every policy, branch by branch, in declaration order.
    pub fn policies(&self) -> impl Iterator<Item = &Policy> {
        self.branches.iter().flat_map(|branch| branch.policies())
    }

    pub fn branch_of(&self, policy: &str) -> Option<&PolicyBranch> {
        self.policy_index
            .get(policy)
            .map(|&(b, _)| &self.branches[b])
    }

    /// Prerequisites exactly as declared.
    pub fn requirements(&self, policy: &str) -> Option<&[String]> {
        self.policy(policy).map(Policy::requires)
    }

    /// Declared prerequisites, plus every sibling policy for a completion node.
    pub fn effective_requirements(&self, policy: &str) -> Option<Vec<&str>> {
        let &(b, p) = self.policy_index.get(policy)?;
        let branch = &self.branches[b];
        let node = &branch.policies()[p];
        let mut required: Vec<&str> = Vec::new();
        if node.is_completion() {
            required.extend(
                branch
                    .policies()
                    .iter()
                    .filter(|other| other.name() != node.name())
                    .map(Policy::name),
            );
        }
        for name in node.requires() {
            if !required.contains(&name.as_str()) {
                required.push(name);
            }
        }
        Some(required)
    }

    /// Policies that declare `policy` as a prerequisite.
    pub fn unlocks(&self, policy: &str) -> &[String] {
        self.unlocks.get(policy).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The first layout-less policy of the branch, if any.
    pub fn completion_policy(&self, branch: &str) -> Option<&Policy> {
        self.branch(branch)?.completion_nodes().next()
    }

    pub fn policy_count(&self) -> usize {
        self.policy_index.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tradition() -> PolicyBranch {
        PolicyBranch::new("Tradition", "Ancient era")
            .with_policy(Policy::new("Aristocracy").at(1, 1))
            .with_policy(Policy::new("Legalism").at(1, 3))
            .with_policy(
                Policy::new("Landed Elite")
                    .at(2, 3)
                    .with_requires(["Legalism"]),
            )
            .with_policy(Policy::new("Tradition Complete"))
    }

    #[test]
    fn lookup_by_name_and_branch_of() {
        let graph = PolicyGraph::new(vec![tradition()]).expect("graph should build");
        assert_eq!(graph.policy_count(), 4);
        assert_eq!(
            graph.branch_of("Landed Elite").map(PolicyBranch::name),
            Some("Tradition")
        );
        assert_eq!(graph.policy("Legalism").map(Policy::branch), Some("Tradition"));
        assert!(graph.branch("Liberty").is_none());
        assert_eq!(
            graph.completion_policy("Tradition").map(Policy::name),
            Some("Tradition Complete")
        );
    }

    #[test]
    fn unlocks_follow_declared_requires() {
        let graph = PolicyGraph::new(vec![tradition()]).expect("graph should build");
        assert_eq!(graph.unlocks("Legalism"), ["Landed Elite"]);
        assert!(graph.unlocks("Aristocracy").is_empty());
        assert_eq!(
            graph.requirements("Landed Elite"),
            Some(&["Legalism".to_string()][..])
        );
    }

    #[test]
    fn completion_requires_every_sibling() {
        let graph = PolicyGraph::new(vec![tradition()]).expect("graph should build");
        assert_eq!(
            graph.effective_requirements("Tradition Complete"),
            Some(vec!["Aristocracy", "Legalism", "Landed Elite"])
        );
        assert_eq!(
            graph.effective_requirements("Landed Elite"),
            Some(vec!["Legalism"])
        );
        assert_eq!(graph.effective_requirements("Monarchy"), None);
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let err = PolicyGraph::new(vec![tradition(), tradition()]).expect_err("duplicate branch");
        assert_eq!(
            err,
            GraphError::DuplicateKey {
                kind: KeyKind::Branch,
                name: "Tradition".into()
            }
        );

        let liberty = PolicyBranch::new("Liberty", "Ancient era")
            .with_policy(Policy::new("Legalism").at(1, 1));
        let err = PolicyGraph::new(vec![tradition(), liberty]).expect_err("duplicate policy");
        assert!(matches!(
            err,
            GraphError::DuplicateKey { kind: KeyKind::Policy, ref name } if name == "Legalism"
        ));
    }

    #[test]
    fn branch_and_policy_may_share_a_name() {
        let branch = PolicyBranch::new("Piety", "Classical era")
            .with_policy(Policy::new("Piety").at(1, 1))
            .with_policy(Policy::new("Piety Complete"));
        let graph = PolicyGraph::new(vec![branch]).expect("shared name is allowed");
        assert!(graph.branch("Piety").is_some());
        assert!(graph.policy("Piety").is_some());
    }
}
