use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use thiserror::Error;

use super::graph::PolicyGraph;
use super::model::{GridPosition, Policy, PolicyBranch};
use crate::error::UniqueError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "警告"),
            Severity::Error => write!(f, "エラー"),
        }
    }
}

/// A broken graph invariant, attributed to the branch it was found in.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
    #[error("ブランチ '{branch}' の完了ポリシーは1件である必要がありますが {found} 件あります")]
    CompletionShape { branch: String, found: usize },
    #[error("ブランチ '{branch}' の完了ポリシー '{policy}' が末尾にありません")]
    MisplacedCompletion { branch: String, policy: String },
    #[error("ポリシー '{policy}' には row と column の片方しか指定されていません")]
    PartialLayout { branch: String, policy: String },
    #[error(
        "ブランチ '{branch}' の座標 ({row}, {column}) が重複しています: {}",
        .policies.join(", ")
    )]
    DuplicateCoordinates {
        branch: String,
        row: i32,
        column: i32,
        policies: Vec<String>,
    },
    #[error("ブランチ '{branch}' に priorities が定義されていません")]
    MissingPriorities { branch: String },
    #[error("'{node}' のユニークが無効です: {error}")]
    InvalidUnique {
        branch: String,
        node: String,
        error: UniqueError,
    },
    #[error("ポリシー '{policy}' の前提 '{missing}' は存在しません")]
    DanglingReference {
        branch: String,
        policy: String,
        missing: String,
    },
    #[error("ポリシー '{policy}' には到達できません")]
    UnreachablePolicy { branch: String, policy: String },
    #[error("前提関係が循環しています: {}", .path.join(" -> "))]
    CycleDetected { branch: String, path: Vec<String> },
}

impl Violation {
    pub fn branch(&self) -> &str {
        match self {
            Violation::CompletionShape { branch, .. }
            | Violation::MisplacedCompletion { branch, .. }
            | Violation::PartialLayout { branch, .. }
            | Violation::DuplicateCoordinates { branch, .. }
            | Violation::MissingPriorities { branch }
            | Violation::InvalidUnique { branch, .. }
            | Violation::DanglingReference { branch, .. }
            | Violation::UnreachablePolicy { branch, .. }
            | Violation::CycleDetected { branch, .. } => branch,
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Violation::DuplicateCoordinates { .. } | Violation::MissingPriorities { .. } => {
                Severity::Warning
            }
            _ => Severity::Error,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    violations: Vec<Violation>,
}

impl ValidationReport {
    /// No error-level violations; warnings are allowed.
    pub fn is_valid(&self) -> bool {
        self.errors().next().is_none()
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub fn errors(&self) -> impl Iterator<Item = &Violation> {
        self.violations
            .iter()
            .filter(|violation| violation.severity() == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Violation> {
        self.violations
            .iter()
            .filter(|violation| violation.severity() == Severity::Warning)
    }

    pub fn for_branch<'a>(&'a self, branch: &'a str) -> impl Iterator<Item = &'a Violation> {
        self.violations
            .iter()
            .filter(move |violation| violation.branch() == branch)
    }

    pub fn cycles(&self) -> impl Iterator<Item = &[String]> {
        self.violations.iter().filter_map(|violation| match violation {
            Violation::CycleDetected { path, .. } => Some(path.as_slice()),
            _ => None,
        })
    }

    pub fn len(&self) -> usize {
        self.violations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }
}

impl<'a> IntoIterator for &'a ValidationReport {
    type Item = &'a Violation;
    type IntoIter = std::slice::Iter<'a, Violation>;

    fn into_iter(self) -> Self::IntoIter {
        self.violations.iter()
    }
}

/// Read-only checker over a built [`PolicyGraph`].
pub struct GraphValidator<'a> {
    graph: &'a PolicyGraph,
}

impl<'a> GraphValidator<'a> {
    pub fn new(graph: &'a PolicyGraph) -> Self {
        Self { graph }
    }

    /// Runs every check and collects all findings; nothing short-circuits.
    pub fn validate(&self) -> ValidationReport {
        let cycles = self.find_cycles();
        let in_cycle: HashSet<&str> = cycles
            .iter()
            .flat_map(|path| path.iter().map(String::as_str))
            .collect();
        let reachable = self.reachable();

        let mut violations = Vec::new();
        for branch in self.graph.branches() {
            check_completion(branch, &mut violations);
            check_layout(branch, &mut violations);
            check_priorities(branch, &mut violations);
            check_uniques(branch, &mut violations);
            self.check_references(branch, &mut violations);
            for policy in branch.policies() {
                let dangling = policy
                    .requires()
                    .iter()
                    .any(|name| !self.graph.contains_policy(name));
                if !reachable.contains(policy.name())
                    && !dangling
                    && !in_cycle.contains(policy.name())
                {
                    violations.push(Violation::UnreachablePolicy {
                        branch: branch.name().to_string(),
                        policy: policy.name().to_string(),
                    });
                }
            }
        }

        for path in cycles {
            let branch = path
                .first()
                .and_then(|name| self.graph.branch_of(name))
                .map(|branch| branch.name().to_string())
                .unwrap_or_default();
            violations.push(Violation::CycleDetected { branch, path });
        }

        ValidationReport { violations }
    }

    fn check_references(&self, branch: &PolicyBranch, violations: &mut Vec<Violation>) {
        for policy in branch.policies() {
            for missing in policy
                .requires()
                .iter()
                .filter(|name| !self.graph.contains_policy(name))
            {
                violations.push(Violation::DanglingReference {
                    branch: branch.name().to_string(),
                    policy: policy.name().to_string(),
                    missing: missing.clone(),
                });
            }
        }
    }

    /// Fixed point: roots first, then anything whose prerequisites are all settled.
    fn reachable(&self) -> HashSet<&'a str> {
        let graph = self.graph;
        let mut reachable: HashSet<&'a str> = HashSet::new();
        loop {
            let mut changed = false;
            for policy in graph.policies() {
                if reachable.contains(policy.name()) {
                    continue;
                }
                let Some(required) = graph.effective_requirements(policy.name()) else {
                    continue;
                };
                if required
                    .iter()
                    .all(|name| graph.contains_policy(name) && reachable.contains(name))
                {
                    reachable.insert(policy.name());
                    changed = true;
                }
            }
            if !changed {
                return reachable;
            }
        }
    }

    /// Depth-first search with an on-stack marker; each cycle is kept once,
    /// in the order it was walked.
    fn find_cycles(&self) -> Vec<Vec<String>> {
        let mut marks: HashMap<&str, Mark> = HashMap::new();
        let mut seen: HashSet<Vec<String>> = HashSet::new();
        let mut cycles = Vec::new();
        for policy in self.graph.policies() {
            if !marks.contains_key(policy.name()) {
                let mut stack = Vec::new();
                self.visit(policy.name(), &mut marks, &mut stack, &mut seen, &mut cycles);
            }
        }
        cycles
    }

    fn visit(
        &self,
        name: &'a str,
        marks: &mut HashMap<&'a str, Mark>,
        stack: &mut Vec<&'a str>,
        seen: &mut HashSet<Vec<String>>,
        cycles: &mut Vec<Vec<String>>,
    ) {
        marks.insert(name, Mark::OnStack);
        stack.push(name);
        let required = self.graph.effective_requirements(name).unwrap_or_default();
        for next in required {
            match marks.get(next) {
                Some(Mark::OnStack) => {
                    if let Some(start) = stack.iter().position(|entry| *entry == next) {
                        let path: Vec<String> =
                            stack[start..].iter().map(|name| name.to_string()).collect();
                        if seen.insert(canonical_rotation(&path)) {
                            cycles.push(path);
                        }
                    }
                }
                Some(Mark::Done) => {}
                None if self.graph.contains_policy(next) => {
                    self.visit(next, marks, stack, seen, cycles);
                }
                None => {}
            }
        }
        stack.pop();
        marks.insert(name, Mark::Done);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    OnStack,
    Done,
}

fn canonical_rotation(path: &[String]) -> Vec<String> {
    let start = path
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.cmp(b.1))
        .map(|(idx, _)| idx)
        .unwrap_or(0);
    path[start..].iter().chain(&path[..start]).cloned().collect()
}

fn check_completion(branch: &PolicyBranch, violations: &mut Vec<Violation>) {
    let completions: Vec<&Policy> = branch.completion_nodes().collect();
    if completions.len() != 1 {
        violations.push(Violation::CompletionShape {
            branch: branch.name().to_string(),
            found: completions.len(),
        });
        return;
    }
    let completion = completions[0];
    let is_last = branch
        .policies()
        .last()
        .is_some_and(|last| last.name() == completion.name());
    if !is_last {
        violations.push(Violation::MisplacedCompletion {
            branch: branch.name().to_string(),
            policy: completion.name().to_string(),
        });
    }
}

fn check_layout(branch: &PolicyBranch, violations: &mut Vec<Violation>) {
    for policy in branch.policies().iter().filter(|p| p.has_partial_layout()) {
        violations.push(Violation::PartialLayout {
            branch: branch.name().to_string(),
            policy: policy.name().to_string(),
        });
    }

    let mut by_position: BTreeMap<GridPosition, Vec<String>> = BTreeMap::new();
    for policy in branch.policies() {
        if let Some(position) = policy.position() {
            by_position
                .entry(position)
                .or_default()
                .push(policy.name().to_string());
        }
    }
    for (position, policies) in by_position {
        if policies.len() > 1 {
            violations.push(Violation::DuplicateCoordinates {
                branch: branch.name().to_string(),
                row: position.row,
                column: position.column,
                policies,
            });
        }
    }
}

fn check_priorities(branch: &PolicyBranch, violations: &mut Vec<Violation>) {
    if branch.priorities().is_empty() {
        violations.push(Violation::MissingPriorities {
            branch: branch.name().to_string(),
        });
    }
}

fn check_uniques(branch: &PolicyBranch, violations: &mut Vec<Violation>) {
    let nodes = std::iter::once((branch.name(), branch.uniques())).chain(
        branch
            .policies()
            .iter()
            .map(|policy| (policy.name(), policy.uniques())),
    );
    for (node, uniques) in nodes {
        for error in uniques.errors() {
            violations.push(Violation::InvalidUnique {
                branch: branch.name().to_string(),
                node: node.to_string(),
                error: error.clone(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unique::{TemplateTable, UniqueList};

    fn branch(name: &str, policies: Vec<Policy>) -> PolicyBranch {
        policies.into_iter().fold(
            PolicyBranch::new(name, "Ancient era").with_priority("Neutral", 10),
            PolicyBranch::with_policy,
        )
    }

    fn tradition() -> PolicyBranch {
        branch(
            "Tradition",
            vec![
                Policy::new("Aristocracy").at(1, 1),
                Policy::new("Legalism").at(1, 3),
                Policy::new("Landed Elite").at(2, 3).with_requires(["Legalism"]),
                Policy::new("Tradition Complete"),
            ],
        )
    }

    fn validate(branches: Vec<PolicyBranch>) -> ValidationReport {
        let graph = PolicyGraph::new(branches).expect("graph should build");
        GraphValidator::new(&graph).validate()
    }

    #[test]
    fn tradition_is_fully_reachable() {
        let report = validate(vec![tradition()]);
        assert!(report.is_empty(), "unexpected violations: {report:?}");
        assert!(report.is_valid());
    }

    #[test]
    fn missing_prerequisite_is_dangling_only() {
        let mut branch = tradition();
        branch = branch.with_policy(Policy::new("Usurper").at(3, 1).with_requires(["Monarchy2"]));
        let report = validate(vec![branch]);
        let dangling: Vec<_> = report
            .violations()
            .iter()
            .filter(|v| matches!(v, Violation::DanglingReference { .. }))
            .collect();
        assert_eq!(
            dangling,
            vec![&Violation::DanglingReference {
                branch: "Tradition".into(),
                policy: "Usurper".into(),
                missing: "Monarchy2".into(),
            }]
        );
        assert!(!report.violations().iter().any(|v| matches!(
            v,
            Violation::UnreachablePolicy { policy, .. } if policy == "Usurper"
        )));
        assert!(!report.is_valid());
    }

    #[test]
    fn single_cycle_reported_once() {
        let report = validate(vec![branch(
            "Loop",
            vec![
                Policy::new("A").at(1, 1).with_requires(["C"]),
                Policy::new("B").at(1, 2).with_requires(["A"]),
                Policy::new("C").at(1, 3).with_requires(["B"]),
                Policy::new("Loop Complete"),
            ],
        )]);
        let cycles: Vec<_> = report.cycles().collect();
        assert_eq!(cycles.len(), 1);
        let mut members = cycles[0].to_vec();
        members.sort();
        assert_eq!(members, ["A", "B", "C"]);
        assert_eq!(cycles[0], ["A", "C", "B"]);
        assert!(!report.violations().iter().any(|v| matches!(
            v,
            Violation::UnreachablePolicy { policy, .. } if policy != "Loop Complete"
        )));
        assert!(matches!(
            report.violations().last(),
            Some(Violation::CycleDetected { branch, .. }) if branch == "Loop"
        ));
    }

    #[test]
    fn acyclic_graph_has_no_cycles() {
        let report = validate(vec![tradition()]);
        assert_eq!(report.cycles().count(), 0);
    }

    #[test]
    fn completion_count_must_be_one() {
        let none = branch("Honor", vec![Policy::new("Warrior Code").at(1, 1)]);
        let two = branch(
            "Piety",
            vec![
                Policy::new("Organized Religion").at(1, 1),
                Policy::new("Piety Complete"),
                Policy::new("Piety Finisher"),
            ],
        );
        let report = validate(vec![none, two]);
        let shapes: Vec<_> = report
            .violations()
            .iter()
            .filter_map(|v| match v {
                Violation::CompletionShape { branch, found } => Some((branch.as_str(), *found)),
                _ => None,
            })
            .collect();
        assert_eq!(shapes, vec![("Honor", 0), ("Piety", 2)]);
    }

    #[test]
    fn completion_must_come_last() {
        let report = validate(vec![branch(
            "Commerce",
            vec![
                Policy::new("Commerce Complete"),
                Policy::new("Trade Unions").at(1, 1),
            ],
        )]);
        assert_eq!(
            report.for_branch("Commerce").next(),
            Some(&Violation::MisplacedCompletion {
                branch: "Commerce".into(),
                policy: "Commerce Complete".into(),
            })
        );
    }

    #[test]
    fn warnings_do_not_invalidate() {
        let branch = PolicyBranch::new("Honor", "Ancient era")
            .with_policy(Policy::new("Warrior Code").at(1, 1))
            .with_policy(Policy::new("Discipline").at(1, 1))
            .with_policy(Policy::new("Honor Complete"));
        let report = validate(vec![branch]);
        let warnings: Vec<_> = report.warnings().collect();
        assert_eq!(warnings.len(), 2);
        assert!(matches!(
            warnings[0],
            Violation::DuplicateCoordinates { row: 1, column: 1, .. }
        ));
        assert!(matches!(warnings[1], Violation::MissingPriorities { .. }));
        assert!(report.is_valid());
    }

    #[test]
    fn partial_layout_is_an_error() {
        let report = validate(vec![branch(
            "Liberty",
            vec![
                Policy::new("Collective Rule").with_layout(Some(1), None),
                Policy::new("Liberty Complete"),
            ],
        )]);
        assert!(report.errors().any(|v| matches!(
            v,
            Violation::PartialLayout { policy, .. } if policy == "Collective Rule"
        )));
    }

    #[test]
    fn malformed_uniques_are_reported_per_node() {
        let table = TemplateTable::from_embedded().expect("built-in templates");
        let uniques: UniqueList = table.parse_all(&["Free [Settler appears"]);
        let report = validate(vec![branch(
            "Liberty",
            vec![
                Policy::new("Citizenship").at(1, 1).with_uniques(uniques),
                Policy::new("Liberty Complete"),
            ],
        )]);
        assert!(report.errors().any(|v| matches!(
            v,
            Violation::InvalidUnique { node, .. } if node == "Citizenship"
        )));
    }

    #[test]
    fn downstream_of_a_dangling_policy_is_unreachable() {
        let report = validate(vec![branch(
            "Rationalism",
            vec![
                Policy::new("Secularism").at(1, 1).with_requires(["Humanism"]),
                Policy::new("Free Thought").at(2, 1).with_requires(["Secularism"]),
                Policy::new("Rationalism Complete"),
            ],
        )]);
        let unreachable: Vec<_> = report
            .violations()
            .iter()
            .filter_map(|v| match v {
                Violation::UnreachablePolicy { policy, .. } => Some(policy.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(unreachable, vec!["Free Thought", "Rationalism Complete"]);
    }
}
