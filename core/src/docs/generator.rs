use super::assembler::{Documented, NodeHeader};
use super::line::DocLine;
use crate::policy::{Policy, PolicyBranch};
use crate::ruleset::Ruleset;
use crate::unique::{UniqueEntry, UniqueList};

pub const ERROR_COLOR: &str = "#ff5050";
pub const ATTRIBUTION_COLOR: &str = "#a0a0ff";

const MALFORMED_MARKER: &str = "⚠ ";

/// Link id of a policy page.
pub fn policy_link(name: &str) -> String {
    format!("policy/{name}")
}

/// Link id of a branch page; a branch may share its name with a policy.
pub fn branch_link(name: &str) -> String {
    format!("branch/{name}")
}

fn icon_for(name: &str) -> String {
    format!("PolicyIcons/{name}")
}

/// One line per declared unique; malformed ones keep their raw text behind a marker.
pub fn unique_lines(uniques: &UniqueList) -> impl Iterator<Item = DocLine> + '_ {
    uniques.entries().iter().map(|entry| match entry {
        UniqueEntry::Parsed(statement) => DocLine::text(statement.display_text()),
        UniqueEntry::Malformed { text, .. } => {
            DocLine::text(format!("{MALFORMED_MARKER}{text}")).with_color(ERROR_COLOR)
        }
    })
}

impl Documented for Policy {
    fn header(&self) -> Option<NodeHeader> {
        Some(NodeHeader::new(self.name()).with_icon(icon_for(self.name())))
    }

    fn authored_lines(&self) -> &[DocLine] {
        self.authored()
    }

    fn origin(&self) -> Option<&str> {
        Policy::origin(self)
    }

    fn generated_lines(&self, ruleset: &Ruleset) -> Vec<DocLine> {
        let graph = ruleset.graph();
        let mut lines = Vec::new();

        let branch = self.branch();
        let branch_line = if self.is_completion() {
            DocLine::text(format!("Granted once every other {branch} policy is adopted"))
        } else {
            DocLine::text(format!("Policy branch: {branch}"))
        };
        lines.push(if graph.branch(branch).is_some() {
            branch_line.with_link(branch_link(branch))
        } else {
            branch_line
        });

        for required in self.requires() {
            let line = DocLine::text(format!("Requires: {required}"));
            lines.push(if graph.contains_policy(required) {
                line.with_link(policy_link(required))
            } else {
                line
            });
        }
        for dependent in graph.unlocks(self.name()) {
            lines.push(DocLine::text(format!("Unlocks: {dependent}")).with_link(policy_link(dependent)));
        }

        lines.extend(unique_lines(self.uniques()));
        lines
    }
}

impl Documented for PolicyBranch {
    fn header(&self) -> Option<NodeHeader> {
        Some(NodeHeader::new(self.name()).with_icon(icon_for(self.name())))
    }

    fn authored_lines(&self) -> &[DocLine] {
        self.authored()
    }

    fn origin(&self) -> Option<&str> {
        PolicyBranch::origin(self)
    }

    fn generated_lines(&self, _ruleset: &Ruleset) -> Vec<DocLine> {
        let mut lines = vec![DocLine::text(format!("Unlocked in the {}", self.era()))];
        lines.extend(unique_lines(self.uniques()));
        if !self.policies().is_empty() {
            lines.push(DocLine::text("Policies:"));
            lines.extend(self.policies().iter().map(|policy| {
                DocLine::text(format!("• {}", policy.name()))
                    .with_link(policy_link(policy.name()))
                    .with_indent(1)
            }));
        }
        lines
    }
}
