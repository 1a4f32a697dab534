use std::collections::VecDeque;
use std::slice;
use std::sync::Arc;

use super::generator::ATTRIBUTION_COLOR;
use super::line::DocLine;
use crate::ruleset::Ruleset;

/// Display name and icon shown above a node's documentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeHeader {
    pub name: String,
    pub icon: Option<String>,
}

impl NodeHeader {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            icon: None,
        }
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    fn into_line(self) -> DocLine {
        let line = DocLine::header(self.name);
        match self.icon {
            Some(icon) => line.with_icon(icon),
            None => line,
        }
    }
}

/// A ruleset node that can be documented.
pub trait Documented {
    fn header(&self) -> Option<NodeHeader> {
        None
    }

    fn authored_lines(&self) -> &[DocLine];

    fn origin(&self) -> Option<&str>;

    fn generated_lines(&self, ruleset: &Ruleset) -> Vec<DocLine>;
}

/// Lazily merges authored and generated lines.
///
/// Generated content goes in front of the first authored line that carries a
/// link, or after all authored lines when none does. The generator closure only
/// runs once that point is reached.
pub struct LineAssembly<'a, G> {
    queue: VecDeque<DocLine>,
    authored: slice::Iter<'a, DocLine>,
    generate: Option<G>,
    attribution: Option<DocLine>,
    outer_not_empty: bool,
    authored_done: bool,
}

pub fn assemble_lines<G>(
    header: Option<NodeHeader>,
    authored: &[DocLine],
    generate: G,
    attribution: Option<DocLine>,
) -> LineAssembly<'_, G>
where
    G: FnOnce() -> Vec<DocLine>,
{
    let mut queue = VecDeque::new();
    if let Some(header) = header {
        queue.push_back(header.into_line());
        queue.push_back(DocLine::separator());
    }
    LineAssembly {
        queue,
        authored: authored.iter(),
        generate: Some(generate),
        attribution,
        outer_not_empty: false,
        authored_done: false,
    }
}

impl<G> LineAssembly<'_, G>
where
    G: FnOnce() -> Vec<DocLine>,
{
    fn insert_generated(&mut self, trailing_spacer: bool) {
        let Some(generate) = self.generate.take() else {
            return;
        };
        let generated = generate();
        if !trailing_spacer && generated.is_empty() {
            return;
        }
        if self.outer_not_empty {
            self.queue.push_back(DocLine::spacer());
        }
        self.queue.extend(generated);
        if trailing_spacer {
            self.queue.push_back(DocLine::spacer());
        }
    }
}

impl<G> Iterator for LineAssembly<'_, G>
where
    G: FnOnce() -> Vec<DocLine>,
{
    type Item = DocLine;

    fn next(&mut self) -> Option<DocLine> {
        loop {
            if let Some(line) = self.queue.pop_front() {
                return Some(line);
            }
            if let Some(line) = self.authored.next() {
                if line.has_link() {
                    self.insert_generated(true);
                }
                if !line.is_empty() {
                    self.outer_not_empty = true;
                }
                self.queue.push_back(line.clone());
                continue;
            }
            if self.authored_done {
                return None;
            }
            self.authored_done = true;
            self.insert_generated(false);
            if let Some(attribution) = self.attribution.take() {
                self.queue.push_back(DocLine::spacer());
                self.queue.push_back(attribution);
            }
        }
    }
}

/// Builds documentation for nodes of one shared ruleset.
#[derive(Debug, Clone)]
pub struct DocumentationAssembler {
    ruleset: Arc<Ruleset>,
}

impl DocumentationAssembler {
    pub fn new(ruleset: Arc<Ruleset>) -> Self {
        Self { ruleset }
    }

    pub fn ruleset(&self) -> &Ruleset {
        &self.ruleset
    }

    pub fn assemble<'a, N>(
        &'a self,
        node: &'a N,
    ) -> LineAssembly<'a, impl FnOnce() -> Vec<DocLine> + 'a>
    where
        N: Documented + ?Sized,
    {
        let attribution = self
            .ruleset
            .sources()
            .attribution_for(node.origin())
            .map(|origin| {
                DocLine::text(format!("Mod: {origin}"))
                    .starred()
                    .with_color(ATTRIBUTION_COLOR)
            });
        let ruleset: &'a Ruleset = &self.ruleset;
        assemble_lines(
            node.header(),
            node.authored_lines(),
            move || node.generated_lines(ruleset),
            attribution,
        )
    }

    /// Resolves a policy first, then a branch of that name.
    pub fn document(&self, name: &str) -> Option<Vec<DocLine>> {
        self.document_policy(name)
            .or_else(|| self.document_branch(name))
    }

    pub fn document_policy(&self, name: &str) -> Option<Vec<DocLine>> {
        let policy = self.ruleset.policy(name)?;
        Some(self.assemble(policy).collect())
    }

    pub fn document_branch(&self, name: &str) -> Option<Vec<DocLine>> {
        let branch = self.ruleset.branch(name)?;
        Some(self.assemble(branch).collect())
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::ruleset::load_builtin;

    fn texts(lines: &[DocLine]) -> Vec<&str> {
        lines.iter().map(|line| line.text.as_str()).collect()
    }

    #[test]
    fn generated_lines_go_before_first_linked_line() {
        let authored = vec![
            DocLine::text("Some flavor text"),
            DocLine::text("See also: Policy X").with_link("policy/X"),
        ];
        let lines: Vec<_> = assemble_lines(
            Some(NodeHeader::new("Aristocracy")),
            &authored,
            || vec![DocLine::text("Requires: Legalism")],
            None,
        )
        .collect();
        assert_eq!(
            texts(&lines),
            vec![
                "Aristocracy",
                "",
                "Some flavor text",
                "",
                "Requires: Legalism",
                "",
                "See also: Policy X",
            ]
        );
        assert!(lines[0].is_header);
        assert!(lines[1].is_separator);
        assert!(lines[3].is_empty());
        assert!(lines[5].is_empty());
        assert_eq!(lines[6].link.as_deref(), Some("policy/X"));
    }

    #[test]
    fn without_links_generated_lines_are_appended() {
        let authored = vec![DocLine::text("Flavor"), DocLine::spacer(), DocLine::text("More")];
        let lines: Vec<_> = assemble_lines(
            None,
            &authored,
            || vec![DocLine::text("Generated")],
            None,
        )
        .collect();
        assert_eq!(texts(&lines), vec!["Flavor", "", "More", "", "Generated"]);
    }

    #[test]
    fn no_prior_content_means_no_leading_spacer() {
        let authored = vec![DocLine::text("See also").with_link("branch/Liberty")];
        let lines: Vec<_> = assemble_lines(
            Some(NodeHeader::new("Tradition")),
            &authored,
            || vec![DocLine::text("Generated")],
            None,
        )
        .collect();
        assert_eq!(texts(&lines), vec!["Tradition", "", "Generated", "", "See also"]);

        let lines: Vec<_> =
            assemble_lines(None, &[], || vec![DocLine::text("Only")], None).collect();
        assert_eq!(texts(&lines), vec!["Only"]);
    }

    #[test]
    fn generator_runs_once_and_only_when_reached() {
        let calls = Cell::new(0);
        let authored = vec![
            DocLine::text("First"),
            DocLine::text("Linked").with_link("policy/A"),
            DocLine::text("Linked again").with_link("policy/B"),
        ];
        let mut lines = assemble_lines(
            None,
            &authored,
            || {
                calls.set(calls.get() + 1);
                vec![DocLine::text("Generated")]
            },
            None,
        );
        assert_eq!(lines.next().map(|line| line.text), Some("First".to_string()));
        assert_eq!(calls.get(), 0);
        let rest: Vec<_> = lines.collect();
        assert_eq!(calls.get(), 1);
        assert_eq!(texts(&rest), vec!["", "Generated", "", "Linked", "Linked again"]);
    }

    #[test]
    fn attribution_closes_secondary_content() {
        let loaded = load_builtin().expect("built-in ruleset");
        let assembler = DocumentationAssembler::new(loaded.ruleset);
        let lines = assembler.document("Fine Arts").expect("Fine Arts");
        let last = lines.last().expect("non-empty documentation");
        assert_eq!(last.text, "Mod: aesthetics");
        assert!(last.styling.starred);
        assert!(lines[lines.len() - 2].is_empty());

        let lines = assembler.document("Legalism").expect("Legalism");
        assert!(!lines.iter().any(|line| line.text.starts_with("Mod: ")));
    }

    #[test]
    fn document_keeps_authored_lines_in_order() {
        let loaded = load_builtin().expect("built-in ruleset");
        let assembler = DocumentationAssembler::new(loaded.ruleset.clone());
        let branch = loaded.ruleset.branch("Tradition").expect("Tradition");
        let lines = assembler.document_branch("Tradition").expect("Tradition");
        let authored: Vec<_> = lines
            .iter()
            .filter(|line| branch.authored().contains(line))
            .cloned()
            .collect();
        assert_eq!(authored, branch.authored());
        assert_eq!(lines[0].styling.icon.as_deref(), Some("PolicyIcons/Tradition"));
        let see_also = lines
            .iter()
            .position(|line| line.has_link() && line.text.starts_with("See also"))
            .expect("authored link");
        let policies = lines
            .iter()
            .position(|line| line.text == "Policies:")
            .expect("generated policy list");
        assert!(policies < see_also);
        assert!(assembler.document("Nonexistent").is_none());
    }

    #[test]
    fn assembly_is_idempotent() {
        let loaded = load_builtin().expect("built-in ruleset");
        let assembler = DocumentationAssembler::new(loaded.ruleset);
        let first = assembler.document("Landed Elite").expect("Landed Elite");
        let second = assembler.document("Landed Elite").expect("Landed Elite");
        assert_eq!(first, second);
    }

    #[test]
    fn threads_share_one_ruleset() {
        let loaded = load_builtin().expect("built-in ruleset");
        let assembler = DocumentationAssembler::new(loaded.ruleset);
        let expected = assembler.document("Monarchy").expect("Monarchy");
        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| scope.spawn(|| assembler.document("Monarchy")))
                .collect();
            for handle in handles {
                let lines = handle.join().expect("thread should not panic");
                assert_eq!(lines.as_ref(), Some(&expected));
            }
        });
    }
}
