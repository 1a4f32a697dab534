use std::sync::Arc;

use anyhow::{Context, Result, ensure};
use tracing::{debug, info, warn};

use crate::policy::{
    ContentSource, GraphValidator, Policy, PolicyBranch, PolicyGraph, ValidationReport,
    builtin_sources, loader,
};
use crate::unique::TemplateTable;

/// Names of the content origins that contributed to a ruleset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceSet {
    active: Vec<String>,
}

impl SourceSet {
    pub fn new<I, S>(origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut active: Vec<String> = Vec::new();
        for origin in origins {
            let origin = origin.into();
            if !active.contains(&origin) {
                active.push(origin);
            }
        }
        Self { active }
    }

    /// The first origin loaded.
    pub fn primary(&self) -> Option<&str> {
        self.active.first().map(String::as_str)
    }

    pub fn active(&self) -> &[String] {
        &self.active
    }

    /// Origin worth crediting in documentation: a secondary source while more than one is active.
    pub fn attribution_for<'a>(&self, origin: Option<&'a str>) -> Option<&'a str> {
        let origin = origin?;
        (self.active.len() > 1 && self.primary() != Some(origin)).then_some(origin)
    }
}

/// Immutable, validated content shared between readers.
#[derive(Debug, Clone)]
pub struct Ruleset {
    templates: TemplateTable,
    graph: PolicyGraph,
    sources: SourceSet,
}

impl Ruleset {
    pub fn templates(&self) -> &TemplateTable {
        &self.templates
    }

    pub fn graph(&self) -> &PolicyGraph {
        &self.graph
    }

    pub fn sources(&self) -> &SourceSet {
        &self.sources
    }

    pub fn policy(&self, name: &str) -> Option<&Policy> {
        self.graph.policy(name)
    }

    pub fn branch(&self, name: &str) -> Option<&PolicyBranch> {
        self.graph.branch(name)
    }
}

#[derive(Debug, Clone)]
pub struct LoadedRuleset {
    pub ruleset: Arc<Ruleset>,
    pub report: ValidationReport,
}

pub struct RulesetBuilder {
    templates: Option<TemplateTable>,
    sources: Vec<ContentSource>,
}

impl Default for RulesetBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RulesetBuilder {
    pub fn new() -> Self {
        Self {
            templates: None,
            sources: Vec::new(),
        }
    }

    /// Replaces the built-in template table.
    pub fn with_templates(mut self, templates: TemplateTable) -> Self {
        self.templates = Some(templates);
        self
    }

    pub fn with_source(mut self, source: ContentSource) -> Self {
        self.sources.push(source);
        self
    }

    pub fn with_sources(mut self, sources: impl IntoIterator<Item = ContentSource>) -> Self {
        self.sources.extend(sources);
        self
    }

    pub fn build(self) -> Result<LoadedRuleset> {
        self.validate_sources()?;
        let RulesetBuilder { templates, sources } = self;
        let templates = match templates {
            Some(templates) => templates,
            None => TemplateTable::from_embedded()?,
        };

        let mut branches = Vec::new();
        for source in &sources {
            debug!(origin = source.origin(), file = source.file(), "コンテンツを読み込みます");
            branches.extend(loader::load_source(source, &templates)?);
        }
        let graph = PolicyGraph::new(branches).context("ポリシーグラフを構築できませんでした")?;
        let report = GraphValidator::new(&graph).validate();
        for violation in &report {
            warn!(
                branch = violation.branch(),
                severity = %violation.severity(),
                "{violation}"
            );
        }

        let sources = SourceSet::new(sources.iter().map(ContentSource::origin));
        info!(
            branches = graph.branches().len(),
            policies = graph.policy_count(),
            sources = sources.active().len(),
            errors = report.errors().count(),
            warnings = report.warnings().count(),
            "ルールセットを読み込みました"
        );

        Ok(LoadedRuleset {
            ruleset: Arc::new(Ruleset {
                templates,
                graph,
                sources,
            }),
            report,
        })
    }

    fn validate_sources(&self) -> Result<()> {
        ensure!(
            !self.sources.is_empty(),
            "コンテンツが1つも指定されていません。最低1件のファイルを用意してください。"
        );
        Ok(())
    }
}

/// Ruleset compiled from the content embedded in the binary.
pub fn load_builtin() -> Result<LoadedRuleset> {
    RulesetBuilder::new().with_sources(builtin_sources()).build()
}
