use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use serde::Deserialize;

use super::model::{Policy, PolicyBranch};
use crate::docs::DocLine;
use crate::unique::TemplateTable;

/// Origin name of the content every ruleset starts from.
pub const PRIMARY_ORIGIN: &str = "base";

const BUILTIN_SOURCES: &[(&str, &str, &str)] = &[
    (
        PRIMARY_ORIGIN,
        "base.json",
        include_str!("../../../config/policies/base.json"),
    ),
    (
        "aesthetics",
        "aesthetics.yaml",
        include_str!("../../../config/policies/mods/aesthetics.yaml"),
    ),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentFormat {
    Json,
    Yaml,
}

impl ContentFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Some(ContentFormat::Json),
            Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
                Some(ContentFormat::Yaml)
            }
            _ => None,
        }
    }
}

/// One content file: a list of branches declared by a single origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentSource {
    origin: String,
    file: String,
    format: ContentFormat,
    body: String,
}

impl ContentSource {
    pub fn new(
        origin: impl Into<String>,
        file: impl Into<String>,
        format: ContentFormat,
        body: impl Into<String>,
    ) -> Self {
        Self {
            origin: origin.into(),
            file: file.into(),
            format,
            body: body.into(),
        }
    }

    /// Picks the format from the file extension.
    pub fn from_file(origin: impl Into<String>, path: &Path, body: impl Into<String>) -> Result<Self> {
        let Some(format) = ContentFormat::from_path(path) else {
            bail!(
                "対応していないファイル形式です (json/yaml/yml のみ): {}",
                path.display()
            );
        };
        Ok(Self::new(origin, path.display().to_string(), format, body))
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn format(&self) -> ContentFormat {
        self.format
    }
}

pub fn builtin_sources() -> Vec<ContentSource> {
    BUILTIN_SOURCES
        .iter()
        .map(|(origin, file, body)| {
            let format = ContentFormat::from_path(Path::new(file)).unwrap_or(ContentFormat::Json);
            ContentSource::new(*origin, *file, format, *body)
        })
        .collect()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PolicyBranchRaw {
    pub name: String,
    pub era: String,
    #[serde(default)]
    pub priorities: BTreeMap<String, i32>,
    #[serde(default)]
    pub uniques: Vec<String>,
    #[serde(default)]
    pub policies: Vec<PolicyRaw>,
    #[serde(default)]
    pub civilopedia_text: Vec<DocLine>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PolicyRaw {
    pub name: String,
    #[serde(default)]
    pub uniques: Vec<String>,
    #[serde(default)]
    pub requires: Vec<String>,
    pub row: Option<i32>,
    pub column: Option<i32>,
    #[serde(default)]
    pub civilopedia_text: Vec<DocLine>,
}

pub(crate) fn read_branches(source: &ContentSource) -> Result<Vec<PolicyBranchRaw>> {
    match source.format {
        ContentFormat::Json => serde_json::from_str(&source.body)
            .map_err(|err| anyhow!("JSON ファイル {} の解析に失敗しました: {}", source.file, err)),
        ContentFormat::Yaml => serde_yaml::from_str(&source.body)
            .map_err(|err| anyhow!("YAML ファイル {} の解析に失敗しました: {}", source.file, err)),
    }
}

/// Parses every unique of the branch and its policies; bad sentences stay on the node.
pub(crate) fn compile_branch(raw: PolicyBranchRaw, origin: &str, table: &TemplateTable) -> PolicyBranch {
    let branch = PolicyBranch::new(raw.name, raw.era)
        .with_priorities(raw.priorities)
        .with_uniques(table.parse_all(&raw.uniques))
        .with_authored(raw.civilopedia_text)
        .with_origin(origin);
    raw.policies.into_iter().fold(branch, |branch, policy| {
        branch.with_policy(compile_policy(policy, origin, table))
    })
}

fn compile_policy(raw: PolicyRaw, origin: &str, table: &TemplateTable) -> Policy {
    Policy::new(raw.name)
        .with_requires(raw.requires)
        .with_layout(raw.row, raw.column)
        .with_uniques(table.parse_all(&raw.uniques))
        .with_authored(raw.civilopedia_text)
        .with_origin(origin)
}

pub(crate) fn load_source(source: &ContentSource, table: &TemplateTable) -> Result<Vec<PolicyBranch>> {
    let raw = read_branches(source)
        .with_context(|| format!("コンテンツ '{}' を読み込めませんでした", source.origin))?;
    Ok(raw
        .into_iter()
        .map(|branch| compile_branch(branch, &source.origin, table))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> TemplateTable {
        TemplateTable::from_embedded().expect("built-in templates should load")
    }

    #[test]
    fn builtin_content_parses_cleanly() {
        let table = table();
        for source in builtin_sources() {
            let branches = load_source(&source, &table).expect("built-in content should load");
            assert!(!branches.is_empty());
            for branch in &branches {
                assert!(!branch.uniques().has_errors(), "{} has bad uniques", branch.name());
                for policy in branch.policies() {
                    assert!(
                        !policy.uniques().has_errors(),
                        "{} has bad uniques: {:?}",
                        policy.name(),
                        policy.uniques().errors().collect::<Vec<_>>()
                    );
                    assert_eq!(policy.origin(), Some(source.origin()));
                }
            }
        }
    }

    #[test]
    fn yaml_branch_keeps_declaration_order() {
        let source = ContentSource::new(
            "test",
            "test.yaml",
            ContentFormat::Yaml,
            r#"
- name: Honor
  era: Ancient era
  priorities: { Domination: 10 }
  uniques: ["[+33]% Strength <vs [Barbarian] units>"]
  policies:
    - name: Warrior Code
      uniques: ["Free [Great General] appears"]
      row: 1
      column: 1
    - name: Discipline
      requires: [Warrior Code, Warrior Code]
      row: 2
      column: 1
    - name: Honor Complete
"#,
        );
        let branches = load_source(&source, &table()).expect("yaml should load");
        let honor = &branches[0];
        let names: Vec<_> = honor.policies().iter().map(Policy::name).collect();
        assert_eq!(names, vec!["Warrior Code", "Discipline", "Honor Complete"]);
        assert_eq!(honor.policies()[1].requires(), ["Warrior Code"]);
        assert!(honor.policies()[2].is_completion());
        assert_eq!(honor.priorities().get("Domination"), Some(&10));
        assert_eq!(honor.origin(), Some("test"));
    }

    #[test]
    fn bad_uniques_do_not_abort_loading() {
        let source = ContentSource::new(
            "test",
            "test.json",
            ContentFormat::Json,
            r#"[{ "name": "Piety", "era": "Classical era",
                 "policies": [{ "name": "Reformation", "uniques": ["Units gain [+1] Movement"], "row": 1, "column": 1 }] }]"#,
        );
        let branches = load_source(&source, &table()).expect("json should load");
        assert!(branches[0].policies()[0].uniques().has_errors());
    }

    #[test]
    fn syntax_errors_are_reported() {
        let source = ContentSource::new("broken", "broken.json", ContentFormat::Json, "[{");
        let err = load_source(&source, &table()).expect_err("broken json");
        assert!(format!("{err:#}").contains("解析に失敗しました"));
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let err = ContentSource::from_file("base", Path::new("policies.toml"), "")
            .expect_err("toml is not supported");
        assert!(err.to_string().contains("policies.toml"));
    }
}
