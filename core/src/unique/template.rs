use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow, bail, ensure};
use serde::Deserialize;

use super::parameter::ParameterType;
use super::scanner::{ScannedSentence, literal_key, scan};
use crate::error::MalformedReason;

const EMBEDDED_TEMPLATES: &str = include_str!("../../../config/uniques/templates.yaml");

/// Where a template may appear: as a top-level effect or inside `<...>`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UniqueTarget {
    #[default]
    Effect,
    Conditional,
}

impl fmt::Display for UniqueTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UniqueTarget::Effect => write!(f, "effect"),
            UniqueTarget::Conditional => write!(f, "conditional"),
        }
    }
}

/// One bracket position of a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slot {
    Parameter(ParameterType),
    Fixed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece {
    Literal(String),
    Slot(usize),
}

/// A canonical sentence shape such as `Free [unit] appears`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniqueTemplate {
    kind: String,
    text: String,
    target: UniqueTarget,
    skeleton: String,
    slots: Vec<Slot>,
    pieces: Vec<Piece>,
}

impl UniqueTemplate {
    pub fn new(kind: impl Into<String>, text: impl Into<String>, target: UniqueTarget) -> Result<Self> {
        let kind = kind.into();
        let text = text.into();
        ensure!(!kind.trim().is_empty(), "テンプレートの種類名が空です: {}", text);
        let scanned = scan(&text)
            .map_err(|reason| anyhow!("テンプレート '{}' の書式が不正です: {}", text, reason))?;
        ensure!(
            scanned.conditionals.is_empty(),
            "テンプレート '{}' に条件節を含めることはできません",
            text
        );
        let slots = scanned
            .segments
            .iter()
            .map(|segment| match ParameterType::from_name(segment) {
                Some(ty) => Slot::Parameter(ty),
                None => Slot::Fixed(segment.clone()),
            })
            .collect();
        let pieces = split_pieces(&text);
        Ok(Self {
            kind,
            text,
            target,
            skeleton: scanned.skeleton,
            slots,
            pieces,
        })
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn target(&self) -> UniqueTarget {
        self.target
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    /// Number of parameters a statement of this kind carries; fixed segments do not count.
    pub fn arity(&self) -> usize {
        self.parameter_types().count()
    }

    pub fn parameter_types(&self) -> impl Iterator<Item = ParameterType> + '_ {
        self.slots.iter().filter_map(|slot| match slot {
            Slot::Parameter(ty) => Some(*ty),
            Slot::Fixed(_) => None,
        })
    }

    pub(crate) fn skeleton(&self) -> &str {
        &self.skeleton
    }

    // Parameter types accept overlapping values, so only fixed segments tell same-skeleton templates apart.
    fn fixed_signature(&self) -> Vec<Option<&str>> {
        self.slots
            .iter()
            .map(|slot| match slot {
                Slot::Fixed(text) => Some(text.as_str()),
                Slot::Parameter(_) => None,
            })
            .collect()
    }

    fn fixed_segments_match(&self, segments: &[String]) -> bool {
        self.slots
            .iter()
            .zip(segments)
            .all(|(slot, segment)| match slot {
                Slot::Fixed(expected) => expected == segment,
                Slot::Parameter(_) => true,
            })
    }

    /// Checks the sentence's segments against the slots and keeps only the parameters.
    pub(crate) fn bind(&self, segments: Vec<String>) -> Result<Vec<String>, MalformedReason> {
        let mut parameters = Vec::with_capacity(self.slots.len());
        for (slot, segment) in self.slots.iter().zip(segments) {
            match slot {
                Slot::Fixed(expected) if *expected != segment => {
                    return Err(MalformedReason::FixedSegmentMismatch {
                        expected: expected.clone(),
                        found: segment,
                    });
                }
                Slot::Fixed(_) => {}
                Slot::Parameter(ty) if !ty.accepts(&segment) => {
                    return Err(MalformedReason::InvalidParameter {
                        index: parameters.len(),
                        expected: *ty,
                        value: segment,
                    });
                }
                Slot::Parameter(_) => parameters.push(segment),
            }
        }
        Ok(parameters)
    }

    /// Fills the template with bound parameters, dropping the brackets.
    pub(crate) fn render(&self, parameters: &[String]) -> String {
        let mut values = parameters.iter();
        let mut out = String::with_capacity(self.text.len());
        for piece in &self.pieces {
            match piece {
                Piece::Literal(text) => out.push_str(text),
                Piece::Slot(idx) => match &self.slots[*idx] {
                    Slot::Fixed(text) => out.push_str(text),
                    Slot::Parameter(_) => {
                        if let Some(value) = values.next() {
                            out.push_str(value);
                        }
                    }
                },
            }
        }
        super::scanner::normalize_whitespace(&out)
    }
}

fn split_pieces(text: &str) -> Vec<Piece> {
    let mut pieces = Vec::new();
    let mut literal = String::new();
    let mut slot = 0;
    let mut in_bracket = false;
    for ch in text.chars() {
        match ch {
            '[' => {
                if !literal.is_empty() {
                    pieces.push(Piece::Literal(std::mem::take(&mut literal)));
                }
                in_bracket = true;
            }
            ']' => {
                pieces.push(Piece::Slot(slot));
                slot += 1;
                in_bracket = false;
            }
            _ if in_bracket => {}
            _ => literal.push(ch),
        }
    }
    if !literal.is_empty() {
        pieces.push(Piece::Literal(literal));
    }
    pieces
}

#[derive(Debug, Deserialize)]
struct TemplateFile {
    #[serde(default)]
    templates: Vec<TemplateEntry>,
}

#[derive(Debug, Deserialize)]
struct TemplateEntry {
    kind: String,
    template: String,
    #[serde(default)]
    target: UniqueTarget,
}

type LookupKey = (UniqueTarget, String);

/// The vocabulary of known unique kinds, indexed by skeleton.
#[derive(Debug, Clone, Default)]
pub struct TemplateTable {
    templates: Vec<Arc<UniqueTemplate>>,
    by_kind: HashMap<String, usize>,
    by_skeleton: HashMap<LookupKey, Vec<usize>>,
    by_literals: HashMap<LookupKey, Vec<usize>>,
}

pub(crate) enum Resolution<'a> {
    Found(&'a Arc<UniqueTemplate>),
    FixedMismatch(&'a Arc<UniqueTemplate>),
    WrongArity(&'a Arc<UniqueTemplate>),
    Unknown,
}

impl TemplateTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in vocabulary shipped in `config/uniques/templates.yaml`.
    pub fn from_embedded() -> Result<Self> {
        let mut table = Self::new();
        table
            .extend_from_yaml(EMBEDDED_TEMPLATES)
            .context("組み込みユニークテンプレートの読み込みに失敗しました")?;
        Ok(table)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let mut table = Self::new();
        table.extend_from_yaml(content)?;
        Ok(table)
    }

    pub fn extend_from_yaml(&mut self, content: &str) -> Result<()> {
        let file: TemplateFile = serde_yaml::from_str(content)
            .context("ユニークテンプレート YAML の解析に失敗しました")?;
        for entry in file.templates {
            self.register(entry.kind, entry.template, entry.target)?;
        }
        Ok(())
    }

    pub fn register(
        &mut self,
        kind: impl Into<String>,
        text: impl Into<String>,
        target: UniqueTarget,
    ) -> Result<()> {
        let template = UniqueTemplate::new(kind, text, target)?;
        if self.by_kind.contains_key(template.kind()) {
            bail!("ユニークの種類 '{}' は既に登録されています", template.kind());
        }
        let skeleton_key = (target, template.skeleton().to_string());
        if let Some(existing) = self.by_skeleton.get(&skeleton_key).and_then(|ids| {
            ids.iter()
                .map(|&idx| &self.templates[idx])
                .find(|other| other.fixed_signature() == template.fixed_signature())
        }) {
            bail!(
                "テンプレート '{}' は '{}' と区別できません",
                template.text(),
                existing.text()
            );
        }
        let idx = self.templates.len();
        self.by_kind.insert(template.kind().to_string(), idx);
        self.by_skeleton.entry(skeleton_key).or_default().push(idx);
        self.by_literals
            .entry((target, literal_key(template.skeleton())))
            .or_default()
            .push(idx);
        self.templates.push(Arc::new(template));
        Ok(())
    }

    pub fn get(&self, kind: &str) -> Option<&UniqueTemplate> {
        self.by_kind
            .get(kind)
            .map(|&idx| self.templates[idx].as_ref())
    }

    pub fn templates(&self) -> impl Iterator<Item = &UniqueTemplate> {
        self.templates.iter().map(|template| template.as_ref())
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub(crate) fn resolve(&self, scanned: &ScannedSentence, target: UniqueTarget) -> Resolution<'_> {
        if let Some(ids) = self.by_skeleton.get(&(target, scanned.skeleton.clone())) {
            let candidates: Vec<_> = ids.iter().map(|&idx| &self.templates[idx]).collect();
            return match candidates
                .iter()
                .copied()
                .find(|template| template.fixed_segments_match(&scanned.segments))
            {
                Some(template) => Resolution::Found(template),
                None => Resolution::FixedMismatch(candidates[0]),
            };
        }
        // Equal bracket counts mean the brackets moved; that is an unknown shape.
        match self
            .by_literals
            .get(&(target, scanned.literal_key()))
            .and_then(|ids| {
                ids.iter()
                    .map(|&idx| &self.templates[idx])
                    .find(|template| template.slots().len() != scanned.segments.len())
            }) {
            Some(template) => Resolution::WrongArity(template),
            None => Resolution::Unknown,
        }
    }
}
