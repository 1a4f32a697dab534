use std::fmt;

use thiserror::Error;

use crate::unique::ParameterType;

/// Failure to turn a unique sentence into a [`UniqueStatement`](crate::UniqueStatement).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UniqueError {
    #[error("ユニーク '{text}' の書式が不正です: {reason}")]
    Malformed {
        text: String,
        reason: MalformedReason,
    },
    #[error("ユニーク '{text}' に一致するテンプレートがありません (骨格: '{skeleton}')")]
    UnknownKind { text: String, skeleton: String },
    #[error(
        "ユニーク '{text}' の括弧の数が '{kind}' と一致しません: 期待 {expected} 件, 実際 {found} 件"
    )]
    /// Counts are brackets: fixed segments included on the template side.
    ArityMismatch {
        text: String,
        kind: String,
        expected: usize,
        found: usize,
    },
    #[error("ユニーク '{text}' の条件節を解析できませんでした: {source}")]
    Conditional {
        text: String,
        #[source]
        source: Box<UniqueError>,
    },
}

impl UniqueError {
    /// The raw sentence that failed.
    pub fn text(&self) -> &str {
        match self {
            UniqueError::Malformed { text, .. }
            | UniqueError::UnknownKind { text, .. }
            | UniqueError::ArityMismatch { text, .. }
            | UniqueError::Conditional { text, .. } => text,
        }
    }

    /// Follows nested conditional failures down to the clause that actually broke.
    pub fn innermost(&self) -> &UniqueError {
        let mut current = self;
        while let UniqueError::Conditional { source, .. } = current {
            current = source;
        }
        current
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self.innermost(), UniqueError::Malformed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedReason {
    #[error("文が空です")]
    Empty,
    #[error("位置 {at} の '{open}' が閉じられていません")]
    Unclosed { open: char, at: usize },
    #[error("位置 {at} に対応する開き括弧のない '{close}' があります")]
    UnexpectedClose { close: char, at: usize },
    #[error("位置 {at} の '{found}' はここで入れ子にできません")]
    Nested { found: char, at: usize },
    #[error("固定部分 '[{expected}]' が必要ですが '[{found}]' が指定されました")]
    FixedSegmentMismatch { expected: String, found: String },
    #[error("{index} 番目の引数 '{value}' は {expected} として解釈できません")]
    InvalidParameter {
        index: usize,
        expected: ParameterType,
        value: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyKind {
    Branch,
    Policy,
}

impl fmt::Display for KeyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyKind::Branch => write!(f, "ポリシーブランチ"),
            KeyKind::Policy => write!(f, "ポリシー"),
        }
    }
}

/// Structural failure while indexing a policy graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("{kind}名 '{name}' が重複しています")]
    DuplicateKey { kind: KeyKind, name: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn innermost_unwraps_nested_conditionals() {
        let inner = UniqueError::UnknownKind {
            text: "when flying".into(),
            skeleton: "when flying".into(),
        };
        let outer = UniqueError::Conditional {
            text: "[+10]% Strength <when flying>".into(),
            source: Box::new(inner.clone()),
        };
        assert_eq!(outer.innermost(), &inner);
        assert_eq!(outer.text(), "[+10]% Strength <when flying>");
        assert!(!outer.is_malformed());
    }

    #[test]
    fn duplicate_key_message_names_the_key() {
        let err = GraphError::DuplicateKey {
            kind: KeyKind::Policy,
            name: "Legalism".into(),
        };
        assert!(err.to_string().contains("Legalism"));
        assert!(err.to_string().contains("ポリシー"));
    }
}
