use std::str::CharIndices;

use crate::error::MalformedReason;

/// Marker left in a skeleton where a `[...]` segment was removed.
pub(crate) const PLACEHOLDER: &str = "[]";

/// A sentence split into its literal skeleton, bracket segments and conditional clauses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ScannedSentence {
    pub(crate) skeleton: String,
    pub(crate) segments: Vec<String>,
    pub(crate) conditionals: Vec<String>,
}

impl ScannedSentence {
    /// The skeleton with placeholders dropped, used to recognise a template whose segment count is off.
    pub(crate) fn literal_key(&self) -> String {
        literal_key(&self.skeleton)
    }
}

pub(crate) fn literal_key(skeleton: &str) -> String {
    normalize_whitespace(&skeleton.replace(PLACEHOLDER, " "))
}

pub(crate) fn scan(text: &str) -> Result<ScannedSentence, MalformedReason> {
    if text.trim().is_empty() {
        return Err(MalformedReason::Empty);
    }
    let mut skeleton = String::with_capacity(text.len());
    let mut segments = Vec::new();
    let mut conditionals = Vec::new();
    let mut chars = text.char_indices();
    while let Some((at, ch)) = chars.next() {
        match ch {
            '[' => {
                segments.push(read_segment(&mut chars, at)?);
                skeleton.push_str(PLACEHOLDER);
            }
            '<' => {
                conditionals.push(read_conditional(&mut chars, at)?);
                skeleton.push(' ');
            }
            ']' | '>' => return Err(MalformedReason::UnexpectedClose { close: ch, at }),
            _ => skeleton.push(ch),
        }
    }
    Ok(ScannedSentence {
        skeleton: normalize_whitespace(&skeleton),
        segments,
        conditionals,
    })
}

fn read_segment(chars: &mut CharIndices<'_>, open_at: usize) -> Result<String, MalformedReason> {
    let mut segment = String::new();
    for (at, ch) in chars.by_ref() {
        match ch {
            ']' => return Ok(segment.trim().to_string()),
            '[' | '<' => return Err(MalformedReason::Nested { found: ch, at }),
            '>' => return Err(MalformedReason::UnexpectedClose { close: ch, at }),
            _ => segment.push(ch),
        }
    }
    Err(MalformedReason::Unclosed {
        open: '[',
        at: open_at,
    })
}

// Brackets inside a conditional belong to the clause and are parsed again with it.
fn read_conditional(chars: &mut CharIndices<'_>, open_at: usize) -> Result<String, MalformedReason> {
    let mut clause = String::new();
    let mut bracket_at: Option<usize> = None;
    for (at, ch) in chars.by_ref() {
        match (ch, bracket_at) {
            ('>', None) => return Ok(clause.trim().to_string()),
            ('[', None) => bracket_at = Some(at),
            (']', Some(_)) => bracket_at = None,
            ('<', _) | ('[', Some(_)) => return Err(MalformedReason::Nested { found: ch, at }),
            (']', None) | ('>', Some(_)) => {
                return Err(MalformedReason::UnexpectedClose { close: ch, at });
            }
            _ => {}
        }
        clause.push(ch);
    }
    Err(match bracket_at {
        Some(at) => MalformedReason::Unclosed { open: '[', at },
        None => MalformedReason::Unclosed {
            open: '<',
            at: open_at,
        },
    })
}

pub(crate) fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_extracts_segments_in_order() {
        let scanned = scan("[+15]% Production when constructing [Melee] units [in all cities]")
            .expect("sentence should scan");
        assert_eq!(
            scanned.skeleton,
            "[]% Production when constructing [] units []"
        );
        assert_eq!(scanned.segments, vec!["+15", "Melee", "in all cities"]);
        assert!(scanned.conditionals.is_empty());
    }

    #[test]
    fn scan_keeps_conditional_brackets_for_the_clause() {
        let scanned = scan("[+25]% [Gold] [in all cities] <in cities with at least [5] [Population]>")
            .expect("sentence should scan");
        assert_eq!(scanned.skeleton, "[]% [] []");
        assert_eq!(scanned.segments, vec!["+25", "Gold", "in all cities"]);
        assert_eq!(
            scanned.conditionals,
            vec!["in cities with at least [5] [Population]"]
        );
    }

    #[test]
    fn scan_preserves_conditional_order() {
        let scanned = scan("[+15]% Strength <for [Melee] units> <when at war>")
            .expect("sentence should scan");
        assert_eq!(scanned.conditionals, vec!["for [Melee] units", "when at war"]);
        assert_eq!(scanned.skeleton, "[]% Strength");
    }

    #[test]
    fn scan_rejects_unclosed_brackets() {
        assert_eq!(
            scan("[+15]% Strength [in capital"),
            Err(MalformedReason::Unclosed { open: '[', at: 16 })
        );
        assert_eq!(
            scan("[+15]% Strength <when at war"),
            Err(MalformedReason::Unclosed { open: '<', at: 16 })
        );
        assert_eq!(
            scan("<for [Melee units>"),
            Err(MalformedReason::UnexpectedClose { close: '>', at: 17 })
        );
    }

    #[test]
    fn scan_rejects_nesting_outside_conditionals() {
        assert!(matches!(
            scan("[a [b]] units"),
            Err(MalformedReason::Nested { found: '[', .. })
        ));
        assert!(matches!(
            scan("[a <b>] units"),
            Err(MalformedReason::Nested { found: '<', .. })
        ));
        assert!(matches!(
            scan("<when <at> war>"),
            Err(MalformedReason::Nested { found: '<', .. })
        ));
    }

    #[test]
    fn scan_rejects_stray_closers_and_blank_text() {
        assert_eq!(
            scan("Free Settler] appears"),
            Err(MalformedReason::UnexpectedClose { close: ']', at: 12 })
        );
        assert_eq!(scan("   "), Err(MalformedReason::Empty));
    }

    #[test]
    fn literal_key_drops_placeholders() {
        let scanned = scan("[+15]% Production when constructing [Melee] units")
            .expect("sentence should scan");
        assert_eq!(scanned.literal_key(), "% Production when constructing units");
    }
}
