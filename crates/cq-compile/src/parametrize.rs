//! # Parametrizer
//!
//! Post-pass over the visitor's accumulated text. Named markers such as
//! `[const0]` are discovered left to right, numbered from 1 in order of
//! textual occurrence, and rewritten to the positional marker `?`.
//!
//! Every occurrence counts: a name that appears twice gets two ordinals and
//! two `?`, so positional markers and ordinals always correspond 1:1.
//! Bracketed text that is not a registered name is left as is.

use std::collections::{BTreeSet, HashMap};

use cq_core::ValueHolder;

use crate::condition::ParameterMap;
use crate::naming;

/// Generated placeholder name → the value it stands for.
pub type PlaceholderTable = HashMap<String, ValueHolder>;

pub const MARKER_OPEN: char = '[';
pub const MARKER_CLOSE: char = ']';
pub const POSITIONAL: &str = "?";

/// Output of [`parametrize`].
#[derive(Debug, Clone, PartialEq)]
pub struct Parametrized {
    pub text: String,
    pub parameters: ParameterMap,
    /// Ordinals whose placeholder belonged to a pattern-content family.
    pub pattern_ordinals: BTreeSet<usize>,
    /// Byte offset in `text` of the positional marker for each ordinal,
    /// in ordinal order.
    pub marker_offsets: Vec<usize>,
}

/// Bracketed marker for a placeholder name.
pub fn marker(name: &str) -> String {
    format!("{}{}{}", MARKER_OPEN, name, MARKER_CLOSE)
}

/// Rewrite named markers to positional ones and build the ordinal map.
///
/// Pure: the same text and table always give the same result.
pub fn parametrize(text: &str, placeholders: &PlaceholderTable) -> Parametrized {
    let mut parameters = ParameterMap::new();
    let mut pattern_ordinals = BTreeSet::new();
    let mut marker_offsets = Vec::new();
    let mut out = String::with_capacity(text.len());
    let mut ordinal = 1;

    let mut fragments = text.split(MARKER_OPEN);
    // Text before the first marker can never hold a name.
    if let Some(head) = fragments.next() {
        out.push_str(head);
    }

    for fragment in fragments {
        let registered = fragment.find(MARKER_CLOSE).and_then(|end| {
            let candidate = &fragment[..end];
            placeholders
                .get(candidate)
                .map(|holder| (candidate, holder, &fragment[end + MARKER_CLOSE.len_utf8()..]))
        });

        match registered {
            Some((name, holder, rest)) => {
                parameters.insert(ordinal, holder.clone());
                if naming::is_pattern(name) {
                    pattern_ordinals.insert(ordinal);
                }
                ordinal += 1;
                marker_offsets.push(out.len());
                out.push_str(POSITIONAL);
                out.push_str(rest);
            }
            None => {
                out.push(MARKER_OPEN);
                out.push_str(fragment);
            }
        }
    }

    // Trimming never reaches a marker, so only the leading shift applies.
    let leading = out.len() - out.trim_start().len();
    for offset in &mut marker_offsets {
        *offset -= leading;
    }

    Parametrized {
        text: out.trim().to_string(),
        parameters,
        pattern_ordinals,
        marker_offsets,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cq_core::AttributeType;

    fn table(entries: &[(&str, ValueHolder)]) -> PlaceholderTable {
        entries
            .iter()
            .map(|(name, holder)| (name.to_string(), holder.clone()))
            .collect()
    }

    #[test]
    fn test_ordinals_follow_text_order() {
        let placeholders = table(&[
            ("const0", ValueHolder::constant("WSO2", AttributeType::String)),
            ("streamVar0", ValueHolder::attribute("price", AttributeType::Float)),
        ]);
        // streamVar0 was generated first but appears second in the text.
        let out = parametrize("(T.a = [streamVar0]) OR (T.b = [const0])", &placeholders);
        assert_eq!(out.text, "(T.a = ?) OR (T.b = ?)");
        assert_eq!(out.parameters.len(), 2);
        assert_eq!(
            out.parameters[&1],
            ValueHolder::attribute("price", AttributeType::Float)
        );
        assert_eq!(
            out.parameters[&2],
            ValueHolder::constant("WSO2", AttributeType::String)
        );
    }

    #[test]
    fn test_every_occurrence_gets_an_ordinal() {
        let placeholders = table(&[("const0", ValueHolder::constant(1, AttributeType::Int))]);
        let out = parametrize("[const0] + [const0]", &placeholders);
        assert_eq!(out.text, "? + ?");
        assert_eq!(out.parameters.keys().copied().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(out.parameters[&1], out.parameters[&2]);
    }

    #[test]
    fn test_unregistered_brackets_are_left_alone() {
        let placeholders = table(&[("const1", ValueHolder::constant(2, AttributeType::Long))]);
        let out = parametrize("x] [unknown] [const1] [", &placeholders);
        assert_eq!(out.text, "x] [unknown] ? [");
        assert_eq!(out.parameters.len(), 1);
        assert!(out.parameters.contains_key(&1));
    }

    #[test]
    fn test_parametrize_is_idempotent() {
        let placeholders = table(&[
            ("const0", ValueHolder::constant(5, AttributeType::Int)),
            ("pattern-value1", ValueHolder::constant("WS", AttributeType::String)),
        ]);
        let text = "((T.a > [const0]) AND CONTAINS(T.s, [pattern-value1]))";
        assert_eq!(parametrize(text, &placeholders), parametrize(text, &placeholders));
    }

    #[test]
    fn test_pattern_ordinals_are_recorded() {
        let placeholders = table(&[
            ("const0", ValueHolder::constant(5, AttributeType::Int)),
            ("pattern-value1", ValueHolder::constant("WS", AttributeType::String)),
        ]);
        let out = parametrize("[const0] [pattern-value1]", &placeholders);
        assert_eq!(out.pattern_ordinals.iter().copied().collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn test_positional_count_matches_ordinals() {
        let placeholders = table(&[
            ("const0", ValueHolder::constant(1, AttributeType::Int)),
            ("const1", ValueHolder::constant(2, AttributeType::Int)),
            ("streamVar0", ValueHolder::attribute("v", AttributeType::Long)),
        ]);
        let out = parametrize("[const0] [streamVar0] [const1] [const0]", &placeholders);
        assert_eq!(out.text.matches(POSITIONAL).count(), out.parameters.len());
        assert_eq!(out.parameters.len(), 4);
    }

    #[test]
    fn test_marker_offsets_point_at_generated_markers() {
        let placeholders = table(&[
            ("const0", ValueHolder::constant(1, AttributeType::Int)),
            ("streamVar0", ValueHolder::attribute("v", AttributeType::Long)),
        ]);
        // A literal `?` in the text is not a generated marker.
        let out = parametrize("  (T.a? = [const0]) OR (T.b = [streamVar0]) ", &placeholders);
        assert_eq!(out.text, "(T.a? = ?) OR (T.b = ?)");
        assert_eq!(out.marker_offsets, vec![8, 21]);
        for offset in &out.marker_offsets {
            assert_eq!(&out.text[*offset..*offset + 1], POSITIONAL);
        }
    }
}
