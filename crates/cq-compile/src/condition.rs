//! # Compiled Condition
//!
//! The immutable result of one compilation: final predicate text, the
//! ordinal parameter map, and the side-buffers of the correlated sub-query
//! rewrite. Built once, then only read. Safe to share across threads.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use cq_core::ValueHolder;
use serde::{Deserialize, Serialize};

use crate::parametrize::{Parametrized, POSITIONAL};

/// 1-based ordinal → value filling that positional slot.
pub type ParameterMap = BTreeMap<usize, ValueHolder>;

/// Side-buffers produced alongside the main predicate.
///
/// `outer_join` collects one fragment per correlated attribute, plain and
/// rewritten alike. `sub_select` and `aggregate_join` are only populated by
/// the "most recent value" rewrite: the aggregate sub-select projects
/// nothing but `MAX_<key>` columns, so only `aggregate_join` may be used as
/// its `ON` clause.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrelatedJoin {
    pub alias: String,
    pub sub_select: Vec<String>,
    pub outer_join: Vec<String>,
    #[serde(default)]
    pub aggregate_join: Vec<String>,
}

impl CorrelatedJoin {
    pub fn new(alias: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            sub_select: Vec::new(),
            outer_join: Vec::new(),
            aggregate_join: Vec::new(),
        }
    }

    /// Projection list of the aggregate sub-select.
    pub fn sub_select_text(&self) -> String {
        self.sub_select.join(", ")
    }

    /// Join predicate between the table and the sub-select.
    pub fn outer_join_text(&self) -> String {
        self.outer_join.join(" AND ")
    }

    /// Join predicate between the table and the aggregate sub-select.
    pub fn aggregate_join_text(&self) -> String {
        self.aggregate_join.join(" AND ")
    }

    /// Whether the aggregate sub-query rewrite was applied.
    pub fn is_rewritten(&self) -> bool {
        !self.sub_select.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledCondition {
    table: String,
    text: String,
    parameters: ParameterMap,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pattern_ordinals: BTreeSet<usize>,
    #[serde(default)]
    marker_offsets: Vec<usize>,
    join: CorrelatedJoin,
    /// Root is an `IN` membership test; the text is only meaningful inside
    /// a count query.
    #[serde(default)]
    membership: bool,
}

impl CompiledCondition {
    pub fn new(table: impl Into<String>, parametrized: Parametrized, join: CorrelatedJoin) -> Self {
        let Parametrized {
            text,
            parameters,
            pattern_ordinals,
            marker_offsets,
        } = parametrized;
        Self {
            table: table.into(),
            text,
            parameters,
            pattern_ordinals,
            marker_offsets,
            join,
            membership: false,
        }
    }

    pub fn membership(mut self, membership: bool) -> Self {
        self.membership = membership;
        self
    }

    /// Table (collection) the condition was compiled against.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Final predicate text with positional `?` markers.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn parameters(&self) -> &ParameterMap {
        &self.parameters
    }

    pub fn parameter_count(&self) -> usize {
        self.parameters.len()
    }

    /// Whether the slot holds `str:contains` pattern content.
    pub fn is_pattern(&self, ordinal: usize) -> bool {
        self.pattern_ordinals.contains(&ordinal)
    }

    pub fn join(&self) -> &CorrelatedJoin {
        &self.join
    }

    pub fn is_membership(&self) -> bool {
        self.membership
    }

    /// Text with each generated positional marker replaced by `name(ordinal)`.
    /// Only the recorded marker positions are rewritten; any other `?` in
    /// the text is kept.
    pub fn named_text(&self, name: impl Fn(usize) -> String) -> String {
        let mut out = String::with_capacity(self.text.len() + 4 * self.marker_offsets.len());
        let mut last = 0;
        for (index, &offset) in self.marker_offsets.iter().enumerate() {
            let Some(head) = self.text.get(last..offset) else {
                continue;
            };
            if !self.text[offset..].starts_with(POSITIONAL) {
                continue;
            }
            out.push_str(head);
            out.push_str(&name(index + 1));
            last = offset + POSITIONAL.len();
        }
        out.push_str(&self.text[last..]);
        out
    }
}

impl fmt::Display for CompiledCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}
