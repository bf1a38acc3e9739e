//! # Runtime Binding
//!
//! Fills the ordinal slots of a compiled condition for one execution:
//! constants yield their stored literal, attributes read the in-flight
//! event. Binding only reads the condition, so one `Arc<CompiledCondition>`
//! serves any number of concurrent executions.
//!
//! The store takes named parameters, so [`QuerySpec`] renders the positional
//! markers as `@p1..@pN` in ordinal order. Marker positions come from the
//! parametrizer, never from re-scanning the text.

use cq_core::ValueHolder;
use serde::{Deserialize, Serialize};

use crate::condition::CompiledCondition;
use crate::error::BindError;
use crate::query::{assemble, projection};

/// Attribute values of the in-flight event, keyed by attribute id.
pub type Event = serde_json::Map<String, serde_json::Value>;

const PARAMETER_PREFIX: &str = "@p";

/// One filled slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundParameter {
    pub name: String,
    pub value: serde_json::Value,
}

/// A parameterized query ready for the store client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuerySpec {
    pub query: String,
    pub parameters: Vec<BoundParameter>,
}

impl QuerySpec {
    /// Assemble the statement and bind it against `event`. Membership
    /// conditions become a count query.
    pub fn build(condition: &CompiledCondition, event: &Event) -> Result<Self, BindError> {
        let parameters = bind(condition, event)?;
        let text = condition.named_text(parameter_name);
        let query = assemble(projection(condition), condition, &text);
        Ok(Self { query, parameters })
    }
}

fn parameter_name(ordinal: usize) -> String {
    format!("{}{}", PARAMETER_PREFIX, ordinal)
}

/// Resolve every ordinal, in order.
pub fn bind(condition: &CompiledCondition, event: &Event) -> Result<Vec<BoundParameter>, BindError> {
    condition
        .parameters()
        .iter()
        .map(|(&ordinal, holder)| -> Result<BoundParameter, BindError> {
            let value = match holder {
                ValueHolder::Constant(c) => c
                    .value
                    .to_json()
                    .ok_or(BindError::UnrepresentableValue { ordinal })?,
                ValueHolder::Attribute(a) => event
                    .get(&a.id)
                    .cloned()
                    .ok_or_else(|| BindError::MissingAttribute {
                        ordinal,
                        id: a.id.clone(),
                    })?,
            };

            if condition.is_pattern(ordinal) && !value.is_string() {
                return Err(BindError::PatternNotString { ordinal });
            }

            Ok(BoundParameter {
                name: parameter_name(ordinal),
                value,
            })
        })
        .collect()
}
