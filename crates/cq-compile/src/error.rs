//! Compiler and binding errors.

use thiserror::Error as ThisError;

///
/// CompileError
///
/// Static failures of an input predicate tree. Deterministic, never retried;
/// the host rejects the query at compile time.
///

#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum CompileError {
    #[error(
        "conditions support only sum(), avg(), min(), max(), str:contains() and \
         incrementalAggregator:last(), but function '{name}' was specified"
    )]
    UnsupportedFunction { name: String },

    #[error("incrementalAggregator:last() cannot be lowered: {reason}")]
    MalformedLastValue { reason: String },
}

impl CompileError {
    pub(crate) fn unsupported(namespace: Option<&str>, name: &str) -> Self {
        let name = match namespace.map(str::trim) {
            Some(ns) if !ns.is_empty() => format!("{}:{}", ns, name),
            _ => name.to_string(),
        };
        Self::UnsupportedFunction { name }
    }

    pub(crate) fn malformed_last(reason: impl Into<String>) -> Self {
        Self::MalformedLastValue {
            reason: reason.into(),
        }
    }
}

///
/// BindError
///
/// Failures while filling the ordinal slots for one execution.
///

#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum BindError {
    #[error("parameter {ordinal}: event has no attribute '{id}'")]
    MissingAttribute { ordinal: usize, id: String },

    #[error("parameter {ordinal}: value has no JSON representation")]
    UnrepresentableValue { ordinal: usize },

    #[error("parameter {ordinal}: pattern content must be a string")]
    PatternNotString { ordinal: usize },
}
