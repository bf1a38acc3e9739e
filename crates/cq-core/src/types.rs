//! Declared attribute types and literal values.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Declared type of a stream or table attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeType {
    String,
    Int,
    Long,
    Float,
    Double,
    Bool,
    Object,
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => write!(f, "STRING"),
            Self::Int => write!(f, "INT"),
            Self::Long => write!(f, "LONG"),
            Self::Float => write!(f, "FLOAT"),
            Self::Double => write!(f, "DOUBLE"),
            Self::Bool => write!(f, "BOOL"),
            Self::Object => write!(f, "OBJECT"),
        }
    }
}

/// A literal value as it appears in a condition.
///
/// Deserialized untagged: `null`, `true`, `42`, `50.0` and `"WSO2"` map to
/// the obvious variants. Integral JSON numbers become [`Literal::Long`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    Null,
    Bool(bool),
    Long(i64),
    Double(f64),
    String(String),
}

impl Literal {
    /// JSON form used when binding parameters. `None` for NaN and infinities,
    /// which JSON cannot carry.
    pub fn to_json(&self) -> Option<serde_json::Value> {
        match self {
            Self::Null => Some(serde_json::Value::Null),
            Self::Bool(b) => Some(serde_json::Value::Bool(*b)),
            Self::Long(n) => Some(serde_json::Value::Number((*n).into())),
            Self::Double(d) => serde_json::Number::from_f64(*d).map(serde_json::Value::Number),
            Self::String(s) => Some(serde_json::Value::String(s.clone())),
        }
    }

    pub fn is_string(&self) -> bool {
        matches!(self, Self::String(_))
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Long(n) => write!(f, "{}", n),
            Self::Double(d) => write!(f, "{:?}", d),
            Self::String(s) => write!(f, "{:?}", s),
        }
    }
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Literal {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for Literal {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i32> for Literal {
    fn from(value: i32) -> Self {
        Self::Long(value.into())
    }
}

impl From<i64> for Literal {
    fn from(value: i64) -> Self {
        Self::Long(value)
    }
}

impl From<f32> for Literal {
    fn from(value: f32) -> Self {
        Self::Double(value.into())
    }
}

impl From<f64> for Literal {
    fn from(value: f64) -> Self {
        Self::Double(value)
    }
}
