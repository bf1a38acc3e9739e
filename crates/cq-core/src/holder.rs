//! Value holders: what a parameter slot resolves to at execution time.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{AttributeType, Literal};

/// A literal constant captured at compile time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constant {
    pub value: Literal,
    #[serde(rename = "type")]
    pub ty: AttributeType,
}

impl Constant {
    pub fn new(value: impl Into<Literal>, ty: AttributeType) -> Self {
        Self {
            value: value.into(),
            ty,
        }
    }
}

/// A reference to an attribute of the in-flight event, resolved per execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamAttribute {
    pub id: String,
    #[serde(rename = "type")]
    pub ty: AttributeType,
}

impl StreamAttribute {
    pub fn new(id: impl Into<String>, ty: AttributeType) -> Self {
        Self { id: id.into(), ty }
    }
}

/// The value filling one positional slot of a compiled condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "holder", rename_all = "snake_case")]
pub enum ValueHolder {
    Constant(Constant),
    Attribute(StreamAttribute),
}

impl ValueHolder {
    pub fn constant(value: impl Into<Literal>, ty: AttributeType) -> Self {
        Self::Constant(Constant::new(value, ty))
    }

    pub fn attribute(id: impl Into<String>, ty: AttributeType) -> Self {
        Self::Attribute(StreamAttribute::new(id, ty))
    }

    /// Declared type of the slot.
    pub fn ty(&self) -> AttributeType {
        match self {
            Self::Constant(c) => c.ty,
            Self::Attribute(a) => a.ty,
        }
    }
}

impl fmt::Display for ValueHolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constant(c) => write!(f, "Constant({}, {})", c.value, c.ty),
            Self::Attribute(a) => write!(f, "Attribute({}, {})", a.id, a.ty),
        }
    }
}
