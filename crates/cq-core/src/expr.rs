//! # Predicate Tree
//!
//! The structured condition supplied by the host query engine. The compiler
//! consumes it read-only; it never owns or rewrites a tree.
//!
//! JSON form is tagged by `kind`:
//!
//! ```text
//! { "kind": "compare", "op": "equal",
//!   "left":  { "kind": "store_variable", "store_id": "FooTable", "attribute": "symbol", "type": "string" },
//!   "right": { "kind": "constant", "value": "WSO2", "type": "string" } }
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{AttributeType, Literal};

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    Equal,
    NotEqual,
    GreaterThan,
    GreaterThanEqual,
    LessThan,
    LessThanEqual,
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Equal => write!(f, "=="),
            Self::NotEqual => write!(f, "!="),
            Self::GreaterThan => write!(f, ">"),
            Self::GreaterThanEqual => write!(f, ">="),
            Self::LessThan => write!(f, "<"),
            Self::LessThanEqual => write!(f, "<="),
        }
    }
}

/// Arithmetic operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MathOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Mod,
}

impl fmt::Display for MathOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Add => write!(f, "+"),
            Self::Subtract => write!(f, "-"),
            Self::Multiply => write!(f, "*"),
            Self::Divide => write!(f, "/"),
            Self::Mod => write!(f, "%"),
        }
    }
}

/// A node of the predicate tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Expr {
    And {
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Or {
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Not {
        operand: Box<Expr>,
    },
    Compare {
        op: CompareOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    IsNull {
        operand: Box<Expr>,
    },
    /// Membership of `operand` in the store `store_id`.
    In {
        store_id: String,
        operand: Box<Expr>,
    },
    Math {
        op: MathOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Function application. An absent or blank namespace means unqualified.
    Function {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        namespace: Option<String>,
        name: String,
        #[serde(default)]
        args: Vec<Expr>,
    },
    Constant {
        value: Literal,
        #[serde(rename = "type")]
        ty: AttributeType,
    },
    /// Attribute of the in-flight event, bound per execution.
    StreamVariable {
        id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        stream_id: Option<String>,
        #[serde(rename = "type")]
        ty: AttributeType,
    },
    /// Attribute of the table being matched against.
    StoreVariable {
        store_id: String,
        attribute: String,
        #[serde(rename = "type")]
        ty: AttributeType,
    },
}

impl Expr {
    pub fn and(left: Expr, right: Expr) -> Self {
        Self::And {
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn or(left: Expr, right: Expr) -> Self {
        Self::Or {
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn not(operand: Expr) -> Self {
        Self::Not {
            operand: Box::new(operand),
        }
    }

    pub fn compare(op: CompareOp, left: Expr, right: Expr) -> Self {
        Self::Compare {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn is_null(operand: Expr) -> Self {
        Self::IsNull {
            operand: Box::new(operand),
        }
    }

    pub fn within(store_id: impl Into<String>, operand: Expr) -> Self {
        Self::In {
            store_id: store_id.into(),
            operand: Box::new(operand),
        }
    }

    pub fn math(op: MathOp, left: Expr, right: Expr) -> Self {
        Self::Math {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn function(namespace: Option<&str>, name: impl Into<String>, args: Vec<Expr>) -> Self {
        Self::Function {
            namespace: namespace.map(str::to_string),
            name: name.into(),
            args,
        }
    }

    pub fn constant(value: impl Into<Literal>, ty: AttributeType) -> Self {
        Self::Constant {
            value: value.into(),
            ty,
        }
    }

    pub fn stream_var(id: impl Into<String>, ty: AttributeType) -> Self {
        Self::StreamVariable {
            id: id.into(),
            stream_id: None,
            ty,
        }
    }

    pub fn store_var(store_id: impl Into<String>, attribute: impl Into<String>, ty: AttributeType) -> Self {
        Self::StoreVariable {
            store_id: store_id.into(),
            attribute: attribute.into(),
            ty,
        }
    }

    /// Every table attribute name referenced anywhere in the tree, in
    /// walk order.
    pub fn store_attributes(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_store_attributes(&mut out);
        out
    }

    fn collect_store_attributes<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::And { left, right }
            | Self::Or { left, right }
            | Self::Compare { left, right, .. }
            | Self::Math { left, right, .. } => {
                left.collect_store_attributes(out);
                right.collect_store_attributes(out);
            }
            Self::Not { operand } | Self::IsNull { operand } | Self::In { operand, .. } => {
                operand.collect_store_attributes(out)
            }
            Self::Function { args, .. } => {
                for arg in args {
                    arg.collect_store_attributes(out);
                }
            }
            Self::StoreVariable { attribute, .. } => out.push(attribute),
            Self::Constant { .. } | Self::StreamVariable { .. } => {}
        }
    }
}

/// Renders the tree back in query-language form, mainly for logs.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::And { left, right } => write!(f, "({} and {})", left, right),
            Self::Or { left, right } => write!(f, "({} or {})", left, right),
            Self::Not { operand } => write!(f, "not ({})", operand),
            Self::Compare { op, left, right } => write!(f, "({} {} {})", left, op, right),
            Self::IsNull { operand } => write!(f, "{} is null", operand),
            Self::In { store_id, operand } => write!(f, "{} in {}", operand, store_id),
            Self::Math { op, left, right } => write!(f, "({} {} {})", left, op, right),
            Self::Function {
                namespace,
                name,
                args,
            } => {
                match namespace.as_deref().map(str::trim) {
                    Some(ns) if !ns.is_empty() => write!(f, "{}:{}(", ns, name)?,
                    _ => write!(f, "{}(", name)?,
                }
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            Self::Constant { value, .. } => write!(f, "{}", value),
            Self::StreamVariable { id, .. } => write!(f, "{}", id),
            Self::StoreVariable {
                store_id,
                attribute,
                ..
            } => write!(f, "{}.{}", store_id, attribute),
        }
    }
}
