//! # cq-core — the condition model
//!
//! Plain data shared by the compiler, the hub and the CLI:
//!
//! - [`Expr`]: the predicate tree handed over by the host query engine.
//! - [`AttributeType`] and [`Literal`]: declared types and literal values.
//! - [`ValueHolder`]: what a positional parameter slot resolves to at run
//!   time, either a [`Constant`] known at compile time or a
//!   [`StreamAttribute`] read from the in-flight event.
//!
//! Nothing in here has behaviour beyond construction, rendering and serde.

pub mod expr;
pub mod holder;
pub mod types;

pub use expr::{CompareOp, Expr, MathOp};
pub use holder::{Constant, StreamAttribute, ValueHolder};
pub use types::{AttributeType, Literal};
