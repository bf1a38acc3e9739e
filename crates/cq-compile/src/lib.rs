//! # cq-compile — the condition compiler
//!
//! Translates a predicate tree ([`cq_core::Expr`]) into the parameterized
//! condition text understood by the document store, plus an ordinal map from
//! positional `?` slots to the values that fill them at execution time.
//!
//! ```text
//! Expr ──walk──▶ ConditionVisitor ──text + placeholders──▶ parametrize
//!                      │                                        │
//!                      └──── CorrelatedJoin (side-buffers) ─────┴──▶ CompiledCondition
//! ```
//!
//! The compiled artifact is immutable. Share it behind an `Arc` and bind it
//! against any number of in-flight events concurrently with [`bind`].

pub mod binding;
pub mod condition;
pub mod error;
pub mod naming;
pub mod parametrize;
pub mod query;
pub mod visitor;

pub use binding::{bind, BoundParameter, Event, QuerySpec};
pub use condition::{CompiledCondition, CorrelatedJoin, ParameterMap};
pub use error::{BindError, CompileError};
pub use parametrize::{parametrize, Parametrized, PlaceholderTable};
pub use query::{assemble_exists, assemble_query, assemble_select};
pub use visitor::{compile, CompileOptions, DEFAULT_SUBQUERY_ALIAS, SUPPORTED_FUNCTIONS};
