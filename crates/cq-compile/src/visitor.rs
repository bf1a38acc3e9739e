//! # Condition Visitor
//!
//! Single-pass, depth-first walk over a predicate tree that accumulates:
//!
//! - the condition text, with a bracketed marker (`[const0]`) wherever a
//!   value is only known at execution time,
//! - the placeholder table mapping each marker name to its [`ValueHolder`],
//! - the [`CorrelatedJoin`] side-buffers.
//!
//! [`compile`] then runs the parametrizer and packages everything into a
//! [`CompiledCondition`].
//!
//! ## Emission rules
//!
//! | Node                   | Text                                          |
//! |------------------------|-----------------------------------------------|
//! | `a and b` / `a or b`   | `((a) AND b)` / `((a) OR b)`                  |
//! | `not a`                | `NOT (a)`                                     |
//! | `a op b` (compare/math)| `(a op b)`                                    |
//! | `a is null`            | `a IS NULL`                                   |
//! | `a in T`               | `IN a`                                        |
//! | `sum(x)` etc.          | `sum(x)`                                      |
//! | `str:contains(x, p)`   | `CONTAINS(x, p)`, `p` in the pattern family   |
//! | constant / stream var  | `[name]` → `?`                                |
//! | table attribute        | `T.attr` (bare `attr` after a select clause)  |
//!
//! ## "Most recent value" rewrite
//!
//! `incrementalAggregator:last` cannot be an inline predicate. Its operands
//! are collected on a pending stack instead of being emitted: first the value
//! attribute, then the join key, either the call's second argument or the
//! table attribute on the other side of an enclosing `==`. On completion:
//!
//! ```text
//! sub-select  MAX(T.key) AS MAX_key
//! outer join  T.key = S.MAX_key
//! main text   MAX(T.value)
//! ```

use cq_core::{CompareOp, Constant, Expr, MathOp, ValueHolder};
use serde::{Deserialize, Serialize};

use crate::condition::{CompiledCondition, CorrelatedJoin};
use crate::error::CompileError;
use crate::naming::PlaceholderNames;
use crate::parametrize::{marker, parametrize, PlaceholderTable};

/// Every function a condition may call, in diagnostic form.
pub const SUPPORTED_FUNCTIONS: [&str; 6] = [
    "sum",
    "avg",
    "min",
    "max",
    "str:contains",
    "incrementalAggregator:last",
];

const AGGREGATES: [&str; 4] = ["sum", "avg", "min", "max"];

pub const DEFAULT_SUBQUERY_ALIAS: &str = "S";

// =============================================================================
// Tokens
// =============================================================================

const OPEN: &str = "(";
const CLOSE: &str = ")";
const ARG_SEPARATOR: &str = ",";
const SQL_AND: &str = "AND";
const SQL_OR: &str = "OR";
const SQL_NOT: &str = "NOT";
const SQL_IS_NULL: &str = "IS NULL";
const SQL_IN: &str = "IN";
const SQL_CONTAINS: &str = "CONTAINS(";
const SQL_MAX: &str = "MAX";
const MAX_ALIAS_PREFIX: &str = "MAX_";

fn compare_token(op: CompareOp) -> &'static str {
    match op {
        CompareOp::Equal => "=",
        CompareOp::NotEqual => "!=",
        CompareOp::GreaterThan => ">",
        CompareOp::GreaterThanEqual => ">=",
        CompareOp::LessThan => "<",
        CompareOp::LessThanEqual => "<=",
    }
}

fn math_token(op: MathOp) -> &'static str {
    match op {
        MathOp::Add => "+",
        MathOp::Subtract => "-",
        MathOp::Multiply => "*",
        MathOp::Divide => "/",
        MathOp::Mod => "%",
    }
}

// =============================================================================
// Options
// =============================================================================

/// Compile-time parameters of one compilation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileOptions {
    /// Target table (collection) name.
    pub table: String,
    /// Compiling after a projection clause: table attributes are emitted
    /// bare and no correlated-join fragments are produced.
    #[serde(default)]
    pub after_select: bool,
    #[serde(default = "default_subquery_alias")]
    pub subquery_alias: String,
}

fn default_subquery_alias() -> String {
    DEFAULT_SUBQUERY_ALIAS.to_string()
}

impl CompileOptions {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            after_select: false,
            subquery_alias: default_subquery_alias(),
        }
    }

    pub fn after_select(mut self, after_select: bool) -> Self {
        self.after_select = after_select;
        self
    }

    pub fn subquery_alias(mut self, alias: impl Into<String>) -> Self {
        self.subquery_alias = alias.into();
        self
    }
}

// =============================================================================
// Function dispatch
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FunctionKind {
    Aggregate,
    Contains,
    LastValue,
}

fn classify(namespace: Option<&str>, name: &str) -> Result<FunctionKind, CompileError> {
    match namespace.map(str::trim).filter(|ns| !ns.is_empty()) {
        None if AGGREGATES.contains(&name) => Ok(FunctionKind::Aggregate),
        Some("str") if name == "contains" => Ok(FunctionKind::Contains),
        Some("incrementalAggregator") if name == "last" => Ok(FunctionKind::LastValue),
        _ => Err(CompileError::unsupported(namespace, name)),
    }
}

/// `incrementalAggregator:last(x)` with a single argument.
fn is_single_last(expr: &Expr) -> bool {
    match expr {
        Expr::Function {
            namespace,
            name,
            args,
        } => {
            args.len() == 1
                && classify(namespace.as_deref(), name) == Ok(FunctionKind::LastValue)
        }
        _ => false,
    }
}

/// Join key an equality comparison supplies to a single-argument `last`.
fn correlated_key(op: CompareOp, left: &Expr, right: &Expr) -> Option<String> {
    if op != CompareOp::Equal {
        return None;
    }
    match (left, right) {
        (last, Expr::StoreVariable { attribute, .. }) if is_single_last(last) => {
            Some(attribute.clone())
        }
        (Expr::StoreVariable { attribute, .. }, last) if is_single_last(last) => {
            Some(attribute.clone())
        }
        _ => None,
    }
}

// =============================================================================
// Walk context
// =============================================================================

/// Control state threaded through one walk. Each field is set by a parent
/// node for the duration of a sub-walk and restored afterwards.
#[derive(Debug, Default)]
struct Walk {
    /// Inside `str:contains`: the next constant or stream variable is
    /// pattern content. Consumed once.
    pattern_next: bool,
    /// Pending operand stack while lowering `incrementalAggregator:last`.
    operands: Option<Vec<String>>,
    /// Join key handed to a single-argument `last` by its enclosing `==`.
    join_key: Option<String>,
    /// Emitting the attribute already consumed as a join key.
    key_operand: bool,
}

// =============================================================================
// Visitor
// =============================================================================

/// Compiles one predicate tree. Single use: visit one tree, then call
/// [`return_condition`](Self::return_condition). Reached through [`compile`].
#[derive(Debug)]
pub(crate) struct ConditionVisitor {
    options: CompileOptions,
    text: String,
    placeholders: PlaceholderTable,
    names: PlaceholderNames,
    join: CorrelatedJoin,
    membership: bool,
}

impl ConditionVisitor {
    pub(crate) fn new(options: CompileOptions) -> Self {
        let join = CorrelatedJoin::new(options.subquery_alias.clone());
        Self {
            options,
            text: String::new(),
            placeholders: PlaceholderTable::new(),
            names: PlaceholderNames::new(),
            join,
            membership: false,
        }
    }

    /// Walk the whole tree. On error the visitor must be discarded.
    pub(crate) fn visit(&mut self, expr: &Expr) -> Result<(), CompileError> {
        self.membership = matches!(expr, Expr::In { .. });
        let mut walk = Walk::default();
        self.walk(expr, &mut walk)
    }

    /// Parametrize the accumulated text and package the result.
    pub(crate) fn return_condition(self) -> CompiledCondition {
        let parametrized = parametrize(&self.text, &self.placeholders);

        tracing::debug!(
            "Compiled condition for {}: {} ({} parameters, rewritten: {})",
            self.options.table,
            parametrized.text,
            parametrized.parameters.len(),
            self.join.is_rewritten()
        );

        CompiledCondition::new(self.options.table, parametrized, self.join).membership(self.membership)
    }

    fn walk(&mut self, expr: &Expr, walk: &mut Walk) -> Result<(), CompileError> {
        if walk.operands.is_some() && !matches!(expr, Expr::StoreVariable { .. }) {
            return Err(CompileError::malformed_last(format!(
                "arguments must be table attributes, found '{}'",
                expr
            )));
        }

        match expr {
            Expr::And { left, right } => self.connective(SQL_AND, left, right, walk),
            Expr::Or { left, right } => self.connective(SQL_OR, left, right, walk),
            Expr::Not { operand } => {
                self.push(SQL_NOT);
                self.push(OPEN);
                self.walk(operand, walk)?;
                self.push(CLOSE);
                Ok(())
            }
            Expr::Compare { op, left, right } => {
                let key = correlated_key(*op, left, right);
                self.push(OPEN);
                self.compare_operand(left, key.as_deref(), walk)?;
                self.push(compare_token(*op));
                self.compare_operand(right, key.as_deref(), walk)?;
                self.push(CLOSE);
                Ok(())
            }
            Expr::IsNull { operand } => {
                self.walk(operand, walk)?;
                self.push(SQL_IS_NULL);
                Ok(())
            }
            Expr::In { operand, .. } => {
                self.push(SQL_IN);
                self.walk(operand, walk)
            }
            Expr::Math { op, left, right } => {
                self.push(OPEN);
                self.walk(left, walk)?;
                self.push(math_token(*op));
                self.walk(right, walk)?;
                self.push(CLOSE);
                Ok(())
            }
            Expr::Function {
                namespace,
                name,
                args,
            } => self.function(namespace.as_deref(), name, args, walk),
            Expr::Constant { value, ty } => {
                let pattern = std::mem::take(&mut walk.pattern_next);
                let name = self.names.constant(pattern);
                self.register(name, ValueHolder::Constant(Constant::new(value.clone(), *ty)));
                Ok(())
            }
            Expr::StreamVariable { id, ty, .. } => {
                let pattern = std::mem::take(&mut walk.pattern_next);
                let name = self.names.stream_var(pattern);
                self.register(name, ValueHolder::attribute(id.clone(), *ty));
                Ok(())
            }
            Expr::StoreVariable { attribute, .. } => {
                self.store_variable(attribute, walk);
                Ok(())
            }
        }
    }

    fn connective(
        &mut self,
        keyword: &str,
        left: &Expr,
        right: &Expr,
        walk: &mut Walk,
    ) -> Result<(), CompileError> {
        self.push(OPEN);
        self.push(OPEN);
        self.walk(left, walk)?;
        self.push(CLOSE);
        self.push(keyword);
        self.walk(right, walk)?;
        self.push(CLOSE);
        Ok(())
    }

    fn compare_operand(
        &mut self,
        operand: &Expr,
        key: Option<&str>,
        walk: &mut Walk,
    ) -> Result<(), CompileError> {
        match key {
            None => self.walk(operand, walk),
            Some(_) if matches!(operand, Expr::StoreVariable { .. }) => {
                let saved = std::mem::replace(&mut walk.key_operand, true);
                let result = self.walk(operand, walk);
                walk.key_operand = saved;
                result
            }
            Some(key) => {
                let saved = walk.join_key.replace(key.to_string());
                let result = self.walk(operand, walk);
                walk.join_key = saved;
                result
            }
        }
    }

    fn function(
        &mut self,
        namespace: Option<&str>,
        name: &str,
        args: &[Expr],
        walk: &mut Walk,
    ) -> Result<(), CompileError> {
        let kind = match classify(namespace, name) {
            Ok(kind) => kind,
            Err(e) => {
                tracing::debug!("Rejecting condition: {}", e);
                return Err(e);
            }
        };

        match kind {
            FunctionKind::Aggregate => {
                self.push(&format!("{}{}", name, OPEN));
                self.arguments(args, walk)?;
                self.push(CLOSE);
            }
            FunctionKind::Contains => {
                self.push(SQL_CONTAINS);
                let saved = std::mem::replace(&mut walk.pattern_next, true);
                let result = self.arguments(args, walk);
                walk.pattern_next = saved;
                result?;
                self.push(CLOSE);
            }
            FunctionKind::LastValue => self.last_value(args, walk)?,
        }
        Ok(())
    }

    fn arguments(&mut self, args: &[Expr], walk: &mut Walk) -> Result<(), CompileError> {
        for (i, arg) in args.iter().enumerate() {
            if i > 0 {
                self.push(ARG_SEPARATOR);
            }
            self.walk(arg, walk)?;
        }
        Ok(())
    }

    fn last_value(&mut self, args: &[Expr], walk: &mut Walk) -> Result<(), CompileError> {
        let join_key = walk.join_key.take();

        let saved = walk.operands.replace(Vec::new());
        let collected = args.iter().try_for_each(|arg| self.walk(arg, walk));
        let mut operands = std::mem::replace(&mut walk.operands, saved).unwrap_or_default();
        collected?;

        if let Some(key) = join_key {
            if operands.len() == 1 {
                operands.push(key);
            }
        }

        let found = operands.len();
        let (Some(key), Some(value), true) = (operands.pop(), operands.pop(), operands.is_empty())
        else {
            return Err(CompileError::malformed_last(format!(
                "expected a value attribute and a join attribute, found {} attribute(s)",
                found
            )));
        };

        let table = &self.options.table;
        let alias = &self.join.alias;
        let projection = format!("{SQL_MAX}({table}.{key}) AS {MAX_ALIAS_PREFIX}{key}");
        let join = format!("{table}.{key} = {alias}.{MAX_ALIAS_PREFIX}{key}");
        let substitute = format!("{SQL_MAX}({table}.{value})");

        tracing::debug!(
            "Lowering incrementalAggregator:last({}) joined on {}",
            value,
            key
        );
        self.join.sub_select.push(projection);
        self.join.aggregate_join.push(join.clone());
        self.join.outer_join.push(join);
        self.push(&substitute);
        Ok(())
    }

    fn store_variable(&mut self, attribute: &str, walk: &mut Walk) {
        if let Some(operands) = walk.operands.as_mut() {
            operands.push(attribute.to_string());
            return;
        }

        if self.options.after_select {
            self.push(attribute);
            return;
        }

        let table = &self.options.table;
        let qualified = format!("{table}.{attribute}");
        let join = format!("{table}.{attribute} = {}.{attribute}", self.join.alias);
        self.push(&qualified);
        if !walk.key_operand {
            self.join.outer_join.push(join);
        }
    }

    fn register(&mut self, name: String, holder: ValueHolder) {
        tracing::trace!("Placeholder {} -> {}", name, holder);
        self.push(&marker(&name));
        self.placeholders.insert(name, holder);
    }

    /// Append a token, separated by one space except after `(` and before
    /// `)` or `,`.
    fn push(&mut self, token: &str) {
        let glued = self.text.is_empty()
            || self.text.ends_with(OPEN)
            || token.starts_with(CLOSE)
            || token.starts_with(ARG_SEPARATOR);
        if !glued {
            self.text.push(' ');
        }
        self.text.push_str(token);
    }
}

/// Compile a predicate tree.
pub fn compile(expr: &Expr, options: CompileOptions) -> Result<CompiledCondition, CompileError> {
    let mut visitor = ConditionVisitor::new(options);
    visitor.visit(expr)?;
    Ok(visitor.return_condition())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cq_core::AttributeType;

    const TABLE: &str = "FooTable";

    fn store(attr: &str, ty: AttributeType) -> Expr {
        Expr::store_var(TABLE, attr, ty)
    }

    fn last(args: Vec<Expr>) -> Expr {
        Expr::function(Some("incrementalAggregator"), "last", args)
    }

    fn options() -> CompileOptions {
        CompileOptions::new(TABLE)
    }

    #[test]
    fn test_and_of_comparisons() {
        let expr = Expr::and(
            Expr::compare(
                CompareOp::Equal,
                store("symbol", AttributeType::String),
                Expr::constant("WSO2", AttributeType::String),
            ),
            Expr::compare(
                CompareOp::GreaterThan,
                store("price", AttributeType::Float),
                Expr::constant(50.0, AttributeType::Float),
            ),
        );
        let compiled = compile(&expr, options()).unwrap();

        assert_eq!(
            compiled.text(),
            "(((FooTable.symbol = ?)) AND (FooTable.price > ?))"
        );
        assert_eq!(compiled.parameter_count(), 2);
        assert_eq!(
            compiled.parameters()[&1],
            ValueHolder::constant("WSO2", AttributeType::String)
        );
        assert_eq!(
            compiled.parameters()[&2],
            ValueHolder::constant(50.0, AttributeType::Float)
        );
    }

    #[test]
    fn test_membership_with_stream_variable() {
        let expr = Expr::within(
            TABLE,
            Expr::compare(
                CompareOp::Equal,
                store("symbol", AttributeType::String),
                Expr::stream_var("symbol", AttributeType::String),
            ),
        );
        let compiled = compile(&expr, options()).unwrap();

        assert_eq!(compiled.text(), "IN (FooTable.symbol = ?)");
        assert_eq!(
            compiled.parameters()[&1],
            ValueHolder::attribute("symbol", AttributeType::String)
        );
        assert_eq!(compiled.join().outer_join, vec!["FooTable.symbol = S.symbol"]);
        assert!(!compiled.join().is_rewritten());
        assert!(compiled.is_membership());
    }

    #[test]
    fn test_last_value_joined_by_equality() {
        let expr = Expr::compare(
            CompareOp::Equal,
            last(vec![store("price", AttributeType::Float)]),
            store("price", AttributeType::Float),
        );
        let compiled = compile(&expr, options()).unwrap();

        assert!(compiled.text().contains("MAX(FooTable.price)"));
        assert_eq!(compiled.text(), "(MAX(FooTable.price) = FooTable.price)");
        assert_eq!(compiled.join().sub_select_text(), "MAX(FooTable.price) AS MAX_price");
        assert_eq!(compiled.join().outer_join_text(), "FooTable.price = S.MAX_price");
        assert_eq!(compiled.parameter_count(), 0);
    }

    #[test]
    fn test_last_value_key_on_left_side() {
        let expr = Expr::compare(
            CompareOp::Equal,
            store("symbol", AttributeType::String),
            last(vec![store("price", AttributeType::Float)]),
        );
        let compiled = compile(&expr, options()).unwrap();

        assert_eq!(compiled.text(), "(FooTable.symbol = MAX(FooTable.price))");
        assert_eq!(compiled.join().sub_select, vec!["MAX(FooTable.symbol) AS MAX_symbol"]);
        assert_eq!(compiled.join().outer_join, vec!["FooTable.symbol = S.MAX_symbol"]);
    }

    #[test]
    fn test_last_value_with_two_arguments() {
        let expr = Expr::compare(
            CompareOp::GreaterThan,
            last(vec![
                store("price", AttributeType::Float),
                store("timestamp", AttributeType::Long),
            ]),
            Expr::constant(10, AttributeType::Int),
        );
        let compiled = compile(&expr, options()).unwrap();

        assert_eq!(compiled.text(), "(MAX(FooTable.price) > ?)");
        assert_eq!(compiled.join().sub_select_text(), "MAX(FooTable.timestamp) AS MAX_timestamp");
        assert_eq!(compiled.join().outer_join_text(), "FooTable.timestamp = S.MAX_timestamp");
        assert_eq!(
            compiled.parameters()[&1],
            ValueHolder::constant(10, AttributeType::Int)
        );
    }

    #[test]
    fn test_each_compile_starts_fresh() {
        let expr = Expr::compare(
            CompareOp::GreaterThan,
            store("price", AttributeType::Float),
            Expr::constant(50.0, AttributeType::Float),
        );
        let first = compile(&expr, options()).unwrap();
        let second = compile(&expr, options()).unwrap();
        assert_eq!(first, second);
        assert_eq!(second.text(), "(FooTable.price > ?)");
        assert_eq!(second.join().outer_join, vec!["FooTable.price = S.price"]);
    }

    #[test]
    fn test_last_value_beside_plain_attribute() {
        let expr = Expr::and(
            Expr::compare(
                CompareOp::GreaterThan,
                last(vec![
                    store("price", AttributeType::Float),
                    store("ts", AttributeType::Long),
                ]),
                Expr::constant(10, AttributeType::Int),
            ),
            Expr::compare(
                CompareOp::Equal,
                store("symbol", AttributeType::String),
                Expr::constant("x", AttributeType::String),
            ),
        );
        let compiled = compile(&expr, options()).unwrap();

        assert_eq!(
            compiled.join().outer_join,
            vec!["FooTable.ts = S.MAX_ts", "FooTable.symbol = S.symbol"]
        );
        assert_eq!(compiled.join().aggregate_join, vec!["FooTable.ts = S.MAX_ts"]);
        assert!(!compiled.is_membership());
    }

    #[test]
    fn test_last_value_without_join_key_is_rejected() {
        let expr = Expr::compare(
            CompareOp::GreaterThan,
            last(vec![store("price", AttributeType::Float)]),
            Expr::constant(10, AttributeType::Int),
        );
        let err = compile(&expr, options()).unwrap_err();
        assert!(matches!(err, CompileError::MalformedLastValue { .. }));
    }

    #[test]
    fn test_last_value_with_constant_argument_is_rejected() {
        let expr = Expr::compare(
            CompareOp::Equal,
            last(vec![Expr::constant(1, AttributeType::Int)]),
            store("price", AttributeType::Float),
        );
        let err = compile(&expr, options()).unwrap_err();
        assert!(matches!(err, CompileError::MalformedLastValue { .. }));
    }

    #[test]
    fn test_last_value_with_three_arguments_is_rejected() {
        let expr = last(vec![
            store("a", AttributeType::Int),
            store("b", AttributeType::Int),
            store("c", AttributeType::Int),
        ]);
        let err = compile(&expr, options()).unwrap_err();
        assert!(matches!(err, CompileError::MalformedLastValue { .. }));
    }

    #[test]
    fn test_unsupported_function_emits_nothing() {
        let mut visitor = ConditionVisitor::new(options());
        let err = visitor
            .visit(&Expr::function(
                Some("math"),
                "sqrt",
                vec![store("price", AttributeType::Float)],
            ))
            .unwrap_err();

        assert_eq!(
            err,
            CompileError::UnsupportedFunction {
                name: "math:sqrt".into()
            }
        );
        assert!(visitor.text.is_empty());
        assert!(visitor.placeholders.is_empty());
    }

    #[test]
    fn test_unsupported_nested_function_aborts_compilation() {
        let expr = Expr::compare(
            CompareOp::LessThan,
            Expr::function(None, "count", vec![]),
            Expr::constant(3, AttributeType::Int),
        );
        let err = compile(&expr, options()).unwrap_err();
        assert_eq!(
            err,
            CompileError::UnsupportedFunction {
                name: "count".into()
            }
        );
    }

    #[test]
    fn test_qualified_aggregate_is_unsupported() {
        let expr = Expr::function(Some("math"), "sum", vec![store("price", AttributeType::Float)]);
        assert!(matches!(
            compile(&expr, options()),
            Err(CompileError::UnsupportedFunction { .. })
        ));
    }

    #[test]
    fn test_contains_uses_pattern_names() {
        let expr = Expr::function(
            Some("str"),
            "contains",
            vec![
                store("symbol", AttributeType::String),
                Expr::constant("WS", AttributeType::String),
                Expr::constant("O2", AttributeType::String),
            ],
        );
        let mut visitor = ConditionVisitor::new(options());
        visitor.visit(&expr).unwrap();

        assert!(visitor.placeholders.contains_key("pattern-value0"));
        assert!(visitor.placeholders.contains_key("const1"));

        let compiled = visitor.return_condition();
        assert_eq!(compiled.text(), "CONTAINS(FooTable.symbol, ?, ?)");
        assert!(compiled.is_pattern(1));
        assert!(!compiled.is_pattern(2));
    }

    #[test]
    fn test_contains_with_stream_variable_pattern() {
        let expr = Expr::and(
            Expr::function(
                Some(" str "),
                "contains",
                vec![
                    store("symbol", AttributeType::String),
                    Expr::constant("WS", AttributeType::String),
                ],
            ),
            Expr::function(
                Some("str"),
                "contains",
                vec![
                    store("name", AttributeType::String),
                    Expr::stream_var("needle", AttributeType::String),
                ],
            ),
        );
        let mut visitor = ConditionVisitor::new(options());
        visitor.visit(&expr).unwrap();

        assert!(visitor.placeholders.contains_key("pattern-value0"));
        assert!(visitor.placeholders.contains_key("pattern-variable0"));
        assert_eq!(visitor.placeholders.len(), 2);
    }

    #[test]
    fn test_pattern_flag_does_not_leak_past_contains() {
        let expr = Expr::and(
            Expr::function(
                Some("str"),
                "contains",
                vec![store("a", AttributeType::String), store("b", AttributeType::String)],
            ),
            Expr::compare(
                CompareOp::Equal,
                store("c", AttributeType::Int),
                Expr::constant(1, AttributeType::Int),
            ),
        );
        let mut visitor = ConditionVisitor::new(options());
        visitor.visit(&expr).unwrap();

        assert!(visitor.placeholders.contains_key("const0"));
        let compiled = visitor.return_condition();
        assert!(!compiled.is_pattern(1));
    }

    #[test]
    fn test_after_select_emits_bare_attributes() {
        let expr = Expr::compare(
            CompareOp::LessThanEqual,
            store("volume", AttributeType::Long),
            Expr::stream_var("volume", AttributeType::Long),
        );
        let compiled = compile(&expr, options().after_select(true)).unwrap();

        assert_eq!(compiled.text(), "(volume <= ?)");
        assert!(compiled.join().outer_join.is_empty());
    }

    #[test]
    fn test_custom_subquery_alias() {
        let expr = Expr::compare(
            CompareOp::Equal,
            store("symbol", AttributeType::String),
            Expr::stream_var("symbol", AttributeType::String),
        );
        let compiled = compile(&expr, options().subquery_alias("latest")).unwrap();
        assert_eq!(compiled.join().outer_join_text(), "FooTable.symbol = latest.symbol");
    }

    #[test]
    fn test_not_or_math_and_null_test() {
        let expr = Expr::not(Expr::or(
            Expr::compare(
                CompareOp::GreaterThan,
                Expr::math(
                    MathOp::Multiply,
                    Expr::math(
                        MathOp::Add,
                        store("a", AttributeType::Int),
                        Expr::constant(2, AttributeType::Int),
                    ),
                    Expr::constant(3, AttributeType::Int),
                ),
                store("b", AttributeType::Int),
            ),
            Expr::is_null(store("c", AttributeType::String)),
        ));
        let compiled = compile(&expr, options()).unwrap();

        assert_eq!(
            compiled.text(),
            "NOT ((((((FooTable.a + ?) * ?) > FooTable.b)) OR FooTable.c IS NULL))"
        );
        assert_eq!(
            compiled.parameters()[&1],
            ValueHolder::constant(2, AttributeType::Int)
        );
        assert_eq!(
            compiled.parameters()[&2],
            ValueHolder::constant(3, AttributeType::Int)
        );
    }

    #[test]
    fn test_operator_tokens() {
        let ops = [
            (CompareOp::Equal, "="),
            (CompareOp::NotEqual, "!="),
            (CompareOp::GreaterThan, ">"),
            (CompareOp::GreaterThanEqual, ">="),
            (CompareOp::LessThan, "<"),
            (CompareOp::LessThanEqual, "<="),
        ];
        for (op, token) in ops {
            let expr = Expr::compare(
                op,
                store("a", AttributeType::Int),
                Expr::constant(1, AttributeType::Int),
            );
            let compiled = compile(&expr, options().after_select(true)).unwrap();
            assert_eq!(compiled.text(), format!("(a {} ?)", token));
        }

        let ops = [
            (MathOp::Add, "+"),
            (MathOp::Subtract, "-"),
            (MathOp::Multiply, "*"),
            (MathOp::Divide, "/"),
            (MathOp::Mod, "%"),
        ];
        for (op, token) in ops {
            let expr = Expr::math(
                op,
                store("a", AttributeType::Int),
                Expr::constant(1, AttributeType::Int),
            );
            let compiled = compile(&expr, options().after_select(true)).unwrap();
            assert_eq!(compiled.text(), format!("(a {} ?)", token));
        }
    }

    #[test]
    fn test_aggregate_pass_through() {
        let expr = Expr::compare(
            CompareOp::GreaterThan,
            Expr::function(None, "sum", vec![store("price", AttributeType::Float)]),
            Expr::constant(100, AttributeType::Long),
        );
        let compiled = compile(&expr, options()).unwrap();
        assert_eq!(compiled.text(), "(sum(FooTable.price) > ?)");
    }

    #[test]
    fn test_ordinals_are_dense_and_ordered() {
        let expr = Expr::or(
            Expr::and(
                Expr::compare(
                    CompareOp::Equal,
                    store("a", AttributeType::Int),
                    Expr::stream_var("a", AttributeType::Int),
                ),
                Expr::compare(
                    CompareOp::Equal,
                    store("b", AttributeType::Int),
                    Expr::constant(7, AttributeType::Int),
                ),
            ),
            Expr::compare(
                CompareOp::Equal,
                Expr::stream_var("c", AttributeType::Int),
                Expr::constant(8, AttributeType::Int),
            ),
        );
        let compiled = compile(&expr, options()).unwrap();

        let ordinals: Vec<usize> = compiled.parameters().keys().copied().collect();
        assert_eq!(ordinals, vec![1, 2, 3, 4]);
        assert_eq!(compiled.text().matches('?').count(), 4);
        assert_eq!(
            compiled.parameters().values().cloned().collect::<Vec<_>>(),
            vec![
                ValueHolder::attribute("a", AttributeType::Int),
                ValueHolder::constant(7, AttributeType::Int),
                ValueHolder::attribute("c", AttributeType::Int),
                ValueHolder::constant(8, AttributeType::Int),
            ]
        );
    }

    #[test]
    fn test_nested_connectives_are_fully_parenthesized() {
        let leaf = |attr: &str| {
            Expr::compare(
                CompareOp::Equal,
                store(attr, AttributeType::Int),
                Expr::constant(1, AttributeType::Int),
            )
        };
        let expr = Expr::and(
            Expr::or(leaf("a"), leaf("b")),
            Expr::or(leaf("c"), Expr::and(leaf("d"), leaf("e"))),
        );
        let compiled = compile(&expr, options().after_select(true)).unwrap();

        assert_eq!(
            compiled.text(),
            "(((((a = ?)) OR (b = ?))) AND (((c = ?)) OR (((d = ?)) AND (e = ?))))"
        );
        let opens = compiled.text().matches('(').count();
        let closes = compiled.text().matches(')').count();
        assert_eq!(opens, closes);
    }
}
