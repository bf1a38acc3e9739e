//! # Stored Conditions
//!
//! Compiled conditions kept by the hub so clients can compile once and bind
//! many times. Each artifact is held behind an `Arc` and only ever read.

use std::collections::VecDeque;
use std::sync::Arc;

use cq_compile::{assemble_query, compile, CompileError, CompileOptions, CompiledCondition};
use cq_core::Expr;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// Request to compile (and optionally store) a condition.
#[derive(Debug, Clone, Deserialize)]
pub struct CompileRequest {
    /// Target table; falls back to `[compiler] default_table`.
    pub table: Option<String>,
    pub after_select: Option<bool>,
    pub condition: Expr,
}

/// A compiled condition plus the statement to run: a count query for
/// membership conditions, a select otherwise.
#[derive(Debug, Clone, Serialize)]
pub struct CompileResponse {
    pub compiled: CompiledCondition,
    pub query: String,
}

impl CompileResponse {
    pub fn new(compiled: CompiledCondition) -> Self {
        let query = assemble_query(&compiled);
        Self { compiled, query }
    }
}

/// Serializable view of a stored condition.
#[derive(Debug, Clone, Serialize)]
pub struct ConditionInfo {
    pub id: String,
    pub created_at: String,
    pub source: Expr,
    #[serde(flatten)]
    pub output: CompileResponse,
}

struct StoredCondition {
    id: String,
    created_at: String,
    source: Expr,
    compiled: Arc<CompiledCondition>,
}

impl StoredCondition {
    fn info(&self) -> ConditionInfo {
        ConditionInfo {
            id: self.id.clone(),
            created_at: self.created_at.clone(),
            source: self.source.clone(),
            output: CompileResponse::new(self.compiled.as_ref().clone()),
        }
    }
}

/// The condition manager.
pub struct ConditionManager {
    conditions: RwLock<VecDeque<StoredCondition>>,
    capacity: usize,
}

impl ConditionManager {
    pub fn new(capacity: usize) -> Self {
        Self {
            conditions: RwLock::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Compile and store. The oldest entry is evicted once full.
    pub async fn create(
        &self,
        source: Expr,
        options: CompileOptions,
    ) -> Result<ConditionInfo, CompileError> {
        let compiled = compile(&source, options)?;
        let stored = StoredCondition {
            id: format!("cond-{}", uuid::Uuid::new_v4().as_simple()),
            created_at: chrono::Utc::now().to_rfc3339(),
            source,
            compiled: Arc::new(compiled),
        };
        let info = stored.info();

        let mut conditions = self.conditions.write().await;
        if conditions.len() >= self.capacity {
            if let Some(evicted) = conditions.pop_front() {
                tracing::info!("Evicting stored condition {}", evicted.id);
            }
        }
        conditions.push_back(stored);
        Ok(info)
    }

    pub async fn list(&self) -> Vec<ConditionInfo> {
        self.conditions.read().await.iter().map(|c| c.info()).collect()
    }

    pub async fn get(&self, id: &str) -> Option<ConditionInfo> {
        self.conditions
            .read()
            .await
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.info())
    }

    /// Shared handle to the compiled artifact, for binding.
    pub async fn compiled(&self, id: &str) -> Option<Arc<CompiledCondition>> {
        self.conditions
            .read()
            .await
            .iter()
            .find(|c| c.id == id)
            .map(|c| Arc::clone(&c.compiled))
    }

    pub async fn delete(&self, id: &str) -> Result<(), String> {
        let mut conditions = self.conditions.write().await;
        let idx = conditions
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| format!("Condition '{}' not found", id))?;
        conditions.remove(idx);
        Ok(())
    }

    pub async fn len(&self) -> usize {
        self.conditions.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cq_core::{AttributeType, CompareOp};

    fn price_above(limit: f64) -> Expr {
        Expr::compare(
            CompareOp::GreaterThan,
            Expr::store_var("FooTable", "price", AttributeType::Float),
            Expr::constant(limit, AttributeType::Float),
        )
    }

    #[tokio::test]
    async fn test_create_get_delete() {
        let manager = ConditionManager::new(8);
        let info = manager
            .create(price_above(50.0), CompileOptions::new("FooTable"))
            .await
            .unwrap();
        assert!(info.id.starts_with("cond-"));
        assert_eq!(info.output.compiled.text(), "(FooTable.price > ?)");

        let fetched = manager.get(&info.id).await.unwrap();
        assert_eq!(fetched.output.query, "SELECT * FROM FooTable WHERE (FooTable.price > ?)");
        assert!(manager.compiled(&info.id).await.is_some());

        manager.delete(&info.id).await.unwrap();
        assert!(manager.get(&info.id).await.is_none());
        assert!(manager.delete(&info.id).await.is_err());
    }

    #[tokio::test]
    async fn test_capacity_evicts_oldest() {
        let manager = ConditionManager::new(2);
        let first = manager
            .create(price_above(1.0), CompileOptions::new("FooTable"))
            .await
            .unwrap();
        manager
            .create(price_above(2.0), CompileOptions::new("FooTable"))
            .await
            .unwrap();
        manager
            .create(price_above(3.0), CompileOptions::new("FooTable"))
            .await
            .unwrap();

        assert_eq!(manager.len().await, 2);
        assert!(manager.get(&first.id).await.is_none());
    }

    #[tokio::test]
    async fn test_compile_error_is_not_stored() {
        let manager = ConditionManager::new(2);
        let expr = Expr::function(Some("math"), "sqrt", vec![]);
        let err = manager
            .create(expr, CompileOptions::new("FooTable"))
            .await
            .unwrap_err();
        assert!(matches!(err, CompileError::UnsupportedFunction { .. }));
        assert_eq!(manager.len().await, 0);
    }
}
