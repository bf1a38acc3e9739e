//! # API Handlers
//!
//! Axum handlers for compiling, storing and binding conditions.

use crate::conditions::{CompileRequest, CompileResponse, ConditionInfo};
use crate::{ApiError, AppState};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use cq_compile::{compile, CompileOptions, Event, QuerySpec};
use regex::Regex;
use serde::Deserialize;
use std::sync::{Arc, OnceLock};

type ApiResult<T> = Result<T, (StatusCode, Json<ApiError>)>;

fn api_error(status: StatusCode, error: impl ToString) -> (StatusCode, Json<ApiError>) {
    (
        status,
        Json(ApiError {
            error: error.to_string(),
        }),
    )
}

// =============================================================================
// Options
// =============================================================================

fn identifier() -> &'static Regex {
    static IDENTIFIER: OnceLock<Regex> = OnceLock::new();
    IDENTIFIER.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid identifier regex"))
}

/// Merge a request with the `[compiler]` section. Table, alias and every
/// table attribute are spliced into query text, so all must be plain
/// identifiers.
fn resolve_options(state: &AppState, request: &CompileRequest) -> ApiResult<CompileOptions> {
    let compiler = &state.config.compiler;
    let table = request
        .table
        .as_deref()
        .or(compiler.default_table.as_deref())
        .ok_or_else(|| api_error(StatusCode::BAD_REQUEST, "No table given and no default_table configured"))?;

    if !identifier().is_match(table) {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            format!("Invalid table name '{}'", table),
        ));
    }
    if let Some(attribute) = request
        .condition
        .store_attributes()
        .into_iter()
        .find(|attribute| !identifier().is_match(attribute))
    {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            format!("Invalid attribute name '{}'", attribute),
        ));
    }
    if !identifier().is_match(&compiler.subquery_alias) {
        return Err(api_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Invalid configured subquery alias '{}'", compiler.subquery_alias),
        ));
    }

    Ok(CompileOptions::new(table)
        .after_select(request.after_select.unwrap_or(compiler.after_select))
        .subquery_alias(compiler.subquery_alias.clone()))
}

// =============================================================================
// Compile
// =============================================================================

pub async fn compile_condition(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CompileRequest>,
) -> ApiResult<Json<CompileResponse>> {
    let options = resolve_options(&state, &request)?;
    let compiled = compile(&request.condition, options).map_err(|e| {
        tracing::warn!("Compile rejected: {}", e);
        api_error(StatusCode::BAD_REQUEST, e)
    })?;
    Ok(Json(CompileResponse::new(compiled)))
}

// =============================================================================
// Stored Conditions
// =============================================================================

pub async fn create_condition(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CompileRequest>,
) -> ApiResult<(StatusCode, Json<ConditionInfo>)> {
    let options = resolve_options(&state, &request)?;
    let info = state
        .conditions
        .create(request.condition, options)
        .await
        .map_err(|e| {
            tracing::warn!("Compile rejected: {}", e);
            api_error(StatusCode::BAD_REQUEST, e)
        })?;
    tracing::info!("Stored condition {} for table {}", info.id, info.output.compiled.table());
    Ok((StatusCode::CREATED, Json(info)))
}

pub async fn list_conditions(State(state): State<Arc<AppState>>) -> Json<Vec<ConditionInfo>> {
    Json(state.conditions.list().await)
}

pub async fn get_condition(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<ConditionInfo>> {
    state
        .conditions
        .get(&id)
        .await
        .map(Json)
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, format!("Condition '{}' not found", id)))
}

pub async fn delete_condition(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state
        .conditions
        .delete(&id)
        .await
        .map_err(|e| api_error(StatusCode::NOT_FOUND, e))?;
    tracing::info!("Removed condition {}", id);
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Binding
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct BindRequest {
    #[serde(default)]
    pub event: Event,
}

pub async fn bind_condition(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<BindRequest>,
) -> ApiResult<Json<QuerySpec>> {
    let compiled = state
        .conditions
        .compiled(&id)
        .await
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, format!("Condition '{}' not found", id)))?;

    let spec = QuerySpec::build(&compiled, &request.event)
        .map_err(|e| api_error(StatusCode::UNPROCESSABLE_ENTITY, e))?;
    tracing::debug!("Bound {} with {} parameters", id, spec.parameters.len());
    Ok(Json(spec))
}
