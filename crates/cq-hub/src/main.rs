use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cq_compile::{DEFAULT_SUBQUERY_ALIAS, SUPPORTED_FUNCTIONS};

mod api;
mod conditions;

// =============================================================================
// CLI
// =============================================================================

#[derive(Parser)]
#[command(
    name = "cq-hub",
    version = "0.1.0",
    about = "Condition compilation service"
)]
struct Args {
    /// Server bind address
    #[arg(long, default_value = "127.0.0.1:3000")]
    bind: String,

    /// Path to config file
    #[arg(long, default_value = "cq-hub.toml")]
    config: PathBuf,
}

// =============================================================================
// Config
// =============================================================================

#[derive(Deserialize, Default, Clone, Debug)]
struct Config {
    #[serde(default)]
    server: ServerConfig,
    #[serde(default)]
    compiler: CompilerConfig,
}

#[derive(Deserialize, Clone, Debug)]
struct ServerConfig {
    #[serde(default = "default_history_capacity")]
    history_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            history_capacity: default_history_capacity(),
        }
    }
}

#[derive(Deserialize, Clone, Debug)]
struct CompilerConfig {
    /// Table used when a request names none.
    #[serde(default)]
    default_table: Option<String>,
    #[serde(default = "default_subquery_alias")]
    subquery_alias: String,
    #[serde(default)]
    after_select: bool,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            default_table: None,
            subquery_alias: default_subquery_alias(),
            after_select: false,
        }
    }
}

fn default_history_capacity() -> usize {
    1024
}
fn default_subquery_alias() -> String {
    DEFAULT_SUBQUERY_ALIAS.to_string()
}

// =============================================================================
// Application State
// =============================================================================

struct AppState {
    start_time: Instant,
    config: Config,
    conditions: Arc<conditions::ConditionManager>,
}

impl AppState {
    fn new(config: Config) -> Self {
        let conditions = Arc::new(conditions::ConditionManager::new(
            config.server.history_capacity.max(1),
        ));
        Self {
            start_time: Instant::now(),
            config,
            conditions,
        }
    }
}

// =============================================================================
// Types
// =============================================================================

#[derive(Serialize)]
struct SystemStatus {
    version: &'static str,
    uptime_seconds: u64,
    stored_conditions: usize,
    history_capacity: usize,
    default_table: Option<String>,
    subquery_alias: String,
    supported_functions: Vec<&'static str>,
}

#[derive(Serialize, Debug)]
struct ApiError {
    error: String,
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "cq_hub=info,cq_compile=info,tower_http=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let config = if args.config.exists() {
        let content = match std::fs::read_to_string(&args.config) {
            Ok(content) => content,
            Err(e) => {
                tracing::error!("Failed to read config {:?}: {}", args.config, e);
                std::process::exit(1);
            }
        };
        match toml::from_str(&content) {
            Ok(config) => config,
            Err(e) => {
                tracing::error!("Invalid config {:?}: {}", args.config, e);
                std::process::exit(1);
            }
        }
    } else {
        tracing::info!("No config at {:?}, using defaults", args.config);
        Config::default()
    };

    let state = Arc::new(AppState::new(config));
    let app = app(state.clone());

    let addr: SocketAddr = match args.bind.parse() {
        Ok(addr) => addr,
        Err(e) => {
            tracing::error!("Invalid bind address {}: {}", args.bind, e);
            std::process::exit(1);
        }
    };
    tracing::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    tracing::info!("  cq-hub v0.1.0");
    tracing::info!("  API:        http://{}/api/status", addr);
    tracing::info!("  Capacity:   {} conditions", state.config.server.history_capacity);
    if let Some(table) = &state.config.compiler.default_table {
        tracing::info!("  Table:      {}", table);
    }
    tracing::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };
    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/status", get(api_status))
        .route("/api/compile", post(api::compile_condition))
        .route(
            "/api/conditions",
            get(api::list_conditions).post(api::create_condition),
        )
        .route(
            "/api/conditions/:id",
            get(api::get_condition).delete(api::delete_condition),
        )
        .route("/api/conditions/:id/bind", post(api::bind_condition))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// =============================================================================
// Core API Handlers
// =============================================================================

async fn api_status(State(state): State<Arc<AppState>>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: "0.1.0",
        uptime_seconds: state.start_time.elapsed().as_secs(),
        stored_conditions: state.conditions.len().await,
        history_capacity: state.config.server.history_capacity,
        default_table: state.config.compiler.default_table.clone(),
        subquery_alias: state.config.compiler.subquery_alias.clone(),
        supported_functions: SUPPORTED_FUNCTIONS.to_vec(),
    })
}
