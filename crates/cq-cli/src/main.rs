//! # cq-cli
//!
//! Command line front-end for the condition compiler.
//!
//! - `cq compile --table <T> <FILE|->` — Compile a JSON predicate tree locally.
//! - `cq bind --table <T> --event <EVENT> <FILE|->` — Compile and bind to an event.
//! - `cq submit | list | show | remove | status` — Talk to a running `cq-hub`.

use std::io::Read;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use tabled::{settings::Style, Table, Tabled};

use cq_compile::{
    assemble_exists, assemble_query, compile, CompileOptions, CompiledCondition, Event, QuerySpec,
};
use cq_core::{Expr, ValueHolder};

/// Compile stream predicates into parameterized store queries.
#[derive(Parser)]
#[command(name = "cq", version, about, long_about = None)]
struct Cli {
    /// Log compiler decisions to stderr.
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args, Clone)]
struct CompileArgs {
    /// Target table (collection) name.
    #[arg(long)]
    table: String,

    /// Compile for use after a projection clause.
    #[arg(long)]
    after_select: bool,

    /// Alias of the correlated sub-select.
    #[arg(long, default_value = cq_compile::DEFAULT_SUBQUERY_ALIAS)]
    alias: String,

    /// Predicate tree as JSON; `-` reads stdin.
    input: PathBuf,
}

impl CompileArgs {
    fn options(&self) -> CompileOptions {
        CompileOptions::new(self.table.as_str())
            .after_select(self.after_select)
            .subquery_alias(self.alias.as_str())
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a condition and print its text and parameters.
    Compile {
        #[command(flatten)]
        args: CompileArgs,

        /// Print the compiled artifact as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Compile a condition and bind it to an event.
    Bind {
        #[command(flatten)]
        args: CompileArgs,

        /// Event attributes as a JSON object.
        #[arg(long)]
        event: PathBuf,
    },

    /// Store a condition on the hub.
    Submit {
        /// Target table; the hub default applies when omitted.
        #[arg(long)]
        table: Option<String>,

        #[arg(long)]
        after_select: bool,

        input: PathBuf,
    },

    /// List stored conditions.
    List,

    /// Show one stored condition.
    Show { id: String },

    /// Remove a stored condition.
    Remove { id: String },

    /// Report hub status as JSON.
    Status,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Compile { args, json } => run_compile(&args, json),
        Commands::Bind { args, event } => run_bind(&args, &event),

        // Hub commands
        cmd => {
            let rt = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(rt) => rt,
                Err(e) => {
                    eprintln!("Error: failed to build tokio runtime: {}", e);
                    std::process::exit(1);
                }
            };

            rt.block_on(async_main(cmd))
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

// =============================================================================
// Local Commands
// =============================================================================

fn run_compile(args: &CompileArgs, json: bool) -> Result<(), String> {
    let expr: Expr = read_json(&args.input)?;
    let compiled = compile(&expr, args.options()).map_err(|e| e.to_string())?;

    if json {
        println!("{}", to_pretty(&compiled)?);
    } else {
        print!("{}", render(&compiled));
    }
    Ok(())
}

fn run_bind(args: &CompileArgs, event_path: &Path) -> Result<(), String> {
    let expr: Expr = read_json(&args.input)?;
    let event: Event = read_json(event_path)?;
    let compiled = compile(&expr, args.options()).map_err(|e| e.to_string())?;
    let spec = QuerySpec::build(&compiled, &event).map_err(|e| e.to_string())?;
    println!("{}", to_pretty(&spec)?);
    Ok(())
}

#[derive(Tabled)]
struct ParameterRow {
    ordinal: usize,
    holder: &'static str,
    name: String,
    #[tabled(rename = "type")]
    ty: String,
    pattern: bool,
}

fn parameter_rows(compiled: &CompiledCondition) -> Vec<ParameterRow> {
    compiled
        .parameters()
        .iter()
        .map(|(&ordinal, holder)| {
            let (kind, name) = match holder {
                ValueHolder::Constant(c) => ("constant", c.value.to_string()),
                ValueHolder::Attribute(a) => ("attribute", a.id.clone()),
            };
            ParameterRow {
                ordinal,
                holder: kind,
                name,
                ty: holder.ty().to_string(),
                pattern: compiled.is_pattern(ordinal),
            }
        })
        .collect()
}

fn render(compiled: &CompiledCondition) -> String {
    let mut out = String::new();
    out.push_str(&format!("Condition: {}\n", compiled.text()));

    if compiled.parameter_count() > 0 {
        let mut table = Table::new(parameter_rows(compiled));
        table.with(Style::rounded());
        out.push_str(&format!("{}\n", table));
    }

    let join = compiled.join();
    if !join.sub_select.is_empty() {
        out.push_str(&format!("Sub-select: {}\n", join.sub_select_text()));
    }
    if !join.outer_join.is_empty() {
        out.push_str(&format!("Join on:    {}\n", join.outer_join_text()));
    }
    out.push_str(&format!("Query:      {}\n", assemble_query(compiled)));
    out.push_str(&format!("Exists:     {}\n", assemble_exists(compiled)));
    out
}

// =============================================================================
// Hub Commands
// =============================================================================

async fn async_main(cmd: Commands) -> Result<(), String> {
    let client = reqwest::Client::new();
    let base_url =
        std::env::var("CQ_BASE_URL").unwrap_or_else(|_| "http://127.0.0.1:3000".to_string());
    tracing::debug!("Using hub at {}", base_url);

    let response = match cmd {
        Commands::Submit {
            table,
            after_select,
            input,
        } => {
            let condition: serde_json::Value = read_json(&input)?;
            let payload = serde_json::json!({
                "table": table,
                "after_select": after_select,
                "condition": condition,
            });
            let url = format!("{}/api/conditions", base_url);
            client.post(&url).json(&payload).send().await
        }
        Commands::List => client.get(format!("{}/api/conditions", base_url)).send().await,
        Commands::Show { id } => {
            client
                .get(format!("{}/api/conditions/{}", base_url, id))
                .send()
                .await
        }
        Commands::Remove { id } => {
            client
                .delete(format!("{}/api/conditions/{}", base_url, id))
                .send()
                .await
        }
        Commands::Status => client.get(format!("{}/api/status", base_url)).send().await,
        Commands::Compile { .. } | Commands::Bind { .. } => return Ok(()),
    }
    .map_err(|e| e.to_string())?;

    print_response(response).await
}

async fn print_response(response: reqwest::Response) -> Result<(), String> {
    let status = response.status();
    let body = response.text().await.map_err(|e| e.to_string())?;
    let json = serde_json::from_str::<serde_json::Value>(&body).ok();

    if !status.is_success() {
        let message = json
            .as_ref()
            .and_then(|v| v.get("error"))
            .and_then(|v| v.as_str())
            .map(ToString::to_string)
            .unwrap_or(body);
        return Err(format!("{}: {}", status, message));
    }

    match json {
        Some(json) => println!("{}", to_pretty(&json)?),
        None => println!("{}", status),
    }
    Ok(())
}

// =============================================================================
// Helpers
// =============================================================================

fn read_input(path: &Path) -> Result<String, String> {
    if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .map_err(|e| format!("failed to read stdin: {}", e))?;
        Ok(buf)
    } else {
        std::fs::read_to_string(path).map_err(|e| format!("failed to read {}: {}", path.display(), e))
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, String> {
    parse_json(&read_input(path)?, path)
}

fn parse_json<T: DeserializeOwned>(content: &str, source: &Path) -> Result<T, String> {
    serde_json::from_str(content).map_err(|e| format!("invalid JSON in {}: {}", source.display(), e))
}

fn to_pretty<T: serde::Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cq_core::{AttributeType, CompareOp};

    fn contains_condition() -> CompiledCondition {
        let expr = Expr::and(
            Expr::function(
                Some("str"),
                "contains",
                vec![
                    Expr::store_var("FooTable", "symbol", AttributeType::String),
                    Expr::constant("WS", AttributeType::String),
                ],
            ),
            Expr::compare(
                CompareOp::GreaterThan,
                Expr::store_var("FooTable", "price", AttributeType::Float),
                Expr::stream_var("limit", AttributeType::Float),
            ),
        );
        compile(&expr, CompileOptions::new("FooTable")).unwrap()
    }

    #[test]
    fn test_parse_predicate_json() {
        let expr: Expr = parse_json(
            r#"{"kind": "is_null", "operand": {"kind": "store_variable", "store_id": "FooTable", "attribute": "price", "type": "float"}}"#,
            Path::new("inline"),
        )
        .unwrap();
        assert_eq!(
            expr,
            Expr::is_null(Expr::store_var("FooTable", "price", AttributeType::Float))
        );
    }

    #[test]
    fn test_parse_error_names_source() {
        let err = parse_json::<Expr>("{ not json", Path::new("cond.json")).unwrap_err();
        assert!(err.contains("cond.json"));
    }

    #[test]
    fn test_parameter_rows() {
        let compiled = contains_condition();
        let rows = parameter_rows(&compiled);
        assert_eq!(rows.len(), 2);

        assert_eq!(rows[0].ordinal, 1);
        assert_eq!(rows[0].holder, "constant");
        assert!(rows[0].pattern);

        assert_eq!(rows[1].ordinal, 2);
        assert_eq!(rows[1].holder, "attribute");
        assert_eq!(rows[1].name, "limit");
        assert!(!rows[1].pattern);
    }

    #[test]
    fn test_render_lists_condition_and_query() {
        let compiled = contains_condition();
        let out = render(&compiled);
        assert!(out.starts_with("Condition: "));
        assert!(out.contains("limit"));
        assert!(out.contains("Query:      SELECT * FROM FooTable WHERE "));
        assert!(out.contains("Exists:     SELECT VALUE COUNT(1) FROM FooTable WHERE "));
        assert!(!out.contains("Sub-select"));
    }

    #[test]
    fn test_options_from_args() {
        let cli = Cli::parse_from(["cq", "compile", "--table", "FooTable", "--after-select", "cond.json"]);
        match cli.command {
            Commands::Compile { args, json } => {
                assert!(!json);
                let options = args.options();
                assert_eq!(options.table, "FooTable");
                assert!(options.after_select);
                assert_eq!(options.subquery_alias, "S");
            }
            _ => panic!("expected compile"),
        }
    }
}
