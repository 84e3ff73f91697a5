//! mcp-sql CLI - natural-language questions to read-only SQL
//!
//! Usage:
//!   mcp-sql serve [--host <host>] [--port <port>]
//!   mcp-sql tables
//!   mcp-sql describe <table> [--schema <schema>]
//!   mcp-sql query <sql>
//!   mcp-sql ask <backend> <question> [--table <name>]... [--execute]
//!
//! Examples:
//!   mcp-sql describe Patients
//!   mcp-sql query "SELECT * FROM Patients"
//!   mcp-sql ask ollama "list all patients" --table Patients --execute

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::json;

use mcp_sql::config::{Settings, CONFIG_ENV};
use mcp_sql::gateway::ModelGateway;
use mcp_sql::logging::{init_tracing, LogFormat};
use mcp_sql::metadata::{MetadataProvider, SchemaCatalog, StoreMetadataProvider};
use mcp_sql::pipeline::{AskPipeline, AskRequest};
use mcp_sql::store::{ExecutionGate, PoolManager};
use mcp_sql::web::{self, AppState};

#[derive(Parser)]
#[command(name = "mcp-sql")]
#[command(about = "mcp-sql - Natural-language questions to vetted, read-only SQL")]
#[command(version)]
struct Cli {
    /// Path to the settings file
    #[arg(long, global = true, env = CONFIG_ENV)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server
    Serve {
        /// Override server.host
        #[arg(long)]
        host: Option<String>,

        /// Override server.port
        #[arg(long)]
        port: Option<u16>,
    },

    /// List base tables
    Tables,

    /// Describe the columns of a table
    Describe {
        table: String,

        /// Schema (defaults to catalog.default_schema)
        #[arg(long)]
        schema: Option<String>,
    },

    /// Execute a read-only query
    Query { sql: String },

    /// Translate a question into a query with the named backend
    Ask {
        backend: String,
        question: String,

        /// Table to describe in the prompt (repeatable; defaults to catalog.default_tables)
        #[arg(short, long = "table")]
        tables: Vec<String>,

        /// Run the vetted query after translating it
        #[arg(long)]
        execute: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let format = if cli.log_json {
        LogFormat::Json
    } else {
        LogFormat::Pretty
    };
    if let Err(e) = init_tracing(format) {
        eprintln!("Error initializing logging: {}", e);
        return ExitCode::FAILURE;
    }

    let settings = match load_settings(cli.config) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Commands::Serve { host, port } => cmd_serve(settings, host, port).await,
        Commands::Tables => cmd_tables(&settings).await,
        Commands::Describe { table, schema } => cmd_describe(&settings, table, schema).await,
        Commands::Query { sql } => cmd_query(&settings, sql).await,
        Commands::Ask {
            backend,
            question,
            tables,
            execute,
        } => cmd_ask(&settings, backend, question, tables, execute).await,
    }
}

fn load_settings(path: Option<PathBuf>) -> Result<Settings, mcp_sql::config::SettingsError> {
    let settings = match path {
        Some(path) => Settings::from_file(path)?,
        None => Settings::load()?,
    };
    settings.resolve()
}

fn catalog_for(settings: &Settings, pools: &Arc<PoolManager>) -> SchemaCatalog {
    let provider: Arc<dyn MetadataProvider> =
        Arc::new(StoreMetadataProvider::new(Arc::clone(pools)));
    SchemaCatalog::new(provider, settings.catalog.clone())
}

fn print_json<T: Serialize>(value: &T) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(text) => {
            println!("{}", text);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error serializing output: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn cmd_serve(mut settings: Settings, host: Option<String>, port: Option<u16>) -> ExitCode {
    if let Some(host) = host {
        settings.server.host = host;
    }
    if let Some(port) = port {
        settings.server.port = port;
    }

    let state = match AppState::from_settings(&settings) {
        Ok(state) => Arc::new(state),
        Err(e) => {
            eprintln!("Error starting server: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match web::serve(state, &settings.server.bind_addr()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Server error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn cmd_tables(settings: &Settings) -> ExitCode {
    let pools = Arc::new(PoolManager::new(settings.store.clone()));
    match catalog_for(settings, &pools).list_tables().await {
        Ok(tables) => print_json(&json!({ "tables": tables })),
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn cmd_describe(settings: &Settings, table: String, schema: Option<String>) -> ExitCode {
    let pools = Arc::new(PoolManager::new(settings.store.clone()));
    match catalog_for(settings, &pools)
        .describe(schema.as_deref(), &table)
        .await
    {
        Ok(described) => print_json(&json!({ "columns": described.columns })),
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn cmd_query(settings: &Settings, sql: String) -> ExitCode {
    let pools = Arc::new(PoolManager::new(settings.store.clone()));
    match ExecutionGate::new(pools).execute(&sql).await {
        Ok(result) => print_json(&result),
        Err(e) => {
            eprintln!("Query error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn cmd_ask(
    settings: &Settings,
    backend: String,
    question: String,
    tables: Vec<String>,
    execute: bool,
) -> ExitCode {
    let gateway = match ModelGateway::from_settings(settings) {
        Ok(g) => g,
        Err(e) => {
            eprintln!("Backend configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let pools = Arc::new(PoolManager::new(settings.store.clone()));
    let pipeline = AskPipeline::new(catalog_for(settings, &pools), gateway);

    let mut request = AskRequest::new(question);
    if !tables.is_empty() {
        request = request.with_tables(tables);
    }

    let outcome = match pipeline.ask(&backend, &request).await {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("Ask error: {}", e);
            if let Some(raw) = e.raw() {
                eprintln!("Raw model output:\n{}", raw);
            }
            return ExitCode::FAILURE;
        }
    };

    if !execute {
        return print_json(&json!({
            "query": outcome.query,
            "backend": outcome.backend,
        }));
    }

    // The gate re-checks the text; the pipeline's verdict is not trusted.
    match ExecutionGate::new(pools).execute(outcome.query.as_str()).await {
        Ok(result) => print_json(&json!({
            "query": outcome.query,
            "backend": outcome.backend,
            "result": result,
        })),
        Err(e) => {
            eprintln!("Query error: {}", e);
            ExitCode::FAILURE
        }
    }
}
