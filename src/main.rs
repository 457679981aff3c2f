//! rustresearcher - AI Research Assistant
//!
//! Asks a hosted LLM whether a question is research-related, answers it with
//! study guidance, and suggests papers for the selected sub-fields.
//!
//! ## Usage
//!
//! ### CLI Mode
//! ```bash
//! rustresearcher ask "How do vision transformers scale?" --field "Computer Science" \
//!     --tag "Computer Vision" --tag "Machine Learning" --start-year 2020 --end-year 2023
//! ```
//!
//! ### HTTP Server Mode
//! ```bash
//! rustresearcher serve --port 3000
//! ```

use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use clap::{Parser, Subcommand};
use rustresearcher::{
    assistant::{Assistant, Outcome},
    config::{ApiKey, Settings, API_KEY_VAR},
    export, fields,
    query::{Query, YearRange},
    render,
    secrets::SecretStore,
    source::AnySource,
    ResearchError,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn, Level};
use tracing_subscriber::{fmt, EnvFilter};

// ============================================================================
// CLI Definition
// ============================================================================

/// AI Research Assistant - answers, study guidance and paper suggestions
#[derive(Parser)]
#[command(name = "rustresearcher")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Flags shared by `ask` and `serve`
#[derive(clap::Args)]
struct BackendArgs {
    /// Paper source: gscholar or openalex
    #[arg(long, value_parser = ["gscholar", "openalex"])]
    source: Option<String>,

    /// Completion API key (overrides GROQ_API_KEY and the secret store)
    #[arg(long)]
    api_key: Option<String>,

    /// Completion model name
    #[arg(long)]
    model: Option<String>,

    /// OpenAI-compatible base URL (e.g., https://api.groq.com/openai/v1)
    #[arg(long)]
    base_url: Option<String>,

    /// Proxy URL for Google Scholar (e.g., http://127.0.0.1:7890)
    #[arg(long)]
    proxy: Option<String>,

    /// Google Scholar mirror site URL
    #[arg(long)]
    mirror: Option<String>,

    /// host:port probed before each submission
    #[arg(long)]
    probe: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a research question and get suggested papers
    Ask {
        /// The research question
        question: String,

        /// Broad research field the tags belong to
        #[arg(long, default_value = "Computer Science")]
        field: String,

        /// Sub-field tag (repeatable, e.g. --tag "Machine Learning")
        #[arg(short, long = "tag")]
        tags: Vec<String>,

        /// Earliest publication year
        #[arg(long, default_value_t = 2020)]
        start_year: i32,

        /// Latest publication year (clamped up to --start-year)
        #[arg(long, default_value_t = 2023)]
        end_year: i32,

        /// Also list papers whose publication year is unknown
        #[arg(long)]
        include_undated: bool,

        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,

        /// Save suggested papers to this CSV file
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        backend: BackendArgs,
    },

    /// Run as HTTP server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        #[command(flatten)]
        backend: BackendArgs,
    },

    /// List research fields and their sub-fields
    Fields,

    /// Manage stored API keys
    Secrets {
        #[command(subcommand)]
        action: SecretAction,
    },
}

#[derive(Subcommand)]
enum SecretAction {
    /// Show secret file path
    Path,
    /// Store a secret (defaults to GROQ_API_KEY)
    Set {
        value: String,
        #[arg(long, default_value = API_KEY_VAR)]
        name: String,
    },
    /// Remove one stored secret (defaults to GROQ_API_KEY)
    Remove {
        #[arg(long, default_value = API_KEY_VAR)]
        name: String,
    },
    /// Remove stored secrets
    Clear,
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.debug { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));

    if cli.json_logs {
        fmt()
            .json()
            .with_writer(std::io::stderr)
            .with_env_filter(filter)
            .init();
    } else {
        fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(false)
            .init();
    }

    match cli.command {
        Commands::Ask {
            question,
            field,
            tags,
            start_year,
            end_year,
            include_undated,
            json,
            output,
            backend,
        } => {
            let settings = load_settings(backend)?;
            run_ask(
                &settings,
                &question,
                &field,
                &tags,
                YearRange::new(start_year, end_year),
                include_undated,
                json,
                output,
            )
            .await
        }
        Commands::Serve {
            port,
            host,
            backend,
        } => run_server(host, port, load_settings(backend)?).await,
        Commands::Fields => {
            print_fields();
            Ok(())
        }
        Commands::Secrets { action } => handle_secrets(action),
    }
}

/// Environment and secret store first, then command-line overrides
fn load_settings(backend: BackendArgs) -> Result<Settings> {
    let mut settings =
        Settings::from_env(&SecretStore::default()).context("Invalid configuration")?;

    if let Some(key) = backend.api_key.as_deref().and_then(ApiKey::new) {
        settings.api_key = Some(key);
    }
    if let Some(model) = backend.model {
        settings.model = model;
    }
    if let Some(base_url) = backend.base_url {
        settings.base_url = base_url;
    }
    if let Some(source) = backend.source {
        settings.source = source.parse()?;
    }
    if let Some(probe) = backend.probe {
        settings.probe_addr = probe;
    }
    settings.proxy = backend.proxy;
    settings.scholar_url = backend.mirror;

    Ok(settings)
}

// ============================================================================
// Ask
// ============================================================================

#[allow(clippy::too_many_arguments)]
async fn run_ask(
    settings: &Settings,
    question: &str,
    field: &str,
    tags: &[String],
    years: YearRange,
    include_undated: bool,
    json: bool,
    output: Option<PathBuf>,
) -> Result<()> {
    let tags = fields::validate_tags(field, tags)?;
    let query = Query::new(question, &tags, years)?;

    let assistant = Assistant::from_settings(settings)?;

    println!(
        "Researching your question in {} (papers via {})...",
        query.joined_tags(),
        assistant.source_name()
    );
    let outcome = assistant.submit(&query).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        println!("{}", render::render_outcome(&outcome, include_undated));
    }

    if let (Some(path), Outcome::Answered { retrieval, .. }) = (output, &outcome) {
        export::save_papers_csv(&path, &retrieval.papers)
            .with_context(|| format!("Failed to save papers to {}", path.display()))?;
        println!("Saved: {:?}", path);
    }

    Ok(())
}

fn print_fields() {
    for field in fields::catalog() {
        println!("{}", field.name);
        for subfield in field.subfields {
            println!("  - {}", subfield);
        }
    }
}

// ============================================================================
// HTTP Server
// ============================================================================

async fn run_server(host: String, port: u16, settings: Settings) -> Result<()> {
    info!(host = %host, port = port, source = %settings.source, "Starting HTTP server");

    // A missing API key does not stop the server; /ask reports it instead
    let app_state = Arc::new(match Assistant::from_settings(&settings) {
        Ok(assistant) => AppState {
            assistant: Some(assistant),
            startup_error: None,
        },
        Err(e) => {
            error!(error = %e, "Assistant unavailable");
            AppState {
                assistant: None,
                startup_error: Some(e.to_string()),
            }
        }
    });

    let app = Router::new()
        .route("/health", get(health_handler))
        .route("/fields", get(fields_handler))
        .route("/ask", post(ask_handler))
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .context("Invalid host:port")?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    println!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .await
        .context("Server error")?;

    Ok(())
}

struct AppState {
    assistant: Option<Assistant<AnySource>>,
    startup_error: Option<String>,
}

/// Health check endpoint
async fn health_handler() -> &'static str {
    "OK"
}

async fn fields_handler() -> Json<&'static [fields::Field]> {
    Json(fields::catalog())
}

/// Ask request body
#[derive(Debug, Deserialize)]
struct AskRequest {
    question: String,
    #[serde(default)]
    tags: Vec<String>,
    /// When set, every tag must be one of this field's sub-fields
    field: Option<String>,
    #[serde(default = "default_start_year")]
    year_start: i32,
    #[serde(default = "default_end_year")]
    year_end: i32,
}

fn default_start_year() -> i32 {
    2020
}

fn default_end_year() -> i32 {
    2023
}

/// Ask response: the outcome, or an error with `status: "error"`
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum AskResponse {
    Outcome(Outcome),
    Error { status: &'static str, error: String },
}

impl AskResponse {
    fn error(message: impl Into<String>) -> Self {
        Self::Error {
            status: "error",
            error: message.into(),
        }
    }
}

fn status_for(err: &ResearchError) -> StatusCode {
    match err {
        ResearchError::Validation(_) => StatusCode::BAD_REQUEST,
        ResearchError::Config(_) | ResearchError::Connectivity(_) => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::BAD_GATEWAY,
    }
}

/// Ask endpoint handler
async fn ask_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AskRequest>,
) -> (StatusCode, Json<AskResponse>) {
    let Some(assistant) = state.assistant.as_ref() else {
        let message = state.startup_error.clone().unwrap_or_default();
        return (StatusCode::SERVICE_UNAVAILABLE, Json(AskResponse::error(message)));
    };

    info!(tags = ?req.tags, year_start = req.year_start, year_end = req.year_end, "Ask request");

    let result: rustresearcher::Result<Outcome> = async {
        let tags = match req.field.as_deref() {
            Some(field) => fields::validate_tags(field, &req.tags)?,
            None => req.tags.clone(),
        };
        let query = Query::new(&req.question, &tags, YearRange::new(req.year_start, req.year_end))?;
        assistant.submit(&query).await
    }
    .await;

    match result {
        Ok(outcome) => (StatusCode::OK, Json(AskResponse::Outcome(outcome))),
        Err(e) => {
            if e.is_local() {
                warn!(error = %e, "Ask rejected");
            } else {
                error!(error = %e, "Ask failed");
            }
            (status_for(&e), Json(AskResponse::error(e.to_string())))
        }
    }
}

// ============================================================================
// Secret Management
// ============================================================================

fn handle_secrets(action: SecretAction) -> Result<()> {
    let store = SecretStore::new()?;

    match action {
        SecretAction::Path => {
            println!("Secret file: {:?}", store.path());
        }
        SecretAction::Set { value, name } => {
            if value.trim().is_empty() {
                anyhow::bail!("Refusing to store an empty value for {}", name);
            }
            store.set(&name, &value)?;
            println!("Stored {} in {:?}", name, store.path());
        }
        SecretAction::Remove { name } => {
            if store.remove(&name)? {
                println!("Removed {} from {:?}", name, store.path());
            } else {
                println!("{} was not stored in {:?}", name, store.path());
            }
        }
        SecretAction::Clear => {
            store.clear()?;
            println!("Secrets cleared.");
        }
    }

    Ok(())
}
