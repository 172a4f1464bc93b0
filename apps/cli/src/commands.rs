//! CLI command definitions, routing, and tracing setup.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;
use url::Url;

use incidesk_confluence::{ClientOptions, ConfluenceClient};
use incidesk_core::assistant::{Assistant, AssistantOptions};
use incidesk_core::sync::{ProgressReporter, SyncConfig, sync_reports};
use incidesk_shared::{
    AppConfig, config::expand_home, config_file_path, init_config, load_config,
    resolve_api_token, resolve_openai_key,
};
use incidesk_storage::Storage;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Incidesk — keep an incident-report lookup table in sync and query it.
#[derive(Parser)]
#[command(
    name = "incidesk",
    version,
    about = "Sync incident reports from a Confluence page tree and search them by keyword.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Override the database path from the config file.
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Crawl the report hierarchy and reconcile it into the local table.
    Sync {
        /// Root page id to descend from (defaults to the configured one).
        root_id: Option<String>,
    },

    /// Search synced reports by keyword.
    Search {
        /// Keyword matched case-insensitively against titles and content.
        keyword: String,

        /// Emit results as JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Search and summarize matches through the language-model API.
    Ask {
        /// Keyword to search and summarize.
        keyword: String,
    },

    /// Run the HTTP query endpoint.
    Serve {
        /// Listen port (defaults to the configured one).
        #[arg(long)]
        port: Option<u16>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "incidesk=info",
        1 => "incidesk=debug",
        _ => "incidesk=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let db_override = cli.db.clone();
    match cli.command {
        Command::Sync { root_id } => cmd_sync(root_id.as_deref(), db_override.as_deref()).await,
        Command::Search { keyword, json } => {
            cmd_search(&keyword, json, db_override.as_deref()).await
        }
        Command::Ask { keyword } => cmd_ask(&keyword, db_override.as_deref()).await,
        Command::Serve { port } => cmd_serve(port, db_override.as_deref()).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// Shared setup helpers
// ---------------------------------------------------------------------------

/// Resolve the database path and open storage.
async fn open_storage(config: &AppConfig, db_override: Option<&std::path::Path>) -> Result<Storage> {
    let path = match db_override {
        Some(p) => p.to_path_buf(),
        None => expand_home(&config.database.path),
    };
    Ok(Storage::open(&path).await?)
}

/// Build the document-API client from config plus the token env var.
fn build_client(config: &AppConfig) -> Result<ConfluenceClient> {
    if config.confluence.base_url.is_empty() {
        return Err(eyre!(
            "confluence.base_url is not configured — run `incidesk config init` and edit {}",
            config_file_path()?.display()
        ));
    }

    let base_url = Url::parse(&config.confluence.base_url)
        .map_err(|e| eyre!("invalid confluence.base_url: {e}"))?;
    let api_token = resolve_api_token(config)?;

    Ok(ConfluenceClient::new(ClientOptions {
        base_url,
        email: config.confluence.email.clone(),
        api_token,
        page_limit: config.confluence.page_limit,
    })?)
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap()
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn reports_collected(&self, count: usize) {
        self.spinner
            .set_message(format!("{count} incidencias encontradas"));
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_sync(root_id: Option<&str>, db_override: Option<&std::path::Path>) -> Result<()> {
    let config = load_config()?;
    let client = build_client(&config)?;
    let storage = open_storage(&config, db_override).await?;

    let root_page_id = match root_id {
        Some(id) => id.to_string(),
        None if !config.confluence.root_page_id.is_empty() => {
            config.confluence.root_page_id.clone()
        }
        None => {
            return Err(eyre!(
                "no root page id: pass one as an argument or set confluence.root_page_id"
            ));
        }
    };

    let sync_config = SyncConfig {
        root_page_id,
        report_prefixes: config.confluence.report_prefixes.clone(),
    };

    info!(root_id = %sync_config.root_page_id, "starting sync");

    let progress = CliProgress::new();
    let result = sync_reports(&client, &storage, &sync_config, &progress).await?;
    progress.finish();

    println!();
    println!("  {} incidencias sincronizadas con la base de datos.", result.reports_synced);
    println!("  Páginas visitadas: {}", result.pages_visited);
    if !result.errors.is_empty() {
        println!("  Errores (parciales): {}", result.errors.len());
        for (page, error) in &result.errors {
            println!("    - {page}: {error}");
        }
    }
    println!("  Tiempo: {:.1}s", result.elapsed.as_secs_f64());
    println!();

    Ok(())
}

async fn cmd_search(
    keyword: &str,
    json: bool,
    db_override: Option<&std::path::Path>,
) -> Result<()> {
    let config = load_config()?;
    let storage = open_storage(&config, db_override).await?;

    let hits = incidesk_core::search::search_reports(&storage, keyword).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&hits)?);
        return Ok(());
    }

    if hits.is_empty() {
        println!("No se encontraron incidencias relacionadas con '{keyword}'.");
        return Ok(());
    }

    for hit in &hits {
        println!("== {} ==", hit.title);
        println!("{}", hit.content);
        println!();
    }
    println!("{} incidencias encontradas.", hits.len());

    Ok(())
}

async fn cmd_ask(keyword: &str, db_override: Option<&std::path::Path>) -> Result<()> {
    let config = load_config()?;
    let storage = open_storage(&config, db_override).await?;

    let hits = incidesk_core::search::search_reports(&storage, keyword).await;

    let api_key = resolve_openai_key(&config)?;
    let assistant = Assistant::new(AssistantOptions::new(
        api_key,
        config.openai.model.clone(),
        config.openai.max_tokens,
        config.openai.temperature,
    ))?;

    // An API failure degrades to a readable message, not a crash.
    match assistant.summarize(keyword, &hits).await {
        Ok(summary) => {
            println!("{summary}");
        }
        Err(e) => {
            println!("No se pudo generar el resumen: {e}");
        }
    }

    Ok(())
}

async fn cmd_serve(port: Option<u16>, db_override: Option<&std::path::Path>) -> Result<()> {
    let config = load_config()?;
    let storage = open_storage(&config, db_override).await?;

    let port = port.unwrap_or(config.server.port);
    let addr: SocketAddr = format!("{}:{}", config.server.bind, port)
        .parse()
        .map_err(|e| eyre!("invalid bind address: {e}"))?;

    let state = Arc::new(incidesk_server::AppState { storage });
    incidesk_server::serve(addr, state).await?;

    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config file created at {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config = load_config()?;
    println!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}
