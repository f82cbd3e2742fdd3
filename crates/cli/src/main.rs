//! Tripweave CLI
//!
//! Builds a travel knowledge store from CSV narratives and plans grounded
//! multi-day itineraries from it.

mod commands;

use anyhow::Context;
use clap::{Parser, Subcommand};
use commands::{IngestCommand, PlanCommand, SearchCommand, StatsCommand};
use std::path::PathBuf;
use tripweave_core::{config::AppConfig, logging};

/// Tripweave - retrieval-grounded travel itineraries
#[derive(Parser, Debug)]
#[command(name = "tripweave")]
#[command(about = "Retrieval-grounded travel itineraries", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "TRIPWEAVE_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "TRIPWEAVE_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// LLM provider (openai, ollama)
    #[arg(short, long, global = true, env = "TRIPWEAVE_PROVIDER")]
    provider: Option<String>,

    /// Model identifier
    #[arg(short, long, global = true, env = "TRIPWEAVE_MODEL")]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build the knowledge store from CSV exports
    Ingest(IngestCommand),

    /// Search the knowledge store
    Search(SearchCommand),

    /// Plan a multi-day itinerary
    Plan(PlanCommand),

    /// Show store statistics
    Stats(StatsCommand),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    let config = AppConfig::load()
        .context("Failed to load configuration")?
        .with_overrides(
            cli.workspace,
            cli.config,
            cli.provider,
            cli.model,
            cli.log_level,
            cli.verbose,
            cli.no_color,
        );

    logging::init_logging(config.log_level.as_deref(), config.no_color)?;

    tracing::info!("Tripweave CLI starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Provider: {}", config.provider);
    tracing::debug!("Model: {}", config.model);

    config.ensure_tripweave_dir()?;

    let command_name = match &cli.command {
        Commands::Ingest(_) => "ingest",
        Commands::Search(_) => "search",
        Commands::Plan(_) => "plan",
        Commands::Stats(_) => "stats",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    let result = match cli.command {
        Commands::Ingest(cmd) => cmd.execute(&config).await,
        Commands::Search(cmd) => cmd.execute(&config).await,
        Commands::Plan(cmd) => cmd.execute(&config).await,
        Commands::Stats(cmd) => cmd.execute(&config).await,
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result.with_context(|| format!("tripweave {} failed", command_name))
}
