use std::path::PathBuf;

use clap::{Parser, Subcommand};

use smriti_cli::commands::{config_cmd, ingest, recall, search, svapna, vasana};
use smriti_cli::commands::vasana::VasanaCommand;
use smriti_cli::config::load_config;
use smriti_cli::engine::Engine;
use smriti_cli::output::OutputFormat;

#[derive(Parser)]
#[command(name = "smriti")]
#[command(about = "Command-line interface for the Smriti memory and consolidation engine")]
#[command(version, long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Human)]
    format: OutputFormat,

    /// Override the configured project scope for this invocation
    #[arg(long)]
    project: Option<String>,

    /// Override the Smriti home directory for this invocation
    #[arg(long, value_name = "DIR")]
    home: Option<PathBuf>,

    /// Enable verbose (debug-level) logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a session (and its turns) from a JSON manifest.
    Ingest {
        /// Path to the session manifest.
        manifest: PathBuf,
    },
    /// Unified recall across hybrid search, memory, and day files.
    Recall {
        query: String,
        #[arg(long, default_value_t = 5)]
        limit: usize,
    },
    /// Direct hybrid search, bypassing the recall gate.
    Search {
        query: String,
        #[arg(long, default_value_t = 10)]
        top_k: usize,
    },
    /// Inspect and operate the behavioral-tendency engine.
    Vasana {
        #[command(subcommand)]
        command: VasanaCommand,
    },
    /// Run one offline dream-consolidation cycle.
    Svapna,
    /// Print the effective, fully-resolved configuration.
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    tracing_subscriber::fmt().with_max_level(level).init();

    let mut config = load_config(cli.config.as_deref())?;
    if let Some(project) = cli.project {
        config.project = Some(project);
    }
    if let Some(home) = cli.home {
        config.home = home;
    }

    let engine = Engine::open(config).await?;

    match cli.command {
        Commands::Ingest { manifest } => {
            let output = ingest::run(&engine, &manifest).await?;
            engine.persist_state().await?;
            cli.format.print(&output)
        }
        Commands::Recall { query, limit } => {
            let output = recall::run(&engine, &query, limit).await?;
            cli.format.print(&output)
        }
        Commands::Search { query, top_k } => {
            let output = search::run(&engine, &query, top_k).await?;
            cli.format.print(&output)
        }
        Commands::Vasana { command } => {
            let output = vasana::run(&engine, &command).await?;
            engine.persist_state().await?;
            cli.format.print(&output)
        }
        Commands::Svapna => {
            let output = svapna::run(&engine).await?;
            engine.persist_state().await?;
            cli.format.print(&output)
        }
        Commands::Config => {
            let output = config_cmd::run(&engine.config);
            cli.format.print(&output)
        }
    }
}
