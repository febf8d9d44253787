//! Campus Assistant CLI
//!
//! Main entry point for the `campus` command-line tool: chat with the
//! assistant, manage the knowledge base and work the escalation queue.

mod commands;

use anyhow::Context;
use campus_core::{config::AppConfig, logging};
use clap::{Parser, Subcommand};
use commands::{
    ChatCommand, EscalationsCommand, KnowledgeCommand, LanguagesCommand, ReindexCommand,
    SweepCommand, WelcomeCommand,
};
use std::path::PathBuf;

/// Campus Assistant - multilingual answers from the campus knowledge base
#[derive(Parser, Debug)]
#[command(name = "campus")]
#[command(about = "Multilingual campus help desk with retrieval-grounded answers", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "CAMPUS_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "CAMPUS_CONFIG")]
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

    /// LLM provider (ollama)
    #[arg(short, long, global = true, env = "CAMPUS_PROVIDER")]
    provider: Option<String>,

    /// Model identifier
    #[arg(short, long, global = true, env = "CAMPUS_MODEL")]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ask the assistant a question (interactive without a message)
    Chat(ChatCommand),

    /// Rebuild the knowledge index
    Reindex(ReindexCommand),

    /// Show the welcome message
    Welcome(WelcomeCommand),

    /// List supported languages
    Languages(LanguagesCommand),

    /// Knowledge base management
    Knowledge(KnowledgeCommand),

    /// Escalation queue administration
    Escalations(EscalationsCommand),

    /// Expire inactive sessions
    Sweep(SweepCommand),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    let config = AppConfig::load().context("Failed to load configuration")?;
    let config = config.with_overrides(
        cli.workspace,
        cli.config,
        cli.provider,
        cli.model,
        cli.log_level,
        cli.verbose,
        cli.no_color,
    );

    logging::init_logging(
        config.log_level.as_deref(),
        config.no_color,
        logging::LogFormat::parse(&config.log_format),
    )?;

    tracing::info!("Campus Assistant CLI starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Provider: {}", config.provider);
    tracing::debug!("Model: {}", config.model);

    config.ensure_campus_dir()?;

    let command_name = match &cli.command {
        Commands::Chat(_) => "chat",
        Commands::Reindex(_) => "reindex",
        Commands::Welcome(_) => "welcome",
        Commands::Languages(_) => "languages",
        Commands::Knowledge(_) => "knowledge",
        Commands::Escalations(_) => "escalations",
        Commands::Sweep(_) => "sweep",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    let result = match cli.command {
        Commands::Chat(cmd) => cmd.execute(&config).await,
        Commands::Reindex(cmd) => cmd.execute(&config).await,
        Commands::Welcome(cmd) => cmd.execute(&config).await,
        Commands::Languages(cmd) => cmd.execute(&config),
        Commands::Knowledge(cmd) => cmd.execute(&config).await,
        Commands::Escalations(cmd) => cmd.execute(&config),
        Commands::Sweep(cmd) => cmd.execute(&config),
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result.with_context(|| format!("campus {} failed", command_name))
}
