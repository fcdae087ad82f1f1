//! Promptloom CLI — the main entry point.
//!
//! Commands:
//! - `estimate` — Estimate the token cost of a piece of text
//! - `condense` — Condense text down to a token target
//! - `assemble` — Assemble a budgeted prompt from components

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "promptloom",
    about = "Promptloom — budgeted prompt assembly for agent runtimes",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to a config file (defaults to built-in settings)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Estimate the token cost of text from a file or stdin
    Estimate {
        /// Read text from this file instead of stdin
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Also split the text into chunks of at most this many tokens
        #[arg(long)]
        chunk: Option<usize>,
    },

    /// Condense text down to a token target
    Condense {
        /// Read text from this file instead of stdin
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Target token count for the condensed output
        #[arg(short, long)]
        target: usize,

        /// Relevance hint forwarded to the summarizer
        #[arg(long)]
        hint: Option<String>,
    },

    /// Assemble a budgeted prompt from components
    Assemble {
        /// The user query (highest-priority component)
        #[arg(short, long)]
        query: String,

        /// System message
        #[arg(short, long)]
        system: Option<String>,

        /// Task instructions
        #[arg(short, long)]
        instructions: Option<String>,

        /// File with retrieved knowledge to include as context
        #[arg(short, long)]
        knowledge: Option<PathBuf>,

        /// JSON file with conversation history ([{"role": ..., "content": ...}])
        #[arg(long)]
        history: Option<PathBuf>,

        /// Override the prompt token budget from the config
        #[arg(short, long)]
        max_tokens: Option<usize>,

        /// Print assembly statistics to stderr
        #[arg(long)]
        stats: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = match &cli.config {
        Some(path) => promptloom_config::AppConfig::load(path)
            .map_err(|e| format!("failed to load config: {e}"))?,
        None => promptloom_config::AppConfig::from_env()
            .map_err(|e| format!("failed to build config: {e}"))?,
    };

    match cli.command {
        Commands::Estimate { file, chunk } => commands::estimate::run(file, chunk)?,
        Commands::Condense { file, target, hint } => {
            commands::condense::run(&config, file, target, hint)?
        }
        Commands::Assemble {
            query,
            system,
            instructions,
            knowledge,
            history,
            max_tokens,
            stats,
        } => commands::assemble::run(
            &config,
            commands::assemble::AssembleArgs {
                query,
                system,
                instructions,
                knowledge,
                history,
                max_tokens,
                stats,
            },
        )?,
    }

    Ok(())
}
