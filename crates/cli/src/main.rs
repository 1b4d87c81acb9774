//! attachkit CLI — the main entry point.
//!
//! Commands:
//! - `discover` — List instruction files in the workspace
//! - `inspect`  — Resolve instruction files and show their status
//! - `attach`   — Run files through file admission control
//! - `status`   — Show effective configuration
//! - `doctor`   — Diagnose configuration and instruction locations

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "attachkit",
    about = "attachkit — context attachment admission and instruction status",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List instruction files found in the configured locations
    Discover {
        /// Workspace root to search (repeatable; defaults to the current directory)
        #[arg(short, long = "root")]
        roots: Vec<PathBuf>,
    },

    /// Resolve instruction files and report their reference status
    Inspect {
        /// Instruction files to attach
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Attach files under the file limit and show what was admitted
    Attach {
        /// Files to attach, in order
        files: Vec<PathBuf>,

        /// Override the configured file limit
        #[arg(short, long, env = "ATTACHKIT_MAX_FILES")]
        limit: Option<usize>,

        /// Attachment ids or file paths to detach afterwards (repeatable)
        #[arg(short, long)]
        remove: Vec<String>,
    },

    /// Show effective configuration
    Status,

    /// Diagnose configuration and instruction locations
    Doctor,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Discover { roots } => commands::discover::run(roots).await?,
        Commands::Inspect { files, json } => commands::inspect::run(files, json).await?,
        Commands::Attach {
            files,
            limit,
            remove,
        } => commands::attach::run(files, limit, remove).await?,
        Commands::Status => commands::status::run().await?,
        Commands::Doctor => commands::doctor::run().await?,
    }

    Ok(())
}
