// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! pqbench CLI
//!
//! Command-line interface for the post-quantum TLS benchmark sweep.

use clap::{Parser, Subcommand};

mod commands;

/// pqbench - TLS handshake and KEM/SIG benchmark run controller
#[derive(Parser)]
#[command(name = "pqbench")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path (built-in matrix if omitted)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Enable verbose logging (also captures server and tool output)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the full benchmark sweep
    Run {
        /// Use the alternate cryptography provider in every tool
        #[arg(long)]
        alt_provider: bool,

        /// Write result files here instead of the configured directory
        #[arg(short, long)]
        output_dir: Option<String>,
    },

    /// Print the combinations a run would measure, without running anything
    Plan,

    /// Validate a configuration file
    Validate {
        /// Path to the configuration file
        file: String,
    },

    /// Aggregate result directories of repeated runs
    Summarize {
        /// Run directories, named `<provider>_<n>`
        #[arg(required = true)]
        dirs: Vec<String>,

        /// Also write the summary as JSON to this file
        #[arg(long)]
        json: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt().with_env_filter(log_level).init();

    // Dispatch to command handlers
    match cli.command {
        Commands::Run {
            alt_provider,
            output_dir,
        } => commands::run::execute(cli.config.as_deref(), alt_provider, output_dir.as_deref()).await,
        Commands::Plan => commands::plan::execute(cli.config.as_deref()).await,
        Commands::Validate { file } => commands::validate::execute(&file).await,
        Commands::Summarize { dirs, json } => {
            commands::summarize::execute(&dirs, json.as_deref()).await
        }
    }
}
