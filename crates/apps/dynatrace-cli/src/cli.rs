//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Dynatrace MCP server.
#[derive(Parser, Debug)]
#[command(name = "dynatrace-mcp")]
#[command(author = "Dynatrace MCP Contributors")]
#[command(version)]
#[command(about = "MCP server for Dynatrace environments")]
#[command(
    long_about = "Exposes a Dynatrace environment to AI assistants over the Model Context Protocol.\n\nWithout a subcommand the server is started on stdio."
)]
pub struct Cli {
    /// Subcommand to execute (default: serve).
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to configuration file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (to stderr).
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve MCP on stdio.
    Serve,

    /// Validate the configuration and connect to the environment.
    Check,

    /// Execute a DQL statement and print the result summary.
    ///
    /// The query is charged against a fresh Grail budget.
    Query {
        /// The DQL statement.
        dql: String,

        /// Maximum number of records the backend returns.
        #[arg(short = 'n', long)]
        max_records: Option<u64>,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        #[arg(value_enum)]
        shell: CompletionShell,
    },
}

/// Shells supported by `completions`.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
    #[value(name = "powershell")]
    PowerShell,
}
