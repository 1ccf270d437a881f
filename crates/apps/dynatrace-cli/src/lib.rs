//! Command-line interface of the Dynatrace MCP server.
//!
//! This crate provides the `dynatrace-mcp` binary. Without a subcommand it
//! serves MCP on stdio; the other commands help setting it up:
//!
//! - **serve**: run the MCP server (default)
//! - **check**: validate settings and reach the environment
//! - **query**: run one DQL statement from the shell
//! - **completions**: generate shell completions
//!
//! # Configuration
//!
//! Settings are read from `DT_ENVIRONMENT`, `DT_PLATFORM_TOKEN` (or
//! `OAUTH_CLIENT_ID` and `OAUTH_CLIENT_SECRET`), `SLACK_CONNECTION_ID` and
//! `DT_GRAIL_QUERY_BUDGET_GB`, falling back to `~/.dynatrace-mcp/config.toml`.
//! Override the file with `--config`.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;

// Re-export main types
pub use cli::{Cli, Commands, CompletionShell};
pub use config::{CliConfig, Settings};
pub use error::{CliError, CliResult};
