//! MCP server for a Dynatrace environment.
//!
//! Exposes problems, vulnerabilities, monitored entities, logs, DQL queries
//! and notification workflows as MCP tools. DQL-backed tools are metered by a
//! session-scoped Grail budget; once it is exceeded they refuse to run until
//! `reset_grail_budget` is called.
//!
//! # Example
//!
//! ```no_run
//! use dynatrace_client::{DynatraceClient, DynatraceEnv};
//! use dynatrace_mcp::{run_server, McpServerConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//! let env = DynatraceEnv::from_env()?;
//! let client = DynatraceClient::new(&env)?;
//! run_server(McpServerConfig::from_env(&env), client).await?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod queries;
pub mod render;
pub mod server;
pub mod tools;

pub use error::{ErrorCode, McpError, McpResult};
pub use server::{run_server, DynatraceMcpServer, McpServerConfig};
