//! HTTP client for the Dynatrace platform APIs.
//!
//! Covers what the MCP server needs from an environment: authentication
//! (platform token or OAuth client credentials), the Grail query API behind
//! [`dynatrace_grail::QueryService`], and the classic environment, automation
//! and app-function endpoints used by the pass-through tools.

pub mod auth;
pub mod client;
pub mod env;
pub mod error;
pub mod models;
pub mod scopes;
pub mod user_agent;
pub mod workflow;

pub use auth::Authenticator;
pub use client::{DynatraceClient, GrailQueryService};
pub use env::{Credentials, DynatraceEnv, DEFAULT_SLACK_CONNECTION_ID};
pub use error::{ClientError, ClientResult};
pub use models::{Entity, Problem, SecurityProblem, Workflow};
pub use user_agent::user_agent;
