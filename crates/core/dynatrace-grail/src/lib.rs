//! Grail query execution and session budget accounting.
//!
//! This crate holds the only stateful part of the Dynatrace MCP server: the
//! accounting of how much data DQL queries scan during a session, and the
//! polling protocol used to run those queries against the Grail storage API.
//!
//! # Components
//!
//! - **[`budget`]**: [`BudgetTracker`] and the session-scoped [`BudgetRegistry`]
//! - **[`executor`]**: [`QueryExecutor`], submit + poll until a terminal state
//! - **[`format`]**: human-readable summaries of a [`QueryResult`]
//! - **[`service`]**: the [`QueryService`] seam to the remote query API
//! - **[`types`]**: wire types of the query API
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use dynatrace_grail::{BudgetLimit, BudgetRegistry, ExecuteRequest, QueryExecutor, QueryService};
//!
//! # async fn example(service: Arc<dyn QueryService>) -> Result<(), Box<dyn std::error::Error>> {
//! let budget = Arc::new(BudgetRegistry::new());
//! let executor = QueryExecutor::new(service, Arc::clone(&budget));
//! let limit = BudgetLimit::from_gb(10.0)?;
//!
//! budget.enforce_budget_limit(limit)?;
//! let result = executor
//!     .execute(&ExecuteRequest::new("fetch logs | limit 10"), Some(limit))
//!     .await?;
//! println!("{}", dynatrace_grail::format_query_result(&result, &Default::default()));
//! # Ok(())
//! # }
//! ```

pub mod budget;
pub mod error;
pub mod executor;
pub mod format;
pub mod service;
pub mod types;

// Re-export main types
pub use budget::{
    bytes_to_gb, BudgetLimit, BudgetRegistry, BudgetState, BudgetTracker, BudgetWarning,
    WarningKind, BYTES_PER_GB, DEFAULT_BUDGET_GB, UNLIMITED_BUDGET_SENTINEL,
    WARNING_THRESHOLD_RATIO,
};
pub use error::{GrailError, GrailResult};
pub use executor::{ExecutorConfig, QueryExecutor, DEFAULT_MAX_POLL_ATTEMPTS, DEFAULT_POLL_INTERVAL};
pub use format::{format_query_result, FormatOptions, ScanTier, DEFAULT_MAX_PREVIEW_RECORDS};
pub use service::QueryService;
pub use types::{
    ExecuteRequest, PollResponse, PollState, QueryPayload, QueryResult, ScanMetadata,
    SubmitResponse, VerifyNotification, VerifyResponse,
};
