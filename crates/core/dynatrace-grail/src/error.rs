//! Error types for Grail query execution and budget enforcement.

use thiserror::Error;

/// Result type for Grail operations.
pub type GrailResult<T> = Result<T, GrailError>;

/// Errors that can occur while executing queries or enforcing the budget.
#[derive(Debug, Error)]
pub enum GrailError {
    /// The configured budget is neither a positive number nor the unlimited sentinel.
    #[error("invalid Grail budget: {value} GB (expected a positive number of GB, or -1 for unlimited)")]
    InvalidBudget {
        /// The rejected value in GB.
        value: f64,
    },

    /// The session budget has been used up.
    #[error(
        "Grail budget exceeded ({usage_percentage:.1}% of {limit_gb} GB limit used). \
         Use the \"reset_grail_budget\" tool to reset the budget and continue querying."
    )]
    BudgetExceeded {
        /// Usage of the budget in percent.
        usage_percentage: f64,
        /// Configured ceiling in GB.
        limit_gb: f64,
    },

    /// The query did not reach a terminal state within the poll limit.
    #[error("query {request_token} still running after {attempts} poll attempts")]
    PollTimeout {
        /// Token of the pending query.
        request_token: String,
        /// Number of polls performed.
        attempts: u32,
    },

    /// Submit or poll call failed at the transport or backend level.
    #[error("query service error{}: {message}", .status.map(|s| format!(" ({})", s)).unwrap_or_default())]
    Transport {
        /// HTTP status, when the backend answered.
        status: Option<u16>,
        /// Error description.
        message: String,
    },

    /// The backend answered with something that is not a query response.
    #[error("invalid query service response: {0}")]
    InvalidResponse(String),
}

impl GrailError {
    /// Create a transport error without an HTTP status.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            status: None,
            message: message.into(),
        }
    }

    /// Returns a user-friendly suggestion for recovering from this error.
    pub fn suggestion(&self) -> &str {
        match self {
            Self::InvalidBudget { .. } => {
                "Set DT_GRAIL_QUERY_BUDGET_GB to a positive number, or -1 to disable the limit"
            }
            Self::BudgetExceeded { .. } => {
                "Call reset_grail_budget, or raise DT_GRAIL_QUERY_BUDGET_GB"
            }
            Self::PollTimeout { .. } => "Narrow the query timeframe or add a limit and retry",
            Self::Transport { .. } => "Check connectivity and permissions for the environment",
            Self::InvalidResponse(_) => "This is likely a server-side issue; please retry later",
        }
    }
}
