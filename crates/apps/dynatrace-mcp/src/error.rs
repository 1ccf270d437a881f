//! Error types for the MCP server.

use std::fmt;

use dynatrace_client::ClientError;
use dynatrace_grail::GrailError;
use thiserror::Error;

/// Result type for MCP operations.
pub type McpResult<T> = Result<T, McpError>;

/// Error codes reported in tool error payloads.
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // =========================================================================
    // Request Errors (0x0001 - 0x00FF)
    // =========================================================================
    /// Required tool argument is missing or empty
    InvalidInput = 0x0001,
    /// Platform rejected the request
    ClientRequestError = 0x0002,
    /// Token lacks the scopes for this request
    MissingPermission = 0x0003,
    /// Token request failed
    AuthenticationFailed = 0x0004,

    // =========================================================================
    // Query Errors (0x0100 - 0x01FF)
    // =========================================================================
    /// Session Grail budget is used up
    BudgetExceeded = 0x0100,
    /// Query did not finish within the poll limit
    PollTimeout = 0x0101,
    /// Query service answered with something unexpected
    QueryFailed = 0x0102,

    // =========================================================================
    // Server Errors (0x0F00 - 0x0FFF)
    // =========================================================================
    /// Network failure talking to the platform
    NetworkError = 0x0F00,
    /// Anything else
    InternalError = 0x0FFF,
}

impl ErrorCode {
    /// Get the numeric code value
    pub fn code(&self) -> u16 {
        *self as u16
    }

    /// Get a user-friendly suggestion for recovering from this error.
    pub fn suggestion(&self) -> &'static str {
        match self {
            Self::InvalidInput => "Provide all required arguments for this tool.",
            Self::ClientRequestError => "Check the identifiers passed to the tool and try again.",
            Self::MissingPermission => {
                "Grant the missing scope to the platform token or OAuth client and restart the server."
            }
            Self::AuthenticationFailed => "Check OAUTH_CLIENT_ID and OAUTH_CLIENT_SECRET.",
            Self::BudgetExceeded => {
                "Use the \"reset_grail_budget\" tool or raise DT_GRAIL_QUERY_BUDGET_GB."
            }
            Self::PollTimeout => "Narrow the query timeframe or add a limit and retry.",
            Self::QueryFailed => "Verify the statement with the \"verify_dql\" tool.",
            Self::NetworkError => "Check connectivity to the Dynatrace environment and retry.",
            Self::InternalError => "Retry the request; check the server logs if it keeps failing.",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::InvalidInput => "INVALID_INPUT",
            Self::ClientRequestError => "CLIENT_REQUEST_ERROR",
            Self::MissingPermission => "MISSING_PERMISSION",
            Self::AuthenticationFailed => "AUTHENTICATION_FAILED",
            Self::BudgetExceeded => "BUDGET_EXCEEDED",
            Self::PollTimeout => "POLL_TIMEOUT",
            Self::QueryFailed => "QUERY_FAILED",
            Self::NetworkError => "NETWORK_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        };
        f.write_str(name)
    }
}

/// Error types for MCP server operations.
#[derive(Debug, Error)]
pub enum McpError {
    /// Request to the Dynatrace platform failed.
    #[error("{}", client_message(.0))]
    Client(#[from] ClientError),

    /// Grail query or budget error.
    #[error("{}", grail_message(.0))]
    Grail(#[from] GrailError),

    /// A required tool argument was not supplied.
    #[error("missing required parameter: {0}")]
    MissingParameter(&'static str),

    /// JSON serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Forbidden responses get a hint that the token lacks a scope.
fn client_message(error: &ClientError) -> String {
    match error.status() {
        Some(403) => format!("{} Missing permission", error),
        _ => error.to_string(),
    }
}

/// Query transport failures read like any other platform request failure.
fn grail_message(error: &GrailError) -> String {
    match error {
        GrailError::Transport {
            status: Some(status),
            message,
        } => client_message(&ClientError::Http {
            status: *status,
            message: message.clone(),
        }),
        other => other.to_string(),
    }
}

impl McpError {
    /// Create a new internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Get the error code reported to the agent.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::Client(e) => match e {
                ClientError::Http { status: 403, .. } => ErrorCode::MissingPermission,
                ClientError::Http { .. } => ErrorCode::ClientRequestError,
                ClientError::Auth { .. } => ErrorCode::AuthenticationFailed,
                ClientError::Network(_) => ErrorCode::NetworkError,
                ClientError::Config(_) | ClientError::InvalidResponse(_) => {
                    ErrorCode::InternalError
                }
            },
            Self::Grail(e) => match e {
                GrailError::BudgetExceeded { .. } => ErrorCode::BudgetExceeded,
                GrailError::PollTimeout { .. } => ErrorCode::PollTimeout,
                GrailError::Transport {
                    status: Some(403), ..
                } => ErrorCode::MissingPermission,
                GrailError::Transport { status: None, .. } => ErrorCode::NetworkError,
                GrailError::Transport { .. } => ErrorCode::ClientRequestError,
                GrailError::InvalidResponse(_) => ErrorCode::QueryFailed,
                GrailError::InvalidBudget { .. } => ErrorCode::InternalError,
            },
            Self::MissingParameter(_) => ErrorCode::InvalidInput,
            Self::Serialization(_) | Self::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// Recovery hint, preferring the more specific hint of the source error.
    pub fn suggestion(&self) -> String {
        match self {
            Self::Client(e) => e.suggestion().to_string(),
            Self::Grail(e) => e.suggestion().to_string(),
            _ => self.error_code().suggestion().to_string(),
        }
    }
}
