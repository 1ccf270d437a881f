//! CLI error types.

use dynatrace_client::ClientError;
use dynatrace_grail::GrailError;
use thiserror::Error;

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

/// Errors reported by the `dynatrace-mcp` binary.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Request to the environment failed.
    #[error("{0}")]
    Client(ClientError),

    /// Query execution failed.
    #[error("{0}")]
    Grail(#[from] GrailError),

    /// IO error.
    #[error("{0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// User-facing error with actionable message.
    #[error("{0}")]
    User(String),
}

impl From<ClientError> for CliError {
    fn from(e: ClientError) -> Self {
        match e {
            ClientError::Config(msg) => Self::Config(msg),
            other => Self::Client(other),
        }
    }
}

impl CliError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a user-facing error.
    pub fn user(msg: impl Into<String>) -> Self {
        Self::User(msg.into())
    }

    /// Get the exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            // User errors: 1
            Self::User(_) => 1,
            // Config errors: 3
            Self::Config(_) | Self::Toml(_) => 3,
            // Budget errors: 4
            Self::Grail(GrailError::BudgetExceeded { .. }) => 4,
            // Environment errors: 5
            Self::Client(_) => 5,
            // Query errors: 8
            Self::Grail(_) => 8,
            // IO errors: 9
            Self::Io(_) => 9,
            // JSON/format errors: 10
            Self::Json(_) => 10,
        }
    }

    /// Short identifier shown next to the error.
    pub fn label(&self) -> &'static str {
        match self {
            Self::User(_) => "USER",
            Self::Config(_) | Self::Toml(_) => "CONFIG",
            Self::Client(_) => "CLIENT",
            Self::Grail(_) => "QUERY",
            Self::Io(_) => "IO",
            Self::Json(_) => "FORMAT",
        }
    }

    /// Recovery hint, if there is one.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Config(_) => Some(
                "Set DT_ENVIRONMENT and DT_PLATFORM_TOKEN (or OAUTH_CLIENT_ID and OAUTH_CLIENT_SECRET), or add them to ~/.dynatrace-mcp/config.toml",
            ),
            Self::Toml(_) => Some("Check the syntax of the configuration file"),
            Self::Client(e) => Some(e.suggestion()),
            Self::Grail(e) => Some(e.suggestion()),
            _ => None,
        }
    }
}
