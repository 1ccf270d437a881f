//! Error types for the Dynatrace HTTP client.

use dynatrace_grail::GrailError;
use thiserror::Error;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur while talking to a Dynatrace environment.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Environment variables or configuration values are missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// The environment answered with a non-success status.
    #[error("Client Request Error: {message} ({status})")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Error message from the response body, or the raw body.
        message: String,
    },

    /// The request never got an answer.
    #[error("network error: {0}")]
    Network(String),

    /// The SSO token endpoint refused to issue a token.
    #[error(
        "Failed to retrieve OAuth token (IssueId: {}): {} - {}. Note: Your OAuth client is most likely not configured correctly and/or is missing scopes.",
        .issue_id.as_deref().unwrap_or("unknown"),
        .error.as_deref().unwrap_or("unknown"),
        .description.as_deref().unwrap_or("no description")
    )]
    Auth {
        /// `error` field of the token response.
        error: Option<String>,
        /// `error_description` field of the token response.
        description: Option<String>,
        /// `issueId` field of the token response.
        issue_id: Option<String>,
    },

    /// The response body could not be decoded.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl ClientError {
    /// Create a new configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// HTTP status of the failed request, if the environment answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns a user-friendly suggestion for recovering from this error.
    pub fn suggestion(&self) -> &str {
        match self {
            Self::Config(_) => {
                "Set DT_ENVIRONMENT and either DT_PLATFORM_TOKEN or OAUTH_CLIENT_ID and OAUTH_CLIENT_SECRET"
            }
            Self::Http { status: 401, .. } => "Check that the token is valid and not expired",
            Self::Http { status: 403, .. } => {
                "Missing permission: grant the required scopes to the token or OAuth client"
            }
            Self::Http { status: 404, .. } => {
                "Check that the referenced ID exists in this environment"
            }
            Self::Http { .. } => "Check the request parameters and retry",
            Self::Network(_) => "Check network connectivity to the Dynatrace environment",
            Self::Auth { .. } => "Check the OAuth client ID, secret and the scopes assigned to it",
            Self::InvalidResponse(_) => "This is likely a server-side issue; please retry later",
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => Self::Http {
                status: status.as_u16(),
                message: e.to_string(),
            },
            None if e.is_decode() => Self::InvalidResponse(e.to_string()),
            None => Self::Network(e.to_string()),
        }
    }
}

impl From<ClientError> for GrailError {
    fn from(e: ClientError) -> Self {
        match e {
            ClientError::Http { status, message } => GrailError::Transport {
                status: Some(status),
                message,
            },
            ClientError::InvalidResponse(msg) => GrailError::InvalidResponse(msg),
            other => GrailError::transport(other.to_string()),
        }
    }
}
