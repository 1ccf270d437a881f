//! Environment configuration for the Dynatrace MCP server.
//!
//! Reads and validates the environment variables the server needs to reach a
//! Dynatrace platform environment.

use std::fmt;

use dynatrace_grail::{BudgetLimit, DEFAULT_BUDGET_GB};

use crate::error::{ClientError, ClientResult};

/// Variable holding the environment URL.
pub const ENV_ENVIRONMENT: &str = "DT_ENVIRONMENT";
/// Variable holding a platform token.
pub const ENV_PLATFORM_TOKEN: &str = "DT_PLATFORM_TOKEN";
/// Variable holding the OAuth client ID.
pub const ENV_OAUTH_CLIENT_ID: &str = "OAUTH_CLIENT_ID";
/// Variable holding the OAuth client secret.
pub const ENV_OAUTH_CLIENT_SECRET: &str = "OAUTH_CLIENT_SECRET";
/// Variable holding the Slack connection ID.
pub const ENV_SLACK_CONNECTION_ID: &str = "SLACK_CONNECTION_ID";
/// Variable holding the Grail budget in GB.
pub const ENV_GRAIL_BUDGET_GB: &str = "DT_GRAIL_QUERY_BUDGET_GB";

/// Slack connection used when none is configured.
pub const DEFAULT_SLACK_CONNECTION_ID: &str = "fake-slack-connection-id";

/// How requests are authenticated.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Static platform token, sent as bearer token.
    PlatformToken(String),
    /// OAuth client, exchanged for bearer tokens via client credentials.
    OAuthClient {
        client_id: String,
        client_secret: String,
    },
}

impl Credentials {
    /// Pick credentials from the optional values, preferring the platform token.
    pub fn select(
        platform_token: Option<String>,
        client_id: Option<String>,
        client_secret: Option<String>,
    ) -> ClientResult<Self> {
        if let Some(token) = platform_token {
            return Ok(Self::PlatformToken(token));
        }
        match (client_id, client_secret) {
            (Some(client_id), Some(client_secret)) => Ok(Self::OAuthClient {
                client_id,
                client_secret,
            }),
            _ => Err(ClientError::config(format!(
                "Please set either {} (recommended) or both {} and {}",
                ENV_PLATFORM_TOKEN, ENV_OAUTH_CLIENT_ID, ENV_OAUTH_CLIENT_SECRET
            ))),
        }
    }

    /// Short name of the authentication method, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PlatformToken(_) => "platform-token",
            Self::OAuthClient { .. } => "oauth-client",
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PlatformToken(_) => f.write_str("PlatformToken(<redacted>)"),
            Self::OAuthClient { client_id, .. } => f
                .debug_struct("OAuthClient")
                .field("client_id", client_id)
                .field("client_secret", &"<redacted>")
                .finish(),
        }
    }
}

/// Validated settings for one Dynatrace environment.
#[derive(Debug, Clone, PartialEq)]
pub struct DynatraceEnv {
    /// Platform URL, without trailing slash.
    pub environment_url: String,
    pub credentials: Credentials,
    pub slack_connection_id: String,
    /// Session ceiling for Grail scans.
    pub grail_budget: BudgetLimit,
}

impl DynatraceEnv {
    /// Read the settings from the process environment.
    pub fn from_env() -> ClientResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the settings through `lookup`. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ClientResult<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let environment_url = get(ENV_ENVIRONMENT).ok_or_else(|| {
            ClientError::config(format!("Please set the {} environment variable", ENV_ENVIRONMENT))
        })?;
        let environment_url = validate_environment_url(&environment_url)?;

        let credentials = Credentials::select(
            get(ENV_PLATFORM_TOKEN),
            get(ENV_OAUTH_CLIENT_ID),
            get(ENV_OAUTH_CLIENT_SECRET),
        )?;

        Ok(Self {
            environment_url,
            credentials,
            slack_connection_id: get(ENV_SLACK_CONNECTION_ID)
                .unwrap_or_else(|| DEFAULT_SLACK_CONNECTION_ID.to_string()),
            grail_budget: parse_budget_gb(get(ENV_GRAIL_BUDGET_GB).as_deref())?,
        })
    }

    /// Base URL of the SSO service that issues tokens for this environment.
    pub fn sso_url(&self) -> &'static str {
        sso_url_for(&self.environment_url)
    }
}

/// Check that `url` points to a Dynatrace platform environment.
///
/// Returns the URL without trailing slash.
pub fn validate_environment_url(url: &str) -> ClientResult<String> {
    let url = url.trim();
    if !url.starts_with("https://") {
        return Err(ClientError::config(format!(
            "Please set {} to a valid Dynatrace Environment URL (e.g., https://<environment-id>.apps.dynatrace.com)",
            ENV_ENVIRONMENT
        )));
    }
    if !url.contains("apps.dynatrace.com") && !url.contains("apps.dynatracelabs.com") {
        return Err(ClientError::config(format!(
            "Please set {} to a valid Dynatrace Platform Environment URL (e.g., https://<environment-id>.apps.dynatrace.com)",
            ENV_ENVIRONMENT
        )));
    }
    Ok(url.trim_end_matches('/').to_string())
}

/// Parse the Grail budget setting; `None` gives the default.
pub fn parse_budget_gb(value: Option<&str>) -> ClientResult<BudgetLimit> {
    let Some(value) = value else {
        return BudgetLimit::from_gb(DEFAULT_BUDGET_GB)
            .map_err(|e| ClientError::config(e.to_string()));
    };
    let gb: f64 = value.trim().parse().map_err(|_| {
        ClientError::config(format!(
            "{} must be a number of GB, or -1 for unlimited (got '{}')",
            ENV_GRAIL_BUDGET_GB, value
        ))
    })?;
    BudgetLimit::from_gb(gb).map_err(|e| ClientError::config(e.to_string()))
}

/// SSO base URL for an environment URL.
pub fn sso_url_for(environment_url: &str) -> &'static str {
    if environment_url.contains("dynatracelabs.com") {
        "https://sso.dynatracelabs.com"
    } else {
        "https://sso.dynatrace.com"
    }
}
