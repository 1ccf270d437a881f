//! Bearer tokens for platform API requests.
//!
//! A platform token is used as is. OAuth clients exchange their credentials
//! for short-lived tokens via the client-credentials flow; those tokens are
//! cached per scope set until shortly before they expire.

use std::collections::HashMap;
use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::env::Credentials;
use crate::error::{ClientError, ClientResult};
use crate::user_agent::user_agent;

/// Path of the token endpoint on the SSO host.
pub const TOKEN_PATH: &str = "/sso/oauth2/token";

/// Tokens are refreshed this long before they expire.
const EXPIRY_MARGIN: Duration = Duration::from_secs(30);

/// Lifetime assumed when the token response has no `expires_in`.
const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(300);

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    expires_in: Option<u64>,
    error: Option<String>,
    error_description: Option<String>,
    #[serde(rename = "issueId")]
    issue_id: Option<String>,
}

struct CachedToken {
    access_token: String,
    refresh_at: Instant,
}

/// Source of bearer tokens for one set of credentials.
pub struct Authenticator {
    mode: AuthMode,
}

enum AuthMode {
    Static(String),
    OAuth(OAuthTokenSource),
}

struct OAuthTokenSource {
    http: Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    /// Space-joined scope list -> token.
    cache: Mutex<HashMap<String, CachedToken>>,
}

impl Authenticator {
    /// Create an authenticator for `credentials`, using `sso_url` for OAuth.
    pub fn new(credentials: &Credentials, sso_url: &str, http: Client) -> Self {
        let mode = match credentials {
            Credentials::PlatformToken(token) => AuthMode::Static(token.clone()),
            Credentials::OAuthClient {
                client_id,
                client_secret,
            } => AuthMode::OAuth(OAuthTokenSource {
                http,
                token_url: format!("{}{}", sso_url.trim_end_matches('/'), TOKEN_PATH),
                client_id: client_id.clone(),
                client_secret: client_secret.clone(),
                cache: Mutex::new(HashMap::new()),
            }),
        };
        Self { mode }
    }

    /// Get a bearer token valid for `scopes`.
    pub async fn bearer_token(&self, scopes: &[&str]) -> ClientResult<String> {
        match &self.mode {
            AuthMode::Static(token) => Ok(token.clone()),
            AuthMode::OAuth(source) => source.token(scopes).await,
        }
    }
}

impl OAuthTokenSource {
    async fn token(&self, scopes: &[&str]) -> ClientResult<String> {
        let scope = scopes.join(" ");
        // Held across the request so concurrent callers share one token fetch.
        let mut cache = self.cache.lock().await;
        if let Some(cached) = cache.get(&scope) {
            if Instant::now() < cached.refresh_at {
                return Ok(cached.access_token.clone());
            }
            debug!(scope = %scope, "Cached OAuth token expired");
        }

        info!(client_id = %self.client_id, scope = %scope, "Requesting OAuth token");
        let response = self
            .http
            .post(self.token_url.as_str())
            .header(reqwest::header::USER_AGENT, user_agent())
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("scope", scope.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let token: TokenResponse = serde_json::from_str(&body).map_err(|_| {
            if status.is_success() {
                ClientError::InvalidResponse(format!("failed to parse token response: {}", body))
            } else {
                ClientError::Http {
                    status: status.as_u16(),
                    message: body.clone(),
                }
            }
        })?;

        let lifetime = token
            .expires_in
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TOKEN_LIFETIME);
        let access_token = match token {
            TokenResponse {
                access_token: Some(access_token),
                error: None,
                error_description: None,
                issue_id: None,
                ..
            } => access_token,
            TokenResponse {
                error,
                error_description,
                issue_id,
                ..
            } => {
                warn!(status = status.as_u16(), issue_id = ?issue_id, "OAuth token request failed");
                return Err(ClientError::Auth {
                    error,
                    description: error_description,
                    issue_id,
                });
            }
        };

        debug!(expires_in = lifetime.as_secs(), "OAuth token issued");
        cache.insert(
            scope,
            CachedToken {
                access_token: access_token.clone(),
                refresh_at: Instant::now() + lifetime.saturating_sub(EXPIRY_MARGIN),
            },
        );
        Ok(access_token)
    }
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.mode {
            AuthMode::Static(_) => f.write_str("Authenticator(platform-token)"),
            AuthMode::OAuth(source) => f
                .debug_struct("Authenticator")
                .field("token_url", &source.token_url)
                .field("client_id", &source.client_id)
                .finish_non_exhaustive(),
        }
    }
}
