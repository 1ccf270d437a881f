//! CLI configuration.
//!
//! Settings come from `~/.dynatrace-mcp/config.toml` (or `--config`) and the
//! process environment. Environment variables win over the file.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use dynatrace_client::env::{
    ENV_ENVIRONMENT, ENV_GRAIL_BUDGET_GB, ENV_OAUTH_CLIENT_ID, ENV_OAUTH_CLIENT_SECRET,
    ENV_PLATFORM_TOKEN, ENV_SLACK_CONNECTION_ID,
};
use dynatrace_client::DynatraceEnv;
use dynatrace_grail::{
    ExecutorConfig, FormatOptions, DEFAULT_MAX_POLL_ATTEMPTS, DEFAULT_MAX_PREVIEW_RECORDS,
    DEFAULT_POLL_INTERVAL,
};
use dynatrace_mcp::McpServerConfig;

use crate::error::{CliError, CliResult};

/// Expand environment variables in a string.
/// Supports `${VAR_NAME}` syntax; unset variables are left as-is.
fn expand_env_vars(input: &str) -> String {
    let Ok(re) = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}") else {
        return input.to_string();
    };
    re.replace_all(input, |caps: &regex::Captures| {
        let var_name = &caps[1];
        std::env::var(var_name).unwrap_or_else(|_| caps[0].to_string())
    })
    .to_string()
}

fn expand_opt(value: &mut Option<String>) {
    if let Some(v) = value.as_mut() {
        *v = expand_env_vars(v);
    }
}

/// CLI configuration loaded from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Environment and credentials.
    pub environment: EnvironmentConfig,
    /// Grail query settings.
    pub grail: GrailConfig,
    /// Slack settings.
    pub slack: SlackConfig,
}

impl CliConfig {
    /// Load configuration from a file.
    /// Environment variables in `${VAR}` format are expanded in string values.
    pub fn load(path: &Path) -> CliResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&contents)?;

        expand_opt(&mut config.environment.url);
        expand_opt(&mut config.environment.platform_token);
        expand_opt(&mut config.environment.oauth_client_id);
        expand_opt(&mut config.environment.oauth_client_secret);
        expand_opt(&mut config.slack.connection_id);

        Ok(config)
    }

    /// Value the file holds for an environment variable name.
    fn file_value(&self, key: &str) -> Option<String> {
        match key {
            ENV_ENVIRONMENT => self.environment.url.clone(),
            ENV_PLATFORM_TOKEN => self.environment.platform_token.clone(),
            ENV_OAUTH_CLIENT_ID => self.environment.oauth_client_id.clone(),
            ENV_OAUTH_CLIENT_SECRET => self.environment.oauth_client_secret.clone(),
            ENV_SLACK_CONNECTION_ID => self.slack.connection_id.clone(),
            ENV_GRAIL_BUDGET_GB => self.grail.budget_gb.map(|gb| gb.to_string()),
            _ => None,
        }
    }

    /// Resolve the settings, consulting `lookup` before the file.
    pub fn settings(&self, lookup: impl Fn(&str) -> Option<String>) -> CliResult<Settings> {
        let env = DynatraceEnv::from_lookup(|key| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .or_else(|| self.file_value(key))
        })?;

        let mut server = McpServerConfig::from_env(&env);
        server.executor = self.grail.executor_config()?;
        server.format = FormatOptions {
            max_preview_records: self.grail.max_preview_records,
        };

        Ok(Settings { env, server })
    }

    /// Resolve the settings against the process environment.
    pub fn settings_from_env(&self) -> CliResult<Settings> {
        self.settings(|key| std::env::var(key).ok())
    }
}

/// Fully resolved settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Validated environment and credentials.
    pub env: DynatraceEnv,
    /// MCP server configuration.
    pub server: McpServerConfig,
}

/// `[environment]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    /// Environment URL, e.g. `https://abc123.apps.dynatrace.com`.
    pub url: Option<String>,
    pub platform_token: Option<String>,
    pub oauth_client_id: Option<String>,
    pub oauth_client_secret: Option<String>,
}

/// `[grail]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GrailConfig {
    /// Session budget in GB; -1 disables the limit.
    pub budget_gb: Option<f64>,
    /// Delay between polls of a running query.
    pub poll_interval_ms: u64,
    /// Polls before a running query is abandoned.
    pub max_poll_attempts: u32,
    /// Records shown in `execute_dql` previews.
    pub max_preview_records: usize,
}

impl Default for GrailConfig {
    fn default() -> Self {
        Self {
            budget_gb: None,
            poll_interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
            max_poll_attempts: DEFAULT_MAX_POLL_ATTEMPTS,
            max_preview_records: DEFAULT_MAX_PREVIEW_RECORDS,
        }
    }
}

impl GrailConfig {
    fn executor_config(&self) -> CliResult<ExecutorConfig> {
        if self.poll_interval_ms == 0 {
            return Err(CliError::config("grail.poll_interval_ms must be greater than 0"));
        }
        if self.max_poll_attempts == 0 {
            return Err(CliError::config("grail.max_poll_attempts must be greater than 0"));
        }
        Ok(ExecutorConfig {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            max_poll_attempts: self.max_poll_attempts,
        })
    }
}

/// `[slack]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SlackConfig {
    pub connection_id: Option<String>,
}

/// Get the directory holding the configuration file.
pub fn default_base_dir() -> PathBuf {
    if let Some(dirs) = directories::BaseDirs::new() {
        return dirs.home_dir().join(".dynatrace-mcp");
    }
    std::env::var("HOME")
        .map(|home| PathBuf::from(home).join(".dynatrace-mcp"))
        .unwrap_or_else(|_| PathBuf::from(".dynatrace-mcp"))
}

/// Get the default configuration file path.
pub fn default_config_path() -> PathBuf {
    default_base_dir().join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use dynatrace_client::Credentials;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn write_config(contents: &str) -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, contents).unwrap();
        (dir, path)
    }

    #[test]
    fn test_missing_file_gives_default() {
        let dir = TempDir::new().unwrap();
        let config = CliConfig::load(&dir.path().join("missing.toml")).unwrap();
        assert!(config.environment.url.is_none());
        assert_eq!(config.grail.max_poll_attempts, DEFAULT_MAX_POLL_ATTEMPTS);
    }

    #[test]
    fn test_settings_from_file() {
        let (_dir, path) = write_config(
            r#"
[environment]
url = "https://abc123.apps.dynatrace.com/"
platform_token = "dt0s16.file"

[grail]
budget_gb = 5.0
poll_interval_ms = 500
max_preview_records = 3

[slack]
connection_id = "conn-1"
"#,
        );

        let settings = CliConfig::load(&path).unwrap().settings(no_env).unwrap();
        assert_eq!(settings.env.environment_url, "https://abc123.apps.dynatrace.com");
        assert_eq!(
            settings.env.credentials,
            Credentials::PlatformToken("dt0s16.file".into())
        );
        assert_eq!(settings.env.grail_budget.gb(), Some(5.0));
        assert_eq!(settings.server.slack_connection_id, "conn-1");
        assert_eq!(settings.server.executor.poll_interval, Duration::from_millis(500));
        assert_eq!(settings.server.format.max_preview_records, 3);
    }

    #[test]
    fn test_environment_overrides_file() {
        let (_dir, path) = write_config(
            r#"
[environment]
url = "https://abc123.apps.dynatrace.com"
platform_token = "dt0s16.file"
"#,
        );
        let vars: HashMap<&str, &str> = [
            ("DT_PLATFORM_TOKEN", "dt0s16.env"),
            ("DT_GRAIL_QUERY_BUDGET_GB", "-1"),
            ("SLACK_CONNECTION_ID", ""),
        ]
        .into_iter()
        .collect();

        let settings = CliConfig::load(&path)
            .unwrap()
            .settings(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(
            settings.env.credentials,
            Credentials::PlatformToken("dt0s16.env".into())
        );
        assert!(settings.env.grail_budget.is_unlimited());
        assert_eq!(settings.env.slack_connection_id, "fake-slack-connection-id");
    }

    #[test]
    fn test_missing_environment_is_config_error() {
        let err = CliConfig::default().settings(no_env).unwrap_err();
        assert!(matches!(err, CliError::Config(_)));
        assert!(err.to_string().contains("DT_ENVIRONMENT"));
    }

    #[test]
    fn test_invalid_poll_settings() {
        let mut config = CliConfig::default();
        config.environment.url = Some("https://abc123.apps.dynatrace.com".into());
        config.environment.platform_token = Some("dt0s16.token".into());
        config.grail.max_poll_attempts = 0;
        assert!(matches!(config.settings(no_env), Err(CliError::Config(_))));
    }

    #[test]
    fn test_env_var_expansion() {
        std::env::set_var("DT_MCP_TEST_TOKEN_EXPANSION", "dt0s16.expanded");
        let (_dir, path) = write_config(
            r#"
[environment]
platform_token = "${DT_MCP_TEST_TOKEN_EXPANSION}"
oauth_client_secret = "${DT_MCP_TEST_UNSET_VARIABLE}"
"#,
        );
        let config = CliConfig::load(&path).unwrap();
        assert_eq!(config.environment.platform_token.as_deref(), Some("dt0s16.expanded"));
        assert_eq!(
            config.environment.oauth_client_secret.as_deref(),
            Some("${DT_MCP_TEST_UNSET_VARIABLE}")
        );
        std::env::remove_var("DT_MCP_TEST_TOKEN_EXPANSION");
    }

    #[test]
    fn test_default_config_path() {
        assert!(default_config_path().ends_with(".dynatrace-mcp/config.toml"));
    }
}
