//! Check command.

use colored::Colorize;
use dynatrace_client::DynatraceClient;
use tracing::debug;

use crate::config::Settings;
use crate::error::CliResult;

/// Validate the settings and fetch the environment information.
///
/// A successful call proves that the URL and the credentials work.
pub async fn check(client: &DynatraceClient, settings: &Settings) -> CliResult<String> {
    debug!(environment = %settings.env.environment_url, "Checking environment");
    let info = client.environment_info().await?;

    let mut out = String::new();
    out.push_str(&format!("{}\n", "Environment reachable".green().bold()));
    out.push_str(&format!(
        "  {:<16} {}\n",
        "URL:",
        settings.env.environment_url
    ));
    if let Some(id) = info.get("environmentId").and_then(|v| v.as_str()) {
        out.push_str(&format!("  {:<16} {}\n", "Environment ID:", id));
    }
    if let Some(state) = info.get("state").and_then(|v| v.as_str()) {
        out.push_str(&format!("  {:<16} {}\n", "State:", state));
    }
    out.push_str(&format!(
        "  {:<16} {}\n",
        "Auth:",
        settings.env.credentials.kind()
    ));
    out.push_str(&format!(
        "  {:<16} {}\n",
        "Grail budget:",
        settings.server.grail_budget
    ));
    out.push_str(&format!(
        "  {:<16} {}",
        "Slack:",
        settings.server.slack_connection_id
    ));

    Ok(out)
}
