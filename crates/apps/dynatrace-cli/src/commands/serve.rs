//! Serve MCP on stdio.

use dynatrace_client::DynatraceClient;
use dynatrace_mcp::run_server;
use tracing::info;

use crate::config::Settings;
use crate::error::{CliError, CliResult};

/// Run the MCP server until the client disconnects.
///
/// stdout carries the protocol; nothing else may be printed there.
pub async fn serve(settings: Settings) -> CliResult<String> {
    let client = DynatraceClient::new(&settings.env)?;

    info!(
        environment = %settings.env.environment_url,
        auth = settings.env.credentials.kind(),
        budget = %settings.server.grail_budget,
        "Starting MCP server on stdio"
    );

    run_server(settings.server, client)
        .await
        .map_err(|e| CliError::user(format!("MCP server error: {}", e)))?;

    Ok(String::new())
}
