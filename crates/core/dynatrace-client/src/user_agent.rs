//! User-Agent header sent with every request.

/// Name reported to the environment.
pub const CLIENT_NAME: &str = "dynatrace-mcp-server";

/// User agent in the form `dynatrace-mcp-server/v<version> (<os>-<arch>)`.
pub fn user_agent() -> String {
    format!(
        "{}/v{} ({}-{})",
        CLIENT_NAME,
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS,
        std::env::consts::ARCH
    )
}
