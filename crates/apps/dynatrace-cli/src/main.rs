//! Dynatrace MCP binary entry point.

use clap::Parser;
use colored::Colorize;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use dynatrace_cli::{
    cli::{Cli, Commands},
    commands,
    config::{default_config_path, CliConfig},
    error::{CliError, CliResult},
};
use dynatrace_client::DynatraceClient;

fn main() {
    let cli = Cli::parse();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            let e = CliError::from(e);
            print_error(&e);
            std::process::exit(e.exit_code());
        }
    };
    rt.block_on(async_main(cli));
}

async fn async_main(cli: Cli) {
    // Logs go to stderr; stdout belongs to the MCP transport.
    let has_rust_log = std::env::var("RUST_LOG").is_ok();
    if cli.verbose || has_rust_log {
        let mut filter = EnvFilter::from_default_env();
        if cli.verbose {
            if let Ok(directive) = "dynatrace=debug".parse() {
                filter = filter.add_directive(directive);
            }
        }
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr))
            .with(filter)
            .init();
    }

    if let Err(e) = run(cli).await {
        print_error(&e);
        std::process::exit(e.exit_code());
    }
}

/// Print a user-friendly error message with error label and recovery hint.
fn print_error(e: &CliError) {
    eprintln!(
        "{} [{}]: {}",
        "Error".red().bold(),
        e.label().yellow(),
        e
    );

    if let Some(suggestion) = e.suggestion() {
        eprintln!("{}: {}", "Hint".cyan(), suggestion);
    }
}

async fn run(cli: Cli) -> CliResult<()> {
    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let config = CliConfig::load(&config_path)?;

    let output = match cli.command.unwrap_or(Commands::Serve) {
        Commands::Completions { shell } => commands::completions(shell)?,
        Commands::Serve => commands::serve(config.settings_from_env()?).await?,
        Commands::Check => {
            let settings = config.settings_from_env()?;
            let client = DynatraceClient::new(&settings.env)?;
            commands::check(&client, &settings).await?
        }
        Commands::Query { dql, max_records } => {
            let settings = config.settings_from_env()?;
            let client = DynatraceClient::new(&settings.env)?;
            commands::query(&client, &settings, &dql, max_records).await?
        }
    };

    if !output.is_empty() {
        println!("{}", output);
    }
    Ok(())
}
