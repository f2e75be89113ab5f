use std::process::ExitCode;

use clap::Parser;
use schism_cli::{Args, run};
use tracing::error;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();

    // Logs go to stderr; stdout carries only the JSON response.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let response = run(&args, std::io::stdin().lock())?;

    let json = if args.pretty {
        serde_json::to_string_pretty(&response)?
    } else {
        serde_json::to_string(&response)?
    };
    println!("{json}");

    if response.is_success() {
        Ok(ExitCode::SUCCESS)
    } else {
        error!(
            class = ?response.error_class,
            error = response.error.as_deref().unwrap_or_default(),
            "issuance failed"
        );
        Ok(ExitCode::FAILURE)
    }
}
