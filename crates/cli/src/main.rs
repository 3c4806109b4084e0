// gitcache CLI entry point.

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod client;
mod commands;
mod exit_code;
mod output;

use exit_code::ExitCode;

#[derive(Parser)]
#[command(name = "gitcache", about = "Inspect gitcache nodes and clusters")]
struct Cli {
    #[command(subcommand)]
    command: commands::Command,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> std::process::ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match commands::run(cli.command).await {
        Ok(()) => ExitCode::Success.into(),
        Err(error) => ExitCode::from_error(&error).into(),
    }
}
