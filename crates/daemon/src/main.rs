// gitcached: node daemon entry point.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use gitcache_daemon::config::DaemonConfig;
use gitcache_daemon::report::local_mirrors_info;
use gitcache_daemon::service::DefaultService;
use gitcache_daemon::sync::coordinator::SyncOutcome;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gitcached", about = "Git mirror cache node")]
struct Cli {
    /// Config file (default: ~/.gitcache/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the status API and run the scheduled sweeps (default)
    Serve,
    /// Run one sync sweep now and print its summary
    Sync,
    /// Count local mirrors, refresh the cluster total and print the status payload
    Count {
        /// Skip polling peers
        #[arg(long)]
        local_only: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = DaemonConfig::load(cli.config.as_deref()).context("failed to load config")?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_filter))
        .context("invalid log filter")?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            info!("starting gitcache node");
            gitcache_daemon::runtime::run(config)
                .await
                .context("gitcache node terminated unexpectedly")
        }
        Command::Sync => {
            let service = DefaultService::from_config(&config)?;
            match service.start_sync().await {
                SyncOutcome::Completed(summary) => {
                    println!("{}", serde_json::to_string_pretty(&summary)?);
                }
                SyncOutcome::Skipped => println!("sync already running"),
            }
            Ok(())
        }
        Command::Count { local_only } => {
            let service = DefaultService::from_config(&config)?;
            service.coordinator().count_local().await;
            if !local_only {
                service.cluster().refresh().await;
            }
            let info = local_mirrors_info(service.state());
            println!("{}", serde_json::to_string_pretty(&info)?);
            Ok(())
        }
    }
}
