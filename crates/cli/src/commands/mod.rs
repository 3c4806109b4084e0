// CLI subcommand dispatch.

use clap::Subcommand;

pub mod cluster;
pub mod status;

#[derive(Subcommand)]
pub enum Command {
    /// Show one node's mirror count and sweep progress
    Status(status::StatusArgs),
    /// Poll every configured peer and sum their mirror counts
    Cluster(cluster::ClusterArgs),
}

pub async fn run(cmd: Command) -> anyhow::Result<()> {
    match cmd {
        Command::Status(args) => status::run(args).await,
        Command::Cluster(args) => cluster::run(args).await,
    }
}
