// `gitcache status`: show a node's status payload and sweep snapshot.

use clap::Args;
use gitcache_common::protocol::info::{MirrorsInfo, SyncSnapshot};
use serde::Serialize;

use crate::client::{NodeClient, DEFAULT_NODE};
use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct StatusArgs {
    /// Node base URL.
    #[arg(long, default_value = DEFAULT_NODE)]
    node: String,
    /// Force JSON output.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct NodeStatus {
    pub node: String,
    pub info: MirrorsInfo,
    pub sync: SyncSnapshot,
}

pub async fn run(args: StatusArgs) -> anyhow::Result<()> {
    let format = OutputFormat::detect(args.json);
    match fetch_status(&args.node).await {
        Ok(status) => {
            output::print_output(format, &status, format_human)?;
            Ok(())
        }
        Err(e) => {
            output::print_anyhow_error(format, &e);
            Err(e)
        }
    }
}

async fn fetch_status(node: &str) -> anyhow::Result<NodeStatus> {
    let client = NodeClient::new(node)?;
    let (info, sync) = tokio::try_join!(client.info(), client.sync_snapshot())?;
    Ok(NodeStatus { node: client.node().to_string(), info, sync })
}

fn format_human(status: &NodeStatus) -> String {
    let mut lines = vec![
        format!("Node: {} ({})", status.info.nodes, status.node),
        format!("Mirrors: {}", status.info.count),
        format!("Cluster size: {}", status.info.size),
    ];

    if status.sync.running {
        let percent = if status.sync.total > 0 {
            status.sync.progress as f64 / status.sync.total as f64 * 100.0
        } else {
            0.0
        };
        lines.push(format!(
            "Sync: running, {} of {} ({percent:.2}%)",
            status.sync.progress, status.sync.total
        ));
    } else {
        lines.push("Sync: idle".to_string());
    }

    match &status.sync.last_sweep {
        Some(sweep) => lines.push(format!(
            "Last sweep: {} found, {} updated, {} unreachable, {} failed in {:.1}s",
            sweep.discovered,
            sweep.updated,
            sweep.skipped_unreachable,
            sweep.failed,
            sweep.elapsed_ms as f64 / 1000.0
        )),
        None => lines.push("Last sweep: none".to_string()),
    }

    lines.join("\n")
}
