// `gitcache cluster`: poll every configured peer and sum their counts.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;

use crate::client::NodeClient;
use crate::output::{self, OutputFormat};

const PEERS_ENV: &str = "GITCACHE_PEERS";

#[derive(Debug, Args)]
pub struct ClusterArgs {
    /// Node config to read `peers` from (default: ~/.gitcache/config.toml).
    #[arg(long)]
    config: Option<PathBuf>,
    /// Force JSON output.
    #[arg(long)]
    json: bool,
}

/// The slice of the node config this command needs.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PeerList {
    peers: Vec<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PeerRow {
    pub node: String,
    pub label: Option<String>,
    pub count: Option<i64>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ClusterReport {
    pub peers: Vec<PeerRow>,
    pub total: i64,
    pub answered: usize,
    pub failed: usize,
}

pub async fn run(args: ClusterArgs) -> Result<()> {
    let format = OutputFormat::detect(args.json);
    let peers = match resolve_peers(args.config.as_deref()) {
        Ok(peers) => peers,
        Err(e) => {
            output::print_anyhow_error(format, &e);
            return Err(e);
        }
    };
    if peers.is_empty() {
        output::print_warning(format, "NO_PEERS", "no peers configured");
    }

    let report = poll_cluster(&peers).await;
    for row in &report.peers {
        if let Some(error) = &row.error {
            output::print_warning(format, "PEER_UNREACHABLE", &format!("{}: {error}", row.node));
        }
    }
    output::print_output(format, &report, format_human)?;
    Ok(())
}

fn resolve_peers(config: Option<&Path>) -> Result<Vec<String>> {
    let from_env = std::env::var(PEERS_ENV).ok();
    let default_path = dirs::home_dir().map(|home| home.join(".gitcache").join("config.toml"));
    resolve_peers_from(config, default_path.as_deref(), from_env.as_deref())
}

fn resolve_peers_from(
    config: Option<&Path>,
    default_path: Option<&Path>,
    from_env: Option<&str>,
) -> Result<Vec<String>> {
    if let Some(peers) = from_env {
        return Ok(split_peers(peers));
    }
    let path = match (config, default_path) {
        (Some(path), _) => path,
        (None, Some(path)) if path.exists() => path,
        _ => return Ok(Vec::new()),
    };
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let list: PeerList = toml::from_str(&contents)
        .with_context(|| format!("failed to parse config {}", path.display()))?;
    Ok(list.peers)
}

fn split_peers(peers: &str) -> Vec<String> {
    peers
        .split(',')
        .map(str::trim)
        .filter(|peer| !peer.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

async fn poll_cluster(peers: &[String]) -> ClusterReport {
    let mut polls = JoinSet::new();
    for (index, peer) in peers.iter().enumerate() {
        let peer = peer.clone();
        polls.spawn(async move {
            let result = match NodeClient::new(&peer) {
                Ok(client) => client.info().await,
                Err(e) => Err(e),
            };
            (index, peer, result)
        });
    }

    let mut rows: Vec<(usize, PeerRow)> = Vec::with_capacity(peers.len());
    while let Some(joined) = polls.join_next().await {
        let Ok((index, node, result)) = joined else {
            continue;
        };
        let row = match result {
            Ok(info) => {
                PeerRow { node, label: Some(info.nodes), count: Some(info.count), error: None }
            }
            Err(e) => {
                PeerRow { node, label: None, count: None, error: Some(format!("{e:#}")) }
            }
        };
        rows.push((index, row));
    }
    rows.sort_by_key(|(index, _)| *index);

    let peers: Vec<PeerRow> = rows.into_iter().map(|(_, row)| row).collect();
    let total = peers
        .iter()
        .filter_map(|row| row.count)
        .fold(0i64, |total, count| total.saturating_add(count.max(0)));
    let answered = peers.iter().filter(|row| row.count.is_some()).count();
    let failed = peers.len() - answered;
    ClusterReport { peers, total, answered, failed }
}

fn format_human(report: &ClusterReport) -> String {
    let width = report.peers.iter().map(|row| row.node.len()).max().unwrap_or(4).max(4);
    let mut lines = vec![format!("{:<width$}  {:<8}  {:>8}", "NODE", "LABEL", "MIRRORS")];
    for row in &report.peers {
        let label = row.label.as_deref().unwrap_or("-");
        let count = row.count.map(|c| c.to_string()).unwrap_or_else(|| "-".to_string());
        lines.push(format!("{:<width$}  {label:<8}  {count:>8}", row.node));
    }
    lines.push(format!(
        "Total: {} mirrors ({} of {} nodes answered)",
        report.total,
        report.answered,
        report.peers.len()
    ));
    lines.join("\n")
}
