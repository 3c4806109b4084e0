// Node status payload served at `INFO_PATH` and polled by peers.

use serde::{Deserialize, Serialize};

/// Route every node serves its status payload on.
pub const INFO_PATH: &str = "/gitcache/system/info";

/// Route exposing the sync sweep snapshot.
pub const SYNC_PATH: &str = "/gitcache/system/sync";

/// Route accepting clone announcements for the broadcast sink.
pub const BROADCAST_PATH: &str = "/gitcache/system/broadcast";

/// Mirror counts reported by a single node.
///
/// Peers only consume `count`; the remaining fields are informational.
/// Every field defaults so a partial body from an older node still parses.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MirrorsInfo {
    /// Mirrors found by the node's most recent counting walk.
    pub count: i64,
    /// Reserved; always empty.
    pub progress: String,
    /// Cluster-wide total when known, otherwise the local count.
    pub size: i64,
    /// Node label, e.g. `node23`.
    pub nodes: String,
}

impl MirrorsInfo {
    /// Parse a peer response body. Returns `None` for anything that is not
    /// a JSON object of the expected shape.
    pub fn parse(body: &str) -> Option<Self> {
        serde_json::from_str(body).ok()
    }
}

/// Snapshot of the sync sweep state, served at `SYNC_PATH`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SyncSnapshot {
    pub running: bool,
    pub progress: u64,
    pub total: u64,
    pub local_count: u64,
    pub cluster_total: u64,
    pub last_sweep: Option<SweepSummary>,
}

/// Tally of the most recently completed sweep.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SweepSummary {
    pub discovered: u64,
    pub updated: u64,
    pub skipped_unreachable: u64,
    pub failed: u64,
    pub elapsed_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_peer_payload() {
        let info = MirrorsInfo::parse(r#"{"count":5,"progress":"","size":12,"nodes":"node54"}"#)
            .expect("payload should parse");
        assert_eq!(info.count, 5);
        assert_eq!(info.size, 12);
        assert_eq!(info.nodes, "node54");
    }

    #[test]
    fn missing_fields_default() {
        let info = MirrorsInfo::parse(r#"{"count":7}"#).expect("partial payload should parse");
        assert_eq!(info.count, 7);
        assert_eq!(info.size, 0);
        assert!(info.nodes.is_empty());
    }

    #[test]
    fn rejects_non_json_body() {
        assert!(MirrorsInfo::parse("<html>502 Bad Gateway</html>").is_none());
        assert!(MirrorsInfo::parse("").is_none());
        assert!(MirrorsInfo::parse(r#"{"count":"five"}"#).is_none());
    }

    #[test]
    fn sync_snapshot_omits_nothing() {
        let value = serde_json::to_value(SyncSnapshot::default()).unwrap();
        assert_eq!(value["running"], false);
        assert!(value["last_sweep"].is_null());
    }
}
