// Status payload assembly for the info route.

use std::net::{IpAddr, UdpSocket};

use gitcache_common::node::node_label;
use gitcache_common::protocol::info::MirrorsInfo;
use tracing::debug;

use crate::sync::state::CacheState;

/// Public address used for routing; no packet is sent.
const ROUTE_PROBE_ADDR: &str = "8.8.8.8:80";

/// Address of the interface the host would use for outbound traffic.
pub fn outbound_ip() -> Option<IpAddr> {
    let socket = UdpSocket::bind(("0.0.0.0", 0))
        .and_then(|socket| socket.connect(ROUTE_PROBE_ADDR).map(|_| socket));
    match socket.and_then(|socket| socket.local_addr()) {
        Ok(addr) => Some(addr.ip()),
        Err(error) => {
            debug!(%error, "could not determine outbound address");
            None
        }
    }
}

/// Build the payload from the current counters and a node label.
pub fn mirrors_info(state: &CacheState, nodes: String) -> MirrorsInfo {
    MirrorsInfo {
        count: clamp_i64(state.local_count()),
        progress: String::new(),
        size: clamp_i64(state.reported_size()),
        nodes,
    }
}

/// Payload for this node, labelled from the outbound address.
pub fn local_mirrors_info(state: &CacheState) -> MirrorsInfo {
    mirrors_info(state, node_label(outbound_ip()))
}

fn clamp_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_prefers_positive_cluster_total() {
        let state = CacheState::new();
        state.set_local_count(3);
        state.set_cluster_total(11);
        let info = mirrors_info(&state, "node23".into());
        assert_eq!(
            info,
            MirrorsInfo { count: 3, progress: String::new(), size: 11, nodes: "node23".into() }
        );
    }

    #[test]
    fn size_falls_back_to_local_count() {
        let state = CacheState::new();
        state.set_local_count(3);
        let info = mirrors_info(&state, "node:0".into());
        assert_eq!(info.size, 3);
        assert!(info.progress.is_empty());
    }

    #[test]
    fn local_payload_always_has_a_label() {
        let info = local_mirrors_info(&CacheState::new());
        assert!(info.nodes.starts_with("node"));
    }
}
