// Cluster counter.
//
// Waits for peers to finish their own counting sweep, polls each one, and
// replaces the stored cluster total with the sum. A peer that cannot be read
// or reports a negative count contributes 0; the sum saturates at `i64::MAX`.
// A poll in which no peer answered keeps the previous total.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::cluster::peer::{peer_count, PeerClient};
use crate::sync::state::CacheState;

/// Result of one round of peer polls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClusterPoll {
    pub total: i64,
    pub answered: usize,
    pub failed: usize,
}

pub struct ClusterCounter<C> {
    peers: Vec<String>,
    settle_delay: Duration,
    client: Arc<C>,
    state: Arc<CacheState>,
}

impl<C: PeerClient> ClusterCounter<C> {
    pub fn new(
        peers: Vec<String>,
        settle_delay: Duration,
        client: C,
        state: Arc<CacheState>,
    ) -> Self {
        Self { peers, settle_delay, client: Arc::new(client), state }
    }

    pub fn peers(&self) -> &[String] {
        &self.peers
    }

    /// Sleep the settle delay, poll every peer, store the new total.
    pub async fn refresh(&self) -> Option<u64> {
        if self.peers.is_empty() {
            return None;
        }
        tokio::time::sleep(self.settle_delay).await;
        let poll = self.poll().await;
        self.apply(poll)
    }

    /// Poll all peers concurrently and sum the counts that came back.
    pub async fn poll(&self) -> ClusterPoll {
        let mut polls = JoinSet::new();
        for peer in &self.peers {
            let client = self.client.clone();
            let peer = peer.clone();
            polls.spawn(async move { peer_count(client.as_ref(), &peer).await });
        }

        let mut poll = ClusterPoll::default();
        while let Some(result) = polls.join_next().await {
            match result {
                Ok(Some(count)) => {
                    poll.total = poll.total.saturating_add(count.max(0));
                    poll.answered += 1;
                }
                Ok(None) => poll.failed += 1,
                Err(join_error) => {
                    error!(?join_error, "peer poll task failed");
                    poll.failed += 1;
                }
            }
        }
        poll
    }

    fn apply(&self, poll: ClusterPoll) -> Option<u64> {
        if poll.answered == 0 {
            warn!(
                peers = self.peers.len(),
                retained = self.state.cluster_total(),
                "no peer answered, keeping previous cluster total"
            );
            return None;
        }
        let total = poll.total.max(0) as u64;
        self.state.set_cluster_total(total);
        info!(total, answered = poll.answered, failed = poll.failed, "cluster repository count");
        Some(total)
    }
}
