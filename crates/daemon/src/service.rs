// The per-process gitcache service.
//
// Built once at startup and shared as `Arc<GitCacheService>` by the
// scheduler and the HTTP routes. Owns the shared counters, the sync
// coordinator, the cluster counter and the optional clone announcer.

use std::sync::Arc;

use anyhow::{Context, Result};
use gitcache_common::protocol::info::{MirrorsInfo, SyncSnapshot};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::cluster::counter::ClusterCounter;
use crate::cluster::peer::{HttpPeerClient, PeerClient};
use crate::config::DaemonConfig;
use crate::mirror::fetch::{GitFetcher, MirrorFetcher};
use crate::mirror::probe::{HttpProbe, RemoteProbe};
use crate::notify::{BroadcastSink, CloneAnnouncer, HttpBroadcastSink};
use crate::report::local_mirrors_info;
use crate::supervise::spawn_supervised;
use crate::sync::coordinator::{SyncCoordinator, SyncOutcome};
use crate::sync::state::CacheState;

/// Production wiring: HTTP probe, `git` fetcher, HTTP peers and sink.
pub type DefaultService =
    GitCacheService<HttpProbe, GitFetcher, HttpPeerClient, HttpBroadcastSink>;

pub struct GitCacheService<P, F, C, S = HttpBroadcastSink> {
    state: Arc<CacheState>,
    coordinator: SyncCoordinator<P, F>,
    cluster: ClusterCounter<C>,
    announcer: Option<CloneAnnouncer<S>>,
    first_count: Mutex<()>,
}

impl DefaultService {
    pub fn from_config(config: &DaemonConfig) -> Result<Arc<Self>> {
        let state = Arc::new(CacheState::new());
        let probe =
            HttpProbe::new(config.probe_timeout()).context("failed to build probe HTTP client")?;
        let peers =
            HttpPeerClient::new(config.peer_timeout()).context("failed to build peer HTTP client")?;
        let announcer = config
            .broadcast
            .as_ref()
            .map(|broadcast| CloneAnnouncer::from_config(broadcast, config.peer_timeout()))
            .transpose()
            .context("failed to build broadcast HTTP client")?;

        let coordinator = SyncCoordinator::new(
            config.base_dir.clone(),
            config.max_depth,
            probe,
            GitFetcher::new(),
            state.clone(),
        );
        let cluster =
            ClusterCounter::new(config.peers.clone(), config.settle_delay(), peers, state.clone());

        Ok(Arc::new(Self::new(state, coordinator, cluster, announcer)))
    }
}

impl<P, F, C, S> GitCacheService<P, F, C, S>
where
    P: RemoteProbe,
    F: MirrorFetcher,
    C: PeerClient,
    S: BroadcastSink,
{
    pub fn new(
        state: Arc<CacheState>,
        coordinator: SyncCoordinator<P, F>,
        cluster: ClusterCounter<C>,
        announcer: Option<CloneAnnouncer<S>>,
    ) -> Self {
        Self { state, coordinator, cluster, announcer, first_count: Mutex::new(()) }
    }

    pub fn state(&self) -> &Arc<CacheState> {
        &self.state
    }

    pub fn coordinator(&self) -> &SyncCoordinator<P, F> {
        &self.coordinator
    }

    pub fn cluster(&self) -> &ClusterCounter<C> {
        &self.cluster
    }

    /// Run a sync sweep inline.
    pub async fn start_sync(&self) -> SyncOutcome {
        self.coordinator.start_sync().await
    }

    /// Launch a sync sweep in the background. `false` when one is already
    /// running.
    pub fn trigger_sync(self: &Arc<Self>) -> bool {
        let Some(guard) = self.state.try_begin_sweep() else {
            info!("sync already running, trigger ignored");
            return false;
        };
        let service = self.clone();
        spawn_supervised("sync", async move {
            service.coordinator.run_sweep(guard).await;
        });
        true
    }

    /// Recount local mirrors, then refresh the cluster total in the
    /// background.
    pub async fn start_count(self: &Arc<Self>) -> u64 {
        let count = self.coordinator.count_local().await;
        let (progress, total) = (self.state.progress(), self.state.total());
        if count > 0 && total > 0 {
            let percent = progress as f64 / total as f64 * 100.0;
            info!(progress, total, "git remote sync: {progress} of {total}, {percent:.2}%");
        }

        let service = self.clone();
        spawn_supervised("cluster-count", async move {
            service.cluster.refresh().await;
        });
        count
    }

    /// Status payload for this node. Counts the mirrors first if no count
    /// has completed yet; concurrent first callers share one walk.
    pub async fn current_status(&self) -> MirrorsInfo {
        if !self.state.has_local_count() {
            let _first = self.first_count.lock().await;
            if !self.state.has_local_count() {
                self.coordinator.recount_local().await;
            }
        }
        local_mirrors_info(&self.state)
    }

    pub fn sync_snapshot(&self) -> SyncSnapshot {
        self.state.snapshot()
    }

    pub fn broadcast_enabled(&self) -> bool {
        self.announcer.is_some()
    }

    /// Forward a clone announcement without waiting for delivery. `false`
    /// when no broadcast endpoint is configured.
    pub fn announce_clone(self: &Arc<Self>, repository: &str) -> bool {
        let Some(announcer) = self.announcer.as_ref() else {
            return false;
        };
        info!(repository, "broadcast git clone command to chain");
        let message = announcer.message_for(repository);
        let service = self.clone();
        spawn_supervised("clone-broadcast", async move {
            if let Some(announcer) = service.announcer.as_ref() {
                if let Err(error) = announcer.sink().send(message).await {
                    warn!(%error, "clone broadcast delivery failed");
                }
            }
        });
        true
    }
}
