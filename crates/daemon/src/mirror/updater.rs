// Per-mirror update step of a sync sweep.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use crate::mirror::fetch::{FetchMode, MirrorFetcher};
use crate::mirror::probe::RemoteProbe;
use crate::mirror::remote::remote_url_for;
use crate::sync::state::CacheState;

/// Result of updating one mirror.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    Updated,
    /// Probe said the remote is gone or private; no fetch was attempted.
    SkippedUnreachable,
    Failed(String),
}

/// Probes a mirror's remote and, if reachable, fetches it in `update` mode.
pub struct MirrorUpdater<P, F> {
    base_dir: PathBuf,
    probe: P,
    fetcher: F,
    state: Arc<CacheState>,
}

impl<P: RemoteProbe, F: MirrorFetcher> MirrorUpdater<P, F> {
    pub fn new(base_dir: impl Into<PathBuf>, probe: P, fetcher: F, state: Arc<CacheState>) -> Self {
        Self { base_dir: base_dir.into(), probe, fetcher, state }
    }

    pub async fn update_one(&self, local_path: &Path) -> UpdateOutcome {
        let processed = self.state.advance_progress();
        let total = self.state.total();
        if total > 0 {
            let percent = processed as f64 / total as f64 * 100.0;
            info!(processed, total, "git remote update: {processed} of {total}, {percent:.2}%");
        }

        let Some(remote) = remote_url_for(&self.base_dir, local_path) else {
            warn!(path = %local_path.display(), "mirror is outside the base directory");
            return UpdateOutcome::Failed("mirror is outside the base directory".into());
        };

        if !self.probe.is_reachable(&remote).await {
            info!(%remote, "git remote update: remote not exists");
            return UpdateOutcome::SkippedUnreachable;
        }

        info!(path = %local_path.display(), "git remote update: begin");
        match self.fetcher.fetch(&remote, local_path, FetchMode::Update).await {
            Ok(()) => {
                info!(path = %local_path.display(), status = "ok", "git remote update: done");
                UpdateOutcome::Updated
            }
            Err(error) => {
                warn!(path = %local_path.display(), %error, "git remote update: failed");
                UpdateOutcome::Failed(error.to_string())
            }
        }
    }
}
