// Sync coordinator: single-flight sweep over every mirror, plus the local
// counting walk.
//
// States: idle → running → idle. The running flag is claimed with a CAS and
// released by `SweepGuard`, so an overlapping trigger is dropped and a
// faulting sweep cannot leave the flag set.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use gitcache_common::protocol::info::SweepSummary;
use tracing::{error, info};

use crate::mirror::fetch::MirrorFetcher;
use crate::mirror::probe::RemoteProbe;
use crate::mirror::scanner;
use crate::mirror::updater::{MirrorUpdater, UpdateOutcome};
use crate::sync::state::{CacheState, SweepGuard};

/// What a `start_sync` call did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Another sweep held the running flag; nothing was touched.
    Skipped,
    Completed(SweepSummary),
}

pub struct SyncCoordinator<P, F> {
    base_dir: PathBuf,
    max_depth: usize,
    state: Arc<CacheState>,
    updater: MirrorUpdater<P, F>,
}

impl<P: RemoteProbe, F: MirrorFetcher> SyncCoordinator<P, F> {
    pub fn new(
        base_dir: impl Into<PathBuf>,
        max_depth: usize,
        probe: P,
        fetcher: F,
        state: Arc<CacheState>,
    ) -> Self {
        let base_dir = base_dir.into();
        let updater = MirrorUpdater::new(base_dir.clone(), probe, fetcher, state.clone());
        Self { base_dir, max_depth, state, updater }
    }

    pub fn state(&self) -> &Arc<CacheState> {
        &self.state
    }

    /// Run one full sweep unless one is already running.
    pub async fn start_sync(&self) -> SyncOutcome {
        let Some(guard) = self.state.try_begin_sweep() else {
            info!("sync already running, trigger ignored");
            return SyncOutcome::Skipped;
        };
        SyncOutcome::Completed(self.run_sweep(guard).await)
    }

    /// Run a sweep under a running flag the caller has already claimed.
    pub async fn run_sweep(&self, guard: SweepGuard) -> SweepSummary {
        info!(base_dir = %self.base_dir.display(), "sync local mirrors from remote: begin");
        let started_at = Instant::now();
        guard.start(0);

        let mirrors = self.discover().await;
        let discovered = mirrors.len() as u64;
        guard.start(discovered);
        self.state.set_local_count(discovered);

        let mut summary = SweepSummary { discovered, ..SweepSummary::default() };
        for mirror in &mirrors {
            match self.updater.update_one(mirror).await {
                UpdateOutcome::Updated => summary.updated += 1,
                UpdateOutcome::SkippedUnreachable => summary.skipped_unreachable += 1,
                UpdateOutcome::Failed(_) => summary.failed += 1,
            }
        }
        summary.elapsed_ms = started_at.elapsed().as_millis() as u64;

        info!(
            discovered = summary.discovered,
            updated = summary.updated,
            skipped = summary.skipped_unreachable,
            failed = summary.failed,
            elapsed_ms = summary.elapsed_ms,
            "sync local mirrors from remote: end"
        );
        guard.finish(summary.clone());
        summary
    }

    /// Zero the local count, recount the mirrors on disk and store the result.
    pub async fn count_local(&self) -> u64 {
        self.state.reset_local_count();
        self.recount_local().await
    }

    /// Recount without zeroing first; readers keep seeing the previous count
    /// until the walk finishes.
    pub async fn recount_local(&self) -> u64 {
        let base_dir = self.base_dir.clone();
        let max_depth = self.max_depth;
        let count =
            match tokio::task::spawn_blocking(move || scanner::count(&base_dir, max_depth)).await {
                Ok(count) => count,
                Err(join_error) => {
                    error!(?join_error, "mirror count walk aborted");
                    0
                }
            };
        self.state.set_local_count(count);
        info!(count, "sync count cache repository");
        count
    }

    async fn discover(&self) -> Vec<PathBuf> {
        let base_dir = self.base_dir.clone();
        let max_depth = self.max_depth;
        match tokio::task::spawn_blocking(move || scanner::discover(&base_dir, max_depth)).await {
            Ok(mirrors) => mirrors,
            Err(join_error) => {
                error!(?join_error, "mirror discovery walk aborted");
                Vec::new()
            }
        }
    }
}
