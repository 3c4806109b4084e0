// Process-wide sweep and count state.
//
// Written by the scheduled jobs, read by the status routes. Every field is
// an atomic behind an accessor; `last_sweep` is the only composite value and
// sits behind a std mutex that is never held across an await.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use gitcache_common::protocol::info::{SweepSummary, SyncSnapshot};

#[derive(Debug, Default)]
pub struct CacheState {
    running: AtomicBool,
    progress: AtomicU64,
    total: AtomicU64,
    local_count: AtomicU64,
    counted: AtomicBool,
    cluster_total: AtomicU64,
    last_sweep: Mutex<Option<SweepSummary>>,
}

impl CacheState {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Running flag ───────────────────────────────────────────────

    /// Claim the running flag. `None` if a sweep already holds it.
    ///
    /// The guard owns a handle to the state so it can be moved into the
    /// task that runs the sweep.
    pub fn try_begin_sweep(self: &Arc<Self>) -> Option<SweepGuard> {
        self.running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| SweepGuard { state: Arc::clone(self) })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    // ── Sweep progress ─────────────────────────────────────────────

    pub fn progress(&self) -> u64 {
        self.progress.load(Ordering::SeqCst)
    }

    /// Count one more processed mirror; returns the new progress.
    pub fn advance_progress(&self) -> u64 {
        self.progress.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn total(&self) -> u64 {
        self.total.load(Ordering::SeqCst)
    }

    // ── Counts ─────────────────────────────────────────────────────

    pub fn local_count(&self) -> u64 {
        self.local_count.load(Ordering::SeqCst)
    }

    /// Whether any counting walk has completed since startup.
    pub fn has_local_count(&self) -> bool {
        self.counted.load(Ordering::SeqCst)
    }

    /// Zero the local count ahead of a counting walk.
    pub fn reset_local_count(&self) {
        self.local_count.store(0, Ordering::SeqCst);
    }

    pub fn set_local_count(&self, count: u64) {
        self.local_count.store(count, Ordering::SeqCst);
        self.counted.store(true, Ordering::SeqCst);
    }

    pub fn cluster_total(&self) -> u64 {
        self.cluster_total.load(Ordering::SeqCst)
    }

    pub fn set_cluster_total(&self, total: u64) {
        self.cluster_total.store(total, Ordering::SeqCst);
    }

    // ── Reporting ──────────────────────────────────────────────────

    /// Cluster total if positive, otherwise the local count.
    pub fn reported_size(&self) -> u64 {
        match self.cluster_total() {
            0 => self.local_count(),
            total => total,
        }
    }

    pub fn last_sweep(&self) -> Option<SweepSummary> {
        let last = self.last_sweep.lock().unwrap_or_else(|e| e.into_inner());
        last.clone()
    }

    pub fn snapshot(&self) -> SyncSnapshot {
        SyncSnapshot {
            running: self.is_running(),
            progress: self.progress(),
            total: self.total(),
            local_count: self.local_count(),
            cluster_total: self.cluster_total(),
            last_sweep: self.last_sweep(),
        }
    }
}

/// Held for the duration of a sync sweep. Releases the running flag on drop,
/// including while unwinding from a panic.
#[derive(Debug)]
pub struct SweepGuard {
    state: Arc<CacheState>,
}

impl SweepGuard {
    /// Start a fresh sweep over `total` mirrors.
    pub fn start(&self, total: u64) {
        self.state.progress.store(0, Ordering::SeqCst);
        self.state.total.store(total, Ordering::SeqCst);
    }

    pub fn finish(&self, summary: SweepSummary) {
        let mut last = self.state.last_sweep.lock().unwrap_or_else(|e| e.into_inner());
        *last = Some(summary);
    }
}

impl Drop for SweepGuard {
    fn drop(&mut self) {
        self.state.running.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_one_sweep_guard_at_a_time() {
        let state = Arc::new(CacheState::new());
        let guard = state.try_begin_sweep().expect("first claim should succeed");
        assert!(state.is_running());
        assert!(state.try_begin_sweep().is_none());
        drop(guard);
        assert!(!state.is_running());
        assert!(state.try_begin_sweep().is_some());
    }

    #[test]
    fn guard_releases_flag_when_panicking() {
        let state = Arc::new(CacheState::new());
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = state.try_begin_sweep().unwrap();
            panic!("sweep blew up");
        }));
        assert!(result.is_err());
        assert!(!state.is_running());
    }

    #[test]
    fn start_resets_progress() {
        let state = Arc::new(CacheState::new());
        let guard = state.try_begin_sweep().unwrap();
        guard.start(3);
        assert_eq!(state.advance_progress(), 1);
        assert_eq!(state.advance_progress(), 2);
        guard.start(5);
        assert_eq!(state.progress(), 0);
        assert_eq!(state.total(), 5);
    }

    #[test]
    fn reported_size_falls_back_to_local_count() {
        let state = CacheState::new();
        state.set_local_count(4);
        assert_eq!(state.reported_size(), 4);
        state.set_cluster_total(19);
        assert_eq!(state.reported_size(), 19);
    }

    #[test]
    fn counted_flag_survives_reset() {
        let state = CacheState::new();
        assert!(!state.has_local_count());
        state.set_local_count(0);
        assert!(state.has_local_count());
        state.reset_local_count();
        assert!(state.has_local_count());
        assert_eq!(state.local_count(), 0);
    }

    #[tokio::test]
    async fn guard_moves_into_spawned_task() {
        let state = Arc::new(CacheState::new());
        let guard = state.try_begin_sweep().unwrap();
        let task = tokio::spawn(async move {
            guard.start(4);
        });
        task.await.unwrap();
        assert_eq!(state.total(), 4);
        assert!(!state.is_running());
    }

    #[test]
    fn snapshot_reflects_state() {
        let state = Arc::new(CacheState::new());
        state.set_local_count(2);
        let guard = state.try_begin_sweep().unwrap();
        guard.start(2);
        state.advance_progress();
        guard.finish(SweepSummary { discovered: 2, updated: 1, ..Default::default() });

        let snapshot = state.snapshot();
        assert!(snapshot.running);
        assert_eq!(snapshot.progress, 1);
        assert_eq!(snapshot.total, 2);
        assert_eq!(snapshot.last_sweep.unwrap().updated, 1);
    }
}
