// Fire-and-forget background tasks with panic logging.
//
// Each job runs in its own task; a second task awaits its join handle and
// logs a panic instead of letting it vanish with the detached task.

use std::future::Future;

use tokio::task::JoinHandle;
use tracing::{debug, error};

/// Spawn `job` detached. Returns the supervisor's handle, which resolves
/// to `true` when the job ran to completion and `false` when it panicked or
/// was cancelled.
pub fn spawn_supervised<F>(name: &'static str, job: F) -> JoinHandle<bool>
where
    F: Future<Output = ()> + Send + 'static,
{
    let task = tokio::spawn(job);
    tokio::spawn(async move {
        match task.await {
            Ok(()) => {
                debug!(task = name, "background task finished");
                true
            }
            Err(join_error) if join_error.is_panic() => {
                error!(task = name, ?join_error, "background task panicked");
                false
            }
            Err(join_error) => {
                error!(task = name, ?join_error, "background task cancelled");
                false
            }
        }
    })
}
