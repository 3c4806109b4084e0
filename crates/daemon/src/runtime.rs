use std::future::Future;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::cluster::peer::PeerClient;
use crate::config::DaemonConfig;
use crate::mirror::fetch::MirrorFetcher;
use crate::mirror::probe::RemoteProbe;
use crate::notify::BroadcastSink;
use crate::schedule::{run_schedule, Schedule};
use crate::server::router;
use crate::service::{DefaultService, GitCacheService};

/// Cadences of the two background sweeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedules {
    pub sync: Schedule,
    pub count: Schedule,
}

impl Schedules {
    pub fn from_config(config: &DaemonConfig) -> Result<Self> {
        Ok(Self {
            sync: Schedule::DailyAt(config.sync_time()?),
            count: Schedule::Every(config.count_interval()),
        })
    }
}

/// Run a node until SIGINT or SIGTERM.
pub async fn run(config: DaemonConfig) -> Result<()> {
    let service = DefaultService::from_config(&config)?;
    let schedules = Schedules::from_config(&config)?;
    let listener = TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;

    info!(
        listen_addr = %config.listen_addr,
        base_dir = %config.base_dir.display(),
        peers = config.peers.len(),
        "gitcache node started"
    );
    serve_until(service, schedules, listener, shutdown_signal()).await
}

/// Start both schedules, serve HTTP on `listener` until `shutdown`
/// resolves, then stop the schedules.
pub async fn serve_until<P, F, C, S, Sh>(
    service: Arc<GitCacheService<P, F, C, S>>,
    schedules: Schedules,
    listener: TcpListener,
    shutdown: Sh,
) -> Result<()>
where
    P: RemoteProbe,
    F: MirrorFetcher,
    C: PeerClient,
    S: BroadcastSink,
    Sh: Future<Output = ()> + Send + 'static,
{
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let jobs = spawn_schedules(&service, schedules, shutdown_rx);

    let result = axum::serve(listener, router(service))
        .with_graceful_shutdown(shutdown)
        .await
        .context("gitcache server exited unexpectedly");

    let _ = shutdown_tx.send(true);
    for job in jobs {
        if let Err(join_error) = job.await {
            error!(?join_error, "schedule task failed");
        }
    }
    info!("gitcache node stopped");
    result
}

fn spawn_schedules<P, F, C, S>(
    service: &Arc<GitCacheService<P, F, C, S>>,
    schedules: Schedules,
    shutdown: watch::Receiver<bool>,
) -> Vec<JoinHandle<()>>
where
    P: RemoteProbe,
    F: MirrorFetcher,
    C: PeerClient,
    S: BroadcastSink,
{
    let sync_service = service.clone();
    let sync = tokio::spawn(run_schedule("sync", schedules.sync, shutdown.clone(), move || {
        let service = sync_service.clone();
        async move {
            service.start_sync().await;
        }
    }));

    let count_service = service.clone();
    let count = tokio::spawn(run_schedule("count", schedules.count, shutdown, move || {
        let service = count_service.clone();
        async move {
            service.start_count().await;
        }
    }));

    vec![sync, count]
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            error!(%error, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                error!(%error, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("shutdown signal received");
}
