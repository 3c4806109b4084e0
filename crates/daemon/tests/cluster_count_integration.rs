use std::sync::Arc;
use std::time::Duration;

use axum::routing::get;
use axum::{Json, Router};
use gitcache_common::protocol::info::{MirrorsInfo, INFO_PATH};
use gitcache_daemon::cluster::counter::ClusterCounter;
use gitcache_daemon::cluster::peer::{HttpPeerClient, PeerClient};
use gitcache_daemon::sync::state::CacheState;
use tokio::net::TcpListener;

async fn fake_peer(count: i64) -> String {
    let app = Router::new().route(
        INFO_PATH,
        get(move || async move {
            Json(MirrorsInfo {
                count,
                progress: String::new(),
                size: count,
                nodes: "node7".into(),
            })
        }),
    );
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}")
}

async fn garbage_peer() -> String {
    let app = Router::new().route(INFO_PATH, get(|| async { "not json" }));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}")
}

async fn dead_peer() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

fn client() -> HttpPeerClient {
    HttpPeerClient::new(Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn unreachable_peer_contributes_zero() {
    let peers = vec![fake_peer(5).await, fake_peer(3).await, dead_peer().await, fake_peer(2).await];
    let state = Arc::new(CacheState::new());
    state.set_local_count(4);
    let counter = ClusterCounter::new(peers, Duration::ZERO, client(), state.clone());

    assert_eq!(counter.refresh().await, Some(10));
    assert_eq!(state.cluster_total(), 10);
    assert_eq!(state.reported_size(), 10);
}

#[tokio::test]
async fn malformed_payload_counts_as_missing() {
    let peers = vec![fake_peer(6).await, garbage_peer().await];
    let state = Arc::new(CacheState::new());
    let counter = ClusterCounter::new(peers, Duration::ZERO, client(), state.clone());

    let poll = counter.poll().await;
    assert_eq!(poll.total, 6);
    assert_eq!(poll.answered, 1);
    assert_eq!(poll.failed, 1);
}

#[tokio::test]
async fn http_client_reads_peer_payload() {
    let peer = fake_peer(42).await;
    let info = client().fetch_info(&format!("{peer}/")).await.unwrap();
    assert_eq!(info.count, 42);
    assert_eq!(info.nodes, "node7");
}
