// HTTP surface of a gitcache node.
//
// `GET /gitcache/system/info` is the route peers poll; the rest are
// operator conveniences for triggering and watching sweeps by hand.

use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderValue, Request, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use gitcache_common::protocol::broadcast::AnnounceRequest;
use gitcache_common::protocol::info::{
    MirrorsInfo, SyncSnapshot, BROADCAST_PATH, INFO_PATH, SYNC_PATH,
};
use tracing::{error, info};
use uuid::Uuid;

use crate::cluster::peer::PeerClient;
use crate::mirror::fetch::MirrorFetcher;
use crate::mirror::probe::RemoteProbe;
use crate::notify::BroadcastSink;
use crate::service::GitCacheService;

const REQUEST_ID_HEADER: &str = "x-request-id";

type Shared<P, F, C, S> = State<Arc<GitCacheService<P, F, C, S>>>;

pub fn router<P, F, C, S>(service: Arc<GitCacheService<P, F, C, S>>) -> Router
where
    P: RemoteProbe,
    F: MirrorFetcher,
    C: PeerClient,
    S: BroadcastSink,
{
    Router::new()
        .route("/healthz", get(healthz))
        .route(INFO_PATH, get(system_info::<P, F, C, S>))
        .route(SYNC_PATH, get(sync_status::<P, F, C, S>).post(sync_trigger::<P, F, C, S>))
        .route(BROADCAST_PATH, post(broadcast::<P, F, C, S>))
        .with_state(service)
        .layer(middleware::from_fn(request_context_middleware))
        .layer(middleware::from_fn(panic_handler))
}

async fn healthz() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}

async fn system_info<P, F, C, S>(State(service): Shared<P, F, C, S>) -> Json<MirrorsInfo>
where
    P: RemoteProbe,
    F: MirrorFetcher,
    C: PeerClient,
    S: BroadcastSink,
{
    Json(service.current_status().await)
}

async fn sync_status<P, F, C, S>(State(service): Shared<P, F, C, S>) -> Json<SyncSnapshot>
where
    P: RemoteProbe,
    F: MirrorFetcher,
    C: PeerClient,
    S: BroadcastSink,
{
    Json(service.sync_snapshot())
}

async fn sync_trigger<P, F, C, S>(
    State(service): Shared<P, F, C, S>,
) -> (StatusCode, Json<SyncSnapshot>)
where
    P: RemoteProbe,
    F: MirrorFetcher,
    C: PeerClient,
    S: BroadcastSink,
{
    let status = if service.trigger_sync() { StatusCode::ACCEPTED } else { StatusCode::CONFLICT };
    (status, Json(service.sync_snapshot()))
}

async fn broadcast<P, F, C, S>(
    State(service): Shared<P, F, C, S>,
    Json(request): Json<AnnounceRequest>,
) -> Response
where
    P: RemoteProbe,
    F: MirrorFetcher,
    C: PeerClient,
    S: BroadcastSink,
{
    let repository = request.repository.trim();
    if repository.is_empty() {
        return (StatusCode::BAD_REQUEST, "repository must not be empty").into_response();
    }
    if service.announce_clone(repository) {
        StatusCode::ACCEPTED.into_response()
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "clone broadcast is not configured").into_response()
    }
}

async fn panic_handler(request: Request<Body>, next: Next) -> Response {
    match tokio::spawn(async move { next.run(request).await }).await {
        Ok(response) => response,
        Err(join_error) => {
            error!(?join_error, "request handling panicked");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn request_context_middleware(request: Request<Body>, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let started_at = Instant::now();

    let mut response = next.run(request).await;

    if let Ok(request_id_header) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, request_id_header);
    }

    info!(
        request_id = %request_id,
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        latency_ms = started_at.elapsed().as_millis() as u64,
        "request completed"
    );

    response
}
