// HTTP client for a gitcache node's status API.

use std::fmt;
use std::time::Duration;

use anyhow::{Context, Result};
use gitcache_common::protocol::info::{MirrorsInfo, SyncSnapshot, INFO_PATH, SYNC_PATH};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

pub const DEFAULT_NODE: &str = "http://127.0.0.1:5000";

const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// The node could not be reached at all (refused, DNS, timeout).
#[derive(Debug)]
pub struct NodeUnavailable {
    node: String,
    source: reqwest::Error,
}

impl NodeUnavailable {
    pub fn is_timeout(&self) -> bool {
        self.source.is_timeout()
    }
}

impl fmt::Display for NodeUnavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gitcache node `{}` is not reachable", self.node)
    }
}

impl std::error::Error for NodeUnavailable {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

#[derive(Debug, Clone)]
pub struct NodeClient {
    base: Url,
    http: reqwest::Client,
}

impl NodeClient {
    pub fn new(node: &str) -> Result<Self> {
        Self::with_timeout(node, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_timeout(node: &str, timeout: Duration) -> Result<Self> {
        let base = Url::parse(node).with_context(|| format!("invalid node URL `{node}`"))?;
        if !matches!(base.scheme(), "http" | "https") {
            anyhow::bail!("node URL `{node}` must use http or https");
        }
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { base, http })
    }

    pub fn node(&self) -> &str {
        self.base.as_str().trim_end_matches('/')
    }

    pub async fn info(&self) -> Result<MirrorsInfo> {
        self.get_json(INFO_PATH).await
    }

    pub async fn sync_snapshot(&self) -> Result<SyncSnapshot> {
        self.get_json(SYNC_PATH).await
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.base.join(path).with_context(|| format!("invalid path `{path}`"))?;
        debug!(%url, "requesting node status");
        let response = self.http.get(url.clone()).send().await.map_err(|source| {
            if source.is_connect() || source.is_timeout() {
                anyhow::Error::new(NodeUnavailable { node: self.node().to_string(), source })
            } else {
                anyhow::Error::new(source).context(format!("request to {url} failed"))
            }
        })?;
        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("{url} returned HTTP {}", status.as_u16());
        }
        response.json().await.with_context(|| format!("{url} returned an unexpected body"))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use axum::routing::get;
    use axum::{Json, Router};
    use tokio::net::TcpListener;

    pub(crate) async fn fake_node(count: i64, size: i64, nodes: &'static str) -> String {
        let app = Router::new()
            .route(
                INFO_PATH,
                get(move || async move {
                    Json(MirrorsInfo { count, progress: String::new(), size, nodes: nodes.into() })
                }),
            )
            .route(SYNC_PATH, get(|| async { Json(SyncSnapshot::default()) }));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        format!("http://{addr}")
    }

    pub(crate) async fn dead_node() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{addr}")
    }

    #[test]
    fn rejects_non_http_urls() {
        assert!(NodeClient::new("ftp://example.com").is_err());
        assert!(NodeClient::new("not a url").is_err());
        let client = NodeClient::new("http://10.0.0.5:5000/").unwrap();
        assert_eq!(client.node(), "http://10.0.0.5:5000");
    }

    #[tokio::test]
    async fn reads_info_payload() {
        let node = fake_node(4, 9, "node12").await;
        let info = NodeClient::new(&node).unwrap().info().await.unwrap();
        assert_eq!(info.count, 4);
        assert_eq!(info.size, 9);
        assert_eq!(info.nodes, "node12");
    }

    #[tokio::test]
    async fn refused_connection_is_node_unavailable() {
        let node = dead_node().await;
        let error = NodeClient::new(&node).unwrap().info().await.unwrap_err();
        assert!(error.downcast_ref::<NodeUnavailable>().is_some());
    }
}
