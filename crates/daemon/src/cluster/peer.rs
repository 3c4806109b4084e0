// Status queries against peer nodes.

use std::future::Future;
use std::time::Duration;

use gitcache_common::protocol::info::{MirrorsInfo, INFO_PATH};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum PeerError {
    #[error("peer request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("peer returned HTTP {0}")]
    Status(u16),
    #[error("peer returned an unparseable body")]
    Body,
}

/// Fetches a peer's status payload.
pub trait PeerClient: Send + Sync + 'static {
    fn fetch_info(&self, peer: &str) -> impl Future<Output = Result<MirrorsInfo, PeerError>> + Send;
}

/// Full status URL for a peer base URL.
pub fn info_url(peer: &str) -> String {
    format!("{}{INFO_PATH}", peer.trim_end_matches('/'))
}

#[derive(Debug, Clone)]
pub struct HttpPeerClient {
    client: reqwest::Client,
}

impl HttpPeerClient {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

impl PeerClient for HttpPeerClient {
    async fn fetch_info(&self, peer: &str) -> Result<MirrorsInfo, PeerError> {
        let response = self.client.get(info_url(peer)).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(PeerError::Status(status.as_u16()));
        }
        let body = response.text().await?;
        MirrorsInfo::parse(&body).ok_or(PeerError::Body)
    }
}

/// A peer's count, or `None` when it could not be read.
pub async fn peer_count<C: PeerClient>(client: &C, peer: &str) -> Option<i64> {
    match client.fetch_info(peer).await {
        Ok(info) => Some(info.count),
        Err(error) => {
            warn!(peer, %error, "peer status poll failed");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn info_url_joins_without_double_slash() {
        assert_eq!(info_url("http://10.0.0.1:5000"), "http://10.0.0.1:5000/gitcache/system/info");
        assert_eq!(info_url("http://10.0.0.1:5000/"), "http://10.0.0.1:5000/gitcache/system/info");
    }
}
