// Clone broadcast sink.
//
// Announces newly cached repositories so other nodes clone them too. The
// endpoint owns signing and delivery; this side builds the message and
// forwards it without waiting on the outcome.

use std::future::Future;
use std::time::Duration;

use gitcache_common::protocol::broadcast::CloneBroadcast;
use thiserror::Error;

use crate::config::BroadcastConfig;

#[derive(Debug, Error)]
pub enum BroadcastError {
    #[error("broadcast request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("broadcast endpoint returned HTTP {0}")]
    Status(u16),
}

/// Delivers clone announcements.
pub trait BroadcastSink: Send + Sync + 'static {
    fn send(&self, message: CloneBroadcast)
        -> impl Future<Output = Result<(), BroadcastError>> + Send;
}

/// Posts the message as JSON to the configured endpoint.
#[derive(Debug, Clone)]
pub struct HttpBroadcastSink {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpBroadcastSink {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, endpoint: endpoint.into() })
    }
}

impl BroadcastSink for HttpBroadcastSink {
    async fn send(&self, message: CloneBroadcast) -> Result<(), BroadcastError> {
        let response = self.client.post(&self.endpoint).json(&message).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(BroadcastError::Status(status.as_u16()));
        }
        Ok(())
    }
}

/// Sink plus the fixed addressing keys.
#[derive(Debug, Clone)]
pub struct CloneAnnouncer<S> {
    sink: S,
    private_key: String,
    public_key: String,
}

impl<S: BroadcastSink> CloneAnnouncer<S> {
    pub fn new(sink: S, private_key: impl Into<String>, public_key: impl Into<String>) -> Self {
        Self { sink, private_key: private_key.into(), public_key: public_key.into() }
    }

    pub fn message_for(&self, repository: &str) -> CloneBroadcast {
        CloneBroadcast::new(&self.private_key, &self.public_key, repository)
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }
}

impl CloneAnnouncer<HttpBroadcastSink> {
    pub fn from_config(
        config: &BroadcastConfig,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let sink = HttpBroadcastSink::new(&config.endpoint, timeout)?;
        Ok(Self::new(sink, &config.private_key, &config.public_key))
    }
}
