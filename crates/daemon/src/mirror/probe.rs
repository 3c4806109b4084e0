// Remote reachability probe.
//
// A fetch against an upstream that turned private or was deleted can hang
// waiting for credentials, so every update is preceded by a HEAD request.
// Only an exact 200 counts as reachable; redirects are not followed.

use std::future::Future;
use std::time::Duration;

use reqwest::redirect::Policy;
use reqwest::StatusCode;
use tracing::{debug, warn};

/// Existence check run before a mirror is fetched.
pub trait RemoteProbe: Send + Sync + 'static {
    fn is_reachable(&self, url: &str) -> impl Future<Output = bool> + Send;
}

/// `HEAD`-based probe.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    client: reqwest::Client,
}

impl HttpProbe {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().redirect(Policy::none()).timeout(timeout).build()?;
        Ok(Self { client })
    }
}

impl RemoteProbe for HttpProbe {
    async fn is_reachable(&self, url: &str) -> bool {
        match self.client.head(url).send().await {
            Ok(response) => {
                let status = response.status();
                debug!(url, status = status.as_u16(), "remote probe answered");
                status == StatusCode::OK
            }
            Err(error) => {
                warn!(url, %error, "remote probe failed");
                false
            }
        }
    }
}
