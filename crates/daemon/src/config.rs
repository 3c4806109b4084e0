// Daemon configuration file.
//
// Default location: `~/.gitcache/config.toml`. Every field is optional in
// the file; environment variables override the file.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Root directory for gitcache global state: `~/.gitcache/`.
pub fn global_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".gitcache"))
}

/// Path to the global config file: `~/.gitcache/config.toml`.
pub fn global_config_path() -> Option<PathBuf> {
    global_dir().map(|d| d.join("config.toml"))
}

// ── Daemon config ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DaemonConfig {
    /// Directory holding the bare mirrors, laid out as `<host>/<owner>/<repo>`.
    pub base_dir: PathBuf,
    /// Deepest directory level the scanner lists (0 = `base_dir` itself).
    pub max_depth: usize,
    /// Address the HTTP status server binds.
    pub listen_addr: SocketAddr,
    /// Base URLs of the nodes whose counts make up the cluster total.
    pub peers: Vec<String>,
    /// Wait before polling peers after a local count.
    pub settle_delay_secs: u64,
    /// Timeout for a single reachability probe.
    pub probe_timeout_secs: u64,
    /// Timeout for a single peer status poll.
    pub peer_timeout_secs: u64,
    /// Local wall-clock time of the daily sync sweep (`HH:MM:SS`).
    pub sync_at: String,
    /// Period of the counting sweep.
    pub count_interval_secs: u64,
    /// Fallback tracing filter when `RUST_LOG` is unset.
    pub log_filter: String,
    /// Clone broadcast sink; disabled when absent.
    pub broadcast: Option<BroadcastConfig>,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("/var/cache/gitcache"),
            max_depth: 2,
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 5000)),
            peers: Vec::new(),
            settle_delay_secs: 30,
            probe_timeout_secs: 10,
            peer_timeout_secs: 10,
            sync_at: "20:00:00".into(),
            count_interval_secs: 600,
            log_filter: "info".into(),
            broadcast: None,
        }
    }
}

/// Where clone announcements are posted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct BroadcastConfig {
    pub endpoint: String,
    pub private_key: String,
    pub public_key: String,
}

impl DaemonConfig {
    /// Load `path` if given, else `~/.gitcache/config.toml`, then apply the
    /// environment and validate. A missing default file yields defaults; a
    /// missing explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::load_from(path)?,
            None => global_config_path()
                .filter(|p| p.exists())
                .map(|p| Self::load_from(&p))
                .transpose()?
                .unwrap_or_default(),
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Load from a specific path without env overrides or validation.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        toml::from_str(&contents).map_err(ConfigError::Parse)
    }

    /// Save to a specific path (creates parent directories).
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigError::Io)?;
        }
        let contents = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        std::fs::write(path, contents).map_err(ConfigError::Io)
    }

    /// Override fields from the process environment.
    ///
    /// | Variable | Field |
    /// |---|---|
    /// | `GITCACHE_BASE_DIR` | `base_dir` |
    /// | `GITCACHE_LISTEN_ADDR` | `listen_addr` |
    /// | `GITCACHE_PEERS` | `peers` (comma-separated) |
    /// | `GITCACHE_LOG_FILTER` | `log_filter` |
    pub fn apply_env(&mut self) {
        self.apply_env_fn(|key| std::env::var(key));
    }

    fn apply_env_fn<F>(&mut self, env: F)
    where
        F: Fn(&str) -> Result<String, std::env::VarError>,
    {
        if let Ok(base_dir) = env("GITCACHE_BASE_DIR") {
            self.base_dir = PathBuf::from(base_dir);
        }
        if let Some(addr) = env("GITCACHE_LISTEN_ADDR").ok().and_then(|v| v.parse().ok()) {
            self.listen_addr = addr;
        }
        if let Ok(peers) = env("GITCACHE_PEERS") {
            self.peers = peers
                .split(',')
                .map(str::trim)
                .filter(|peer| !peer.is_empty())
                .map(ToOwned::to_owned)
                .collect();
        }
        if let Ok(filter) = env("GITCACHE_LOG_FILTER") {
            self.log_filter = filter;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for peer in &self.peers {
            let url = Url::parse(peer)
                .map_err(|e| ConfigError::Invalid(format!("peer `{peer}` is not a URL: {e}")))?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(ConfigError::Invalid(format!("peer `{peer}` must use http or https")));
            }
        }
        let positive = [
            ("count_interval_secs", self.count_interval_secs),
            ("probe_timeout_secs", self.probe_timeout_secs),
            ("peer_timeout_secs", self.peer_timeout_secs),
        ];
        if let Some((name, _)) = positive.iter().find(|(_, value)| *value == 0) {
            return Err(ConfigError::Invalid(format!("{name} must be positive")));
        }
        self.sync_time()?;
        Ok(())
    }

    /// Parsed `sync_at`.
    pub fn sync_time(&self) -> Result<NaiveTime, ConfigError> {
        NaiveTime::parse_from_str(&self.sync_at, "%H:%M:%S").map_err(|e| {
            ConfigError::Invalid(format!("sync_at `{}` is not HH:MM:SS: {e}", self.sync_at))
        })
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_secs(self.settle_delay_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn peer_timeout(&self) -> Duration {
        Duration::from_secs(self.peer_timeout_secs)
    }

    pub fn count_interval(&self) -> Duration {
        Duration::from_secs(self.count_interval_secs)
    }
}

// ── Errors ─────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config I/O error: {0}")]
    Io(std::io::Error),
    #[error("config parse error: {0}")]
    Parse(toml::de::Error),
    #[error("config serialize error: {0}")]
    Serialize(toml::ser::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}
