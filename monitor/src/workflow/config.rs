use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tmscore::model::ViewportSize;
use tmscore::telemetry::{ReconnectPolicy, DEFAULT_METRIC, DEFAULT_TOPIC};

use crate::generator::profile::FeedConfig;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    pub host: String,
    pub port: u16,
    pub path: String,
    pub secure: bool,
    pub username: String,
    pub password: String,
    pub client_id_prefix: String,
    pub keep_alive_secs: u64,
    pub topic: String,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: "tie.digitraffic.fi".into(),
            port: 61619,
            path: "/mqtt".into(),
            secure: true,
            username: "digitraffic".into(),
            password: "digitrafficPassword".into(),
            client_id_prefix: "tmsmonitor".into(),
            keep_alive_secs: 30,
            topic: DEFAULT_TOPIC.into(),
        }
    }
}

impl BrokerConfig {
    pub fn url(&self) -> String {
        let scheme = if self.secure { "wss" } else { "ws" };
        format!("{}://{}:{}{}", scheme, self.host, self.port, self.path)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub broker: BrokerConfig,
    pub metric: String,
    pub metadata_url: String,
    pub metadata_retry: ReconnectPolicy,
    pub reconnect: ReconnectPolicy,
    pub coalesce_window_ms: u64,
    pub view_store: PathBuf,
    pub viewport: ViewportSize,
    pub bind: SocketAddr,
    pub simulation: FeedConfig,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            broker: BrokerConfig::default(),
            metric: DEFAULT_METRIC.into(),
            metadata_url: "https://tie.digitraffic.fi/api/v1/metadata/tms-stations".into(),
            metadata_retry: ReconnectPolicy::Backoff {
                base_ms: 1000,
                max_ms: 30_000,
                factor: 2.0,
                jitter: 0.2,
                max_attempts: Some(5),
            },
            reconnect: ReconnectPolicy::default(),
            coalesce_window_ms: 1000,
            view_store: PathBuf::from("data/position.json"),
            viewport: ViewportSize::default(),
            bind: SocketAddr::from(([127, 0, 0, 1], 9000)),
            simulation: FeedConfig::default(),
        }
    }
}

impl MonitorConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading monitor config {}", path_ref.display()))?;
        let config: MonitorConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing monitor config {}", path_ref.display()))?;
        Ok(config)
    }

    pub fn coalesce_window(&self) -> Duration {
        Duration::from_millis(self.coalesce_window_ms)
    }
}
