use figment::{
    providers::{Env, Format, Json, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Process-level configuration, read once at startup.
///
/// The update policy itself lives in the settings document at
/// `settings_path` and is re-read on every use.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub bind: SocketAddr,
    pub settings_path: PathBuf,
    pub updater_image: String,
    /// Docker API version forced on the updater engine.
    pub updater_api_version: String,
    pub docker_socket: String,
    pub tick_secs: u64,
    pub backoff_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_identity: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 5000)),
            settings_path: PathBuf::from("/app/config/config.json"),
            updater_image: "containrrr/watchtower".into(),
            updater_api_version: "1.44".into(),
            docker_socket: "/var/run/docker.sock".into(),
            tick_secs: 10,
            backoff_secs: 60,
            host_identity: None,
        }
    }
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        Self::from_figment(
            Figment::from(Serialized::defaults(Config::default()))
                .merge(Toml::file("staleguard.toml"))
                .merge(Json::file("staleguard.json"))
                .merge(Env::prefixed("STALEGUARD_")),
        )
    }

    fn from_figment(figment: Figment) -> anyhow::Result<Self> {
        let mut config: Config = figment
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

        // In a Docker container, the hostname is typically the container ID.
        if config.host_identity.is_none() {
            config.host_identity = std::env::var("HOSTNAME").ok();
        }

        if config.tick_secs == 0 {
            anyhow::bail!("tick_secs must be at least 1");
        }

        Ok(config)
    }

    pub fn host_identity(&self) -> &str {
        self.host_identity.as_deref().unwrap_or_default()
    }

    pub fn tick(&self) -> Duration {
        Duration::from_secs(self.tick_secs)
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_secs(self.backoff_secs)
    }
}
