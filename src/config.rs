use crate::registry::Registry;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub chain: ChainConfig,
    pub publishing: PublishingConfig,
    pub monitoring: MonitoringConfig,
    #[serde(default)]
    pub registry: Registry,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    /// Ethereum JSON-RPC endpoint.
    pub rpc_url: String,
    /// Per-request timeout for the RPC client.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Upper bound for one full aggregation cycle.
    #[serde(default = "default_cycle_timeout_secs")]
    pub cycle_timeout_secs: u64,
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_cycle_timeout_secs() -> u64 {
    45
}

#[derive(Debug, Clone, Deserialize)]
pub struct PublishingConfig {
    /// Max snapshots kept in the broadcast channel for /ws/snapshot (slow clients may lag).
    pub broadcast_capacity: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitoringConfig {
    /// How often to run an aggregation cycle.
    pub poll_interval_secs: u64,
    /// How often to log app stats (cycles completed/failed, ws clients) at INFO level.
    pub stats_log_interval_secs: u64,
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.server.port > 0,
            "server.port must be between 1 and 65535, got {}",
            self.server.port
        );
        anyhow::ensure!(
            self.chain.rpc_url.starts_with("http://") || self.chain.rpc_url.starts_with("https://"),
            "chain.rpc_url must be an http(s) URL, got {:?}",
            self.chain.rpc_url
        );
        anyhow::ensure!(
            self.chain.request_timeout_secs > 0,
            "chain.request_timeout_secs must be > 0, got {}",
            self.chain.request_timeout_secs
        );
        anyhow::ensure!(
            self.chain.cycle_timeout_secs > 0,
            "chain.cycle_timeout_secs must be > 0, got {}",
            self.chain.cycle_timeout_secs
        );
        anyhow::ensure!(
            self.publishing.broadcast_capacity > 0,
            "publishing.broadcast_capacity must be > 0, got {}",
            self.publishing.broadcast_capacity
        );
        anyhow::ensure!(
            self.monitoring.poll_interval_secs > 0,
            "monitoring.poll_interval_secs must be > 0, got {}",
            self.monitoring.poll_interval_secs
        );
        anyhow::ensure!(
            self.monitoring.stats_log_interval_secs > 0,
            "monitoring.stats_log_interval_secs must be > 0, got {}",
            self.monitoring.stats_log_interval_secs
        );
        anyhow::ensure!(
            !self.registry.operators.is_empty(),
            "registry.operators must not be empty"
        );
        Ok(())
    }
}
