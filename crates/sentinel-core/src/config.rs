//! Configuration loading and typed config structures.
//!
//! The canonical configuration lives in `sentinel-config.yaml` at the
//! project root. Every field has a serde default, so an empty file (or no
//! file at all) yields a working local setup.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level simulation configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SimulationConfig {
    /// Tick timing and world rules.
    #[serde(default)]
    pub world: WorldConfig,

    /// The local agent.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Peer synchronization.
    #[serde(default)]
    pub sync: SyncConfig,

    /// Snapshot persistence.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Observer HTTP server.
    #[serde(default)]
    pub observer: ObserverConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl SimulationConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override YAML values:
    /// - `SENTINEL_AGENT_NAME` overrides `agent.name`
    /// - `SENTINEL_NATS_URL` overrides `sync.nats_url`
    /// - `SENTINEL_STORAGE_DIR` overrides `storage.dir`
    /// - `SENTINEL_OBSERVER_PORT` overrides `observer.port`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string, then apply env overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config = Self::parse_without_env(yaml)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a YAML string without consulting the
    /// environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse_without_env(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yml::from_str(yaml)?)
    }

    /// Apply `SENTINEL_*` environment overrides.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("SENTINEL_AGENT_NAME") {
            self.agent.name = val;
        }
        if let Ok(val) = std::env::var("SENTINEL_NATS_URL") {
            self.sync.nats_url = val;
        }
        if let Ok(val) = std::env::var("SENTINEL_STORAGE_DIR") {
            self.storage.dir = PathBuf::from(val);
        }
        if let Some(port) = std::env::var("SENTINEL_OBSERVER_PORT")
            .ok()
            .and_then(|val| val.parse().ok())
        {
            self.observer.port = port;
        }
    }
}

/// Tick timing and world rules.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WorldConfig {
    /// Real-time milliseconds per tick.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Per-tick anomaly spawn probability, clamped to [0, 1].
    #[serde(default = "default_anomaly_probability")]
    pub anomaly_probability: f64,

    /// Every n-th tick records a routine sweep narrative.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval: u64,

    /// Every n-th tick steps the threat level down one level.
    #[serde(default = "default_threat_decay_interval")]
    pub threat_decay_interval: u64,

    /// Fixed RNG seed. Unset means seeded from the OS.
    #[serde(default)]
    pub seed: Option<u64>,

    /// Stop after this many ticks (0 = unlimited).
    #[serde(default)]
    pub max_ticks: u64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            anomaly_probability: default_anomaly_probability(),
            sweep_interval: default_sweep_interval(),
            threat_decay_interval: default_threat_decay_interval(),
            seed: None,
            max_ticks: 0,
        }
    }
}

/// The local agent.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AgentConfig {
    /// Display name of this instance's agent.
    #[serde(default = "default_agent_name")]
    pub name: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
        }
    }
}

/// Which transport carries sync messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// In-process bus; only instances in the same process see each other.
    #[default]
    Local,
    /// Local NATS server; instances in separate processes on one device.
    Nats,
    /// No synchronization.
    Disabled,
}

/// Peer synchronization.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SyncConfig {
    /// Name of the shared channel (NATS subject).
    #[serde(default = "default_channel_name")]
    pub channel_name: String,

    /// Transport selection.
    #[serde(default)]
    pub transport: TransportKind,

    /// NATS server URL, used when `transport` is `nats`.
    #[serde(default = "default_nats_url")]
    pub nats_url: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            channel_name: default_channel_name(),
            transport: TransportKind::default(),
            nats_url: default_nats_url(),
        }
    }
}

/// Snapshot persistence.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StorageConfig {
    /// Whether snapshots are saved and loaded at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Directory holding the snapshot file.
    #[serde(default = "default_storage_dir")]
    pub dir: PathBuf,

    /// Storage key; the file is `<dir>/<key>.json`.
    #[serde(default = "default_storage_key")]
    pub key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: default_storage_dir(),
            key: default_storage_key(),
        }
    }
}

/// Observer HTTP server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ObserverConfig {
    /// Bind address.
    #[serde(default = "default_observer_host")]
    pub host: String,

    /// Bind port.
    #[serde(default = "default_observer_port")]
    pub port: u16,
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            host: default_observer_host(),
            port: default_observer_port(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions (serde default requires named functions)
// ---------------------------------------------------------------------------

const fn default_tick_interval_ms() -> u64 {
    2_500
}

const fn default_anomaly_probability() -> f64 {
    0.15
}

const fn default_sweep_interval() -> u64 {
    10
}

const fn default_threat_decay_interval() -> u64 {
    15
}

fn default_agent_name() -> String {
    "Operative".to_owned()
}

fn default_channel_name() -> String {
    "sentinel-world-sync".to_owned()
}

fn default_nats_url() -> String {
    "nats://localhost:4222".to_owned()
}

const fn default_true() -> bool {
    true
}

fn default_storage_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_storage_key() -> String {
    "sentinel-world-state".to_owned()
}

fn default_observer_host() -> String {
    "127.0.0.1".to_owned()
}

const fn default_observer_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_owned()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = SimulationConfig::default();
        assert_eq!(config.world.tick_interval_ms, 2_500);
        assert!((config.world.anomaly_probability - 0.15).abs() < f64::EPSILON);
        assert_eq!(config.world.sweep_interval, 10);
        assert_eq!(config.world.threat_decay_interval, 15);
        assert_eq!(config.world.seed, None);
        assert_eq!(config.sync.channel_name, "sentinel-world-sync");
        assert_eq!(config.sync.transport, TransportKind::Local);
        assert_eq!(config.storage.key, "sentinel-world-state");
        assert!(config.storage.enabled);
    }

    #[test]
    fn parse_full_yaml() {
        let yaml = r#"
world:
  tick_interval_ms: 500
  anomaly_probability: 0.5
  sweep_interval: 5
  threat_decay_interval: 6
  seed: 99
  max_ticks: 100

agent:
  name: "Wraith"

sync:
  channel_name: "ops-sync"
  transport: nats
  nats_url: "nats://127.0.0.1:4333"

storage:
  enabled: false
  dir: "/tmp/sentinel"
  key: "ops-state"

observer:
  host: "0.0.0.0"
  port: 9000

logging:
  level: "debug"
  format: json
"#;
        let config = SimulationConfig::parse_without_env(yaml).unwrap();
        assert_eq!(config.world.tick_interval_ms, 500);
        assert_eq!(config.world.seed, Some(99));
        assert_eq!(config.world.max_ticks, 100);
        assert_eq!(config.agent.name, "Wraith");
        assert_eq!(config.sync.transport, TransportKind::Nats);
        assert_eq!(config.sync.nats_url, "nats://127.0.0.1:4333");
        assert!(!config.storage.enabled);
        assert_eq!(config.storage.dir, PathBuf::from("/tmp/sentinel"));
        assert_eq!(config.observer.port, 9000);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn parse_minimal_yaml() {
        let config = SimulationConfig::parse_without_env("world:\n  seed: 7\n").unwrap();
        assert_eq!(config.world.seed, Some(7));
        assert_eq!(config.world.tick_interval_ms, 2_500);
        assert_eq!(config.observer, ObserverConfig::default());
    }

    #[test]
    fn parse_empty_yaml() {
        assert_eq!(
            SimulationConfig::parse_without_env("").unwrap(),
            SimulationConfig::default()
        );
    }

    #[test]
    fn unknown_transport_is_rejected() {
        let result = SimulationConfig::parse_without_env("sync:\n  transport: carrier-pigeon\n");
        assert!(matches!(result, Err(ConfigError::Yaml { .. })));
    }

    #[test]
    fn load_project_config_file() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("sentinel-config.yaml");
        if path.exists() {
            let config = SimulationConfig::from_file(&path);
            assert!(config.is_ok(), "Failed to load project config: {config:?}");
        }
    }
}
