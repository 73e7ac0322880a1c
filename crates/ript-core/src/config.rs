//! Configuration system for the RIPT gateway and client.
//!
//! Resolution order: environment variables → config file → defaults.
//!
//! Config file location:
//!   1. $RIPT_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/ript/config.toml
//!   3. ~/.config/ript/config.toml

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RiptConfig {
    pub gateway: GatewayConfig,
    pub client: ClientConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listen address.
    pub host: String,
    pub port: u16,
    /// Prefix of every RIPT endpoint.
    pub base_path: String,
    /// How long a correlated request waits for the router's reply.
    pub correlation_timeout_ms: u64,
    /// Capacity of the router's shared intake queue.
    pub intake_capacity: usize,
    /// Capacity of the new-face feed.
    pub feed_capacity: usize,
    /// How long a join may wait for room on a full feed.
    pub feed_wait_ms: u64,
    /// Capacity of each control-plane reply mailbox.
    pub control_mailbox_capacity: usize,
    /// Capacity of each media-plane mailbox.
    pub media_mailbox_capacity: usize,
    /// Trunk groups served by the loopback router. Empty = accept any.
    pub trunk_groups: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Scheme, host and port of the gateway.
    pub gateway_origin: String,
    pub base_path: String,
    pub trunk_group: String,
    /// Call id used for media until a call setup assigns one.
    pub call_id: String,
    /// Face name sent to the gateway. Empty = random.
    pub peer_name: String,
    /// Per-request timeout. Keep it above the gateway's correlation timeout.
    pub request_timeout_ms: u64,
}

// ── Defaults ──────────────────────────────────────────────────────────────────

pub const DEFAULT_BASE_PATH: &str = "/.well-known/ript/v1";

pub const DEFAULT_PORT: u16 = 6121;

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            base_path: DEFAULT_BASE_PATH.to_string(),
            correlation_timeout_ms: 2_000,
            intake_capacity: 64,
            feed_capacity: 10,
            feed_wait_ms: 250,
            control_mailbox_capacity: 1,
            media_mailbox_capacity: 20,
            trunk_groups: vec!["trunk123".to_string()],
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            gateway_origin: format!("http://127.0.0.1:{}", DEFAULT_PORT),
            base_path: DEFAULT_BASE_PATH.to_string(),
            trunk_group: "trunk123".to_string(),
            call_id: "0".to_string(),
            peer_name: String::new(),
            request_timeout_ms: 5_000,
        }
    }
}

impl GatewayConfig {
    pub fn correlation_timeout(&self) -> Duration {
        Duration::from_millis(self.correlation_timeout_ms)
    }

    pub fn feed_wait(&self) -> Duration {
        Duration::from_millis(self.feed_wait_ms)
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl ClientConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
        .join("ript")
}

fn home_dir() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("failed to write {0}: {1}")]
    WriteFailed(PathBuf, std::io::Error),
    #[error("failed to serialize: {0}")]
    SerializeFailed(toml::ser::Error),
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl RiptConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::load_from(&Self::file_path())?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from an explicit path, without env overrides. Missing file = defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(RiptConfig::default());
        }
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFailed(path.to_path_buf(), e))?;
        toml::from_str(&text).map_err(|e| ConfigError::ParseFailed(path.to_path_buf(), e))
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("RIPT_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Write default config if none exists. Returns the path.
    pub fn write_default_if_missing() -> Result<PathBuf, ConfigError> {
        let path = Self::file_path();
        Self::write_default_to(&path)?;
        Ok(path)
    }

    fn write_default_to(path: &Path) -> Result<(), ConfigError> {
        if path.exists() {
            return Ok(());
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ConfigError::WriteFailed(path.to_path_buf(), e))?;
        }
        let text =
            toml::to_string_pretty(&RiptConfig::default()).map_err(ConfigError::SerializeFailed)?;
        std::fs::write(path, text).map_err(|e| ConfigError::WriteFailed(path.to_path_buf(), e))
    }

    /// Apply RIPT_* env var overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("RIPT_GATEWAY__HOST") {
            self.gateway.host = v;
        }
        if let Ok(v) = std::env::var("RIPT_GATEWAY__PORT") {
            if let Ok(p) = v.parse() {
                self.gateway.port = p;
            }
        }
        if let Ok(v) = std::env::var("RIPT_GATEWAY__CORRELATION_TIMEOUT_MS") {
            if let Ok(ms) = v.parse() {
                self.gateway.correlation_timeout_ms = ms;
            }
        }
        if let Ok(v) = std::env::var("RIPT_CLIENT__GATEWAY_ORIGIN") {
            self.client.gateway_origin = v;
        }
        if let Ok(v) = std::env::var("RIPT_CLIENT__TRUNK_GROUP") {
            self.client.trunk_group = v;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("ript-config-{}-{}", tag, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn defaults_match_reference_gateway() {
        let config = RiptConfig::default();
        assert_eq!(config.gateway.port, 6121);
        assert_eq!(config.gateway.correlation_timeout(), Duration::from_secs(2));
        assert_eq!(config.gateway.control_mailbox_capacity, 1);
        assert_eq!(config.gateway.media_mailbox_capacity, 20);
        assert_eq!(config.gateway.feed_capacity, 10);
        assert!(config.client.request_timeout() > config.gateway.correlation_timeout());
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = scratch_dir("missing");
        let config = RiptConfig::load_from(&dir.join("nope.toml")).unwrap();
        assert_eq!(config.gateway.base_path, DEFAULT_BASE_PATH);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = scratch_dir("partial");
        let path = dir.join("config.toml");
        std::fs::write(
            &path,
            "[gateway]\nport = 7000\ntrunk_groups = [\"a\", \"b\"]\n\n[client]\ntrunk_group = \"a\"\n",
        )
        .unwrap();

        let config = RiptConfig::load_from(&path).unwrap();
        assert_eq!(config.gateway.port, 7000);
        assert_eq!(config.gateway.trunk_groups, vec!["a", "b"]);
        assert_eq!(config.gateway.correlation_timeout_ms, 2_000);
        assert_eq!(config.client.trunk_group, "a");
        assert_eq!(config.client.base_path, DEFAULT_BASE_PATH);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn bad_file_reports_parse_error() {
        let dir = scratch_dir("bad");
        let path = dir.join("config.toml");
        std::fs::write(&path, "[gateway\nport = ").unwrap();
        let err = RiptConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ParseFailed(_, _)));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn write_default_creates_loadable_file() {
        let dir = scratch_dir("write");
        let path = dir.join("nested").join("config.toml");
        RiptConfig::write_default_to(&path).unwrap();
        assert!(path.exists());

        let config = RiptConfig::load_from(&path).unwrap();
        assert_eq!(config.gateway.port, DEFAULT_PORT);
        assert_eq!(config.client.call_id, "0");

        let _ = std::fs::remove_dir_all(&dir);
    }
}
