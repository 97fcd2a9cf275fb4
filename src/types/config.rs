//! Configuration structures.
//!
//! Configuration is read from a `config.json` in the working directory with
//! hardcoded fallback defaults when the file is absent or unparseable.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Global orchestrator configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Listen addresses.
    #[serde(default)]
    pub server: ServerConfig,

    /// Tool discovery configuration.
    #[serde(default)]
    pub discovery: DiscoveryConfig,

    /// Health monitor configuration.
    #[serde(default)]
    pub health: HealthConfig,

    /// Human-input task store configuration.
    #[serde(default)]
    pub task_store: TaskStoreConfig,

    /// IPC transport limits.
    #[serde(default)]
    pub ipc: IpcConfig,
}

impl Config {
    /// Load configuration from `path`. A missing or malformed file is not
    /// fatal: the defaults are returned and the condition is logged.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(_) => {
                tracing::warn!(path = %path.display(), "config file not found, using defaults");
                return Self::default();
            }
        };
        match serde_json::from_str(&raw) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded configuration");
                config
            }
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "failed to parse config, using defaults");
                Self::default()
            }
        }
    }
}

/// Listen addresses for the two public surfaces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// RPC server bind address (TCP).
    pub rpc_addr: String,

    /// HTTP/JSON mirror bind address.
    pub http_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            rpc_addr: "127.0.0.1:8090".to_string(),
            http_addr: "127.0.0.1:8002".to_string(),
        }
    }
}

/// Tool discovery configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Root directories whose immediate subdirectories are tool candidates.
    pub roots: Vec<PathBuf>,

    /// Directory names excluded from default startup (heavyweight or
    /// optional tools).
    pub denylist: Vec<String>,

    /// Connect-and-describe retry policy.
    #[serde(default)]
    pub retry: RetryPolicy,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            roots: vec![PathBuf::from("tools")],
            denylist: vec![
                "hybrid_search".to_string(),
                "keyword_extractor".to_string(),
                "text_summarizer".to_string(),
                "text_generator".to_string(),
            ],
            retry: RetryPolicy::default(),
        }
    }
}

/// Bounded retry policy for dialing a freshly launched tool. Parameterized
/// rather than hardcoded so tests can shrink the bound.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum dial+describe attempts before abandoning a tool.
    pub max_attempts: u32,

    /// Fixed delay before each attempt. Generous by default to tolerate
    /// tools that are compiled or interpreted on first launch.
    #[serde(with = "humantime_serde")]
    pub delay: Duration,

    /// Per-attempt deadline for the Describe call.
    #[serde(with = "humantime_serde")]
    pub describe_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 15,
            delay: Duration::from_secs(1),
            describe_timeout: Duration::from_secs(1),
        }
    }
}

/// Health monitor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthConfig {
    /// Interval between health sweeps.
    #[serde(with = "humantime_serde")]
    pub interval: Duration,

    /// Per-tool deadline for one health query.
    #[serde(with = "humantime_serde")]
    pub check_timeout: Duration,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            check_timeout: Duration::from_secs(2),
        }
    }
}

/// Human-input task store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskStoreConfig {
    /// How long completed tasks are retained before eviction. Pending tasks
    /// are never evicted.
    #[serde(with = "humantime_serde")]
    pub retention: Duration,

    /// How often the eviction sweep runs.
    #[serde(with = "humantime_serde")]
    pub sweep_interval: Duration,
}

impl Default for TaskStoreConfig {
    fn default() -> Self {
        Self {
            retention: Duration::from_secs(24 * 3600),
            sweep_interval: Duration::from_secs(300),
        }
    }
}

/// IPC transport limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpcConfig {
    /// Maximum frame payload size in bytes.
    pub max_frame_bytes: u32,

    /// Maximum concurrent TCP connections per server.
    pub max_connections: usize,

    /// Read timeout in seconds per frame. Connections idle beyond this
    /// duration are dropped.
    pub read_timeout_secs: u64,

    /// Write timeout in seconds per frame. Slow consumers that cannot
    /// accept a response within this window are dropped.
    pub write_timeout_secs: u64,
}

impl Default for IpcConfig {
    fn default() -> Self {
        Self {
            max_frame_bytes: 5 * 1024 * 1024,
            max_connections: 1000,
            read_timeout_secs: 300,
            write_timeout_secs: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_documented_ports() {
        let config = Config::default();
        assert_eq!(config.server.rpc_addr, "127.0.0.1:8090");
        assert_eq!(config.server.http_addr, "127.0.0.1:8002");
        assert_eq!(config.discovery.retry.max_attempts, 15);
        assert_eq!(config.health.interval, Duration::from_secs(10));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = Config::load("/nonexistent/config.json");
        assert_eq!(config.server.rpc_addr, "127.0.0.1:8090");
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"{ not json").unwrap();
        let config = Config::load(file.path());
        assert_eq!(config.server.http_addr, "127.0.0.1:8002");
    }

    #[test]
    fn partial_file_overrides_one_section() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(
            br#"{"server": {"rpc_addr": "127.0.0.1:9999", "http_addr": "127.0.0.1:9998"}}"#,
        )
        .unwrap();
        let config = Config::load(file.path());
        assert_eq!(config.server.rpc_addr, "127.0.0.1:9999");
        // Untouched sections keep defaults
        assert_eq!(config.health.interval, Duration::from_secs(10));
    }

    #[test]
    fn retry_policy_round_trips_humantime() {
        let policy = RetryPolicy {
            max_attempts: 2,
            delay: Duration::from_millis(10),
            describe_timeout: Duration::from_millis(50),
        };
        let json = serde_json::to_string(&policy).unwrap();
        let back: RetryPolicy = serde_json::from_str(&json).unwrap();
        assert_eq!(back.max_attempts, 2);
        assert_eq!(back.delay, Duration::from_millis(10));
    }
}
