use std::path::PathBuf;
use std::time::Duration;

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Event-stream location and the verification timeouts applied against it.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct WatchConfig {
    /// Aggregated log file on the control host that nodes forward into
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,

    /// Poll interval for new event lines (unit: milliseconds)
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Coordinator readiness deadline (unit: seconds)
    #[serde(default = "default_coordinator_ready_secs")]
    pub coordinator_ready_secs: u64,

    /// Per-chunk agent readiness deadline (unit: seconds)
    #[serde(default = "default_chunk_ready_secs")]
    pub chunk_ready_secs: u64,

    /// Default deadline for scenario verification (unit: seconds)
    #[serde(default = "default_scenario_secs")]
    pub scenario_secs: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            log_file: default_log_file(),
            poll_interval_ms: default_poll_interval_ms(),
            coordinator_ready_secs: default_coordinator_ready_secs(),
            chunk_ready_secs: default_chunk_ready_secs(),
            scenario_secs: default_scenario_secs(),
        }
    }
}

impl WatchConfig {
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 {
            return Err(Error::Config(ConfigError::Message(
                "poll_interval_ms must be at least 1".into(),
            )));
        }
        for (name, value) in [
            ("coordinator_ready_secs", self.coordinator_ready_secs),
            ("chunk_ready_secs", self.chunk_ready_secs),
            ("scenario_secs", self.scenario_secs),
        ] {
            if value == 0 {
                return Err(Error::Config(ConfigError::Message(format!(
                    "{name} must be at least 1"
                ))));
            }
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn coordinator_ready_timeout(&self) -> Duration {
        Duration::from_secs(self.coordinator_ready_secs)
    }

    pub fn chunk_ready_timeout(&self) -> Duration {
        Duration::from_secs(self.chunk_ready_secs)
    }

    pub fn scenario_timeout(&self) -> Duration {
        Duration::from_secs(self.scenario_secs)
    }
}

fn default_log_file() -> PathBuf {
    PathBuf::from("/var/log/syslog")
}
fn default_poll_interval_ms() -> u64 {
    100
}
fn default_coordinator_ready_secs() -> u64 {
    60
}
fn default_chunk_ready_secs() -> u64 {
    30
}
fn default_scenario_secs() -> u64 {
    180
}
