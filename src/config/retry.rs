use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Basic retry policy template
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default)]
pub struct BackoffPolicy {
    /// Maximum number of retries (0 means unlimited retries)
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,

    /// Single operation timeout (unit: milliseconds)
    #[serde(default = "default_op_timeout_ms")]
    pub timeout_ms: u64,

    /// Backoff base (unit: milliseconds)
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Maximum backoff time (unit: milliseconds)
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

/// Bounded polling loop for container pid acquisition
#[derive(Debug, Serialize, Deserialize, Clone, Copy)]
pub struct PidPolicy {
    /// Inspect attempts before the node is declared dead on arrival
    #[serde(default = "default_pid_attempts")]
    pub attempts: u32,

    /// Pause between attempts (unit: milliseconds)
    #[serde(default = "default_pid_interval_ms")]
    pub interval_ms: u64,
}

impl Default for PidPolicy {
    fn default() -> Self {
        Self {
            attempts: default_pid_attempts(),
            interval_ms: default_pid_interval_ms(),
        }
    }
}

/// Divide strategies by harness operation
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RetryPolicies {
    // Node spawn strategy (destroy half-built node, back off, start over)
    #[serde(default)]
    pub spawn: BackoffPolicy,

    // Pid acquisition after a detached create-and-run
    #[serde(default)]
    pub pid: PidPolicy,
}

// Default value implementation
impl Default for RetryPolicies {
    fn default() -> Self {
        Self {
            spawn: BackoffPolicy {
                max_retries: 3,
                timeout_ms: 30_000,
                base_delay_ms: 500,
                max_delay_ms: 5_000,
            },
            pid: PidPolicy::default(),
        }
    }
}

impl RetryPolicies {
    pub fn validate(&self) -> Result<()> {
        if self.spawn.base_delay_ms == 0 {
            return Err(Error::Config(ConfigError::Message(
                "spawn.base_delay_ms must be at least 1".into(),
            )));
        }
        if self.spawn.max_delay_ms < self.spawn.base_delay_ms {
            return Err(Error::Config(ConfigError::Message(
                "spawn.max_delay_ms cannot be below spawn.base_delay_ms".into(),
            )));
        }
        if self.pid.attempts == 0 {
            return Err(Error::Config(ConfigError::Message(
                "pid.attempts must be at least 1".into(),
            )));
        }
        Ok(())
    }
}

fn default_max_retries() -> usize {
    3
}
fn default_op_timeout_ms() -> u64 {
    30_000
}
fn default_base_delay_ms() -> u64 {
    500
}
fn default_max_delay_ms() -> u64 {
    5_000
}
fn default_pid_attempts() -> u32 {
    10
}
fn default_pid_interval_ms() -> u64 {
    100
}
