use std::time::Duration;

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Graph-store query endpoint on the coordinator.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StoreConfig {
    /// Query endpoint URL
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Per-request deadline (unit: seconds)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl StoreConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.endpoint.starts_with("http://") && !self.endpoint.starts_with("https://") {
            return Err(Error::Config(ConfigError::Message(format!(
                "endpoint must be an http(s) URL, got {:?}",
                self.endpoint
            ))));
        }
        if self.request_timeout_secs == 0 {
            return Err(Error::Config(ConfigError::Message(
                "request_timeout_secs must be at least 1".into(),
            )));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn default_endpoint() -> String {
    "http://127.0.0.1:7474/db/neo4j/tx/commit".to_string()
}
fn default_request_timeout_secs() -> u64 {
    10
}
