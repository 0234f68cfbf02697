use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Fleet shape and the service names the harness manages inside nodes.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ClusterConfig {
    /// Image for the single coordinator node
    #[serde(default = "default_coordinator_image")]
    pub coordinator_image: String,

    /// Candidate images for agent nodes, chosen at random per spawn
    #[serde(default = "default_agent_images")]
    pub agent_images: Vec<String>,

    /// Agents provisioned and readiness-gated per batch
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Destroy and deregister every node during teardown
    #[serde(default = "default_destroy_on_cleanup")]
    pub destroy_on_cleanup: bool,

    /// Port agents use to reach the coordinator
    #[serde(default = "default_coordinator_port")]
    pub coordinator_port: u16,

    /// Init-script name of the coordinator service
    #[serde(default = "default_coordinator_service")]
    pub coordinator_service: String,

    /// Init-script name of the agent service
    #[serde(default = "default_agent_service")]
    pub agent_service: String,

    /// Init-script name of the graph-store service on the coordinator
    #[serde(default = "default_store_service")]
    pub store_service: String,

    /// Init-script name of the log-shipping service
    #[serde(default = "default_log_service")]
    pub log_service: String,

    /// Debug level written into the coordinator's service defaults
    #[serde(default)]
    pub coordinator_debug: u8,

    /// Debug level written into each agent's service defaults
    #[serde(default = "default_agent_debug")]
    pub agent_debug: u8,

    /// Service targeted by the discovery scenario; must not be one the
    /// harness already manages
    #[serde(default = "default_discover_service")]
    pub discover_service: String,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            coordinator_image: default_coordinator_image(),
            agent_images: default_agent_images(),
            chunk_size: default_chunk_size(),
            destroy_on_cleanup: default_destroy_on_cleanup(),
            coordinator_port: default_coordinator_port(),
            coordinator_service: default_coordinator_service(),
            agent_service: default_agent_service(),
            store_service: default_store_service(),
            log_service: default_log_service(),
            coordinator_debug: 0,
            agent_debug: default_agent_debug(),
            discover_service: default_discover_service(),
        }
    }
}

impl ClusterConfig {
    /// Validates fleet configuration consistency
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::Config(ConfigError::Message(
                "chunk_size must be at least 1".into(),
            )));
        }

        if self.coordinator_image.is_empty() {
            return Err(Error::Config(ConfigError::Message(
                "coordinator_image cannot be empty".into(),
            )));
        }

        if self.agent_images.is_empty() {
            return Err(Error::Config(ConfigError::Message(
                "agent_images must contain at least one image".into(),
            )));
        }
        if self.agent_images.iter().any(|i| i.is_empty()) {
            return Err(Error::Config(ConfigError::Message(
                "agent_images entries cannot be empty".into(),
            )));
        }

        if self.coordinator_port == 0 {
            return Err(Error::Config(ConfigError::Message(
                "coordinator_port must be non-zero".into(),
            )));
        }

        for (name, value) in [
            ("coordinator_service", &self.coordinator_service),
            ("agent_service", &self.agent_service),
            ("store_service", &self.store_service),
            ("log_service", &self.log_service),
            ("discover_service", &self.discover_service),
        ] {
            if value.is_empty() {
                return Err(Error::Config(ConfigError::Message(format!(
                    "{name} cannot be empty"
                ))));
            }
        }

        Ok(())
    }
}

fn default_coordinator_image() -> String {
    "faultrig/coordinator".to_string()
}
fn default_agent_images() -> Vec<String> {
    vec!["faultrig/agent".to_string()]
}
fn default_chunk_size() -> usize {
    20
}
fn default_destroy_on_cleanup() -> bool {
    true
}
fn default_coordinator_port() -> u16 {
    1984
}
fn default_coordinator_service() -> String {
    "coordinator".to_string()
}
fn default_agent_service() -> String {
    "agent".to_string()
}
fn default_store_service() -> String {
    "graph-store".to_string()
}
fn default_log_service() -> String {
    "rsyslog".to_string()
}
fn default_agent_debug() -> u8 {
    1
}
fn default_discover_service() -> String {
    "ssh".to_string()
}
