use std::path::PathBuf;

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// How commands are injected into a running node.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExecStrategy {
    /// Enter the container's namespaces from the host via nsenter
    Namespace,
    /// Delegate to the container runtime's own exec facility
    RuntimeExec,
}

/// Container runtime binaries and the filesystem layout expected inside nodes.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RuntimeConfig {
    /// Container runtime CLI binary
    #[serde(default = "default_docker_bin")]
    pub docker_bin: String,

    /// Namespace-entry binary on the control host
    #[serde(default = "default_nsenter_bin")]
    pub nsenter_bin: String,

    /// Strategy for `run_in_node` command injection
    #[serde(default = "default_exec_strategy")]
    pub exec_strategy: ExecStrategy,

    /// Extra arguments appended to every create-and-run invocation
    #[serde(default)]
    pub extra_run_args: Vec<String>,

    /// Init-script directory inside nodes
    #[serde(default = "default_init_dir")]
    pub init_dir: String,

    /// Service-defaults directory inside nodes
    #[serde(default = "default_defaults_dir")]
    pub defaults_dir: String,

    /// Drop-in directory for log-forwarding configuration inside nodes
    #[serde(default = "default_syslog_conf_dir")]
    pub syslog_conf_dir: String,

    /// Core-dump directory created inside every node
    #[serde(default = "default_cores_dir")]
    pub cores_dir: String,

    /// Base directory for the registry's scratch storage (system temp if unset)
    #[serde(default)]
    pub scratch_base: Option<PathBuf>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            docker_bin: default_docker_bin(),
            nsenter_bin: default_nsenter_bin(),
            exec_strategy: default_exec_strategy(),
            extra_run_args: vec![],
            init_dir: default_init_dir(),
            defaults_dir: default_defaults_dir(),
            syslog_conf_dir: default_syslog_conf_dir(),
            cores_dir: default_cores_dir(),
            scratch_base: None,
        }
    }
}

impl RuntimeConfig {
    pub fn validate(&self) -> Result<()> {
        if self.docker_bin.is_empty() {
            return Err(Error::Config(ConfigError::Message(
                "docker_bin cannot be empty".into(),
            )));
        }
        if self.nsenter_bin.is_empty() {
            return Err(Error::Config(ConfigError::Message(
                "nsenter_bin cannot be empty".into(),
            )));
        }

        for (name, value) in [
            ("init_dir", &self.init_dir),
            ("defaults_dir", &self.defaults_dir),
            ("syslog_conf_dir", &self.syslog_conf_dir),
            ("cores_dir", &self.cores_dir),
        ] {
            if !value.starts_with('/') {
                return Err(Error::Config(ConfigError::Message(format!(
                    "{name} must be an absolute in-node path, got {value:?}"
                ))));
            }
        }

        Ok(())
    }

    /// Init-script path for a managed service inside a node.
    pub fn init_script(
        &self,
        service: &str,
    ) -> String {
        format!("{}/{}", self.init_dir, service)
    }

    /// Service-defaults path for a managed service inside a node.
    pub fn defaults_file(
        &self,
        service: &str,
    ) -> String {
        format!("{}/{}", self.defaults_dir, service)
    }
}

fn default_docker_bin() -> String {
    "docker".to_string()
}
fn default_nsenter_bin() -> String {
    "nsenter".to_string()
}
fn default_exec_strategy() -> ExecStrategy {
    ExecStrategy::Namespace
}
fn default_init_dir() -> String {
    "/etc/init.d".to_string()
}
fn default_defaults_dir() -> String {
    "/etc/default".to_string()
}
fn default_syslog_conf_dir() -> String {
    "/etc/rsyslog.d".to_string()
}
fn default_cores_dir() -> String {
    "/tmp/cores".to_string()
}
