//! One container-backed test system and its lifecycle.
//!
//! A [`Node`] is shared as `Arc<Node>` between the registry, the cluster
//! environment and running scenarios; all mutable state sits behind an
//! internal lock so every operation takes `&self`. The lock is never held
//! across an await point.

use std::collections::HashSet;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::time::sleep;
use tracing::debug;
use tracing::info;

use crate::config::ExecStrategy;
use crate::config::HarnessConfig;
use crate::runtime::ContainerRuntime;
use crate::runtime::InspectField;
use crate::runtime::RunSpec;
use crate::LifecycleError;
use crate::Result;

/// Every node gets the kernel's entropy pool in place of /dev/random so
/// in-node key generation cannot stall the whole fleet.
pub const RANDOM_DEVICE_MOUNT: &str = "/dev/urandom:/dev/random";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeStatus {
    /// No container resources exist for this node
    Uninitialized,
    Running,
    Stopped,
    /// Terminal state set by registry teardown, never by `destroy()`
    Destroyed,
}

impl NodeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeStatus::Uninitialized => "uninitialized",
            NodeStatus::Running => "running",
            NodeStatus::Stopped => "stopped",
            NodeStatus::Destroyed => "destroyed",
        }
    }
}

struct NodeState {
    status: NodeStatus,
    pid: Option<u32>,
    hostname: String,
    ip_address: String,
    running_services: HashSet<String>,
    debug_level: u8,
}

pub struct Node {
    name: String,
    image: String,
    cmd: Vec<String>,
    scratch_file: PathBuf,
    runtime: Arc<dyn ContainerRuntime>,
    config: Arc<HarnessConfig>,
    state: RwLock<NodeState>,
}

impl Node {
    /// Nodes are only created through
    /// [`NodeRegistry::new_node`](super::NodeRegistry::new_node), which owns
    /// naming and scratch allocation.
    pub(crate) fn new(
        name: String,
        image: String,
        cmd: Vec<String>,
        debug_level: u8,
        scratch_file: PathBuf,
        runtime: Arc<dyn ContainerRuntime>,
        config: Arc<HarnessConfig>,
    ) -> Self {
        Self {
            name,
            image,
            cmd,
            scratch_file,
            runtime,
            config,
            state: RwLock::new(NodeState {
                status: NodeStatus::Uninitialized,
                pid: None,
                hostname: "unknown".to_string(),
                ip_address: "unknown".to_string(),
                running_services: HashSet::new(),
                debug_level,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn image(&self) -> &str {
        &self.image
    }

    pub fn status(&self) -> NodeStatus {
        self.state.read().status
    }

    pub fn pid(&self) -> Option<u32> {
        self.state.read().pid
    }

    pub fn hostname(&self) -> String {
        self.state.read().hostname.clone()
    }

    pub fn ip_address(&self) -> String {
        self.state.read().ip_address.clone()
    }

    pub fn debug_level(&self) -> u8 {
        self.state.read().debug_level
    }

    pub fn set_debug_level(
        &self,
        level: u8,
    ) {
        self.state.write().debug_level = level;
    }

    /// Per-node file inside the registry's shared scratch directory.
    pub fn scratch_file(&self) -> &Path {
        &self.scratch_file
    }

    /// Services the harness has started and not yet stopped on this node,
    /// sorted for stable output.
    pub fn running_services(&self) -> Vec<String> {
        let mut services: Vec<String> =
            self.state.read().running_services.iter().cloned().collect();
        services.sort();
        services
    }

    pub fn has_service(
        &self,
        service: &str,
    ) -> bool {
        self.state.read().running_services.contains(service)
    }

    pub(crate) fn track_service(
        &self,
        service: &str,
    ) -> bool {
        self.state.write().running_services.insert(service.to_string())
    }

    pub(crate) fn untrack_service(
        &self,
        service: &str,
    ) -> bool {
        self.state.write().running_services.remove(service)
    }

    pub(crate) fn mark_destroyed(&self) {
        let mut state = self.state.write();
        state.status = NodeStatus::Destroyed;
        state.pid = None;
    }

    /// Brings the node up.
    ///
    /// - Uninitialized: create the container, discover identity, acquire pid
    /// - Stopped: resume the container; identity is assumed stable and the
    ///   pid stays unknown
    /// - Running: stop, resume, and re-acquire a fresh pid (restart;
    ///   idempotent in end-state but not side-effect-free)
    pub async fn start(&self) -> Result<()> {
        let restarting = self.status() == NodeStatus::Running;
        if restarting {
            self.stop().await?;
        }
        match self.status() {
            NodeStatus::Uninitialized | NodeStatus::Destroyed => self.cold_start().await,
            NodeStatus::Stopped => {
                self.resume().await?;
                if restarting {
                    self.acquire_pid().await?;
                }
                Ok(())
            }
            NodeStatus::Running => Ok(()),
        }
    }

    async fn cold_start(&self) -> Result<()> {
        let spec = RunSpec {
            name: self.name.clone(),
            image: self.image.clone(),
            mounts: vec![RANDOM_DEVICE_MOUNT.to_string()],
            privileged: true,
            extra_args: self.config.runtime.extra_run_args.clone(),
            cmd: self.cmd.clone(),
        };
        self.runtime.create_and_run(spec).await?;
        self.state.write().status = NodeStatus::Running;

        let hostname = self.runtime.inspect(&self.name, InspectField::Hostname).await?;
        let ip_address = self.runtime.inspect(&self.name, InspectField::IpAddress).await?;
        {
            let mut state = self.state.write();
            state.hostname = hostname.clone();
            state.ip_address = ip_address.clone();
        }
        let pid = self.acquire_pid().await?;
        info!(node = %self.name, %hostname, %ip_address, pid, "node started");
        Ok(())
    }

    async fn resume(&self) -> Result<()> {
        self.runtime.resume(&self.name).await?;
        self.state.write().status = NodeStatus::Running;
        info!(node = %self.name, "node resumed");
        Ok(())
    }

    /// Polls the runtime until the container reports a positive pid.
    async fn acquire_pid(&self) -> Result<u32> {
        let policy = self.config.retry.pid;
        for _ in 0..policy.attempts {
            let value = self.runtime.inspect(&self.name, InspectField::Pid).await?;
            let pid: i64 = value.parse().map_err(|_| LifecycleError::InspectParse {
                node: self.name.clone(),
                field: "pid",
                value: value.clone(),
            })?;
            if pid > 0 {
                let pid = pid as u32;
                self.state.write().pid = Some(pid);
                return Ok(pid);
            }
            debug!(node = %self.name, %value, "pid not positive yet");
            sleep(Duration::from_millis(policy.interval_ms)).await;
        }
        Err(LifecycleError::PidNeverPositive {
            node: self.name.clone(),
            attempts: policy.attempts,
        }
        .into())
    }

    /// Stops the container. No-op unless the node is running.
    pub async fn stop(&self) -> Result<()> {
        if self.status() != NodeStatus::Running {
            return Ok(());
        }
        let services = self.running_services();
        info!(node = %self.name, ?services, "stopping node; tracked services");
        self.runtime.stop(&self.name).await?;
        let mut state = self.state.write();
        state.status = NodeStatus::Stopped;
        state.pid = None;
        Ok(())
    }

    /// Force-removes the container regardless of status. The node object
    /// returns to Uninitialized and may be started again from scratch.
    pub async fn destroy(&self) -> Result<()> {
        if self.status() == NodeStatus::Running {
            let services = self.running_services();
            info!(node = %self.name, ?services, "destroying running node; tracked services");
        }
        self.runtime.remove(&self.name, true).await?;
        let mut state = self.state.write();
        state.status = NodeStatus::Uninitialized;
        state.pid = None;
        Ok(())
    }

    /// Executes a command inside the running node.
    ///
    /// Under the namespace strategy a detached command is wrapped in a
    /// backgrounding shell; under runtime exec the runtime detaches itself.
    /// Callers must not rely on output of detached executions.
    pub async fn run_in_node(
        &self,
        argv: &[String],
        detached: bool,
    ) -> Result<()> {
        let (status, pid) = {
            let state = self.state.read();
            (state.status, state.pid)
        };
        if status != NodeStatus::Running {
            return Err(LifecycleError::NotRunning {
                node: self.name.clone(),
                op: "run_in_node",
                status: status.as_str(),
            }
            .into());
        }

        match self.config.runtime.exec_strategy {
            ExecStrategy::RuntimeExec => self.runtime.exec(&self.name, argv, detached).await,
            ExecStrategy::Namespace => {
                // Resumed nodes carry no pid; see `start()`
                let pid = pid.ok_or_else(|| LifecycleError::PidUnknown {
                    node: self.name.clone(),
                    op: "run_in_node",
                })?;
                if detached {
                    let wrapped = vec![
                        "/bin/sh".to_string(),
                        "-c".to_string(),
                        format!("{} &", argv.join(" ")),
                    ];
                    self.runtime.namespace_exec(pid, &wrapped).await
                } else {
                    self.runtime.namespace_exec(pid, argv).await
                }
            }
        }
    }

    pub(crate) fn config(&self) -> &HarnessConfig {
        &self.config
    }
}

impl std::fmt::Debug for Node {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("Node")
            .field("name", &self.name)
            .field("image", &self.image)
            .field("status", &state.status)
            .field("pid", &state.pid)
            .field("hostname", &state.hostname)
            .finish()
    }
}
