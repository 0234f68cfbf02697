//! Container runtime abstraction.
//!
//! Node lifecycle code talks to the runtime exclusively through
//! [`ContainerRuntime`], so unit tests can swap the docker CLI for a mock and
//! integration tests for a scripted fake.

mod docker;
pub use docker::*;


#[cfg(test)]
use mockall::automock;

use async_trait::async_trait;

use crate::Result;

/// Everything needed to create and run one container.
#[derive(Debug, Clone)]
pub struct RunSpec {
    /// Container name, also the node name
    pub name: String,
    pub image: String,
    /// Bind mounts as `host:container` pairs
    pub mounts: Vec<String>,
    pub privileged: bool,
    /// Extra runtime arguments inserted before the image
    pub extra_args: Vec<String>,
    /// Command executed inside the container
    pub cmd: Vec<String>,
}

/// Container attribute readable through runtime inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InspectField {
    Hostname,
    IpAddress,
    Pid,
}

impl InspectField {
    /// Go-template the docker CLI resolves the field with.
    pub(crate) fn template(&self) -> &'static str {
        match self {
            InspectField::Hostname => "{{.Config.Hostname}}",
            InspectField::IpAddress => "{{.NetworkSettings.IPAddress}}",
            InspectField::Pid => "{{.State.Pid}}",
        }
    }

    pub(crate) fn name(&self) -> &'static str {
        match self {
            InspectField::Hostname => "hostname",
            InspectField::IpAddress => "ip_address",
            InspectField::Pid => "pid",
        }
    }
}

/// Operations the harness needs from a container runtime.
///
/// Every operation maps to one runtime CLI invocation; a non-zero exit status
/// is a [`LifecycleError::CommandFailed`](crate::LifecycleError) for that call.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Create a container and start it detached.
    async fn create_and_run(
        &self,
        spec: RunSpec,
    ) -> Result<()>;

    /// Stop a running container, leaving it resumable.
    async fn stop(
        &self,
        name: &str,
    ) -> Result<()>;

    /// Resume a stopped container.
    async fn resume(
        &self,
        name: &str,
    ) -> Result<()>;

    /// Remove a container and its resources.
    async fn remove(
        &self,
        name: &str,
        force: bool,
    ) -> Result<()>;

    /// Read a single attribute of a container.
    async fn inspect(
        &self,
        name: &str,
        field: InspectField,
    ) -> Result<String>;

    /// Execute a command inside a running container via the runtime.
    async fn exec(
        &self,
        name: &str,
        argv: &[String],
        detached: bool,
    ) -> Result<()>;

    /// Execute a command inside the container's namespaces from the host.
    async fn namespace_exec(
        &self,
        pid: u32,
        argv: &[String],
    ) -> Result<()>;
}
