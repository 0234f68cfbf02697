use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;
use tracing::warn;

use super::ContainerRuntime;
use super::InspectField;
use super::RunSpec;
use crate::config::RuntimeConfig;
use crate::LifecycleError;
use crate::Result;

/// [`ContainerRuntime`] backed by the docker CLI.
///
/// Shells out for every operation; the daemon acknowledges detached runs and
/// execs immediately, so no invocation here blocks on in-container work.
pub struct DockerRuntime {
    docker_bin: String,
    nsenter_bin: String,
}

impl DockerRuntime {
    pub fn new(config: &RuntimeConfig) -> Self {
        Self {
            docker_bin: config.docker_bin.clone(),
            nsenter_bin: config.nsenter_bin.clone(),
        }
    }

    pub(crate) fn run_args(spec: &RunSpec) -> Vec<String> {
        let mut args = vec!["run".to_string(), "--detach=true".to_string()];
        for mount in &spec.mounts {
            args.push("-v".to_string());
            args.push(mount.clone());
        }
        if spec.privileged {
            args.push("--privileged".to_string());
        }
        args.push(format!("--name={}", spec.name));
        args.extend(spec.extra_args.iter().cloned());
        args.push(spec.image.clone());
        args.extend(spec.cmd.iter().cloned());
        args
    }

    pub(crate) fn exec_args(
        name: &str,
        argv: &[String],
        detached: bool,
    ) -> Vec<String> {
        let mut args = vec!["exec".to_string()];
        if detached {
            args.push("-d".to_string());
        }
        args.push(name.to_string());
        args.extend(argv.iter().cloned());
        args
    }

    pub(crate) fn nsenter_args(
        pid: u32,
        argv: &[String],
    ) -> Vec<String> {
        let mut args = vec![
            "--target".to_string(),
            pid.to_string(),
            "--mount".to_string(),
            "--uts".to_string(),
            "--ipc".to_string(),
            "--pid".to_string(),
            "--net".to_string(),
            "--".to_string(),
        ];
        args.extend(argv.iter().cloned());
        args
    }

    pub(crate) fn inspect_args(
        name: &str,
        field: InspectField,
    ) -> Vec<String> {
        vec![
            "inspect".to_string(),
            "--format".to_string(),
            field.template().to_string(),
            name.to_string(),
        ]
    }

    async fn run_checked(
        &self,
        op: &'static str,
        node: &str,
        program: &str,
        args: &[String],
    ) -> Result<std::process::Output> {
        debug!(node, ?args, "runtime command `{op}`");
        let output = Command::new(program)
            .args(args)
            .output()
            .await
            .map_err(|e| LifecycleError::CommandSpawn { op, source: e })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(node, %stderr, "runtime command `{op}` failed");
            return Err(LifecycleError::CommandFailed {
                node: node.to_string(),
                op,
                status: output.status.to_string(),
            }
            .into());
        }
        Ok(output)
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn create_and_run(
        &self,
        spec: RunSpec,
    ) -> Result<()> {
        let args = Self::run_args(&spec);
        self.run_checked("run", &spec.name, &self.docker_bin, &args).await?;
        Ok(())
    }

    async fn stop(
        &self,
        name: &str,
    ) -> Result<()> {
        let args = vec!["stop".to_string(), name.to_string()];
        self.run_checked("stop", name, &self.docker_bin, &args).await?;
        Ok(())
    }

    async fn resume(
        &self,
        name: &str,
    ) -> Result<()> {
        let args = vec!["start".to_string(), name.to_string()];
        self.run_checked("start", name, &self.docker_bin, &args).await?;
        Ok(())
    }

    async fn remove(
        &self,
        name: &str,
        force: bool,
    ) -> Result<()> {
        let mut args = vec!["rm".to_string()];
        if force {
            args.push("-f".to_string());
        }
        args.push(name.to_string());
        self.run_checked("rm", name, &self.docker_bin, &args).await?;
        Ok(())
    }

    async fn inspect(
        &self,
        name: &str,
        field: InspectField,
    ) -> Result<String> {
        let args = Self::inspect_args(name, field);
        let output = self.run_checked("inspect", name, &self.docker_bin, &args).await?;
        let value = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if value.is_empty() {
            return Err(LifecycleError::InspectParse {
                node: name.to_string(),
                field: field.name(),
                value,
            }
            .into());
        }
        Ok(value)
    }

    async fn exec(
        &self,
        name: &str,
        argv: &[String],
        detached: bool,
    ) -> Result<()> {
        let args = Self::exec_args(name, argv, detached);
        self.run_checked("exec", name, &self.docker_bin, &args).await?;
        Ok(())
    }

    async fn namespace_exec(
        &self,
        pid: u32,
        argv: &[String],
    ) -> Result<()> {
        let args = Self::nsenter_args(pid, argv);
        self.run_checked("nsenter", &format!("pid-{pid}"), &self.nsenter_bin, &args)
            .await?;
        Ok(())
    }
}
