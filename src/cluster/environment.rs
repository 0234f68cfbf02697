use std::sync::Arc;

use rand::seq::SliceRandom;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::config::ClusterConfig;
use crate::config::HarnessConfig;
use crate::node::Node;
use crate::node::NodeRegistry;
use crate::scenario::patterns;
use crate::utils::async_task::task_with_timeout_and_exponential_backoff;
use crate::watch::WatchFactory;
use crate::Error;
use crate::ProvisionError;
use crate::Result;
use crate::VerifyError;

/// The provisioned fleet: one coordinator plus the ordered agent list.
///
/// Construction is the provisioning run itself; an environment that exists
/// has already passed the coordinator readiness check and every chunk
/// barrier. Teardown is explicit, never driven by drop.
pub struct ClusterEnvironment {
    pub(crate) registry: Arc<NodeRegistry>,
    pub(crate) config: Arc<HarnessConfig>,
    pub(crate) coordinator: Arc<Node>,
    pub(crate) agents: Vec<Arc<Node>>,
}

impl ClusterEnvironment {
    /// Brings up one coordinator and `agent_count` agents in readiness-gated
    /// chunks. The watcher is armed before each triggering spawn; chunk k+1
    /// never spawns before chunk k has fully reported in.
    pub async fn provision(
        agent_count: usize,
        registry: Arc<NodeRegistry>,
        watch_factory: Arc<dyn WatchFactory>,
        config: Arc<HarnessConfig>,
    ) -> Result<Self> {
        let cluster = &config.cluster;
        info!(
            agents = agent_count,
            chunk_size = cluster.chunk_size,
            "provisioning cluster"
        );

        let watch = watch_factory.new_watch();
        watch.arm().await?;
        let coordinator = Self::spawn_coordinator(&registry, &config).await?;
        watch.set_patterns(&[patterns::coordinator_ready(cluster, &coordinator.hostname())])?;
        if let Err(e) = watch.look_all(config.watch.coordinator_ready_timeout()).await {
            return Err(match e {
                Error::Verify(VerifyError::WatchTimeout { waited, unmatched }) => {
                    ProvisionError::CoordinatorNotReady { waited, unmatched }.into()
                }
                other => other,
            });
        }
        info!(
            coordinator = %coordinator.name(),
            host = %coordinator.hostname(),
            "coordinator ready"
        );

        let mut agents: Vec<Arc<Node>> = Vec::with_capacity(agent_count);
        let mut chunk_index = 0;
        while agents.len() < agent_count {
            let members = (agent_count - agents.len()).min(cluster.chunk_size);
            let chunk_watch = watch_factory.new_watch();
            chunk_watch.arm().await?;

            let mut expected = Vec::with_capacity(members * 3);
            for _ in 0..members {
                let agent =
                    Self::spawn_agent(&registry, &config, &coordinator.ip_address()).await?;
                expected.extend(patterns::agent_ready(
                    cluster,
                    &coordinator.hostname(),
                    &agent.hostname(),
                    &agent.ip_address(),
                ));
                agents.push(agent);
            }
            chunk_watch.set_patterns(&expected)?;
            if let Err(e) = chunk_watch.look_all(config.watch.chunk_ready_timeout()).await {
                return Err(match e {
                    Error::Verify(VerifyError::WatchTimeout { waited, unmatched }) => {
                        ProvisionError::ChunkNotReady {
                            chunk: chunk_index,
                            waited,
                            unmatched,
                        }
                        .into()
                    }
                    other => other,
                });
            }
            info!(chunk = chunk_index, members, "agent chunk ready");
            chunk_index += 1;
        }

        Ok(Self {
            registry,
            config,
            coordinator,
            agents,
        })
    }

    pub fn coordinator(&self) -> &Arc<Node> {
        &self.coordinator
    }

    pub fn agents(&self) -> &[Arc<Node>] {
        &self.agents
    }

    pub fn registry(&self) -> &Arc<NodeRegistry> {
        &self.registry
    }

    /// Stops the whole fleet, agents first, coordinator last.
    pub async fn stop(&self) -> Result<()> {
        for agent in &self.agents {
            agent.stop().await?;
        }
        self.coordinator.stop().await?;
        Ok(())
    }

    /// Stops everything, then destroys and deregisters every node when the
    /// cleanup policy says so.
    pub async fn teardown(&self) -> Result<()> {
        self.stop().await?;
        if !self.config.cluster.destroy_on_cleanup {
            info!("cleanup policy keeps containers; fleet left stopped");
            return Ok(());
        }
        for agent in &self.agents {
            agent.destroy().await?;
            self.registry.remove(agent.name());
            agent.mark_destroyed();
        }
        self.coordinator.destroy().await?;
        self.registry.remove(self.coordinator.name());
        self.coordinator.mark_destroyed();
        info!("fleet destroyed");
        Ok(())
    }

    /// Spawns one node under the bounded retry policy, then applies the
    /// setup every node gets: in-node core directory, log forwarding to the
    /// control host, and the log-shipping service.
    async fn spawn_system(
        registry: &NodeRegistry,
        config: &HarnessConfig,
        kind: &str,
        image: &str,
        debug: u8,
    ) -> Result<Arc<Node>> {
        let policy = config.retry.spawn;
        let node = task_with_timeout_and_exponential_backoff(
            || async {
                let node = registry.new_node(kind, image, keep_alive_cmd(), debug)?;
                if let Err(e) = node.start().await {
                    warn!(node = %node.name(), error = %e, "spawn failed, destroying and retrying");
                    if let Err(destroy_err) = node.destroy().await {
                        warn!(node = %node.name(), error = %destroy_err, "cleanup of failed spawn also failed");
                    }
                    registry.remove(node.name());
                    return Err(e);
                }
                Ok(node)
            },
            policy,
        )
        .await
        .map_err(|e| {
            error!(kind, image, error = %e, "spawn retries exhausted");
            Error::Provision(ProvisionError::SpawnRetriesExhausted {
                node: kind.to_string(),
                attempts: policy.max_retries as u32,
            })
        })?;

        let runtime = &config.runtime;
        node.run_in_node(&sh(format!("mkdir -p {}", runtime.cores_dir)), false)
            .await?;
        // Ship the node's syslog to the control host, reachable as the
        // container's default gateway.
        node.run_in_node(
            &sh(format!(
                "PARENT=$(/sbin/route | grep '^default' | cut -c17-32); PARENT=$(echo $PARENT); \
                 echo '*.*   @@'\"${{PARENT}}:514\" > {}/99-remote.conf",
                runtime.syslog_conf_dir
            )),
            false,
        )
        .await?;
        node.start_service(&config.cluster.log_service, false).await?;
        Ok(node)
    }

    /// Coordinator bring-up: graph store first, then the coordinator
    /// service, then the agent service the coordinator itself hosts.
    async fn spawn_coordinator(
        registry: &NodeRegistry,
        config: &HarnessConfig,
    ) -> Result<Arc<Node>> {
        let cluster = &config.cluster;
        let node = Self::spawn_system(
            registry,
            config,
            "coordinator",
            &cluster.coordinator_image,
            cluster.coordinator_debug,
        )
        .await?;

        let store = &cluster.store_service;
        // The store must answer beyond localhost or verification queries
        // from the control host cannot reach it.
        node.run_in_node(
            &sh(format!(
                "echo 'dbms.default_listen_address=0.0.0.0' >> /etc/{store}/{store}.conf"
            )),
            false,
        )
        .await?;
        // Key material left over from an earlier run breaks agent
        // registration against the fresh store.
        node.run_in_node(
            &sh(format!(
                "rm -f /var/lib/{}/keys/*.secret",
                cluster.coordinator_service
            )),
            false,
        )
        .await?;
        node.start_service(store, false).await?;

        let key = defaults_key(&cluster.coordinator_service);
        Self::write_service_defaults(&node, &cluster.coordinator_service, &[
            format!("{key}_DEBUG={}", cluster.coordinator_debug),
            format!("{key}_CORELIMIT=unlimited"),
        ])
        .await?;
        node.start_service(&cluster.coordinator_service, false).await?;

        // The coordinator hosts an agent of its own, flagged dynamic.
        let lines = agent_defaults_lines(cluster, true, &node.ip_address());
        Self::write_service_defaults(&node, &cluster.agent_service, &lines).await?;
        node.start_service(&cluster.agent_service, false).await?;
        Ok(node)
    }

    async fn spawn_agent(
        registry: &NodeRegistry,
        config: &HarnessConfig,
        coordinator_ip: &str,
    ) -> Result<Arc<Node>> {
        let cluster = &config.cluster;
        let image = {
            let mut rng = rand::thread_rng();
            cluster.agent_images.choose(&mut rng).cloned()
        }
        .ok_or_else(|| ProvisionError::InvalidFleet("agent image pool is empty".to_string()))?;

        let node =
            Self::spawn_system(registry, config, "agent", &image, cluster.agent_debug).await?;
        let lines = agent_defaults_lines(cluster, false, coordinator_ip);
        Self::write_service_defaults(&node, &cluster.agent_service, &lines).await?;
        node.start_service(&cluster.agent_service, false).await?;
        Ok(node)
    }

    async fn write_service_defaults(
        node: &Node,
        service: &str,
        lines: &[String],
    ) -> Result<()> {
        let file = node.config().runtime.defaults_file(service);
        for line in lines {
            node.run_in_node(&sh(format!("echo '{line}' >>{file}")), false)
                .await?;
        }
        Ok(())
    }
}

/// Stand-in init process: reaps children forever so the container stays up
/// until the harness stops it.
fn keep_alive_cmd() -> Vec<String> {
    ["/bin/bash", "-c", "while sleep 10; do wait -n; done"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn sh(script: String) -> Vec<String> {
    vec!["/bin/bash".to_string(), "-c".to_string(), script]
}

/// Service-defaults variable prefix derived from the service name.
pub(crate) fn defaults_key(service: &str) -> String {
    service.replace('-', "_").to_uppercase()
}

/// Defaults written for an agent service: the dynamic flag distinguishes the
/// agent the coordinator hosts from fleet agents.
pub(crate) fn agent_defaults_lines(
    cluster: &ClusterConfig,
    dynamic: bool,
    coordinator_ip: &str,
) -> Vec<String> {
    let key = defaults_key(&cluster.agent_service);
    vec![
        format!("{key}_DYNAMIC={}", u8::from(dynamic)),
        format!("{key}_DEBUG={}", cluster.agent_debug),
        format!("{key}_CORELIMIT=unlimited"),
        format!(
            "{key}_COORDADDR={coordinator_ip}:{}",
            cluster.coordinator_port
        ),
    ]
}
