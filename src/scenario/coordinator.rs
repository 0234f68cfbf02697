//! Scenarios that bounce the coordinator's product service, alone or
//! together with an agent.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::sleep;
use tracing::info;

use crate::node::Node;
use crate::node::NodeStatus;
use crate::scenario::agent_service::AGENT_DEAD_QUERY;
use crate::scenario::agent_service::AGENT_UP_QUERY;
use crate::scenario::check::verify_outcome;
use crate::scenario::check::CheckArgs;
use crate::scenario::patterns;
use crate::scenario::RestartAgentService;
use crate::scenario::Scenario;
use crate::scenario::ScenarioContext;
use crate::scenario::ScenarioResult;
use crate::store::QueryContext;
use crate::Result;

/// Answerability probe after a coordinator bounce; any single row will do.
const COORDINATOR_PROBE_QUERY: &str = "RETURN 1";

/// Stops and restarts the coordinator's product service, then verifies it
/// announces readiness and answers a query.
pub struct RestartCoordinator {
    delay: Duration,
}

impl RestartCoordinator {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl Scenario for RestartCoordinator {
    fn kind(&self) -> &'static str {
        "RestartCoordinator"
    }

    async fn run(
        &self,
        ctx: &ScenarioContext,
        _node: Option<Arc<Node>>,
    ) -> Result<ScenarioResult> {
        let coordinator = ctx.cluster.coordinator().clone();
        if coordinator.status() != NodeStatus::Running {
            return Ok(ctx.stats.record(self.kind(), ScenarioResult::Skipped));
        }
        let service = ctx.config.cluster.coordinator_service.clone();
        info!(scenario = self.kind(), node = %coordinator.name(), "restarting coordinator service");

        coordinator.stop_service(&service, false).await?;
        let watch = ctx
            .armed_watch(&[patterns::coordinator_ready(
                &ctx.config.cluster,
                &coordinator.hostname(),
            )])
            .await?;
        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }
        coordinator.start_service(&service, false).await?;

        let result = verify_outcome(
            ctx.store.as_ref(),
            CheckArgs {
                watch: watch.as_ref(),
                timeout: ctx.config.watch.scenario_timeout(),
                all_patterns: false,
                template: COORDINATOR_PROBE_QUERY,
                context: QueryContext::new(),
                validator: None,
                min_rows: 1,
                max_rows: 1,
            },
        )
        .await?;
        Ok(ctx.stats.record(self.kind(), result))
    }
}

/// Coordinator restart followed by an agent-service restart, in that order.
/// The agent phase only runs once the coordinator phase verified cleanly.
pub struct RestartCoordinatorAndAgent {
    coordinator: Arc<dyn Scenario>,
    agent: Arc<dyn Scenario>,
}

impl RestartCoordinatorAndAgent {
    pub fn new(delay: Duration) -> Self {
        Self {
            coordinator: Arc::new(RestartCoordinator::new(delay)),
            agent: Arc::new(RestartAgentService::new(delay)),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_parts(
        coordinator: Arc<dyn Scenario>,
        agent: Arc<dyn Scenario>,
    ) -> Self {
        Self { coordinator, agent }
    }
}

#[async_trait]
impl Scenario for RestartCoordinatorAndAgent {
    fn kind(&self) -> &'static str {
        "RestartCoordinatorAndAgent"
    }

    async fn run(
        &self,
        ctx: &ScenarioContext,
        node: Option<Arc<Node>>,
    ) -> Result<ScenarioResult> {
        let coordinator_phase = self.coordinator.run(ctx, None).await?;
        if coordinator_phase != ScenarioResult::Success {
            return Ok(ctx.stats.record(self.kind(), coordinator_phase));
        }
        let agent_phase = self.agent.run(ctx, node).await?;
        Ok(ctx.stats.record(self.kind(), agent_phase))
    }
}

/// Stops the coordinator service and an agent's service at the same time,
/// restarts the coordinator, and verifies the agent's shutdown evidence
/// still landed; then brings the agent back and verifies recovery.
///
/// The verdict is recorded after the first phase and revised if the
/// recovery phase fails, so one run still tallies exactly once.
pub struct SimultaneousRestart;

#[async_trait]
impl Scenario for SimultaneousRestart {
    fn kind(&self) -> &'static str {
        "SimultaneousRestart"
    }

    async fn run(
        &self,
        ctx: &ScenarioContext,
        node: Option<Arc<Node>>,
    ) -> Result<ScenarioResult> {
        let agent_service = ctx.config.cluster.agent_service.clone();
        let coordinator_service = ctx.config.cluster.coordinator_service.clone();
        let node = match node
            .or_else(|| ctx.cluster.select_agents_running(&agent_service, 1).pop())
        {
            Some(node) => node,
            None => return Ok(ctx.stats.record(self.kind(), ScenarioResult::Skipped)),
        };
        if node.status() != NodeStatus::Running || !node.has_service(&agent_service) {
            return Ok(ctx.stats.record(self.kind(), ScenarioResult::Skipped));
        }
        let coordinator = ctx.cluster.coordinator().clone();
        if coordinator.status() != NodeStatus::Running {
            return Ok(ctx.stats.record(self.kind(), ScenarioResult::Skipped));
        }
        info!(
            scenario = self.kind(),
            coordinator = %coordinator.name(),
            agent = %node.name(),
            "restarting coordinator and agent services together"
        );

        let cluster_config = &ctx.config.cluster;
        let watch = ctx
            .armed_watch(&[
                patterns::graceful_shutdown(
                    cluster_config,
                    &coordinator.hostname(),
                    &node.hostname(),
                    &node.ip_address(),
                ),
                patterns::coordinator_stopping(cluster_config, &coordinator.hostname()),
                patterns::coordinator_ready(cluster_config, &coordinator.hostname()),
            ])
            .await?;
        coordinator.stop_service(&coordinator_service, false).await?;
        node.spawn_stop_service(&agent_service).await;
        coordinator.start_service(&coordinator_service, false).await?;

        let shutdown_phase = verify_outcome(
            ctx.store.as_ref(),
            CheckArgs {
                watch: watch.as_ref(),
                timeout: ctx.config.watch.scenario_timeout(),
                all_patterns: true,
                template: AGENT_DEAD_QUERY,
                context: QueryContext::new().set("node.hostname", node.hostname()),
                validator: None,
                min_rows: 1,
                max_rows: 1,
            },
        )
        .await?;
        if shutdown_phase != ScenarioResult::Success {
            return Ok(ctx.stats.record(self.kind(), shutdown_phase));
        }
        ctx.stats.record(self.kind(), ScenarioResult::Success);

        let watch = ctx
            .armed_watch(&[patterns::agent_registered(
                cluster_config,
                &coordinator.hostname(),
                &node.hostname(),
                &node.ip_address(),
            )])
            .await?;
        node.start_service(&agent_service, false).await?;

        let recovery_phase = verify_outcome(
            ctx.store.as_ref(),
            CheckArgs {
                watch: watch.as_ref(),
                timeout: ctx.config.watch.scenario_timeout(),
                all_patterns: false,
                template: AGENT_UP_QUERY,
                context: QueryContext::new().set("node.hostname", node.hostname()),
                validator: None,
                min_rows: 1,
                max_rows: 1,
            },
        )
        .await?;
        if recovery_phase == ScenarioResult::Success {
            Ok(ScenarioResult::Success)
        } else {
            Ok(ctx.stats.replace_result(self.kind(), ScenarioResult::Success, recovery_phase))
        }
    }
}
