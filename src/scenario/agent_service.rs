//! Scenarios that stop, start, flip, and restart one agent's product
//! service.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::sleep;
use tracing::info;

use crate::node::Node;
use crate::node::NodeStatus;
use crate::scenario::check::verify_outcome;
use crate::scenario::check::CheckArgs;
use crate::scenario::patterns;
use crate::scenario::Scenario;
use crate::scenario::ScenarioContext;
use crate::scenario::ScenarioResult;
use crate::store::QueryContext;
use crate::Result;

/// Agent record in the graph after a clean service stop.
pub(crate) const AGENT_DEAD_QUERY: &str = r#"MATCH (agent:Agent {designation: "{node.hostname}"}) WHERE agent.status = "dead" AND agent.reason = "graceful-shutdown" RETURN agent"#;

/// Agent record in the graph once its service is serving again.
pub(crate) const AGENT_UP_QUERY: &str = r#"MATCH (agent:Agent {designation: "{node.hostname}"}) WHERE agent.status = "up" RETURN agent"#;

/// Stops the product service on one running agent and verifies the
/// coordinator records a graceful shutdown.
pub struct StopAgentService;

#[async_trait]
impl Scenario for StopAgentService {
    fn kind(&self) -> &'static str {
        "StopAgentService"
    }

    async fn run(
        &self,
        ctx: &ScenarioContext,
        node: Option<Arc<Node>>,
    ) -> Result<ScenarioResult> {
        let service = ctx.config.cluster.agent_service.clone();
        let node = match node
            .or_else(|| ctx.cluster.select_agents_running(&service, 1).pop())
        {
            Some(node) => node,
            None => return Ok(ctx.stats.record(self.kind(), ScenarioResult::Skipped)),
        };
        if node.status() != NodeStatus::Running || !node.has_service(&service) {
            return Ok(ctx.stats.record(self.kind(), ScenarioResult::Skipped));
        }
        info!(scenario = self.kind(), node = %node.name(), "stopping agent service");

        let coordinator = ctx.cluster.coordinator();
        let watch = ctx
            .armed_watch(&[patterns::graceful_shutdown(
                &ctx.config.cluster,
                &coordinator.hostname(),
                &node.hostname(),
                &node.ip_address(),
            )])
            .await?;
        node.stop_service(&service, false).await?;

        let result = verify_outcome(
            ctx.store.as_ref(),
            CheckArgs {
                watch: watch.as_ref(),
                timeout: ctx.config.watch.scenario_timeout(),
                all_patterns: false,
                template: AGENT_DEAD_QUERY,
                context: QueryContext::new().set("node.hostname", node.hostname()),
                validator: None,
                min_rows: 1,
                max_rows: 1,
            },
        )
        .await?;
        Ok(ctx.stats.record(self.kind(), result))
    }
}

/// Starts the product service on one agent that does not have it and
/// verifies the agent re-registers and reads back as up.
pub struct StartAgentService;

#[async_trait]
impl Scenario for StartAgentService {
    fn kind(&self) -> &'static str {
        "StartAgentService"
    }

    async fn run(
        &self,
        ctx: &ScenarioContext,
        node: Option<Arc<Node>>,
    ) -> Result<ScenarioResult> {
        let service = ctx.config.cluster.agent_service.clone();
        let node = match node
            .or_else(|| ctx.cluster.select_agents_not_running(&service, 1).pop())
        {
            Some(node) => node,
            None => return Ok(ctx.stats.record(self.kind(), ScenarioResult::Skipped)),
        };
        if node.status() != NodeStatus::Running || node.has_service(&service) {
            return Ok(ctx.stats.record(self.kind(), ScenarioResult::Skipped));
        }
        info!(scenario = self.kind(), node = %node.name(), "starting agent service");

        let coordinator = ctx.cluster.coordinator();
        let watch = ctx
            .armed_watch(&[patterns::agent_registered(
                &ctx.config.cluster,
                &coordinator.hostname(),
                &node.hostname(),
                &node.ip_address(),
            )])
            .await?;
        node.start_service(&service, false).await?;

        let result = verify_outcome(
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
        Ok(ctx.stats.record(self.kind(), result))
    }
}

/// Toggles the product service on one agent: stop when present, start when
/// absent. The delegate scenario does the work and the verdict lands in the
/// delegate's tally; flip itself only records when nothing was eligible.
pub struct FlipAgentService;

#[async_trait]
impl Scenario for FlipAgentService {
    fn kind(&self) -> &'static str {
        "FlipAgentService"
    }

    async fn run(
        &self,
        ctx: &ScenarioContext,
        node: Option<Arc<Node>>,
    ) -> Result<ScenarioResult> {
        let service = ctx.config.cluster.agent_service.clone();
        let node = match node.or_else(|| ctx.cluster.select_up_agents(1).pop()) {
            Some(node) => node,
            None => return Ok(ctx.stats.record(self.kind(), ScenarioResult::Skipped)),
        };
        if node.has_service(&service) {
            StopAgentService.run(ctx, Some(node)).await
        } else {
            StartAgentService.run(ctx, Some(node)).await
        }
    }
}

/// Stops then restarts the product service on one agent, with an optional
/// pause between the phases. The start phase only runs once the stop phase
/// verified cleanly.
pub struct RestartAgentService {
    stop: Arc<dyn Scenario>,
    start: Arc<dyn Scenario>,
    delay: Duration,
}

impl RestartAgentService {
    pub fn new(delay: Duration) -> Self {
        Self {
            stop: Arc::new(StopAgentService),
            start: Arc::new(StartAgentService),
            delay,
        }
    }

    #[cfg(test)]
    pub(crate) fn with_parts(
        stop: Arc<dyn Scenario>,
        start: Arc<dyn Scenario>,
        delay: Duration,
    ) -> Self {
        Self { stop, start, delay }
    }
}

#[async_trait]
impl Scenario for RestartAgentService {
    fn kind(&self) -> &'static str {
        "RestartAgentService"
    }

    async fn run(
        &self,
        ctx: &ScenarioContext,
        node: Option<Arc<Node>>,
    ) -> Result<ScenarioResult> {
        let service = ctx.config.cluster.agent_service.clone();
        let node = match node
            .or_else(|| ctx.cluster.select_agents_running(&service, 1).pop())
        {
            Some(node) => node,
            None => return Ok(ctx.stats.record(self.kind(), ScenarioResult::Skipped)),
        };
        info!(scenario = self.kind(), node = %node.name(), "restarting agent service");

        let stopped = self.stop.run(ctx, Some(node.clone())).await?;
        if stopped != ScenarioResult::Success {
            return Ok(ctx.stats.record(self.kind(), stopped));
        }
        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }
        let started = self.start.run(ctx, Some(node)).await?;
        Ok(ctx.stats.record(self.kind(), started))
    }
}
