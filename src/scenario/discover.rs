//! Scenario covering discovery of a newly started service on an agent.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;
use tracing::warn;

use crate::node::Node;
use crate::node::NodeStatus;
use crate::scenario::agent_service::AGENT_UP_QUERY;
use crate::scenario::check::verify_outcome;
use crate::scenario::check::CheckArgs;
use crate::scenario::patterns;
use crate::scenario::Scenario;
use crate::scenario::ScenarioContext;
use crate::scenario::ScenarioResult;
use crate::store::QueryContext;
use crate::Result;

/// Starts a service the harness does not normally manage on one agent and
/// verifies the coordinator discovers it and begins monitoring it.
///
/// The agent's product service is bounced around the new service's start so
/// the next discovery cycle reports the fresh state immediately instead of
/// waiting for the periodic sweep.
pub struct DiscoverNewService;

#[async_trait]
impl Scenario for DiscoverNewService {
    fn kind(&self) -> &'static str {
        "DiscoverNewService"
    }

    async fn run(
        &self,
        ctx: &ScenarioContext,
        node: Option<Arc<Node>>,
    ) -> Result<ScenarioResult> {
        let target = ctx.config.cluster.discover_service.clone();
        let agent_service = ctx.config.cluster.agent_service.clone();
        let node = match node
            .or_else(|| ctx.cluster.select_agents_not_running(&target, 1).pop())
        {
            Some(node) => node,
            None => return Ok(ctx.stats.record(self.kind(), ScenarioResult::Skipped)),
        };
        if node.status() != NodeStatus::Running || node.has_service(&target) {
            return Ok(ctx.stats.record(self.kind(), ScenarioResult::Skipped));
        }
        info!(
            scenario = self.kind(),
            node = %node.name(),
            service = %target,
            "introducing a new service for discovery"
        );

        let coordinator = ctx.cluster.coordinator();
        let cluster_config = &ctx.config.cluster;
        let registered = patterns::agent_registered(
            cluster_config,
            &coordinator.hostname(),
            &node.hostname(),
            &node.ip_address(),
        );

        // The discovery cycle belongs to the product service; make sure the
        // agent carries it before injecting the new service.
        if !node.has_service(&agent_service) {
            let watch = ctx.armed_watch(std::slice::from_ref(&registered)).await?;
            node.start_service(&agent_service, false).await?;
            if watch
                .look_one(ctx.config.watch.scenario_timeout())
                .await?
                .is_none()
            {
                warn!(node = %node.name(), "agent never registered; cannot drive discovery");
                return Ok(ctx.stats.record(self.kind(), ScenarioResult::Fail));
            }
        }
        node.stop_service(&agent_service, false).await?;

        let watch = ctx
            .armed_watch(&[
                registered,
                patterns::monitoring_activated(
                    cluster_config,
                    &coordinator.hostname(),
                    &node.hostname(),
                    &target,
                ),
                patterns::service_operational(cluster_config, &node.hostname(), &target),
            ])
            .await?;
        node.start_service(&target, false).await?;
        node.start_service(&agent_service, false).await?;

        let result = verify_outcome(
            ctx.store.as_ref(),
            CheckArgs {
                watch: watch.as_ref(),
                timeout: ctx.config.watch.scenario_timeout(),
                all_patterns: true,
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
