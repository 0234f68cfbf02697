use std::sync::Arc;

use rand::seq::SliceRandom;

use super::ClusterEnvironment;
use crate::node::Node;
use crate::node::NodeStatus;

/// Read-only selection queries over the agent fleet. All random picks are a
/// single sampling pass without replacement over a pre-filtered pool; an
/// empty pool yields an empty result.
impl ClusterEnvironment {
    pub fn up_agents(&self) -> Vec<Arc<Node>> {
        self.agents
            .iter()
            .filter(|agent| agent.status() == NodeStatus::Running)
            .cloned()
            .collect()
    }

    pub fn down_agents(&self) -> Vec<Arc<Node>> {
        self.agents
            .iter()
            .filter(|agent| agent.status() != NodeStatus::Running)
            .cloned()
            .collect()
    }

    pub fn select_agents(
        &self,
        count: usize,
    ) -> Vec<Arc<Node>> {
        Self::sample(&self.agents, count)
    }

    pub fn select_up_agents(
        &self,
        count: usize,
    ) -> Vec<Arc<Node>> {
        Self::sample(&self.up_agents(), count)
    }

    pub fn select_down_agents(
        &self,
        count: usize,
    ) -> Vec<Arc<Node>> {
        Self::sample(&self.down_agents(), count)
    }

    /// Running agents currently tracking `service`.
    pub fn select_agents_running(
        &self,
        service: &str,
        count: usize,
    ) -> Vec<Arc<Node>> {
        let pool: Vec<Arc<Node>> = self
            .agents
            .iter()
            .filter(|agent| agent.status() == NodeStatus::Running && agent.has_service(service))
            .cloned()
            .collect();
        Self::sample(&pool, count)
    }

    /// Running agents NOT currently tracking `service`.
    pub fn select_agents_not_running(
        &self,
        service: &str,
        count: usize,
    ) -> Vec<Arc<Node>> {
        let pool: Vec<Arc<Node>> = self
            .agents
            .iter()
            .filter(|agent| agent.status() == NodeStatus::Running && !agent.has_service(service))
            .cloned()
            .collect();
        Self::sample(&pool, count)
    }

    fn sample(
        pool: &[Arc<Node>],
        count: usize,
    ) -> Vec<Arc<Node>> {
        let mut rng = rand::thread_rng();
        pool.choose_multiple(&mut rng, count).cloned().collect()
    }
}
