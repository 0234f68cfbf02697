use std::sync::Arc;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::cluster::ClusterEnvironment;
use crate::config::HarnessConfig;
use crate::node::Node;
use crate::scenario::ScenarioStats;
use crate::store::GraphStore;
use crate::watch::EventWatch;
use crate::watch::WatchFactory;
use crate::Result;

/// Verdict of one scenario run.
///
/// `Fail` is a verification verdict, not an infrastructure error: the fault
/// was injected but the cluster did not show the expected recovery evidence.
/// Infrastructure trouble surfaces as `Err` from [`Scenario::run`] instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScenarioResult {
    Success,
    Fail,
    Skipped,
}

/// Shared handles a scenario needs to pick targets, inject its fault, and
/// verify the aftermath.
pub struct ScenarioContext {
    pub cluster: Arc<ClusterEnvironment>,
    pub watch_factory: Arc<dyn WatchFactory>,
    pub store: Arc<dyn GraphStore>,
    pub stats: Arc<ScenarioStats>,
    pub config: Arc<HarnessConfig>,
}

impl ScenarioContext {
    pub fn new(
        cluster: Arc<ClusterEnvironment>,
        watch_factory: Arc<dyn WatchFactory>,
        store: Arc<dyn GraphStore>,
        stats: Arc<ScenarioStats>,
        config: Arc<HarnessConfig>,
    ) -> Self {
        Self {
            cluster,
            watch_factory,
            store,
            stats,
            config,
        }
    }

    /// Fresh watcher armed at the current stream position with `patterns`
    /// installed. Arm before fault injection so the evidence window opens
    /// before the first consequence can land.
    pub(crate) async fn armed_watch(
        &self,
        patterns: &[String],
    ) -> Result<Arc<dyn EventWatch>> {
        let watch = self.watch_factory.new_watch();
        watch.arm().await?;
        watch.set_patterns(patterns)?;
        Ok(watch)
    }
}

/// One scripted fault-injection scenario.
///
/// When `node` is `None` the scenario selects its own target from the
/// cluster; composite scenarios pass a node through so their delegates act
/// on the same member. Every run records exactly one verdict for its kind,
/// with one exception: pure delegation (flip) records under the delegate's
/// kind, since the delegate did the work.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Scenario: Send + Sync {
    /// Stable name the verdict is tallied under.
    fn kind(&self) -> &'static str;

    async fn run(
        &self,
        ctx: &ScenarioContext,
        node: Option<Arc<Node>>,
    ) -> Result<ScenarioResult>;
}
