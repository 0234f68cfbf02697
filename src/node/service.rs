//! Managed-service control layered over `run_in_node`.
//!
//! Tracked-service bookkeeping happens synchronously in every variant, even
//! when the underlying exec is fire-and-forget; the tracked set reflects the
//! harness's intent, not the service's actual progress.

use std::sync::Arc;

use tracing::warn;

use super::Node;
use crate::utils::async_task::spawn_task;
use crate::Result;

impl Node {
    /// Starts a managed service through its init script. `detached` runs the
    /// script in the background inside the node.
    pub async fn start_service(
        &self,
        service: &str,
        detached: bool,
    ) -> Result<()> {
        if !self.track_service(service) {
            warn!(node = %self.name(), service, "service already tracked as running");
        }
        let script = self.config().runtime.init_script(service);
        self.run_in_node(&[script, "start".to_string()], detached).await
    }

    /// Stops a managed service through its init script.
    pub async fn stop_service(
        &self,
        service: &str,
        detached: bool,
    ) -> Result<()> {
        if !self.untrack_service(service) {
            warn!(node = %self.name(), service, "service not tracked as running");
        }
        let script = self.config().runtime.init_script(service);
        self.run_in_node(&[script, "stop".to_string()], detached).await
    }

    /// Fire-and-forget service stop: the tracked set is updated before
    /// returning, the exec itself runs on a spawned task with no join and
    /// errors only logged. Callers that need the outcome must watch for it
    /// in the event stream.
    pub async fn spawn_stop_service(
        self: &Arc<Self>,
        service: &str,
    ) {
        if !self.untrack_service(service) {
            warn!(node = %self.name(), service, "service not tracked as running");
        }
        let node = Arc::clone(self);
        let service = service.to_string();
        let task_name = format!("stop-{service}@{}", self.name());
        spawn_task(
            &task_name,
            move || async move {
                let script = node.config().runtime.init_script(&service);
                node.run_in_node(&[script, "stop".to_string()], true).await
            },
            None,
        )
        .await;
    }
}
