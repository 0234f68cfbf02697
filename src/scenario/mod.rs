//! Fault-injection scenarios and their verdict ledger.
//!
//! ## Key Responsibilities
//! 1. Define the [`Scenario`] contract and the shared run context handed to
//!    every scenario.
//! 2. Implement the concrete fault scenarios: agent-service stop / start /
//!    flip / restart, coordinator restarts, the simultaneous restart, and
//!    new-service discovery.
//! 3. Tally one verdict per run per scenario kind.
//! 4. Build the log signatures that provisioning barriers and scenario
//!    verification watch for.

mod agent_service;
mod check;
mod coordinator;
mod discover;
pub mod patterns;
mod scenario;
mod stats;

pub use agent_service::*;
pub use coordinator::*;
pub use discover::*;
pub use scenario::*;
pub use stats::*;

use std::sync::Arc;
use std::time::Duration;

/// One instance of every concrete scenario, in drive order. `delay` is the
/// stop-to-start pause used by the restart scenarios.
pub fn registry(delay: Duration) -> Vec<Arc<dyn Scenario>> {
    vec![
        Arc::new(StopAgentService),
        Arc::new(StartAgentService),
        Arc::new(FlipAgentService),
        Arc::new(RestartAgentService::new(delay)),
        Arc::new(RestartCoordinator::new(delay)),
        Arc::new(RestartCoordinatorAndAgent::new(delay)),
        Arc::new(SimultaneousRestart),
        Arc::new(DiscoverNewService),
    ]
}

#[cfg(test)]
pub(crate) mod testkit;
