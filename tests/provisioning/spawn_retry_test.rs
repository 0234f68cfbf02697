use std::sync::Arc;

use faultrig::Error;
use faultrig::ProvisionError;

use crate::common::fleet_config;
use crate::common::provision_with;
use crate::common::FakeRuntime;
use crate::common::FakeWatchFactory;
use crate::common::Journal;
use crate::enable_logger;

#[tokio::test]
async fn transient_create_failures_are_retried_with_fresh_nodes() {
    enable_logger();
    let journal = Journal::default();
    // The coordinator is the first spawn; its first two creates fail.
    let runtime = Arc::new(FakeRuntime::with_failing_creates(journal.clone(), 2));
    let factory = Arc::new(FakeWatchFactory::new(journal.clone()));

    let fleet = provision_with(1, fleet_config(20), runtime, journal.clone(), factory)
        .await
        .unwrap();

    let coordinator_creates = journal.entries_with_prefix("create:coordinator.");
    assert_eq!(coordinator_creates.len(), 3, "two failures then one success");
    // Each attempt registers a fresh node name.
    assert_eq!(
        coordinator_creates.len(),
        coordinator_creates
            .iter()
            .collect::<std::collections::HashSet<_>>()
            .len()
    );
    // The half-built node is removed between attempts.
    assert_eq!(journal.positions_with_prefix("remove:coordinator.").len(), 2);
    // The survivor matches the third create.
    let survivor = format!("create:{}", fleet.cluster.coordinator().name());
    assert_eq!(coordinator_creates.last().unwrap(), &survivor);
    // Abandoned names are gone from the registry.
    assert_eq!(fleet.registry.len(), 2);
}

#[tokio::test]
async fn exhausted_spawn_budget_is_a_provisioning_error() {
    enable_logger();
    let journal = Journal::default();
    let runtime = Arc::new(FakeRuntime::with_failing_creates(journal.clone(), usize::MAX));
    let factory = Arc::new(FakeWatchFactory::new(journal.clone()));
    let mut config = fleet_config(20);
    config.retry.spawn.max_retries = 3;

    let outcome = provision_with(1, config, runtime, journal.clone(), factory).await;

    match outcome.map(|_| ()) {
        Err(Error::Provision(ProvisionError::SpawnRetriesExhausted { node, attempts })) => {
            assert_eq!(node, "coordinator");
            assert_eq!(attempts, 3);
        }
        other => panic!("expected spawn exhaustion, got {other:?}"),
    }
    assert_eq!(journal.positions_with_prefix("create:coordinator.").len(), 3);
}

#[tokio::test]
async fn restarting_a_running_agent_reacquires_a_fresh_pid() {
    enable_logger();
    let journal = Journal::default();
    let runtime = Arc::new(FakeRuntime::new(journal.clone()));
    let factory = Arc::new(FakeWatchFactory::new(journal.clone()));

    let fleet = provision_with(1, fleet_config(20), runtime, journal.clone(), factory)
        .await
        .unwrap();
    let agent = fleet.cluster.agents()[0].clone();
    let original_pid = agent.pid().unwrap();

    agent.start().await.unwrap();

    let restarted_pid = agent.pid().unwrap();
    assert_ne!(original_pid, restarted_pid, "restart re-discovers the container pid");
    // The restart is a stop followed by a resume of the same container.
    let name = agent.name();
    let stop = journal.position(&format!("stop:{name}"));
    let resume = journal.position(&format!("resume:{name}"));
    assert!(stop < resume);
    assert_eq!(journal.positions_with_prefix(&format!("create:{name}")).len(), 1);
}
