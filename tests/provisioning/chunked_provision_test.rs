use std::sync::Arc;

use faultrig::Error;
use faultrig::NodeStatus;
use faultrig::ProvisionError;

use crate::common::fleet_config;
use crate::common::provision_fleet;
use crate::common::provision_with;
use crate::common::FakeRuntime;
use crate::common::FakeWatchFactory;
use crate::common::Journal;
use crate::enable_logger;

/// Creates recorded between `low` and `high` exclusive.
fn creates_between(
    journal: &Journal,
    low: usize,
    high: usize,
) -> Vec<usize> {
    journal
        .positions_with_prefix("create:agent.")
        .into_iter()
        .filter(|position| *position > low && *position < high)
        .collect()
}

#[tokio::test]
async fn agents_come_up_in_readiness_gated_chunks() {
    enable_logger();
    let fleet = provision_fleet(5, 2).await.unwrap();
    let journal = &fleet.journal;

    assert_eq!(fleet.cluster.agents().len(), 5);
    // One barrier for the coordinator, then one per chunk of two (2+2+1).
    assert_eq!(journal.positions_with_prefix("barrier:").len(), 4);

    // The coordinator spawns inside watch 0's armed window.
    let arm0 = journal.position("arm:w0");
    let coordinator_create = journal.positions_with_prefix("create:coordinator.")[0];
    let barrier0 = journal.position("barrier:w0");
    assert!(arm0 < coordinator_create && coordinator_create < barrier0);
    // Its readiness pattern goes in after the spawn, before the wait.
    let patterns0 = journal.position("patterns:w0:1");
    assert!(coordinator_create < patterns0 && patterns0 < barrier0);

    for (chunk, members) in [(0usize, 2usize), (1, 2), (2, 1)] {
        let watch = chunk + 1;
        let previous_barrier = journal.position(&format!("barrier:w{}", watch - 1));
        let arm = journal.position(&format!("arm:w{watch}"));
        let barrier = journal.position(&format!("barrier:w{watch}"));

        // No spawn of this chunk may precede the previous chunk's barrier.
        assert!(previous_barrier < arm, "chunk {chunk} armed before the previous barrier");
        let creates = creates_between(journal, arm, barrier);
        assert_eq!(creates.len(), members, "chunk {chunk} spawned a wrong member count");

        // Three readiness patterns per member, installed after every spawn.
        let patterns = journal.position(&format!("patterns:w{watch}:{}", members * 3));
        assert!(creates.iter().all(|create| *create < patterns));
        assert!(patterns < barrier);
    }
}

#[tokio::test]
async fn zero_agents_still_brings_up_the_coordinator() {
    enable_logger();
    let fleet = provision_fleet(0, 20).await.unwrap();

    assert!(fleet.cluster.agents().is_empty());
    assert_eq!(fleet.cluster.coordinator().status(), NodeStatus::Running);
    assert_eq!(fleet.journal.positions_with_prefix("barrier:").len(), 1);
}

#[tokio::test]
async fn missed_coordinator_readiness_aborts_before_any_agent() {
    enable_logger();
    let journal = Journal::default();
    let runtime = Arc::new(FakeRuntime::new(journal.clone()));
    let factory = Arc::new(FakeWatchFactory::failing_from(journal.clone(), 0));

    let outcome = provision_with(3, fleet_config(2), runtime, journal.clone(), factory).await;

    assert!(matches!(
        outcome.map(|_| ()),
        Err(Error::Provision(ProvisionError::CoordinatorNotReady { .. }))
    ));
    assert!(journal.positions_with_prefix("create:agent.").is_empty());
}

#[tokio::test]
async fn missed_chunk_barrier_names_the_chunk_and_stops_spawning() {
    enable_logger();
    let journal = Journal::default();
    let runtime = Arc::new(FakeRuntime::new(journal.clone()));
    // Coordinator watch (id 0) matches; every chunk watch misses.
    let factory = Arc::new(FakeWatchFactory::failing_from(journal.clone(), 1));

    let outcome = provision_with(3, fleet_config(2), runtime, journal.clone(), factory).await;

    match outcome.map(|_| ()) {
        Err(Error::Provision(ProvisionError::ChunkNotReady { chunk, .. })) => {
            assert_eq!(chunk, 0)
        }
        other => panic!("expected a chunk readiness failure, got {other:?}"),
    }
    // Only the first chunk's members were ever spawned.
    assert_eq!(journal.positions_with_prefix("create:agent.").len(), 2);
}

#[tokio::test]
async fn teardown_with_destroy_policy_empties_the_registry() {
    enable_logger();
    let fleet = provision_fleet(2, 20).await.unwrap();

    fleet.cluster.teardown().await.unwrap();

    assert_eq!(fleet.journal.positions_with_prefix("remove:").len(), 3);
    assert!(fleet.registry.is_empty());
    let last_stop = *fleet.journal.positions_with_prefix("stop:").last().unwrap();
    let first_remove = fleet.journal.positions_with_prefix("remove:")[0];
    assert!(last_stop < first_remove, "stops precede removals");
}

#[tokio::test]
async fn teardown_without_destroy_policy_keeps_the_containers() {
    enable_logger();
    let journal = Journal::default();
    let runtime = Arc::new(FakeRuntime::new(journal.clone()));
    let factory = Arc::new(FakeWatchFactory::new(journal.clone()));
    let mut config = fleet_config(20);
    config.cluster.destroy_on_cleanup = false;

    let fleet = provision_with(2, config, runtime, journal, factory).await.unwrap();
    fleet.cluster.teardown().await.unwrap();

    assert!(fleet.journal.positions_with_prefix("remove:").is_empty());
    assert_eq!(fleet.registry.len(), 3);
    for agent in fleet.cluster.agents() {
        assert_eq!(agent.status(), NodeStatus::Stopped);
    }
    assert_eq!(fleet.cluster.coordinator().status(), NodeStatus::Stopped);
}
