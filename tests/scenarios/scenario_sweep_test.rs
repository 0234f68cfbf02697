use std::sync::Arc;
use std::time::Duration;

use faultrig::scenario::registry;
use faultrig::ScenarioResult;

use crate::common::fleet_config;
use crate::common::provision_fleet;
use crate::common::provision_with;
use crate::common::scenario_context;
use crate::common::FakeRuntime;
use crate::common::FakeWatchFactory;
use crate::common::Journal;
use crate::enable_logger;

#[tokio::test]
async fn every_scenario_succeeds_against_a_healthy_fleet() {
    enable_logger();
    let fleet = provision_fleet(3, 20).await.unwrap();
    let ctx = scenario_context(&fleet, 1);

    for scenario in registry(Duration::ZERO) {
        let result = scenario.run(&ctx, None).await.unwrap();
        assert_eq!(
            result,
            ScenarioResult::Success,
            "{} did not succeed",
            scenario.kind()
        );
    }

    // Stop and start also run inside flip, the restarts and the combined
    // restart, so their tallies outgrow their own runs.
    assert_eq!(ctx.stats.tally("StopAgentService").success, 4);
    assert_eq!(ctx.stats.tally("StartAgentService").success, 3);
    assert_eq!(ctx.stats.tally("RestartAgentService").success, 2);
    assert_eq!(ctx.stats.tally("RestartCoordinator").success, 2);
    assert_eq!(ctx.stats.tally("RestartCoordinatorAndAgent").success, 1);
    assert_eq!(ctx.stats.tally("SimultaneousRestart").success, 1);
    assert_eq!(ctx.stats.tally("DiscoverNewService").success, 1);
    // Flip's verdict lands in its delegate's tally, never its own.
    assert_eq!(ctx.stats.tally("FlipAgentService").total(), 0);
    assert_eq!(ctx.stats.total_failures(), 0);
    assert_eq!(ctx.stats.summary().lines().count(), 7);

    // One store consultation per verified phase, none anywhere else.
    assert_eq!(fleet.journal.positions_with_prefix("query").len(), 12);
}

#[tokio::test]
async fn verification_misses_become_fail_verdicts_not_errors() {
    enable_logger();
    let journal = Journal::default();
    let runtime = Arc::new(FakeRuntime::new(journal.clone()));
    // Provisioning consumes watches w0 and w1; every scenario watch after
    // that stays silent.
    let factory = Arc::new(FakeWatchFactory::failing_from(journal.clone(), 2));
    let fleet = provision_with(3, fleet_config(20), runtime, journal, factory)
        .await
        .unwrap();
    let ctx = scenario_context(&fleet, 1);

    for scenario in registry(Duration::ZERO) {
        let result = scenario.run(&ctx, None).await.unwrap();
        assert_eq!(
            result,
            ScenarioResult::Fail,
            "{} should fail verification, not error",
            scenario.kind()
        );
    }

    assert_eq!(ctx.stats.tally("StopAgentService").fail, 3);
    assert_eq!(ctx.stats.tally("StartAgentService").fail, 1);
    assert_eq!(ctx.stats.tally("RestartAgentService").fail, 1);
    assert_eq!(ctx.stats.tally("RestartCoordinator").fail, 2);
    assert_eq!(ctx.stats.tally("RestartCoordinatorAndAgent").fail, 1);
    assert_eq!(ctx.stats.tally("SimultaneousRestart").fail, 1);
    assert_eq!(ctx.stats.tally("DiscoverNewService").fail, 1);
    assert_eq!(ctx.stats.tally("FlipAgentService").total(), 0);
    assert_eq!(ctx.stats.total_failures(), 10);

    // The event miss short-circuits verification before the store is asked.
    assert_eq!(fleet.journal.positions_with_prefix("query").len(), 0);
}
