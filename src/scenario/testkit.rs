//! Shared builders for scenario unit tests: a mocked running fleet plus
//! canned watchers and stores.

use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use crate::cluster::ClusterEnvironment;
use crate::config::HarnessConfig;
use crate::node::NodeRegistry;
use crate::runtime::InspectField;
use crate::runtime::MockContainerRuntime;
use crate::scenario::ScenarioContext;
use crate::scenario::ScenarioStats;
use crate::store::MockGraphStore;
use crate::watch::EventMatch;
use crate::watch::EventWatch;
use crate::watch::MockEventWatch;
use crate::watch::MockWatchFactory;
use crate::VerifyError;

pub(crate) fn harness_config() -> HarnessConfig {
    let mut config = HarnessConfig::default();
    config.retry.pid.interval_ms = 1;
    config.watch.scenario_secs = 1;
    config
}

fn loose_runtime() -> MockContainerRuntime {
    let mut mock = MockContainerRuntime::new();
    mock.expect_create_and_run().returning(|_| Ok(()));
    mock.expect_inspect()
        .withf(|_, field| *field == InspectField::Hostname)
        .returning(|name, _| Ok(format!("host-{name}")));
    mock.expect_inspect()
        .withf(|_, field| *field == InspectField::IpAddress)
        .returning(|_, _| Ok("10.0.0.9".to_string()));
    mock.expect_inspect()
        .withf(|_, field| *field == InspectField::Pid)
        .returning(|_, _| Ok("4242".to_string()));
    mock.expect_stop().returning(|_| Ok(()));
    mock.expect_remove().returning(|_, _| Ok(()));
    mock.expect_namespace_exec().returning(|_, _| Ok(()));
    mock
}

/// Running coordinator plus `agent_count` running agents. Agents at the
/// indexes in `with_agent_service` track the product service.
pub(crate) async fn running_cluster(
    config: Arc<HarnessConfig>,
    agent_count: usize,
    with_agent_service: &[usize],
) -> Arc<ClusterEnvironment> {
    let registry = Arc::new(NodeRegistry::new(config.clone(), Arc::new(loose_runtime())));
    let coordinator = registry
        .new_node("coordinator", "lab/coordinator", vec!["/bin/sh".to_string()], 0)
        .unwrap();
    coordinator.start().await.unwrap();
    coordinator
        .start_service(&config.cluster.coordinator_service, false)
        .await
        .unwrap();

    let mut agents = Vec::new();
    for index in 0..agent_count {
        let agent = registry
            .new_node("agent", "lab/agent", vec!["/bin/sh".to_string()], 0)
            .unwrap();
        agent.start().await.unwrap();
        if with_agent_service.contains(&index) {
            agent
                .start_service(&config.cluster.agent_service, false)
                .await
                .unwrap();
        }
        agents.push(agent);
    }

    Arc::new(ClusterEnvironment {
        registry,
        config: config.clone(),
        coordinator,
        agents,
    })
}

/// Watcher whose every look succeeds immediately.
pub(crate) fn prompt_watch() -> Arc<MockEventWatch> {
    let mut watch = MockEventWatch::new();
    watch.expect_arm().returning(|| Ok(()));
    watch.expect_set_patterns().returning(|_| Ok(()));
    watch.expect_look_one().returning(|_| {
        Ok(Some(EventMatch {
            pattern: "pattern".to_string(),
            line: "line".to_string(),
        }))
    });
    watch.expect_look_all().returning(|_| Ok(Vec::new()));
    Arc::new(watch)
}

/// Watcher that never sees a match.
pub(crate) fn silent_watch() -> Arc<MockEventWatch> {
    let mut watch = MockEventWatch::new();
    watch.expect_arm().returning(|| Ok(()));
    watch.expect_set_patterns().returning(|_| Ok(()));
    watch.expect_look_one().returning(|_| Ok(None));
    watch.expect_look_all().returning(|_| {
        Err(VerifyError::WatchTimeout {
            waited: Duration::from_secs(1),
            unmatched: vec!["pattern".to_string()],
        }
        .into())
    });
    Arc::new(watch)
}

/// Factory handing out `watches` in call order, repeating the last one.
pub(crate) fn watch_factory(watches: Vec<Arc<MockEventWatch>>) -> Arc<MockWatchFactory> {
    assert!(!watches.is_empty());
    let calls = AtomicUsize::new(0);
    let mut factory = MockWatchFactory::new();
    factory.expect_new_watch().returning(move || {
        let index = calls.fetch_add(1, Ordering::SeqCst).min(watches.len() - 1);
        let watch: Arc<dyn EventWatch> = watches[index].clone();
        watch
    });
    Arc::new(factory)
}

/// Store answering every statement with `count` rows.
pub(crate) fn store_with_rows(count: usize) -> Arc<MockGraphStore> {
    let mut store = MockGraphStore::new();
    store.expect_query().returning(move |_| {
        Ok((0..count).map(|index| json!({ "designation": format!("row-{index}") })).collect())
    });
    Arc::new(store)
}

pub(crate) fn context(
    cluster: Arc<ClusterEnvironment>,
    watch_factory: Arc<MockWatchFactory>,
    store: Arc<MockGraphStore>,
    config: Arc<HarnessConfig>,
) -> ScenarioContext {
    ScenarioContext::new(
        cluster,
        watch_factory,
        store,
        Arc::new(ScenarioStats::new()),
        config,
    )
}
