//! Scripted fakes shared by the integration suites.
//!
//! Every fake writes what happened into one shared [`Journal`], so tests can
//! assert the order of runtime calls, watch arming, and readiness barriers
//! across component boundaries.

use std::sync::atomic::AtomicU32;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use faultrig::ClusterEnvironment;
use faultrig::ContainerRuntime;
use faultrig::EventMatch;
use faultrig::EventWatch;
use faultrig::GraphStore;
use faultrig::HarnessConfig;
use faultrig::InspectField;
use faultrig::LifecycleError;
use faultrig::NodeRegistry;
use faultrig::RunSpec;
use faultrig::ScenarioContext;
use faultrig::ScenarioStats;
use faultrig::VerifyError;
use faultrig::WatchFactory;
use parking_lot::Mutex;
use serde_json::json;
use serde_json::Value;

/// Shared, append-only record of everything the fakes were asked to do.
#[derive(Clone, Default)]
pub struct Journal {
    entries: Arc<Mutex<Vec<String>>>,
}

impl Journal {
    pub fn push(
        &self,
        entry: impl Into<String>,
    ) {
        self.entries.lock().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().clone()
    }

    /// Index of the first entry equal to `entry`; panics when absent so the
    /// failure names what was missing.
    pub fn position(
        &self,
        entry: &str,
    ) -> usize {
        let entries = self.entries();
        match entries.iter().position(|e| e == entry) {
            Some(index) => index,
            None => panic!("journal has no entry {entry:?}; journal: {entries:#?}"),
        }
    }

    pub fn positions_with_prefix(
        &self,
        prefix: &str,
    ) -> Vec<usize> {
        self.entries()
            .iter()
            .enumerate()
            .filter(|(_, e)| e.starts_with(prefix))
            .map(|(index, _)| index)
            .collect()
    }

    pub fn entries_with_prefix(
        &self,
        prefix: &str,
    ) -> Vec<String> {
        self.entries()
            .iter()
            .filter(|e| e.starts_with(prefix))
            .cloned()
            .collect()
    }
}

/// Container runtime double: identity is fabricated, pids increase on every
/// inspection so restarts observably change them, and the first
/// `fail_creates` create calls fail to exercise the spawn retry path.
pub struct FakeRuntime {
    journal: Journal,
    next_pid: AtomicU32,
    fail_creates: Mutex<usize>,
}

impl FakeRuntime {
    pub fn new(journal: Journal) -> Self {
        Self::with_failing_creates(journal, 0)
    }

    pub fn with_failing_creates(
        journal: Journal,
        fail_creates: usize,
    ) -> Self {
        Self {
            journal,
            next_pid: AtomicU32::new(1000),
            fail_creates: Mutex::new(fail_creates),
        }
    }
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
    async fn create_and_run(
        &self,
        spec: RunSpec,
    ) -> faultrig::Result<()> {
        self.journal.push(format!("create:{}", spec.name));
        let mut budget = self.fail_creates.lock();
        if *budget > 0 {
            *budget -= 1;
            return Err(LifecycleError::CommandFailed {
                node: spec.name,
                op: "run",
                status: "exit status: 125".to_string(),
            }
            .into());
        }
        Ok(())
    }

    async fn stop(
        &self,
        name: &str,
    ) -> faultrig::Result<()> {
        self.journal.push(format!("stop:{name}"));
        Ok(())
    }

    async fn resume(
        &self,
        name: &str,
    ) -> faultrig::Result<()> {
        self.journal.push(format!("resume:{name}"));
        Ok(())
    }

    async fn remove(
        &self,
        name: &str,
        _force: bool,
    ) -> faultrig::Result<()> {
        self.journal.push(format!("remove:{name}"));
        Ok(())
    }

    async fn inspect(
        &self,
        name: &str,
        field: InspectField,
    ) -> faultrig::Result<String> {
        Ok(match field {
            InspectField::Hostname => format!("host-{name}"),
            InspectField::IpAddress => "10.77.0.9".to_string(),
            InspectField::Pid => self.next_pid.fetch_add(1, Ordering::SeqCst).to_string(),
        })
    }

    async fn exec(
        &self,
        name: &str,
        _argv: &[String],
        _detached: bool,
    ) -> faultrig::Result<()> {
        self.journal.push(format!("exec:{name}"));
        Ok(())
    }

    async fn namespace_exec(
        &self,
        pid: u32,
        _argv: &[String],
    ) -> faultrig::Result<()> {
        self.journal.push(format!("nsexec:{pid}"));
        Ok(())
    }
}

/// Watcher double: records arming, pattern installation, and looks; a
/// matching watch answers every look immediately from its configured
/// patterns.
pub struct FakeWatch {
    id: usize,
    journal: Journal,
    patterns: Mutex<Vec<String>>,
    matching: bool,
}

#[async_trait]
impl EventWatch for FakeWatch {
    async fn arm(&self) -> faultrig::Result<()> {
        self.journal.push(format!("arm:w{}", self.id));
        Ok(())
    }

    fn set_patterns(
        &self,
        patterns: &[String],
    ) -> faultrig::Result<()> {
        *self.patterns.lock() = patterns.to_vec();
        self.journal.push(format!("patterns:w{}:{}", self.id, patterns.len()));
        Ok(())
    }

    fn add_patterns(
        &self,
        patterns: &[String],
    ) -> faultrig::Result<()> {
        self.patterns.lock().extend(patterns.iter().cloned());
        self.journal.push(format!("add_patterns:w{}:{}", self.id, patterns.len()));
        Ok(())
    }

    async fn look_one(
        &self,
        _timeout: Duration,
    ) -> faultrig::Result<Option<EventMatch>> {
        self.journal.push(format!("look_one:w{}", self.id));
        if !self.matching {
            return Ok(None);
        }
        let pattern = self.patterns.lock().first().cloned().unwrap_or_default();
        Ok(Some(EventMatch {
            pattern,
            line: "scripted".to_string(),
        }))
    }

    async fn look_all(
        &self,
        timeout: Duration,
    ) -> faultrig::Result<Vec<EventMatch>> {
        self.journal.push(format!("barrier:w{}", self.id));
        let patterns = self.patterns.lock().clone();
        if !self.matching {
            return Err(VerifyError::WatchTimeout {
                waited: timeout,
                unmatched: patterns,
            }
            .into());
        }
        Ok(patterns
            .into_iter()
            .map(|pattern| EventMatch {
                pattern,
                line: "scripted".to_string(),
            })
            .collect())
    }
}

/// Hands out [`FakeWatch`]es with increasing ids. Watches from
/// `fail_from` (by id) onward never match, so one provisioning phase can be
/// made to miss its readiness barrier.
pub struct FakeWatchFactory {
    journal: Journal,
    counter: AtomicUsize,
    fail_from: Option<usize>,
}

impl FakeWatchFactory {
    pub fn new(journal: Journal) -> Self {
        Self {
            journal,
            counter: AtomicUsize::new(0),
            fail_from: None,
        }
    }

    pub fn failing_from(
        journal: Journal,
        fail_from: usize,
    ) -> Self {
        Self {
            journal,
            counter: AtomicUsize::new(0),
            fail_from: Some(fail_from),
        }
    }
}

impl WatchFactory for FakeWatchFactory {
    fn new_watch(&self) -> Arc<dyn EventWatch> {
        let id = self.counter.fetch_add(1, Ordering::SeqCst);
        Arc::new(FakeWatch {
            id,
            journal: self.journal.clone(),
            patterns: Mutex::new(Vec::new()),
            matching: self.fail_from.map_or(true, |from| id < from),
        })
    }
}

/// Store double answering every statement with a fixed number of rows.
pub struct FakeGraphStore {
    journal: Journal,
    rows: Vec<Value>,
}

impl FakeGraphStore {
    pub fn with_rows(
        journal: Journal,
        count: usize,
    ) -> Self {
        Self {
            journal,
            rows: (0..count)
                .map(|index| json!({ "designation": format!("row-{index}"), "status": "up" }))
                .collect(),
        }
    }
}

#[async_trait]
impl GraphStore for FakeGraphStore {
    async fn query(
        &self,
        _statement: &str,
    ) -> faultrig::Result<Vec<Value>> {
        self.journal.push("query");
        Ok(self.rows.clone())
    }
}

/// Defaults tuned so retries and polls finish in milliseconds.
pub fn fleet_config(chunk_size: usize) -> HarnessConfig {
    let mut config = HarnessConfig::default();
    config.cluster.chunk_size = chunk_size;
    config.retry.pid.interval_ms = 1;
    config.retry.spawn.base_delay_ms = 1;
    config.retry.spawn.max_delay_ms = 1;
    config.watch.scenario_secs = 2;
    config
}

pub struct TestFleet {
    pub cluster: Arc<ClusterEnvironment>,
    pub registry: Arc<NodeRegistry>,
    pub journal: Journal,
    pub watch_factory: Arc<FakeWatchFactory>,
    pub config: Arc<HarnessConfig>,
}

/// Provisions a fleet against fully scripted dependencies.
pub async fn provision_fleet(
    agents: usize,
    chunk_size: usize,
) -> faultrig::Result<TestFleet> {
    let journal = Journal::default();
    let runtime = Arc::new(FakeRuntime::new(journal.clone()));
    let watch_factory = Arc::new(FakeWatchFactory::new(journal.clone()));
    provision_with(agents, fleet_config(chunk_size), runtime, journal, watch_factory).await
}

pub async fn provision_with(
    agents: usize,
    config: HarnessConfig,
    runtime: Arc<FakeRuntime>,
    journal: Journal,
    watch_factory: Arc<FakeWatchFactory>,
) -> faultrig::Result<TestFleet> {
    let config = Arc::new(config);
    let registry = Arc::new(NodeRegistry::new(config.clone(), runtime));
    let cluster = ClusterEnvironment::provision(
        agents,
        registry.clone(),
        watch_factory.clone(),
        config.clone(),
    )
    .await?;
    Ok(TestFleet {
        cluster: Arc::new(cluster),
        registry,
        journal,
        watch_factory,
        config,
    })
}

/// Scenario context over the fleet's fakes, with a store scripted to return
/// `rows` rows per query and a fresh stats ledger.
pub fn scenario_context(
    fleet: &TestFleet,
    rows: usize,
) -> ScenarioContext {
    let store = Arc::new(FakeGraphStore::with_rows(fleet.journal.clone(), rows));
    ScenarioContext::new(
        fleet.cluster.clone(),
        fleet.watch_factory.clone(),
        store,
        Arc::new(ScenarioStats::new()),
        fleet.config.clone(),
    )
}
