use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use faultrig::scenario;
use faultrig::scenario::patterns;
use faultrig::ClusterEnvironment;
use faultrig::DockerRuntime;
use faultrig::HarnessConfig;
use faultrig::HttpGraphStore;
use faultrig::LogTailFactory;
use faultrig::NodeRegistry;
use faultrig::Result;
use faultrig::ScenarioContext;
use faultrig::ScenarioResult;
use faultrig::ScenarioStats;
use faultrig::WatchFactory;
use tokio::signal::unix::signal;
use tokio::signal::unix::SignalKind;
use tracing::error;
use tracing::info;
use tracing::warn;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;

/// How long after each scenario the error watcher gets to surface a late
/// error-severity line.
const ERROR_SWEEP_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Parser, Debug)]
#[command(
    name = "faultrig",
    version,
    about = "Container-backed cluster fault-injection harness"
)]
struct Args {
    /// Number of agent nodes to provision
    #[arg(long, default_value_t = 3)]
    agents: usize,

    /// Extra configuration file merged over the built-in defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Pause, in seconds, between the stop and start phases of the restart
    /// scenarios
    #[arg(long, default_value_t = 0)]
    delay: u64,
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_observability();

    match run(args).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!(error = %e, "harness run aborted");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<bool> {
    let mut config = HarnessConfig::new()?;
    if let Some(path) = &args.config {
        config = config.with_override_config(&path.to_string_lossy())?;
    }
    let config = Arc::new(config.validate()?);

    let runtime = Arc::new(DockerRuntime::new(&config.runtime));
    let registry = Arc::new(NodeRegistry::new(config.clone(), runtime));
    let watch_factory: Arc<dyn WatchFactory> = Arc::new(LogTailFactory::new(&config.watch));
    let store = Arc::new(HttpGraphStore::new(&config.store)?);

    info!(agents = args.agents, "provisioning cluster");
    let cluster = Arc::new(
        ClusterEnvironment::provision(
            args.agents,
            registry,
            watch_factory.clone(),
            config.clone(),
        )
        .await?,
    );

    let stats = Arc::new(ScenarioStats::new());
    let ctx = ScenarioContext::new(
        cluster.clone(),
        watch_factory,
        store,
        stats.clone(),
        config.clone(),
    );

    let outcome = tokio::select! {
        outcome = drive_scenarios(&ctx, Duration::from_secs(args.delay)) => outcome,
        _ = shutdown_signal() => {
            warn!("shutdown requested; abandoning remaining scenarios");
            Ok(false)
        }
    };

    // The fleet comes down even when the sweep aborted.
    if let Err(e) = cluster.teardown().await {
        warn!(error = %e, "teardown incomplete");
    }

    let clean = outcome?;
    println!("\n{}", stats.summary());
    Ok(clean && stats.total_failures() == 0)
}

/// Runs every registered scenario once. Each scenario executes inside its own
/// error-watch window; an error-severity log line during the window fails the
/// sweep even when the scenario itself verified.
async fn drive_scenarios(
    ctx: &ScenarioContext,
    delay: Duration,
) -> Result<bool> {
    let mut clean = true;
    for scenario in scenario::registry(delay) {
        let error_watch = ctx.watch_factory.new_watch();
        error_watch.arm().await?;
        error_watch.set_patterns(&[patterns::error_line()])?;

        info!(scenario = scenario.kind(), "running scenario");
        let result = scenario.run(ctx, None).await?;
        println!("{:<28} {:?}", scenario.kind(), result);
        if result == ScenarioResult::Fail {
            clean = false;
        }

        if let Some(hit) = error_watch.look_one(ERROR_SWEEP_TIMEOUT).await? {
            error!(
                scenario = scenario.kind(),
                line = %hit.line,
                "error-severity log line during scenario window"
            );
            clean = false;
        }
    }
    Ok(clean)
}

async fn shutdown_signal() {
    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(sigterm) => sigterm,
        Err(e) => {
            error!(error = %e, "cannot install SIGTERM handler");
            std::future::pending().await
        }
    };
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl+C detected.");
        },
        _ = sigterm.recv() => {
            info!("SIGTERM detected.");
        },
    }
}

fn init_observability() {
    let base_subscriber = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_default_env());
    tracing_subscriber::registry().with(base_subscriber).init();
}
