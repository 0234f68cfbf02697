//! Post-injection verification shared by every scenario.
//!
//! The two evidence sources are checked in order: first the armed event
//! watcher, then the graph store. A miss in either is a `Fail` verdict, not
//! an error; only non-verification trouble (lifecycle, fatal) propagates and
//! aborts the run.

use std::time::Duration;

use tracing::debug;
use tracing::warn;

use crate::scenario::ScenarioResult;
use crate::store::check_rows;
use crate::store::GraphStore;
use crate::store::QueryContext;
use crate::store::RowValidator;
use crate::watch::EventWatch;
use crate::Error;
use crate::Result;

/// One verification pass. The watcher must already be armed, with its
/// patterns installed, and the fault injected.
pub(crate) struct CheckArgs<'a> {
    pub watch: &'a dyn EventWatch,
    pub timeout: Duration,
    /// `true` demands every pattern match; `false` settles for any one.
    pub all_patterns: bool,
    pub template: &'a str,
    pub context: QueryContext,
    pub validator: Option<&'a RowValidator>,
    pub min_rows: usize,
    pub max_rows: usize,
}

pub(crate) async fn verify_outcome(
    store: &dyn GraphStore,
    args: CheckArgs<'_>,
) -> Result<ScenarioResult> {
    if args.all_patterns {
        match args.watch.look_all(args.timeout).await {
            Ok(matches) => {
                debug!(matched = matches.len(), "all awaited events observed")
            }
            Err(Error::Verify(e)) => {
                warn!(error = %e, "event evidence incomplete");
                return Ok(ScenarioResult::Fail);
            }
            Err(e) => return Err(e),
        }
    } else {
        match args.watch.look_one(args.timeout).await {
            Ok(Some(hit)) => debug!(pattern = %hit.pattern, "event observed"),
            Ok(None) => {
                warn!(timeout = ?args.timeout, "no awaited event within the window");
                return Ok(ScenarioResult::Fail);
            }
            Err(Error::Verify(e)) => {
                warn!(error = %e, "event evidence incomplete");
                return Ok(ScenarioResult::Fail);
            }
            Err(e) => return Err(e),
        }
    }

    match check_rows(
        store,
        args.template,
        &args.context,
        args.validator,
        args.min_rows,
        args.max_rows,
    )
    .await
    {
        Ok(_) => Ok(ScenarioResult::Success),
        Err(Error::Verify(e)) => {
            warn!(error = %e, "graph-store evidence missing");
            Ok(ScenarioResult::Fail)
        }
        Err(e) => Err(e),
    }
}
