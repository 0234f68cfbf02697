use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::Result;

/// A single pattern hit: which pattern fired and the line that satisfied it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventMatch {
    pub pattern: String,
    pub line: String,
}

/// Regex watching over an event stream.
///
/// The armed position, not watcher creation, defines which lines are
/// considered: everything that arrives after `arm()` is eligible, everything
/// before is invisible. Lines are consumed during matching; a line examined
/// and rejected by one `look_*` call is never revisited by a later one.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait EventWatch: Send + Sync {
    /// Records the current end of the stream as the watch position.
    async fn arm(&self) -> Result<()>;

    /// Replaces the pattern set.
    fn set_patterns(
        &self,
        patterns: &[String],
    ) -> Result<()>;

    /// Extends the pattern set without disturbing existing entries.
    fn add_patterns(
        &self,
        patterns: &[String],
    ) -> Result<()>;

    /// Blocks until any one configured pattern matches a captured line, or
    /// the timeout elapses (`None`).
    async fn look_one(
        &self,
        timeout: Duration,
    ) -> Result<Option<EventMatch>>;

    /// Blocks until every configured pattern has matched at least once.
    /// Expiry yields a verification error naming the unmatched subset.
    async fn look_all(
        &self,
        timeout: Duration,
    ) -> Result<Vec<EventMatch>>;
}

/// Produces fresh watchers over the harness event stream. Every verification
/// site arms its own watcher, so phases of one scenario can watch
/// independently.
#[cfg_attr(test, automock)]
pub trait WatchFactory: Send + Sync {
    fn new_watch(&self) -> Arc<dyn EventWatch>;
}
