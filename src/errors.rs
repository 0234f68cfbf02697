//! Cluster Harness Error Hierarchy
//!
//! Defines error types for the container-backed test harness, categorized by
//! operational concern: node lifecycle, fleet provisioning, and outcome
//! verification.

use std::time::Duration;

use config::ConfigError;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Node lifecycle failures (container runtime commands, pid acquisition)
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    /// Fleet construction failures (readiness barriers, spawn retries)
    #[error(transparent)]
    Provision(#[from] ProvisionError),

    /// Outcome verification failures (event watch, graph-store checks)
    #[error(transparent)]
    Verify(#[from] VerifyError),

    /// Harness configuration validation failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Unrecoverable failures requiring run termination
    #[error("Fatal error: {0}")]
    Fatal(String),
}

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    /// Container runtime command exited non-zero
    #[error("Runtime command `{op}` failed for node {node} (status: {status})")]
    CommandFailed {
        node: String,
        op: &'static str,
        status: String,
    },

    /// Container runtime command could not be launched at all
    #[error("Runtime command `{op}` could not be spawned")]
    CommandSpawn {
        op: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// Runtime inspect returned a value the harness cannot interpret
    #[error("Inspect field {field} for node {node} yielded unparsable value {value:?}")]
    InspectParse {
        node: String,
        field: &'static str,
        value: String,
    },

    /// Container pid stayed non-positive through every acquisition attempt
    #[error("Node {node} never reported a positive pid after {attempts} attempts")]
    PidNeverPositive { node: String, attempts: u32 },

    /// Operation is only legal against a running node
    #[error("Operation `{op}` requires node {node} to be running (status: {status})")]
    NotRunning {
        node: String,
        op: &'static str,
        status: &'static str,
    },

    /// Namespace entry needs a pid, but resumed nodes never re-acquire one
    #[error("Operation `{op}` needs a pid for node {node}, but none is recorded")]
    PidUnknown { node: String, op: &'static str },

    /// Capability not provided by this node type. Reaching this is a
    /// programming error, not a recoverable condition.
    #[error("Capability `{op}` is not implemented for this node type")]
    Unsupported { op: &'static str },
}

#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    /// Coordinator readiness signature never appeared in the event stream
    #[error("Coordinator not ready after {waited:?}; unmatched: {unmatched:?}")]
    CoordinatorNotReady {
        waited: Duration,
        unmatched: Vec<String>,
    },

    /// One or more members of an agent chunk never signalled readiness
    #[error("Chunk {chunk} not ready after {waited:?}; unmatched: {unmatched:?}")]
    ChunkNotReady {
        chunk: usize,
        waited: Duration,
        unmatched: Vec<String>,
    },

    /// Bounded spawn-retry policy ran out of attempts
    #[error("Gave up spawning node {node} after {attempts} attempts")]
    SpawnRetriesExhausted { node: String, attempts: u32 },

    /// Fleet construction was asked for an impossible shape
    #[error("Invalid fleet request: {0}")]
    InvalidFleet(String),
}

#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    /// Armed watcher expired with patterns still unmatched
    #[error("Event watch timed out after {waited:?}; unmatched: {unmatched:?}")]
    WatchTimeout {
        waited: Duration,
        unmatched: Vec<String>,
    },

    /// Graph query returned a row count outside the accepted window
    #[error("Query returned {got} rows, expected between {min} and {max}")]
    RowCount { got: usize, min: usize, max: usize },

    /// A returned row was rejected by the caller-supplied validator
    #[error("Query row {index} rejected by validator")]
    RowRejected { index: usize },

    /// Graph-store transport failure
    #[error("Graph store request failed: {0}")]
    StoreTransport(#[from] reqwest::Error),

    /// Graph-store response was not in the expected shape
    #[error("Graph store response malformed: {0}")]
    StoreResponse(String),

    /// Event pattern failed to compile
    #[error("Invalid event pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// Event stream could not be read
    #[error("Event stream read failed")]
    StreamIo(#[from] std::io::Error),
}

// ============== Conversion Implementations ============== //
impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        VerifyError::StoreTransport(err).into()
    }
}

impl From<regex::Error> for Error {
    fn from(err: regex::Error) -> Self {
        VerifyError::Pattern(err).into()
    }
}
