//! Container-backed cluster fault-injection harness.
//!
//! Provisions a disposable coordinator/agent fleet, drives scripted fault
//! scenarios against it, and verifies recovery through two independent
//! evidence sources: the aggregated log stream and the coordinator's graph
//! store.

pub mod cluster;
pub mod config;
mod errors;
pub mod node;
pub mod runtime;
pub mod scenario;
pub mod store;
pub(crate) mod utils;
pub mod watch;

pub use cluster::*;
pub use config::*;
pub use errors::*;
pub use node::*;
pub use runtime::*;
pub use scenario::*;
pub use store::*;
pub use watch::*;
