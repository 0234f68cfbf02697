//! Node lifecycle and in-node service control.
//!
//! ## Key Responsibilities
//! - Drives one container-backed test system through its lifecycle
//! - Discovers node identity (hostname, address, pid) after cold start
//! - Tracks which managed services the harness believes are running
//! - Owns the process-wide registry of live nodes and their scratch storage

mod node;
mod registry;
mod service;

pub use node::*;
pub use registry::*;
