//! Graph-store querying: the harness verifies cluster state by asking the
//! coordinator's graph-backed store and bounding the returned row count.

mod graph_store;
mod http;

pub use graph_store::*;
pub use http::*;
