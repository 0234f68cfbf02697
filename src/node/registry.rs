use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use parking_lot::Mutex;
use tempfile::TempDir;
use tracing::info;

use super::Node;
use crate::config::HarnessConfig;
use crate::runtime::ContainerRuntime;
use crate::Error;
use crate::Result;

/// Process-scoped registry of every node the harness has created.
///
/// Owns node naming (kind, process id, monotonic sequence), the shared
/// scratch directory, and bulk teardown. Scenarios and the cluster
/// environment hold `Arc<Node>` clones; the registry stays the single place
/// that knows the whole fleet.
pub struct NodeRegistry {
    config: Arc<HarnessConfig>,
    runtime: Arc<dyn ContainerRuntime>,
    nodes: Mutex<HashMap<String, Arc<Node>>>,
    scratch: Mutex<Option<TempDir>>,
    sequence: AtomicU64,
}

impl NodeRegistry {
    pub fn new(
        config: Arc<HarnessConfig>,
        runtime: Arc<dyn ContainerRuntime>,
    ) -> Self {
        Self {
            config,
            runtime,
            nodes: Mutex::new(HashMap::new()),
            scratch: Mutex::new(None),
            sequence: AtomicU64::new(0),
        }
    }

    /// Creates and registers a node named `<kind>.<pid>-<seq>`, both numbers
    /// zero-padded to five digits. Names are unique per process.
    pub fn new_node(
        &self,
        kind: &str,
        image: &str,
        cmd: Vec<String>,
        debug_level: u8,
    ) -> Result<Arc<Node>> {
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst);
        let name = format!("{kind}.{:05}-{:05}", std::process::id(), sequence);
        let scratch_file = self.scratch_path(&name)?;
        let node = Arc::new(Node::new(
            name.clone(),
            image.to_string(),
            cmd,
            debug_level,
            scratch_file,
            Arc::clone(&self.runtime),
            Arc::clone(&self.config),
        ));
        self.nodes.lock().insert(name, Arc::clone(&node));
        Ok(node)
    }

    /// Allocates the per-node scratch file name, creating the shared scratch
    /// directory on first use.
    fn scratch_path(
        &self,
        name: &str,
    ) -> Result<PathBuf> {
        let mut scratch = self.scratch.lock();
        if scratch.is_none() {
            let base = self
                .config
                .runtime
                .scratch_base
                .clone()
                .unwrap_or_else(std::env::temp_dir);
            let dir = tempfile::Builder::new()
                .suffix(".faultrig")
                .tempdir_in(base)
                .map_err(|e| Error::Fatal(format!("cannot create scratch directory: {e}")))?;
            info!(path = %dir.path().display(), "scratch directory created");
            *scratch = Some(dir);
        }
        let dir = scratch
            .as_ref()
            .ok_or_else(|| Error::Fatal("scratch directory unavailable".to_string()))?;
        Ok(dir.path().join(format!("{name}.testout")))
    }

    pub fn find(
        &self,
        name: &str,
    ) -> Option<Arc<Node>> {
        self.nodes.lock().get(name).cloned()
    }

    pub fn remove(
        &self,
        name: &str,
    ) -> Option<Arc<Node>> {
        self.nodes.lock().remove(name)
    }

    pub fn len(&self) -> usize {
        self.nodes.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.lock().is_empty()
    }

    /// Registered node names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.nodes.lock().keys().cloned().collect();
        names.sort();
        names
    }

    /// Stops every registered node, forgets them all, and removes the shared
    /// scratch directory. Containers are left resumable; destruction is the
    /// cluster environment's decision.
    pub async fn cleanup_all(&self) -> Result<()> {
        let nodes: Vec<Arc<Node>> = self.nodes.lock().values().cloned().collect();
        for node in &nodes {
            node.stop().await?;
        }
        self.nodes.lock().clear();
        *self.scratch.lock() = None;
        Ok(())
    }
}
