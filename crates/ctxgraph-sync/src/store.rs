//! Persistence boundary for context graphs.
//!
//! A store holds exactly one [`ContextGraph`] document per indexed root.
//! Loading never fails: a missing, unreadable or corrupt document is reported
//! as "no previous graph" and the reason is kept for diagnostics.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use thiserror::Error;
use tracing::{debug, info, warn};

use ctxgraph_core::{ContextGraph, GRAPH_VERSION};

/// Length in bytes of the blake3 prefix used to name graph files.
const ROOT_KEY_BYTES: usize = 8;

/// Errors raised while saving a graph.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to serialize graph: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl StoreError {
    fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Load/save contract for the persisted graph.
pub trait GraphStore: Send + Sync {
    /// Load the previous graph, or `None` if absent or unusable.
    fn load(&self) -> Option<ContextGraph>;

    /// Replace the stored graph, returning where it was written.
    fn save(&self, graph: &ContextGraph) -> Result<PathBuf, StoreError>;

    /// Location of the stored document.
    fn path(&self) -> &Path;

    /// Why the most recent `load` returned `None`, if it did so because of a
    /// failure rather than absence.
    fn last_error(&self) -> Option<String>;
}

/// Default directory for ctxgraph state: `<config_dir>/ctxgraph`.
pub fn default_store_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ctxgraph")
}

/// Deterministic graph location for an indexed root under `store_dir`.
///
/// The file name is a blake3 prefix of the canonical root path, so the same
/// folder always maps to the same document regardless of how it was spelled.
pub fn graph_path_for_root(store_dir: impl AsRef<Path>, root: impl AsRef<Path>) -> PathBuf {
    let root = root.as_ref();
    let canonical = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
    let digest = blake3::hash(canonical.to_string_lossy().as_bytes());
    let key = hex::encode(&digest.as_bytes()[..ROOT_KEY_BYTES]);

    store_dir.as_ref().join("graphs").join(format!("{key}.json"))
}

/// Graph store backed by a single JSON file.
#[derive(Debug)]
pub struct JsonGraphStore {
    path: PathBuf,
    last_error: Mutex<Option<String>>,
}

impl JsonGraphStore {
    /// Store reading and writing exactly `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            last_error: Mutex::new(None),
        }
    }

    /// Store for `root` under `store_dir`, see [`graph_path_for_root`].
    pub fn for_root(store_dir: impl AsRef<Path>, root: impl AsRef<Path>) -> Self {
        Self::new(graph_path_for_root(store_dir, root))
    }

    fn set_last_error(&self, error: Option<String>) {
        *self.last_error.lock().unwrap_or_else(PoisonError::into_inner) = error;
    }

    fn read_graph(&self) -> Result<Option<ContextGraph>, String> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(format!("failed to read {}: {e}", self.path.display())),
        };

        let graph: ContextGraph = serde_json::from_slice(&bytes)
            .map_err(|e| format!("invalid graph document {}: {e}", self.path.display()))?;

        if graph.version != GRAPH_VERSION {
            return Err(format!(
                "unsupported graph version {} in {} (expected {GRAPH_VERSION})",
                graph.version,
                self.path.display()
            ));
        }

        Ok(Some(graph))
    }
}

impl GraphStore for JsonGraphStore {
    fn load(&self) -> Option<ContextGraph> {
        match self.read_graph() {
            Ok(graph) => {
                self.set_last_error(None);
                if let Some(graph) = &graph {
                    debug!(
                        target: "ctxgraph::store",
                        path = %self.path.display(),
                        nodes = graph.total_nodes(),
                        "loaded graph"
                    );
                }
                graph
            }
            Err(message) => {
                warn!(target: "ctxgraph::store", "{message}");
                self.set_last_error(Some(message));
                None
            }
        }
    }

    fn save(&self, graph: &ContextGraph) -> Result<PathBuf, StoreError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).map_err(|e| StoreError::io(&dir, e))?;

        let json = serde_json::to_vec_pretty(graph)?;

        // Write beside the target, then rename over it.
        let mut temp = tempfile::NamedTempFile::new_in(&dir).map_err(|e| StoreError::io(&dir, e))?;
        temp.write_all(&json)
            .and_then(|_| temp.as_file().sync_all())
            .map_err(|e| StoreError::io(temp.path(), e))?;
        temp.persist(&self.path)
            .map_err(|e| StoreError::io(&self.path, e.error))?;

        info!(
            target: "ctxgraph::store",
            path = %self.path.display(),
            nodes = graph.total_nodes(),
            "saved graph"
        );
        Ok(self.path.clone())
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn last_error(&self) -> Option<String> {
        self.last_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Graph store kept entirely in memory.
#[derive(Debug)]
pub struct MemoryGraphStore {
    path: PathBuf,
    graph: Mutex<Option<ContextGraph>>,
}

impl MemoryGraphStore {
    pub fn new() -> Self {
        Self {
            path: PathBuf::from("memory://graph"),
            graph: Mutex::new(None),
        }
    }

    /// Store pre-populated with `graph`.
    pub fn with_graph(graph: ContextGraph) -> Self {
        let store = Self::new();
        *store.graph.lock().unwrap_or_else(PoisonError::into_inner) = Some(graph);
        store
    }

    /// Snapshot of the stored graph.
    pub fn graph(&self) -> Option<ContextGraph> {
        self.graph.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl Default for MemoryGraphStore {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphStore for MemoryGraphStore {
    fn load(&self) -> Option<ContextGraph> {
        self.graph()
    }

    fn save(&self, graph: &ContextGraph) -> Result<PathBuf, StoreError> {
        *self.graph.lock().unwrap_or_else(PoisonError::into_inner) = Some(graph.clone());
        Ok(self.path.clone())
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn last_error(&self) -> Option<String> {
        None
    }
}
