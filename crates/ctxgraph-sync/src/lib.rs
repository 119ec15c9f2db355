//! Incremental sync engine for ctxgraph.
//!
//! A sync scans the indexed folder, diffs the fresh skeleton against the
//! previously stored [`ContextGraph`], reuses summaries for content that is
//! provably unchanged, asks the [`Summarizer`] for everything else and
//! persists the result through a [`GraphStore`].
//!
//! # Example
//!
//! ```rust,ignore
//! use ctxgraph_sync::{JsonGraphStore, ScanConfig, SyncEngine};
//!
//! let store = JsonGraphStore::for_root(ctxgraph_sync::default_store_dir(), "/path/to/notes");
//! let summarizer = MyLlmSummarizer::new();
//!
//! let outcome = SyncEngine::new(&store, &summarizer)
//!     .on_progress(|p| eprintln!("[{}/{}] {} {}", p.completed, p.total, p.phase, p.relative_path))
//!     .sync(&ScanConfig::new("/path/to/notes"))
//!     .await?;
//!
//! println!("{} reused, {} new", outcome.stats.combined().synced, outcome.stats.combined().new);
//! ```

mod diff;
mod engine;
mod progress;
mod stats;
mod store;
mod summarizer;

pub use diff::{DiffEntry, GraphDiff};
pub use engine::{ProgressFn, SyncEngine, SyncError, SyncOutcome};
pub use progress::{SyncPhase, SyncProgress};
pub use stats::{ChangeCounts, ChangeKind, SyncStats};
pub use store::{
    GraphStore, JsonGraphStore, MemoryGraphStore, StoreError, default_store_dir, graph_path_for_root,
};
pub use summarizer::{BoxError, FileRequest, FolderRequest, Summarizer};

// Re-export core types
pub use ctxgraph_core::{ContextGraph, GraphNode, NodeError, NodeId, NodeType, ScanConfig};
