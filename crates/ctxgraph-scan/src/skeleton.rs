//! The node skeleton produced by one scan.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use indexmap::IndexMap;
use serde::Serialize;

use ctxgraph_core::{
    GraphCounts, GraphNode, IgnoredEntry, NodeError, NodeId, ScanWarning,
};

/// Ephemeral in-memory tree built by one scan, before summaries are merged in.
///
/// Folders reference their children by id; every node lives in the flat
/// `nodes` map.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Skeleton {
    /// Canonical root path that was scanned.
    pub root_path: PathBuf,

    /// Id of the root folder.
    pub root_id: NodeId,

    /// All nodes, in pre-order.
    pub nodes: IndexMap<NodeId, GraphNode>,

    /// Node counts by type.
    pub counts: GraphCounts,

    /// File ids, in pre-order.
    pub file_ids: Vec<NodeId>,

    /// Folder ids, in pre-order (root first).
    pub folder_ids: Vec<NodeId>,

    /// Depth of each folder; the root is 0.
    #[serde(skip)]
    pub folder_depths: HashMap<NodeId, usize>,

    /// Decoded text of each readable file. Never persisted.
    #[serde(skip)]
    pub file_contents: HashMap<NodeId, String>,

    /// Per-file failures (e.g. unreadable files).
    pub errors: Vec<NodeError>,

    /// Non-fatal traversal warnings.
    pub warnings: Vec<ScanWarning>,

    /// Entries seen but not indexed.
    pub ignores: Vec<IgnoredEntry>,

    /// Wall-clock time of the walk.
    #[serde(skip)]
    pub scan_duration: Duration,
}

impl Skeleton {
    /// Look up a node by id.
    pub fn get(&self, id: &NodeId) -> Option<&GraphNode> {
        self.nodes.get(id)
    }

    /// The root folder node.
    pub fn root(&self) -> Option<&GraphNode> {
        self.nodes.get(&self.root_id)
    }

    /// Decoded content of a file node.
    pub fn content(&self, id: &NodeId) -> Option<&str> {
        self.file_contents.get(id).map(String::as_str)
    }

    /// Total number of nodes.
    pub fn total_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Folder ids ordered deepest first. Folders at the same depth keep
    /// their pre-order position.
    pub fn folders_deepest_first(&self) -> Vec<NodeId> {
        let mut ids = self.folder_ids.clone();
        ids.sort_by_key(|id| std::cmp::Reverse(self.folder_depths.get(id).copied().unwrap_or(0)));
        ids
    }

    /// Check if there were any warnings during scanning.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}
