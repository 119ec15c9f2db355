//! The persisted context graph document.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::node::{GraphNode, NodeId, NodeType};

/// Version written to every persisted graph.
pub const GRAPH_VERSION: u32 = 1;

/// Number of files and folders in a graph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphCounts {
    pub files: usize,
    pub folders: usize,
}

impl GraphCounts {
    /// Count one node of the given type.
    pub fn record(&mut self, node_type: NodeType) {
        match node_type {
            NodeType::File => self.files += 1,
            NodeType::Folder => self.folders += 1,
        }
    }

    /// Files plus folders.
    pub fn total(&self) -> usize {
        self.files + self.folders
    }
}

/// A complete, summarized snapshot of an indexed folder.
///
/// This is the only durable artifact: each successful sync replaces the
/// whole document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextGraph {
    /// Document format version.
    pub version: u32,

    /// Absolute path of the indexed root.
    pub root_path: PathBuf,

    /// When this graph was assembled.
    pub generated_at: DateTime<Utc>,

    /// Identity of the summarizer that produced the summaries.
    pub model: String,

    /// Id of the root folder node.
    pub root_id: NodeId,

    /// Node counts by type.
    pub counts: GraphCounts,

    /// All nodes, in scan (pre-order) order.
    pub nodes: IndexMap<NodeId, GraphNode>,
}

impl ContextGraph {
    /// Assemble a graph from a node map. Counts are derived from the nodes.
    pub fn new(
        root_path: impl Into<PathBuf>,
        model: impl Into<String>,
        root_id: NodeId,
        nodes: IndexMap<NodeId, GraphNode>,
    ) -> Self {
        let mut counts = GraphCounts::default();
        for node in nodes.values() {
            counts.record(node.node_type());
        }

        Self {
            version: GRAPH_VERSION,
            root_path: root_path.into(),
            generated_at: Utc::now(),
            model: model.into(),
            root_id,
            counts,
            nodes,
        }
    }

    /// Look up a node by id.
    pub fn get(&self, id: &NodeId) -> Option<&GraphNode> {
        self.nodes.get(id)
    }

    /// The root folder node.
    pub fn root(&self) -> Option<&GraphNode> {
        self.nodes.get(&self.root_id)
    }

    /// Look up a node by its relative path and type.
    pub fn find(&self, relative_path: &str, node_type: NodeType) -> Option<&GraphNode> {
        self.nodes.get(&NodeId::derive(relative_path, node_type))
    }

    /// Resolve a folder's children, in stored order. Unknown ids are skipped.
    pub fn children_of<'a>(&'a self, node: &'a GraphNode) -> impl Iterator<Item = &'a GraphNode> {
        node.children().iter().filter_map(|id| self.nodes.get(id))
    }

    /// Total number of nodes.
    pub fn total_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the graph contains no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ContextGraph {
        let mut root = GraphNode::new_folder("root", "");
        let file = GraphNode::new_file("a.md", "a.md", 5, Utc::now());
        root.push_child(file.id.clone());

        let mut nodes = IndexMap::new();
        let root_id = root.id.clone();
        nodes.insert(root.id.clone(), root);
        nodes.insert(file.id.clone(), file);
        ContextGraph::new("/tmp/root", "test-model", root_id, nodes)
    }

    #[test]
    fn test_counts_derived_from_nodes() {
        let graph = sample();
        assert_eq!(graph.counts, GraphCounts { files: 1, folders: 1 });
        assert_eq!(graph.counts.total(), graph.total_nodes());
        assert_eq!(graph.version, GRAPH_VERSION);
    }

    #[test]
    fn test_find_and_children() {
        let graph = sample();
        let root = graph.root().unwrap();
        let children: Vec<_> = graph.children_of(root).collect();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].relative_path, "a.md");
        assert!(graph.find("a.md", NodeType::File).is_some());
        assert!(graph.find("a.md", NodeType::Folder).is_none());
    }
}
