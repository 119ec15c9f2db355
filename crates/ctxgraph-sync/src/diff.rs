//! Comparison of a fresh skeleton against the previous graph.

use indexmap::IndexMap;
use serde::Serialize;

use ctxgraph_core::{ContentHash, GraphNode, NodeId, NodeType};
use ctxgraph_scan::Skeleton;

use crate::stats::ChangeKind;

/// How a freshly scanned node relates to the previous graph.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Prior<'p> {
    /// No previous node with this id.
    Missing,
    /// Previous node exists but its hash differs (or either side has none).
    Changed,
    /// Previous node has the same content hash.
    Unchanged(&'p GraphNode),
}

impl<'p> Prior<'p> {
    pub(crate) fn classify(previous: Option<&'p GraphNode>, hash: Option<&ContentHash>) -> Self {
        match previous {
            None => Self::Missing,
            Some(prev) if hash.is_some() && prev.content_hash.as_ref() == hash => {
                Self::Unchanged(prev)
            }
            Some(_) => Self::Changed,
        }
    }

    /// The previous node, when its summary can be carried forward.
    pub(crate) fn cached(&self) -> Option<&'p GraphNode> {
        match self {
            Self::Unchanged(prev) if prev.non_blank_summary().is_some() => Some(prev),
            _ => None,
        }
    }

    /// Classification for a node that ends up without a summary call.
    pub(crate) fn unsummarized_kind(&self) -> ChangeKind {
        match self {
            Self::Missing => ChangeKind::New,
            Self::Changed => ChangeKind::OutOfSync,
            Self::Unchanged(_) => ChangeKind::Synced,
        }
    }

    /// Classification for a node sent to the summarizer.
    pub(crate) fn regenerated_kind(&self) -> ChangeKind {
        match self {
            Self::Missing => ChangeKind::New,
            Self::Changed | Self::Unchanged(_) => ChangeKind::OutOfSync,
        }
    }
}

/// A node named in a [`GraphDiff`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffEntry {
    pub relative_path: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    /// Whether the previous graph holds a summary that a sync would reuse.
    pub reusable_summary: bool,
}

/// Node-level difference between the stored graph and the tree on disk.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GraphDiff {
    pub unchanged: Vec<DiffEntry>,
    pub changed: Vec<DiffEntry>,
    pub new: Vec<DiffEntry>,
    pub deleted: Vec<DiffEntry>,
}

impl GraphDiff {
    /// Compare `previous` graph nodes with a freshly scanned skeleton.
    ///
    /// Entries keep scan order; deleted entries keep the previous graph's order.
    pub fn compute(previous: &IndexMap<NodeId, GraphNode>, skeleton: &Skeleton) -> Self {
        let mut diff = Self::default();

        for (id, node) in &skeleton.nodes {
            let prior = Prior::classify(previous.get(id), node.content_hash.as_ref());
            let entry = DiffEntry {
                relative_path: node.relative_path.clone(),
                node_type: node.node_type(),
                reusable_summary: prior.cached().is_some(),
            };
            match prior {
                Prior::Missing => diff.new.push(entry),
                Prior::Changed => diff.changed.push(entry),
                Prior::Unchanged(_) => diff.unchanged.push(entry),
            }
        }

        diff.deleted = deleted_nodes(previous, &skeleton.nodes)
            .map(|node| DiffEntry {
                relative_path: node.relative_path.clone(),
                node_type: node.node_type(),
                reusable_summary: false,
            })
            .collect();

        diff
    }

    /// Check if the stored graph matches the tree exactly.
    pub fn is_clean(&self) -> bool {
        self.changed.is_empty() && self.new.is_empty() && self.deleted.is_empty()
    }

    /// Nodes a sync would send to the summarizer, at most. Blank files and
    /// folders without file summaries are never sent.
    pub fn pending(&self) -> usize {
        self.changed.len()
            + self.new.len()
            + self.unchanged.iter().filter(|e| !e.reusable_summary).count()
    }
}

/// Previous nodes whose id no longer appears in `current`.
pub(crate) fn deleted_nodes<'p>(
    previous: &'p IndexMap<NodeId, GraphNode>,
    current: &'p IndexMap<NodeId, GraphNode>,
) -> impl Iterator<Item = &'p GraphNode> + 'p {
    previous
        .iter()
        .filter(|(id, _)| !current.contains_key(*id))
        .map(|(_, node)| node)
}
