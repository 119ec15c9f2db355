//! Sync progress reporting.

use serde::Serialize;
use strum::{Display, EnumIter, EnumString};

use ctxgraph_core::NodeType;

/// What happened to the node a progress event reports on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, Serialize)]
pub enum SyncPhase {
    /// Summary reused from the previous graph.
    #[strum(serialize = "file:cached")]
    #[serde(rename = "file:cached")]
    FileCached,
    /// Summary freshly generated.
    #[strum(serialize = "file:summarized")]
    #[serde(rename = "file:summarized")]
    FileSummarized,
    /// Nothing to summarize (unreadable or blank content).
    #[strum(serialize = "file:skipped")]
    #[serde(rename = "file:skipped")]
    FileSkipped,
    /// Summarizer failed or returned a blank summary.
    #[strum(serialize = "file:error")]
    #[serde(rename = "file:error")]
    FileError,
    /// No descendant file summaries; no summarizer call.
    #[strum(serialize = "folder:empty")]
    #[serde(rename = "folder:empty")]
    FolderEmpty,
    #[strum(serialize = "folder:cached")]
    #[serde(rename = "folder:cached")]
    FolderCached,
    #[strum(serialize = "folder:summarized")]
    #[serde(rename = "folder:summarized")]
    FolderSummarized,
    #[strum(serialize = "folder:error")]
    #[serde(rename = "folder:error")]
    FolderError,
}

impl SyncPhase {
    /// The node type this phase belongs to.
    pub fn node_type(&self) -> NodeType {
        match self {
            Self::FileCached | Self::FileSummarized | Self::FileSkipped | Self::FileError => {
                NodeType::File
            }
            Self::FolderEmpty | Self::FolderCached | Self::FolderSummarized | Self::FolderError => {
                NodeType::Folder
            }
        }
    }
}

/// One progress event, emitted once per processed node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncProgress {
    /// Nodes processed so far, including this one.
    pub completed: usize,
    /// Total nodes to process.
    pub total: usize,
    pub phase: SyncPhase,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub relative_path: String,
}

impl SyncProgress {
    /// Check if this is the last event of the sync.
    pub fn is_complete(&self) -> bool {
        self.completed >= self.total
    }
}
