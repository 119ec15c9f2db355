//! Per-run change statistics.

use serde::Serialize;

use ctxgraph_core::NodeType;

/// How a node compares with its record in the previous graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ChangeKind {
    /// Unchanged; cached summary reused (or nothing to summarize).
    Synced,
    /// No previous record.
    New,
    /// Previous record exists but content changed or its summary is missing.
    OutOfSync,
}

/// Counters for one node type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeCounts {
    pub synced: usize,
    pub new: usize,
    pub out_of_sync: usize,
}

impl ChangeCounts {
    pub fn record(&mut self, kind: ChangeKind) {
        match kind {
            ChangeKind::Synced => self.synced += 1,
            ChangeKind::New => self.new += 1,
            ChangeKind::OutOfSync => self.out_of_sync += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.synced + self.new + self.out_of_sync
    }
}

/// Change counters of one sync, split by node type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncStats {
    pub files: ChangeCounts,
    pub folders: ChangeCounts,
}

impl SyncStats {
    pub fn record(&mut self, node_type: NodeType, kind: ChangeKind) {
        match node_type {
            NodeType::File => self.files.record(kind),
            NodeType::Folder => self.folders.record(kind),
        }
    }

    /// Files and folders added together.
    pub fn combined(&self) -> ChangeCounts {
        ChangeCounts {
            synced: self.files.synced + self.folders.synced,
            new: self.files.new + self.folders.new,
            out_of_sync: self.files.out_of_sync + self.folders.out_of_sync,
        }
    }

    /// Number of nodes that were not reused from the previous graph.
    pub fn changed(&self) -> usize {
        let combined = self.combined();
        combined.new + combined.out_of_sync
    }
}
