//! The incremental sync orchestrator.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::Utc;
use indexmap::IndexMap;
use thiserror::Error;
use tracing::{debug, info, warn};

use ctxgraph_core::{
    ContextGraph, GraphNode, IgnoredEntry, NodeError, NodeId, NodeType, ScanConfig, ScanError,
    ScanWarning,
};
use ctxgraph_scan::{Skeleton, scan_tree};

use crate::diff::{Prior, deleted_nodes};
use crate::progress::{SyncPhase, SyncProgress};
use crate::stats::{ChangeKind, SyncStats};
use crate::store::{GraphStore, StoreError};
use crate::summarizer::{BoxError, FileRequest, FolderRequest, Summarizer};

/// Callback receiving one event per processed node.
pub type ProgressFn<'a> = Box<dyn Fn(SyncProgress) + Send + Sync + 'a>;

/// Failures that abort a sync. Nothing is persisted when one occurs.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("scan failed: {0}")]
    Scan(#[from] ScanError),

    #[error("failed to save graph: {0}")]
    Store(#[from] StoreError),

    #[error("scan task failed: {0}")]
    Join(String),
}

/// Result of a completed sync.
#[derive(Debug, Clone)]
pub struct SyncOutcome {
    /// The graph that was persisted.
    pub graph: ContextGraph,
    /// Per-node failures (unreadable files, summarizer errors).
    pub errors: Vec<NodeError>,
    /// Non-fatal scan warnings.
    pub warnings: Vec<ScanWarning>,
    /// Entries the scanner skipped.
    pub ignores: Vec<IgnoredEntry>,
    /// Wall-clock time of the whole sync.
    pub duration: Duration,
    pub stats: SyncStats,
    /// Where the graph was saved.
    pub saved_to: PathBuf,
}

impl SyncOutcome {
    /// Check if any node failed.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Running progress counter.
struct Tracker<'e, 'a> {
    callback: Option<&'e ProgressFn<'a>>,
    completed: usize,
    total: usize,
}

impl Tracker<'_, '_> {
    fn emit(&mut self, phase: SyncPhase, relative_path: &str) {
        self.completed += 1;
        if let Some(callback) = self.callback {
            callback(SyncProgress {
                completed: self.completed,
                total: self.total,
                phase,
                node_type: phase.node_type(),
                relative_path: relative_path.to_string(),
            });
        }
    }
}

/// Drives one sync of a folder against a store and a summarizer.
///
/// Summarizer calls are awaited one at a time: every file first, then every
/// folder deepest first, since folder prompts are built from file summaries.
pub struct SyncEngine<'a> {
    store: &'a dyn GraphStore,
    summarizer: &'a dyn Summarizer,
    on_progress: Option<ProgressFn<'a>>,
}

impl<'a> SyncEngine<'a> {
    pub fn new(store: &'a dyn GraphStore, summarizer: &'a dyn Summarizer) -> Self {
        Self {
            store,
            summarizer,
            on_progress: None,
        }
    }

    /// Set a callback invoked once per processed node.
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(SyncProgress) + Send + Sync + 'a,
    {
        self.on_progress = Some(Box::new(callback));
        self
    }

    /// Scan `config.root`, refresh stale summaries and persist the new graph.
    ///
    /// Only a failed scan or a failed save is returned as an error; per-node
    /// failures are collected in [`SyncOutcome::errors`].
    pub async fn sync(&self, config: &ScanConfig) -> Result<SyncOutcome, SyncError> {
        let start = Instant::now();

        let previous = self.store.load();
        if previous.is_none() {
            match self.store.last_error() {
                Some(reason) => warn!(
                    target: "ctxgraph::sync",
                    %reason,
                    "previous graph unusable, resyncing everything"
                ),
                None => debug!(target: "ctxgraph::sync", "no previous graph"),
            }
        }
        let previous_nodes = previous.map(|graph| graph.nodes).unwrap_or_default();

        let scan_config = config.clone();
        let skeleton = tokio::task::spawn_blocking(move || scan_tree(&scan_config))
            .await
            .map_err(|e| SyncError::Join(e.to_string()))??;

        log_deleted(&previous_nodes, &skeleton);

        let folder_order = skeleton.folders_deepest_first();
        let Skeleton {
            root_path,
            root_id,
            mut nodes,
            file_ids,
            mut file_contents,
            mut errors,
            warnings,
            ignores,
            ..
        } = skeleton;

        let mut stats = SyncStats::default();
        let mut tracker = Tracker {
            callback: self.on_progress.as_ref(),
            completed: 0,
            total: file_ids.len() + folder_order.len(),
        };

        info!(
            target: "ctxgraph::sync",
            root = %root_path.display(),
            files = file_ids.len(),
            folders = folder_order.len(),
            "syncing"
        );

        // File pass.
        for id in &file_ids {
            let Some(node) = nodes.get_mut(id) else {
                continue;
            };
            let prior = Prior::classify(previous_nodes.get(id), node.content_hash.as_ref());
            let content = file_contents
                .remove(id)
                .filter(|content| node.content_hash.is_some() && !content.trim().is_empty());

            let phase = if let Some(cached) = prior.cached() {
                carry_forward(node, cached);
                stats.record(NodeType::File, ChangeKind::Synced);
                SyncPhase::FileCached
            } else if let Some(content) = content {
                let request = FileRequest {
                    relative_path: &node.relative_path,
                    content: &content,
                };
                let result = self.summarizer.summarize_file(request).await;
                stats.record(NodeType::File, prior.regenerated_kind());
                match accept(result) {
                    Ok(summary) => {
                        set_summary(node, summary);
                        SyncPhase::FileSummarized
                    }
                    Err(message) => {
                        errors.push(node_failure(node, message));
                        node.clear_summary();
                        SyncPhase::FileError
                    }
                }
            } else {
                node.clear_summary();
                stats.record(NodeType::File, prior.unsummarized_kind());
                SyncPhase::FileSkipped
            };

            debug!(target: "ctxgraph::sync", path = %node.relative_path, %phase, "file");
            tracker.emit(phase, &node.relative_path);
        }

        // Folder pass, deepest first.
        let mut memo = HashMap::new();
        for id in &folder_order {
            let lines = descendant_file_lines(&nodes, id, &mut memo);
            let Some(node) = nodes.get_mut(id) else {
                continue;
            };
            let prior = Prior::classify(previous_nodes.get(id), node.content_hash.as_ref());

            let phase = if lines.is_empty() {
                set_empty_summary(node);
                stats.record(NodeType::Folder, prior.unsummarized_kind());
                SyncPhase::FolderEmpty
            } else if let Some(cached) = prior.cached() {
                carry_forward(node, cached);
                stats.record(NodeType::Folder, ChangeKind::Synced);
                SyncPhase::FolderCached
            } else {
                let summaries = lines.join("\n");
                let request = FolderRequest {
                    relative_path: &node.relative_path,
                    summaries: &summaries,
                };
                let result = self.summarizer.summarize_folder(request).await;
                stats.record(NodeType::Folder, prior.regenerated_kind());
                match accept(result) {
                    Ok(summary) => {
                        set_summary(node, summary);
                        SyncPhase::FolderSummarized
                    }
                    Err(message) => {
                        errors.push(node_failure(node, message));
                        node.clear_summary();
                        SyncPhase::FolderError
                    }
                }
            };

            debug!(target: "ctxgraph::sync", path = %node.relative_path, %phase, "folder");
            tracker.emit(phase, &node.relative_path);
        }

        let graph = ContextGraph::new(root_path, self.summarizer.model(), root_id, nodes);
        let saved_to = self.store.save(&graph)?;

        let duration = start.elapsed();
        info!(
            target: "ctxgraph::sync",
            synced = stats.combined().synced,
            new = stats.combined().new,
            out_of_sync = stats.combined().out_of_sync,
            errors = errors.len(),
            elapsed_ms = duration.as_millis() as u64,
            "sync complete"
        );

        Ok(SyncOutcome {
            graph,
            errors,
            warnings,
            ignores,
            duration,
            stats,
            saved_to,
        })
    }
}

fn log_deleted(previous: &IndexMap<NodeId, GraphNode>, skeleton: &Skeleton) {
    for node in deleted_nodes(previous, &skeleton.nodes) {
        info!(
            target: "ctxgraph::sync",
            path = %node.relative_path,
            kind = %node.node_type(),
            "node removed since last sync"
        );
    }
}

/// Summary lines (`- path: summary`) of every summarized file below
/// `folder`, in pre-order. Nested folder summaries are not included.
fn descendant_file_lines(
    nodes: &IndexMap<NodeId, GraphNode>,
    folder: &NodeId,
    memo: &mut HashMap<NodeId, Vec<String>>,
) -> Vec<String> {
    if let Some(lines) = memo.get(folder) {
        return lines.clone();
    }

    let mut lines = Vec::new();
    if let Some(node) = nodes.get(folder) {
        for child_id in node.children() {
            let Some(child) = nodes.get(child_id) else {
                continue;
            };
            if child.is_folder() {
                lines.extend(descendant_file_lines(nodes, child_id, memo));
            } else if let Some(summary) = child.non_blank_summary() {
                lines.push(format!("- {}: {}", child.relative_path, summary));
            }
        }
    }

    memo.insert(folder.clone(), lines.clone());
    lines
}

/// Trimmed summarizer output, or the failure message.
fn accept(result: Result<String, BoxError>) -> Result<String, String> {
    match result {
        Ok(summary) if summary.trim().is_empty() => {
            Err("summarizer returned an empty summary".to_string())
        }
        Ok(summary) => Ok(summary.trim().to_string()),
        Err(e) => Err(e.to_string()),
    }
}

fn carry_forward(node: &mut GraphNode, previous: &GraphNode) {
    node.summary = previous.summary.clone();
    node.summary_updated_at = previous.summary_updated_at;
}

fn set_summary(node: &mut GraphNode, summary: String) {
    node.summary = Some(summary);
    node.summary_updated_at = Some(Utc::now());
}

/// Folders with nothing to summarize store `""` and no timestamp.
fn set_empty_summary(node: &mut GraphNode) {
    node.summary = Some(String::new());
    node.summary_updated_at = None;
}

fn node_failure(node: &GraphNode, message: String) -> NodeError {
    warn!(
        target: "ctxgraph::sync",
        path = %node.relative_path,
        kind = %node.node_type(),
        %message,
        "summarization failed"
    );
    NodeError::new(node.relative_path.clone(), node.node_type(), message)
}
