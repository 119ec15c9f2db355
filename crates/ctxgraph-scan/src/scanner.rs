//! Depth-first directory scanner that builds the node skeleton.

use std::collections::HashMap;
use std::fs::{self, FileType};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};

use chrono::{DateTime, Utc};
use indexmap::IndexMap;

use ctxgraph_core::{
    ContentHash, GraphCounts, GraphNode, IgnoreReason, IgnoredEntry, NodeError, NodeId,
    NodeType, ScanConfig, ScanError, ScanWarning,
};

use crate::exclude::ExclusionEngine;
use crate::gitignore::Gitignore;
use crate::skeleton::Skeleton;
use crate::visited::VisitedDirs;

const GITIGNORE_FILE: &str = ".gitignore";

/// Single-threaded, blocking tree scanner.
///
/// The whole tree is read before any hashing decision is made, so the
/// skeleton is a consistent snapshot. Directory entries are visited in
/// lexicographic order, which makes node order and child lists
/// deterministic.
#[derive(Debug, Default)]
pub struct TreeScanner;

impl TreeScanner {
    /// Create a new scanner.
    pub fn new() -> Self {
        Self
    }

    /// Scan `config.root` into a skeleton. Folder hashes are not computed
    /// here, see [`crate::aggregate_hashes`].
    ///
    /// The walk always runs to completion; if it created more than
    /// `config.max_nodes` nodes the whole scan fails.
    pub fn scan(&self, config: &ScanConfig) -> Result<Skeleton, ScanError> {
        let start = Instant::now();
        if config.max_nodes == 0 {
            return Err(ScanError::InvalidConfig {
                message: "max_nodes must be at least 1".to_string(),
            });
        }
        let root_path = config
            .root
            .canonicalize()
            .map_err(|e| ScanError::io(&config.root, e))?;

        let root_metadata = fs::metadata(&root_path).map_err(|e| ScanError::io(&root_path, e))?;
        if !root_metadata.is_dir() {
            return Err(ScanError::NotADirectory { path: root_path });
        }

        tracing::debug!(target: "ctxgraph::scan", root = %root_path.display(), "starting scan");

        let mut walk = Walk::new(config);
        walk.visited.visit(&root_path, &root_metadata);

        let root_name = root_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| root_path.to_string_lossy().to_string());
        let root_id = walk.add_folder(GraphNode::new_folder(root_name, ""), None, 0);

        walk.visit_dir(&root_path, "", &root_id, 0)
            .map_err(|e| ScanError::io(&root_path, e))?;

        if walk.created > config.max_nodes {
            tracing::warn!(
                target: "ctxgraph::scan",
                limit = config.max_nodes,
                found = walk.created,
                "node limit exceeded"
            );
            return Err(ScanError::NodeLimitExceeded {
                limit: config.max_nodes,
                found: walk.created,
            });
        }

        Ok(walk.finish(root_path, root_id, start.elapsed()))
    }
}

/// Mutable state shared across the recursive walk.
struct Walk<'a> {
    config: &'a ScanConfig,
    exclusions: ExclusionEngine,
    visited: VisitedDirs,
    nodes: IndexMap<NodeId, GraphNode>,
    counts: GraphCounts,
    file_ids: Vec<NodeId>,
    folder_ids: Vec<NodeId>,
    folder_depths: HashMap<NodeId, usize>,
    file_contents: HashMap<NodeId, String>,
    errors: Vec<NodeError>,
    warnings: Vec<ScanWarning>,
    ignores: Vec<IgnoredEntry>,
    created: usize,
}

impl<'a> Walk<'a> {
    fn new(config: &'a ScanConfig) -> Self {
        Self {
            config,
            exclusions: ExclusionEngine::new(&config.exclusions),
            visited: VisitedDirs::new(),
            nodes: IndexMap::new(),
            counts: GraphCounts::default(),
            file_ids: Vec::new(),
            folder_ids: Vec::new(),
            folder_depths: HashMap::new(),
            file_contents: HashMap::new(),
            errors: Vec::new(),
            warnings: Vec::new(),
            ignores: Vec::new(),
            created: 0,
        }
    }

    fn finish(self, root_path: PathBuf, root_id: NodeId, scan_duration: Duration) -> Skeleton {
        Skeleton {
            root_path,
            root_id,
            nodes: self.nodes,
            counts: self.counts,
            file_ids: self.file_ids,
            folder_ids: self.folder_ids,
            folder_depths: self.folder_depths,
            file_contents: self.file_contents,
            errors: self.errors,
            warnings: self.warnings,
            ignores: self.ignores,
            scan_duration,
        }
    }

    /// List, sort and visit the entries of one directory.
    fn visit_dir(
        &mut self,
        dir: &Path,
        rel_dir: &str,
        dir_id: &NodeId,
        depth: usize,
    ) -> std::io::Result<()> {
        let mut entries: Vec<(String, PathBuf, FileType)> = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = match entry {
                Ok(e) => e,
                Err(err) => {
                    self.warnings.push(ScanWarning::read_error(rel_dir, &err));
                    continue;
                }
            };
            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(raw) => {
                    let lossy = raw.to_string_lossy();
                    self.ignore(join_relative(rel_dir, &lossy), IgnoreReason::InvalidName);
                    continue;
                }
            };
            match entry.file_type() {
                Ok(file_type) => entries.push((name, entry.path(), file_type)),
                Err(err) => self
                    .warnings
                    .push(ScanWarning::metadata_error(join_relative(rel_dir, &name), &err)),
            }
        }
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        let scoped = self.load_gitignore(dir, rel_dir);

        for (name, path, file_type) in entries {
            let rel = join_relative(rel_dir, &name);
            self.visit_entry(&path, rel, &name, file_type, dir_id, depth);
        }

        if scoped {
            self.exclusions.pop_gitignore();
        }
        Ok(())
    }

    /// Compile this directory's `.gitignore`, if any, and activate it.
    fn load_gitignore(&mut self, dir: &Path, rel_dir: &str) -> bool {
        let path = dir.join(GITIGNORE_FILE);
        if !path.is_file() {
            return false;
        }
        match Gitignore::from_file(rel_dir, &path) {
            Ok(gitignore) if !gitignore.is_empty() => {
                self.exclusions.push_gitignore(gitignore);
                true
            }
            Ok(_) => false,
            Err(err) => {
                self.warnings.push(ScanWarning::read_error(
                    join_relative(rel_dir, GITIGNORE_FILE),
                    &err,
                ));
                false
            }
        }
    }

    fn visit_entry(
        &mut self,
        path: &Path,
        rel: String,
        name: &str,
        file_type: FileType,
        parent: &NodeId,
        depth: usize,
    ) {
        if let Some(reason) = self.exclusions.check(&rel, file_type.is_dir()) {
            self.ignore(rel, reason);
            return;
        }

        if file_type.is_symlink() {
            self.check_symlink_target(path, &rel);
            self.ignore(rel, IgnoreReason::Symlink);
        } else if file_type.is_dir() {
            self.enter_dir(path, rel, name, parent, depth + 1);
        } else if file_type.is_file() {
            self.index_file(path, rel, name, parent);
        } else {
            tracing::debug!(target: "ctxgraph::scan", path = %rel, "skipping special file");
        }
    }

    /// Symlinks are never followed; warn when one loops back into the tree.
    fn check_symlink_target(&mut self, path: &Path, rel: &str) {
        let Ok(target) = fs::canonicalize(path) else {
            return;
        };
        let Ok(metadata) = fs::metadata(&target) else {
            return;
        };
        if metadata.is_dir() && self.visited.has_seen(&target, &metadata) {
            tracing::warn!(
                target: "ctxgraph::scan",
                path = rel,
                target = %target.display(),
                "symlink points to an already visited directory"
            );
            self.warnings.push(ScanWarning::symlink_cycle(rel, &target));
        }
    }

    fn enter_dir(&mut self, path: &Path, rel: String, name: &str, parent: &NodeId, depth: usize) {
        let real_path = match fs::canonicalize(path) {
            Ok(p) => p,
            Err(err) => {
                self.warnings.push(ScanWarning::metadata_error(rel, &err));
                return;
            }
        };
        let metadata = match fs::metadata(&real_path) {
            Ok(m) => m,
            Err(err) => {
                self.warnings.push(ScanWarning::metadata_error(rel, &err));
                return;
            }
        };

        if !self.visited.visit(&real_path, &metadata) {
            tracing::warn!(
                target: "ctxgraph::scan",
                path = %rel,
                real_path = %real_path.display(),
                "directory already visited, skipping subtree"
            );
            self.warnings.push(ScanWarning::cycle_detected(rel, &real_path));
            return;
        }

        let id = self.add_folder(GraphNode::new_folder(name, rel.as_str()), Some(parent), depth);
        if let Err(err) = self.visit_dir(path, &rel, &id, depth) {
            tracing::warn!(target: "ctxgraph::scan", path = %rel, %err, "failed to read directory");
            self.warnings.push(ScanWarning::read_error(rel, &err));
        }
    }

    /// Read an indexable file once: size, mtime, content and hash.
    fn index_file(&mut self, path: &Path, rel: String, name: &str, parent: &NodeId) {
        if !self.config.is_supported_file(name) {
            self.ignore(rel, IgnoreReason::UnsupportedExtension);
            return;
        }

        let metadata = match fs::metadata(path) {
            Ok(m) => m,
            Err(err) => {
                self.errors.push(NodeError::new(
                    rel,
                    NodeType::File,
                    format!("Failed to read metadata: {err}"),
                ));
                return;
            }
        };

        // Checked before opening the file.
        if metadata.len() > self.config.max_file_bytes {
            self.ignore(rel, IgnoreReason::FileTooLarge);
            return;
        }

        let modified_at = to_utc(metadata.modified());
        match fs::read(path) {
            Ok(bytes) => {
                let mut node = GraphNode::new_file(name, rel, bytes.len() as u64, modified_at);
                node.content_hash = Some(ContentHash::of_bytes(&bytes));
                let content = String::from_utf8(bytes)
                    .unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned());
                self.add_file(node, parent, Some(content));
            }
            Err(err) => {
                tracing::warn!(target: "ctxgraph::scan", path = %rel, %err, "failed to read file");
                self.errors.push(NodeError::new(
                    rel.as_str(),
                    NodeType::File,
                    format!("Failed to read file: {err}"),
                ));
                let node = GraphNode::new_file(name, rel, metadata.len(), modified_at);
                self.add_file(node, parent, None);
            }
        }
    }

    fn add_folder(&mut self, node: GraphNode, parent: Option<&NodeId>, depth: usize) -> NodeId {
        let id = node.id.clone();
        self.created += 1;
        self.counts.record(NodeType::Folder);
        self.folder_ids.push(id.clone());
        self.folder_depths.insert(id.clone(), depth);
        self.nodes.insert(id.clone(), node);
        if let Some(parent) = parent {
            self.link(parent, &id);
        }
        id
    }

    fn add_file(&mut self, node: GraphNode, parent: &NodeId, content: Option<String>) {
        let id = node.id.clone();
        self.created += 1;
        self.counts.record(NodeType::File);
        self.file_ids.push(id.clone());
        if let Some(content) = content {
            self.file_contents.insert(id.clone(), content);
        }
        self.nodes.insert(id.clone(), node);
        self.link(parent, &id);
    }

    fn link(&mut self, parent: &NodeId, child: &NodeId) {
        if let Some(parent) = self.nodes.get_mut(parent) {
            parent.push_child(child.clone());
        }
    }

    fn ignore(&mut self, rel: String, reason: IgnoreReason) {
        tracing::debug!(target: "ctxgraph::scan", path = %rel, %reason, "ignored");
        self.ignores.push(IgnoredEntry::new(rel, reason));
    }
}

/// Join a root-relative directory path and an entry name with `/`.
fn join_relative(rel_dir: &str, name: &str) -> String {
    if rel_dir.is_empty() {
        name.to_string()
    } else {
        format!("{rel_dir}/{name}")
    }
}

fn to_utc(modified: std::io::Result<SystemTime>) -> DateTime<Utc> {
    DateTime::<Utc>::from(modified.unwrap_or(SystemTime::UNIX_EPOCH))
}
