//! Tree scanning engine for ctxgraph.
//!
//! This crate turns a folder into a node skeleton:
//!
//! - **Exclusion engine** - scoped `.gitignore` files, user exclusions and
//!   built-in generated folders
//! - **Tree scanner** - deterministic depth-first walk with cycle detection
//!   and a node-count ceiling
//! - **Hash aggregation** - bottom-up (Merkle) folder hashes
//!
//! # Example
//!
//! ```rust,no_run
//! use ctxgraph_scan::{scan_tree, ScanConfig};
//!
//! let config = ScanConfig::new("/path/to/notes");
//! let skeleton = scan_tree(&config).unwrap();
//!
//! println!("{} files, {} folders", skeleton.counts.files, skeleton.counts.folders);
//! for warning in &skeleton.warnings {
//!     println!("warning: {}", warning.message);
//! }
//! ```

mod aggregate;
mod exclude;
mod gitignore;
mod scanner;
mod skeleton;
mod visited;

pub use aggregate::{aggregate_folder_hashes, aggregate_hashes};
pub use exclude::{
    ANALYSIS_DIR_NAME, CAPTURES_DIR_NAME, EXTRA_CONTEXT_SUFFIX, ExclusionEngine, is_generated_dir,
};
pub use gitignore::{Gitignore, GitignoreRule};
pub use scanner::TreeScanner;
pub use skeleton::Skeleton;
pub use visited::VisitedDirs;

// Re-export core types for convenience
pub use ctxgraph_core::{
    ContentHash, GraphCounts, GraphNode, IgnoreReason, IgnoredEntry, NodeError, NodeId, NodeKind,
    NodeType, ScanConfig, ScanError, ScanWarning, WarningKind,
};

/// Scan a tree and compute all folder hashes.
pub fn scan_tree(config: &ScanConfig) -> Result<Skeleton, ScanError> {
    let mut skeleton = TreeScanner::new().scan(config)?;
    aggregate_hashes(&mut skeleton);
    Ok(skeleton)
}
