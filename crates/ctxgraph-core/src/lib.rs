//! Core types for ctxgraph.
//!
//! This crate provides the data structures shared by the scanner and the
//! sync engine: graph nodes and their stable ids, content hashes, the
//! persisted [`ContextGraph`] document, scan configuration, and the error
//! and warning types reported by a scan.

mod config;
mod error;
mod graph;
mod node;

pub use config::{
    DEFAULT_EXTENSIONS, DEFAULT_MAX_FILE_BYTES, DEFAULT_MAX_NODES, ScanConfig, ScanConfigBuilder,
};
pub use error::{
    IgnoreReason, IgnoredEntry, NodeError, ScanError, ScanWarning, WarningKind,
};
pub use graph::{ContextGraph, GRAPH_VERSION, GraphCounts};
pub use node::{ContentHash, GraphNode, NodeId, NodeKind, NodeType};
