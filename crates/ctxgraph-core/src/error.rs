//! Error, warning and ignore types for scanning operations.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};
use thiserror::Error;

use crate::node::NodeType;

/// Fatal scan errors. Any of these aborts a sync before anything is saved.
#[derive(Debug, Error)]
pub enum ScanError {
    /// Permission denied for a path.
    #[error("Permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    /// Path not found.
    #[error("Path not found: {path}")]
    NotFound { path: PathBuf },

    /// Generic I/O error.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Root path is not a directory.
    #[error("Root path is not a directory: {path}")]
    NotADirectory { path: PathBuf },

    /// The tree has more nodes than the configured ceiling.
    #[error("Folder has {found} indexable entries, more than the limit of {limit}")]
    NodeLimitExceeded { limit: usize, found: usize },

    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },
}

impl ScanError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            _ => Self::Io { path, source },
        }
    }
}

/// Kind of scan warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// A directory resolved to a location that was already visited.
    CycleDetected,
    /// A symlink points at a directory that was already visited.
    SymlinkCycle,
    /// Error reading a directory.
    ReadError,
    /// Error reading metadata.
    MetadataError,
}

/// Non-fatal warning encountered during a scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanWarning {
    /// Relative path where the warning occurred.
    pub relative_path: String,
    /// Human-readable message.
    pub message: String,
    /// Kind of warning.
    pub kind: WarningKind,
}

impl ScanWarning {
    /// Create a new scan warning.
    pub fn new(relative_path: impl Into<String>, message: impl Into<String>, kind: WarningKind) -> Self {
        Self {
            relative_path: relative_path.into(),
            message: message.into(),
            kind,
        }
    }

    /// A directory whose real path was already visited.
    pub fn cycle_detected(relative_path: impl Into<String>, real_path: &std::path::Path) -> Self {
        let relative_path = relative_path.into();
        let message = format!(
            "Skipping {relative_path}: {} was already visited",
            real_path.display()
        );
        Self::new(relative_path, message, WarningKind::CycleDetected)
    }

    /// A symlink whose target directory was already visited.
    pub fn symlink_cycle(relative_path: impl Into<String>, target: &std::path::Path) -> Self {
        let relative_path = relative_path.into();
        let message = format!(
            "Symlink {relative_path} points to already visited directory {}",
            target.display()
        );
        Self::new(relative_path, message, WarningKind::SymlinkCycle)
    }

    /// Create a read error warning.
    pub fn read_error(relative_path: impl Into<String>, error: &std::io::Error) -> Self {
        Self::new(relative_path, format!("Read error: {error}"), WarningKind::ReadError)
    }

    /// Create a metadata error warning.
    pub fn metadata_error(relative_path: impl Into<String>, error: &std::io::Error) -> Self {
        Self::new(relative_path, format!("Metadata error: {error}"), WarningKind::MetadataError)
    }
}

/// Why an entry was left out of the graph.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum IgnoreReason {
    /// Matched by a `.gitignore` rule.
    Gitignore,
    /// Matched by a user exclusion.
    Excluded,
    /// Hidden (dot-prefixed) directory.
    Hidden,
    /// Folder generated by ctxgraph itself.
    Generated,
    /// Symbolic links are never followed.
    Symlink,
    /// Extension is not indexed.
    UnsupportedExtension,
    /// File is over the size ceiling.
    FileTooLarge,
    /// Entry name is not valid UTF-8.
    InvalidName,
}

impl IgnoreReason {
    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

/// An entry the scanner saw but did not index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IgnoredEntry {
    pub relative_path: String,
    pub reason: IgnoreReason,
}

impl IgnoredEntry {
    pub fn new(relative_path: impl Into<String>, reason: IgnoreReason) -> Self {
        Self {
            relative_path: relative_path.into(),
            reason,
        }
    }
}

/// A failure confined to one node. The node is kept without a summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeError {
    pub relative_path: String,
    pub node_type: NodeType,
    pub message: String,
}

impl NodeError {
    pub fn new(relative_path: impl Into<String>, node_type: NodeType, message: impl Into<String>) -> Self {
        Self {
            relative_path: relative_path.into(),
            node_type,
            message: message.into(),
        }
    }
}

impl fmt::Display for NodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.node_type, self.relative_path, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_error_io() {
        let err = ScanError::io(
            "/test/path",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(matches!(err, ScanError::PermissionDenied { .. }));
    }

    #[test]
    fn test_node_limit_message() {
        let err = ScanError::NodeLimitExceeded { limit: 3, found: 4 };
        let message = err.to_string();
        assert!(message.contains('3'));
        assert!(message.contains('4'));
    }

    #[test]
    fn test_symlink_cycle_warning() {
        let warning = ScanWarning::symlink_cycle("sub/loop", std::path::Path::new("/data/root"));
        assert_eq!(warning.kind, WarningKind::SymlinkCycle);
        assert_eq!(warning.relative_path, "sub/loop");
        assert!(warning.message.contains("sub/loop"));
    }

    #[test]
    fn test_ignore_reason_display_matches_serde() {
        let json = serde_json::to_string(&IgnoreReason::UnsupportedExtension).unwrap();
        assert_eq!(json, format!("\"{}\"", IgnoreReason::UnsupportedExtension));
        assert_eq!(IgnoreReason::InvalidName.as_str(), "invalid_name");
        assert_eq!(
            "file_too_large".parse::<IgnoreReason>().unwrap(),
            IgnoreReason::FileTooLarge
        );
    }
}
