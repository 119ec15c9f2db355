//! Scan configuration types.

use std::path::{Path, PathBuf};

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

/// Default ceiling on the number of nodes (files + folders) in one graph.
pub const DEFAULT_MAX_NODES: usize = 300;

/// Files larger than this are ignored without being opened.
pub const DEFAULT_MAX_FILE_BYTES: u64 = 1024 * 1024;

/// Extensions indexed by default.
pub const DEFAULT_EXTENSIONS: &[&str] = &["md", "txt"];

/// Configuration for a scan.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct ScanConfig {
    /// Root path to scan.
    pub root: PathBuf,

    /// Maximum number of nodes the scan may produce.
    #[builder(default = "DEFAULT_MAX_NODES")]
    #[serde(default = "default_max_nodes")]
    pub max_nodes: usize,

    /// Maximum size of an indexed file, in bytes.
    #[builder(default = "DEFAULT_MAX_FILE_BYTES")]
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: u64,

    /// Relative paths excluded by the user (exact path or path prefix).
    #[builder(default)]
    #[serde(default)]
    pub exclusions: Vec<String>,

    /// File extensions to index, without the leading dot.
    #[builder(default = "default_extensions()")]
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

fn default_max_nodes() -> usize {
    DEFAULT_MAX_NODES
}

fn default_max_file_bytes() -> u64 {
    DEFAULT_MAX_FILE_BYTES
}

fn default_extensions() -> Vec<String> {
    DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect()
}

impl ScanConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(ref root) = self.root {
            if root.as_os_str().is_empty() {
                return Err("Root path cannot be empty".to_string());
            }
        } else {
            return Err("Root path is required".to_string());
        }
        if self.max_nodes == Some(0) {
            return Err("max_nodes must be at least 1".to_string());
        }
        Ok(())
    }
}

impl ScanConfig {
    /// Create a new scan config builder.
    pub fn builder() -> ScanConfigBuilder {
        ScanConfigBuilder::default()
    }

    /// Create a config with default limits for scanning a path.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            max_nodes: DEFAULT_MAX_NODES,
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
            exclusions: Vec::new(),
            extensions: default_extensions(),
        }
    }

    /// Check whether a file name carries an indexed extension.
    pub fn is_supported_file(&self, name: &str) -> bool {
        let Some(ext) = Path::new(name).extension().and_then(|e| e.to_str()) else {
            return false;
        };
        self.extensions
            .iter()
            .any(|allowed| allowed.trim_start_matches('.').eq_ignore_ascii_case(ext))
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self::new(".")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = ScanConfig::builder()
            .root("/home/user/notes")
            .max_nodes(50usize)
            .exclusions(vec!["drafts".to_string()])
            .build()
            .unwrap();

        assert_eq!(config.root, PathBuf::from("/home/user/notes"));
        assert_eq!(config.max_nodes, 50);
        assert_eq!(config.max_file_bytes, DEFAULT_MAX_FILE_BYTES);
        assert_eq!(config.exclusions, vec!["drafts".to_string()]);
        assert_eq!(config.extensions, vec!["md".to_string(), "txt".to_string()]);
    }

    #[test]
    fn test_builder_rejects_zero_nodes() {
        let result = ScanConfig::builder().root("/tmp").max_nodes(0usize).build();
        assert!(result.is_err());
    }

    #[test]
    fn test_builder_requires_root() {
        assert!(ScanConfig::builder().build().is_err());
        assert!(ScanConfig::builder().root("").build().is_err());
    }

    #[test]
    fn test_supported_extensions() {
        let config = ScanConfig::new("/tmp");
        assert!(config.is_supported_file("notes.md"));
        assert!(config.is_supported_file("README.MD"));
        assert!(config.is_supported_file("todo.txt"));
        assert!(!config.is_supported_file("image.png"));
        assert!(!config.is_supported_file("Makefile"));
        assert!(!config.is_supported_file(".gitignore"));
    }
}
