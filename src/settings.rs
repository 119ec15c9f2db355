//! User settings loaded from `settings.toml`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use color_eyre::eyre::{Context, Result, eyre};
use serde::{Deserialize, Serialize};

use ctxgraph_core::ScanConfig;
use ctxgraph_sync::{JsonGraphStore, default_store_dir};

/// Settings file contents. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Node ceiling for every scan.
    #[serde(default)]
    pub max_nodes: Option<usize>,

    /// Largest file that is indexed, in bytes.
    #[serde(default)]
    pub max_file_bytes: Option<u64>,

    /// Relative paths to leave out of every graph.
    #[serde(default)]
    pub exclusions: Vec<String>,

    /// Where graphs are stored.
    #[serde(default)]
    pub store_dir: Option<PathBuf>,
}

impl Settings {
    /// Default settings location: `<config_dir>/ctxgraph/settings.toml`.
    pub fn default_path() -> PathBuf {
        default_store_dir().join("settings.toml")
    }

    /// Load settings from `path`, or from [`Settings::default_path`].
    ///
    /// A missing default file yields defaults; a missing explicit file is an
    /// error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, explicit) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => (Self::default_path(), false),
        };

        match fs::read_to_string(&path) {
            Ok(content) => Self::parse(&content)
                .wrap_err_with(|| format!("Invalid settings file {}", path.display())),
            Err(e) if e.kind() == io::ErrorKind::NotFound && !explicit => Ok(Self::default()),
            Err(e) => Err(e).wrap_err_with(|| format!("Failed to read {}", path.display())),
        }
    }

    /// Parse settings from TOML text.
    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Build the scan configuration for `root`, with command-line values
    /// taking precedence over the file.
    pub fn scan_config(
        &self,
        root: &Path,
        max_nodes: Option<usize>,
        extra_exclusions: &[String],
    ) -> Result<ScanConfig> {
        let mut builder = ScanConfig::builder();
        builder.root(root);
        if let Some(max_nodes) = max_nodes.or(self.max_nodes) {
            builder.max_nodes(max_nodes);
        }
        if let Some(max_file_bytes) = self.max_file_bytes {
            builder.max_file_bytes(max_file_bytes);
        }
        builder.exclusions(
            self.exclusions
                .iter()
                .chain(extra_exclusions)
                .cloned()
                .collect::<Vec<_>>(),
        );

        builder.build().map_err(|e| eyre!("Invalid scan settings: {e}"))
    }

    /// Store directory, with `--store-dir` taking precedence over the file.
    pub fn store_dir(&self, flag: Option<&Path>) -> PathBuf {
        flag.map(Path::to_path_buf)
            .or_else(|| self.store_dir.clone())
            .unwrap_or_else(default_store_dir)
    }

    /// Graph store for `root`.
    pub fn store_for(&self, flag: Option<&Path>, root: &Path) -> JsonGraphStore {
        JsonGraphStore::for_root(self.store_dir(flag), root)
    }
}
