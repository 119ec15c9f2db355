//! Visited-directory tracking for cycle detection.

use std::collections::HashSet;
use std::fs::Metadata;
use std::path::{Path, PathBuf};

#[cfg(unix)]
use std::os::unix::fs::MetadataExt;

/// (device, inode) pair identifying a directory on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct InodeKey {
    device: u64,
    inode: u64,
}

/// Tracks directories already entered during a scan.
///
/// A directory is identified by its canonical path and, on Unix, by its
/// (device, inode) pair as well, so bind mounts and hardlinked directories
/// that canonicalize to different paths are still recognised.
#[derive(Debug, Default)]
pub struct VisitedDirs {
    paths: HashSet<PathBuf>,
    inodes: HashSet<InodeKey>,
}

impl VisitedDirs {
    /// Create a new, empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a directory. Returns `true` if this is the first visit.
    pub fn visit(&mut self, real_path: &Path, metadata: &Metadata) -> bool {
        let seen = self.has_seen(real_path, metadata);
        self.paths.insert(real_path.to_path_buf());
        if let Some(key) = inode_key(metadata) {
            self.inodes.insert(key);
        }
        !seen
    }

    /// Check if a directory has been visited (without recording it).
    pub fn has_seen(&self, real_path: &Path, metadata: &Metadata) -> bool {
        self.paths.contains(real_path)
            || inode_key(metadata).is_some_and(|key| self.inodes.contains(&key))
    }

    /// Number of distinct directories visited.
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Check if no directories have been visited.
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

#[cfg(unix)]
fn inode_key(metadata: &Metadata) -> Option<InodeKey> {
    Some(InodeKey {
        device: metadata.dev(),
        inode: metadata.ino(),
    })
}

#[cfg(not(unix))]
fn inode_key(_metadata: &Metadata) -> Option<InodeKey> {
    None // Windows doesn't expose inodes through std
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_visit_once() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().canonicalize().unwrap();
        let meta = std::fs::metadata(&path).unwrap();

        let mut visited = VisitedDirs::new();
        assert!(visited.visit(&path, &meta));
        assert!(!visited.visit(&path, &meta));
        assert_eq!(visited.len(), 1);
    }

    #[test]
    fn test_distinct_directories() {
        let temp = TempDir::new().unwrap();
        let a = temp.path().join("a");
        let b = temp.path().join("b");
        std::fs::create_dir(&a).unwrap();
        std::fs::create_dir(&b).unwrap();

        let mut visited = VisitedDirs::new();
        assert!(visited.visit(&a, &std::fs::metadata(&a).unwrap()));
        assert!(visited.visit(&b, &std::fs::metadata(&b).unwrap()));
        assert!(visited.has_seen(&a, &std::fs::metadata(&a).unwrap()));
    }
}
