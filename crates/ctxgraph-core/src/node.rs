//! Graph node types.

use std::fmt;

use chrono::{DateTime, Utc};
use compact_str::CompactString;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

/// Stable identifier for a node.
///
/// Ids are derived from `(relative_path, type)` only, so a rescan of the same
/// tree always produces the same ids. This is what lets a sync find the
/// previous record of a node and reuse its summary.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(CompactString);

impl NodeId {
    /// Wrap an existing id string (e.g. one read back from a stored graph).
    pub fn new(id: impl Into<CompactString>) -> Self {
        Self(id.into())
    }

    /// Derive the id of the node at `relative_path` with the given type.
    pub fn derive(relative_path: &str, node_type: NodeType) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(node_type.as_str().as_bytes());
        hasher.update(b":");
        hasher.update(relative_path.as_bytes());
        let digest = hasher.finalize();
        Self(CompactString::new(hex::encode(&digest.as_bytes()[..16])))
    }

    /// Borrow the id as a string slice.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// SHA-256 content hash.
///
/// Files hash their raw bytes; folders hash their children's hashes (see
/// [`ContentHash::of_children`]). Serialized as a lowercase hex string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash(pub [u8; 32]);

impl ContentHash {
    /// Create a new ContentHash from raw digest bytes.
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Hash a file's raw bytes.
    pub fn of_bytes(data: &[u8]) -> Self {
        Self(Sha256::digest(data).into())
    }

    /// Aggregate child hashes into a folder hash.
    ///
    /// The hex form of each child hash is fed to SHA-256 in iteration order
    /// with no delimiter. Callers are responsible for ordering the children;
    /// an empty iterator yields the hash of the empty string.
    pub fn of_children<'a>(children: impl IntoIterator<Item = &'a ContentHash>) -> Self {
        let mut hasher = Sha256::new();
        for child in children {
            hasher.update(child.to_hex().as_bytes());
        }
        Self(hasher.finalize().into())
    }

    /// Get the hash as a hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse a 64 character hex string.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for ContentHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ContentHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Whether a node is a file or a folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    File,
    Folder,
}

impl NodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Folder => "folder",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Type-specific node data. Serialized with a `type` discriminator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NodeKind {
    /// Indexed text file.
    File {
        #[serde(rename = "sizeBytes")]
        size_bytes: u64,
        #[serde(rename = "modifiedAt")]
        modified_at: DateTime<Utc>,
    },
    /// Folder with its children in directory-entry order.
    Folder { children: Vec<NodeId> },
}

/// A single file or folder in the context graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    /// Stable id, see [`NodeId::derive`].
    pub id: NodeId,

    /// File/folder name (not full path).
    pub name: CompactString,

    /// POSIX-style path relative to the indexed root; empty for the root.
    pub relative_path: String,

    /// Node type and associated metadata.
    #[serde(flatten)]
    pub kind: NodeKind,

    /// Content hash. `None` only for files that could not be read.
    #[serde(default)]
    pub content_hash: Option<ContentHash>,

    /// Generated summary, if any. Folders without summarized files hold `""`.
    #[serde(default)]
    pub summary: Option<String>,

    /// When `summary` was generated.
    #[serde(default)]
    pub summary_updated_at: Option<DateTime<Utc>>,
}

impl GraphNode {
    /// Create a new file node. The id is derived from `relative_path`.
    pub fn new_file(
        name: impl Into<CompactString>,
        relative_path: impl Into<String>,
        size_bytes: u64,
        modified_at: DateTime<Utc>,
    ) -> Self {
        let relative_path = relative_path.into();
        Self {
            id: NodeId::derive(&relative_path, NodeType::File),
            name: name.into(),
            relative_path,
            kind: NodeKind::File {
                size_bytes,
                modified_at,
            },
            content_hash: None,
            summary: None,
            summary_updated_at: None,
        }
    }

    /// Create a new, childless folder node.
    pub fn new_folder(name: impl Into<CompactString>, relative_path: impl Into<String>) -> Self {
        let relative_path = relative_path.into();
        Self {
            id: NodeId::derive(&relative_path, NodeType::Folder),
            name: name.into(),
            relative_path,
            kind: NodeKind::Folder {
                children: Vec::new(),
            },
            content_hash: None,
            summary: None,
            summary_updated_at: None,
        }
    }

    pub fn node_type(&self) -> NodeType {
        match self.kind {
            NodeKind::File { .. } => NodeType::File,
            NodeKind::Folder { .. } => NodeType::Folder,
        }
    }

    pub fn is_file(&self) -> bool {
        matches!(self.kind, NodeKind::File { .. })
    }

    pub fn is_folder(&self) -> bool {
        matches!(self.kind, NodeKind::Folder { .. })
    }

    /// Child ids; empty for files.
    pub fn children(&self) -> &[NodeId] {
        match &self.kind {
            NodeKind::Folder { children } => children,
            NodeKind::File { .. } => &[],
        }
    }

    /// Append a child id. No-op on files.
    pub fn push_child(&mut self, child: NodeId) {
        if let NodeKind::Folder { children } = &mut self.kind {
            children.push(child);
        }
    }

    /// The summary, if present and not blank.
    pub fn non_blank_summary(&self) -> Option<&str> {
        self.summary.as_deref().filter(|s| !s.trim().is_empty())
    }

    /// Drop the summary and its timestamp.
    pub fn clear_summary(&mut self) {
        self.summary = None;
        self.summary_updated_at = None;
    }
}
