//! Bottom-up folder hash aggregation.

use indexmap::IndexMap;
use itertools::Itertools;

use ctxgraph_core::{ContentHash, GraphNode, NodeId};

use crate::skeleton::Skeleton;

/// Compute the content hash of every folder in a skeleton.
///
/// Folders are processed deepest first so each folder's children are final
/// before the folder itself is hashed. A change anywhere in a subtree thus
/// changes every ancestor's hash, while untouched siblings keep theirs.
pub fn aggregate_hashes(skeleton: &mut Skeleton) {
    let order = skeleton.folders_deepest_first();
    aggregate_folder_hashes(&mut skeleton.nodes, &order);
}

/// Hash each folder in `folders` (which must be ordered children-first)
/// from its children's hashes.
///
/// Children without a hash are skipped; the rest are ordered by relative
/// path. A folder with no hashed children gets the hash of the empty string.
pub fn aggregate_folder_hashes(nodes: &mut IndexMap<NodeId, GraphNode>, folders: &[NodeId]) {
    for folder_id in folders {
        let Some(folder) = nodes.get(folder_id) else {
            continue;
        };

        let hash = ContentHash::of_children(
            folder
                .children()
                .iter()
                .filter_map(|id| nodes.get(id))
                .filter_map(|child| {
                    child
                        .content_hash
                        .as_ref()
                        .map(|hash| (child.relative_path.as_str(), hash))
                })
                .sorted_by(|a, b| a.0.cmp(b.0))
                .map(|(_, hash)| hash),
        );

        if let Some(folder) = nodes.get_mut(folder_id) {
            folder.content_hash = Some(hash);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn file(path: &str, bytes: &[u8]) -> GraphNode {
        let mut node = GraphNode::new_file(path.rsplit('/').next().unwrap(), path, bytes.len() as u64, Utc::now());
        node.content_hash = Some(ContentHash::of_bytes(bytes));
        node
    }

    fn insert(nodes: &mut IndexMap<NodeId, GraphNode>, node: GraphNode) -> NodeId {
        let id = node.id.clone();
        nodes.insert(id.clone(), node);
        id
    }

    #[test]
    fn test_empty_folder_hashes_empty_string() {
        let mut nodes = IndexMap::new();
        let root = insert(&mut nodes, GraphNode::new_folder("root", ""));

        aggregate_folder_hashes(&mut nodes, &[root.clone()]);
        assert_eq!(nodes[&root].content_hash, Some(ContentHash::of_bytes(b"")));
    }

    #[test]
    fn test_children_sorted_by_relative_path() {
        let mut nodes = IndexMap::new();
        let b = insert(&mut nodes, file("b.md", b"B"));
        let a = insert(&mut nodes, file("a.md", b"A"));
        let mut root = GraphNode::new_folder("root", "");
        // Child list order deliberately differs from path order.
        root.push_child(b.clone());
        root.push_child(a.clone());
        let root = insert(&mut nodes, root);

        aggregate_folder_hashes(&mut nodes, &[root.clone()]);

        let expected = ContentHash::of_children([
            nodes[&a].content_hash.as_ref().unwrap(),
            nodes[&b].content_hash.as_ref().unwrap(),
        ]);
        assert_eq!(nodes[&root].content_hash, Some(expected));
    }

    #[test]
    fn test_unhashed_children_skipped() {
        let mut nodes = IndexMap::new();
        let a = insert(&mut nodes, file("a.md", b"A"));
        let mut broken = file("broken.md", b"");
        broken.content_hash = None;
        let broken = insert(&mut nodes, broken);
        let mut root = GraphNode::new_folder("root", "");
        root.push_child(a.clone());
        root.push_child(broken);
        let root = insert(&mut nodes, root);

        aggregate_folder_hashes(&mut nodes, &[root.clone()]);
        let expected = ContentHash::of_children([nodes[&a].content_hash.as_ref().unwrap()]);
        assert_eq!(nodes[&root].content_hash, Some(expected));
    }

    #[test]
    fn test_nested_folders_propagate() {
        let mut nodes = IndexMap::new();
        let leaf = insert(&mut nodes, file("sub/x.md", b"X"));
        let mut sub = GraphNode::new_folder("sub", "sub");
        sub.push_child(leaf);
        let sub = insert(&mut nodes, sub);
        let mut root = GraphNode::new_folder("root", "");
        root.push_child(sub.clone());
        let root = insert(&mut nodes, root);

        aggregate_folder_hashes(&mut nodes, &[sub.clone(), root.clone()]);
        let sub_hash = nodes[&sub].content_hash.unwrap();
        assert_eq!(
            nodes[&root].content_hash,
            Some(ContentHash::of_children([&sub_hash]))
        );
    }
}
