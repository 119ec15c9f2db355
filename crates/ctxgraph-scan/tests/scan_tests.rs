use std::fs;
use std::path::Path;

use ctxgraph_scan::{
    ContentHash, IgnoreReason, IgnoredEntry, NodeId, NodeType, ScanConfig, Skeleton, WarningKind,
    scan_tree,
};
use tempfile::TempDir;

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

fn scan(root: &Path) -> Skeleton {
    scan_tree(&ScanConfig::new(root)).unwrap()
}

fn hash_of(skeleton: &Skeleton, rel: &str, node_type: NodeType) -> ContentHash {
    skeleton
        .get(&NodeId::derive(rel, node_type))
        .and_then(|n| n.content_hash)
        .unwrap_or_else(|| panic!("no hash for {rel}"))
}

fn has_file(skeleton: &Skeleton, rel: &str) -> bool {
    skeleton.get(&NodeId::derive(rel, NodeType::File)).is_some()
}

fn notes_tree() -> TempDir {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    write(root, "alpha.md", "Alpha");
    write(root, "sub/beta.txt", "Beta");
    write(root, "other/gamma.md", "Gamma");
    temp
}

#[test]
fn test_every_node_is_hashed() {
    let temp = notes_tree();
    let skeleton = scan(temp.path());

    assert!(skeleton.nodes.values().all(|n| n.content_hash.is_some()));
    assert_eq!(
        hash_of(&skeleton, "alpha.md", NodeType::File),
        ContentHash::of_bytes(b"Alpha")
    );

    let beta = hash_of(&skeleton, "sub/beta.txt", NodeType::File);
    assert_eq!(
        hash_of(&skeleton, "sub", NodeType::Folder),
        ContentHash::of_children([&beta])
    );
}

#[test]
fn test_repeated_scans_are_identical() {
    let temp = notes_tree();
    let first = scan(temp.path());
    let second = scan(temp.path());

    assert_eq!(first.root_id, second.root_id);
    let first_ids: Vec<_> = first.nodes.keys().collect();
    let second_ids: Vec<_> = second.nodes.keys().collect();
    assert_eq!(first_ids, second_ids);
    for (id, node) in &first.nodes {
        assert_eq!(node.content_hash, second.nodes[id].content_hash);
        assert_eq!(node.children(), second.nodes[id].children());
    }
}

#[test]
fn test_change_propagates_to_ancestors_only() {
    let temp = notes_tree();
    let before = scan(temp.path());
    write(temp.path(), "sub/beta.txt", "Beta2");
    let after = scan(temp.path());

    for (rel, node_type) in [("sub/beta.txt", NodeType::File), ("sub", NodeType::Folder), ("", NodeType::Folder)] {
        assert_ne!(
            hash_of(&before, rel, node_type),
            hash_of(&after, rel, node_type),
            "{rel} should change"
        );
    }
    for (rel, node_type) in [("alpha.md", NodeType::File), ("other", NodeType::Folder), ("other/gamma.md", NodeType::File)] {
        assert_eq!(
            hash_of(&before, rel, node_type),
            hash_of(&after, rel, node_type),
            "{rel} should be unchanged"
        );
    }
}

#[test]
fn test_gitignore_negation_reincludes() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    write(root, ".gitignore", "*.md\n!keep.md\n");
    write(root, "keep.md", "keep");
    write(root, "drop.md", "drop");

    let skeleton = scan(root);
    assert!(has_file(&skeleton, "keep.md"));
    assert!(!has_file(&skeleton, "drop.md"));
    assert!(skeleton.ignores.contains(&IgnoredEntry::new("drop.md", IgnoreReason::Gitignore)));
}

#[test]
fn test_directory_only_rule_skips_files() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    write(root, ".gitignore", "cache/\nnotes.md/\n");
    write(root, "notes.md", "a file, not a folder");
    write(root, "cache", "plain file named cache");
    write(root, "sub/cache/inner.md", "ignored");

    let skeleton = scan(root);
    assert!(has_file(&skeleton, "notes.md"));
    assert!(skeleton.ignores.contains(&IgnoredEntry::new("cache", IgnoreReason::UnsupportedExtension)));
    assert!(skeleton.ignores.contains(&IgnoredEntry::new("sub/cache", IgnoreReason::Gitignore)));
    assert!(!has_file(&skeleton, "sub/cache/inner.md"));
}

#[test]
fn test_nested_gitignore_is_scoped() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    write(root, "a/.gitignore", "/local.md\n");
    write(root, "a/local.md", "excluded here");
    write(root, "a/deeper/local.md", "anchored rule does not reach");
    write(root, "b/local.md", "sibling subtree");

    let skeleton = scan(root);
    assert!(!has_file(&skeleton, "a/local.md"));
    assert!(has_file(&skeleton, "a/deeper/local.md"));
    assert!(has_file(&skeleton, "b/local.md"));
}

#[test]
fn test_builtin_and_user_exclusions() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    write(root, ".obsidian/config.md", "hidden");
    write(root, "ctxgraph-captures/shot.md", "generated");
    write(root, "client-extra-context/ctx.md", "generated");
    write(root, "drafts/wip.md", "user excluded");
    write(root, "kept.md", "kept");

    let config = ScanConfig::builder()
        .root(root)
        .exclusions(vec!["drafts".to_string()])
        .build()
        .unwrap();
    let skeleton = scan_tree(&config).unwrap();

    assert_eq!(skeleton.counts.files, 1);
    assert_eq!(skeleton.counts.folders, 1);
    let reasons: Vec<_> = skeleton.ignores.iter().map(|i| (i.relative_path.as_str(), i.reason)).collect();
    assert!(reasons.contains(&(".obsidian", IgnoreReason::Hidden)));
    assert!(reasons.contains(&("ctxgraph-captures", IgnoreReason::Generated)));
    assert!(reasons.contains(&("client-extra-context", IgnoreReason::Generated)));
    assert!(reasons.contains(&("drafts", IgnoreReason::Excluded)));
}

#[test]
fn test_node_limit_is_fatal_at_n_plus_one() {
    let temp = notes_tree();
    // root, sub, other + 3 files
    let ok = ScanConfig::builder().root(temp.path()).max_nodes(6usize).build().unwrap();
    assert!(scan_tree(&ok).is_ok());

    let tight = ScanConfig::builder().root(temp.path()).max_nodes(5usize).build().unwrap();
    assert!(scan_tree(&tight).is_err());
}

#[cfg(unix)]
#[test]
fn test_symlink_to_ancestor_warns_once() {
    let temp = notes_tree();
    let root = temp.path();
    std::os::unix::fs::symlink(root, root.join("sub/loop")).unwrap();

    let skeleton = scan(root);
    let cycles: Vec<_> = skeleton
        .warnings
        .iter()
        .filter(|w| w.kind == WarningKind::SymlinkCycle)
        .collect();
    assert_eq!(cycles.len(), 1);
    assert_eq!(cycles[0].relative_path, "sub/loop");
    assert!(skeleton.ignores.contains(&IgnoredEntry::new("sub/loop", IgnoreReason::Symlink)));
    assert_eq!(skeleton.counts.files, 3);
}

#[cfg(unix)]
#[test]
fn test_symlinked_file_not_indexed() {
    let temp = notes_tree();
    let root = temp.path();
    std::os::unix::fs::symlink(root.join("alpha.md"), root.join("link.md")).unwrap();

    let skeleton = scan(root);
    assert!(!has_file(&skeleton, "link.md"));
    assert!(skeleton.warnings.is_empty());
}

#[test]
fn test_skeleton_json_omits_contents() {
    let temp = notes_tree();
    let skeleton = scan(temp.path());
    let json = serde_json::to_string(&skeleton).unwrap();
    assert!(json.contains("\"fileIds\""));
    assert!(!json.contains("Gamma"));
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode)).unwrap();
}

#[cfg(unix)]
#[test]
fn test_unreadable_file_kept_without_hash() {
    let temp = notes_tree();
    let root = temp.path();
    let locked = root.join("sub/locked.md");
    fs::write(&locked, "secret").unwrap();
    set_mode(&locked, 0o000);
    if fs::read(&locked).is_ok() {
        // Permission bits are not enforced for this user.
        set_mode(&locked, 0o644);
        return;
    }

    let skeleton = scan(root);
    set_mode(&locked, 0o644);

    let id = NodeId::derive("sub/locked.md", NodeType::File);
    let node = skeleton.get(&id).expect("unreadable file is still a node");
    assert!(node.content_hash.is_none());
    assert!(skeleton.content(&id).is_none());
    assert_eq!(skeleton.errors.len(), 1);
    assert_eq!(skeleton.errors[0].relative_path, "sub/locked.md");
    assert_eq!(skeleton.errors[0].node_type, NodeType::File);

    // The folder hash only covers the readable sibling.
    let beta = hash_of(&skeleton, "sub/beta.txt", NodeType::File);
    assert_eq!(
        hash_of(&skeleton, "sub", NodeType::Folder),
        ContentHash::of_children([&beta])
    );
}

#[cfg(unix)]
#[test]
fn test_unreadable_directory_kept_empty() {
    let temp = notes_tree();
    let root = temp.path();
    write(root, "vault/hidden.md", "Hidden");
    let vault = root.join("vault");
    set_mode(&vault, 0o000);
    if fs::read_dir(&vault).is_ok() {
        set_mode(&vault, 0o755);
        return;
    }

    let skeleton = scan(root);
    set_mode(&vault, 0o755);

    let vault_id = NodeId::derive("vault", NodeType::Folder);
    let folder = skeleton.get(&vault_id).expect("unreadable folder is still a node");
    assert!(folder.children().is_empty());
    assert!(!has_file(&skeleton, "vault/hidden.md"));
    assert_eq!(
        folder.content_hash,
        Some(ContentHash::of_children(std::iter::empty::<&ContentHash>()))
    );

    let read_errors: Vec<_> = skeleton
        .warnings
        .iter()
        .filter(|w| w.kind == WarningKind::ReadError)
        .collect();
    assert_eq!(read_errors.len(), 1);
    assert_eq!(read_errors[0].relative_path, "vault");
    assert!(skeleton.errors.is_empty());
}

#[cfg(unix)]
#[test]
fn test_non_utf8_names_are_skipped() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let temp = notes_tree();
    let root = temp.path();
    let first = root.join(OsStr::from_bytes(b"x\xff.md"));
    let second = root.join(OsStr::from_bytes(b"x\xfe.md"));
    if fs::write(&first, "one").is_err() || fs::write(&second, "two").is_err() {
        // Filesystem refuses names that are not UTF-8.
        return;
    }

    let skeleton = scan(root);

    assert_eq!(skeleton.counts.files, 3);
    assert_eq!(skeleton.file_ids.len(), 3);
    assert_eq!(skeleton.nodes.len(), 6);
    let invalid: Vec<_> = skeleton
        .ignores
        .iter()
        .filter(|i| i.reason == IgnoreReason::InvalidName)
        .collect();
    assert_eq!(invalid.len(), 2);

    let root_node = skeleton.root().unwrap();
    let mut children = root_node.children().to_vec();
    children.dedup();
    assert_eq!(children.len(), root_node.children().len());
}
