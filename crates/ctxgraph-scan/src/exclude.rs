//! Exclusion engine: gitignore scopes, user exclusions and built-in folders.

use ctxgraph_core::IgnoreReason;

use crate::gitignore::Gitignore;

/// Folder where screen captures are stored.
pub const CAPTURES_DIR_NAME: &str = "ctxgraph-captures";

/// Folder where analysis output is written.
pub const ANALYSIS_DIR_NAME: &str = "ctxgraph-analysis";

/// Suffix of folders holding extra context attached by the user.
pub const EXTRA_CONTEXT_SUFFIX: &str = "-extra-context";

/// Decides whether a root-relative path is left out of the graph.
///
/// Gitignore scopes are pushed when the walker enters a directory that
/// defines a `.gitignore` and popped when it leaves, so each file only ever
/// applies to its own subtree.
#[derive(Debug, Clone, Default)]
pub struct ExclusionEngine {
    exclusions: Vec<String>,
    scopes: Vec<Gitignore>,
}

impl ExclusionEngine {
    /// Create an engine from user exclusions (exact path or path prefix).
    pub fn new<S: AsRef<str>>(exclusions: &[S]) -> Self {
        Self {
            exclusions: exclusions
                .iter()
                .filter_map(|e| normalize_exclusion(e.as_ref()))
                .collect(),
            scopes: Vec::new(),
        }
    }

    /// Activate a `.gitignore` for its subtree.
    pub fn push_gitignore(&mut self, gitignore: Gitignore) {
        self.scopes.push(gitignore);
    }

    /// Deactivate the most recently pushed `.gitignore`.
    pub fn pop_gitignore(&mut self) -> Option<Gitignore> {
        self.scopes.pop()
    }

    /// Number of active gitignore scopes.
    pub fn scope_depth(&self) -> usize {
        self.scopes.len()
    }

    /// Normalized user exclusions.
    pub fn exclusions(&self) -> &[String] {
        &self.exclusions
    }

    /// Check a path, returning the first reason it is excluded.
    ///
    /// Checks run in order: gitignore, user exclusions, hidden directories,
    /// generated folders.
    pub fn check(&self, relative_path: &str, is_dir: bool) -> Option<IgnoreReason> {
        if self
            .scopes
            .iter()
            .any(|scope| scope.is_ignored(relative_path, is_dir))
        {
            return Some(IgnoreReason::Gitignore);
        }

        if self.is_user_excluded(relative_path) {
            return Some(IgnoreReason::Excluded);
        }

        if is_dir {
            let name = relative_path.rsplit('/').next().unwrap_or(relative_path);
            if name.starts_with('.') {
                return Some(IgnoreReason::Hidden);
            }
            if is_generated_dir(name) {
                return Some(IgnoreReason::Generated);
            }
        }

        None
    }

    /// Check if a path is excluded for any reason.
    pub fn is_excluded(&self, relative_path: &str, is_dir: bool) -> bool {
        self.check(relative_path, is_dir).is_some()
    }

    fn is_user_excluded(&self, relative_path: &str) -> bool {
        self.exclusions.iter().any(|ex| {
            relative_path == ex
                || relative_path
                    .strip_prefix(ex.as_str())
                    .is_some_and(|rest| rest.starts_with('/'))
        })
    }
}

/// Check whether a folder name is one ctxgraph generates itself.
pub fn is_generated_dir(name: &str) -> bool {
    name == CAPTURES_DIR_NAME || name == ANALYSIS_DIR_NAME || name.ends_with(EXTRA_CONTEXT_SUFFIX)
}

fn normalize_exclusion(raw: &str) -> Option<String> {
    let mut path = raw.trim().replace('\\', "/");
    while let Some(rest) = path.strip_prefix("./") {
        path = rest.to_string();
    }
    let path = path.trim_matches('/');
    (!path.is_empty()).then(|| path.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_exclusions_match_exact_and_prefix() {
        let engine = ExclusionEngine::new(&["drafts", "./notes/private/"]);
        assert_eq!(engine.check("drafts", true), Some(IgnoreReason::Excluded));
        assert_eq!(engine.check("drafts/a.md", false), Some(IgnoreReason::Excluded));
        assert_eq!(engine.check("notes/private", true), Some(IgnoreReason::Excluded));
        assert!(!engine.is_excluded("drafts2", true));
        assert!(!engine.is_excluded("notes", true));
    }

    #[test]
    fn test_blank_exclusions_dropped() {
        let engine = ExclusionEngine::new(&["", "  ", "/"]);
        assert!(engine.exclusions().is_empty());
    }

    #[test]
    fn test_hidden_directories_only() {
        let engine = ExclusionEngine::default();
        assert_eq!(engine.check(".git", true), Some(IgnoreReason::Hidden));
        assert_eq!(engine.check("a/.cache", true), Some(IgnoreReason::Hidden));
        assert_eq!(engine.check(".notes.md", false), None);
    }

    #[test]
    fn test_generated_folders() {
        let engine = ExclusionEngine::default();
        assert_eq!(engine.check(CAPTURES_DIR_NAME, true), Some(IgnoreReason::Generated));
        assert_eq!(engine.check("x/ctxgraph-analysis", true), Some(IgnoreReason::Generated));
        assert_eq!(engine.check("project-extra-context", true), Some(IgnoreReason::Generated));
        assert_eq!(engine.check("project-extra-context", false), None);
    }

    #[test]
    fn test_gitignore_wins_over_other_reasons() {
        let mut engine = ExclusionEngine::new(&[".hidden"]);
        engine.push_gitignore(Gitignore::parse("", ".hidden/\n"));
        assert_eq!(engine.check(".hidden", true), Some(IgnoreReason::Gitignore));
    }

    #[test]
    fn test_scopes_are_independent() {
        let mut engine = ExclusionEngine::default();
        engine.push_gitignore(Gitignore::parse("", "*.txt\n"));
        // A negation in a nested file cannot undo the parent's match.
        engine.push_gitignore(Gitignore::parse("sub", "!keep.txt\n"));
        assert!(engine.is_excluded("sub/keep.txt", false));

        engine.pop_gitignore();
        engine.pop_gitignore();
        assert_eq!(engine.scope_depth(), 0);
        assert!(!engine.is_excluded("sub/keep.txt", false));
    }
}
