//! `.gitignore` parsing and matching.
//!
//! Each `.gitignore` file is compiled once per scan into a [`Gitignore`]
//! scoped to the directory that defines it. Rules are translated to regular
//! expressions:
//!
//! | pattern | regex |
//! |---------|-------|
//! | `*`     | `[^/]*` |
//! | `?`     | `[^/]` |
//! | `**/`   | `(?:.*/)?` (zero or more whole segments) |
//! | `**`    | `.*` |
//! | other   | escaped literal |

use std::path::Path;

use regex::Regex;

/// A single compiled `.gitignore` line.
#[derive(Debug, Clone)]
pub struct GitignoreRule {
    /// Pattern text after stripping `!`, the leading and trailing `/`.
    pub pattern: String,
    /// Pattern started with `/`.
    pub anchored: bool,
    /// Pattern contains a `/` (other than a trailing one).
    pub has_slash: bool,
    /// Pattern started with `!`.
    pub negate: bool,
    /// Pattern ended with `/`.
    pub directory_only: bool,
    matcher: Regex,
}

impl GitignoreRule {
    /// Parse one line. Returns `None` for blank lines and comments.
    pub fn parse(line: &str) -> Option<Self> {
        let line = trim_trailing_spaces(line.trim_end_matches(['\r', '\n']));
        if line.is_empty() || line.starts_with('#') {
            return None;
        }

        let mut rest = line;
        let mut negate = false;
        if let Some(stripped) = rest.strip_prefix('!') {
            negate = true;
            rest = stripped;
        } else if rest.starts_with("\\!") || rest.starts_with("\\#") {
            rest = &rest[1..];
        }

        let mut directory_only = false;
        if let Some(stripped) = rest.strip_suffix('/') {
            directory_only = true;
            rest = stripped;
        }

        let mut anchored = false;
        if let Some(stripped) = rest.strip_prefix('/') {
            anchored = true;
            rest = stripped;
        }

        if rest.is_empty() {
            return None;
        }

        let has_slash = rest.contains('/');
        let source = format!("^{}$", translate(rest));
        let matcher = match Regex::new(&source) {
            Ok(re) => re,
            Err(err) => {
                tracing::warn!(target: "ctxgraph::scan", pattern = line, %err, "skipping invalid gitignore pattern");
                return None;
            }
        };

        Some(Self {
            pattern: rest.to_string(),
            anchored,
            has_slash,
            negate,
            directory_only,
            matcher,
        })
    }

    /// Test the rule against a path relative to the defining directory.
    ///
    /// Anchored and slashed patterns are matched against the whole path,
    /// others against the final component only, so they apply at any depth.
    pub fn matches(&self, path: &str, is_dir: bool) -> bool {
        if self.directory_only && !is_dir {
            return false;
        }
        if self.anchored || self.has_slash {
            self.matcher.is_match(path)
        } else {
            let name = path.rsplit('/').next().unwrap_or(path);
            self.matcher.is_match(name)
        }
    }
}

/// Strip unescaped trailing spaces; `\ ` keeps the space.
fn trim_trailing_spaces(line: &str) -> &str {
    let mut end = line.len();
    let bytes = line.as_bytes();
    while end > 0 && bytes[end - 1] == b' ' {
        if end >= 2 && bytes[end - 2] == b'\\' {
            break;
        }
        end -= 1;
    }
    &line[..end]
}

/// Translate a gitignore glob into a regex body.
fn translate(pattern: &str) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::with_capacity(pattern.len() * 2);
    let mut buf = [0u8; 4];
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '*' if chars.get(i + 1) == Some(&'*') => {
                if chars.get(i + 2) == Some(&'/') {
                    out.push_str("(?:.*/)?");
                    i += 3;
                } else {
                    out.push_str(".*");
                    i += 2;
                }
            }
            '*' => {
                out.push_str("[^/]*");
                i += 1;
            }
            '?' => {
                out.push_str("[^/]");
                i += 1;
            }
            '\\' if i + 1 < chars.len() => {
                out.push_str(&regex::escape(chars[i + 1].encode_utf8(&mut buf)));
                i += 2;
            }
            c => {
                out.push_str(&regex::escape(c.encode_utf8(&mut buf)));
                i += 1;
            }
        }
    }

    out
}

/// Rules from one `.gitignore`, scoped to the directory that defines it.
#[derive(Debug, Clone, Default)]
pub struct Gitignore {
    base: String,
    rules: Vec<GitignoreRule>,
}

impl Gitignore {
    /// Compile `.gitignore` text defined in the directory at root-relative
    /// path `base` (empty for the scan root).
    pub fn parse(base: impl Into<String>, content: &str) -> Self {
        Self {
            base: base.into(),
            rules: content.lines().filter_map(GitignoreRule::parse).collect(),
        }
    }

    /// Read and compile a `.gitignore` file.
    pub fn from_file(base: impl Into<String>, path: &Path) -> std::io::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::parse(base, &content))
    }

    /// Root-relative path of the defining directory.
    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn rules(&self) -> &[GitignoreRule] {
        &self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Evaluate all rules in file order against a path relative to this
    /// file's directory. The last matching rule decides: `Some(true)` means
    /// ignored, `Some(false)` means re-included by a negation, `None` means
    /// no rule matched.
    pub fn matched(&self, scoped_path: &str, is_dir: bool) -> Option<bool> {
        self.rules
            .iter()
            .rev()
            .find(|rule| rule.matches(scoped_path, is_dir))
            .map(|rule| !rule.negate)
    }

    /// Check a root-relative path. Paths outside this file's directory are
    /// never ignored by it.
    pub fn is_ignored(&self, relative_path: &str, is_dir: bool) -> bool {
        let scoped = if self.base.is_empty() {
            relative_path
        } else {
            match relative_path
                .strip_prefix(self.base.as_str())
                .and_then(|rest| rest.strip_prefix('/'))
            {
                Some(rest) => rest,
                None => return false,
            }
        };
        self.matched(scoped, is_dir).unwrap_or(false)
    }
}
