//! Ignore-rule resolution.
//!
//! Produces the single predicate shared by the initial full scan and the live
//! watch subscription. Both must agree on tracked paths, so neither side is
//! allowed to roll its own filtering.
//!
//! Precedence: built-in exclusions always win, even over a project negation
//! pattern. Project patterns from `.atlasignore` are applied in file order,
//! later patterns override earlier ones, `!` negates, a trailing `/` limits a
//! pattern to directories.

use std::path::Path;

use globset::{GlobBuilder, GlobMatcher};
use tracing::warn;

/// Directory names excluded unconditionally.
pub const BUILTIN_EXCLUDED_DIRS: &[&str] = &[
    ".git",
    ".hg",
    ".svn",
    "node_modules",
    "target",
    "dist",
    "build",
    "out",
    "__pycache__",
];

/// File names excluded unconditionally (OS metadata).
pub const BUILTIN_EXCLUDED_FILES: &[&str] = &[".DS_Store", "Thumbs.db", "desktop.ini"];

/// Name of the project-supplied ignore file at the watched root.
pub const IGNORE_FILE_NAME: &str = ".atlasignore";

struct IgnorePattern {
    negated: bool,
    dir_only: bool,
    /// Patterns containing a separator match against the full relative path;
    /// bare patterns match any path component.
    anchored: bool,
    matcher: GlobMatcher,
}

/// Compiled ignore predicate for one watched root.
pub struct IgnoreRules {
    patterns: Vec<IgnorePattern>,
}

impl IgnoreRules {
    /// Load rules for a project root, reading `.atlasignore` when present.
    pub fn load(root: &Path) -> Self {
        let ignore_file = root.join(IGNORE_FILE_NAME);
        match std::fs::read_to_string(&ignore_file) {
            Ok(content) => Self::from_patterns(content.lines()),
            Err(_) => Self::from_patterns(std::iter::empty::<&str>()),
        }
    }

    /// Build rules from raw pattern lines. Blank lines and `#` comments are
    /// skipped; unparseable globs are dropped with a warning.
    pub fn from_patterns<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut patterns = Vec::new();
        for line in lines {
            let mut raw = line.as_ref().trim();
            if raw.is_empty() || raw.starts_with('#') {
                continue;
            }

            let negated = raw.starts_with('!');
            if negated {
                raw = &raw[1..];
            }
            let dir_only = raw.ends_with('/');
            let raw = raw.trim_end_matches('/');
            if raw.is_empty() {
                continue;
            }
            let anchored = raw.contains('/');

            match GlobBuilder::new(raw).literal_separator(false).build() {
                Ok(glob) => patterns.push(IgnorePattern {
                    negated,
                    dir_only,
                    anchored,
                    matcher: glob.compile_matcher(),
                }),
                Err(e) => warn!(pattern = raw, error = %e, "Skipping unparseable ignore pattern"),
            }
        }
        Self { patterns }
    }

    /// Decide whether a path, relative to the watched root, is ignored.
    pub fn is_ignored(&self, rel_path: &str, is_dir: bool) -> bool {
        let rel = rel_path
            .trim_start_matches("./")
            .trim_matches('/')
            .replace('\\', "/");
        if rel.is_empty() || rel == "." {
            return false;
        }

        // Built-in exclusions: final precedence, no negation can bring these back.
        for component in rel.split('/') {
            if BUILTIN_EXCLUDED_DIRS.contains(&component) {
                return true;
            }
        }
        let name = rel.rsplit('/').next().unwrap_or(&rel);
        if !is_dir && BUILTIN_EXCLUDED_FILES.contains(&name) {
            return true;
        }

        let mut ignored = false;
        for pattern in &self.patterns {
            if pattern.dir_only && !is_dir {
                continue;
            }
            let hit = if pattern.anchored {
                pattern.matcher.is_match(&rel)
            } else {
                rel.split('/').any(|c| pattern.matcher.is_match(c))
            };
            if hit {
                ignored = !pattern.negated;
            }
        }
        ignored
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_dirs_are_ignored() {
        let rules = IgnoreRules::from_patterns(std::iter::empty::<&str>());
        assert!(rules.is_ignored("node_modules", true));
        assert!(rules.is_ignored("src/node_modules/lodash/index.js", false));
        assert!(rules.is_ignored(".git", true));
        assert!(rules.is_ignored(".DS_Store", false));
    }

    #[test]
    fn test_builtin_wins_over_negation() {
        // A project pattern cannot resurrect a built-in exclusion.
        let rules = IgnoreRules::from_patterns(["!node_modules"]);
        assert!(rules.is_ignored("node_modules", true));
        assert!(rules.is_ignored("node_modules/left-pad/index.js", false));
    }

    #[test]
    fn test_later_pattern_overrides_earlier() {
        let rules = IgnoreRules::from_patterns(["*.log", "!keep.log"]);
        assert!(rules.is_ignored("debug.log", false));
        assert!(!rules.is_ignored("keep.log", false));
        assert!(rules.is_ignored("logs/trace.log", false));
    }

    #[test]
    fn test_directory_only_pattern() {
        let rules = IgnoreRules::from_patterns(["coverage/"]);
        assert!(rules.is_ignored("coverage", true));
        // A *file* named coverage is not covered by a directory-only pattern.
        assert!(!rules.is_ignored("coverage", false));
    }

    #[test]
    fn test_anchored_pattern_matches_full_path() {
        let rules = IgnoreRules::from_patterns(["docs/*.md"]);
        assert!(rules.is_ignored("docs/notes.md", false));
        assert!(!rules.is_ignored("notes.md", false));
    }

    #[test]
    fn test_comments_and_blanks_skipped() {
        let rules = IgnoreRules::from_patterns(["# generated", "", "*.tmp"]);
        assert!(rules.is_ignored("scratch.tmp", false));
        assert!(!rules.is_ignored("# generated", false));
    }

    #[test]
    fn test_root_is_never_ignored() {
        let rules = IgnoreRules::from_patterns(["*"]);
        assert!(!rules.is_ignored(".", true));
        assert!(!rules.is_ignored("", true));
    }
}
