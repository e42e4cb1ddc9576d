//! Version source: opaque per-project version tokens.

use std::path::Path;

use tracing::debug;

/// Current version token for a project root.
///
/// When the root lives inside a git repository the HEAD commit id is the
/// token; otherwise a millisecond timestamp stands in. Callers treat the
/// result as an opaque string used only for version tagging.
pub fn current_version_token(root: &Path) -> String {
    match git2::Repository::discover(root) {
        Ok(repo) => {
            if let Some(oid) = repo.head().ok().and_then(|head| head.target()) {
                return oid.to_string();
            }
            debug!(root = %root.display(), "Repository has no HEAD commit, falling back to timestamp token");
        }
        Err(e) => {
            debug!(root = %root.display(), error = %e, "No repository found, falling back to timestamp token");
        }
    }
    chrono::Utc::now().timestamp_millis().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_is_never_empty() {
        let dir = tempfile::tempdir().unwrap();
        let token = current_version_token(dir.path());
        assert!(!token.is_empty());
    }
}
