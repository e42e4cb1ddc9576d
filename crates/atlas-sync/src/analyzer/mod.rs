//! Pluggable structural analyzers.
//!
//! The registry holds `{predicate, handler}` pairs tried in registration
//! order; the first analyzer whose `can_process` accepts a path wins. Files
//! no analyzer accepts still get File/Directory bookkeeping upstream;
//! graceful degradation, not an error.

pub mod typescript;

use std::path::Path;

use anyhow::Result;
use atlas_core::model::{CallEdge, CodeEntity};

pub use typescript::TypeScriptAnalyzer;

/// Everything one analyzer pass extracts from a single file.
#[derive(Debug, Default, Clone)]
pub struct Analysis {
    pub entities: Vec<CodeEntity>,
    pub call_edges: Vec<CallEdge>,
}

/// A structural analyzer for one family of source files.
pub trait SourceAnalyzer: Send + Sync {
    /// Short name for logging.
    fn name(&self) -> &'static str;

    /// Whether this analyzer understands the file at `path`.
    fn can_process(&self, path: &Path) -> bool;

    /// Extract entities and call edges. `file_path` is the project-relative
    /// path recorded on every extracted entity.
    fn analyze(&self, file_path: &str, source: &str) -> Result<Analysis>;
}

/// Priority-ordered analyzer dispatch. New analyzers register without
/// touching existing dispatch code.
pub struct AnalyzerRegistry {
    analyzers: Vec<Box<dyn SourceAnalyzer>>,
}

impl AnalyzerRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self {
            analyzers: Vec::new(),
        }
    }

    /// Registry with the built-in TypeScript analyzer.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(TypeScriptAnalyzer::new()));
        registry
    }

    /// Append an analyzer. Earlier registrations take priority.
    pub fn register(&mut self, analyzer: Box<dyn SourceAnalyzer>) {
        self.analyzers.push(analyzer);
    }

    /// First analyzer accepting the path, if any.
    pub fn analyzer_for(&self, path: &Path) -> Option<&dyn SourceAnalyzer> {
        self.analyzers
            .iter()
            .find(|a| a.can_process(path))
            .map(|a| a.as_ref())
    }
}

impl Default for AnalyzerRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct RejectAll;

    impl SourceAnalyzer for RejectAll {
        fn name(&self) -> &'static str {
            "reject-all"
        }
        fn can_process(&self, _path: &Path) -> bool {
            false
        }
        fn analyze(&self, _file_path: &str, _source: &str) -> Result<Analysis> {
            Ok(Analysis::default())
        }
    }

    #[test]
    fn test_builtin_registry_accepts_typescript() {
        let registry = AnalyzerRegistry::with_builtin();
        let analyzer = registry.analyzer_for(Path::new("src/a.ts"));
        assert!(analyzer.is_some());
        assert_eq!(analyzer.unwrap().name(), "typescript");
    }

    #[test]
    fn test_unrecognized_kind_gets_no_analyzer() {
        let registry = AnalyzerRegistry::with_builtin();
        assert!(registry.analyzer_for(Path::new("README.md")).is_none());
        assert!(registry.analyzer_for(Path::new("photo.png")).is_none());
    }

    #[test]
    fn test_first_match_wins() {
        let mut registry = AnalyzerRegistry::new();
        registry.register(Box::new(RejectAll));
        registry.register(Box::new(TypeScriptAnalyzer::new()));
        // RejectAll never matches, so TypeScript still gets the file.
        let analyzer = registry.analyzer_for(Path::new("a.ts")).unwrap();
        assert_eq!(analyzer.name(), "typescript");
    }
}
