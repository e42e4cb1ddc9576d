//! Domain model shared across the synchronization engine.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Kind of a tracked source-level entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Function,
    Class,
    Variable,
    Import,
    Export,
}

impl EntityKind {
    /// Node label used in the graph store.
    pub fn label(&self) -> &'static str {
        match self {
            EntityKind::Function => "Function",
            EntityKind::Class => "Class",
            EntityKind::Variable => "Variable",
            EntityKind::Import => "Import",
            EntityKind::Export => "Export",
        }
    }

    /// Kinds that participate in deletion/movement tracking.
    pub fn tracks_history(&self) -> bool {
        matches!(self, EntityKind::Function | EntityKind::Class)
    }
}

/// A structural source-code element extracted from a file.
///
/// Physical identity is (name, file_path, line range); the graph store keys
/// entities on (project, kind, name, file_path).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeEntity {
    pub name: String,
    pub file_path: String,
    pub line_start: u32,
    pub line_end: u32,
    pub kind: EntityKind,
    /// Parameter names, for functions. Used by movement inference to match
    /// signatures across files.
    #[serde(default)]
    pub parameters: Vec<String>,
}

impl CodeEntity {
    /// Comparable signature string: `name(p1,p2)` for functions, bare name
    /// otherwise.
    pub fn signature(&self) -> String {
        if self.kind == EntityKind::Function {
            format!("{}({})", self.name, self.parameters.join(","))
        } else {
            self.name.clone()
        }
    }
}

/// A caller → callee relationship observed inside one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallEdge {
    pub caller: String,
    pub callee: String,
    pub file_path: String,
}

/// What happened to a path on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Added,
    Changed,
    Removed,
}

/// A single stable filesystem event, post settle delay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub path: PathBuf,
}

impl ChangeEvent {
    pub fn new(kind: ChangeKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }
}

/// Aggregate outcome of a full-scan pass. Per-file failures are counted, not
/// propagated; the scan is best effort and self-correcting.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ScanReport {
    pub processed: usize,
    pub failed: usize,
    pub unchanged: usize,
}

impl ScanReport {
    pub fn total(&self) -> usize {
        self.processed + self.failed + self.unchanged
    }
}

/// A project-scoped monotonic version tag. Every entity write is linked to
/// exactly one Version, which is what makes soft-delete-by-version queries
/// work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    pub identifier: String,
    pub timestamp: String,
}

impl Version {
    /// Mint a version from an opaque token, stamped now.
    pub fn mint(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
