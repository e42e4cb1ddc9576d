//! Centralized error types for CodeAtlas.

use thiserror::Error;

/// Main error type for CodeAtlas operations.
#[derive(Error, Debug)]
pub enum AtlasError {
    #[error("Folder not found: {0}")]
    FolderNotFound(String),

    #[error("Watcher not found: {0}")]
    WatcherNotFound(String),

    #[error("Project not found: {0}")]
    ProjectNotFound(String),

    #[error("No analyzer can process: {0}")]
    AnalyzerUnavailable(String),

    #[error("Synchronization failed: {0}")]
    Sync(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for CodeAtlas operations.
pub type AtlasResult<T> = Result<T, AtlasError>;

impl AtlasError {
    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
