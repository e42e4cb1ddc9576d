//! Job model for the write queue.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Lifecycle state of a job, driven only by the queue worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Waiting,
    Active,
    Completed,
    Failed,
}

/// What a job does to disk. Every payload must be idempotent under retry:
/// replaying it converges on the same final content.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum JobPayload {
    /// Overwrite a file with new content.
    Write { path: PathBuf, content: String },
    /// Substitute old text with new text. Fails loudly when the old text is
    /// absent and the substitution has not already happened.
    Replace {
        path: PathBuf,
        old_text: String,
        new_text: String,
    },
    /// Recursively create a directory.
    Folder { path: PathBuf },
}

impl JobPayload {
    pub fn kind(&self) -> &'static str {
        match self {
            JobPayload::Write { .. } => "write",
            JobPayload::Replace { .. } => "replace",
            JobPayload::Folder { .. } => "folder",
        }
    }

    pub fn path(&self) -> &PathBuf {
        match self {
            JobPayload::Write { path, .. } => path,
            JobPayload::Replace { path, .. } => path,
            JobPayload::Folder { path } => path,
        }
    }
}

/// One queued job and its progress.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: String,
    pub payload: JobPayload,
    pub state: JobState,
    pub attempts: u32,
    pub error: Option<String>,
}

impl Job {
    pub fn new(payload: JobPayload) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            payload,
            state: JobState::Waiting,
            attempts: 0,
            error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_job_starts_waiting_with_zero_attempts() {
        let job = Job::new(JobPayload::Folder {
            path: PathBuf::from("/tmp/x"),
        });
        assert_eq!(job.state, JobState::Waiting);
        assert_eq!(job.attempts, 0);
        assert!(job.error.is_none());
    }

    #[test]
    fn test_payload_kind_names() {
        let write = JobPayload::Write {
            path: PathBuf::from("a"),
            content: String::new(),
        };
        assert_eq!(write.kind(), "write");
        let folder = JobPayload::Folder {
            path: PathBuf::from("b"),
        };
        assert_eq!(folder.kind(), "folder");
    }
}
