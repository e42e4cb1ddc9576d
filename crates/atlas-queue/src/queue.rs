//! Single-worker FIFO queue with bounded retries and backoff.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use thiserror::Error;
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use atlas_core::RetryPolicy;
use atlas_core::content_hash;
use atlas_redis::file_cache::{self, FileCacheEntry};
use atlas_redis::RedisPool;

use crate::job::{Job, JobPayload, JobState};

/// Errors surfaced to enqueuers.
#[derive(Error, Debug)]
pub enum QueueError {
    #[error("Queue is shut down")]
    Closed,

    #[error("Job failed after {attempts} attempts: {reason}")]
    Failed { attempts: u32, reason: String },
}

/// Handle to an enqueued job: its id plus an awaitable completion.
pub struct JobHandle {
    id: String,
    done: oneshot::Receiver<Result<(), QueueError>>,
}

impl JobHandle {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Wait for the job to complete or exhaust its retries.
    pub async fn wait(self) -> Result<(), QueueError> {
        self.done.await.unwrap_or(Err(QueueError::Closed))
    }
}

struct QueuedJob {
    job: Job,
    done: oneshot::Sender<Result<(), QueueError>>,
}

/// Cache write-through target for `write`/`replace` jobs.
#[derive(Clone)]
pub struct CacheTarget {
    pub pool: RedisPool,
    pub project: String,
}

/// The global write queue. One worker, strict arrival order, per-job
/// timeout, retry with exponential backoff, failed jobs retained.
pub struct WriteQueue {
    tx: mpsc::UnboundedSender<QueuedJob>,
    failed: Arc<Mutex<HashMap<String, Job>>>,
    worker: JoinHandle<()>,
}

impl WriteQueue {
    /// `cache: None` skips cache write-through (tests, cache outage;
    /// eventual consistency is accepted, a later scan reconciles).
    pub fn new(policy: RetryPolicy, job_timeout: Duration, cache: Option<CacheTarget>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<QueuedJob>();
        let failed: Arc<Mutex<HashMap<String, Job>>> = Arc::new(Mutex::new(HashMap::new()));
        let failed_worker = failed.clone();

        let worker = tokio::spawn(async move {
            while let Some(mut queued) = rx.recv().await {
                queued.job.state = JobState::Active;
                debug!(job_id = %queued.job.id, kind = queued.job.payload.kind(), "Job active");

                let outcome = loop {
                    queued.job.attempts += 1;
                    let attempt = match timeout(job_timeout, execute(&queued.job.payload, &cache)).await {
                        Ok(Ok(())) => Ok(()),
                        Ok(Err(e)) => Err(format!("{:#}", e)),
                        Err(_) => Err(format!(
                            "timed out after {}ms",
                            job_timeout.as_millis()
                        )),
                    };

                    match attempt {
                        Ok(()) => break Ok(()),
                        Err(reason) => {
                            if policy.exhausted(queued.job.attempts) {
                                break Err(reason);
                            }
                            let delay = policy.delay_for(queued.job.attempts);
                            warn!(
                                job_id = %queued.job.id,
                                attempt = queued.job.attempts,
                                delay_ms = delay.as_millis() as u64,
                                reason = %reason,
                                "Job attempt failed, backing off"
                            );
                            tokio::time::sleep(delay).await;
                        }
                    }
                };

                match outcome {
                    Ok(()) => {
                        queued.job.state = JobState::Completed;
                        debug!(job_id = %queued.job.id, attempts = queued.job.attempts, "Job completed");
                        let _ = queued.done.send(Ok(()));
                        // Completed jobs are not retained.
                    }
                    Err(reason) => {
                        queued.job.state = JobState::Failed;
                        queued.job.error = Some(reason.clone());
                        warn!(
                            job_id = %queued.job.id,
                            attempts = queued.job.attempts,
                            reason = %reason,
                            "Job failed terminally, retained for inspection"
                        );
                        let attempts = queued.job.attempts;
                        failed_worker
                            .lock()
                            .await
                            .insert(queued.job.id.clone(), queued.job.clone());
                        let _ = queued.done.send(Err(QueueError::Failed { attempts, reason }));
                    }
                }
            }
            info!("Write queue worker drained");
        });

        Self { tx, failed, worker }
    }

    /// Enqueue a file overwrite.
    pub fn enqueue_write(
        &self,
        path: impl Into<std::path::PathBuf>,
        content: impl Into<String>,
    ) -> Result<JobHandle, QueueError> {
        self.enqueue(JobPayload::Write {
            path: path.into(),
            content: content.into(),
        })
    }

    /// Enqueue an old-text → new-text substitution.
    pub fn enqueue_replace(
        &self,
        path: impl Into<std::path::PathBuf>,
        old_text: impl Into<String>,
        new_text: impl Into<String>,
    ) -> Result<JobHandle, QueueError> {
        self.enqueue(JobPayload::Replace {
            path: path.into(),
            old_text: old_text.into(),
            new_text: new_text.into(),
        })
    }

    /// Enqueue a recursive directory creation.
    pub fn enqueue_folder(
        &self,
        path: impl Into<std::path::PathBuf>,
    ) -> Result<JobHandle, QueueError> {
        self.enqueue(JobPayload::Folder { path: path.into() })
    }

    fn enqueue(&self, payload: JobPayload) -> Result<JobHandle, QueueError> {
        let job = Job::new(payload);
        let id = job.id.clone();
        let (done_tx, done_rx) = oneshot::channel();
        debug!(job_id = %id, kind = job.payload.kind(), "Job enqueued");
        self.tx
            .send(QueuedJob { job, done: done_tx })
            .map_err(|_| QueueError::Closed)?;
        Ok(JobHandle { id, done: done_rx })
    }

    /// Jobs that exhausted their retries, kept for inspection.
    pub async fn failed_jobs(&self) -> Vec<Job> {
        self.failed.lock().await.values().cloned().collect()
    }

    /// Close intake and let the worker drain outstanding jobs.
    pub async fn shutdown(self) {
        drop(self.tx);
        let _ = self.worker.await;
    }
}

async fn execute(payload: &JobPayload, cache: &Option<CacheTarget>) -> Result<()> {
    match payload {
        JobPayload::Write { path, content } => {
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("creating parent of {}", path.display()))?;
            }
            tokio::fs::write(path, content)
                .await
                .with_context(|| format!("writing {}", path.display()))?;
            update_cache(cache, path, content).await;
            Ok(())
        }
        JobPayload::Replace {
            path,
            old_text,
            new_text,
        } => {
            let current = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("reading {}", path.display()))?;

            if !current.contains(old_text.as_str()) {
                // Retry convergence: a replay after a successful substitution
                // finds the new text already in place and is a no-op.
                if current.contains(new_text.as_str()) {
                    return Ok(());
                }
                bail!("old text not found in {}", path.display());
            }

            let updated = current.replace(old_text.as_str(), new_text.as_str());
            tokio::fs::write(path, &updated)
                .await
                .with_context(|| format!("writing {}", path.display()))?;
            update_cache(cache, path, &updated).await;
            Ok(())
        }
        JobPayload::Folder { path } => {
            tokio::fs::create_dir_all(path)
                .await
                .with_context(|| format!("creating {}", path.display()))?;
            Ok(())
        }
    }
}

/// Best-effort cache write-through; a failure here is logged and the job
/// still succeeds; the next scan reconciles cache and disk.
async fn update_cache(cache: &Option<CacheTarget>, path: &std::path::Path, content: &str) {
    let Some(target) = cache else {
        return;
    };
    let key = path.to_string_lossy().replace('\\', "/");
    let entry = FileCacheEntry::from_content(content.to_string(), content_hash(content.as_bytes()));
    if let Err(e) = file_cache::set_entry(&target.pool, &target.project, &key, &entry).await {
        warn!(file = %key, error = %e, "Cache write-through failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queue() -> WriteQueue {
        WriteQueue::new(
            RetryPolicy::new(3, Duration::from_millis(10)),
            Duration::from_secs(5),
            None,
        )
    }

    #[tokio::test]
    async fn test_write_job_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let q = queue();
        let path = dir.path().join("out.txt");

        q.enqueue_write(&path, "hello").unwrap().wait().await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "hello");
        assert!(q.failed_jobs().await.is_empty());
    }

    #[tokio::test]
    async fn test_fifo_convergence_last_write_wins() {
        let dir = tempfile::tempdir().unwrap();
        let q = queue();
        let path = dir.path().join("race.txt");

        let first = q.enqueue_write(&path, "first").unwrap();
        let second = q.enqueue_write(&path, "second").unwrap();
        first.wait().await.unwrap();
        second.wait().await.unwrap();

        // Strict FIFO: final content is the later enqueue, never interleaved.
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "second");
    }

    #[tokio::test]
    async fn test_replace_substitutes_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("code.ts");
        std::fs::write(&path, "const LIMIT = 10;").unwrap();

        let q = queue();
        q.enqueue_replace(&path, "10", "20").unwrap().wait().await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "const LIMIT = 20;");
    }

    #[tokio::test]
    async fn test_replace_replay_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("code.ts");
        std::fs::write(&path, "let x = old;").unwrap();

        let q = queue();
        q.enqueue_replace(&path, "old", "new").unwrap().wait().await.unwrap();
        // Replaying the same payload converges instead of failing.
        q.enqueue_replace(&path, "old", "new").unwrap().wait().await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "let x = new;");
    }

    #[tokio::test]
    async fn test_replace_fails_loudly_when_old_text_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("code.ts");
        std::fs::write(&path, "nothing to see").unwrap();

        let q = queue();
        let result = q
            .enqueue_replace(&path, "missing", "replacement")
            .unwrap()
            .wait()
            .await;

        match result {
            Err(QueueError::Failed { attempts, reason }) => {
                assert_eq!(attempts, 3);
                assert!(reason.contains("old text not found"));
            }
            other => panic!("expected Failed, got {:?}", other.is_ok()),
        }

        // Exhausted jobs are parked for inspection.
        let failed = q.failed_jobs().await;
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].state, JobState::Failed);
        assert_eq!(failed[0].attempts, 3);
    }

    #[tokio::test]
    async fn test_folder_job_creates_nested_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b/c");

        let q = queue();
        q.enqueue_folder(&nested).unwrap().wait().await.unwrap();
        assert!(nested.is_dir());

        // Replay is a no-op, not an error.
        q.enqueue_folder(&nested).unwrap().wait().await.unwrap();
    }

    #[tokio::test]
    async fn test_worker_survives_failures() {
        let dir = tempfile::tempdir().unwrap();
        let q = queue();

        // A job that exhausts retries must not wedge the worker.
        let bad = q
            .enqueue_replace(dir.path().join("absent.txt"), "a", "b")
            .unwrap();
        assert!(bad.wait().await.is_err());

        let path = dir.path().join("after.txt");
        q.enqueue_write(&path, "still alive").unwrap().wait().await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "still alive");
    }

    #[tokio::test]
    async fn test_shutdown_drains_pending_jobs() {
        let dir = tempfile::tempdir().unwrap();
        let q = queue();
        let path = dir.path().join("drained.txt");

        q.enqueue_write(&path, "flushed").unwrap();
        q.shutdown().await;

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "flushed");
    }
}
