//! Watch process lifecycle manager.
//!
//! Supervises N independent watch processes. Each process seeds with a full
//! scan, then attaches a live subscription whose events are dispatched
//! strictly one at a time; different projects run fully concurrently.
//! State machine per process: starting → seeding → seeded → running,
//! running ⟷ restarting, any state → {error, killed}. Killed removes the
//! record; error leaves it, non-functional. Every transition publishes a
//! status event fire-and-forget.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use atlas_core::ignore::IgnoreRules;
use atlas_core::model::ChangeEvent;
use atlas_core::{AtlasError, AtlasResult};
use atlas_redis::{RedisPool, WatcherEvent, publish_event};
use atlas_sync::Synchronizer;

use crate::subscription::{self, WatchSubscription};

/// Lifecycle state of one watch process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WatchStatus {
    Starting,
    Seeding,
    Seeded,
    Running,
    Restarting,
    Error,
    Killed,
}

/// Public view of a watch process.
#[derive(Debug, Clone)]
pub struct WatchProcessInfo {
    pub process_id: String,
    pub folder_path: PathBuf,
    pub project_name: String,
    pub status: WatchStatus,
}

struct ProcessEntry {
    info: WatchProcessInfo,
    subscription: Option<WatchSubscription>,
    dispatch: Option<JoinHandle<()>>,
}

/// Supervisor for per-project watch processes.
pub struct WatchManager {
    synchronizer: Arc<dyn Synchronizer>,
    publisher: Option<RedisPool>,
    settle: Duration,
    processes: Arc<Mutex<HashMap<String, ProcessEntry>>>,
}

impl WatchManager {
    /// `publisher: None` disables status publication (used by tests without
    /// a broker; transitions are still logged).
    pub fn new(
        synchronizer: Arc<dyn Synchronizer>,
        publisher: Option<RedisPool>,
        settle: Duration,
    ) -> Self {
        Self {
            synchronizer,
            publisher,
            settle,
            processes: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Start watching a folder: seed with a full scan, then attach the live
    /// subscription. The subscription is never attached before the scan
    /// finishes, and never attached at all if anything fails.
    pub async fn start_watcher(
        &self,
        folder_path: &Path,
        project_name: &str,
    ) -> AtlasResult<String> {
        if !folder_path.is_dir() {
            return Err(AtlasError::FolderNotFound(
                folder_path.display().to_string(),
            ));
        }

        let process_id = Uuid::new_v4().to_string();
        {
            let mut map = self.processes.lock().await;
            map.insert(
                process_id.clone(),
                ProcessEntry {
                    info: WatchProcessInfo {
                        process_id: process_id.clone(),
                        folder_path: folder_path.to_path_buf(),
                        project_name: project_name.to_string(),
                        status: WatchStatus::Starting,
                    },
                    subscription: None,
                    dispatch: None,
                },
            );
        }
        info!(process_id = %process_id, project = project_name, folder = %folder_path.display(), "Starting watcher");

        self.set_status(&process_id, WatchStatus::Seeding, "seeding", None)
            .await;
        if let Err(e) = self.synchronizer.seed(project_name, folder_path).await {
            error!(process_id = %process_id, project = project_name, error = %e, "Seeding scan failed");
            self.set_status(&process_id, WatchStatus::Error, "error", Some(e.to_string()))
                .await;
            return Err(AtlasError::Sync(format!(
                "seeding {} failed: {}",
                project_name, e
            )));
        }
        self.set_status(&process_id, WatchStatus::Seeded, "seeded", None)
            .await;

        match self.attach(&process_id, folder_path, project_name).await {
            Ok(()) => {
                self.set_status(&process_id, WatchStatus::Running, "started", None)
                    .await;
                Ok(process_id)
            }
            Err(e) => {
                error!(process_id = %process_id, error = %e, "Failed to attach live subscription");
                self.set_status(&process_id, WatchStatus::Error, "error", Some(e.to_string()))
                    .await;
                Err(AtlasError::Sync(format!(
                    "attaching watch for {} failed: {}",
                    project_name, e
                )))
            }
        }
    }

    /// Close the existing handle and open a new one on the same folder,
    /// keeping the process id. Returns false for an unknown id.
    pub async fn restart_watcher(&self, process_id: &str) -> bool {
        let (folder, project) = {
            let mut map = self.processes.lock().await;
            match map.get_mut(process_id) {
                None => return false,
                Some(entry) => {
                    if let Some(sub) = entry.subscription.take() {
                        sub.close();
                    }
                    // Old dispatch loop drains on its own once the sender is gone.
                    entry.dispatch.take();
                    (
                        entry.info.folder_path.clone(),
                        entry.info.project_name.clone(),
                    )
                }
            }
        };

        self.set_status(process_id, WatchStatus::Restarting, "restarting", None)
            .await;
        match self.attach(process_id, &folder, &project).await {
            Ok(()) => {
                self.set_status(process_id, WatchStatus::Running, "restarted", None)
                    .await;
                true
            }
            Err(e) => {
                // The id was known, so this is not the `false` case: the
                // record is left behind in error state for inspection.
                error!(process_id = %process_id, error = %e, "Restart failed");
                self.set_status(process_id, WatchStatus::Error, "error", Some(e.to_string()))
                    .await;
                true
            }
        }
    }

    /// Stop watching and remove the process record. Returns false for an
    /// unknown (or already killed) id. In-flight synchronizer work for the
    /// process is allowed to finish.
    pub async fn kill_watcher(&self, process_id: &str) -> bool {
        let entry = self.processes.lock().await.remove(process_id);
        let Some(mut entry) = entry else {
            return false;
        };

        if let Some(sub) = entry.subscription.take() {
            sub.close();
        }
        // Not aborted: the dispatch task exits once the subscription's
        // sender is dropped, after finishing whatever event it is on.
        entry.dispatch.take();

        self.publish_status(process_id, &entry.info.project_name, "killed", None)
            .await;
        info!(process_id = %process_id, project = %entry.info.project_name, "Watcher killed");
        true
    }

    /// Snapshot of all known watch processes.
    pub async fn active_watchers(&self) -> Vec<WatchProcessInfo> {
        self.processes
            .lock()
            .await
            .values()
            .map(|e| e.info.clone())
            .collect()
    }

    /// Ids of all known watch processes.
    pub async fn active_watcher_ids(&self) -> Vec<String> {
        self.processes.lock().await.keys().cloned().collect()
    }

    /// Kill every watcher. Called by the service registry on shutdown.
    pub async fn shutdown(&self) {
        for id in self.active_watcher_ids().await {
            self.kill_watcher(&id).await;
        }
    }

    async fn attach(
        &self,
        process_id: &str,
        folder: &Path,
        project: &str,
    ) -> anyhow::Result<()> {
        let rules = Arc::new(IgnoreRules::load(folder));
        let (tx, rx) = mpsc::unbounded_channel();
        let sub = subscription::subscribe(folder, rules, self.settle, tx)?;
        let dispatch = self.spawn_dispatch(
            process_id.to_string(),
            project.to_string(),
            folder.to_path_buf(),
            rx,
        );

        let mut map = self.processes.lock().await;
        match map.get_mut(process_id) {
            Some(entry) => {
                entry.subscription = Some(sub);
                entry.dispatch = Some(dispatch);
            }
            None => {
                // Killed while attaching; tear straight back down.
                sub.close();
            }
        }
        Ok(())
    }

    fn spawn_dispatch(
        &self,
        process_id: String,
        project: String,
        root: PathBuf,
        mut rx: mpsc::UnboundedReceiver<ChangeEvent>,
    ) -> JoinHandle<()> {
        let synchronizer = self.synchronizer.clone();
        let publisher = self.publisher.clone();

        tokio::spawn(async move {
            // Strictly serial: one event at a time per process, in arrival
            // order. Other projects have their own loop.
            while let Some(event) = rx.recv().await {
                if let Some(pool) = &publisher {
                    let rel = event
                        .path
                        .strip_prefix(&root)
                        .map(|p| p.to_string_lossy().replace('\\', "/"))
                        .unwrap_or_else(|_| event.path.display().to_string());
                    publish_event(
                        pool,
                        &WatcherEvent::FileChange {
                            project: project.clone(),
                            path: rel,
                            kind: event.kind,
                        },
                    )
                    .await;
                }

                if let Err(e) = synchronizer.apply(&project, &root, &event).await {
                    warn!(
                        process_id = %process_id,
                        file = %event.path.display(),
                        error = %e,
                        "Incremental sync failed"
                    );
                    if let Some(pool) = &publisher {
                        publish_event(
                            pool,
                            &WatcherEvent::Status {
                                process_id: process_id.clone(),
                                project: project.clone(),
                                status: "error".to_string(),
                                reason: Some(e.to_string()),
                            },
                        )
                        .await;
                    }
                }
            }
            debug!(process_id = %process_id, "Dispatch loop drained");
        })
    }

    async fn set_status(
        &self,
        process_id: &str,
        status: WatchStatus,
        publish_as: &str,
        reason: Option<String>,
    ) {
        let project = {
            let mut map = self.processes.lock().await;
            match map.get_mut(process_id) {
                Some(entry) => {
                    entry.info.status = status;
                    entry.info.project_name.clone()
                }
                None => return,
            }
        };
        self.publish_status(process_id, &project, publish_as, reason)
            .await;
    }

    async fn publish_status(
        &self,
        process_id: &str,
        project: &str,
        status: &str,
        reason: Option<String>,
    ) {
        debug!(process_id, project, status, "Watcher status transition");
        if let Some(pool) = &self.publisher {
            publish_event(
                pool,
                &WatcherEvent::Status {
                    process_id: process_id.to_string(),
                    project: project.to_string(),
                    status: status.to_string(),
                    reason,
                },
            )
            .await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use async_trait::async_trait;
    use atlas_core::model::ScanReport;
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::sleep;

    #[derive(Default)]
    struct RecordingSynchronizer {
        seeds: AtomicUsize,
        applies: AtomicUsize,
        log: StdMutex<Vec<String>>,
    }

    #[async_trait]
    impl Synchronizer for RecordingSynchronizer {
        async fn seed(&self, _project: &str, _root: &Path) -> Result<ScanReport> {
            self.seeds.fetch_add(1, Ordering::SeqCst);
            self.log.lock().unwrap().push("seed".to_string());
            Ok(ScanReport::default())
        }

        async fn apply(&self, _project: &str, _root: &Path, _event: &ChangeEvent) -> Result<()> {
            self.applies.fetch_add(1, Ordering::SeqCst);
            self.log.lock().unwrap().push("apply".to_string());
            Ok(())
        }
    }

    struct FailingSeed;

    #[async_trait]
    impl Synchronizer for FailingSeed {
        async fn seed(&self, _project: &str, _root: &Path) -> Result<ScanReport> {
            Err(anyhow::anyhow!("graph store unreachable"))
        }

        async fn apply(&self, _project: &str, _root: &Path, _event: &ChangeEvent) -> Result<()> {
            Ok(())
        }
    }

    fn manager(sync: Arc<dyn Synchronizer>) -> WatchManager {
        WatchManager::new(sync, None, Duration::from_millis(10))
    }

    #[tokio::test]
    async fn test_start_on_missing_folder_fails_before_seeding() {
        let sync = Arc::new(RecordingSynchronizer::default());
        let mgr = manager(sync.clone());

        let result = mgr
            .start_watcher(Path::new("/definitely/not/here"), "demo")
            .await;
        assert!(matches!(result, Err(AtlasError::FolderNotFound(_))));
        assert_eq!(sync.seeds.load(Ordering::SeqCst), 0);
        assert!(mgr.active_watchers().await.is_empty());
    }

    #[tokio::test]
    async fn test_start_seeds_then_runs() {
        let dir = tempfile::tempdir().unwrap();
        let sync = Arc::new(RecordingSynchronizer::default());
        let mgr = manager(sync.clone());

        let id = mgr.start_watcher(dir.path(), "demo").await.unwrap();
        assert_eq!(sync.seeds.load(Ordering::SeqCst), 1);

        let watchers = mgr.active_watchers().await;
        assert_eq!(watchers.len(), 1);
        assert_eq!(watchers[0].process_id, id);
        assert_eq!(watchers[0].status, WatchStatus::Running);

        mgr.kill_watcher(&id).await;
    }

    #[tokio::test]
    async fn test_seed_failure_leaves_error_record_without_subscription() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = manager(Arc::new(FailingSeed));

        let result = mgr.start_watcher(dir.path(), "demo").await;
        assert!(matches!(result, Err(AtlasError::Sync(_))));

        let watchers = mgr.active_watchers().await;
        assert_eq!(watchers.len(), 1);
        assert_eq!(watchers[0].status, WatchStatus::Error);
    }

    #[tokio::test]
    async fn test_kill_unknown_id_returns_false_not_error() {
        let mgr = manager(Arc::new(RecordingSynchronizer::default()));
        assert!(!mgr.kill_watcher("no-such-id").await);
    }

    #[tokio::test]
    async fn test_kill_twice_returns_false_second_time() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = manager(Arc::new(RecordingSynchronizer::default()));

        let id = mgr.start_watcher(dir.path(), "demo").await.unwrap();
        assert!(mgr.kill_watcher(&id).await);
        assert!(!mgr.kill_watcher(&id).await);
        assert!(mgr.active_watchers().await.is_empty());
    }

    #[tokio::test]
    async fn test_restart_keeps_process_id() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = manager(Arc::new(RecordingSynchronizer::default()));

        let id = mgr.start_watcher(dir.path(), "demo").await.unwrap();
        assert!(mgr.restart_watcher(&id).await);

        let ids = mgr.active_watcher_ids().await;
        assert_eq!(ids, vec![id.clone()]);
        assert_eq!(
            mgr.active_watchers().await[0].status,
            WatchStatus::Running
        );

        mgr.kill_watcher(&id).await;
    }

    #[tokio::test]
    async fn test_restart_unknown_id_returns_false() {
        let mgr = manager(Arc::new(RecordingSynchronizer::default()));
        assert!(!mgr.restart_watcher("no-such-id").await);
    }

    #[tokio::test]
    async fn test_live_event_reaches_synchronizer_after_seed() {
        let dir = tempfile::tempdir().unwrap();
        let sync = Arc::new(RecordingSynchronizer::default());
        let mgr = manager(sync.clone());

        let id = mgr.start_watcher(dir.path(), "demo").await.unwrap();
        sleep(Duration::from_millis(100)).await;

        std::fs::write(dir.path().join("a.ts"), "export const x = 1;").unwrap();

        // Wait for the event to flow through settle + dispatch.
        for _ in 0..50 {
            if sync.applies.load(Ordering::SeqCst) > 0 {
                break;
            }
            sleep(Duration::from_millis(100)).await;
        }
        assert!(sync.applies.load(Ordering::SeqCst) > 0);

        // Seeding strictly precedes any live dispatch.
        let log = sync.log.lock().unwrap().clone();
        assert_eq!(log.first().map(String::as_str), Some("seed"));

        mgr.kill_watcher(&id).await;
    }
}
