//! Live filesystem subscription.
//!
//! Bridges notify's callback thread into an async channel of stable
//! `ChangeEvent`s: raw events pass the shared ignore predicate in the
//! callback, then a forwarding task coalesces bursts per path and applies
//! the settle delay before add/change events are emitted. Unlink events are
//! forwarded immediately.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use atlas_core::Coalescer;
use atlas_core::ignore::IgnoreRules;
use atlas_core::model::{ChangeEvent, ChangeKind};

/// A live watch handle. Dropping it detaches the notify watcher; `close`
/// additionally stops the forwarding task.
pub struct WatchSubscription {
    _watcher: RecommendedWatcher,
    forward: JoinHandle<()>,
}

impl WatchSubscription {
    /// Tear down the subscription. In-flight synchronizer work downstream is
    /// unaffected; only the event source stops.
    pub fn close(self) {
        self.forward.abort();
        debug!("Watch subscription closed");
    }
}

/// Attach a recursive watch on `root`, delivering stable file events to `tx`.
pub fn subscribe(
    root: &Path,
    rules: Arc<IgnoreRules>,
    settle: Duration,
    tx: mpsc::UnboundedSender<ChangeEvent>,
) -> Result<WatchSubscription> {
    let (raw_tx, mut raw_rx) = mpsc::unbounded_channel::<ChangeEvent>();
    let root_buf: PathBuf = root.to_path_buf();

    let mut watcher = RecommendedWatcher::new(
        move |res: Result<Event, notify::Error>| {
            let event = match res {
                Ok(e) => e,
                Err(e) => {
                    warn!(error = %e, "Filesystem watch error");
                    return;
                }
            };
            let kind = match event.kind {
                EventKind::Create(_) => ChangeKind::Added,
                EventKind::Modify(_) => ChangeKind::Changed,
                EventKind::Remove(_) => ChangeKind::Removed,
                _ => return,
            };
            for path in event.paths {
                let Ok(rel) = path.strip_prefix(&root_buf) else {
                    continue;
                };
                let rel_str = rel.to_string_lossy().replace('\\', "/");
                let is_dir = path.is_dir();
                if rules.is_ignored(&rel_str, is_dir) {
                    continue;
                }
                // Only file events drive the synchronizer; directory
                // structure is rebuilt from file paths.
                if is_dir {
                    continue;
                }
                let _ = raw_tx.send(ChangeEvent::new(kind, path.clone()));
            }
        },
        notify::Config::default(),
    )
    .context("Failed to create filesystem watcher")?;

    watcher
        .watch(root, RecursiveMode::Recursive)
        .with_context(|| format!("Failed to watch {}", root.display()))?;

    let coalescer: Coalescer<PathBuf> = Coalescer::new(settle);
    let forward = tokio::spawn(async move {
        while let Some(event) = raw_rx.recv().await {
            match event.kind {
                ChangeKind::Removed => {
                    coalescer.forget(&event.path);
                    if tx.send(event).is_err() {
                        break;
                    }
                }
                ChangeKind::Added | ChangeKind::Changed => {
                    if !coalescer.observe(event.path.clone()) {
                        continue;
                    }
                    // Settle delay: the event is emitted only once the burst
                    // has had time to quiesce.
                    tokio::time::sleep(settle).await;
                    if tx.send(event).is_err() {
                        break;
                    }
                }
            }
        }
    });

    Ok(WatchSubscription {
        _watcher: watcher,
        forward,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{Duration, sleep, timeout};

    fn no_rules() -> Arc<IgnoreRules> {
        Arc::new(IgnoreRules::from_patterns(std::iter::empty::<&str>()))
    }

    #[tokio::test]
    async fn test_create_event_is_delivered() {
        let dir = tempfile::tempdir().unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sub = subscribe(dir.path(), no_rules(), Duration::from_millis(10), tx).unwrap();

        sleep(Duration::from_millis(100)).await;
        std::fs::write(dir.path().join("a.ts"), "export const x = 1;").unwrap();

        let event = timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("no event within timeout")
            .expect("channel closed");
        assert!(matches!(event.kind, ChangeKind::Added | ChangeKind::Changed));
        assert!(event.path.ends_with("a.ts"));

        sub.close();
    }

    #[tokio::test]
    async fn test_ignored_paths_are_filtered() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("node_modules")).unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sub = subscribe(dir.path(), no_rules(), Duration::from_millis(10), tx).unwrap();

        sleep(Duration::from_millis(100)).await;
        std::fs::write(dir.path().join("node_modules/dep.js"), "x").unwrap();
        std::fs::write(dir.path().join("kept.ts"), "y").unwrap();

        let event = timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("no event within timeout")
            .expect("channel closed");
        assert!(
            event.path.ends_with("kept.ts"),
            "expected kept.ts, got {:?}",
            event.path
        );

        sub.close();
    }
}
