//! Fire-and-forget event publication over Redis pub/sub.
//!
//! Status transitions and file-change notices are best-effort: a publish
//! failure is logged and swallowed, never surfaced to the state transition
//! that triggered it.

use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use tracing::warn;

use atlas_core::model::ChangeKind;

use crate::client::RedisPool;

/// Channel carrying watcher lifecycle transitions.
pub const WATCHER_STATUS_CHANNEL: &str = "atlas:watchers:status";

/// Channel carrying file-change notices.
pub const FILE_CHANGE_CHANNEL: &str = "atlas:watchers:files";

/// Events published by the watch layer.
#[derive(Clone, Serialize, Deserialize, Debug)]
#[serde(tag = "type", content = "data")]
pub enum WatcherEvent {
    /// A watch process changed status.
    Status {
        process_id: String,
        project: String,
        status: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    /// A tracked file changed on disk.
    FileChange {
        project: String,
        path: String,
        kind: ChangeKind,
    },
}

impl WatcherEvent {
    fn channel(&self) -> &'static str {
        match self {
            WatcherEvent::Status { .. } => WATCHER_STATUS_CHANNEL,
            WatcherEvent::FileChange { .. } => FILE_CHANGE_CHANNEL,
        }
    }
}

/// Publish an event, fire-and-forget.
pub async fn publish_event(pool: &RedisPool, event: &WatcherEvent) {
    let json = match serde_json::to_string(event) {
        Ok(j) => j,
        Err(e) => {
            warn!(error = %e, "Failed to serialize watcher event");
            return;
        }
    };

    let mut conn = pool.clone();
    if let Err(e) = conn.publish::<_, _, ()>(event.channel(), &json).await {
        warn!(error = %e, channel = event.channel(), "Failed to publish watcher event");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_event_wire_shape() {
        let event = WatcherEvent::Status {
            process_id: "p1".to_string(),
            project: "demo".to_string(),
            status: "seeding".to_string(),
            reason: None,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "Status");
        assert_eq!(json["data"]["status"], "seeding");
        assert!(json["data"].get("reason").is_none());
    }

    #[test]
    fn test_file_change_event_routes_to_file_channel() {
        let event = WatcherEvent::FileChange {
            project: "demo".to_string(),
            path: "src/a.ts".to_string(),
            kind: ChangeKind::Changed,
        };
        assert_eq!(event.channel(), FILE_CHANGE_CHANNEL);
    }
}
