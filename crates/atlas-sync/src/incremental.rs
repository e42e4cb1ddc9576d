//! Incremental strategy: one run per stable live-watch event.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, info};

use atlas_core::content_hash;
use atlas_core::model::{ChangeEvent, ChangeKind, Version};
use atlas_core::vcs::current_version_token;
use atlas_redis::file_cache::{self, FileCacheEntry};

use atlas_graph::store::{files, versions};

use crate::store::GraphEntityStore;
use crate::{SyncContext, pipeline};

/// Apply a single filesystem event to the mirror. The event path must be
/// absolute and inside `root`; the watch layer guarantees both.
pub async fn handle_event(
    ctx: &SyncContext,
    project: &str,
    root: &Path,
    event: &ChangeEvent,
) -> Result<()> {
    let rel = event
        .path
        .strip_prefix(root)
        .with_context(|| format!("Event path escapes project root: {}", event.path.display()))?
        .to_string_lossy()
        .replace('\\', "/");

    let version = Version::mint(current_version_token(root));
    versions::create_version(&ctx.graph, project, &version).await?;

    match event.kind {
        ChangeKind::Removed => {
            info!(project, file = %rel, version = %version.identifier, "File unlinked, soft-deleting");
            files::soft_delete_file(&ctx.graph, project, &rel, &version.identifier).await?;
            file_cache::delete_entry(&ctx.cache, project, &rel).await?;
            Ok(())
        }
        ChangeKind::Added | ChangeKind::Changed => {
            // A fast add+unlink race lands here with the file already gone.
            // That is a tolerated no-op, not an error.
            let bytes = match std::fs::read(&event.path) {
                Ok(b) => b,
                Err(e) => {
                    debug!(file = %rel, error = %e, "File vanished before sync, skipping");
                    return Ok(());
                }
            };

            let hash = content_hash(&bytes);
            if let Ok(Some(existing)) = file_cache::get_entry(&ctx.cache, project, &rel).await {
                if existing.hash == hash {
                    debug!(file = %rel, "Content hash unchanged, skipping re-extraction");
                    return Ok(());
                }
            }

            if event.kind == ChangeKind::Added {
                let dir_path = match rel.rfind('/') {
                    Some(idx) => rel[..idx].to_string(),
                    None => ".".to_string(),
                };
                files::ensure_directory_chain(&ctx.graph, project, &dir_path).await?;
            }

            let node = files::FileNode::from_rel_path(&rel);
            files::upsert_file(&ctx.graph, project, &node).await?;

            let source = String::from_utf8_lossy(&bytes).into_owned();
            let entry = FileCacheEntry::from_content(source.clone(), hash);
            file_cache::set_entry(&ctx.cache, project, &rel, &entry).await?;

            let store = GraphEntityStore::new(ctx.graph.clone());
            pipeline::process_file(
                &store,
                &ctx.registry,
                project,
                &rel,
                &source,
                &version,
                ctx.move_window_minutes,
            )
            .await
        }
    }
}
