//! Full-Scan strategy.
//!
//! Walks the tree under the shared ignore predicate, upserts structure
//! nodes, and diffs content hashes against the cache so extraction only runs
//! for files whose content actually changed. Per-file failures never abort
//! the batch: the scan is best effort and the next pass self-heals.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, warn};
use walkdir::WalkDir;

use atlas_core::content_hash;
use atlas_core::ignore::IgnoreRules;
use atlas_core::model::{ScanReport, Version};
use atlas_core::vcs::current_version_token;
use atlas_redis::file_cache::{self, FileCacheEntry};

use atlas_graph::store::{files, projects, versions};

use crate::analyzer::Analysis;
use crate::store::GraphEntityStore;
use crate::{SyncContext, pipeline};

/// Run a full scan of `root` for `project`. Returns the aggregate report;
/// only infrastructure failures (store unreachable, unreadable root)
/// propagate as errors.
pub async fn full_scan(ctx: &SyncContext, project: &str, root: &Path) -> Result<ScanReport> {
    let rules = IgnoreRules::load(root);
    let root_str = root.to_string_lossy().to_string();

    projects::upsert_project(&ctx.graph, project, &root_str)
        .await
        .context("Failed to upsert project")?;

    let version = Version::mint(current_version_token(root));
    versions::create_version(&ctx.graph, project, &version)
        .await
        .context("Failed to mint version")?;

    files::upsert_directory(&ctx.graph, project, ".").await?;

    // Walk under the ignore predicate, upserting structure as we go.
    let mut disk_files: Vec<String> = Vec::new();
    let walker = WalkDir::new(root).min_depth(1).into_iter().filter_entry(|e| {
        let rel = match e.path().strip_prefix(root) {
            Ok(r) => r.to_string_lossy().replace('\\', "/"),
            Err(_) => return false,
        };
        !rules.is_ignored(&rel, e.file_type().is_dir())
    });

    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!(error = %e, "Skipping unreadable entry during scan");
                continue;
            }
        };
        let rel = match entry.path().strip_prefix(root) {
            Ok(r) => r.to_string_lossy().replace('\\', "/"),
            Err(_) => continue,
        };

        if entry.file_type().is_dir() {
            files::upsert_directory(&ctx.graph, project, &rel).await?;
            let parent = match rel.rfind('/') {
                Some(idx) => rel[..idx].to_string(),
                None => ".".to_string(),
            };
            files::link_directory_parent(&ctx.graph, project, &parent, &rel).await?;
        } else if entry.file_type().is_file() {
            let node = files::FileNode::from_rel_path(&rel);
            files::upsert_file(&ctx.graph, project, &node).await?;
            disk_files.push(rel);
        }
    }

    // Files recorded in the cache but gone from disk: soft-delete and purge.
    let cached = file_cache::scan_project_files(&ctx.cache, project)
        .await
        .context("Failed to scan file cache")?;
    let cached_hashes: HashMap<&str, &str> = cached
        .iter()
        .map(|(path, entry)| (path.as_str(), entry.hash.as_str()))
        .collect();
    let on_disk: HashSet<&str> = disk_files.iter().map(String::as_str).collect();

    for (path, _) in &cached {
        if !on_disk.contains(path.as_str()) {
            info!(file = %path, version = %version.identifier, "File gone from disk, soft-deleting");
            files::soft_delete_file(&ctx.graph, project, path, &version.identifier).await?;
            if let Err(e) = file_cache::delete_entry(&ctx.cache, project, path).await {
                warn!(file = %path, error = %e, "Failed to purge cache entry");
            }
        }
    }

    // Extraction, gated on content hash. Runs in two phases over the whole
    // batch: extraction plus deletion diff for every changed file first,
    // then movement inference and write-through. Inference matches against
    // entities already tagged deleted, so if it ran file-by-file a move
    // whose destination is walked before its source would be recorded as
    // delete+create.
    let store = GraphEntityStore::new(ctx.graph.clone());
    let mut report = ScanReport::default();
    let mut pending: Vec<(String, Analysis)> = Vec::new();
    for rel in &disk_files {
        let abs = root.join(rel);
        let bytes = match std::fs::read(&abs) {
            Ok(b) => b,
            Err(e) => {
                warn!(file = %rel, error = %e, "Failed to read file, counting as failed");
                report.failed += 1;
                continue;
            }
        };

        let hash = content_hash(&bytes);
        if cached_hashes.get(rel.as_str()) == Some(&hash.as_str()) {
            report.unchanged += 1;
            continue;
        }

        let source = String::from_utf8_lossy(&bytes).into_owned();
        let entry = FileCacheEntry::from_content(source.clone(), hash);
        if let Err(e) = file_cache::set_entry(&ctx.cache, project, rel, &entry).await {
            warn!(file = %rel, error = %e, "Failed to update cache entry");
        }

        match pipeline::extract_and_diff(&store, &ctx.registry, project, rel, &source, &version)
            .await
        {
            Ok(Some(analysis)) => pending.push((rel.clone(), analysis)),
            Ok(None) => report.processed += 1,
            Err(e) => {
                warn!(file = %rel, error = %e, "Extraction failed, continuing batch");
                report.failed += 1;
            }
        }
    }

    for (rel, analysis) in &pending {
        match pipeline::write_through(&store, project, analysis, &version, ctx.move_window_minutes)
            .await
        {
            Ok(()) => report.processed += 1,
            Err(e) => {
                warn!(file = %rel, error = %e, "Write-through failed, continuing batch");
                report.failed += 1;
            }
        }
    }

    info!(
        project,
        processed = report.processed,
        failed = report.failed,
        unchanged = report.unchanged,
        version = %version.identifier,
        "Full scan complete"
    );
    Ok(report)
}
