//! Entity pipeline: extraction → deletion diff → movement inference →
//! versioned write-through.
//!
//! The pipeline runs in two phases. `extract_and_diff` records deletions for
//! one changed file; `write_through` runs movement inference and upserts.
//! A batch caller must finish phase one for every changed file before
//! starting phase two: inference matches fresh entities against entities
//! already tagged deleted, so a move whose destination file is visited
//! before its source would otherwise be recorded as delete+create.

use std::collections::HashSet;

use anyhow::Result;
use tracing::{debug, info};

use atlas_core::model::{CodeEntity, EntityKind, Version};
use atlas_graph::store::entities::MovedCandidate;

use crate::analyzer::{Analysis, AnalyzerRegistry};
use crate::store::EntityStore;

/// Phase one: extract one changed file and tag entities that disappeared
/// from it as deleted in this version.
///
/// Returns the analysis for the write-through phase, or `None` when no
/// analyzer claims the file; the caller has already done File/Directory
/// bookkeeping, and that is all such files get.
pub async fn extract_and_diff(
    store: &dyn EntityStore,
    registry: &AnalyzerRegistry,
    project: &str,
    rel_path: &str,
    source: &str,
    version: &Version,
) -> Result<Option<Analysis>> {
    let Some(analyzer) = registry.analyzer_for(std::path::Path::new(rel_path)) else {
        debug!(file = rel_path, "No analyzer for file, bookkeeping only");
        return Ok(None);
    };

    let analysis = analyzer.analyze(rel_path, source)?;
    debug!(
        file = rel_path,
        analyzer = analyzer.name(),
        entities = analysis.entities.len(),
        calls = analysis.call_edges.len(),
        "Extraction complete"
    );

    // Deletion diff: names recorded for this exact file that the fresh
    // extraction no longer produces are tagged deleted-in-this-version.
    let previous = store.recorded_entity_names(project, rel_path).await?;
    let current: HashSet<&str> = analysis
        .entities
        .iter()
        .filter(|e| e.kind.tracks_history())
        .map(|e| e.name.as_str())
        .collect();
    for name in missing_names(&previous, &current) {
        info!(file = rel_path, entity = %name, version = %version.identifier, "Entity deleted");
        store
            .mark_entity_deleted(project, rel_path, name, &version.identifier)
            .await?;
    }

    Ok(Some(analysis))
}

/// Phase two: movement inference and versioned write-through for one
/// analyzed file.
pub async fn write_through(
    store: &dyn EntityStore,
    project: &str,
    analysis: &Analysis,
    version: &Version,
    move_window_minutes: i64,
) -> Result<()> {
    // Movement inference must run before the upserts below: relabeling
    // renames the old node's key to this file, and the MERGE then reuses it
    // instead of minting a second node.
    for entity in analysis.entities.iter().filter(|e| e.kind.tracks_history()) {
        let candidates = store
            .find_deleted_candidates(project, &entity.name, &entity.file_path, move_window_minutes)
            .await?;

        if let Some(candidate) = pick_move_candidate(entity, &candidates) {
            info!(
                entity = %entity.name,
                from = %candidate.file_path,
                to = %entity.file_path,
                "Entity moved"
            );
            store
                .mark_entity_moved(
                    project,
                    entity.kind,
                    &entity.name,
                    &candidate.file_path,
                    &entity.file_path,
                )
                .await?;
        }
    }

    // Write-through: every extracted entity is upserted and linked to the
    // active version.
    for entity in &analysis.entities {
        store.upsert_entity(project, entity).await?;
        store
            .link_observed(
                project,
                entity.kind,
                &entity.name,
                &entity.file_path,
                &version.identifier,
            )
            .await?;
    }

    for edge in &analysis.call_edges {
        store.create_call_edge(project, edge).await?;
    }

    Ok(())
}

/// Both phases back to back, for a pass containing exactly one file (the
/// incremental strategy).
pub async fn process_file(
    store: &dyn EntityStore,
    registry: &AnalyzerRegistry,
    project: &str,
    rel_path: &str,
    source: &str,
    version: &Version,
    move_window_minutes: i64,
) -> Result<()> {
    if let Some(analysis) =
        extract_and_diff(store, registry, project, rel_path, source, version).await?
    {
        write_through(store, project, &analysis, version, move_window_minutes).await?;
    }
    Ok(())
}

/// Names present in the previous recording but absent from the current
/// extraction.
pub fn missing_names<'a>(previous: &'a [String], current: &HashSet<&str>) -> Vec<&'a str> {
    previous
        .iter()
        .map(String::as_str)
        .filter(|name| !current.contains(name))
        .collect()
}

/// Select the deleted entity a freshly extracted one moved from.
///
/// Candidates are same-named entities deleted in a different file within the
/// recent window. Functions must also match on parameter list. When several
/// match, the most recently deleted wins. The heuristic can mis-pair under
/// concurrent same-signature deletions; accepted.
pub fn pick_move_candidate<'a>(
    entity: &CodeEntity,
    candidates: &'a [MovedCandidate],
) -> Option<&'a MovedCandidate> {
    candidates
        .iter()
        .filter(|c| {
            entity.kind != EntityKind::Function || c.parameters == entity.parameters
        })
        .max_by(|a, b| a.deleted_at.cmp(&b.deleted_at))
}
