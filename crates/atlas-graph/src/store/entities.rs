//! Source-entity write-through, soft-delete, and movement relabeling.

use anyhow::Result;
use atlas_core::model::{CallEdge, CodeEntity, EntityKind};
use neo4rs::Query;

use super::node_key;
use crate::GraphClient;

/// A previously recorded entity marked deleted, considered by movement
/// inference as the possible origin of a freshly extracted one.
#[derive(Debug, Clone)]
pub struct MovedCandidate {
    pub name: String,
    pub file_path: String,
    pub deleted_at: String,
    pub parameters: Vec<String>,
}

/// Upsert an extracted entity. Writing an entity always revives it: the
/// deletion tag is cleared so a re-extracted entity is current again.
pub async fn upsert_entity(client: &GraphClient, project: &str, entity: &CodeEntity) -> Result<()> {
    let label = entity.kind.label();
    let cypher = format!(
        "MERGE (e:{label} {{key: $key}})
         SET e.project = $project,
             e.name = $name,
             e.file_path = $file_path,
             e.line_start = $line_start,
             e.line_end = $line_end,
             e.parameters = $parameters,
             e.deleted_in_version = null,
             e.deleted_at = null,
             e.updated_at = $updated_at"
    );

    let query = Query::new(cypher)
        .param("key", node_key(project, &[label, &entity.file_path, &entity.name]))
        .param("project", project)
        .param("name", entity.name.as_str())
        .param("file_path", entity.file_path.as_str())
        .param("line_start", entity.line_start as i64)
        .param("line_end", entity.line_end as i64)
        .param("parameters", entity.parameters.clone())
        .param("updated_at", chrono::Utc::now().to_rfc3339());

    client.execute(query).await?;

    let link = Query::new(format!(
        "MATCH (f:File {{key: $file_key}})
         MATCH (e:{label} {{key: $entity_key}})
         MERGE (f)-[:DECLARES]->(e)"
    ))
    .param("file_key", node_key(project, &[&entity.file_path]))
    .param(
        "entity_key",
        node_key(project, &[label, &entity.file_path, &entity.name]),
    );

    client.execute(link).await
}

/// Names of functions/classes currently recorded (not deleted) for a file.
/// The deletion diff compares this against the fresh extraction.
pub async fn recorded_entity_names(
    client: &GraphClient,
    project: &str,
    file_path: &str,
) -> Result<Vec<String>> {
    let query = Query::new(
        "MATCH (e)
         WHERE (e:Function OR e:Class)
           AND e.project = $project
           AND e.file_path = $file_path
           AND e.deleted_in_version IS NULL
         RETURN e.name AS name"
            .to_string(),
    )
    .param("project", project)
    .param("file_path", file_path);

    let rows = client.query(query).await?;
    let mut names = Vec::with_capacity(rows.len());
    for row in rows {
        if let Ok(name) = row.get::<String>("name") {
            names.push(name);
        }
    }
    Ok(names)
}

/// Tag a function/class in a file as deleted in the given version. Not a
/// removal: the node stays for history and movement inference.
pub async fn mark_entity_deleted(
    client: &GraphClient,
    project: &str,
    file_path: &str,
    name: &str,
    version: &str,
) -> Result<()> {
    let query = Query::new(
        "MATCH (e)
         WHERE (e:Function OR e:Class)
           AND e.project = $project
           AND e.file_path = $file_path
           AND e.name = $name
         SET e.deleted_in_version = $version,
             e.deleted_at = $deleted_at"
            .to_string(),
    )
    .param("project", project)
    .param("file_path", file_path)
    .param("name", name)
    .param("version", version)
    .param("deleted_at", chrono::Utc::now().to_rfc3339());

    client.execute(query).await
}

/// Same-named entities marked deleted in *other* files within the recent
/// window, newest deletion first. The caller applies the signature check and
/// the most-recently-deleted tie-break.
pub async fn find_deleted_candidates(
    client: &GraphClient,
    project: &str,
    name: &str,
    exclude_file: &str,
    window_minutes: i64,
) -> Result<Vec<MovedCandidate>> {
    let cutoff = (chrono::Utc::now() - chrono::Duration::minutes(window_minutes)).to_rfc3339();

    let query = Query::new(
        "MATCH (e)
         WHERE (e:Function OR e:Class)
           AND e.project = $project
           AND e.name = $name
           AND e.file_path <> $exclude_file
           AND e.deleted_in_version IS NOT NULL
           AND e.deleted_at >= $cutoff
         RETURN e.name AS name, e.file_path AS file_path,
                e.deleted_at AS deleted_at, e.parameters AS parameters
         ORDER BY e.deleted_at DESC"
            .to_string(),
    )
    .param("project", project)
    .param("name", name)
    .param("exclude_file", exclude_file)
    .param("cutoff", cutoff);

    let rows = client.query(query).await?;
    let mut candidates = Vec::with_capacity(rows.len());
    for row in rows {
        let name: String = match row.get("name") {
            Ok(v) => v,
            Err(_) => continue,
        };
        let file_path: String = match row.get("file_path") {
            Ok(v) => v,
            Err(_) => continue,
        };
        let deleted_at: String = row.get("deleted_at").unwrap_or_default();
        let parameters: Vec<String> = row.get("parameters").unwrap_or_default();
        candidates.push(MovedCandidate {
            name,
            file_path,
            deleted_at,
            parameters,
        });
    }
    Ok(candidates)
}

/// Relabel a deleted entity as moved: the file reference is updated in
/// place instead of delete+create, so the node keeps its identity and
/// history.
///
/// The destination key may already be taken when the target file previously
/// hosted a same-named entity that was deleted. Renaming over it would leave
/// two nodes sharing a key, so in that case the existing destination node is
/// revived instead and the source node stays behind as a tombstone.
pub async fn mark_entity_moved(
    client: &GraphClient,
    project: &str,
    kind: EntityKind,
    name: &str,
    old_file: &str,
    new_file: &str,
) -> Result<()> {
    let label = kind.label();
    let cypher = format!(
        "MATCH (e:{label} {{key: $old_key}})
         OPTIONAL MATCH (dest:{label} {{key: $new_key}})
         FOREACH (_ IN CASE WHEN dest IS NULL THEN [1] ELSE [] END |
             SET e.key = $new_key,
                 e.file_path = $new_file,
                 e.moved_from = $old_file,
                 e.moved_at = $moved_at,
                 e.deleted_in_version = null,
                 e.deleted_at = null)
         FOREACH (d IN CASE WHEN dest IS NULL THEN [] ELSE [dest] END |
             SET d.moved_from = $old_file,
                 d.moved_at = $moved_at,
                 d.deleted_in_version = null,
                 d.deleted_at = null)"
    );

    let query = Query::new(cypher)
        .param("old_key", node_key(project, &[label, old_file, name]))
        .param("new_key", node_key(project, &[label, new_file, name]))
        .param("new_file", new_file)
        .param("old_file", old_file)
        .param("moved_at", chrono::Utc::now().to_rfc3339());

    client.execute(query).await?;

    // Re-home the declaring edge to the new file.
    let relink = Query::new(format!(
        "MATCH (e:{label} {{key: $new_key}})
         OPTIONAL MATCH (old:File {{key: $old_file_key}})-[r:DECLARES]->(e)
         DELETE r
         WITH e
         MATCH (new:File {{key: $new_file_key}})
         MERGE (new)-[:DECLARES]->(e)"
    ))
    .param("new_key", node_key(project, &[label, new_file, name]))
    .param("old_file_key", node_key(project, &[old_file]))
    .param("new_file_key", node_key(project, &[new_file]));

    client.execute(relink).await
}

/// Record a caller → callee edge observed in a file. Both ends must already
/// exist as Function nodes in the project; an unresolved callee is a no-op.
pub async fn create_call_edge(client: &GraphClient, project: &str, edge: &CallEdge) -> Result<()> {
    let query = Query::new(
        "MATCH (caller:Function {key: $caller_key})
         MATCH (callee:Function)
         WHERE callee.project = $project AND callee.name = $callee
         MERGE (caller)-[c:CALLS]->(callee)
         SET c.file_path = $file_path"
            .to_string(),
    )
    .param(
        "caller_key",
        node_key(project, &["Function", &edge.file_path, &edge.caller]),
    )
    .param("project", project)
    .param("callee", edge.callee.as_str())
    .param("file_path", edge.file_path.as_str());

    client.execute(query).await
}
