//! Directory and File node operations.
//!
//! Directory paths are project-relative with `.` denoting the root; parent
//! edges form a rooted tree. Files are soft-deleted on unlink: the node keeps
//! its history and only gains a `deleted_in_version` tag.

use anyhow::Result;
use neo4rs::Query;

use super::node_key;
use crate::GraphClient;

/// Properties of a File node as written to the store.
#[derive(Debug, Clone)]
pub struct FileNode {
    pub path: String,
    pub name: String,
    pub extension: String,
    pub dir_path: String,
}

impl FileNode {
    /// Build node properties from a project-relative file path.
    pub fn from_rel_path(rel_path: &str) -> Self {
        let path = rel_path.replace('\\', "/");
        let name = path.rsplit('/').next().unwrap_or(&path).to_string();
        let extension = name.rsplit('.').next().filter(|e| *e != name).unwrap_or("").to_string();
        let dir_path = match path.rfind('/') {
            Some(idx) => path[..idx].to_string(),
            None => ".".to_string(),
        };
        Self {
            path,
            name,
            extension,
            dir_path,
        }
    }
}

/// Upsert a Directory node and attach it to its project.
pub async fn upsert_directory(client: &GraphClient, project: &str, path: &str) -> Result<()> {
    let name = path.rsplit('/').next().unwrap_or(path);
    let query = Query::new(
        "MATCH (p:Project {name: $project})
         MERGE (d:Directory {key: $key})
         SET d.project = $project,
             d.path = $path,
             d.name = $name,
             d.updated_at = $updated_at
         MERGE (p)-[:HAS_DIRECTORY]->(d)"
            .to_string(),
    )
    .param("project", project)
    .param("key", node_key(project, &[path]))
    .param("path", path)
    .param("name", name)
    .param("updated_at", chrono::Utc::now().to_rfc3339());

    client.execute(query).await
}

/// Create the parent → child edge between two existing Directory nodes.
pub async fn link_directory_parent(
    client: &GraphClient,
    project: &str,
    parent_path: &str,
    child_path: &str,
) -> Result<()> {
    let query = Query::new(
        "MATCH (parent:Directory {key: $parent_key})
         MATCH (child:Directory {key: $child_key})
         MERGE (parent)-[:HAS_CHILD]->(child)"
            .to_string(),
    )
    .param("parent_key", node_key(project, &[parent_path]))
    .param("child_key", node_key(project, &[child_path]));

    client.execute(query).await
}

/// Idempotently upsert every Directory on the path from the root to
/// `dir_path`, wiring parent edges as it goes. `.` is the root and is always
/// created first.
pub async fn ensure_directory_chain(
    client: &GraphClient,
    project: &str,
    dir_path: &str,
) -> Result<()> {
    upsert_directory(client, project, ".").await?;
    if dir_path == "." || dir_path.is_empty() {
        return Ok(());
    }

    let mut parent = ".".to_string();
    let mut current = String::new();
    for segment in dir_path.split('/') {
        if !current.is_empty() {
            current.push('/');
        }
        current.push_str(segment);

        upsert_directory(client, project, &current).await?;
        link_directory_parent(client, project, &parent, &current).await?;
        parent = current.clone();
    }
    Ok(())
}

/// Upsert a File node. Re-upserting a previously soft-deleted path revives
/// it by clearing the deletion tag.
pub async fn upsert_file(client: &GraphClient, project: &str, file: &FileNode) -> Result<()> {
    let query = Query::new(
        "MERGE (f:File {key: $key})
         SET f.project = $project,
             f.path = $path,
             f.name = $name,
             f.extension = $extension,
             f.dir_path = $dir_path,
             f.deleted_in_version = null,
             f.deleted_at = null,
             f.updated_at = $updated_at"
            .to_string(),
    )
    .param("key", node_key(project, &[&file.path]))
    .param("project", project)
    .param("path", file.path.as_str())
    .param("name", file.name.as_str())
    .param("extension", file.extension.as_str())
    .param("dir_path", file.dir_path.as_str())
    .param("updated_at", chrono::Utc::now().to_rfc3339());

    client.execute(query).await?;

    // Attach to its directory; a missing Directory node makes this a no-op
    // and the next full scan heals the edge.
    let link = Query::new(
        "MATCH (d:Directory {key: $dir_key})
         MATCH (f:File {key: $file_key})
         MERGE (d)-[:HAS_FILE]->(f)"
            .to_string(),
    )
    .param("dir_key", node_key(project, &[&file.dir_path]))
    .param("file_key", node_key(project, &[&file.path]));

    client.execute(link).await
}

/// Soft-delete a File: tag it with the version it disappeared in. The node
/// and its history stay in the graph.
pub async fn soft_delete_file(
    client: &GraphClient,
    project: &str,
    path: &str,
    version: &str,
) -> Result<()> {
    let query = Query::new(
        "MATCH (f:File {key: $key})
         SET f.deleted_in_version = $version,
             f.deleted_at = $deleted_at"
            .to_string(),
    )
    .param("key", node_key(project, &[path]))
    .param("version", version)
    .param("deleted_at", chrono::Utc::now().to_rfc3339());

    client.execute(query).await
}
