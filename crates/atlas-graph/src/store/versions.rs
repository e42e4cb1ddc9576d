//! Version minting and observed-in links.

use anyhow::Result;
use atlas_core::model::{EntityKind, Version};
use neo4rs::Query;

use super::node_key;
use crate::GraphClient;

/// Record a Version node for a project. Idempotent: minting the same token
/// twice converges on one node.
pub async fn create_version(client: &GraphClient, project: &str, version: &Version) -> Result<()> {
    let query = Query::new(
        "MATCH (p:Project {name: $project})
         MERGE (v:Version {key: $key})
         SET v.project = $project,
             v.identifier = $identifier,
             v.timestamp = $timestamp
         MERGE (p)-[:HAS_VERSION]->(v)"
            .to_string(),
    )
    .param("project", project)
    .param("key", node_key(project, &[&version.identifier]))
    .param("identifier", version.identifier.as_str())
    .param("timestamp", version.timestamp.as_str());

    client.execute(query).await
}

/// Link an entity to the Version it was observed in. This is the write pair
/// that makes soft-delete-by-version queries possible.
pub async fn link_observed(
    client: &GraphClient,
    project: &str,
    kind: EntityKind,
    name: &str,
    file_path: &str,
    version_identifier: &str,
) -> Result<()> {
    // Labels cannot be parameterized; EntityKind::label is a fixed set.
    let cypher = format!(
        "MATCH (e:{label} {{key: $entity_key}})
         MATCH (v:Version {{key: $version_key}})
         MERGE (e)-[:OBSERVED_IN]->(v)",
        label = kind.label()
    );

    let query = Query::new(cypher)
        .param("entity_key", node_key(project, &[kind.label(), file_path, name]))
        .param("version_key", node_key(project, &[version_identifier]));

    client.execute(query).await
}
