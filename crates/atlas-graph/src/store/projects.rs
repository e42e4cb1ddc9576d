//! Project node upserts.

use anyhow::Result;
use neo4rs::Query;

use crate::GraphClient;

/// Create or refresh the Project node. One node per root, keyed by name.
pub async fn upsert_project(client: &GraphClient, name: &str, root_path: &str) -> Result<()> {
    let query = Query::new(
        "MERGE (p:Project {name: $name})
         SET p.root_path = $root_path,
             p.updated_at = $updated_at"
            .to_string(),
    )
    .param("name", name)
    .param("root_path", root_path)
    .param("updated_at", chrono::Utc::now().to_rfc3339());

    client.execute(query).await
}
