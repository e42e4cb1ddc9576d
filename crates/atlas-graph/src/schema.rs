//! Neo4j schema initialization (constraints and indexes).

use anyhow::Result;
use neo4rs::Query;
use tracing::info;

use crate::GraphClient;

/// Cypher statements for schema initialization.
///
/// Directory/File/Version/entity nodes carry a derived `key` property
/// (`{project}|{path}`-style) so uniqueness is a single-property constraint.
const SCHEMA_STATEMENTS: &[&str] = &[
    "CREATE CONSTRAINT project_name IF NOT EXISTS FOR (p:Project) REQUIRE p.name IS UNIQUE",
    "CREATE CONSTRAINT directory_key IF NOT EXISTS FOR (d:Directory) REQUIRE d.key IS UNIQUE",
    "CREATE CONSTRAINT file_key IF NOT EXISTS FOR (f:File) REQUIRE f.key IS UNIQUE",
    "CREATE CONSTRAINT version_key IF NOT EXISTS FOR (v:Version) REQUIRE v.key IS UNIQUE",
    "CREATE CONSTRAINT function_key IF NOT EXISTS FOR (f:Function) REQUIRE f.key IS UNIQUE",
    "CREATE CONSTRAINT class_key IF NOT EXISTS FOR (c:Class) REQUIRE c.key IS UNIQUE",
    // Lookup indexes for deletion-diff and movement-candidate queries
    "CREATE INDEX function_name IF NOT EXISTS FOR (f:Function) ON (f.project, f.name)",
    "CREATE INDEX class_name IF NOT EXISTS FOR (c:Class) ON (c.project, c.name)",
    "CREATE INDEX file_path IF NOT EXISTS FOR (f:File) ON (f.project, f.path)",
];

/// Initialize the schema with constraints and indexes.
///
/// Safe to run multiple times - uses IF NOT EXISTS clauses.
pub async fn initialize_schema(client: &GraphClient) -> Result<()> {
    info!("Initializing Neo4j schema...");

    for statement in SCHEMA_STATEMENTS {
        client.execute(Query::new(statement.to_string())).await?;
    }

    info!(
        "Neo4j schema initialized ({} statements)",
        SCHEMA_STATEMENTS.len()
    );
    Ok(())
}
