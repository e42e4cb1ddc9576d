//! Neo4j connection client.

use anyhow::{Context, Result};
use atlas_core::config::GraphSettings;
use neo4rs::{ConfigBuilder, Graph, Query};

/// Client for graph-store operations.
#[derive(Clone)]
pub struct GraphClient {
    graph: Graph,
}

impl GraphClient {
    /// Create a new GraphClient from settings.
    ///
    /// neo4rs uses a lazy deadpool: `Graph::connect` only builds the pool
    /// object without opening a bolt connection. We ping with `RETURN 1`
    /// immediately so callers can wrap this in a timeout and fail fast when
    /// Neo4j is unreachable.
    pub async fn connect(settings: &GraphSettings) -> Result<Self> {
        let config = ConfigBuilder::default()
            .uri(&settings.uri)
            .user(&settings.user)
            .password(&settings.password)
            .db("neo4j")
            .max_connections(8)
            .fetch_size(50)
            .build()
            .context("Failed to build Neo4j config")?;

        let graph = Graph::connect(config)
            .await
            .context("Failed to create Neo4j connection pool")?;

        graph
            .run(Query::new("RETURN 1".to_string()))
            .await
            .context("Neo4j is not responding to queries")?;

        Ok(Self { graph })
    }

    /// Execute a Cypher query that returns no results.
    pub async fn execute(&self, query: Query) -> Result<()> {
        self.graph
            .run(query)
            .await
            .context("Neo4j query execution failed")?;
        Ok(())
    }

    /// Execute a Cypher query and return results as rows.
    pub async fn query(&self, query: Query) -> Result<Vec<neo4rs::Row>> {
        let mut result = self.graph.execute(query).await.context("Neo4j query failed")?;

        let mut rows = Vec::new();
        while let Ok(Some(row)) = result.next().await {
            rows.push(row);
        }
        Ok(rows)
    }
}
