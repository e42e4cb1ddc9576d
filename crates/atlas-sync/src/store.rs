//! Entity-store seam between the pipeline and the graph.
//!
//! The pipeline's correctness properties (deletion diff, pass-level
//! movement inference) are about call ordering, not Cypher, so they are
//! expressed against this trait and the graph-backed implementation stays a
//! thin delegation layer.

use anyhow::Result;
use async_trait::async_trait;

use atlas_core::model::{CallEdge, CodeEntity, EntityKind};
use atlas_graph::GraphClient;
use atlas_graph::store::entities::{self, MovedCandidate};
use atlas_graph::store::versions;

/// Graph operations the entity pipeline writes through.
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Names of functions/classes currently recorded (not deleted) for a file.
    async fn recorded_entity_names(&self, project: &str, file_path: &str) -> Result<Vec<String>>;

    /// Tag a recorded entity as deleted in the given version.
    async fn mark_entity_deleted(
        &self,
        project: &str,
        file_path: &str,
        name: &str,
        version: &str,
    ) -> Result<()>;

    /// Same-named entities deleted in other files within the recent window.
    async fn find_deleted_candidates(
        &self,
        project: &str,
        name: &str,
        exclude_file: &str,
        window_minutes: i64,
    ) -> Result<Vec<MovedCandidate>>;

    /// Relabel a deleted entity as moved to a new file.
    async fn mark_entity_moved(
        &self,
        project: &str,
        kind: EntityKind,
        name: &str,
        old_file: &str,
        new_file: &str,
    ) -> Result<()>;

    /// Upsert an extracted entity and its declaring-file edge.
    async fn upsert_entity(&self, project: &str, entity: &CodeEntity) -> Result<()>;

    /// Link an entity to the version it was observed in.
    async fn link_observed(
        &self,
        project: &str,
        kind: EntityKind,
        name: &str,
        file_path: &str,
        version: &str,
    ) -> Result<()>;

    /// Record a caller-to-callee edge.
    async fn create_call_edge(&self, project: &str, edge: &CallEdge) -> Result<()>;
}

/// Production store writing through to Neo4j.
pub struct GraphEntityStore {
    graph: GraphClient,
}

impl GraphEntityStore {
    pub fn new(graph: GraphClient) -> Self {
        Self { graph }
    }
}

#[async_trait]
impl EntityStore for GraphEntityStore {
    async fn recorded_entity_names(&self, project: &str, file_path: &str) -> Result<Vec<String>> {
        entities::recorded_entity_names(&self.graph, project, file_path).await
    }

    async fn mark_entity_deleted(
        &self,
        project: &str,
        file_path: &str,
        name: &str,
        version: &str,
    ) -> Result<()> {
        entities::mark_entity_deleted(&self.graph, project, file_path, name, version).await
    }

    async fn find_deleted_candidates(
        &self,
        project: &str,
        name: &str,
        exclude_file: &str,
        window_minutes: i64,
    ) -> Result<Vec<MovedCandidate>> {
        entities::find_deleted_candidates(&self.graph, project, name, exclude_file, window_minutes)
            .await
    }

    async fn mark_entity_moved(
        &self,
        project: &str,
        kind: EntityKind,
        name: &str,
        old_file: &str,
        new_file: &str,
    ) -> Result<()> {
        entities::mark_entity_moved(&self.graph, project, kind, name, old_file, new_file).await
    }

    async fn upsert_entity(&self, project: &str, entity: &CodeEntity) -> Result<()> {
        entities::upsert_entity(&self.graph, project, entity).await
    }

    async fn link_observed(
        &self,
        project: &str,
        kind: EntityKind,
        name: &str,
        file_path: &str,
        version: &str,
    ) -> Result<()> {
        versions::link_observed(&self.graph, project, kind, name, file_path, version).await
    }

    async fn create_call_edge(&self, project: &str, edge: &CallEdge) -> Result<()> {
        entities::create_call_edge(&self.graph, project, edge).await
    }
}
