//! CodeAtlas Synchronization Engine
//!
//! Translates detected filesystem state changes into graph-store writes.
//! Two strategies drive the same entity pipeline: the full scan walks the
//! whole tree and diffs content hashes against the cache, the incremental
//! strategy reacts to a single live watch event.

pub mod analyzer;
pub mod full_scan;
pub mod incremental;
pub mod pipeline;
pub mod store;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use atlas_core::model::{ChangeEvent, ScanReport};
use atlas_graph::GraphClient;
use atlas_redis::RedisPool;

pub use analyzer::{Analysis, AnalyzerRegistry, SourceAnalyzer};
pub use full_scan::full_scan;
pub use incremental::handle_event;
pub use store::{EntityStore, GraphEntityStore};

/// Shared handles the strategies and pipeline run against. Constructed once
/// by the service registry and cloned per project.
#[derive(Clone)]
pub struct SyncContext {
    pub graph: GraphClient,
    pub cache: RedisPool,
    pub registry: Arc<AnalyzerRegistry>,
    /// How far back movement inference looks for deleted entities.
    pub move_window_minutes: i64,
}

/// The two operations the watch layer drives: a seeding full scan and a
/// per-event incremental run. A trait seam so the watch lifecycle can be
/// exercised without live stores.
#[async_trait]
pub trait Synchronizer: Send + Sync {
    async fn seed(&self, project: &str, root: &Path) -> Result<ScanReport>;
    async fn apply(&self, project: &str, root: &Path, event: &ChangeEvent) -> Result<()>;
}

/// Production synchronizer writing through to the graph store and cache.
pub struct GraphSynchronizer {
    ctx: SyncContext,
}

impl GraphSynchronizer {
    pub fn new(ctx: SyncContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Synchronizer for GraphSynchronizer {
    async fn seed(&self, project: &str, root: &Path) -> Result<ScanReport> {
        full_scan(&self.ctx, project, root).await
    }

    async fn apply(&self, project: &str, root: &Path, event: &ChangeEvent) -> Result<()> {
        handle_event(&self.ctx, project, root, event).await
    }
}
