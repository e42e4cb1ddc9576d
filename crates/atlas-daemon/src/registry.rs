//! Construct-once service registry.
//!
//! All process-wide services (graph client, cache pool, write queue, watch
//! manager) are built here exactly once and injected downward. Nothing in
//! the engine reaches for ambient globals.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use atlas_core::{AtlasConfig, RetryPolicy};
use atlas_graph::{GraphClient, initialize_schema};
use atlas_queue::{CacheTarget, WriteQueue};
use atlas_redis::{RedisPool, init_pool};
use atlas_sync::{AnalyzerRegistry, GraphSynchronizer, SyncContext};
use atlas_watch::WatchManager;

pub struct ServiceRegistry {
    pub graph: GraphClient,
    pub cache: RedisPool,
    pub queue: WriteQueue,
    pub watchers: WatchManager,
}

impl ServiceRegistry {
    /// Connect to both stores, initialize the graph schema, and wire the
    /// engine together. `project` names the cache namespace the write queue
    /// writes through to.
    pub async fn init(config: &AtlasConfig, project: &str) -> Result<Self> {
        let graph = GraphClient::connect(&config.graph)
            .await
            .context("Failed to connect to Neo4j")?;
        initialize_schema(&graph).await?;

        let cache = init_pool(&config.redis.url)
            .await
            .context("Failed to connect to Redis")?;

        let ctx = SyncContext {
            graph: graph.clone(),
            cache: cache.clone(),
            registry: Arc::new(AnalyzerRegistry::with_builtin()),
            move_window_minutes: config.watch.move_window_minutes,
        };
        let synchronizer = Arc::new(GraphSynchronizer::new(ctx));

        let watchers = WatchManager::new(
            synchronizer,
            Some(cache.clone()),
            Duration::from_millis(config.watch.settle_ms),
        );

        let queue = WriteQueue::new(
            RetryPolicy::new(
                config.queue.max_attempts,
                Duration::from_millis(config.queue.base_delay_ms),
            ),
            Duration::from_millis(config.queue.job_timeout_ms),
            Some(CacheTarget {
                pool: cache.clone(),
                project: project.to_string(),
            }),
        );

        Ok(Self {
            graph,
            cache,
            queue,
            watchers,
        })
    }

    /// Tear everything down: kill watchers first, then drain the queue.
    pub async fn shutdown(self) {
        self.watchers.shutdown().await;
        self.queue.shutdown().await;
    }
}
