//! CodeAtlas Redis Layer
//!
//! Async Redis access for the synchronization engine: per-file hash cache
//! entries keyed by (project, path), and fire-and-forget publication of
//! watcher status and file-change events.

pub mod client;
pub mod events;
pub mod file_cache;

pub use client::{CacheError, CacheResult, RedisPool, init_pool};
pub use events::{
    FILE_CHANGE_CHANNEL, WATCHER_STATUS_CHANNEL, WatcherEvent, publish_event,
};
pub use file_cache::FileCacheEntry;
