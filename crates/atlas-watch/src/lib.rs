//! CodeAtlas Watch Layer
//!
//! Owns per-project watch lifecycles: a seeding full scan, then a live
//! notify subscription whose stable events are dispatched serially into the
//! synchronizer. Status transitions are published fire-and-forget over
//! Redis.

pub mod manager;
pub mod subscription;

pub use manager::{WatchManager, WatchProcessInfo, WatchStatus};
pub use subscription::WatchSubscription;
