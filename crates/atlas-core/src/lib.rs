//! CodeAtlas Core Library
//!
//! Domain model, configuration, and shared primitives for the CodeAtlas
//! code-graph synchronization engine.

pub mod coalesce;
pub mod config;
pub mod error;
pub mod hash;
pub mod ignore;
pub mod model;
pub mod retry;
pub mod vcs;

pub use coalesce::Coalescer;
pub use config::AtlasConfig;
pub use error::{AtlasError, AtlasResult};
pub use hash::content_hash;
pub use ignore::IgnoreRules;
pub use model::{
    CallEdge, ChangeEvent, ChangeKind, CodeEntity, EntityKind, ScanReport, Version,
};
pub use retry::RetryPolicy;
pub use vcs::current_version_token;
