//! # Atlas Graph
//!
//! Neo4j integration for CodeAtlas.
//!
//! Provides the connection client, schema initialization, and the store
//! operations the synchronization engine writes through: project, directory
//! and file upserts, version minting, entity write-through with soft-delete
//! and movement relabeling, and call edges.

pub mod client;
pub mod schema;
pub mod store;

pub use client::GraphClient;
pub use schema::initialize_schema;
