//! AssetGraph gateway — Neo4j persistence and query layer.
//!
//! This crate is the single access point for the asset graph. Domain
//! records go in and out through the entity mapper, edge operations that
//! Cypher cannot parameterize go through the validated query builder, and
//! raw query results come back as normalized field-to-value rows.

pub mod client;
pub mod cypher;
mod mapper;
pub mod mutations;
pub mod queries;
pub mod value;

pub use client::{GraphClient, GraphConfig, GraphError};
pub use cypher::RelType;
pub use value::{QueryRow, StoreValue};
