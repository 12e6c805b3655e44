//! assetgraph-core: Shared domain types and codecs for the AssetGraph gateway.
//!
//! This crate provides the pieces used across AssetGraph components:
//! - `GraphNode` / `GraphRelationship` domain records
//! - The property-bag codec (opaque JSON string <-> flat map)
//! - Store configuration loading

pub mod config;
pub mod props;
pub mod types;

pub use props::{PropertyBag, PropertyMap};
pub use types::{GraphNode, GraphRelationship};
