//! Write operations for the asset graph.
//!
//! Every mutating call is one transactional scope: multi-statement flows
//! run inside an explicit transaction that commits at the end, so either
//! the whole operation lands or none of it does. Dropping the transaction
//! on an error path rolls back. Deletes are idempotent; deleting something
//! absent is success.

use chrono::Utc;
use neo4rs::{query, Txn};

use assetgraph_core::{GraphNode, GraphRelationship, PropertyMap};

use crate::client::{txn_query_one, GraphClient, GraphError};
use crate::cypher::{self, RelType};
use crate::mapper::{self, NODE_SET_CLAUSE};
use crate::value::map_to_bolt;

impl GraphClient {
    // ── Node Writes ──────────────────────────────────────────────

    /// Create a node and return it populated with the store-assigned id.
    pub async fn create_node(&self, node: &GraphNode) -> Result<GraphNode, GraphError> {
        let text = format!("CREATE (n:ITEM) SET {NODE_SET_CLAUSE} RETURN id(n) AS node_id");
        let q = mapper::bind_node(query(&text), node);

        let row = self
            .query_one(q)
            .await?
            .ok_or_else(|| GraphError::Store("node create returned no id".to_string()))?;
        let node_id: i64 = row
            .get("node_id")
            .map_err(|e| GraphError::Deserialize(format!("failed to read created id: {e}")))?;

        tracing::debug!(cbdb_id = %node.cbdb_id, node_id, "created node");
        let mut created = node.clone();
        created.id = Some(node_id);
        created.refresh_link_flag();
        Ok(created)
    }

    /// Overwrite every field of an existing node.
    ///
    /// Fails with `InvalidArgument` when the record has no id and with
    /// `NotFound` when no stored node carries that id.
    pub async fn update_node(&self, node: &GraphNode) -> Result<GraphNode, GraphError> {
        let id = node.id.ok_or_else(|| {
            GraphError::InvalidArgument("node id is required for update".to_string())
        })?;

        let mut txn = self.start_txn().await?;

        let exists = query("MATCH (n:ITEM) WHERE id(n) = $id RETURN id(n) AS node_id")
            .param("id", id);
        if txn_query_one(&mut txn, exists).await?.is_none() {
            return Err(GraphError::node_not_found(id.to_string()));
        }

        let text = format!("MATCH (n:ITEM) WHERE id(n) = $id SET {NODE_SET_CLAUSE}");
        let q = mapper::bind_node(query(&text), node).param("id", id);
        txn.run(q).await?;
        txn.commit().await?;

        tracing::debug!(cbdb_id = %node.cbdb_id, node_id = id, "updated node");
        let mut updated = node.clone();
        updated.refresh_link_flag();
        Ok(updated)
    }

    /// Delete a node (and its edges) by store-assigned id.
    pub async fn delete_node(&self, id: i64) -> Result<(), GraphError> {
        let q = query("MATCH (n:ITEM) WHERE id(n) = $id DETACH DELETE n").param("id", id);
        self.run(q).await
    }

    /// Delete a node (and its edges) by business key.
    pub async fn delete_node_by_cbdb_id(&self, cbdb_id: &str) -> Result<(), GraphError> {
        let q = query("MATCH (n:ITEM {cbdb_id: $cbdb_id}) DETACH DELETE n")
            .param("cbdb_id", cbdb_id);
        self.run(q).await
    }

    // ── Relationship Writes ──────────────────────────────────────

    /// Create a typed edge between two nodes identified by business key.
    pub async fn create_relationship(
        &self,
        source_cbdb_id: &str,
        target_cbdb_id: &str,
        rel_type: &RelType,
    ) -> Result<GraphRelationship, GraphError> {
        self.create_relationship_with_properties(
            source_cbdb_id,
            target_cbdb_id,
            rel_type,
            &PropertyMap::new(),
        )
        .await
    }

    /// Create a typed edge carrying the given dynamic properties.
    ///
    /// Endpoints are resolved by business key inside the same transaction;
    /// a missing endpoint fails the whole call with `NotFound`. The
    /// returned record holds exactly the caller's property map. Keys
    /// colliding with the reserved timestamp properties are rejected
    /// with `InvalidArgument`.
    pub async fn create_relationship_with_properties(
        &self,
        source_cbdb_id: &str,
        target_cbdb_id: &str,
        rel_type: &RelType,
        properties: &PropertyMap,
    ) -> Result<GraphRelationship, GraphError> {
        let mut txn = self.start_txn().await?;

        let source = resolve_node(&mut txn, source_cbdb_id).await?;
        let target = resolve_node(&mut txn, target_cbdb_id).await?;

        let now = Utc::now();
        let stored = mapper::with_timestamps(properties, now, now)?;
        let q = cypher::create_edge(source_cbdb_id, target_cbdb_id, rel_type, &stored)?;
        let row = txn_query_one(&mut txn, q).await?.ok_or_else(|| {
            GraphError::Store(format!(
                "edge create returned no id for ({source_cbdb_id})-[:{rel_type}]->({target_cbdb_id})"
            ))
        })?;
        let rel_id: i64 = row
            .get("rel_id")
            .map_err(|e| GraphError::Deserialize(format!("failed to read created edge id: {e}")))?;

        txn.commit().await?;
        tracing::debug!(
            source = source_cbdb_id,
            target = target_cbdb_id,
            rel_type = %rel_type,
            rel_id,
            "created relationship"
        );

        let mut rel = GraphRelationship::new(source, target, rel_type.as_str());
        rel.id = Some(rel_id);
        rel.created_at = now;
        rel.updated_at = now;
        rel.set_properties(properties.clone());
        Ok(rel)
    }

    /// Idempotent edge creation: MERGE instead of CREATE, no properties.
    /// Useful for re-runnable link loading.
    pub async fn merge_relationship(
        &self,
        source_cbdb_id: &str,
        target_cbdb_id: &str,
        rel_type: &RelType,
    ) -> Result<(), GraphError> {
        self.run(cypher::merge_edge(source_cbdb_id, target_cbdb_id, rel_type))
            .await
    }

    /// Update a relationship's dynamic properties.
    ///
    /// Endpoints, creation timestamp, and type are immutable: whatever the
    /// caller supplies, the persisted values win. The update timestamp is
    /// refreshed and the dynamic property set is overwritten wholesale.
    pub async fn update_relationship(
        &self,
        rel: &GraphRelationship,
    ) -> Result<GraphRelationship, GraphError> {
        let id = rel.id.ok_or_else(|| {
            GraphError::InvalidArgument("relationship id is required for update".to_string())
        })?;

        let mut txn = self.start_txn().await?;

        let existing_q = query(
            "MATCH (s:ITEM)-[r]->(t:ITEM) WHERE id(r) = $id \
             RETURN s, t, id(r) AS rel_id, type(r) AS rel_type, properties(r) AS rel_props",
        )
        .param("id", id);
        let row = txn_query_one(&mut txn, existing_q)
            .await?
            .ok_or_else(|| GraphError::relationship_not_found(id.to_string()))?;
        let existing = mapper::relationship_from_row(&row)?;

        let mut updated = rel.clone();
        updated.source_node = existing.source_node;
        updated.target_node = existing.target_node;
        updated.rel_type = existing.rel_type;
        updated.created_at = existing.created_at;
        updated.touch();

        let stored = mapper::with_timestamps(
            &updated.properties_snapshot(),
            updated.created_at,
            updated.updated_at,
        )?;
        let q = query(
            "MATCH (s:ITEM)-[r]->(t:ITEM) WHERE id(r) = $id SET r = $props",
        )
        .param("id", id)
        .param("props", map_to_bolt(&stored));
        txn.run(q).await?;
        txn.commit().await?;

        tracing::debug!(rel_id = id, "updated relationship");
        Ok(updated)
    }

    /// Delete a relationship by store-assigned id.
    pub async fn delete_relationship(&self, id: i64) -> Result<(), GraphError> {
        let q = query("MATCH (:ITEM)-[r]->(:ITEM) WHERE id(r) = $id DELETE r").param("id", id);
        self.run(q).await
    }

    /// Delete the edges matching exactly (source, target, type).
    pub async fn delete_relationship_between(
        &self,
        source_cbdb_id: &str,
        target_cbdb_id: &str,
        rel_type: &RelType,
    ) -> Result<(), GraphError> {
        self.run(cypher::delete_edge(source_cbdb_id, target_cbdb_id, rel_type))
            .await
    }
}

/// Resolve a node by business key inside an open transaction.
async fn resolve_node(txn: &mut Txn, cbdb_id: &str) -> Result<GraphNode, GraphError> {
    let q = query("MATCH (n:ITEM {cbdb_id: $cbdb_id}) RETURN n LIMIT 1").param("cbdb_id", cbdb_id);
    match txn_query_one(txn, q).await? {
        Some(row) => {
            let node: neo4rs::Node = row
                .get("n")
                .map_err(|e| GraphError::Deserialize(format!("failed to read node: {e}")))?;
            Ok(mapper::node_from_bolt(&node))
        }
        None => Err(GraphError::node_not_found(cbdb_id)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::{CREATED_AT, UPDATED_AT};

    // Reserved timestamps ride along with the dynamic properties and are
    // stripped back out by the mapper on read.
    #[test]
    fn with_timestamps_adds_reserved_keys() {
        let mut props = PropertyMap::new();
        props.insert("weight".to_string(), serde_json::json!(5));

        let now = Utc::now();
        let stored = mapper::with_timestamps(&props, now, now).unwrap();
        assert_eq!(stored.len(), 3);
        assert_eq!(stored["weight"], serde_json::json!(5));
        assert_eq!(stored[CREATED_AT], serde_json::json!(now.to_rfc3339()));
        assert_eq!(stored[UPDATED_AT], serde_json::json!(now.to_rfc3339()));
    }

    // A caller-supplied value under a reserved key would be clobbered on
    // write and stripped on read, so it must never reach the store.
    #[test]
    fn with_timestamps_rejects_reserved_keys() {
        let now = Utc::now();
        for reserved in [CREATED_AT, UPDATED_AT] {
            let mut props = PropertyMap::new();
            props.insert(
                reserved.to_string(),
                serde_json::json!("2020-01-01T00:00:00Z"),
            );
            let err = mapper::with_timestamps(&props, now, now).unwrap_err();
            assert!(
                matches!(err, GraphError::InvalidArgument(_)),
                "{reserved} should be rejected"
            );
        }
    }
}
