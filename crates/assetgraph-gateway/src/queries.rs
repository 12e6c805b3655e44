//! Read operations and the raw-query escape hatch.

use neo4rs::query;

use assetgraph_core::{GraphNode, GraphRelationship, PropertyMap};

use crate::client::{GraphClient, GraphError};
use crate::mapper;
use crate::value::{self, QueryRow};

/// Projection shared by every relationship read. Type and properties come
/// back as plain values so no edge-type token ever appears in read text.
const REL_RETURN: &str =
    "RETURN s, t, id(r) AS rel_id, type(r) AS rel_type, properties(r) AS rel_props";

impl GraphClient {
    // ── Node Lookups ─────────────────────────────────────────────

    /// All nodes, in store order.
    pub async fn find_all_nodes(&self) -> Result<Vec<GraphNode>, GraphError> {
        let rows = self.query_rows(query("MATCH (n:ITEM) RETURN n")).await?;
        let mut nodes = Vec::with_capacity(rows.len());
        for row in rows {
            let node: neo4rs::Node = row
                .get("n")
                .map_err(|e| GraphError::Deserialize(format!("failed to read node: {e}")))?;
            nodes.push(mapper::node_from_bolt(&node));
        }
        Ok(nodes)
    }

    /// Look up a node by its store-assigned id. Absence is surfaced.
    pub async fn find_node_by_id(&self, id: i64) -> Result<GraphNode, GraphError> {
        let q = query("MATCH (n:ITEM) WHERE id(n) = $id RETURN n").param("id", id);
        match self.query_one(q).await? {
            Some(row) => {
                let node: neo4rs::Node = row
                    .get("n")
                    .map_err(|e| GraphError::Deserialize(format!("failed to read node: {e}")))?;
                Ok(mapper::node_from_bolt(&node))
            }
            None => Err(GraphError::node_not_found(id.to_string())),
        }
    }

    /// Look up a node by business key. At most one result; the store is
    /// asked directly with LIMIT 1, duplicates are never returned.
    pub async fn find_node_by_cbdb_id(
        &self,
        cbdb_id: &str,
    ) -> Result<Option<GraphNode>, GraphError> {
        let q = query("MATCH (n:ITEM {cbdb_id: $cbdb_id}) RETURN n LIMIT 1")
            .param("cbdb_id", cbdb_id);
        match self.query_one(q).await? {
            Some(row) => {
                let node: neo4rs::Node = row
                    .get("n")
                    .map_err(|e| GraphError::Deserialize(format!("failed to read node: {e}")))?;
                Ok(Some(mapper::node_from_bolt(&node)))
            }
            None => Ok(None),
        }
    }

    // ── Relationship Lookups ─────────────────────────────────────

    /// All relationships between ITEM nodes.
    pub async fn find_all_relationships(&self) -> Result<Vec<GraphRelationship>, GraphError> {
        let q = query(&format!("MATCH (s:ITEM)-[r]->(t:ITEM) {REL_RETURN}"));
        let rows = self.query_rows(q).await?;
        rows.iter().map(mapper::relationship_from_row).collect()
    }

    /// Look up a relationship by its store-assigned id. Absence is surfaced.
    pub async fn find_relationship_by_id(
        &self,
        id: i64,
    ) -> Result<GraphRelationship, GraphError> {
        let q = query(&format!(
            "MATCH (s:ITEM)-[r]->(t:ITEM) WHERE id(r) = $id {REL_RETURN}"
        ))
        .param("id", id);
        match self.query_one(q).await? {
            Some(row) => mapper::relationship_from_row(&row),
            None => Err(GraphError::relationship_not_found(id.to_string())),
        }
    }

    /// All relationships of the given type. The type is compared with a
    /// bound parameter, so any string is safe here.
    pub async fn find_relationships_by_type(
        &self,
        rel_type: &str,
    ) -> Result<Vec<GraphRelationship>, GraphError> {
        let q = query(&format!(
            "MATCH (s:ITEM)-[r]->(t:ITEM) WHERE type(r) = $rel_type {REL_RETURN}"
        ))
        .param("rel_type", rel_type);
        let rows = self.query_rows(q).await?;
        rows.iter().map(mapper::relationship_from_row).collect()
    }

    /// All relationships leaving the node with the given business key.
    pub async fn find_relationships_from(
        &self,
        source_cbdb_id: &str,
    ) -> Result<Vec<GraphRelationship>, GraphError> {
        let q = query(&format!(
            "MATCH (s:ITEM {{cbdb_id: $cbdb_id}})-[r]->(t:ITEM) {REL_RETURN}"
        ))
        .param("cbdb_id", source_cbdb_id);
        let rows = self.query_rows(q).await?;
        rows.iter().map(mapper::relationship_from_row).collect()
    }

    /// All relationships arriving at the node with the given business key.
    pub async fn find_relationships_to(
        &self,
        target_cbdb_id: &str,
    ) -> Result<Vec<GraphRelationship>, GraphError> {
        let q = query(&format!(
            "MATCH (s:ITEM)-[r]->(t:ITEM {{cbdb_id: $cbdb_id}}) {REL_RETURN}"
        ))
        .param("cbdb_id", target_cbdb_id);
        let rows = self.query_rows(q).await?;
        rows.iter().map(mapper::relationship_from_row).collect()
    }

    // ── Raw Queries ──────────────────────────────────────────────

    /// Run caller-supplied Cypher and normalize the result rows.
    ///
    /// Escape hatch: no domain validation is applied, the caller owns
    /// query correctness and safety.
    pub async fn execute_query(&self, text: &str) -> Result<Vec<QueryRow>, GraphError> {
        self.execute_query_with_params(text, &PropertyMap::new())
            .await
    }

    /// Run caller-supplied Cypher with bound parameters and normalize the
    /// result rows. Row order follows the store's own result order.
    pub async fn execute_query_with_params(
        &self,
        text: &str,
        params: &PropertyMap,
    ) -> Result<Vec<QueryRow>, GraphError> {
        let mut q = query(text);
        for (key, param) in params {
            q = q.param(key, value::json_to_bolt(param));
        }

        tracing::debug!(query = text, params = params.len(), "executing raw query");
        let rows = self.query_rows(q).await?;
        let mut normalized = Vec::with_capacity(rows.len());
        for row in &rows {
            normalized.push(value::row_to_map(row)?);
        }
        Ok(normalized)
    }
}
