//! Translation between domain records and the store's node/edge shape.
//!
//! Inbound mapping copies the declared properties and ignores anything
//! else on the stored entity, so nodes written by newer schema versions
//! still read cleanly. Outbound mapping recomputes the derived `isLink`
//! flag from the current type tag; a stored node never disagrees with
//! its tag.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use neo4rs::{BoltFloat, BoltInteger, BoltNull, BoltString, BoltType, Query, Row};

use assetgraph_core::types::link_flag;
use assetgraph_core::{GraphNode, GraphRelationship, PropertyMap};

use crate::client::GraphError;
use crate::value::StoreValue;

/// Edge properties managed by the gateway itself, kept out of the bag.
pub(crate) const CREATED_AT: &str = "created_at";
pub(crate) const UPDATED_AT: &str = "updated_at";

/// SET clause covering every declared node property. The parameter names
/// line up with `bind_node`.
pub(crate) const NODE_SET_CLAUSE: &str = "n.cbdb_id = $cbdb_id, n.name = $name, \
     n.itemType = $item_type, n.isLink = $is_link, n.importance = $importance, \
     n.status = $status, n.Status = $status_detail, n.loc_id = $loc_id, \
     n.loc_Lat = $loc_lat, n.loc_Lon = $loc_lon, n.itemIcon = $item_icon, \
     n.numberOfIncidents = $number_of_incidents, n.numberOfEvents = $number_of_events, \
     n.numberOfPlanned = $number_of_planned";

/// Bind every declared node property onto a query, recomputing `isLink`.
pub(crate) fn bind_node(q: Query, node: &GraphNode) -> Query {
    q.param("cbdb_id", node.cbdb_id.as_str())
        .param("name", opt_string(node.name.as_deref()))
        .param("item_type", opt_string(node.item_type()))
        .param("is_link", link_flag(node.item_type()))
        .param("importance", opt_string(node.importance.as_deref()))
        .param("status", opt_string(node.status.as_deref()))
        .param("status_detail", opt_string(node.status_detail.as_deref()))
        .param("loc_id", opt_string(node.loc_id.as_deref()))
        .param("loc_lat", opt_f64(node.location_lat))
        .param("loc_lon", opt_f64(node.location_lon))
        .param("item_icon", opt_string(node.item_icon.as_deref()))
        .param("number_of_incidents", opt_i64(node.number_of_incidents))
        .param("number_of_events", opt_i64(node.number_of_events))
        .param("number_of_planned", opt_i64(node.number_of_planned))
}

/// Map a stored node back into the domain record.
pub(crate) fn node_from_bolt(node: &neo4rs::Node) -> GraphNode {
    let mut mapped = GraphNode::new(node.get::<String>("cbdb_id").unwrap_or_default());
    mapped.id = Some(node.id());
    mapped.name = node.get("name").ok();
    mapped.set_item_type(node.get("itemType").ok());
    mapped.importance = node.get("importance").ok();
    mapped.status = node.get("status").ok();
    mapped.status_detail = node.get("Status").ok();
    mapped.loc_id = node.get("loc_id").ok();
    mapped.location_lat = node.get("loc_Lat").ok();
    mapped.location_lon = node.get("loc_Lon").ok();
    mapped.item_icon = node.get("itemIcon").ok();
    mapped.number_of_incidents = node.get("numberOfIncidents").ok();
    mapped.number_of_events = node.get("numberOfEvents").ok();
    mapped.number_of_planned = node.get("numberOfPlanned").ok();
    mapped
}

/// Map one `RETURN s, t, id(r) AS rel_id, type(r) AS rel_type,
/// properties(r) AS rel_props` row into a relationship record.
pub(crate) fn relationship_from_row(row: &Row) -> Result<GraphRelationship, GraphError> {
    let source: neo4rs::Node = row
        .get("s")
        .map_err(|e| GraphError::Deserialize(format!("failed to read source node: {e}")))?;
    let target: neo4rs::Node = row
        .get("t")
        .map_err(|e| GraphError::Deserialize(format!("failed to read target node: {e}")))?;
    let rel_id: i64 = row
        .get("rel_id")
        .map_err(|e| GraphError::Deserialize(format!("failed to read edge id: {e}")))?;
    let rel_type: String = row
        .get("rel_type")
        .map_err(|e| GraphError::Deserialize(format!("failed to read edge type: {e}")))?;
    let raw_props: BTreeMap<String, StoreValue> = row.get("rel_props").unwrap_or_default();

    let mut props = PropertyMap::new();
    let mut created_at = None;
    let mut updated_at = None;
    for (key, value) in raw_props {
        let value = value.into_json();
        match key.as_str() {
            CREATED_AT => created_at = parse_timestamp(&value),
            UPDATED_AT => updated_at = parse_timestamp(&value),
            _ => {
                props.insert(key, value);
            }
        }
    }

    let mut rel = GraphRelationship::new(
        node_from_bolt(&source),
        node_from_bolt(&target),
        rel_type,
    );
    rel.id = Some(rel_id);
    // Edges created outside the gateway may lack timestamps; fall back to now.
    rel.created_at = created_at.unwrap_or_else(Utc::now);
    rel.updated_at = updated_at.unwrap_or(rel.created_at);
    rel.set_properties(props);
    Ok(rel)
}

fn parse_timestamp(value: &serde_json::Value) -> Option<DateTime<Utc>> {
    value
        .as_str()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

fn opt_string(value: Option<&str>) -> BoltType {
    match value {
        Some(s) => BoltType::String(BoltString::new(s)),
        None => BoltType::Null(BoltNull),
    }
}

fn opt_f64(value: Option<f64>) -> BoltType {
    match value {
        Some(f) => BoltType::Float(BoltFloat::new(f)),
        None => BoltType::Null(BoltNull),
    }
}

fn opt_i64(value: Option<i64>) -> BoltType {
    match value {
        Some(i) => BoltType::Integer(BoltInteger::new(i)),
        None => BoltType::Null(BoltNull),
    }
}

/// Reserved timestamp properties merged into the dynamic set on write.
///
/// A caller-supplied key colliding with a reserved property would be
/// overwritten here and stripped on read, so it is rejected up front.
pub(crate) fn with_timestamps(
    properties: &PropertyMap,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
) -> Result<PropertyMap, GraphError> {
    for reserved in [CREATED_AT, UPDATED_AT] {
        if properties.contains_key(reserved) {
            return Err(GraphError::InvalidArgument(format!(
                "property key is reserved: {reserved:?}"
            )));
        }
    }

    let mut merged = properties.clone();
    merged.insert(
        CREATED_AT.to_string(),
        serde_json::Value::String(created_at.to_rfc3339()),
    );
    merged.insert(
        UPDATED_AT.to_string(),
        serde_json::Value::String(updated_at.to_rfc3339()),
    );
    Ok(merged)
}
