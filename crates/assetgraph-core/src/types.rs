//! Core domain types for the AssetGraph gateway.
//!
//! `GraphNode` and `GraphRelationship` are the typed records that flow
//! through the gateway; the store sees them as `ITEM`-labeled nodes and
//! typed directed edges with property maps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::props::{PropertyBag, PropertyMap};

/// Substring in an item type tag that marks the node as a link node.
pub const LINK_MARKER: &str = ":LINK:";

/// Compute the `isLink` flag for a given item type tag.
pub fn link_flag(item_type: Option<&str>) -> bool {
    item_type.map_or(false, |t| t.contains(LINK_MARKER))
}

/// A node in the asset graph.
///
/// Identity is the caller-supplied `cbdb_id` business key; `id` is the
/// store-assigned internal id and is `None` until the node is persisted.
/// Equality and hashing use the business key only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    /// Store-assigned internal id, `None` before the first save.
    #[serde(default)]
    pub id: Option<i64>,

    /// Business key. Required, expected unique (the store does not enforce it).
    pub cbdb_id: String,

    /// Display name.
    #[serde(default)]
    pub name: Option<String>,

    /// Type tag. Mutate through `set_item_type` so `is_link` stays in sync.
    #[serde(default)]
    item_type: Option<String>,

    /// Derived from `item_type`; true iff the tag contains `:LINK:`.
    #[serde(default)]
    is_link: bool,

    #[serde(default)]
    pub importance: Option<String>,

    #[serde(default)]
    pub status: Option<String>,

    /// Secondary status field, stored under the legacy `Status` property.
    #[serde(default)]
    pub status_detail: Option<String>,

    #[serde(default)]
    pub loc_id: Option<String>,

    #[serde(default)]
    pub location_lat: Option<f64>,

    #[serde(default)]
    pub location_lon: Option<f64>,

    #[serde(default)]
    pub item_icon: Option<String>,

    #[serde(default)]
    pub number_of_incidents: Option<i64>,

    #[serde(default)]
    pub number_of_events: Option<i64>,

    #[serde(default)]
    pub number_of_planned: Option<i64>,
}

impl GraphNode {
    /// Create a node with the given business key and everything else unset.
    pub fn new(cbdb_id: impl Into<String>) -> Self {
        Self {
            id: None,
            cbdb_id: cbdb_id.into(),
            name: None,
            item_type: None,
            is_link: false,
            importance: None,
            status: None,
            status_detail: None,
            loc_id: None,
            location_lat: None,
            location_lon: None,
            item_icon: None,
            number_of_incidents: None,
            number_of_events: None,
            number_of_planned: None,
        }
    }

    pub fn item_type(&self) -> Option<&str> {
        self.item_type.as_deref()
    }

    /// Set the type tag and recompute the derived `is_link` flag.
    pub fn set_item_type(&mut self, item_type: Option<String>) {
        self.is_link = link_flag(item_type.as_deref());
        self.item_type = item_type;
    }

    pub fn is_link(&self) -> bool {
        self.is_link
    }

    /// Recompute `is_link` from the current tag.
    ///
    /// Records deserialized from the wire may carry a stale flag; callers
    /// persisting a node run this first.
    pub fn refresh_link_flag(&mut self) {
        self.is_link = link_flag(self.item_type.as_deref());
    }
}

impl PartialEq for GraphNode {
    fn eq(&self, other: &Self) -> bool {
        self.cbdb_id == other.cbdb_id
    }
}

impl Eq for GraphNode {}

impl std::hash::Hash for GraphNode {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.cbdb_id.hash(state);
    }
}

/// A typed, directed edge between two nodes.
///
/// The type is an edge label in the store, fixed at creation. Endpoints are
/// immutable after creation; updates force them back to the persisted
/// values. Equality is by store-assigned id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphRelationship {
    /// Store-assigned edge id, `None` before creation.
    #[serde(default)]
    pub id: Option<i64>,

    #[serde(rename = "type")]
    pub rel_type: String,

    pub source_node: GraphNode,

    pub target_node: GraphNode,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    /// Dynamic properties; serialized on the wire as a single opaque
    /// JSON string (`propertiesJson`).
    #[serde(rename = "propertiesJson", default)]
    props: PropertyBag,
}

impl GraphRelationship {
    pub fn new(source_node: GraphNode, target_node: GraphNode, rel_type: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            rel_type: rel_type.into(),
            source_node,
            target_node,
            created_at: now,
            updated_at: now,
            props: PropertyBag::default(),
        }
    }

    /// Dynamic properties as a map, parsing the raw form if necessary.
    pub fn properties(&mut self) -> &PropertyMap {
        self.props.as_map()
    }

    /// Dynamic properties as an owned map without mutating the cached state.
    pub fn properties_snapshot(&self) -> PropertyMap {
        self.props.to_map()
    }

    /// Replace the whole property set.
    pub fn set_properties(&mut self, properties: PropertyMap) {
        self.props = PropertyBag::from_map(properties);
    }

    /// Replace the serialized property form directly, invalidating any
    /// previously parsed map.
    pub fn set_properties_json(&mut self, raw: impl Into<String>) {
        self.props.set_json(raw);
    }

    /// Serialized form of the property set.
    pub fn properties_json(&self) -> String {
        self.props.to_json()
    }

    pub fn property(&mut self, key: &str) -> Option<&serde_json::Value> {
        self.props.get(key)
    }

    pub fn set_property(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.props.insert(key.into(), value);
    }

    /// Refresh the update timestamp. Called by every mutating operation.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    // Typed views over the well-known property keys. Absent or
    // differently-typed values read as `None`.

    pub fn weight(&mut self) -> Option<i64> {
        self.props.get("weight").and_then(|v| v.as_i64())
    }

    pub fn description(&mut self) -> Option<String> {
        self.props
            .get("description")
            .and_then(|v| v.as_str().map(str::to_owned))
    }

    pub fn active(&mut self) -> Option<bool> {
        self.props.get("active").and_then(|v| v.as_bool())
    }

    pub fn priority(&mut self) -> Option<String> {
        self.props
            .get("priority")
            .and_then(|v| v.as_str().map(str::to_owned))
    }
}

impl PartialEq for GraphRelationship {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for GraphRelationship {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn link_flag_follows_type_tag() {
        let mut node = GraphNode::new("NODE_001");
        assert!(!node.is_link());

        node.set_item_type(Some("ROUTER:LINK:CORE".to_string()));
        assert!(node.is_link());

        node.set_item_type(Some("ROUTER".to_string()));
        assert!(!node.is_link());

        node.set_item_type(None);
        assert!(!node.is_link());
    }

    #[test]
    fn link_flag_recomputed_on_every_change() {
        let mut node = GraphNode::new("NODE_002");
        node.set_item_type(Some(":LINK:".to_string()));
        assert!(node.is_link());
        node.set_item_type(Some("PLAIN".to_string()));
        node.set_item_type(Some("A:LINK:B".to_string()));
        assert!(node.is_link());
    }

    #[test]
    fn refresh_link_flag_fixes_stale_wire_input() {
        // A record deserialized with an inconsistent flag.
        let mut node: GraphNode = serde_json::from_value(json!({
            "cbdbId": "NODE_003",
            "itemType": "SWITCH:LINK:EDGE",
            "isLink": false
        }))
        .unwrap();
        assert!(!node.is_link());
        node.refresh_link_flag();
        assert!(node.is_link());
    }

    #[test]
    fn node_equality_is_by_business_key() {
        let mut a = GraphNode::new("SAME");
        a.name = Some("first".to_string());
        a.id = Some(1);
        let mut b = GraphNode::new("SAME");
        b.name = Some("second".to_string());
        b.id = Some(2);
        assert_eq!(a, b);

        let c = GraphNode::new("OTHER");
        assert_ne!(a, c);
    }

    #[test]
    fn node_wire_format_is_camel_case() {
        let mut node = GraphNode::new("NODE_004");
        node.set_item_type(Some("SERVER:LINK:RACK".to_string()));
        node.number_of_incidents = Some(3);

        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["cbdbId"], "NODE_004");
        assert_eq!(json["itemType"], "SERVER:LINK:RACK");
        assert_eq!(json["isLink"], true);
        assert_eq!(json["numberOfIncidents"], 3);
    }

    #[test]
    fn relationship_equality_is_by_id() {
        let s = GraphNode::new("S");
        let t = GraphNode::new("T");
        let mut a = GraphRelationship::new(s.clone(), t.clone(), "LINKS");
        let mut b = GraphRelationship::new(t, s, "OTHER_TYPE");
        a.id = Some(7);
        b.id = Some(7);
        assert_eq!(a, b);
        b.id = Some(8);
        assert_ne!(a, b);
    }

    #[test]
    fn relationship_timestamps() {
        let mut rel =
            GraphRelationship::new(GraphNode::new("S"), GraphNode::new("T"), "LINKS");
        let created = rel.created_at;
        assert_eq!(rel.created_at, rel.updated_at);

        std::thread::sleep(std::time::Duration::from_millis(5));
        rel.touch();
        assert_eq!(rel.created_at, created);
        assert!(rel.updated_at > created);
    }

    #[test]
    fn relationship_typed_property_views() {
        let mut rel =
            GraphRelationship::new(GraphNode::new("S"), GraphNode::new("T"), "LINKS");
        rel.set_property("weight", json!(5));
        rel.set_property("active", json!(true));

        assert_eq!(rel.weight(), Some(5));
        assert_eq!(rel.active(), Some(true));
        assert_eq!(rel.description(), None);
        assert_eq!(rel.priority(), None);
    }

    #[test]
    fn relationship_wire_format_carries_properties_json() {
        let mut rel =
            GraphRelationship::new(GraphNode::new("S"), GraphNode::new("T"), "LINKS");
        rel.set_property("weight", json!(5));

        let json = serde_json::to_value(&rel).unwrap();
        assert_eq!(json["type"], "LINKS");
        let raw = json["propertiesJson"].as_str().unwrap();
        assert_eq!(raw, r#"{"weight":5}"#);

        let back: GraphRelationship = serde_json::from_value(json).unwrap();
        assert_eq!(back.properties_snapshot(), rel.properties_snapshot());
    }
}
