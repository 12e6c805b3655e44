//! Cypher construction for edge operations.
//!
//! A relationship type is an edge label in Cypher, not a bindable value,
//! so it has to be spliced into the query text. Every spliced token — the
//! type and any property keys appearing in a literal property clause — is
//! validated against a strict identifier grammar first; node keys and
//! property values are always bound as parameters.

use std::fmt;

use neo4rs::{query, Query};

use assetgraph_core::PropertyMap;

use crate::client::GraphError;
use crate::value::json_to_bolt;

/// A relationship type token validated for safe splicing into query text.
///
/// Grammar: `[A-Za-z_][A-Za-z0-9_]*`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelType(String);

impl RelType {
    pub fn new(token: impl Into<String>) -> Result<Self, GraphError> {
        let token = token.into();
        if !is_identifier(&token) {
            return Err(GraphError::InvalidArgument(format!(
                "relationship type is not a legal identifier: {token:?}"
            )));
        }
        Ok(Self(token))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<&str> for RelType {
    type Error = GraphError;

    fn try_from(token: &str) -> Result<Self, Self::Error> {
        Self::new(token)
    }
}

fn is_identifier(token: &str) -> bool {
    let mut chars = token.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn check_property_key(key: &str) -> Result<(), GraphError> {
    if is_identifier(key) {
        Ok(())
    } else {
        Err(GraphError::InvalidArgument(format!(
            "property key is not a legal identifier: {key:?}"
        )))
    }
}

/// Query text for match-and-create of a typed edge between two known nodes.
///
/// `keys` are the property keys that will appear in the literal clause;
/// an empty list omits the clause entirely. Callers validate keys first.
fn create_edge_text(rel_type: &RelType, keys: &[&str]) -> String {
    let mut text = String::from(
        "MATCH (source:ITEM {cbdb_id: $source_cbdb_id}), \
         (target:ITEM {cbdb_id: $target_cbdb_id}) ",
    );
    text.push_str(&format!("CREATE (source)-[r:{rel_type}"));
    if !keys.is_empty() {
        text.push_str(" {");
        for (i, key) in keys.iter().enumerate() {
            if i > 0 {
                text.push_str(", ");
            }
            text.push_str(&format!("{key}: ${key}"));
        }
        text.push('}');
    }
    text.push_str("]->(target) RETURN id(r) AS rel_id");
    text
}

/// Build the match-and-create query with all values bound as parameters.
pub fn create_edge(
    source_cbdb_id: &str,
    target_cbdb_id: &str,
    rel_type: &RelType,
    properties: &PropertyMap,
) -> Result<Query, GraphError> {
    let mut keys: Vec<&str> = Vec::with_capacity(properties.len());
    for key in properties.keys() {
        check_property_key(key)?;
        keys.push(key);
    }

    let mut q = query(&create_edge_text(rel_type, &keys))
        .param("source_cbdb_id", source_cbdb_id)
        .param("target_cbdb_id", target_cbdb_id);
    for (key, value) in properties {
        q = q.param(key, json_to_bolt(value));
    }
    Ok(q)
}

/// Build the query deleting exactly the edges matching (source, target, type).
pub fn delete_edge(source_cbdb_id: &str, target_cbdb_id: &str, rel_type: &RelType) -> Query {
    let text = format!(
        "MATCH (source:ITEM {{cbdb_id: $source_cbdb_id}})-[r:{rel_type}]->\
         (target:ITEM {{cbdb_id: $target_cbdb_id}}) DELETE r"
    );
    query(&text)
        .param("source_cbdb_id", source_cbdb_id)
        .param("target_cbdb_id", target_cbdb_id)
}

/// Build a MERGE query for idempotent edge creation (no properties).
pub fn merge_edge(source_cbdb_id: &str, target_cbdb_id: &str, rel_type: &RelType) -> Query {
    let text = format!(
        "MATCH (source:ITEM {{cbdb_id: $source_cbdb_id}}) \
         MATCH (target:ITEM {{cbdb_id: $target_cbdb_id}}) \
         MERGE (source)-[r:{rel_type}]->(target) \
         RETURN id(r) AS rel_id"
    );
    query(&text)
        .param("source_cbdb_id", source_cbdb_id)
        .param("target_cbdb_id", target_cbdb_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rel_type_accepts_identifiers() {
        for token in ["LINKS", "DEPENDS_ON", "r2d2", "_private", "Type_1"] {
            assert!(RelType::new(token).is_ok(), "{token} should be legal");
        }
    }

    #[test]
    fn rel_type_rejects_injection_vectors() {
        for token in [
            "",
            "1STARTS_WITH_DIGIT",
            "HAS SPACE",
            "TYPE]-(x) DETACH DELETE x//",
            "TYPE`",
            "TYPE-DASH",
            "TYPE:OTHER",
        ] {
            let err = RelType::new(token).unwrap_err();
            assert!(
                matches!(err, GraphError::InvalidArgument(_)),
                "{token:?} should be rejected"
            );
        }
    }

    #[test]
    fn create_text_without_properties_omits_clause() {
        let rel_type = RelType::new("LINKS").unwrap();
        let text = create_edge_text(&rel_type, &[]);
        assert!(text.contains("CREATE (source)-[r:LINKS]->(target)"));
        assert!(!text.contains("{}"), "no empty property clause");
        assert!(text.ends_with("RETURN id(r) AS rel_id"));
    }

    #[test]
    fn create_text_enumerates_property_keys() {
        let rel_type = RelType::new("LINKS").unwrap();
        let text = create_edge_text(&rel_type, &["active", "weight"]);
        assert!(text.contains("[r:LINKS {active: $active, weight: $weight}]"));
    }

    #[test]
    fn create_edge_rejects_bad_property_key() {
        let rel_type = RelType::new("LINKS").unwrap();
        let mut props = PropertyMap::new();
        props.insert("weight} ]->() WITH 1 AS x //".to_string(), json!(5));
        let Err(err) = create_edge("S", "T", &rel_type, &props) else {
            panic!("expected a rejected property key");
        };
        assert!(matches!(err, GraphError::InvalidArgument(_)));
    }

    #[test]
    fn create_edge_binds_node_keys_and_values() {
        let rel_type = RelType::new("LINKS").unwrap();
        let mut props = PropertyMap::new();
        props.insert("weight".to_string(), json!(5));
        // Values never appear in text, only parameter names do.
        assert!(create_edge("S", "T", &rel_type, &props).is_ok());
    }
}
