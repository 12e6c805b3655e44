//! Property bag codec for relationship properties.
//!
//! A relationship's dynamic properties travel over the wire as a single
//! opaque JSON string. `encode`/`decode` convert between that form and a
//! flat map; `PropertyBag` holds whichever form was produced last and
//! parses lazily on first map access.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A flat map of scalar-or-composite JSON property values.
pub type PropertyMap = BTreeMap<String, serde_json::Value>;

/// Serialize a property map to its opaque string form.
///
/// Encoding failure degrades to `"{}"`; `decode(encode(m)) == m` holds for
/// any map of JSON-representable values.
pub fn encode(map: &PropertyMap) -> String {
    serde_json::to_string(map).unwrap_or_else(|_| "{}".to_string())
}

/// Parse the opaque string form back into a map.
///
/// Malformed, empty, or non-object input yields an empty map. Property
/// corruption must never block reading the owning relationship.
pub fn decode(raw: &str) -> PropertyMap {
    serde_json::from_str(raw).unwrap_or_default()
}

/// Two-state lazily parsed property store.
///
/// `Unparsed` holds the raw string as received; the first map access
/// parses it and transitions to `Parsed`. Setting the raw form directly
/// replaces the state wholesale, which is the cache invalidation.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyBag {
    Unparsed(String),
    Parsed(PropertyMap),
}

impl PropertyBag {
    pub fn from_json(raw: impl Into<String>) -> Self {
        Self::Unparsed(raw.into())
    }

    pub fn from_map(map: PropertyMap) -> Self {
        Self::Parsed(map)
    }

    /// Parsed map view, decoding and caching on first access.
    pub fn as_map(&mut self) -> &PropertyMap {
        self.ensure_parsed();
        match self {
            Self::Parsed(map) => map,
            Self::Unparsed(_) => unreachable!("ensure_parsed left bag unparsed"),
        }
    }

    /// Mutable map view; subsequent `to_json` re-encodes the edits.
    pub fn as_map_mut(&mut self) -> &mut PropertyMap {
        self.ensure_parsed();
        match self {
            Self::Parsed(map) => map,
            Self::Unparsed(_) => unreachable!("ensure_parsed left bag unparsed"),
        }
    }

    /// Owned copy of the map, decoding on the fly without changing state.
    pub fn to_map(&self) -> PropertyMap {
        match self {
            Self::Unparsed(raw) => decode(raw),
            Self::Parsed(map) => map.clone(),
        }
    }

    /// Replace the serialized form, discarding any parsed map.
    pub fn set_json(&mut self, raw: impl Into<String>) {
        *self = Self::Unparsed(raw.into());
    }

    /// Serialized form of the current content.
    pub fn to_json(&self) -> String {
        match self {
            Self::Unparsed(raw) => raw.clone(),
            Self::Parsed(map) => encode(map),
        }
    }

    pub fn get(&mut self, key: &str) -> Option<&serde_json::Value> {
        self.as_map().get(key)
    }

    pub fn insert(&mut self, key: String, value: serde_json::Value) {
        self.as_map_mut().insert(key, value);
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Unparsed(raw) => decode(raw).is_empty(),
            Self::Parsed(map) => map.is_empty(),
        }
    }

    fn ensure_parsed(&mut self) {
        if let Self::Unparsed(raw) = self {
            *self = Self::Parsed(decode(raw));
        }
    }
}

impl Default for PropertyBag {
    fn default() -> Self {
        Self::Parsed(PropertyMap::new())
    }
}

impl Serialize for PropertyBag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_json())
    }
}

impl<'de> Deserialize<'de> for PropertyBag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::Unparsed(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_map() -> PropertyMap {
        let mut map = PropertyMap::new();
        map.insert("weight".to_string(), json!(5));
        map.insert("description".to_string(), json!("primary uplink"));
        map.insert("active".to_string(), json!(true));
        map.insert("ratio".to_string(), json!(0.75));
        map
    }

    #[test]
    fn encode_decode_round_trip() {
        let map = sample_map();
        assert_eq!(decode(&encode(&map)), map);
    }

    #[test]
    fn decode_is_lenient() {
        assert!(decode("").is_empty());
        assert!(decode("not json at all").is_empty());
        assert!(decode("{\"dangling\":").is_empty());
        assert!(decode("[1, 2, 3]").is_empty());
        assert!(decode("{}").is_empty());
    }

    #[test]
    fn empty_map_encodes_to_empty_object() {
        assert_eq!(encode(&PropertyMap::new()), "{}");
    }

    #[test]
    fn bag_parses_lazily() {
        let mut bag = PropertyBag::from_json(r#"{"weight": 5}"#);
        assert!(matches!(bag, PropertyBag::Unparsed(_)));

        assert_eq!(bag.get("weight"), Some(&json!(5)));
        assert!(matches!(bag, PropertyBag::Parsed(_)));
    }

    #[test]
    fn set_json_invalidates_parsed_map() {
        let mut bag = PropertyBag::from_map(sample_map());
        assert_eq!(bag.get("weight"), Some(&json!(5)));

        bag.set_json(r#"{"weight": 9}"#);
        assert!(matches!(bag, PropertyBag::Unparsed(_)));
        assert_eq!(bag.get("weight"), Some(&json!(9)));
        assert_eq!(bag.get("description"), None);
    }

    #[test]
    fn malformed_raw_reads_as_empty() {
        let mut bag = PropertyBag::from_json("{{{");
        assert!(bag.as_map().is_empty());
        assert_eq!(bag.to_json(), "{}");
    }

    #[test]
    fn edits_survive_reencoding() {
        let mut bag = PropertyBag::from_json(r#"{"weight": 5}"#);
        bag.insert("active".to_string(), json!(true));

        let reparsed = decode(&bag.to_json());
        assert_eq!(reparsed.get("weight"), Some(&json!(5)));
        assert_eq!(reparsed.get("active"), Some(&json!(true)));
    }
}
