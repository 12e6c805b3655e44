//! Store value conversion: Bolt-typed values in and out of host types.
//!
//! Query results are normalized at this boundary: every store-native value
//! becomes a `StoreValue` and then its closest JSON host value. The
//! reverse direction converts JSON parameter values into Bolt types for
//! binding.

use std::collections::BTreeMap;

use neo4rs::{BoltBoolean, BoltFloat, BoltInteger, BoltList, BoltMap, BoltNull, BoltString, BoltType, Row};
use serde::de::{self, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::Deserialize;

use crate::client::GraphError;

/// One normalized result row: projected field name to host value.
pub type QueryRow = BTreeMap<String, serde_json::Value>;

/// Tagged representation of a value coming back from the store.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<StoreValue>),
    Map(BTreeMap<String, StoreValue>),
}

impl StoreValue {
    /// Convert into the closest host-language value.
    pub fn into_json(self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Bool(b) => serde_json::Value::Bool(b),
            Self::Int(i) => serde_json::Value::from(i),
            Self::Float(f) => serde_json::Value::from(f),
            Self::String(s) => serde_json::Value::String(s),
            Self::List(items) => {
                serde_json::Value::Array(items.into_iter().map(Self::into_json).collect())
            }
            Self::Map(map) => serde_json::Value::Object(
                map.into_iter().map(|(k, v)| (k, v.into_json())).collect(),
            ),
        }
    }
}

impl<'de> Deserialize<'de> for StoreValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct StoreValueVisitor;

        impl<'de> Visitor<'de> for StoreValueVisitor {
            type Value = StoreValue;

            fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("a graph store value")
            }

            fn visit_bool<E>(self, v: bool) -> Result<Self::Value, E> {
                Ok(StoreValue::Bool(v))
            }

            fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E> {
                Ok(StoreValue::Int(v))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                i64::try_from(v)
                    .map(StoreValue::Int)
                    .map_err(|_| E::custom(format!("integer out of range: {v}")))
            }

            fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E> {
                Ok(StoreValue::Float(v))
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E> {
                Ok(StoreValue::String(v.to_owned()))
            }

            fn visit_string<E>(self, v: String) -> Result<Self::Value, E> {
                Ok(StoreValue::String(v))
            }

            fn visit_none<E>(self) -> Result<Self::Value, E> {
                Ok(StoreValue::Null)
            }

            fn visit_unit<E>(self) -> Result<Self::Value, E> {
                Ok(StoreValue::Null)
            }

            fn visit_some<D: Deserializer<'de>>(self, d: D) -> Result<Self::Value, D::Error> {
                StoreValue::deserialize(d)
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
                let mut items = Vec::new();
                while let Some(item) = seq.next_element()? {
                    items.push(item);
                }
                Ok(StoreValue::List(items))
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut map = BTreeMap::new();
                while let Some((key, value)) = access.next_entry::<String, StoreValue>()? {
                    map.insert(key, value);
                }
                Ok(StoreValue::Map(map))
            }
        }

        deserializer.deserialize_any(StoreValueVisitor)
    }
}

/// Normalize one result row into a field-name-to-host-value map.
pub fn row_to_map(row: &Row) -> Result<QueryRow, GraphError> {
    let fields: BTreeMap<String, StoreValue> = row
        .to()
        .map_err(|e| GraphError::Deserialize(format!("failed to normalize row: {e}")))?;
    Ok(fields
        .into_iter()
        .map(|(name, value)| (name, value.into_json()))
        .collect())
}

/// Convert a JSON value into a Bolt value for parameter binding.
pub fn json_to_bolt(value: &serde_json::Value) -> BoltType {
    match value {
        serde_json::Value::Null => BoltType::Null(BoltNull),
        serde_json::Value::Bool(b) => BoltType::Boolean(BoltBoolean::new(*b)),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => BoltType::Integer(BoltInteger::new(i)),
            None => BoltType::Float(BoltFloat::new(n.as_f64().unwrap_or(f64::NAN))),
        },
        serde_json::Value::String(s) => BoltType::String(BoltString::new(s)),
        serde_json::Value::Array(items) => {
            let mut list = BoltList::default();
            for item in items {
                list.value.push(json_to_bolt(item));
            }
            BoltType::List(list)
        }
        serde_json::Value::Object(entries) => {
            let mut map = BoltMap::default();
            for (key, value) in entries {
                map.value.insert(BoltString::new(key), json_to_bolt(value));
            }
            BoltType::Map(map)
        }
    }
}

/// Convert a whole property map into a Bolt map parameter.
pub fn map_to_bolt(map: &assetgraph_core::PropertyMap) -> BoltType {
    let mut bolt = BoltMap::default();
    for (key, value) in map {
        bolt.value.insert(BoltString::new(key), json_to_bolt(value));
    }
    BoltType::Map(bolt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn store_value_into_json_scalars() {
        assert_eq!(StoreValue::Null.into_json(), json!(null));
        assert_eq!(StoreValue::Bool(true).into_json(), json!(true));
        assert_eq!(StoreValue::Int(42).into_json(), json!(42));
        assert_eq!(StoreValue::Float(0.5).into_json(), json!(0.5));
        assert_eq!(
            StoreValue::String("x".to_string()).into_json(),
            json!("x")
        );
    }

    #[test]
    fn store_value_into_json_composites() {
        let mut inner = BTreeMap::new();
        inner.insert("count".to_string(), StoreValue::Int(2));
        let value = StoreValue::List(vec![
            StoreValue::Map(inner),
            StoreValue::String("tail".to_string()),
        ]);
        assert_eq!(value.into_json(), json!([{"count": 2}, "tail"]));
    }

    // The visitor is driven by the driver's self-describing deserializer;
    // serde_json exercises the same entry points.
    #[test]
    fn store_value_deserializes_from_self_describing_input() {
        let value: StoreValue =
            serde_json::from_str(r#"{"name": "core-01", "hops": [1, 2], "up": true}"#).unwrap();
        let StoreValue::Map(map) = value else {
            panic!("expected map");
        };
        assert_eq!(map["name"], StoreValue::String("core-01".to_string()));
        assert_eq!(
            map["hops"],
            StoreValue::List(vec![StoreValue::Int(1), StoreValue::Int(2)])
        );
        assert_eq!(map["up"], StoreValue::Bool(true));
    }

    #[test]
    fn json_to_bolt_scalars() {
        assert_eq!(json_to_bolt(&json!(true)), BoltType::Boolean(BoltBoolean::new(true)));
        assert_eq!(json_to_bolt(&json!(7)), BoltType::Integer(BoltInteger::new(7)));
        assert_eq!(json_to_bolt(&json!(0.25)), BoltType::Float(BoltFloat::new(0.25)));
        assert_eq!(
            json_to_bolt(&json!("edge")),
            BoltType::String(BoltString::new("edge"))
        );
    }

    #[test]
    fn json_to_bolt_composites() {
        let BoltType::List(list) = json_to_bolt(&json!([1, "two"])) else {
            panic!("expected list");
        };
        assert_eq!(list.value.len(), 2);

        let BoltType::Map(map) = json_to_bolt(&json!({"weight": 5})) else {
            panic!("expected map");
        };
        assert_eq!(
            map.value.get(&BoltString::new("weight")),
            Some(&BoltType::Integer(BoltInteger::new(5)))
        );
    }
}
