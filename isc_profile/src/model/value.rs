//! Runtime value model shared by inputs, expectations and snapshots

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A configuration or resource attribute value
///
/// Mappings are key-ordered so structural comparison never depends on
/// the order a provider or an input file emitted keys in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Sequence(Vec<Value>),
    Mapping(BTreeMap<String, Value>),
}

impl Value {
    pub fn string(s: impl Into<String>) -> Self {
        Value::String(s.into())
    }

    /// Build a mapping from string pairs
    pub fn mapping_of<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        Value::Mapping(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Boolean(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Sequence(_) => "sequence",
            Value::Mapping(_) => "mapping",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric view over both integer and float values
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[Value]> {
        match self {
            Value::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Mapping(map) => Some(map),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Integer(_) | Value::Float(_))
    }

    /// Length of a string, sequence or mapping; `None` for scalars
    pub fn len(&self) -> Option<usize> {
        match self {
            Value::String(s) => Some(s.chars().count()),
            Value::Sequence(items) => Some(items.len()),
            Value::Mapping(map) => Some(map.len()),
            _ => None,
        }
    }

    /// Type-aware structural equality
    ///
    /// Integers and floats compare numerically. Strings never coerce to
    /// numbers. Mappings compare key-for-key, sequences element-wise.
    pub fn structural_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (a, b) if a.is_numeric() && b.is_numeric() => match (a, b) {
                (Value::Integer(x), Value::Integer(y)) => x == y,
                _ => a.as_f64() == b.as_f64(),
            },
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Sequence(a), Value::Sequence(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.structural_eq(y))
            }
            (Value::Mapping(a), Value::Mapping(b)) => {
                a.len() == b.len()
                    && a.iter().all(|(key, value)| {
                        b.get(key)
                            .map(|other| value.structural_eq(other))
                            .unwrap_or(false)
                    })
            }
            _ => false,
        }
    }

    /// Plain rendering used for pattern matching and templates
    ///
    /// Strings render without quotes; containers render as compact JSON.
    pub fn stringify(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            Value::Integer(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Boolean(b) => b.to_string(),
            Value::Sequence(_) | Value::Mapping(_) => self.to_json().to_string(),
        }
    }

    /// Convert provider JSON, dropping nulls
    ///
    /// Returns `None` for a top-level null. Null object members are skipped,
    /// so a null attribute reads as absent. An array with a null element
    /// reads as absent too, since dropping the element would shift indices.
    pub fn from_json(value: &serde_json::Value) -> Option<Value> {
        match value {
            serde_json::Value::Null => None,
            serde_json::Value::Bool(b) => Some(Value::Boolean(*b)),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(Value::Integer(i))
                } else {
                    n.as_f64().map(Value::Float)
                }
            }
            serde_json::Value::String(s) => Some(Value::String(s.clone())),
            serde_json::Value::Array(items) => items
                .iter()
                .map(Value::from_json)
                .collect::<Option<Vec<_>>>()
                .map(Value::Sequence),
            serde_json::Value::Object(map) => Some(Value::Mapping(
                map.iter()
                    .filter_map(|(k, v)| Value::from_json(v).map(|v| (k.clone(), v)))
                    .collect(),
            )),
        }
    }

    /// Convert a TOML value; datetimes become their RFC3339 string
    pub fn from_toml(value: &toml::Value) -> Value {
        match value {
            toml::Value::String(s) => Value::String(s.clone()),
            toml::Value::Integer(i) => Value::Integer(*i),
            toml::Value::Float(f) => Value::Float(*f),
            toml::Value::Boolean(b) => Value::Boolean(*b),
            toml::Value::Datetime(dt) => Value::String(dt.to_string()),
            toml::Value::Array(items) => {
                Value::Sequence(items.iter().map(Value::from_toml).collect())
            }
            toml::Value::Table(table) => Value::Mapping(
                table
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::from_toml(v)))
                    .collect(),
            ),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Boolean(b) => serde_json::Value::Bool(*b),
            Value::Integer(i) => serde_json::Value::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Sequence(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Mapping(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "\"{}\"", s),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(fl) => write!(f, "{}", fl),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Sequence(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Mapping(map) => {
                write!(f, "{{")?;
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", key, value)?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Sequence(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_equality_across_types() {
        assert!(Value::Integer(2).structural_eq(&Value::Float(2.0)));
        assert!(!Value::Integer(2).structural_eq(&Value::String("2".into())));
    }

    #[test]
    fn test_mapping_equality_ignores_key_order() {
        let a = Value::Mapping(
            [("tier", "ha"), ("env", "prod")]
                .into_iter()
                .map(|(k, v)| (k.to_string(), Value::from(v)))
                .collect(),
        );
        let b = Value::mapping_of([("env", "prod"), ("tier", "ha")]);
        assert!(a.structural_eq(&b));

        let c = Value::mapping_of([("env", "prod")]);
        assert!(!a.structural_eq(&c));
        assert!(!c.structural_eq(&a));
    }

    #[test]
    fn test_from_json_drops_nulls() {
        let json = serde_json::json!({"name": "vm", "labels": null, "disks": [{"a": 1}, {"b": null}]});
        let value = Value::from_json(&json).unwrap();
        let map = value.as_mapping().unwrap();
        assert!(!map.contains_key("labels"));
        assert_eq!(map["disks"].len(), Some(2));
        assert_eq!(map["disks"].as_sequence().unwrap()[1], Value::Mapping(BTreeMap::new()));
        assert!(Value::from_json(&serde_json::Value::Null).is_none());
    }

    #[test]
    fn test_array_with_null_element_is_absent() {
        let json = serde_json::json!({"tags": ["a", null, "c"], "ports": [80, 443]});
        let value = Value::from_json(&json).unwrap();
        let map = value.as_mapping().unwrap();
        assert!(!map.contains_key("tags"));
        assert_eq!(map["ports"].len(), Some(2));
    }

    #[test]
    fn test_from_toml_table() {
        let parsed: toml::Value = toml::from_str("a = 1\nb = [\"x\"]\n[c]\nd = true").unwrap();
        let value = Value::from_toml(&parsed);
        let map = value.as_mapping().unwrap();
        assert_eq!(map["a"], Value::Integer(1));
        assert_eq!(map["b"], Value::Sequence(vec![Value::from("x")]));
        assert_eq!(map["c"].as_mapping().unwrap()["d"], Value::Boolean(true));
    }

    #[test]
    fn test_stringify_and_display() {
        assert_eq!(Value::from("bigip").stringify(), "bigip");
        assert_eq!(Value::from("bigip").to_string(), "\"bigip\"");
        assert_eq!(Value::Integer(4).stringify(), "4");
        assert_eq!(
            Value::mapping_of([("env", "prod")]).to_string(),
            "{env: \"prod\"}"
        );
    }

    #[test]
    fn test_untagged_deserialize_prefers_integer() {
        let value: Value = serde_json::from_str("[1, 2.5, \"x\", true, {\"k\": \"v\"}]").unwrap();
        let items = value.as_sequence().unwrap();
        assert_eq!(items[0], Value::Integer(1));
        assert_eq!(items[1], Value::Float(2.5));
        assert_eq!(items[2], Value::from("x"));
        assert_eq!(items[3], Value::Boolean(true));
        assert!(items[4].as_mapping().is_some());
    }
}
