//! Point-in-time view of one resource's live state
//!
//! Snapshots are created per fetch and never cached or shared between
//! resource groups.

use isc_profile::model::{FieldPath, PathComponent, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ResourceSnapshot {
    pub exists: bool,
    pub attributes: BTreeMap<String, Value>,
}

/// Why a field path could not be resolved
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    /// Some key or index along the path is absent
    #[error("field '{path}' not found")]
    NotFound { path: String },

    /// A step addressed a scalar, or indexed a mapping
    #[error("field '{path}' cannot be traversed at '{at}': value is a {found}")]
    NotTraversable {
        path: String,
        at: String,
        found: &'static str,
    },
}

impl ResourceSnapshot {
    /// Snapshot of a resource the provider reported as absent
    pub fn missing() -> Self {
        Self::default()
    }

    pub fn present(attributes: BTreeMap<String, Value>) -> Self {
        Self {
            exists: true,
            attributes,
        }
    }

    /// Build an existing snapshot from a provider JSON object; nulls are dropped
    pub fn from_json_object(object: &serde_json::Map<String, serde_json::Value>) -> Self {
        let attributes = object
            .iter()
            .filter_map(|(k, v)| Value::from_json(v).map(|v| (k.clone(), v)))
            .collect();
        Self::present(attributes)
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// Follow a field path through nested mappings and sequences
    pub fn resolve(&self, path: &FieldPath) -> Result<&Value, ResolveError> {
        let not_found = || ResolveError::NotFound {
            path: path.to_string(),
        };

        let mut components = path.components.iter();
        let mut current = match components.next() {
            Some(PathComponent::Key(key)) => self.attributes.get(key).ok_or_else(not_found)?,
            _ => return Err(not_found()),
        };

        for component in components {
            current = match (component, current) {
                (PathComponent::Key(key), Value::Mapping(map)) => {
                    map.get(key).ok_or_else(not_found)?
                }
                (PathComponent::Index(index), Value::Sequence(items)) => {
                    items.get(*index).ok_or_else(not_found)?
                }
                (step, value) => {
                    return Err(ResolveError::NotTraversable {
                        path: path.to_string(),
                        at: match step {
                            PathComponent::Key(key) => key.clone(),
                            PathComponent::Index(index) => format!("[{}]", index),
                        },
                        found: value.type_name(),
                    })
                }
            };
        }

        Ok(current)
    }
}
