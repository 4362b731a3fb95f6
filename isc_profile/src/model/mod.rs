//! Bound profile model: controls, resource groups and expectations
//!
//! Everything in this module is immutable once constructed by the loader.
//! The runner consumes these types; it never builds them itself.

pub mod field_path;
pub mod value;

pub use field_path::{FieldPath, FieldPathError, PathComponent};
pub use value::Value;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

// ============================================================================
// RESOURCE DESCRIPTORS
// ============================================================================

/// Closed set of resource kinds the runner knows how to fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    /// Cloud compute instance (project / zone / name)
    ComputeInstance,
    /// Operating system reported by a local or remote host
    #[serde(alias = "os")]
    OperatingSystem,
    /// JSON document on disk, for offline fixtures
    JsonDocument,
}

impl ResourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::ComputeInstance => "compute_instance",
            ResourceType::OperatingSystem => "operating_system",
            ResourceType::JsonDocument => "json_document",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Locator validation failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum LocatorError {
    #[error("Locator for {resource_type} has no fields")]
    Empty { resource_type: ResourceType },

    #[error("Locator field '{field}' for {resource_type} is empty")]
    EmptyField {
        resource_type: ResourceType,
        field: String,
    },

    #[error("Locator for {resource_type} is missing required field '{field}'")]
    MissingField {
        resource_type: ResourceType,
        field: String,
    },

    #[error("Malformed locator '{value}': {reason}")]
    Malformed { value: String, reason: String },
}

/// Identifying key set used to fetch one resource's live state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    pub resource_type: ResourceType,
    pub locator: BTreeMap<String, String>,
}

impl ResourceDescriptor {
    pub fn new(resource_type: ResourceType, locator: BTreeMap<String, String>) -> Self {
        Self {
            resource_type,
            locator,
        }
    }

    /// Builder-style locator entry
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.locator.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.locator.get(key).map(String::as_str)
    }

    /// Locator value that must be present; errors name the missing field
    pub fn require(&self, key: &str) -> Result<&str, LocatorError> {
        self.get(key).ok_or_else(|| LocatorError::MissingField {
            resource_type: self.resource_type,
            field: key.to_string(),
        })
    }

    /// Every locator must have at least one field and no blank values
    pub fn validate(&self) -> Result<(), LocatorError> {
        if self.locator.is_empty() {
            return Err(LocatorError::Empty {
                resource_type: self.resource_type,
            });
        }
        for (field, value) in &self.locator {
            if value.trim().is_empty() {
                return Err(LocatorError::EmptyField {
                    resource_type: self.resource_type,
                    field: field.clone(),
                });
            }
        }
        Ok(())
    }
}

impl fmt::Display for ResourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.resource_type)?;
        for (i, (key, value)) in self.locator.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", key, value)?;
        }
        write!(f, ")")
    }
}

// ============================================================================
// EXPECTATIONS
// ============================================================================

/// Comparison applied by an expectation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparator {
    /// Resource exists at the provider
    #[serde(alias = "exist")]
    Exists,
    #[serde(alias = "eq", alias = "cmp")]
    Equals,
    /// Full-match regular expression against the stringified value
    #[serde(alias = "matches_pattern", alias = "match")]
    Matches,
    #[serde(alias = "be_in")]
    InSet,
    /// Numeric ordering, or timestamp age when the expectation carries one
    #[serde(alias = "ge")]
    GreaterOrEqual,
    /// Field is truly absent
    IsNull,
    /// Field is present with zero length
    IsEmpty,
}

impl Comparator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Comparator::Exists => "exists",
            Comparator::Equals => "equals",
            Comparator::Matches => "matches",
            Comparator::InSet => "in_set",
            Comparator::GreaterOrEqual => "greater_or_equal",
            Comparator::IsNull => "is_null",
            Comparator::IsEmpty => "is_empty",
        }
    }

    /// Comparators that assert on the resource rather than a field
    pub fn targets_resource(&self) -> bool {
        matches!(self, Comparator::Exists)
    }

    /// Comparators whose meaning needs no expected value
    pub fn is_unary(&self) -> bool {
        matches!(
            self,
            Comparator::Exists | Comparator::IsNull | Comparator::IsEmpty
        )
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Expected side of an expectation after input binding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expected {
    Nothing,
    Value(Value),
    /// Minimum elapsed time since the timestamp held by the field
    MinimumAge(Duration),
}

impl fmt::Display for Expected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expected::Nothing => Ok(()),
            Expected::Value(v) => write!(f, "{}", v),
            Expected::MinimumAge(d) => write!(f, "age >= {}s", d.as_secs()),
        }
    }
}

/// One declarative assertion against a resource snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expectation {
    pub field: Option<FieldPath>,
    pub comparator: Comparator,
    pub expected: Expected,
    pub negate: bool,
    pub description: Option<String>,
}

impl Expectation {
    pub fn exists() -> Self {
        Self {
            field: None,
            comparator: Comparator::Exists,
            expected: Expected::Nothing,
            negate: false,
            description: None,
        }
    }

    pub fn field(path: FieldPath, comparator: Comparator, expected: Expected) -> Self {
        Self {
            field: Some(path),
            comparator,
            expected,
            negate: false,
            description: None,
        }
    }

    pub fn negated(mut self) -> Self {
        self.negate = !self.negate;
        self
    }

    /// Human-readable form, e.g. `status should equals "RUNNING"`
    pub fn summary(&self) -> String {
        if let Some(description) = &self.description {
            return description.clone();
        }
        let subject = self
            .field
            .as_ref()
            .map(|f| f.to_string())
            .unwrap_or_else(|| "resource".to_string());
        let verb = if self.negate { "should not" } else { "should" };
        match &self.expected {
            Expected::Nothing => format!("{} {} {}", subject, verb, self.comparator),
            expected => format!("{} {} {} {}", subject, verb, self.comparator, expected),
        }
    }
}

// ============================================================================
// CONTROLS
// ============================================================================

/// One descriptor plus the expectations evaluated against its single snapshot
///
/// A descriptor that could not be built (for example a locator template
/// referencing a malformed value) is carried as an error so the runner can
/// fail only this group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceGroup {
    pub label: String,
    pub descriptor: Result<ResourceDescriptor, LocatorError>,
    pub expectations: Vec<Expectation>,
}

impl ResourceGroup {
    pub fn new(descriptor: ResourceDescriptor, expectations: Vec<Expectation>) -> Self {
        Self {
            label: descriptor.to_string(),
            descriptor: Ok(descriptor),
            expectations,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }
}

/// Named group of related expectations with a severity weight
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Control {
    pub name: String,
    pub title: String,
    /// Severity in [0, 1]; reflects how much a failure matters, not its likelihood
    pub impact: f64,
    pub description: Option<String>,
    pub groups: Vec<ResourceGroup>,
}

impl Control {
    pub fn expectation_count(&self) -> usize {
        self.groups.iter().map(|g| g.expectations.len()).sum()
    }
}

/// Profile with all inputs bound, ready to run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    pub title: Option<String>,
    pub version: Option<String>,
    pub controls: Vec<Control>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_descriptor_validation() {
        let descriptor = ResourceDescriptor::new(ResourceType::ComputeInstance, BTreeMap::new());
        assert_matches!(descriptor.validate(), Err(LocatorError::Empty { .. }));

        let descriptor = descriptor.with("project", "p").with("zone", " ");
        assert_matches!(
            descriptor.validate(),
            Err(LocatorError::EmptyField { field, .. }) if field == "zone"
        );

        let descriptor = descriptor.with("zone", "us-west1-a");
        assert!(descriptor.validate().is_ok());
        assert_matches!(
            descriptor.require("name"),
            Err(LocatorError::MissingField { field, .. }) if field == "name"
        );
    }

    #[test]
    fn test_descriptor_display_is_key_ordered() {
        let descriptor = ResourceDescriptor::new(ResourceType::ComputeInstance, BTreeMap::new())
            .with("zone", "z")
            .with("name", "n");
        assert_eq!(descriptor.to_string(), "compute_instance(name=n, zone=z)");
    }

    #[test]
    fn test_comparator_aliases() {
        #[derive(Deserialize)]
        struct Doc {
            op: Comparator,
        }
        let doc: Doc = toml::from_str("op = \"cmp\"").unwrap();
        assert_eq!(doc.op, Comparator::Equals);
        let doc: Doc = toml::from_str("op = \"be_in\"").unwrap();
        assert_eq!(doc.op, Comparator::InSet);
        let doc: Doc = toml::from_str("op = \"is_null\"").unwrap();
        assert_eq!(doc.op, Comparator::IsNull);
    }

    #[test]
    fn test_expectation_summary() {
        let e = Expectation::field(
            FieldPath::key("status"),
            Comparator::Equals,
            Expected::Value(Value::from("RUNNING")),
        );
        assert_eq!(e.summary(), "status should equals \"RUNNING\"");
        assert_eq!(
            Expectation::exists().negated().summary(),
            "resource should not exists"
        );
    }
}
