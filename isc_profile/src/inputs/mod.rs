//! Input configuration: declared, typed values bound into a profile
//!
//! Inputs arrive from a TOML or JSON file (including `terraform output -json`
//! documents) and may be overridden per input through `ISC_INPUT_<NAME>`
//! environment variables. Binding happens once, before any control runs;
//! it is the only place a run can abort.

pub mod error;

pub use error::InputError;

use crate::config::constants;
use crate::model::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

/// Declared type of an input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputType {
    String,
    Integer,
    Float,
    Boolean,
    Mapping,
    Sequence,
    #[default]
    Any,
}

impl fmt::Display for InputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InputType::String => "string",
            InputType::Integer => "integer",
            InputType::Float => "float",
            InputType::Boolean => "boolean",
            InputType::Mapping => "mapping",
            InputType::Sequence => "sequence",
            InputType::Any => "any",
        };
        f.write_str(name)
    }
}

fn default_required() -> bool {
    true
}

/// Input declaration carried by a profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputSpec {
    pub name: String,
    #[serde(rename = "type", default)]
    pub input_type: InputType,
    #[serde(default = "default_required")]
    pub required: bool,
    #[serde(default)]
    pub default: Option<Value>,
    #[serde(default)]
    pub description: Option<String>,
}

impl InputSpec {
    pub fn required(name: impl Into<String>, input_type: InputType) -> Self {
        Self {
            name: name.into(),
            input_type,
            required: true,
            default: None,
            description: None,
        }
    }

    pub fn optional(name: impl Into<String>, input_type: InputType) -> Self {
        Self {
            required: false,
            ..Self::required(name, input_type)
        }
    }

    /// Environment variable that overrides this input
    pub fn env_var(&self) -> String {
        format!(
            "{}{}",
            constants::inputs::ENV_PREFIX,
            self.name.to_ascii_uppercase()
        )
    }
}

// ============================================================================
// RAW INPUTS
// ============================================================================

/// Raw input values as provided, before type coercion
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputSet {
    values: BTreeMap<String, Value>,
}

impl InputSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Load inputs from a `.json` or `.toml` file
    ///
    /// Unknown extensions are tried as TOML first, then JSON.
    pub fn load_file(path: impl AsRef<Path>) -> Result<Self, InputError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| InputError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let parse_error = |reason: String| InputError::Parse {
            path: path.to_path_buf(),
            reason,
        };

        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&content).map_err(parse_error),
            Some("toml") => Self::from_toml_str(&content).map_err(parse_error),
            _ => Self::from_toml_str(&content)
                .or_else(|toml_err| {
                    Self::from_json_str(&content)
                        .map_err(|json_err| format!("toml: {}; json: {}", toml_err, json_err))
                })
                .map_err(parse_error),
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self, String> {
        let table: toml::Table = toml::from_str(content).map_err(|e| e.to_string())?;
        let values = table
            .iter()
            .map(|(k, v)| (k.clone(), Value::from_toml(v)))
            .collect();
        Ok(Self { values }.unwrap_terraform_outputs())
    }

    pub fn from_json_str(content: &str) -> Result<Self, String> {
        let json: serde_json::Value = serde_json::from_str(content).map_err(|e| e.to_string())?;
        let object = json
            .as_object()
            .ok_or_else(|| "top-level JSON value must be an object".to_string())?;
        // Detect the terraform shape before nulls are dropped; a null output
        // value reads as an absent input.
        let is_terraform = !object.is_empty()
            && object.values().all(|v| match v.as_object() {
                Some(map) => is_terraform_output(map.keys().map(String::as_str)),
                None => false,
            });
        let values = object
            .iter()
            .filter_map(|(k, v)| {
                let v = if is_terraform { v.get("value")? } else { v };
                Value::from_json(v).map(|v| (k.clone(), v))
            })
            .collect();
        Ok(Self { values })
    }

    /// Unwrap `terraform output -json` documents
    ///
    /// Such documents map each output to `{"value": ..., "type": ..., "sensitive": ...}`.
    /// Only unwrapped when every entry has that shape.
    fn unwrap_terraform_outputs(self) -> Self {
        let is_terraform = !self.values.is_empty()
            && self.values.values().all(|v| match v.as_mapping() {
                Some(map) => is_terraform_output(map.keys().map(String::as_str)),
                None => false,
            });

        if !is_terraform {
            return self;
        }

        let values = self
            .values
            .into_iter()
            .filter_map(|(name, wrapped)| match wrapped {
                Value::Mapping(mut map) => map.remove("value").map(|v| (name, v)),
                _ => None,
            })
            .collect();
        Self { values }
    }

    /// Apply `ISC_INPUT_<NAME>` overrides for the declared inputs
    pub fn apply_env_overrides(&mut self, specs: &[InputSpec]) {
        for spec in specs {
            if let Ok(raw) = std::env::var(spec.env_var()) {
                crate::log_debug!("Input overridden from environment",
                    "input" => spec.name,
                    "variable" => spec.env_var()
                );
                self.values.insert(spec.name.clone(), Value::String(raw));
            }
        }
    }
}

/// `{"value": ..., "type": ..., "sensitive": ...}` as written by `terraform output -json`
fn is_terraform_output<'a>(keys: impl Iterator<Item = &'a str>) -> bool {
    let (mut value, mut meta) = (false, false);
    for key in keys {
        match key {
            "value" => value = true,
            "type" | "sensitive" => meta = true,
            _ => {}
        }
    }
    value && meta
}

// ============================================================================
// BOUND INPUTS
// ============================================================================

/// Inputs coerced to their declared types
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundInputs {
    values: BTreeMap<String, Value>,
}

impl BoundInputs {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Absent, or present with zero length
    pub fn is_empty_input(&self, name: &str) -> bool {
        match self.values.get(name) {
            None => true,
            Some(value) => value.len() == Some(0),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Coerce provided inputs to the profile's declarations
///
/// Missing required inputs and uncoercible values are fatal. Optional
/// inputs without a value or default stay absent. Provided values the
/// profile does not declare are ignored with a warning.
pub fn bind_inputs(specs: &[InputSpec], provided: &InputSet) -> Result<BoundInputs, InputError> {
    let mut values = BTreeMap::new();

    for spec in specs {
        let raw = provided.get(&spec.name).or(spec.default.as_ref());
        match raw {
            Some(value) => {
                let coerced = coerce(&spec.name, spec.input_type, value)?;
                values.insert(spec.name.clone(), coerced);
            }
            None if spec.required => {
                return Err(InputError::Missing {
                    name: spec.name.clone(),
                })
            }
            None => {}
        }
    }

    for name in provided.names() {
        if !specs.iter().any(|s| s.name == name) {
            crate::log_warning!("Ignoring undeclared input", "input" => name);
        }
    }

    Ok(BoundInputs { values })
}

/// Coerce one value to a declared type
pub fn coerce(name: &str, input_type: InputType, value: &Value) -> Result<Value, InputError> {
    let invalid = |reason: &str| InputError::InvalidValue {
        name: name.to_string(),
        expected: input_type.to_string(),
        actual: value.type_name().to_string(),
        reason: reason.to_string(),
    };

    match (input_type, value) {
        (InputType::Any, v) => Ok(v.clone()),

        (InputType::String, Value::String(_)) => Ok(value.clone()),
        (InputType::String, Value::Integer(_) | Value::Float(_) | Value::Boolean(_)) => {
            Ok(Value::String(value.stringify()))
        }

        (InputType::Integer, Value::Integer(_)) => Ok(value.clone()),
        (InputType::Integer, Value::Float(f)) if f.fract() == 0.0 => Ok(Value::Integer(*f as i64)),
        (InputType::Integer, Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map(Value::Integer)
            .map_err(|_| invalid(&format!("'{}' is not an integer", s))),

        (InputType::Float, Value::Integer(i)) => Ok(Value::Float(*i as f64)),
        (InputType::Float, Value::Float(_)) => Ok(value.clone()),
        (InputType::Float, Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| invalid(&format!("'{}' is not a number", s))),

        (InputType::Boolean, Value::Boolean(_)) => Ok(value.clone()),
        (InputType::Boolean, Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" => Ok(Value::Boolean(true)),
            "false" | "no" | "0" => Ok(Value::Boolean(false)),
            _ => Err(invalid(&format!("'{}' is not a boolean", s))),
        },

        (InputType::Mapping, Value::Mapping(_)) => Ok(value.clone()),
        (InputType::Mapping, Value::String(s)) => parse_json_container(s)
            .filter(|v| v.as_mapping().is_some())
            .ok_or_else(|| invalid("string is not a JSON object")),

        (InputType::Sequence, Value::Sequence(_)) => Ok(value.clone()),
        (InputType::Sequence, Value::String(s)) => Ok(parse_json_container(s)
            .filter(|v| v.as_sequence().is_some())
            .unwrap_or_else(|| split_list(s))),

        _ => Err(invalid("no conversion available")),
    }
}

fn parse_json_container(raw: &str) -> Option<Value> {
    serde_json::from_str::<serde_json::Value>(raw)
        .ok()
        .and_then(|json| Value::from_json(&json))
}

fn split_list(raw: &str) -> Value {
    Value::Sequence(
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(Value::from)
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::io::Write;

    fn specs() -> Vec<InputSpec> {
        vec![
            InputSpec::required("output_prefix", InputType::String),
            InputSpec::required("input_num_nics", InputType::Integer),
            InputSpec::required("output_zones", InputType::Sequence),
            InputSpec::optional("output_labels", InputType::Mapping),
        ]
    }

    #[test]
    fn test_bind_coerces_declared_types() {
        let provided = InputSet::new()
            .with("output_prefix", "bigip")
            .with("input_num_nics", "2")
            .with("output_zones", "us-west1-a, us-west1-b");

        let bound = bind_inputs(&specs(), &provided).unwrap();
        assert_eq!(bound.get("input_num_nics"), Some(&Value::Integer(2)));
        assert_eq!(
            bound.get("output_zones"),
            Some(&Value::Sequence(vec![
                Value::from("us-west1-a"),
                Value::from("us-west1-b")
            ]))
        );
        assert!(bound.get("output_labels").is_none());
        assert!(bound.is_empty_input("output_labels"));
    }

    #[test]
    fn test_missing_required_input_names_it() {
        let provided = InputSet::new().with("output_prefix", "bigip");
        let err = bind_inputs(&specs(), &provided).unwrap_err();
        assert_matches!(&err, InputError::Missing { name } if name == "input_num_nics");
        assert_eq!(err.input_name(), Some("input_num_nics"));
        assert!(err.to_string().contains("input_num_nics"));
    }

    #[test]
    fn test_uncoercible_value_is_rejected() {
        let provided = InputSet::new()
            .with("output_prefix", "bigip")
            .with("input_num_nics", "two")
            .with("output_zones", Value::Sequence(vec![]));
        assert_matches!(
            bind_inputs(&specs(), &provided),
            Err(InputError::InvalidValue { name, .. }) if name == "input_num_nics"
        );
    }

    #[test]
    fn test_default_fills_absent_input() {
        let mut spec = InputSpec::optional("expected_os", InputType::String);
        spec.default = Some(Value::from("centos"));
        let bound = bind_inputs(&[spec], &InputSet::new()).unwrap();
        assert_eq!(bound.get("expected_os"), Some(&Value::from("centos")));
    }

    #[test]
    fn test_mapping_from_json_string() {
        let value = coerce(
            "labels",
            InputType::Mapping,
            &Value::from(r#"{"env":"prod"}"#),
        )
        .unwrap();
        assert_eq!(value, Value::mapping_of([("env", "prod")]));
        assert!(coerce("labels", InputType::Mapping, &Value::from("[1]")).is_err());
    }

    #[test]
    fn test_empty_input_detection() {
        let provided = InputSet::new().with("output_labels", Value::Mapping(BTreeMap::new()));
        let bound = bind_inputs(
            &[InputSpec::optional("output_labels", InputType::Mapping)],
            &provided,
        )
        .unwrap();
        assert!(bound.is_empty_input("output_labels"));
    }

    #[test]
    fn test_load_terraform_output_json() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"{{
                "output_prefix": {{"sensitive": false, "type": "string", "value": "bigip"}},
                "output_zones": {{"sensitive": false, "type": ["list", "string"], "value": ["us-west1-a"]}}
            }}"#
        )
        .unwrap();

        let inputs = InputSet::load_file(file.path()).unwrap();
        assert_eq!(inputs.get("output_prefix"), Some(&Value::from("bigip")));
        assert_eq!(
            inputs.get("output_zones"),
            Some(&Value::Sequence(vec![Value::from("us-west1-a")]))
        );
    }

    #[test]
    fn test_terraform_null_output_is_absent() {
        let inputs = InputSet::from_json_str(
            r#"{
                "output_prefix": {"sensitive": false, "type": "string", "value": "bigip"},
                "output_labels": {"sensitive": false, "type": ["map", "string"], "value": null}
            }"#,
        )
        .unwrap();
        assert_eq!(inputs.get("output_prefix"), Some(&Value::from("bigip")));
        assert!(inputs.get("output_labels").is_none());

        let bound = bind_inputs(
            &[
                InputSpec::required("output_prefix", InputType::String),
                InputSpec::optional("output_labels", InputType::Mapping),
            ],
            &inputs,
        )
        .unwrap();
        assert_eq!(bound.get("output_prefix"), Some(&Value::from("bigip")));
        assert!(bound.is_empty_input("output_labels"));
    }

    #[test]
    fn test_load_toml_inputs_without_extension() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "output_prefix = \"bigip\"\n[output_labels]\nenv = \"prod\"").unwrap();

        let inputs = InputSet::load_file(file.path()).unwrap();
        assert_eq!(inputs.len(), 2);
        assert_eq!(
            inputs.get("output_labels"),
            Some(&Value::mapping_of([("env", "prod")]))
        );
    }

    #[test]
    fn test_load_rejects_garbage() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, "[1, 2]").unwrap();
        assert_matches!(
            InputSet::load_file(file.path()),
            Err(InputError::Parse { .. })
        );
        assert_matches!(
            InputSet::load_file("/nonexistent/isc/inputs.toml"),
            Err(InputError::Io { .. })
        );
    }

    #[test]
    fn test_env_override() {
        let spec = InputSpec::required("isc_test_env_override_input", InputType::Integer);
        std::env::set_var(spec.env_var(), "4");
        let mut provided = InputSet::new().with("isc_test_env_override_input", 1i64);
        provided.apply_env_overrides(std::slice::from_ref(&spec));
        let bound = bind_inputs(&[spec], &provided).unwrap();
        assert_eq!(
            bound.get("isc_test_env_override_input"),
            Some(&Value::Integer(4))
        );
    }
}
