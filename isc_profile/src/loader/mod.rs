//! Profile loader
//!
//! Parses TOML profile documents, validates them without any inputs, and
//! binds them against [`BoundInputs`] into an immutable [`Profile`].
//!
//! # Document shape
//!
//! ```toml
//! [profile]
//! name = "ha-gce"
//!
//! [[inputs]]
//! name = "output_self_links"
//! type = "mapping"
//!
//! [[controls]]
//! name = "status"
//! title = "Ensure VMs are running"
//! impact = 1.0
//!
//! [[controls.resources]]
//! type = "compute_instance"
//! for_each = "output_self_links"
//! locator = { self_link = "${item}" }
//!
//! [[controls.resources.expect]]
//! op = "exists"
//!
//! [[controls.resources.expect]]
//! field = "status"
//! op = "equals"
//! value = "RUNNING"
//! ```

pub mod error;
pub mod template;

pub use error::ProfileError;

use crate::config::constants;
use crate::inputs::{bind_inputs, BoundInputs, InputSet, InputSpec};
use crate::logging::codes;
use crate::model::{
    Comparator, Control, Expectation, Expected, FieldPath, Profile, ResourceDescriptor,
    ResourceGroup, ResourceType, Value,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::time::Duration;

// ============================================================================
// DOCUMENT TYPES
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProfileDocument {
    pub profile: ProfileHeader,
    #[serde(default)]
    pub inputs: Vec<InputSpec>,
    #[serde(default)]
    pub controls: Vec<ControlDocument>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProfileHeader {
    pub name: String,
    pub title: Option<String>,
    pub version: Option<String>,
    pub summary: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ControlDocument {
    pub name: String,
    pub title: Option<String>,
    pub impact: f64,
    pub description: Option<String>,
    #[serde(default)]
    pub resources: Vec<ResourceDocument>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResourceDocument {
    #[serde(rename = "type")]
    pub resource_type: ResourceType,
    /// Input whose items each produce one resource group
    pub for_each: Option<String>,
    #[serde(default)]
    pub locator: BTreeMap<String, String>,
    pub label: Option<String>,
    #[serde(default)]
    pub expect: Vec<ExpectDocument>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExpectDocument {
    pub field: Option<String>,
    pub op: Comparator,
    pub value: Option<Value>,
    pub input: Option<String>,
    pub pattern: Option<String>,
    pub age_secs: Option<u64>,
    #[serde(default)]
    pub negate: bool,
    pub when: Option<WhenDocument>,
    pub description: Option<String>,
}

/// Condition on an input deciding whether an expectation is bound
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WhenDocument {
    pub input: String,
    pub is: InputCondition,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputCondition {
    /// Absent, or present with zero length
    Empty,
    Present,
}

// ============================================================================
// PARSING AND VALIDATION
// ============================================================================

impl ProfileDocument {
    /// Parse and validate a profile document
    pub fn from_toml_str(content: &str) -> Result<Self, ProfileError> {
        let document: ProfileDocument = toml::from_str(content).map_err(|e| {
            crate::log_error!(codes::profile::PROFILE_PARSE_ERROR, "Profile parse failed",
                "reason" => e.message()
            );
            ProfileError::Parse {
                reason: e.to_string(),
            }
        })?;
        document.validate()?;
        Ok(document)
    }

    /// Read, size-check, parse and validate a profile file
    pub fn load_file(path: impl AsRef<Path>) -> Result<Self, ProfileError> {
        let path = path.as_ref();
        let io_error = |source| ProfileError::Io {
            path: path.to_path_buf(),
            source,
        };

        let size = std::fs::metadata(path).map_err(io_error)?.len();
        let limit = constants::profile::MAX_PROFILE_SIZE;
        if size > limit {
            return Err(ProfileError::TooLarge {
                path: path.to_path_buf(),
                size,
                limit,
            });
        }

        let content = std::fs::read_to_string(path).map_err(io_error)?;
        Self::from_toml_str(&content)
    }

    fn declared(&self, name: &str) -> bool {
        self.inputs.iter().any(|i| i.name == name)
    }

    /// Structural validation that needs no input values
    pub fn validate(&self) -> Result<(), ProfileError> {
        let limit = constants::profile::MAX_CONTROLS;
        if self.controls.len() > limit {
            return Err(ProfileError::TooManyControls {
                count: self.controls.len(),
                limit,
            });
        }

        let mut names = HashSet::new();
        for control in &self.controls {
            if !names.insert(control.name.as_str()) {
                return Err(ProfileError::DuplicateControl {
                    control: control.name.clone(),
                });
            }
            if !(0.0..=1.0).contains(&control.impact) {
                return Err(ProfileError::InvalidImpact {
                    control: control.name.clone(),
                    impact: control.impact,
                });
            }
            for (resource_index, resource) in control.resources.iter().enumerate() {
                self.validate_resource(control, resource_index, resource)?;
            }
        }
        Ok(())
    }

    fn validate_resource(
        &self,
        control: &ControlDocument,
        resource_index: usize,
        resource: &ResourceDocument,
    ) -> Result<(), ProfileError> {
        let undeclared = |input: &str| ProfileError::UndeclaredInput {
            control: control.name.clone(),
            input: input.to_string(),
        };

        if let Some(input) = &resource.for_each {
            if !self.declared(input) {
                return Err(undeclared(input));
            }
        }

        let loop_vars: &[&str] = if resource.for_each.is_some() {
            &[
                constants::profile::ITEM_VARIABLE,
                constants::profile::KEY_VARIABLE,
            ]
        } else {
            &[]
        };
        let check_template = |text: &str| -> Result<(), ProfileError> {
            for name in template::variables(text) {
                if !loop_vars.contains(&name.as_str()) && !self.declared(&name) {
                    return Err(undeclared(&name));
                }
            }
            Ok(())
        };

        for value in resource.locator.values() {
            check_template(value)?;
        }
        if let Some(label) = &resource.label {
            check_template(label)?;
        }

        if resource.expect.len() > constants::profile::MAX_EXPECTATIONS_PER_GROUP {
            return Err(ProfileError::InvalidExpectation {
                control: control.name.clone(),
                resource: resource_index,
                index: resource.expect.len(),
                reason: format!(
                    "more than {} expectations",
                    constants::profile::MAX_EXPECTATIONS_PER_GROUP
                ),
            });
        }

        for (index, expect) in resource.expect.iter().enumerate() {
            let invalid = |reason: String| ProfileError::InvalidExpectation {
                control: control.name.clone(),
                resource: resource_index,
                index,
                reason,
            };

            check_expectation_shape(expect).map_err(invalid)?;

            if let Some(field) = &expect.field {
                FieldPath::parse(field).map_err(|source| ProfileError::InvalidFieldPath {
                    control: control.name.clone(),
                    source,
                })?;
            }
            if let Some(input) = &expect.input {
                if !self.declared(input) {
                    return Err(undeclared(input));
                }
            }
            if let Some(when) = &expect.when {
                if !self.declared(&when.input) {
                    return Err(undeclared(&when.input));
                }
            }
            if let Some(pattern) = &expect.pattern {
                check_template(pattern)?;
            }
            if let Some(Value::String(literal)) = &expect.value {
                check_template(literal)?;
            }
        }
        Ok(())
    }

    /// Coerce provided inputs and bind the profile
    pub fn bind_with(&self, provided: &InputSet) -> Result<Profile, ProfileError> {
        let inputs = bind_inputs(&self.inputs, provided)?;
        crate::log_success!(codes::success::INPUTS_BOUND, "Inputs bound",
            "profile" => self.profile.name,
            "inputs" => self.inputs.len()
        );
        self.bind(&inputs)
    }

    /// Expand `for_each`, render templates and resolve expected values
    pub fn bind(&self, inputs: &BoundInputs) -> Result<Profile, ProfileError> {
        let mut controls = Vec::with_capacity(self.controls.len());

        for control in &self.controls {
            let mut groups = Vec::new();
            for resource in &control.resources {
                groups.extend(bind_resource(control, resource, inputs)?);
            }
            controls.push(Control {
                name: control.name.clone(),
                title: control.title.clone().unwrap_or_else(|| control.name.clone()),
                impact: control.impact,
                description: control.description.clone(),
                groups,
            });
        }

        crate::log_success!(codes::success::PROFILE_LOADED, "Profile bound",
            "profile" => self.profile.name,
            "controls" => controls.len()
        );

        Ok(Profile {
            name: self.profile.name.clone(),
            title: self.profile.title.clone(),
            version: self.profile.version.clone(),
            controls,
        })
    }
}

/// Check that the comparator has the field and expected source it needs
fn check_expectation_shape(expect: &ExpectDocument) -> Result<(), String> {
    let sources = [
        expect.value.is_some(),
        expect.input.is_some(),
        expect.pattern.is_some(),
        expect.age_secs.is_some(),
    ]
    .iter()
    .filter(|present| **present)
    .count();

    if expect.op.targets_resource() {
        if expect.field.is_some() {
            return Err(format!("'{}' does not take a field", expect.op));
        }
    } else if expect.field.is_none() {
        return Err(format!("'{}' requires a field", expect.op));
    }

    if expect.op.is_unary() {
        if sources > 0 {
            return Err(format!("'{}' does not take an expected value", expect.op));
        }
        return Ok(());
    }

    if sources != 1 {
        return Err(format!(
            "'{}' requires exactly one of value, input, pattern or age_secs",
            expect.op
        ));
    }

    match expect.op {
        Comparator::Matches if expect.age_secs.is_some() => {
            Err("'matches' cannot take age_secs".to_string())
        }
        Comparator::Matches if matches!(&expect.value, Some(v) if v.as_str().is_none()) => {
            Err("'matches' value must be a string".to_string())
        }
        Comparator::Equals | Comparator::InSet
            if expect.pattern.is_some() || expect.age_secs.is_some() =>
        {
            Err(format!("'{}' takes a value or an input", expect.op))
        }
        Comparator::InSet if matches!(&expect.value, Some(v) if v.as_sequence().is_none()) => {
            Err("'in_set' value must be a sequence".to_string())
        }
        Comparator::GreaterOrEqual if expect.pattern.is_some() => {
            Err("'greater_or_equal' cannot take a pattern".to_string())
        }
        _ => Ok(()),
    }
}

// ============================================================================
// BINDING
// ============================================================================

fn bind_resource(
    control: &ControlDocument,
    resource: &ResourceDocument,
    inputs: &BoundInputs,
) -> Result<Vec<ResourceGroup>, ProfileError> {
    let loop_items = expand_for_each(control, resource, inputs)?;
    let mut groups = Vec::with_capacity(loop_items.len());

    for vars in loop_items {
        let resolve = |name: &str| {
            vars.get(name)
                .cloned()
                .or_else(|| inputs.get(name).map(Value::stringify))
        };
        let template_error = |source| ProfileError::Template {
            control: control.name.clone(),
            source,
        };

        let mut locator = BTreeMap::new();
        for (key, value) in &resource.locator {
            locator.insert(
                key.clone(),
                template::render(value, resolve).map_err(template_error)?,
            );
        }
        let descriptor = ResourceDescriptor::new(resource.resource_type, locator);

        let label = match &resource.label {
            Some(label) => template::render(label, resolve).map_err(template_error)?,
            None => descriptor.to_string(),
        };

        let mut expectations = Vec::with_capacity(resource.expect.len());
        for expect in &resource.expect {
            if let Some(when) = &expect.when {
                let empty = inputs.is_empty_input(&when.input);
                let applies = match when.is {
                    InputCondition::Empty => empty,
                    InputCondition::Present => !empty,
                };
                if !applies {
                    continue;
                }
            }
            expectations.push(bind_expectation(control, expect, inputs, &resolve)?);
        }

        let descriptor = match descriptor.validate() {
            Ok(()) => Ok(descriptor),
            Err(e) => {
                crate::log_warning!("Resource group has an invalid locator",
                    "control" => control.name,
                    "group" => label,
                    "reason" => e
                );
                Err(e)
            }
        };

        groups.push(ResourceGroup {
            label,
            descriptor,
            expectations,
        });
    }

    Ok(groups)
}

/// Loop variables for each group the resource expands to
fn expand_for_each(
    control: &ControlDocument,
    resource: &ResourceDocument,
    inputs: &BoundInputs,
) -> Result<Vec<BTreeMap<String, String>>, ProfileError> {
    let Some(input) = &resource.for_each else {
        return Ok(vec![BTreeMap::new()]);
    };

    let item_var = constants::profile::ITEM_VARIABLE.to_string();
    let key_var = constants::profile::KEY_VARIABLE.to_string();

    match inputs.get(input) {
        // An absent optional input expands to no groups
        None => Ok(Vec::new()),
        Some(Value::Mapping(map)) => Ok(map
            .iter()
            .map(|(key, value)| {
                BTreeMap::from([
                    (item_var.clone(), value.stringify()),
                    (key_var.clone(), key.clone()),
                ])
            })
            .collect()),
        Some(Value::Sequence(items)) => Ok(items
            .iter()
            .enumerate()
            .map(|(index, value)| {
                BTreeMap::from([
                    (item_var.clone(), value.stringify()),
                    (key_var.clone(), index.to_string()),
                ])
            })
            .collect()),
        Some(other) => Err(ProfileError::InvalidForEach {
            control: control.name.clone(),
            input: input.clone(),
            actual: other.type_name().to_string(),
        }),
    }
}

fn bind_expectation<F>(
    control: &ControlDocument,
    expect: &ExpectDocument,
    inputs: &BoundInputs,
    resolve: &F,
) -> Result<Expectation, ProfileError>
where
    F: Fn(&str) -> Option<String>,
{
    let template_error = |source| ProfileError::Template {
        control: control.name.clone(),
        source,
    };

    let field = expect
        .field
        .as_deref()
        .map(FieldPath::parse)
        .transpose()
        .map_err(|source| ProfileError::InvalidFieldPath {
            control: control.name.clone(),
            source,
        })?;

    let expected = if let Some(secs) = expect.age_secs {
        Expected::MinimumAge(Duration::from_secs(secs))
    } else if let Some(pattern) = &expect.pattern {
        let rendered = template::render(pattern, |name| resolve(name).map(|v| regex::escape(&v)))
            .map_err(template_error)?;
        Expected::Value(Value::String(rendered))
    } else if let Some(name) = &expect.input {
        match inputs.get(name) {
            Some(value) => Expected::Value(value.clone()),
            None => {
                return Err(ProfileError::Input(crate::inputs::InputError::Missing {
                    name: name.clone(),
                }))
            }
        }
    } else if let Some(value) = &expect.value {
        match value {
            Value::String(literal) => Expected::Value(Value::String(
                template::render(literal, resolve).map_err(template_error)?,
            )),
            other => Expected::Value(other.clone()),
        }
    } else {
        Expected::Nothing
    };

    Ok(Expectation {
        field,
        comparator: expect.op,
        expected,
        negate: expect.negate,
        description: expect.description.clone(),
    })
}
