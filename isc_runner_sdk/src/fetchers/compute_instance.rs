//! # Compute Instance Fetcher
//!
//! Describes a Google Compute Engine instance through the `gcloud` CLI.
//!
//! Locator fields are either `self_link`
//! (`.../projects/<p>/zones/<z>/instances/<n>`) or `project`, `zone` and
//! `name`. Besides the provider's own attributes the snapshot carries:
//!
//! - `zone_name`, `machine_type_name`: last path segment of `zone` / `machineType`
//! - `disk_count`, `network_interfaces_count`: lengths of `disks` / `networkInterfaces`
//! - snake_case aliases `machine_type`, `creation_timestamp`,
//!   `service_accounts`, `network_interfaces`

use isc_profile::config::constants::providers;
use isc_profile::model::{LocatorError, ResourceDescriptor, ResourceType, Value};
use isc_runner_base::strategies::{FetchError, ResourceFetcher, SystemCommandExecutor};
use isc_runner_base::types::ResourceSnapshot;

/// Fully qualified instance address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceLocation {
    pub project: String,
    pub zone: String,
    pub name: String,
}

impl InstanceLocation {
    /// Parse `.../projects/<p>/zones/<z>/instances/<n>`
    pub fn from_self_link(link: &str) -> Result<Self, LocatorError> {
        let malformed = |reason: &str| LocatorError::Malformed {
            value: link.to_string(),
            reason: reason.to_string(),
        };

        let segments: Vec<&str> = link.trim().split('/').collect();
        let start = segments
            .iter()
            .rposition(|s| *s == "projects")
            .ok_or_else(|| malformed("expected .../projects/<p>/zones/<z>/instances/<n>"))?;
        let rest = &segments[start..];

        if rest.len() < 6 || rest[2] != "zones" || rest[4] != "instances" {
            return Err(malformed(
                "expected .../projects/<p>/zones/<z>/instances/<n>",
            ));
        }

        Self {
            project: rest[1].to_string(),
            zone: rest[3].to_string(),
            name: rest[5..].join("/"),
        }
        .checked(link)
    }

    /// Segments end up as `gcloud` arguments, so none may be empty or look like an option
    fn checked(self, locator: &str) -> Result<Self, LocatorError> {
        for segment in [&self.project, &self.zone, &self.name] {
            let reason = if segment.is_empty() {
                "project, zone and name must be non-empty"
            } else if segment.starts_with('-') {
                "project, zone and name must not start with '-'"
            } else {
                continue;
            };
            return Err(LocatorError::Malformed {
                value: locator.to_string(),
                reason: reason.to_string(),
            });
        }
        Ok(self)
    }

    /// Resolve from either locator form; `self_link` wins when both are given
    pub fn from_descriptor(descriptor: &ResourceDescriptor) -> Result<Self, LocatorError> {
        if let Some(link) = descriptor.get("self_link") {
            return Self::from_self_link(link);
        }
        let project = descriptor.require("project")?;
        let zone = descriptor.require("zone")?;
        let name = descriptor.require("name")?;
        Self {
            project: project.to_string(),
            zone: zone.to_string(),
            name: name.to_string(),
        }
        .checked(&format!("{}/{}/{}", project, zone, name))
    }
}

pub struct ComputeInstanceFetcher {
    id: String,
    executor: SystemCommandExecutor,
}

impl ComputeInstanceFetcher {
    pub fn new(executor: SystemCommandExecutor) -> Self {
        Self {
            id: "gce_instance_fetcher".to_string(),
            executor,
        }
    }

    fn describe(&self, location: &InstanceLocation) -> Result<ResourceSnapshot, FetchError> {
        let args = [
            "compute",
            "instances",
            "describe",
            location.name.as_str(),
            "--project",
            location.project.as_str(),
            "--zone",
            location.zone.as_str(),
            "--format",
            "json",
        ];

        isc_profile::log_debug!("Describing compute instance",
            "project" => location.project,
            "zone" => location.zone,
            "name" => location.name
        );

        let output = self
            .executor
            .execute(providers::GCLOUD, &args, None)
            .map_err(|e| FetchError::from_command(&self.id, e))?;

        if !output.success() {
            if is_not_found(&output.stderr) {
                return Ok(ResourceSnapshot::missing());
            }
            return Err(FetchError::provider(
                &self.id,
                format!(
                    "gcloud exited with {}: {}",
                    output.exit_code,
                    first_error_line(&output.stderr)
                ),
            ));
        }

        instance_snapshot(&output.stdout)
    }
}

impl ResourceFetcher for ComputeInstanceFetcher {
    fn fetch(&self, descriptor: &ResourceDescriptor) -> Result<ResourceSnapshot, FetchError> {
        let location = InstanceLocation::from_descriptor(descriptor)?;
        self.describe(&location)
    }

    fn resource_types(&self) -> Vec<ResourceType> {
        vec![ResourceType::ComputeInstance]
    }

    fn fetcher_id(&self) -> &str {
        &self.id
    }
}

/// Whether gcloud's stderr reports a missing instance
pub fn is_not_found(stderr: &str) -> bool {
    stderr.contains("was not found")
        || stderr.contains("notFound")
        || stderr.contains("HTTPError 404")
}

fn first_error_line(stderr: &str) -> &str {
    stderr
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("no error output")
}

/// Build a snapshot from `gcloud ... describe --format json` output
pub fn instance_snapshot(json: &str) -> Result<ResourceSnapshot, FetchError> {
    let parsed: serde_json::Value =
        serde_json::from_str(json).map_err(|e| FetchError::parse(e.to_string()))?;
    let object = parsed
        .as_object()
        .ok_or_else(|| FetchError::parse("instance description is not a JSON object"))?;

    let mut snapshot = ResourceSnapshot::from_json_object(object);
    let attributes = &mut snapshot.attributes;

    for (derived, source) in [("zone_name", "zone"), ("machine_type_name", "machineType")] {
        let name = attributes
            .get(source)
            .and_then(Value::as_str)
            .map(last_segment);
        if let Some(name) = name {
            attributes.insert(derived.to_string(), Value::String(name));
        }
    }

    let disk_count = sequence_len(attributes.get("disks"));
    attributes.insert("disk_count".to_string(), Value::Integer(disk_count));
    let nic_count = sequence_len(attributes.get("networkInterfaces"));
    attributes.insert("network_interfaces_count".to_string(), Value::Integer(nic_count));

    for (alias, source) in [
        ("machine_type", "machineType"),
        ("creation_timestamp", "creationTimestamp"),
        ("service_accounts", "serviceAccounts"),
        ("network_interfaces", "networkInterfaces"),
        ("self_link", "selfLink"),
    ] {
        if let Some(value) = attributes.get(source).cloned() {
            attributes.entry(alias.to_string()).or_insert(value);
        }
    }

    Ok(snapshot)
}

fn last_segment(url: &str) -> String {
    url.rsplit('/').next().unwrap_or(url).to_string()
}

fn sequence_len(value: Option<&Value>) -> i64 {
    value
        .and_then(Value::as_sequence)
        .map(|items| items.len() as i64)
        .unwrap_or(0)
}
