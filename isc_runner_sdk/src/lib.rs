//! # ISC Runner SDK
//!
//! Concrete resource fetchers, the built-in `ha-gce` / `ha-ssh` profiles
//! and the `isc` command line front end.
//!
//! - Compute instances through the `gcloud` CLI
//! - Host operating system from `/etc/os-release`, locally or over `ssh`
//! - JSON documents on disk, for fixtures and offline runs

pub mod commands;
pub mod fetchers;
pub mod profiles;

use isc_runner_base::strategies::{FetcherRegistry, RegistryError};
use std::sync::Arc;
use std::time::Duration;

/// Create a registry with every available fetcher
///
/// `command_timeout` bounds each provider CLI invocation.
pub fn create_fetcher_registry(command_timeout: Duration) -> Result<FetcherRegistry, RegistryError> {
    let mut registry = FetcherRegistry::new();

    let gcloud = commands::create_gcloud_command_executor(command_timeout);
    registry.register(Arc::new(fetchers::ComputeInstanceFetcher::new(gcloud)))?;

    let ssh = commands::create_ssh_command_executor(command_timeout);
    registry.register(Arc::new(fetchers::OperatingSystemFetcher::new(ssh)))?;

    registry.register(Arc::new(fetchers::JsonDocumentFetcher::new()))?;

    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use isc_profile::model::{ResourceDescriptor, ResourceType, Value};
    use isc_profile::InputSet;
    use isc_runner_base::prelude::*;
    use std::collections::HashMap;

    #[test]
    fn test_registry_creation() {
        let registry = create_fetcher_registry(Duration::from_secs(5)).unwrap();
        assert_eq!(
            registry.resource_types(),
            vec![
                ResourceType::ComputeInstance,
                ResourceType::OperatingSystem,
                ResourceType::JsonDocument,
            ]
        );
    }

    /// Serves canned snapshots keyed by one locator field
    struct CannedFetcher {
        resource_type: ResourceType,
        key: &'static str,
        snapshots: HashMap<String, ResourceSnapshot>,
    }

    impl ResourceFetcher for CannedFetcher {
        fn fetch(&self, descriptor: &ResourceDescriptor) -> Result<ResourceSnapshot, FetchError> {
            let key = descriptor.require(self.key)?;
            self.snapshots
                .get(key)
                .cloned()
                .ok_or_else(|| FetchError::provider("canned", format!("no snapshot for {}", key)))
        }

        fn resource_types(&self) -> Vec<ResourceType> {
            vec![self.resource_type]
        }

        fn fetcher_id(&self) -> &str {
            "canned"
        }
    }

    const LINK_A: &str =
        "https://www.googleapis.com/compute/v1/projects/p/zones/us-west1-a/instances/bigip-a1b2";
    const LINK_B: &str =
        "https://www.googleapis.com/compute/v1/projects/p/zones/us-west1-b/instances/bigip-c3d4";

    fn instance_json(name: &str, zone: &str, status: &str) -> String {
        format!(
            r#"{{
                "name": "{name}",
                "status": "{status}",
                "zone": "https://www.googleapis.com/compute/v1/projects/p/zones/{zone}",
                "machineType": "https://www.googleapis.com/compute/v1/projects/p/zones/{zone}/machineTypes/n1-standard-8",
                "creationTimestamp": "2024-05-01T04:50:00.000-07:00",
                "disks": [{{"boot": true}}],
                "networkInterfaces": [{{}}, {{}}, {{}}],
                "serviceAccounts": [{{"email": "bigip@p.iam.gserviceaccount.com"}}]
            }}"#
        )
    }

    fn gce_runner(status_b: &str) -> ControlRunner {
        let snapshots = HashMap::from([
            (
                LINK_A.to_string(),
                fetchers::compute_instance::instance_snapshot(&instance_json(
                    "bigip-a1b2",
                    "us-west1-a",
                    "RUNNING",
                ))
                .unwrap(),
            ),
            (
                LINK_B.to_string(),
                fetchers::compute_instance::instance_snapshot(&instance_json(
                    "bigip-c3d4",
                    "us-west1-b",
                    status_b,
                ))
                .unwrap(),
            ),
        ]);
        let registry = FetcherRegistry::new()
            .with(Arc::new(CannedFetcher {
                resource_type: ResourceType::ComputeInstance,
                key: "self_link",
                snapshots,
            }))
            .unwrap();

        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        ControlRunner::new(Arc::new(registry), RunnerConfig::new().with_max_threads(2))
            .with_clock(Arc::new(FixedClock::at(now)))
    }

    fn gce_inputs() -> InputSet {
        InputSet::new()
            .with(
                "output_self_links",
                Value::mapping_of([("a", LINK_A), ("b", LINK_B)]),
            )
            .with("output_prefix", "bigip")
            .with(
                "output_zones",
                Value::Sequence(vec![Value::from("us-west1-a"), Value::from("us-west1-b")]),
            )
            .with("output_bigip_sa", "bigip@p.iam.gserviceaccount.com")
            .with("input_machine_type", "n1-standard-8")
            .with("input_num_nics", 3i64)
    }

    #[test]
    fn test_ha_gce_end_to_end_passes() {
        let profile = profiles::resolve_profile("ha-gce")
            .unwrap()
            .bind_with(&gce_inputs())
            .unwrap();
        let report = gce_runner("RUNNING").run_profile(&profile);

        let failures: Vec<&String> = report.controls.iter().flat_map(|c| &c.failures).collect();
        assert!(report.passed, "unexpected failures: {:?}", failures);
        assert_eq!(report.totals.controls, 3);
        assert_eq!(report.exit_code(), 0);
    }

    #[test]
    fn test_ha_gce_end_to_end_reports_stopped_instance() {
        let profile = profiles::resolve_profile("ha-gce")
            .unwrap()
            .bind_with(&gce_inputs())
            .unwrap();
        let report = gce_runner("TERMINATED").run_profile(&profile);

        assert!(!report.passed);
        assert_eq!(report.exit_code(), 1);
        let failed: Vec<&str> = report.failed_controls().map(|c| c.name.as_str()).collect();
        assert_eq!(failed, vec!["status"]);
        assert_eq!(report.controls[0].failures.len(), 1);
        assert!(report.controls[0].failures[0].starts_with("b: "));
    }

    #[test]
    fn test_ha_gce_labels_mismatch_fails_configuration() {
        let profile = profiles::resolve_profile("ha-gce")
            .unwrap()
            .bind_with(&gce_inputs().with("output_labels", Value::mapping_of([("env", "prod")])))
            .unwrap();
        let report = gce_runner("RUNNING").run_profile(&profile);

        let failed: Vec<&str> = report.failed_controls().map(|c| c.name.as_str()).collect();
        assert_eq!(failed, vec!["configuration"]);
    }

    #[test]
    fn test_ha_ssh_end_to_end() {
        let snapshot = fetchers::operating_system::os_snapshot("ID=centos\nVERSION_ID=7\n").unwrap();
        let registry = FetcherRegistry::new()
            .with(Arc::new(CannedFetcher {
                resource_type: ResourceType::OperatingSystem,
                key: "host",
                snapshots: HashMap::from([("admin@10.0.0.4".to_string(), snapshot)]),
            }))
            .unwrap();
        let runner = ControlRunner::new(Arc::new(registry), RunnerConfig::new());

        let document = profiles::resolve_profile("ha-ssh").unwrap();
        let inputs = InputSet::new().with("ssh_target", "admin@10.0.0.4");
        let report = runner.run_profile(&document.bind_with(&inputs).unwrap());
        assert!(report.passed);

        let inputs = inputs.with("expected_os", "ubuntu");
        let report = runner.run_profile(&document.bind_with(&inputs).unwrap());
        assert!(!report.passed);
        assert_eq!(report.totals.expectations_failed, 1);
    }
}
