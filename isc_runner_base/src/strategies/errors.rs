// src/strategies/errors.rs
//! Error types for resource fetching
//!
//! Fetch errors never abort a run. The runner converts them into failing
//! verdicts for every expectation bound to the affected resource group.

use crate::strategies::command_executor::CommandError;
use isc_profile::model::{LocatorError, ResourceType};

/// Failure to produce a snapshot for one descriptor
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FetchError {
    #[error("{0}")]
    InvalidLocator(#[from] LocatorError),

    #[error("{fetcher}: {reason}")]
    Provider { fetcher: String, reason: String },

    #[error("provider call timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("no fetcher registered for resource type '{resource_type}'")]
    UnsupportedType { resource_type: ResourceType },

    #[error("failed to parse provider response: {reason}")]
    Parse { reason: String },
}

impl FetchError {
    pub fn provider(fetcher: impl Into<String>, reason: impl Into<String>) -> Self {
        FetchError::Provider {
            fetcher: fetcher.into(),
            reason: reason.into(),
        }
    }

    pub fn parse(reason: impl Into<String>) -> Self {
        FetchError::Parse {
            reason: reason.into(),
        }
    }

    /// Map a subprocess failure for the named fetcher
    pub fn from_command(fetcher: &str, error: CommandError) -> Self {
        match error {
            CommandError::Timeout { timeout_ms } => FetchError::Timeout { timeout_ms },
            other => FetchError::provider(fetcher, other.to_string()),
        }
    }

    pub fn is_invalid_locator(&self) -> bool {
        matches!(self, FetchError::InvalidLocator(_))
    }

    /// Reason recorded on every verdict of the affected group
    pub fn verdict_reason(&self) -> String {
        match self {
            FetchError::InvalidLocator(e) => format!("invalid locator: {}", e),
            other => format!("fetch error: {}", other),
        }
    }
}

/// Fetcher registration errors
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Resource type '{resource_type}' already served by fetcher '{existing}'")]
    DuplicateType {
        resource_type: ResourceType,
        existing: String,
    },

    #[error("Fetcher '{fetcher_id}' declares no resource types")]
    NoResourceTypes { fetcher_id: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verdict_reasons() {
        let invalid = FetchError::from(LocatorError::Malformed {
            value: "not-a-link".to_string(),
            reason: "expected .../projects/<p>/zones/<z>/instances/<n>".to_string(),
        });
        assert!(invalid.is_invalid_locator());
        assert!(invalid
            .verdict_reason()
            .starts_with("invalid locator: Malformed locator 'not-a-link'"));

        let provider = FetchError::provider("gcloud", "permission denied");
        assert_eq!(provider.verdict_reason(), "fetch error: gcloud: permission denied");
    }

    #[test]
    fn test_command_timeout_maps_to_fetch_timeout() {
        let error = FetchError::from_command("gcloud", CommandError::Timeout { timeout_ms: 30000 });
        assert_eq!(error, FetchError::Timeout { timeout_ms: 30000 });

        let error = FetchError::from_command(
            "ssh",
            CommandError::ProgramNotFound {
                program: "ssh".to_string(),
            },
        );
        assert!(matches!(error, FetchError::Provider { .. }));
    }
}
