//! JSON document fetcher
//!
//! Exposes a local JSON file (or the object under a JSON pointer within it)
//! as a resource. A missing file is a nonexistent resource.

use isc_profile::model::{LocatorError, ResourceDescriptor, ResourceType};
use isc_runner_base::strategies::{FetchError, ResourceFetcher};
use isc_runner_base::types::ResourceSnapshot;
use std::path::Path;

pub struct JsonDocumentFetcher {
    id: String,
}

impl JsonDocumentFetcher {
    pub fn new() -> Self {
        Self {
            id: "json_document_fetcher".to_string(),
        }
    }
}

impl Default for JsonDocumentFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceFetcher for JsonDocumentFetcher {
    fn fetch(&self, descriptor: &ResourceDescriptor) -> Result<ResourceSnapshot, FetchError> {
        let path = Path::new(descriptor.require("path")?);
        let pointer = descriptor.get("pointer");
        if let Some(pointer) = pointer {
            if !pointer.is_empty() && !pointer.starts_with('/') {
                return Err(LocatorError::Malformed {
                    value: pointer.to_string(),
                    reason: "JSON pointer must be empty or start with '/'".to_string(),
                }
                .into());
            }
        }

        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                isc_profile::log_debug!("JSON document not found", "path" => path.display());
                return Ok(ResourceSnapshot::missing());
            }
            Err(e) => {
                return Err(FetchError::provider(
                    &self.id,
                    format!("failed to read {}: {}", path.display(), e),
                ))
            }
        };

        document_snapshot(&content, pointer.unwrap_or(""))
    }

    fn resource_types(&self) -> Vec<ResourceType> {
        vec![ResourceType::JsonDocument]
    }

    fn fetcher_id(&self) -> &str {
        &self.id
    }
}

/// Snapshot of the object at `pointer`; a dangling pointer is a missing resource
pub fn document_snapshot(content: &str, pointer: &str) -> Result<ResourceSnapshot, FetchError> {
    let parsed: serde_json::Value =
        serde_json::from_str(content).map_err(|e| FetchError::parse(e.to_string()))?;

    let Some(target) = parsed.pointer(pointer) else {
        return Ok(ResourceSnapshot::missing());
    };
    let object = target.as_object().ok_or_else(|| {
        FetchError::parse(format!(
            "document at '{}' is not a JSON object",
            if pointer.is_empty() { "/" } else { pointer }
        ))
    })?;

    Ok(ResourceSnapshot::from_json_object(object))
}
