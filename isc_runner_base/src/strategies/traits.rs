// src/strategies/traits.rs
//! Fetcher trait implemented per resource kind

use crate::strategies::errors::FetchError;
use crate::types::ResourceSnapshot;
use isc_profile::model::{ResourceDescriptor, ResourceType};

/// Produces a point-in-time snapshot for a descriptor
///
/// Implementations make at most one provider call per `fetch` and never
/// retry internally. A resource the provider reports as not found is a
/// successful fetch of a snapshot with `exists == false`, not an error.
/// Fetchers are shared across worker threads.
pub trait ResourceFetcher: Send + Sync {
    fn fetch(&self, descriptor: &ResourceDescriptor) -> Result<ResourceSnapshot, FetchError>;

    /// Resource types this fetcher serves
    fn resource_types(&self) -> Vec<ResourceType>;

    /// Identifier used in logs and provider error messages
    fn fetcher_id(&self) -> &str;
}
