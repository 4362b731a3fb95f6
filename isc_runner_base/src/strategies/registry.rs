// src/strategies/registry.rs
//! Lookup table from resource type to fetcher

use crate::strategies::errors::{FetchError, RegistryError};
use crate::strategies::traits::ResourceFetcher;
use crate::types::ResourceSnapshot;
use isc_profile::logging::codes;
use isc_profile::model::{ResourceDescriptor, ResourceType};
use std::collections::HashMap;
use std::sync::Arc;

/// Fetcher registry keyed by resource type
#[derive(Default, Clone)]
pub struct FetcherRegistry {
    fetchers: HashMap<ResourceType, Arc<dyn ResourceFetcher>>,
}

impl FetcherRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fetcher for every type it declares
    pub fn register(&mut self, fetcher: Arc<dyn ResourceFetcher>) -> Result<(), RegistryError> {
        let types = fetcher.resource_types();
        if types.is_empty() {
            return Err(RegistryError::NoResourceTypes {
                fetcher_id: fetcher.fetcher_id().to_string(),
            });
        }

        for resource_type in &types {
            if let Some(existing) = self.fetchers.get(resource_type) {
                return Err(RegistryError::DuplicateType {
                    resource_type: *resource_type,
                    existing: existing.fetcher_id().to_string(),
                });
            }
        }

        for resource_type in types {
            isc_profile::log_debug!("Registered fetcher",
                "resource_type" => resource_type,
                "fetcher" => fetcher.fetcher_id()
            );
            self.fetchers.insert(resource_type, Arc::clone(&fetcher));
        }
        Ok(())
    }

    /// Builder-style registration
    pub fn with(mut self, fetcher: Arc<dyn ResourceFetcher>) -> Result<Self, RegistryError> {
        self.register(fetcher)?;
        Ok(self)
    }

    pub fn get(&self, resource_type: ResourceType) -> Result<Arc<dyn ResourceFetcher>, FetchError> {
        self.fetchers
            .get(&resource_type)
            .cloned()
            .ok_or(FetchError::UnsupportedType { resource_type })
    }

    pub fn has_type(&self, resource_type: ResourceType) -> bool {
        self.fetchers.contains_key(&resource_type)
    }

    /// Registered types in a stable order
    pub fn resource_types(&self) -> Vec<ResourceType> {
        let mut types: Vec<ResourceType> = self.fetchers.keys().copied().collect();
        types.sort();
        types
    }

    /// Validate the locator, then dispatch to the registered fetcher
    pub fn fetch(&self, descriptor: &ResourceDescriptor) -> Result<ResourceSnapshot, FetchError> {
        descriptor.validate()?;
        let fetcher = self.get(descriptor.resource_type).map_err(|e| {
            isc_profile::log_error!(codes::fetch::UNSUPPORTED_TYPE, "No fetcher for resource type",
                "resource_type" => descriptor.resource_type
            );
            e
        })?;
        fetcher.fetch(descriptor)
    }
}

impl std::fmt::Debug for FetcherRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetcherRegistry")
            .field("resource_types", &self.resource_types())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use isc_profile::model::LocatorError;
    use std::collections::BTreeMap;

    struct StaticFetcher(Vec<ResourceType>);

    impl ResourceFetcher for StaticFetcher {
        fn fetch(&self, _: &ResourceDescriptor) -> Result<ResourceSnapshot, FetchError> {
            Ok(ResourceSnapshot::present(BTreeMap::new()))
        }

        fn resource_types(&self) -> Vec<ResourceType> {
            self.0.clone()
        }

        fn fetcher_id(&self) -> &str {
            "static"
        }
    }

    fn descriptor() -> ResourceDescriptor {
        ResourceDescriptor::new(ResourceType::JsonDocument, BTreeMap::new()).with("path", "x.json")
    }

    #[test]
    fn test_dispatches_by_type() {
        let registry = FetcherRegistry::new()
            .with(Arc::new(StaticFetcher(vec![ResourceType::JsonDocument])))
            .unwrap();
        assert!(registry.has_type(ResourceType::JsonDocument));
        assert!(registry.fetch(&descriptor()).unwrap().exists);
    }

    #[test]
    fn test_unregistered_type_is_unsupported() {
        let registry = FetcherRegistry::new();
        assert_matches!(
            registry.fetch(&descriptor()),
            Err(FetchError::UnsupportedType {
                resource_type: ResourceType::JsonDocument
            })
        );
    }

    #[test]
    fn test_blank_locator_rejected_before_dispatch() {
        let registry = FetcherRegistry::new()
            .with(Arc::new(StaticFetcher(vec![ResourceType::JsonDocument])))
            .unwrap();
        let blank = ResourceDescriptor::new(ResourceType::JsonDocument, BTreeMap::new())
            .with("path", "  ");
        assert_matches!(
            registry.fetch(&blank),
            Err(FetchError::InvalidLocator(LocatorError::EmptyField { .. }))
        );
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut registry = FetcherRegistry::new();
        registry
            .register(Arc::new(StaticFetcher(vec![ResourceType::OperatingSystem])))
            .unwrap();
        assert_matches!(
            registry.register(Arc::new(StaticFetcher(vec![ResourceType::OperatingSystem]))),
            Err(RegistryError::DuplicateType { .. })
        );
        assert_matches!(
            registry.register(Arc::new(StaticFetcher(vec![]))),
            Err(RegistryError::NoResourceTypes { .. })
        );
    }
}
