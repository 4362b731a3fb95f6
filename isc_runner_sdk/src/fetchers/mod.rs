//! Concrete resource fetchers

pub mod compute_instance;
pub mod json_document;
pub mod operating_system;

pub use compute_instance::{ComputeInstanceFetcher, InstanceLocation};
pub use json_document::JsonDocumentFetcher;
pub use operating_system::OperatingSystemFetcher;
