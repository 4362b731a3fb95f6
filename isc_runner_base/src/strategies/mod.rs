// src/strategies/mod.rs
//! Resource fetching strategies
//!
//! - [`ResourceFetcher`] - per-kind snapshot producer
//! - [`FetcherRegistry`] - resource type to fetcher lookup table
//! - [`SystemCommandExecutor`] - whitelisted subprocess execution for provider CLIs

pub mod command_executor;
pub mod errors;
pub mod registry;
pub mod traits;

pub use command_executor::{CommandError, CommandOutput, SystemCommandExecutor};
pub use errors::{FetchError, RegistryError};
pub use registry::FetcherRegistry;
pub use traits::ResourceFetcher;
