//! Command execution configurations for provider CLIs
//!
//! Provides whitelisted command executors for the cloud and remote-host fetchers.

pub mod gcloud;
pub mod ssh;

pub use gcloud::create_gcloud_command_executor;
pub use ssh::create_ssh_command_executor;
