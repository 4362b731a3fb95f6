//! # Public API
//!
//! Configuration for embedding the runner.

pub mod config;

pub use config::RunnerConfig;
