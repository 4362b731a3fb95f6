//! # Runner Configuration

use crate::results::AggregationPolicy;
use isc_profile::config::{constants, env_opt, env_or};
use std::time::Duration;

/// Configuration for the control runner
///
/// `Default` honours `ISC_MAX_THREADS` and `ISC_TIMEOUT_SECS`.
#[derive(Debug, Clone, PartialEq)]
pub struct RunnerConfig {
    /// Worker threads fetching resource groups
    pub max_threads: usize,

    /// Run-level deadline; groups unfinished by then fail with `timeout`
    pub timeout: Option<Duration>,

    /// Failures at or below this impact do not fail the run
    pub impact_threshold: Option<f64>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        let detected = num_cpus::get().clamp(1, constants::runner::MAX_WORKER_THREADS);
        Self {
            max_threads: env_or(constants::runner::MAX_THREADS_ENV, detected)
                .clamp(1, constants::runner::MAX_WORKER_THREADS),
            timeout: env_opt::<u64>(constants::runner::TIMEOUT_ENV)
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
            impact_threshold: None,
        }
    }
}

impl RunnerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set maximum worker threads (clamped to at least one)
    pub fn with_max_threads(mut self, max_threads: usize) -> Self {
        self.max_threads = max_threads.clamp(1, constants::runner::MAX_WORKER_THREADS);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn without_timeout(mut self) -> Self {
        self.timeout = None;
        self
    }

    pub fn with_impact_threshold(mut self, threshold: f64) -> Self {
        self.impact_threshold = Some(threshold);
        self
    }

    pub fn aggregation_policy(&self) -> AggregationPolicy {
        AggregationPolicy {
            impact_threshold: self.impact_threshold,
        }
    }
}
