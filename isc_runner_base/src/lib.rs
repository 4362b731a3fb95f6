//! # ISC Runner Base - Infrastructure State Checks
//!
//! Fetches live resource state, evaluates declarative expectations against
//! it and aggregates the verdicts into a report. Concrete fetchers for
//! cloud and host resources live in `isc_runner_sdk`.

pub mod api;
pub mod execution;
pub mod results;
pub mod strategies;
pub mod types;

pub use api::RunnerConfig;
pub use execution::{evaluate, Clock, ControlRunner, FixedClock, SystemClock, Verdict};
pub use results::{aggregate, AggregationPolicy, ControlResult, Report, ReportSink};
pub use strategies::{FetchError, FetcherRegistry, ResourceFetcher, SystemCommandExecutor};
pub use types::ResourceSnapshot;

pub mod prelude {
    pub use crate::api::RunnerConfig;

    pub use crate::execution::{
        evaluate, Clock, ControlRunner, EvaluationError, FixedClock, GroupState, SystemClock,
        Verdict,
    };

    pub use crate::results::{
        aggregate, aggregate_run, AggregationPolicy, ConsoleSink, ControlResult, GroupOutcome,
        GroupResult, HostContext, JsonFileSink, Report, ReportError, ReportSink, RunMetadata,
        Totals,
    };

    pub use crate::strategies::{
        CommandError, CommandOutput, FetchError, FetcherRegistry, RegistryError, ResourceFetcher,
        SystemCommandExecutor,
    };

    pub use crate::types::{ResolveError, ResourceSnapshot};
}
