//! # Results
//!
//! Per-control results, run aggregation and report output.

pub mod aggregator;
pub mod error;
pub mod sinks;
pub mod types;

pub use aggregator::{aggregate, aggregate_run, AggregationPolicy};
pub use error::ReportError;
pub use sinks::{ConsoleSink, JsonFileSink, ReportSink};
pub use types::{
    ControlResult, GroupOutcome, GroupResult, HostContext, Report, RunMetadata, Totals,
};
