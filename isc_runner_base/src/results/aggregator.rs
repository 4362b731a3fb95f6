//! Report aggregation
//!
//! The run fails when any failing expectation belongs to a control whose
//! impact is strictly above the policy threshold. Without a threshold any
//! failure fails the run.

use crate::results::types::{ControlResult, Report, RunMetadata, Totals};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregationPolicy {
    pub impact_threshold: Option<f64>,
}

impl AggregationPolicy {
    pub fn with_impact_threshold(threshold: f64) -> Self {
        Self {
            impact_threshold: Some(threshold),
        }
    }

    /// Whether failures in a control with this impact fail the run
    pub fn is_blocking(&self, impact: f64) -> bool {
        match self.impact_threshold {
            Some(threshold) => impact > threshold,
            None => true,
        }
    }
}

/// Aggregate with fresh run metadata
pub fn aggregate(results: Vec<ControlResult>, policy: &AggregationPolicy) -> Report {
    aggregate_run(RunMetadata::start("").finish(), results, policy)
}

/// Aggregate control results into a report for the given run
pub fn aggregate_run(
    metadata: RunMetadata,
    mut results: Vec<ControlResult>,
    policy: &AggregationPolicy,
) -> Report {
    results.sort_by_key(|c| c.index);

    let mut totals = Totals {
        controls: results.len(),
        ..Totals::default()
    };
    let mut passed = true;

    for control in &results {
        let failed = control.failed_count();
        totals.expectations += control.expectation_count();
        totals.expectations_failed += failed;

        if control.passed {
            totals.controls_passed += 1;
        } else {
            totals.controls_failed += 1;
            if failed > 0 && policy.is_blocking(control.impact) {
                passed = false;
            }
        }
    }
    totals.expectations_passed = totals.expectations - totals.expectations_failed;

    Report {
        metadata,
        impact_threshold: policy.impact_threshold,
        passed,
        totals,
        controls: results,
    }
}
