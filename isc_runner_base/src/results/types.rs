//! # Run Result Types
//!
//! Serializable per-group, per-control and per-run results. Nothing here is
//! mutated after the runner or aggregator constructs it.

use crate::execution::evaluator::Verdict;
use chrono::{DateTime, Utc};
use isc_profile::model::{Control, ResourceDescriptor};
use serde::{Deserialize, Serialize};

/// How a resource group ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupOutcome {
    /// Snapshot fetched and every expectation evaluated
    Evaluated,
    InvalidLocator,
    FetchFailed,
    /// Not finished before the run deadline
    TimedOut,
}

/// Verdicts for one resource group, in declaration order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupResult {
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub descriptor: Option<ResourceDescriptor>,
    pub outcome: GroupOutcome,
    /// Whether the provider reported the resource; `None` when no snapshot was taken
    pub exists: Option<bool>,
    pub verdicts: Vec<Verdict>,
    pub duration_ms: u64,
}

impl GroupResult {
    pub fn passed(&self) -> bool {
        self.verdicts.iter().all(|v| v.passed)
    }

    pub fn failed_count(&self) -> usize {
        self.verdicts.iter().filter(|v| !v.passed).count()
    }
}

/// Outcome of one control
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlResult {
    /// Declaration index within the profile
    pub index: usize,
    pub name: String,
    pub title: String,
    pub impact: f64,
    pub passed: bool,
    pub groups: Vec<GroupResult>,
    /// Messages of every failing verdict, in declaration order
    pub failures: Vec<String>,
}

impl ControlResult {
    pub fn new(index: usize, control: &Control, groups: Vec<GroupResult>) -> Self {
        let failures: Vec<String> = groups
            .iter()
            .flat_map(|g| {
                g.verdicts
                    .iter()
                    .filter(|v| !v.passed)
                    .map(move |v| format!("{}: {}", g.label, v.message))
            })
            .collect();

        Self {
            index,
            name: control.name.clone(),
            title: control.title.clone(),
            impact: control.impact,
            passed: failures.is_empty(),
            groups,
            failures,
        }
    }

    pub fn verdicts(&self) -> impl Iterator<Item = &Verdict> {
        self.groups.iter().flat_map(|g| g.verdicts.iter())
    }

    pub fn expectation_count(&self) -> usize {
        self.groups.iter().map(|g| g.verdicts.len()).sum()
    }

    pub fn failed_count(&self) -> usize {
        self.groups.iter().map(GroupResult::failed_count).sum()
    }
}

/// Execution host, for correlating reports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostContext {
    pub hostname: String,
    pub os_info: String,
    pub username: String,
}

impl HostContext {
    /// Create host context from system information
    pub fn from_system() -> Self {
        Self {
            hostname: hostname::get()
                .unwrap_or_else(|_| std::ffi::OsString::from("unknown"))
                .to_string_lossy()
                .to_string(),
            os_info: format!("{} {}", std::env::consts::OS, std::env::consts::ARCH),
            username: std::env::var("USER")
                .or_else(|_| std::env::var("USERNAME"))
                .unwrap_or_else(|_| "unknown".to_string()),
        }
    }
}

/// Run identity and timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    pub run_id: String,
    pub profile: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub host: HostContext,
}

impl RunMetadata {
    pub fn start(profile: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            profile: profile.into(),
            started_at: now,
            finished_at: now,
            duration_ms: 0,
            host: HostContext::from_system(),
        }
    }

    pub fn finish(mut self) -> Self {
        self.finished_at = Utc::now();
        self.duration_ms = (self.finished_at - self.started_at)
            .num_milliseconds()
            .max(0) as u64;
        self
    }
}

/// Counts across the whole run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub controls: usize,
    pub controls_passed: usize,
    pub controls_failed: usize,
    pub expectations: usize,
    pub expectations_passed: usize,
    pub expectations_failed: usize,
}

/// Aggregated run report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub metadata: RunMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub impact_threshold: Option<f64>,
    pub passed: bool,
    pub totals: Totals,
    pub controls: Vec<ControlResult>,
}

impl Report {
    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Parse from JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn failed_controls(&self) -> impl Iterator<Item = &ControlResult> {
        self.controls.iter().filter(|c| !c.passed)
    }

    /// Process exit status: 0 on pass, 1 on fail
    pub fn exit_code(&self) -> i32 {
        if self.passed {
            0
        } else {
            1
        }
    }
}
