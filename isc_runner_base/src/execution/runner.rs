//! # Control Runner
//!
//! Fetches every resource group once and evaluates its expectations against
//! that single snapshot. Groups from all controls are flattened into one job
//! queue served by a bounded pool of worker threads.
//!
//! Each group moves through `Pending -> Fetching -> Evaluating -> Done`.
//! A fetch failure goes straight from `Fetching` to `Done` and fails every
//! bound expectation with the fetch reason. Groups that are not `Done` by
//! the run deadline fail with reason `timeout`; their workers are abandoned.

use crate::api::RunnerConfig;
use crate::execution::clock::{Clock, SystemClock};
use crate::execution::evaluator::{evaluate, Verdict};
use crate::results::{aggregate_run, ControlResult, GroupOutcome, GroupResult, Report, RunMetadata};
use crate::strategies::{FetchError, FetcherRegistry};
use isc_profile::logging::codes;
use isc_profile::model::{Control, Profile, ResourceGroup};
use std::collections::VecDeque;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Instant;

/// Lifecycle of one resource group within a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupState {
    Pending,
    Fetching,
    Evaluating,
    Done,
}

/// Position of a group: (control index, group index)
type GroupKey = (usize, usize);

type StateTable = Arc<Mutex<Vec<Vec<GroupState>>>>;

pub struct ControlRunner {
    registry: Arc<FetcherRegistry>,
    clock: Arc<dyn Clock>,
    config: RunnerConfig,
}

impl ControlRunner {
    pub fn new(registry: Arc<FetcherRegistry>, config: RunnerConfig) -> Self {
        Self {
            registry,
            clock: Arc::new(SystemClock),
            config,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Run one control
    pub fn run(&self, control: &Control) -> ControlResult {
        self.run_all(std::slice::from_ref(control))
            .into_iter()
            .next()
            .unwrap_or_else(|| ControlResult::new(0, control, Vec::new()))
    }

    /// Run a profile and aggregate the results under the configured policy
    pub fn run_profile(&self, profile: &Profile) -> Report {
        let metadata = RunMetadata::start(&profile.name);
        let results = self.run_all(&profile.controls);
        let report = aggregate_run(metadata.finish(), results, &self.config.aggregation_policy());

        isc_profile::log_success!(codes::success::RUN_COMPLETED, "Run completed",
            "profile" => profile.name,
            "run_id" => report.metadata.run_id,
            "passed" => report.passed,
            "controls_failed" => report.totals.controls_failed,
            "duration_ms" => report.metadata.duration_ms
        );
        report
    }

    /// Run controls concurrently; results come back in declaration order
    pub fn run_all(&self, controls: &[Control]) -> Vec<ControlResult> {
        let controls: Arc<Vec<Control>> = Arc::new(controls.to_vec());
        let jobs: VecDeque<GroupKey> = controls
            .iter()
            .enumerate()
            .flat_map(|(c, control)| (0..control.groups.len()).map(move |g| (c, g)))
            .collect();
        let total = jobs.len();

        let states: StateTable = Arc::new(Mutex::new(
            controls
                .iter()
                .map(|c| vec![GroupState::Pending; c.groups.len()])
                .collect(),
        ));
        let queue = Arc::new(Mutex::new(jobs));
        let (tx, rx) = mpsc::channel::<(GroupKey, GroupResult)>();
        let deadline = self.config.timeout.map(|t| Instant::now() + t);

        let worker_count = self.config.max_threads.max(1).min(total);
        isc_profile::log_debug!("Dispatching resource groups",
            "groups" => total,
            "workers" => worker_count
        );

        let make_worker = || Worker {
            registry: Arc::clone(&self.registry),
            clock: Arc::clone(&self.clock),
            controls: Arc::clone(&controls),
            queue: Arc::clone(&queue),
            states: Arc::clone(&states),
            results: tx.clone(),
            deadline,
        };

        let mut handles = Vec::with_capacity(worker_count);
        for worker_id in 0..worker_count {
            let worker = make_worker();
            match thread::Builder::new()
                .name(format!("isc-worker-{}", worker_id))
                .spawn(move || worker.run())
            {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    isc_profile::log_error!(codes::system::INTERNAL_ERROR, "Failed to spawn worker",
                        "worker" => worker_id,
                        "error" => e
                    );
                }
            }
        }

        // Without any worker thread, serve the queue on the calling thread.
        // The deadline is then only checked between groups.
        if handles.is_empty() && total > 0 {
            isc_profile::log_warning!("No worker threads available, running groups inline",
                "groups" => total
            );
            make_worker().run();
        }
        drop(tx);

        let mut slots: Vec<Vec<Option<GroupResult>>> = controls
            .iter()
            .map(|c| vec![None; c.groups.len()])
            .collect();
        let mut received = 0;
        let mut timed_out = false;

        while received < total {
            let message = match deadline {
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    rx.recv_timeout(remaining)
                }
                None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
            };
            match message {
                Ok(((c, g), result)) => {
                    slots[c][g] = Some(result);
                    received += 1;
                }
                Err(RecvTimeoutError::Timeout) => {
                    timed_out = true;
                    break;
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        if received < total {
            if let Ok(mut pending) = queue.lock() {
                pending.clear();
            }
            let snapshot = states.lock().map(|s| s.clone()).unwrap_or_default();
            for (c, control) in controls.iter().enumerate() {
                for (g, group) in control.groups.iter().enumerate() {
                    if slots[c][g].is_some() {
                        continue;
                    }
                    let state = snapshot
                        .get(c)
                        .and_then(|s| s.get(g))
                        .copied()
                        .unwrap_or(GroupState::Pending);
                    let reason = if timed_out {
                        isc_profile::log_error!(codes::runner::RUN_TIMEOUT, "Resource group timed out",
                            "control" => control.name,
                            "group" => group.label,
                            "state" => format!("{:?}", state)
                        );
                        "timeout".to_string()
                    } else {
                        isc_profile::log_error!(codes::system::INTERNAL_ERROR, "Resource group lost",
                            "control" => control.name,
                            "group" => group.label,
                            "state" => format!("{:?}", state)
                        );
                        "worker terminated unexpectedly".to_string()
                    };
                    let outcome = if timed_out {
                        GroupOutcome::TimedOut
                    } else {
                        GroupOutcome::FetchFailed
                    };
                    slots[c][g] = Some(failed_group(group, outcome, &reason, 0));
                }
            }
        } else {
            for handle in handles {
                let _ = handle.join();
            }
        }

        controls
            .iter()
            .zip(slots)
            .enumerate()
            .map(|(index, (control, groups))| {
                let groups: Vec<GroupResult> = groups.into_iter().flatten().collect();
                let result = ControlResult::new(index, control, groups);
                if result.passed {
                    isc_profile::log_success!(codes::success::CONTROL_PASSED, "Control passed",
                        "control" => result.name
                    );
                } else {
                    isc_profile::log_warning!("Control failed",
                        "control" => result.name,
                        "impact" => result.impact,
                        "failures" => result.failures.len()
                    );
                }
                result
            })
            .collect()
    }
}

/// One worker's view of the shared run state
struct Worker {
    registry: Arc<FetcherRegistry>,
    clock: Arc<dyn Clock>,
    controls: Arc<Vec<Control>>,
    queue: Arc<Mutex<VecDeque<GroupKey>>>,
    states: StateTable,
    results: mpsc::Sender<(GroupKey, GroupResult)>,
    deadline: Option<Instant>,
}

impl Worker {
    fn run(self) {
        loop {
            if self.deadline.is_some_and(|d| Instant::now() >= d) {
                break;
            }
            let next = match self.queue.lock() {
                Ok(mut queue) => queue.pop_front(),
                Err(_) => None,
            };
            let Some(key) = next else { break };
            let Some(group) = self.controls.get(key.0).and_then(|c| c.groups.get(key.1)) else {
                continue;
            };

            let result = self.process(key, group);
            self.set_state(key, GroupState::Done);
            if self.results.send((key, result)).is_err() {
                // Receiver gone after the deadline; nothing left to report to
                break;
            }
        }
    }

    fn set_state(&self, (c, g): GroupKey, state: GroupState) {
        if let Ok(mut states) = self.states.lock() {
            if let Some(slot) = states.get_mut(c).and_then(|s| s.get_mut(g)) {
                *slot = state;
            }
        }
    }

    fn process(&self, key: GroupKey, group: &ResourceGroup) -> GroupResult {
        let started = Instant::now();
        self.set_state(key, GroupState::Fetching);

        let fetched = match &group.descriptor {
            Ok(descriptor) => self.registry.fetch(descriptor),
            Err(e) => Err(FetchError::InvalidLocator(e.clone())),
        };

        let snapshot = match fetched {
            Ok(snapshot) => snapshot,
            Err(e) => {
                let code = match &e {
                    FetchError::InvalidLocator(_) => codes::fetch::INVALID_LOCATOR,
                    FetchError::Timeout { .. } => codes::fetch::FETCH_TIMEOUT,
                    FetchError::UnsupportedType { .. } => codes::fetch::UNSUPPORTED_TYPE,
                    FetchError::Provider { .. } | FetchError::Parse { .. } => {
                        codes::fetch::PROVIDER_FAILURE
                    }
                };
                isc_profile::log_error!(code, "Resource fetch failed",
                    "group" => group.label,
                    "error" => e
                );
                let outcome = if e.is_invalid_locator() {
                    GroupOutcome::InvalidLocator
                } else {
                    GroupOutcome::FetchFailed
                };
                return failed_group(group, outcome, &e.verdict_reason(), elapsed_ms(started));
            }
        };

        self.set_state(key, GroupState::Evaluating);
        let verdicts: Vec<Verdict> = group
            .expectations
            .iter()
            .map(|expectation| {
                let verdict = evaluate(&snapshot, expectation, self.clock.as_ref());
                if !verdict.passed {
                    isc_profile::log_debug!("Expectation failed",
                        "group" => group.label,
                        "message" => verdict.message
                    );
                }
                verdict
            })
            .collect();

        GroupResult {
            label: group.label.clone(),
            descriptor: group.descriptor.as_ref().ok().cloned(),
            outcome: GroupOutcome::Evaluated,
            exists: Some(snapshot.exists),
            verdicts,
            duration_ms: elapsed_ms(started),
        }
    }
}

/// Result for a group whose expectations could not be evaluated
fn failed_group(
    group: &ResourceGroup,
    outcome: GroupOutcome,
    reason: &str,
    duration_ms: u64,
) -> GroupResult {
    GroupResult {
        label: group.label.clone(),
        descriptor: group.descriptor.as_ref().ok().cloned(),
        outcome,
        exists: None,
        verdicts: group
            .expectations
            .iter()
            .map(|e| Verdict::fail(format!("{}: {}", e.summary(), reason)))
            .collect(),
        duration_ms,
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}
