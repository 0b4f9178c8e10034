use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::action::action_model::{Action, ParseSource};

// ============================================================================
// Step and case results
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepOutcome {
    Pass,
    /// An assertion did not hold, or a retryable action ran out of retries
    Fail,
    /// The step could not be carried out
    Error,
}

impl StepOutcome {
    pub fn label(self) -> &'static str {
        match self {
            StepOutcome::Pass => "PASS",
            StepOutcome::Fail => "FAIL",
            StepOutcome::Error => "ERROR",
        }
    }
}

/// Outcome of one executed step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    /// Position of the step within its case (0-based)
    pub index: usize,
    pub instruction: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub action: Action,
    /// Which translator produced the action
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<ParseSource>,
    pub outcome: StepOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot_path: Option<PathBuf>,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub retries_used: u32,
}

impl StepResult {
    pub fn passed(&self) -> bool {
        self.outcome == StepOutcome::Pass
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseOutcome {
    Passed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseResult {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub outcome: CaseOutcome,
    pub step_results: Vec<StepResult>,
    /// Set when the case never reached its first step
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub setup_error: Option<String>,
    /// Steps not run because of fail-fast or cancellation
    pub steps_skipped: usize,
    pub duration_ms: u64,
}

impl CaseResult {
    pub fn passed(&self) -> bool {
        self.outcome == CaseOutcome::Passed
    }

    pub fn failed_steps(&self) -> impl Iterator<Item = &StepResult> {
        self.step_results.iter().filter(|s| !s.passed())
    }

    /// One-line reason a failed case failed.
    pub fn failure_summary(&self) -> Option<String> {
        if self.passed() {
            return None;
        }
        if let Some(err) = &self.setup_error {
            return Some(format!("setup failed: {}", err));
        }
        self.failed_steps()
            .next()
            .map(|s| {
                format!(
                    "step {} ({}): {}",
                    s.index + 1,
                    s.instruction,
                    s.message.as_deref().unwrap_or(s.outcome.label())
                )
            })
            .or_else(|| Some("case did not complete".to_string()))
    }
}

// ============================================================================
// Suite and run aggregation
// ============================================================================

/// Results of every case in one suite.
///
/// Built from a `Vec<CaseResult>` via `from_cases()`. Consumed by the
/// console, HTML, JUnit and JSON writers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteResult {
    pub name: String,
    pub case_results: Vec<CaseResult>,
    pub pass_count: usize,
    pub fail_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl SuiteResult {
    pub fn from_cases(name: &str, case_results: Vec<CaseResult>) -> Self {
        let pass_count = case_results.iter().filter(|c| c.passed()).count();
        let fail_count = case_results.len() - pass_count;
        Self {
            name: name.to_string(),
            case_results,
            pass_count,
            fail_count,
            duration_ms: None,
        }
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    pub fn total(&self) -> usize {
        self.case_results.len()
    }

    pub fn all_passed(&self) -> bool {
        self.fail_count == 0
    }
}

/// Totals across every suite in a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub suite_results: Vec<SuiteResult>,
    pub pass_count: usize,
    pub fail_count: usize,
    /// "suite / case" for every failed case
    pub failing_cases: Vec<String>,
    pub duration_ms: u64,
    pub cancelled: bool,
}

/// Exit status when every case passed.
pub const EXIT_OK: i32 = 0;
/// Exit status when any case failed.
pub const EXIT_FAILED: i32 = 1;
/// Exit status when the run was cancelled or timed out.
pub const EXIT_CANCELLED: i32 = 130;

impl RunSummary {
    pub fn from_suites(suite_results: Vec<SuiteResult>, duration: Duration, cancelled: bool) -> Self {
        let pass_count = suite_results.iter().map(|s| s.pass_count).sum();
        let fail_count = suite_results.iter().map(|s| s.fail_count).sum();
        let failing_cases = suite_results
            .iter()
            .flat_map(|s| {
                s.case_results
                    .iter()
                    .filter(|c| !c.passed())
                    .map(move |c| format!("{} / {}", s.name, c.name))
            })
            .collect();
        Self {
            suite_results,
            pass_count,
            fail_count,
            failing_cases,
            duration_ms: duration.as_millis() as u64,
            cancelled,
        }
    }

    pub fn total(&self) -> usize {
        self.pass_count + self.fail_count
    }

    pub fn all_passed(&self) -> bool {
        self.fail_count == 0 && !self.cancelled
    }

    pub fn exit_code(&self) -> i32 {
        if self.cancelled {
            EXIT_CANCELLED
        } else if self.fail_count > 0 {
            EXIT_FAILED
        } else {
            EXIT_OK
        }
    }
}

/// Collects case results from concurrent workers.
///
/// Appends are serialized behind a mutex; results are reordered by case
/// index when a suite is finished, so reports follow source order.
#[derive(Debug, Default)]
pub struct RunAggregator {
    pending: Mutex<Vec<(usize, CaseResult)>>,
    suites: Mutex<Vec<SuiteResult>>,
}

impl RunAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_case(&self, case_index: usize, result: CaseResult) {
        match self.pending.lock() {
            Ok(mut pending) => pending.push((case_index, result)),
            Err(poisoned) => poisoned.into_inner().push((case_index, result)),
        }
    }

    /// Close the current suite, moving its recorded cases into a SuiteResult.
    pub fn finish_suite(&self, name: &str, duration: Duration) -> SuiteResult {
        let mut cases = match self.pending.lock() {
            Ok(mut pending) => std::mem::take(&mut *pending),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        };
        cases.sort_by_key(|(i, _)| *i);
        let suite = SuiteResult::from_cases(name, cases.into_iter().map(|(_, c)| c).collect())
            .with_duration(duration.as_millis() as u64);
        match self.suites.lock() {
            Ok(mut suites) => suites.push(suite.clone()),
            Err(poisoned) => poisoned.into_inner().push(suite.clone()),
        }
        suite
    }

    pub fn into_summary(self, duration: Duration, cancelled: bool) -> RunSummary {
        let suites = match self.suites.into_inner() {
            Ok(s) => s,
            Err(poisoned) => poisoned.into_inner(),
        };
        RunSummary::from_suites(suites, duration, cancelled)
    }
}
