use serde::{Deserialize, Serialize};

use crate::report::report_model::{StepOutcome, StepResult};

/// Lifecycle of one test case during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseState {
    Pending,
    Running,
    Passed,
    Failed,
}

/// Tracks the execution state and results of a running test case.
///
/// Results are append-only and kept in step order.
#[derive(Debug, Clone)]
pub struct CaseContext {
    state: CaseState,
    current_step: usize,
    results: Vec<StepResult>,
    setup_error: Option<String>,
}

impl CaseContext {
    pub fn new() -> Self {
        CaseContext {
            state: CaseState::Pending,
            current_step: 0,
            results: Vec::new(),
            setup_error: None,
        }
    }

    pub fn state(&self) -> CaseState {
        self.state
    }

    pub fn current_step(&self) -> usize {
        self.current_step
    }

    /// Pending -> Running. Later calls are no-ops.
    pub fn start(&mut self) {
        if self.state == CaseState::Pending {
            self.state = CaseState::Running;
        }
    }

    /// Record the next step's result and advance.
    ///
    /// A failed or errored step moves the case to `Failed` for good.
    pub fn record(&mut self, result: StepResult) {
        self.start();
        if result.outcome != StepOutcome::Pass {
            self.state = CaseState::Failed;
        }
        self.results.push(result);
        self.current_step += 1;
    }

    /// The case could not be set up; no steps will be recorded.
    pub fn fail_setup(&mut self, message: impl Into<String>) {
        self.setup_error = Some(message.into());
        self.state = CaseState::Failed;
    }

    /// Close the case. A running case that never failed passes.
    pub fn finish(&mut self) -> CaseState {
        if self.state != CaseState::Failed {
            self.state = CaseState::Passed;
        }
        self.state
    }

    pub fn results(&self) -> &[StepResult] {
        &self.results
    }

    pub fn setup_error(&self) -> Option<&str> {
        self.setup_error.as_deref()
    }

    pub fn into_parts(self) -> (Vec<StepResult>, Option<String>) {
        (self.results, self.setup_error)
    }
}

impl Default for CaseContext {
    fn default() -> Self {
        Self::new()
    }
}
