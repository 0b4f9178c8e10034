use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::action::action_model::{Action, WaitFor};
use crate::browser::driver::{BrowserDriver, DriverFactory};
use crate::browser::error::DriverError;
use crate::compile::compiler::InstructionCompiler;
use crate::report::report_model::{
    CaseOutcome, CaseResult, RunAggregator, RunSummary, StepOutcome, StepResult, SuiteResult,
};
use crate::spec::assertions;
use crate::spec::cancel::CancelToken;
use crate::spec::context::{CaseContext, CaseState};
use crate::spec::spec_model::{Step, Suite, TestCase};
use crate::trace::logger::TraceLogger;
use crate::trace::trace::TraceEvent;

/// What a case does after its first failed step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Stop the case at the first failed step
    #[default]
    FailFast,
    /// Run every step; the case fails if any step failed
    Robust,
}

/// Bounded retry with linear backoff for transient driver failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub retry_count: u32,
    pub backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retry_count: 3,
            backoff_ms: 250,
        }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            retry_count: 0,
            backoff_ms: 0,
        }
    }

    /// Delay before retry number `retry` (1-based).
    pub fn backoff(&self, retry: u32) -> Duration {
        Duration::from_millis(self.backoff_ms.saturating_mul(retry as u64))
    }
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub failure_policy: FailurePolicy,
    pub retry: RetryPolicy,
    pub screenshot_on_failure: bool,
    /// Cases run concurrently, each on its own session
    pub workers: usize,
    /// Upper bound for a wait-until step
    pub wait_timeout_ms: u64,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            failure_policy: FailurePolicy::FailFast,
            retry: RetryPolicy::default(),
            screenshot_on_failure: true,
            workers: 1,
            wait_timeout_ms: 30_000,
        }
    }
}

/// Failures that abort the whole run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("could not start a browser session for '{case}': {source}")]
    SessionStart {
        case: String,
        #[source]
        source: DriverError,
    },
}

/// Longest single driver wait, so cancellation is seen between calls.
const WAIT_SLICE: Duration = Duration::from_secs(1);

/// A driver action that either ran or was cut short by cancellation.
enum Performed {
    Done(Option<PathBuf>),
    Cancelled,
}

/// Result of performing a non-assertion action, retries included.
enum Attempt {
    Succeeded(Option<PathBuf>),
    Failed(DriverError),
    Cancelled,
}

/// Executes suites step by step against browser drivers.
pub struct TestRunner<'a> {
    compiler: &'a InstructionCompiler,
    options: RunOptions,
    cancel: CancelToken,
    /// Set once any case actually stopped early because of `cancel`
    cut_short: AtomicBool,
    trace: Option<&'a TraceLogger>,
}

impl<'a> TestRunner<'a> {
    pub fn new(compiler: &'a InstructionCompiler, options: RunOptions) -> Self {
        Self {
            compiler,
            options,
            cancel: CancelToken::new(),
            cut_short: AtomicBool::new(false),
            trace: None,
        }
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_trace(mut self, trace: &'a TraceLogger) -> Self {
        self.trace = Some(trace);
        self
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    // ========================================================================
    // Run / suite level
    // ========================================================================

    /// Run every suite in order and roll the results up.
    pub fn run_all(&self, suites: &[Suite], factory: &dyn DriverFactory) -> Result<RunSummary, RunError> {
        let started = Instant::now();
        let aggregator = RunAggregator::new();
        for suite in suites {
            self.run_suite(suite, factory, &aggregator)?;
        }
        Ok(aggregator.into_summary(started.elapsed(), self.was_cut_short()))
    }

    /// Whether cancellation stopped any step or case. A deadline that
    /// passes after the last step does not count.
    pub fn was_cut_short(&self) -> bool {
        self.cut_short.load(Ordering::SeqCst)
    }

    fn note_cancelled(&self) {
        self.cut_short.store(true, Ordering::SeqCst);
    }

    /// Run one suite's cases on up to `workers` concurrent sessions.
    ///
    /// A session that cannot be started aborts the suite: in-flight cases
    /// finish, no new case starts and the error is returned.
    pub fn run_suite(
        &self,
        suite: &Suite,
        factory: &dyn DriverFactory,
        aggregator: &RunAggregator,
    ) -> Result<SuiteResult, RunError> {
        let started = Instant::now();
        let workers = self.options.workers.max(1).min(suite.test_cases.len().max(1));
        info!(suite = %suite.name, cases = suite.test_cases.len(), workers, "running suite");

        let next = AtomicUsize::new(0);
        let abort = AtomicBool::new(false);
        let fatal: Mutex<Option<RunError>> = Mutex::new(None);

        std::thread::scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|| {
                    loop {
                        if abort.load(Ordering::SeqCst) {
                            break;
                        }
                        let index = next.fetch_add(1, Ordering::SeqCst);
                        let Some(case) = suite.test_cases.get(index) else {
                            break;
                        };
                        match self.run_case_in_session(suite, case, factory) {
                            Ok(result) => aggregator.record_case(index, result),
                            Err(e) => {
                                abort.store(true, Ordering::SeqCst);
                                if let Ok(mut slot) = fatal.lock() {
                                    slot.get_or_insert(e);
                                }
                                break;
                            }
                        }
                    }
                });
            }
        });

        let fatal = match fatal.into_inner() {
            Ok(f) => f,
            Err(poisoned) => poisoned.into_inner(),
        };
        let result = aggregator.finish_suite(&suite.name, started.elapsed());
        if let Some(e) = fatal {
            return Err(e);
        }
        info!(
            suite = %suite.name,
            passed = result.pass_count,
            failed = result.fail_count,
            "suite finished"
        );
        Ok(result)
    }

    /// Open a fresh session for `case`, run it, and close the session.
    pub fn run_case_in_session(
        &self,
        suite: &Suite,
        case: &TestCase,
        factory: &dyn DriverFactory,
    ) -> Result<CaseResult, RunError> {
        if self.cancel.is_cancelled() {
            self.note_cancelled();
            return Ok(Self::not_started(case, "cancelled before start"));
        }

        let mut driver = factory.open(&case.name).map_err(|e| RunError::SessionStart {
            case: case.name.clone(),
            source: e,
        })?;

        let result = self.run_case(suite, case, driver.as_mut());

        if let Err(e) = driver.close() {
            warn!(case = %case.name, error = %e, "failed to close browser session");
        }
        Ok(result)
    }

    fn not_started(case: &TestCase, reason: &str) -> CaseResult {
        CaseResult {
            name: case.name.clone(),
            description: case.description.clone(),
            outcome: CaseOutcome::Failed,
            step_results: Vec::new(),
            setup_error: Some(reason.to_string()),
            steps_skipped: case.steps.len(),
            duration_ms: 0,
        }
    }

    // ========================================================================
    // Case level
    // ========================================================================

    /// Run one case against an already-open driver.
    pub fn run_case(&self, suite: &Suite, case: &TestCase, driver: &mut dyn BrowserDriver) -> CaseResult {
        let started = Instant::now();
        let mut ctx = CaseContext::new();
        ctx.start();
        info!(suite = %suite.name, case = %case.name, steps = case.steps.len(), "case started");

        let mut steps_skipped = 0;

        if let Some(base) = &suite.base_url {
            let setup = Action::Navigate { url: base.clone() };
            match self.perform_with_retry(suite, &setup, driver) {
                (Attempt::Succeeded(_), _) => {}
                (Attempt::Failed(e), _) => {
                    warn!(case = %case.name, base_url = %base, error = %e, "case setup failed");
                    ctx.fail_setup(format!("navigate to {}: {}", base, e));
                    steps_skipped = case.steps.len();
                }
                (Attempt::Cancelled, _) => {
                    self.note_cancelled();
                    ctx.fail_setup("cancelled during setup");
                    steps_skipped = case.steps.len();
                }
            }
        }

        if ctx.setup_error().is_none() {
            for (index, step) in case.steps.iter().enumerate() {
                if self.cancel.is_cancelled() {
                    self.note_cancelled();
                    info!(case = %case.name, step = index, "cancelled; skipping remaining steps");
                    steps_skipped = case.steps.len() - index;
                    break;
                }

                let result = self.run_step(suite, case, index, step, driver);
                let failed = !result.passed();
                ctx.record(result);

                if failed && self.options.failure_policy == FailurePolicy::FailFast {
                    steps_skipped = case.steps.len() - index - 1;
                    if steps_skipped > 0 {
                        debug!(case = %case.name, skipped = steps_skipped, "fail-fast stop");
                    }
                    break;
                }
            }
        }

        let state = ctx.finish();
        let outcome = if state == CaseState::Passed && steps_skipped == 0 {
            CaseOutcome::Passed
        } else {
            CaseOutcome::Failed
        };
        let (step_results, setup_error) = ctx.into_parts();

        info!(case = %case.name, outcome = ?outcome, "case finished");

        CaseResult {
            name: case.name.clone(),
            description: case.description.clone(),
            outcome,
            step_results,
            setup_error,
            steps_skipped,
            duration_ms: started.elapsed().as_millis() as u64,
        }
    }

    // ========================================================================
    // Step level
    // ========================================================================

    /// Compile and execute one step, with retries, failure screenshot and
    /// trace, against an open driver.
    pub fn run_step(
        &self,
        suite: &Suite,
        case: &TestCase,
        index: usize,
        step: &Step,
        driver: &mut dyn BrowserDriver,
    ) -> StepResult {
        let started_at = Utc::now();
        let clock = Instant::now();
        let parsed = self.compiler.parse(&step.instruction);
        debug!(
            step = index,
            instruction = %step.instruction,
            action = %parsed.action.summary(),
            source = ?parsed.source,
            "step compiled"
        );

        let mut outcome = StepOutcome::Pass;
        let mut message = None;
        let mut screenshot_path = None;
        let mut retries_used = 0;

        match &parsed.action {
            Action::Unknown { reason, .. } => {
                outcome = StepOutcome::Error;
                message = Some(format!("could not interpret '{}': {}", step.instruction, reason));
            }

            action if action.is_assertion() => {
                // Let the page settle; a failure here is not the assertion's
                if let Err(e) = driver.wait(&WaitFor::PageLoad) {
                    debug!(error = %e, "stability wait failed; evaluating anyway");
                }
                match assertions::evaluate(action, driver) {
                    Ok(verdict) if verdict.passed => {}
                    Ok(verdict) => {
                        outcome = StepOutcome::Fail;
                        message = verdict
                            .message()
                            .map(|m| format!("'{}': {}", step.instruction, m));
                    }
                    Err(e) => {
                        outcome = StepOutcome::Error;
                        message = Some(format!("'{}': could not observe page: {}", step.instruction, e));
                    }
                }
            }

            action => {
                let (attempt, retries) = self.perform_with_retry(suite, action, driver);
                retries_used = retries;
                match attempt {
                    Attempt::Succeeded(path) => screenshot_path = path,
                    Attempt::Failed(e) => {
                        // A transient failure that outlived its retries is a
                        // failed step; anything else could not be carried out.
                        outcome = if action.is_retryable() && e.is_retryable() {
                            StepOutcome::Fail
                        } else {
                            StepOutcome::Error
                        };
                        message = Some(if retries > 0 {
                            format!("'{}' failed after {} retries: {}", step.instruction, retries, e)
                        } else {
                            format!("'{}' failed: {}", step.instruction, e)
                        });
                    }
                    Attempt::Cancelled => {
                        self.note_cancelled();
                        outcome = StepOutcome::Error;
                        message = Some(format!("'{}' cancelled", step.instruction));
                    }
                }
            }
        }

        if outcome != StepOutcome::Pass && !parsed.action.is_unknown() && self.options.screenshot_on_failure {
            match driver.screenshot() {
                Ok(path) => {
                    debug!(path = %path.display(), "failure screenshot captured");
                    screenshot_path = Some(path);
                }
                // Never let the capture hide the step's own failure
                Err(e) => warn!(step = index, error = %e, "failure screenshot not captured"),
            }
        }

        let result = StepResult {
            index,
            instruction: step.instruction.clone(),
            description: step.description.clone(),
            action: parsed.action.clone(),
            source: Some(parsed.source),
            outcome,
            message,
            screenshot_path,
            started_at,
            duration_ms: clock.elapsed().as_millis() as u64,
            retries_used,
        };

        match result.outcome {
            StepOutcome::Pass => debug!(step = index, "step passed"),
            _ => info!(
                step = index,
                outcome = result.outcome.label(),
                message = result.message.as_deref().unwrap_or(""),
                "step did not pass"
            ),
        }

        if let Some(trace) = self.trace {
            trace.log(
                &TraceEvent::now(&suite.name, &case.name, index, &step.instruction)
                    .with_parse(parsed.source, parsed.confidence)
                    .with_result(&result),
            );
        }

        result
    }

    /// Perform a non-assertion action, retrying transient failures.
    fn perform_with_retry(&self, suite: &Suite, action: &Action, driver: &mut dyn BrowserDriver) -> (Attempt, u32) {
        let mut retries_used = 0;
        loop {
            match self.perform(suite, action, driver) {
                Ok(Performed::Done(path)) => return (Attempt::Succeeded(path), retries_used),
                Ok(Performed::Cancelled) => return (Attempt::Cancelled, retries_used),
                Err(e) => {
                    let may_retry = action.is_retryable()
                        && e.is_retryable()
                        && retries_used < self.options.retry.retry_count;
                    if !may_retry {
                        return (Attempt::Failed(e), retries_used);
                    }
                    retries_used += 1;
                    info!(action = action.kind(), retry = retries_used, error = %e, "retrying");
                    if !self.cancel.sleep(self.options.retry.backoff(retries_used)) {
                        return (Attempt::Cancelled, retries_used);
                    }
                }
            }
        }
    }

    fn perform(&self, suite: &Suite, action: &Action, driver: &mut dyn BrowserDriver) -> Result<Performed, DriverError> {
        match action {
            Action::Navigate { url } => driver.navigate(&suite.resolve_url(url)).map(|_| Performed::Done(None)),
            Action::Click { target_desc } => driver.click(target_desc).map(|_| Performed::Done(None)),
            Action::Fill { target_desc, value } => driver.fill(target_desc, value).map(|_| Performed::Done(None)),
            Action::Wait { condition } => self.wait(condition, driver),
            Action::Screenshot => driver.screenshot().map(|p| Performed::Done(Some(p))),
            other => Err(DriverError::Protocol {
                command: other.kind().to_string(),
                error: "not a driver action".into(),
            }),
        }
    }

    /// Fixed durations are slept here so a cancel cuts them short. Wait-until
    /// conditions go to the driver in slices of at most `WAIT_SLICE`, with
    /// the token checked between slices.
    fn wait(&self, condition: &WaitFor, driver: &mut dyn BrowserDriver) -> Result<Performed, DriverError> {
        if let WaitFor::Duration { ms } = condition {
            return Ok(if self.cancel.sleep(Duration::from_millis(*ms)) {
                Performed::Done(None)
            } else {
                Performed::Cancelled
            });
        }

        let deadline = Instant::now() + Duration::from_millis(self.options.wait_timeout_ms);
        loop {
            if self.cancel.is_cancelled() {
                return Ok(Performed::Cancelled);
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            match driver.wait_up_to(condition, remaining.min(WAIT_SLICE)) {
                Ok(()) => return Ok(Performed::Done(None)),
                Err(DriverError::Timeout { .. }) if remaining > WAIT_SLICE => {
                    debug!(condition = ?condition, "still waiting");
                }
                Err(e) => return Err(e),
            }
        }
    }
}
