use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::action::action_model::ParseSource;
use crate::report::report_model::{StepOutcome, StepResult};

/// One line of the JSONL trace: an executed step.
#[derive(Debug, Serialize)]
pub struct TraceEvent {
    pub timestamp: DateTime<Utc>,
    pub suite: String,
    pub case: String,
    pub step: usize,
    pub instruction: String,

    pub action: Option<String>,
    pub source: Option<ParseSource>,
    pub confidence: Option<f32>,

    pub outcome: Option<StepOutcome>,
    pub retries_used: u32,
    pub duration_ms: u64,
    pub message: Option<String>,
}

impl TraceEvent {
    pub fn now(suite: &str, case: &str, step: usize, instruction: &str) -> Self {
        Self {
            timestamp: Utc::now(),
            suite: suite.to_string(),
            case: case.to_string(),
            step,
            instruction: instruction.to_string(),
            action: None,
            source: None,
            confidence: None,
            outcome: None,
            retries_used: 0,
            duration_ms: 0,
            message: None,
        }
    }

    pub fn with_parse(mut self, source: ParseSource, confidence: f32) -> Self {
        self.source = Some(source);
        self.confidence = Some(confidence);
        self
    }

    pub fn with_result(mut self, result: &StepResult) -> Self {
        self.action = Some(result.action.kind().to_string());
        self.outcome = Some(result.outcome);
        self.retries_used = result.retries_used;
        self.duration_ms = result.duration_ms;
        self.message = result.message.clone();
        self
    }
}
