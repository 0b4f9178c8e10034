use std::time::Duration;

use tracing::{debug, warn};

use crate::action::action_model::{Action, ParseResult, ParseSource};
use crate::action::schema::ActionSchema;
use crate::agent::extractor::SemanticExtractor;
use crate::pattern::matcher::PatternMatcher;
use crate::spec::spec_model::Step;

pub const DEFAULT_EXTRACTION_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_MIN_CONFIDENCE: f32 = 0.5;

/// Turns instructions into actions: rules first, extractor second.
pub struct InstructionCompiler {
    matcher: PatternMatcher,
    extractor: Option<Box<dyn SemanticExtractor>>,
    schema: ActionSchema,
    timeout: Duration,
    min_confidence: f32,
}

impl Default for InstructionCompiler {
    fn default() -> Self {
        Self::rules_only()
    }
}

impl InstructionCompiler {
    /// Compiler with no extractor: unmatched text becomes `Unknown`.
    pub fn rules_only() -> Self {
        Self {
            matcher: PatternMatcher::new(),
            extractor: None,
            schema: ActionSchema::standard(),
            timeout: DEFAULT_EXTRACTION_TIMEOUT,
            min_confidence: DEFAULT_MIN_CONFIDENCE,
        }
    }

    pub fn with_extractor(extractor: Box<dyn SemanticExtractor>) -> Self {
        Self {
            extractor: Some(extractor),
            ..Self::rules_only()
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn min_confidence(mut self, min_confidence: f32) -> Self {
        self.min_confidence = min_confidence.clamp(0.0, 1.0);
        self
    }

    pub fn has_extractor(&self) -> bool {
        self.extractor.is_some()
    }

    /// Translate one instruction, keeping where the action came from.
    pub fn parse(&self, instruction: &str) -> ParseResult {
        let instruction = instruction.trim();
        if instruction.is_empty() {
            return ParseResult {
                action: Action::unknown(instruction, "empty instruction"),
                source: ParseSource::Pattern,
                confidence: 0.0,
            };
        }

        if let Some(result) = self.matcher.match_instruction(instruction) {
            return result;
        }

        let Some(extractor) = self.extractor.as_ref() else {
            debug!(instruction, "no rule matched and no extractor configured");
            return ParseResult {
                action: Action::unknown(instruction, "no rule matched the instruction"),
                source: ParseSource::Pattern,
                confidence: 0.0,
            };
        };

        match extractor.extract(instruction, &self.schema, self.timeout) {
            Ok(result) if result.action.is_unknown() => result,
            Ok(result) if result.confidence < self.min_confidence => {
                debug!(
                    instruction,
                    confidence = result.confidence,
                    min = self.min_confidence,
                    "extractor answer below confidence floor"
                );
                ParseResult::from_llm(
                    Action::unknown(
                        instruction,
                        format!(
                            "extractor confidence {:.2} below {:.2} for {}",
                            result.confidence,
                            self.min_confidence,
                            result.action.kind()
                        ),
                    ),
                    result.confidence,
                )
            }
            Ok(result) => result,
            Err(e) => {
                warn!(instruction, error = %e, "semantic extraction failed");
                ParseResult::from_llm(Action::unknown(instruction, e.to_string()), 0.0)
            }
        }
    }

    /// Translate a step into exactly one action.
    pub fn compile(&self, step: &Step) -> Action {
        self.parse(&step.instruction).action
    }
}
