use tracing::debug;

use crate::action::action_model::{Action, ParseResult};
use crate::pattern::normalize::normalize;
use crate::pattern::rules::{Rule, rules};

/// Deterministic instruction translator backed by the ordered rule library.
///
/// Pure and I/O-free: the same text always yields the same result.
#[derive(Debug, Default, Clone, Copy)]
pub struct PatternMatcher;

impl PatternMatcher {
    pub fn new() -> Self {
        Self
    }

    /// First rule that matches the normalized instruction, or `None`.
    pub fn match_instruction(&self, instruction: &str) -> Option<ParseResult> {
        let normalized = normalize(instruction);
        if normalized.is_empty() {
            return None;
        }
        let (rule, action) = first_match(&normalized)?;
        debug!(rule = rule.name, kind = action.kind(), "pattern matched");
        Some(ParseResult::from_pattern(action))
    }

    /// Name of the rule that would handle `instruction`.
    pub fn matching_rule(&self, instruction: &str) -> Option<&'static str> {
        first_match(&normalize(instruction)).map(|(rule, _)| rule.name)
    }
}

fn first_match(normalized: &str) -> Option<(&'static Rule, Action)> {
    let lowered = normalized.to_lowercase();
    rules()
        .iter()
        .filter(|rule| rule.triggered_by(&lowered))
        .find_map(|rule| rule.apply(normalized).map(|action| (rule, action)))
}
