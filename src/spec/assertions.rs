use serde::{Deserialize, Serialize};

use crate::action::action_model::{Action, ElementState};
use crate::browser::driver::BrowserDriver;
use crate::browser::error::DriverError;

/// Verdict of one assertion against the live page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssertionOutcome {
    pub passed: bool,
    pub expected: String,
    pub observed: String,
}

impl AssertionOutcome {
    fn new(passed: bool, expected: impl Into<String>, observed: impl Into<String>) -> Self {
        Self {
            passed,
            expected: expected.into(),
            observed: observed.into(),
        }
    }

    /// Expected-vs-observed text for a failed check.
    pub fn message(&self) -> Option<String> {
        if self.passed {
            None
        } else {
            Some(format!("expected {}, observed {}", self.expected, self.observed))
        }
    }
}

/// Evaluate an assertion action against driver-reported page state.
///
/// A driver failure while observing is returned as `Err` and must be
/// reported as an error, not as a failed assertion.
pub fn evaluate(action: &Action, driver: &mut dyn BrowserDriver) -> Result<AssertionOutcome, DriverError> {
    match action {
        Action::AssertTextVisible { text, negate } => {
            let present = driver.query_text_present(text)?;
            let expected = if *negate {
                format!("text '{}' to be absent", text)
            } else {
                format!("text '{}' to be visible", text)
            };
            let observed = if present { "it on the page" } else { "no such text on the page" };
            Ok(AssertionOutcome::new(present != *negate, expected, observed))
        }

        Action::AssertUrl { mode, value } => {
            let url = driver.get_url()?;
            Ok(AssertionOutcome::new(
                mode.matches(&url, value),
                format!("URL to {} '{}'", mode.describe(), value),
                format!("'{}'", url),
            ))
        }

        Action::AssertTitle { mode, value } => {
            let title = driver.get_title()?;
            Ok(AssertionOutcome::new(
                mode.matches(&title, value),
                format!("title to {} '{}'", mode.describe(), value),
                format!("'{}'", title),
            ))
        }

        Action::AssertElement { target_desc, state } => {
            let status = driver.query_element_state(target_desc)?;
            let (positive, invert) = state.as_positive();
            let holds = match positive {
                ElementState::Visible => status.visible,
                _ => status.exists,
            };
            let observed = match (status.exists, status.visible) {
                (false, _) => "no such element",
                (true, false) => "element present but hidden",
                (true, true) => "element visible",
            };
            Ok(AssertionOutcome::new(
                holds != invert,
                format!("element '{}' to be {}", target_desc, state.describe()),
                observed,
            ))
        }

        Action::AssertFormValue { target_desc, value } => {
            let actual = driver.get_input_value(target_desc)?;
            Ok(AssertionOutcome::new(
                actual == *value,
                format!("'{}' to have value '{}'", target_desc, value),
                format!("'{}'", actual),
            ))
        }

        Action::AssertCheckbox {
            target_desc,
            checked,
        } => {
            let actual = driver.get_checkbox_state(target_desc)?;
            let word = |c: bool| if c { "checked" } else { "unchecked" };
            Ok(AssertionOutcome::new(
                actual == *checked,
                format!("'{}' to be {}", target_desc, word(*checked)),
                word(actual),
            ))
        }

        other => Err(DriverError::Protocol {
            command: other.kind().to_string(),
            error: "not an assertion".into(),
        }),
    }
}
