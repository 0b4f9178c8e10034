use serde::{Deserialize, Serialize};

/// Canonical representation of one browser action or assertion.
///
/// Every instruction compiles to exactly one `Action`. Adding a variant means
/// updating the rule library, the extractor schema, the runner dispatch and
/// the assertion evaluator together.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Action {
    /// Load a URL (absolute, or relative to the suite's base URL)
    Navigate { url: String },

    /// Click the element the driver resolves from the descriptor
    Click { target_desc: String },

    /// Type a value into the element the driver resolves from the descriptor
    Fill { target_desc: String, value: String },

    /// Sleep for a fixed time or until a page condition holds
    Wait { condition: WaitFor },

    /// Capture the current page to a file
    Screenshot,

    AssertTextVisible { text: String, negate: bool },

    AssertUrl { mode: UrlMatch, value: String },

    AssertTitle { mode: TitleMatch, value: String },

    AssertElement {
        target_desc: String,
        state: ElementState,
    },

    AssertFormValue { target_desc: String, value: String },

    AssertCheckbox { target_desc: String, checked: bool },

    /// Nothing could interpret the instruction. Never reaches the driver.
    Unknown {
        raw_instruction: String,
        reason: String,
    },
}

/// What a `Wait` action waits for.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WaitFor {
    Duration { ms: u64 },
    PageLoad,
    TextVisible { text: String },
    ElementVisible { target_desc: String },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UrlMatch {
    Contains,
    Starts,
    Ends,
    Equals,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TitleMatch {
    Contains,
    Equals,
}

/// Expected element state. `Hidden` negates `Visible`, `Absent` negates `Exists`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ElementState {
    Exists,
    Absent,
    Visible,
    Hidden,
}

impl ElementState {
    /// The positive check this state is evaluated through, and whether to invert it.
    pub fn as_positive(self) -> (ElementState, bool) {
        match self {
            ElementState::Exists => (ElementState::Exists, false),
            ElementState::Absent => (ElementState::Exists, true),
            ElementState::Visible => (ElementState::Visible, false),
            ElementState::Hidden => (ElementState::Visible, true),
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            ElementState::Exists => "present",
            ElementState::Absent => "absent",
            ElementState::Visible => "visible",
            ElementState::Hidden => "hidden",
        }
    }
}

impl UrlMatch {
    pub fn matches(self, observed: &str, expected: &str) -> bool {
        match self {
            UrlMatch::Contains => observed.contains(expected),
            UrlMatch::Starts => observed.starts_with(expected),
            UrlMatch::Ends => observed.ends_with(expected),
            UrlMatch::Equals => observed.trim_end_matches('/') == expected.trim_end_matches('/'),
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            UrlMatch::Contains => "contain",
            UrlMatch::Starts => "start with",
            UrlMatch::Ends => "end with",
            UrlMatch::Equals => "equal",
        }
    }
}

impl TitleMatch {
    pub fn matches(self, observed: &str, expected: &str) -> bool {
        match self {
            TitleMatch::Contains => observed.contains(expected),
            TitleMatch::Equals => observed.trim() == expected.trim(),
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            TitleMatch::Contains => "contain",
            TitleMatch::Equals => "equal",
        }
    }
}

impl Action {
    pub fn unknown(raw_instruction: &str, reason: impl Into<String>) -> Self {
        Action::Unknown {
            raw_instruction: raw_instruction.to_string(),
            reason: reason.into(),
        }
    }

    pub fn wait_ms(ms: u64) -> Self {
        Action::Wait {
            condition: WaitFor::Duration { ms },
        }
    }

    /// Snake-case kind name, as used in the extractor schema and reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Action::Navigate { .. } => "navigate",
            Action::Click { .. } => "click",
            Action::Fill { .. } => "fill",
            Action::Wait { .. } => "wait",
            Action::Screenshot => "screenshot",
            Action::AssertTextVisible { .. } => "assert_text_visible",
            Action::AssertUrl { .. } => "assert_url",
            Action::AssertTitle { .. } => "assert_title",
            Action::AssertElement { .. } => "assert_element",
            Action::AssertFormValue { .. } => "assert_form_value",
            Action::AssertCheckbox { .. } => "assert_checkbox",
            Action::Unknown { .. } => "unknown",
        }
    }

    pub fn is_assertion(&self) -> bool {
        matches!(
            self,
            Action::AssertTextVisible { .. }
                | Action::AssertUrl { .. }
                | Action::AssertTitle { .. }
                | Action::AssertElement { .. }
                | Action::AssertFormValue { .. }
                | Action::AssertCheckbox { .. }
        )
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Action::Unknown { .. })
    }

    /// The element descriptor this action hands to the driver, if any.
    pub fn target_desc(&self) -> Option<&str> {
        match self {
            Action::Click { target_desc }
            | Action::Fill { target_desc, .. }
            | Action::AssertElement { target_desc, .. }
            | Action::AssertFormValue { target_desc, .. }
            | Action::AssertCheckbox { target_desc, .. } => Some(target_desc),
            Action::Wait {
                condition: WaitFor::ElementVisible { target_desc },
            } => Some(target_desc),
            _ => None,
        }
    }

    /// Whether a transient driver failure on this action may be retried.
    ///
    /// Fixed-duration waits are not retried: repeating them only adds time.
    /// Assertions are never retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            Action::Navigate { .. }
            | Action::Click { .. }
            | Action::Fill { .. }
            | Action::Screenshot => true,
            Action::Wait { condition } => !matches!(condition, WaitFor::Duration { .. }),
            Action::AssertTextVisible { .. }
            | Action::AssertUrl { .. }
            | Action::AssertTitle { .. }
            | Action::AssertElement { .. }
            | Action::AssertFormValue { .. }
            | Action::AssertCheckbox { .. }
            | Action::Unknown { .. } => false,
        }
    }

    /// One-line human description for reports.
    pub fn summary(&self) -> String {
        match self {
            Action::Navigate { url } => format!("navigate to {}", url),
            Action::Click { target_desc } => format!("click '{}'", target_desc),
            Action::Fill { target_desc, value } => {
                format!("fill '{}' with '{}'", target_desc, value)
            }
            Action::Wait { condition } => match condition {
                WaitFor::Duration { ms } => format!("wait {}ms", ms),
                WaitFor::PageLoad => "wait for page load".to_string(),
                WaitFor::TextVisible { text } => format!("wait for text '{}'", text),
                WaitFor::ElementVisible { target_desc } => {
                    format!("wait for element '{}'", target_desc)
                }
            },
            Action::Screenshot => "screenshot".to_string(),
            Action::AssertTextVisible { text, negate } => {
                if *negate {
                    format!("assert text '{}' is not visible", text)
                } else {
                    format!("assert text '{}' is visible", text)
                }
            }
            Action::AssertUrl { mode, value } => {
                format!("assert URL should {} '{}'", mode.describe(), value)
            }
            Action::AssertTitle { mode, value } => {
                format!("assert title should {} '{}'", mode.describe(), value)
            }
            Action::AssertElement { target_desc, state } => {
                format!("assert element '{}' is {}", target_desc, state.describe())
            }
            Action::AssertFormValue { target_desc, value } => {
                format!("assert '{}' has value '{}'", target_desc, value)
            }
            Action::AssertCheckbox {
                target_desc,
                checked,
            } => {
                if *checked {
                    format!("assert '{}' is checked", target_desc)
                } else {
                    format!("assert '{}' is unchecked", target_desc)
                }
            }
            Action::Unknown { reason, .. } => format!("unknown ({})", reason),
        }
    }
}

/// Which translator produced an action.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ParseSource {
    Pattern,
    Llm,
}

/// Result of translating one instruction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParseResult {
    pub action: Action,
    pub source: ParseSource,
    pub confidence: f32,
}

impl ParseResult {
    pub fn from_pattern(action: Action) -> Self {
        Self {
            action,
            source: ParseSource::Pattern,
            confidence: 1.0,
        }
    }

    pub fn from_llm(action: Action, confidence: f32) -> Self {
        Self {
            action,
            source: ParseSource::Llm,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }
}
