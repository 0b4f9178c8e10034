use serde_json::{Map, Value};

use crate::action::action_model::{Action, ElementState, TitleMatch, UrlMatch, WaitFor};

/// Longest wait an extracted action may request.
pub const MAX_WAIT_MS: u64 = 300_000;

/// Fields every candidate may carry besides its kind-specific ones.
const META_FIELDS: &[&str] = &["kind", "confidence"];

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldType {
    Text,
    Integer,
    Bool,
    Choice(&'static [&'static str]),
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub ty: FieldType,
}

const fn field(name: &'static str, ty: FieldType) -> FieldSpec {
    FieldSpec { name, ty }
}

/// One action kind the extractor may answer with.
#[derive(Debug, Clone)]
pub struct KindSpec {
    pub kind: &'static str,
    pub required: &'static [FieldSpec],
    pub optional: &'static [FieldSpec],
    pub description: &'static str,
}

const URL_MODES: &[&str] = &["contains", "starts", "ends", "equals"];
const TITLE_MODES: &[&str] = &["contains", "equals"];
const ELEMENT_STATES: &[&str] = &["exists", "absent", "visible", "hidden"];
const WAIT_UNTIL: &[&str] = &["page_load", "text_visible", "element_visible"];

const KINDS: &[KindSpec] = &[
    KindSpec {
        kind: "navigate",
        required: &[field("url", FieldType::Text)],
        optional: &[],
        description: "open a URL",
    },
    KindSpec {
        kind: "click",
        required: &[field("target_desc", FieldType::Text)],
        optional: &[],
        description: "click an element described in words",
    },
    KindSpec {
        kind: "fill",
        required: &[
            field("target_desc", FieldType::Text),
            field("value", FieldType::Text),
        ],
        optional: &[],
        description: "type a value into an input",
    },
    KindSpec {
        kind: "wait",
        required: &[],
        optional: &[
            field("duration_ms", FieldType::Integer),
            field("until", FieldType::Choice(WAIT_UNTIL)),
            field("text", FieldType::Text),
            field("target_desc", FieldType::Text),
        ],
        description: "wait either duration_ms or until a condition",
    },
    KindSpec {
        kind: "screenshot",
        required: &[],
        optional: &[],
        description: "capture the page",
    },
    KindSpec {
        kind: "assert_text_visible",
        required: &[field("text", FieldType::Text)],
        optional: &[field("negate", FieldType::Bool)],
        description: "check text is (negate=false) or is not (negate=true) on the page",
    },
    KindSpec {
        kind: "assert_url",
        required: &[
            field("mode", FieldType::Choice(URL_MODES)),
            field("value", FieldType::Text),
        ],
        optional: &[],
        description: "check the current URL",
    },
    KindSpec {
        kind: "assert_title",
        required: &[
            field("mode", FieldType::Choice(TITLE_MODES)),
            field("value", FieldType::Text),
        ],
        optional: &[],
        description: "check the page title",
    },
    KindSpec {
        kind: "assert_element",
        required: &[
            field("target_desc", FieldType::Text),
            field("state", FieldType::Choice(ELEMENT_STATES)),
        ],
        optional: &[],
        description: "check an element's presence or visibility",
    },
    KindSpec {
        kind: "assert_form_value",
        required: &[
            field("target_desc", FieldType::Text),
            field("value", FieldType::Text),
        ],
        optional: &[],
        description: "check an input's current value",
    },
    KindSpec {
        kind: "assert_checkbox",
        required: &[
            field("target_desc", FieldType::Text),
            field("checked", FieldType::Bool),
        ],
        optional: &[],
        description: "check a checkbox state",
    },
    KindSpec {
        kind: "unknown",
        required: &[],
        optional: &[field("reason", FieldType::Text)],
        description: "the instruction is not a browser step",
    },
];

/// The closed set of action kinds and their fields, as offered to the
/// extractor and enforced on its answers.
#[derive(Debug, Clone)]
pub struct ActionSchema {
    kinds: &'static [KindSpec],
}

impl Default for ActionSchema {
    fn default() -> Self {
        Self::standard()
    }
}

impl ActionSchema {
    pub fn standard() -> Self {
        Self { kinds: KINDS }
    }

    pub fn kinds(&self) -> impl Iterator<Item = &KindSpec> {
        self.kinds.iter()
    }

    pub fn kind(&self, name: &str) -> Option<&KindSpec> {
        self.kinds.iter().find(|k| k.kind == name)
    }

    /// Render the schema as prompt text, one line per kind.
    pub fn describe(&self) -> String {
        self.kinds
            .iter()
            .map(|k| {
                let mut fields: Vec<String> = k
                    .required
                    .iter()
                    .map(|f| format!("\"{}\": {}", f.name, type_hint(f.ty)))
                    .collect();
                fields.extend(
                    k.optional
                        .iter()
                        .map(|f| format!("\"{}\"?: {}", f.name, type_hint(f.ty))),
                );
                let body = if fields.is_empty() {
                    String::new()
                } else {
                    format!(", {}", fields.join(", "))
                };
                format!("- {{\"kind\": \"{}\"{}}}  ({})", k.kind, body, k.description)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Check an untrusted candidate against the schema and build the action.
    ///
    /// Returns the rejection reason on any mismatch: unknown kind, unexpected,
    /// missing, mistyped or empty field, or an out-of-range wait.
    pub fn validate(&self, candidate: &Value, raw_instruction: &str) -> Result<Action, String> {
        let obj = candidate
            .as_object()
            .ok_or_else(|| "answer is not a JSON object".to_string())?;

        let kind = obj
            .get("kind")
            .and_then(Value::as_str)
            .ok_or_else(|| "answer has no string 'kind'".to_string())?;

        let spec = self
            .kind(kind)
            .ok_or_else(|| format!("unsupported action kind '{}'", kind))?;

        for key in obj.keys() {
            let known = META_FIELDS.contains(&key.as_str())
                || spec.required.iter().any(|f| f.name == key)
                || spec.optional.iter().any(|f| f.name == key);
            if !known {
                return Err(format!("unexpected field '{}' for kind '{}'", key, kind));
            }
        }

        for f in spec.required {
            let value = obj
                .get(f.name)
                .ok_or_else(|| format!("missing field '{}' for kind '{}'", f.name, kind))?;
            check_type(f, value)?;
        }
        for f in spec.optional {
            if let Some(value) = obj.get(f.name) {
                check_type(f, value)?;
            }
        }

        build_action(kind, obj, raw_instruction)
    }
}

fn type_hint(ty: FieldType) -> String {
    match ty {
        FieldType::Text => "string".to_string(),
        FieldType::Integer => "integer".to_string(),
        FieldType::Bool => "boolean".to_string(),
        FieldType::Choice(options) => options
            .iter()
            .map(|o| format!("\"{}\"", o))
            .collect::<Vec<_>>()
            .join("|"),
    }
}

fn check_type(f: &FieldSpec, value: &Value) -> Result<(), String> {
    let ok = match f.ty {
        FieldType::Text => value.as_str().is_some_and(|s| !s.trim().is_empty()),
        FieldType::Integer => value.as_u64().is_some(),
        FieldType::Bool => value.is_boolean(),
        FieldType::Choice(options) => value.as_str().is_some_and(|s| options.contains(&s)),
    };
    if ok {
        Ok(())
    } else {
        Err(format!("field '{}' has an invalid value: {}", f.name, value))
    }
}

fn text(obj: &Map<String, Value>, name: &str) -> Result<String, String> {
    obj.get(name)
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .ok_or_else(|| format!("missing field '{}'", name))
}

fn flag(obj: &Map<String, Value>, name: &str) -> Option<bool> {
    obj.get(name).and_then(Value::as_bool)
}

fn build_action(kind: &str, obj: &Map<String, Value>, raw: &str) -> Result<Action, String> {
    let action = match kind {
        "navigate" => Action::Navigate {
            url: text(obj, "url")?,
        },
        "click" => Action::Click {
            target_desc: text(obj, "target_desc")?,
        },
        "fill" => Action::Fill {
            target_desc: text(obj, "target_desc")?,
            value: text(obj, "value")?,
        },
        "wait" => Action::Wait {
            condition: build_wait(obj)?,
        },
        "screenshot" => Action::Screenshot,
        "assert_text_visible" => Action::AssertTextVisible {
            text: text(obj, "text")?,
            negate: flag(obj, "negate").unwrap_or(false),
        },
        "assert_url" => Action::AssertUrl {
            mode: match text(obj, "mode")?.as_str() {
                "contains" => UrlMatch::Contains,
                "starts" => UrlMatch::Starts,
                "ends" => UrlMatch::Ends,
                _ => UrlMatch::Equals,
            },
            value: text(obj, "value")?,
        },
        "assert_title" => Action::AssertTitle {
            mode: match text(obj, "mode")?.as_str() {
                "contains" => TitleMatch::Contains,
                _ => TitleMatch::Equals,
            },
            value: text(obj, "value")?,
        },
        "assert_element" => Action::AssertElement {
            target_desc: text(obj, "target_desc")?,
            state: match text(obj, "state")?.as_str() {
                "exists" => ElementState::Exists,
                "absent" => ElementState::Absent,
                "visible" => ElementState::Visible,
                _ => ElementState::Hidden,
            },
        },
        "assert_form_value" => Action::AssertFormValue {
            target_desc: text(obj, "target_desc")?,
            value: text(obj, "value")?,
        },
        "assert_checkbox" => Action::AssertCheckbox {
            target_desc: text(obj, "target_desc")?,
            checked: flag(obj, "checked").unwrap_or(true),
        },
        "unknown" => Action::unknown(
            raw,
            obj.get("reason")
                .and_then(Value::as_str)
                .unwrap_or("extractor could not interpret the instruction"),
        ),
        other => return Err(format!("unsupported action kind '{}'", other)),
    };
    Ok(action)
}

fn build_wait(obj: &Map<String, Value>) -> Result<WaitFor, String> {
    let duration = obj.get("duration_ms").and_then(Value::as_u64);
    let until = obj.get("until").and_then(Value::as_str);

    match (duration, until) {
        (Some(_), Some(_)) => Err("wait has both 'duration_ms' and 'until'".to_string()),
        (None, None) => Err("wait needs 'duration_ms' or 'until'".to_string()),
        (Some(ms), None) => {
            if ms == 0 || ms > MAX_WAIT_MS {
                Err(format!("wait of {}ms is out of range", ms))
            } else {
                Ok(WaitFor::Duration { ms })
            }
        }
        (None, Some("page_load")) => Ok(WaitFor::PageLoad),
        (None, Some("text_visible")) => Ok(WaitFor::TextVisible {
            text: text(obj, "text")?,
        }),
        (None, Some(_)) => Ok(WaitFor::ElementVisible {
            target_desc: text(obj, "target_desc")?,
        }),
    }
}
