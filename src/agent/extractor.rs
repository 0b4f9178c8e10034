use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::action::action_model::{Action, ParseResult};
use crate::action::schema::ActionSchema;
use crate::agent::ai_model::TextInference;
use crate::agent::error::ExtractionError;
use crate::pattern::normalize::{literals, normalize};

/// Confidence assumed when the model omits its own.
pub const DEFAULT_MODEL_CONFIDENCE: f32 = 0.7;

/// Model-backed fallback translator.
pub trait SemanticExtractor: Send + Sync {
    fn extract(
        &self,
        instruction: &str,
        schema: &ActionSchema,
        timeout: Duration,
    ) -> Result<ParseResult, ExtractionError>;
}

/// Check a candidate answer against the schema and the instruction.
///
/// Rejections become `Unknown` with zero confidence; they are never errors.
pub fn validate_candidate(
    candidate: &Value,
    instruction: &str,
    schema: &ActionSchema,
) -> ParseResult {
    let confidence = candidate
        .get("confidence")
        .and_then(Value::as_f64)
        .map(|c| c as f32)
        .unwrap_or(DEFAULT_MODEL_CONFIDENCE);

    let action = match schema.validate(candidate, instruction) {
        Ok(action) => action,
        Err(reason) => {
            info!(%reason, instruction, "extractor answer rejected");
            return ParseResult::from_llm(
                Action::unknown(instruction, format!("rejected extractor answer: {}", reason)),
                0.0,
            );
        }
    };

    // Descriptors must come from the author's words, never from the model
    if let Some(desc) = action.target_desc() {
        if !mentions(instruction, desc) {
            info!(target_desc = desc, instruction, "extractor invented a target");
            return ParseResult::from_llm(
                Action::unknown(
                    instruction,
                    format!("rejected extractor answer: target '{}' is not in the instruction", desc),
                ),
                0.0,
            );
        }
    }

    if action.is_unknown() {
        return ParseResult::from_llm(action, 0.0);
    }
    ParseResult::from_llm(action, confidence)
}

fn mentions(instruction: &str, desc: &str) -> bool {
    let desc = desc.to_lowercase();
    instruction.to_lowercase().contains(&desc) || normalize(instruction).to_lowercase().contains(&desc)
}

/// Pull the first JSON object out of a model reply.
fn parse_reply(reply: &str) -> Option<Value> {
    let trimmed = reply.trim();
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Some(value);
    }
    // Tolerate prose or code fences around the object
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&trimmed[start..=end]).ok()
}

// ============================================================================
// Model extractor
// ============================================================================

pub struct ModelExtractor {
    pub backend: Box<dyn TextInference>,
}

impl ModelExtractor {
    pub fn new(backend: Box<dyn TextInference>) -> Self {
        Self { backend }
    }

    fn build_prompt(&self, instruction: &str, schema: &ActionSchema) -> String {
        format!(
r#"You convert one browser test instruction into exactly one action.
The instruction may be Japanese, Chinese or English.

ACTIONS (respond with exactly one as a flat JSON object):
{}

RULES:
- Copy element descriptions, texts and values verbatim from the instruction.
- Durations are in milliseconds.
- Add "confidence" between 0 and 1.
- If no action fits, answer {{"kind": "unknown", "reason": "..."}}.

INSTRUCTION: {}

Respond with ONLY valid JSON, no explanation."#,
            schema.describe(),
            instruction
        )
    }
}

impl SemanticExtractor for ModelExtractor {
    fn extract(
        &self,
        instruction: &str,
        schema: &ActionSchema,
        timeout: Duration,
    ) -> Result<ParseResult, ExtractionError> {
        let prompt = self.build_prompt(instruction, schema);
        let reply = self.backend.infer_text(&prompt, timeout)?;
        debug!(reply = %reply, "extractor reply");

        match parse_reply(&reply) {
            Some(candidate) => Ok(validate_candidate(&candidate, instruction, schema)),
            None => Ok(ParseResult::from_llm(
                Action::unknown(instruction, "extractor reply is not a JSON object"),
                0.0,
            )),
        }
    }
}

// ============================================================================
// Mock extractor (keyword rules, no model)
// ============================================================================

static URL_RE: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"https?://[^\s「」]+|(?:^|\s)(/[^\s「」]*)").ok());

static DURATION_RE: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(r"(?i)(\d+)\s*(ミリ秒|毫秒|ms|milliseconds?|秒|seconds?|secs?|s\b)").ok()
});

static CLICK_TARGET_RE: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"(?i)click(?: on)? (?:the )?([A-Za-z0-9][\w ]*)").ok());

const MOCK_CONFIDENCE: f64 = 0.8;
const MOCK_DEFAULT_WAIT_MS: u64 = 3000;

/// Keyword-based stand-in for the model.
///
/// Builds the same flat JSON a model would return and runs it through the
/// same validation, so it exercises every path a real answer does.
#[derive(Debug, Default, Clone, Copy)]
pub struct MockExtractor;

impl MockExtractor {
    pub fn new() -> Self {
        Self
    }

    /// The raw candidate this stand-in would answer with.
    pub fn candidate(&self, instruction: &str) -> Value {
        let text = normalize(instruction);
        let lower = text.to_lowercase();
        let quoted = literals(&text);
        let has = |keys: &[&str]| keys.iter().any(|k| lower.contains(k));

        if has(&["移動", "navigate", "go to", "打开", "访问", "開く"]) {
            return match find_url(&text) {
                Some(url) => json!({"kind": "navigate", "url": url, "confidence": MOCK_CONFIDENCE}),
                None => unknown("no URL in navigation instruction"),
            };
        }

        if has(&["クリック", "click", "押", "点击", "tap"]) {
            let target = quoted.first().cloned().or_else(|| {
                CLICK_TARGET_RE
                    .as_ref()
                    .and_then(|re| re.captures(&text))
                    .and_then(|c| c.get(1))
                    .map(|m| m.as_str().trim().to_string())
            });
            return match target {
                Some(t) => json!({"kind": "click", "target_desc": t, "confidence": MOCK_CONFIDENCE}),
                None => unknown("no click target"),
            };
        }

        if has(&["入力", "type", "enter", "输入", "fill"]) {
            return match fill_parts(&lower, &text, &quoted) {
                Some((target, value)) => json!({
                    "kind": "fill",
                    "target_desc": target,
                    "value": value,
                    "confidence": MOCK_CONFIDENCE,
                }),
                None => unknown("no field or value to fill"),
            };
        }

        if has(&["待", "wait", "等"]) {
            let ms = find_duration_ms(&text).unwrap_or(MOCK_DEFAULT_WAIT_MS);
            return json!({"kind": "wait", "duration_ms": ms, "confidence": MOCK_CONFIDENCE});
        }

        if has(&["スクリーンショット", "screenshot", "截图", "截屏"]) {
            return json!({"kind": "screenshot", "confidence": MOCK_CONFIDENCE});
        }

        if has(&["確認", "check", "verify", "确认", "表示"]) {
            return match quoted.first() {
                Some(t) => {
                    let negate = has(&["ない", "not", "n't", "没", "不"]);
                    json!({
                        "kind": "assert_text_visible",
                        "text": t,
                        "negate": negate,
                        "confidence": MOCK_CONFIDENCE,
                    })
                }
                None => unknown("nothing quoted to check"),
            };
        }

        unknown("no keyword matched")
    }
}

fn unknown(reason: &str) -> Value {
    json!({"kind": "unknown", "reason": reason})
}

fn find_url(text: &str) -> Option<String> {
    let caps = URL_RE.as_ref()?.captures(text)?;
    caps.get(1)
        .or_else(|| caps.get(0))
        .map(|m| m.as_str().trim().to_string())
}

fn find_duration_ms(text: &str) -> Option<u64> {
    let caps = DURATION_RE.as_ref()?.captures(text)?;
    // Too many digits for u64 is still a duration; the schema range check rejects it
    let n: u64 = caps.get(1)?.as_str().parse().unwrap_or(u64::MAX);
    let unit = caps.get(2)?.as_str().to_lowercase();
    if unit.starts_with("ミリ") || unit.starts_with("毫") || unit.starts_with("m") {
        Some(n)
    } else {
        Some(n.saturating_mul(1000))
    }
}

/// Field hints the stand-in recognizes when only a value is quoted.
const FIELD_HINTS: &[&str] = &["ユーザー名", "username", "パスワード", "password", "検索", "search", "メール", "email", "用户名", "密码"];

fn fill_parts(lower: &str, text: &str, quoted: &[String]) -> Option<(String, String)> {
    match quoted {
        [first, second, ..] => {
            // English puts the value first: type "v" into "field"
            if lower.starts_with("type") || lower.starts_with("enter") || lower.starts_with("输入") {
                Some((second.clone(), first.clone()))
            } else {
                Some((first.clone(), second.clone()))
            }
        }
        [value] => FIELD_HINTS
            .iter()
            .find(|hint| text.to_lowercase().contains(*hint))
            .map(|hint| {
                let start = lower.find(hint).unwrap_or(0);
                let original = text.get(start..start + hint.len()).unwrap_or(hint);
                (original.to_string(), value.clone())
            }),
        [] => None,
    }
}

impl SemanticExtractor for MockExtractor {
    fn extract(
        &self,
        instruction: &str,
        schema: &ActionSchema,
        _timeout: Duration,
    ) -> Result<ParseResult, ExtractionError> {
        let candidate = self.candidate(instruction);
        debug!(candidate = %candidate, "mock extractor candidate");
        Ok(validate_candidate(&candidate, instruction, schema))
    }
}
