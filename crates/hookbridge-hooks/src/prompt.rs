//! Prompt hooks: argument expansion and model answer normalisation.
//!
//! A prompt hook's text has `$ARGUMENTS` replaced with a summary of the
//! event, is sent to a [`PromptEvaluator`], and the free-form answer is
//! normalised into the same JSON protocol command hooks speak.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use serde_json::{Value, json};

use crate::error::EvaluatorError;

/// Placeholder replaced with the event summary.
pub const ARGUMENTS_PLACEHOLDER: &str = "$ARGUMENTS";

/// Maximum characters of a tool result included in the arguments.
const RESULT_PREVIEW_CHARS: usize = 500;

/// Language-model collaborator that answers prompt hooks.
#[async_trait]
pub trait PromptEvaluator: Send + Sync {
    /// Evaluate an expanded prompt and return the raw answer text.
    async fn evaluate(&self, prompt: &str, max_output_tokens: u32)
    -> Result<String, EvaluatorError>;
}

/// Build the argument string for a payload.
pub fn build_arguments(payload: &Value) -> String {
    let mut parts = Vec::new();

    if let Some(prompt) = payload.get("prompt").and_then(Value::as_str) {
        parts.push(format!("User prompt: {}", prompt));
    }
    if let Some(tool) = payload.get("tool_name").and_then(Value::as_str)
        && !tool.is_empty()
    {
        parts.push(format!("Tool: {}", tool));
    }
    if let Some(input) = payload.get("tool_input") {
        parts.push(format!("Input: {}", pretty(input)));
    }
    if let Some(result) = payload.get("tool_result").filter(|v| !v.is_null()) {
        let text = pretty(result);
        let preview = if text.chars().count() > RESULT_PREVIEW_CHARS {
            let cut: String = text.chars().take(RESULT_PREVIEW_CHARS).collect();
            format!("{}...", cut)
        } else {
            text
        };
        parts.push(format!("Result: {}", preview));
    }
    if let Some(trigger) = payload.get("trigger").and_then(Value::as_str) {
        parts.push(format!("Trigger: {}", trigger));
    }

    if parts.is_empty() {
        pretty(payload)
    } else {
        parts.join("\n")
    }
}

/// Replace every `$ARGUMENTS` in `prompt`.
pub fn expand_arguments(prompt: &str, arguments: &str) -> String {
    prompt.replace(ARGUMENTS_PLACEHOLDER, arguments)
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

// ─────────────────────────────────────────────────────────────────────────────
// Answer parsing
// ─────────────────────────────────────────────────────────────────────────────

/// Normalised model verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptVerdict {
    pub ok: bool,
    pub reason: String,
}

impl PromptVerdict {
    /// Render as hook output JSON.
    pub fn to_hook_output(&self) -> Value {
        if !self.ok {
            let reason = if self.reason.is_empty() {
                "Prompt hook rejected the operation"
            } else {
                &self.reason
            };
            return json!({"decision": "block", "reason": reason});
        }
        if self.reason.is_empty() {
            json!({"decision": "approve"})
        } else {
            json!({"decision": "approve", "systemMessage": self.reason})
        }
    }
}

static FLAT_OBJECT: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\{[^{}]*\}").ok());

const NEGATIVE_PHRASES: &[&str] = &[
    "not complete",
    "incomplete",
    "not done",
    "not finished",
    "needs more",
    "should continue",
    "must continue",
    "not ok",
    "not okay",
];

const POSITIVE_PHRASES: &[&str] = &[
    "complete",
    "done",
    "finished",
    "looks good",
    "approved",
    "ok",
    "okay",
];

/// Interpret a model answer. Unrecognised answers fail open.
pub fn parse_answer(text: &str) -> PromptVerdict {
    let trimmed = text.trim();

    if let Some(verdict) = parse_json_answer(trimmed) {
        return verdict;
    }

    let words: Vec<String> = trimmed
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(String::from)
        .collect();
    let padded = format!(" {} ", words.join(" "));
    let has_phrase = |phrases: &[&str]| phrases.iter().any(|p| padded.contains(&format!(" {} ", p)));
    let first_word = words.first().map(String::as_str).unwrap_or_default();
    let reason: String = trimmed.chars().take(200).collect();

    if matches!(first_word, "no" | "false") || has_phrase(NEGATIVE_PHRASES) {
        return PromptVerdict { ok: false, reason };
    }
    if matches!(first_word, "yes" | "true") || has_phrase(POSITIVE_PHRASES) {
        return PromptVerdict {
            ok: true,
            reason: String::new(),
        };
    }

    tracing::debug!(answer = %reason, "unrecognised prompt answer, allowing");
    PromptVerdict {
        ok: true,
        reason: String::new(),
    }
}

fn parse_json_answer(text: &str) -> Option<PromptVerdict> {
    let candidates = std::iter::once(text).chain(
        FLAT_OBJECT
            .as_ref()
            .into_iter()
            .flat_map(|re| re.find_iter(text).map(|m| m.as_str())),
    );

    for candidate in candidates {
        let Ok(Value::Object(map)) = serde_json::from_str::<Value>(candidate) else {
            continue;
        };
        let Some(ok) = map.get("ok") else {
            continue;
        };
        let ok = match ok {
            Value::Bool(b) => *b,
            Value::String(s) => matches!(s.to_lowercase().as_str(), "true" | "yes" | "1" | "ok"),
            Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
            _ => false,
        };
        let reason = map
            .get("reason")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        return Some(PromptVerdict { ok, reason });
    }
    None
}
