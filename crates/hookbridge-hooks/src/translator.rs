//! Translate a raw hook result into a [`Decision`].
//!
//! Checked in order, first match wins:
//! 1. timeout or execution fault: continue with a warning
//! 2. structured `decision: "block"` (or `continue: false`): deny
//! 3. structured `newContent`: modify
//! 4. structured `contextInjection`: inject context
//! 5. exit code 2: deny
//! 6. exit code 0: continue
//! 7. anything else: continue with a warning
//!
//! Structured output that fails to parse is ignored and the exit code rules
//! apply.

use hookbridge_types::{Decision, HookInvocationResult};
use serde::Deserialize;
use serde_json::Value;

use crate::error::ProtocolError;

/// Reason used when a blocking hook gives none.
pub const DEFAULT_BLOCK_REASON: &str = "Hook blocked operation";

/// Recognised fields of a hook's JSON stdout.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct HookOutput {
    pub decision: Option<String>,
    pub reason: Option<String>,
    #[serde(rename = "systemMessage")]
    pub system_message: Option<String>,
    #[serde(rename = "newContent")]
    pub new_content: Option<Value>,
    #[serde(rename = "contextInjection")]
    pub context_injection: Option<String>,
    #[serde(rename = "continue")]
    pub continue_: Option<bool>,
    #[serde(rename = "stopReason")]
    pub stop_reason: Option<String>,
}

impl HookOutput {
    /// True when the output asks to block.
    pub fn blocks(&self) -> bool {
        matches!(self.decision.as_deref(), Some("block" | "deny")) || self.continue_ == Some(false)
    }

    fn block_reason(&self) -> Option<String> {
        non_empty(self.reason.as_deref()).or_else(|| non_empty(self.stop_reason.as_deref()))
    }
}

/// Parse hook stdout. Empty output is `Ok(None)`.
pub fn parse_output(stdout: &str) -> Result<Option<HookOutput>, ProtocolError> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let value: Value =
        serde_json::from_str(trimmed).map_err(|e| ProtocolError::NotJson(e.to_string()))?;
    if !value.is_object() {
        return Err(ProtocolError::Shape("expected a JSON object".into()));
    }
    serde_json::from_value(value)
        .map(Some)
        .map_err(|e| ProtocolError::Shape(e.to_string()))
}

/// Translate one hook result.
pub fn translate(result: &HookInvocationResult) -> Decision {
    if result.timed_out {
        return Decision::warn("Hook timed out; continuing");
    }
    if let Some(fault) = &result.exception {
        return Decision::warn(format!("Hook failed to run: {}; continuing", fault));
    }

    let output = match parse_output(&result.stdout) {
        Ok(output) => output,
        Err(e) => {
            tracing::debug!(error = %e, "hook output not structured, using exit code");
            None
        }
    };

    if let Some(out) = &output {
        if out.blocks() {
            return Decision::Deny {
                reason: out
                    .block_reason()
                    .unwrap_or_else(|| DEFAULT_BLOCK_REASON.to_string()),
                message: out.system_message.clone(),
            };
        }
        if let Some(payload) = &out.new_content {
            return Decision::Modify {
                payload: payload.clone(),
                message: out.system_message.clone(),
            };
        }
        if let Some(text) = &out.context_injection {
            return Decision::InjectContext {
                text: text.clone(),
                message: out.system_message.clone(),
            };
        }
    }

    let message = output.as_ref().and_then(|o| o.system_message.clone());

    match result.exit_code {
        Some(2) => Decision::Deny {
            reason: exit_two_reason(result, output.as_ref()),
            message,
        },
        Some(0) => Decision::Continue { message },
        Some(code) => Decision::Continue {
            message: Some(join_warning(
                format!("Hook exited with status {}; continuing", code),
                message,
            )),
        },
        None => Decision::Continue {
            message: Some(join_warning(
                "Hook terminated without an exit status; continuing".to_string(),
                message,
            )),
        },
    }
}

/// Reason for an exit-code-2 block: stderr, then a structured reason, then
/// plain stdout, then the default.
fn exit_two_reason(result: &HookInvocationResult, output: Option<&HookOutput>) -> String {
    if let Some(stderr) = non_empty(Some(&result.stderr)) {
        return stderr;
    }
    if let Some(reason) = output.and_then(HookOutput::block_reason) {
        return reason;
    }
    if output.is_none()
        && let Some(stdout) = non_empty(Some(&result.stdout))
    {
        return stdout;
    }
    DEFAULT_BLOCK_REASON.to_string()
}

fn join_warning(warning: String, message: Option<String>) -> String {
    match message {
        Some(m) => format!("{}\n{}", m, warning),
        None => warning,
    }
}

fn non_empty(s: Option<&str>) -> Option<String> {
    s.map(str::trim).filter(|s| !s.is_empty()).map(String::from)
}
