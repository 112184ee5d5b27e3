//! Hook execution results and the canonical dispatch decision.

use serde::{Deserialize, Serialize};

/// Canonical outcome of dispatching one event.
///
/// Exactly one decision is produced per dispatch, no matter how many hooks
/// ran. Every variant may carry a user-facing message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Decision {
    /// Proceed normally.
    Continue {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    /// Block the operation.
    Deny {
        reason: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    /// Proceed with a replacement payload.
    Modify {
        payload: serde_json::Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    /// Proceed and add text to the agent's context.
    InjectContext {
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
}

impl Decision {
    /// Plain continue with no message.
    pub fn allow() -> Self {
        Decision::Continue { message: None }
    }

    /// Continue, surfacing a warning to the user.
    pub fn warn(message: impl Into<String>) -> Self {
        Decision::Continue {
            message: Some(message.into()),
        }
    }

    /// Deny with a reason.
    pub fn deny(reason: impl Into<String>) -> Self {
        Decision::Deny {
            reason: reason.into(),
            message: None,
        }
    }

    /// Short action name, as used on the wire.
    pub fn action(&self) -> &'static str {
        match self {
            Decision::Continue { .. } => "continue",
            Decision::Deny { .. } => "deny",
            Decision::Modify { .. } => "modify",
            Decision::InjectContext { .. } => "inject_context",
        }
    }

    /// True for a plain continue.
    pub fn is_continue(&self) -> bool {
        matches!(self, Decision::Continue { .. })
    }

    /// The user-facing message, if any.
    pub fn message(&self) -> Option<&str> {
        match self {
            Decision::Continue { message }
            | Decision::Deny { message, .. }
            | Decision::Modify { message, .. }
            | Decision::InjectContext { message, .. } => message.as_deref(),
        }
    }
}

impl Default for Decision {
    fn default() -> Self {
        Decision::allow()
    }
}

/// Failure to run a hook at all. Always degrades to continue-with-warning.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExecutionFault {
    /// The process could not be started.
    #[error("failed to spawn '{command}': {message}")]
    Spawn { command: String, message: String },

    /// I/O failure while the process was running.
    #[error("process error: {0}")]
    Io(String),

    /// The hook definition has no command or prompt text.
    #[error("{hook_type} hook has no body")]
    MissingBody { hook_type: String },

    /// No prompt evaluator is configured.
    #[error("no prompt evaluator configured")]
    NoEvaluator,

    /// The prompt evaluator failed.
    #[error("prompt evaluation failed: {0}")]
    Evaluator(String),
}

/// Raw result of one hook execution.
///
/// Transient: produced by an executor and consumed immediately by the
/// response translator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HookInvocationResult {
    /// Process exit code. `None` when timed out, killed, or never started.
    pub exit_code: Option<i32>,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
    /// The wall-clock deadline expired.
    pub timed_out: bool,
    /// The hook could not be executed.
    pub exception: Option<ExecutionFault>,
}

impl HookInvocationResult {
    /// A hook that ran to completion.
    pub fn completed(
        exit_code: i32,
        stdout: impl Into<String>,
        stderr: impl Into<String>,
    ) -> Self {
        Self {
            exit_code: Some(exit_code),
            stdout: stdout.into(),
            stderr: stderr.into(),
            timed_out: false,
            exception: None,
        }
    }

    /// A hook that exceeded its deadline.
    pub fn timed_out() -> Self {
        Self {
            timed_out: true,
            ..Self::default()
        }
    }

    /// A hook that could not be executed.
    pub fn fault(fault: ExecutionFault) -> Self {
        Self {
            exception: Some(fault),
            ..Self::default()
        }
    }

    /// True when the hook ran and exited (regardless of exit code).
    pub fn ran(&self) -> bool {
        !self.timed_out && self.exception.is_none()
    }
}
