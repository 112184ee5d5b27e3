//! Hook configuration types and the dispatch trait.
//!
//! The configuration types map one-to-one onto the `hooks.json` document
//! format (Claude Code compatible), so a registry can be parsed, merged, and
//! serialized back without losing information.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::Decision;

/// A lifecycle event that hooks can listen for (Claude Code compatible).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum HookEvent {
    /// Before a tool is executed. Can block execution.
    PreToolUse,
    /// After a tool has executed successfully.
    PostToolUse,
    /// After a tool has failed.
    PostToolUseFailure,
    /// When the user submits a prompt. Can block the prompt.
    UserPromptSubmit,
    /// When an operation requires user approval.
    PermissionRequest,
    /// When a notification is shown to the user.
    Notification,
    /// When the agent finishes responding. Blocking keeps the agent going.
    Stop,
    /// When a subagent stops.
    SubagentStop,
    /// Before context compaction.
    PreCompact,
    /// When a session starts or resumes.
    SessionStart,
    /// When a session ends.
    SessionEnd,
}

impl HookEvent {
    /// All recognised events, in declaration order.
    pub const ALL: [HookEvent; 11] = [
        HookEvent::PreToolUse,
        HookEvent::PostToolUse,
        HookEvent::PostToolUseFailure,
        HookEvent::UserPromptSubmit,
        HookEvent::PermissionRequest,
        HookEvent::Notification,
        HookEvent::Stop,
        HookEvent::SubagentStop,
        HookEvent::PreCompact,
        HookEvent::SessionStart,
        HookEvent::SessionEnd,
    ];

    /// The wire name of the event.
    pub fn as_str(&self) -> &'static str {
        match self {
            HookEvent::PreToolUse => "PreToolUse",
            HookEvent::PostToolUse => "PostToolUse",
            HookEvent::PostToolUseFailure => "PostToolUseFailure",
            HookEvent::UserPromptSubmit => "UserPromptSubmit",
            HookEvent::PermissionRequest => "PermissionRequest",
            HookEvent::Notification => "Notification",
            HookEvent::Stop => "Stop",
            HookEvent::SubagentStop => "SubagentStop",
            HookEvent::PreCompact => "PreCompact",
            HookEvent::SessionStart => "SessionStart",
            HookEvent::SessionEnd => "SessionEnd",
        }
    }

    /// Whether the host runtime honours a `deny` for this event.
    pub fn can_block(&self) -> bool {
        matches!(
            self,
            HookEvent::PreToolUse
                | HookEvent::UserPromptSubmit
                | HookEvent::Stop
                | HookEvent::PermissionRequest
        )
    }
}

impl std::fmt::Display for HookEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when parsing an event name that is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown hook event '{0}'")]
pub struct UnknownHookEvent(pub String);

impl std::str::FromStr for HookEvent {
    type Err = UnknownHookEvent;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HookEvent::ALL
            .iter()
            .copied()
            .find(|e| e.as_str() == s)
            .ok_or_else(|| UnknownHookEvent(s.to_string()))
    }
}

/// Hook type (Claude Code compatible).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum HookType {
    /// Execute a shell command.
    #[default]
    Command,
    /// Evaluate a prompt with a language model.
    Prompt,
}

impl std::fmt::Display for HookType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HookType::Command => write!(f, "command"),
            HookType::Prompt => write!(f, "prompt"),
        }
    }
}

/// A single hook (Claude Code format).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HookDefinition {
    /// Hook type (command or prompt).
    #[serde(rename = "type", default)]
    pub hook_type: HookType,
    /// Shell command to execute (for command type).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    /// Prompt text (for prompt type). May contain `$ARGUMENTS`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    /// Timeout in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<f64>,
    /// Fire at most once per session.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub once: bool,
}

impl HookDefinition {
    /// Create a command hook.
    pub fn command(command: impl Into<String>) -> Self {
        Self {
            hook_type: HookType::Command,
            command: Some(command.into()),
            prompt: None,
            timeout: None,
            once: false,
        }
    }

    /// Create a prompt hook.
    pub fn prompt(prompt: impl Into<String>) -> Self {
        Self {
            hook_type: HookType::Prompt,
            command: None,
            prompt: Some(prompt.into()),
            timeout: None,
            once: false,
        }
    }

    /// Set the timeout in seconds.
    pub fn with_timeout(mut self, secs: f64) -> Self {
        self.timeout = Some(secs);
        self
    }

    /// Mark the hook as run-once.
    pub fn run_once(mut self) -> Self {
        self.once = true;
        self
    }

    /// The command or prompt text, whichever the hook type uses.
    pub fn body(&self) -> Option<&str> {
        match self.hook_type {
            HookType::Command => self.command.as_deref(),
            HookType::Prompt => self.prompt.as_deref(),
        }
    }

    /// Stable identity used to key run-once bookkeeping.
    pub fn identity(&self) -> String {
        format!("{}:{}", self.hook_type, self.body().unwrap_or_default())
    }
}

/// A matcher group containing hooks (Claude Code format).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HookMatcherGroup {
    /// Regex pattern matched against the event subject. Absent matches all.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matcher: Option<String>,
    /// Run the hooks of this group concurrently.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub parallel: bool,
    /// The hooks to execute, in order.
    pub hooks: Vec<HookDefinition>,
}

/// The root hooks.json structure (Claude Code format).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HooksConfig {
    /// Matcher groups keyed by event.
    #[serde(default)]
    pub hooks: BTreeMap<HookEvent, Vec<HookMatcherGroup>>,
}

impl HooksConfig {
    /// Check if this config has any hooks defined.
    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty() || self.hooks.values().all(|v| v.is_empty())
    }

    /// Total number of hooks across all events and groups.
    pub fn hook_count(&self) -> usize {
        self.hooks
            .values()
            .flat_map(|groups| groups.iter())
            .map(|g| g.hooks.len())
            .sum()
    }
}

/// Trait through which a host runtime dispatches lifecycle events.
///
/// Object-safe so hosts can hold an `Arc<dyn HookDispatch>` without
/// depending on the engine crate. The typed helpers build the event data
/// document and forward to [`HookDispatch::dispatch`].
#[async_trait::async_trait]
pub trait HookDispatch: Send + Sync {
    /// Dispatch an event with raw event data and return the single decision.
    async fn dispatch(&self, event: HookEvent, data: serde_json::Value) -> Decision;

    /// Dispatch a PreToolUse event.
    async fn dispatch_pre_tool_use(
        &self,
        session_id: &str,
        tool_name: &str,
        tool_input: &serde_json::Value,
    ) -> Decision {
        let data = serde_json::json!({
            "session_id": session_id,
            "tool_name": tool_name,
            "tool_input": tool_input,
        });
        self.dispatch(HookEvent::PreToolUse, data).await
    }

    /// Dispatch a PostToolUse event.
    async fn dispatch_post_tool_use(
        &self,
        session_id: &str,
        tool_name: &str,
        tool_input: &serde_json::Value,
        tool_result: &serde_json::Value,
    ) -> Decision {
        let data = serde_json::json!({
            "session_id": session_id,
            "tool_name": tool_name,
            "tool_input": tool_input,
            "tool_result": tool_result,
        });
        self.dispatch(HookEvent::PostToolUse, data).await
    }

    /// Dispatch a UserPromptSubmit event.
    async fn dispatch_prompt_submit(&self, session_id: &str, prompt: &str) -> Decision {
        let data = serde_json::json!({ "session_id": session_id, "prompt": prompt });
        self.dispatch(HookEvent::UserPromptSubmit, data).await
    }

    /// Dispatch a SessionStart event. `trigger` is `startup`, `resume`, `clear`, or `compact`.
    async fn dispatch_session_start(&self, session_id: &str, trigger: &str) -> Decision {
        let data = serde_json::json!({ "session_id": session_id, "trigger": trigger });
        self.dispatch(HookEvent::SessionStart, data).await
    }

    /// Dispatch a SessionEnd event.
    async fn dispatch_session_end(&self, session_id: &str) -> Decision {
        let data = serde_json::json!({ "session_id": session_id });
        self.dispatch(HookEvent::SessionEnd, data).await
    }

    /// Dispatch a Stop event.
    async fn dispatch_stop(&self, session_id: &str, response: &str) -> Decision {
        let data = serde_json::json!({ "session_id": session_id, "response": response });
        self.dispatch(HookEvent::Stop, data).await
    }

    /// A scoped component (e.g. a skill) entered scope with its own hooks.
    ///
    /// Relative command paths are resolved against `base_dir`.
    async fn enter_scope(&self, owner_id: &str, hooks: HooksConfig, base_dir: &Path);

    /// A scoped component left scope; its hooks stop matching.
    async fn exit_scope(&self, owner_id: &str);

    /// Tear down session state: scoped hooks, run-once bookkeeping, env file.
    async fn end_session(&self);

    /// Get the number of hooks in the active registry.
    fn len(&self) -> usize;

    /// Check if the active registry has no hooks.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Shared hook dispatcher type.
pub type SharedHookDispatcher = std::sync::Arc<dyn HookDispatch>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hook_event_display() {
        assert_eq!(HookEvent::PreToolUse.to_string(), "PreToolUse");
        assert_eq!(HookEvent::SessionEnd.to_string(), "SessionEnd");
        assert_eq!(HookEvent::PreCompact.to_string(), "PreCompact");
    }

    #[test]
    fn test_hook_event_from_str() {
        for event in HookEvent::ALL {
            assert_eq!(event.as_str().parse::<HookEvent>().unwrap(), event);
        }
        let err = "PreToolUsage".parse::<HookEvent>().unwrap_err();
        assert_eq!(err.to_string(), "unknown hook event 'PreToolUsage'");
    }

    #[test]
    fn test_hook_event_serde_matches_display() {
        for event in HookEvent::ALL {
            let json = serde_json::to_string(&event).unwrap();
            assert_eq!(json, format!("\"{}\"", event));
        }
    }

    #[test]
    fn test_can_block() {
        assert!(HookEvent::PreToolUse.can_block());
        assert!(HookEvent::Stop.can_block());
        assert!(!HookEvent::PostToolUse.can_block());
        assert!(!HookEvent::SessionStart.can_block());
    }

    #[test]
    fn test_hook_type_default() {
        let hook: HookDefinition = serde_json::from_str(r#"{"command": "./test.sh"}"#).unwrap();
        assert_eq!(hook.hook_type, HookType::Command);
        assert!(!hook.once);
        assert_eq!(hook.timeout, None);
    }

    #[test]
    fn test_hooks_config_parse() {
        let json = r#"{
            "hooks": {
                "PreToolUse": [
                    {
                        "matcher": "Write|Edit",
                        "parallel": true,
                        "hooks": [
                            { "type": "command", "command": "./validate.sh", "timeout": 5 },
                            { "type": "prompt", "prompt": "Is $ARGUMENTS safe?", "once": true }
                        ]
                    }
                ]
            }
        }"#;
        let config: HooksConfig = serde_json::from_str(json).unwrap();
        let groups = &config.hooks[&HookEvent::PreToolUse];
        assert_eq!(groups[0].matcher.as_deref(), Some("Write|Edit"));
        assert!(groups[0].parallel);
        assert_eq!(groups[0].hooks[0].timeout, Some(5.0));
        assert_eq!(groups[0].hooks[1].hook_type, HookType::Prompt);
        assert!(groups[0].hooks[1].once);
        assert_eq!(config.hook_count(), 2);
    }

    #[test]
    fn test_hooks_config_serialization_omits_defaults() {
        let config = HooksConfig {
            hooks: BTreeMap::from([(
                HookEvent::Stop,
                vec![HookMatcherGroup {
                    matcher: None,
                    parallel: false,
                    hooks: vec![HookDefinition::command("echo done")],
                }],
            )]),
        };
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "hooks": { "Stop": [ { "hooks": [ { "type": "command", "command": "echo done" } ] } ] }
            })
        );
        let back: HooksConfig = serde_json::from_value(json).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_unknown_event_rejected() {
        let json = r#"{"hooks": {"BeforeEverything": []}}"#;
        assert!(serde_json::from_str::<HooksConfig>(json).is_err());
    }

    #[test]
    fn test_hooks_config_empty() {
        assert!(HooksConfig::default().is_empty());
        let config: HooksConfig = serde_json::from_str(r#"{"hooks": {"Stop": []}}"#).unwrap();
        assert!(config.is_empty());
    }

    #[test]
    fn test_identity_distinguishes_type() {
        let cmd = HookDefinition::command("check");
        let prompt = HookDefinition::prompt("check");
        assert_ne!(cmd.identity(), prompt.identity());
        assert_eq!(cmd.identity(), "command:check");
    }
}
