//! Event payloads written to hook stdin, and match subjects.
//!
//! Host event data may use either the Claude field names (`tool_name`,
//! `tool_input`, `tool_result`) or the short forms (`name`, `input`,
//! `result`); payloads always use the Claude names.

use chrono::{SecondsFormat, Utc};
use hookbridge_types::HookEvent;
use serde_json::{Map, Value, json};

/// Session id used when the event data carries none.
pub const UNKNOWN_SESSION: &str = "unknown";

/// Default SessionStart trigger.
pub const DEFAULT_TRIGGER: &str = "startup";

/// Current UTC time as ISO-8601 with a `Z` suffix.
pub fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Session id from event data.
pub fn session_id(data: &Value) -> &str {
    str_field(data, &["session_id"]).unwrap_or(UNKNOWN_SESSION)
}

/// The string a group's matcher is tested against for this event.
pub fn match_subject(event: HookEvent, data: &Value) -> String {
    match event {
        HookEvent::SessionStart => str_field(data, &["trigger", "source"])
            .unwrap_or(DEFAULT_TRIGGER)
            .to_string(),
        _ => str_field(data, &["tool_name", "name"])
            .unwrap_or_default()
            .to_string(),
    }
}

/// Build the stdin payload for an event, stamped with the current time.
pub fn build_payload(event: HookEvent, data: &Value) -> Value {
    build_payload_at(event, data, &timestamp_now())
}

/// Build the stdin payload for an event with an explicit timestamp.
pub fn build_payload_at(event: HookEvent, data: &Value, timestamp: &str) -> Value {
    let session = session_id(data);
    let tool_name = str_field(data, &["tool_name", "name"]).unwrap_or_default();
    let tool_input = value_field(data, &["tool_input", "input"])
        .cloned()
        .unwrap_or_else(|| json!({}));

    let mut payload = match event {
        HookEvent::PreToolUse => json!({
            "tool_name": tool_name,
            "tool_input": tool_input,
        }),
        HookEvent::PostToolUse => json!({
            "tool_name": tool_name,
            "tool_input": tool_input,
            "tool_result": value_field(data, &["tool_result", "result"]).cloned().unwrap_or(Value::Null),
        }),
        HookEvent::PostToolUseFailure => json!({
            "tool_name": tool_name,
            "tool_input": tool_input,
            "error": value_field(data, &["error"]).cloned().unwrap_or(Value::Null),
        }),
        HookEvent::UserPromptSubmit => json!({
            "prompt": str_field(data, &["prompt"]).unwrap_or_default(),
        }),
        HookEvent::SessionStart => json!({
            "trigger": str_field(data, &["trigger", "source"]).unwrap_or(DEFAULT_TRIGGER),
        }),
        HookEvent::SessionEnd => json!({}),
        _ => match data {
            Value::Object(map) => Value::Object(map.clone()),
            Value::Null => json!({}),
            other => json!({ "data": other }),
        },
    };

    if let Value::Object(map) = &mut payload {
        map.insert("hook_event_name".into(), Value::String(event.to_string()));
        map.insert("session_id".into(), Value::String(session.to_string()));
        map.insert("timestamp".into(), Value::String(timestamp.to_string()));
    }
    payload
}

fn value_field<'a>(data: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    let map: &Map<String, Value> = data.as_object()?;
    keys.iter().find_map(|k| map.get(*k).filter(|v| !v.is_null()))
}

fn str_field<'a>(data: &'a Value, keys: &[&str]) -> Option<&'a str> {
    let map = data.as_object()?;
    keys.iter().find_map(|k| map.get(*k).and_then(Value::as_str))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TS: &str = "2026-01-01T00:00:00.000000Z";

    #[test]
    fn test_pre_tool_use_payload() {
        let data = json!({"session_id": "s1", "tool_name": "Bash", "tool_input": {"command": "ls"}});
        let payload = build_payload_at(HookEvent::PreToolUse, &data, TS);
        assert_eq!(
            payload,
            json!({
                "hook_event_name": "PreToolUse",
                "tool_name": "Bash",
                "tool_input": {"command": "ls"},
                "session_id": "s1",
                "timestamp": TS,
            })
        );
    }

    #[test]
    fn test_short_field_names_accepted() {
        let data = json!({"name": "Edit", "input": {"file": "a.rs"}, "result": "ok"});
        let payload = build_payload_at(HookEvent::PostToolUse, &data, TS);
        assert_eq!(payload["tool_name"], "Edit");
        assert_eq!(payload["tool_input"]["file"], "a.rs");
        assert_eq!(payload["tool_result"], "ok");
        assert_eq!(payload["session_id"], UNKNOWN_SESSION);
    }

    #[test]
    fn test_session_start_defaults_trigger() {
        let payload = build_payload_at(HookEvent::SessionStart, &json!({"session_id": "s"}), TS);
        assert_eq!(payload["trigger"], "startup");
        assert_eq!(match_subject(HookEvent::SessionStart, &json!({})), "startup");
        assert_eq!(
            match_subject(HookEvent::SessionStart, &json!({"trigger": "resume"})),
            "resume"
        );
    }

    #[test]
    fn test_prompt_and_failure_payloads() {
        let prompt = build_payload_at(HookEvent::UserPromptSubmit, &json!({"prompt": "hi"}), TS);
        assert_eq!(prompt["prompt"], "hi");
        assert!(prompt.get("tool_name").is_none());

        let failure = build_payload_at(
            HookEvent::PostToolUseFailure,
            &json!({"tool_name": "Bash", "error": "exit 1"}),
            TS,
        );
        assert_eq!(failure["error"], "exit 1");
    }

    #[test]
    fn test_other_events_pass_data_through() {
        let payload = build_payload_at(
            HookEvent::Notification,
            &json!({"message": "waiting", "session_id": "s9"}),
            TS,
        );
        assert_eq!(payload["message"], "waiting");
        assert_eq!(payload["hook_event_name"], "Notification");
        assert_eq!(payload["session_id"], "s9");
    }

    #[test]
    fn test_match_subject_tool_name() {
        assert_eq!(
            match_subject(HookEvent::PreToolUse, &json!({"tool_name": "Write"})),
            "Write"
        );
        assert_eq!(match_subject(HookEvent::Stop, &json!({})), "");
    }

    #[test]
    fn test_timestamp_is_utc_z() {
        let ts = timestamp_now();
        assert!(ts.ends_with('Z'));
        assert!(chrono::DateTime::parse_from_rfc3339(&ts).is_ok());
    }
}
