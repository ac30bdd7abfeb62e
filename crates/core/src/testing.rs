use crate::{Message, MessageKind};
use chrono::{DateTime, TimeZone, Utc};

/// Fixed base instant so test orderings never depend on the wall clock.
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or_default()
}

/// Message at `base_time() + secs`.
pub fn message(id: &str, parent: Option<&str>, secs: i64, kind: MessageKind) -> Message {
    Message::new(
        id,
        parent.map(str::to_string),
        base_time() + chrono::Duration::seconds(secs),
        kind,
    )
}

/// Main-line user turn.
pub fn user(id: &str, parent: Option<&str>, secs: i64) -> Message {
    message(id, parent, secs, MessageKind::User)
}

/// Main-line assistant turn.
pub fn assistant(id: &str, parent: Option<&str>, secs: i64) -> Message {
    message(id, parent, secs, MessageKind::Assistant)
}

/// Sidechain tool invocation calling `tool` with empty arguments.
pub fn tool_call(id: &str, parent: Option<&str>, secs: i64, tool: &str) -> Message {
    message(id, parent, secs, MessageKind::ToolInvocation)
        .sidechain()
        .with_content(serde_json::json!({ "name": tool, "input": {} }).to_string())
}

/// Sidechain tool outcome with free-text content.
pub fn tool_result(id: &str, parent: Option<&str>, secs: i64, text: &str) -> Message {
    message(id, parent, secs, MessageKind::ToolOutcome)
        .sidechain()
        .with_content(text)
}
