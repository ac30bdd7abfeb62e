//! The dashboard's own message format: a JSON array of messages, or JSONL
//! with one message object per line.

use crate::MessageParser;
use anyhow::{Context, Result};
use threadline_core::Message;

pub struct NativeParser;

impl MessageParser for NativeParser {
    fn name(&self) -> &str {
        "messages"
    }

    fn can_parse(&self, line: &str) -> bool {
        let trimmed = line.trim_start();
        trimmed.starts_with('[') || serde_json::from_str::<Message>(trimmed).is_ok()
    }

    fn parse_str(&self, text: &str) -> Result<Vec<Message>> {
        parse_messages(text)
    }
}

pub fn parse_messages(text: &str) -> Result<Vec<Message>> {
    let trimmed = text.trim_start();
    if trimmed.starts_with('[') {
        return serde_json::from_str(trimmed).context("Failed to parse message array");
    }

    let mut messages = Vec::new();
    for (line_no, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let message: Message = serde_json::from_str(line)
            .with_context(|| format!("Invalid message at line {}", line_no + 1))?;
        messages.push(message);
    }
    Ok(messages)
}
