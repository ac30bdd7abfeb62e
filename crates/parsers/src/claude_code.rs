use crate::MessageParser;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::io::BufRead;
use std::path::Path;
use threadline_core::{Message, MessageKind};

pub struct ClaudeCodeParser;

/// Transcript entries without a `uuid` that only carry session metadata.
const METADATA_ENTRY_TYPES: &[&str] = &["file-history-snapshot", "queue-operation"];

impl MessageParser for ClaudeCodeParser {
    fn name(&self) -> &str {
        "claude-code"
    }

    fn can_parse(&self, line: &str) -> bool {
        let Ok(value) = serde_json::from_str::<serde_json::Value>(line) else {
            return false;
        };
        if value.get("uuid").is_some() || value.get("parentUuid").is_some() {
            return true;
        }
        match value.get("type").and_then(serde_json::Value::as_str) {
            Some("summary") => value.get("leafUuid").is_some(),
            Some(kind) => METADATA_ENTRY_TYPES.contains(&kind),
            None => false,
        }
    }

    fn parse_str(&self, text: &str) -> Result<Vec<Message>> {
        Ok(parse_transcript(text.as_bytes()))
    }
}

// ── Raw JSONL deserialization types ──────────────────────────────────────────

/// One line of a Claude Code transcript.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum RawEntry {
    #[serde(rename = "user")]
    User(RawConversationEntry),
    #[serde(rename = "assistant")]
    Assistant(RawConversationEntry),
    #[serde(rename = "system")]
    System(RawSystemEntry),
    // summary, file-history-snapshot, progress, ...
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawConversationEntry {
    uuid: String,
    #[serde(default)]
    parent_uuid: Option<String>,
    timestamp: String,
    #[serde(default)]
    is_sidechain: bool,
    message: RawMessage,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSystemEntry {
    uuid: String,
    #[serde(default)]
    parent_uuid: Option<String>,
    timestamp: String,
    #[serde(default)]
    is_sidechain: bool,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawMessage {
    content: RawContent,
}

/// Message content is either a plain string or an array of content blocks.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawContent {
    Text(String),
    Blocks(Vec<RawContentBlock>),
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum RawContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "tool_use")]
    ToolUse {
        name: String,
        #[serde(default)]
        input: serde_json::Value,
    },
    #[serde(rename = "tool_result")]
    ToolResult {
        #[serde(default)]
        content: ToolResultContent,
        #[serde(default)]
        is_error: bool,
    },
    // thinking, image, ...
    #[serde(other)]
    Other,
}

/// tool_result content can be a string, array of blocks, or absent
#[derive(Debug, Default, Deserialize)]
#[serde(untagged)]
enum ToolResultContent {
    Text(String),
    Blocks(Vec<ToolResultBlock>),
    #[default]
    Null,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ToolResultBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

impl ToolResultContent {
    fn to_text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Blocks(blocks) => blocks
                .iter()
                .filter_map(|block| match block {
                    ToolResultBlock::Text { text } => Some(text.as_str()),
                    ToolResultBlock::Other => None,
                })
                .collect::<Vec<_>>()
                .join("\n"),
            Self::Null => String::new(),
        }
    }
}

// ── Parsing logic ───────────────────────────────────────────────────────────

pub fn parse_path(path: &Path) -> Result<Vec<Message>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open JSONL file: {}", path.display()))?;
    Ok(parse_transcript(std::io::BufReader::new(file)))
}

/// Convert every user/assistant/system line into a [`Message`].
///
/// Unreadable lines, malformed JSON, other entry types and unparsable
/// timestamps are skipped.
pub fn parse_transcript<R: BufRead>(reader: R) -> Vec<Message> {
    let mut messages = Vec::new();

    for (line_no, line_result) in reader.lines().enumerate() {
        let line = match line_result {
            Ok(l) => l,
            Err(e) => {
                tracing::warn!("Failed to read JSONL line {}: {}", line_no + 1, e);
                continue;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let entry: RawEntry = match serde_json::from_str(&line) {
            Ok(e) => e,
            Err(e) => {
                tracing::debug!("Skipping unparseable JSONL line {}: {}", line_no + 1, e);
                continue;
            }
        };

        let converted = match entry {
            RawEntry::Unknown => continue,
            RawEntry::User(conv) => convert_user(conv),
            RawEntry::Assistant(conv) => convert_assistant(conv),
            RawEntry::System(sys) => convert_system(sys),
        };
        match converted {
            Ok(message) => messages.push(message),
            Err(e) => tracing::debug!("Skipping JSONL line {}: {:#}", line_no + 1, e),
        }
    }

    messages
}

fn convert_user(conv: RawConversationEntry) -> Result<Message> {
    let timestamp = parse_timestamp(&conv.timestamp)?;
    let (kind, raw_content) = match &conv.message.content {
        RawContent::Text(text) => (MessageKind::User, text.clone()),
        RawContent::Blocks(blocks) => {
            let all_results = !blocks.is_empty()
                && blocks
                    .iter()
                    .all(|b| matches!(b, RawContentBlock::ToolResult { .. }));
            if all_results {
                (MessageKind::ToolOutcome, tool_results_text(blocks))
            } else {
                (MessageKind::User, joined_text(blocks))
            }
        }
    };
    Ok(build(conv.uuid, conv.parent_uuid, timestamp, kind, conv.is_sidechain, raw_content))
}

fn convert_assistant(conv: RawConversationEntry) -> Result<Message> {
    let timestamp = parse_timestamp(&conv.timestamp)?;
    let tool_use = match &conv.message.content {
        RawContent::Blocks(blocks) => blocks.iter().find_map(|b| match b {
            RawContentBlock::ToolUse { name, input } => Some((name, input)),
            _ => None,
        }),
        RawContent::Text(_) => None,
    };
    let (kind, raw_content) = match (tool_use, &conv.message.content) {
        (Some((name, input)), _) => (
            MessageKind::ToolInvocation,
            serde_json::json!({ "name": name, "input": input }).to_string(),
        ),
        (None, RawContent::Text(text)) => (MessageKind::Assistant, text.clone()),
        (None, RawContent::Blocks(blocks)) => (MessageKind::Assistant, joined_text(blocks)),
    };
    Ok(build(conv.uuid, conv.parent_uuid, timestamp, kind, conv.is_sidechain, raw_content))
}

fn convert_system(sys: RawSystemEntry) -> Result<Message> {
    let timestamp = parse_timestamp(&sys.timestamp)?;
    Ok(build(
        sys.uuid,
        sys.parent_uuid,
        timestamp,
        MessageKind::System,
        sys.is_sidechain,
        sys.content.unwrap_or_default(),
    ))
}

fn build(
    id: String,
    parent_id: Option<String>,
    timestamp: DateTime<Utc>,
    kind: MessageKind,
    is_sidechain: bool,
    raw_content: String,
) -> Message {
    let mut message = Message::new(id, parent_id, timestamp, kind).with_content(raw_content);
    message.is_sidechain = is_sidechain;
    message
}

fn joined_text(blocks: &[RawContentBlock]) -> String {
    blocks
        .iter()
        .filter_map(|b| match b {
            RawContentBlock::Text { text } => Some(text.as_str()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Result text; failed results are prefixed with `Error:` so the failure
/// survives into the message text.
fn tool_results_text(blocks: &[RawContentBlock]) -> String {
    blocks
        .iter()
        .filter_map(|b| match b {
            RawContentBlock::ToolResult { content, is_error } => {
                let text = content.to_text();
                Some(if *is_error {
                    format!("Error: {text}")
                } else {
                    text
                })
            }
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub(crate) fn parse_timestamp(ts: &str) -> Result<DateTime<Utc>> {
    // Claude Code timestamps are ISO 8601, e.g. "2026-02-06T04:46:17.839Z"
    DateTime::parse_from_rfc3339(ts)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            chrono::NaiveDateTime::parse_from_str(ts, "%Y-%m-%dT%H:%M:%S%.f")
                .map(|ndt| ndt.and_utc())
        })
        .with_context(|| format!("Failed to parse timestamp: {}", ts))
}
