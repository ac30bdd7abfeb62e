//! Sidechain grouping and classification.
//!
//! Sidechains are tool operations attached to a main-line message. They are
//! grouped under the parent they hang off and classified from their content.

use crate::{Message, MessageKind};
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::LazyLock;

/// Sidechain messages keyed by parent id, each group in timestamp order.
pub type SidechainGroups<'a> = BTreeMap<String, Vec<&'a Message>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SidechainType {
    File,
    Search,
    Web,
    Error,
    Tool,
    Unknown,
}

impl SidechainType {
    pub const ALL: [SidechainType; 6] = [
        Self::File,
        Self::Search,
        Self::Web,
        Self::Error,
        Self::Tool,
        Self::Unknown,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Search => "search",
            Self::Web => "web",
            Self::Error => "error",
            Self::Tool => "tool",
            Self::Unknown => "unknown",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::File => "File Operation",
            Self::Search => "Search",
            Self::Web => "Web",
            Self::Error => "Error",
            Self::Tool => "Tool",
            Self::Unknown => "Unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SidechainTypeInfo {
    #[serde(rename = "type")]
    pub kind: SidechainType,
    pub label: &'static str,
}

impl From<SidechainType> for SidechainTypeInfo {
    fn from(kind: SidechainType) -> Self {
        Self {
            kind,
            label: kind.label(),
        }
    }
}

/// Substring rule over a lower-cased tool name.
#[derive(Debug, Clone, Copy)]
pub struct ToolNameRule {
    pub category: SidechainType,
    pub needles: &'static [&'static str],
}

impl ToolNameRule {
    fn matches(&self, lowered: &str) -> bool {
        self.needles.iter().any(|needle| lowered.contains(needle))
    }
}

/// Tool-name rules in priority order; the first match wins.
///
/// Names overlap as substrings ("WebSearch" contains "search"), so `web`
/// must stay ahead of `search`.
pub const TOOL_NAME_RULES: &[ToolNameRule] = &[
    ToolNameRule {
        category: SidechainType::File,
        needles: &["read", "write", "edit", "glob", "ls"],
    },
    ToolNameRule {
        category: SidechainType::Web,
        needles: &["web", "fetch"],
    },
    ToolNameRule {
        category: SidechainType::Search,
        needles: &["grep", "search"],
    },
];

static ERROR_TEXT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)error|failed").expect("error text regex should compile"));

fn classify_tool_name(name: &str) -> SidechainType {
    let lowered = name.to_lowercase();
    TOOL_NAME_RULES
        .iter()
        .find(|rule| rule.matches(&lowered))
        .map_or(SidechainType::Tool, |rule| rule.category)
}

/// Tool name from a JSON-encoded invocation.
///
/// Accepts an object carrying `name`, `tool_name` or `tool`, or an array of
/// content blocks where the first named block wins.
fn tool_name_from_json(raw: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(raw).ok()?;
    let name_of = |v: &serde_json::Value| {
        ["name", "tool_name", "tool"]
            .iter()
            .find_map(|key| v.get(*key).and_then(|n| n.as_str()))
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
    };
    match &value {
        serde_json::Value::Array(blocks) => blocks.iter().find_map(name_of),
        other => name_of(other),
    }
}

fn classify_text(message: &Message) -> SidechainType {
    if ERROR_TEXT_RE.is_match(&message.raw_content) {
        SidechainType::Error
    } else if message.kind == MessageKind::ToolOutcome {
        SidechainType::Tool
    } else {
        SidechainType::Unknown
    }
}

/// Classify a sidechain message from its content.
pub fn classify(message: &Message) -> SidechainTypeInfo {
    if message.kind == MessageKind::ToolInvocation {
        if let Some(name) = tool_name_from_json(&message.raw_content) {
            return classify_tool_name(&name).into();
        }
    }
    classify_text(message).into()
}

/// Every sidechain-flagged message, orphans included.
pub fn sidechains_only(messages: &[Message]) -> Vec<&Message> {
    messages.iter().filter(|m| m.is_sidechain).collect()
}

/// Sidechain messages grouped by parent id.
///
/// Orphans (no parent id) are dropped. Groups are sorted by timestamp; equal
/// timestamps keep input order.
pub fn group_by_parent(messages: &[Message]) -> SidechainGroups<'_> {
    let mut groups: SidechainGroups<'_> = BTreeMap::new();
    for msg in messages.iter().filter(|m| m.is_sidechain) {
        if let Some(parent) = msg.parent() {
            groups.entry(parent.to_string()).or_default().push(msg);
        }
    }
    for group in groups.values_mut() {
        group.sort_by_key(|m| m.timestamp);
    }
    groups
}

pub fn list_for<'a>(messages: &'a [Message], parent_id: &str) -> Vec<&'a Message> {
    let mut list: Vec<&Message> = messages
        .iter()
        .filter(|m| m.is_sidechain && m.parent() == Some(parent_id))
        .collect();
    list.sort_by_key(|m| m.timestamp);
    list
}

pub fn count_for(messages: &[Message], parent_id: &str) -> usize {
    messages
        .iter()
        .filter(|m| m.is_sidechain && m.parent() == Some(parent_id))
        .count()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SidechainStats {
    /// Grouped sidechains only; orphans are not counted
    pub total_sidechains: usize,
    pub group_count: usize,
    pub type_distribution: BTreeMap<SidechainType, usize>,
    pub average_per_parent: f64,
}

pub fn stats_for(messages: &[Message]) -> SidechainStats {
    let groups = group_by_parent(messages);
    let mut type_distribution = BTreeMap::new();
    let mut total_sidechains = 0usize;
    for msg in groups.values().flatten() {
        total_sidechains += 1;
        *type_distribution.entry(classify(msg).kind).or_insert(0) += 1;
    }
    let group_count = groups.len();
    let average_per_parent = if group_count == 0 {
        0.0
    } else {
        total_sidechains as f64 / group_count as f64
    };
    SidechainStats {
        total_sidechains,
        group_count,
        type_distribution,
        average_per_parent,
    }
}
