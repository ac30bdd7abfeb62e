use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single recorded conversation message.
///
/// Messages arrive as a flat list (possibly one page of a longer
/// conversation). Tree structure is implied by `parent_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Stable identifier, unique within a conversation
    pub id: String,
    /// Parent message id; `None` for conversation roots
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    /// When this message was recorded (not guaranteed unique)
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type", alias = "kind")]
    pub kind: MessageKind,
    /// Set upstream for out-of-band tool operations
    #[serde(default)]
    pub is_sidechain: bool,
    /// Free text, or JSON for tool invocations
    #[serde(default)]
    pub raw_content: String,
    /// Filled by [`crate::branch::annotate_branches`]
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub branch: Option<BranchMetadata>,
}

impl Message {
    pub fn new(
        id: impl Into<String>,
        parent_id: Option<String>,
        timestamp: DateTime<Utc>,
        kind: MessageKind,
    ) -> Self {
        Self {
            id: id.into(),
            parent_id,
            timestamp,
            kind,
            is_sidechain: false,
            raw_content: String::new(),
            branch: None,
        }
    }

    pub fn with_content(mut self, raw_content: impl Into<String>) -> Self {
        self.raw_content = raw_content.into();
        self
    }

    pub fn sidechain(mut self) -> Self {
        self.is_sidechain = true;
        self
    }

    /// Parent id with empty strings treated as absent.
    pub fn parent(&self) -> Option<&str> {
        self.parent_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }

    /// Whether this message can take part in dialogue branching.
    ///
    /// Sidechain-flagged and tool messages are operational side effects of
    /// a turn, never alternative continuations.
    pub fn is_main_line(&self) -> bool {
        !self.is_sidechain && !self.kind.is_tool()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    User,
    Assistant,
    #[serde(alias = "tool_use")]
    ToolInvocation,
    #[serde(alias = "tool_result")]
    ToolOutcome,
    System,
}

impl MessageKind {
    pub fn is_tool(self) -> bool {
        matches!(self, Self::ToolInvocation | Self::ToolOutcome)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::ToolInvocation => "tool_invocation",
            Self::ToolOutcome => "tool_outcome",
            Self::System => "system",
        }
    }
}

/// Position of a message among alternative continuations of one parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchMetadata {
    /// Size of the sibling group (always > 1)
    pub branch_count: usize,
    /// 1-based rank among siblings, timestamp ascending
    pub branch_index: usize,
    /// Ordered sibling ids, including this message
    pub sibling_ids: Vec<String>,
}
