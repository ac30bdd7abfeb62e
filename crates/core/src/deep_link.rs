use crate::branch::alternatives_of;
use crate::Message;
use chrono::SecondsFormat;
use std::fmt;

pub const PARAM_MESSAGE_ID: &str = "messageId";
pub const PARAM_BRANCH_INDEX: &str = "branchIndex";
pub const PARAM_TIMESTAMP: &str = "t";

/// Query-string reference to a single message, optionally pinned to a branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeepLink {
    pub message_id: String,
    /// 1-based; only present for messages with branch alternatives
    pub branch_index: Option<usize>,
    /// Raw timestamp as carried in the `t` parameter
    pub timestamp: Option<String>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DeepLinkError {
    #[error("missing messageId parameter")]
    MissingMessageId,
    #[error("invalid branchIndex: {0}")]
    InvalidBranchIndex(String),
    #[error("invalid query encoding: {0}")]
    InvalidEncoding(String),
}

impl DeepLink {
    /// Link to `message`. `branchIndex` is only carried when the message has
    /// alternatives, so a plain link never implies branch context.
    pub fn for_message(message: &Message) -> Self {
        let branch_index = message
            .branch
            .as_ref()
            .filter(|meta| meta.branch_count > 1)
            .map(|meta| meta.branch_index);
        Self {
            message_id: message.id.clone(),
            branch_index,
            timestamp: Some(
                message
                    .timestamp
                    .to_rfc3339_opts(SecondsFormat::AutoSi, true),
            ),
        }
    }

    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![(PARAM_MESSAGE_ID, self.message_id.clone())];
        if let Some(index) = self.branch_index {
            pairs.push((PARAM_BRANCH_INDEX, index.to_string()));
        }
        if let Some(ts) = &self.timestamp {
            pairs.push((PARAM_TIMESTAMP, ts.clone()));
        }
        pairs
    }

    pub fn to_query_string(&self) -> String {
        self.to_string()
    }

    /// Parse a query string, with or without a leading `?`.
    ///
    /// Unknown parameters are ignored; for repeated parameters the last one
    /// wins.
    pub fn parse(query: &str) -> Result<Self, DeepLinkError> {
        let query = query.trim().trim_start_matches('?');
        let mut message_id = None;
        let mut branch_index = None;
        let mut timestamp = None;

        for pair in query.split('&').filter(|pair| !pair.is_empty()) {
            let (raw_key, raw_value) = pair.split_once('=').unwrap_or((pair, ""));
            let key = decode_component(raw_key)?;
            let value = decode_component(raw_value)?;
            match key.as_str() {
                PARAM_MESSAGE_ID => message_id = Some(value),
                PARAM_BRANCH_INDEX => branch_index = Some(parse_branch_index(&value)?),
                PARAM_TIMESTAMP => timestamp = Some(value),
                _ => {}
            }
        }

        let message_id = message_id
            .filter(|id| !id.trim().is_empty())
            .ok_or(DeepLinkError::MissingMessageId)?;
        Ok(Self {
            message_id,
            branch_index,
            timestamp,
        })
    }

    /// The message this link points at within annotated `messages`.
    ///
    /// When `branch_index` names a different member of the linked message's
    /// sibling group, that sibling is returned instead.
    pub fn resolve<'a>(&self, messages: &'a [Message]) -> Option<&'a Message> {
        let target = messages.iter().find(|m| m.id == self.message_id)?;
        let Some(index) = self.branch_index else {
            return Some(target);
        };
        let alternatives = alternatives_of(messages, &target.id);
        Some(
            index
                .checked_sub(1)
                .and_then(|slot| alternatives.get(slot).copied())
                .unwrap_or(target),
        )
    }
}

impl fmt::Display for DeepLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let encoded = self
            .to_query_pairs()
            .into_iter()
            .map(|(key, value)| format!("{key}={}", urlencoding::encode(&value)))
            .collect::<Vec<_>>()
            .join("&");
        f.write_str(&encoded)
    }
}

fn decode_component(raw: &str) -> Result<String, DeepLinkError> {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|decoded| decoded.into_owned())
        .map_err(|_| DeepLinkError::InvalidEncoding(raw.to_string()))
}

fn parse_branch_index(value: &str) -> Result<usize, DeepLinkError> {
    match value.trim().parse::<usize>() {
        Ok(index) if index >= 1 => Ok(index),
        _ => Err(DeepLinkError::InvalidBranchIndex(value.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::branch::annotate_branches;
    use crate::testing::{assistant, user};

    fn conversation() -> Vec<Message> {
        annotate_branches(&[
            user("root", None, 0),
            assistant("first", Some("root"), 1),
            assistant("second", Some("root"), 2),
            user("next", Some("second"), 3),
        ])
    }

    #[test]
    fn branched_message_roundtrip() {
        let msgs = conversation();
        let link = DeepLink::for_message(&msgs[2]);
        assert_eq!(link.branch_index, Some(2));

        let query = link.to_query_string();
        assert!(query.starts_with("messageId=second&branchIndex=2&t="));

        let parsed = DeepLink::parse(&query).expect("parse link");
        assert_eq!(parsed, link);
        assert_eq!(parsed.message_id, "second");
        assert_eq!(parsed.branch_index, Some(2));
    }

    #[test]
    fn unbranched_message_has_no_branch_param() {
        let msgs = conversation();
        let link = DeepLink::for_message(&msgs[3]);
        assert_eq!(link.branch_index, None);
        assert!(!link.to_query_string().contains("branchIndex"));
        assert!(link
            .to_query_pairs()
            .iter()
            .all(|(key, _)| *key != PARAM_BRANCH_INDEX));
    }

    #[test]
    fn timestamp_is_rfc3339_and_percent_encoded() {
        let msgs = conversation();
        let link = DeepLink::for_message(&msgs[0]);
        assert_eq!(link.timestamp.as_deref(), Some("2025-01-01T00:00:00Z"));
        assert!(link.to_query_string().contains("t=2025-01-01T00%3A00%3A00Z"));
    }

    #[test]
    fn encodes_awkward_ids() {
        let link = DeepLink {
            message_id: "a b&c=d/é".to_string(),
            branch_index: Some(3),
            timestamp: None,
        };
        let parsed = DeepLink::parse(&format!("?{link}")).expect("parse");
        assert_eq!(parsed, link);
    }

    #[test]
    fn parse_ignores_unknown_params() {
        let parsed = DeepLink::parse("?view=tree&messageId=m1&x").expect("parse");
        assert_eq!(parsed.message_id, "m1");
        assert_eq!(parsed.branch_index, None);
        assert_eq!(parsed.timestamp, None);
    }

    #[test]
    fn parse_rejects_bad_input() {
        assert_eq!(
            DeepLink::parse("branchIndex=2"),
            Err(DeepLinkError::MissingMessageId)
        );
        assert_eq!(DeepLink::parse("messageId="), Err(DeepLinkError::MissingMessageId));
        assert_eq!(
            DeepLink::parse("messageId=m&branchIndex=0"),
            Err(DeepLinkError::InvalidBranchIndex("0".to_string()))
        );
        assert_eq!(
            DeepLink::parse("messageId=m&branchIndex=two"),
            Err(DeepLinkError::InvalidBranchIndex("two".to_string()))
        );
        assert!(matches!(
            DeepLink::parse("messageId=%FF"),
            Err(DeepLinkError::InvalidEncoding(_))
        ));
    }

    #[test]
    fn resolve_prefers_requested_branch() {
        let msgs = conversation();
        let pinned = DeepLink {
            message_id: "first".to_string(),
            branch_index: Some(2),
            timestamp: None,
        };
        assert_eq!(pinned.resolve(&msgs).map(|m| m.id.as_str()), Some("second"));

        let plain = DeepLink::for_message(&msgs[3]);
        assert_eq!(plain.resolve(&msgs).map(|m| m.id.as_str()), Some("next"));

        let out_of_range = DeepLink {
            message_id: "first".to_string(),
            branch_index: Some(9),
            timestamp: None,
        };
        assert_eq!(out_of_range.resolve(&msgs).map(|m| m.id.as_str()), Some("first"));

        let missing = DeepLink {
            message_id: "gone".to_string(),
            branch_index: None,
            timestamp: None,
        };
        assert!(missing.resolve(&msgs).is_none());
    }
}
