//! Branch detection among alternative dialogue continuations.
//!
//! A branch exists wherever two or more main-line messages share a parent
//! (for example regenerated assistant responses). Siblings are ranked by
//! timestamp; equal timestamps keep their input (fetch) order.

use crate::{BranchMetadata, Message};
use serde::Serialize;
use std::collections::HashMap;

/// A parent with more than one main-line child.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchPoint {
    pub parent_id: String,
    /// Child ids in branch order
    pub alternative_ids: Vec<String>,
}

/// Main-line sibling groups keyed by parent id, each in branch order.
///
/// Groups hold input indices. Only groups with more than one member are
/// returned; the order of the returned list follows the first appearance of
/// each parent in the input.
fn sibling_groups(messages: &[Message]) -> Vec<(&str, Vec<usize>)> {
    let mut order: Vec<&str> = Vec::new();
    let mut by_parent: HashMap<&str, Vec<usize>> = HashMap::new();

    for (idx, msg) in messages.iter().enumerate() {
        if !msg.is_main_line() {
            continue;
        }
        let Some(parent) = msg.parent() else {
            continue;
        };
        by_parent
            .entry(parent)
            .or_insert_with(|| {
                order.push(parent);
                Vec::new()
            })
            .push(idx);
    }

    order
        .into_iter()
        .filter_map(|parent| {
            let mut members = by_parent.remove(parent)?;
            if members.len() < 2 {
                return None;
            }
            // `sort_by_key` is stable: equal timestamps keep fetch order.
            members.sort_by_key(|&idx| messages[idx].timestamp);
            Some((parent, members))
        })
        .collect()
}

/// Return a copy of `messages` with branch metadata attached.
///
/// The output is one-to-one with the input. Metadata is recomputed from
/// scratch: any annotation already present on an input message is replaced
/// or cleared.
pub fn annotate_branches(messages: &[Message]) -> Vec<Message> {
    let mut annotated: Vec<Message> = messages
        .iter()
        .cloned()
        .map(|mut msg| {
            msg.branch = None;
            msg
        })
        .collect();

    for (_, members) in sibling_groups(messages) {
        let sibling_ids: Vec<String> = members
            .iter()
            .map(|&idx| messages[idx].id.clone())
            .collect();
        let branch_count = members.len();
        for (rank, &idx) in members.iter().enumerate() {
            annotated[idx].branch = Some(BranchMetadata {
                branch_count,
                branch_index: rank + 1,
                sibling_ids: sibling_ids.clone(),
            });
        }
    }

    annotated
}

/// Every message in the same sibling group as `id`, including itself.
///
/// Expects annotated messages. Returns an empty list when `id` is unknown or
/// carries no branch metadata.
pub fn alternatives_of<'a>(messages: &'a [Message], id: &str) -> Vec<&'a Message> {
    let Some(target) = messages.iter().find(|m| m.id == id) else {
        return Vec::new();
    };
    let Some(meta) = target.branch.as_ref() else {
        return Vec::new();
    };

    let mut by_id: HashMap<&str, &Message> = HashMap::with_capacity(messages.len());
    for msg in messages {
        by_id.entry(msg.id.as_str()).or_insert(msg);
    }
    meta.sibling_ids
        .iter()
        .filter_map(|sibling| by_id.get(sibling.as_str()).copied())
        .collect()
}

pub fn is_branched(message: &Message) -> bool {
    message
        .branch
        .as_ref()
        .is_some_and(|meta| meta.branch_count > 1)
}

/// `"Branch {index} of {count}"`, or an empty string when not branched.
pub fn branch_label(message: &Message) -> String {
    match message.branch.as_ref() {
        Some(meta) if meta.branch_count > 1 => {
            format!("Branch {} of {}", meta.branch_index, meta.branch_count)
        }
        _ => String::new(),
    }
}

/// All branch points, ordered by the timestamp of their earliest alternative.
pub fn branch_points(messages: &[Message]) -> Vec<BranchPoint> {
    let mut points: Vec<_> = sibling_groups(messages)
        .into_iter()
        .map(|(parent, members)| {
            let earliest = messages[members[0]].timestamp;
            let point = BranchPoint {
                parent_id: parent.to_string(),
                alternative_ids: members
                    .iter()
                    .map(|&idx| messages[idx].id.clone())
                    .collect(),
            };
            (earliest, point)
        })
        .collect();
    points.sort_by_key(|(earliest, _)| *earliest);
    points.into_iter().map(|(_, point)| point).collect()
}
