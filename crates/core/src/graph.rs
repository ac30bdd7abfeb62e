//! One rendering pass over a message list.
//!
//! Runs the branch detector and the sidechain grouper over the same input,
//! then lays the result out. The bundle owns its data so it can be handed to
//! a renderer or serialized as-is.

use crate::branch::{annotate_branches, branch_points, BranchPoint};
use crate::forest::IntegrityWarning;
use crate::layout::{layout, LayoutConfig, TreeLayout};
use crate::sidechain::{classify, group_by_parent, stats_for, SidechainStats, SidechainTypeInfo};
use crate::Message;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationGraph {
    /// Input messages with branch metadata merged in
    pub messages: Vec<Message>,
    pub branch_points: Vec<BranchPoint>,
    /// Parent id -> sidechain ids in timestamp order
    pub sidechain_groups: BTreeMap<String, Vec<String>>,
    pub sidechain_types: BTreeMap<String, SidechainTypeInfo>,
    pub sidechain_stats: SidechainStats,
    pub layout: TreeLayout,
}

impl ConversationGraph {
    pub fn build(messages: &[Message], config: &LayoutConfig) -> Self {
        let annotated = annotate_branches(messages);

        let groups = group_by_parent(messages);
        let sidechain_groups: BTreeMap<String, Vec<String>> = groups
            .iter()
            .map(|(parent, members)| {
                let ids: Vec<String> = members.iter().map(|m| m.id.clone()).collect();
                (parent.clone(), ids)
            })
            .collect();
        let sidechain_types: BTreeMap<String, SidechainTypeInfo> = groups
            .values()
            .flatten()
            .map(|m| (m.id.clone(), classify(m)))
            .collect();

        let layout = layout(&annotated, config);
        if !layout.warnings.is_empty() {
            tracing::warn!(
                count = layout.warnings.len(),
                "conversation has data integrity problems"
            );
        }

        Self {
            branch_points: branch_points(&annotated),
            sidechain_groups,
            sidechain_types,
            sidechain_stats: stats_for(messages),
            layout,
            messages: annotated,
        }
    }

    pub fn message(&self, id: &str) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    pub fn warnings(&self) -> &[IntegrityWarning] {
        &self.layout.warnings
    }
}
