//! Explicit parent/child structure over a flat message list.
//!
//! The forest is an arena of message references with index-based parent and
//! children lists. It is rebuilt for every invocation and never mutated
//! afterwards, so it is acyclic by construction: parent cycles found in the
//! input are broken and reported as [`IntegrityWarning`]s.

use crate::Message;
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IntegrityWarning {
    /// A later message reused an id; it was left out of the forest
    DuplicateId { id: String },
    /// A message named itself as its parent; it was treated as a root
    SelfParent { id: String },
    /// Parent links formed a loop; `rooted_at` was cut loose as a root
    Cycle { rooted_at: String },
}

#[derive(Debug)]
pub struct ConversationForest<'a> {
    nodes: Vec<&'a Message>,
    parents: Vec<Option<usize>>,
    children: Vec<Vec<usize>>,
    roots: Vec<usize>,
    warnings: Vec<IntegrityWarning>,
}

impl<'a> ConversationForest<'a> {
    pub fn build(messages: &'a [Message]) -> Self {
        let mut warnings = Vec::new();
        let mut nodes: Vec<&'a Message> = Vec::with_capacity(messages.len());
        let mut index: HashMap<&'a str, usize> = HashMap::with_capacity(messages.len());

        for msg in messages {
            if index.contains_key(msg.id.as_str()) {
                tracing::warn!(id = %msg.id, "duplicate message id; ignoring later occurrence");
                warnings.push(IntegrityWarning::DuplicateId { id: msg.id.clone() });
                continue;
            }
            index.insert(msg.id.as_str(), nodes.len());
            nodes.push(msg);
        }

        let mut parents: Vec<Option<usize>> = Vec::with_capacity(nodes.len());
        for msg in &nodes {
            let parent = match msg.parent() {
                None => None,
                Some(pid) if pid == msg.id => {
                    tracing::warn!(id = %msg.id, "message is its own parent; treating as root");
                    warnings.push(IntegrityWarning::SelfParent { id: msg.id.clone() });
                    None
                }
                Some(pid) => {
                    let found = index.get(pid).copied();
                    if found.is_none() {
                        tracing::debug!(id = %msg.id, parent = pid, "parent not loaded; treating as root");
                    }
                    found
                }
            };
            parents.push(parent);
        }

        let mut forest = Self {
            children: vec![Vec::new(); nodes.len()],
            roots: Vec::new(),
            nodes,
            parents,
            warnings,
        };
        forest.link_children();
        forest.break_cycles();
        forest.sort_links();
        forest
    }

    fn link_children(&mut self) {
        for (child, parent) in self.parents.iter().enumerate() {
            match parent {
                Some(parent) => self.children[*parent].push(child),
                None => self.roots.push(child),
            }
        }
    }

    /// Nodes unreachable from any root sit on or below a parent cycle. For
    /// each such node the loop above it is found and its earliest member in
    /// input order is cut loose as a new root, until everything is reachable.
    fn break_cycles(&mut self) {
        let mut reached = vec![false; self.nodes.len()];
        let mut stack: Vec<usize> = self.roots.clone();
        self.mark_reachable(&mut stack, &mut reached);

        for candidate in 0..self.nodes.len() {
            if reached[candidate] {
                continue;
            }
            let cut = self.earliest_on_loop(candidate);
            if let Some(parent) = self.parents[cut].take() {
                self.children[parent].retain(|&c| c != cut);
            }
            tracing::warn!(id = %self.nodes[cut].id, "parent cycle detected; treating message as root");
            self.warnings.push(IntegrityWarning::Cycle {
                rooted_at: self.nodes[cut].id.clone(),
            });
            self.roots.push(cut);
            stack.push(cut);
            self.mark_reachable(&mut stack, &mut reached);
        }
    }

    /// Follows parent links from `start` until a node repeats and returns the
    /// lowest index on the loop.
    fn earliest_on_loop(&self, start: usize) -> usize {
        let mut step_of: HashMap<usize, usize> = HashMap::new();
        let mut path = Vec::new();
        let mut node = start;
        loop {
            if let Some(&step) = step_of.get(&node) {
                return path[step..].iter().copied().min().unwrap_or(node);
            }
            step_of.insert(node, path.len());
            path.push(node);
            match self.parents[node] {
                Some(parent) => node = parent,
                None => return node,
            }
        }
    }

    fn mark_reachable(&self, stack: &mut Vec<usize>, reached: &mut [bool]) {
        while let Some(node) = stack.pop() {
            if reached[node] {
                continue;
            }
            reached[node] = true;
            stack.extend(self.children[node].iter().copied());
        }
    }

    fn sort_links(&mut self) {
        let nodes = &self.nodes;
        let order = |&idx: &usize| (nodes[idx].timestamp, idx);
        self.roots.sort_by_key(order);
        for list in &mut self.children {
            list.sort_by_key(order);
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn message(&self, node: usize) -> &'a Message {
        self.nodes[node]
    }

    pub fn parent(&self, node: usize) -> Option<usize> {
        self.parents[node]
    }

    /// Children in `(timestamp, input order)` order.
    pub fn children(&self, node: usize) -> &[usize] {
        &self.children[node]
    }

    /// Roots in `(timestamp, input order)` order.
    pub fn roots(&self) -> &[usize] {
        &self.roots
    }

    pub fn warnings(&self) -> &[IntegrityWarning] {
        &self.warnings
    }

    /// A sidechain whose parent is on the main line starts a detached subtree.
    pub fn is_detached(&self, node: usize) -> bool {
        let msg = self.nodes[node];
        msg.is_sidechain
            && self.parents[node].is_some_and(|parent| !self.nodes[parent].is_sidechain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{assistant, tool_call, user};

    fn ids(forest: &ConversationForest<'_>, nodes: &[usize]) -> Vec<String> {
        nodes
            .iter()
            .map(|&n| forest.message(n).id.clone())
            .collect()
    }

    #[test]
    fn builds_children_in_timestamp_order() {
        let msgs = vec![
            user("root", None, 0),
            assistant("b", Some("root"), 2),
            assistant("a", Some("root"), 1),
            user("c", Some("a"), 3),
        ];
        let forest = ConversationForest::build(&msgs);
        assert_eq!(forest.len(), 4);
        assert_eq!(ids(&forest, forest.roots()), ["root"]);
        assert_eq!(ids(&forest, forest.children(0)), ["a", "b"]);
        assert_eq!(forest.parent(3).map(|p| forest.message(p).id.as_str()), Some("a"));
        assert!(forest.warnings().is_empty());
    }

    #[test]
    fn dangling_parent_becomes_root() {
        let msgs = vec![assistant("a", Some("not-loaded"), 5), user("r", None, 1)];
        let forest = ConversationForest::build(&msgs);
        assert_eq!(ids(&forest, forest.roots()), ["r", "a"]);
        assert!(forest.warnings().is_empty());
    }

    #[test]
    fn self_parent_is_rooted_with_warning() {
        let msgs = vec![user("loop", Some("loop"), 0)];
        let forest = ConversationForest::build(&msgs);
        assert_eq!(forest.roots(), [0]);
        assert_eq!(
            forest.warnings(),
            [IntegrityWarning::SelfParent { id: "loop".into() }]
        );
    }

    #[test]
    fn cycles_are_broken_at_earliest_input() {
        let msgs = vec![
            user("x", Some("z"), 0),
            user("y", Some("x"), 1),
            user("z", Some("y"), 2),
            user("tail", Some("z"), 3),
        ];
        let forest = ConversationForest::build(&msgs);
        assert_eq!(ids(&forest, forest.roots()), ["x"]);
        assert_eq!(forest.parent(0), None);
        assert_eq!(ids(&forest, forest.children(2)), ["tail"]);
        assert_eq!(
            forest.warnings(),
            [IntegrityWarning::Cycle { rooted_at: "x".into() }]
        );
    }

    #[test]
    fn tail_listed_before_cycle_keeps_its_parent() {
        let msgs = vec![
            user("tail", Some("z"), 3),
            user("x", Some("z"), 0),
            user("y", Some("x"), 1),
            user("z", Some("y"), 2),
        ];
        let forest = ConversationForest::build(&msgs);
        assert_eq!(ids(&forest, forest.roots()), ["x"]);
        assert_eq!(forest.parent(0).map(|p| forest.message(p).id.as_str()), Some("z"));
        assert_eq!(
            forest.warnings(),
            [IntegrityWarning::Cycle { rooted_at: "x".into() }]
        );
    }

    #[test]
    fn duplicate_ids_keep_first() {
        let msgs = vec![user("a", None, 0), assistant("a", None, 1)];
        let forest = ConversationForest::build(&msgs);
        assert_eq!(forest.len(), 1);
        assert_eq!(forest.message(0).kind, crate::MessageKind::User);
        assert_eq!(
            forest.warnings(),
            [IntegrityWarning::DuplicateId { id: "a".into() }]
        );
    }

    #[test]
    fn detached_sidechains() {
        let msgs = vec![
            user("p", None, 0),
            tool_call("t1", Some("p"), 1, "Read"),
            tool_call("t2", Some("t1"), 2, "Read"),
            tool_call("orphan", None, 3, "Read"),
        ];
        let forest = ConversationForest::build(&msgs);
        assert!(!forest.is_detached(0));
        assert!(forest.is_detached(1));
        assert!(!forest.is_detached(2));
        assert!(!forest.is_detached(3));
    }
}
