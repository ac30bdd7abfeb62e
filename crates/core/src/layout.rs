//! Two-dimensional layout of a conversation forest.
//!
//! Depth maps to `y`. Each subtree owns a horizontal extent; main-line
//! children sit side by side inside their parent's extent and the parent is
//! centred over them. Sidechains hanging off a main-line message are pushed
//! past the parent's main-line extent by more than
//! [`LayoutConfig::sidechain_separation`].
//!
//! All passes use an explicit node order instead of recursion, so a long
//! linear chain cannot exhaust the stack.

use crate::forest::{ConversationForest, IntegrityWarning};
use crate::Message;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Gap between neighbouring subtrees
    #[serde(default = "default_horizontal_spacing")]
    pub horizontal_spacing: f64,
    /// Distance between consecutive depths
    #[serde(default = "default_vertical_spacing")]
    pub vertical_spacing: f64,
    /// Minimum distance between a main-line message and its sidechains
    #[serde(default = "default_sidechain_separation")]
    pub sidechain_separation: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            horizontal_spacing: default_horizontal_spacing(),
            vertical_spacing: default_vertical_spacing(),
            sidechain_separation: default_sidechain_separation(),
        }
    }
}

fn default_horizontal_spacing() -> f64 {
    120.0
}

fn default_vertical_spacing() -> f64 {
    100.0
}

fn default_sidechain_separation() -> f64 {
    240.0
}

impl LayoutConfig {
    /// Replace unusable values (non-finite, or not strictly positive for
    /// spacings) with defaults.
    pub fn sanitized(self) -> Self {
        let positive = |value: f64, fallback: fn() -> f64| {
            if value.is_finite() && value > 0.0 {
                value
            } else {
                fallback()
            }
        };
        Self {
            horizontal_spacing: positive(self.horizontal_spacing, default_horizontal_spacing),
            vertical_spacing: positive(self.vertical_spacing, default_vertical_spacing),
            sidechain_separation: if self.sidechain_separation.is_finite()
                && self.sidechain_separation >= 0.0
            {
                self.sidechain_separation
            } else {
                default_sidechain_separation()
            },
        }
    }

    /// Offset from the right edge of a main-line extent to its first sidechain.
    fn sidechain_gap(&self) -> f64 {
        self.sidechain_separation + self.horizontal_spacing
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TreePosition {
    pub x: f64,
    pub y: f64,
    pub depth: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Bounds {
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TreeLayout {
    pub positions: BTreeMap<String, TreePosition>,
    pub bounds: Bounds,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<IntegrityWarning>,
}

impl TreeLayout {
    pub fn position(&self, id: &str) -> Option<TreePosition> {
        self.positions.get(id).copied()
    }
}

/// Lay out `messages` as a forest.
pub fn layout(messages: &[Message], config: &LayoutConfig) -> TreeLayout {
    let forest = ConversationForest::build(messages);
    layout_forest(&forest, config)
}

pub fn layout_forest(forest: &ConversationForest<'_>, config: &LayoutConfig) -> TreeLayout {
    if forest.is_empty() {
        return TreeLayout {
            warnings: forest.warnings().to_vec(),
            ..TreeLayout::default()
        };
    }

    let config = config.sanitized();
    let h = config.horizontal_spacing;
    let n = forest.len();

    // Pre-order: every parent precedes its descendants.
    let mut order = Vec::with_capacity(n);
    let mut depth = vec![0usize; n];
    let mut stack: Vec<usize> = forest.roots().iter().rev().copied().collect();
    while let Some(node) = stack.pop() {
        order.push(node);
        for &child in forest.children(node).iter().rev() {
            depth[child] = depth[node] + 1;
            stack.push(child);
        }
    }

    // Main-line and detached sidechain children per node.
    let split: Vec<(Vec<usize>, Vec<usize>)> = (0..n)
        .map(|node| {
            forest
                .children(node)
                .iter()
                .copied()
                .partition(|&child| !forest.is_detached(child))
        })
        .collect();
    let row_width = |nodes: &[usize], extent: &[f64]| -> f64 {
        if nodes.is_empty() {
            return 0.0;
        }
        nodes.iter().map(|&c| extent[c]).sum::<f64>() + (nodes.len() - 1) as f64 * h
    };

    // Bottom-up extents.
    let mut main_extent = vec![0.0f64; n];
    let mut extent = vec![0.0f64; n];
    for &node in order.iter().rev() {
        let (main, side) = &split[node];
        main_extent[node] = row_width(main, &extent);
        let side_extent = if side.is_empty() {
            0.0
        } else {
            config.sidechain_gap() + row_width(side, &extent)
        };
        extent[node] = main_extent[node] + side_extent;
    }

    // Top-down left edges.
    let mut left = vec![0.0f64; n];
    let mut cursor = 0.0;
    for &root in forest.roots() {
        left[root] = cursor;
        cursor += extent[root] + h;
    }
    for &node in &order {
        let (main, side) = &split[node];
        let mut edge = left[node];
        for &child in main {
            left[child] = edge;
            edge += extent[child] + h;
        }
        let mut edge = left[node] + main_extent[node] + config.sidechain_gap();
        for &child in side {
            left[child] = edge;
            edge += extent[child] + h;
        }
    }

    // Bottom-up centring over main-line children.
    let mut x = vec![0.0f64; n];
    for &node in order.iter().rev() {
        let (main, _) = &split[node];
        x[node] = match (main.first(), main.last()) {
            (Some(&first), Some(&last)) => (x[first] + x[last]) / 2.0,
            _ => left[node],
        };
    }

    let min_x = x.iter().copied().fold(f64::INFINITY, f64::min);
    let max_x = x.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let max_depth = depth.iter().copied().max().unwrap_or(0);

    let positions = (0..n)
        .map(|node| {
            let position = TreePosition {
                x: x[node] - min_x,
                y: depth[node] as f64 * config.vertical_spacing,
                depth: depth[node],
            };
            (forest.message(node).id.clone(), position)
        })
        .collect();

    TreeLayout {
        positions,
        bounds: Bounds {
            width: max_x - min_x,
            height: max_depth as f64 * config.vertical_spacing,
        },
        warnings: forest.warnings().to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{assistant, tool_call, tool_result, user};

    fn pos(layout: &TreeLayout, id: &str) -> TreePosition {
        layout.position(id).unwrap_or_else(|| panic!("no position for {id}"))
    }

    #[test]
    fn empty_input() {
        let out = layout(&[], &LayoutConfig::default());
        assert!(out.positions.is_empty());
        assert_eq!(out.bounds, Bounds { width: 0.0, height: 0.0 });
    }

    #[test]
    fn linear_chain_is_vertical() {
        let msgs = vec![
            user("a", None, 0),
            assistant("b", Some("a"), 1),
            user("c", Some("b"), 2),
        ];
        let out = layout(&msgs, &LayoutConfig::default());
        let (a, b, c) = (pos(&out, "a"), pos(&out, "b"), pos(&out, "c"));
        assert_eq!(a.x, b.x);
        assert_eq!(b.x, c.x);
        assert!(a.y < b.y && b.y < c.y);
        assert_eq!(b.y - a.y, 100.0);
        assert_eq!(out.bounds.width, 0.0);
        assert_eq!(out.bounds.height, 200.0);
    }

    #[test]
    fn branches_and_sidechain_are_separated() {
        let config = LayoutConfig::default();
        let msgs = vec![
            user("root", None, 0),
            assistant("a", Some("root"), 1),
            assistant("b", Some("root"), 2),
            tool_call("s", Some("root"), 3, "Read"),
        ];
        let out = layout(&msgs, &config);
        let (root, a, b, s) = (
            pos(&out, "root"),
            pos(&out, "a"),
            pos(&out, "b"),
            pos(&out, "s"),
        );

        assert_ne!(a.x, b.x);
        assert!((s.x - a.x).abs() > config.sidechain_separation);
        assert!((s.x - b.x).abs() > config.sidechain_separation);
        assert!((s.x - root.x).abs() > config.sidechain_separation);
        assert!(a.x.min(b.x) <= root.x && root.x <= a.x.max(b.x));
        assert_eq!(root.x, (a.x + b.x) / 2.0);
        for child in [a, b, s] {
            assert!(child.y > root.y);
        }
    }

    #[test]
    fn sidechain_clears_nested_branches() {
        let config = LayoutConfig::default();
        let msgs = vec![
            user("root", None, 0),
            assistant("a", Some("root"), 1),
            user("a1", Some("a"), 2),
            user("a2", Some("a"), 3),
            assistant("b", Some("root"), 4),
            tool_call("s", Some("root"), 5, "Read"),
            tool_result("s-out", Some("s"), 6, "ok"),
        ];
        let out = layout(&msgs, &config);
        let s = pos(&out, "s");
        for id in ["root", "a", "a1", "a2", "b"] {
            assert!(
                (s.x - pos(&out, id).x).abs() > config.sidechain_separation,
                "sidechain too close to {id}"
            );
        }
        assert_eq!(pos(&out, "s-out").x, s.x);
    }

    #[test]
    fn sibling_subtrees_do_not_overlap() {
        let msgs = vec![
            user("root", None, 0),
            assistant("a", Some("root"), 1),
            user("a1", Some("a"), 2),
            user("a2", Some("a"), 3),
            assistant("b", Some("root"), 4),
            user("b1", Some("b"), 5),
            user("b2", Some("b"), 6),
        ];
        let out = layout(&msgs, &LayoutConfig::default());
        let mut depth2: Vec<f64> = ["a1", "a2", "b1", "b2"]
            .iter()
            .map(|id| pos(&out, id).x)
            .collect();
        depth2.sort_by(f64::total_cmp);
        depth2.dedup();
        assert_eq!(depth2.len(), 4);
        assert!(pos(&out, "a").x < pos(&out, "b").x);
    }

    #[test]
    fn dangling_parent_starts_new_root() {
        let msgs = vec![user("r", None, 0), assistant("x", Some("missing"), 1)];
        let out = layout(&msgs, &LayoutConfig::default());
        assert_eq!(pos(&out, "x").depth, 0);
        assert_eq!(pos(&out, "x").y, 0.0);
        assert_ne!(pos(&out, "x").x, pos(&out, "r").x);
    }

    #[test]
    fn bounds_contain_all_positions() {
        let msgs = vec![
            user("r", None, 0),
            assistant("a", Some("r"), 1),
            assistant("b", Some("r"), 2),
            tool_call("s", Some("a"), 3, "Grep"),
        ];
        let out = layout(&msgs, &LayoutConfig::default());
        let xs = out.positions.values().map(|p| p.x);
        let min_x = xs.clone().fold(f64::INFINITY, f64::min);
        let max_x = xs.fold(f64::NEG_INFINITY, f64::max);
        assert_eq!(min_x, 0.0);
        assert_eq!(out.bounds.width, max_x);
        assert_eq!(out.bounds.height, 200.0);
    }

    #[test]
    fn cycles_degrade_gracefully() {
        let msgs = vec![user("a", Some("b"), 0), assistant("b", Some("a"), 1)];
        let out = layout(&msgs, &LayoutConfig::default());
        assert_eq!(out.positions.len(), 2);
        assert_eq!(out.warnings.len(), 1);
        assert!(pos(&out, "b").y > pos(&out, "a").y);
    }

    #[test]
    fn child_listed_before_its_cycle_stays_below_parent() {
        let msgs = vec![
            user("tail", Some("z"), 3),
            user("x", Some("z"), 0),
            assistant("y", Some("x"), 1),
            user("z", Some("y"), 2),
        ];
        let out = layout(&msgs, &LayoutConfig::default());
        assert_eq!(out.warnings.len(), 1);
        assert_eq!(pos(&out, "x").depth, 0);
        assert_eq!(pos(&out, "tail").depth, 3);
        assert!(pos(&out, "tail").y > pos(&out, "z").y);
    }

    #[test]
    fn deep_chain_lays_out_without_recursion() {
        let mut msgs = vec![user("m0", None, 0)];
        for i in 1..10_000 {
            let parent = format!("m{}", i - 1);
            msgs.push(assistant(&format!("m{i}"), Some(parent.as_str()), i));
        }
        let out = layout(&msgs, &LayoutConfig::default());
        assert_eq!(out.positions.len(), 10_000);
        assert_eq!(out.bounds.width, 0.0);
        assert_eq!(pos(&out, "m9999").depth, 9_999);
    }

    #[test]
    fn sanitizes_bad_config() {
        let config = LayoutConfig {
            horizontal_spacing: -1.0,
            vertical_spacing: f64::NAN,
            sidechain_separation: f64::INFINITY,
        }
        .sanitized();
        assert_eq!(config, LayoutConfig::default());
    }
}
