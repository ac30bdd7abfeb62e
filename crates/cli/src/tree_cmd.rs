use crate::output::{print_json, sidechain_tag, snippet, OutputFormat};
use anyhow::Result;
use threadline_core::branch::branch_label;
use threadline_core::forest::ConversationForest;
use threadline_core::graph::ConversationGraph;
use threadline_core::layout::{layout, LayoutConfig};
use threadline_core::Message;

/// Run the `tree` command.
pub fn run_tree(messages: &[Message], config: &LayoutConfig, format: OutputFormat) -> Result<()> {
    let graph = ConversationGraph::build(messages, config);
    match format {
        OutputFormat::Json => print_json(&graph),
        OutputFormat::Text => {
            if graph.messages.is_empty() {
                eprintln!("No messages found.");
                return Ok(());
            }
            for line in outline(&graph.messages) {
                println!("{line}");
            }
            for warning in graph.warnings() {
                eprintln!("warning: {}", serde_json::to_string(warning)?);
            }
            Ok(())
        }
    }
}

/// Run the `layout` command.
pub fn run_layout(messages: &[Message], config: &LayoutConfig) -> Result<()> {
    print_json(&layout(messages, config))
}

/// Indented pre-order listing of annotated messages.
pub fn outline(annotated: &[Message]) -> Vec<String> {
    let forest = ConversationForest::build(annotated);
    let mut lines = Vec::with_capacity(forest.len());
    let mut stack: Vec<(usize, usize)> = forest.roots().iter().rev().map(|&r| (r, 0)).collect();

    while let Some((node, depth)) = stack.pop() {
        let msg = forest.message(node);
        let label = branch_label(msg);
        let branch = if label.is_empty() {
            String::new()
        } else {
            format!(" ({label})")
        };
        lines.push(format!(
            "{}{} {}{}{}: {}",
            "  ".repeat(depth),
            msg.kind.as_str(),
            msg.id,
            branch,
            sidechain_tag(msg),
            snippet(msg)
        ));
        for &child in forest.children(node).iter().rev() {
            stack.push((child, depth + 1));
        }
    }
    lines
}
