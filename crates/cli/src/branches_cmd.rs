use crate::output::snippet;
use anyhow::Result;
use chrono::SecondsFormat;
use threadline_core::branch::{annotate_branches, branch_label, branch_points};
use threadline_core::Message;

/// Run the `branches` command.
pub fn run_branches(messages: &[Message]) -> Result<()> {
    let annotated = annotate_branches(messages);
    let points = branch_points(&annotated);
    if points.is_empty() {
        eprintln!("No branches found.");
        return Ok(());
    }

    for point in &points {
        println!("parent {}:", point.parent_id);
        for id in &point.alternative_ids {
            let Some(msg) = annotated.iter().find(|m| &m.id == id) else {
                continue;
            };
            println!(
                "  {:<16} {}  {}  {}",
                branch_label(msg),
                msg.id,
                msg.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
                snippet(msg)
            );
        }
    }
    Ok(())
}
