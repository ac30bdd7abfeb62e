use crate::output::{print_json, OutputFormat};
use anyhow::Result;
use serde::Serialize;
use std::collections::BTreeMap;
use threadline_core::sidechain::{
    classify, group_by_parent, sidechains_only, stats_for, SidechainStats, SidechainTypeInfo,
};
use threadline_core::Message;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SidechainReport<'a> {
    stats: SidechainStats,
    /// Sidechains without a parent; excluded from stats and groups
    orphan_count: usize,
    groups: BTreeMap<String, Vec<GroupEntry<'a>>>,
}

#[derive(Debug, Serialize)]
struct GroupEntry<'a> {
    id: &'a str,
    #[serde(flatten)]
    info: SidechainTypeInfo,
}

/// Run the `sidechains` command.
pub fn run_sidechains(messages: &[Message], format: OutputFormat) -> Result<()> {
    let orphan_count = sidechains_only(messages)
        .iter()
        .filter(|m| m.parent().is_none())
        .count();
    let groups = group_by_parent(messages)
        .into_iter()
        .map(|(parent, members)| {
            let entries = members
                .into_iter()
                .map(|m| GroupEntry {
                    id: m.id.as_str(),
                    info: classify(m),
                })
                .collect::<Vec<_>>();
            (parent, entries)
        })
        .collect();
    let report = SidechainReport {
        stats: stats_for(messages),
        orphan_count,
        groups,
    };

    match format {
        OutputFormat::Json => print_json(&report),
        OutputFormat::Text => {
            print_text(&report);
            Ok(())
        }
    }
}

fn print_text(report: &SidechainReport<'_>) {
    let stats = &report.stats;
    println!("Sidechains:  {}", stats.total_sidechains);
    println!("Parents:     {}", stats.group_count);
    println!("Per parent:  {:.2}", stats.average_per_parent);
    if report.orphan_count > 0 {
        println!("Orphans:     {} (not grouped)", report.orphan_count);
    }
    if !stats.type_distribution.is_empty() {
        println!();
        for (kind, count) in &stats.type_distribution {
            println!("  {:<16} {count}", kind.label());
        }
    }
    for (parent, entries) in &report.groups {
        println!();
        println!("{parent}:");
        for entry in entries {
            println!("  {:<8} {}", entry.info.kind.as_str(), entry.id);
        }
    }
}
