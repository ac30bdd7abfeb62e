use anyhow::{Context, Result};
use serde::Serialize;
use threadline_core::sidechain::classify;
use threadline_core::Message;

/// Output format for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{rendered}");
    Ok(())
}

const SNIPPET_CHARS: usize = 60;

/// First line of the message text, shortened for one-line listings.
pub fn snippet(message: &Message) -> String {
    let first_line = message.raw_content.lines().next().unwrap_or("").trim();
    if first_line.chars().count() <= SNIPPET_CHARS {
        return first_line.to_string();
    }
    let cut: String = first_line.chars().take(SNIPPET_CHARS - 1).collect();
    format!("{cut}…")
}

/// `[file]`-style tag for sidechain messages, empty otherwise.
pub fn sidechain_tag(message: &Message) -> String {
    if message.is_sidechain {
        format!(" [{}]", classify(message).kind.as_str())
    } else {
        String::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use threadline_core::testing;

    #[test]
    fn snippet_truncates_on_char_boundary() {
        let long = "é".repeat(100);
        let msg = testing::user("u", None, 0).with_content(format!("{long}\nsecond line"));
        let out = snippet(&msg);
        assert_eq!(out.chars().count(), SNIPPET_CHARS);
        assert!(out.ends_with('…'));

        let short = testing::user("u", None, 0).with_content("  hi  \nmore");
        assert_eq!(snippet(&short), "hi");
    }

    #[test]
    fn tags_only_sidechains() {
        assert_eq!(sidechain_tag(&testing::tool_call("t", Some("p"), 0, "Grep")), " [search]");
        assert_eq!(sidechain_tag(&testing::user("u", None, 0)), "");
    }
}
