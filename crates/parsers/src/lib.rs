pub mod claude_code;
pub mod native;

use anyhow::{bail, Context, Result};
use std::path::Path;
use threadline_core::Message;

/// Trait for turning a conversation log into a flat message list
pub trait MessageParser: Send + Sync {
    /// Parser name (e.g. "claude-code", "messages")
    fn name(&self) -> &str;

    /// Check if this parser recognises a leading line of a log
    fn can_parse(&self, line: &str) -> bool;

    /// Parse a whole log
    fn parse_str(&self, text: &str) -> Result<Vec<Message>>;
}

/// Get all available parsers, in detection order
pub fn all_parsers() -> Vec<Box<dyn MessageParser>> {
    vec![
        Box::new(claude_code::ClaudeCodeParser),
        Box::new(native::NativeParser),
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Auto,
    ClaudeCode,
    Messages,
}

impl InputFormat {
    fn parser_name(self) -> Option<&'static str> {
        match self {
            Self::Auto => None,
            Self::ClaudeCode => Some("claude-code"),
            Self::Messages => Some("messages"),
        }
    }
}

/// Number of leading non-blank lines inspected by [`detect_parser`].
const DETECT_LINES: usize = 5;

/// Pick a parser for `text` from its first few non-blank lines; the first
/// line any parser recognises decides.
pub fn detect_parser(text: &str) -> Option<Box<dyn MessageParser>> {
    let parsers = all_parsers();
    let line = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .take(DETECT_LINES)
        .find(|line| parsers.iter().any(|parser| parser.can_parse(line)))?;
    parsers.into_iter().find(|parser| parser.can_parse(line))
}

pub fn parse_text(text: &str, format: InputFormat) -> Result<Vec<Message>> {
    let parser = match format.parser_name() {
        Some(name) => all_parsers()
            .into_iter()
            .find(|parser| parser.name() == name)
            .with_context(|| format!("parser {name} not registered"))?,
        None => {
            if text.trim().is_empty() {
                return Ok(Vec::new());
            }
            match detect_parser(text) {
                Some(parser) => parser,
                None => bail!("Unrecognised conversation log format"),
            }
        }
    };
    tracing::debug!(parser = parser.name(), "parsing conversation log");
    parser.parse_str(text)
}

pub fn load_messages(path: &Path, format: InputFormat) -> Result<Vec<Message>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    parse_text(&text, format).with_context(|| format!("Failed to parse {}", path.display()))
}
