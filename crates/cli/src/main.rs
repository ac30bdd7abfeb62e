mod branches_cmd;
mod config;
mod link_cmd;
mod output;
mod sidechains_cmd;
mod tree_cmd;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use output::OutputFormat;
use std::path::{Path, PathBuf};
use threadline_core::Message;
use threadline_parsers::{load_messages, InputFormat};

#[derive(Parser)]
#[command(
    name = "threadline",
    about = "threadline - reconstruct and lay out AI assistant conversation trees"
)]
struct Cli {
    /// Log format of the input file
    #[arg(long, global = true, value_enum, default_value_t = InputArg::Auto)]
    input: InputArg,

    /// Config file (defaults to ~/.config/threadline/threadline.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum InputArg {
    Auto,
    ClaudeCode,
    Messages,
}

impl From<InputArg> for InputFormat {
    fn from(arg: InputArg) -> Self {
        match arg {
            InputArg::Auto => Self::Auto,
            InputArg::ClaudeCode => Self::ClaudeCode,
            InputArg::Messages => Self::Messages,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Show the conversation tree with branch and sidechain annotations
    Tree {
        /// Path to the conversation log
        file: PathBuf,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// List every branch point and its alternatives
    Branches {
        /// Path to the conversation log
        file: PathBuf,
    },

    /// Show sidechain groups and statistics
    Sidechains {
        /// Path to the conversation log
        file: PathBuf,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Print layout positions and bounds as JSON
    Layout {
        /// Path to the conversation log
        file: PathBuf,
    },

    /// Print the deep-link query string for a message
    Link {
        /// Path to the conversation log
        file: PathBuf,
        /// Message id to link to
        message_id: String,
    },

    /// Print the message a deep-link query string points to
    Resolve {
        /// Path to the conversation log
        file: PathBuf,
        /// Query string, e.g. `messageId=abc&branchIndex=2`
        query: String,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let input = InputFormat::from(cli.input);
    let load = |file: &Path| -> Result<Vec<Message>> { load_messages(file, input) };

    match cli.command {
        Commands::Tree { file, format } => {
            let settings = config::load_config(cli.config.as_deref())?;
            tree_cmd::run_tree(&load(&file)?, &settings.layout, format)
        }
        Commands::Branches { file } => branches_cmd::run_branches(&load(&file)?),
        Commands::Sidechains { file, format } => {
            sidechains_cmd::run_sidechains(&load(&file)?, format)
        }
        Commands::Layout { file } => {
            let settings = config::load_config(cli.config.as_deref())?;
            tree_cmd::run_layout(&load(&file)?, &settings.layout)
        }
        Commands::Link { file, message_id } => link_cmd::run_link(&load(&file)?, &message_id),
        Commands::Resolve { file, query } => link_cmd::run_resolve(&load(&file)?, &query),
    }
}
