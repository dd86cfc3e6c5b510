//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "shelfmark", version, about = "Content-based PDF renamer")]
pub struct Cli {
    /// JSON config file (defaults apply for missing fields)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Rename PDFs under a directory based on their content
    Rename(RenameArgs),
    /// Watch a directory and rename new or changed PDFs
    Watch(WatchArgs),
    /// Reverse renames recorded in an undo log
    Undo(UndoArgs),
}

#[derive(Debug, Args)]
pub struct RenameArgs {
    /// Directory (or single PDF) to process
    pub path: PathBuf,

    /// Show what would be renamed without touching anything
    #[arg(long)]
    pub dry_run: bool,

    /// Recurse into subdirectories
    #[arg(short, long)]
    pub recursive: bool,

    /// Skip all LLM calls (heuristic-only mode)
    #[arg(long)]
    pub no_llm: bool,

    /// Document language: de or en
    #[arg(short, long)]
    pub language: Option<String>,

    /// Confirm each rename on stdin (y/n/e)
    #[arg(short, long)]
    pub interactive: bool,

    /// Parallel workers for extraction and analysis
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Export per-document metadata to this file (.json or .csv)
    #[arg(long)]
    pub export: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Directory to watch
    pub path: PathBuf,

    /// Polling interval in seconds
    #[arg(long, default_value_t = 10)]
    pub interval_s: u64,

    /// Skip all LLM calls (heuristic-only mode)
    #[arg(long)]
    pub no_llm: bool,
}

#[derive(Debug, Args)]
pub struct UndoArgs {
    /// Undo log written by previous runs (old\tnew per line)
    pub log: PathBuf,

    /// Show what would be reversed without touching anything
    #[arg(long)]
    pub dry_run: bool,
}
