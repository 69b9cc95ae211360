//! CLI argument definitions for the Treebind binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use treebind::registry::SyncStrategy;

use crate::output::OutputFormat;

/// Which untagged containers are diffed in place
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Strategy {
    /// Diff plain arrays and objects as well as tagged containers
    Always,
    /// Diff only tagged containers; rewrite plain ones (default)
    IsEntity,
}

impl From<Strategy> for SyncStrategy {
    fn from(strategy: Strategy) -> Self {
        match strategy {
            Strategy::Always => SyncStrategy::Always,
            Strategy::IsEntity => SyncStrategy::IsEntity,
        }
    }
}

/// Output format
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Format {
    /// Aligned tables and indented JSON
    Human,
    /// One JSON object per line
    Json,
}

impl From<Format> for OutputFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Human => OutputFormat::Human,
            Format::Json => OutputFormat::Json,
        }
    }
}

/// Treebind state/document synchronization tool
#[derive(Parser, Debug)]
#[command(name = "treebind")]
#[command(about = "Treebind: keep application state and a replicated document in step")]
#[command(version)]
pub struct Cli {
    /// Sync strategy for plain containers
    #[arg(long, global = true, default_value = "is-entity", env = "TREEBIND_STRATEGY")]
    pub strategy: Strategy,

    /// Output format
    #[arg(long, global = true, default_value = "human", env = "TREEBIND_FORMAT")]
    pub format: Format,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a scripted task-list session between two in-process peers
    Demo(DemoArgs),
    /// Project a JSON state file into a document and replay it on a peer
    Project(ProjectArgs),
}

/// Arguments for the demo command
#[derive(clap::Args, Debug)]
pub struct DemoArgs {
    /// Number of tasks in the initial list
    #[arg(short, long, default_value_t = 3)]
    pub tasks: usize,

    /// Print both documents after every step
    #[arg(long)]
    pub show_documents: bool,
}

/// Arguments for the project command
#[derive(clap::Args, Debug)]
pub struct ProjectArgs {
    /// JSON file holding the state to project
    pub input: PathBuf,

    /// JSON file holding a second state to project as an edit of the first
    #[arg(long)]
    pub then: Option<PathBuf>,

    /// Name of the document root
    #[arg(long, default_value = "state")]
    pub root: String,
}
