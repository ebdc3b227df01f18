//! CLI argument definitions using clap
//!
//! Commands:
//! - rowview view --rows <path> [query options]
//! - rowview state --rows <path> --state <path>

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// rowview - query and paginate a JSON row collection
#[derive(Parser, Debug)]
#[command(name = "rowview")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Project one page of a row collection
    View {
        #[command(flatten)]
        source: SourceArgs,

        /// Case-insensitive substring matched against every column
        #[arg(long)]
        search: Option<String>,

        /// Column filter as key=term; repeatable
        #[arg(long = "filter", value_name = "KEY=TERM")]
        filters: Vec<String>,

        /// Sort rule as key[:asc|desc]; repeatable, applied in order
        #[arg(long = "sort", value_name = "KEY[:DIR]")]
        sorts: Vec<String>,

        /// Page to serve, starting at 1
        #[arg(long)]
        page: Option<usize>,

        /// Rows per page
        #[arg(long)]
        page_size: Option<usize>,
    },

    /// Restore a saved query state and project its page
    State {
        #[command(flatten)]
        source: SourceArgs,

        /// Path to a JSON query state
        #[arg(long)]
        state: PathBuf,
    },
}

/// Options shared by every command
#[derive(Args, Debug)]
pub struct SourceArgs {
    /// Path to a JSON array of row objects
    #[arg(long)]
    pub rows: PathBuf,

    /// Comma-separated active column keys; defaults to every key in the rows
    #[arg(long, value_delimiter = ',')]
    pub columns: Vec<String>,

    /// Path to an engine configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Project on the shard pool when eligible
    #[arg(long)]
    pub parallel: bool,

    /// Emit info and trace log lines on stderr
    #[arg(long)]
    pub verbose: bool,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
