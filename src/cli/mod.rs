//! CLI module for rowview
//!
//! Provides command-line interface for:
//! - view: project one page of a JSON row file
//! - state: restore a saved query state and project its page

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command, SourceArgs};
pub use commands::{discover_columns, run, run_command, state_view, view};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{read_json_file, write_error, write_response};
