//! CLI command implementations
//!
//! Each command loads rows and configuration, drives one `ProjectionEngine`
//! and prints a single JSON response on stdout.

use std::path::Path;

use serde_json::{json, Value};

use crate::engine::{EngineConfig, ProjectionEngine, View};
use crate::observability::{Logger, Severity};
use crate::query::{Column, SortDirection, SortRule};
use crate::store::Row;

use super::args::{Cli, Command, SourceArgs};
use super::errors::{CliError, CliResult};
use super::io::{read_json_file, write_error, write_response};

/// Parse arguments and run the selected command
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    run_command(cli.command)
}

/// Run a command, printing its response or its error
pub fn run_command(cmd: Command) -> CliResult<()> {
    let verbose = match &cmd {
        Command::View { source, .. } | Command::State { source, .. } => source.verbose,
    };
    Logger::set_min_severity(if verbose { Severity::Trace } else { Severity::Warn });

    let result = match cmd {
        Command::View {
            source,
            search,
            filters,
            sorts,
            page,
            page_size,
        } => view(&source, search.as_deref(), &filters, &sorts, page, page_size),
        Command::State { source, state } => state_view(&source, &state),
    };

    match result {
        Ok(data) => write_response(data),
        Err(e) => {
            write_error(e.code_str(), e.message())?;
            Err(e)
        }
    }
}

/// Project one page with query options given on the command line
pub fn view(
    source: &SourceArgs,
    search: Option<&str>,
    filters: &[String],
    sorts: &[String],
    page: Option<usize>,
    page_size: Option<usize>,
) -> CliResult<Value> {
    let (mut engine, columns) = open(source)?;

    if let Some(term) = search {
        engine.set_search_term(term);
    }
    for filter in filters {
        let (key, term) = parse_filter(filter)?;
        engine.set_column_filter(key, term);
    }
    if !sorts.is_empty() {
        let rules = sorts
            .iter()
            .map(|sort| parse_sort(sort))
            .collect::<CliResult<Vec<_>>>()?;
        engine.set_sorts(rules);
    }
    if let Some(page_size) = page_size {
        engine.set_page_size(page_size);
    }
    if let Some(page) = page {
        engine.set_page(page);
    }

    let view = project(&mut engine, &columns, source.parallel)?;
    Ok(serde_json::to_value(view)?)
}

/// Restore a saved query state and project its page
pub fn state_view(source: &SourceArgs, state_path: &Path) -> CliResult<Value> {
    let (mut engine, columns) = open(source)?;

    let state = read_json_file(state_path)?;
    engine.set_state_json(&state.to_string())?;

    let view = project(&mut engine, &columns, source.parallel)?;
    Ok(json!({
        "view": serde_json::to_value(view)?,
        "state": serde_json::to_value(engine.get_state())?,
    }))
}

fn open(source: &SourceArgs) -> CliResult<(ProjectionEngine, Vec<Column>)> {
    let mut config = match &source.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    config.parallel.enabled &= source.parallel;

    let mut engine = ProjectionEngine::new(config)?;
    engine.ingest_json(read_json_file(&source.rows)?)?;

    let columns = if source.columns.is_empty() {
        discover_columns(engine.rows())
    } else {
        Column::from_keys(source.columns.iter().map(|key| key.trim()))
    };
    Ok((engine, columns))
}

fn project(engine: &mut ProjectionEngine, columns: &[Column], parallel: bool) -> CliResult<View> {
    if !parallel {
        return Ok(engine.get_view(columns));
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;
    let view = runtime.block_on(engine.get_view_async(columns));
    engine.shutdown();
    Ok(view)
}

/// Every key in `rows`, in order of first appearance
pub fn discover_columns(rows: &[Row]) -> Vec<Column> {
    let mut columns: Vec<Column> = Vec::new();
    for row in rows {
        for key in row.keys() {
            if !columns.iter().any(|column| &column.key == key) {
                columns.push(Column::new(key.as_str()));
            }
        }
    }
    columns
}

/// Parses `key=term`
fn parse_filter(arg: &str) -> CliResult<(&str, &str)> {
    match arg.split_once('=') {
        Some((key, term)) if !key.trim().is_empty() => Ok((key.trim(), term)),
        _ => Err(CliError::invalid_argument(format!(
            "Invalid filter '{}': expected KEY=TERM",
            arg
        ))),
    }
}

/// Parses `key`, `key:asc` or `key:desc`
fn parse_sort(arg: &str) -> CliResult<SortRule> {
    let (key, direction) = match arg.rsplit_once(':') {
        Some((key, direction)) => {
            let direction = SortDirection::parse(direction).ok_or_else(|| {
                CliError::invalid_argument(format!(
                    "Invalid sort direction '{}': expected asc or desc",
                    direction
                ))
            })?;
            (key, direction)
        }
        None => (arg, SortDirection::Asc),
    };

    let key = key.trim();
    if key.is_empty() {
        return Err(CliError::invalid_argument(format!("Invalid sort '{}'", arg)));
    }
    Ok(SortRule::new(key, direction))
}
