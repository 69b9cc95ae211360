//! Output formatting helpers for human-readable and JSON output.

use treebind::doc::{ChangeAction, ChangeEvent, ChangeKey, Commit};

/// Output format selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Human,
    Json,
}

/// One line of the commit log: a step, its update size and what it changed.
#[derive(Debug, Clone)]
pub struct CommitRow {
    pub step: String,
    pub bytes: usize,
    pub events: Vec<String>,
}

impl CommitRow {
    pub fn new(step: impl Into<String>, commit: &Commit) -> Self {
        Self {
            step: step.into(),
            bytes: commit.update.len(),
            events: commit.events.iter().map(describe_event).collect(),
        }
    }
}

/// Prints the commit log, one event per line under its step.
///
/// Steps that changed no pre-existing node show `-` in the events column.
pub fn print_commits(rows: &[CommitRow]) {
    if rows.is_empty() {
        return;
    }
    let step_width = rows.iter().map(|r| r.step.len()).max().unwrap_or(0).max("STEP".len());
    let bytes_width = rows
        .iter()
        .map(|r| r.bytes.to_string().len())
        .max()
        .unwrap_or(0)
        .max("BYTES".len());

    println!("{:<step_width$}  {:>bytes_width$}  EVENTS", "STEP", "BYTES");
    for row in rows {
        let mut events = row.events.iter();
        let first = events.next().map_or("-", String::as_str);
        println!("{:<step_width$}  {:>bytes_width$}  {first}", row.step, row.bytes);
        for event in events {
            println!("{:<step_width$}  {:>bytes_width$}  {event}", "", "");
        }
    }
}

/// Renders one change event as `target: +key ~key -key`.
pub fn describe_event(event: &ChangeEvent) -> String {
    let changes: Vec<String> = event
        .changes
        .iter()
        .map(|change| {
            let sign = match change.action {
                ChangeAction::Add => '+',
                ChangeAction::Update => '~',
                ChangeAction::Delete => '-',
            };
            match &change.key {
                ChangeKey::Key(key) => format!("{sign}{key}"),
                ChangeKey::Index(index) => format!("{sign}[{index}]"),
            }
        })
        .collect();
    format!("{}: {}", event.target, changes.join(" "))
}

/// Print a JSON value pretty-printed for humans or compact for machines.
pub fn print_json(
    format: OutputFormat,
    value: &serde_json::Value,
) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        OutputFormat::Human => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Json => println!("{}", serde_json::to_string(value)?),
    }
    Ok(())
}
