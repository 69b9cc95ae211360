//! Project command - writes JSON state files into a document and replays
//! the resulting updates on a second document.

use std::{fs, path::Path, sync::Arc};

use treebind::{Binder, Document, Registry, Value};

use crate::cli::ProjectArgs;
use crate::output::{CommitRow, OutputFormat, describe_event, print_commits, print_json};

fn read_state(path: &Path) -> Result<Value, Box<dyn std::error::Error>> {
    let text = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
    let json: serde_json::Value = serde_json::from_str(&text)?;
    Ok(Value::from_json(&json))
}

/// Run the project command
pub fn run(
    args: &ProjectArgs,
    registry: Arc<Registry>,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let initial = read_state(&args.input)?;

    let mut source = Document::new();
    let (mut binder, init) = Binder::init(&mut source, &args.root, initial, registry.clone())?;
    let mut replica = Document::new();
    replica.apply_update(&init.update)?;
    let mut peer = Binder::attach(&replica, &args.root, registry)?;

    let mut commits = vec![("init".to_string(), init)];
    if let Some(path) = &args.then {
        let next = read_state(path)?;
        let commit = binder.apply_local(&mut source, next)?;
        let remote = replica.apply_update(&commit.update)?;
        peer.observe(&replica, &remote)?;
        commits.push((path.display().to_string(), commit));
    }

    let root = args.root.as_str().into();
    match format {
        OutputFormat::Human => {
            let rows: Vec<CommitRow> = commits
                .iter()
                .map(|(label, commit)| CommitRow::new(label.as_str(), commit))
                .collect();
            print_commits(&rows);
            println!();
            print_json(format, &replica.to_json(&root).unwrap_or_default())?;
        }
        OutputFormat::Json => {
            for (label, commit) in &commits {
                let events: Vec<String> = commit.events.iter().map(describe_event).collect();
                print_json(
                    format,
                    &serde_json::json!({
                        "step": label,
                        "bytes": commit.update.len(),
                        "events": events,
                    }),
                )?;
            }
            print_json(
                format,
                &serde_json::json!({
                    "document": replica.to_json(&root),
                    "state": peer.state().to_json(),
                }),
            )?;
        }
    }

    if peer.state() != binder.state() {
        return Err("replica state differs from source state".into());
    }
    Ok(())
}
