//! Demo command - two in-process peers editing one task list.

use treebind::{Binder, Document, Value, doc::Commit};

use crate::cli::DemoArgs;
use crate::model;
use crate::output::{CommitRow, OutputFormat, describe_event, print_commits, print_json};

const ROOT: &str = "tasks";

struct Peer {
    name: &'static str,
    doc: Document,
    binder: Binder,
}

type Edit = fn(&Value) -> Option<Value>;

fn complete_first(state: &Value) -> Option<Value> {
    model::complete(state, 0)
}

fn add_chore(state: &Value) -> Option<Value> {
    model::add_task(state, "water plants")
}

fn recolor_green(state: &Value) -> Option<Value> {
    model::recolor(state, "green")
}

fn remove_second(state: &Value) -> Option<Value> {
    model::remove_task(state, 1)
}

fn unchanged(state: &Value) -> Option<Value> {
    Some(state.clone())
}

/// Steps as (label, index of the writing peer, edit).
fn script() -> [(&'static str, usize, Edit); 5] {
    [
        ("complete task 1", 0, complete_first),
        ("add task", 1, add_chore),
        ("recolor", 0, recolor_green),
        ("remove task 2", 1, remove_second),
        ("no-op", 0, unchanged),
    ]
}

/// Projects `next` on `writer` and delivers the update to `reader`.
fn exchange(
    writer: &mut Peer,
    reader: &mut Peer,
    next: Value,
) -> Result<(Commit, bool), Box<dyn std::error::Error>> {
    let local = writer.binder.apply_local(&mut writer.doc, next)?;
    let echoed = writer.binder.observe(&writer.doc, &local)?;
    debug_assert!(echoed.is_none());

    let bytes = local.update.encode();
    let update = treebind::doc::Update::decode(&bytes)?;
    let remote = reader.doc.apply_update(&update)?;
    reader.binder.observe(&reader.doc, &remote)?;

    let converged = writer.binder.state() == reader.binder.state();
    tracing::info!(
        writer = writer.name,
        bytes = bytes.len(),
        converged,
        "Delivered update"
    );
    Ok((local, converged))
}

/// Run the demo command
pub fn run(
    args: &DemoArgs,
    registry: std::sync::Arc<treebind::Registry>,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut a_doc = Document::with_client_id(1);
    let (a_binder, init) = Binder::init(
        &mut a_doc,
        ROOT,
        model::task_list("Chores", args.tasks),
        registry.clone(),
    )?;
    let mut b_doc = Document::with_client_id(2);
    b_doc.apply_update(&init.update)?;
    let b_binder = Binder::attach(&b_doc, ROOT, registry)?;

    let mut peers = [
        Peer {
            name: "alice",
            doc: a_doc,
            binder: a_binder,
        },
        Peer {
            name: "bob",
            doc: b_doc,
            binder: b_binder,
        },
    ];

    let mut rows = vec![CommitRow::new("init", &init)];
    for (step, writer, edit) in script() {
        let [a, b] = &mut peers;
        let (writer, reader) = if writer == 0 { (a, b) } else { (b, a) };
        let next = edit(writer.binder.state())
            .ok_or_else(|| format!("step '{step}' does not apply to the current state"))?;
        let (commit, converged) = exchange(writer, reader, next)?;
        if !converged {
            return Err(format!("peers diverged after '{step}'").into());
        }

        match format {
            OutputFormat::Human => {
                let label = format!("{step} ({})", writer.name);
                rows.push(CommitRow::new(label, &commit));
                if args.show_documents {
                    print_json(format, &writer.doc.to_json(&ROOT.into()).unwrap_or_default())?;
                }
            }
            OutputFormat::Json => {
                let events: Vec<String> = commit.events.iter().map(describe_event).collect();
                print_json(
                    format,
                    &serde_json::json!({
                        "step": step,
                        "writer": writer.name,
                        "bytes": commit.update.len(),
                        "events": events,
                        "state": writer.binder.state().to_json(),
                    }),
                )?;
            }
        }
    }

    if format == OutputFormat::Human {
        print_commits(&rows);
        println!();
        print_json(format, &peers[1].binder.state().to_json())?;
    }
    Ok(())
}
