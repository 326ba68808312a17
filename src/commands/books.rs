use anyhow::Result;
use serde_json::Value;

use crate::commands::{CommandReport, load_state};
use crate::summarizer::notes::{HttpNotesStore, NotesStore};

fn describe_entry(uid: &str, entry: &Value) -> String {
    let depth = entry.get("depth").map_or_else(|| "-".to_string(), Value::to_string);
    let keys = match entry.get("key") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join(", "),
        Some(Value::String(raw)) => raw.clone(),
        _ => String::new(),
    };
    format!("entry uid={uid} depth={depth} keys={keys}")
}

/// Unlike the save path, a failed lookup here is an issue, not an empty book.
fn show_notebook(store: &dyn NotesStore, name: &str, report: &mut CommandReport) {
    report.detail(format!("notebook={name}"));
    match store.fetch(name) {
        Ok(Some(notebook)) => {
            report.detail(format!("entry_count={}", notebook.entries.len()));
            for (uid, entry) in &notebook.entries {
                report.detail(describe_entry(uid, entry));
            }
        }
        Ok(None) => report.detail("not found"),
        Err(err) => report.issue(format!("{err:#}")),
    }
}

pub fn run(show: Option<&str>) -> Result<CommandReport> {
    let (_, state) = load_state()?;
    let mut report = CommandReport::new("books");

    let store = match HttpNotesStore::from_settings(&state.settings.notebook) {
        Ok(store) => store,
        Err(err) => {
            report.pipeline_error("books", &err);
            return Ok(report);
        }
    };

    if let Some(name) = show {
        show_notebook(&store, name, &mut report);
        return Ok(report);
    }

    match store.list_names() {
        Ok(names) => {
            report.detail(format!("count={}", names.len()));
            for name in names {
                report.detail(format!("name={name}"));
            }
        }
        Err(err) => report.issue(format!("{err:#}")),
    }
    Ok(report)
}
