use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

use crate::commands::{CommandReport, DISABLED_HINT, load_state};
use crate::summarizer::audit;
use crate::summarizer::notes::HttpNotesStore;
use crate::summarizer::paths::SummarizerPaths;
use crate::summarizer::provider::HttpProvider;
use crate::summarizer::save::save_summary;
use crate::summarizer::state::AppState;

#[derive(Debug, Clone)]
pub struct SaveOptions {
    pub summary: Option<String>,
    pub summary_file: Option<PathBuf>,
    pub notebook: Option<String>,
}

/// File the summary already held in `state` into the configured notebook.
pub fn save_held_summary(paths: &SummarizerPaths, state: &AppState) -> CommandReport {
    let mut report = CommandReport::new("save");
    let store = match HttpNotesStore::from_settings(&state.settings.notebook) {
        Ok(store) => store,
        Err(err) => {
            report.pipeline_error("save", &err);
            return report;
        }
    };

    match save_summary(state, &HttpProvider, &store) {
        Ok(out) => {
            audit::record(
                paths,
                "save",
                "ok",
                &format!("notebook={} uid={}", out.notebook, out.uid),
            );
            report.detail(format!("notebook={}", out.notebook));
            report.detail(format!("uid={}", out.uid));
            report.detail(format!("keys={}", out.keys.join(", ")));
            report.detail(format!("depth={}", out.depth));
            report.detail(format!("entry_count={}", out.entry_count));
            if let Some(range) = state.range {
                report.detail(format!("source_floors={}-{}", range.start, range.end));
            }
        }
        Err(err) => {
            audit::record(paths, "save", "failed", &err.to_string());
            report.pipeline_error("save", &err);
        }
    }
    report
}

pub fn run(opts: &SaveOptions) -> Result<CommandReport> {
    let (paths, mut state) = load_state()?;
    if !state.settings.enabled {
        let mut report = CommandReport::new("save");
        report.issue(DISABLED_HINT);
        return Ok(report);
    }

    let summary = match (&opts.summary, &opts.summary_file) {
        (Some(text), _) => text.clone(),
        (None, Some(path)) => fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        (None, None) => {
            let mut report = CommandReport::new("save");
            report.issue("nothing to save; pass --summary or --summary-file");
            return Ok(report);
        }
    };
    if let Some(name) = &opts.notebook {
        state.settings.notebook.name = name.clone();
    }
    let state = state.with_summary(summary);
    Ok(save_held_summary(&paths, &state))
}
