use anyhow::Result;
use std::path::PathBuf;

use crate::commands::save::save_held_summary;
use crate::commands::{CommandReport, DISABLED_HINT, load_state};
use crate::summarizer::audit;
use crate::summarizer::provider::HttpProvider;
use crate::summarizer::summarize::summarize;
use crate::summarizer::transcript::{FloorRange, SnapshotFileSource, TranscriptSource, extract_turns};

#[derive(Debug, Clone)]
pub struct SummarizeOptions {
    pub transcript: PathBuf,
    pub start: Option<u64>,
    pub end: Option<u64>,
    pub save: bool,
}

/// Missing bounds default to the first and last visible floor.
fn resolve_range(source: &dyn TranscriptSource, start: Option<u64>, end: Option<u64>) -> Result<FloorRange> {
    if let (Some(start), Some(end)) = (start, end) {
        return Ok(FloorRange::new(start, end));
    }
    let visible = extract_turns(source, None)?;
    let first = visible.first().map_or(0, |t| t.floor);
    let last = visible.last().map_or(0, |t| t.floor);
    Ok(FloorRange::new(start.unwrap_or(first), end.unwrap_or(last)))
}

pub fn run(opts: &SummarizeOptions) -> Result<CommandReport> {
    let (paths, mut state) = load_state()?;
    let mut report = CommandReport::new(if opts.save { "run" } else { "summarize" });
    if !state.settings.enabled {
        report.issue(DISABLED_HINT);
        return Ok(report);
    }

    let source = SnapshotFileSource::new(&opts.transcript);
    let range = match resolve_range(&source, opts.start, opts.end) {
        Ok(range) => range,
        Err(err) => {
            report.issue(format!("transcript unavailable: {err:#}"));
            return Ok(report);
        }
    };
    state.range = Some(range);
    report.detail(format!("range={}-{}", range.start, range.end));
    report.detail(format!("provider={}", state.settings.provider.kind.label()));

    let summary = match summarize(&source, &HttpProvider, &state.settings, range.start, range.end) {
        Ok(summary) => summary,
        Err(err) => {
            audit::record(&paths, "summarize", "failed", &err.to_string());
            report.pipeline_error("summarize", &err);
            return Ok(report);
        }
    };
    audit::record(
        &paths,
        "summarize",
        "ok",
        &format!("floors {}-{}", range.start, range.end),
    );
    report.output = Some(summary.clone());
    state.summary_result = Some(summary);

    if opts.save {
        report.merge(save_held_summary(&paths, &state));
    }
    Ok(report)
}
