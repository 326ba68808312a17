use crate::error::SummarizerError;
use crate::summarizer::config::Settings;
use crate::summarizer::provider::LlmProvider;
use crate::summarizer::transcript::{FloorRange, TranscriptSource, Turn, extract_turns};

pub fn join_transcript(turns: &[Turn]) -> String {
    turns
        .iter()
        .map(|t| format!("{}: {}", t.sender, t.content))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Summarize the visible turns between `start` and `end` (inclusive).
///
/// An inverted or empty range fails with `EmptyRange` before any provider call.
/// A transcript source that cannot be read is reported as a configuration
/// problem, since the snapshot location comes from the caller.
pub fn summarize(
    source: &dyn TranscriptSource,
    provider: &dyn LlmProvider,
    settings: &Settings,
    start: u64,
    end: u64,
) -> Result<String, SummarizerError> {
    if start > end {
        return Err(SummarizerError::EmptyRange { start, end });
    }
    let turns = extract_turns(source, Some(FloorRange::new(start, end)))
        .map_err(|err| SummarizerError::Config(format!("transcript unavailable: {err:#}")))?;
    if turns.is_empty() {
        return Err(SummarizerError::EmptyRange { start, end });
    }

    let transcript = join_transcript(&turns);
    tracing::info!(start, end, turns = turns.len(), "summarizing floor range");
    provider.invoke(
        &settings.prompt.summary_instruction,
        &transcript,
        &settings.provider_config(),
    )
}
