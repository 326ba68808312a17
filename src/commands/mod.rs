pub mod books;
pub mod save;
pub mod settings;
pub mod status;
pub mod summarize;

use crate::error::SummarizerError;
use crate::summarizer::config::load_settings;
use crate::summarizer::paths::{SummarizerPaths, resolve_paths};
use crate::summarizer::state::AppState;
use anyhow::Result;
use serde::Serialize;

pub const DISABLED_HINT: &str = "summarizer is disabled; run `settings set enabled true`";

#[derive(Debug, Clone, Serialize)]
pub struct CommandReport {
    pub command: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    pub details: Vec<String>,
    pub issues: Vec<String>,
}

impl CommandReport {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ok: true,
            output: None,
            details: Vec::new(),
            issues: Vec::new(),
        }
    }

    pub fn detail(&mut self, text: impl Into<String>) {
        self.details.push(text.into());
    }

    pub fn issue(&mut self, text: impl Into<String>) {
        self.ok = false;
        self.issues.push(text.into());
    }

    pub fn pipeline_error(&mut self, phase: &str, err: &SummarizerError) {
        self.issue(format!("{phase} failed [{}]: {err}", err.code()));
    }

    pub fn merge(&mut self, mut other: CommandReport) {
        self.ok &= other.ok;
        if other.output.is_some() {
            self.output = other.output.take();
        }
        self.details.append(&mut other.details);
        self.issues.append(&mut other.issues);
    }
}

/// Resolve paths and load settings into a fresh application state.
pub fn load_state() -> Result<(SummarizerPaths, AppState)> {
    let paths = resolve_paths()?;
    let settings = load_settings(&paths.settings_file)?;
    Ok((paths, AppState::new(settings)))
}
