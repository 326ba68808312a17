use crate::summarizer::config::Settings;
use crate::summarizer::transcript::FloorRange;

/// Everything a command handler reads or mutates, passed explicitly instead
/// of living in globals.
#[derive(Debug, Clone)]
pub struct AppState {
    pub settings: Settings,
    pub range: Option<FloorRange>,
    pub summary_result: Option<String>,
}

impl AppState {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            range: None,
            summary_result: None,
        }
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary_result = Some(summary.into());
        self
    }
}
