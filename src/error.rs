use thiserror::Error;

/// Failures the summarize/store pipeline surfaces to the invoking command.
///
/// Entry synthesis parse failures are deliberately absent: they are always
/// recovered into a default candidate inside the synthesizer.
#[derive(Debug, Error)]
pub enum SummarizerError {
    #[error("configuration missing or invalid: {0}")]
    Config(String),
    #[error("no visible turns between floor {start} and floor {end}")]
    EmptyRange { start: u64, end: u64 },
    #[error("provider returned an error: {0}")]
    Provider(String),
    #[error("provider reply carried no text")]
    EmptyReply,
    #[error("notes store write failed: {0}")]
    Store(String),
}

impl SummarizerError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => "E001_CONFIG",
            Self::EmptyRange { .. } => "E002_EMPTY_RANGE",
            Self::Provider(_) => "E003_PROVIDER",
            Self::EmptyReply => "E004_EMPTY_REPLY",
            Self::Store(_) => "E005_STORE",
        }
    }
}
