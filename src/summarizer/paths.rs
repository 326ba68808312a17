use anyhow::{Result, anyhow};
use std::env;
use std::path::PathBuf;

const DATA_DIR_NAME: &str = ".silent_summarizer";

#[derive(Debug, Clone)]
pub struct SummarizerPaths {
    pub home: PathBuf,
    pub settings_file: PathBuf,
    pub logs_dir: PathBuf,
}

fn path_override(var: &str) -> Option<PathBuf> {
    env::var(var)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

fn layout(
    home: PathBuf,
    settings_file: Option<PathBuf>,
    logs_dir: Option<PathBuf>,
) -> SummarizerPaths {
    SummarizerPaths {
        settings_file: settings_file.unwrap_or_else(|| home.join("settings.toml")),
        logs_dir: logs_dir.unwrap_or_else(|| home.join("logs")),
        home,
    }
}

/// `SS_HOME` (default `~/.silent_summarizer`) with per-file overrides
/// `SS_CONFIG_PATH` and `SS_LOGS_DIR`. The user's home directory is only
/// needed when `SS_HOME` is unset.
pub fn resolve_paths() -> Result<SummarizerPaths> {
    let home = match path_override("SS_HOME") {
        Some(home) => home,
        None => dirs::home_dir()
            .ok_or_else(|| anyhow!("HOME directory could not be resolved; set SS_HOME"))?
            .join(DATA_DIR_NAME),
    };
    Ok(layout(
        home,
        path_override("SS_CONFIG_PATH"),
        path_override("SS_LOGS_DIR"),
    ))
}
