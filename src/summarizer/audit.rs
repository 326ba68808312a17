use crate::summarizer::paths::SummarizerPaths;
use crate::summarizer::util::now_epoch_secs;
use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::PathBuf;

/// One pipeline phase outcome, written as a single JSON line.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent<'a> {
    pub at: String,
    pub at_epoch_secs: u64,
    pub phase: &'a str,
    pub status: &'a str,
    pub message: &'a str,
}

impl<'a> AuditEvent<'a> {
    pub fn now(phase: &'a str, status: &'a str, message: &'a str) -> Self {
        Self {
            at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            at_epoch_secs: now_epoch_secs(),
            phase,
            status,
            message,
        }
    }
}

pub fn audit_log_path(paths: &SummarizerPaths) -> PathBuf {
    paths.logs_dir.join("audit.log")
}

pub fn append_event(paths: &SummarizerPaths, event: &AuditEvent<'_>) -> Result<()> {
    fs::create_dir_all(&paths.logs_dir)
        .with_context(|| format!("failed to create {}", paths.logs_dir.display()))?;
    let path = audit_log_path(paths);
    let mut line = serde_json::to_vec(event)?;
    line.push(b'\n');
    fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .and_then(|mut file| file.write_all(&line))
        .with_context(|| format!("failed to append to {}", path.display()))
}

/// Never fails the command; a write problem only becomes a warning.
pub fn record(paths: &SummarizerPaths, phase: &str, status: &str, message: &str) {
    if let Err(err) = append_event(paths, &AuditEvent::now(phase, status, message)) {
        tracing::warn!(phase, "audit log append failed: {err:#}");
    }
}
