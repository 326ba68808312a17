use anyhow::Result;
use std::env;

use crate::commands::{CommandReport, load_state};

include!(concat!(env!("OUT_DIR"), "/ss_env_allowlist.rs"));

pub fn run() -> Result<CommandReport> {
    let (paths, state) = load_state()?;
    let settings = &state.settings;
    let mut report = CommandReport::new("status");

    report.detail(format!("home={}", paths.home.display()));
    report.detail(format!("settings_file={}", paths.settings_file.display()));
    report.detail(format!("logs_dir={}", paths.logs_dir.display()));
    report.detail(format!("enabled={}", settings.enabled));
    report.detail(format!("provider={}", settings.provider.kind.label()));
    report.detail(format!("base_url={}", settings.provider.base_url));
    report.detail(format!("model={}", settings.provider.model));
    report.detail(format!(
        "api_key={}",
        if settings.provider.api_key.is_empty() { "unset" } else { "set" }
    ));
    report.detail(format!("notebook={}", settings.notebook_name()));
    report.detail(format!("store_url={}", settings.notebook.store_url));
    report.detail(format!(
        "auto=enabled:{} trigger_turns:{} keep_turns:{}",
        settings.auto.enabled, settings.auto.trigger_turns, settings.auto.keep_turns
    ));

    let overrides: Vec<&str> = GENERATED_SS_ENV_ALLOWLIST
        .iter()
        .copied()
        .filter(|var| env::var(var).is_ok_and(|v| !v.trim().is_empty()))
        .collect();
    if !overrides.is_empty() {
        report.detail(format!("env_overrides={}", overrides.join(",")));
    }

    if !paths.settings_file.exists() {
        report.detail("settings file not found; using defaults");
    }
    if settings.provider.base_url.trim().is_empty() {
        report.issue("provider base URL is empty; set provider.base_url or SS_BASE_URL");
    }
    if settings.notebook.store_url.trim().is_empty() {
        report.issue("notes store URL is empty; set notebook.store_url or SS_STORE_URL");
    }

    Ok(report)
}
