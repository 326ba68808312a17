use anyhow::Result;

use crate::commands::CommandReport;
use crate::summarizer::paths::resolve_paths;
use crate::summarizer::settings_store::{
    FileSettingsStore, SETTING_FIELDS, SettingsStore, apply_field, is_secret, read_field,
};

fn masked(field: &str, value: &str) -> String {
    if is_secret(field) && !value.is_empty() {
        "***".to_string()
    } else {
        value.replace('\n', "\\n")
    }
}

pub fn show() -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let store = FileSettingsStore::new(&paths.settings_file);
    let settings = store.load()?;
    let mut report = CommandReport::new("settings-show");
    for field in SETTING_FIELDS {
        let value = read_field(&settings, field)?;
        report.detail(format!("{field}={}", masked(field, &value)));
    }
    Ok(report)
}

pub fn set(field: &str, value: &str) -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let store = FileSettingsStore::new(&paths.settings_file);
    let mut settings = store.load()?;
    let mut report = CommandReport::new("settings-set");

    let change = match apply_field(&mut settings, field, value) {
        Ok(change) => change,
        Err(err) => {
            report.issue(format!("{err:#}"));
            return Ok(report);
        }
    };
    if change.changed() {
        store.save(&settings)?;
        report.detail(format!("changed {}", change.describe()));
        report.detail(format!("saved={}", paths.settings_file.display()));
    } else {
        report.detail(format!("unchanged {}", change.field));
    }
    Ok(report)
}
