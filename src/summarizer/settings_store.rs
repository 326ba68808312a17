use crate::summarizer::config::{Settings, load_file_settings, parse_bool, validate};
use crate::summarizer::provider::ProviderKind;
use anyhow::{Context, Result, anyhow};
use std::fs;
use std::path::PathBuf;

/// Persistence boundary for user settings.
pub trait SettingsStore {
    fn load(&self) -> Result<Settings>;
    fn save(&self, settings: &Settings) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileSettingsStore {
    pub path: PathBuf,
}

impl FileSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SettingsStore for FileSettingsStore {
    fn load(&self) -> Result<Settings> {
        load_file_settings(&self.path)
    }

    fn save(&self, settings: &Settings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let data = toml::to_string_pretty(settings)?;
        fs::write(&self.path, data)
            .with_context(|| format!("failed to write {}", self.path.display()))?;
        Ok(())
    }
}

pub const SETTING_FIELDS: &[&str] = &[
    "enabled",
    "provider.kind",
    "provider.base_url",
    "provider.api_key",
    "provider.model",
    "provider.request_timeout_secs",
    "notebook.name",
    "notebook.store_url",
    "notebook.api_prefix",
    "notebook.csrf_token",
    "notebook.session_cookie",
    "prompt.summary_instruction",
    "auto.enabled",
    "auto.trigger_turns",
    "auto.keep_turns",
];

pub fn is_secret(field: &str) -> bool {
    matches!(
        field,
        "provider.api_key" | "notebook.csrf_token" | "notebook.session_cookie"
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingChange {
    pub field: String,
    pub previous: String,
    pub current: String,
}

impl SettingChange {
    pub fn changed(&self) -> bool {
        self.previous != self.current
    }

    /// Human-readable line with secret values masked.
    pub fn describe(&self) -> String {
        let show = |v: &str| {
            if is_secret(&self.field) && !v.is_empty() {
                "***".to_string()
            } else {
                v.to_string()
            }
        };
        format!(
            "{}: {} -> {}",
            self.field,
            show(&self.previous),
            show(&self.current)
        )
    }
}

pub fn read_field(settings: &Settings, field: &str) -> Result<String> {
    let value = match field {
        "enabled" => settings.enabled.to_string(),
        "provider.kind" => settings.provider.kind.label().to_string(),
        "provider.base_url" => settings.provider.base_url.clone(),
        "provider.api_key" => settings.provider.api_key.clone(),
        "provider.model" => settings.provider.model.clone(),
        "provider.request_timeout_secs" => settings.provider.request_timeout_secs.to_string(),
        "notebook.name" => settings.notebook.name.clone(),
        "notebook.store_url" => settings.notebook.store_url.clone(),
        "notebook.api_prefix" => settings.notebook.api_prefix.clone(),
        "notebook.csrf_token" => settings.notebook.csrf_token.clone(),
        "notebook.session_cookie" => settings.notebook.session_cookie.clone(),
        "prompt.summary_instruction" => settings.prompt.summary_instruction.clone(),
        "auto.enabled" => settings.auto.enabled.to_string(),
        "auto.trigger_turns" => settings.auto.trigger_turns.to_string(),
        "auto.keep_turns" => settings.auto.keep_turns.to_string(),
        _ => return Err(unknown_field(field)),
    };
    Ok(value)
}

fn unknown_field(field: &str) -> anyhow::Error {
    anyhow!(
        "unknown setting `{field}`; expected one of: {}",
        SETTING_FIELDS.join(", ")
    )
}

fn parse_u64_field(field: &str, raw: &str) -> Result<u64> {
    raw.trim()
        .parse::<u64>()
        .map_err(|_| anyhow!("setting `{field}` expects a non-negative integer, got `{raw}`"))
}

fn parse_bool_field(field: &str, raw: &str) -> Result<bool> {
    parse_bool(raw).ok_or_else(|| anyhow!("setting `{field}` expects true/false, got `{raw}`"))
}

/// Write one field into `settings`, validating the result as a whole.
pub fn apply_field(settings: &mut Settings, field: &str, raw: &str) -> Result<SettingChange> {
    let previous = read_field(settings, field)?;
    let mut next = settings.clone();
    match field {
        "enabled" => next.enabled = parse_bool_field(field, raw)?,
        "provider.kind" => {
            next.provider.kind = ProviderKind::parse(raw).ok_or_else(|| {
                anyhow!("unknown provider `{raw}`; use openai, openai-compatible or gemini")
            })?;
        }
        "provider.base_url" => next.provider.base_url = raw.trim().to_string(),
        "provider.api_key" => next.provider.api_key = raw.trim().to_string(),
        "provider.model" => next.provider.model = raw.trim().to_string(),
        "provider.request_timeout_secs" => {
            next.provider.request_timeout_secs = parse_u64_field(field, raw)?;
        }
        "notebook.name" => next.notebook.name = raw.trim().to_string(),
        "notebook.store_url" => next.notebook.store_url = raw.trim().to_string(),
        "notebook.api_prefix" => next.notebook.api_prefix = raw.trim().to_string(),
        "notebook.csrf_token" => next.notebook.csrf_token = raw.trim().to_string(),
        "notebook.session_cookie" => next.notebook.session_cookie = raw.trim().to_string(),
        "prompt.summary_instruction" => next.prompt.summary_instruction = raw.to_string(),
        "auto.enabled" => next.auto.enabled = parse_bool_field(field, raw)?,
        "auto.trigger_turns" => next.auto.trigger_turns = parse_u64_field(field, raw)?,
        "auto.keep_turns" => next.auto.keep_turns = parse_u64_field(field, raw)?,
        _ => return Err(unknown_field(field)),
    }
    validate(&next)?;
    *settings = next;

    Ok(SettingChange {
        field: field.to_string(),
        previous,
        current: read_field(settings, field)?,
    })
}

#[cfg(test)]
mod tests {
    use super::{FileSettingsStore, SettingsStore, apply_field};
    use crate::summarizer::config::Settings;
    use crate::summarizer::provider::ProviderKind;

    #[test]
    fn apply_field_reports_change_and_masks_secrets() {
        let mut settings = Settings::default();
        let change = apply_field(&mut settings, "provider.api_key", "sk-123").expect("apply");
        assert!(change.changed());
        assert_eq!(settings.provider.api_key, "sk-123");
        assert_eq!(change.describe(), "provider.api_key:  -> ***");

        let change = apply_field(&mut settings, "provider.kind", "google").expect("apply");
        assert_eq!(settings.provider.kind, ProviderKind::Gemini);
        assert_eq!(change.describe(), "provider.kind: openai -> gemini");
    }

    #[test]
    fn apply_field_rejects_unknown_and_invalid_values() {
        let mut settings = Settings::default();
        assert!(apply_field(&mut settings, "provider.colour", "blue").is_err());
        assert!(apply_field(&mut settings, "auto.trigger_turns", "-3").is_err());
        assert!(apply_field(&mut settings, "auto.trigger_turns", "0").is_err());
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn file_store_round_trips_settings() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let store = FileSettingsStore::new(tmp.path().join("nested/settings.toml"));
        let mut settings = Settings::default();
        apply_field(&mut settings, "notebook.name", "Campaign").expect("apply");
        apply_field(&mut settings, "prompt.summary_instruction", "Be brief.\nUse bullets.")
            .expect("apply");
        store.save(&settings).expect("save");

        let loaded = store.load().expect("load");
        assert_eq!(loaded, settings);
    }
}
