use crate::summarizer::provider::{DEFAULT_MODEL, ProviderConfig, ProviderKind};
use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;

pub const DEFAULT_NOTEBOOK_NAME: &str = "SilentSummaries";

pub const DEFAULT_SUMMARY_INSTRUCTION: &str = "Summarize the supplied conversation as a chronological list of core events.

[Core events] <one sentence naming the central theme>

- <first key plot point: main characters' actions, key dialogue, emotional shifts>
- <second key plot point: same structure>
- <further plot points in the same format, in chronological order>

Requirements:
1. Only extract events that move the story forward.
2. Describe every plot point as a complete narrative sentence.
3. Keep an objective third-person perspective.
4. Skip repetitive everyday detail; describe mature content objectively.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    pub kind: ProviderKind,
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub request_timeout_secs: u64,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            kind: ProviderKind::OpenAi,
            base_url: "http://127.0.0.1:5000/v1".to_string(),
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            request_timeout_secs: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotebookSettings {
    pub name: String,
    pub store_url: String,
    pub api_prefix: String,
    pub csrf_token: String,
    pub session_cookie: String,
}

impl Default for NotebookSettings {
    fn default() -> Self {
        Self {
            name: DEFAULT_NOTEBOOK_NAME.to_string(),
            store_url: "http://127.0.0.1:8000".to_string(),
            api_prefix: "/api/worldinfo".to_string(),
            csrf_token: String::new(),
            session_cookie: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptSettings {
    pub summary_instruction: String,
}

impl Default for PromptSettings {
    fn default() -> Self {
        Self {
            summary_instruction: DEFAULT_SUMMARY_INSTRUCTION.to_string(),
        }
    }
}

/// Summarize-on-threshold knobs. Stored and validated only; nothing schedules
/// a summary from them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoSettings {
    pub enabled: bool,
    pub trigger_turns: u64,
    pub keep_turns: u64,
}

impl Default for AutoSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            trigger_turns: 40,
            keep_turns: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub enabled: bool,
    pub provider: ProviderSettings,
    pub notebook: NotebookSettings,
    pub prompt: PromptSettings,
    pub auto: AutoSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enabled: true,
            provider: ProviderSettings::default(),
            notebook: NotebookSettings::default(),
            prompt: PromptSettings::default(),
            auto: AutoSettings::default(),
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

impl Settings {
    pub fn provider_config(&self) -> ProviderConfig {
        ProviderConfig {
            kind: self.provider.kind,
            base_url: self.provider.base_url.trim().to_string(),
            api_key: non_empty(&self.provider.api_key),
            model: non_empty(&self.provider.model),
            timeout_secs: Some(self.provider.request_timeout_secs).filter(|s| *s > 0),
        }
    }

    pub fn notebook_name(&self) -> String {
        non_empty(&self.notebook.name).unwrap_or_else(|| DEFAULT_NOTEBOOK_NAME.to_string())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct PartialSettings {
    enabled: Option<bool>,
    provider: Option<ProviderSettings>,
    notebook: Option<NotebookSettings>,
    prompt: Option<PromptSettings>,
    auto: Option<AutoSettings>,
}

fn env_or_u64(var: &str, fallback: u64) -> u64 {
    match env::var(var) {
        Ok(v) => v.trim().parse::<u64>().ok().unwrap_or(fallback),
        Err(_) => fallback,
    }
}

fn env_or_bool(var: &str, fallback: bool) -> bool {
    match env::var(var) {
        Ok(v) => match v.trim() {
            "1" | "true" | "TRUE" | "yes" | "on" => true,
            "0" | "false" | "FALSE" | "no" | "off" => false,
            _ => fallback,
        },
        Err(_) => fallback,
    }
}

fn env_or_string(var: &str, fallback: &str) -> String {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => fallback.to_string(),
    }
}

pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

pub fn validate(settings: &Settings) -> Result<()> {
    if settings.auto.trigger_turns == 0 {
        return Err(anyhow!("invalid auto trigger turns: must be >= 1"));
    }
    if settings.auto.enabled && settings.auto.keep_turns >= settings.auto.trigger_turns {
        return Err(anyhow!(
            "invalid auto settings: require keep_turns < trigger_turns"
        ));
    }
    if settings.notebook.api_prefix.trim().is_empty() {
        return Err(anyhow!("invalid notebook api prefix: cannot be empty"));
    }
    if settings.prompt.summary_instruction.trim().is_empty() {
        return Err(anyhow!("invalid summary instruction: cannot be empty"));
    }
    Ok(())
}

fn merge_file_settings(base: &mut Settings, path: &Path) -> Result<()> {
    if !path.exists() {
        return Ok(());
    }

    let raw = fs::read_to_string(path)?;
    let parsed: PartialSettings = toml::from_str(&raw)
        .map_err(|err| anyhow!("failed to parse settings {}: {err}", path.display()))?;
    if let Some(enabled) = parsed.enabled {
        base.enabled = enabled;
    }
    if let Some(provider) = parsed.provider {
        base.provider = provider;
    }
    if let Some(notebook) = parsed.notebook {
        base.notebook = notebook;
    }
    if let Some(prompt) = parsed.prompt {
        base.prompt = prompt;
    }
    if let Some(auto) = parsed.auto {
        base.auto = auto;
    }
    Ok(())
}

/// Defaults plus the settings file, without environment overrides.
pub fn load_file_settings(path: &Path) -> Result<Settings> {
    let mut settings = Settings::default();
    merge_file_settings(&mut settings, path)?;
    Ok(settings)
}

fn apply_env_overrides(settings: &mut Settings) -> Result<()> {
    if let Ok(raw) = env::var("SS_PROVIDER")
        && !raw.trim().is_empty()
    {
        settings.provider.kind = ProviderKind::parse(&raw).ok_or_else(|| {
            anyhow!("invalid SS_PROVIDER `{raw}`: use openai, openai-compatible or gemini")
        })?;
    }
    settings.provider.base_url = env_or_string("SS_BASE_URL", &settings.provider.base_url);
    settings.provider.api_key = env_or_string("SS_API_KEY", &settings.provider.api_key);
    settings.provider.model = env_or_string("SS_MODEL", &settings.provider.model);
    settings.provider.request_timeout_secs = env_or_u64(
        "SS_REQUEST_TIMEOUT_SECS",
        settings.provider.request_timeout_secs,
    );
    settings.notebook.name = env_or_string("SS_NOTEBOOK", &settings.notebook.name);
    settings.notebook.store_url = env_or_string("SS_STORE_URL", &settings.notebook.store_url);
    settings.notebook.csrf_token = env_or_string("SS_CSRF_TOKEN", &settings.notebook.csrf_token);
    settings.notebook.session_cookie =
        env_or_string("SS_STORE_COOKIE", &settings.notebook.session_cookie);
    settings.auto.enabled = env_or_bool("SS_AUTO_ENABLED", settings.auto.enabled);
    settings.auto.trigger_turns = env_or_u64("SS_AUTO_TRIGGER_TURNS", settings.auto.trigger_turns);
    settings.auto.keep_turns = env_or_u64("SS_AUTO_KEEP_TURNS", settings.auto.keep_turns);
    Ok(())
}

pub fn load_settings(path: &Path) -> Result<Settings> {
    let mut settings = load_file_settings(path)?;
    apply_env_overrides(&mut settings)?;
    validate(&settings)?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::{DEFAULT_NOTEBOOK_NAME, Settings, load_file_settings, parse_bool, validate};
    use crate::summarizer::provider::ProviderKind;
    use std::fs;

    #[test]
    fn missing_sections_keep_defaults() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path = tmp.path().join("settings.toml");
        fs::write(
            &path,
            "[provider]\nkind = \"gemini\"\nbase_url = \"https://example.com/g\"\napi_key = \"k\"\n",
        )
        .expect("write settings");

        let settings = load_file_settings(&path).expect("load");
        assert_eq!(settings.provider.kind, ProviderKind::Gemini);
        assert_eq!(settings.provider.model, "gpt-3.5-turbo");
        assert_eq!(settings.notebook.name, DEFAULT_NOTEBOOK_NAME);
        assert!(settings.enabled);
    }

    #[test]
    fn absent_file_yields_defaults() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let settings = load_file_settings(&tmp.path().join("nope.toml")).expect("load");
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn provider_config_drops_blank_optionals() {
        let mut settings = Settings::default();
        settings.provider.api_key = "  ".to_string();
        settings.provider.model = String::new();
        let cfg = settings.provider_config();
        assert_eq!(cfg.api_key, None);
        assert_eq!(cfg.model, None);
        assert_eq!(cfg.timeout_secs, None);
    }

    #[test]
    fn blank_notebook_name_falls_back() {
        let mut settings = Settings::default();
        settings.notebook.name = " ".to_string();
        assert_eq!(settings.notebook_name(), DEFAULT_NOTEBOOK_NAME);
    }

    #[test]
    fn validate_rejects_keep_not_below_trigger_when_enabled() {
        let mut settings = Settings::default();
        settings.auto.enabled = true;
        settings.auto.trigger_turns = 10;
        settings.auto.keep_turns = 10;
        assert!(validate(&settings).is_err());

        settings.auto.enabled = false;
        assert!(validate(&settings).is_ok());
    }

    #[test]
    fn parse_bool_accepts_common_spellings() {
        assert_eq!(parse_bool("Yes"), Some(true));
        assert_eq!(parse_bool("off"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }
}
