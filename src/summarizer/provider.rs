use crate::error::SummarizerError;
use crate::summarizer::util::clip_for_log;
use reqwest::Url;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::time::Duration;

pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
const COMPLETIONS_PATH: &str = "/chat/completions";
const MAX_ERROR_BODY_CHARS: usize = 400;

/// Request/response shape spoken by the configured endpoint.
///
/// `OpenAi` and `OpenAiCompatible` share a wire format; they differ only in
/// whether the base URL is trusted verbatim (`OpenAi`, the default literal) or
/// normalized to end in `/chat/completions`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ProviderKind {
    #[default]
    #[serde(rename = "openai")]
    OpenAi,
    #[serde(rename = "openai-compatible", alias = "compatible", alias = "custom")]
    OpenAiCompatible,
    #[serde(rename = "gemini", alias = "google")]
    Gemini,
}

impl ProviderKind {
    pub fn label(self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::OpenAiCompatible => "openai-compatible",
            ProviderKind::Gemini => "gemini",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "openai" => Some(ProviderKind::OpenAi),
            "openai-compatible" | "compatible" | "custom" => Some(ProviderKind::OpenAiCompatible),
            "gemini" | "google" => Some(ProviderKind::Gemini),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub timeout_secs: Option<u64>,
}

/// Fully resolved HTTP call, built without touching the network.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Value,
}

impl ProviderRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

pub trait LlmProvider {
    fn invoke(
        &self,
        system_instruction: &str,
        user_content: &str,
        config: &ProviderConfig,
    ) -> Result<String, SummarizerError>;
}

fn chat_completions_target(kind: ProviderKind, base_url: &str) -> String {
    if kind == ProviderKind::OpenAi || base_url.ends_with(COMPLETIONS_PATH) {
        return base_url.to_string();
    }
    format!("{}{COMPLETIONS_PATH}", base_url.trim_end_matches('/'))
}

/// Append `key=` to the configured URL unless a `key` parameter is already
/// present. The URL is otherwise left exactly as configured.
fn gemini_target(base_url: &str, api_key: Option<&str>) -> String {
    let Some(key) = api_key else {
        return base_url.to_string();
    };
    let query = base_url.split_once('?').map(|(_, q)| q);
    let has_key = query.is_some_and(|q| {
        q.split('&')
            .any(|pair| pair.split('=').next() == Some("key"))
    });
    if has_key {
        return base_url.to_string();
    }
    let sep = if query.is_some() { '&' } else { '?' };
    format!("{base_url}{sep}key={key}")
}

pub fn build_request(
    system_instruction: &str,
    user_content: &str,
    config: &ProviderConfig,
) -> Result<ProviderRequest, SummarizerError> {
    let base_url = config.base_url.trim();
    if base_url.is_empty() {
        return Err(SummarizerError::Config(
            "provider base URL is not configured".to_string(),
        ));
    }
    let api_key = config.api_key.as_deref().filter(|k| !k.trim().is_empty());

    match config.kind {
        ProviderKind::Gemini => Ok(ProviderRequest {
            url: gemini_target(base_url, api_key),
            headers: Vec::new(),
            body: json!({
                "contents": [
                    {"role": "user", "parts": [{"text": user_content}]}
                ],
                "systemInstruction": {"parts": [{"text": system_instruction}]}
            }),
        }),
        kind @ (ProviderKind::OpenAi | ProviderKind::OpenAiCompatible) => {
            let mut headers = Vec::new();
            if let Some(key) = api_key {
                headers.push(("Authorization".to_string(), format!("Bearer {key}")));
            }
            let model = config
                .model
                .as_deref()
                .filter(|m| !m.trim().is_empty())
                .unwrap_or(DEFAULT_MODEL);
            Ok(ProviderRequest {
                url: chat_completions_target(kind, base_url),
                headers,
                body: json!({
                    "model": model,
                    "messages": [
                        {"role": "system", "content": system_instruction},
                        {"role": "user", "content": user_content}
                    ]
                }),
            })
        }
    }
}

fn extract_chat_completion_text(json: &Value) -> Option<String> {
    let choices = json.get("choices").and_then(Value::as_array)?;
    let first = choices.first()?;
    let content = first.get("message")?.get("content")?;
    match content {
        Value::String(s) => Some(s.to_string()),
        Value::Array(parts) => {
            let chunks: Vec<&str> = parts
                .iter()
                .filter_map(|part| part.get("text").and_then(Value::as_str))
                .collect();
            if chunks.is_empty() {
                None
            } else {
                Some(chunks.join("\n"))
            }
        }
        _ => None,
    }
}

fn extract_gemini_text(json: &Value) -> Option<String> {
    json.get("candidates")
        .and_then(Value::as_array)
        .and_then(|arr| arr.first())
        .and_then(|v| v.get("content"))
        .and_then(|v| v.get("parts"))
        .and_then(Value::as_array)
        .and_then(|parts| parts.first())
        .and_then(|v| v.get("text"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Pull the reply text out of a decoded response body.
pub fn extract_reply(kind: ProviderKind, json: &Value) -> Result<String, SummarizerError> {
    if let Some(err) = json.get("error")
        && !matches!(err, Value::Null | Value::Bool(false))
    {
        return Err(SummarizerError::Provider(err.to_string()));
    }

    let text = match kind {
        ProviderKind::Gemini => extract_gemini_text(json),
        ProviderKind::OpenAi | ProviderKind::OpenAiCompatible => extract_chat_completion_text(json),
    };
    match text {
        Some(text) if !text.is_empty() => Ok(text),
        _ => Err(SummarizerError::EmptyReply),
    }
}

/// Hide a `key=` query value before the URL reaches a log line.
fn redact_url(raw: &str) -> String {
    let Ok(mut url) = Url::parse(raw) else {
        let Some((path, query)) = raw.split_once('?') else {
            return raw.to_string();
        };
        let masked: Vec<&str> = query
            .split('&')
            .map(|pair| if pair.starts_with("key=") { "key=***" } else { pair })
            .collect();
        return format!("{path}?{}", masked.join("&"));
    };
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let value = if k == "key" { "***".to_string() } else { v.into_owned() };
            (k.into_owned(), value)
        })
        .collect();
    if pairs.is_empty() {
        return url.to_string();
    }
    url.query_pairs_mut().clear().extend_pairs(pairs);
    url.to_string()
}

/// Blocking HTTP adapter; one POST per call, no retry.
pub struct HttpProvider;

impl LlmProvider for HttpProvider {
    fn invoke(
        &self,
        system_instruction: &str,
        user_content: &str,
        config: &ProviderConfig,
    ) -> Result<String, SummarizerError> {
        let request = build_request(system_instruction, user_content, config)?;

        let mut builder = Client::builder();
        if let Some(secs) = config.timeout_secs.filter(|s| *s > 0) {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build().map_err(|err| {
            SummarizerError::Provider(format!("failed to build HTTP client: {err}"))
        })?;

        tracing::info!(
            provider = config.kind.label(),
            url = %redact_url(&request.url),
            authorized = request.header("Authorization").is_some(),
            "calling provider"
        );
        let mut call = client.post(&request.url).json(&request.body);
        for (name, value) in &request.headers {
            call = call.header(name.as_str(), value.as_str());
        }
        let response = call.send().map_err(|err| {
            SummarizerError::Provider(format!("request failed: {}", err.without_url()))
        })?;

        let status = response.status();
        let body = response.text().map_err(|err| {
            SummarizerError::Provider(format!("failed to read response: {}", err.without_url()))
        })?;
        let json: Value = serde_json::from_str(&body).map_err(|_| {
            SummarizerError::Provider(format!(
                "status {status} with non-JSON body: {}",
                clip_for_log(&body, MAX_ERROR_BODY_CHARS)
            ))
        })?;
        extract_reply(config.kind, &json)
    }
}
