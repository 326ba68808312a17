use crate::error::SummarizerError;
use crate::summarizer::config::NotebookSettings;
use crate::summarizer::synthesize::EntryCandidate;
use crate::summarizer::util::{clip_for_log, now_epoch_millis};
use anyhow::{Context, Result};
use reqwest::blocking::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;

pub const PROVENANCE_TAG: &str = "SilentSummarizer";
const MAX_ERROR_BODY_CHARS: usize = 300;

/// An entry this tool creates, in the host's wire shape (`key`, `comment`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub uid: i64,
    pub keys: Vec<String>,
    pub content: String,
    pub depth: u32,
    pub selective: bool,
    pub tag: String,
}

impl Entry {
    pub fn from_candidate(uid: i64, candidate: &EntryCandidate) -> Self {
        Self {
            uid,
            keys: candidate.keys.clone(),
            content: candidate.entry.clone(),
            depth: candidate.depth,
            selective: true,
            tag: PROVENANCE_TAG.to_string(),
        }
    }

    pub fn to_wire(&self) -> Value {
        json!({
            "uid": self.uid,
            "key": self.keys,
            "content": self.content,
            "depth": self.depth,
            "selective": self.selective,
            "comment": self.tag,
        })
    }
}

/// A notebook snapshot. Entries stay raw JSON: host-created entries use
/// field types and nulls this tool does not model, and the whole snapshot
/// is written back, so they must pass through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Notebook {
    #[serde(skip)]
    pub name: String,
    #[serde(default)]
    pub entries: BTreeMap<String, Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Notebook {
    pub fn empty(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }
}

pub trait NotesStore {
    fn list_names(&self) -> Result<Vec<String>>;
    /// `Ok(None)` when the notebook does not exist (or carries no entries map).
    fn fetch(&self, name: &str) -> Result<Option<Notebook>>;
    fn store(&self, name: &str, notebook: &Notebook) -> Result<(), SummarizerError>;
}

/// Read a notebook, treating any lookup failure as "not created yet".
pub fn read_notebook(store: &dyn NotesStore, name: &str) -> Notebook {
    match store.fetch(name) {
        Ok(Some(mut notebook)) => {
            notebook.name = name.to_string();
            notebook
        }
        Ok(None) => {
            tracing::info!(notebook = name, "notebook not found, starting a new one");
            Notebook::empty(name)
        }
        Err(err) => {
            tracing::warn!(notebook = name, "notebook lookup failed, starting a new one: {err:#}");
            Notebook::empty(name)
        }
    }
}

pub fn write_notebook(
    store: &dyn NotesStore,
    name: &str,
    notebook: &Notebook,
) -> Result<(), SummarizerError> {
    store.store(name, notebook)
}

/// Insert `candidate` under a fresh millisecond-timestamp uid.
///
/// Two inserts within the same millisecond share a uid and the second
/// replaces the first; this is a known limitation of the timestamp scheme.
pub fn upsert_entry(notebook: Notebook, candidate: &EntryCandidate) -> (Notebook, i64) {
    let uid = now_epoch_millis();
    (upsert_entry_with_uid(notebook, candidate, uid), uid)
}

pub fn upsert_entry_with_uid(mut notebook: Notebook, candidate: &EntryCandidate, uid: i64) -> Notebook {
    notebook
        .entries
        .insert(uid.to_string(), Entry::from_candidate(uid, candidate).to_wire());
    notebook
}

fn parse_names(json: &Value) -> Vec<String> {
    let items = json
        .as_array()
        .or_else(|| json.get("names").and_then(Value::as_array));
    items
        .map(|arr| {
            arr.iter()
                .filter_map(Value::as_str)
                .map(ToOwned::to_owned)
                .collect()
        })
        .unwrap_or_default()
}

pub fn csrf_from_cookie(cookie: &str) -> Option<String> {
    cookie
        .split(';')
        .map(str::trim)
        .find_map(|pair| pair.strip_prefix("csrf_token="))
        .filter(|v| !v.is_empty())
        .map(ToOwned::to_owned)
}

/// Client for the host's world-info endpoints. Every call carries the
/// anti-forgery token and the session cookie.
pub struct HttpNotesStore {
    base_url: String,
    api_prefix: String,
    csrf_token: Option<String>,
    session_cookie: Option<String>,
    client: Client,
}

impl HttpNotesStore {
    pub fn from_settings(settings: &NotebookSettings) -> Result<Self, SummarizerError> {
        let base_url = settings.store_url.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(SummarizerError::Config(
                "notes store URL is not configured".to_string(),
            ));
        }
        let session_cookie = Some(settings.session_cookie.trim().to_string()).filter(|c| !c.is_empty());
        let csrf_token = Some(settings.csrf_token.trim().to_string())
            .filter(|t| !t.is_empty())
            .or_else(|| session_cookie.as_deref().and_then(csrf_from_cookie));
        let client = Client::builder().build().map_err(|err| {
            SummarizerError::Config(format!("failed to build HTTP client: {err}"))
        })?;

        Ok(Self {
            base_url,
            api_prefix: format!("/{}", settings.api_prefix.trim().trim_matches('/')),
            csrf_token,
            session_cookie,
            client,
        })
    }

    fn endpoint(&self, action: &str) -> String {
        format!("{}{}/{action}", self.base_url, self.api_prefix)
    }

    fn post(&self, action: &str, body: &Value) -> RequestBuilder {
        let mut req = self
            .client
            .post(self.endpoint(action))
            .header("X-Requested-With", "XMLHttpRequest")
            .json(body);
        if let Some(token) = &self.csrf_token {
            req = req.header("X-CSRF-Token", token.as_str());
        }
        if let Some(cookie) = &self.session_cookie {
            req = req.header(reqwest::header::COOKIE, cookie.as_str());
        }
        req
    }
}

impl NotesStore for HttpNotesStore {
    fn list_names(&self) -> Result<Vec<String>> {
        let response = self
            .post("get_names", &json!({}))
            .send()
            .map_err(|err| err.without_url())
            .context("notebook name lookup failed")?;
        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("notebook name lookup failed with status {status}");
        }
        let json: Value = response.json().context("invalid notebook name list")?;
        Ok(parse_names(&json))
    }

    fn fetch(&self, name: &str) -> Result<Option<Notebook>> {
        let response = self
            .post("get", &json!({ "name": name }))
            .send()
            .map_err(|err| err.without_url())
            .with_context(|| format!("notebook lookup failed for {name}"))?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            anyhow::bail!("notebook lookup for {name} failed with status {status}");
        }
        let json: Value = response
            .json()
            .with_context(|| format!("invalid notebook payload for {name}"))?;
        if !json.get("entries").is_some_and(Value::is_object) {
            return Ok(None);
        }
        let mut notebook: Notebook = serde_json::from_value(json)
            .with_context(|| format!("invalid notebook entries for {name}"))?;
        notebook.name = name.to_string();
        Ok(Some(notebook))
    }

    fn store(&self, name: &str, notebook: &Notebook) -> Result<(), SummarizerError> {
        let response = self
            .post("edit", &json!({ "name": name, "data": notebook }))
            .send()
            .map_err(|err| SummarizerError::Store(format!("request failed: {}", err.without_url())))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(SummarizerError::Store(format!(
                "API error {status}: {}",
                clip_for_log(&body, MAX_ERROR_BODY_CHARS)
            )));
        }
        Ok(())
    }
}
