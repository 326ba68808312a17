use crate::summarizer::provider::{LlmProvider, ProviderConfig};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

pub const STRUCTURING_INSTRUCTION: &str = "Based on the plot summary below, produce one World Info entry.
Pick the single most central noun (a place, item, event or concept).

Output format (JSON):
{
    \"keys\": \"keyword1, keyword2\",
    \"entry\": \"detailed entry content...\",
    \"depth\": 2
}";

pub const FALLBACK_KEY: &str = "Summary";
pub const DEFAULT_DEPTH: u32 = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryCandidate {
    pub keys: Vec<String>,
    pub entry: String,
    pub depth: u32,
}

impl EntryCandidate {
    pub fn fallback(summary: &str) -> Self {
        Self {
            keys: vec![FALLBACK_KEY.to_string()],
            entry: summary.to_string(),
            depth: DEFAULT_DEPTH,
        }
    }
}

#[derive(Debug, Error)]
pub enum CandidateError {
    #[error("reply contains no JSON object")]
    NoJsonObject,
    #[error("reply JSON is malformed: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("reply JSON is not an object")]
    NotAnObject,
}

/// Span from the first `{` to the last `}`; replies are short, so the greedy
/// span is good enough.
pub fn locate_json_object(reply: &str) -> Option<&str> {
    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    if end < start {
        return None;
    }
    reply.get(start..=end)
}

pub fn split_keys(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

fn coerce_keys(value: &Value) -> Option<Vec<String>> {
    let keys = match value {
        Value::String(s) => split_keys(s),
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .flat_map(split_keys)
            .collect(),
        _ => return None,
    };
    if keys.is_empty() { None } else { Some(keys) }
}

/// Leading integer of a string, the way a lenient numeric parse reads `"3 levels"`.
fn leading_integer(raw: &str) -> Option<i64> {
    let trimmed = raw.trim_start();
    let (negative, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let end = digits
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map_or(digits.len(), |(idx, _)| idx);
    let parsed = digits[..end].parse::<i64>().ok()?;
    Some(if negative { -parsed } else { parsed })
}

fn coerce_depth(value: &Value) -> Option<u32> {
    let raw = match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => leading_integer(s),
        _ => None,
    }?;
    u32::try_from(raw).ok()
}

/// Decode a structuring reply, merging parsed fields over the defaults.
pub fn parse_candidate(reply: &str, summary: &str) -> Result<EntryCandidate, CandidateError> {
    let raw = locate_json_object(reply).ok_or(CandidateError::NoJsonObject)?;
    let parsed: Value = serde_json::from_str(raw)?;
    let object = parsed.as_object().ok_or(CandidateError::NotAnObject)?;

    let mut candidate = EntryCandidate::fallback(summary);
    if let Some(keys) = object.get("keys").and_then(coerce_keys) {
        candidate.keys = keys;
    }
    if let Some(entry) = object.get("entry").and_then(Value::as_str) {
        candidate.entry = entry.to_string();
    }
    if let Some(depth) = object.get("depth") {
        candidate.depth = coerce_depth(depth).unwrap_or(DEFAULT_DEPTH);
    }
    Ok(candidate)
}

/// Ask the provider to structure `summary` into an entry candidate.
///
/// Never fails: a provider error or an unusable reply falls back to the
/// summary text under the `Summary` key.
pub fn synthesize(
    provider: &dyn LlmProvider,
    config: &ProviderConfig,
    summary: &str,
) -> EntryCandidate {
    tracing::info!("generating entry keys");
    let reply = match provider.invoke(STRUCTURING_INSTRUCTION, summary, config) {
        Ok(reply) => reply,
        Err(err) => {
            tracing::warn!(code = err.code(), "entry synthesis call failed, using defaults: {err}");
            return EntryCandidate::fallback(summary);
        }
    };

    match parse_candidate(&reply, summary) {
        Ok(candidate) => candidate,
        Err(err) => {
            tracing::warn!("entry JSON parse failed, using defaults: {err}");
            EntryCandidate::fallback(summary)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SummarizerError;
    use crate::summarizer::config::Settings;

    struct CannedProvider(Result<String, String>);

    impl LlmProvider for CannedProvider {
        fn invoke(
            &self,
            system_instruction: &str,
            _user_content: &str,
            _config: &ProviderConfig,
        ) -> Result<String, SummarizerError> {
            assert_eq!(system_instruction, STRUCTURING_INSTRUCTION);
            self.0.clone().map_err(SummarizerError::Provider)
        }
    }

    fn run(reply: &str, summary: &str) -> EntryCandidate {
        let cfg = Settings::default().provider_config();
        synthesize(&CannedProvider(Ok(reply.to_string())), &cfg, summary)
    }

    #[test]
    fn extracts_object_embedded_in_prose() {
        let got = run(
            "Sure! Here it is:\n{\"keys\":\"A, B\",\"entry\":\"X\",\"depth\":3}\nHope that helps.",
            "summary",
        );
        assert_eq!(got.keys, vec!["A".to_string(), "B".to_string()]);
        assert_eq!(got.entry, "X");
        assert_eq!(got.depth, 3);
    }

    #[test]
    fn handles_fenced_multiline_json() {
        let reply = "```json\n{\n  \"keys\": \"Castle,  , Moat \",\n  \"entry\": \"The castle.\"\n}\n```";
        let got = run(reply, "summary");
        assert_eq!(got.keys, vec!["Castle".to_string(), "Moat".to_string()]);
        assert_eq!(got.entry, "The castle.");
        assert_eq!(got.depth, DEFAULT_DEPTH);
    }

    #[test]
    fn non_json_reply_falls_back() {
        let got = run("I cannot do that.", "the original summary");
        assert_eq!(got, EntryCandidate::fallback("the original summary"));
        assert_eq!(got.keys, vec!["Summary".to_string()]);
        assert_eq!(got.depth, 2);
    }

    #[test]
    fn malformed_json_falls_back() {
        let got = run("{\"keys\": \"A\", \"entry\": }", "s");
        assert_eq!(got, EntryCandidate::fallback("s"));
        let got = run("} backwards {", "s");
        assert_eq!(got, EntryCandidate::fallback("s"));
    }

    #[test]
    fn provider_failure_falls_back() {
        let cfg = Settings::default().provider_config();
        let got = synthesize(&CannedProvider(Err("quota".to_string())), &cfg, "s");
        assert_eq!(got, EntryCandidate::fallback("s"));
    }

    #[test]
    fn wrong_typed_fields_are_coerced_or_defaulted() {
        let got = run(
            "{\"keys\":[\"Dragon\",\" Hoard \",7],\"entry\":42,\"depth\":\"4 levels\"}",
            "s",
        );
        assert_eq!(got.keys, vec!["Dragon".to_string(), "Hoard".to_string()]);
        assert_eq!(got.entry, "s");
        assert_eq!(got.depth, 4);

        let got = run("{\"keys\":\"  \",\"depth\":\"deep\"}", "s");
        assert_eq!(got.keys, vec!["Summary".to_string()]);
        assert_eq!(got.depth, 2);

        let got = run("{\"depth\":-1}", "s");
        assert_eq!(got.depth, 2);

        let got = run("{\"depth\":5.9}", "s");
        assert_eq!(got.depth, 5);
    }

    #[test]
    fn locate_json_object_spans_first_to_last_brace() {
        assert_eq!(locate_json_object("a {x} b {y} c"), Some("{x} b {y}"));
        assert_eq!(locate_json_object("no braces"), None);
    }
}
