use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fs;
use std::path::PathBuf;

/// One chat message as the host renders it: the identifier attribute, its
/// visibility state, and the name/text sub-elements.
///
/// Exports are loose about types (numeric ids, class strings, nulls), so
/// every field decodes leniently and an odd value just reads as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderedMessage {
    #[serde(alias = "mesId", alias = "id", deserialize_with = "id_text")]
    pub mesid: Option<String>,
    #[serde(alias = "displayNone", deserialize_with = "flag")]
    pub display_none: bool,
    #[serde(alias = "className", deserialize_with = "class_list")]
    pub classes: Vec<String>,
    #[serde(deserialize_with = "plain_text")]
    pub name: Option<String>,
    #[serde(alias = "mes", deserialize_with = "plain_text")]
    pub text: Option<String>,
}

fn id_text<'de, D: Deserializer<'de>>(de: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(de)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn flag<'de, D: Deserializer<'de>>(de: D) -> Result<bool, D::Error> {
    Ok(match Value::deserialize(de)? {
        Value::Bool(b) => b,
        Value::String(s) => matches!(s.trim(), "true" | "1"),
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        _ => false,
    })
}

/// The DOM hands classes over as one space-separated string; arrays work too.
fn class_list<'de, D: Deserializer<'de>>(de: D) -> Result<Vec<String>, D::Error> {
    let split = |s: &str| s.split_whitespace().map(str::to_string).collect::<Vec<_>>();
    Ok(match Value::deserialize(de)? {
        Value::String(s) => split(&s),
        Value::Array(items) => items.iter().filter_map(Value::as_str).flat_map(split).collect(),
        _ => Vec::new(),
    })
}

fn plain_text<'de, D: Deserializer<'de>>(de: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(de)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Turn {
    pub floor: u64,
    pub sender: String,
    pub content: String,
    pub hidden: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FloorRange {
    pub start: u64,
    pub end: u64,
}

impl FloorRange {
    pub fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, floor: u64) -> bool {
        floor >= self.start && floor <= self.end
    }
}

/// Anything that can hand back the host's currently rendered messages.
pub trait TranscriptSource {
    fn read_turns(&self) -> Result<Vec<RenderedMessage>>;
}

fn parse_floor(raw: Option<&str>) -> Option<u64> {
    let raw = raw?.trim();
    raw.parse::<u64>().ok().or_else(|| {
        // `12.0` from a numeric export still names floor 12.
        let f = raw.parse::<f64>().ok()?;
        (f >= 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64).then_some(f as u64)
    })
}

fn is_hidden(message: &RenderedMessage) -> bool {
    message.display_none || message.classes.iter().any(|c| c == "hidden")
}

fn to_turn(message: &RenderedMessage) -> Option<Turn> {
    let floor = parse_floor(message.mesid.as_deref())?;
    Some(Turn {
        floor,
        sender: message
            .name
            .as_deref()
            .map(str::trim)
            .unwrap_or("?")
            .to_string(),
        content: message
            .text
            .as_deref()
            .map(str::trim)
            .unwrap_or_default()
            .to_string(),
        hidden: is_hidden(message),
    })
}

/// Every turn with a parseable floor, hidden ones included, in floor order.
pub fn all_turns(source: &dyn TranscriptSource) -> Result<Vec<Turn>> {
    let mut turns: Vec<Turn> = source.read_turns()?.iter().filter_map(to_turn).collect();
    turns.sort_by_key(|t| t.floor);
    Ok(turns)
}

/// Visible turns, optionally limited to an inclusive floor range.
pub fn extract_turns(source: &dyn TranscriptSource, range: Option<FloorRange>) -> Result<Vec<Turn>> {
    Ok(all_turns(source)?
        .into_iter()
        .filter(|t| !t.hidden)
        .filter(|t| range.is_none_or(|r| r.contains(t.floor)))
        .collect())
}

/// Reads a snapshot of rendered messages from disk; the file is re-read on
/// every call so an updated export is picked up without restarting.
#[derive(Debug, Clone)]
pub struct SnapshotFileSource {
    pub path: PathBuf,
}

impl SnapshotFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

/// A non-object element is skipped rather than failing the whole snapshot.
fn decode_element(value: Value) -> Option<RenderedMessage> {
    if !value.is_object() {
        tracing::warn!("skipping non-object rendered message: {value}");
        return None;
    }
    serde_json::from_value(value)
        .inspect_err(|err| tracing::warn!("skipping rendered message: {err}"))
        .ok()
}

fn parse_snapshot(raw: &str) -> Result<Vec<RenderedMessage>> {
    let trimmed = raw.trim_start();
    if trimmed.starts_with('[') {
        let items: Vec<Value> = serde_json::from_str(trimmed)?;
        return Ok(items.into_iter().filter_map(decode_element).collect());
    }

    let mut out = Vec::new();
    for (idx, line) in raw.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let value: Value = serde_json::from_str(line)
            .with_context(|| format!("invalid rendered message on line {}", idx + 1))?;
        out.extend(decode_element(value));
    }
    Ok(out)
}

impl TranscriptSource for SnapshotFileSource {
    fn read_turns(&self) -> Result<Vec<RenderedMessage>> {
        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read {}", self.path.display()))?;
        parse_snapshot(&raw).with_context(|| format!("failed to parse {}", self.path.display()))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) struct FixtureSource(pub Vec<RenderedMessage>);

    impl TranscriptSource for FixtureSource {
        fn read_turns(&self) -> Result<Vec<RenderedMessage>> {
            Ok(self.0.clone())
        }
    }

    pub(crate) fn message(id: &str, name: &str, text: &str) -> RenderedMessage {
        RenderedMessage {
            mesid: Some(id.to_string()),
            name: Some(name.to_string()),
            text: Some(text.to_string()),
            ..RenderedMessage::default()
        }
    }

    #[test]
    fn skips_unparseable_ids_and_hidden_messages() {
        let mut hidden_class = message("2", "B", "secret");
        hidden_class.classes = vec!["mes".to_string(), "hidden".to_string()];
        let mut display_none = message("3", "C", "gone");
        display_none.display_none = true;
        let source = FixtureSource(vec![
            message("1", "A", "hello"),
            hidden_class,
            display_none,
            message("abc", "D", "no floor"),
            RenderedMessage::default(),
            message("4", "E", "bye"),
        ]);

        let turns = extract_turns(&source, None).expect("turns");
        let floors: Vec<u64> = turns.iter().map(|t| t.floor).collect();
        assert_eq!(floors, vec![1, 4]);

        let all = all_turns(&source).expect("all turns");
        assert_eq!(all.len(), 4);
        assert!(all.iter().filter(|t| t.hidden).count() == 2);
    }

    #[test]
    fn range_is_inclusive_and_output_sorted() {
        let source = FixtureSource(vec![
            message("7", "A", "seven"),
            message("3", "B", "three"),
            message("5", "C", "five"),
            message("9", "D", "nine"),
        ]);
        let turns = extract_turns(&source, Some(FloorRange::new(3, 7))).expect("turns");
        let floors: Vec<u64> = turns.iter().map(|t| t.floor).collect();
        assert_eq!(floors, vec![3, 5, 7]);
    }

    #[test]
    fn missing_name_and_text_fall_back() {
        let source = FixtureSource(vec![RenderedMessage {
            mesid: Some(" 12 ".to_string()),
            name: None,
            text: Some("  padded  ".to_string()),
            ..RenderedMessage::default()
        }]);
        let turns = extract_turns(&source, None).expect("turns");
        assert_eq!(turns[0].floor, 12);
        assert_eq!(turns[0].sender, "?");
        assert_eq!(turns[0].content, "padded");
    }

    #[test]
    fn snapshot_accepts_array_and_jsonl() {
        let array = r#"[{"mesid":"0","name":"A","text":"x"},{"mesid":"1","name":"B","text":"y","classes":["hidden"]}]"#;
        let parsed = parse_snapshot(array).expect("array");
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[1].classes, vec!["hidden".to_string()]);

        let jsonl = "{\"mesId\":\"0\",\"name\":\"A\",\"mes\":\"x\"}\n\n{\"mesid\":\"1\",\"displayNone\":true}\n";
        let parsed = parse_snapshot(jsonl).expect("jsonl");
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].text.as_deref(), Some("x"));
        assert!(parsed[1].display_none);
    }

    #[test]
    fn snapshot_tolerates_numeric_ids_and_loose_fields() {
        let raw = r#"[
            {"mesid": 1, "name": "A", "text": "one"},
            {"mesid": "2", "name": "B", "text": "two", "classes": "mes hidden"},
            {"mesid": 3.0, "name": null, "text": "three", "display_none": null},
            {"mesid": {"odd": true}, "name": "D", "text": "no floor"},
            "not a message",
            {"mesid": 4, "name": "E", "text": 42}
        ]"#;
        let parsed = parse_snapshot(raw).expect("snapshot");
        assert_eq!(parsed.len(), 5);
        assert_eq!(parsed[0].mesid.as_deref(), Some("1"));
        assert_eq!(parsed[1].classes, vec!["mes".to_string(), "hidden".to_string()]);

        let source = FixtureSource(parsed);
        let turns = extract_turns(&source, None).expect("turns");
        let floors: Vec<u64> = turns.iter().map(|t| t.floor).collect();
        assert_eq!(floors, vec![1, 3, 4]);
        assert_eq!(turns[1].sender, "?");
        assert_eq!(turns[2].content, "42");
    }

    #[test]
    fn snapshot_file_is_reread_each_call() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path = tmp.path().join("chat.jsonl");
        fs::write(&path, "{\"mesid\":\"1\",\"name\":\"A\",\"text\":\"one\"}\n").expect("write");
        let source = SnapshotFileSource::new(&path);
        assert_eq!(extract_turns(&source, None).expect("first").len(), 1);

        fs::write(
            &path,
            "{\"mesid\":\"1\",\"name\":\"A\",\"text\":\"one\"}\n{\"mesid\":\"2\",\"name\":\"B\",\"text\":\"two\"}\n",
        )
        .expect("rewrite");
        assert_eq!(extract_turns(&source, None).expect("second").len(), 2);
    }
}
