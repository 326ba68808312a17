use crate::error::SummarizerError;
use crate::summarizer::notes::{NotesStore, read_notebook, upsert_entry, write_notebook};
use crate::summarizer::provider::LlmProvider;
use crate::summarizer::state::AppState;
use crate::summarizer::synthesize::synthesize;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct SaveOutcome {
    pub notebook: String,
    pub uid: i64,
    pub keys: Vec<String>,
    pub depth: u32,
    pub entry_count: usize,
}

/// Structure the held summary into an entry and file it in the configured
/// notebook: synthesize, read, upsert, write, strictly in that order.
pub fn save_summary(
    state: &AppState,
    provider: &dyn LlmProvider,
    store: &dyn NotesStore,
) -> Result<SaveOutcome, SummarizerError> {
    let summary = state
        .summary_result
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| SummarizerError::Config("no summary to save".to_string()))?;
    let name = state.settings.notebook_name();

    let candidate = synthesize(provider, &state.settings.provider_config(), summary);
    let notebook = read_notebook(store, &name);
    let (notebook, uid) = upsert_entry(notebook, &candidate);
    write_notebook(store, &name, &notebook)?;
    tracing::info!(notebook = %name, uid, "entry saved");

    Ok(SaveOutcome {
        notebook: name,
        uid,
        keys: candidate.keys,
        depth: candidate.depth,
        entry_count: notebook.entries.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::save_summary;
    use crate::error::SummarizerError;
    use crate::summarizer::config::Settings;
    use crate::summarizer::notes::tests::MemoryNotesStore;
    use crate::summarizer::notes::{Notebook, PROVENANCE_TAG, upsert_entry_with_uid};
    use crate::summarizer::provider::{LlmProvider, ProviderConfig};
    use crate::summarizer::state::AppState;
    use crate::summarizer::notes::HttpNotesStore;
    use crate::summarizer::synthesize::EntryCandidate;
    use serde_json::{Value, json};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct Reply(&'static str);

    impl LlmProvider for Reply {
        fn invoke(&self, _: &str, _: &str, _: &ProviderConfig) -> Result<String, SummarizerError> {
            Ok(self.0.to_string())
        }
    }

    #[test]
    fn creates_notebook_on_first_save() {
        let store = MemoryNotesStore::default();
        let mut settings = Settings::default();
        settings.notebook.name = "Saga".to_string();
        let state = AppState::new(settings).with_summary("The hero left town.");

        let out = save_summary(
            &state,
            &Reply("{\"keys\":\"Hero, Town\",\"entry\":\"Hero departs.\",\"depth\":4}"),
            &store,
        )
        .expect("save");

        assert_eq!(out.notebook, "Saga");
        assert_eq!(out.keys, vec!["Hero".to_string(), "Town".to_string()]);
        assert_eq!(out.entry_count, 1);
        let books = store.books.borrow();
        let entry = &books["Saga"].entries[&out.uid.to_string()];
        assert_eq!(entry["content"], "Hero departs.");
        assert_eq!(entry["depth"], 4);
        assert_eq!(entry["comment"], PROVENANCE_TAG);
    }

    #[test]
    fn keeps_existing_entries_and_falls_back_on_bad_json() {
        let store = MemoryNotesStore::default();
        let existing = EntryCandidate {
            keys: vec!["Old".to_string()],
            entry: "old".to_string(),
            depth: 1,
        };
        store.books.borrow_mut().insert(
            "SilentSummaries".to_string(),
            upsert_entry_with_uid(Notebook::empty("SilentSummaries"), &existing, 1),
        );
        let state = AppState::new(Settings::default()).with_summary("plain summary");

        let out = save_summary(&state, &Reply("no json here"), &store).expect("save");
        assert_eq!(out.keys, vec!["Summary".to_string()]);
        assert_eq!(out.entry_count, 2);
        let books = store.books.borrow();
        assert_eq!(
            books["SilentSummaries"].entries[&out.uid.to_string()]["content"],
            "plain summary"
        );
    }

    #[test]
    fn write_failure_surfaces_store_error() {
        let store = MemoryNotesStore {
            fail_writes: true,
            ..MemoryNotesStore::default()
        };
        let state = AppState::new(Settings::default()).with_summary("s");
        let err = save_summary(&state, &Reply("{}"), &store).expect_err("should fail");
        assert!(matches!(err, SummarizerError::Store(_)));
    }

    #[test]
    fn missing_summary_is_rejected() {
        let store = MemoryNotesStore::default();
        let state = AppState::new(Settings::default());
        assert!(save_summary(&state, &Reply("{}"), &store).is_err());
        assert!(store.books.borrow().is_empty());
    }

    #[tokio::test]
    async fn loosely_typed_host_entries_survive_a_save() {
        let host_entries = json!({
            "1": {"uid": 1, "key": ["Castle"], "content": "stone", "comment": null},
            "2": {"uid": "2", "key": "Moat", "content": null, "depth": 2.5, "order": 100}
        });
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/worldinfo/get"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "entries": host_entries.clone() })),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/worldinfo/edit"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let mut settings = Settings::default();
        settings.notebook.store_url = server.uri();
        let state = AppState::new(settings).with_summary("The moat froze.");
        let out = tokio::task::spawn_blocking(move || {
            let store = HttpNotesStore::from_settings(&state.settings.notebook).expect("store");
            save_summary(&state, &Reply("{\"keys\":\"Moat\",\"entry\":\"Frozen.\"}"), &store)
        })
        .await
        .expect("join")
        .expect("save");
        assert_eq!(out.entry_count, 3);

        let requests = server.received_requests().await.expect("recorded requests");
        let edit = requests
            .iter()
            .find(|r| r.url.path() == "/api/worldinfo/edit")
            .expect("edit request");
        let body: Value = serde_json::from_slice(&edit.body).expect("edit body");
        let written = &body["data"]["entries"];
        assert_eq!(written["1"], host_entries["1"]);
        assert_eq!(written["2"], host_entries["2"]);
        assert_eq!(written[out.uid.to_string().as_str()]["content"], "Frozen.");
    }
}
