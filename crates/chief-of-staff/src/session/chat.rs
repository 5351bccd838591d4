//! One chat session: uploaded documents, conversation and the model

use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

use crate::error::Result;
use crate::generation::PromptBuilder;
use crate::ingestion::{file_summary, DocumentExtractor, IngestionStore};
use crate::providers::ChatModel;
use crate::types::document::hash_bytes;
use crate::types::{AnalysisMode, ConversationTurn, FileType, UploadedDocument};

use super::conversation::ConversationLog;

/// Result of offering a file to the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// Extracted and stored
    Added { name: String, summary: String },
    /// A document with this name is already stored
    Skipped { name: String },
}

impl UploadOutcome {
    pub fn name(&self) -> &str {
        match self {
            UploadOutcome::Added { name, .. } | UploadOutcome::Skipped { name } => name,
        }
    }
}

/// Assistant reply recorded for one submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Text appended to the conversation as the assistant turn
    pub text: String,
    /// Model failure message, if the call did not complete
    pub error: Option<String>,
}

/// State owned by a single interactive session.
///
/// Only one request is ever in flight: `submit` takes `&mut self` and holds
/// it until the reply stream is drained.
pub struct ChatSession {
    model: Arc<dyn ChatModel>,
    store: IngestionStore,
    conversation: ConversationLog,
    mode: AnalysisMode,
}

impl ChatSession {
    pub fn new(model: Arc<dyn ChatModel>, mode: AnalysisMode) -> Self {
        Self {
            model,
            store: IngestionStore::new(),
            conversation: ConversationLog::new(),
            mode,
        }
    }

    pub fn mode(&self) -> AnalysisMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: AnalysisMode) {
        tracing::info!("Analysis mode set to {}", mode);
        self.mode = mode;
    }

    pub fn documents(&self) -> &[UploadedDocument] {
        self.store.all()
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        self.conversation.turns()
    }

    pub fn model_name(&self) -> &str {
        self.model.model()
    }

    /// Extract and store a file unless its name is already known
    pub fn upload(&mut self, name: &str, data: &[u8]) -> UploadOutcome {
        if let Some(existing) = self.store.get(name) {
            if existing.content_hash != hash_bytes(data) {
                tracing::warn!(
                    "'{}' was uploaded again with different content; keeping the first version",
                    name
                );
            }
            return UploadOutcome::Skipped {
                name: name.to_string(),
            };
        }

        tracing::info!("Processing {}...", name);
        let content = DocumentExtractor::extract(name, data);
        let document = UploadedDocument::new(name, content).with_source(data);
        let summary = file_summary(&document);
        self.store.insert(document);

        UploadOutcome::Added {
            name: name.to_string(),
            summary,
        }
    }

    /// Upload a file, or every supported file under a directory
    pub fn upload_path(&mut self, path: &Path) -> Result<Vec<UploadOutcome>> {
        if path.is_dir() {
            let mut outcomes = Vec::new();
            for file in supported_files(path) {
                match std::fs::read(&file) {
                    Ok(data) => outcomes.push(self.upload(&display_name(&file), &data)),
                    Err(e) => tracing::warn!("Skipping unreadable {}: {}", file.display(), e),
                }
            }
            return Ok(outcomes);
        }

        let data = std::fs::read(path)?;
        Ok(vec![self.upload(&display_name(path), &data)])
    }

    /// Send a message and stream the reply.
    ///
    /// `on_fragment` sees each text fragment as it arrives. Model failures are
    /// folded into the reply text, so the conversation can always continue.
    pub async fn submit<F>(&mut self, message: &str, mut on_fragment: F) -> Reply
    where
        F: FnMut(&str),
    {
        self.conversation.append_user(message);

        let turns = self.conversation.turns();
        let history = &turns[..turns.len() - 1];
        let request = PromptBuilder::assemble(self.store.all(), history, message, self.mode);

        tracing::info!(
            "Sending message ({} documents, mode {}) to {}",
            self.store.len(),
            self.mode,
            self.model.name()
        );

        let mut text = String::new();
        let mut error = None;

        match self
            .model
            .stream_completion(&request.system, &request.history, &request.prompt)
            .await
        {
            Ok(mut stream) => {
                while let Some(fragment) = stream.next().await {
                    match fragment {
                        Ok(fragment) => {
                            on_fragment(&fragment);
                            text.push_str(&fragment);
                        }
                        Err(e) => {
                            error = Some(e.user_message());
                            break;
                        }
                    }
                }
            }
            Err(e) => error = Some(e.user_message()),
        }

        if let Some(message) = &error {
            tracing::warn!("Model call failed: {}", message);
            text = with_error(text, message);
        } else if text.trim().is_empty() {
            // An empty assistant turn would be rejected on every later request
            tracing::warn!("Model returned an empty reply");
            text = EMPTY_REPLY.to_string();
        }

        self.conversation.append_assistant(text.clone());
        Reply { text, error }
    }

    /// Forget the conversation and every uploaded document
    pub fn clear(&mut self) {
        self.conversation.reset();
        self.store.clear();
        tracing::info!("Session cleared");
    }
}

/// Recorded in place of a reply that completed without any text
pub const EMPTY_REPLY: &str = "[No response was returned. Try rephrasing the question.]";

fn with_error(partial: String, message: &str) -> String {
    if partial.is_empty() {
        format!("I encountered an error: {}", message)
    } else {
        format!("{}\n\n[I encountered an error: {}]", partial, message)
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn supported_files(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| FileType::from_filename(&display_name(p)).is_supported())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::generation::CONTEXT_HEADER;
    use crate::providers::TextStream;
    use crate::types::Role;
    use async_trait::async_trait;
    use futures::stream;
    use std::sync::Mutex;

    /// Replays canned fragments and records what it was asked
    #[derive(Default)]
    struct ScriptedModel {
        fragments: Vec<std::result::Result<String, String>>,
        fail_to_start: Option<String>,
        calls: Mutex<Vec<(Vec<ConversationTurn>, String)>>,
    }

    impl ScriptedModel {
        fn replying(fragments: &[&str]) -> Self {
            Self {
                fragments: fragments.iter().map(|f| Ok(f.to_string())).collect(),
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl ChatModel for ScriptedModel {
        async fn stream_completion(
            &self,
            _system: &str,
            history: &[ConversationTurn],
            user_content: &str,
        ) -> Result<TextStream> {
            self.calls
                .lock()
                .unwrap()
                .push((history.to_vec(), user_content.to_string()));

            if let Some(message) = &self.fail_to_start {
                return Err(Error::llm(message.clone()));
            }
            let items: Vec<Result<String>> = self
                .fragments
                .iter()
                .map(|f| f.clone().map_err(Error::llm))
                .collect();
            Ok(stream::iter(items).boxed())
        }

        fn name(&self) -> &str {
            "scripted"
        }

        fn model(&self) -> &str {
            "scripted-1"
        }
    }

    fn session_with(model: ScriptedModel) -> (ChatSession, Arc<ScriptedModel>) {
        let model = Arc::new(model);
        (
            ChatSession::new(model.clone(), AnalysisMode::QuickTake),
            model,
        )
    }

    #[tokio::test]
    async fn test_streamed_reply_is_recorded() {
        let (mut session, _) = session_with(ScriptedModel::replying(&["Go ", "enterprise."]));

        let mut seen = Vec::new();
        let reply = session.submit("Where next?", |f| seen.push(f.to_string())).await;

        assert_eq!(seen, vec!["Go ", "enterprise."]);
        assert_eq!(reply.text, "Go enterprise.");
        assert!(reply.error.is_none());
        assert_eq!(
            session.turns(),
            &[
                ConversationTurn::user("Where next?"),
                ConversationTurn::assistant("Go enterprise."),
            ]
        );
    }

    #[tokio::test]
    async fn test_history_excludes_new_turn_and_keeps_raw_text() {
        let (mut session, model) = session_with(ScriptedModel::replying(&["ok"]));
        session.upload("notes.md", b"# Plan\n\nShip it");

        session.submit("first", |_| {}).await;
        session.set_mode(AnalysisMode::DeepDive);
        session.submit("second", |_| {}).await;

        let calls = model.calls.lock().unwrap();
        assert_eq!(calls.len(), 2);

        let (history, prompt) = &calls[0];
        assert!(history.is_empty());
        assert!(prompt.contains(CONTEXT_HEADER));
        assert!(prompt.contains("### notes.md\n# Plan\n\nShip it"));
        assert!(prompt.ends_with(AnalysisMode::QuickTake.instruction()));

        let (history, prompt) = &calls[1];
        assert_eq!(
            history,
            &vec![ConversationTurn::user("first"), ConversationTurn::assistant("ok")]
        );
        assert!(prompt.ends_with(&format!("second{}", AnalysisMode::DeepDive.instruction())));
    }

    #[tokio::test]
    async fn test_failure_before_any_fragment() {
        let (mut session, _) = session_with(ScriptedModel {
            fail_to_start: Some("connection refused".to_string()),
            ..Default::default()
        });

        let reply = session.submit("hello", |_| {}).await;
        assert_eq!(reply.text, "I encountered an error: connection refused");
        assert_eq!(reply.error.as_deref(), Some("connection refused"));

        let last = session.turns().last().unwrap();
        assert_eq!(last.role, Role::Assistant);
        assert_eq!(last.content, reply.text);
    }

    #[tokio::test]
    async fn test_partial_reply_keeps_fragments() {
        let (mut session, _) = session_with(ScriptedModel {
            fragments: vec![Ok("Bull case: ".to_string()), Err("overloaded".to_string())],
            ..Default::default()
        });

        let reply = session.submit("scenarios?", |_| {}).await;
        assert_eq!(
            reply.text,
            "Bull case: \n\n[I encountered an error: overloaded]"
        );

        // conversation continues after a failure
        assert_eq!(session.turns().len(), 2);
    }

    #[tokio::test]
    async fn test_empty_reply_is_recorded_as_placeholder() {
        let (mut session, model) = session_with(ScriptedModel::replying(&[]));

        let reply = session.submit("anything?", |_| {}).await;
        assert_eq!(reply.text, EMPTY_REPLY);
        assert!(reply.error.is_none());

        session.submit("follow-up", |_| {}).await;
        let calls = model.calls.lock().unwrap();
        let (history, _) = &calls[1];
        assert_eq!(history[1], ConversationTurn::assistant(EMPTY_REPLY));
        assert!(history.iter().all(|turn| !turn.content.trim().is_empty()));
    }

    #[test]
    fn test_upload_skips_known_names() {
        let (mut session, _) = session_with(ScriptedModel::default());

        let first = session.upload("memo.txt", b"original memo");
        assert!(matches!(first, UploadOutcome::Added { .. }));

        let second = session.upload("memo.txt", b"a different memo");
        assert_eq!(
            second,
            UploadOutcome::Skipped {
                name: "memo.txt".to_string()
            }
        );
        assert_eq!(session.documents().len(), 1);
        assert_eq!(session.documents()[0].content, "original memo");
    }

    #[test]
    fn test_unsupported_upload_is_ingested_as_placeholder() {
        let (mut session, _) = session_with(ScriptedModel::default());
        session.upload("photo.heic", b"\x00\x01");
        assert_eq!(
            session.documents()[0].content,
            "[Unsupported file type: heic]"
        );
    }

    #[test]
    fn test_upload_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.md"), "# B").unwrap();
        std::fs::write(dir.path().join("a.txt"), "A").unwrap();
        std::fs::write(dir.path().join("skip.bin"), [0u8, 1, 2]).unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested").join("c.txt"), "C").unwrap();

        let (mut session, _) = session_with(ScriptedModel::default());
        let outcomes = session.upload_path(dir.path()).unwrap();

        let names: Vec<&str> = outcomes.iter().map(|o| o.name()).collect();
        assert_eq!(names, vec!["a.txt", "b.md", "c.txt"]);
        assert_eq!(session.documents().len(), 3);
    }

    #[test]
    fn test_clear_resets_everything() {
        let (mut session, _) = session_with(ScriptedModel::replying(&["x"]));
        session.upload("a.txt", b"A");
        tokio_test::block_on(session.submit("q", |_| {}));

        session.clear();
        assert!(session.turns().is_empty());
        assert!(session.documents().is_empty());
    }
}
