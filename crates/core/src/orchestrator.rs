//! Conversation Orchestrator
//!
//! Drives the three-stage dialogue (greet, elicit preferences, synthesize a
//! path) on top of the session registry, and commits finished paths to the
//! document store. The orchestrator holds no conversational state of its own.

use crate::{
    conversation::Exchange,
    error::{PathError, PathResult},
    model::{LearningPath, LearningPathRecord, MergeOutcome},
    preferences::{self, PreferenceQuestions},
    prompts::PromptBook,
    session::{SessionHandle, SessionRegistry},
    store::LearningPathStore,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Default bound on a single generation call.
pub const DEFAULT_GENERATION_TIMEOUT: Duration = Duration::from_secs(60);

/// Status marker returned by the health check.
pub const HEALTH_MARKER: &str = "I am alive!";

pub struct ConversationOrchestrator {
    registry: Arc<SessionRegistry>,
    store: Arc<dyn LearningPathStore>,
    prompts: PromptBook,
    generation_timeout: Duration,
}

impl ConversationOrchestrator {
    pub fn new(
        registry: Arc<SessionRegistry>,
        store: Arc<dyn LearningPathStore>,
        prompts: PromptBook,
    ) -> Self {
        Self {
            registry,
            store,
            prompts,
            generation_timeout: DEFAULT_GENERATION_TIMEOUT,
        }
    }

    pub fn with_generation_timeout(mut self, timeout: Duration) -> Self {
        self.generation_timeout = timeout;
        self
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    pub fn health(&self) -> &'static str {
        HEALTH_MARKER
    }

    /// Opens the dialogue with the fixed greeting prompt.
    #[instrument(skip(self))]
    pub async fn greet(&self, student_id: &str) -> PathResult<String> {
        let handle = self.registry.get_or_create(student_id);
        let mut session = handle.lock().await;
        let response = session
            .conversation
            .predict(self.prompts.greeting(), self.generation_timeout)
            .await?;
        session.transcript.push(response.clone());
        Ok(response)
    }

    /// Asks the preference questions for `topic`. The topic is recorded before the response.
    #[instrument(skip(self))]
    pub async fn elicit_preferences(&self, student_id: &str, topic: &str) -> PathResult<String> {
        let prompt = self.prompts.detail(topic);
        self.student_turn(student_id, topic, &prompt).await
    }

    /// Produces the learning path from the student's free-form answers.
    #[instrument(skip(self, answers))]
    pub async fn synthesize_path(&self, student_id: &str, answers: &str) -> PathResult<String> {
        let prompt = self.prompts.generate(answers);
        self.student_turn(student_id, answers, &prompt).await
    }

    /// Schema-constrained variant of [`elicit_preferences`](Self::elicit_preferences).
    ///
    /// The transcript and the conversational memory are only touched when the
    /// response parses.
    #[instrument(skip(self))]
    pub async fn elicit_structured_preferences(
        &self,
        student_id: &str,
        topic: &str,
    ) -> PathResult<PreferenceQuestions> {
        let prompt = self
            .prompts
            .preferences(topic, &preferences::format_instructions());
        let handle = self.registry.get_or_create(student_id);
        let mut session = handle.lock().await;

        let response = session
            .conversation
            .respond(&prompt, self.generation_timeout)
            .await?;
        let questions = preferences::parse(&response)?;

        session.conversation.remember(&prompt, &response);
        session.transcript.push(topic.to_string());
        session.transcript.push(response);
        Ok(questions)
    }

    /// Commits the latest response as a learning path titled `title`.
    ///
    /// The transcript is archived into the record's chat history and cleared,
    /// but only once the store has accepted the write.
    #[instrument(skip(self))]
    pub async fn save(&self, student_id: &str, title: &str) -> PathResult<()> {
        let handle = self.existing_session(student_id)?;
        let mut session = handle.lock().await;

        let last_response = session
            .transcript
            .last()
            .cloned()
            .ok_or_else(|| PathError::EmptyHistory(student_id.to_string()))?;

        let _record_guard = self.registry.lock_record(student_id).await;
        let existing = self
            .store
            .find_by_student_id(student_id)
            .await
            .map_err(PathError::Persistence)?;
        let is_update = existing.is_some();
        let mut record = existing.unwrap_or_else(|| LearningPathRecord::new(student_id));

        let outcome = record.merge_response(title, last_response);
        record.archive_transcript(&session.transcript);

        let result = if is_update {
            self.store.update_by_student_id(student_id, record).await
        } else {
            self.store.insert(record).await
        };
        if let Err(e) = result {
            warn!(error = ?e, "Save failed; keeping transcript");
            return Err(PathError::Persistence(e));
        }

        session.transcript.clear();
        match outcome {
            MergeOutcome::Appended { learning_path_id } => {
                info!(%learning_path_id, "Appended to existing learning path")
            }
            MergeOutcome::Created { learning_path_id } => {
                info!(%learning_path_id, "Created learning path")
            }
        }
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn list_paths(&self, student_id: &str) -> PathResult<Vec<LearningPath>> {
        Ok(self.existing_record(student_id).await?.learning_paths)
    }

    #[instrument(skip(self))]
    pub async fn get_path(&self, student_id: &str, path_id: &str) -> PathResult<LearningPath> {
        self.existing_record(student_id)
            .await?
            .find_path(path_id)
            .cloned()
            .ok_or_else(|| PathError::NotFound(format!("learning path '{}'", path_id)))
    }

    /// Removes one learning path. Unknown students and unknown ids are a no-op.
    #[instrument(skip(self))]
    pub async fn delete_path(&self, student_id: &str, path_id: &str) -> PathResult<()> {
        let _record_guard = self.registry.lock_record(student_id).await;
        let Some(mut record) = self
            .store
            .find_by_student_id(student_id)
            .await
            .map_err(PathError::Persistence)?
        else {
            return Ok(());
        };

        if !record.remove_path(path_id) {
            return Ok(());
        }
        self.store
            .update_by_student_id(student_id, record)
            .await
            .map_err(PathError::Persistence)?;
        info!("Deleted learning path");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn dump_transcript(&self, student_id: &str) -> PathResult<Vec<String>> {
        let handle = self.existing_session(student_id)?;
        let session = handle.lock().await;
        Ok(session.transcript.clone())
    }

    /// The conversational memory carried by the student's generation handle.
    #[instrument(skip(self))]
    pub async fn memory(&self, student_id: &str) -> PathResult<Vec<Exchange>> {
        let handle = self.existing_session(student_id)?;
        let session = handle.lock().await;
        Ok(session.conversation.memory().to_vec())
    }

    /// Forgets the student's session. Unknown students are a no-op.
    ///
    /// The removed session is also reset under its lock, so a turn still
    /// holding the old handle cannot carry its memory forward.
    #[instrument(skip(self))]
    pub async fn restart(&self, student_id: &str) {
        if let Some(handle) = self.registry.delete(student_id) {
            let mut session = handle.lock().await;
            session.conversation.clear();
            session.transcript.clear();
            info!("Session cleared");
        }
    }

    /// Records `input`, then generates from `prompt` and records the response.
    ///
    /// A failed generation takes `input` back out, so the transcript is left as it was.
    async fn student_turn(&self, student_id: &str, input: &str, prompt: &str) -> PathResult<String> {
        let handle = self.registry.get_or_create(student_id);
        let mut session = handle.lock().await;
        session.transcript.push(input.to_string());

        let result = session
            .conversation
            .predict(prompt, self.generation_timeout)
            .await;
        match result {
            Ok(response) => {
                session.transcript.push(response.clone());
                Ok(response)
            }
            Err(e) => {
                session.transcript.pop();
                Err(e)
            }
        }
    }

    fn existing_session(&self, student_id: &str) -> PathResult<SessionHandle> {
        self.registry
            .get(student_id)
            .ok_or_else(|| PathError::NotFound(format!("session for student '{}'", student_id)))
    }

    async fn existing_record(&self, student_id: &str) -> PathResult<LearningPathRecord> {
        self.store
            .find_by_student_id(student_id)
            .await
            .map_err(PathError::Persistence)?
            .ok_or_else(|| PathError::NotFound(format!("learning paths for student '{}'", student_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::{LLMClient, MockLLMClient};
    use crate::store::{InMemoryLearningPathStore, MockLearningPathStore};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Answers "response 1", "response 2", ... after an optional delay.
    struct CountingClient {
        calls: AtomicUsize,
        delay: Duration,
    }

    impl CountingClient {
        fn new() -> Self {
            Self::with_delay(Duration::ZERO)
        }

        fn with_delay(delay: Duration) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                delay,
            }
        }
    }

    #[async_trait]
    impl LLMClient for CountingClient {
        async fn generate(&self, _prompt: String) -> anyhow::Result<String> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            Ok(format!("response {}", n))
        }
    }

    fn orchestrator_with(
        client: Arc<dyn LLMClient>,
        store: Arc<dyn LearningPathStore>,
    ) -> ConversationOrchestrator {
        let registry = Arc::new(SessionRegistry::new(client));
        ConversationOrchestrator::new(registry, store, PromptBook::default())
    }

    fn orchestrator() -> (ConversationOrchestrator, Arc<InMemoryLearningPathStore>) {
        let store = Arc::new(InMemoryLearningPathStore::new());
        let orchestrator = orchestrator_with(Arc::new(CountingClient::new()), store.clone());
        (orchestrator, store)
    }

    #[tokio::test]
    async fn test_restart_and_delete_path_are_noops_for_unknown_students() {
        let (orchestrator, store) = orchestrator();
        orchestrator.restart("nobody").await;
        orchestrator.delete_path("nobody", "abc").await.unwrap();
        assert!(store.is_empty());
        assert!(orchestrator.registry().is_empty());
    }

    #[tokio::test]
    async fn test_greet_then_dump_has_only_the_greeting() {
        let (orchestrator, _) = orchestrator();
        let greeting = orchestrator.greet("s1").await.unwrap();
        let transcript = orchestrator.dump_transcript("s1").await.unwrap();
        assert_eq!(transcript, vec![greeting]);
    }

    #[tokio::test]
    async fn test_dump_and_memory_need_a_session() {
        let (orchestrator, _) = orchestrator();
        assert!(matches!(
            orchestrator.dump_transcript("s1").await,
            Err(PathError::NotFound(_))
        ));
        assert!(matches!(
            orchestrator.memory("s1").await,
            Err(PathError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_elicit_records_input_before_response() {
        let (orchestrator, _) = orchestrator();
        orchestrator.greet("s1").await.unwrap();
        let response = orchestrator.elicit_preferences("s1", "recursion").await.unwrap();

        let transcript = orchestrator.dump_transcript("s1").await.unwrap();
        assert_eq!(transcript, vec!["response 1", "recursion", "response 2"]);
        assert_eq!(response, "response 2");

        let memory = orchestrator.memory("s1").await.unwrap();
        assert_eq!(memory.len(), 2);
        assert!(memory[1].human.contains("recursion"));
    }

    #[tokio::test]
    async fn test_save_without_session_is_not_found() {
        let (orchestrator, store) = orchestrator();
        let err = orchestrator.save("s1", "Path").await.unwrap_err();
        assert!(matches!(err, PathError::NotFound(_)));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_save_with_empty_transcript_leaves_store_unchanged() {
        let (orchestrator, store) = orchestrator();
        orchestrator.registry().get_or_create("s1");

        let err = orchestrator.save("s1", "Path").await.unwrap_err();
        assert!(matches!(err, PathError::EmptyHistory(_)));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_first_save_creates_record_with_singleton_content() {
        let (orchestrator, store) = orchestrator();
        orchestrator.greet("s1").await.unwrap();
        orchestrator.elicit_preferences("s1", "recursion").await.unwrap();

        orchestrator.save("s1", "Recursion Path").await.unwrap();

        assert_eq!(store.len(), 1);
        let record = store.find_by_student_id("s1").await.unwrap().unwrap();
        assert_eq!(record.learning_paths.len(), 1);
        assert_eq!(record.learning_paths[0].content, vec!["response 2"]);
        assert_eq!(
            record.chat_history,
            vec!["response 1", "recursion", "response 2"]
        );
        assert!(orchestrator.dump_transcript("s1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_saving_same_title_twice_appends_in_call_order() {
        let (orchestrator, _) = orchestrator();
        orchestrator.greet("s1").await.unwrap();
        orchestrator.save("s1", "Path").await.unwrap();
        orchestrator.synthesize_path("s1", "weekly").await.unwrap();
        orchestrator.save("s1", "Path").await.unwrap();

        let paths = orchestrator.list_paths("s1").await.unwrap();
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].content, vec!["response 1", "response 2"]);
    }

    #[tokio::test]
    async fn test_saving_different_titles_creates_distinct_paths() {
        let (orchestrator, _) = orchestrator();
        orchestrator.greet("s1").await.unwrap();
        orchestrator.save("s1", "First").await.unwrap();
        orchestrator.greet("s1").await.unwrap();
        orchestrator.save("s1", "Second").await.unwrap();

        let paths = orchestrator.list_paths("s1").await.unwrap();
        assert_eq!(paths.len(), 2);
        assert_ne!(paths[0].learning_path_id, paths[1].learning_path_id);
        assert_eq!(paths[1].learning_path_title, "Second");
    }

    #[tokio::test]
    async fn test_failed_save_keeps_transcript() {
        let mut store = MockLearningPathStore::new();
        store.expect_find_by_student_id().returning(|_| Ok(None));
        store
            .expect_insert()
            .times(1)
            .returning(|_| Err(anyhow::anyhow!("write concern failed")));
        let orchestrator = orchestrator_with(Arc::new(CountingClient::new()), Arc::new(store));

        orchestrator.greet("s1").await.unwrap();
        let err = orchestrator.save("s1", "Path").await.unwrap_err();

        assert!(matches!(err, PathError::Persistence(_)));
        assert_eq!(
            orchestrator.dump_transcript("s1").await.unwrap(),
            vec!["response 1"]
        );
    }

    #[tokio::test]
    async fn test_failed_lookup_during_save_keeps_transcript() {
        let mut store = MockLearningPathStore::new();
        store
            .expect_find_by_student_id()
            .returning(|_| Err(anyhow::anyhow!("connection refused")));
        let orchestrator = orchestrator_with(Arc::new(CountingClient::new()), Arc::new(store));

        orchestrator.greet("s1").await.unwrap();
        let err = orchestrator.save("s1", "Path").await.unwrap_err();

        assert!(matches!(err, PathError::Persistence(_)));
        assert_eq!(orchestrator.dump_transcript("s1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_generation_leaves_transcript_unchanged() {
        let mut client = MockLLMClient::new();
        client
            .expect_generate()
            .returning(|_| Err(anyhow::anyhow!("backend down")));
        let orchestrator = orchestrator_with(
            Arc::new(client),
            Arc::new(InMemoryLearningPathStore::new()),
        );

        let err = orchestrator
            .elicit_preferences("s1", "recursion")
            .await
            .unwrap_err();
        assert!(matches!(err, PathError::Generation(_)));
        assert!(orchestrator.dump_transcript("s1").await.unwrap().is_empty());
        assert!(orchestrator.memory("s1").await.unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_generation_times_out() {
        let orchestrator = orchestrator_with(
            Arc::new(CountingClient::with_delay(Duration::from_secs(30))),
            Arc::new(InMemoryLearningPathStore::new()),
        )
        .with_generation_timeout(Duration::from_secs(1));

        let err = orchestrator
            .synthesize_path("s1", "weekly, visual")
            .await
            .unwrap_err();
        assert!(matches!(err, PathError::GenerationTimeout(d) if d == Duration::from_secs(1)));
        assert!(orchestrator.dump_transcript("s1").await.unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_different_students_do_not_block_each_other() {
        let delay = Duration::from_secs(2);
        let orchestrator = orchestrator_with(
            Arc::new(CountingClient::with_delay(delay)),
            Arc::new(InMemoryLearningPathStore::new()),
        );

        let start = tokio::time::Instant::now();
        let (a, b) = tokio::join!(
            orchestrator.elicit_preferences("s1", "graphs"),
            orchestrator.elicit_preferences("s2", "trees"),
        );
        a.unwrap();
        b.unwrap();
        assert!(start.elapsed() < delay * 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_student_turns_are_serialized() {
        let delay = Duration::from_secs(2);
        let orchestrator = orchestrator_with(
            Arc::new(CountingClient::with_delay(delay)),
            Arc::new(InMemoryLearningPathStore::new()),
        );

        let start = tokio::time::Instant::now();
        let (a, b) = tokio::join!(
            orchestrator.elicit_preferences("s1", "graphs"),
            orchestrator.elicit_preferences("s1", "trees"),
        );
        a.unwrap();
        b.unwrap();
        assert!(start.elapsed() >= delay * 2);

        let transcript = orchestrator.dump_transcript("s1").await.unwrap();
        assert_eq!(transcript.len(), 4);
        for pair in transcript.chunks(2) {
            assert!(pair[0] == "graphs" || pair[0] == "trees");
            assert!(pair[1].starts_with("response "));
        }
        assert_ne!(transcript[0], transcript[2]);
    }

    #[tokio::test]
    async fn test_get_and_delete_path() {
        let (orchestrator, _) = orchestrator();
        orchestrator.greet("s1").await.unwrap();
        orchestrator.save("s1", "Keep").await.unwrap();
        orchestrator.greet("s1").await.unwrap();
        orchestrator.save("s1", "Drop").await.unwrap();

        let paths = orchestrator.list_paths("s1").await.unwrap();
        let drop_id = paths[1].learning_path_id.clone();
        let found = orchestrator.get_path("s1", &drop_id).await.unwrap();
        assert_eq!(found.learning_path_title, "Drop");

        orchestrator.delete_path("s1", &drop_id).await.unwrap();
        orchestrator.delete_path("s1", &drop_id).await.unwrap();

        let remaining = orchestrator.list_paths("s1").await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].learning_path_title, "Keep");
        assert!(matches!(
            orchestrator.get_path("s1", &drop_id).await,
            Err(PathError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_paths_without_record_is_not_found() {
        let (orchestrator, _) = orchestrator();
        assert!(matches!(
            orchestrator.list_paths("s1").await,
            Err(PathError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_restart_discards_session() {
        let (orchestrator, _) = orchestrator();
        orchestrator.greet("s1").await.unwrap();
        let old_handle = orchestrator.registry().get("s1").unwrap();

        orchestrator.restart("s1").await;
        assert!(matches!(
            orchestrator.dump_transcript("s1").await,
            Err(PathError::NotFound(_))
        ));
        let old_session = old_handle.lock().await;
        assert!(old_session.transcript.is_empty());
        assert!(old_session.conversation.memory().is_empty());
    }

    #[tokio::test]
    async fn test_structured_preferences_parse_and_record() {
        let mut client = MockLLMClient::new();
        client.expect_generate().returning(|_| {
            Ok(r#"```json
{"prerequisites":"p?","studyTime":"t?","learningStyle":"s?","learningResources":"r?"}
```"#
                .to_string())
        });
        let orchestrator = orchestrator_with(
            Arc::new(client),
            Arc::new(InMemoryLearningPathStore::new()),
        );

        let questions = orchestrator
            .elicit_structured_preferences("s1", "graphs")
            .await
            .unwrap();
        assert_eq!(questions.study_time, "t?");

        let transcript = orchestrator.dump_transcript("s1").await.unwrap();
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript[0], "graphs");
        assert_eq!(orchestrator.memory("s1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_structured_preferences_reject_malformed_output() {
        let mut client = MockLLMClient::new();
        client
            .expect_generate()
            .returning(|_| Ok("I would ask about prerequisites first.".to_string()));
        let orchestrator = orchestrator_with(
            Arc::new(client),
            Arc::new(InMemoryLearningPathStore::new()),
        );

        let err = orchestrator
            .elicit_structured_preferences("s1", "graphs")
            .await
            .unwrap_err();
        assert!(matches!(err, PathError::SchemaParse(_)));
        assert!(orchestrator.dump_transcript("s1").await.unwrap().is_empty());
        assert!(orchestrator.memory("s1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_end_to_end_dialogue() {
        let (orchestrator, _) = orchestrator();
        orchestrator.greet("s1").await.unwrap();
        orchestrator.elicit_preferences("s1", "recursion").await.unwrap();
        orchestrator
            .synthesize_path("s1", "weekly, visual")
            .await
            .unwrap();
        orchestrator.save("s1", "Recursion Path").await.unwrap();

        let paths = orchestrator.list_paths("s1").await.unwrap();
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].learning_path_title, "Recursion Path");
        assert_eq!(paths[0].content, vec!["response 3"]);
    }
}
