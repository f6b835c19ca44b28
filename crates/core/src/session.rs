//! Session Registry
//!
//! Owns the live, in-memory conversation state of every student. Each session
//! sits behind its own async mutex, which is the exclusive scope for that
//! student's turns; the surrounding map is sharded so lookups for different
//! students never wait on each other.

use crate::conversation::Conversation;
use crate::llm_client::LLMClient;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info};

/// Live conversational state for one student.
pub struct Session {
    pub student_id: String,
    pub conversation: Conversation,
    pub transcript: Vec<String>,
}

impl Session {
    fn new(student_id: String, client: Arc<dyn LLMClient>) -> Self {
        Self {
            student_id,
            conversation: Conversation::new(client),
            transcript: Vec::new(),
        }
    }
}

/// Exclusive access to one student's durable record, see [`SessionRegistry::lock_record`].
pub struct RecordGuard<'a> {
    locks: &'a DashMap<String, Arc<Mutex<()>>>,
    student_id: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for RecordGuard<'_> {
    fn drop(&mut self) {
        // Release first so the map's reference is the only one left when idle.
        drop(self.guard.take());
        self.locks
            .remove_if(&self.student_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

/// Shared handle to a session. Lock it to run a turn.
pub type SessionHandle = Arc<Mutex<Session>>;

/// In-memory mapping from student id to live session.
pub struct SessionRegistry {
    client: Arc<dyn LLMClient>,
    sessions: DashMap<String, SessionHandle>,
    record_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl SessionRegistry {
    /// Creates an empty registry whose sessions generate through `client`.
    pub fn new(client: Arc<dyn LLMClient>) -> Self {
        Self {
            client,
            sessions: DashMap::new(),
            record_locks: DashMap::new(),
        }
    }

    /// Returns the student's session, creating an empty one on first reference.
    pub fn get_or_create(&self, student_id: &str) -> SessionHandle {
        if let Some(existing) = self.sessions.get(student_id) {
            return existing.value().clone();
        }
        self.sessions
            .entry(student_id.to_string())
            .or_insert_with(|| {
                info!(student_id, "Creating new session");
                Arc::new(Mutex::new(Session::new(
                    student_id.to_string(),
                    self.client.clone(),
                )))
            })
            .value()
            .clone()
    }

    /// Returns the student's session without creating one.
    pub fn get(&self, student_id: &str) -> Option<SessionHandle> {
        self.sessions.get(student_id).map(|s| s.value().clone())
    }

    /// Removes the student's session and hands it back. Absence is not an error.
    pub fn delete(&self, student_id: &str) -> Option<SessionHandle> {
        let removed = self.sessions.remove(student_id).map(|(_, handle)| handle);
        debug!(student_id, removed = removed.is_some(), "Session delete requested");
        removed
    }

    /// Acquires the exclusive scope for reading and rewriting a student's durable record.
    ///
    /// When held together with a session lock, the session lock must be taken first.
    /// The lock entry is evicted once the last holder or waiter lets go.
    pub async fn lock_record(&self, student_id: &str) -> RecordGuard<'_> {
        let lock = self
            .record_locks
            .entry(student_id.to_string())
            .or_default()
            .value()
            .clone();
        let guard = lock.lock_owned().await;
        RecordGuard {
            locks: &self.record_locks,
            student_id: student_id.to_string(),
            guard: Some(guard),
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
