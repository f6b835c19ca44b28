use crate::model::LearningPathRecord;
use anyhow::{Result, bail};
use async_trait::async_trait;
use dashmap::DashMap;

/// Durable storage for per-student learning path records.
///
/// Implementations only need keyed find, insert and full-record replace; the
/// orchestrator serializes read-modify-write sequences per student.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LearningPathStore: Send + Sync {
    /// Fetches the record for a student, if one exists.
    async fn find_by_student_id(&self, student_id: &str) -> Result<Option<LearningPathRecord>>;

    /// Inserts a new record. Fails if the student already has one.
    async fn insert(&self, record: LearningPathRecord) -> Result<()>;

    /// Replaces an existing record. Fails if the student has none.
    async fn update_by_student_id(&self, student_id: &str, record: LearningPathRecord)
    -> Result<()>;
}

/// A `LearningPathStore` kept in process memory. Contents are lost on restart.
#[derive(Default)]
pub struct InMemoryLearningPathStore {
    records: DashMap<String, LearningPathRecord>,
}

impl InMemoryLearningPathStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl LearningPathStore for InMemoryLearningPathStore {
    async fn find_by_student_id(&self, student_id: &str) -> Result<Option<LearningPathRecord>> {
        Ok(self.records.get(student_id).map(|r| r.value().clone()))
    }

    async fn insert(&self, record: LearningPathRecord) -> Result<()> {
        match self.records.entry(record.student_id.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                bail!("Record for student '{}' already exists", record.student_id)
            }
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                vacant.insert(record);
                Ok(())
            }
        }
    }

    async fn update_by_student_id(
        &self,
        student_id: &str,
        record: LearningPathRecord,
    ) -> Result<()> {
        match self.records.get_mut(student_id) {
            Some(mut existing) => {
                *existing = record;
                Ok(())
            }
            None => bail!("No record for student '{}'", student_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_then_find() {
        let store = InMemoryLearningPathStore::new();
        assert!(store.find_by_student_id("s1").await.unwrap().is_none());

        store.insert(LearningPathRecord::new("s1")).await.unwrap();
        let found = store.find_by_student_id("s1").await.unwrap();
        assert_eq!(found, Some(LearningPathRecord::new("s1")));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_insert_twice_fails() {
        let store = InMemoryLearningPathStore::new();
        store.insert(LearningPathRecord::new("s1")).await.unwrap();
        let err = store.insert(LearningPathRecord::new("s1")).await.unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[tokio::test]
    async fn test_update_replaces_whole_record() {
        let store = InMemoryLearningPathStore::new();
        let mut record = LearningPathRecord::new("s1");
        record.archive_transcript(&["old".to_string()]);
        store.insert(record).await.unwrap();

        let mut replacement = LearningPathRecord::new("s1");
        replacement.merge_response("A", "a".to_string());
        store
            .update_by_student_id("s1", replacement.clone())
            .await
            .unwrap();

        assert_eq!(
            store.find_by_student_id("s1").await.unwrap(),
            Some(replacement)
        );
    }

    #[tokio::test]
    async fn test_update_missing_record_fails() {
        let store = InMemoryLearningPathStore::new();
        let result = store
            .update_by_student_id("ghost", LearningPathRecord::new("ghost"))
            .await;
        assert!(result.is_err());
        assert!(store.is_empty());
    }
}
