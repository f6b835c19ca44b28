//! Data Access Layer
//!
//! PostgreSQL implementation of the learning path document store. Each
//! student's record is a single row whose chat history and learning paths are
//! kept as JSONB documents, so a save rewrites the record in one statement.

use anyhow::{Result, bail};
use async_trait::async_trait;
use learnpath_core::{
    model::{LearningPath, LearningPathRecord},
    store::LearningPathStore,
};
use sqlx::{FromRow, PgPool, types::Json};

/// A row of the `learning_path_records` table.
#[derive(FromRow, Debug)]
struct RecordRow {
    student_id: String,
    chat_history: Json<Vec<String>>,
    learning_paths: Json<Vec<LearningPath>>,
}

impl From<RecordRow> for LearningPathRecord {
    fn from(row: RecordRow) -> Self {
        Self {
            student_id: row.student_id,
            chat_history: row.chat_history.0,
            learning_paths: row.learning_paths.0,
        }
    }
}

/// A wrapper around the `PgPool` implementing [`LearningPathStore`].
#[derive(Clone)]
pub struct PgLearningPathStore {
    pool: PgPool,
}

impl PgLearningPathStore {
    /// Creates a new `PgLearningPathStore` instance.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Runs all pending `sqlx` migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl LearningPathStore for PgLearningPathStore {
    async fn find_by_student_id(&self, student_id: &str) -> Result<Option<LearningPathRecord>> {
        let row = sqlx::query_as::<_, RecordRow>(
            r#"
            SELECT student_id, chat_history, learning_paths
            FROM learning_path_records
            WHERE student_id = $1
            "#,
        )
        .bind(student_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(LearningPathRecord::from))
    }

    async fn insert(&self, record: LearningPathRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO learning_path_records (student_id, chat_history, learning_paths)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(&record.student_id)
        .bind(Json(&record.chat_history))
        .bind(Json(&record.learning_paths))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_by_student_id(
        &self,
        student_id: &str,
        record: LearningPathRecord,
    ) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE learning_path_records
            SET chat_history = $2, learning_paths = $3, updated_at = now()
            WHERE student_id = $1
            "#,
        )
        .bind(student_id)
        .bind(Json(&record.chat_history))
        .bind(Json(&record.learning_paths))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            bail!("No record for student '{}'", student_id);
        }
        Ok(())
    }
}
