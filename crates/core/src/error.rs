//! Error taxonomy for the learning path service.
//!
//! Collaborators (the generation backend and the document store) report
//! failures as opaque `anyhow::Error`s; the orchestrator wraps them into the
//! variants below so the API layer can translate each kind exactly once.

use std::time::Duration;

/// Every failure an orchestrator operation can surface to its caller.
#[derive(Debug, thiserror::Error)]
pub enum PathError {
    /// Unknown student session, record or learning path.
    #[error("Not found: {0}")]
    NotFound(String),
    /// A save was requested before any turn produced transcript entries.
    #[error("No chat history to save for student '{0}'")]
    EmptyHistory(String),
    /// The generation backend failed.
    #[error("Generation failed: {0}")]
    Generation(#[source] anyhow::Error),
    /// The generation backend did not answer within the configured bound.
    #[error("Generation timed out after {0:?}")]
    GenerationTimeout(Duration),
    /// The document store failed.
    #[error("Persistence failed: {0}")]
    Persistence(#[source] anyhow::Error),
    /// Schema-constrained generation returned output that does not match the schema.
    #[error("Could not parse structured response: {0}")]
    SchemaParse(String),
}

pub type PathResult<T> = Result<T, PathError>;
