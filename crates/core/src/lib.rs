//! Core of the learning path tutor: conversation sessions, the dialogue
//! orchestrator and the durable learning path model.
//!
//! The generation backend ([`llm_client::LLMClient`]) and the document store
//! ([`store::LearningPathStore`]) are injected, so the same core runs against
//! OpenAI-compatible APIs and PostgreSQL in production and against in-memory
//! doubles in tests.

pub mod conversation;
pub mod error;
pub mod llm_client;
pub mod model;
pub mod orchestrator;
pub mod preferences;
pub mod prompts;
pub mod session;
pub mod store;

pub use error::{PathError, PathResult};
pub use orchestrator::ConversationOrchestrator;
