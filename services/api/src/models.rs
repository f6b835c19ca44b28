//! API Models
//!
//! Request and response bodies for the REST API. They mirror the core types
//! and carry the `utoipa` schemas used to generate the OpenAPI document.

use learnpath_core::{conversation::Exchange, model::LearningPath, preferences::PreferenceQuestions};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct DetailPayload {
    #[schema(example = "Recursion")]
    pub topic: String,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GeneratePayload {
    #[schema(example = "Five hours a week, visual learner, prefers YouTube videos")]
    pub student_answers: String,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SavePayload {
    #[schema(example = "Recursion Path")]
    pub learning_path_title: String,
}

/// Text produced by the generation backend (or a fixed status marker).
#[derive(Serialize, Deserialize, ToSchema, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AiResponse {
    pub ai_response: String,
}

impl AiResponse {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            ai_response: text.into(),
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct TranscriptResponse {
    pub transcript: Vec<String>,
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
pub struct ExchangeResponse {
    pub human: String,
    pub ai: String,
}

impl From<Exchange> for ExchangeResponse {
    fn from(exchange: Exchange) -> Self {
        Self {
            human: exchange.human,
            ai: exchange.ai,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct MemoryResponse {
    pub memory: Vec<ExchangeResponse>,
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LearningPathResponse {
    #[schema(example = "9f2c41ab07")]
    pub learning_path_id: String,
    pub learning_path_title: String,
    pub content: Vec<String>,
}

impl From<LearningPath> for LearningPathResponse {
    fn from(path: LearningPath) -> Self {
        Self {
            learning_path_id: path.learning_path_id,
            learning_path_title: path.learning_path_title,
            content: path.content,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesResponse {
    pub prerequisites: String,
    pub study_time: String,
    pub learning_style: String,
    pub learning_resources: String,
}

impl From<PreferenceQuestions> for PreferencesResponse {
    fn from(q: PreferenceQuestions) -> Self {
        Self {
            prerequisites: q.prerequisites,
            study_time: q.study_time,
            learning_style: q.learning_style,
            learning_resources: q.learning_resources,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct ErrorResponse {
    pub message: String,
}
