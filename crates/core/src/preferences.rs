//! Schema-constrained preference elicitation.
//!
//! The model is shown the JSON schema of [`PreferenceQuestions`] and must
//! answer with a matching object. Anything else is a `SchemaParse` failure.

use crate::error::{PathError, PathResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// The four questions asked to learn a student's preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PreferenceQuestions {
    /// Question about the student's comfort with the topic's prerequisites.
    pub prerequisites: String,
    /// Question about how much time the student will dedicate to the topic.
    pub study_time: String,
    /// Question about whether the student is a visual, hands-on or auditory learner.
    pub learning_style: String,
    /// Question about preferred resources: books, online courses or videos.
    pub learning_resources: String,
}

/// The JSON schema the response must follow, pretty-printed for the prompt.
pub fn format_instructions() -> String {
    let schema = schemars::schema_for!(PreferenceQuestions);
    serde_json::to_string_pretty(&schema).unwrap_or_default()
}

/// Parses a model response, tolerating a surrounding Markdown code fence.
pub fn parse(response: &str) -> PathResult<PreferenceQuestions> {
    serde_json::from_str(strip_code_fence(response))
        .map_err(|e| PathError::SchemaParse(e.to_string()))
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (e.g. "json") on the opening fence line.
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}
