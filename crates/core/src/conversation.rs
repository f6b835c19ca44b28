//! Conversational memory layered over a stateless generation backend.

use crate::error::{PathError, PathResult};
use crate::llm_client::LLMClient;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

const PREAMBLE: &str = "The following is a conversation between a student and a tutor. \
The tutor stays consistent with everything it said earlier in the conversation.";

/// One human input and the AI response it produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exchange {
    pub human: String,
    pub ai: String,
}

/// The generation handle owned by a session.
///
/// Every successful [`predict`](Self::predict) is remembered and replayed
/// into later prompts, so the backend sees the whole dialogue.
pub struct Conversation {
    client: Arc<dyn LLMClient>,
    memory: Vec<Exchange>,
}

impl Conversation {
    pub fn new(client: Arc<dyn LLMClient>) -> Self {
        Self {
            client,
            memory: Vec::new(),
        }
    }

    /// Sends `input` (with the remembered dialogue) to the backend and records the exchange.
    ///
    /// Nothing is remembered when the backend fails or exceeds `timeout`.
    pub async fn predict(&mut self, input: &str, timeout: Duration) -> PathResult<String> {
        let response = self.respond(input, timeout).await?;
        self.remember(input, &response);
        Ok(response)
    }

    /// Generates a response to `input` without remembering the exchange.
    ///
    /// Callers that validate the response first commit it with [`remember`](Self::remember).
    pub async fn respond(&self, input: &str, timeout: Duration) -> PathResult<String> {
        let prompt = self.render_prompt(input);
        tokio::time::timeout(timeout, self.client.generate(prompt))
            .await
            .map_err(|_| PathError::GenerationTimeout(timeout))?
            .map_err(PathError::Generation)
    }

    pub fn remember(&mut self, input: &str, response: &str) {
        self.memory.push(Exchange {
            human: input.to_string(),
            ai: response.to_string(),
        });
    }

    /// The remembered dialogue, oldest first.
    pub fn memory(&self) -> &[Exchange] {
        &self.memory
    }

    pub fn clear(&mut self) {
        self.memory.clear();
    }

    fn render_prompt(&self, input: &str) -> String {
        let mut prompt = String::from(PREAMBLE);
        prompt.push_str("\n\nCurrent conversation:\n");
        for exchange in &self.memory {
            prompt.push_str("Human: ");
            prompt.push_str(&exchange.human);
            prompt.push_str("\nAI: ");
            prompt.push_str(&exchange.ai);
            prompt.push('\n');
        }
        prompt.push_str("Human: ");
        prompt.push_str(input);
        prompt
    }
}
