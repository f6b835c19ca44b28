//! Prompt templates for the three dialogue stages.
//!
//! Built-in defaults can be overridden per prompt by dropping a Markdown file
//! named after the prompt (`greeting.md`, `detail.md`, `generate.md`,
//! `preferences.md`) into a prompts directory.

use anyhow::{Context, Result};
use std::{collections::HashMap, fs, path::Path};
use tracing::{info, warn};

const GREETING: &str = "You are CustomEd bot. You help students understand the difficult topics \
they face by generating a learning path for them. You are now meeting a student, so greet them \
politely and tell them about yourself.

Formatting rules:
- Format the output as Markdown.";

const DETAIL: &str = "The student needs help with the following topic: {topic}.
Assist the student by asking the following questions to understand their preferences. \
Only ask these questions and say no more.

- Ask how comfortable they are with the prerequisites you think are important.
- Ask how much time they plan to dedicate to studying this topic.
- Ask their preferred learning style: visual, hands-on or auditory.
- Ask which type of learning resource they prefer: books, online courses or YouTube videos.

Formatting rules:
- Format the output as Markdown.
- Use bullet points where appropriate.";

const GENERATE: &str = "The student received your questions and answered them as follows:

student answers: {answers}

Now generate a learning path for the student based on their preferences.

RULES:
- Make sure the learning path fits the student's preferred time window.
- Make sure the learning path is clear and easy to follow.
- Make sure the learning resources are relevant to the student's preferences.

Formatting rules:
- Format the output as Markdown.
- The output must have the following sections:

Learning Path Title
    A concise title for the learning path
Prerequisites
    Prerequisites with the learning resources for them
Path
    The step by step learning path spanning the student's time window
Additional Resources
    Additional resources with a short description of each";

const PREFERENCES: &str = "The student needs help with the following topic: {topic}.
Prepare the questions you would ask to understand the student's preferences:

- What is your comfort level with the prerequisites for the topic?
- How much time do you plan to dedicate to studying this topic?
- What is your preferred learning style? Are you a visual, hands-on or auditory learner?
- Which type of learning resource do you prefer? Books, online courses, YouTube videos?

Respond with only a JSON object matching this JSON schema:

{format_instructions}";

/// The set of prompt templates used by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptBook {
    pub greeting: String,
    pub detail: String,
    pub generate: String,
    pub preferences: String,
}

impl Default for PromptBook {
    fn default() -> Self {
        Self {
            greeting: GREETING.to_string(),
            detail: DETAIL.to_string(),
            generate: GENERATE.to_string(),
            preferences: PREFERENCES.to_string(),
        }
    }
}

impl PromptBook {
    /// Loads the built-in prompts, replacing any that have a matching `*.md` file in `dir`.
    pub fn from_dir(dir: &Path) -> Result<Self> {
        let mut overrides = load_prompts(dir)?;
        let mut book = Self::default();
        for (key, slot) in [
            ("greeting", &mut book.greeting),
            ("detail", &mut book.detail),
            ("generate", &mut book.generate),
            ("preferences", &mut book.preferences),
        ] {
            if let Some(template) = overrides.remove(key) {
                info!(prompt = key, "Using prompt override");
                *slot = template;
            }
        }
        for unknown in overrides.keys() {
            warn!(file = %unknown, "Ignoring unknown prompt file");
        }
        Ok(book)
    }

    pub fn greeting(&self) -> &str {
        &self.greeting
    }

    pub fn detail(&self, topic: &str) -> String {
        self.detail.replace("{topic}", topic)
    }

    pub fn generate(&self, answers: &str) -> String {
        self.generate.replace("{answers}", answers)
    }

    pub fn preferences(&self, topic: &str, format_instructions: &str) -> String {
        self.preferences
            .replace("{format_instructions}", format_instructions)
            .replace("{topic}", topic)
    }
}

/// Reads every `*.md` file in `dir` into a map keyed by file stem.
fn load_prompts(dir: &Path) -> Result<HashMap<String, String>> {
    let mut prompts = HashMap::new();
    let entries = fs::read_dir(dir)
        .with_context(|| format!("Could not read prompts directory {}", dir.display()))?;
    for entry in entries {
        let path = entry?.path();
        if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("md") {
            let key = path
                .file_stem()
                .and_then(|s| s.to_str())
                .context("Could not get file stem")?
                .to_string();
            let content = fs::read_to_string(&path)?;
            prompts.insert(key, content);
        }
    }
    Ok(prompts)
}
