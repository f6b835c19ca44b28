//! Durable per-student records and the merge policy applied on save.

use serde::{Deserialize, Serialize};

/// Number of random bytes behind a learning path id (hex-encoded to 10 chars).
const PATH_ID_BYTES: usize = 5;

/// One saved learning path. Saving again under the same title appends to `content`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningPath {
    pub learning_path_id: String,
    pub learning_path_title: String,
    pub content: Vec<String>,
}

/// Everything persisted for one student.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningPathRecord {
    pub student_id: String,
    #[serde(default)]
    pub chat_history: Vec<String>,
    #[serde(default)]
    pub learning_paths: Vec<LearningPath>,
}

/// What a merge did to the record, mostly useful for logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The response was appended to an existing path with the same title.
    Appended { learning_path_id: String },
    /// A new path was created.
    Created { learning_path_id: String },
}

/// Generates a fresh random learning path id.
pub fn new_learning_path_id() -> String {
    let bytes: [u8; PATH_ID_BYTES] = rand::random();
    hex::encode(bytes)
}

impl LearningPathRecord {
    /// Creates an empty record for a student.
    pub fn new(student_id: impl Into<String>) -> Self {
        Self {
            student_id: student_id.into(),
            chat_history: Vec::new(),
            learning_paths: Vec::new(),
        }
    }

    /// Merges a generated response into the record under `title`.
    ///
    /// An existing path with the same title gets the response appended to its
    /// content; otherwise a new path is created with a singleton content list
    /// and an id that does not collide with any id already in the record.
    pub fn merge_response(&mut self, title: &str, response: String) -> MergeOutcome {
        if let Some(path) = self
            .learning_paths
            .iter_mut()
            .find(|p| p.learning_path_title == title)
        {
            path.content.push(response);
            return MergeOutcome::Appended {
                learning_path_id: path.learning_path_id.clone(),
            };
        }

        let mut id = new_learning_path_id();
        while self.find_path(&id).is_some() {
            id = new_learning_path_id();
        }
        self.learning_paths.push(LearningPath {
            learning_path_id: id.clone(),
            learning_path_title: title.to_string(),
            content: vec![response],
        });
        MergeOutcome::Created {
            learning_path_id: id,
        }
    }

    /// Appends a session transcript to the archived chat history.
    pub fn archive_transcript(&mut self, transcript: &[String]) {
        self.chat_history.extend_from_slice(transcript);
    }

    /// Finds a path by id.
    pub fn find_path(&self, learning_path_id: &str) -> Option<&LearningPath> {
        self.learning_paths
            .iter()
            .find(|p| p.learning_path_id == learning_path_id)
    }

    /// Removes the path with the given id, returning whether anything was removed.
    pub fn remove_path(&mut self, learning_path_id: &str) -> bool {
        let before = self.learning_paths.len();
        self.learning_paths
            .retain(|p| p.learning_path_id != learning_path_id);
        self.learning_paths.len() != before
    }
}
