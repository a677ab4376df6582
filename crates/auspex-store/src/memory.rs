use std::path::{Path, PathBuf};

use auspex_models::config::MemoryConfig;
use tracing::debug;

use crate::error::StoreError;
use crate::fs::{read_optional, write_atomic};

/// Result of a save: what was actually persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedMemory {
    pub content: String,
    pub truncated: bool,
}

/// Bounded plain-text transcript persisted to a single file.
///
/// Each save overwrites the previous content. Content over the word ceiling
/// keeps only its trailing words.
#[derive(Debug, Clone)]
pub struct ConversationMemory {
    path: PathBuf,
    max_words: usize,
}

impl ConversationMemory {
    pub fn new(path: impl Into<PathBuf>, max_words: usize) -> Self {
        Self {
            path: path.into(),
            max_words,
        }
    }

    pub fn from_config(config: &MemoryConfig) -> Self {
        Self::new(&config.path, config.max_words)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn max_words(&self) -> usize {
        self.max_words
    }

    /// Empty string when nothing has been saved yet.
    pub fn load_memory(&self) -> Result<String, StoreError> {
        Ok(read_optional(&self.path)?.unwrap_or_default())
    }

    pub fn save_memory(&self, content: &str) -> Result<SavedMemory, StoreError> {
        let saved = truncate_to_words(content, self.max_words);
        if saved.truncated {
            debug!(max_words = self.max_words, "Conversation memory truncated");
        }
        write_atomic(&self.path, saved.content.as_bytes())?;
        Ok(saved)
    }

    /// Append lines to the stored transcript and save the result.
    pub fn append_turns(&self, turns: &[String]) -> Result<SavedMemory, StoreError> {
        let mut content = self.load_memory()?;
        for turn in turns.iter().filter(|t| !t.trim().is_empty()) {
            if !content.is_empty() {
                content.push('\n');
            }
            content.push_str(turn.trim());
        }
        self.save_memory(&content)
    }
}

/// Keep at most `max_words` whitespace-separated words, dropping the oldest.
///
/// Content within the ceiling is returned untouched; truncated content is
/// re-joined with single spaces.
pub fn truncate_to_words(content: &str, max_words: usize) -> SavedMemory {
    let words: Vec<&str> = content.split_whitespace().collect();
    if words.len() <= max_words {
        return SavedMemory {
            content: content.to_string(),
            truncated: false,
        };
    }

    SavedMemory {
        content: words[words.len() - max_words..].join(" "),
        truncated: true,
    }
}
