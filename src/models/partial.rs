//! Partial model.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A reusable snippet backed by one `.md` file under the partials root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Partial {
    /// Dot-joined path, e.g. `tones.mail.formal`.
    pub path: String,
    /// Trimmed file text.
    pub content: String,
    /// Absolute file path.
    pub file_path: PathBuf,
}

impl Partial {
    /// Creates a partial, trimming the content.
    #[must_use]
    pub fn new(path: impl Into<String>, content: &str, file_path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            content: content.trim().to_string(),
            file_path: file_path.into(),
        }
    }

    /// Returns the last dot segment.
    #[must_use]
    pub fn name(&self) -> &str {
        self.path.rsplit('.').next().unwrap_or(&self.path)
    }

    /// Returns the dot path of the containing folder, empty at the root.
    #[must_use]
    pub fn folder(&self) -> &str {
        self.path.rsplit_once('.').map_or("", |(folder, _)| folder)
    }

    /// Case-insensitive substring match against path and content.
    #[must_use]
    pub fn matches(&self, needle_lower: &str) -> bool {
        self.path.to_lowercase().contains(needle_lower)
            || self.content.to_lowercase().contains(needle_lower)
    }
}
