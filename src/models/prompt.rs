//! Prompt model.

use super::template::{PartialPicker, parse_template};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A prompt template backed by one `.md` file under the prompts root.
///
/// `tag` and `title` are derived from the file location; `parameters`,
/// `partials` and `partial_pickers` are derived from `content`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prompt {
    /// Absolute file path, doubles as the primary key.
    pub id: PathBuf,
    /// Hyphen-joined folder chain from the prompts root, empty at the root.
    pub tag: String,
    /// File stem.
    pub title: String,
    /// Raw file text.
    pub content: String,
    /// Absolute file path.
    pub file_path: PathBuf,
    /// Distinct `[NAME]` parameters in order of first appearance.
    pub parameters: Vec<String>,
    /// Distinct static partial dot paths in order of first appearance.
    pub partials: Vec<String>,
    /// One entry per distinct picker folder.
    pub partial_pickers: Vec<PartialPicker>,
}

impl Prompt {
    /// Builds a prompt from its location and raw content.
    #[must_use]
    pub fn new(
        file_path: impl Into<PathBuf>,
        tag: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        let file_path = file_path.into();
        let content = content.into();
        let parsed = parse_template(&content);

        Self {
            id: file_path.clone(),
            tag: tag.into(),
            title: title.into(),
            content,
            file_path,
            parameters: parsed.parameters,
            partials: parsed.partials,
            partial_pickers: parsed.pickers,
        }
    }

    /// Returns the file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.file_path
    }

    /// Returns the tag's hierarchy segments.
    #[must_use]
    pub fn tag_segments(&self) -> Vec<&str> {
        if self.tag.is_empty() {
            Vec::new()
        } else {
            self.tag.split('-').collect()
        }
    }

    /// Returns `true` if the prompt uses any picker.
    #[must_use]
    pub fn has_pickers(&self) -> bool {
        !self.partial_pickers.is_empty()
    }
}
