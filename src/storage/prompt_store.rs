//! Prompt store.
//!
//! Mirrors `<workspace>/prompts/<tag>/.../<title>.md` in memory. Loading is
//! permissive (any tag already on disk is accepted); saving is strict (tags
//! are depth- and charset-validated first).

use super::entry_store::EntryStore;
use super::fs::{delete_file, prune_empty_ancestors, save_file, walk_template_files};
use super::path_codec::{
    FILE_EXTENSION, MAX_DEPTH, build_folder_path, folder_path_to_tag, is_template_file,
    validate_tag,
};
use super::LoadReport;
use crate::models::Prompt;
use crate::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::instrument;

/// In-memory mirror of the prompts tree.
#[derive(Debug)]
pub struct PromptStore {
    root: PathBuf,
    entries: EntryStore<PathBuf, Prompt>,
}

impl PromptStore {
    /// Creates an empty store over `root`. Nothing is read until
    /// [`load_all`](Self::load_all).
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            entries: EntryStore::new(),
        }
    }

    /// Returns the prompts root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Replaces the store content with a full scan of the root.
    ///
    /// Files that fail to parse are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns an error only if the root directory cannot be created.
    #[instrument(skip(self), fields(root = %self.root.display()))]
    pub fn load_all(&mut self) -> Result<LoadReport> {
        fs::create_dir_all(&self.root).map_err(|e| Error::operation("create_prompts_dir", e))?;
        self.entries.clear();

        let mut report = LoadReport::default();
        // Tag folders plus the file itself.
        for file in walk_template_files(&self.root, MAX_DEPTH + 1) {
            match self.parse_file(&file) {
                Ok(prompt) => {
                    self.entries.insert(file, prompt);
                    report.loaded += 1;
                },
                Err(e) => {
                    tracing::warn!(file = %file.display(), error = %e, "Skipping prompt file");
                    metrics::counter!("prompt_files_skipped_total").increment(1);
                    report.skipped.push(file);
                },
            }
        }

        metrics::counter!("prompt_loads_total").increment(1);
        tracing::info!(loaded = report.loaded, skipped = report.skipped.len(), "Loaded prompts");
        Ok(report)
    }

    /// Reads and parses one prompt file.
    fn parse_file(&self, file: &Path) -> Result<Prompt> {
        let title = file
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| Error::InvalidInput(format!("no title in {}", file.display())))?;

        let dir = file
            .parent()
            .ok_or_else(|| Error::InvalidInput(format!("no parent for {}", file.display())))?;
        let tag = folder_path_to_tag(&self.root, dir)?;

        let content =
            fs::read_to_string(file).map_err(|e| Error::operation("read_prompt_file", e))?;

        Ok(Prompt::new(file, tag, title, content))
    }

    /// Returns a copy of the prompt stored for `file_path`.
    #[must_use]
    pub fn get(&self, file_path: &Path) -> Option<Prompt> {
        self.entries.get(file_path).cloned()
    }

    /// Returns a copy of every prompt, in no particular order.
    #[must_use]
    pub fn all(&self) -> Vec<Prompt> {
        self.entries.cloned_values()
    }

    /// Iterates over the stored prompts without copying.
    pub fn iter(&self) -> impl Iterator<Item = &Prompt> {
        self.entries.values()
    }

    /// Number of stored prompts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no prompts are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns `true` if `path` belongs to this store's tree.
    #[must_use]
    pub fn owns(&self, path: &Path) -> bool {
        path.starts_with(&self.root) && path != self.root
    }

    /// Re-parses one file and replaces its entry.
    ///
    /// Returns whether parsing succeeded. A file that no longer exists is
    /// dropped from the store instead, so replaying a stale event converges.
    pub fn upsert(&mut self, file_path: &Path) -> bool {
        if !file_path.is_file() || !is_template_file(file_path) {
            self.entries.remove(file_path);
            return false;
        }
        match self.parse_file(file_path) {
            Ok(prompt) => {
                self.entries.insert(file_path.to_path_buf(), prompt);
                true
            },
            Err(e) => {
                tracing::warn!(file = %file_path.display(), error = %e, "Failed to parse prompt");
                self.entries.remove(file_path);
                false
            },
        }
    }

    /// Drops the entry for `file_path` and prunes empty folders above it.
    ///
    /// Returns whether an entry was removed.
    pub fn remove(&mut self, file_path: &Path) -> bool {
        let removed = self.entries.remove(file_path).is_some();
        if !file_path.exists() {
            if let Some(parent) = file_path.parent() {
                prune_empty_ancestors(parent, &self.root);
            }
        }
        removed
    }

    /// Drops every entry under `dir`, for directory removals.
    pub fn remove_tree(&mut self, dir: &Path) -> usize {
        let removed = self.entries.retain(|path, _| !path.starts_with(dir));
        if !dir.exists() {
            if let Some(parent) = dir.parent() {
                prune_empty_ancestors(parent, &self.root);
            }
        }
        removed.len()
    }

    /// Returns the file a prompt with `tag` and `title` would be saved to.
    ///
    /// No validation happens here; use [`file_for`](Self::file_for) for
    /// untrusted input.
    #[must_use]
    pub fn target_path(&self, tag: &str, title: &str) -> PathBuf {
        build_folder_path(&self.root, tag).join(format!("{title}.{FILE_EXTENSION}"))
    }

    /// Validates `tag` and `title` and returns the file they address.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTag`] or [`Error::InvalidInput`].
    pub fn file_for(&self, tag: &str, title: &str) -> Result<PathBuf> {
        validate_tag(tag).map_err(|reason| Error::InvalidTag {
            tag: tag.to_string(),
            reason,
        })?;
        validate_title(title)?;
        Ok(self.target_path(tag, title))
    }

    /// Saves a prompt, creating or moving its file.
    ///
    /// `existing_file_path` is the file being edited; when the tag or title
    /// changed, the old file is removed only after the new one is written.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidTag`] if the tag is too deep or malformed
    /// - [`Error::InvalidInput`] if the title is empty or contains separators
    /// - [`Error::PathCollision`] if another file already occupies the target
    /// - [`Error::OperationFailed`] on I/O failure (the previous file is kept)
    pub fn save(
        &mut self,
        tag: &str,
        title: &str,
        content: &str,
        existing_file_path: Option<&Path>,
    ) -> Result<PathBuf> {
        let target = self.file_for(tag, title)?;
        let saved = save_file(&self.root, &target, content, existing_file_path)?;

        if let Some(old) = &saved.moved_from {
            self.entries.remove(old.as_path());
        }
        self.entries.insert(
            saved.path.clone(),
            Prompt::new(saved.path.clone(), tag, title, content),
        );

        metrics::counter!("prompt_saves_total").increment(1);
        tracing::debug!(file = %saved.path.display(), moved = saved.moved_from.is_some(), "Saved prompt");
        Ok(saved.path)
    }

    /// Deletes a prompt file and prunes empty folders above it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPath`] if `file_path` is outside the root, or
    /// [`Error::NotFound`] if the file is not on disk.
    pub fn delete(&mut self, file_path: &Path) -> Result<()> {
        delete_file(&self.root, file_path)?;
        self.entries.remove(file_path);
        tracing::debug!(file = %file_path.display(), "Deleted prompt");
        Ok(())
    }

    /// Drops every entry without touching disk.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Rejects titles that cannot be a single file name.
fn validate_title(title: &str) -> Result<()> {
    if title.trim().is_empty() {
        return Err(Error::InvalidInput("title cannot be empty".to_string()));
    }
    if title == "." || title == ".." || title.contains(['/', '\\']) {
        return Err(Error::InvalidInput(format!(
            "title '{title}' cannot contain path separators"
        )));
    }
    if title.starts_with('.') {
        return Err(Error::InvalidInput(format!(
            "title '{title}' cannot start with a dot"
        )));
    }
    Ok(())
}
