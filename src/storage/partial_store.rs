//! Partial store.
//!
//! Partials are flat: their content may never reference another partial.
//! The rule is checked on save and on load, so a single resolution pass is
//! always complete.

use super::entry_store::EntryStore;
use super::fs::{delete_file, prune_empty_ancestors, save_file, walk_template_files};
use super::path_codec::{
    MAX_DEPTH, dot_path_to_file, file_to_dot_path, is_template_file, validate_dot_path,
};
use super::LoadReport;
use crate::models::{Partial, contains_partial_reference};
use crate::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::instrument;

/// In-memory mirror of the partials tree, keyed by dot path.
#[derive(Debug)]
pub struct PartialStore {
    root: PathBuf,
    entries: EntryStore<String, Partial>,
}

impl PartialStore {
    /// Creates an empty store over `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            entries: EntryStore::new(),
        }
    }

    /// Returns the partials root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Replaces the store content with a full scan of the root.
    ///
    /// Empty files and files that reference other partials are logged and
    /// skipped.
    ///
    /// # Errors
    ///
    /// Returns an error only if the root directory cannot be created.
    #[instrument(skip(self), fields(root = %self.root.display()))]
    pub fn load_all(&mut self) -> Result<LoadReport> {
        fs::create_dir_all(&self.root).map_err(|e| Error::operation("create_partials_dir", e))?;
        self.entries.clear();

        let mut report = LoadReport::default();
        for file in walk_template_files(&self.root, MAX_DEPTH) {
            match self.parse_file(&file) {
                Ok(partial) => {
                    self.entries.insert(partial.path.clone(), partial);
                    report.loaded += 1;
                },
                Err(e) => {
                    tracing::warn!(file = %file.display(), error = %e, "Skipping partial file");
                    metrics::counter!("partial_files_skipped_total").increment(1);
                    report.skipped.push(file);
                },
            }
        }

        metrics::counter!("partial_loads_total").increment(1);
        tracing::info!(loaded = report.loaded, skipped = report.skipped.len(), "Loaded partials");
        Ok(report)
    }

    /// Reads, decodes and validates one partial file.
    fn parse_file(&self, file: &Path) -> Result<Partial> {
        let dot_path = file_to_dot_path(&self.root, file)?;
        let content =
            fs::read_to_string(file).map_err(|e| Error::operation("read_partial_file", e))?;
        Self::validate_content(&content)?;
        Ok(Partial::new(dot_path, &content, file))
    }

    /// Returns a copy of the partial at `dot_path`.
    #[must_use]
    pub fn get(&self, dot_path: &str) -> Option<Partial> {
        self.entries.get(dot_path).cloned()
    }

    /// Returns a read-only view of the partial at `dot_path`.
    #[must_use]
    pub fn get_ref(&self, dot_path: &str) -> Option<&Partial> {
        self.entries.get(dot_path)
    }

    /// Returns every partial, sorted by dot path.
    #[must_use]
    pub fn all(&self) -> Vec<Partial> {
        sorted(self.entries.values().cloned().collect())
    }

    /// Case-insensitive substring search over path and content, sorted.
    #[must_use]
    pub fn search(&self, query: &str) -> Vec<Partial> {
        let needle = query.to_lowercase();
        sorted(
            self.entries
                .values()
                .filter(|p| p.matches(&needle))
                .cloned()
                .collect(),
        )
    }

    /// Returns the direct children of `dot_path`, sorted.
    ///
    /// An empty `dot_path` lists the partials at the root level.
    #[must_use]
    pub fn children_of(&self, dot_path: &str) -> Vec<Partial> {
        sorted(
            self.entries
                .values()
                .filter(|p| p.folder() == dot_path)
                .cloned()
                .collect(),
        )
    }

    /// Number of stored partials.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no partials are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns `true` if `path` belongs to this store's tree.
    #[must_use]
    pub fn owns(&self, path: &Path) -> bool {
        path.starts_with(&self.root) && path != self.root
    }

    /// Checks that `content` may be stored as a partial.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyContent`] for blank content and
    /// [`Error::NestedPartialForbidden`] if it references a partial.
    pub fn validate_content(content: &str) -> Result<()> {
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return Err(Error::EmptyContent);
        }
        if contains_partial_reference(trimmed) {
            return Err(Error::NestedPartialForbidden);
        }
        Ok(())
    }

    /// Checks that `dot_path` is a valid partial name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPath`] with the violation.
    pub fn validate_path(dot_path: &str) -> Result<()> {
        validate_dot_path(dot_path).map_err(Error::from)
    }

    /// Validates `dot_path` and returns the file it addresses.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPath`] with the violation.
    pub fn file_for(&self, dot_path: &str) -> Result<PathBuf> {
        Self::validate_path(dot_path)?;
        Ok(dot_path_to_file(&self.root, dot_path))
    }

    /// Saves a partial, creating or moving its file.
    ///
    /// The stored content is trimmed.
    ///
    /// # Errors
    ///
    /// Returns a validation error before any I/O, [`Error::PathCollision`]
    /// if the target is taken, or an I/O failure.
    pub fn save(
        &mut self,
        dot_path: &str,
        content: &str,
        existing_file_path: Option<&Path>,
    ) -> Result<PathBuf> {
        let target = self.file_for(dot_path)?;
        Self::validate_content(content)?;

        let trimmed = content.trim();
        let saved = save_file(&self.root, &target, trimmed, existing_file_path)?;

        if let Some(old) = &saved.moved_from {
            self.remove_entry_for_file(old);
        }
        self.entries.insert(
            dot_path.to_string(),
            Partial::new(dot_path, trimmed, saved.path.clone()),
        );

        metrics::counter!("partial_saves_total").increment(1);
        tracing::debug!(partial = dot_path, moved = saved.moved_from.is_some(), "Saved partial");
        Ok(saved.path)
    }

    /// Re-reads one file and replaces its entry.
    ///
    /// Returns whether the file is now stored. Files that vanished or no
    /// longer validate are dropped from the store.
    pub fn upsert(&mut self, file_path: &Path) -> bool {
        if !file_path.is_file() || !is_template_file(file_path) {
            self.remove_entry_for_file(file_path);
            return false;
        }
        match self.parse_file(file_path) {
            Ok(partial) => {
                self.entries.insert(partial.path.clone(), partial);
                true
            },
            Err(e) => {
                tracing::warn!(file = %file_path.display(), error = %e, "Rejected partial");
                self.remove_entry_for_file(file_path);
                false
            },
        }
    }

    /// Drops the entry stored for `file_path` and prunes empty folders.
    ///
    /// Returns whether an entry was removed.
    pub fn remove(&mut self, file_path: &Path) -> bool {
        let removed = self.remove_entry_for_file(file_path);
        if !file_path.exists() {
            if let Some(parent) = file_path.parent() {
                prune_empty_ancestors(parent, &self.root);
            }
        }
        removed
    }

    /// Drops every entry whose file is under `dir`.
    pub fn remove_tree(&mut self, dir: &Path) -> usize {
        let removed = self.entries.retain(|_, p| !p.file_path.starts_with(dir));
        if !dir.exists() {
            if let Some(parent) = dir.parent() {
                prune_empty_ancestors(parent, &self.root);
            }
        }
        removed.len()
    }

    /// Deletes a partial file and prunes empty folders above it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPath`] if `file_path` is outside the root, or
    /// [`Error::NotFound`] if the file is not on disk.
    pub fn delete(&mut self, file_path: &Path) -> Result<()> {
        delete_file(&self.root, file_path)?;
        self.remove_entry_for_file(file_path);
        tracing::debug!(file = %file_path.display(), "Deleted partial");
        Ok(())
    }

    /// Drops every entry without touching disk.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Drops the entry only if it is backed by `file_path` itself.
    fn remove_entry_for_file(&mut self, file_path: &Path) -> bool {
        let Ok(dot_path) = file_to_dot_path(&self.root, file_path) else {
            return false;
        };
        let backed_by_file = self
            .entries
            .get(dot_path.as_str())
            .is_some_and(|p| p.file_path == file_path);
        backed_by_file && self.entries.remove(dot_path.as_str()).is_some()
    }
}

fn sorted(mut partials: Vec<Partial>) -> Vec<Partial> {
    partials.sort_by(|a, b| a.path.cmp(&b.path));
    partials
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PathViolation;
    use tempfile::TempDir;

    fn store() -> (TempDir, PartialStore) {
        let dir = TempDir::new().unwrap();
        let store = PartialStore::new(dir.path().join("partials"));
        (dir, store)
    }

    fn paths(partials: &[Partial]) -> Vec<&str> {
        partials.iter().map(|p| p.path.as_str()).collect()
    }

    #[test]
    fn test_load_skips_empty_and_nested() {
        let (_dir, mut store) = store();
        let root = store.root().to_path_buf();
        fs::create_dir_all(root.join("tones")).unwrap();
        fs::write(root.join("tones/formal.md"), "  Dear sir  \n").unwrap();
        fs::write(root.join("blank.md"), "   \n").unwrap();
        fs::write(root.join("nested.md"), "see {> tones.formal}").unwrap();

        let report = store.load_all().unwrap();
        assert_eq!(report.loaded, 1);
        assert_eq!(report.skipped.len(), 2);
        assert_eq!(store.get("tones.formal").unwrap().content, "Dear sir");
        assert!(store.get("nested").is_none());
    }

    #[test]
    fn test_dotted_file_does_not_shadow_nested_file() {
        let (_dir, mut store) = store();
        let root = store.root().to_path_buf();
        fs::create_dir_all(root.join("a")).unwrap();
        fs::write(root.join("a/b.md"), "nested").unwrap();
        fs::write(root.join("a.b.md"), "dotted").unwrap();

        let report = store.load_all().unwrap();
        assert_eq!(report.loaded, 1);
        assert_eq!(report.skipped, vec![root.join("a.b.md")]);
        assert_eq!(store.get("a.b").unwrap().content, "nested");

        assert!(!store.upsert(&root.join("a.b.md")));
        fs::remove_file(root.join("a.b.md")).unwrap();
        assert!(!store.remove(&root.join("a.b.md")));
        assert_eq!(store.get("a.b").unwrap().file_path, root.join("a/b.md"));
    }

    #[test]
    fn test_files_outside_root_are_never_touched() {
        let (dir, mut store) = store();
        store.load_all().unwrap();
        let victim = dir.path().join("victim.md");
        fs::write(&victim, "keep me").unwrap();

        assert!(matches!(store.delete(&victim), Err(Error::InvalidPath(_))));
        assert!(matches!(
            store.save("p", "x", Some(&victim)),
            Err(Error::InvalidPath(_))
        ));
        assert_eq!(fs::read_to_string(&victim).unwrap(), "keep me");

        // A segment that looks absolute is rejected before any path is built.
        assert!(matches!(
            store.file_for("x./tmp/evil"),
            Err(Error::InvalidPath(PathViolation::InvalidCharacters { .. }))
        ));
    }

    #[test]
    fn test_save_rejects_nested_reference() {
        let (_dir, mut store) = store();
        let err = store.save("a", "{> other}", None).unwrap_err();
        assert!(matches!(err, Error::NestedPartialForbidden));
        let err = store.save("a", "{{> other.thing }}", None).unwrap_err();
        assert!(matches!(err, Error::NestedPartialForbidden));

        assert!(store.save("a", "plain text", None).is_ok());
    }

    #[test]
    fn test_save_rejects_empty_content() {
        let (_dir, mut store) = store();
        let err = store.save("a", " \n\t", None).unwrap_err();
        assert!(matches!(err, Error::EmptyContent));
    }

    #[test]
    fn test_save_rejects_bad_paths() {
        let (_dir, mut store) = store();
        assert!(matches!(
            store.save("a..b", "x", None),
            Err(Error::InvalidPath(PathViolation::EmptySegment))
        ));
        assert!(matches!(
            store.save("a.b.c.d.e.f", "x", None),
            Err(Error::InvalidPath(PathViolation::PathTooDeep { .. }))
        ));
        assert!(matches!(
            store.save("a.b c", "x", None),
            Err(Error::InvalidPath(PathViolation::InvalidCharacters { .. }))
        ));
    }

    #[test]
    fn test_save_trims_and_writes_file() {
        let (_dir, mut store) = store();
        let path = store.save("sig.short", "\n  Cheers\n", None).unwrap();
        assert_eq!(path, store.root().join("sig/short.md"));
        assert_eq!(fs::read_to_string(&path).unwrap(), "Cheers");
        assert_eq!(store.get("sig.short").unwrap().content, "Cheers");
    }

    #[test]
    fn test_save_rename_moves_entry() {
        let (_dir, mut store) = store();
        let old = store.save("old.name", "x", None).unwrap();
        let new = store.save("fresh", "x", Some(&old)).unwrap();

        assert!(store.get("old.name").is_none());
        assert_eq!(store.get("fresh").unwrap().file_path, new);
        assert!(!store.root().join("old").exists());
    }

    #[test]
    fn test_children_of_direct_only() {
        let (_dir, mut store) = store();
        store.save("colors.red", "r", None).unwrap();
        store.save("colors.blue", "b", None).unwrap();
        store.save("colors.pastel.green", "g", None).unwrap();
        store.save("header", "h", None).unwrap();

        assert_eq!(
            paths(&store.children_of("colors")),
            vec!["colors.blue", "colors.red"]
        );
        assert_eq!(paths(&store.children_of("")), vec!["header"]);
        assert!(store.children_of("missing").is_empty());
    }

    #[test]
    fn test_all_and_search_sorted() {
        let (_dir, mut store) = store();
        store.save("b", "Beta content", None).unwrap();
        store.save("a", "alpha", None).unwrap();
        store.save("c.beta", "gamma", None).unwrap();

        assert_eq!(paths(&store.all()), vec!["a", "b", "c.beta"]);
        assert_eq!(paths(&store.search("BETA")), vec!["b", "c.beta"]);
        assert!(store.search("zzz").is_empty());
    }

    #[test]
    fn test_upsert_revalidates() {
        let (_dir, mut store) = store();
        let path = store.save("p", "fine", None).unwrap();

        fs::write(&path, "now {{> p}}").unwrap();
        assert!(!store.upsert(&path));
        assert!(store.get("p").is_none());

        fs::write(&path, "fine again").unwrap();
        assert!(store.upsert(&path));
        assert!(store.upsert(&path));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_remove_and_delete() {
        let (_dir, mut store) = store();
        let a = store.save("x.a", "a", None).unwrap();
        let b = store.save("x.b", "b", None).unwrap();

        store.delete(&a).unwrap();
        assert!(store.root().join("x").exists());

        fs::remove_file(&b).unwrap();
        assert!(store.remove(&b));
        assert!(!store.remove(&b));
        assert!(!store.root().join("x").exists());
        assert!(store.is_empty());
    }

    #[test]
    fn test_remove_tree() {
        let (_dir, mut store) = store();
        store.save("x.a", "a", None).unwrap();
        store.save("x.y.b", "b", None).unwrap();
        store.save("z", "z", None).unwrap();
        let x = store.root().join("x");
        fs::remove_dir_all(&x).unwrap();

        assert_eq!(store.remove_tree(&x), 2);
        assert_eq!(paths(&store.all()), vec!["z"]);
    }
}
