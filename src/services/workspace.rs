//! Workspace: one root, one prompt store, one partial store.
//!
//! ```text
//! <root>/
//! ├── prompts/<tag>/.../<title>.md
//! └── partials/<a>/.../<b>.md
//! ```
//!
//! The workspace is a plain value. A second workspace (for example the
//! global one) is a second value and shares nothing with the first.

use super::dependency::{Dependencies, DependencyCollector};
use super::resolver::Resolver;
use crate::storage::fs::walk_template_files;
use crate::storage::path_codec::{MAX_DEPTH, file_to_dot_path, is_template_file};
use crate::storage::{LoadReport, PartialStore, PromptStore};
use crate::{Error, Result};
use std::collections::HashMap;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Directory holding prompts under a workspace root.
pub const PROMPTS_DIR: &str = "prompts";

/// Directory holding partials under a workspace root.
pub const PARTIALS_DIR: &str = "partials";

/// Which store a watch event was routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchTarget {
    /// The prompts tree.
    Prompts,
    /// The partials tree.
    Partials,
    /// Not a tracked file.
    Ignored,
}

/// Result of feeding one watch event into a workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchOutcome {
    /// Store the event was routed to.
    pub target: WatchTarget,
    /// Whether the in-memory state changed.
    pub changed: bool,
}

impl WatchOutcome {
    const IGNORED: Self = Self {
        target: WatchTarget::Ignored,
        changed: false,
    };

    /// Returns `true` if a prompt changed, so a search index is stale.
    #[must_use]
    pub fn prompts_changed(&self) -> bool {
        self.changed && self.target == WatchTarget::Prompts
    }
}

/// Load summary for both stores.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkspaceReport {
    /// Prompt scan result.
    pub prompts: LoadReport,
    /// Partial scan result.
    pub partials: LoadReport,
}

/// The stores for one workspace root.
#[derive(Debug)]
pub struct Workspace {
    root: PathBuf,
    prompts: PromptStore,
    partials: PartialStore,
    last_load: WorkspaceReport,
}

impl Workspace {
    /// Opens `root`, creating its folders if needed, and loads both stores.
    ///
    /// The root is canonicalized so it matches the paths the platform
    /// watcher reports (for example `/private/var` on macOS).
    ///
    /// # Errors
    ///
    /// Returns an error if the folders cannot be created.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = canonical_root(root.into())?;
        let mut workspace = Self {
            prompts: PromptStore::new(root.join(PROMPTS_DIR)),
            partials: PartialStore::new(root.join(PARTIALS_DIR)),
            root,
            last_load: WorkspaceReport::default(),
        };
        workspace.reload()?;
        Ok(workspace)
    }

    /// Rescans both trees from disk.
    ///
    /// # Errors
    ///
    /// Returns an error if a store root cannot be created.
    pub fn reload(&mut self) -> Result<&WorkspaceReport> {
        let prompts = self.prompts.load_all()?;
        let partials = self.partials.load_all()?;
        tracing::info!(
            root = %self.root.display(),
            prompts = prompts.loaded,
            partials = partials.loaded,
            "Workspace loaded"
        );
        self.last_load = WorkspaceReport { prompts, partials };
        Ok(&self.last_load)
    }

    /// Drops all in-memory state. Files are untouched.
    pub fn close(&mut self) {
        self.prompts.clear();
        self.partials.clear();
        self.last_load = WorkspaceReport::default();
        tracing::debug!(root = %self.root.display(), "Workspace closed");
    }

    /// Closes this workspace and opens `root` in its place.
    ///
    /// # Errors
    ///
    /// Returns an error if the new root cannot be loaded. The old state is
    /// already cleared at that point.
    pub fn switch(&mut self, root: impl Into<PathBuf>) -> Result<&WorkspaceReport> {
        self.close();
        let root = canonical_root(root.into())?;
        self.prompts = PromptStore::new(root.join(PROMPTS_DIR));
        self.partials = PartialStore::new(root.join(PARTIALS_DIR));
        self.root = root;
        self.reload()
    }

    /// Returns the workspace root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the prompt store.
    #[must_use]
    pub const fn prompts(&self) -> &PromptStore {
        &self.prompts
    }

    /// Returns the prompt store for writing.
    pub const fn prompts_mut(&mut self) -> &mut PromptStore {
        &mut self.prompts
    }

    /// Returns the partial store.
    #[must_use]
    pub const fn partials(&self) -> &PartialStore {
        &self.partials
    }

    /// Returns the partial store for writing.
    pub const fn partials_mut(&mut self) -> &mut PartialStore {
        &mut self.partials
    }

    /// Returns the report of the most recent full scan.
    #[must_use]
    pub const fn last_load(&self) -> &WorkspaceReport {
        &self.last_load
    }

    /// Returns a resolver over this workspace's partials.
    #[must_use]
    pub const fn resolver(&self) -> Resolver<'_, PartialStore> {
        Resolver::new(&self.partials)
    }

    /// Resolves the static partial references of a stored prompt.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no prompt is stored for `file_path`.
    pub fn resolve_prompt(&self, file_path: &Path) -> Result<String> {
        let prompt = self
            .prompts
            .get(file_path)
            .ok_or_else(|| Error::NotFound(file_path.to_path_buf()))?;
        Ok(self.resolver().resolve_static(&prompt.content))
    }

    /// Resolves a stored prompt fully: pickers, partials, then parameters.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no prompt is stored for `file_path`.
    pub fn render_prompt(
        &self,
        file_path: &Path,
        selections: &HashMap<String, String>,
        values: &HashMap<String, String>,
    ) -> Result<String> {
        let prompt = self
            .prompts
            .get(file_path)
            .ok_or_else(|| Error::NotFound(file_path.to_path_buf()))?;
        let resolved = self.resolver().resolve(&prompt.content, selections);
        Ok(super::resolver::render(&resolved, values))
    }

    /// Returns the partials a stored prompt depends on.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no prompt is stored for `file_path`.
    pub fn dependencies(&self, file_path: &Path) -> Result<Dependencies> {
        let prompt = self
            .prompts
            .get(file_path)
            .ok_or_else(|| Error::NotFound(file_path.to_path_buf()))?;
        Ok(DependencyCollector::new(&self.partials).collect(&prompt))
    }

    /// Handles a file creation event.
    ///
    /// A directory that appears, such as a folder moved into the tree, is
    /// handed to [`on_dir_added`](Self::on_dir_added).
    pub fn on_file_added(&mut self, path: &Path) -> WatchOutcome {
        if path.is_dir() {
            return self.on_dir_added(path);
        }
        self.upsert(path)
    }

    /// Loads every template file beneath a directory that appeared.
    ///
    /// Platforms report a moved-in folder as one event for the folder, so
    /// the files inside are found by walking it.
    pub fn on_dir_added(&mut self, dir: &Path) -> WatchOutcome {
        let target = self.route(dir, true);
        let (root, max_depth) = match target {
            WatchTarget::Prompts => (self.prompts.root(), MAX_DEPTH + 1),
            WatchTarget::Partials => (self.partials.root(), MAX_DEPTH),
            WatchTarget::Ignored => return WatchOutcome::IGNORED,
        };
        let depth = dir.strip_prefix(root).map_or(0, |rel| rel.components().count());
        let files = walk_template_files(dir, max_depth.saturating_sub(depth));

        let mut changed = false;
        for file in &files {
            changed |= self.upsert(file).changed;
        }
        metrics::counter!("watch_events_total", "kind" => "dir_added").increment(1);
        tracing::debug!(
            dir = %dir.display(),
            ?target,
            files = files.len(),
            changed,
            "Handled directory addition"
        );
        WatchOutcome { target, changed }
    }

    /// Handles a file modification event.
    pub fn on_file_changed(&mut self, path: &Path) -> WatchOutcome {
        self.upsert(path)
    }

    /// Handles a file or directory removal event.
    ///
    /// A path without the template extension is treated as a removed
    /// directory and drops every entry beneath it.
    pub fn on_file_removed(&mut self, path: &Path) -> WatchOutcome {
        let target = self.route(path, true);
        let is_file = is_template_file(path);
        let changed = match target {
            WatchTarget::Prompts if is_file => self.prompts.remove(path),
            WatchTarget::Prompts => self.prompts.remove_tree(path) > 0,
            WatchTarget::Partials if is_file => self.partials.remove(path),
            WatchTarget::Partials => self.partials.remove_tree(path) > 0,
            WatchTarget::Ignored => return WatchOutcome::IGNORED,
        };
        metrics::counter!("watch_events_total", "kind" => "removed").increment(1);
        tracing::debug!(path = %path.display(), ?target, changed, "Handled removal");
        WatchOutcome { target, changed }
    }

    fn upsert(&mut self, path: &Path) -> WatchOutcome {
        let target = self.route(path, false);
        let changed = match target {
            WatchTarget::Prompts => {
                let before = self.prompts.get(path);
                self.prompts.upsert(path);
                before != self.prompts.get(path)
            },
            WatchTarget::Partials => {
                let dot_path = file_to_dot_path(self.partials.root(), path).ok();
                let snapshot =
                    |store: &PartialStore| dot_path.as_deref().and_then(|d| store.get(d));
                let before = snapshot(&self.partials);
                self.partials.upsert(path);
                before != snapshot(&self.partials)
            },
            WatchTarget::Ignored => return WatchOutcome::IGNORED,
        };
        metrics::counter!("watch_events_total", "kind" => "upserted").increment(1);
        tracing::debug!(path = %path.display(), ?target, changed, "Handled change");
        WatchOutcome { target, changed }
    }

    /// Decides which store, if any, an event path belongs to.
    ///
    /// Hidden entries and paths deeper than the store's walk are ignored.
    /// Directories are only routed for removals.
    fn route(&self, path: &Path, allow_dirs: bool) -> WatchTarget {
        if !allow_dirs && !is_template_file(path) {
            return WatchTarget::Ignored;
        }
        let (target, root, max_depth) = if self.prompts.owns(path) {
            (WatchTarget::Prompts, self.prompts.root(), MAX_DEPTH + 1)
        } else if self.partials.owns(path) {
            (WatchTarget::Partials, self.partials.root(), MAX_DEPTH)
        } else {
            return WatchTarget::Ignored;
        };

        let Ok(relative) = path.strip_prefix(root) else {
            return WatchTarget::Ignored;
        };
        let mut depth = 0;
        for component in relative.components() {
            match component {
                Component::Normal(name) if !name.to_string_lossy().starts_with('.') => {
                    depth += 1;
                },
                _ => return WatchTarget::Ignored,
            }
        }
        if depth > max_depth {
            return WatchTarget::Ignored;
        }
        target
    }
}

/// Creates `root` if needed and resolves it to its canonical form.
fn canonical_root(root: PathBuf) -> Result<PathBuf> {
    fs::create_dir_all(&root).map_err(|e| Error::operation("create_workspace_dir", e))?;
    fs::canonicalize(&root).map_err(|e| Error::operation("canonicalize_workspace_dir", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open() -> (TempDir, Workspace) {
        let dir = TempDir::new().unwrap();
        let workspace = Workspace::open(dir.path()).unwrap();
        (dir, workspace)
    }

    #[test]
    fn test_open_creates_layout() {
        let (dir, workspace) = open();
        assert!(dir.path().join(PROMPTS_DIR).is_dir());
        assert!(dir.path().join(PARTIALS_DIR).is_dir());
        assert!(workspace.prompts().is_empty());
        assert_eq!(workspace.last_load(), &WorkspaceReport::default());
    }

    #[test]
    fn test_resolve_prompt() {
        let (_dir, mut workspace) = open();
        workspace.partials_mut().save("header", "Hello", None).unwrap();
        workspace.partials_mut().save("footer", "Bye", None).unwrap();
        let path = workspace
            .prompts_mut()
            .save("mail", "Greeting", "{> header } Content {> footer }", None)
            .unwrap();

        assert_eq!(workspace.resolve_prompt(&path).unwrap(), "Hello Content Bye");
        assert!(matches!(
            workspace.resolve_prompt(&workspace.root().join("nope.md")),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_render_prompt() {
        let (_dir, mut workspace) = open();
        workspace.partials_mut().save("tone.calm", "Calmly", None).unwrap();
        let path = workspace
            .prompts_mut()
            .save("", "Ask", "{{> tone.* tone.calm}} explain [TOPIC]", None)
            .unwrap();

        let values = HashMap::from([("TOPIC".to_string(), "lifetimes".to_string())]);
        let text = workspace.render_prompt(&path, &HashMap::new(), &values).unwrap();
        assert_eq!(text, "Calmly explain lifetimes");
    }

    #[test]
    fn test_watch_events_route_by_root() {
        let (_dir, mut workspace) = open();
        let prompt = workspace.root().join("prompts/a/P.md");
        fs::create_dir_all(prompt.parent().unwrap()).unwrap();
        fs::write(&prompt, "[X]").unwrap();

        let outcome = workspace.on_file_added(&prompt);
        assert_eq!(outcome.target, WatchTarget::Prompts);
        assert!(outcome.changed);
        assert!(outcome.prompts_changed());

        let partial = workspace.root().join("partials/p.md");
        fs::write(&partial, "snippet").unwrap();
        let outcome = workspace.on_file_added(&partial);
        assert_eq!(outcome.target, WatchTarget::Partials);
        assert!(outcome.changed);
        assert_eq!(workspace.partials().get("p").unwrap().content, "snippet");
    }

    #[test]
    fn test_watch_replay_is_idempotent() {
        let (_dir, mut workspace) = open();
        let prompt = workspace.root().join("prompts/P.md");
        fs::write(&prompt, "v1").unwrap();

        assert!(workspace.on_file_added(&prompt).changed);
        assert!(!workspace.on_file_added(&prompt).changed);
        assert!(!workspace.on_file_changed(&prompt).changed);

        fs::write(&prompt, "v2").unwrap();
        assert!(workspace.on_file_changed(&prompt).changed);
        assert_eq!(workspace.prompts().get(&prompt).unwrap().content, "v2");

        fs::remove_file(&prompt).unwrap();
        assert!(workspace.on_file_removed(&prompt).changed);
        assert!(!workspace.on_file_removed(&prompt).changed);
        // A late "changed" event for a deleted file converges to disk state.
        assert!(!workspace.on_file_changed(&prompt).changed);
        assert!(workspace.prompts().is_empty());
    }

    #[test]
    fn test_save_then_watch_event_is_noop() {
        let (_dir, mut workspace) = open();
        let path = workspace.prompts_mut().save("t", "P", "body", None).unwrap();
        let outcome = workspace.on_file_changed(&path);
        assert_eq!(outcome.target, WatchTarget::Prompts);
        assert!(!outcome.changed);
    }

    #[test]
    fn test_ignored_events() {
        let (_dir, mut workspace) = open();
        let outside = workspace.root().join("notes.md");
        fs::write(&outside, "x").unwrap();
        assert_eq!(workspace.on_file_added(&outside).target, WatchTarget::Ignored);

        let text = workspace.root().join("prompts/readme.txt");
        fs::write(&text, "x").unwrap();
        assert_eq!(workspace.on_file_added(&text).target, WatchTarget::Ignored);

        let hidden = workspace.root().join("prompts/.hidden/P.md");
        fs::create_dir_all(hidden.parent().unwrap()).unwrap();
        fs::write(&hidden, "x").unwrap();
        assert_eq!(workspace.on_file_added(&hidden).target, WatchTarget::Ignored);

        let too_deep = workspace.root().join("partials/a/b/c/d/e/f.md");
        fs::create_dir_all(too_deep.parent().unwrap()).unwrap();
        fs::write(&too_deep, "x").unwrap();
        assert_eq!(workspace.on_file_added(&too_deep).target, WatchTarget::Ignored);
    }

    #[test]
    fn test_moved_in_directory_is_loaded() {
        let (_dir, mut workspace) = open();
        let staging = TempDir::new().unwrap();
        let source = staging.path().join("mail");
        fs::create_dir_all(source.join("reply")).unwrap();
        fs::write(source.join("Intro.md"), "Hello [NAME]").unwrap();
        fs::write(source.join("reply/Thanks.md"), "Thanks").unwrap();
        fs::write(source.join("notes.txt"), "ignored").unwrap();

        let moved = workspace.root().join("prompts/mail");
        fs::rename(&source, &moved).unwrap();

        let outcome = workspace.on_file_added(&moved);
        assert_eq!(outcome.target, WatchTarget::Prompts);
        assert!(outcome.changed);
        assert_eq!(workspace.prompts().len(), 2);
        let thanks = workspace.prompts().get(&moved.join("reply/Thanks.md")).unwrap();
        assert_eq!(thanks.tag, "mail-reply");

        // Replaying the event changes nothing.
        assert!(!workspace.on_file_added(&moved).changed);
    }

    #[test]
    fn test_renamed_partial_folder_follows_disk() {
        let (_dir, mut workspace) = open();
        workspace.partials_mut().save("tones.formal", "Formal", None).unwrap();
        let old = workspace.root().join("partials/tones");
        let new = workspace.root().join("partials/voices");
        fs::rename(&old, &new).unwrap();

        assert!(workspace.on_file_removed(&old).changed);
        assert!(workspace.on_file_added(&new).changed);
        assert!(workspace.partials().get("tones.formal").is_none());
        assert_eq!(workspace.partials().get("voices.formal").unwrap().content, "Formal");
    }

    #[test]
    fn test_directory_outside_roots_is_ignored() {
        let (_dir, mut workspace) = open();
        let stray = workspace.root().join("scratch");
        fs::create_dir_all(&stray).unwrap();
        fs::write(stray.join("P.md"), "x").unwrap();
        assert_eq!(workspace.on_file_added(&stray).target, WatchTarget::Ignored);
        assert!(workspace.prompts().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_root_is_canonicalized() {
        let dir = TempDir::new().unwrap();
        let real = dir.path().join("real");
        fs::create_dir_all(&real).unwrap();
        let link = dir.path().join("link");
        std::os::unix::fs::symlink(&real, &link).unwrap();

        let mut workspace = Workspace::open(&link).unwrap();
        let canonical = fs::canonicalize(&real).unwrap();
        assert_eq!(workspace.root(), canonical);

        // Events arrive with resolved paths.
        let file = canonical.join("prompts/P.md");
        fs::write(&file, "x").unwrap();
        assert_eq!(workspace.on_file_added(&file).target, WatchTarget::Prompts);
    }

    #[test]
    fn test_directory_removal_drops_entries() {
        let (_dir, mut workspace) = open();
        workspace.prompts_mut().save("a-b", "One", "1", None).unwrap();
        workspace.prompts_mut().save("a", "Two", "2", None).unwrap();
        workspace.prompts_mut().save("z", "Three", "3", None).unwrap();

        let a = workspace.root().join("prompts/a");
        fs::remove_dir_all(&a).unwrap();
        let outcome = workspace.on_file_removed(&a);
        assert_eq!(outcome.target, WatchTarget::Prompts);
        assert!(outcome.changed);
        assert_eq!(workspace.prompts().len(), 1);
    }

    #[test]
    fn test_invalid_partial_edit_drops_entry() {
        let (_dir, mut workspace) = open();
        let path = workspace.partials_mut().save("p", "fine", None).unwrap();
        fs::write(&path, "{> other}").unwrap();

        let outcome = workspace.on_file_changed(&path);
        assert!(outcome.changed);
        assert!(workspace.partials().get("p").is_none());
    }

    #[test]
    fn test_close_and_switch() {
        let (_dir, mut workspace) = open();
        workspace.prompts_mut().save("", "Local", "x", None).unwrap();

        let other = TempDir::new().unwrap();
        fs::create_dir_all(other.path().join("prompts")).unwrap();
        fs::write(other.path().join("prompts/Global.md"), "g").unwrap();

        let report = workspace.switch(other.path()).unwrap();
        assert_eq!(report.prompts.loaded, 1);
        assert_eq!(workspace.root(), fs::canonicalize(other.path()).unwrap());
        assert_eq!(workspace.prompts().all()[0].title, "Global");

        workspace.close();
        assert!(workspace.prompts().is_empty());
    }

    #[test]
    fn test_dependencies() {
        let (_dir, mut workspace) = open();
        workspace.partials_mut().save("a", "A", None).unwrap();
        let path = workspace.prompts_mut().save("", "P", "{> a} {> b}", None).unwrap();

        let deps = workspace.dependencies(&path).unwrap();
        assert_eq!(deps.partials.len(), 1);
        assert_eq!(deps.missing, vec!["b"]);
    }
}
