//! Watch CLI command.

use super::{CliContext, CommandResult};
use crate::services::{WatchOutcome, Workspace};
use crate::storage::{SearchIndex, SqliteSearchIndex};
use crate::watch::{ShelfWatcher, WatchEvent, WatchEventSink, dispatch, lock_workspace};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// A workspace paired with a search index that follows prompt changes.
pub struct IndexedWorkspace {
    workspace: Mutex<Workspace>,
    index: SqliteSearchIndex,
}

impl IndexedWorkspace {
    /// Wraps `workspace` and builds the initial index.
    ///
    /// # Errors
    ///
    /// Returns an error if the index cannot be created.
    pub fn new(workspace: Workspace) -> crate::Result<Self> {
        let index = SqliteSearchIndex::in_memory()?;
        index.rebuild(&workspace.prompts().all())?;
        Ok(Self {
            workspace: Mutex::new(workspace),
            index,
        })
    }

    /// The shared workspace.
    #[must_use]
    pub const fn workspace(&self) -> &Mutex<Workspace> {
        &self.workspace
    }

    /// The search index.
    #[must_use]
    pub const fn index(&self) -> &SqliteSearchIndex {
        &self.index
    }
}

impl WatchEventSink for IndexedWorkspace {
    fn apply(&self, event: &WatchEvent) -> WatchOutcome {
        let mut workspace = lock_workspace(&self.workspace);
        let outcome = dispatch(&mut workspace, event);
        if outcome.prompts_changed() {
            if let Err(e) = self.index.rebuild(&workspace.prompts().all()) {
                tracing::warn!(error = %e, "Failed to rebuild search index");
            }
        }
        outcome
    }

    fn watch_roots(&self) -> Vec<PathBuf> {
        self.workspace.watch_roots()
    }
}

/// Executes the `watch` command.
///
/// Keeps the workspace in sync with edits made outside promptshelf until
/// interrupted with Ctrl-C.
///
/// # Errors
///
/// Returns an error if the workspace cannot be opened or watched.
pub async fn cmd_watch(ctx: &CliContext) -> CommandResult {
    let workspace = ctx.open_workspace()?;
    let root = workspace.root().to_path_buf();
    let sink = Arc::new(IndexedWorkspace::new(workspace)?);
    let watcher = ShelfWatcher::start(Arc::clone(&sink), ctx.config.watch)?;

    println!("Watching {} (Ctrl-C to stop)", root.display());
    tokio::signal::ctrl_c().await?;
    watcher.shutdown().await;

    let workspace = lock_workspace(sink.workspace());
    println!(
        "Stopped. {} prompts, {} partials",
        workspace.prompts().len(),
        workspace.partials().len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::watch::WatchEventKind;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_index_follows_prompt_changes() {
        let dir = TempDir::new().unwrap();
        let sink = IndexedWorkspace::new(Workspace::open(dir.path()).unwrap()).unwrap();
        assert_eq!(sink.index().count().unwrap(), 0);

        let file = fs::canonicalize(dir.path()).unwrap().join("prompts/mail/Reply.md");
        fs::create_dir_all(file.parent().unwrap()).unwrap();
        fs::write(&file, "Answer politely").unwrap();
        let outcome = sink.apply(&WatchEvent::new(&file, WatchEventKind::Added));
        assert!(outcome.prompts_changed());
        assert_eq!(sink.index().count().unwrap(), 1);
        assert_eq!(sink.index().search("politely", 5).unwrap()[0].file_path, file);

        fs::remove_file(&file).unwrap();
        sink.apply(&WatchEvent::new(&file, WatchEventKind::Removed));
        assert_eq!(sink.index().count().unwrap(), 0);
    }
}
