//! Filesystem watching.
//!
//! Turns `notify` events into [`WatchEvent`]s, debounces them per file, and
//! hands them to a [`WatchEventSink`], normally a shared [`Workspace`].
//!
//! ```text
//! notify ──► mpsc ──► filter ──► Debouncer ──► WatchEventSink::apply
//! ```

mod debounce;
mod watcher;

pub use debounce::Debouncer;
pub use watcher::ShelfWatcher;

use crate::services::{WatchOutcome, Workspace};
use crate::storage::path_codec::is_template_file;
use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind};
use std::path::{Component, Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// Kind of change seen for one path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WatchEventKind {
    /// A file appeared.
    Added,
    /// A file's content changed.
    Changed,
    /// A file or directory disappeared.
    Removed,
}

/// One change for one path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    /// Absolute path.
    pub path: PathBuf,
    /// What happened.
    pub kind: WatchEventKind,
}

impl WatchEvent {
    /// Creates an event.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, kind: WatchEventKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    /// Splits a `notify` event into per-path events.
    ///
    /// Renames become a removal of the old path and an addition of the new
    /// one. Access and metadata-only events produce nothing.
    #[must_use]
    pub fn from_notify(event: &Event) -> Vec<Self> {
        let all = |kind| event.paths.iter().map(|p| Self::new(p.clone(), kind)).collect();
        match event.kind {
            EventKind::Create(_) => all(WatchEventKind::Added),
            EventKind::Remove(_) => all(WatchEventKind::Removed),
            EventKind::Modify(ModifyKind::Name(RenameMode::From)) => all(WatchEventKind::Removed),
            EventKind::Modify(ModifyKind::Name(RenameMode::To)) => all(WatchEventKind::Added),
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => match event.paths.as_slice() {
                [from, to] => vec![
                    Self::new(from.clone(), WatchEventKind::Removed),
                    Self::new(to.clone(), WatchEventKind::Added),
                ],
                _ => Vec::new(),
            },
            // The platform could not tell which side of a rename this is.
            EventKind::Modify(ModifyKind::Name(_)) => event
                .paths
                .iter()
                .map(|p| {
                    let kind = if p.exists() {
                        WatchEventKind::Added
                    } else {
                        WatchEventKind::Removed
                    };
                    Self::new(p.clone(), kind)
                })
                .collect(),
            EventKind::Modify(ModifyKind::Metadata(_)) => Vec::new(),
            EventKind::Modify(_) => all(WatchEventKind::Changed),
            _ => Vec::new(),
        }
    }
}

/// Returns `true` if the watcher should forward `event`.
///
/// Accepts `**/*.md` up to `max_depth` folders below one of `roots`, plus
/// directories that appeared (a moved-in folder is reported once) and
/// removals of any path there (a removed directory has no extension).
/// Hidden entries are dropped.
#[must_use]
pub fn accepts(roots: &[PathBuf], event: &WatchEvent, max_depth: usize) -> bool {
    let is_file = is_template_file(&event.path);
    let tracked = is_file
        || match event.kind {
            WatchEventKind::Removed => true,
            WatchEventKind::Added => event.path.is_dir(),
            WatchEventKind::Changed => false,
        };
    if !tracked {
        return false;
    }
    roots.iter().any(|root| {
        let Ok(relative) = event.path.strip_prefix(root) else {
            return false;
        };
        let mut depth: usize = 0;
        for component in relative.components() {
            match component {
                Component::Normal(name) if !name.to_string_lossy().starts_with('.') => depth += 1,
                _ => return false,
            }
        }
        let folders = if is_file { depth.saturating_sub(1) } else { depth };
        depth > 0 && folders <= max_depth
    })
}

/// Receiver of debounced watch events.
pub trait WatchEventSink: Send + Sync + 'static {
    /// Applies one event.
    fn apply(&self, event: &WatchEvent) -> WatchOutcome;

    /// Roots the watcher should observe.
    fn watch_roots(&self) -> Vec<PathBuf>;
}

/// Locks a workspace, recovering from poisoning.
pub fn lock_workspace(workspace: &Mutex<Workspace>) -> MutexGuard<'_, Workspace> {
    match workspace.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::warn!("Workspace mutex was poisoned, recovering");
            metrics::counter!("workspace_mutex_poison_recovery_total").increment(1);
            poisoned.into_inner()
        },
    }
}

/// Routes an event into a workspace's entry points.
pub fn dispatch(workspace: &mut Workspace, event: &WatchEvent) -> WatchOutcome {
    let path: &Path = &event.path;
    match event.kind {
        WatchEventKind::Added => workspace.on_file_added(path),
        WatchEventKind::Changed => workspace.on_file_changed(path),
        WatchEventKind::Removed => workspace.on_file_removed(path),
    }
}

impl WatchEventSink for Mutex<Workspace> {
    fn apply(&self, event: &WatchEvent) -> WatchOutcome {
        dispatch(&mut lock_workspace(self), event)
    }

    fn watch_roots(&self) -> Vec<PathBuf> {
        let workspace = lock_workspace(self);
        vec![
            workspace.prompts().root().to_path_buf(),
            workspace.partials().root().to_path_buf(),
        ]
    }
}
