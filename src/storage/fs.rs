//! Filesystem helpers shared by the prompt and partial stores.
//!
//! Saves follow a write-then-delete protocol: the new file is fully written
//! (temp file + rename) before the previous file of a rename is removed, so a
//! failed write never loses the old version.

use super::path_codec::is_template_file;
use crate::{Error, PathViolation, Result};
use std::fs;
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// Lists template files under `root`, at most `max_depth` levels down.
///
/// Hidden files and directories (leading `.`) are skipped. Unreadable entries
/// are logged and skipped so one bad directory does not abort the scan.
#[must_use]
pub fn walk_template_files(root: &Path, max_depth: usize) -> Vec<PathBuf> {
    WalkDir::new(root)
        .min_depth(1)
        .max_depth(max_depth)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| !is_hidden(entry.file_name()))
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!(error = %e, "Skipping unreadable entry during scan");
                None
            },
        })
        .filter(|entry| entry.file_type().is_file() && is_template_file(entry.path()))
        .map(walkdir::DirEntry::into_path)
        .collect()
}

/// Returns `true` for dotfiles.
fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_str().is_some_and(|n| n.starts_with('.'))
}

/// Writes `content` to `target` via a temp file in the same directory.
///
/// # Errors
///
/// Returns an error if the temp file cannot be created, written, or renamed
/// onto `target`. `target` is untouched on failure.
pub fn write_atomic(target: &Path, content: &str) -> Result<()> {
    let parent = target
        .parent()
        .ok_or_else(|| Error::operation("write_file", "target has no parent directory"))?;

    let mut temp = tempfile::Builder::new()
        .prefix(".promptshelf-")
        .suffix(".tmp")
        .tempfile_in(parent)
        .map_err(|e| Error::operation("create_temp_file", e))?;

    temp.write_all(content.as_bytes())
        .and_then(|()| temp.flush())
        .map_err(|e| Error::operation("write_temp_file", e))?;

    temp.persist(target)
        .map_err(|e| Error::operation("persist_file", format!("{}: {}", target.display(), e.error)))?;

    Ok(())
}

/// Deletes empty directories from `start_dir` upwards, never deleting `root`.
///
/// Stops at `root`, at the first non-empty directory, or at the first
/// directory that cannot be read or removed. A `start_dir` outside `root`
/// is left alone. Returns the number of directories removed.
pub fn prune_empty_ancestors(start_dir: &Path, root: &Path) -> usize {
    let mut removed = 0;
    let mut current = start_dir.to_path_buf();

    while current != root && current.starts_with(root) {
        let is_empty = match fs::read_dir(&current) {
            Ok(mut entries) => entries.next().is_none(),
            Err(e) => {
                tracing::debug!(dir = %current.display(), error = %e, "Stopping prune");
                break;
            },
        };
        if !is_empty {
            break;
        }
        if let Err(e) = fs::remove_dir(&current) {
            tracing::debug!(dir = %current.display(), error = %e, "Could not prune directory");
            break;
        }
        tracing::debug!(dir = %current.display(), "Pruned empty directory");
        removed += 1;

        match current.parent() {
            Some(parent) => current = parent.to_path_buf(),
            None => break,
        }
    }

    removed
}

/// Fails unless `path` sits strictly below `root`.
///
/// The check is lexical: any `..` or `.` component is rejected, so a joined
/// path cannot climb back out of the root.
///
/// # Errors
///
/// Returns [`PathViolation::OutsideRoot`] wrapped in [`Error::InvalidPath`].
pub fn ensure_under_root(root: &Path, path: &Path) -> Result<()> {
    let inside = path.strip_prefix(root).is_ok_and(|relative| {
        relative.components().next().is_some()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)))
    });
    if inside {
        Ok(())
    } else {
        Err(PathViolation::OutsideRoot {
            path: path.to_path_buf(),
            root: root.to_path_buf(),
        }
        .into())
    }
}

/// Returns `true` if both paths name the same file.
///
/// Falls back to lexical comparison when either path cannot be resolved.
#[must_use]
pub fn same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Outcome of [`save_file`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedFile {
    /// Path that now holds the content.
    pub path: PathBuf,
    /// Previous location, when the save moved the file.
    pub moved_from: Option<PathBuf>,
}

/// Runs the collision-checked write-then-delete save protocol.
///
/// 1. Fail with [`Error::InvalidPath`] if `target` or `existing` is outside `root`.
/// 2. Fail with [`Error::PathCollision`] if `target` exists and is not `existing`.
/// 3. Create missing directories.
/// 4. Write `content` to `target`.
/// 5. If `existing` differs from `target`, delete it and prune its folders.
///
/// # Errors
///
/// Returns [`Error::InvalidPath`], [`Error::PathCollision`] or an I/O
/// failure. When the write fails nothing has been deleted and folders
/// created for the target are pruned again.
pub fn save_file(
    root: &Path,
    target: &Path,
    content: &str,
    existing: Option<&Path>,
) -> Result<SavedFile> {
    ensure_under_root(root, target)?;
    if let Some(old) = existing {
        ensure_under_root(root, old)?;
    }

    let editing_same = existing.is_some_and(|old| same_file(old, target));

    if target.exists() && !editing_same {
        return Err(Error::PathCollision {
            target: target.to_path_buf(),
            editing: existing.map(Path::to_path_buf),
        });
    }

    let parent = target
        .parent()
        .ok_or_else(|| Error::operation("write_file", "target has no parent directory"))?;
    fs::create_dir_all(parent).map_err(|e| Error::operation("create_dir", e))?;

    if let Err(e) = write_atomic(target, content) {
        prune_empty_ancestors(parent, root);
        return Err(e);
    }

    let moved_from = match existing {
        Some(old) if !editing_same => {
            remove_if_present(old)?;
            if let Some(parent) = old.parent() {
                prune_empty_ancestors(parent, root);
            }
            Some(old.to_path_buf())
        },
        _ => None,
    };

    Ok(SavedFile {
        path: target.to_path_buf(),
        moved_from,
    })
}

/// Deletes a file, treating "already gone" as success.
fn remove_if_present(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::operation("delete_file", e)),
    }
}

/// Deletes a file and prunes its now-empty folders.
///
/// # Errors
///
/// Returns [`Error::InvalidPath`] if `path` is outside `root`,
/// [`Error::NotFound`] if the file is absent, or an I/O failure.
pub fn delete_file(root: &Path, path: &Path) -> Result<()> {
    ensure_under_root(root, path)?;
    if !path.is_file() {
        return Err(Error::NotFound(path.to_path_buf()));
    }
    fs::remove_file(path).map_err(|e| Error::operation("delete_file", e))?;
    if let Some(parent) = path.parent() {
        prune_empty_ancestors(parent, root);
    }
    Ok(())
}
