//! # Promptshelf
//!
//! A local store for reusable prompt templates kept in a tag-hierarchical
//! directory tree.
//!
//! Prompts live under `<workspace>/prompts/<tag>/.../<title>.md`, where the
//! directory chain forms a hyphen-joined tag (`coding-review`). Partials are
//! reusable snippets under `<workspace>/partials/<a>/<b>.md`, addressed by dot
//! path (`a.b`) and pulled into prompts with `{{> a.b}}`.
//!
//! ## Features
//!
//! - Authoritative in-memory mirror of the prompt and partial trees
//! - Template parsing: `[PARAMETERS]`, static partials, dynamic pickers
//! - Single-pass partial resolution with missing-reference sentinels
//! - Idempotent watch-event entry points for external edits
//! - Compressed transfer strings for sharing a prompt with its partials
//!
//! ## Example
//!
//! ```rust,no_run
//! use promptshelf::Workspace;
//!
//! let mut workspace = Workspace::open("/home/me/prompts-workspace")?;
//! let path = workspace.prompts_mut().save("coding-review", "Rust", "Review [CODE]", None)?;
//! let resolved = workspace.resolve_prompt(&path)?;
//! # Ok::<(), promptshelf::Error>(())
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use std::path::PathBuf;
use thiserror::Error as ThisError;

pub mod cli;
pub mod config;
pub mod io;
pub mod models;
pub mod observability;
pub mod services;
pub mod storage;
pub mod watch;

pub use config::ShelfConfig;
pub use models::{ParsedTemplate, Partial, PartialPicker, Prompt};
pub use services::{DependencyCollector, Resolver, WatchOutcome, WatchTarget, Workspace};
pub use storage::{EntryStore, LoadReport, PartialStore, PromptStore};

/// Reason a tag or dot path was rejected.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum PathViolation {
    /// More hierarchy levels than the policy allows.
    #[error("path has {depth} levels, at most {max} are allowed")]
    PathTooDeep {
        /// Number of segments found.
        depth: usize,
        /// Configured maximum.
        max: usize,
    },

    /// A segment between two separators is empty.
    #[error("path contains an empty segment")]
    EmptySegment,

    /// A segment contains characters outside `[A-Za-z0-9_-]`.
    #[error("segment '{segment}' contains invalid characters")]
    InvalidCharacters {
        /// The offending segment.
        segment: String,
    },

    /// A filesystem path does not sit under the expected root.
    #[error("'{}' is outside of '{}'", .path.display(), .root.display())]
    OutsideRoot {
        /// The path that was decoded.
        path: PathBuf,
        /// The root it should live under.
        root: PathBuf,
    },
}

/// Error type for promptshelf operations.
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `InvalidPath` | Dot path or filesystem path fails depth/charset/root checks |
/// | `InvalidTag` | A prompt tag fails validation at save time |
/// | `PathCollision` | A save target exists and is not the file being edited |
/// | `NestedPartialForbidden` | Partial content references another partial |
/// | `EmptyContent` | Partial content is blank |
/// | `NotFound` | Deleting a file that is not on disk |
/// | `InvalidInput` | Bad titles, CLI arguments, or import items |
/// | `InvalidTransfer` | A transfer string cannot be decoded |
/// | `OperationFailed` | I/O, index, or watcher failures |
#[derive(Debug, ThisError)]
pub enum Error {
    /// A hierarchical path was rejected before any I/O happened.
    #[error("invalid path: {0}")]
    InvalidPath(#[from] PathViolation),

    /// A prompt tag was rejected.
    #[error("invalid tag '{tag}': {reason}")]
    InvalidTag {
        /// The tag as supplied.
        tag: String,
        /// Why it was rejected.
        reason: PathViolation,
    },

    /// The save target already exists.
    ///
    /// `editing` is the file currently being edited, if any, so callers can
    /// tell the user which two files clash.
    #[error("'{}' already exists (editing: {})", .target.display(), describe_editing(.editing.as_ref()))]
    PathCollision {
        /// Path the save would have written.
        target: PathBuf,
        /// Path of the file being edited.
        editing: Option<PathBuf>,
    },

    /// Partial content contains a partial reference.
    #[error("partials cannot reference other partials")]
    NestedPartialForbidden,

    /// Partial content is blank after trimming.
    #[error("partial content is empty")]
    EmptyContent,

    /// The file does not exist.
    #[error("not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Invalid input was provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A transfer string could not be decoded.
    #[error("invalid transfer string: {0}")]
    InvalidTransfer(String),

    /// An operation failed.
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },
}

impl Error {
    /// Wraps an I/O style failure with the operation name.
    pub(crate) fn operation(operation: &str, cause: impl std::fmt::Display) -> Self {
        Self::OperationFailed {
            operation: operation.to_string(),
            cause: cause.to_string(),
        }
    }
}

/// Formats the "currently edited" side of a collision.
fn describe_editing(editing: Option<&PathBuf>) -> String {
    editing.map_or_else(|| "new file".to_string(), |p| p.display().to_string())
}

/// Result type alias for promptshelf operations.
pub type Result<T> = std::result::Result<T, Error>;
