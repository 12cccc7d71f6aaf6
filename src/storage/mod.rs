//! Storage layer.
//!
//! The filesystem is authoritative. Each store keeps an in-memory mirror of
//! one tree:
//! - **Prompts**: `<root>/prompts/<tag>/.../<title>.md`, keyed by file path
//! - **Partials**: `<root>/partials/<a>/.../<b>.md`, keyed by dot path
//! - **Index**: optional full-text search over prompts (`SQLite` + FTS5)

// Allow cast precision loss for score calculations where exact precision is not critical.
#![allow(clippy::cast_precision_loss)]
// Allow significant_drop_tightening - dropping database connections slightly early
// provides no meaningful benefit.
#![allow(clippy::significant_drop_tightening)]

pub mod entry_store;
pub mod fs;
pub mod index;
pub mod partial_store;
pub mod path_codec;
pub mod prompt_store;

pub use entry_store::EntryStore;
pub use fs::prune_empty_ancestors;
pub use index::{SearchHit, SearchIndex, SqliteSearchIndex};
pub use partial_store::PartialStore;
pub use prompt_store::PromptStore;

use std::path::PathBuf;

/// Summary of a full directory scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Files parsed and inserted.
    pub loaded: usize,
    /// Files that were read but rejected, in walk order.
    pub skipped: Vec<PathBuf>,
}

impl LoadReport {
    /// Total number of candidate files seen.
    #[must_use]
    pub fn seen(&self) -> usize {
        self.loaded + self.skipped.len()
    }
}
