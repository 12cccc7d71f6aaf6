//! Search index over the prompt collection.
//!
//! The stores do not depend on an index. Callers rebuild one from
//! [`PromptStore`](super::PromptStore) contents whenever a watch outcome
//! reports a change.

mod sqlite;

pub use sqlite::SqliteSearchIndex;

use crate::Result;
use crate::models::Prompt;
use std::path::PathBuf;

/// A ranked search result.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    /// File path of the matching prompt.
    pub file_path: PathBuf,
    /// Relevance in `0.0..=1.0`, higher is better.
    pub score: f32,
}

/// Full-text search over prompts.
///
/// Implementations must be thread-safe (`Send + Sync`).
pub trait SearchIndex: Send + Sync {
    /// Replaces the whole index with `prompts`.
    ///
    /// # Errors
    ///
    /// Returns an error if the index cannot be written.
    fn rebuild(&self, prompts: &[Prompt]) -> Result<()>;

    /// Returns up to `limit` hits, best first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>>;

    /// Number of indexed prompts.
    ///
    /// # Errors
    ///
    /// Returns an error if the count cannot be read.
    fn count(&self) -> Result<usize>;
}
