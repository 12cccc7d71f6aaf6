//! `SQLite` FTS5 search index.

use super::{SearchHit, SearchIndex};
use crate::models::Prompt;
use crate::{Error, Result};
use rusqlite::{Connection, params};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;

/// Helper to acquire mutex lock with poison recovery.
fn acquire_lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::warn!("SQLite mutex was poisoned, recovering");
            metrics::counter!("sqlite_mutex_poison_recovery_total").increment(1);
            poisoned.into_inner()
        },
    }
}

/// Quotes every whitespace-separated term and ORs them together.
///
/// FTS5 special characters (`-`, `*`, `"`, `:`) lose their meaning inside a
/// quoted phrase, so arbitrary user input is safe.
fn build_fts_query(query: &str) -> String {
    let terms: Vec<_> = query.split_whitespace().collect();
    let estimated_len = terms.iter().map(|t| t.len() + 6).sum::<usize>();
    let mut fts_query = String::with_capacity(estimated_len);
    for (i, term) in terms.iter().enumerate() {
        if i > 0 {
            fts_query.push_str(" OR ");
        }
        fts_query.push('"');
        for c in term.chars() {
            if c == '"' {
                fts_query.push_str("\"\"");
            } else {
                fts_query.push(c);
            }
        }
        fts_query.push('"');
    }
    fts_query
}

/// Maps a raw `bm25()` value onto `0.0..=1.0`.
///
/// FTS5 returns negative values where more negative is a better match.
#[allow(clippy::cast_possible_truncation)]
fn normalize_bm25(raw: f64) -> f32 {
    let positive = -raw;
    let sigmoid = 1.0 / (1.0 + (-0.5 * positive).exp());
    sigmoid.clamp(0.0, 1.0) as f32
}

/// In-process FTS5 index over prompt title, tag and content.
pub struct SqliteSearchIndex {
    conn: Mutex<Connection>,
    db_path: Option<PathBuf>,
}

impl SqliteSearchIndex {
    /// Opens (or creates) an index backed by a database file.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or initialized.
    pub fn new(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        let conn = Connection::open(&db_path).map_err(|e| Error::OperationFailed {
            operation: "open_sqlite".to_string(),
            cause: format!("{}: {e}", db_path.display()),
        })?;

        let index = Self {
            conn: Mutex::new(conn),
            db_path: Some(db_path),
        };
        index.initialize()?;
        Ok(index)
    }

    /// Creates an empty in-memory index.
    ///
    /// # Errors
    ///
    /// Returns an error if the database or FTS table cannot be created.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| Error::OperationFailed {
            operation: "open_sqlite_memory".to_string(),
            cause: e.to_string(),
        })?;

        let index = Self {
            conn: Mutex::new(conn),
            db_path: None,
        };
        index.initialize()?;
        Ok(index)
    }

    /// Returns the database path, `None` for an in-memory index.
    #[must_use]
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    fn initialize(&self) -> Result<()> {
        let conn = acquire_lock(&self.conn);
        // journal_mode returns a row, so the result is ignored.
        let _ = conn.pragma_update(None, "journal_mode", "WAL");
        conn.execute(
            "CREATE VIRTUAL TABLE IF NOT EXISTS prompts_fts USING fts5(
                file_path UNINDEXED,
                title,
                tag,
                content,
                tokenize = 'unicode61'
            )",
            [],
        )
        .map_err(|e| Error::OperationFailed {
            operation: "create_fts_table".to_string(),
            cause: e.to_string(),
        })?;
        Ok(())
    }
}

impl SearchIndex for SqliteSearchIndex {
    fn rebuild(&self, prompts: &[Prompt]) -> Result<()> {
        let start = Instant::now();
        let mut conn = acquire_lock(&self.conn);
        let tx = conn.transaction().map_err(|e| Error::OperationFailed {
            operation: "begin_rebuild".to_string(),
            cause: e.to_string(),
        })?;

        tx.execute("DELETE FROM prompts_fts", [])
            .map_err(|e| Error::OperationFailed {
                operation: "clear_index".to_string(),
                cause: e.to_string(),
            })?;

        {
            let mut stmt = tx
                .prepare(
                    "INSERT INTO prompts_fts (file_path, title, tag, content)
                     VALUES (?1, ?2, ?3, ?4)",
                )
                .map_err(|e| Error::OperationFailed {
                    operation: "prepare_insert".to_string(),
                    cause: e.to_string(),
                })?;

            for prompt in prompts {
                // Tags index better as words than as hyphen runs.
                let tag_words = prompt.tag.replace('-', " ");
                stmt.execute(params![
                    prompt.file_path.to_string_lossy(),
                    prompt.title,
                    tag_words,
                    prompt.content,
                ])
                .map_err(|e| Error::OperationFailed {
                    operation: "index_prompt".to_string(),
                    cause: e.to_string(),
                })?;
            }
        }

        tx.commit().map_err(|e| Error::OperationFailed {
            operation: "commit_rebuild".to_string(),
            cause: e.to_string(),
        })?;

        metrics::histogram!("search_index_rebuild_duration_ms")
            .record(start.elapsed().as_secs_f64() * 1000.0);
        tracing::debug!(count = prompts.len(), "Rebuilt search index");
        Ok(())
    }

    fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>> {
        let fts_query = build_fts_query(query);
        if fts_query.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let conn = acquire_lock(&self.conn);
        let mut stmt = conn
            .prepare(
                "SELECT file_path, bm25(prompts_fts, 0.0, 5.0, 2.0, 1.0) AS score
                 FROM prompts_fts
                 WHERE prompts_fts MATCH ?1
                 ORDER BY score
                 LIMIT ?2",
            )
            .map_err(|e| Error::OperationFailed {
                operation: "prepare_search".to_string(),
                cause: e.to_string(),
            })?;

        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt
            .query_map(params![fts_query, limit], |row| {
                let path: String = row.get(0)?;
                let score: f64 = row.get(1)?;
                Ok((path, score))
            })
            .map_err(|e| Error::OperationFailed {
                operation: "execute_search".to_string(),
                cause: e.to_string(),
            })?;

        let mut hits = Vec::new();
        for row in rows {
            let (path, score) = row.map_err(|e| Error::OperationFailed {
                operation: "read_search_row".to_string(),
                cause: e.to_string(),
            })?;
            hits.push(SearchHit {
                file_path: PathBuf::from(path),
                score: normalize_bm25(score),
            });
        }

        metrics::counter!("search_queries_total").increment(1);
        Ok(hits)
    }

    fn count(&self) -> Result<usize> {
        let conn = acquire_lock(&self.conn);
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM prompts_fts", [], |row| row.get(0))
            .map_err(|e| Error::OperationFailed {
                operation: "count_index".to_string(),
                cause: e.to_string(),
            })?;
        Ok(usize::try_from(count).unwrap_or(0))
    }
}
