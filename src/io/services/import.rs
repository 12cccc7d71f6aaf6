//! Prompt import service.
//!
//! Writes decoded transfer items back through the stores. Partials go first
//! so the prompt never lands referencing a partial that is not there yet.

use crate::io::transfer::decode;
use crate::io::validation::{ImportTarget, import_target};
use crate::models::{TransferItem, TransferPayload};
use crate::services::Workspace;
use crate::storage::path_codec::dot_path_to_file;
use crate::Result;
use std::path::PathBuf;

/// Options for prompt import.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImportOptions {
    /// Replace files that already exist instead of skipping them.
    pub overwrite: bool,
    /// Validate without writing.
    pub dry_run: bool,
}

impl ImportOptions {
    /// Enables or disables overwriting.
    #[must_use]
    pub const fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Enables or disables dry run mode.
    #[must_use]
    pub const fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

/// Result of an import operation.
#[derive(Debug, Clone, Default)]
pub struct ImportResult {
    /// Files written.
    pub imported: Vec<PathBuf>,
    /// Items left alone because the target exists.
    pub skipped_existing: Vec<String>,
    /// Items rejected, with the reason.
    pub errors: Vec<String>,
    /// File path of the imported prompt, if one was written.
    pub prompt_path: Option<PathBuf>,
}

impl ImportResult {
    /// Returns whether anything was written.
    #[must_use]
    pub fn has_imports(&self) -> bool {
        !self.imported.is_empty()
    }

    /// Returns whether any item was rejected.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Service for importing transfer strings into a workspace.
pub struct ImportService<'a> {
    workspace: &'a mut Workspace,
}

impl<'a> ImportService<'a> {
    /// Creates an import service writing into `workspace`.
    pub const fn new(workspace: &'a mut Workspace) -> Self {
        Self { workspace }
    }

    /// Decodes `transfer` and imports its items.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTransfer`](crate::Error::InvalidTransfer) if
    /// the string cannot be decoded. Per-item failures are collected in
    /// [`ImportResult::errors`] instead.
    pub fn import_str(&mut self, transfer: &str, options: ImportOptions) -> Result<ImportResult> {
        let payload = decode(transfer)?;
        Ok(self.import_payload(&payload, options))
    }

    /// Imports an already decoded payload.
    pub fn import_payload(
        &mut self,
        payload: &TransferPayload,
        options: ImportOptions,
    ) -> ImportResult {
        let mut result = ImportResult::default();

        let (partials, prompts): (Vec<&TransferItem>, Vec<&TransferItem>) = payload
            .items
            .iter()
            .partition(|item| matches!(item, TransferItem::Partial { .. }));

        for item in partials.into_iter().chain(prompts) {
            self.import_item(item, options, &mut result);
        }

        metrics::counter!("prompt_imports_total").increment(1);
        tracing::info!(
            source = %payload.source,
            imported = result.imported.len(),
            skipped = result.skipped_existing.len(),
            errors = result.errors.len(),
            "Imported transfer"
        );
        result
    }

    fn import_item(&mut self, item: &TransferItem, options: ImportOptions, result: &mut ImportResult) {
        let label = format!("{} '{}'", item.kind(), item.relative_path());
        let target = match import_target(item) {
            Ok(target) => target,
            Err(reason) => {
                tracing::warn!(item = %label, %reason, "Rejected import item");
                result.errors.push(format!("{label}: {reason}"));
                return;
            },
        };

        let outcome = match &target {
            ImportTarget::Prompt { tag, title } => {
                let store = self.workspace.prompts_mut();
                let path = store.target_path(tag, title);
                if path.exists() && !options.overwrite {
                    result.skipped_existing.push(label);
                    return;
                }
                if options.dry_run {
                    Ok(path)
                } else {
                    let existing = path.exists().then_some(path.as_path());
                    store.save(tag, title, item.content(), existing)
                }
            },
            ImportTarget::Partial { dot_path } => {
                let store = self.workspace.partials_mut();
                let path = dot_path_to_file(store.root(), dot_path);
                if path.exists() && !options.overwrite {
                    result.skipped_existing.push(label);
                    return;
                }
                if options.dry_run {
                    crate::storage::PartialStore::validate_content(item.content()).map(|()| path)
                } else {
                    let existing = path.exists().then_some(path.as_path());
                    store.save(dot_path, item.content(), existing)
                }
            },
        };

        match outcome {
            Ok(path) => {
                if matches!(target, ImportTarget::Prompt { .. }) {
                    result.prompt_path = Some(path.clone());
                }
                result.imported.push(path);
            },
            Err(e) => {
                tracing::warn!(item = %label, error = %e, "Failed to import item");
                result.errors.push(format!("{label}: {e}"));
            },
        }
    }
}
