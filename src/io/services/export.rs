//! Prompt export service.
//!
//! Packs one prompt and the partials it references into a transfer string.

use crate::io::transfer::encode;
use crate::models::{TransferItem, TransferPayload};
use crate::services::Workspace;
use crate::storage::path_codec::to_relative_string;
use crate::{Error, Result};
use std::path::Path;

/// Default `source` label written into payloads.
pub const DEFAULT_EXPORT_SOURCE: &str = "promptshelf";

/// Result of an export operation.
#[derive(Debug, Clone)]
pub struct ExportResult {
    /// The encoded transfer string.
    pub transfer: String,
    /// The payload that was encoded.
    pub payload: TransferPayload,
    /// Referenced partials that were not found and are not included.
    pub missing: Vec<String>,
}

impl ExportResult {
    /// Number of partials packed alongside the prompt.
    #[must_use]
    pub fn partial_count(&self) -> usize {
        self.payload.partials().count()
    }
}

/// Service for exporting prompts from a workspace.
pub struct ExportService<'a> {
    workspace: &'a Workspace,
    source: String,
}

impl<'a> ExportService<'a> {
    /// Creates an export service labelled with [`DEFAULT_EXPORT_SOURCE`].
    #[must_use]
    pub fn new(workspace: &'a Workspace) -> Self {
        Self {
            workspace,
            source: DEFAULT_EXPORT_SOURCE.to_string(),
        }
    }

    /// Sets the `source` label.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// Builds the payload for a stored prompt without encoding it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no prompt is stored for `file_path`.
    pub fn payload_for(&self, file_path: &Path) -> Result<(TransferPayload, Vec<String>)> {
        let prompt = self
            .workspace
            .prompts()
            .get(file_path)
            .ok_or_else(|| Error::NotFound(file_path.to_path_buf()))?;
        let deps = self.workspace.dependencies(file_path)?;

        let mut items = Vec::with_capacity(deps.partials.len() + 1);
        items.push(TransferItem::Prompt {
            relative_path: to_relative_string(self.workspace.prompts().root(), &prompt.file_path)?,
            content: prompt.content,
        });
        for partial in deps.partials {
            items.push(TransferItem::Partial {
                relative_path: to_relative_string(
                    self.workspace.partials().root(),
                    &partial.file_path,
                )?,
                content: partial.content,
            });
        }

        Ok((TransferPayload::new(self.source.clone(), items), deps.missing))
    }

    /// Exports a stored prompt and its partial closure.
    ///
    /// Missing partials are reported in the result, not treated as errors.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown prompt, or an encoding
    /// failure.
    pub fn export_prompt(&self, file_path: &Path) -> Result<ExportResult> {
        let (payload, missing) = self.payload_for(file_path)?;
        let transfer = encode(&payload)?;

        metrics::counter!("prompt_exports_total").increment(1);
        tracing::info!(
            prompt = %file_path.display(),
            partials = payload.items.len() - 1,
            missing = missing.len(),
            "Exported prompt"
        );

        Ok(ExportResult {
            transfer,
            payload,
            missing,
        })
    }
}
