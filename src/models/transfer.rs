//! Transfer payload exchanged by export and import.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Current payload version.
pub const TRANSFER_VERSION: u32 = 1;

/// One file carried by a transfer payload.
///
/// `relative_path` is `/`-separated and relative to the prompts root for
/// prompts, to the partials root for partials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TransferItem {
    /// A prompt file.
    Prompt {
        /// Path relative to the prompts root, e.g. `mail/Reply.md`.
        #[serde(rename = "relativePath")]
        relative_path: String,
        /// Raw file text.
        content: String,
    },
    /// A partial file.
    Partial {
        /// Path relative to the partials root, e.g. `tones/formal.md`.
        #[serde(rename = "relativePath")]
        relative_path: String,
        /// Trimmed file text.
        content: String,
    },
}

impl TransferItem {
    /// Returns the relative path.
    #[must_use]
    pub fn relative_path(&self) -> &str {
        match self {
            Self::Prompt { relative_path, .. } | Self::Partial { relative_path, .. } => {
                relative_path
            },
        }
    }

    /// Returns the content.
    #[must_use]
    pub fn content(&self) -> &str {
        match self {
            Self::Prompt { content, .. } | Self::Partial { content, .. } => content,
        }
    }

    /// Returns `"prompt"` or `"partial"`.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Prompt { .. } => "prompt",
            Self::Partial { .. } => "partial",
        }
    }
}

/// Versioned payload: the requested prompt first, then its partial closure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferPayload {
    /// Payload format version.
    pub version: u32,
    /// Label of the exporting workspace or application.
    pub source: String,
    /// RFC 3339 creation time.
    pub timestamp: String,
    /// Prompt followed by partials.
    pub items: Vec<TransferItem>,
}

impl TransferPayload {
    /// Creates a payload stamped with the current time.
    #[must_use]
    pub fn new(source: impl Into<String>, items: Vec<TransferItem>) -> Self {
        Self {
            version: TRANSFER_VERSION,
            source: source.into(),
            timestamp: Utc::now().to_rfc3339(),
            items,
        }
    }

    /// Returns the leading prompt item, if the payload starts with one.
    #[must_use]
    pub fn prompt(&self) -> Option<&TransferItem> {
        self.items
            .first()
            .filter(|item| matches!(item, TransferItem::Prompt { .. }))
    }

    /// Returns the partial items.
    pub fn partials(&self) -> impl Iterator<Item = &TransferItem> {
        self.items
            .iter()
            .filter(|item| matches!(item, TransferItem::Partial { .. }))
    }
}
