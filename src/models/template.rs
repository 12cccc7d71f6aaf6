//! Template syntax extraction.
//!
//! Prompt files carry three kinds of inline markup:
//!
//! | Markup | Meaning |
//! |--------|---------|
//! | `[NAME]` | Parameter, `NAME` matches `[A-Z_]+` |
//! | `{{> dotted.path}}` | Static partial reference |
//! | `{{> dotted.folder.* dotted.default}}` | Picker over a folder's direct children |
//!
//! The legacy single-brace form `{> dotted.path}` is accepted wherever the
//! double-brace form is.
//!
//! The grammar has no nesting: partials cannot contain partial references, so
//! every extraction here is a single regex pass.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::hash::BuildHasher;
use std::ops::Range;
use std::sync::LazyLock;

/// Creates a compile-time verified regex wrapped in [`LazyLock`].
macro_rules! lazy_regex {
    ($pattern:expr) => {
        LazyLock::new(|| Regex::new($pattern).unwrap_or_else(|_| unreachable!()))
    };
}

/// Bracket parameters: `[NAME]`.
static PARAMETER_PATTERN: LazyLock<Regex> = lazy_regex!(r"\[([A-Z_]+)\]");

/// Partial references in double-brace (group 1) or legacy single-brace (group 2) form.
static REFERENCE_PATTERN: LazyLock<Regex> =
    lazy_regex!(r"\{\{>\s*([^{}]*?)\s*\}\}|\{>\s*([^{}]*?)\s*\}");

/// Anything that opens a partial reference, used to keep partials flat.
static NESTED_REFERENCE_PATTERN: LazyLock<Regex> =
    lazy_regex!(r"\{\{?>\s*[\w.*-]*(?:\s+[\w.*-]+)*\s*\}");

/// A dynamic partial picker found in a prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialPicker {
    /// Dot path of the folder whose direct children are offered.
    pub path: String,
    /// Partial selected when the caller makes no choice.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_path: Option<String>,
}

impl PartialPicker {
    /// Creates a picker without a default.
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            default_path: None,
        }
    }

    /// Sets the default selection.
    #[must_use]
    pub fn with_default(mut self, default_path: impl Into<String>) -> Self {
        self.default_path = Some(default_path.into());
        self
    }
}

/// One partial reference occurrence, with its byte span in the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartialReference {
    /// `{{> dotted.path}}`.
    Static {
        /// Referenced dot path.
        path: String,
        /// Byte range of the whole markup.
        span: Range<usize>,
    },
    /// `{{> folder.* default}}`.
    Picker {
        /// The picker folder and default.
        picker: PartialPicker,
        /// Byte range of the whole markup.
        span: Range<usize>,
    },
}

impl PartialReference {
    /// Byte range of the markup in the scanned text.
    #[must_use]
    pub fn span(&self) -> Range<usize> {
        match self {
            Self::Static { span, .. } | Self::Picker { span, .. } => span.clone(),
        }
    }
}

/// Everything extracted from one template, each list in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedTemplate {
    /// Distinct parameter names.
    pub parameters: Vec<String>,
    /// Distinct static partial dot paths.
    pub partials: Vec<String>,
    /// One picker per distinct folder.
    pub pickers: Vec<PartialPicker>,
}

/// Parses all template markup out of `content`.
#[must_use]
pub fn parse_template(content: &str) -> ParsedTemplate {
    let mut partials = Vec::new();
    let mut seen_partials = HashSet::new();
    let mut pickers: Vec<PartialPicker> = Vec::new();

    for reference in scan_references(content) {
        match reference {
            PartialReference::Static { path, .. } => {
                if seen_partials.insert(path.clone()) {
                    partials.push(path);
                }
            },
            PartialReference::Picker { picker, .. } => {
                if pickers.iter().all(|p| p.path != picker.path) {
                    pickers.push(picker);
                }
            },
        }
    }

    ParsedTemplate {
        parameters: extract_parameters(content),
        partials,
        pickers,
    }
}

/// Extracts distinct `[NAME]` parameters in order of first appearance.
///
/// ```rust
/// use promptshelf::models::extract_parameters;
///
/// let params = extract_parameters("Hi [NAME], welcome [NAME] to [COMPANY]");
/// assert_eq!(params, vec!["NAME", "COMPANY"]);
/// ```
#[must_use]
pub fn extract_parameters(content: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    PARAMETER_PATTERN
        .captures_iter(content)
        .filter_map(|cap| cap.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|name| seen.insert(name.clone()))
        .collect()
}

/// Replaces `[NAME]` parameters with values from `values`.
///
/// Parameters without a value are left as written.
#[must_use]
pub fn substitute_parameters<S: BuildHasher>(
    content: &str,
    values: &HashMap<String, String, S>,
) -> String {
    PARAMETER_PATTERN
        .replace_all(content, |caps: &regex::Captures| {
            caps.get(1)
                .and_then(|m| values.get(m.as_str()))
                .map_or_else(|| caps[0].to_string(), String::clone)
        })
        .into_owned()
}

/// Lists every partial reference occurrence in source order, duplicates kept.
///
/// Empty markup such as `{{> }}` is skipped.
#[must_use]
pub fn scan_references(content: &str) -> Vec<PartialReference> {
    REFERENCE_PATTERN
        .captures_iter(content)
        .filter_map(|cap| {
            let whole = cap.get(0)?;
            let inner = cap.get(1).or_else(|| cap.get(2))?.as_str();
            classify_reference(inner, whole.range())
        })
        .collect()
}

/// Splits the inside of a reference into reference and default tokens.
fn classify_reference(inner: &str, span: Range<usize>) -> Option<PartialReference> {
    let mut tokens = inner.split_whitespace();
    let reference = tokens.next()?;
    let default = tokens.next();

    if reference.contains('*') {
        let folder = reference
            .strip_suffix(".*")
            .unwrap_or_else(|| reference.trim_end_matches('*').trim_end_matches('.'));
        let mut picker = PartialPicker::new(folder);
        if let Some(default) = default {
            picker = picker.with_default(default);
        }
        Some(PartialReference::Picker { picker, span })
    } else {
        Some(PartialReference::Static {
            path: reference.to_string(),
            span,
        })
    }
}

/// Returns `true` if `content` opens a partial reference in either brace form.
///
/// Used as the save-time and load-time guard that keeps partials flat.
#[must_use]
pub fn contains_partial_reference(content: &str) -> bool {
    NESTED_REFERENCE_PATTERN.is_match(content)
}
