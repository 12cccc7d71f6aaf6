//! Import validation.
//!
//! Checks relative paths carried by transfer items and maps them onto store
//! coordinates (tag and title for prompts, dot path for partials) before
//! anything touches disk.

use crate::models::TransferItem;
use crate::storage::path_codec::{
    DOT_SEPARATOR, FILE_EXTENSION, TAG_SEPARATOR, is_template_file, validate_dot_path,
    validate_tag,
};
use std::path::{Component, Path};

/// Rejects relative paths that could escape the store root.
///
/// # Errors
///
/// Returns a human-readable reason for absolute paths, `..` or `.`
/// components, backslashes, and empty paths.
pub fn validate_relative_path(relative_path: &str) -> Result<(), String> {
    if relative_path.trim().is_empty() {
        return Err("path is empty".to_string());
    }
    if relative_path.contains('\\') {
        return Err("path contains a backslash".to_string());
    }
    let path = Path::new(relative_path);
    if path.is_absolute() || relative_path.starts_with('/') {
        return Err("path is absolute".to_string());
    }
    for component in path.components() {
        match component {
            Component::Normal(_) => {},
            Component::ParentDir => return Err("path contains '..'".to_string()),
            _ => return Err("path contains a non-normal component".to_string()),
        }
    }
    if relative_path.split('/').any(|s| s.is_empty() || s == ".") {
        return Err("path contains an empty segment".to_string());
    }
    Ok(())
}

/// Where an imported item lands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportTarget {
    /// A prompt with its tag and title.
    Prompt {
        /// Hyphen-joined folder chain.
        tag: String,
        /// File stem.
        title: String,
    },
    /// A partial with its dot path.
    Partial {
        /// Dot-joined path.
        dot_path: String,
    },
}

/// Validates an item and derives its store coordinates.
///
/// # Errors
///
/// Returns a reason if the path is unsafe, lacks the template extension, or
/// does not form a valid tag or dot path.
pub fn import_target(item: &TransferItem) -> Result<ImportTarget, String> {
    let relative_path = item.relative_path();
    validate_relative_path(relative_path)?;
    if !is_template_file(Path::new(relative_path)) {
        return Err(format!("expected a .{FILE_EXTENSION} file"));
    }

    let mut segments: Vec<&str> = relative_path.split('/').collect();
    let file_name = segments.pop().unwrap_or_default();
    let stem = Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    if stem.is_empty() {
        return Err("file name is empty".to_string());
    }

    match item {
        TransferItem::Prompt { .. } => {
            let tag = segments.join(&TAG_SEPARATOR.to_string());
            validate_tag(&tag).map_err(|e| format!("invalid tag '{tag}': {e}"))?;
            Ok(ImportTarget::Prompt {
                tag,
                title: stem.to_string(),
            })
        },
        TransferItem::Partial { .. } => {
            segments.push(stem);
            let dot_path = segments.join(&DOT_SEPARATOR.to_string());
            validate_dot_path(&dot_path).map_err(|e| format!("invalid partial path: {e}"))?;
            Ok(ImportTarget::Partial { dot_path })
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("a/b.md", true ; "nested")]
    #[test_case("b.md", true ; "root level")]
    #[test_case("", false ; "empty")]
    #[test_case("/abs.md", false ; "absolute")]
    #[test_case("../up.md", false ; "parent")]
    #[test_case("a/../b.md", false ; "inner parent")]
    #[test_case("./a.md", false ; "current dir")]
    #[test_case("a//b.md", false ; "empty segment")]
    #[test_case("a/./b.md", false ; "inner current dir")]
    #[test_case("a\\b.md", false ; "backslash")]
    fn test_validate_relative_path(path: &str, ok: bool) {
        assert_eq!(validate_relative_path(path).is_ok(), ok, "{path}");
    }

    fn prompt(path: &str) -> TransferItem {
        TransferItem::Prompt {
            relative_path: path.to_string(),
            content: String::new(),
        }
    }

    fn partial(path: &str) -> TransferItem {
        TransferItem::Partial {
            relative_path: path.to_string(),
            content: String::new(),
        }
    }

    #[test]
    fn test_prompt_target() {
        assert_eq!(
            import_target(&prompt("coding/rust/Review.md")).unwrap(),
            ImportTarget::Prompt {
                tag: "coding-rust".to_string(),
                title: "Review".to_string()
            }
        );
        assert_eq!(
            import_target(&prompt("Top.md")).unwrap(),
            ImportTarget::Prompt {
                tag: String::new(),
                title: "Top".to_string()
            }
        );
        assert!(import_target(&prompt("a/b/c/d/e/f/Deep.md")).is_err());
        assert!(import_target(&prompt("a/notes.txt")).is_err());
    }

    #[test]
    fn test_partial_target() {
        assert_eq!(
            import_target(&partial("tones/formal.md")).unwrap(),
            ImportTarget::Partial {
                dot_path: "tones.formal".to_string()
            }
        );
        assert!(import_target(&partial("a/b/c/d/e/f.md")).is_err());
        assert!(import_target(&partial("bad name.md")).is_err());
    }
}
