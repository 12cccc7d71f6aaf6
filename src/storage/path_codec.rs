//! Conversions between hierarchical names and filesystem paths.
//!
//! Prompt tags are hyphen-joined (`coding-review`) and map to nested folders
//! under the prompts root. Partial paths are dot-joined (`tones.formal`) and
//! map to nested folders plus a file under the partials root.
//!
//! Everything here is pure: no function touches the filesystem.

use crate::PathViolation;
use std::path::{Component, Path, PathBuf};

/// Maximum number of hierarchy levels for tags and partial paths.
pub const MAX_DEPTH: usize = 5;

/// Separator between tag segments.
pub const TAG_SEPARATOR: char = '-';

/// Separator between partial path segments.
pub const DOT_SEPARATOR: char = '.';

/// Extension of prompt and partial files.
pub const FILE_EXTENSION: &str = "md";

/// Splits a tag into folder segments. The empty tag has no segments.
#[must_use]
pub fn tag_to_folder_segments(tag: &str) -> Vec<String> {
    if tag.is_empty() {
        return Vec::new();
    }
    tag.split(TAG_SEPARATOR).map(ToString::to_string).collect()
}

/// Joins `tag`'s segments onto `prompts_root`.
#[must_use]
pub fn build_folder_path(prompts_root: &Path, tag: &str) -> PathBuf {
    tag_to_folder_segments(tag)
        .iter()
        .fold(prompts_root.to_path_buf(), |acc, segment| acc.join(segment))
}

/// Converts a directory under `prompts_root` back into a tag.
///
/// # Errors
///
/// Returns [`PathViolation::OutsideRoot`] if `dir` is not under `prompts_root`.
pub fn folder_path_to_tag(prompts_root: &Path, dir: &Path) -> Result<String, PathViolation> {
    Ok(relative_segments(prompts_root, dir)?.join(&TAG_SEPARATOR.to_string()))
}

/// Splits a dot path into segments.
#[must_use]
pub fn dot_path_to_file_segments(dot_path: &str) -> Vec<String> {
    dot_path.split(DOT_SEPARATOR).map(ToString::to_string).collect()
}

/// Returns the file a dot path lives in: `root/a/b/c.md` for `a.b.c`.
#[must_use]
pub fn dot_path_to_file(partials_root: &Path, dot_path: &str) -> PathBuf {
    let mut path = dot_path_to_file_segments(dot_path)
        .iter()
        .fold(partials_root.to_path_buf(), |acc, segment| acc.join(segment));
    path.set_extension(FILE_EXTENSION);
    path
}

/// Converts a partial file under `partials_root` into its dot path.
///
/// # Errors
///
/// Returns [`PathViolation::OutsideRoot`] if `file` is not under
/// `partials_root`, [`PathViolation::EmptySegment`] for the root itself, or
/// [`PathViolation::InvalidCharacters`] if a folder or file stem contains a
/// dot (`a.b.md` would otherwise alias `a/b.md`).
pub fn file_to_dot_path(partials_root: &Path, file: &Path) -> Result<String, PathViolation> {
    let segments = relative_segments(partials_root, &file.with_extension(""))?;
    if segments.is_empty() {
        return Err(PathViolation::EmptySegment);
    }
    if let Some(segment) = segments.iter().find(|s| s.contains(DOT_SEPARATOR)) {
        return Err(PathViolation::InvalidCharacters {
            segment: segment.clone(),
        });
    }
    Ok(segments.join(&DOT_SEPARATOR.to_string()))
}

/// Returns `path`'s components below `root` as strings.
fn relative_segments(root: &Path, path: &Path) -> Result<Vec<String>, PathViolation> {
    let relative = path
        .strip_prefix(root)
        .map_err(|_| PathViolation::OutsideRoot {
            path: path.to_path_buf(),
            root: root.to_path_buf(),
        })?;

    relative
        .components()
        .map(|component| match component {
            Component::Normal(segment) => Ok(segment.to_string_lossy().into_owned()),
            _ => Err(PathViolation::OutsideRoot {
                path: path.to_path_buf(),
                root: root.to_path_buf(),
            }),
        })
        .collect()
}

/// Fails if there are more than `max` segments.
///
/// # Errors
///
/// Returns [`PathViolation::PathTooDeep`].
pub fn validate_depth<S: AsRef<str>>(segments: &[S], max: usize) -> Result<(), PathViolation> {
    if segments.len() > max {
        return Err(PathViolation::PathTooDeep {
            depth: segments.len(),
            max,
        });
    }
    Ok(())
}

/// Fails unless `segment` is non-empty and matches `[A-Za-z0-9_-]+`.
///
/// # Errors
///
/// Returns [`PathViolation::EmptySegment`] or
/// [`PathViolation::InvalidCharacters`].
pub fn validate_charset(segment: &str) -> Result<(), PathViolation> {
    if segment.is_empty() {
        return Err(PathViolation::EmptySegment);
    }
    if !segment
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(PathViolation::InvalidCharacters {
            segment: segment.to_string(),
        });
    }
    Ok(())
}

/// Validates a hyphen tag for saving. The empty tag (root) is valid.
///
/// # Errors
///
/// Returns the first depth, empty-segment or charset violation.
pub fn validate_tag(tag: &str) -> Result<(), PathViolation> {
    let segments = tag_to_folder_segments(tag);
    validate_depth(&segments, MAX_DEPTH)?;
    segments.iter().try_for_each(|s| validate_charset(s))
}

/// Validates a dot path for saving.
///
/// # Errors
///
/// Returns [`PathViolation::EmptySegment`], [`PathViolation::PathTooDeep`] or
/// [`PathViolation::InvalidCharacters`], checked in that order.
pub fn validate_dot_path(dot_path: &str) -> Result<(), PathViolation> {
    let segments = dot_path_to_file_segments(dot_path);
    if segments.iter().any(String::is_empty) {
        return Err(PathViolation::EmptySegment);
    }
    validate_depth(&segments, MAX_DEPTH)?;
    segments.iter().try_for_each(|s| validate_charset(s))
}

/// Converts a path under `root` into a `/`-separated relative string.
///
/// # Errors
///
/// Returns [`PathViolation::OutsideRoot`] if `path` is not under `root`.
pub fn to_relative_string(root: &Path, path: &Path) -> Result<String, PathViolation> {
    Ok(relative_segments(root, path)?.join("/"))
}

/// Returns `true` if `path` has the prompt/partial file extension.
#[must_use]
pub fn is_template_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(FILE_EXTENSION))
}
