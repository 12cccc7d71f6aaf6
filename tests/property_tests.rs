//! Property-based tests for path encoding and template handling.
//!
//! Uses proptest to verify invariants across random inputs:
//! - Dot paths and tags survive the trip to the filesystem and back
//! - Parameter extraction returns distinct names present in the text
//! - Resolution leaves reference-free text untouched
//! - Unknown partials never survive resolution as markup
//! - Decoding arbitrary text never panics

// Property tests use expect/unwrap for simplicity - panics are acceptable in tests
#![allow(clippy::expect_used, clippy::unwrap_used)]

use promptshelf::Resolver;
use promptshelf::io::{decode, validate_relative_path};
use promptshelf::models::{extract_parameters, parse_template};
use promptshelf::services::missing_sentinel;
use promptshelf::storage::path_codec::{
    build_folder_path, dot_path_to_file, file_to_dot_path, folder_path_to_tag, validate_dot_path,
    validate_tag,
};
use proptest::prelude::*;
use std::collections::HashMap;
use std::path::Path;

fn segments() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-zA-Z0-9_]{1,8}", 1..=5)
}

proptest! {
    /// Property: a valid dot path maps to a file and back unchanged.
    #[test]
    fn prop_dot_path_roundtrips(parts in segments()) {
        let dot_path = parts.join(".");
        prop_assert!(validate_dot_path(&dot_path).is_ok());

        let root = Path::new("/ws/partials");
        let file = dot_path_to_file(root, &dot_path);
        prop_assert!(file.starts_with(root));
        prop_assert_eq!(file.extension().unwrap(), "md");
        prop_assert_eq!(file_to_dot_path(root, &file).unwrap(), dot_path);
    }

    /// Property: a valid tag maps to a folder and back unchanged.
    #[test]
    fn prop_tag_roundtrips(parts in segments()) {
        let tag = parts.join("-");
        prop_assert!(validate_tag(&tag).is_ok());

        let root = Path::new("/ws/prompts");
        let dir = build_folder_path(root, &tag);
        prop_assert_eq!(dir.components().count(), root.components().count() + parts.len());
        prop_assert_eq!(folder_path_to_tag(root, &dir).unwrap(), tag);
    }

    /// Property: six or more segments are always rejected.
    #[test]
    fn prop_deep_paths_rejected(parts in prop::collection::vec("[a-z]{1,4}", 6..10)) {
        prop_assert!(validate_dot_path(&parts.join(".")).is_err());
        prop_assert!(validate_tag(&parts.join("-")).is_err());
    }

    /// Property: extracted parameters are distinct and appear bracketed.
    #[test]
    fn prop_parameters_distinct_and_present(text in "([A-Z_]{1,5}|\\[[A-Z_]{1,5}\\]| |x){0,30}") {
        let params = extract_parameters(&text);
        let mut sorted = params.clone();
        sorted.sort();
        sorted.dedup();
        prop_assert_eq!(sorted.len(), params.len());
        for name in &params {
            let bracketed = format!("[{name}]");
            prop_assert!(text.contains(&bracketed));
        }
    }

    /// Property: text without braces resolves to itself.
    #[test]
    fn prop_resolution_without_markup_is_identity(text in "[^{}]{0,200}") {
        let partials: HashMap<String, String> = HashMap::new();
        let resolver = Resolver::new(&partials);
        prop_assert_eq!(resolver.resolve_static(&text), text.clone());
        prop_assert!(parse_template(&text).partials.is_empty());
    }

    /// Property: every reference to an unknown partial becomes a sentinel.
    #[test]
    fn prop_missing_partials_become_sentinels(parts in prop::collection::vec(segments(), 1..4)) {
        let paths: Vec<String> = parts.iter().map(|p| p.join(".")).collect();
        let text = paths
            .iter()
            .map(|p| format!("{{{{> {p}}}}}"))
            .collect::<Vec<_>>()
            .join(" | ");

        let partials: HashMap<String, String> = HashMap::new();
        let resolved = Resolver::new(&partials).resolve_static(&text);
        prop_assert!(!resolved.contains("{{>"));
        for path in &paths {
            prop_assert!(resolved.contains(&missing_sentinel(path)));
        }
    }

    /// Property: decoding arbitrary input returns a value or an error.
    #[test]
    fn prop_decode_never_panics(input in ".{0,200}") {
        let _ = decode(&input);
        let prefixed = format!("PROMPTSHELF1:{input}");
        let _ = decode(&prefixed);
    }

    /// Property: any path with a parent segment is unsafe.
    #[test]
    fn prop_parent_segments_rejected(before in segments(), after in segments()) {
        let path = format!("{}/../{}.md", before.join("/"), after.join("/"));
        prop_assert!(validate_relative_path(&path).is_err());
    }
}
