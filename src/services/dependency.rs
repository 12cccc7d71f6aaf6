//! Partial dependency closure for export.

use super::resolver::static_references;
use crate::models::{Partial, Prompt};
use crate::storage::PartialStore;
use std::collections::{HashSet, VecDeque};

/// Partials a prompt depends on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dependencies {
    /// Resolved partials in discovery order.
    pub partials: Vec<Partial>,
    /// Referenced dot paths with no stored partial.
    pub missing: Vec<String>,
}

/// Collects the transitive closure of partials referenced by a prompt.
pub struct DependencyCollector<'a> {
    partials: &'a PartialStore,
}

impl<'a> DependencyCollector<'a> {
    /// Creates a collector over `partials`.
    #[must_use]
    pub const fn new(partials: &'a PartialStore) -> Self {
        Self { partials }
    }

    /// Walks static references breadth-first from the prompt content.
    ///
    /// Partials are flat today, so the walk ends after one level. It still
    /// follows references found in partial content, with a visited set,
    /// should a stored partial ever contain one.
    #[must_use]
    pub fn collect(&self, prompt: &Prompt) -> Dependencies {
        self.collect_from(&prompt.content)
    }

    /// Same as [`collect`](Self::collect) for raw template text.
    #[must_use]
    pub fn collect_from(&self, content: &str) -> Dependencies {
        let mut deps = Dependencies::default();
        let mut visited: HashSet<String> = HashSet::new();
        let mut queue: VecDeque<String> = static_references(content).into();

        while let Some(dot_path) = queue.pop_front() {
            if !visited.insert(dot_path.clone()) {
                continue;
            }
            match self.partials.get(&dot_path) {
                Some(partial) => {
                    queue.extend(static_references(&partial.content));
                    deps.partials.push(partial);
                },
                None => {
                    tracing::warn!(partial = %dot_path, "Referenced partial not found");
                    deps.missing.push(dot_path);
                },
            }
        }

        deps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn store() -> (TempDir, PartialStore) {
        let dir = TempDir::new().unwrap();
        let store = PartialStore::new(dir.path().join("partials"));
        (dir, store)
    }

    #[test]
    fn test_collects_direct_references_once() {
        let (_dir, mut partials) = store();
        partials.save("header", "Hi", None).unwrap();
        partials.save("sig.short", "Bye", None).unwrap();

        let prompt = Prompt::new(
            "/ws/prompts/P.md",
            "",
            "P",
            "{> header} {{> sig.short}} {> header} {{> ghost}} {{> tone.* tone.x}}",
        );
        let deps = DependencyCollector::new(&partials).collect(&prompt);

        let paths: Vec<_> = deps.partials.iter().map(|p| p.path.as_str()).collect();
        assert_eq!(paths, vec!["header", "sig.short"]);
        assert_eq!(deps.missing, vec!["ghost"]);
    }

    #[test]
    fn test_partial_edited_into_nesting_is_reported_missing() {
        let (_dir, mut partials) = store();
        partials.save("a", "plain", None).unwrap();
        partials.save("b", "plain", None).unwrap();

        fs::write(partials.root().join("a.md"), "x {> b} {> a}").unwrap();
        partials.load_all().unwrap();

        let deps = DependencyCollector::new(&partials).collect_from("{> a} {> b}");
        let paths: Vec<_> = deps.partials.iter().map(|p| p.path.as_str()).collect();
        assert_eq!(paths, vec!["b"]);
        assert_eq!(deps.missing, vec!["a"]);
    }

    #[test]
    fn test_no_references() {
        let (_dir, partials) = store();
        let deps = DependencyCollector::new(&partials).collect_from("just text [NAME]");
        assert_eq!(deps, Dependencies::default());
    }
}
