//! Partial resolution.
//!
//! Resolution is a single pass over the template. Partials are flat (see
//! [`PartialStore::validate_content`]), so substituted text never contains
//! markup that would need a second pass.

use crate::models::{PartialReference, parse_template, scan_references, substitute_parameters};
use crate::storage::PartialStore;
use std::collections::HashMap;
use std::hash::BuildHasher;

/// Marker written in place of a reference whose partial does not exist.
#[must_use]
pub fn missing_sentinel(dot_path: &str) -> String {
    format!("<<MISSING PARTIAL: {dot_path}>>")
}

/// Lookup of partial content by dot path.
pub trait PartialSource {
    /// Returns the content stored at `dot_path`.
    fn partial_content(&self, dot_path: &str) -> Option<&str>;
}

impl PartialSource for PartialStore {
    fn partial_content(&self, dot_path: &str) -> Option<&str> {
        self.get_ref(dot_path).map(|p| p.content.as_str())
    }
}

impl<S: BuildHasher> PartialSource for HashMap<String, String, S> {
    fn partial_content(&self, dot_path: &str) -> Option<&str> {
        self.get(dot_path).map(String::as_str)
    }
}

/// Substitutes partial references with partial content.
///
/// Every method is total: missing partials become [`missing_sentinel`]
/// markers instead of errors.
pub struct Resolver<'a, P: PartialSource + ?Sized> {
    partials: &'a P,
}

impl<'a, P: PartialSource + ?Sized> Resolver<'a, P> {
    /// Creates a resolver reading from `partials`.
    #[must_use]
    pub const fn new(partials: &'a P) -> Self {
        Self { partials }
    }

    /// Replaces every static reference. Picker markup is left untouched.
    ///
    /// ```rust
    /// use promptshelf::Resolver;
    /// use std::collections::HashMap;
    ///
    /// let partials = HashMap::from([("header".to_string(), "Hello".to_string())]);
    /// let resolver = Resolver::new(&partials);
    /// assert_eq!(
    ///     resolver.resolve_static("{> header } / {> footer }"),
    ///     "Hello / <<MISSING PARTIAL: footer>>"
    /// );
    /// ```
    #[must_use]
    pub fn resolve_static(&self, content: &str) -> String {
        splice(content, |reference| match reference {
            PartialReference::Static { path, .. } => Some(self.lookup(path)),
            PartialReference::Picker { .. } => None,
        })
    }

    /// Replaces picker markup using the caller's choices.
    ///
    /// `selections` maps a picker folder to the chosen dot path. Without a
    /// selection the picker's default is used; without either the markup is
    /// kept. Static references are left untouched.
    #[must_use]
    pub fn resolve_pickers<S: BuildHasher>(
        &self,
        content: &str,
        selections: &HashMap<String, String, S>,
    ) -> String {
        splice(content, |reference| self.pick(reference, selections))
    }

    /// Resolves static references and pickers in one pass.
    #[must_use]
    pub fn resolve<S: BuildHasher>(
        &self,
        content: &str,
        selections: &HashMap<String, String, S>,
    ) -> String {
        splice(content, |reference| match reference {
            PartialReference::Static { path, .. } => Some(self.lookup(path)),
            PartialReference::Picker { .. } => self.pick(reference, selections),
        })
    }

    fn pick<S: BuildHasher>(
        &self,
        reference: &PartialReference,
        selections: &HashMap<String, String, S>,
    ) -> Option<String> {
        let PartialReference::Picker { picker, .. } = reference else {
            return None;
        };
        selections
            .get(&picker.path)
            .or(picker.default_path.as_ref())
            .map(|chosen| self.lookup(chosen))
    }

    fn lookup(&self, dot_path: &str) -> String {
        self.partials
            .partial_content(dot_path)
            .map_or_else(|| missing_sentinel(dot_path), ToString::to_string)
    }
}

/// Copies `content`, replacing each reference for which `replace` yields text.
fn splice(content: &str, mut replace: impl FnMut(&PartialReference) -> Option<String>) -> String {
    let mut out = String::with_capacity(content.len());
    let mut cursor = 0;
    for reference in scan_references(content) {
        let span = reference.span();
        if let Some(replacement) = replace(&reference) {
            out.push_str(&content[cursor..span.start]);
            out.push_str(&replacement);
            cursor = span.end;
        }
    }
    out.push_str(&content[cursor..]);
    out
}

/// Lists the distinct static references of `content` in source order.
#[must_use]
pub fn static_references(content: &str) -> Vec<String> {
    parse_template(content).partials
}

/// Fills `[NAME]` parameters from `values`; unknown names stay literal.
#[must_use]
pub fn render<S: BuildHasher>(content: &str, values: &HashMap<String, String, S>) -> String {
    substitute_parameters(content, values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::contains_partial_reference;
    use tempfile::TempDir;

    fn partials(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_header_footer() {
        let map = partials(&[("header", "Hello"), ("footer", "Bye")]);
        let resolved = Resolver::new(&map).resolve_static("{> header } Content {> footer }");
        assert_eq!(resolved, "Hello Content Bye");
    }

    #[test]
    fn test_missing_reference_is_flagged() {
        let map = partials(&[]);
        let resolved = Resolver::new(&map).resolve_static("{> missing }");
        assert!(resolved.contains("missing"));
        assert_eq!(resolved, missing_sentinel("missing"));
    }

    #[test]
    fn test_double_brace_and_repeats() {
        let map = partials(&[("sig.short", "-- me")]);
        let resolved = Resolver::new(&map).resolve_static("A {{> sig.short}} B {{>sig.short }}");
        assert_eq!(resolved, "A -- me B -- me");
    }

    #[test]
    fn test_static_resolution_keeps_pickers() {
        let map = partials(&[("tone.calm", "calm")]);
        let text = "{{> tone.* tone.calm}}";
        assert_eq!(Resolver::new(&map).resolve_static(text), text);
    }

    #[test]
    fn test_resolve_pickers() {
        let map = partials(&[("tone.calm", "calm"), ("tone.loud", "LOUD")]);
        let resolver = Resolver::new(&map);
        let text = "[{{> tone.* tone.calm}}] [{{> mood.*}}] {{> header}}";

        let none = HashMap::new();
        assert_eq!(
            resolver.resolve_pickers(text, &none),
            "[calm] [{{> mood.*}}] {{> header}}"
        );

        let chosen = HashMap::from([
            ("tone".to_string(), "tone.loud".to_string()),
            ("mood".to_string(), "mood.gone".to_string()),
        ]);
        assert_eq!(
            resolver.resolve_pickers(text, &chosen),
            "[LOUD] [<<MISSING PARTIAL: mood.gone>>] {{> header}}"
        );
    }

    #[test]
    fn test_resolve_handles_both() {
        let map = partials(&[("h", "H"), ("t.a", "A")]);
        let resolved = Resolver::new(&map).resolve("{> h} {{> t.* t.a}}", &HashMap::new());
        assert_eq!(resolved, "H A");
    }

    #[test]
    fn test_plain_text_unchanged() {
        let map = partials(&[]);
        let text = "no markup { here } [NAME]";
        assert_eq!(Resolver::new(&map).resolve_static(text), text);
    }

    #[test]
    fn test_static_references() {
        let refs = static_references("{> a} {{> b.c}} {> a} {{> d.*}}");
        assert_eq!(refs, vec!["a", "b.c"]);
    }

    #[test]
    fn test_render() {
        let values = HashMap::from([("CODE".to_string(), "fn main() {}".to_string())]);
        assert_eq!(
            render("Review [CODE] in [LANG]", &values),
            "Review fn main() {} in [LANG]"
        );
    }

    #[test]
    fn test_single_pass_relies_on_flat_partials() {
        let dir = TempDir::new().unwrap();
        let mut store = PartialStore::new(dir.path().join("partials"));
        store.save("outer", "outer text", None).unwrap();
        assert!(store.save("inner", "{> outer}", None).is_err());

        let resolved = Resolver::new(&store).resolve_static("{> outer} {> inner}");
        assert!(!contains_partial_reference(&resolved));
        assert_eq!(resolved, "outer text <<MISSING PARTIAL: inner>>");
    }
}
