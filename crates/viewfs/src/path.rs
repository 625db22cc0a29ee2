use std::fmt;

/// A normalized virtual path.
///
/// Virtual paths use `/` as the only separator and never start or end with one. Casing is
/// preserved and comparisons are ordinal.
///
/// Normalization is purely textual: repeated internal separators are kept as empty segments and
/// `.`/`..` segments are passed through untouched. Callers must not rely on this type for
/// traversal prevention.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VirtualPath(String);

impl VirtualPath {
    /// Canonicalizes `raw` into a virtual path.
    ///
    /// Every `\` becomes `/`, then all leading and trailing `/` are stripped.
    pub fn normalize(raw: &str) -> Self {
        let replaced = raw.replace('\\', "/");
        Self(replaced.trim_matches('/').to_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates the `/`-separated segments. Empty internal segments are yielded as `""`.
    ///
    /// The empty path has no segments.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        let text = self.0.as_str();
        (!text.is_empty())
            .then(|| text.split('/'))
            .into_iter()
            .flatten()
    }

    /// Returns whether any segment is exactly `name`.
    pub fn has_segment(&self, name: &str) -> bool {
        self.segments().any(|segment| segment == name)
    }

    /// Ordinal prefix match; returns the text after `prefix`.
    pub fn strip_prefix(&self, prefix: &str) -> Option<&str> {
        self.0.strip_prefix(prefix)
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

/// Shorthand for [`VirtualPath::normalize`].
pub fn normalize(raw: &str) -> VirtualPath {
    VirtualPath::normalize(raw)
}

impl fmt::Display for VirtualPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for VirtualPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for VirtualPath {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for VirtualPath {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    #[test]
    fn strips_leading_and_trailing_separators() {
        assert_eq!(normalize("/a/b/"), normalize("a/b"));
        assert_eq!(normalize("a/b"), "a/b");
        assert_eq!(normalize("///Areas/App///"), "Areas/App");
    }

    #[test]
    fn converts_backslashes() {
        assert_eq!(normalize(r"\Areas\App\Views\Index.cshtml"), "Areas/App/Views/Index.cshtml");
        assert_eq!(normalize(r"Areas\App/"), "Areas/App");
    }

    #[test]
    fn preserves_case_and_internal_empty_segments() {
        let path = normalize("Areas//App/./../Views");
        assert_eq!(path, "Areas//App/./../Views");
        assert_eq!(
            path.segments().collect::<Vec<_>>(),
            vec!["Areas", "", "App", ".", "..", "Views"]
        );
        assert_ne!(normalize("views"), normalize("Views"));
    }

    #[test]
    fn empty_and_separator_only_inputs_are_empty() {
        assert!(normalize("").is_empty());
        assert!(normalize("///").is_empty());
        assert!(normalize(r"\/\").is_empty());
        assert_eq!(normalize("").segments().count(), 0);
    }

    #[test]
    fn segment_match_is_exact() {
        let path = normalize("Areas/App/MyViews/Pageset");
        assert!(!path.has_segment("Views"));
        assert!(!path.has_segment("Pages"));
        assert!(path.has_segment("MyViews"));
    }

    proptest! {
        #[test]
        fn normalize_is_idempotent(raw in r"[a-zA-Z0-9/\\._ -]{0,40}") {
            let once = normalize(&raw);
            let twice = normalize(once.as_str());
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn normalized_paths_have_no_edge_separators(raw in r"[a-z/\\]{0,40}") {
            let path = normalize(&raw);
            prop_assert!(!path.as_str().starts_with('/'));
            prop_assert!(!path.as_str().ends_with('/'));
            prop_assert!(!path.as_str().contains('\\'));
        }
    }
}
