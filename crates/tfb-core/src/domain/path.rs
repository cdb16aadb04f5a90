//! Path patterns selecting fields for encryption.
//!
//! Patterns are regular expressions matched against the synthetic path
//! string the tree walker builds: root-level field `x` is `.x`, nested
//! `a.b` is `.a.b`, array element 2 of field `tags` is `.tags[2]`.

use regex::Regex;

/// A compiled pattern over synthetic field paths.
#[derive(Debug, Clone)]
pub struct CryptoPath {
    pattern: Regex,
}

impl CryptoPath {
    /// Compile a single pattern.
    pub fn compile(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
        })
    }

    /// Compile a configured pattern list, preserving order. Patterns are
    /// tested in order during the encrypt pass and the first match wins.
    pub fn compile_all<I, S>(patterns: I) -> Result<Vec<Self>, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        patterns
            .into_iter()
            .map(|p| Self::compile(p.as_ref()))
            .collect()
    }

    /// Whether this pattern selects the field at `path`.
    pub fn matches(&self, path: &str) -> bool {
        self.pattern.is_match(path)
    }

    /// The original pattern text.
    pub fn as_str(&self) -> &str {
        self.pattern.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_root_level_field() {
        let path = CryptoPath::compile(r"^\.secret_key$").unwrap();
        assert!(path.matches(".secret_key"));
        assert!(!path.matches(".database.secret_key"));
    }

    #[test]
    fn unanchored_pattern_matches_anywhere() {
        let path = CryptoPath::compile("password").unwrap();
        assert!(path.matches(".database.password"));
        assert!(path.matches(".password"));
    }

    #[test]
    fn matches_array_element_path() {
        let path = CryptoPath::compile(r"\.tags\[2\]").unwrap();
        assert!(path.matches(".tags[2]"));
        assert!(!path.matches(".tags[1]"));
    }

    #[test]
    fn compile_all_preserves_order() {
        let paths = CryptoPath::compile_all([r"\.a", r"\.b"]).unwrap();
        assert_eq!(paths.len(), 2);
        assert_eq!(paths[0].as_str(), r"\.a");
        assert_eq!(paths[1].as_str(), r"\.b");
    }

    #[test]
    fn invalid_pattern_is_rejected() {
        assert!(CryptoPath::compile("[unclosed").is_err());
    }
}
