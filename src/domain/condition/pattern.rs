//! Lazily compiled, memoized regular expressions

use once_cell::sync::OnceCell;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::domain::ImporterError;

/// Serialized form of a pattern
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct PatternSpec {
    #[serde(default, alias = "regex")]
    pattern: String,
    #[serde(default)]
    case_sensitive: bool,
}

/// A regular expression compiled on first use
///
/// Two forms are memoized independently: the anchored form used for
/// whole-value matching and the unanchored form used for searching.
/// Both are built with dot-matches-newline and multi-line enabled, and
/// with Unicode case folding unless the pattern is case sensitive.
/// Changing the pattern text or the case flag drops the compiled forms.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "PatternSpec", into = "PatternSpec")]
pub struct CachedPattern {
    pattern: String,
    case_sensitive: bool,
    anchored: OnceCell<Result<Regex, ImporterError>>,
    unanchored: OnceCell<Result<Regex, ImporterError>>,
}

impl CachedPattern {
    /// Create a case-insensitive pattern
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            case_sensitive: false,
            anchored: OnceCell::new(),
            unanchored: OnceCell::new(),
        }
    }

    /// Set case sensitivity
    pub fn with_case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.set_case_sensitive(case_sensitive);
        self
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn is_case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    /// Whether no pattern text was configured
    pub fn is_blank(&self) -> bool {
        self.pattern.trim().is_empty()
    }

    pub fn set_pattern(&mut self, pattern: impl Into<String>) {
        self.pattern = pattern.into();
        self.invalidate();
    }

    pub fn set_case_sensitive(&mut self, case_sensitive: bool) {
        if self.case_sensitive != case_sensitive {
            self.case_sensitive = case_sensitive;
            self.invalidate();
        }
    }

    fn invalidate(&mut self) {
        self.anchored = OnceCell::new();
        self.unanchored = OnceCell::new();
    }

    fn build(&self, anchored: bool) -> Result<Regex, ImporterError> {
        let source = if anchored {
            format!(r"\A(?:{})\z", self.pattern)
        } else {
            self.pattern.clone()
        };

        RegexBuilder::new(&source)
            .case_insensitive(!self.case_sensitive)
            .dot_matches_new_line(true)
            .multi_line(true)
            .build()
            .map_err(|e| ImporterError::pattern_compile(&self.pattern, e.to_string()))
    }

    /// Compiled regex matching an entire value
    pub fn anchored(&self) -> Result<&Regex, ImporterError> {
        self.anchored
            .get_or_init(|| self.build(true))
            .as_ref()
            .map_err(Clone::clone)
    }

    /// Compiled regex searching anywhere in a value
    pub fn unanchored(&self) -> Result<&Regex, ImporterError> {
        self.unanchored
            .get_or_init(|| self.build(false))
            .as_ref()
            .map_err(Clone::clone)
    }

    /// Whether the whole value matches
    pub fn is_full_match(&self, value: &str) -> Result<bool, ImporterError> {
        Ok(self.anchored()?.is_match(value))
    }

    /// Compile both forms, surfacing configuration errors early
    pub fn validate(&self) -> Result<(), ImporterError> {
        self.anchored()?;
        self.unanchored()?;
        Ok(())
    }
}

impl PartialEq for CachedPattern {
    fn eq(&self, other: &Self) -> bool {
        self.pattern == other.pattern && self.case_sensitive == other.case_sensitive
    }
}

impl From<PatternSpec> for CachedPattern {
    fn from(spec: PatternSpec) -> Self {
        Self::new(spec.pattern).with_case_sensitive(spec.case_sensitive)
    }
}

impl From<CachedPattern> for PatternSpec {
    fn from(pattern: CachedPattern) -> Self {
        Self {
            pattern: pattern.pattern,
            case_sensitive: pattern.case_sensitive,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_insensitive_match() {
        let pattern = CachedPattern::new("FOO");
        assert!(pattern.is_full_match("foo").unwrap());

        let pattern = CachedPattern::new("FOO").with_case_sensitive(true);
        assert!(!pattern.is_full_match("foo").unwrap());
        assert!(pattern.is_full_match("FOO").unwrap());
    }

    #[test]
    fn test_whole_value_match() {
        let pattern = CachedPattern::new("potato");
        assert!(!pattern.is_full_match("potato salad").unwrap());
        assert!(pattern.unanchored().unwrap().is_match("potato salad"));

        let pattern = CachedPattern::new("a|ab");
        assert!(pattern.is_full_match("ab").unwrap());
    }

    #[test]
    fn test_dot_matches_newline() {
        let pattern = CachedPattern::new(".*potato.*");
        assert!(pattern.is_full_match("first line\nsecond potato line").unwrap());
    }

    #[test]
    fn test_unicode_case_folding() {
        let pattern = CachedPattern::new("ÉCOLE");
        assert!(pattern.is_full_match("école").unwrap());
    }

    #[test]
    fn test_changes_invalidate_compiled_forms() {
        let mut pattern = CachedPattern::new("foo");
        assert!(pattern.is_full_match("FOO").unwrap());

        pattern.set_case_sensitive(true);
        assert!(!pattern.is_full_match("FOO").unwrap());

        pattern.set_pattern("FOO");
        assert!(pattern.is_full_match("FOO").unwrap());
    }

    #[test]
    fn test_invalid_pattern() {
        let pattern = CachedPattern::new("(unclosed");
        let err = pattern.is_full_match("x").unwrap_err();
        assert_eq!(err.kind(), "pattern_compile");
        assert!(pattern.validate().is_err());
    }

    #[test]
    fn test_concurrent_readers_share_compiled_form() {
        let pattern = std::sync::Arc::new(CachedPattern::new("[a-z]+"));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let pattern = pattern.clone();
                std::thread::spawn(move || pattern.is_full_match("abc").unwrap())
            })
            .collect();

        for handle in handles {
            assert!(handle.join().unwrap());
        }
    }

    #[test]
    fn test_deserialize_with_regex_alias() {
        let pattern: CachedPattern =
            serde_json::from_value(serde_json::json!({"regex": "a.c", "case_sensitive": true}))
                .unwrap();
        assert_eq!(pattern.pattern(), "a.c");
        assert!(pattern.is_case_sensitive());
    }
}
