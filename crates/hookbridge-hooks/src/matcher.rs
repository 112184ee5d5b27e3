//! Matcher patterns selecting which event subjects a hook group applies to.
//!
//! An empty pattern or `*` matches everything. Any other pattern is a
//! case-insensitive regular expression that must match the whole subject,
//! so `Edit|Write` matches `Write` but not `Writer`. A pattern that fails to
//! compile degrades to a case-insensitive exact comparison.

use regex::{Regex, RegexBuilder};

use crate::error::MatchError;

/// The wildcard pattern.
pub const MATCH_ALL: &str = "*";

#[derive(Debug, Clone)]
enum MatcherKind {
    Any,
    Regex(Regex),
    Exact(String),
}

/// A compiled matcher pattern.
#[derive(Debug, Clone)]
pub struct HookMatcher {
    pattern: String,
    kind: MatcherKind,
}

impl HookMatcher {
    /// Compile a pattern, degrading to exact matching if it is not a valid regex.
    pub fn new(pattern: &str) -> Self {
        Self::compile(pattern).unwrap_or_else(|e| {
            tracing::warn!(
                pattern = %pattern,
                error = %e.source,
                "invalid matcher regex, falling back to exact match"
            );
            Self {
                pattern: pattern.to_string(),
                kind: MatcherKind::Exact(pattern.to_lowercase()),
            }
        })
    }

    /// Compile a pattern strictly.
    pub fn compile(pattern: &str) -> Result<Self, MatchError> {
        if is_match_all(pattern) {
            return Ok(Self {
                pattern: pattern.to_string(),
                kind: MatcherKind::Any,
            });
        }

        let regex = RegexBuilder::new(&format!("^(?:{})$", pattern))
            .case_insensitive(true)
            .build()
            .map_err(|source| MatchError {
                pattern: pattern.to_string(),
                source,
            })?;

        Ok(Self {
            pattern: pattern.to_string(),
            kind: MatcherKind::Regex(regex),
        })
    }

    /// The original pattern text.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Whether this matcher degraded to exact comparison.
    pub fn is_fallback(&self) -> bool {
        matches!(self.kind, MatcherKind::Exact(_))
    }

    /// Check a subject against the pattern.
    pub fn matches(&self, subject: &str) -> bool {
        match &self.kind {
            MatcherKind::Any => true,
            MatcherKind::Regex(re) => re.is_match(subject),
            MatcherKind::Exact(lower) => subject.to_lowercase() == *lower,
        }
    }
}

/// One-shot check of `subject` against `pattern`.
pub fn matches(subject: &str, pattern: &str) -> bool {
    HookMatcher::new(pattern).matches(subject)
}

fn is_match_all(pattern: &str) -> bool {
    let trimmed = pattern.trim();
    trimmed.is_empty() || trimmed == MATCH_ALL
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wildcards_match_everything() {
        for subject in ["Bash", "", "anything at all", "Écrire"] {
            assert!(matches(subject, "*"));
            assert!(matches(subject, ""));
        }
    }

    #[test]
    fn test_full_match_not_substring() {
        assert!(matches("Write", "Edit|Write"));
        assert!(matches("Edit", "Edit|Write"));
        assert!(!matches("Writer", "Edit|Write"));
        assert!(!matches("ReWrite", "Edit|Write"));
    }

    #[test]
    fn test_case_insensitive() {
        assert!(matches("bash", "Bash"));
        assert!(matches("BASH", "bash"));
        assert!(matches("mcp__github__create_issue", "MCP__.*"));
    }

    #[test]
    fn test_regex_features() {
        assert!(matches("Notebook", "Note.*"));
        assert!(matches("Read", "(Read|Glob|Grep)"));
        assert!(!matches("ReadFile", "(Read|Glob|Grep)"));
    }

    #[test]
    fn test_invalid_regex_falls_back_to_exact() {
        let matcher = HookMatcher::new("Tool[");
        assert!(matcher.is_fallback());
        assert!(matcher.matches("tool["));
        assert!(matcher.matches("Tool["));
        assert!(!matcher.matches("Tool"));
    }

    #[test]
    fn test_compile_reports_error() {
        let err = HookMatcher::compile("(unclosed").unwrap_err();
        assert_eq!(err.pattern, "(unclosed");
        assert!(err.to_string().contains("(unclosed"));
    }

    #[test]
    fn test_pattern_preserved() {
        assert_eq!(HookMatcher::new("Edit|Write").pattern(), "Edit|Write");
        assert_eq!(HookMatcher::new("*").pattern(), "*");
    }
}
