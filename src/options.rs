//! Parse configuration.

use crate::lexer::DEF_KEYWORD;

/// How a `\`-newline continuation appears in lowered command text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ContinuationPolicy {
    /// Each continuation, together with the blanks before it, becomes a
    /// single space. Leading blanks of the continued line are kept.
    #[default]
    Collapse,
    /// Text is the verbatim source slice, continuations included.
    Preserve,
}

/// Options for [`parse_with`](crate::parse_with).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOptions {
    pub continuation: ContinuationPolicy,
    /// Names that may not be used for variables or commands.
    pub reserved_names: Vec<String>,
}

impl ParseOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn continuation(mut self, policy: ContinuationPolicy) -> Self {
        self.continuation = policy;
        self
    }

    /// Add a reserved name.
    #[must_use]
    pub fn reserve(mut self, name: impl Into<String>) -> Self {
        self.reserved_names.push(name.into());
        self
    }

    #[must_use]
    pub fn is_reserved(&self, name: &str) -> bool {
        self.reserved_names.iter().any(|r| r == name)
    }
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            continuation: ContinuationPolicy::Collapse,
            reserved_names: vec![DEF_KEYWORD.to_string()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn def_is_reserved_by_default() {
        let options = ParseOptions::default();
        assert!(options.is_reserved("def"));
        assert!(!options.is_reserved("build"));
        assert_eq!(options.continuation, ContinuationPolicy::Collapse);
    }

    #[test]
    fn builder_setters() {
        let options = ParseOptions::new()
            .continuation(ContinuationPolicy::Preserve)
            .reserve("parallel");
        assert_eq!(options.continuation, ContinuationPolicy::Preserve);
        assert!(options.is_reserved("parallel"));
        assert!(options.is_reserved("def"));
    }
}
