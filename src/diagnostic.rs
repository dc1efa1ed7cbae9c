//! Typed diagnostics and the append-only sink that collects them.

use std::fmt;

use serde::{Serialize, Serializer};

use crate::source::Source;
use crate::token::Span;

/// How serious a diagnostic is. Only `Error` marks a program as invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => f.write_str("error"),
            Self::Warning => f.write_str("warning"),
        }
    }
}

/// Which definition table a duplicate name was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NameKind {
    Variable,
    Command,
}

impl fmt::Display for NameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Variable => f.write_str("variable"),
            Self::Command => f.write_str("command"),
        }
    }
}

/// Classifies a diagnostic. Variants are ordered by pipeline stage, which
/// is also the tie-break order when two diagnostics start at the same byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DiagnosticKind {
    /// `{` without a matching `}` before end of input.
    UnterminatedBlock,
    /// Decorator `(` without a matching `)` before the end of its line.
    UnterminatedArguments,
    /// Input that matches no token rule in the current mode.
    UnexpectedChar,
    /// Grammar mismatch at a point the parser can resynchronise from.
    UnexpectedToken,
    /// An expected token is absent, e.g. `=` after a name.
    MissingToken,
    /// Second definition of the same variable or command.
    DuplicateName(NameKind),
    /// Decorator used in a shape its kind does not allow.
    InvalidDecoratorShape,
    /// Definition name is reserved.
    ReservedName,
    /// `@` not followed by an identifier.
    EmptyDecoratorName,
    /// `def NAME =` with nothing after the `=`.
    EmptyVariableValue,
}

impl DiagnosticKind {
    #[must_use]
    pub const fn severity(self) -> Severity {
        match self {
            Self::EmptyVariableValue => Severity::Warning,
            _ => Severity::Error,
        }
    }

    /// Pipeline stage that reports this kind.
    #[must_use]
    pub const fn category(self) -> &'static str {
        match self {
            Self::UnterminatedBlock | Self::UnterminatedArguments | Self::UnexpectedChar => {
                "LexError"
            }
            Self::UnexpectedToken | Self::MissingToken => "ParseError",
            Self::DuplicateName(_)
            | Self::InvalidDecoratorShape
            | Self::ReservedName
            | Self::EmptyDecoratorName
            | Self::EmptyVariableValue => "Semantic",
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::UnterminatedBlock => "UnterminatedBlock",
            Self::UnterminatedArguments => "UnterminatedArguments",
            Self::UnexpectedChar => "UnexpectedChar",
            Self::UnexpectedToken => "UnexpectedToken",
            Self::MissingToken => "MissingToken",
            Self::DuplicateName(_) => "DuplicateName",
            Self::InvalidDecoratorShape => "InvalidDecoratorShape",
            Self::ReservedName => "ReservedName",
            Self::EmptyDecoratorName => "EmptyDecoratorName",
            Self::EmptyVariableValue => "EmptyVariableValue",
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.category(), self.name())
    }
}

impl Serialize for DiagnosticKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A single problem found in a devcmd source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{kind}: {message} at line {}, column {}", span.line, span.column)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub severity: Severity,
    pub span: Span,
    pub message: String,
}

impl Diagnostic {
    #[must_use]
    pub fn new(kind: DiagnosticKind, span: Span, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: kind.severity(),
            span,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// Render the diagnostic with the offending source line and a caret.
    #[must_use]
    pub fn render(&self, source: &Source<'_>) -> String {
        let line_text = source.line_text(self.span.line);
        let width = source.slice(&self.span).chars().count().max(1);
        let underline = "^".repeat(width.min(line_text.chars().count().max(1)));
        format!(
            "{}[{}]:{}:{}: {}\n  {}\n  {}{}",
            self.severity,
            self.kind,
            self.span.line,
            self.span.column,
            self.message,
            line_text,
            " ".repeat(self.span.column.saturating_sub(1)),
            underline
        )
    }
}

/// Append-only, ordered collection of diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.items.push(diagnostic);
    }

    /// Order by start offset, then by kind. The sort is stable, so
    /// diagnostics that tie keep their reporting order.
    pub fn sort(&mut self) {
        self.items.sort_by_key(|d| (d.span.start, d.kind));
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.items.iter().any(Diagnostic::is_error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter().filter(|d| d.is_error())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter().filter(|d| !d.is_error())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.items.iter()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Diagnostic] {
        &self.items
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Whether any diagnostic has the given kind.
    #[must_use]
    pub fn contains(&self, kind: DiagnosticKind) -> bool {
        self.items.iter().any(|d| d.kind == kind)
    }
}

impl Extend<Diagnostic> for Diagnostics {
    fn extend<I: IntoIterator<Item = Diagnostic>>(&mut self, iter: I) {
        self.items.extend(iter);
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(start: usize) -> Span {
        Span {
            start,
            end: start + 1,
            line: 1,
            column: start + 1,
        }
    }

    #[test]
    fn kind_display_includes_category() {
        assert_eq!(
            DiagnosticKind::UnterminatedBlock.to_string(),
            "LexError.UnterminatedBlock"
        );
        assert_eq!(
            DiagnosticKind::MissingToken.to_string(),
            "ParseError.MissingToken"
        );
        assert_eq!(
            DiagnosticKind::DuplicateName(NameKind::Command).to_string(),
            "Semantic.DuplicateName"
        );
    }

    #[test]
    fn only_empty_value_is_a_warning() {
        assert_eq!(
            DiagnosticKind::EmptyVariableValue.severity(),
            Severity::Warning
        );
        assert_eq!(DiagnosticKind::ReservedName.severity(), Severity::Error);
    }

    #[test]
    fn sort_orders_by_offset_then_kind() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.push(Diagnostic::new(
            DiagnosticKind::ReservedName,
            span(4),
            "b",
        ));
        diagnostics.push(Diagnostic::new(
            DiagnosticKind::MissingToken,
            span(4),
            "a",
        ));
        diagnostics.push(Diagnostic::new(
            DiagnosticKind::UnexpectedChar,
            span(0),
            "c",
        ));
        diagnostics.sort();
        let messages: Vec<_> = diagnostics.iter().map(|d| d.message.as_str()).collect();
        assert_eq!(messages, ["c", "a", "b"]);
    }

    #[test]
    fn has_errors_ignores_warnings() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.push(Diagnostic::new(
            DiagnosticKind::EmptyVariableValue,
            span(0),
            "empty",
        ));
        assert!(!diagnostics.has_errors());
        assert_eq!(diagnostics.warnings().count(), 1);
    }

    #[test]
    fn display_includes_location() {
        let diagnostic = Diagnostic::new(DiagnosticKind::MissingToken, span(2), "expected '='");
        assert_eq!(
            diagnostic.to_string(),
            "ParseError.MissingToken: expected '=' at line 1, column 3"
        );
    }

    #[test]
    fn render_points_at_the_span() {
        let source = Source::new(b"build go\n");
        let diagnostic = Diagnostic::new(
            DiagnosticKind::MissingToken,
            source.span(6, 8),
            "expected '='",
        );
        let rendered = diagnostic.render(&source);
        assert!(rendered.starts_with("error[ParseError.MissingToken]:1:7"));
        assert!(rendered.ends_with("  build go\n        ^^"));
    }
}
