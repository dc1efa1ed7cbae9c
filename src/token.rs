use std::fmt;

use serde::Serialize;

/// Half-open byte range `[start, end)` into the source buffer, plus the
/// 1-based line and column of `start` for error reporting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Span {
    #[serde(rename = "startByte")]
    pub start: usize,
    #[serde(rename = "endByte")]
    pub end: usize,
    #[serde(rename = "startLine")]
    pub line: usize,
    #[serde(rename = "startCol")]
    pub column: usize,
}

impl Span {
    /// Span running from the start of `self` to the end of `other`.
    #[must_use]
    pub fn to(&self, other: &Self) -> Self {
        Self {
            start: self.start,
            end: other.end.max(self.end),
            line: self.line,
            column: self.column,
        }
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.end - self.start
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Whether `other` lies entirely within `self`.
    #[must_use]
    pub const fn contains(&self, other: &Self) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

/// Token kinds produced by the lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// Identifier `[A-Za-z_][A-Za-z0-9_-]*`.
    Ident,
    /// `=`.
    Equals,
    /// `;` separating block statements.
    Semi,
    /// `{`.
    LBrace,
    /// `}`.
    RBrace,
    /// `@` introducing a decorator.
    At,
    /// `(` opening decorator arguments.
    LParen,
    /// `)` closing decorator arguments.
    RParen,
    /// `\` directly followed by a line break.
    BackslashNewline,
    /// Line break.
    Newline,
    /// Opaque run of command text.
    Chunk,
    /// Comment (`# ...`).
    Comment,
    /// Characters that match no rule in structural mode.
    Unknown,
    /// End of input.
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Ident => "identifier",
            Self::Equals => "'='",
            Self::Semi => "';'",
            Self::LBrace => "'{'",
            Self::RBrace => "'}'",
            Self::At => "'@'",
            Self::LParen => "'('",
            Self::RParen => "')'",
            Self::BackslashNewline => "line continuation",
            Self::Newline => "end of line",
            Self::Chunk => "command text",
            Self::Comment => "comment",
            Self::Unknown => "unrecognised input",
            Self::Eof => "end of file",
        };
        f.write_str(text)
    }
}

/// A single token with its kind, text, and source location.
///
/// Tokens synthesised by error recovery (a virtual `}` or `)` at the point
/// the lexer gave up) have empty text and an empty span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub span: Span,
}

impl Token {
    #[must_use]
    pub const fn is_synthetic(&self) -> bool {
        self.span.is_empty() && !matches!(self.kind, TokenKind::Eof)
    }
}
