//! devcmd lexer, parser, semantic lowering, and formatter.
//!
//! Turns a devcmd source file (variables, commands, blocks and decorators)
//! into a validated IR plus an ordered list of diagnostics. Parsing never
//! fails: malformed input yields as much IR as could be recovered.
//!
//! # Quick start
//!
//! ## Parse a source file
//!
//! ```
//! use devcmd::{CommandBody, parse};
//!
//! let input = b"def SRC = ./cmd/...\nbuild = @timeout(5m) go build $SRC\n";
//! let (program, diagnostics) = parse(input);
//! assert!(diagnostics.is_empty());
//!
//! let build = program.find_command("build").unwrap();
//! assert_eq!(build.decorators[0].name.as_str(), "timeout");
//! assert!(matches!(&build.body, Some(CommandBody::Simple(t)) if t.as_str() == "go build $SRC"));
//! ```
//!
//! ## Build and format a program
//!
//! ```
//! use devcmd::{Block, CommandDef, Decorator, Program, format};
//!
//! let program = Program::new()
//!     .variable("PORT", "8080")
//!     .command(CommandDef::new("dev").decorator(Decorator::block(
//!         "parallel",
//!         Block::new().simple("npm run watch").simple("go run ."),
//!     )));
//!
//! let output = format(&program);
//! assert_eq!(output, "def PORT = 8080\ndev = @parallel {\n\tnpm run watch\n\tgo run .\n}\n");
//! ```

// Allow noisy pedantic lints that don't add value for
// a library crate.
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions
)]

pub mod builder;
pub mod cst;
pub mod diagnostic;
pub mod formatter;
pub mod ir;
pub mod lexer;
pub mod lower;
pub mod options;
pub mod parser;
pub mod source;
pub mod token;

use tracing::debug;

pub use diagnostic::{Diagnostic, DiagnosticKind, Diagnostics, NameKind, Severity};
pub use formatter::format;
pub use ir::{
    Block, BlockStatement, CommandBody, CommandDef, DecoratedStatement, Decorator,
    DecoratorElement, DecoratorKind, Identifier, Program, RawText, TopLevelItem, VariableDef,
};
pub use lexer::{Lexer, tokenize};
pub use lower::lower;
pub use options::{ContinuationPolicy, ParseOptions};
pub use parser::{MAX_NESTING, parse_tokens};
pub use source::Source;
pub use token::{Span, Token, TokenKind};

/// First error found by [`parse_str`], by the stage that reported it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// A lexer error.
    #[error("{0}")]
    Lex(Diagnostic),
    /// A parser error.
    #[error("{0}")]
    Parse(Diagnostic),
    /// A semantic error.
    #[error("{0}")]
    Semantic(Diagnostic),
}

impl Error {
    #[must_use]
    pub const fn diagnostic(&self) -> &Diagnostic {
        match self {
            Self::Lex(d) | Self::Parse(d) | Self::Semantic(d) => d,
        }
    }
}

impl From<Diagnostic> for Error {
    fn from(diagnostic: Diagnostic) -> Self {
        match diagnostic.kind.category() {
            "LexError" => Self::Lex(diagnostic),
            "ParseError" => Self::Parse(diagnostic),
            _ => Self::Semantic(diagnostic),
        }
    }
}

/// Parse a devcmd source with default options.
#[must_use]
pub fn parse(input: &[u8]) -> (Program, Diagnostics) {
    parse_with(input, &ParseOptions::default())
}

/// Run all three stages over `input`. Diagnostics are ordered by source
/// offset, and `has_errors` on the program is set when any of them is an
/// error.
#[must_use]
pub fn parse_with(input: &[u8], options: &ParseOptions) -> (Program, Diagnostics) {
    let source = Source::new(input);
    let (tokens, lex_diagnostics) = tokenize(&source);
    let (cst, parse_diagnostics) = parse_tokens(&tokens);
    let (mut program, semantic_diagnostics) = lower(&cst, &source, options);

    let mut diagnostics = Diagnostics::new();
    diagnostics.extend(lex_diagnostics);
    diagnostics.extend(parse_diagnostics);
    diagnostics.extend(semantic_diagnostics);
    diagnostics.sort();
    program.has_errors = diagnostics.has_errors();

    debug!(
        bytes = input.len(),
        tokens = tokens.len(),
        items = program.items.len(),
        diagnostics = diagnostics.len(),
        has_errors = program.has_errors,
        "parsed devcmd source"
    );

    (program, diagnostics)
}

/// Parse a source string, failing on the first error diagnostic.
/// Warnings are discarded.
pub fn parse_str(input: &str) -> Result<Program, Error> {
    let (program, diagnostics) = parse(input.as_bytes());
    match diagnostics.errors().next() {
        Some(first) => Err(first.clone().into()),
        None => Ok(program),
    }
}
