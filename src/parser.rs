use tracing::trace;

use crate::cst::{
    BlockCommand, BlockItem, CommandBody, CommandDefinition, CommandText, DecoratedCommand,
    Decorator, DecoratorArgs, DecoratorElement, DecoratorTail, ErrorNode, Line, Program,
    TextElement, VariableDefinition,
};
use crate::diagnostic::{Diagnostic, DiagnosticKind};
use crate::lexer::DEF_KEYWORD;
use crate::token::{Span, Token, TokenKind};

/// Deepest nesting of blocks and argument lists the parser accepts.
pub const MAX_NESTING: usize = 64;

/// Parse a token stream into a concrete syntax tree.
///
/// Parsing never fails: syntax errors are reported as diagnostics and the
/// offending tokens are kept in `ErrorNode`s. A line that fails to parse is
/// skipped up to its terminating newline; a block statement that fails is
/// skipped up to the next `;`, newline, or the block's closing `}`.
#[must_use]
pub fn parse_tokens(tokens: &[Token]) -> (Program, Vec<Diagnostic>) {
    Parser::new(tokens).parse()
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    /// Blocks and argument lists currently open.
    depth: usize,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Parser<'a> {
    const fn new(tokens: &'a [Token]) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
            diagnostics: Vec::new(),
        }
    }

    fn parse(mut self) -> (Program, Vec<Diagnostic>) {
        let mut lines = Vec::new();

        loop {
            match self.peek_kind() {
                TokenKind::Eof => break,
                TokenKind::Newline => lines.push(Line::Blank(self.bump())),
                TokenKind::Comment => lines.push(Line::Comment(self.bump())),
                _ => lines.push(self.parse_line()),
            }
        }

        let eof = self.bump();
        (Program { lines, eof }, self.diagnostics)
    }

    fn parse_line(&mut self) -> Line {
        let start = self.pos;
        let result = if self.peek_kind() == TokenKind::Ident {
            self.parse_definition()
        } else {
            Err(self.unexpected("a variable or command definition"))
        };

        result.unwrap_or_else(|diagnostic| {
            trace!(kind = %diagnostic.kind, line = diagnostic.span.line, "recovering to end of line");
            self.diagnostics.push(diagnostic);
            self.recover_line();
            Line::Error(self.error_node(start))
        })
    }

    fn parse_definition(&mut self) -> Result<Line, Diagnostic> {
        let is_variable = self.peek().is_some_and(|t| t.text == DEF_KEYWORD)
            && self.peek_kind_at(1) == TokenKind::Ident;
        if is_variable {
            self.parse_variable().map(Line::Variable)
        } else {
            self.parse_command().map(Line::Command)
        }
    }

    fn parse_variable(&mut self) -> Result<VariableDefinition, Diagnostic> {
        let keyword = self.bump();
        let name = self.bump();
        let equals = self.expect(TokenKind::Equals, "'=' after variable name")?;
        let value = self.at_text().then(|| self.parse_command_text());
        let end = self.expect_line_end()?;

        let last = value.as_ref().map_or(&equals.span, |v| &v.span);
        let span = keyword.span.to(last);
        Ok(VariableDefinition {
            keyword,
            name,
            equals,
            value,
            end,
            span,
        })
    }

    fn parse_command(&mut self) -> Result<CommandDefinition, Diagnostic> {
        let name = self.bump();
        let equals = self.expect(TokenKind::Equals, "'=' after command name")?;
        if !self.at_body_start() {
            return Err(self.missing("a command body after '='"));
        }
        let body = self.parse_command_body()?;
        let end = self.expect_line_end()?;

        let span = name.span.to(body.span());
        Ok(CommandDefinition {
            name,
            equals,
            body,
            end,
            span,
        })
    }

    fn parse_command_body(&mut self) -> Result<CommandBody, Diagnostic> {
        match self.peek_kind() {
            TokenKind::At => self.parse_decorated().map(CommandBody::Decorated),
            TokenKind::LBrace => self.parse_block().map(CommandBody::Block),
            TokenKind::Chunk | TokenKind::BackslashNewline => {
                Ok(CommandBody::Simple(self.parse_command_text()))
            }
            _ => Err(self.unexpected("a command body")),
        }
    }

    /// Collect consecutive text chunks and continuations. The caller has
    /// checked that at least one is present.
    fn parse_command_text(&mut self) -> CommandText {
        let mut elements = Vec::new();
        loop {
            match self.peek_kind() {
                TokenKind::Chunk => elements.push(TextElement::Chunk(self.bump())),
                TokenKind::BackslashNewline => {
                    elements.push(TextElement::Continuation(self.bump()));
                }
                _ => break,
            }
        }

        let span = match (elements.first(), elements.last()) {
            (Some(first), Some(last)) => element_span(first).to(element_span(last)),
            _ => self.here(),
        };
        CommandText { elements, span }
    }

    /// A decorator chain and the body after its last decorator.
    fn parse_decorated(&mut self) -> Result<DecoratedCommand, Diagnostic> {
        let mut decorators = vec![self.parse_decorator()?];
        while self.peek_kind() == TokenKind::At {
            decorators.push(self.parse_decorator()?);
        }
        let body = if self.at_body_start() {
            Some(Box::new(self.parse_command_body()?))
        } else {
            None
        };

        let first = &decorators[0].span;
        let last = body
            .as_deref()
            .map_or_else(|| &decorators[decorators.len() - 1].span, CommandBody::span);
        let span = first.to(last);
        Ok(DecoratedCommand {
            decorators,
            body,
            span,
        })
    }

    fn parse_decorator(&mut self) -> Result<Decorator, Diagnostic> {
        let at = self.bump();
        let name = (self.peek_kind() == TokenKind::Ident).then(|| self.bump());

        // `@name(` is a function decorator; `@name {` a block decorator.
        let tail = match self.peek_kind() {
            TokenKind::LParen => DecoratorTail::Args(self.parse_decorator_args()?),
            TokenKind::LBrace => DecoratorTail::Block(self.parse_block()?),
            _ => DecoratorTail::None,
        };

        let end = match &tail {
            DecoratorTail::None => name.as_ref().map_or(&at.span, |n| &n.span),
            DecoratorTail::Args(args) => &args.span,
            DecoratorTail::Block(block) => &block.span,
        };
        let span = at.span.to(end);
        Ok(Decorator {
            at,
            name,
            tail,
            span,
        })
    }

    fn parse_decorator_args(&mut self) -> Result<DecoratorArgs, Diagnostic> {
        self.nested(Self::parse_args_contents)
    }

    fn parse_args_contents(&mut self) -> Result<DecoratorArgs, Diagnostic> {
        let open = self.bump();
        let mut elements = Vec::new();

        loop {
            match self.peek_kind() {
                TokenKind::RParen => break,
                TokenKind::Chunk | TokenKind::BackslashNewline => {
                    elements.push(DecoratorElement::Text(self.parse_command_text()));
                }
                TokenKind::At => elements.push(DecoratorElement::Nested(self.parse_decorator()?)),
                _ => return Err(self.missing("')' to close decorator arguments")),
            }
        }

        let close = self.bump();
        let span = open.span.to(&close.span);
        Ok(DecoratorArgs {
            open,
            elements,
            close,
            span,
        })
    }

    fn parse_block(&mut self) -> Result<BlockCommand, Diagnostic> {
        self.nested(Self::parse_block_contents)
    }

    fn parse_block_contents(&mut self) -> Result<BlockCommand, Diagnostic> {
        let open = self.bump();
        let mut items = Vec::new();

        loop {
            match self.peek_kind() {
                TokenKind::RBrace => break,
                TokenKind::Eof => return Err(self.missing("'}' to close block")),
                TokenKind::Semi | TokenKind::Newline => {
                    items.push(BlockItem::Separator(self.bump()));
                }
                _ => {
                    let start = self.pos;
                    match self.parse_statement() {
                        Ok(body) => items.push(BlockItem::Statement(body)),
                        Err(diagnostic) => {
                            trace!(kind = %diagnostic.kind, line = diagnostic.span.line, "recovering inside block");
                            self.diagnostics.push(diagnostic);
                            self.recover_block();
                            if self.pos > start {
                                items.push(BlockItem::Error(self.error_node(start)));
                            }
                        }
                    }
                }
            }
        }

        let close = self.bump();
        let span = open.span.to(&close.span);
        Ok(BlockCommand {
            open,
            items,
            close,
            span,
        })
    }

    fn parse_statement(&mut self) -> Result<CommandBody, Diagnostic> {
        let body = self.parse_command_body()?;
        match self.peek_kind() {
            TokenKind::Semi | TokenKind::Newline | TokenKind::RBrace => Ok(body),
            _ => Err(self.unexpected("';', a line break, or '}' after statement")),
        }
    }

    /// Run `parse` one nesting level deeper, refusing to go past
    /// `MAX_NESTING`. The opening token is left in place on refusal so the
    /// caller's recovery skips the whole nested region.
    fn nested<T>(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<T, Diagnostic>,
    ) -> Result<T, Diagnostic> {
        if self.depth >= MAX_NESTING {
            let message = format!(
                "nesting too deep, found {} past {MAX_NESTING} open blocks and argument lists",
                self.describe_current()
            );
            return Err(Diagnostic::new(
                DiagnosticKind::UnexpectedToken,
                self.here(),
                message,
            ));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    /// Skip to the end of the current top-level line, consuming the newline.
    fn recover_line(&mut self) {
        let mut depth = 0usize;
        loop {
            match self.peek_kind() {
                TokenKind::Eof => break,
                TokenKind::Newline if depth == 0 => {
                    self.bump();
                    break;
                }
                TokenKind::LBrace | TokenKind::LParen => depth += 1,
                TokenKind::RBrace | TokenKind::RParen => depth = depth.saturating_sub(1),
                _ => {}
            }
            self.bump();
        }
    }

    /// Skip to the next statement separator or the `}` closing this block,
    /// leaving it for the block loop.
    fn recover_block(&mut self) {
        let mut depth = 0usize;
        loop {
            match self.peek_kind() {
                TokenKind::Eof => break,
                TokenKind::Semi | TokenKind::Newline | TokenKind::RBrace if depth == 0 => break,
                TokenKind::LBrace | TokenKind::LParen => depth += 1,
                TokenKind::RBrace | TokenKind::RParen => depth = depth.saturating_sub(1),
                _ => {}
            }
            self.bump();
        }
    }

    fn error_node(&self, start: usize) -> ErrorNode {
        let tokens = self.tokens[start..self.pos].to_vec();
        let span = match (tokens.first(), tokens.last()) {
            (Some(first), Some(last)) => first.span.to(&last.span),
            _ => self.here(),
        };
        ErrorNode { tokens, span }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<Token, Diagnostic> {
        if self.peek_kind() == kind {
            Ok(self.bump())
        } else {
            Err(self.missing(what))
        }
    }

    /// A definition ends at a newline or at end of input.
    fn expect_line_end(&mut self) -> Result<Option<Token>, Diagnostic> {
        match self.peek_kind() {
            TokenKind::Newline => Ok(Some(self.bump())),
            TokenKind::Eof => Ok(None),
            _ => Err(self.unexpected("end of line")),
        }
    }

    fn at_text(&self) -> bool {
        matches!(
            self.peek_kind(),
            TokenKind::Chunk | TokenKind::BackslashNewline
        )
    }

    fn at_body_start(&self) -> bool {
        matches!(
            self.peek_kind(),
            TokenKind::At | TokenKind::LBrace | TokenKind::Chunk | TokenKind::BackslashNewline
        )
    }

    fn unexpected(&self, expected: &str) -> Diagnostic {
        Diagnostic::new(
            DiagnosticKind::UnexpectedToken,
            self.here(),
            format!("expected {expected}, found {}", self.describe_current()),
        )
    }

    fn missing(&self, expected: &str) -> Diagnostic {
        Diagnostic::new(
            DiagnosticKind::MissingToken,
            self.here(),
            format!("expected {expected}, found {}", self.describe_current()),
        )
    }

    fn describe_current(&self) -> String {
        match self.peek() {
            Some(token) if matches!(token.kind, TokenKind::Ident | TokenKind::Chunk) => {
                format!("{} '{}'", token.kind, token.text)
            }
            Some(token) => token.kind.to_string(),
            None => TokenKind::Eof.to_string(),
        }
    }

    fn here(&self) -> Span {
        self.peek().map_or_else(
            || self.tokens.last().map(|t| t.span.clone()).unwrap_or_default(),
            |t| t.span.clone(),
        )
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self) -> TokenKind {
        self.peek_kind_at(0)
    }

    fn peek_kind_at(&self, offset: usize) -> TokenKind {
        self.tokens
            .get(self.pos + offset)
            .map_or(TokenKind::Eof, |t| t.kind)
    }

    fn bump(&mut self) -> Token {
        if let Some(token) = self.tokens.get(self.pos) {
            self.pos += 1;
            token.clone()
        } else {
            let span = self.here();
            Token {
                kind: TokenKind::Eof,
                text: String::new(),
                span: Span {
                    start: span.end,
                    ..span
                },
            }
        }
    }
}

const fn element_span(element: &TextElement) -> &Span {
    match element {
        TextElement::Chunk(token) | TextElement::Continuation(token) => &token.span,
    }
}
