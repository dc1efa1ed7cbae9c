use std::collections::VecDeque;

use crate::diagnostic::{Diagnostic, DiagnosticKind};
use crate::source::Source;
use crate::token::{Span, Token, TokenKind};

/// Contextual keyword that turns a definition into a variable.
pub const DEF_KEYWORD: &str = "def";

/// Tokenize a devcmd source into a token stream ending in `Eof`.
///
/// Lexing never fails. Problems are returned as diagnostics next to the
/// tokens, and unterminated blocks or argument lists are closed with
/// synthetic tokens so the parser always sees balanced input.
#[must_use]
pub fn tokenize(source: &Source<'_>) -> (Vec<Token>, Vec<Diagnostic>) {
    let mut lexer = Lexer::new(source);
    let tokens = lexer.by_ref().collect();
    (tokens, lexer.into_diagnostics())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Structural tokens between definitions.
    Default,
    /// Right-hand side of a definition, up to the end of the logical line.
    /// `raw` lines (variable values) never recognise structure.
    Line { at_start: bool, raw: bool },
    /// Inside `{ ... }`.
    Block { open: Mark, at_start: bool },
    /// Inside decorator `( ... )`. `after_name` is set right after a nested
    /// decorator name, where a `{` opens that decorator's block.
    Args {
        open: Mark,
        at_start: bool,
        after_name: bool,
    },
}

/// A byte offset with its 1-based line and column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Mark {
    offset: usize,
    line: usize,
    column: usize,
}

impl Mark {
    const fn span(self, len: usize) -> Span {
        Span {
            start: self.offset,
            end: self.offset + len,
            line: self.line,
            column: self.column,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextContext {
    Line,
    Block,
    Args,
}

/// How far a top-level line has matched `def NAME`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineHead {
    Start,
    Def,
    DefName,
    Other,
}

/// Lazy, mode-switching tokenizer.
pub struct Lexer<'a> {
    source: &'a Source<'a>,
    input: &'a [u8],
    pos: usize,
    modes: Vec<Mode>,
    head: LineHead,
    pending: VecDeque<Token>,
    diagnostics: Vec<Diagnostic>,
    /// Last located position; columns are counted on from here.
    mark: Mark,
    done: bool,
}

impl<'a> Lexer<'a> {
    #[must_use]
    pub fn new(source: &'a Source<'a>) -> Self {
        Self {
            source,
            input: source.bytes(),
            pos: source.start(),
            modes: vec![Mode::Default],
            head: LineHead::Start,
            pending: VecDeque::new(),
            diagnostics: Vec::new(),
            mark: Mark {
                offset: source.start(),
                line: 1,
                column: 1,
            },
            done: false,
        }
    }

    /// Diagnostics reported so far.
    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    #[must_use]
    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    fn step(&mut self) {
        if self.pos >= self.input.len() {
            self.finish();
            return;
        }
        match self.modes.last().copied().unwrap_or(Mode::Default) {
            Mode::Default => self.lex_default(),
            Mode::Line { at_start, raw } => self.lex_line(at_start, raw),
            Mode::Block { at_start, .. } => self.lex_block(at_start),
            Mode::Args {
                open,
                at_start,
                after_name,
            } => self.lex_args(open, at_start, after_name),
        }
    }

    fn finish(&mut self) {
        let end = self.input.len();
        while let Some(mode) = self.modes.pop() {
            match mode {
                Mode::Block { open, .. } => {
                    self.diagnostics.push(Diagnostic::new(
                        DiagnosticKind::UnterminatedBlock,
                        open.span(1),
                        "unterminated block, expected '}' before end of file",
                    ));
                    self.push(TokenKind::RBrace, end, end);
                }
                Mode::Args { open, .. } => {
                    self.diagnostics.push(Diagnostic::new(
                        DiagnosticKind::UnterminatedArguments,
                        open.span(1),
                        "unterminated decorator arguments, expected ')'",
                    ));
                    self.push(TokenKind::RParen, end, end);
                }
                Mode::Line { .. } | Mode::Default => {}
            }
        }
        self.push(TokenKind::Eof, end, end);
        self.done = true;
    }

    fn lex_default(&mut self) {
        if let Some(len) = self.newline_len(self.pos) {
            self.push(TokenKind::Newline, self.pos, self.pos + len);
            self.pos += len;
            self.head = LineHead::Start;
            return;
        }
        if let Some(len) = self.continuation_len(self.pos) {
            // joins two physical lines, nothing to emit between tokens
            self.pos += len;
            return;
        }

        let ch = self.input[self.pos];
        match ch {
            b' ' | b'\t' | b'\r' => self.pos += 1,
            b'#' => self.read_comment(),
            b'=' => {
                let raw = self.head == LineHead::DefName;
                self.single(TokenKind::Equals);
                self.modes.push(Mode::Line {
                    at_start: true,
                    raw,
                });
            }
            b'{' => self.open_block(),
            b'(' => self.open_args(),
            b'}' => self.single(TokenKind::RBrace),
            b')' => self.single(TokenKind::RParen),
            b';' => self.single(TokenKind::Semi),
            b'@' => self.single(TokenKind::At),
            _ if is_ident_start(ch) => {
                let start = self.pos;
                self.eat_ident();
                self.push(TokenKind::Ident, start, self.pos);
                self.head = match self.head {
                    LineHead::Start if &self.input[start..self.pos] == DEF_KEYWORD.as_bytes() => {
                        LineHead::Def
                    }
                    LineHead::Def => LineHead::DefName,
                    _ => LineHead::Other,
                };
                return;
            }
            _ => self.read_unexpected(),
        }
        if !matches!(ch, b' ' | b'\t' | b'\r' | b'#') {
            self.head = LineHead::Other;
        }
    }

    fn lex_line(&mut self, at_start: bool, raw: bool) {
        if let Some(len) = self.newline_len(self.pos) {
            self.push(TokenKind::Newline, self.pos, self.pos + len);
            self.pos += len;
            self.modes.pop();
            self.head = LineHead::Start;
            return;
        }
        if let Some(len) = self.continuation_len(self.pos) {
            if !at_start {
                self.push(TokenKind::BackslashNewline, self.pos, self.pos + len);
            }
            self.pos += len;
            return;
        }

        let ch = self.input[self.pos];
        if at_start {
            match ch {
                b' ' | b'\t' | b'\r' => {
                    self.pos += 1;
                    return;
                }
                b'@' if !raw => {
                    self.lex_decorator_head();
                    return;
                }
                b'{' if !raw => {
                    self.open_block();
                    return;
                }
                _ => {}
            }
        }
        self.read_chunk(TextContext::Line);
        self.set_at_start(false);
    }

    fn lex_block(&mut self, at_start: bool) {
        if let Some(len) = self.newline_len(self.pos) {
            self.push(TokenKind::Newline, self.pos, self.pos + len);
            self.pos += len;
            self.set_at_start(true);
            return;
        }
        if let Some(len) = self.continuation_len(self.pos) {
            if !at_start {
                self.push(TokenKind::BackslashNewline, self.pos, self.pos + len);
            }
            self.pos += len;
            return;
        }

        match self.input[self.pos] {
            b' ' | b'\t' | b'\r' if at_start => self.pos += 1,
            b';' => {
                self.single(TokenKind::Semi);
                self.set_at_start(true);
            }
            b'}' => {
                self.single(TokenKind::RBrace);
                self.modes.pop();
            }
            b'@' if at_start => self.lex_decorator_head(),
            b'{' if at_start => self.open_block(),
            _ => {
                self.read_chunk(TextContext::Block);
                self.set_at_start(false);
            }
        }
    }

    fn lex_args(&mut self, open: Mark, at_start: bool, after_name: bool) {
        if self.newline_len(self.pos).is_some() {
            // arguments never span lines; close them here and let the
            // enclosing mode see the line break
            self.diagnostics.push(Diagnostic::new(
                DiagnosticKind::UnterminatedArguments,
                open.span(1),
                "unterminated decorator arguments, expected ')' before end of line",
            ));
            self.push(TokenKind::RParen, self.pos, self.pos);
            self.modes.pop();
            return;
        }
        if let Some(len) = self.continuation_len(self.pos) {
            if !at_start {
                self.push(TokenKind::BackslashNewline, self.pos, self.pos + len);
            }
            self.pos += len;
            return;
        }

        match self.input[self.pos] {
            b' ' | b'\t' | b'\r' if at_start => self.pos += 1,
            b')' => {
                self.single(TokenKind::RParen);
                self.modes.pop();
            }
            b'{' if after_name => self.open_block(),
            b'@' if at_start || self.starts_nested_decorator(self.pos) => {
                self.lex_decorator_head();
            }
            _ => {
                self.read_chunk(TextContext::Args);
                self.set_at_start(false);
            }
        }
    }

    /// Lex `@`, the decorator name if present, and an argument list opening
    /// right after the name. The enclosing mode stays at a body start so a
    /// decorated body or block can follow.
    fn lex_decorator_head(&mut self) {
        self.single(TokenKind::At);
        if !self.peek().is_some_and(is_ident_start) {
            return;
        }
        let start = self.pos;
        self.eat_ident();
        self.push(TokenKind::Ident, start, self.pos);

        let has_args = self.peek() == Some(b'(');
        if let Some(Mode::Args {
            at_start,
            after_name,
            ..
        }) = self.modes.last_mut()
        {
            *at_start = true;
            *after_name = !has_args;
        }
        if has_args {
            self.open_args();
        }
    }

    fn open_block(&mut self) {
        let open = self.locate(self.pos);
        self.single(TokenKind::LBrace);
        self.set_at_start(false);
        self.modes.push(Mode::Block {
            open,
            at_start: true,
        });
    }

    fn open_args(&mut self) {
        let open = self.locate(self.pos);
        self.single(TokenKind::LParen);
        self.modes.push(Mode::Args {
            open,
            at_start: true,
            after_name: false,
        });
    }

    fn set_at_start(&mut self, value: bool) {
        match self.modes.last_mut() {
            Some(Mode::Line { at_start, .. } | Mode::Block { at_start, .. }) => {
                *at_start = value;
            }
            Some(Mode::Args {
                at_start,
                after_name,
                ..
            }) => {
                *at_start = value;
                *after_name = false;
            }
            Some(Mode::Default) | None => {}
        }
    }

    /// Read a maximal run of command text. Trailing blanks are left out of
    /// the token; a run of blanks alone produces no token.
    fn read_chunk(&mut self, context: TextContext) {
        let start = self.pos;
        let mut depth = 0usize;

        while self.pos < self.input.len() {
            if self.newline_len(self.pos).is_some() || self.continuation_len(self.pos).is_some() {
                break;
            }
            let ch = self.input[self.pos];
            match ch {
                b'\'' | b'"' => {
                    self.skip_quoted(ch);
                    continue;
                }
                b'\\' => {
                    self.pos = (self.pos + 2).min(self.input.len());
                    continue;
                }
                _ => {}
            }
            match (context, ch) {
                (TextContext::Block, b'{') | (TextContext::Args, b'(') => depth += 1,
                (TextContext::Block, b'}' | b';') | (TextContext::Args, b')') if depth == 0 => {
                    break;
                }
                (TextContext::Block, b'}') | (TextContext::Args, b')') => depth -= 1,
                (TextContext::Args, b'@')
                    if self.pos > start && self.starts_nested_decorator(self.pos) =>
                {
                    break;
                }
                _ => {}
            }
            self.pos += 1;
        }

        let mut end = self.pos;
        while end > start && matches!(self.input[end - 1], b' ' | b'\t' | b'\r') {
            end -= 1;
        }
        if end > start {
            self.push(TokenKind::Chunk, start, end);
        }
    }

    /// Skip a quoted region. Quotes never run past the end of a line.
    fn skip_quoted(&mut self, quote: u8) {
        self.pos += 1;
        while self.pos < self.input.len() {
            if self.newline_len(self.pos).is_some() || self.continuation_len(self.pos).is_some() {
                return;
            }
            match self.input[self.pos] {
                b'\\' if quote == b'"' => {
                    self.pos = (self.pos + 2).min(self.input.len());
                }
                c if c == quote => {
                    self.pos += 1;
                    return;
                }
                _ => self.pos += 1,
            }
        }
    }

    fn read_comment(&mut self) {
        let start = self.pos;
        while self.pos < self.input.len() && self.newline_len(self.pos).is_none() {
            self.pos += 1;
        }
        self.push(TokenKind::Comment, start, self.pos);
    }

    /// Consume a run of bytes no structural rule accepts and report it once.
    fn read_unexpected(&mut self) {
        let start = self.pos;
        self.pos += 1;
        while let Some(b) = self.peek() {
            if b.is_ascii_whitespace() || b"={}();@#\\".contains(&b) || is_ident_start(b) {
                break;
            }
            self.pos += 1;
        }
        self.push(TokenKind::Unknown, start, self.pos);
        let ch = String::from_utf8_lossy(&self.input[start..self.pos])
            .chars()
            .next()
            .unwrap_or(char::REPLACEMENT_CHARACTER);
        self.report(
            DiagnosticKind::UnexpectedChar,
            start,
            self.pos,
            format!("unexpected character: {ch}"),
        );
    }

    fn eat_ident(&mut self) {
        while self.peek().is_some_and(is_ident_continue) {
            self.pos += 1;
        }
    }

    /// Whether the `@` at `at` opens a nested decorator in the middle of an
    /// argument list: it must follow a blank or comma and precede a name.
    fn starts_nested_decorator(&self, at: usize) -> bool {
        at > 0
            && self.input[at] == b'@'
            && matches!(self.input[at - 1], b' ' | b'\t' | b',')
            && self.input.get(at + 1).copied().is_some_and(is_ident_start)
    }

    fn newline_len(&self, at: usize) -> Option<usize> {
        match self.input.get(at..)? {
            [b'\n', ..] => Some(1),
            [b'\r', b'\n', ..] => Some(2),
            _ => None,
        }
    }

    fn continuation_len(&self, at: usize) -> Option<usize> {
        match self.input.get(at..)? {
            [b'\\', b'\n', ..] => Some(2),
            [b'\\', b'\r', b'\n', ..] => Some(3),
            _ => None,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn single(&mut self, kind: TokenKind) {
        self.push(kind, self.pos, self.pos + 1);
        self.pos += 1;
    }

    fn push(&mut self, kind: TokenKind, start: usize, end: usize) {
        let text = String::from_utf8_lossy(&self.input[start..end]).into_owned();
        let span = self.locate(start).span(end - start);
        self.pending.push_back(Token { kind, text, span });
    }

    fn report(
        &mut self,
        kind: DiagnosticKind,
        start: usize,
        end: usize,
        message: impl Into<String>,
    ) {
        let span = self.locate(start).span(end - start);
        self.diagnostics.push(Diagnostic::new(kind, span, message));
    }

    /// Line and column of `offset`. Positions on the line of the previous
    /// one are counted on from it, so a long line is scanned once.
    fn locate(&mut self, offset: usize) -> Mark {
        let mark = self.mark;
        let located = match self.input.get(mark.offset..offset) {
            Some(between) if !between.contains(&b'\n') => Mark {
                offset,
                line: mark.line,
                column: mark.column + between.iter().filter(|b| (**b & 0xC0) != 0x80).count(),
            },
            _ => {
                let (line, column) = self.source.line_col(offset);
                Mark {
                    offset,
                    line,
                    column,
                }
            }
        };
        self.mark = located;
        located
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        loop {
            if let Some(token) = self.pending.pop_front() {
                return Some(token);
            }
            if self.done {
                return None;
            }
            self.step();
        }
    }
}

const fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

const fn is_ident_continue(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'-'
}
