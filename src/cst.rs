//! Concrete syntax tree: one node type per grammar production.
//!
//! The tree keeps every token the parser consumed, including separators,
//! comments, and the tokens swallowed by error recovery.

use crate::token::{Span, Token};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    pub lines: Vec<Line>,
    pub eof: Token,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    Variable(VariableDefinition),
    Command(CommandDefinition),
    Comment(Token),
    Blank(Token),
    Error(ErrorNode),
}

impl Line {
    /// Whether this line contains an error node anywhere below it.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        let mut scan = ErrorScan(false);
        scan.visit_line(self);
        scan.0
    }
}

/// `def NAME = value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableDefinition {
    pub keyword: Token,
    pub name: Token,
    pub equals: Token,
    pub value: Option<CommandText>,
    pub end: Option<Token>,
    pub span: Span,
}

/// `NAME = body`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandDefinition {
    pub name: Token,
    pub equals: Token,
    pub body: CommandBody,
    pub end: Option<Token>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandBody {
    Simple(CommandText),
    Block(BlockCommand),
    Decorated(DecoratedCommand),
}

impl CommandBody {
    #[must_use]
    pub const fn span(&self) -> &Span {
        match self {
            Self::Simple(text) => &text.span,
            Self::Block(block) => &block.span,
            Self::Decorated(decorated) => &decorated.span,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandText {
    pub elements: Vec<TextElement>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextElement {
    Chunk(Token),
    Continuation(Token),
}

/// `{ statement; statement }`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockCommand {
    pub open: Token,
    pub items: Vec<BlockItem>,
    pub close: Token,
    pub span: Span,
}

impl BlockCommand {
    pub fn statements(&self) -> impl Iterator<Item = &CommandBody> {
        self.items.iter().filter_map(|item| match item {
            BlockItem::Statement(body) => Some(body),
            BlockItem::Separator(_) | BlockItem::Error(_) => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockItem {
    Statement(CommandBody),
    /// `;` or a line break between statements.
    Separator(Token),
    Error(ErrorNode),
}

/// A chain of one or more decorators followed by the body they decorate,
/// if any. The body never starts with another decorator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoratedCommand {
    pub decorators: Vec<Decorator>,
    pub body: Option<Box<CommandBody>>,
    pub span: Span,
}

/// `@name`, `@name(args)`, or `@name { ... }`. A missing name is kept as
/// `None` for the semantic pass to report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decorator {
    pub at: Token,
    pub name: Option<Token>,
    pub tail: DecoratorTail,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecoratorTail {
    None,
    Args(DecoratorArgs),
    Block(BlockCommand),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoratorArgs {
    pub open: Token,
    pub elements: Vec<DecoratorElement>,
    pub close: Token,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecoratorElement {
    Text(CommandText),
    Nested(Decorator),
}

/// Tokens consumed while recovering from a syntax error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorNode {
    pub tokens: Vec<Token>,
    pub span: Span,
}

/// Walks a CST. Every method defaults to visiting the node's children, so
/// implementors override only the nodes they care about.
pub trait Visitor {
    fn visit_program(&mut self, program: &Program) {
        walk_program(self, program);
    }

    fn visit_line(&mut self, line: &Line) {
        walk_line(self, line);
    }

    fn visit_variable(&mut self, def: &VariableDefinition) {
        walk_variable(self, def);
    }

    fn visit_command(&mut self, def: &CommandDefinition) {
        walk_command(self, def);
    }

    fn visit_body(&mut self, body: &CommandBody) {
        walk_body(self, body);
    }

    fn visit_block(&mut self, block: &BlockCommand) {
        walk_block(self, block);
    }

    fn visit_decorator(&mut self, decorator: &Decorator) {
        walk_decorator(self, decorator);
    }

    fn visit_text(&mut self, _text: &CommandText) {}

    fn visit_comment(&mut self, _comment: &Token) {}

    fn visit_error(&mut self, _node: &ErrorNode) {}
}

pub fn walk_program<V: Visitor + ?Sized>(visitor: &mut V, program: &Program) {
    for line in &program.lines {
        visitor.visit_line(line);
    }
}

pub fn walk_line<V: Visitor + ?Sized>(visitor: &mut V, line: &Line) {
    match line {
        Line::Variable(def) => visitor.visit_variable(def),
        Line::Command(def) => visitor.visit_command(def),
        Line::Comment(token) => visitor.visit_comment(token),
        Line::Blank(_) => {}
        Line::Error(node) => visitor.visit_error(node),
    }
}

pub fn walk_variable<V: Visitor + ?Sized>(visitor: &mut V, def: &VariableDefinition) {
    if let Some(value) = &def.value {
        visitor.visit_text(value);
    }
}

pub fn walk_command<V: Visitor + ?Sized>(visitor: &mut V, def: &CommandDefinition) {
    visitor.visit_body(&def.body);
}

pub fn walk_body<V: Visitor + ?Sized>(visitor: &mut V, body: &CommandBody) {
    match body {
        CommandBody::Simple(text) => visitor.visit_text(text),
        CommandBody::Block(block) => visitor.visit_block(block),
        CommandBody::Decorated(decorated) => {
            for decorator in &decorated.decorators {
                visitor.visit_decorator(decorator);
            }
            if let Some(body) = &decorated.body {
                visitor.visit_body(body);
            }
        }
    }
}

pub fn walk_block<V: Visitor + ?Sized>(visitor: &mut V, block: &BlockCommand) {
    for item in &block.items {
        match item {
            BlockItem::Statement(body) => visitor.visit_body(body),
            BlockItem::Separator(_) => {}
            BlockItem::Error(node) => visitor.visit_error(node),
        }
    }
}

pub fn walk_decorator<V: Visitor + ?Sized>(visitor: &mut V, decorator: &Decorator) {
    match &decorator.tail {
        DecoratorTail::None => {}
        DecoratorTail::Args(args) => {
            for element in &args.elements {
                match element {
                    DecoratorElement::Text(text) => visitor.visit_text(text),
                    DecoratorElement::Nested(nested) => visitor.visit_decorator(nested),
                }
            }
        }
        DecoratorTail::Block(block) => visitor.visit_block(block),
    }
}

struct ErrorScan(bool);

impl Visitor for ErrorScan {
    fn visit_error(&mut self, _node: &ErrorNode) {
        self.0 = true;
    }
}
