//! Validated intermediate representation handed to executors.
//!
//! Every node carries the span of the source it was lowered from. Spans
//! are byte offsets; nothing here borrows the source buffer.

use std::fmt;

use serde::Serialize;

use crate::token::Span;

/// A lowered devcmd program.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Program {
    /// Definitions in source order, shadowed duplicates included.
    pub items: Vec<TopLevelItem>,
    /// Set when any error diagnostic was reported for the source.
    pub has_errors: bool,
}

impl Program {
    pub fn variables(&self) -> impl Iterator<Item = &VariableDef> {
        self.items.iter().filter_map(|item| match item {
            TopLevelItem::Variable(def) => Some(def),
            TopLevelItem::Command(_) => None,
        })
    }

    pub fn commands(&self) -> impl Iterator<Item = &CommandDef> {
        self.items.iter().filter_map(|item| match item {
            TopLevelItem::Command(def) => Some(def),
            TopLevelItem::Variable(_) => None,
        })
    }

    /// The effective (first, non-shadowed) definition of a variable.
    #[must_use]
    pub fn find_variable(&self, name: &str) -> Option<&VariableDef> {
        self.variables()
            .find(|def| !def.is_shadowed && def.name.text == name)
    }

    /// The effective (first, non-shadowed) definition of a command.
    #[must_use]
    pub fn find_command(&self, name: &str) -> Option<&CommandDef> {
        self.commands()
            .find(|def| !def.is_shadowed && def.name.text == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum TopLevelItem {
    #[serde(rename = "VariableDef")]
    Variable(VariableDef),
    #[serde(rename = "CommandDef")]
    Command(CommandDef),
}

impl TopLevelItem {
    #[must_use]
    pub const fn name(&self) -> &Identifier {
        match self {
            Self::Variable(def) => &def.name,
            Self::Command(def) => &def.name,
        }
    }

    #[must_use]
    pub const fn span(&self) -> &Span {
        match self {
            Self::Variable(def) => &def.span,
            Self::Command(def) => &def.span,
        }
    }

    #[must_use]
    pub const fn is_shadowed(&self) -> bool {
        match self {
            Self::Variable(def) => def.is_shadowed,
            Self::Command(def) => def.is_shadowed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableDef {
    pub name: Identifier,
    /// Verbatim value; variable references are not expanded.
    pub value: RawText,
    /// A duplicate definition kept only to preserve source order.
    pub is_shadowed: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandDef {
    pub name: Identifier,
    /// Decorator chain in source order.
    pub decorators: Vec<Decorator>,
    /// Body after the last decorator. Absent when the chain ends in a block
    /// decorator, which carries its own body.
    pub body: Option<CommandBody>,
    pub is_shadowed: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum CommandBody {
    Simple(RawText),
    Block(Block),
}

impl CommandBody {
    #[must_use]
    pub const fn span(&self) -> &Span {
        match self {
            Self::Simple(text) => &text.span,
            Self::Block(block) => &block.span,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Block {
    pub statements: Vec<BlockStatement>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum BlockStatement {
    Simple(RawText),
    Block(Block),
    Decorated(DecoratedStatement),
}

impl BlockStatement {
    #[must_use]
    pub const fn span(&self) -> &Span {
        match self {
            Self::Simple(text) => &text.span,
            Self::Block(block) => &block.span,
            Self::Decorated(decorated) => &decorated.span,
        }
    }
}

/// A block statement with a decorator chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecoratedStatement {
    pub decorators: Vec<Decorator>,
    pub body: Option<CommandBody>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DecoratorKind {
    /// `@name`
    Simple,
    /// `@name(args)`
    Function,
    /// `@name { ... }`
    Block,
}

impl fmt::Display for DecoratorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Simple => f.write_str("simple"),
            Self::Function => f.write_str("function"),
            Self::Block => f.write_str("block"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Decorator {
    pub kind: DecoratorKind,
    pub name: Identifier,
    /// Only `Function` decorators carry arguments.
    pub arguments: Vec<DecoratorElement>,
    /// Only `Block` decorators carry a body.
    pub attached_body: Option<CommandBody>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum DecoratorElement {
    Text(RawText),
    Nested(Decorator),
}

impl DecoratorElement {
    #[must_use]
    pub const fn span(&self) -> &Span {
        match self {
            Self::Text(text) => &text.span,
            Self::Nested(decorator) => &decorator.span,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identifier {
    pub text: String,
    pub span: Span,
}

impl Identifier {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Command text joined across continuations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RawText {
    pub text: String,
    pub span: Span,
}

impl RawText {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for RawText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}
