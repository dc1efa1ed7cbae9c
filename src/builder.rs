use crate::ir::{
    Block, BlockStatement, CommandBody, CommandDef, DecoratedStatement, Decorator,
    DecoratorElement, DecoratorKind, Identifier, Program, RawText, TopLevelItem, VariableDef,
};
use crate::token::Span;

impl Program {
    /// Create a new empty program.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            items: Vec::new(),
            has_errors: false,
        }
    }

    /// Add a variable definition.
    #[must_use]
    pub fn variable(mut self, name: &str, value: &str) -> Self {
        self.items.push(TopLevelItem::Variable(VariableDef {
            name: Identifier::new(name),
            value: RawText::new(value),
            is_shadowed: false,
            span: Span::default(),
        }));
        self
    }

    /// Add a command definition.
    #[must_use]
    pub fn command(mut self, def: CommandDef) -> Self {
        self.items.push(TopLevelItem::Command(def));
        self
    }
}

impl CommandDef {
    /// Create a command with no decorators and no body.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: Identifier::new(name),
            decorators: Vec::new(),
            body: None,
            is_shadowed: false,
            span: Span::default(),
        }
    }

    /// Append a decorator to the chain.
    #[must_use]
    pub fn decorator(mut self, decorator: Decorator) -> Self {
        self.decorators.push(decorator);
        self
    }

    /// Set a simple text body.
    #[must_use]
    pub fn simple(mut self, text: &str) -> Self {
        self.body = Some(CommandBody::Simple(RawText::new(text)));
        self
    }

    /// Set a block body.
    #[must_use]
    pub fn block(mut self, block: Block) -> Self {
        self.body = Some(CommandBody::Block(block));
        self
    }
}

impl Block {
    #[must_use]
    pub fn new() -> Self {
        Self {
            statements: Vec::new(),
            span: Span::default(),
        }
    }

    #[must_use]
    pub fn statement(mut self, statement: BlockStatement) -> Self {
        self.statements.push(statement);
        self
    }

    /// Add a simple text statement.
    #[must_use]
    pub fn simple(self, text: &str) -> Self {
        self.statement(BlockStatement::simple(text))
    }

    /// Add a statement made of a decorator chain and an optional body.
    #[must_use]
    pub fn decorated(self, decorators: Vec<Decorator>, body: Option<CommandBody>) -> Self {
        self.statement(BlockStatement::Decorated(DecoratedStatement {
            decorators,
            body,
            span: Span::default(),
        }))
    }
}

impl Default for Block {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockStatement {
    #[must_use]
    pub fn simple(text: &str) -> Self {
        Self::Simple(RawText::new(text))
    }
}

impl Decorator {
    /// `@name`
    #[must_use]
    pub fn simple(name: &str) -> Self {
        Self::with_kind(DecoratorKind::Simple, name)
    }

    /// `@name()`; add arguments with [`arg`](Self::arg) and
    /// [`nested`](Self::nested).
    #[must_use]
    pub fn function(name: &str) -> Self {
        Self::with_kind(DecoratorKind::Function, name)
    }

    /// `@name { ... }`
    #[must_use]
    pub fn block(name: &str, block: Block) -> Self {
        Self {
            attached_body: Some(CommandBody::Block(block)),
            ..Self::with_kind(DecoratorKind::Block, name)
        }
    }

    /// Add a text argument.
    #[must_use]
    pub fn arg(mut self, text: &str) -> Self {
        self.arguments
            .push(DecoratorElement::Text(RawText::new(text)));
        self
    }

    /// Add a nested decorator argument.
    #[must_use]
    pub fn nested(mut self, decorator: Self) -> Self {
        self.arguments.push(DecoratorElement::Nested(decorator));
        self
    }

    fn with_kind(kind: DecoratorKind, name: &str) -> Self {
        Self {
            kind,
            name: Identifier::new(name),
            arguments: Vec::new(),
            attached_body: None,
            span: Span::default(),
        }
    }
}

impl Identifier {
    #[must_use]
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            span: Span::default(),
        }
    }
}

impl RawText {
    #[must_use]
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            span: Span::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_builder_sets_body() {
        let def = CommandDef::new("build").simple("go build");
        assert_eq!(def.name.text, "build");
        assert!(matches!(def.body, Some(CommandBody::Simple(ref t)) if t.text == "go build"));
        assert!(def.decorators.is_empty());
    }

    #[test]
    fn function_decorator_arguments_in_order() {
        let d = Decorator::function("retry")
            .arg("3,")
            .nested(Decorator::function("var").arg("N"));
        assert_eq!(d.kind, DecoratorKind::Function);
        assert_eq!(d.arguments.len(), 2);
        assert!(matches!(&d.arguments[1], DecoratorElement::Nested(n) if n.name.text == "var"));
    }

    #[test]
    fn block_decorator_carries_body() {
        let d = Decorator::block("parallel", Block::new().simple("a").simple("b"));
        assert_eq!(d.kind, DecoratorKind::Block);
        assert!(d.arguments.is_empty());
        assert!(matches!(d.attached_body, Some(CommandBody::Block(ref b)) if b.statements.len() == 2));
    }

    #[test]
    fn program_keeps_insertion_order() {
        let program = Program::new()
            .variable("A", "1")
            .command(CommandDef::new("b").simple("x"))
            .variable("C", "3");
        let names: Vec<_> = program.items.iter().map(|i| i.name().as_str()).collect();
        assert_eq!(names, ["A", "b", "C"]);
        assert!(!program.has_errors);
    }
}
