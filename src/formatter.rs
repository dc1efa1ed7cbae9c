//! Pretty-printer that serializes a devcmd IR back into canonical text.
//!
//! One definition per line. Blocks written directly on a definition with two
//! or more statements are broken over tab-indented lines; everything nested
//! deeper stays inline.

use std::fmt::Write as _;

use crate::ir::{
    Block, BlockStatement, CommandBody, CommandDef, Decorator, DecoratorElement, DecoratorKind,
    Program, TopLevelItem, VariableDef,
};

/// Format a `Program` into devcmd source text.
///
/// Text and variable values are written as stored, so a program lowered
/// with [`ContinuationPolicy::Preserve`](crate::ContinuationPolicy) keeps
/// its continuations.
#[must_use]
pub fn format(program: &Program) -> String {
    let mut out = String::new();

    for item in &program.items {
        match item {
            TopLevelItem::Variable(def) => format_variable(&mut out, def),
            TopLevelItem::Command(def) => format_command(&mut out, def),
        }
        out.push('\n');
    }

    out
}

fn format_variable(out: &mut String, def: &VariableDef) {
    let _ = write!(out, "def {} =", def.name);
    if !def.value.text.is_empty() {
        let _ = write!(out, " {}", def.value);
    }
}

fn format_command(out: &mut String, def: &CommandDef) {
    let _ = write!(out, "{} =", def.name);
    for decorator in &def.decorators {
        out.push(' ');
        format_decorator(out, decorator, true);
    }
    if let Some(body) = &def.body {
        out.push(' ');
        format_body(out, body, true);
    }
}

fn format_body(out: &mut String, body: &CommandBody, top: bool) {
    match body {
        CommandBody::Simple(text) => out.push_str(&text.text),
        CommandBody::Block(block) => format_block(out, block, top),
    }
}

fn format_block(out: &mut String, block: &Block, top: bool) {
    match block.statements.as_slice() {
        [] => out.push_str("{}"),
        statements if top && statements.len() > 1 => {
            out.push_str("{\n");
            for statement in statements {
                out.push('\t');
                format_statement(out, statement);
                out.push('\n');
            }
            out.push('}');
        }
        statements => {
            out.push_str("{ ");
            for (i, statement) in statements.iter().enumerate() {
                if i > 0 {
                    out.push_str("; ");
                }
                format_statement(out, statement);
            }
            out.push_str(" }");
        }
    }
}

fn format_statement(out: &mut String, statement: &BlockStatement) {
    match statement {
        BlockStatement::Simple(text) => out.push_str(&text.text),
        BlockStatement::Block(block) => format_block(out, block, false),
        BlockStatement::Decorated(decorated) => {
            for (i, decorator) in decorated.decorators.iter().enumerate() {
                if i > 0 {
                    out.push(' ');
                }
                format_decorator(out, decorator, false);
            }
            if let Some(body) = &decorated.body {
                out.push(' ');
                format_body(out, body, false);
            }
        }
    }
}

fn format_decorator(out: &mut String, decorator: &Decorator, top: bool) {
    let _ = write!(out, "@{}", decorator.name);
    match decorator.kind {
        DecoratorKind::Simple => {}
        DecoratorKind::Function => {
            out.push('(');
            for (i, element) in decorator.arguments.iter().enumerate() {
                if i > 0 {
                    out.push(' ');
                }
                match element {
                    DecoratorElement::Text(text) => out.push_str(&text.text),
                    DecoratorElement::Nested(nested) => format_decorator(out, nested, false),
                }
            }
            out.push(')');
        }
        DecoratorKind::Block => {
            out.push(' ');
            match &decorator.attached_body {
                Some(body) => format_body(out, body, top),
                None => out.push_str("{}"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Identifier, RawText};
    use crate::token::Span;

    fn text(s: &str) -> RawText {
        RawText {
            text: s.to_string(),
            span: Span::default(),
        }
    }

    fn ident(s: &str) -> Identifier {
        Identifier {
            text: s.to_string(),
            span: Span::default(),
        }
    }

    fn command(name: &str, decorators: Vec<Decorator>, body: Option<CommandBody>) -> Program {
        Program {
            items: vec![TopLevelItem::Command(CommandDef {
                name: ident(name),
                decorators,
                body,
                is_shadowed: false,
                span: Span::default(),
            })],
            has_errors: false,
        }
    }

    fn block(statements: &[&str]) -> Block {
        Block {
            statements: statements
                .iter()
                .map(|s| BlockStatement::Simple(text(s)))
                .collect(),
            span: Span::default(),
        }
    }

    #[test]
    fn variable_line() {
        let program = Program {
            items: vec![TopLevelItem::Variable(VariableDef {
                name: ident("FOO"),
                value: text("bar baz"),
                is_shadowed: false,
                span: Span::default(),
            })],
            has_errors: false,
        };
        assert_eq!(format(&program), "def FOO = bar baz\n");
    }

    #[test]
    fn empty_variable_has_no_trailing_space() {
        let program = Program {
            items: vec![TopLevelItem::Variable(VariableDef {
                name: ident("E"),
                value: text(""),
                is_shadowed: false,
                span: Span::default(),
            })],
            has_errors: false,
        };
        assert_eq!(format(&program), "def E =\n");
    }

    #[test]
    fn top_level_block_breaks_lines() {
        let program = command("all", Vec::new(), Some(CommandBody::Block(block(&["a", "b"]))));
        assert_eq!(format(&program), "all = {\n\ta\n\tb\n}\n");
    }

    #[test]
    fn single_statement_block_stays_inline() {
        let program = command("one", Vec::new(), Some(CommandBody::Block(block(&["a"]))));
        assert_eq!(format(&program), "one = { a }\n");
    }

    #[test]
    fn empty_block() {
        let program = command("none", Vec::new(), Some(CommandBody::Block(block(&[]))));
        assert_eq!(format(&program), "none = {}\n");
    }

    #[test]
    fn nested_block_is_inline() {
        let inner = BlockStatement::Block(block(&["x", "y"]));
        let outer = Block {
            statements: vec![BlockStatement::Simple(text("a")), inner],
            span: Span::default(),
        };
        let program = command("n", Vec::new(), Some(CommandBody::Block(outer)));
        assert_eq!(format(&program), "n = {\n\ta\n\t{ x; y }\n}\n");
    }

    #[test]
    fn decorator_chain() {
        let nested = Decorator {
            kind: DecoratorKind::Function,
            name: ident("var"),
            arguments: vec![DecoratorElement::Text(text("N"))],
            attached_body: None,
            span: Span::default(),
        };
        let retry = Decorator {
            kind: DecoratorKind::Function,
            name: ident("retry"),
            arguments: vec![
                DecoratorElement::Text(text("3,")),
                DecoratorElement::Nested(nested),
            ],
            attached_body: None,
            span: Span::default(),
        };
        let quiet = Decorator {
            kind: DecoratorKind::Simple,
            name: ident("quiet"),
            arguments: Vec::new(),
            attached_body: None,
            span: Span::default(),
        };
        let program = command(
            "t",
            vec![quiet, retry],
            Some(CommandBody::Simple(text("make"))),
        );
        assert_eq!(format(&program), "t = @quiet @retry(3, @var(N)) make\n");
    }

    #[test]
    fn block_decorator_owns_the_block() {
        let parallel = Decorator {
            kind: DecoratorKind::Block,
            name: ident("parallel"),
            arguments: Vec::new(),
            attached_body: Some(CommandBody::Block(block(&["x", "y"]))),
            span: Span::default(),
        };
        let program = command("t", vec![parallel], None);
        assert_eq!(format(&program), "t = @parallel {\n\tx\n\ty\n}\n");
    }

    #[test]
    fn empty_program() {
        assert_eq!(format(&Program::default()), "");
    }
}
