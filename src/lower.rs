//! Semantic pass: lowers the CST into the validated IR.
//!
//! One traversal in source order. Duplicate names are reported and the
//! duplicate kept (marked shadowed); any other problem in an item drops
//! that item from the IR while the pass moves on to the next one.

use std::collections::HashMap;

use crate::cst;
use crate::diagnostic::{Diagnostic, DiagnosticKind, NameKind, Severity};
use crate::ir::{
    Block, BlockStatement, CommandBody, CommandDef, DecoratedStatement, Decorator,
    DecoratorElement, DecoratorKind, Identifier, Program, RawText, TopLevelItem, VariableDef,
};
use crate::options::{ContinuationPolicy, ParseOptions};
use crate::source::Source;
use crate::token::{Span, Token};

/// Lower a parsed program. `has_errors` on the result reflects only the
/// diagnostics returned here; the façade recomputes it over all stages.
#[must_use]
pub fn lower(
    program: &cst::Program,
    source: &Source<'_>,
    options: &ParseOptions,
) -> (Program, Vec<Diagnostic>) {
    let mut lowerer = Lowerer::new(source, options);
    let items = program
        .lines
        .iter()
        .filter_map(|line| lowerer.lower_line(line))
        .collect();
    let has_errors = lowerer.diagnostics.iter().any(Diagnostic::is_error);
    (Program { items, has_errors }, lowerer.diagnostics)
}

struct Lowerer<'s, 'a> {
    source: &'s Source<'a>,
    options: &'s ParseOptions,
    diagnostics: Vec<Diagnostic>,
    variables: HashMap<String, Span>,
    commands: HashMap<String, Span>,
    /// Set when the item being lowered has an error that drops it.
    malformed: bool,
}

impl<'s, 'a> Lowerer<'s, 'a> {
    fn new(source: &'s Source<'a>, options: &'s ParseOptions) -> Self {
        Self {
            source,
            options,
            diagnostics: Vec::new(),
            variables: HashMap::new(),
            commands: HashMap::new(),
            malformed: false,
        }
    }

    fn lower_line(&mut self, line: &cst::Line) -> Option<TopLevelItem> {
        if line.has_errors() {
            return None;
        }
        match line {
            cst::Line::Variable(def) => self.lower_variable(def).map(TopLevelItem::Variable),
            cst::Line::Command(def) => self.lower_command(def).map(TopLevelItem::Command),
            cst::Line::Comment(_) | cst::Line::Blank(_) | cst::Line::Error(_) => None,
        }
    }

    fn lower_variable(&mut self, def: &cst::VariableDefinition) -> Option<VariableDef> {
        self.malformed = false;
        let name = self.definition_name(&def.name);
        let value = if let Some(text) = &def.value {
            self.raw_text(text)
        } else {
            self.report(
                DiagnosticKind::EmptyVariableValue,
                def.name.span.clone(),
                format!("variable `{}` has an empty value", def.name.text),
            );
            let end = def.equals.span.end;
            RawText {
                text: String::new(),
                span: self.source.span(end, end),
            }
        };

        if self.malformed {
            return None;
        }
        let is_shadowed = self.declare(NameKind::Variable, &name);
        Some(VariableDef {
            name,
            value,
            is_shadowed,
            span: def.span.clone(),
        })
    }

    fn lower_command(&mut self, def: &cst::CommandDefinition) -> Option<CommandDef> {
        self.malformed = false;
        let name = self.definition_name(&def.name);
        let (decorators, body) = self.flatten(&def.body);

        if self.malformed {
            return None;
        }
        let is_shadowed = self.declare(NameKind::Command, &name);
        Some(CommandDef {
            name,
            decorators,
            body,
            is_shadowed,
            span: def.span.clone(),
        })
    }

    /// Record a definition, reporting a duplicate. Returns whether the name
    /// was already taken, in which case the earlier definition wins.
    fn declare(&mut self, kind: NameKind, name: &Identifier) -> bool {
        let table = match kind {
            NameKind::Variable => &mut self.variables,
            NameKind::Command => &mut self.commands,
        };
        if let Some(first) = table.get(&name.text) {
            let message = format!(
                "{kind} `{}` is already defined at line {}, column {}",
                name.text, first.line, first.column
            );
            self.diagnostics.push(Diagnostic::new(
                DiagnosticKind::DuplicateName(kind),
                name.span.clone(),
                message,
            ));
            true
        } else {
            table.insert(name.text.clone(), name.span.clone());
            false
        }
    }

    fn definition_name(&mut self, token: &Token) -> Identifier {
        if self.options.is_reserved(&token.text) {
            self.report(
                DiagnosticKind::ReservedName,
                token.span.clone(),
                format!("`{}` is a reserved name", token.text),
            );
        }
        Identifier {
            text: token.text.clone(),
            span: token.span.clone(),
        }
    }

    /// Unroll a decorator chain into the decorators and the body that
    /// follows the last of them.
    fn flatten(&mut self, body: &cst::CommandBody) -> (Vec<Decorator>, Option<CommandBody>) {
        let mut decorators = Vec::new();
        let mut current = body;

        loop {
            match current {
                cst::CommandBody::Simple(text) => {
                    return (decorators, Some(CommandBody::Simple(self.raw_text(text))));
                }
                cst::CommandBody::Block(block) => {
                    return (decorators, Some(CommandBody::Block(self.block(block))));
                }
                cst::CommandBody::Decorated(decorated) => {
                    let next = decorated.body.as_deref();
                    for (i, node) in decorated.decorators.iter().enumerate() {
                        let decorator = self.decorator(node);
                        let after = decorated
                            .decorators
                            .get(i + 1)
                            .map(|d| &d.span)
                            .or_else(|| next.map(cst::CommandBody::span));
                        if let (DecoratorKind::Block, Some(extra)) = (decorator.kind, after) {
                            self.report(
                                DiagnosticKind::InvalidDecoratorShape,
                                extra.to(&decorated.span),
                                format!(
                                    "block decorator `@{}` already has a body and cannot decorate another",
                                    decorator.name
                                ),
                            );
                        }
                        decorators.push(decorator);
                    }
                    match next {
                        Some(next) => current = next,
                        None => return (decorators, None),
                    }
                }
            }
        }
    }

    fn block(&mut self, block: &cst::BlockCommand) -> Block {
        let statements = block
            .statements()
            .map(|body| self.statement(body))
            .collect();
        Block {
            statements,
            span: block.span.clone(),
        }
    }

    fn statement(&mut self, body: &cst::CommandBody) -> BlockStatement {
        match body {
            cst::CommandBody::Simple(text) => BlockStatement::Simple(self.raw_text(text)),
            cst::CommandBody::Block(block) => BlockStatement::Block(self.block(block)),
            cst::CommandBody::Decorated(decorated) => {
                let (decorators, body) = self.flatten(body);
                BlockStatement::Decorated(DecoratedStatement {
                    decorators,
                    body,
                    span: decorated.span.clone(),
                })
            }
        }
    }

    fn decorator(&mut self, decorator: &cst::Decorator) -> Decorator {
        let name = if let Some(token) = &decorator.name {
            Identifier {
                text: token.text.clone(),
                span: token.span.clone(),
            }
        } else {
            self.report(
                DiagnosticKind::EmptyDecoratorName,
                decorator.at.span.clone(),
                "expected a decorator name after '@'",
            );
            let end = decorator.at.span.end;
            Identifier {
                text: String::new(),
                span: self.source.span(end, end),
            }
        };

        let (kind, arguments, attached_body) = match &decorator.tail {
            cst::DecoratorTail::None => (DecoratorKind::Simple, Vec::new(), None),
            cst::DecoratorTail::Args(args) => {
                let arguments = args
                    .elements
                    .iter()
                    .filter_map(|element| self.element(element))
                    .collect();
                (DecoratorKind::Function, arguments, None)
            }
            cst::DecoratorTail::Block(block) => (
                DecoratorKind::Block,
                Vec::new(),
                Some(CommandBody::Block(self.block(block))),
            ),
        };

        Decorator {
            kind,
            name,
            arguments,
            attached_body,
            span: decorator.span.clone(),
        }
    }

    fn element(&mut self, element: &cst::DecoratorElement) -> Option<DecoratorElement> {
        match element {
            cst::DecoratorElement::Text(text) => {
                let raw = self.raw_text(text);
                (!raw.text.is_empty()).then_some(DecoratorElement::Text(raw))
            }
            cst::DecoratorElement::Nested(nested) => {
                Some(DecoratorElement::Nested(self.decorator(nested)))
            }
        }
    }

    /// Join the chunks of a command text. The span runs from the first
    /// chunk to the last; leading and trailing continuations are outside it.
    fn raw_text(&self, text: &cst::CommandText) -> RawText {
        let chunks: Vec<&Token> = text
            .elements
            .iter()
            .filter_map(|element| match element {
                cst::TextElement::Chunk(token) => Some(token),
                cst::TextElement::Continuation(_) => None,
            })
            .collect();
        let (Some(first), Some(last)) = (chunks.first(), chunks.last()) else {
            let start = text.span.start;
            return RawText {
                text: String::new(),
                span: self.source.span(start, start),
            };
        };
        let span = first.span.to(&last.span);

        let joined = match self.options.continuation {
            ContinuationPolicy::Collapse => {
                let mut out = String::new();
                for element in &text.elements {
                    match element {
                        cst::TextElement::Chunk(token) => out.push_str(&token.text),
                        cst::TextElement::Continuation(_) => out.push(' '),
                    }
                }
                out.trim().to_string()
            }
            ContinuationPolicy::Preserve => self.source.slice(&span).into_owned(),
        };

        RawText { text: joined, span }
    }

    fn report(&mut self, kind: DiagnosticKind, span: Span, message: impl Into<String>) {
        if kind.severity() == Severity::Error {
            self.malformed = true;
        }
        self.diagnostics.push(Diagnostic::new(kind, span, message));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use crate::parser::parse_tokens;

    fn lower_input(input: &str, options: &ParseOptions) -> (Program, Vec<Diagnostic>) {
        let source = Source::new(input.as_bytes());
        let (tokens, _) = tokenize(&source);
        let (cst, _) = parse_tokens(&tokens);
        lower(&cst, &source, options)
    }

    fn lower_default(input: &str) -> (Program, Vec<Diagnostic>) {
        lower_input(input, &ParseOptions::default())
    }

    #[test]
    fn continuation_collapses_to_one_space() {
        let (program, diagnostics) = lower_default("def long = first \\\n  second\n");
        assert!(diagnostics.is_empty());
        assert_eq!(program.find_variable("long").unwrap().value.text, "first   second");
    }

    #[test]
    fn continuation_preserved_verbatim() {
        let options = ParseOptions::new().continuation(ContinuationPolicy::Preserve);
        let (program, _) = lower_input("def long = first \\\n  second\n", &options);
        assert_eq!(
            program.find_variable("long").unwrap().value.text,
            "first \\\n  second"
        );
    }

    #[test]
    fn duplicate_keeps_first_and_marks_second() {
        let (program, diagnostics) = lower_default("x = 1\nx = 2\n");
        assert_eq!(program.items.len(), 2);
        assert!(!program.items[0].is_shadowed());
        assert!(program.items[1].is_shadowed());
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(
            diagnostics[0].kind,
            DiagnosticKind::DuplicateName(NameKind::Command)
        );
        assert!(program.has_errors);
        let CommandBody::Simple(text) = program.find_command("x").unwrap().body.as_ref().unwrap() else {
            panic!("expected simple body");
        };
        assert_eq!(text.text, "1");
    }

    #[test]
    fn variables_and_commands_have_separate_tables() {
        let (program, diagnostics) = lower_default("def x = 1\nx = echo\n");
        assert!(diagnostics.is_empty());
        assert_eq!(program.items.len(), 2);
    }

    #[test]
    fn reserved_name_drops_item() {
        let (program, diagnostics) = lower_default("def = echo\nok = echo\n");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::ReservedName);
        assert_eq!(program.items.len(), 1);
        assert_eq!(program.items[0].name().text, "ok");
    }

    #[test]
    fn empty_decorator_name() {
        let (program, diagnostics) = lower_default("x = @ echo\n");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::EmptyDecoratorName);
        assert!(program.items.is_empty());
    }

    #[test]
    fn block_decorator_followed_by_body() {
        let (program, diagnostics) = lower_default("x = { @parallel { a } b }\n");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::InvalidDecoratorShape);
        assert!(program.items.is_empty());

        let (program, diagnostics) = lower_default("x = @parallel { a } @quiet\n");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::InvalidDecoratorShape);
        assert_eq!((diagnostics[0].span.start, diagnostics[0].span.end), (20, 26));
        assert!(program.items.is_empty());
    }

    #[test]
    fn empty_variable_value_warns() {
        let (program, diagnostics) = lower_default("def EMPTY =\n");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::EmptyVariableValue);
        assert!(!program.has_errors);
        assert_eq!(program.find_variable("EMPTY").unwrap().value.text, "");
    }

    #[test]
    fn decorator_chain_is_flattened() {
        let (program, diagnostics) = lower_default("t = @quiet @timeout(5s) make\n");
        assert!(diagnostics.is_empty());
        let def = program.find_command("t").unwrap();
        let names: Vec<_> = def.decorators.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, ["quiet", "timeout"]);
        assert_eq!(def.decorators[0].kind, DecoratorKind::Simple);
        assert_eq!(def.decorators[1].kind, DecoratorKind::Function);
        assert!(matches!(&def.body, Some(CommandBody::Simple(t)) if t.text == "make"));
    }

    #[test]
    fn nested_decorator_arguments() {
        let (program, diagnostics) = lower_default("t = @retry(3, @var(N)) make\n");
        assert!(diagnostics.is_empty());
        let retry = &program.find_command("t").unwrap().decorators[0];
        assert_eq!(retry.arguments.len(), 2);
        assert!(matches!(&retry.arguments[0], DecoratorElement::Text(t) if t.text == "3,"));
        let DecoratorElement::Nested(var) = &retry.arguments[1] else {
            panic!("expected nested decorator");
        };
        assert_eq!(var.name.text, "var");
        assert!(matches!(&var.arguments[0], DecoratorElement::Text(t) if t.text == "N"));
    }

    #[test]
    fn decorated_block_statement() {
        let (program, diagnostics) = lower_default("ci = { lint; @timeout(5m) test; { a; b } }\n");
        assert!(diagnostics.is_empty());
        let Some(CommandBody::Block(block)) = &program.find_command("ci").unwrap().body else {
            panic!("expected block");
        };
        assert_eq!(block.statements.len(), 3);
        assert!(matches!(&block.statements[0], BlockStatement::Simple(t) if t.text == "lint"));
        let BlockStatement::Decorated(decorated) = &block.statements[1] else {
            panic!("expected decorated statement");
        };
        assert_eq!(decorated.decorators[0].name.text, "timeout");
        assert!(matches!(&decorated.body, Some(CommandBody::Simple(t)) if t.text == "test"));
        assert!(matches!(&block.statements[2], BlockStatement::Block(b) if b.statements.len() == 2));
    }
}
