//! Parser edge cases, recovery, and CST tests.

use devcmd::cst::{self, CommandBody, DecoratorTail, Line, Visitor};
use devcmd::{DiagnosticKind, MAX_NESTING, Source, TokenKind, parse, parse_tokens, tokenize};

fn parse_cst(input: &str) -> (cst::Program, Vec<devcmd::Diagnostic>) {
    let source = Source::new(input.as_bytes());
    let (tokens, _) = tokenize(&source);
    parse_tokens(&tokens)
}

fn commands(program: &cst::Program) -> Vec<&cst::CommandDefinition> {
    program
        .lines
        .iter()
        .filter_map(|line| match line {
            Line::Command(def) => Some(def),
            _ => None,
        })
        .collect()
}

#[derive(Default)]
struct DecoratorNames(Vec<String>);

impl Visitor for DecoratorNames {
    fn visit_decorator(&mut self, decorator: &cst::Decorator) {
        if let Some(name) = &decorator.name {
            self.0.push(name.text.clone());
        }
        cst::walk_decorator(self, decorator);
    }
}

// -----------------------------------------------------------
// Structure.
// -----------------------------------------------------------

#[test]
fn visitor_reaches_every_decorator() {
    let (program, diagnostics) = parse_cst("t = @a @b(@c) { @d { x } }\n");
    assert!(diagnostics.is_empty());
    let mut names = DecoratorNames::default();
    names.visit_program(&program);
    assert_eq!(names.0, ["a", "b", "c", "d"]);
}

#[test]
fn command_span_covers_name_to_body() {
    let (program, _) = parse_cst("build = go build\n");
    let def = commands(&program)[0];
    assert_eq!((def.span.start, def.span.end), (0, 16));
    assert_eq!(def.end.as_ref().map(|t| t.kind), Some(TokenKind::Newline));
}

#[test]
fn last_line_without_newline() {
    let (program, diagnostics) = parse_cst("a = x\nb = y");
    assert!(diagnostics.is_empty());
    let defs = commands(&program);
    assert_eq!(defs.len(), 2);
    assert!(defs[1].end.is_none());
}

#[test]
fn blank_lines_and_separators_inside_block() {
    let (program, diagnostics) = parse_cst("all = {\n\n  a;;\n  b;\n}\n");
    assert!(diagnostics.is_empty());
    let CommandBody::Block(block) = &commands(&program)[0].body else {
        panic!("expected block");
    };
    assert_eq!(block.statements().count(), 2);
}

#[test]
fn empty_block() {
    let (program, diagnostics) = parse_cst("noop = {}\n");
    assert!(diagnostics.is_empty());
    let CommandBody::Block(block) = &commands(&program)[0].body else {
        panic!("expected block");
    };
    assert!(block.items.is_empty());
}

#[test]
fn nested_decorator_with_block_in_arguments() {
    let (program, diagnostics) = parse_cst("t = @when(@changed { src }) make\n");
    assert!(diagnostics.is_empty());
    let CommandBody::Decorated(decorated) = &commands(&program)[0].body else {
        panic!("expected decorated");
    };
    let DecoratorTail::Args(args) = &decorated.decorators[0].tail else {
        panic!("expected arguments");
    };
    let cst::DecoratorElement::Nested(nested) = &args.elements[0] else {
        panic!("expected nested decorator");
    };
    assert!(matches!(nested.tail, DecoratorTail::Block(_)));
}

#[test]
fn synthetic_close_paren_is_accepted() {
    let (program, diagnostics) = parse_cst("x = @t(5s\ny = z\n");
    assert!(diagnostics.is_empty());
    let defs = commands(&program);
    assert_eq!(defs.len(), 2);
    let CommandBody::Decorated(decorated) = &defs[0].body else {
        panic!("expected decorated");
    };
    let DecoratorTail::Args(args) = &decorated.decorators[0].tail else {
        panic!("expected arguments");
    };
    assert!(args.close.is_synthetic());
}

// -----------------------------------------------------------
// Recovery.
// -----------------------------------------------------------

#[test]
fn error_node_keeps_skipped_tokens() {
    let (program, diagnostics) = parse_cst("build go\n");
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].kind, DiagnosticKind::MissingToken);
    let Line::Error(node) = &program.lines[0] else {
        panic!("expected error line");
    };
    let kinds: Vec<_> = node.tokens.iter().map(|t| t.kind).collect();
    assert_eq!(kinds, [TokenKind::Ident, TokenKind::Ident, TokenKind::Newline]);
}

#[test]
fn one_diagnostic_per_bad_line() {
    let (program, diagnostics) = parse_cst("a b c\n= x\nok = y\n@ z\n");
    assert_eq!(diagnostics.len(), 3);
    let defs = commands(&program);
    assert_eq!(defs.len(), 1);
    assert_eq!(defs[0].name.text, "ok");
}

#[test]
fn recovery_skips_whole_multi_line_block() {
    let (program, diagnostics) = parse_cst("x = {\n  a\n} junk\ny = z\n");
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].kind, DiagnosticKind::UnexpectedToken);
    let defs = commands(&program);
    assert_eq!(defs.len(), 1);
    assert_eq!(defs[0].name.text, "y");
}

#[test]
fn block_error_keeps_following_statements() {
    let (program, diagnostics) = parse_cst("x = { a; {b} c; d }\n");
    assert_eq!(diagnostics.len(), 1);
    let CommandBody::Block(block) = &commands(&program)[0].body else {
        panic!("expected block");
    };
    assert_eq!(block.statements().count(), 2);
    assert!(program.lines[0].has_errors());
}

#[test]
fn missing_value_after_def_name_is_fine() {
    let (program, diagnostics) = parse_cst("def X =\n");
    assert!(diagnostics.is_empty());
    assert!(matches!(&program.lines[0], Line::Variable(def) if def.value.is_none()));
}

#[test]
fn def_without_name_is_a_command() {
    let (program, diagnostics) = parse_cst("def = echo\n");
    assert!(diagnostics.is_empty());
    assert_eq!(commands(&program)[0].name.text, "def");
}

// -----------------------------------------------------------
// Nesting limits.
// -----------------------------------------------------------

fn nested_blocks(levels: usize) -> String {
    format!("x = {}a{}\n", "{ ".repeat(levels), " }".repeat(levels))
}

#[test]
fn nesting_up_to_the_limit_is_accepted() {
    let (program, diagnostics) = parse_cst(&nested_blocks(MAX_NESTING));
    assert!(diagnostics.is_empty());
    assert!(!program.lines[0].has_errors());
}

#[test]
fn nesting_past_the_limit_is_one_diagnostic() {
    let input = nested_blocks(MAX_NESTING + 1) + "y = z\n";
    let (program, diagnostics) = parse_cst(&input);
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].kind, DiagnosticKind::UnexpectedToken);
    assert!(diagnostics[0].message.contains("nesting too deep"));
    assert_eq!(diagnostics[0].span.start, 4 + 2 * MAX_NESTING);
    assert!(program.lines[0].has_errors());
    let defs = commands(&program);
    assert_eq!(defs.len(), 2);
    assert_eq!(defs[1].name.text, "y");
}

#[test]
fn deeply_unclosed_blocks_do_not_overflow() {
    let input = format!("x = {}", "{".repeat(20_000));
    let (program, diagnostics) = parse(input.as_bytes());
    assert!(program.items.is_empty());
    assert_eq!(
        diagnostics
            .iter()
            .filter(|d| d.kind == DiagnosticKind::UnterminatedBlock)
            .count(),
        20_000
    );
    assert!(diagnostics.contains(DiagnosticKind::UnexpectedToken));
}

#[test]
fn deeply_nested_arguments_do_not_overflow() {
    let input = format!("x = {}run\ny = z\n", "@a(".repeat(20_000));
    let (program, diagnostics) = parse(input.as_bytes());
    assert!(diagnostics.contains(DiagnosticKind::UnexpectedToken));
    assert!(diagnostics.contains(DiagnosticKind::UnterminatedArguments));
    assert_eq!(program.items.len(), 1);
    assert_eq!(program.items[0].name().as_str(), "y");
}

#[test]
fn long_decorator_chain_is_flat() {
    let input = format!("x = {}run\n", "@a ".repeat(20_000));
    let (program, diagnostics) = parse_cst(&input);
    assert!(diagnostics.is_empty());
    let CommandBody::Decorated(decorated) = &commands(&program)[0].body else {
        panic!("expected decorated");
    };
    assert_eq!(decorated.decorators.len(), 20_000);
    assert!(matches!(
        decorated.body.as_deref(),
        Some(CommandBody::Simple(_))
    ));

    let (program, diagnostics) = parse(input.as_bytes());
    assert!(diagnostics.is_empty());
    assert_eq!(program.find_command("x").unwrap().decorators.len(), 20_000);
}
