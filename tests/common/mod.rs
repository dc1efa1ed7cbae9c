#![allow(dead_code)]

use devcmd::{
    BlockStatement, CommandBody, Diagnostic, DiagnosticKind, Diagnostics, Program, format, parse,
};

/// Parse input that must produce no diagnostics at all.
pub fn parse_clean(input: &str) -> Program {
    let (program, diagnostics) = parse(input.as_bytes());
    assert!(
        diagnostics.is_empty(),
        "unexpected diagnostics for {input:?}:\n{}",
        describe(&diagnostics)
    );
    assert!(!program.has_errors);
    program
}

pub fn kinds(diagnostics: &Diagnostics) -> Vec<DiagnosticKind> {
    diagnostics.iter().map(|d| d.kind).collect()
}

pub fn describe(diagnostics: &Diagnostics) -> String {
    diagnostics
        .iter()
        .map(Diagnostic::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Text of a simple body, panicking on anything else.
pub fn simple_text(body: Option<&CommandBody>) -> &str {
    match body {
        Some(CommandBody::Simple(text)) => text.as_str(),
        other => panic!("expected simple body, got {other:?}"),
    }
}

/// Texts of a block body whose statements are all simple.
pub fn block_texts(body: Option<&CommandBody>) -> Vec<&str> {
    let Some(CommandBody::Block(block)) = body else {
        panic!("expected block body, got {body:?}");
    };
    block
        .statements
        .iter()
        .map(|statement| match statement {
            BlockStatement::Simple(text) => text.as_str(),
            other => panic!("expected simple statement, got {other:?}"),
        })
        .collect()
}

/// Format, re-parse, format again: the two outputs must match.
pub fn assert_format_stable(program: &Program) {
    let first = format(program);
    let (reparsed, diagnostics) = parse(first.as_bytes());
    assert!(
        !diagnostics.has_errors(),
        "formatted output does not parse:\n{}\n--- formatted ---\n{first}",
        describe(&diagnostics)
    );
    let second = format(&reparsed);
    assert_eq!(
        first, second,
        "format is not idempotent\n--- first ---\n{first}\n--- second ---\n{second}"
    );
}
