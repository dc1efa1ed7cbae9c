//! Demonstrate diagnostics for invalid devcmd input.

fn main() {
    // Unterminated block
    match devcmd::parse_str("build = { go build\n") {
        Ok(_) => println!("Parsed OK (unexpected)"),
        Err(devcmd::Error::Lex(d)) => {
            println!("Lex error: {d}");
            println!("  Kind: {:?}", d.kind);
            println!("  Location: line {}, column {}", d.span.line, d.span.column);
        }
        Err(e) => println!("Other error: {e}"),
    }

    println!();

    // Recovery: every problem is reported, the valid definitions survive
    let input = "build go\ntest = go test\ntest = go vet\n";
    let (program, diagnostics) = devcmd::parse(input.as_bytes());
    let source = devcmd::Source::new(input.as_bytes());
    for diagnostic in &diagnostics {
        println!("{}", diagnostic.render(&source));
    }
    println!("{} item(s) recovered", program.items.len());
}
