//! Parse a devcmd file and print it back in canonical form.

fn main() {
    let input = "\
# build helpers
def SRC = ./cmd/...
build = go build $SRC
ci = { lint; @timeout(10m) test ;  @parallel { a; b } }
";

    let (program, diagnostics) = devcmd::parse(input.as_bytes());
    if diagnostics.has_errors() {
        eprintln!("input has errors");
        return;
    }

    for def in program.commands() {
        println!("command {} ({} decorator(s))", def.name, def.decorators.len());
    }
    println!();
    print!("{}", devcmd::format(&program));
}
