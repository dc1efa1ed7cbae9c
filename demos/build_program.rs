//! Build a devcmd program with the builder API and format it.

use devcmd::{Block, CommandDef, Decorator, Program, format};

fn main() {
    let program = Program::new()
        .variable("PORT", "8080")
        .command(CommandDef::new("build").simple("go build ./..."))
        .command(
            CommandDef::new("deploy")
                .decorator(Decorator::function("retry").arg("3"))
                .block(Block::new().simple("make image").simple("make push")),
        )
        .command(CommandDef::new("dev").decorator(Decorator::block(
            "parallel",
            Block::new().simple("npm run watch").simple("go run . -port $PORT"),
        )));

    print!("{}", format(&program));
}
