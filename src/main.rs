//! CLI tool to validate, format, and inspect devcmd files.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use devcmd::{ContinuationPolicy, Diagnostics, ParseOptions, Program, Source};
use tracing::{debug, info};

/// Front end for devcmd command definition files
#[derive(Parser)]
#[command(name = "devcmd")]
#[command(about = "Validate, format, and inspect devcmd files")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Log level or tracing filter directive
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Keep line continuations verbatim in command text
    #[arg(long, global = true)]
    preserve_continuations: bool,

    /// Reserve an extra name for variables and commands
    #[arg(long = "reserve", value_name = "NAME", global = true)]
    reserved: Vec<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Check if file(s) are valid
    Validate {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Format file(s) and print to stdout
    Fmt {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Check if file(s) are formatted
    Check {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Print the lowered program and diagnostics as JSON
    Dump {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(&args.log_level)
        .with_writer(std::io::stderr)
        .init();

    let mut options = ParseOptions::new();
    if args.preserve_continuations {
        options = options.continuation(ContinuationPolicy::Preserve);
    }
    for name in &args.reserved {
        options = options.reserve(name.as_str());
    }

    let (Command::Validate { files }
    | Command::Fmt { files }
    | Command::Check { files }
    | Command::Dump { files }) = &args.command;

    let mut had_error = false;
    for path in files {
        let content = match fs::read(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("{}: {e}", path.display());
                had_error = true;
                continue;
            }
        };
        debug!(path = %path.display(), bytes = content.len(), "read file");
        let ok = match &args.command {
            Command::Validate { .. } => validate(path, &content, &options),
            Command::Fmt { .. } => fmt(path, &content, &options),
            Command::Check { .. } => check(path, &content, &options),
            Command::Dump { .. } => dump(path, &content, &options),
        };
        if !ok {
            had_error = true;
        }
    }

    if had_error {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn validate(path: &Path, content: &[u8], options: &ParseOptions) -> bool {
    let (program, diagnostics) = devcmd::parse_with(content, options);
    report(path, content, &diagnostics);

    let variables = program.variables().count();
    let commands = program.commands().count();
    let warnings = diagnostics.warnings().count();
    if program.has_errors {
        let errors = diagnostics.errors().count();
        eprintln!("{}: invalid ({errors} error(s), {warnings} warning(s))", path.display());
        false
    } else {
        eprintln!(
            "{}: valid ({variables} variable(s), {commands} command(s), {warnings} warning(s))",
            path.display()
        );
        true
    }
}

fn fmt(path: &Path, content: &[u8], options: &ParseOptions) -> bool {
    match parse_clean(path, content, options) {
        Some(program) => {
            print!("{}", devcmd::format(&program));
            true
        }
        None => false,
    }
}

fn check(path: &Path, content: &[u8], options: &ParseOptions) -> bool {
    let Some(program) = parse_clean(path, content, options) else {
        return false;
    };
    if devcmd::format(&program).as_bytes() == content {
        eprintln!("{}: formatted", path.display());
        true
    } else {
        eprintln!("{}: not formatted", path.display());
        false
    }
}

fn dump(path: &Path, content: &[u8], options: &ParseOptions) -> bool {
    let (program, diagnostics) = devcmd::parse_with(content, options);
    let valid = !program.has_errors;
    let value = serde_json::json!({
        "file": path.display().to_string(),
        "program": program,
        "diagnostics": diagnostics,
    });
    match serde_json::to_string_pretty(&value) {
        Ok(json) => {
            println!("{json}");
            valid
        }
        Err(e) => {
            eprintln!("{}: {e}", path.display());
            false
        }
    }
}

/// Parse a file, printing its diagnostics. Files with errors yield `None`.
fn parse_clean(path: &Path, content: &[u8], options: &ParseOptions) -> Option<Program> {
    let (program, diagnostics) = devcmd::parse_with(content, options);
    report(path, content, &diagnostics);
    if program.has_errors {
        info!(path = %path.display(), "skipping file with errors");
        None
    } else {
        Some(program)
    }
}

fn report(path: &Path, content: &[u8], diagnostics: &Diagnostics) {
    let source = Source::new(content);
    for diagnostic in diagnostics {
        eprintln!("{}: {}", path.display(), diagnostic.render(&source));
    }
}
