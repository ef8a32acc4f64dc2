// File: src/main.rs
//
// Entry point for the `hope` CLI (spec.md §6). Reads a source file,
// runs it through the lex/parse/compile/execute pipeline, and reports
// any fatal error. There is no subcommand structure: one file in, one
// run out.

mod ast;
mod builtins;
mod bytecode;
mod compiler;
mod errors;
mod hope;
mod lexer;
mod parser;
mod symbol_table;
mod token;
mod value;
mod vm;

use clap::Parser as ClapParser;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use crate::compiler::Compiler;
use crate::vm::VM;

#[derive(ClapParser)]
#[command(
    name = "hope",
    about = "hope: a scripting language with inline-verified hope blocks",
    version = env!("CARGO_PKG_VERSION"),
    long_about = None
)]
struct Cli {
    /// Path to the hope source file to run.
    #[arg(short, long, default_value = "sourcecode.txt")]
    file: PathBuf,

    /// Skip hope-block verification (for production runs).
    #[arg(short, long)]
    productive: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let source = match fs::read_to_string(&cli.file) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("couldn't read {}: {err}", cli.file.display());
            return ExitCode::FAILURE;
        }
    };

    let memo_dir = cli.file.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or_else(|| std::path::Path::new("."));

    match run(&source, cli.productive, memo_dir) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprint!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(source: &str, productive: bool, memo_dir: &std::path::Path) -> Result<(), errors::HopeError> {
    let tokens = lexer::tokenize(source)?;
    let program = parser::parse(tokens)?;
    let bytecode = Compiler::new(productive, memo_dir).compile(&program)?;
    VM::new(bytecode).run()
}
