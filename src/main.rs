// File: src/main.rs
//
// Entry point: one optional positional file argument, otherwise drops
// into the REPL. `--dump-bytecode` prints the disassembled instruction
// stream instead of running it; `--no-peephole` disables the Update
// (Set+Get fusion) peephole pass in the compiler.

mod ast;
mod builtins;
mod bytecode;
mod code;
mod compiler;
mod errors;
mod lexer;
mod parser;
mod repl;
mod symbol_table;
mod token;
mod value;
mod vm;

use clap::Parser as ClapParser;
use colored::Colorize;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(ClapParser)]
#[command(name = "ruffle", about = "Ruffle: a small bytecode-compiled scripting language", version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Path to a source file to run; omit to start the REPL
    file: Option<PathBuf>,

    /// Print the disassembled bytecode instead of running it
    #[arg(long)]
    dump_bytecode: bool,

    /// Disable the Set+Get -> Update peephole fusion pass
    #[arg(long)]
    no_peephole: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.file {
        Some(path) => run_file(&path, cli.dump_bytecode, !cli.no_peephole),
        None => {
            if let Err(err) = repl::run(!cli.no_peephole) {
                eprintln!("{} {}", "REPL error:".red().bold(), err);
                return ExitCode::FAILURE;
            }
            ExitCode::SUCCESS
        }
    }
}

fn run_file(path: &PathBuf, dump_bytecode: bool, peephole_enabled: bool) -> ExitCode {
    let source = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("{} could not read {}: {}", "Error:".red().bold(), path.display(), e);
            return ExitCode::FAILURE;
        }
    };

    let (tokens, lex_errors) = lexer::tokenize(&source);
    if lex_errors.has_errors() {
        for err in lex_errors.errors() {
            eprintln!("{}", err);
        }
        return ExitCode::FAILURE;
    }

    let (program, symbol_table, parse_errors) = parser::parse(tokens);
    if parse_errors.has_errors() {
        for err in parse_errors.errors() {
            eprintln!("{}", err);
        }
        return ExitCode::FAILURE;
    }

    let (bytecode, compile_errors) = compiler::compile(&program, symbol_table, false, peephole_enabled);
    if compile_errors.has_errors() {
        for err in compile_errors.errors() {
            eprintln!("{}", err);
        }
        return ExitCode::FAILURE;
    }

    if dump_bytecode {
        print!("{}", bytecode);
        return ExitCode::SUCCESS;
    }

    let mut machine = vm::VM::new();
    if let Err(err) = machine.run(bytecode) {
        eprintln!("{}", err);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
