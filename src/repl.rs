// File: src/repl.rs
//
// Interactive REPL, echoing the inspect form of the last popped value;
// `exit` terminates. Input is buffered across prompts until braces/
// brackets/parens balance, so a multi-line `def`/`if`/`for` reads the same
// as it would from a file. Each completed chunk is parsed against the same
// symbol table (`Parser::with_table`) and run on the same `VM`, so globals
// and function definitions persist across chunks the way they would across
// statements in a file.

use crate::compiler;
use crate::lexer;
use crate::parser::Parser;
use crate::symbol_table::{self, SymbolTable};
use crate::vm::VM;
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

pub fn run(peephole_enabled: bool) -> Result<(), Box<dyn std::error::Error>> {
    let mut editor = DefaultEditor::new()?;
    let mut symbols: SymbolTable = symbol_table::new_global();
    crate::builtins::register(&symbols);
    let mut machine = VM::new();
    let mut buffer = String::new();

    println!("{}", "ruffle REPL — type 'exit' to quit".bright_cyan());

    loop {
        let prompt = if buffer.is_empty() { "ruffle> " } else { "....... " };
        match editor.readline(prompt) {
            Ok(line) => {
                let _ = editor.add_history_entry(line.as_str());
                if buffer.is_empty() && line.trim() == "exit" {
                    break;
                }
                buffer.push_str(&line);
                buffer.push('\n');
                if !is_input_complete(&buffer) {
                    continue;
                }
                let input = std::mem::take(&mut buffer);
                if input.trim().is_empty() {
                    continue;
                }
                symbols = eval_line(&input, symbols, &mut machine, peephole_enabled);
            }
            Err(ReadlineError::Interrupted) => {
                buffer.clear();
                continue;
            }
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("{} {}", "Error:".red().bold(), err);
                break;
            }
        }
    }

    Ok(())
}

/// Balances braces/brackets/parens (respecting string literals and `#`
/// comments) so a `def`/`if`/`for` body can be typed across several
/// `readline` calls before being parsed as one unit.
fn is_input_complete(input: &str) -> bool {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return true;
    }
    let (mut braces, mut brackets, mut parens) = (0i32, 0i32, 0i32);
    let mut in_string: Option<char> = None;
    let mut in_comment = false;
    for ch in trimmed.chars() {
        if in_comment {
            if ch == '\n' {
                in_comment = false;
            }
            continue;
        }
        match in_string {
            Some(quote) => {
                if ch == quote {
                    in_string = None;
                }
            }
            None => match ch {
                '"' | '\'' => in_string = Some(ch),
                '#' => in_comment = true,
                '{' => braces += 1,
                '}' => braces -= 1,
                '[' => brackets += 1,
                ']' => brackets -= 1,
                '(' => parens += 1,
                ')' => parens -= 1,
                _ => {}
            },
        }
    }
    in_string.is_none() && braces <= 0 && brackets <= 0 && parens <= 0
}

/// Runs one accumulated, brace-balanced chunk of input and returns the
/// (possibly-grown) symbol table to carry into the next chunk.
fn eval_line(line: &str, symbols: SymbolTable, machine: &mut VM, peephole_enabled: bool) -> SymbolTable {
    let (tokens, lex_errors) = lexer::tokenize(line);
    if lex_errors.has_errors() {
        for err in lex_errors.errors() {
            eprintln!("{}", err);
        }
        return symbols;
    }

    let mut p = Parser::with_table(tokens, symbols);
    let program = p.parse_program();
    let symbols = p.symbol_table;
    if p.errors.has_errors() {
        for err in p.errors.errors() {
            eprintln!("{}", err);
        }
        return symbols;
    }

    let (bytecode, compile_errors) = compiler::compile(&program, symbols, true, peephole_enabled);
    if compile_errors.has_errors() {
        for err in compile_errors.errors() {
            eprintln!("{}", err);
        }
        return bytecode.symbol_table;
    }

    let symbols_after = bytecode.symbol_table.clone();
    if let Err(err) = machine.run(bytecode) {
        eprintln!("{}", err);
    }
    symbols_after
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_expression_is_complete() {
        assert!(is_input_complete("1 + 2\n"));
    }

    #[test]
    fn open_brace_is_incomplete() {
        assert!(!is_input_complete("def f(n) {\n"));
    }

    #[test]
    fn balanced_multiline_def_is_complete() {
        assert!(is_input_complete("def f(n) {\nreturn n\n}\n"));
    }

    #[test]
    fn brace_inside_string_does_not_count() {
        assert!(is_input_complete("print(\"{\")\n"));
    }

    #[test]
    fn comment_hides_trailing_brace() {
        assert!(is_input_complete("1 + 2 # { not a real brace\n"));
    }

    #[test]
    fn nested_for_and_if_only_completes_once_every_brace_closes() {
        let mut buf = String::new();
        buf.push_str("for (var i = 0; i < 3; i = i + 1) {\n");
        assert!(!is_input_complete(&buf));
        buf.push_str("if (i == 1) {\n");
        assert!(!is_input_complete(&buf));
        buf.push_str("break\n");
        buf.push_str("}\n");
        assert!(!is_input_complete(&buf));
        buf.push_str("}\n");
        assert!(is_input_complete(&buf));
    }

    #[test]
    fn function_defined_in_one_chunk_is_callable_from_the_next() {
        let mut symbols = symbol_table::new_global();
        crate::builtins::register(&symbols);
        let mut machine = VM::new();

        symbols = eval_line("def f(n) { return n + 1 }\n", symbols, &mut machine, true);
        let slot = symbols.borrow().resolve("f").expect("f defined").index as usize;
        assert!(matches!(machine.global(slot), crate::value::Value::CompiledFunction(_)));
    }

    #[test]
    fn function_result_from_a_later_chunk_matches_direct_call() {
        let mut symbols = symbol_table::new_global();
        crate::builtins::register(&symbols);
        let mut machine = VM::new();

        symbols = eval_line("def f(n) { return n + 1 }\n", symbols, &mut machine, true);
        symbols = eval_line("var got = f(41)\n", symbols, &mut machine, true);
        let got_slot = symbols.borrow().resolve("got").expect("got defined").index as usize;
        assert!(matches!(machine.global(got_slot), crate::value::Value::Int(42)));
    }
}
