mod bytecode;
mod frontend;
mod lang;
mod runtime;

use std::{env, fs, path::Path, process};

use crate::bytecode::compile::Compiler;
use crate::bytecode::disasm::print_program;
use crate::bytecode::ir::CompiledProgram;
use crate::frontend::lexer::Lexer;
use crate::frontend::parser::Parser;
use crate::frontend::token_dumper::TokenDumper;
use crate::lang::ast::Program;
use crate::runtime::vm::Vm;

fn main() {
    let args: Vec<String> = env::args().collect();

    let tokens_only = args.contains(&"--tokens".to_string());
    let no_color = args.contains(&"--no-color".to_string());
    let pretty = args.contains(&"--pretty".to_string());
    let ast = args.contains(&"--ast".to_string());
    let bytecode = args.contains(&"--bc".to_string()) || args.contains(&"--bytecode".to_string());
    let emit = args.contains(&"--emit".to_string());

    // first non-flag argument is the filename
    let filename = args.iter().skip(1).find(|a| !a.starts_with('-'));

    let Some(filename) = filename else {
        print_usage();
        process::exit(if args.len() == 1 { 0 } else { 1 });
    };

    // a .aldc file is a previously emitted image: load and run directly
    if extension(filename) == Some("aldc") {
        run_image(filename);
        return;
    }
    ensure_extension(filename);

    let source = match fs::read_to_string(filename) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("Failed to read '{}': {}", filename, e);
            process::exit(1);
        }
    };

    if tokens_only {
        dump_tokens(&source, no_color, pretty);
        return;
    }

    let program = parse_or_exit(&source);

    if ast {
        println!("{:#?}", program);
        return;
    }

    let compiled = match Compiler::new().compile(&program) {
        Ok(compiled) => compiled,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    };

    if emit {
        emit_image(filename, &compiled);
        return;
    }

    if bytecode {
        print_program(&compiled);
    }

    run_compiled(compiled);
}

fn extension(filename: &str) -> Option<&str> {
    Path::new(filename).extension().and_then(|e| e.to_str())
}

fn ensure_extension(filename: &str) {
    if extension(filename) != Some("ald") {
        eprintln!("Error: expected a .ald file, got {}", filename);
        process::exit(1);
    }
}

fn print_usage() {
    println!("ALDER - expression language on a bytecode VM");
    println!();
    println!("Usage:");
    println!("  alder <file.ald>           Compile and run a program");
    println!("  alder <file.aldc>          Run a compiled image");
    println!("  alder --tokens <file.ald>  Show tokens only (--no-color, --pretty)");
    println!("  alder --ast <file.ald>     Show the parse tree");
    println!("  alder --bc <file.ald>      Show disassembly, then run");
    println!("  alder --emit <file.ald>    Compile to <file>.aldc");
}

fn parse_or_exit(source: &str) -> Program {
    match Parser::from_source(source).parse_program() {
        Ok(program) => program,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    }
}

fn dump_tokens(source: &str, no_color: bool, pretty: bool) {
    let tokens = Lexer::new(source).tokenize();

    let mut dumper = TokenDumper::new();
    if no_color {
        dumper = dumper.no_color();
    }
    if pretty {
        dumper = dumper.pretty();
    }
    dumper.dump(&tokens);
}

fn emit_image(filename: &str, compiled: &CompiledProgram) {
    let out = Path::new(filename).with_extension("aldc");
    let bytes = match compiled.to_bytes() {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Failed to encode image: {}", e);
            process::exit(1);
        }
    };
    if let Err(e) = fs::write(&out, bytes) {
        eprintln!("Failed to write '{}': {}", out.display(), e);
        process::exit(1);
    }
    println!("Wrote {}", out.display());
}

fn run_image(filename: &str) {
    let bytes = match fs::read(filename) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Failed to read '{}': {}", filename, e);
            process::exit(1);
        }
    };
    let compiled = match CompiledProgram::from_bytes(&bytes) {
        Ok(compiled) => compiled,
        Err(e) => {
            eprintln!("Failed to decode '{}': {}", filename, e);
            process::exit(1);
        }
    };
    run_compiled(compiled);
}

fn run_compiled(compiled: CompiledProgram) {
    let mut vm = Vm::new(compiled);
    match vm.run() {
        Ok(Some(value)) => println!("Program result: {}", value),
        Ok(None) => println!("Program finished (no result)"),
        Err(fault) => {
            eprintln!("{}", fault);
            process::exit(1);
        }
    }
}
