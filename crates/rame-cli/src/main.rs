//! ALGO compiler CLI.
//!
//! `rame <infile> [-o <outfile>] [--emit ram|ast|object]` compiles one
//! source file. The default back-end writes the textual RAM assembly;
//! `--emit ast` dumps the checked tree as JSON; `--emit object` produces
//! a native object file through LLVM and is only available when the
//! binary was built with the `llvm` cargo feature.
//!
//! Exit codes: 0 on success, 1 on any diagnostic (including usage).

use std::fs;
use std::path::PathBuf;
use std::process;

use clap::{Parser, ValueEnum};

use rame_core::Program;

/// Compilateur ALGO vers machine RAM, avec back-end objet LLVM optionnel.
#[derive(Parser)]
#[command(name = "rame", about = "Compilateur ALGO vers machine RAM")]
struct Cli {
    /// Fichier source à compiler.
    infile: PathBuf,

    /// Fichier de sortie.
    #[arg(short, long, default_value = "a.out")]
    output: PathBuf,

    /// Forme de sortie.
    #[arg(long, value_enum, default_value_t = Emit::Ram)]
    emit: Emit,
}

/// Available output forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Emit {
    /// Textual RAM assembly.
    Ram,
    /// The checked syntax tree, as JSON.
    Ast,
    /// A native object file (requires the `llvm` feature).
    Object,
}

fn main() {
    tracing_subscriber::fmt::init();

    // clap exits with 2 on usage errors by default; the contract here is
    // "1 on any diagnostic"
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            process::exit(1);
        }
    };

    process::exit(run(cli));
}

fn run(cli: Cli) -> i32 {
    let file = cli.infile.display().to_string();
    let source = match fs::read_to_string(&cli.infile) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("{file}: {err}");
            return 1;
        }
    };

    let program = match rame_parse::parse_program(&file, &source) {
        Ok(program) => program,
        Err(diagnostic) => {
            eprintln!("{diagnostic}");
            return 1;
        }
    };

    match cli.emit {
        Emit::Ram => emit_ram(&cli, &program),
        Emit::Ast => emit_ast(&cli, &program),
        Emit::Object => emit_object(&cli, &program),
    }
}

fn emit_ram(cli: &Cli, program: &Program) -> i32 {
    let image = match rame_codegen::emit(program) {
        Ok(image) => image,
        Err(err) => {
            eprintln!("{err}");
            return 1;
        }
    };

    write_output(cli, image.to_string())
}

fn emit_ast(cli: &Cli, program: &Program) -> i32 {
    let json = match serde_json::to_string_pretty(program) {
        Ok(json) => json,
        Err(err) => {
            eprintln!("{err}");
            return 1;
        }
    };

    write_output(cli, json + "\n")
}

#[cfg(feature = "llvm")]
fn emit_object(cli: &Cli, program: &Program) -> i32 {
    let functions = rame_llvm::lower_program(program);
    match rame_llvm::compile_object(&functions, &cli.output) {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("{err}");
            1
        }
    }
}

#[cfg(not(feature = "llvm"))]
fn emit_object(_cli: &Cli, _program: &Program) -> i32 {
    eprintln!("rame a été compilé sans le back-end objet (feature 'llvm')");
    1
}

fn write_output(cli: &Cli, contents: String) -> i32 {
    match fs::write(&cli.output, contents) {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("{}: {err}", cli.output.display());
            1
        }
    }
}
