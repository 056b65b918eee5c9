//! tern
//!
//! A small class-based scripting language: single inheritance with
//! defining-class `super` dispatch, strict call arity with stack traces, and
//! lazy iterators that end on a sentinel value.

pub mod ast;
pub mod config;
pub mod error;
pub mod interp;
pub mod lexer;
pub mod parser;
pub mod repl;

pub use ast::{Program, Span};
pub use config::RunConfig;
pub use error::{CompileError, Result};
pub use interp::{Interpreter, RuntimeError, Value};

/// Anything that can stop a script: a compile error or a runtime error
#[derive(Debug, thiserror::Error)]
pub enum TernError {
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

/// Tokenize and parse a source file
pub fn parse_source(filename: &str, source: &str) -> Result<Program> {
    let tokens = lexer::tokenize(source)?;
    parser::parse(filename, source, tokens)
}

/// Parse `source` and run it on `interp`
pub fn run_source(
    interp: &mut Interpreter,
    filename: &str,
    source: &str,
) -> std::result::Result<Value, TernError> {
    let program = parse_source(filename, source)?;
    Ok(interp.run(&program)?)
}
