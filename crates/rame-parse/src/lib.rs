//! Front-end for the ALGO language: lexer and recursive-descent parser.
//!
//! The parser is the component that drives the [`rame_core`] node
//! constructors; all semantic validation lives in those constructors, and
//! this crate's job is to turn source text into calls against them, with
//! every error wrapped into a positioned [`Diagnostic`].

pub mod lexer;
pub mod parser;

pub use lexer::{lex, Token};
pub use parser::parse_program;

use rame_core::Diagnostic;

/// Errors produced before any semantic analysis happens.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("caractère inattendu: '{0}'")]
    UnexpectedChar(char),

    #[error("constante entière invalide: '{0}'")]
    InvalidInt(String),

    #[error("{expected} attendu, '{found}' trouvé")]
    UnexpectedToken {
        expected: &'static str,
        found: String,
    },

    #[error("fin de fichier inattendue")]
    UnexpectedEof,
}

impl ParseError {
    pub(crate) fn at(self, file: &str, line: u32) -> Diagnostic {
        Diagnostic::new(file, line, self)
    }
}
