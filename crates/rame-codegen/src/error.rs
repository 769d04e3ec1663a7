//! Emission-time errors.
//!
//! These are the checks that need the whole program: function resolution,
//! arity, placement. They carry no source position, since the tree does
//! not either.

use rame_core::Ident;
use thiserror::Error;

/// Errors produced while emitting RAM code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodegenError {
    /// The source file contains no function at all.
    #[error("le fichier source est vide")]
    EmptyProgram,

    /// No function named `main`.
    #[error("pas de fonction principale définie")]
    MissingMain,

    /// Two functions share a name.
    #[error("fonction dupliquée: '{0}'")]
    DuplicateFunction(Ident),

    /// A call to a function that does not exist.
    #[error("fonction inconnue: '{0}'")]
    UnknownFunction(Ident),

    /// A call with the wrong number of arguments.
    #[error("'{ident}()': {expected} paramètres attendus, {given} paramètres donnés")]
    ArityMismatch {
        ident: Ident,
        expected: usize,
        given: usize,
    },
}
