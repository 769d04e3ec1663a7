//! Semantic errors and positioned diagnostics.
//!
//! Every user-facing message is a single French line, rendered by
//! [`Diagnostic`] as `<file>:<line>: <message>`. Internal inconsistencies
//! (a symbol missing after the tree was built, an instruction-count
//! mismatch) are not represented here: those are compiler bugs and panic
//! with an English message.

use thiserror::Error;

use crate::ident::Ident;

/// A semantic error detected while building the syntax tree.
///
/// Construction-time checks cover everything that does not require knowing
/// the final program layout; call arity and unknown functions are only
/// checked by the back-ends.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SemanticError {
    /// Identifier longer than 31 bytes.
    #[error("identifiant trop long: '{0}'")]
    IdentTooLong(String),

    /// Use of a variable that was never declared.
    #[error("variable inconnue: '{0}'")]
    UnknownVariable(Ident),

    /// Second declaration of the same identifier in one table.
    #[error("variable dupliquée: '{0}'")]
    DuplicateIdentifier(Ident),

    /// Array declared with a negative length.
    #[error("'{0}' doit avoir une taille positive")]
    NegativeSize(Ident),

    /// An array was used where a scalar was required.
    #[error("indexation requise: '{0}' est un tableau, un scalaire était attendu")]
    ScalarExpected(Ident),

    /// A scalar was used where an array was required.
    #[error("indexation impossible: '{0}' est un scalaire")]
    NotIndexable(Ident),

    /// A scalar value assigned to a whole array.
    #[error("impossible d'affecter un scalaire au tableau '{0}'")]
    ScalarToArray(Ident),

    /// An array value assigned to a scalar.
    #[error("impossible d'affecter un tableau au scalaire '{0}'")]
    ArrayToScalar(Ident),

    /// `t := { … }` whose literal length differs from the array length.
    #[error("affectation impossible: le tableau n'a pas la taille adéquate")]
    ListLengthMismatch,

    /// Array-to-array copy between arrays of different lengths.
    #[error("affectation impossible: les deux tableaux doivent avoir la même taille")]
    CopyLengthMismatch,

    /// An existing array redeclared or reused as a scalar.
    #[error("'{0}' doit être un scalaire")]
    ScalarRequired(Ident),

    /// An existing scalar reused as an array.
    #[error("'{0}' doit être un tableau")]
    ArrayRequired(Ident),

    /// An existing array redeclared with a different length.
    #[error("'{ident}' doit être un tableau de taille {expected}, taille actuelle: {actual}")]
    ArraySizeMismatch {
        ident: Ident,
        expected: u32,
        actual: u32,
    },

    /// A statement whose top-level operator is `=`; almost always a typo
    /// for `:=`.
    #[error("test d'égalité inutilisé")]
    BareEquality,

    /// A `.method()` other than `len()`.
    #[error("seule la méthode intrinsèque 'len()' est actuellement acceptée")]
    UnsupportedIntrinsic(String),

    /// `len()` called on a scalar.
    #[error("'len()' n'est pas disponible sur les scalaires")]
    LenOnScalar(Ident),
}

/// A message anchored to a source position.
///
/// Rendered `<file>:<line>: <message>`, the only diagnostic shape the
/// driver prints.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{file}:{line}: {message}")]
pub struct Diagnostic {
    pub file: String,
    pub line: u32,
    pub message: String,
}

impl Diagnostic {
    pub fn new(file: impl Into<String>, line: u32, message: impl ToString) -> Self {
        Diagnostic {
            file: file.into(),
            line,
            message: message.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostic_format() {
        let id = Ident::new("x").unwrap();
        let d = Diagnostic::new("essai.algo", 4, SemanticError::UnknownVariable(id));
        assert_eq!(d.to_string(), "essai.algo:4: variable inconnue: 'x'");
    }

    #[test]
    fn messages_are_single_lines() {
        let id = Ident::new("tab").unwrap();
        let errors = [
            SemanticError::NotIndexable(id.clone()),
            SemanticError::ArraySizeMismatch {
                ident: id,
                expected: 3,
                actual: 5,
            },
            SemanticError::BareEquality,
        ];
        for e in errors {
            assert!(!e.to_string().contains('\n'));
        }
    }
}
