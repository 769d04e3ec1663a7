//! Validated identifiers.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::SemanticError;

/// Maximum identifier length in bytes.
pub const MAX_IDENT_LEN: usize = 31;

/// A source identifier, at most [`MAX_IDENT_LEN`] bytes long.
///
/// The bound comes from the wire format of the historical compiler, which
/// stored identifiers in fixed 32-byte buffers; keeping it makes every
/// program accepted here accepted there too.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ident(String);

impl Ident {
    /// Validates and wraps an identifier.
    pub fn new(name: impl Into<String>) -> Result<Self, SemanticError> {
        let name = name.into();
        if name.len() > MAX_IDENT_LEN {
            return Err(SemanticError::IdentTooLong(name));
        }
        Ok(Ident(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for Ident {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Ident {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_short_names() {
        let id = Ident::new("compteur").unwrap();
        assert_eq!(id.as_str(), "compteur");
    }

    #[test]
    fn accepts_31_bytes() {
        let name = "a".repeat(31);
        assert!(Ident::new(name).is_ok());
    }

    #[test]
    fn rejects_32_bytes() {
        let name = "a".repeat(32);
        assert!(matches!(
            Ident::new(name),
            Err(SemanticError::IdentTooLong(_))
        ));
    }

    #[test]
    fn serde_is_transparent() {
        let id = Ident::new("tab").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"tab\"");
    }
}
