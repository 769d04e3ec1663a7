//! Per-function symbol tables.
//!
//! A table maps identifiers to frame-relative addresses. Scalars take one
//! memory cell, arrays as many cells as their declared length. The table
//! also tracks `mem_offset`, the address of the next free cell; once a
//! function is fully parsed this is [`SymbolTable::temp_offset`], the
//! offset of the first scratch cell above its variables.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::SemanticError;
use crate::ident::Ident;

/// What a symbol names: a single cell or a fixed-size array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SymbolKind {
    Scalar,
    Array(u32),
}

impl SymbolKind {
    /// Number of memory cells the symbol occupies.
    pub fn cells(self) -> u32 {
        match self {
            SymbolKind::Scalar => 1,
            SymbolKind::Array(len) => len,
        }
    }

    pub fn is_scalar(self) -> bool {
        matches!(self, SymbolKind::Scalar)
    }

    pub fn is_array(self) -> bool {
        matches!(self, SymbolKind::Array(_))
    }
}

/// A declared variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    pub ident: Ident,
    /// Frame-relative address of the first cell.
    pub base_adr: u32,
    pub kind: SymbolKind,
}

/// An ordered set of symbols with their frame layout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolTable {
    symbols: IndexMap<Ident, Symbol>,
    mem_offset: u32,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, ident: &Ident, kind: SymbolKind) -> Result<Symbol, SemanticError> {
        if self.symbols.contains_key(ident) {
            return Err(SemanticError::DuplicateIdentifier(ident.clone()));
        }

        let symbol = Symbol {
            ident: ident.clone(),
            base_adr: self.mem_offset,
            kind,
        };
        self.mem_offset += kind.cells();
        self.symbols.insert(ident.clone(), symbol.clone());
        Ok(symbol)
    }

    /// Declares a new scalar.
    pub fn create_scalar(&mut self, ident: &Ident) -> Result<Symbol, SemanticError> {
        self.insert(ident, SymbolKind::Scalar)
    }

    /// Declares a new array of `size` cells.
    pub fn create_array(&mut self, ident: &Ident, size: i32) -> Result<Symbol, SemanticError> {
        if size < 0 {
            return Err(SemanticError::NegativeSize(ident.clone()));
        }
        self.insert(ident, SymbolKind::Array(size as u32))
    }

    pub fn find(&self, ident: &Ident) -> Option<&Symbol> {
        self.symbols.get(ident)
    }

    /// Returns the scalar named `ident`, declaring it if absent.
    pub fn find_or_create_scalar(&mut self, ident: &Ident) -> Result<Symbol, SemanticError> {
        match self.symbols.get(ident) {
            Some(symbol) if symbol.kind.is_scalar() => Ok(symbol.clone()),
            Some(_) => Err(SemanticError::ScalarRequired(ident.clone())),
            None => self.create_scalar(ident),
        }
    }

    /// Returns the array named `ident`, declaring it if absent. An existing
    /// array must have exactly `size` cells.
    pub fn find_or_create_array(&mut self, ident: &Ident, size: i32) -> Result<Symbol, SemanticError> {
        match self.symbols.get(ident) {
            Some(symbol) => match symbol.kind {
                SymbolKind::Array(len) if size >= 0 && len == size as u32 => Ok(symbol.clone()),
                SymbolKind::Array(len) => {
                    if size < 0 {
                        Err(SemanticError::NegativeSize(ident.clone()))
                    } else {
                        Err(SemanticError::ArraySizeMismatch {
                            ident: ident.clone(),
                            expected: size as u32,
                            actual: len,
                        })
                    }
                }
                SymbolKind::Scalar => Err(SemanticError::ArrayRequired(ident.clone())),
            },
            None => self.create_array(ident, size),
        }
    }

    /// Lookup that fails with the user-facing "variable inconnue" error.
    /// To be used while the tree is being built.
    pub fn find_or_err(&self, ident: &Ident) -> Result<&Symbol, SemanticError> {
        self.find(ident)
            .ok_or_else(|| SemanticError::UnknownVariable(ident.clone()))
    }

    /// Lookup after the tree is built, where a miss is a compiler bug.
    ///
    /// # Panics
    ///
    /// Panics if the symbol is absent.
    pub fn find_or_internal_error(&self, ident: &Ident) -> &Symbol {
        self.find(ident).unwrap_or_else(|| {
            panic!("illegal state: '{ident}' should exist at this stage but it does not")
        })
    }

    /// Address of the first scratch cell above the declared variables.
    pub fn temp_offset(&self) -> u32 {
        self.mem_offset
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Symbols in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.values()
    }
}

/// Brace-delimited identifier list, as shown in `STACK` comments.
impl fmt::Display for SymbolTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.symbols.is_empty() {
            return write!(f, "{{ }}");
        }

        write!(f, "{{ ")?;
        for (i, ident) in self.symbols.keys().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{ident}")?;
        }
        write!(f, " }}")
    }
}
