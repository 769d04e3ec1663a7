//! Core data model for the rame compiler.
//!
//! This crate owns everything the front-end and both back-ends share:
//!
//! - [`ident::Ident`] -- validated identifiers (31 bytes max)
//! - [`symbols::SymbolTable`] -- per-function variable layout
//! - [`ops`] -- binary/unary operator vocabulary
//! - [`node::Ast`] -- the syntax tree, built through constructors that
//!   typecheck, propagate the `NoOp` sentinel and precompute the exact
//!   number of RAM instructions each node will emit
//! - [`pretty`] -- source-faithful rendering used in generated comments
//! - [`error`] -- semantic errors and positioned diagnostics
//!
//! There is deliberately no process-wide state: the "current" symbol table
//! of the historical implementation is an explicit parameter everywhere.

pub mod error;
pub mod ident;
pub mod node;
pub mod ops;
pub mod pretty;
pub mod symbols;

pub use error::{Diagnostic, SemanticError};
pub use ident::Ident;
pub use node::{Ast, AstKind, ExprList, Program};
pub use ops::{BinaryOp, OpKind, UnaryOp};
pub use symbols::{Symbol, SymbolKind, SymbolTable};
