//! Lowering pass and LLVM object-file back-end.
//!
//! The [`lower`] pass rewrites the checked tree into a much smaller IR
//! ([`hir::Hir`]): arrays become per-cell indexed accesses, the `LIRE` and
//! `AFFICHER` intrinsics become calls to reserved external functions, and
//! statement sequences become plain vectors. That pass has no LLVM
//! dependency and always compiles.
//!
//! The [`codegen`] module (cargo feature `llvm`) drives inkwell over the
//! lowered functions to produce a native object file. Programs compute in
//! 16-bit integers on this path; the reference runtime for linking the
//! result lives in `runtime/rame_rt.c` at the repository root.

pub mod hir;
pub mod intrinsics;
pub mod lower;

#[cfg(feature = "llvm")]
pub mod codegen;

pub use hir::{Hir, HirFn};
pub use lower::lower_program;

#[cfg(feature = "llvm")]
pub use codegen::{compile_ir, compile_object, LlvmError};
