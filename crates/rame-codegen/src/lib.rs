//! RAM machine back-end.
//!
//! Turns a checked [`rame_core::Program`] into a flat sequence of
//! accumulator-machine instructions. The target has no labels and no
//! indirect jump: every jump goes to an absolute instruction number, which
//! is why the tree carries precomputed instruction counts, and why return
//! addresses are dispatched by the synthesized comparator routine at the
//! end of the image (see [`emit`]).
//!
//! # Memory model
//!
//! Cell 0 is the accumulator; `@n` operands indirect through the value of
//! cell `n`, so `LOAD @0` loads from the address currently in the
//! accumulator. Cell 1 is the frame pointer, cell 2 the temp pointer
//! (first free scratch cell above the current frame), cell 3 a scratch
//! pointer for indirect writes. Frames start at address 4.

pub mod emit;
pub mod error;
pub mod instr;

pub use emit::emit;
pub use error::CodegenError;
pub use instr::{Address, Instr, Line, Operand, RamProgram};
