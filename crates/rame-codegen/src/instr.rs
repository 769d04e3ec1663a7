//! RAM machine instruction model and textual rendering.
//!
//! The assembly output is one instruction per line. Operands come in three
//! forms: `#k` immediate, `k` direct, `@k` indirect. Jump targets are
//! absolute instruction numbers, counting from 0 at the first emitted
//! instruction. Comments ride at the end of a line after `;`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Operand of `LOAD` and of the arithmetic instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operand {
    /// `#k` — the constant itself.
    Imm(i32),
    /// `k` — the content of cell `k`.
    Dir(u32),
    /// `@k` — the content of the cell whose address is in cell `k`.
    Ind(u32),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Imm(value) => write!(f, "#{value}"),
            Operand::Dir(cell) => write!(f, "{cell}"),
            Operand::Ind(cell) => write!(f, "@{cell}"),
        }
    }
}

/// Target of `STORE`: direct or indirect, never immediate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Address {
    Dir(u32),
    Ind(u32),
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::Dir(cell) => write!(f, "{cell}"),
            Address::Ind(cell) => write!(f, "@{cell}"),
        }
    }
}

/// One RAM machine instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instr {
    Load(Operand),
    Store(Address),
    Add(Operand),
    Sub(Operand),
    Mul(Operand),
    Div(Operand),
    Mod(Operand),
    Inc(u32),
    Dec(u32),
    Jump(u32),
    /// Jump if the accumulator is zero.
    Jumz(u32),
    /// Jump if the accumulator is strictly negative.
    Juml(u32),
    /// Jump if the accumulator is strictly positive.
    Jumg(u32),
    Read,
    Write,
    Nop,
    Stop,
}

impl Instr {
    /// The absolute target of a jump instruction, if any.
    pub fn jump_target(&self) -> Option<u32> {
        match *self {
            Instr::Jump(target)
            | Instr::Jumz(target)
            | Instr::Juml(target)
            | Instr::Jumg(target) => Some(target),
            _ => None,
        }
    }
}

impl fmt::Display for Instr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instr::Load(op) => write!(f, "LOAD {op}"),
            Instr::Store(adr) => write!(f, "STORE {adr}"),
            Instr::Add(op) => write!(f, "ADD {op}"),
            Instr::Sub(op) => write!(f, "SUB {op}"),
            Instr::Mul(op) => write!(f, "MUL {op}"),
            Instr::Div(op) => write!(f, "DIV {op}"),
            Instr::Mod(op) => write!(f, "MOD {op}"),
            Instr::Inc(cell) => write!(f, "INC {cell}"),
            Instr::Dec(cell) => write!(f, "DEC {cell}"),
            Instr::Jump(target) => write!(f, "JUMP {target}"),
            Instr::Jumz(target) => write!(f, "JUMZ {target}"),
            Instr::Juml(target) => write!(f, "JUML {target}"),
            Instr::Jumg(target) => write!(f, "JUMG {target}"),
            Instr::Read => write!(f, "READ"),
            Instr::Write => write!(f, "WRITE"),
            Instr::Nop => write!(f, "NOP"),
            Instr::Stop => write!(f, "STOP"),
        }
    }
}

/// An instruction with its optional trailing comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Line {
    pub instr: Instr,
    pub comment: Option<String>,
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.comment {
            Some(comment) => write!(f, "{} ; {}", self.instr, comment),
            None => write!(f, "{}", self.instr),
        }
    }
}

/// A complete emitted program image.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RamProgram {
    pub(crate) lines: Vec<Line>,
}

impl RamProgram {
    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    /// Number of instructions in the image.
    pub fn len(&self) -> u32 {
        self.lines.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

impl fmt::Display for RamProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.lines {
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}
