//! Tree-walking emitter.
//!
//! Emission is a strict depth-first, left-to-right walk: every node's
//! offset equals the sum of the `ninst` of everything emitted before it,
//! which is what lets forward and backward jumps be computed without
//! patching. After each node the emitter asserts that the instruction
//! pointer advanced by exactly `node.ninst()`; a mismatch is a compiler
//! bug and aborts.
//!
//! # Activation records
//!
//! At a call site, below the callee frame base: the caller pushes its
//! frame pointer, then the literal return address, then stores the
//! argument values into cells `[0, nargs)` of the callee frame (arguments
//! are evaluated last-to-first), sets `FP ← TP` and jumps. The callee
//! prologue computes `TP ← FP + temp_offset`. A return stores the value
//! at `@TP`, pops `FP` down one cell to reach the return address, and
//! jumps to the dispatch routine.
//!
//! # Dynamic return dispatch
//!
//! The machine has no indirect jump, so every return address pushed by a
//! call site is collected in a sorted set, and the routine emitted after
//! the last function compares the address in the accumulator against each
//! point with differential `SUB #delta / JUMZ target` pairs. A final
//! `STOP` guards the unreachable fall-through.

use std::collections::BTreeSet;

use indexmap::IndexMap;

use rame_core::{Ast, AstKind, BinaryOp, Ident, OpKind, Program, SymbolTable, UnaryOp};

use crate::error::CodegenError;
use crate::instr::{Address, Instr, Line, Operand, RamProgram};

/// Address of the first frame: cells 0..=3 are reserved for the
/// accumulator, FP, TP and the scratch pointer.
const FRAME_BASE: i32 = 4;

/// Emits the RAM program image for a checked program.
pub fn emit(program: &Program) -> Result<RamProgram, CodegenError> {
    Emitter::default().run(program)
}

/// Placement of one function in the code segment.
struct FnSlot<'a> {
    adr: u32,
    node: &'a Ast,
}

/// The emission context: output image, instruction pointer, function
/// placement and the return points collected so far.
#[derive(Default)]
struct Emitter<'a> {
    out: Vec<Line>,
    ip: u32,
    functions: IndexMap<Ident, FnSlot<'a>>,
    return_points: BTreeSet<u32>,
    dyn_jump_adr: u32,
}

impl<'a> Emitter<'a> {
    fn run(mut self, program: &'a Program) -> Result<RamProgram, CodegenError> {
        if program.functions.is_empty() {
            return Err(CodegenError::EmptyProgram);
        }

        // preamble: FP starts at the first frame address
        self.plain(Instr::Load(Operand::Imm(FRAME_BASE)));
        self.plain(Instr::Store(Address::Dir(1)));

        self.place_functions(program)?;

        let placed: Vec<&'a Ast> = self.functions.values().map(|slot| slot.node).collect();
        for node in placed {
            self.emit_fn(node)?;
        }

        self.emit_dyn_dispatch();

        tracing::debug!(instructions = self.out.len(), "emission complete");
        Ok(RamProgram { lines: self.out })
    }

    /// Decides where every function lives: `main` first, the others in
    /// declaration order. Also computes the dispatch routine's address,
    /// which return sequences jump to.
    fn place_functions(&mut self, program: &'a Program) -> Result<(), CodegenError> {
        let main = program
            .functions
            .iter()
            .find(|f| fn_ident(f).as_str() == "main")
            .ok_or(CodegenError::MissingMain)?;

        let mut adr = self.ip;
        self.functions
            .insert(fn_ident(main).clone(), FnSlot { adr, node: main });
        adr += main.ninst();

        for node in &program.functions {
            if std::ptr::eq(node, main) {
                continue;
            }

            let ident = fn_ident(node);
            if self.functions.contains_key(ident) {
                return Err(CodegenError::DuplicateFunction(ident.clone()));
            }
            self.functions.insert(ident.clone(), FnSlot { adr, node });
            adr += node.ninst();
        }

        self.dyn_jump_adr = adr;
        tracing::debug!(
            functions = self.functions.len(),
            dispatch_adr = adr,
            "placed functions"
        );
        Ok(())
    }

    // ----- output helpers -------------------------------------------------

    fn plain(&mut self, instr: Instr) {
        self.out.push(Line {
            instr,
            comment: None,
        });
        self.ip += 1;
    }

    fn commented(&mut self, instr: Instr, comment: impl Into<String>) {
        self.out.push(Line {
            instr,
            comment: Some(comment.into()),
        });
        self.ip += 1;
    }

    // ----- functions ------------------------------------------------------

    fn emit_fn(&mut self, node: &Ast) -> Result<(), CodegenError> {
        let AstKind::Fn {
            ident, body, st, ..
        } = node.kind()
        else {
            panic!("entered unreachable code: placed node is not a function");
        };

        let before = self.ip;
        assert_eq!(
            self.functions[ident.as_str()].adr, before,
            "function '{ident}' is not emitted at its placed address"
        );

        self.commented(Instr::Nop, node.to_string());
        self.commented(Instr::Nop, format!("STACK {st}"));
        self.plain(Instr::Load(Operand::Dir(1)));
        self.plain(Instr::Add(Operand::Imm(st.temp_offset() as i32)));
        self.plain(Instr::Store(Address::Dir(2)));
        self.commented(Instr::Nop, "DEBUT");

        if let Some(body) = body {
            self.emit_node(body, st)?;
        }

        self.commented(Instr::Stop, "FIN");

        assert_ninst(node, self.ip - before);
        Ok(())
    }

    // ----- statements and expressions -------------------------------------

    fn emit_node(&mut self, node: &Ast, st: &SymbolTable) -> Result<(), CodegenError> {
        let before = self.ip;

        match node.kind() {
            // constructors collapse no-ops out of every position, but a
            // stray one still must not reach the ninst assertion
            AstKind::Nop => return Ok(()),

            AstKind::Int { value } => {
                self.plain(Instr::Load(Operand::Imm(*value)));
            }

            AstKind::Var { ident } => {
                let symbol = st.find_or_internal_error(ident);
                self.plain(Instr::Load(Operand::Dir(1)));
                self.plain(Instr::Add(Operand::Imm(symbol.base_adr as i32)));
                self.commented(Instr::Load(Operand::Ind(0)), ident.as_str());
            }

            AstKind::Index { ident, index } => {
                let symbol = st.find_or_internal_error(ident);
                if let AstKind::Int { value } = index.kind() {
                    self.plain(Instr::Load(Operand::Dir(1)));
                    self.plain(Instr::Add(Operand::Imm(symbol.base_adr as i32 + value)));
                    self.commented(Instr::Load(Operand::Ind(0)), format!("{ident}[{value}]"));
                } else {
                    let base_adr = symbol.base_adr;
                    self.emit_node(index, st)?;
                    self.plain(Instr::Add(Operand::Dir(1)));
                    self.plain(Instr::Add(Operand::Imm(base_adr as i32)));
                    self.commented(Instr::Load(Operand::Ind(0)), format!("{ident}[{index}]"));
                }
            }

            AstKind::BinaryOp { op, lhs, rhs } => {
                self.emit_binop(*op, lhs, rhs, st)?;
            }

            AstKind::UnaryOp { op, expr } => {
                self.emit_node(expr, st)?;
                match op {
                    UnaryOp::Neg => {
                        self.plain(Instr::Store(Address::Ind(2)));
                        self.plain(Instr::Load(Operand::Imm(0)));
                        self.plain(Instr::Sub(Operand::Ind(2)));
                    }
                    UnaryOp::Not => {
                        let t = self.ip;
                        self.plain(Instr::Jumz(t + 3));
                        self.plain(Instr::Load(Operand::Imm(0)));
                        self.plain(Instr::Jump(t + 4));
                        self.plain(Instr::Load(Operand::Imm(1)));
                    }
                }
            }

            AstKind::AssignScalar { ident, expr } => {
                let base_adr = st.find_or_internal_error(ident).base_adr;
                self.emit_node(expr, st)?;
                self.plain(Instr::Store(Address::Ind(2)));
                self.plain(Instr::Load(Operand::Dir(1)));
                self.plain(Instr::Add(Operand::Imm(base_adr as i32)));
                self.plain(Instr::Store(Address::Dir(3)));
                self.plain(Instr::Load(Operand::Ind(2)));
                self.commented(Instr::Store(Address::Ind(3)), node.to_string());
            }

            AstKind::AssignIndexed { ident, index, expr } => {
                let base_adr = st.find_or_internal_error(ident).base_adr;
                self.emit_node(expr, st)?;
                self.plain(Instr::Store(Address::Ind(2)));
                self.plain(Instr::Inc(2));
                self.emit_node(index, st)?;
                self.plain(Instr::Dec(2));
                self.plain(Instr::Add(Operand::Dir(1)));
                self.plain(Instr::Add(Operand::Imm(base_adr as i32)));
                self.plain(Instr::Store(Address::Dir(3)));
                self.plain(Instr::Load(Operand::Ind(2)));
                self.commented(Instr::Store(Address::Ind(3)), node.to_string());
            }

            AstKind::AssignIntList { ident, values } => {
                let base_adr = st.find_or_internal_error(ident).base_adr;
                self.plain(Instr::Load(Operand::Dir(1)));
                self.plain(Instr::Add(Operand::Imm(base_adr as i32)));
                self.plain(Instr::Store(Address::Dir(3)));

                for (i, value) in values.iter().enumerate() {
                    self.emit_node(value, st)?;
                    self.commented(
                        Instr::Store(Address::Ind(3)),
                        format!("{ident}[{i}] := {value}"),
                    );
                    self.plain(Instr::Inc(3));
                }
            }

            AstKind::AssignArray { dst, src } => {
                let dst_sym = st.find_or_internal_error(dst).clone();
                let src_sym = st.find_or_internal_error(src).clone();

                self.plain(Instr::Load(Operand::Dir(1)));
                self.plain(Instr::Add(Operand::Imm(dst_sym.base_adr as i32)));
                self.commented(Instr::Store(Address::Dir(3)), format!("&{dst}[0]"));

                for i in 0..dst_sym.kind.cells() {
                    self.plain(Instr::Load(Operand::Dir(1)));
                    self.plain(Instr::Add(Operand::Imm((src_sym.base_adr + i) as i32)));
                    self.commented(Instr::Load(Operand::Ind(0)), format!("{src}[{i}]"));
                    self.commented(
                        Instr::Store(Address::Ind(3)),
                        format!("{dst}[{i}] := {src}[{i}]"),
                    );
                    self.plain(Instr::Inc(3));
                }
            }

            AstKind::Test {
                cond,
                therefore,
                alternative,
            } => {
                self.emit_node(cond, st)?;

                let t = self.ip;
                let then_ninst = therefore.as_ref().map_or(0, |n| n.ninst());
                let has_alt = alternative.is_some() as u32;
                self.plain(Instr::Jumz(t + then_ninst + 2 + has_alt));
                self.commented(Instr::Nop, "ALORS");

                if let Some(therefore) = therefore {
                    self.emit_node(therefore, st)?;
                }

                if let Some(alternative) = alternative {
                    let t = self.ip;
                    self.plain(Instr::Jump(t + alternative.ninst() + 2));
                    self.commented(Instr::Nop, "SINON");
                    self.emit_node(alternative, st)?;
                }

                self.commented(Instr::Nop, "FSI");
            }

            AstKind::While { cond, body } => {
                let start = self.ip;
                self.emit_node(cond, st)?;

                let t = self.ip;
                self.plain(Instr::Jumz(t + body.ninst() + 2));
                self.emit_node(body, st)?;
                self.plain(Instr::Jump(start));
            }

            AstKind::Read { ident } => {
                let base_adr = st.find_or_internal_error(ident).base_adr;
                self.plain(Instr::Load(Operand::Dir(1)));
                self.plain(Instr::Add(Operand::Imm(base_adr as i32)));
                self.plain(Instr::Store(Address::Dir(3)));
                self.plain(Instr::Read);
                self.commented(Instr::Store(Address::Ind(3)), ident.as_str());
            }

            AstKind::ReadIndexed { ident, index } => {
                let base_adr = st.find_or_internal_error(ident).base_adr;
                self.emit_node(index, st)?;
                self.plain(Instr::Store(Address::Ind(2)));
                self.plain(Instr::Load(Operand::Dir(1)));
                self.plain(Instr::Add(Operand::Imm(base_adr as i32)));
                self.plain(Instr::Add(Operand::Ind(2)));
                self.commented(Instr::Store(Address::Dir(3)), format!("&{ident}[{index}]"));
                self.plain(Instr::Read);
                self.commented(Instr::Store(Address::Ind(3)), format!("{ident}[{index}]"));
            }

            AstKind::ReadArray { ident, len } => {
                let base_adr = st.find_or_internal_error(ident).base_adr;
                self.plain(Instr::Load(Operand::Dir(1)));
                self.plain(Instr::Add(Operand::Imm(base_adr as i32)));
                self.commented(Instr::Store(Address::Dir(3)), format!("&{ident}[0]"));

                for i in 0..*len {
                    self.plain(Instr::Read);
                    self.commented(Instr::Store(Address::Ind(3)), format!("{ident}[{i}]"));
                    self.plain(Instr::Inc(3));
                }
            }

            AstKind::Print { expr } => {
                self.emit_node(expr, st)?;
                self.plain(Instr::Write);
            }

            AstKind::PrintArray { ident, len } => {
                let base_adr = st.find_or_internal_error(ident).base_adr;
                self.plain(Instr::Load(Operand::Dir(1)));
                self.plain(Instr::Add(Operand::Imm(base_adr as i32)));
                self.commented(Instr::Store(Address::Dir(3)), format!("&{ident}[0]"));

                for i in 0..*len {
                    self.commented(Instr::Load(Operand::Ind(3)), format!("{ident}[{i}]"));
                    self.plain(Instr::Write);
                    self.plain(Instr::Inc(3));
                }
            }

            AstKind::Block { stmts } => {
                for stmt in stmts {
                    self.commented(Instr::Nop, stmt.to_string());
                    self.emit_node(stmt, st)?;
                }
            }

            AstKind::Fn { .. } => {
                panic!("entered unreachable code: nested function definition");
            }

            AstKind::FnCall { ident, args } => {
                self.emit_call(ident, args, st)?;
            }

            AstKind::Return { expr } => {
                match expr {
                    Some(expr) => self.emit_node(expr, st)?,
                    None => self.plain(Instr::Load(Operand::Imm(0))),
                }
                self.plain(Instr::Store(Address::Ind(2)));
                self.plain(Instr::Dec(1));
                self.plain(Instr::Load(Operand::Ind(1)));
                self.plain(Instr::Jump(self.dyn_jump_adr));
            }
        }

        assert_ninst(node, self.ip - before);
        Ok(())
    }

    fn emit_binop(
        &mut self,
        op: BinaryOp,
        lhs: &Ast,
        rhs: &Ast,
        st: &SymbolTable,
    ) -> Result<(), CodegenError> {
        match op.kind() {
            // arithmetic computes directly; comparisons first compute
            // lhs - rhs, then dispatch on the sign of the difference
            OpKind::Arithmetic | OpKind::Comparative => {
                self.emit_node(rhs, st)?;
                self.plain(Instr::Store(Address::Ind(2)));
                self.plain(Instr::Inc(2));

                self.emit_node(lhs, st)?;
                self.plain(Instr::Dec(2));
                self.plain(arith_instr(op, Operand::Ind(2)));

                let t = self.ip;
                match op {
                    BinaryOp::Ge => {
                        // lhs - rhs >= 0  <=>  !((lhs - rhs) < 0)
                        self.plain(Instr::Juml(t + 3));
                        self.plain(Instr::Load(Operand::Imm(1)));
                        self.plain(Instr::Jump(t + 4));
                        self.plain(Instr::Load(Operand::Imm(0)));
                    }
                    BinaryOp::Gt => {
                        self.plain(Instr::Jumg(t + 3));
                        self.plain(Instr::Load(Operand::Imm(0)));
                        self.plain(Instr::Jump(t + 4));
                        self.plain(Instr::Load(Operand::Imm(1)));
                    }
                    BinaryOp::Le => {
                        // lhs - rhs <= 0  <=>  !((lhs - rhs) > 0)
                        self.plain(Instr::Jumg(t + 3));
                        self.plain(Instr::Load(Operand::Imm(1)));
                        self.plain(Instr::Jump(t + 4));
                        self.plain(Instr::Load(Operand::Imm(0)));
                    }
                    BinaryOp::Lt => {
                        self.plain(Instr::Juml(t + 3));
                        self.plain(Instr::Load(Operand::Imm(0)));
                        self.plain(Instr::Jump(t + 4));
                        self.plain(Instr::Load(Operand::Imm(1)));
                    }
                    BinaryOp::Eq => {
                        self.plain(Instr::Jumz(t + 3));
                        self.plain(Instr::Load(Operand::Imm(0)));
                        self.plain(Instr::Jump(t + 4));
                        self.plain(Instr::Load(Operand::Imm(1)));
                    }
                    BinaryOp::Ne => {
                        self.plain(Instr::Jumz(t + 3));
                        self.plain(Instr::Load(Operand::Imm(1)));
                        self.plain(Instr::Jump(t + 4));
                        self.plain(Instr::Load(Operand::Imm(0)));
                    }
                    _ => {}
                }
            }

            OpKind::Logic => match op {
                BinaryOp::And => {
                    // a zero left operand short-circuits with ACC = 0;
                    // otherwise the result is the right operand
                    self.commented(Instr::Nop, format!("TEST ({lhs})"));
                    self.emit_node(lhs, st)?;

                    let t = self.ip;
                    self.plain(Instr::Jumz(t + rhs.ninst() + 2));
                    self.commented(Instr::Nop, format!("TEST ({rhs})"));
                    self.emit_node(rhs, st)?;
                }
                BinaryOp::Or => {
                    // a nonzero left operand short-circuits with its own
                    // value; otherwise the result is the right operand
                    self.commented(Instr::Nop, format!("TEST ({lhs})"));
                    self.emit_node(lhs, st)?;

                    let t = self.ip;
                    self.plain(Instr::Jumz(t + 2));
                    let t = self.ip;
                    self.plain(Instr::Jump(t + rhs.ninst() + 2));
                    self.commented(Instr::Nop, format!("TEST ({rhs})"));
                    self.emit_node(rhs, st)?;
                }
                BinaryOp::Xor => {
                    // both sides must be evaluated; with the left operand
                    // spilled, ACC ends as lhs when rhs == 0, 1 - lhs
                    // otherwise
                    self.commented(Instr::Nop, format!("TEST ({lhs})"));
                    self.emit_node(lhs, st)?;
                    self.plain(Instr::Store(Address::Ind(2)));
                    self.plain(Instr::Inc(2));

                    self.commented(Instr::Nop, format!("TEST ({rhs})"));
                    self.emit_node(rhs, st)?;

                    let t = self.ip;
                    self.commented(Instr::Nop, "OU EXCLUSIF");
                    self.plain(Instr::Dec(2));
                    self.plain(Instr::Jumz(t + 5));
                    self.plain(Instr::Sub(Operand::Ind(2)));
                    self.plain(Instr::Jump(t + 6));
                    self.plain(Instr::Load(Operand::Ind(2)));
                }
                _ => unreachable!(),
            },
        }
        Ok(())
    }

    fn emit_call(
        &mut self,
        ident: &Ident,
        args: &[Ast],
        st: &SymbolTable,
    ) -> Result<(), CodegenError> {
        let start = self.ip;

        // push the caller's frame pointer
        self.plain(Instr::Load(Operand::Dir(1)));
        self.plain(Instr::Store(Address::Ind(2)));
        self.plain(Instr::Inc(2));

        // push the literal return address: right after the jump below
        let args_ninst: u32 = args.iter().map(Ast::ninst).sum();
        let ret = start + 9 + args_ninst + 6 * args.len() as u32;
        self.return_points.insert(ret);
        self.plain(Instr::Load(Operand::Imm(ret as i32)));
        self.plain(Instr::Store(Address::Ind(2)));
        self.plain(Instr::Inc(2));

        let (callee_adr, callee_arity, callee_temp) = {
            let slot = self
                .functions
                .get(ident.as_str())
                .ok_or_else(|| CodegenError::UnknownFunction(ident.clone()))?;
            let AstKind::Fn { params, st, .. } = slot.node.kind() else {
                panic!("entered unreachable code: placed node is not a function");
            };
            (slot.adr, params.len(), st.temp_offset())
        };

        if callee_arity != args.len() {
            return Err(CodegenError::ArityMismatch {
                ident: ident.clone(),
                expected: callee_arity,
                given: args.len(),
            });
        }

        // arguments are guaranteed the bottom cells [0, nargs) of the
        // callee frame, written right above TP; evaluation runs
        // last-to-first
        for (slot_index, arg) in args.iter().enumerate().rev() {
            self.emit_node(arg, st)?;
            self.plain(Instr::Store(Address::Ind(2)));
            self.plain(Instr::Load(Operand::Dir(2)));
            self.plain(Instr::Add(Operand::Imm(slot_index as i32)));
            self.plain(Instr::Store(Address::Dir(3)));
            self.plain(Instr::Load(Operand::Ind(2)));
            self.plain(Instr::Store(Address::Ind(3)));
        }

        assert_eq!(ret, self.ip + 3, "bad jump");

        // activate the callee frame and enter it
        self.plain(Instr::Load(Operand::Dir(2)));
        self.plain(Instr::Store(Address::Dir(1)));
        self.plain(Instr::Jump(callee_adr));

        // resume point: the saved FP sits temp_offset + 2 cells below the
        // callee's TP, the returned value one cell above it
        let delta = (callee_temp + 2) as i32;
        self.plain(Instr::Load(Operand::Dir(2)));
        self.plain(Instr::Sub(Operand::Imm(delta)));
        self.plain(Instr::Store(Address::Dir(2)));
        self.plain(Instr::Load(Operand::Ind(0)));
        self.plain(Instr::Store(Address::Dir(1)));
        self.plain(Instr::Load(Operand::Dir(2)));
        self.plain(Instr::Add(Operand::Imm(delta)));
        self.plain(Instr::Load(Operand::Ind(0)));

        Ok(())
    }

    /// The comparator chain standing in for an indirect jump: on entry the
    /// accumulator holds a return address; each entry subtracts the delta
    /// to the next known point and jumps there on zero.
    fn emit_dyn_dispatch(&mut self) {
        self.commented(Instr::Nop, "BUILTIN JUMP @0");

        let points: Vec<u32> = self.return_points.iter().copied().collect();
        let mut sum = 0;
        for adr in points {
            self.plain(Instr::Sub(Operand::Imm((adr - sum) as i32)));
            self.plain(Instr::Jumz(adr));
            sum = adr;
        }

        self.commented(Instr::Stop, "UNREACHABLE");
    }
}

fn fn_ident(node: &Ast) -> &Ident {
    let AstKind::Fn { ident, .. } = node.kind() else {
        panic!("entered unreachable code: program contains a non-function node");
    };
    ident
}

/// RAM instruction applied by a binary operator against the spilled
/// operand. Comparisons subtract; the sign dispatch follows separately.
fn arith_instr(op: BinaryOp, operand: Operand) -> Instr {
    match op {
        BinaryOp::Add => Instr::Add(operand),
        BinaryOp::Sub => Instr::Sub(operand),
        BinaryOp::Mul => Instr::Mul(operand),
        BinaryOp::Div => Instr::Div(operand),
        BinaryOp::Mod => Instr::Mod(operand),
        BinaryOp::Ge
        | BinaryOp::Gt
        | BinaryOp::Le
        | BinaryOp::Lt
        | BinaryOp::Eq
        | BinaryOp::Ne => Instr::Sub(operand),
        BinaryOp::And | BinaryOp::Or | BinaryOp::Xor => {
            panic!("arith_instr is not defined for logic operators")
        }
    }
}

#[track_caller]
fn assert_ninst(node: &Ast, emitted: u32) {
    assert_eq!(
        emitted,
        node.ninst(),
        "generated {} instructions for the current node, but ninst is {}",
        emitted,
        node.ninst(),
    );
}

#[cfg(test)]
mod tests {
    use rame_core::ExprList;

    use super::*;

    fn ident(name: &str) -> Ident {
        Ident::new(name).unwrap()
    }

    fn main_fn(body: Option<Ast>, st: SymbolTable) -> Ast {
        Ast::function(ident("main"), Vec::new(), body, st)
    }

    #[test]
    fn empty_program_is_rejected() {
        let program = Program { functions: vec![] };
        assert_eq!(emit(&program), Err(CodegenError::EmptyProgram));
    }

    #[test]
    fn missing_main_is_rejected() {
        let f = Ast::function(ident("aux"), Vec::new(), None, SymbolTable::new());
        let program = Program { functions: vec![f] };
        assert_eq!(emit(&program), Err(CodegenError::MissingMain));
    }

    #[test]
    fn duplicate_function_is_rejected() {
        let f = |name: &str| Ast::function(ident(name), Vec::new(), None, SymbolTable::new());
        let program = Program {
            functions: vec![f("main"), f("aux"), f("aux")],
        };
        assert_eq!(
            emit(&program),
            Err(CodegenError::DuplicateFunction(ident("aux")))
        );
    }

    #[test]
    fn duplicate_main_is_rejected() {
        let f = |name: &str| Ast::function(ident(name), Vec::new(), None, SymbolTable::new());
        let program = Program {
            functions: vec![f("main"), f("main")],
        };
        assert_eq!(
            emit(&program),
            Err(CodegenError::DuplicateFunction(ident("main")))
        );
    }

    #[test]
    fn unknown_function_is_rejected() {
        let body = Ast::seq(
            Some(Ast::print(Ast::call(ident("absente"), ExprList::new()))),
            None,
        )
        .unwrap();
        let program = Program {
            functions: vec![main_fn(body, SymbolTable::new())],
        };
        assert_eq!(
            emit(&program),
            Err(CodegenError::UnknownFunction(ident("absente")))
        );
    }

    #[test]
    fn arity_mismatch_is_rejected() {
        let mut st = SymbolTable::new();
        st.create_scalar(&ident("n")).unwrap();
        let callee = Ast::function(ident("f"), vec![ident("n")], None, st);

        let body = Ast::seq(Some(Ast::print(Ast::call(ident("f"), ExprList::new()))), None).unwrap();
        let program = Program {
            functions: vec![main_fn(body, SymbolTable::new()), callee],
        };
        assert_eq!(
            emit(&program),
            Err(CodegenError::ArityMismatch {
                ident: ident("f"),
                expected: 1,
                given: 0,
            })
        );
    }

    #[test]
    fn preamble_initializes_the_frame_pointer() {
        let program = Program {
            functions: vec![main_fn(None, SymbolTable::new())],
        };
        let image = emit(&program).unwrap();
        assert_eq!(image.lines()[0].instr, Instr::Load(Operand::Imm(4)));
        assert_eq!(image.lines()[1].instr, Instr::Store(Address::Dir(1)));
    }

    #[test]
    fn empty_body_emits_exactly_the_frame() {
        // 2 preamble + 7 function frame + 2 dispatch (no return points)
        let program = Program {
            functions: vec![main_fn(None, SymbolTable::new())],
        };
        let image = emit(&program).unwrap();
        assert_eq!(image.len(), 11);
        assert_eq!(image.lines()[10].instr, Instr::Stop);
    }

    #[test]
    fn image_length_matches_the_precomputed_counts() {
        let body = Ast::seq(
            Some(Ast::print(Ast::binary(
                BinaryOp::Add,
                Ast::int(1),
                Ast::int(2),
            ))),
            None,
        )
        .unwrap();
        let f = main_fn(body, SymbolTable::new());
        let ninst = f.ninst();
        let program = Program { functions: vec![f] };

        let image = emit(&program).unwrap();
        assert_eq!(image.len(), 2 + ninst + 2);
    }
}
