//! The syntax tree and its constructors.
//!
//! Constructors are the type checker: each one validates its operands
//! against the symbol table, computes the exact number of RAM instructions
//! the node will emit (`ninst`), and propagates the `NoOp` sentinel.
//!
//! # NoOp contagion
//!
//! [`AstKind::Nop`] marks a construct that compiles to nothing (the only
//! source of one is an access to a zero-length array). It is contagious:
//! an expression combining `Nop` with anything collapses to `Nop`, a `Nop`
//! in an expression list poisons the whole list, and a `Nop` statement
//! disappears from its sequence. No diagnostic is emitted for any of this.
//!
//! # Instruction counts
//!
//! `ninst` is fixed at construction from the emission formulas of the RAM
//! back-end, which asserts after every node that the instruction pointer
//! advanced by exactly `ninst`. This is what makes forward jump targets
//! computable without patching.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::error::SemanticError;
use crate::ident::Ident;
use crate::ops::{BinaryOp, OpKind, UnaryOp};
use crate::symbols::{SymbolKind, SymbolTable};

/// A node of the syntax tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ast {
    ninst: u32,
    kind: AstKind,
}

/// Node payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AstKind {
    /// Compiles to nothing; see the module docs for the contagion rule.
    Nop,

    /// An integer literal.
    Int { value: i32 },

    /// A scalar variable read.
    Var { ident: Ident },

    /// An array cell read, `t[i]`.
    Index { ident: Ident, index: Box<Ast> },

    /// A binary operation.
    BinaryOp {
        op: BinaryOp,
        lhs: Box<Ast>,
        rhs: Box<Ast>,
    },

    /// A unary operation.
    UnaryOp { op: UnaryOp, expr: Box<Ast> },

    /// `x := e`.
    AssignScalar { ident: Ident, expr: Box<Ast> },

    /// `t[i] := e`.
    AssignIndexed {
        ident: Ident,
        index: Box<Ast>,
        expr: Box<Ast>,
    },

    /// `t := { e1, …, en }`.
    AssignIntList { ident: Ident, values: Vec<Ast> },

    /// `dst := [src]`, an array-to-array copy.
    AssignArray { dst: Ident, src: Ident },

    /// `SI … ALORS … [SINON …] FSI`. At least one branch is present.
    Test {
        cond: Box<Ast>,
        therefore: Option<Box<Ast>>,
        alternative: Option<Box<Ast>>,
    },

    /// `TQ … FAIRE … FTQ`.
    While { cond: Box<Ast>, body: Box<Ast> },

    /// `LIRE x`.
    Read { ident: Ident },

    /// `LIRE t[i]`.
    ReadIndexed { ident: Ident, index: Box<Ast> },

    /// `LIRE [t]`, one read per cell. The length is resolved at
    /// construction so neither printing nor emission needs the table.
    ReadArray { ident: Ident, len: u32 },

    /// `AFFICHER e`.
    Print { expr: Box<Ast> },

    /// `AFFICHER [t]`, one write per cell.
    PrintArray { ident: Ident, len: u32 },

    /// A statement sequence. Canonical form: every element is a non-`Block`,
    /// non-`Nop` statement, and the vector is non-empty.
    Block { stmts: Vec<Ast> },

    /// A function definition, owning its symbol table.
    Fn {
        ident: Ident,
        params: SmallVec<[Ident; 4]>,
        body: Option<Box<Ast>>,
        st: SymbolTable,
    },

    /// A function call. The callee is resolved by the back-ends.
    FnCall { ident: Ident, args: Vec<Ast> },

    /// `RENVOYER [e]`.
    Return { expr: Option<Box<Ast>> },
}

/// An expression list under construction (`{ … }` literals, call
/// arguments). Pushing a `Nop` poisons the whole list; the length keeps
/// counting so size checks still see how many elements were written.
#[derive(Debug, Clone, Default)]
pub struct ExprList {
    items: Vec<Ast>,
    len: usize,
    poisoned: bool,
}

impl ExprList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, item: Ast) {
        self.len += 1;
        if item.is_nop() {
            self.poisoned = true;
            self.items.clear();
        } else if !self.poisoned {
            self.items.push(item);
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    fn ninst(&self) -> u32 {
        self.items.iter().map(Ast::ninst).sum()
    }

    fn into_items(self) -> Vec<Ast> {
        self.items
    }
}

impl FromIterator<Ast> for ExprList {
    fn from_iter<I: IntoIterator<Item = Ast>>(iter: I) -> Self {
        let mut list = ExprList::new();
        for item in iter {
            list.push(item);
        }
        list
    }
}

/// A checked program: the list of its functions, in declaration order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Program {
    pub functions: Vec<Ast>,
}

impl Ast {
    /// Number of RAM instructions this node emits.
    pub fn ninst(&self) -> u32 {
        self.ninst
    }

    pub fn kind(&self) -> &AstKind {
        &self.kind
    }

    pub fn is_nop(&self) -> bool {
        matches!(self.kind, AstKind::Nop)
    }

    /// Leaves render without parentheses under a binary operator.
    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, AstKind::Int { .. } | AstKind::Var { .. })
    }

    fn nop() -> Ast {
        Ast {
            ninst: 0,
            kind: AstKind::Nop,
        }
    }

    /// An integer literal. Emits `LOAD #v`.
    pub fn int(value: i32) -> Ast {
        Ast {
            ninst: 1,
            kind: AstKind::Int { value },
        }
    }

    /// A scalar read. The identifier must name a scalar.
    pub fn var(st: &SymbolTable, ident: Ident) -> Result<Ast, SemanticError> {
        let symbol = st.find_or_err(&ident)?;
        if symbol.kind.is_array() {
            return Err(SemanticError::ScalarExpected(ident));
        }

        Ok(Ast {
            ninst: 3,
            kind: AstKind::Var { ident },
        })
    }

    /// An array cell read. A constant index folds into the address
    /// computation, so it costs nothing on top of the three base
    /// instructions.
    pub fn index(st: &SymbolTable, ident: Ident, index: Ast) -> Result<Ast, SemanticError> {
        let symbol = st.find_or_err(&ident)?;
        match symbol.kind {
            SymbolKind::Scalar => Err(SemanticError::NotIndexable(ident)),
            SymbolKind::Array(0) => Ok(Ast::nop()),
            SymbolKind::Array(_) => {
                if index.is_nop() {
                    return Ok(Ast::nop());
                }

                let index_cost = if matches!(index.kind, AstKind::Int { .. }) {
                    0
                } else {
                    index.ninst
                };
                Ok(Ast {
                    ninst: 3 + index_cost,
                    kind: AstKind::Index {
                        ident,
                        index: Box::new(index),
                    },
                })
            }
        }
    }

    /// A binary operation. Costs on top of the operands:
    /// arithmetic 4, comparison 8, `ET` 3, `OU` 4, `OU EXCLUSIF` 10.
    pub fn binary(op: BinaryOp, lhs: Ast, rhs: Ast) -> Ast {
        if lhs.is_nop() || rhs.is_nop() {
            return Ast::nop();
        }

        let op_cost = match op.kind() {
            OpKind::Arithmetic => 4,
            OpKind::Comparative => 8,
            OpKind::Logic => match op {
                BinaryOp::And => 3,
                BinaryOp::Or => 4,
                BinaryOp::Xor => 10,
                _ => unreachable!(),
            },
        };
        Ast {
            ninst: lhs.ninst + rhs.ninst + op_cost,
            kind: AstKind::BinaryOp {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
        }
    }

    /// A unary operation: 3 extra instructions for `-`, 4 for `NON`.
    pub fn unary(op: UnaryOp, expr: Ast) -> Ast {
        if expr.is_nop() {
            return Ast::nop();
        }

        let op_cost = match op {
            UnaryOp::Neg => 3,
            UnaryOp::Not => 4,
        };
        Ast {
            ninst: expr.ninst + op_cost,
            kind: AstKind::UnaryOp {
                op,
                expr: Box::new(expr),
            },
        }
    }

    /// `x := e` on a scalar target.
    pub fn assign_scalar(st: &SymbolTable, ident: Ident, expr: Ast) -> Result<Ast, SemanticError> {
        let symbol = st.find_or_err(&ident)?;
        if symbol.kind.is_array() {
            return Err(SemanticError::ScalarToArray(ident));
        }
        if expr.is_nop() {
            return Ok(Ast::nop());
        }

        Ok(Ast {
            ninst: expr.ninst + 6,
            kind: AstKind::AssignScalar {
                ident,
                expr: Box::new(expr),
            },
        })
    }

    /// `t[i] := e` on an array target.
    pub fn assign_indexed(
        st: &SymbolTable,
        ident: Ident,
        index: Ast,
        expr: Ast,
    ) -> Result<Ast, SemanticError> {
        let symbol = st.find_or_err(&ident)?;
        match symbol.kind {
            SymbolKind::Scalar => Err(SemanticError::NotIndexable(ident)),
            SymbolKind::Array(0) => Ok(Ast::nop()),
            SymbolKind::Array(_) => {
                if index.is_nop() || expr.is_nop() {
                    return Ok(Ast::nop());
                }

                Ok(Ast {
                    ninst: index.ninst + expr.ninst + 8,
                    kind: AstKind::AssignIndexed {
                        ident,
                        index: Box::new(index),
                        expr: Box::new(expr),
                    },
                })
            }
        }
    }

    /// `t := { … }`. The literal must have exactly as many elements as the
    /// array has cells; the check runs before the poison collapse so a
    /// wrong length is reported even when an element was `Nop`.
    pub fn assign_int_list(
        st: &SymbolTable,
        ident: Ident,
        values: ExprList,
    ) -> Result<Ast, SemanticError> {
        let symbol = st.find_or_err(&ident)?;
        let len = match symbol.kind {
            SymbolKind::Scalar => return Err(SemanticError::ArrayToScalar(ident)),
            SymbolKind::Array(len) => len,
        };

        if values.len() as u32 != len {
            return Err(SemanticError::ListLengthMismatch);
        }
        if values.is_poisoned() || len == 0 {
            return Ok(Ast::nop());
        }

        let ninst = 3 + values.ninst() + 2 * len;
        Ok(Ast {
            ninst,
            kind: AstKind::AssignIntList {
                ident,
                values: values.into_items(),
            },
        })
    }

    /// `dst := [src]` between two arrays of the same length.
    pub fn assign_array(st: &SymbolTable, dst: Ident, src: Ident) -> Result<Ast, SemanticError> {
        let dst_sym = st.find_or_err(&dst)?;
        let src_sym = st.find_or_err(&src)?;

        let src_len = match src_sym.kind {
            SymbolKind::Scalar => return Err(SemanticError::ArrayRequired(src)),
            SymbolKind::Array(len) => len,
        };
        let dst_len = match dst_sym.kind {
            SymbolKind::Scalar => return Err(SemanticError::ArrayToScalar(dst)),
            SymbolKind::Array(len) => len,
        };
        if src_len != dst_len {
            return Err(SemanticError::CopyLengthMismatch);
        }

        Ok(Ast {
            ninst: 3 + dst_len * 5,
            kind: AstKind::AssignArray { dst, src },
        })
    }

    /// `SI … ALORS … SINON … FSI`. Collapses to `Nop` when both branches
    /// are absent (whatever the condition costs, nothing depends on it).
    pub fn test(cond: Ast, therefore: Option<Ast>, alternative: Option<Ast>) -> Ast {
        let therefore = therefore.filter(|n| !n.is_nop());
        let alternative = alternative.filter(|n| !n.is_nop());

        if therefore.is_none() && alternative.is_none() {
            return Ast::nop();
        }
        if cond.is_nop() {
            return Ast::nop();
        }

        let ninst = cond.ninst
            + 1
            + therefore.as_ref().map_or(0, |t| t.ninst)
            + alternative.as_ref().map_or(2, |a| 4 + a.ninst);
        Ast {
            ninst,
            kind: AstKind::Test {
                cond: Box::new(cond),
                therefore: therefore.map(Box::new),
                alternative: alternative.map(Box::new),
            },
        }
    }

    /// `TQ … FAIRE … FTQ`. Collapses to `Nop` when the body is empty.
    pub fn while_loop(cond: Ast, body: Option<Ast>) -> Ast {
        let Some(body) = body.filter(|n| !n.is_nop()) else {
            return Ast::nop();
        };
        if cond.is_nop() {
            return Ast::nop();
        }

        Ast {
            ninst: cond.ninst + body.ninst + 2,
            kind: AstKind::While {
                cond: Box::new(cond),
                body: Box::new(body),
            },
        }
    }

    /// `LIRE x`. Declares the scalar on first use.
    pub fn read(st: &mut SymbolTable, ident: Ident) -> Result<Ast, SemanticError> {
        st.find_or_create_scalar(&ident)?;

        Ok(Ast {
            ninst: 5,
            kind: AstKind::Read { ident },
        })
    }

    /// `LIRE t[i]` on an existing array.
    pub fn read_indexed(st: &SymbolTable, ident: Ident, index: Ast) -> Result<Ast, SemanticError> {
        let symbol = st.find_or_err(&ident)?;
        match symbol.kind {
            SymbolKind::Scalar => Err(SemanticError::NotIndexable(ident)),
            SymbolKind::Array(0) => Ok(Ast::nop()),
            SymbolKind::Array(_) => {
                if index.is_nop() {
                    return Ok(Ast::nop());
                }

                Ok(Ast {
                    ninst: index.ninst + 7,
                    kind: AstKind::ReadIndexed {
                        ident,
                        index: Box::new(index),
                    },
                })
            }
        }
    }

    /// `LIRE [t]` on an existing array.
    pub fn read_array(st: &SymbolTable, ident: Ident) -> Result<Ast, SemanticError> {
        let symbol = st.find_or_err(&ident)?;
        match symbol.kind {
            SymbolKind::Scalar => Err(SemanticError::NotIndexable(ident)),
            SymbolKind::Array(0) => Ok(Ast::nop()),
            SymbolKind::Array(len) => Ok(Ast {
                ninst: 3 + 3 * len,
                kind: AstKind::ReadArray { ident, len },
            }),
        }
    }

    /// `AFFICHER e`.
    pub fn print(expr: Ast) -> Ast {
        if expr.is_nop() {
            return Ast::nop();
        }

        Ast {
            ninst: expr.ninst + 1,
            kind: AstKind::Print {
                expr: Box::new(expr),
            },
        }
    }

    /// `AFFICHER [t]`.
    pub fn print_array(st: &SymbolTable, ident: Ident) -> Result<Ast, SemanticError> {
        let symbol = st.find_or_err(&ident)?;
        match symbol.kind {
            SymbolKind::Scalar => Err(SemanticError::NotIndexable(ident)),
            SymbolKind::Array(0) => Ok(Ast::nop()),
            SymbolKind::Array(len) => Ok(Ast {
                ninst: 3 + 3 * len,
                kind: AstKind::PrintArray { ident, len },
            }),
        }
    }

    /// `t.len()`, the only intrinsic method: folds to an integer leaf.
    pub fn method_call(
        st: &SymbolTable,
        ident: Ident,
        method: &str,
    ) -> Result<Ast, SemanticError> {
        let symbol = st.find_or_err(&ident)?;
        if method != "len" {
            return Err(SemanticError::UnsupportedIntrinsic(method.to_owned()));
        }

        match symbol.kind {
            SymbolKind::Scalar => Err(SemanticError::LenOnScalar(ident)),
            SymbolKind::Array(len) => Ok(Ast::int(len as i32)),
        }
    }

    /// A function definition. The 7 fixed instructions are the two header
    /// comments, the temp-pointer prologue and the trailing `STOP`.
    pub fn function(
        ident: Ident,
        params: impl Into<SmallVec<[Ident; 4]>>,
        body: Option<Ast>,
        st: SymbolTable,
    ) -> Ast {
        let body = body.filter(|n| !n.is_nop());

        Ast {
            ninst: 7 + body.as_ref().map_or(0, |b| b.ninst),
            kind: AstKind::Fn {
                ident,
                params: params.into(),
                body: body.map(Box::new),
                st,
            },
        }
    }

    /// A function call. The callee's existence and arity are checked by the
    /// back-ends, once the whole program is known. The 17 fixed instructions
    /// are the frame push, the return-address push, the jump and the resume
    /// sequence; each argument costs 6 on top of its own evaluation.
    pub fn call(ident: Ident, args: ExprList) -> Ast {
        if args.is_poisoned() {
            return Ast::nop();
        }

        let ninst = 17 + args.ninst() + 6 * args.len() as u32;
        Ast {
            ninst,
            kind: AstKind::FnCall {
                ident,
                args: args.into_items(),
            },
        }
    }

    /// `RENVOYER [e]`. An absent value returns 0, which costs one `LOAD`.
    pub fn ret(expr: Option<Ast>) -> Ast {
        let expr = expr.filter(|n| !n.is_nop());

        Ast {
            ninst: 4 + expr.as_ref().map_or(1, |e| e.ninst),
            kind: AstKind::Return {
                expr: expr.map(Box::new),
            },
        }
    }

    /// Sequences two statements (either possibly already a sequence) into
    /// canonical block form: nested blocks are spliced, `Nop` statements
    /// disappear, and a statement headed by `=` is rejected as a probable
    /// `:=` typo.
    pub fn seq(p: Option<Ast>, q: Option<Ast>) -> Result<Option<Ast>, SemanticError> {
        let p = p.filter(|n| !n.is_nop());
        let q = q.filter(|n| !n.is_nop());

        for side in [&p, &q] {
            if let Some(node) = side {
                if matches!(
                    node.kind,
                    AstKind::BinaryOp {
                        op: BinaryOp::Eq,
                        ..
                    }
                ) {
                    return Err(SemanticError::BareEquality);
                }
            }
        }

        Ok(match (p, q) {
            (None, None) => None,
            (Some(single), None) | (None, Some(single)) => Some(Self::into_block(single)),
            (Some(head), Some(tail)) => {
                let mut stmts = Self::into_stmts(head);
                stmts.extend(Self::into_stmts(tail));
                let ninst = stmts.iter().map(|s| 1 + s.ninst).sum();
                Some(Ast {
                    ninst,
                    kind: AstKind::Block { stmts },
                })
            }
        })
    }

    fn into_block(node: Ast) -> Ast {
        if matches!(node.kind, AstKind::Block { .. }) {
            return node;
        }

        Ast {
            ninst: node.ninst + 1,
            kind: AstKind::Block { stmts: vec![node] },
        }
    }

    fn into_stmts(node: Ast) -> Vec<Ast> {
        match node.kind {
            AstKind::Block { stmts } => stmts,
            _ => vec![node],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(name: &str) -> Ident {
        Ident::new(name).unwrap()
    }

    /// A table with a scalar `x`, a 3-cell array `t` and an empty array `v`.
    fn table() -> SymbolTable {
        let mut st = SymbolTable::new();
        st.create_scalar(&ident("x")).unwrap();
        st.create_array(&ident("t"), 3).unwrap();
        st.create_array(&ident("v"), 0).unwrap();
        st
    }

    #[test]
    fn leaf_costs() {
        let st = table();
        assert_eq!(Ast::int(42).ninst(), 1);
        assert_eq!(Ast::var(&st, ident("x")).unwrap().ninst(), 3);
    }

    #[test]
    fn index_cost_folds_constant_indices() {
        let st = table();
        let constant = Ast::index(&st, ident("t"), Ast::int(2)).unwrap();
        assert_eq!(constant.ninst(), 3);

        let dynamic = Ast::index(&st, ident("t"), Ast::var(&st, ident("x")).unwrap()).unwrap();
        assert_eq!(dynamic.ninst(), 6);
    }

    #[test]
    fn binary_costs_by_class() {
        let one = || Ast::int(1);
        assert_eq!(Ast::binary(BinaryOp::Add, one(), one()).ninst(), 6);
        assert_eq!(Ast::binary(BinaryOp::Le, one(), one()).ninst(), 10);
        assert_eq!(Ast::binary(BinaryOp::And, one(), one()).ninst(), 5);
        assert_eq!(Ast::binary(BinaryOp::Or, one(), one()).ninst(), 6);
        assert_eq!(Ast::binary(BinaryOp::Xor, one(), one()).ninst(), 12);
    }

    #[test]
    fn var_rejects_arrays_and_index_rejects_scalars() {
        let st = table();
        assert_eq!(
            Ast::var(&st, ident("t")),
            Err(SemanticError::ScalarExpected(ident("t")))
        );
        assert_eq!(
            Ast::index(&st, ident("x"), Ast::int(0)),
            Err(SemanticError::NotIndexable(ident("x")))
        );
    }

    #[test]
    fn zero_length_array_access_is_nop() {
        let st = table();
        assert!(Ast::index(&st, ident("v"), Ast::int(0)).unwrap().is_nop());
        assert!(Ast::read_array(&st, ident("v")).unwrap().is_nop());
        assert!(Ast::print_array(&st, ident("v")).unwrap().is_nop());
        assert!(Ast::assign_indexed(&st, ident("v"), Ast::int(0), Ast::int(1))
            .unwrap()
            .is_nop());
    }

    #[test]
    fn nop_contagion_through_expressions() {
        let st = table();
        let nop = Ast::index(&st, ident("v"), Ast::int(0)).unwrap();

        let sum = Ast::binary(BinaryOp::Add, Ast::int(1), nop.clone());
        assert!(sum.is_nop());
        assert_eq!(sum.ninst(), 0);

        assert!(Ast::unary(UnaryOp::Not, nop.clone()).is_nop());
        assert!(Ast::print(nop.clone()).is_nop());
        assert!(Ast::assign_scalar(&st, ident("x"), nop.clone())
            .unwrap()
            .is_nop());

        let mut args = ExprList::new();
        args.push(Ast::int(1));
        args.push(nop);
        assert!(args.is_poisoned());
        assert!(Ast::call(ident("f"), args).is_nop());
    }

    #[test]
    fn test_collapses_without_branches() {
        let cond = Ast::binary(BinaryOp::Lt, Ast::int(1), Ast::int(2));
        assert!(Ast::test(cond, None, None).is_nop());
    }

    #[test]
    fn test_costs() {
        let cond = || Ast::binary(BinaryOp::Lt, Ast::int(1), Ast::int(2)); // 10
        let then = || Ast::print(Ast::int(1)); // 2
        let alt = || Ast::print(Ast::int(0)); // 2

        assert_eq!(Ast::test(cond(), Some(then()), None).ninst(), 15);
        assert_eq!(Ast::test(cond(), Some(then()), Some(alt())).ninst(), 19);
        assert_eq!(Ast::test(cond(), None, Some(alt())).ninst(), 17);
    }

    #[test]
    fn while_collapses_without_body() {
        let cond = Ast::int(1);
        assert!(Ast::while_loop(cond, None).is_nop());

        let looped = Ast::while_loop(Ast::int(1), Some(Ast::print(Ast::int(2))));
        assert_eq!(looped.ninst(), 1 + 2 + 2);
    }

    #[test]
    fn int_list_checks_length_before_collapsing() {
        let st = table();

        let values: ExprList = [Ast::int(1), Ast::int(2), Ast::int(3)].into_iter().collect();
        let node = Ast::assign_int_list(&st, ident("t"), values).unwrap();
        assert_eq!(node.ninst(), 3 + 3 + 6);

        let short: ExprList = [Ast::int(1)].into_iter().collect();
        assert_eq!(
            Ast::assign_int_list(&st, ident("t"), short),
            Err(SemanticError::ListLengthMismatch)
        );

        // poisoned list of the right length still collapses to Nop
        let nop = Ast::index(&st, ident("v"), Ast::int(0)).unwrap();
        let poisoned: ExprList = [Ast::int(1), nop, Ast::int(3)].into_iter().collect();
        assert!(Ast::assign_int_list(&st, ident("t"), poisoned)
            .unwrap()
            .is_nop());
    }

    #[test]
    fn array_copy_requires_equal_lengths() {
        let mut st = table();
        st.create_array(&ident("u"), 3).unwrap();
        st.create_array(&ident("w"), 2).unwrap();

        let copy = Ast::assign_array(&st, ident("u"), ident("t")).unwrap();
        assert_eq!(copy.ninst(), 3 + 15);

        assert_eq!(
            Ast::assign_array(&st, ident("w"), ident("t")),
            Err(SemanticError::CopyLengthMismatch)
        );
        assert_eq!(
            Ast::assign_array(&st, ident("t"), ident("x")),
            Err(SemanticError::ArrayRequired(ident("x")))
        );
    }

    #[test]
    fn read_declares_scalars_on_first_use() {
        let mut st = SymbolTable::new();
        let node = Ast::read(&mut st, ident("n")).unwrap();
        assert_eq!(node.ninst(), 5);
        assert!(st.find(&ident("n")).unwrap().kind.is_scalar());
    }

    #[test]
    fn method_call_len_folds_to_int() {
        let st = table();
        let node = Ast::method_call(&st, ident("t"), "len").unwrap();
        assert_eq!(node.kind(), &AstKind::Int { value: 3 });

        assert_eq!(
            Ast::method_call(&st, ident("t"), "pop"),
            Err(SemanticError::UnsupportedIntrinsic("pop".to_owned()))
        );
        assert_eq!(
            Ast::method_call(&st, ident("x"), "len"),
            Err(SemanticError::LenOnScalar(ident("x")))
        );
    }

    #[test]
    fn seq_builds_canonical_blocks() {
        let a = Ast::print(Ast::int(1));
        let b = Ast::print(Ast::int(2));
        let c = Ast::print(Ast::int(3));

        let ab = Ast::seq(Some(a), Some(b)).unwrap().unwrap();
        let abc = Ast::seq(Some(ab), Some(c)).unwrap().unwrap();

        let AstKind::Block { stmts } = abc.kind() else {
            panic!("expected a block");
        };
        assert_eq!(stmts.len(), 3);
        assert!(stmts
            .iter()
            .all(|s| !matches!(s.kind(), AstKind::Block { .. })));
        assert_eq!(abc.ninst(), 3 + 2 + 2 + 2);
    }

    #[test]
    fn seq_drops_nop_statements() {
        let st = table();
        let nop = Ast::read_array(&st, ident("v")).unwrap();

        assert!(Ast::seq(Some(nop.clone()), None).unwrap().is_none());

        let kept = Ast::seq(Some(nop), Some(Ast::print(Ast::int(1))))
            .unwrap()
            .unwrap();
        let AstKind::Block { stmts } = kept.kind() else {
            panic!("expected a block");
        };
        assert_eq!(stmts.len(), 1);
    }

    #[test]
    fn seq_rejects_bare_equality() {
        let eq = Ast::binary(BinaryOp::Eq, Ast::int(1), Ast::int(2));
        assert_eq!(
            Ast::seq(Some(eq), None),
            Err(SemanticError::BareEquality)
        );

        let eq = Ast::binary(BinaryOp::Eq, Ast::int(1), Ast::int(2));
        let print = Ast::print(Ast::int(1));
        assert_eq!(
            Ast::seq(Some(print), Some(eq)),
            Err(SemanticError::BareEquality)
        );
    }

    #[test]
    fn function_and_return_costs() {
        let mut st = SymbolTable::new();
        st.create_scalar(&ident("n")).unwrap();

        let body = Ast::ret(Some(Ast::var(&st, ident("n")).unwrap())); // 4 + 3
        let body = Ast::seq(Some(body), None).unwrap().unwrap(); // 8
        let f = Ast::function(ident("id"), vec![ident("n")], Some(body), st);
        assert_eq!(f.ninst(), 7 + 8);

        assert_eq!(Ast::ret(None).ninst(), 5);
    }

    #[test]
    fn call_cost() {
        let args: ExprList = [Ast::int(21)].into_iter().collect();
        assert_eq!(Ast::call(ident("double"), args).ninst(), 17 + 1 + 6);
    }
}

#[cfg(test)]
mod properties {
    use proptest::prelude::*;

    use super::*;

    const ALL_OPS: [BinaryOp; 14] = [
        BinaryOp::Add,
        BinaryOp::Sub,
        BinaryOp::Mul,
        BinaryOp::Div,
        BinaryOp::Mod,
        BinaryOp::Ge,
        BinaryOp::Gt,
        BinaryOp::Le,
        BinaryOp::Lt,
        BinaryOp::Eq,
        BinaryOp::Ne,
        BinaryOp::And,
        BinaryOp::Or,
        BinaryOp::Xor,
    ];

    fn arb_expr() -> impl Strategy<Value = Ast> {
        let leaf = (-100i32..100).prop_map(Ast::int);
        leaf.prop_recursive(3, 16, 2, |inner| {
            prop_oneof![
                (
                    proptest::sample::select(ALL_OPS.to_vec()),
                    inner.clone(),
                    inner.clone()
                )
                    .prop_map(|(op, lhs, rhs)| Ast::binary(op, lhs, rhs)),
                inner.clone().prop_map(|e| Ast::unary(UnaryOp::Neg, e)),
                inner.prop_map(|e| Ast::unary(UnaryOp::Not, e)),
            ]
        })
    }

    /// Independent bottom-up recount of the emission cost formulas.
    fn recount(ast: &Ast) -> u32 {
        match ast.kind() {
            AstKind::Int { .. } => 1,
            AstKind::UnaryOp { op, expr } => {
                recount(expr)
                    + match op {
                        UnaryOp::Neg => 3,
                        UnaryOp::Not => 4,
                    }
            }
            AstKind::BinaryOp { op, lhs, rhs } => {
                let op_cost = match op {
                    BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div
                    | BinaryOp::Mod => 4,
                    BinaryOp::And => 3,
                    BinaryOp::Or => 4,
                    BinaryOp::Xor => 10,
                    _ => 8,
                };
                recount(lhs) + recount(rhs) + op_cost
            }
            other => panic!("generated expressions never contain {other:?}"),
        }
    }

    proptest! {
        #[test]
        fn ninst_is_the_sum_of_its_parts(expr in arb_expr()) {
            prop_assert_eq!(expr.ninst(), recount(&expr));
        }

        #[test]
        fn sequencing_stays_canonical(exprs in proptest::collection::vec(arb_expr(), 1..8)) {
            let count = exprs.len();
            let mut acc = None;
            for expr in exprs {
                acc = Ast::seq(acc, Some(Ast::print(expr))).unwrap();
            }

            let block = acc.unwrap();
            let AstKind::Block { stmts } = block.kind() else {
                panic!("sequencing statements must build a block");
            };
            prop_assert_eq!(stmts.len(), count);
            prop_assert!(
                stmts
                    .iter()
                    .all(|s| !matches!(s.kind(), AstKind::Block { .. } | AstKind::Nop)),
                "block statements must not contain nested blocks or nops"
            );
            prop_assert_eq!(
                block.ninst(),
                stmts.iter().map(|s| 1 + s.ninst()).sum::<u32>()
            );
        }
    }
}
