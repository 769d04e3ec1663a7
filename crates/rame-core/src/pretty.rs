//! Source-faithful rendering of the tree.
//!
//! This is what the RAM back-end embeds in its generated comments, so the
//! output must be deterministic: operands of a binary operator are
//! parenthesized exactly when they are not leaves, integer lists render as
//! `{ v1, v2 }`, and the special forms reuse their source keywords.
//! Control nodes only print their condition (`SI c`, `TQ c`); their bodies
//! are rendered by the statements they contain.

use std::fmt;

use crate::node::{Ast, AstKind};

impl fmt::Display for Ast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            AstKind::Nop => write!(f, "NoOp"),

            AstKind::Int { value } => write!(f, "{value}"),

            AstKind::Var { ident } => write!(f, "{ident}"),

            AstKind::Index { ident, index } => write!(f, "{ident}[{index}]"),

            AstKind::BinaryOp { op, lhs, rhs } => {
                write_operand(f, lhs)?;
                write!(f, " {} ", op.symbol())?;
                write_operand(f, rhs)
            }

            AstKind::UnaryOp { op, expr } => {
                write!(f, "{}", op.symbol())?;
                write_operand(f, expr)
            }

            AstKind::AssignScalar { ident, expr } => write!(f, "{ident} := {expr}"),

            AstKind::AssignIndexed { ident, index, expr } => {
                write!(f, "{ident}[{index}] := {expr}")
            }

            AstKind::AssignIntList { ident, values } => {
                write!(f, "{ident} := ")?;
                write_int_list(f, values)
            }

            AstKind::AssignArray { dst, src } => write!(f, "{dst} := [{src}]"),

            AstKind::Test { cond, .. } => write!(f, "SI {cond}"),

            AstKind::While { cond, .. } => write!(f, "TQ {cond}"),

            AstKind::Read { ident } => write!(f, "LIRE {ident}"),

            AstKind::ReadIndexed { ident, index } => write!(f, "LIRE {ident}[{index}]"),

            AstKind::ReadArray { ident, len } => write!(f, "LIRE[{len}] {ident}"),

            AstKind::Print { expr } => write!(f, "AFFICHER {expr}"),

            AstKind::PrintArray { ident, .. } => write!(f, "AFFICHER [{ident}]"),

            AstKind::Block { stmts } => {
                for stmt in stmts {
                    writeln!(f, "{stmt}")?;
                }
                Ok(())
            }

            AstKind::Fn { ident, params, .. } => {
                write!(f, "FONCTION {ident}(")?;
                for (i, param) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{param}")?;
                }
                write!(f, ")")
            }

            AstKind::FnCall { ident, args } => {
                write!(f, "{ident}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")
            }

            AstKind::Return { expr } => match expr {
                Some(expr) => write!(f, "RENVOYER {expr}"),
                None => write!(f, "RENVOYER"),
            },
        }
    }
}

/// Leaves print bare, anything else in parentheses.
fn write_operand(f: &mut fmt::Formatter<'_>, operand: &Ast) -> fmt::Result {
    if operand.is_leaf() {
        write!(f, "{operand}")
    } else {
        write!(f, "({operand})")
    }
}

fn write_int_list(f: &mut fmt::Formatter<'_>, values: &[Ast]) -> fmt::Result {
    if values.is_empty() {
        return write!(f, "{{}}");
    }

    write!(f, "{{ ")?;
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{value}")?;
    }
    write!(f, " }}")
}
