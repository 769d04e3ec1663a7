//! Normalization from the checked tree to [`Hir`].
//!
//! Runs against each function's own symbol table so the whole-array forms
//! can be unrolled into per-cell accesses. The pass never fails: the tree
//! it receives has already been validated by its constructors, so any
//! inconsistency found here is a compiler bug.
//!
//! A function body that does not end in `RENVOYER` is left as-is; the
//! object back-end appends the implicit `RENVOYER 0` itself.

use rame_core::{Ast, AstKind, Program, SymbolTable};

use crate::hir::{Hir, HirFn};
use crate::intrinsics;

/// Lowers every function of a checked program.
pub fn lower_program(program: &Program) -> Vec<HirFn> {
    let lowered: Vec<HirFn> = program.functions.iter().map(lower_fn).collect();
    tracing::debug!(functions = lowered.len(), "lowering complete");
    lowered
}

fn lower_fn(node: &Ast) -> HirFn {
    let AstKind::Fn {
        ident,
        params,
        body,
        st,
    } = node.kind()
    else {
        panic!("entered unreachable code: program contains a non-function node");
    };

    let mut stmts = Vec::new();
    if let Some(body) = body {
        lower_stmt(body, st, &mut stmts);
    }

    HirFn {
        ident: ident.clone(),
        params: params.to_vec(),
        body: stmts,
        st: st.clone(),
    }
}

fn read_call() -> Hir {
    Hir::Call {
        callee: intrinsics::READ.to_owned(),
        args: Vec::new(),
    }
}

fn write_call(arg: Hir) -> Hir {
    Hir::Call {
        callee: intrinsics::WRITE.to_owned(),
        args: vec![arg],
    }
}

fn lower_stmt(node: &Ast, st: &SymbolTable, out: &mut Vec<Hir>) {
    match node.kind() {
        AstKind::Nop => {}

        AstKind::Block { stmts } => {
            for stmt in stmts {
                lower_stmt(stmt, st, out);
            }
        }

        AstKind::AssignScalar { ident, expr } => out.push(Hir::AssignScalar {
            ident: ident.clone(),
            expr: Box::new(lower_expr(expr, st)),
        }),

        AstKind::AssignIndexed { ident, index, expr } => out.push(Hir::AssignIndexed {
            ident: ident.clone(),
            index: Box::new(lower_expr(index, st)),
            expr: Box::new(lower_expr(expr, st)),
        }),

        AstKind::AssignIntList { ident, values } => {
            for (i, value) in values.iter().enumerate() {
                out.push(Hir::AssignIndexed {
                    ident: ident.clone(),
                    index: Box::new(Hir::int(i as i32)),
                    expr: Box::new(lower_expr(value, st)),
                });
            }
        }

        AstKind::AssignArray { dst, src } => {
            let len = st.find_or_internal_error(dst).kind.cells();
            for i in 0..len {
                out.push(Hir::AssignIndexed {
                    ident: dst.clone(),
                    index: Box::new(Hir::int(i as i32)),
                    expr: Box::new(Hir::Index {
                        ident: src.clone(),
                        index: Box::new(Hir::int(i as i32)),
                    }),
                });
            }
        }

        AstKind::Test {
            cond,
            therefore,
            alternative,
        } => {
            let mut then_body = Vec::new();
            if let Some(therefore) = therefore {
                lower_stmt(therefore, st, &mut then_body);
            }
            let mut else_body = Vec::new();
            if let Some(alternative) = alternative {
                lower_stmt(alternative, st, &mut else_body);
            }

            out.push(Hir::Test {
                cond: Box::new(lower_expr(cond, st)),
                therefore: then_body,
                alternative: else_body,
            });
        }

        AstKind::While { cond, body } => {
            let mut loop_body = Vec::new();
            lower_stmt(body, st, &mut loop_body);

            out.push(Hir::While {
                cond: Box::new(lower_expr(cond, st)),
                body: loop_body,
            });
        }

        AstKind::Read { ident } => out.push(Hir::AssignScalar {
            ident: ident.clone(),
            expr: Box::new(read_call()),
        }),

        AstKind::ReadIndexed { ident, index } => out.push(Hir::AssignIndexed {
            ident: ident.clone(),
            index: Box::new(lower_expr(index, st)),
            expr: Box::new(read_call()),
        }),

        AstKind::ReadArray { ident, len } => {
            for i in 0..*len {
                out.push(Hir::AssignIndexed {
                    ident: ident.clone(),
                    index: Box::new(Hir::int(i as i32)),
                    expr: Box::new(read_call()),
                });
            }
        }

        AstKind::Print { expr } => out.push(write_call(lower_expr(expr, st))),

        AstKind::PrintArray { ident, len } => {
            for i in 0..*len {
                out.push(write_call(Hir::Index {
                    ident: ident.clone(),
                    index: Box::new(Hir::int(i as i32)),
                }));
            }
        }

        AstKind::Return { expr } => out.push(Hir::Return {
            expr: Box::new(match expr {
                Some(expr) => lower_expr(expr, st),
                None => Hir::int(0),
            }),
        }),

        AstKind::Fn { .. } => {
            panic!("entered unreachable code: nested function definition");
        }

        // expression statements keep their side effects (calls)
        AstKind::Int { .. }
        | AstKind::Var { .. }
        | AstKind::Index { .. }
        | AstKind::BinaryOp { .. }
        | AstKind::UnaryOp { .. }
        | AstKind::FnCall { .. } => out.push(lower_expr(node, st)),
    }
}

fn lower_expr(node: &Ast, st: &SymbolTable) -> Hir {
    match node.kind() {
        AstKind::Int { value } => Hir::int(*value),

        AstKind::Var { ident } => Hir::Var {
            ident: ident.clone(),
        },

        AstKind::Index { ident, index } => Hir::Index {
            ident: ident.clone(),
            index: Box::new(lower_expr(index, st)),
        },

        AstKind::BinaryOp { op, lhs, rhs } => Hir::Binary {
            op: *op,
            lhs: Box::new(lower_expr(lhs, st)),
            rhs: Box::new(lower_expr(rhs, st)),
        },

        AstKind::UnaryOp { op, expr } => Hir::Unary {
            op: *op,
            expr: Box::new(lower_expr(expr, st)),
        },

        AstKind::FnCall { ident, args } => Hir::Call {
            callee: ident.as_str().to_owned(),
            args: args.iter().map(|arg| lower_expr(arg, st)).collect(),
        },

        other => panic!("entered unreachable code: {other:?} is not an expression"),
    }
}

#[cfg(test)]
mod tests {
    use rame_parse::parse_program;

    use super::*;

    fn lower(source: &str) -> Vec<HirFn> {
        let program = parse_program("test.algo", source).unwrap();
        lower_program(&program)
    }

    #[test]
    fn lire_becomes_an_intrinsic_assignment() {
        let fns = lower("FONCTION main() LIRE x; AFFICHER x FIN");
        let body = &fns[0].body;

        assert_eq!(
            body[0],
            Hir::AssignScalar {
                ident: rame_core::Ident::new("x").unwrap(),
                expr: Box::new(read_call()),
            }
        );
        let Hir::Call { callee, args } = &body[1] else {
            panic!("expected a WRITE call");
        };
        assert_eq!(callee, intrinsics::WRITE);
        assert_eq!(args.len(), 1);
    }

    #[test]
    fn whole_array_forms_unroll_per_cell() {
        let fns = lower(
            "FONCTION main()
  t : TABLEAU[3]
  u : TABLEAU[3]
  t := { 1, 2, 3 }
  u := [t]
  LIRE [u]
  AFFICHER [u]
FIN",
        );
        let body = &fns[0].body;
        // 3 list stores + 3 copies + 3 reads + 3 writes
        assert_eq!(body.len(), 12);

        let Hir::AssignIndexed { index, expr, .. } = &body[3] else {
            panic!("expected the first copy cell");
        };
        assert_eq!(**index, Hir::int(0));
        let Hir::Index { index, .. } = &**expr else {
            panic!("copy source should be an indexed read");
        };
        assert_eq!(**index, Hir::int(0));

        let Hir::AssignIndexed { expr, .. } = &body[6] else {
            panic!("expected the first unrolled read");
        };
        assert_eq!(**expr, read_call());
    }

    #[test]
    fn blocks_flatten_into_vectors() {
        let fns = lower(
            "FONCTION main()
  a := 1
  SI a > 0 ALORS
    a := 2
    a := 3
  SINON
    a := 4
  FSI
FIN",
        );
        let body = &fns[0].body;
        assert_eq!(body.len(), 2);

        let Hir::Test {
            therefore,
            alternative,
            ..
        } = &body[1]
        else {
            panic!("expected a conditional");
        };
        assert_eq!(therefore.len(), 2);
        assert_eq!(alternative.len(), 1);
    }

    #[test]
    fn renvoyer_without_value_returns_zero() {
        let fns = lower("FONCTION main() RENVOYER FIN");
        assert_eq!(
            fns[0].body[0],
            Hir::Return {
                expr: Box::new(Hir::int(0))
            }
        );
    }

    #[test]
    fn missing_final_return_is_left_to_the_backend() {
        let fns = lower("FONCTION main() AFFICHER 1 FIN");
        assert!(!matches!(fns[0].body.last(), Some(Hir::Return { .. })));
    }

    #[test]
    fn calls_keep_user_names_and_argument_order() {
        let fns = lower(
            "FONCTION add(a, b) RENVOYER a + b FIN
FONCTION main() AFFICHER add(1, 2) FIN",
        );
        assert_eq!(fns[0].params.len(), 2);

        let Hir::Call { args, .. } = &fns[1].body[0] else {
            panic!("expected the WRITE call");
        };
        let Hir::Call { callee, args } = &args[0] else {
            panic!("expected the user call");
        };
        assert_eq!(callee, "add");
        assert_eq!(args[0], Hir::int(1));
        assert_eq!(args[1], Hir::int(2));
    }

    #[test]
    fn while_lowers_structurally() {
        let fns = lower(
            "FONCTION main()
  i := 0
  TQ i < 3 FAIRE i := i + 1 FTQ
FIN",
        );
        let Hir::While { body, .. } = &fns[0].body[1] else {
            panic!("expected a loop");
        };
        assert_eq!(body.len(), 1);
    }
}
