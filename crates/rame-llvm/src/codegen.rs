//! Object-file emission through inkwell.
//!
//! Contract with the lowered IR: declare the intrinsics, forward-declare
//! every function (all-`i16` signatures), then emit each body 1:1 from
//! the HIR kinds and verify it before moving to the next. Once the module
//! verifies, every function is renamed `_Z<len><name>` so the reference
//! runtime can provide `main` and the intrinsics without clashing with
//! user identifiers.
//!
//! Comparisons produce `i1` values; they are zero-extended back to `i16`
//! wherever an integer is consumed, and integers are compared against
//! zero wherever a truth value is consumed, so ALGO truthiness ("any
//! nonzero value") matches the RAM back-end.

use std::collections::HashMap;
use std::path::Path;

use inkwell::basic_block::BasicBlock;
use inkwell::builder::Builder;
use inkwell::context::Context;
use inkwell::module::{Linkage, Module};
use inkwell::targets::{
    CodeModel, FileType, InitializationConfig, RelocMode, Target, TargetMachine,
};
use inkwell::types::IntType;
use inkwell::values::{BasicMetadataValueEnum, FunctionValue, IntValue, PointerValue};
use inkwell::{IntPredicate, OptimizationLevel};

use rame_core::{BinaryOp, SymbolKind, UnaryOp};

use crate::hir::{Hir, HirFn};
use crate::intrinsics;

/// Errors of the object back-end.
#[derive(Debug, thiserror::Error)]
pub enum LlvmError {
    /// A call to a function that does not exist.
    #[error("fonction inconnue: '{0}'")]
    UnknownFunction(String),

    /// A call with the wrong number of arguments.
    #[error("'{callee}()': {expected} paramètres attendus, {given} paramètres donnés")]
    ArityMismatch {
        callee: String,
        expected: usize,
        given: usize,
    },

    /// Anything the LLVM API reports: builder failures, verification,
    /// target setup, file emission.
    #[error("LLVM error: {0}")]
    Llvm(String),
}

fn llvm_err(e: impl ToString) -> LlvmError {
    LlvmError::Llvm(e.to_string())
}

/// Compiles lowered functions into a native object file at `output`.
pub fn compile_object(functions: &[HirFn], output: &Path) -> Result<(), LlvmError> {
    let context = Context::create();
    let module = build_module(&context, functions)?;
    write_object(&module, output)?;
    tracing::debug!(output = %output.display(), "object emitted");
    Ok(())
}

/// Same pipeline as [`compile_object`] but returns the textual IR, which
/// is what the tests inspect.
pub fn compile_ir(functions: &[HirFn]) -> Result<String, LlvmError> {
    let context = Context::create();
    let module = build_module(&context, functions)?;
    Ok(module.print_to_string().to_string())
}

fn build_module<'ctx>(
    context: &'ctx Context,
    functions: &[HirFn],
) -> Result<Module<'ctx>, LlvmError> {
    let module = context.create_module("rame");
    let builder = context.create_builder();
    let ty = context.i16_type();

    // intrinsics, with external linkage under their reserved names
    let write_ty = context.void_type().fn_type(&[ty.into()], false);
    module.add_function(intrinsics::WRITE, write_ty, Some(Linkage::External));
    let read_ty = ty.fn_type(&[], false);
    module.add_function(intrinsics::READ, read_ty, Some(Linkage::External));

    // forward-declare every function so calls resolve in any order
    for function in functions {
        let params = vec![ty.into(); function.params.len()];
        let fn_ty = ty.fn_type(&params, false);
        module.add_function(function.ident.as_str(), fn_ty, None);
    }

    for function in functions {
        compile_fn(context, &module, &builder, ty, function)?;
    }

    module.verify().map_err(llvm_err)?;

    // mangle after verification; `main` becomes `_Z4main`, leaving the
    // symbol `main` to the runtime
    for function in module.get_functions() {
        let name = function.get_name().to_string_lossy().into_owned();
        let mangled = format!("_Z{}{}", name.len(), name);
        function.as_global_value().set_name(&mangled);
    }

    Ok(module)
}

/// Everything a function body emission needs.
struct Cg<'ctx, 'a> {
    context: &'ctx Context,
    module: &'a Module<'ctx>,
    builder: &'a Builder<'ctx>,
    function: FunctionValue<'ctx>,
    ty: IntType<'ctx>,
    locals: HashMap<String, (PointerValue<'ctx>, SymbolKind)>,
}

fn compile_fn<'ctx>(
    context: &'ctx Context,
    module: &Module<'ctx>,
    builder: &Builder<'ctx>,
    ty: IntType<'ctx>,
    function: &HirFn,
) -> Result<(), LlvmError> {
    let fn_value = module
        .get_function(function.ident.as_str())
        .unwrap_or_else(|| {
            panic!(
                "illegal state: '{}' was not declared before its body",
                function.ident
            )
        });

    let entry = context.append_basic_block(fn_value, "entry");
    builder.position_at_end(entry);

    // one alloca per symbol, in declaration order
    let mut locals = HashMap::new();
    for symbol in function.st.iter() {
        let ptr = match symbol.kind {
            SymbolKind::Scalar => builder.build_alloca(ty, symbol.ident.as_str()),
            SymbolKind::Array(len) => {
                builder.build_alloca(ty.array_type(len), symbol.ident.as_str())
            }
        }
        .map_err(llvm_err)?;
        locals.insert(symbol.ident.as_str().to_owned(), (ptr, symbol.kind));
    }

    // parameters land in the bottom slots; spill the incoming values
    for (i, param) in function.params.iter().enumerate() {
        let value = fn_value
            .get_nth_param(i as u32)
            .unwrap_or_else(|| panic!("illegal state: parameter {i} missing on '{}'", param));
        let (ptr, _) = locals[param.as_str()];
        builder.build_store(ptr, value).map_err(llvm_err)?;
    }

    let cg = Cg {
        context,
        module,
        builder,
        function: fn_value,
        ty,
        locals,
    };

    let terminated = emit_body(&cg, &function.body)?;
    if !terminated {
        // implicit RENVOYER 0
        cg.builder
            .build_return(Some(&cg.ty.const_int(0, false)))
            .map_err(llvm_err)?;
    }

    if !fn_value.verify(true) {
        return Err(LlvmError::Llvm(format!(
            "function '{}' failed verification",
            function.ident
        )));
    }
    Ok(())
}

/// Emits a statement list; returns true if it ended on a terminator, in
/// which case the remaining statements were unreachable and are skipped.
fn emit_body<'ctx>(cg: &Cg<'ctx, '_>, stmts: &[Hir]) -> Result<bool, LlvmError> {
    for stmt in stmts {
        if emit_stmt(cg, stmt)? {
            return Ok(true);
        }
    }
    Ok(false)
}

fn emit_stmt<'ctx>(cg: &Cg<'ctx, '_>, stmt: &Hir) -> Result<bool, LlvmError> {
    match stmt {
        Hir::AssignScalar { ident, expr } => {
            let value = int_value(cg, emit_expr(cg, expr)?)?;
            let (ptr, _) = local(cg, ident.as_str());
            cg.builder.build_store(ptr, value).map_err(llvm_err)?;
            Ok(false)
        }

        Hir::AssignIndexed { ident, index, expr } => {
            let ptr = element_ptr(cg, ident.as_str(), index)?;
            let value = int_value(cg, emit_expr(cg, expr)?)?;
            cg.builder.build_store(ptr, value).map_err(llvm_err)?;
            Ok(false)
        }

        Hir::Test {
            cond,
            therefore,
            alternative,
        } => {
            let cond = bool_value(cg, emit_expr(cg, cond)?)?;
            let then_bb = cg.context.append_basic_block(cg.function, "alors");
            let else_bb = cg.context.append_basic_block(cg.function, "sinon");
            let merge_bb = cg.context.append_basic_block(cg.function, "fsi");

            cg.builder
                .build_conditional_branch(cond, then_bb, else_bb)
                .map_err(llvm_err)?;

            emit_branch(cg, then_bb, therefore, merge_bb)?;
            emit_branch(cg, else_bb, alternative, merge_bb)?;

            cg.builder.position_at_end(merge_bb);
            Ok(false)
        }

        Hir::While { cond, body } => {
            let cond_bb = cg.context.append_basic_block(cg.function, "tq");
            let body_bb = cg.context.append_basic_block(cg.function, "faire");
            let after_bb = cg.context.append_basic_block(cg.function, "ftq");

            cg.builder
                .build_unconditional_branch(cond_bb)
                .map_err(llvm_err)?;

            cg.builder.position_at_end(cond_bb);
            let cond = bool_value(cg, emit_expr(cg, cond)?)?;
            cg.builder
                .build_conditional_branch(cond, body_bb, after_bb)
                .map_err(llvm_err)?;

            cg.builder.position_at_end(body_bb);
            if !emit_body(cg, body)? {
                cg.builder
                    .build_unconditional_branch(cond_bb)
                    .map_err(llvm_err)?;
            }

            cg.builder.position_at_end(after_bb);
            Ok(false)
        }

        Hir::Return { expr } => {
            let value = int_value(cg, emit_expr(cg, expr)?)?;
            cg.builder.build_return(Some(&value)).map_err(llvm_err)?;
            Ok(true)
        }

        // expression statement: emitted for its side effects
        other => {
            emit_expr(cg, other)?;
            Ok(false)
        }
    }
}

/// Fills a branch block and falls through to `merge` unless the branch
/// body already terminated.
fn emit_branch<'ctx>(
    cg: &Cg<'ctx, '_>,
    block: BasicBlock<'ctx>,
    stmts: &[Hir],
    merge: BasicBlock<'ctx>,
) -> Result<(), LlvmError> {
    cg.builder.position_at_end(block);
    if !emit_body(cg, stmts)? {
        cg.builder
            .build_unconditional_branch(merge)
            .map_err(llvm_err)?;
    }
    Ok(())
}

fn emit_expr<'ctx>(cg: &Cg<'ctx, '_>, expr: &Hir) -> Result<IntValue<'ctx>, LlvmError> {
    match expr {
        Hir::Int { value } => Ok(cg.ty.const_int(*value as i64 as u64, false)),

        Hir::Var { ident } => {
            let (ptr, _) = local(cg, ident.as_str());
            let value = cg
                .builder
                .build_load(cg.ty, ptr, ident.as_str())
                .map_err(llvm_err)?;
            Ok(value.into_int_value())
        }

        Hir::Index { ident, index } => {
            let ptr = element_ptr(cg, ident.as_str(), index)?;
            let value = cg
                .builder
                .build_load(cg.ty, ptr, ident.as_str())
                .map_err(llvm_err)?;
            Ok(value.into_int_value())
        }

        Hir::Binary { op, lhs, rhs } => emit_binary(cg, *op, lhs, rhs),

        Hir::Unary { op, expr } => {
            let value = emit_expr(cg, expr)?;
            match op {
                UnaryOp::Neg => {
                    let value = int_value(cg, value)?;
                    cg.builder.build_int_neg(value, "neg").map_err(llvm_err)
                }
                UnaryOp::Not => {
                    let value = bool_value(cg, value)?;
                    cg.builder.build_not(value, "non").map_err(llvm_err)
                }
            }
        }

        Hir::Call { callee, args } => {
            let target = cg
                .module
                .get_function(callee)
                .ok_or_else(|| LlvmError::UnknownFunction(callee.clone()))?;

            if target.count_params() as usize != args.len() {
                return Err(LlvmError::ArityMismatch {
                    callee: callee.clone(),
                    expected: target.count_params() as usize,
                    given: args.len(),
                });
            }

            let mut values: Vec<BasicMetadataValueEnum> = Vec::with_capacity(args.len());
            for arg in args {
                // promote i1 results to the integer type
                let value = int_value(cg, emit_expr(cg, arg)?)?;
                values.push(value.into());
            }

            let call = cg
                .builder
                .build_call(target, &values, "appel")
                .map_err(llvm_err)?;
            match call.try_as_basic_value().basic() {
                Some(value) => Ok(value.into_int_value()),
                // void intrinsic: the "value" of the call is never used
                None => Ok(cg.ty.const_int(0, false)),
            }
        }

        other => panic!("entered unreachable code: {other:?} is not an expression"),
    }
}

fn emit_binary<'ctx>(
    cg: &Cg<'ctx, '_>,
    op: BinaryOp,
    lhs: &Hir,
    rhs: &Hir,
) -> Result<IntValue<'ctx>, LlvmError> {
    use BinaryOp::*;

    match op {
        And | Or | Xor => {
            let lhs = bool_value(cg, emit_expr(cg, lhs)?)?;
            let rhs = bool_value(cg, emit_expr(cg, rhs)?)?;
            match op {
                And => cg.builder.build_and(lhs, rhs, "et").map_err(llvm_err),
                Or => cg.builder.build_or(lhs, rhs, "ou").map_err(llvm_err),
                Xor => cg.builder.build_xor(lhs, rhs, "ouex").map_err(llvm_err),
                _ => unreachable!(),
            }
        }

        Ge | Gt | Le | Lt | Eq | Ne => {
            let lhs = int_value(cg, emit_expr(cg, lhs)?)?;
            let rhs = int_value(cg, emit_expr(cg, rhs)?)?;
            let predicate = match op {
                Ge => IntPredicate::SGE,
                Gt => IntPredicate::SGT,
                Le => IntPredicate::SLE,
                Lt => IntPredicate::SLT,
                Eq => IntPredicate::EQ,
                Ne => IntPredicate::NE,
                _ => unreachable!(),
            };
            cg.builder
                .build_int_compare(predicate, lhs, rhs, "cmp")
                .map_err(llvm_err)
        }

        Add | Sub | Mul | Div | Mod => {
            let lhs = int_value(cg, emit_expr(cg, lhs)?)?;
            let rhs = int_value(cg, emit_expr(cg, rhs)?)?;
            match op {
                Add => cg.builder.build_int_add(lhs, rhs, "add").map_err(llvm_err),
                Sub => cg.builder.build_int_sub(lhs, rhs, "sub").map_err(llvm_err),
                Mul => cg.builder.build_int_mul(lhs, rhs, "mul").map_err(llvm_err),
                Div => cg
                    .builder
                    .build_int_signed_div(lhs, rhs, "div")
                    .map_err(llvm_err),
                Mod => cg
                    .builder
                    .build_int_signed_rem(lhs, rhs, "mod")
                    .map_err(llvm_err),
                _ => unreachable!(),
            }
        }
    }
}

fn local<'ctx>(cg: &Cg<'ctx, '_>, name: &str) -> (PointerValue<'ctx>, SymbolKind) {
    *cg.locals
        .get(name)
        .unwrap_or_else(|| panic!("illegal state: '{name}' should exist at this stage but it does not"))
}

/// Address of `name[index]`, via an element-typed GEP over the array
/// storage.
fn element_ptr<'ctx>(
    cg: &Cg<'ctx, '_>,
    name: &str,
    index: &Hir,
) -> Result<PointerValue<'ctx>, LlvmError> {
    let (ptr, kind) = local(cg, name);
    debug_assert!(kind.is_array(), "indexed access to the scalar '{name}'");

    let index = int_value(cg, emit_expr(cg, index)?)?;
    let gep = unsafe {
        cg.builder
            .build_in_bounds_gep(cg.ty, ptr, &[index], "cellule")
            .map_err(llvm_err)?
    };
    Ok(gep)
}

/// Promotes an `i1` into the integer type; integers pass through.
fn int_value<'ctx>(cg: &Cg<'ctx, '_>, value: IntValue<'ctx>) -> Result<IntValue<'ctx>, LlvmError> {
    if value.get_type().get_bit_width() == 1 {
        cg.builder
            .build_int_z_extend(value, cg.ty, "ent")
            .map_err(llvm_err)
    } else {
        Ok(value)
    }
}

/// Demotes an integer into an `i1` truth value; `i1`s pass through.
fn bool_value<'ctx>(cg: &Cg<'ctx, '_>, value: IntValue<'ctx>) -> Result<IntValue<'ctx>, LlvmError> {
    if value.get_type().get_bit_width() == 1 {
        Ok(value)
    } else {
        cg.builder
            .build_int_compare(IntPredicate::NE, value, cg.ty.const_zero(), "vrai")
            .map_err(llvm_err)
    }
}

fn write_object(module: &Module<'_>, output: &Path) -> Result<(), LlvmError> {
    Target::initialize_native(&InitializationConfig::default()).map_err(llvm_err)?;

    let triple = TargetMachine::get_default_triple();
    module.set_triple(&triple);

    let target = Target::from_triple(&triple).map_err(llvm_err)?;
    let machine = target
        .create_target_machine(
            &triple,
            "generic",
            "",
            OptimizationLevel::None,
            RelocMode::PIC,
            CodeModel::Default,
        )
        .ok_or_else(|| LlvmError::Llvm("failed to create target machine".to_owned()))?;

    machine
        .write_to_file(module, FileType::Object, output)
        .map_err(llvm_err)
}
