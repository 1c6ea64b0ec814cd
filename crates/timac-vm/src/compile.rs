//! Lowering of typed trees to bytecode.
//!
//! Emission is post-order: operands first, operator last. Short-circuit
//! `&&`/`||` lower to conditional jumps; clock constraints push the clock
//! id and the bound before the constraint instruction. An ill-typed node
//! lowers to `FAIL` and rejects the whole program.

use crate::bytecode::{ClkCmp, Instr, Program};
use thiserror::Error;
use timac_syntax::{BinOp, UnaryOp};
use timac_types::infer;
use timac_types::{ExprType, StmtType, TypedExpr, TypedExprKind, TypedStmt, TypedStmtKind, VarRef};

/// Compilation error.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("ill-typed expression {0}")]
    IllTypedExpr(String),
    #[error("ill-typed statement {0}")]
    IllTypedStmt(String),
    #[error("array index {index} out of bounds for {name} of size {size}")]
    IndexOutOfBounds { name: String, index: i64, size: u32 },
    #[error("{0} cannot be lowered to a value")]
    Unsupported(String),
    #[error("internal invariant breach: {0}")]
    Internal(String),
}

pub type CompileResult<T> = Result<T, CompileError>;

/// Compile a typed expression into a bytecode program.
pub fn compile_expr(expr: &TypedExpr) -> CompileResult<Program> {
    if expr.is_bad() {
        return Err(CompileError::IllTypedExpr(expr.to_string()));
    }
    let mut compiler = Compiler::new();
    compiler.rvalue(expr)?;
    compiler.emit(Instr::Halt);
    if compiler.poisoned {
        return Err(CompileError::IllTypedExpr(expr.to_string()));
    }
    Ok(Program::new(compiler.code))
}

/// Compile a typed statement into a bytecode program.
pub fn compile_stmt(stmt: &TypedStmt) -> CompileResult<Program> {
    if stmt.is_bad() {
        return Err(CompileError::IllTypedStmt(stmt.to_string()));
    }
    let mut compiler = Compiler::new();
    compiler.stmt(stmt)?;
    compiler.emit(Instr::Halt);
    if compiler.poisoned {
        return Err(CompileError::IllTypedStmt(stmt.to_string()));
    }
    Ok(Program::new(compiler.code))
}

struct Compiler {
    code: Vec<Instr>,
    /// Set when a `FAIL` was emitted for an ill-typed subtree.
    poisoned: bool,
}

impl Compiler {
    fn new() -> Self {
        Self {
            code: Vec::new(),
            poisoned: false,
        }
    }

    fn emit(&mut self, instr: Instr) -> usize {
        let pc = self.code.len();
        self.code.push(instr);
        pc
    }

    /// Point the jump at `at` to the next instruction to be emitted.
    fn patch_to_here(&mut self, at: usize) {
        let rel = (self.code.len() - at - 1) as i32;
        match &mut self.code[at] {
            Instr::Jz(target) | Instr::Jnz(target) => *target = rel,
            other => unreachable!("patching non-jump instruction {other}"),
        }
    }

    /// Emit code pushing the value of an expression.
    fn rvalue(&mut self, expr: &TypedExpr) -> CompileResult<()> {
        if expr.is_bad() {
            self.emit(Instr::Fail);
            self.poisoned = true;
            return Ok(());
        }
        match &expr.kind {
            TypedExprKind::Int(n) => {
                self.emit(Instr::Push(*n));
            }
            TypedExprKind::Bool(b) => {
                self.emit(Instr::Push(*b as i64));
            }
            TypedExprKind::Var(var) => match expr.ty {
                ExprType::IntLvalue(_) => {
                    self.emit(Instr::LoadInt(var.offset));
                }
                ExprType::ClockLvalue(_) | ExprType::ClockTerm => {
                    return Err(CompileError::Unsupported(format!("clock {}", var.name)));
                }
                _ => {
                    return Err(CompileError::Unsupported(format!("array {}", var.name)));
                }
            },
            TypedExprKind::Index { array, index } => match expr.ty {
                ExprType::IntLvalue(_) => self.int_element(array, index)?,
                ExprType::ClockLvalue(_) => {
                    return Err(CompileError::Unsupported(format!("clock element {}", expr)));
                }
                _ => {
                    return Err(CompileError::Internal(format!(
                        "index node typed {}",
                        expr.ty
                    )));
                }
            },
            TypedExprKind::Unary { op, operand } => {
                self.rvalue(operand)?;
                self.emit(match op {
                    UnaryOp::Neg => Instr::Neg,
                    UnaryOp::Not => Instr::Lnot,
                });
            }
            TypedExprKind::Binary { op, left, right } => {
                self.binary(*op, left, right)?;
            }
            TypedExprKind::Paren(inner) => {
                self.rvalue(inner)?;
            }
        }
        Ok(())
    }

    /// Emit code pushing the value of an integer array element.
    fn int_element(&mut self, array: &TypedExpr, index: &TypedExpr) -> CompileResult<()> {
        let var = array_var(array)?;
        match fold_const(index) {
            Some(k) => {
                let offset = checked_offset(var, k)?;
                self.emit(Instr::LoadInt(offset));
            }
            None => {
                self.rvalue(index)?;
                self.emit(Instr::LoadIntDyn {
                    base: var.offset,
                    size: var.size,
                });
            }
        }
        Ok(())
    }

    /// Emit code pushing a clock id for a scalar clock lvalue.
    fn clock_lvalue(&mut self, expr: &TypedExpr) -> CompileResult<()> {
        if expr.is_bad() {
            self.emit(Instr::Fail);
            self.poisoned = true;
            return Ok(());
        }
        match &expr.kind {
            TypedExprKind::Var(var) => {
                self.emit(Instr::LoadClk(var.offset));
                Ok(())
            }
            TypedExprKind::Index { array, index } => {
                let var = array_var(array)?;
                match fold_const(index) {
                    Some(k) => {
                        let offset = checked_offset(var, k)?;
                        self.emit(Instr::LoadClk(offset));
                    }
                    None => {
                        self.rvalue(index)?;
                        self.emit(Instr::LoadClkDyn {
                            base: var.offset,
                            size: var.size,
                        });
                    }
                }
                Ok(())
            }
            TypedExprKind::Paren(inner) => self.clock_lvalue(inner),
            _ => Err(CompileError::Internal(format!(
                "{} is not a clock lvalue",
                expr
            ))),
        }
    }

    fn binary(&mut self, op: BinOp, left: &TypedExpr, right: &TypedExpr) -> CompileResult<()> {
        match op {
            BinOp::And => {
                self.rvalue(left)?;
                let jump_false_left = self.emit(Instr::Jz(0));
                self.rvalue(right)?;
                let jump_false_right = self.emit(Instr::Jz(0));
                self.emit(Instr::Push(1));
                // PUSH 0; JZ is an unconditional skip of the false arm.
                self.emit(Instr::Push(0));
                let jump_end = self.emit(Instr::Jz(0));
                self.patch_to_here(jump_false_left);
                self.patch_to_here(jump_false_right);
                self.emit(Instr::Push(0));
                self.patch_to_here(jump_end);
            }
            BinOp::Or => {
                self.rvalue(left)?;
                let jump_true_left = self.emit(Instr::Jnz(0));
                self.rvalue(right)?;
                let jump_true_right = self.emit(Instr::Jnz(0));
                self.emit(Instr::Push(0));
                self.emit(Instr::Push(0));
                let jump_end = self.emit(Instr::Jz(0));
                self.patch_to_here(jump_true_left);
                self.patch_to_here(jump_true_right);
                self.emit(Instr::Push(1));
                self.patch_to_here(jump_end);
            }
            op if op.is_arithmetic() => {
                self.rvalue(left)?;
                self.rvalue(right)?;
                self.emit(arithmetic_instr(op));
            }
            op if infer::is_clock_constraint(op, left.ty, right.ty) => {
                self.clock_lvalue(left)?;
                self.rvalue(right)?;
                self.emit(Instr::Clk(clock_cmp(op)?));
            }
            op => {
                self.rvalue(left)?;
                self.rvalue(right)?;
                self.emit(comparison_instr(op)?);
            }
        }
        Ok(())
    }

    fn stmt(&mut self, stmt: &TypedStmt) -> CompileResult<()> {
        if stmt.is_bad() {
            self.emit(Instr::Fail);
            self.poisoned = true;
            return Ok(());
        }
        match &stmt.kind {
            // A nop contributes no instructions.
            TypedStmtKind::Nop => Ok(()),
            TypedStmtKind::Assign { lhs, rhs } => match stmt.ty {
                StmtType::IntAssign => {
                    self.rvalue(rhs)?;
                    self.store_int(lhs)
                }
                StmtType::ClockReset => {
                    // The right operand is the checked literal zero; only
                    // the clock id reaches the VM.
                    self.clock_lvalue(lhs)?;
                    self.emit(Instr::ResetClk);
                    Ok(())
                }
                other => Err(CompileError::Internal(format!(
                    "assignment typed {:?}",
                    other
                ))),
            },
            TypedStmtKind::Seq(first, second) => {
                self.stmt(first)?;
                self.stmt(second)
            }
        }
    }

    /// Emit code popping a value into an integer lvalue.
    fn store_int(&mut self, lhs: &TypedExpr) -> CompileResult<()> {
        match &lhs.kind {
            TypedExprKind::Var(var) => {
                self.emit(Instr::StoreInt(var.offset));
                Ok(())
            }
            TypedExprKind::Index { array, index } => {
                let var = array_var(array)?;
                match fold_const(index) {
                    Some(k) => {
                        let offset = checked_offset(var, k)?;
                        self.emit(Instr::StoreInt(offset));
                    }
                    None => {
                        self.rvalue(index)?;
                        self.emit(Instr::StoreIntDyn {
                            base: var.offset,
                            size: var.size,
                        });
                    }
                }
                Ok(())
            }
            TypedExprKind::Paren(inner) => self.store_int(inner),
            _ => Err(CompileError::Internal(format!(
                "{} is not an integer lvalue",
                lhs
            ))),
        }
    }
}

/// The resolved variable of an array base node.
fn array_var(array: &TypedExpr) -> CompileResult<&VarRef> {
    array
        .as_var()
        .ok_or_else(|| CompileError::Internal(format!("array base {} is not a variable", array)))
}

/// Flat offset of `var[k]`, rejecting constant indices outside the array.
fn checked_offset(var: &VarRef, k: i64) -> CompileResult<u32> {
    if k < 0 || k >= var.size as i64 {
        return Err(CompileError::IndexOutOfBounds {
            name: var.name.clone(),
            index: k,
            size: var.size,
        });
    }
    Ok(var.offset + k as u32)
}

/// Constant folding over typed integer trees.
fn fold_const(expr: &TypedExpr) -> Option<i64> {
    match &expr.kind {
        TypedExprKind::Int(n) => Some(*n),
        TypedExprKind::Paren(inner) => fold_const(inner),
        TypedExprKind::Unary {
            op: UnaryOp::Neg,
            operand,
        } => fold_const(operand)?.checked_neg(),
        TypedExprKind::Binary { op, left, right } if op.is_arithmetic() => {
            let a = fold_const(left)?;
            let b = fold_const(right)?;
            match op {
                BinOp::Add => a.checked_add(b),
                BinOp::Sub => a.checked_sub(b),
                BinOp::Mul => a.checked_mul(b),
                BinOp::Div => a.checked_div(b),
                BinOp::Mod => a.checked_rem(b),
                _ => None,
            }
        }
        _ => None,
    }
}

fn arithmetic_instr(op: BinOp) -> Instr {
    match op {
        BinOp::Add => Instr::Add,
        BinOp::Sub => Instr::Sub,
        BinOp::Mul => Instr::Mul,
        BinOp::Div => Instr::Div,
        BinOp::Mod => Instr::Mod,
        other => unreachable!("{other:?} is not arithmetic"),
    }
}

fn comparison_instr(op: BinOp) -> CompileResult<Instr> {
    match op {
        BinOp::Eq => Ok(Instr::Eq),
        BinOp::Ne => Ok(Instr::Ne),
        BinOp::Lt => Ok(Instr::Lt),
        BinOp::Le => Ok(Instr::Le),
        BinOp::Gt => Ok(Instr::Gt),
        BinOp::Ge => Ok(Instr::Ge),
        other => Err(CompileError::Internal(format!(
            "{} is not a comparison",
            other.symbol()
        ))),
    }
}

fn clock_cmp(op: BinOp) -> CompileResult<ClkCmp> {
    match op {
        BinOp::Lt => Ok(ClkCmp::Lt),
        BinOp::Le => Ok(ClkCmp::Le),
        BinOp::Eq => Ok(ClkCmp::Eq),
        BinOp::Ge => Ok(ClkCmp::Ge),
        BinOp::Gt => Ok(ClkCmp::Gt),
        other => Err(CompileError::Internal(format!(
            "{} is not a clock comparator",
            other.symbol()
        ))),
    }
}
