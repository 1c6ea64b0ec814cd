//! Pure type inference rules.
//!
//! These functions compute result types from operand types alone; message
//! selection and reporting live in the checker.

use crate::typed::{ExprType, StmtType};
use timac_syntax::{BinOp, Expr, UnaryOp};

/// Whether a value of this type reads as an integer term (a read coerces a
/// scalar integer lvalue).
pub fn integer_valued(ty: ExprType) -> bool {
    matches!(ty, ExprType::IntTerm | ExprType::IntLvalue(1))
}

/// Whether a value of this type is a scalar clock lvalue.
pub fn clock_valued(ty: ExprType) -> bool {
    matches!(ty, ExprType::ClockLvalue(1))
}

/// Whether this type belongs to the clock universe.
pub fn clock_kinded(ty: ExprType) -> bool {
    matches!(
        ty,
        ExprType::ClockTerm | ExprType::ClockLvalue(_) | ExprType::ClockArray(_)
    )
}

/// Type of an integer variable reference of the given declared size.
pub fn type_int_var(size: u32) -> ExprType {
    if size == 1 {
        ExprType::IntLvalue(1)
    } else {
        ExprType::IntArray(size)
    }
}

/// Type of a clock variable reference of the given declared size.
pub fn type_clock_var(size: u32) -> ExprType {
    if size == 1 {
        ExprType::ClockLvalue(1)
    } else {
        ExprType::ClockArray(size)
    }
}

/// Type of `array[index]`.
pub fn type_index(array: ExprType, index: ExprType) -> ExprType {
    if !integer_valued(index) {
        return ExprType::Bad;
    }
    match array {
        ExprType::IntArray(_) => ExprType::IntLvalue(1),
        ExprType::ClockArray(_) => ExprType::ClockLvalue(1),
        _ => ExprType::Bad,
    }
}

/// Type of a unary operation.
pub fn type_unary(op: UnaryOp, operand: ExprType) -> ExprType {
    match op {
        UnaryOp::Neg => {
            if integer_valued(operand) {
                ExprType::IntTerm
            } else {
                ExprType::Bad
            }
        }
        UnaryOp::Not => {
            if operand == ExprType::Bool {
                ExprType::Bool
            } else {
                ExprType::Bad
            }
        }
    }
}

/// Type of a binary operation.
///
/// Arithmetic coerces both operands to integer terms; comparisons accept
/// integer/integer or clock/integer with the clock on the left (`!=` never
/// applies to clocks); logical connectives take booleans.
pub fn type_binary(op: BinOp, left: ExprType, right: ExprType) -> ExprType {
    if op.is_arithmetic() {
        if integer_valued(left) && integer_valued(right) {
            ExprType::IntTerm
        } else {
            ExprType::Bad
        }
    } else if op.is_comparison() {
        if integer_valued(left) && integer_valued(right) {
            ExprType::Bool
        } else if is_clock_constraint(op, left, right) {
            ExprType::Bool
        } else {
            ExprType::Bad
        }
    } else {
        if left == ExprType::Bool && right == ExprType::Bool {
            ExprType::Bool
        } else {
            ExprType::Bad
        }
    }
}

/// Whether a comparison over these operand types forms a clock constraint.
pub fn is_clock_constraint(op: BinOp, left: ExprType, right: ExprType) -> bool {
    op.is_comparison() && op != BinOp::Ne && clock_valued(left) && integer_valued(right)
}

/// Kind of the assignment `lhs = rhs`; `rhs_const` is the constant-folded
/// value of the right operand, if it folds.
pub fn type_assign(lhs: ExprType, rhs: ExprType, rhs_const: Option<i64>) -> StmtType {
    if matches!(lhs, ExprType::IntLvalue(1)) && integer_valued(rhs) {
        return StmtType::IntAssign;
    }
    // The only legal clock update is a reset to zero.
    if clock_valued(lhs) && integer_valued(rhs) && rhs_const == Some(0) {
        return StmtType::ClockReset;
    }
    StmtType::Bad
}

/// Kind of the sequence `first; second`.
pub fn type_seq(first: StmtType, second: StmtType) -> StmtType {
    if !first.is_bad() && !second.is_bad() {
        StmtType::Seq
    } else {
        StmtType::Bad
    }
}

/// Constant folding of pure integer expressions.
///
/// Returns the value when the expression is built from integer literals and
/// arithmetic only; overflow and division by zero do not fold.
pub fn const_fold(expr: &Expr) -> Option<i64> {
    match expr {
        Expr::Int(n) => Some(*n),
        Expr::Paren(inner) => const_fold(inner),
        Expr::Unary {
            op: UnaryOp::Neg,
            operand,
        } => const_fold(operand)?.checked_neg(),
        Expr::Binary { op, left, right } if op.is_arithmetic() => {
            let a = const_fold(left)?;
            let b = const_fold(right)?;
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

#[cfg(test)]
mod tests {
    use super::*;
    use timac_syntax::parse_expr;

    #[test]
    fn test_comparison_shapes() {
        let clk = ExprType::ClockLvalue(1);
        let int = ExprType::IntTerm;

        assert_eq!(type_binary(BinOp::Lt, int, int), ExprType::Bool);
        assert_eq!(type_binary(BinOp::Le, clk, int), ExprType::Bool);
        // clock on the right, clock/clock, and clock != are all rejected
        assert_eq!(type_binary(BinOp::Lt, int, clk), ExprType::Bad);
        assert_eq!(type_binary(BinOp::Eq, clk, clk), ExprType::Bad);
        assert_eq!(type_binary(BinOp::Ne, clk, int), ExprType::Bad);
    }

    #[test]
    fn test_clocks_excluded_from_arithmetic() {
        let clk = ExprType::ClockLvalue(1);
        let int = ExprType::IntTerm;
        assert_eq!(type_binary(BinOp::Add, clk, int), ExprType::Bad);
        assert_eq!(type_binary(BinOp::Mul, int, clk), ExprType::Bad);
        assert_eq!(type_unary(UnaryOp::Neg, clk), ExprType::Bad);
    }

    #[test]
    fn test_assignment_kinds() {
        let int_lv = ExprType::IntLvalue(1);
        let clk_lv = ExprType::ClockLvalue(1);
        let int = ExprType::IntTerm;

        assert_eq!(type_assign(int_lv, int, None), StmtType::IntAssign);
        assert_eq!(type_assign(clk_lv, int, Some(0)), StmtType::ClockReset);
        assert_eq!(type_assign(clk_lv, int, Some(1)), StmtType::Bad);
        assert_eq!(type_assign(clk_lv, int, None), StmtType::Bad);
        assert_eq!(type_assign(int, int, None), StmtType::Bad);
    }

    #[test]
    fn test_const_fold() {
        assert_eq!(const_fold(&parse_expr("1-1").unwrap()), Some(0));
        assert_eq!(const_fold(&parse_expr("2*(3+4)").unwrap()), Some(14));
        assert_eq!(const_fold(&parse_expr("-5%3").unwrap()), Some(-2));
        assert_eq!(const_fold(&parse_expr("1/0").unwrap()), None);
        assert_eq!(const_fold(&parse_expr("x+1").unwrap()), None);
    }
}
