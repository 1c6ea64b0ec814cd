//! Type checker for annotation expressions and statements.
//!
//! The checker never fails on user errors: an untypable node is reported
//! through the injected callback, tagged ill-typed, and the tag poisons
//! every ancestor without further reports. The output tree mirrors the
//! input one-to-one.

use crate::infer;
use crate::typed::{ExprType, StmtType, TypedExpr, TypedExprKind, TypedStmt, TypedStmtKind, VarRef};
use timac_syntax::{BinOp, Expr, Stmt, UnaryOp};
use timac_system::{Clocks, IntVars};

/// Type check an expression against the given variable catalogs.
pub fn typecheck_expr<'a>(
    expr: &Expr,
    intvars: &'a IntVars,
    clocks: &'a Clocks,
    report: &'a mut dyn FnMut(String),
) -> TypedExpr {
    Checker {
        intvars,
        clocks,
        report,
    }
    .expr(expr)
}

/// Type check a statement against the given variable catalogs.
pub fn typecheck_stmt<'a>(
    stmt: &Stmt,
    intvars: &'a IntVars,
    clocks: &'a Clocks,
    report: &'a mut dyn FnMut(String),
) -> TypedStmt {
    Checker {
        intvars,
        clocks,
        report,
    }
    .stmt(stmt)
}

struct Checker<'a> {
    intvars: &'a IntVars,
    clocks: &'a Clocks,
    report: &'a mut dyn FnMut(String),
}

impl Checker<'_> {
    fn error(&mut self, message: String) {
        (self.report)(message);
    }

    fn expr(&mut self, expr: &Expr) -> TypedExpr {
        match expr {
            Expr::Int(n) => TypedExpr::new(ExprType::IntTerm, TypedExprKind::Int(*n)),
            Expr::Bool(b) => TypedExpr::new(ExprType::Bool, TypedExprKind::Bool(*b)),
            Expr::Var(name) => self.var(name),
            Expr::Index { base, index } => self.index(base, index),
            Expr::Unary { op, operand } => self.unary(*op, operand, expr),
            Expr::Binary { op, left, right } => self.binary(*op, left, right, expr),
            Expr::Paren(inner) => {
                let typed = self.expr(inner);
                TypedExpr::new(typed.ty, TypedExprKind::Paren(Box::new(typed)))
            }
        }
    }

    /// Resolve a name, integer variables first, then clocks.
    fn var(&mut self, name: &str) -> TypedExpr {
        if let Some((id, data)) = self.intvars.lookup(name) {
            let var = VarRef {
                name: name.to_string(),
                id,
                offset: data.offset,
                size: data.size,
            };
            TypedExpr::new(infer::type_int_var(data.size), TypedExprKind::Var(var))
        } else if let Some((id, data)) = self.clocks.lookup(name) {
            let var = VarRef {
                name: name.to_string(),
                id,
                offset: data.offset,
                size: data.size,
            };
            TypedExpr::new(infer::type_clock_var(data.size), TypedExprKind::Var(var))
        } else {
            self.error(format!("unknown identifier {}", name));
            let var = VarRef {
                name: name.to_string(),
                id: 0,
                offset: 0,
                size: 0,
            };
            TypedExpr::new(ExprType::Bad, TypedExprKind::Var(var))
        }
    }

    fn index(&mut self, base: &Expr, index: &Expr) -> TypedExpr {
        let typed_base = self.expr(base);
        let typed_index = self.expr(index);

        let ty = infer::type_index(typed_base.ty, typed_index.ty);
        if ty.is_bad() && !typed_base.is_bad() && !typed_index.is_bad() {
            if !matches!(typed_base.ty, ExprType::IntArray(_) | ExprType::ClockArray(_)) {
                self.error(format!("{} is not an array", base));
            } else {
                self.error(format!("array index {} is not an integer term", index));
            }
        }

        TypedExpr::new(
            ty,
            TypedExprKind::Index {
                array: Box::new(typed_base),
                index: Box::new(typed_index),
            },
        )
    }

    fn unary(&mut self, op: UnaryOp, operand: &Expr, whole: &Expr) -> TypedExpr {
        let typed_operand = self.expr(operand);

        let mut ty = infer::type_unary(op, typed_operand.ty);
        if ty.is_bad() && !typed_operand.is_bad() {
            match op {
                UnaryOp::Neg if infer::clock_kinded(typed_operand.ty) => {
                    self.error(format!("clock in arithmetic expression {}", whole));
                }
                UnaryOp::Neg => {
                    self.error(format!("operand of - must be an integer term in {}", whole));
                }
                UnaryOp::Not => {
                    self.error(format!("operand of ! must be boolean in {}", whole));
                }
            }
        }

        // A clock constraint only makes sense positively.
        if op == UnaryOp::Not && ty == ExprType::Bool && typed_operand.has_clock_constraint() {
            self.error(format!("clock constraint under logical negation in {}", whole));
            ty = ExprType::Bad;
        }

        TypedExpr::new(
            ty,
            TypedExprKind::Unary {
                op,
                operand: Box::new(typed_operand),
            },
        )
    }

    fn binary(&mut self, op: BinOp, left: &Expr, right: &Expr, whole: &Expr) -> TypedExpr {
        let typed_left = self.expr(left);
        let typed_right = self.expr(right);

        let ty = infer::type_binary(op, typed_left.ty, typed_right.ty);
        if ty.is_bad() && !typed_left.is_bad() && !typed_right.is_bad() {
            let message = explain_binary(op, typed_left.ty, typed_right.ty, whole);
            self.error(message);
        }

        TypedExpr::new(
            ty,
            TypedExprKind::Binary {
                op,
                left: Box::new(typed_left),
                right: Box::new(typed_right),
            },
        )
    }

    fn stmt(&mut self, stmt: &Stmt) -> TypedStmt {
        match stmt {
            Stmt::Nop => TypedStmt::new(StmtType::Nop, TypedStmtKind::Nop),
            Stmt::Assign { lhs, rhs } => self.assign(lhs, rhs, stmt),
            Stmt::Seq(first, second) => {
                let typed_first = self.stmt(first);
                let typed_second = self.stmt(second);
                // Bad only by inheritance from a sub-statement, so nothing
                // to report at this level.
                let ty = infer::type_seq(typed_first.ty, typed_second.ty);
                TypedStmt::new(
                    ty,
                    TypedStmtKind::Seq(Box::new(typed_first), Box::new(typed_second)),
                )
            }
        }
    }

    fn assign(&mut self, lhs: &Expr, rhs: &Expr, whole: &Stmt) -> TypedStmt {
        let typed_lhs = self.expr(lhs);
        let typed_rhs = self.expr(rhs);

        let ty = infer::type_assign(typed_lhs.ty, typed_rhs.ty, infer::const_fold(rhs));
        if ty.is_bad() && !typed_lhs.is_bad() && !typed_rhs.is_bad() {
            if infer::clock_valued(typed_lhs.ty) && infer::integer_valued(typed_rhs.ty) {
                self.error(format!("clock reset requires literal 0 in {}", whole));
            } else {
                self.error(format!("invalid assignment {}", whole));
            }
        }

        TypedStmt::new(
            ty,
            TypedStmtKind::Assign {
                lhs: typed_lhs,
                rhs: typed_rhs,
            },
        )
    }
}

/// Cause of an untypable binary node whose operands typed fine.
fn explain_binary(op: BinOp, left: ExprType, right: ExprType, whole: &Expr) -> String {
    if op.is_arithmetic() {
        if infer::clock_kinded(left) || infer::clock_kinded(right) {
            format!("clock in arithmetic expression {}", whole)
        } else {
            format!("operands of {} must be integer terms in {}", op.symbol(), whole)
        }
    } else if op.is_comparison() {
        if infer::clock_valued(left) && infer::clock_valued(right) {
            format!("comparison of two clocks in {}", whole)
        } else if op == BinOp::Ne
            && (infer::clock_valued(left) || infer::clock_valued(right))
        {
            format!("clocks cannot be compared with != in {}", whole)
        } else if infer::clock_valued(right) {
            format!("clock must be the left operand of a comparison in {}", whole)
        } else {
            format!("invalid comparison {}", whole)
        }
    } else {
        format!("operands of {} must be boolean in {}", op.symbol(), whole)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use timac_syntax::{parse_expr, parse_stmt};
    use timac_system::System;

    fn sample_system() -> System {
        let mut sys = System::new("test");
        sys.declare_intvar("i", 1, 0, 10, 0).unwrap();
        sys.declare_intvar("a", 3, 0, 10, 0).unwrap();
        sys.declare_clock("x", 1).unwrap();
        sys.declare_clock("y", 2).unwrap();
        sys
    }

    fn check_expr(source: &str) -> (TypedExpr, Vec<String>) {
        let sys = sample_system();
        let mut errors = Vec::new();
        let typed = typecheck_expr(
            &parse_expr(source).unwrap(),
            sys.intvars(),
            sys.clocks(),
            &mut |msg| errors.push(msg),
        );
        (typed, errors)
    }

    fn check_stmt(source: &str) -> (TypedStmt, Vec<String>) {
        let sys = sample_system();
        let mut errors = Vec::new();
        let typed = typecheck_stmt(
            &parse_stmt(source).unwrap(),
            sys.intvars(),
            sys.clocks(),
            &mut |msg| errors.push(msg),
        );
        (typed, errors)
    }

    #[test]
    fn test_variable_types() {
        let (typed, errors) = check_expr("i");
        assert_eq!(typed.ty, ExprType::IntLvalue(1));
        assert!(errors.is_empty());

        let (typed, _) = check_expr("a");
        assert_eq!(typed.ty, ExprType::IntArray(3));

        let (typed, _) = check_expr("x");
        assert_eq!(typed.ty, ExprType::ClockLvalue(1));

        let (typed, _) = check_expr("y");
        assert_eq!(typed.ty, ExprType::ClockArray(2));
    }

    #[test]
    fn test_unknown_identifier() {
        let (typed, errors) = check_expr("z");
        assert!(typed.is_bad());
        assert_eq!(errors, vec!["unknown identifier z".to_string()]);
    }

    #[test]
    fn test_variable_resolution_and_offsets() {
        let (typed, _) = check_expr("a[i]");
        assert_eq!(typed.ty, ExprType::IntLvalue(1));
        let TypedExprKind::Index { array, .. } = &typed.kind else {
            panic!("expected index node");
        };
        let var = array.as_var().unwrap();
        assert_eq!(var.offset, 1);
        assert_eq!(var.size, 3);
    }

    #[test]
    fn test_clock_constraint_types() {
        let (typed, errors) = check_expr("x<=5");
        assert_eq!(typed.ty, ExprType::Bool);
        assert!(typed.has_clock_constraint());
        assert!(errors.is_empty());

        let (typed, errors) = check_expr("y[0]<i+3");
        assert_eq!(typed.ty, ExprType::Bool);
        assert!(errors.is_empty());
        assert!(typed.has_clock_constraint());
    }

    #[test]
    fn test_clock_in_arithmetic_rejected() {
        let (typed, errors) = check_expr("x+1<=5");
        assert!(typed.is_bad());
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("clock in arithmetic"));
    }

    #[test]
    fn test_clock_comparison_restrictions() {
        let (typed, errors) = check_expr("5<x");
        assert!(typed.is_bad());
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("left operand"));

        let (typed, errors) = check_expr("x!=3");
        assert!(typed.is_bad());
        assert!(errors[0].contains("!="));

        let (typed, errors) = check_expr("x<y[0]");
        assert!(typed.is_bad());
        assert!(errors[0].contains("two clocks"));
    }

    #[test]
    fn test_clock_constraint_under_negation_rejected() {
        let (typed, errors) = check_expr("!(x<=5)");
        assert!(typed.is_bad());
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("negation"));

        // plain boolean negation stays fine
        let (typed, errors) = check_expr("!(i<3)");
        assert_eq!(typed.ty, ExprType::Bool);
        assert!(errors.is_empty());
    }

    #[test]
    fn test_poison_propagates_without_extra_reports() {
        // one unknown identifier poisons the whole tree but reports once
        let (typed, errors) = check_expr("z+1<3 && i<2");
        assert!(typed.is_bad());
        assert_eq!(errors, vec!["unknown identifier z".to_string()]);
    }

    #[test]
    fn test_index_errors() {
        let (typed, errors) = check_expr("i[0]");
        assert!(typed.is_bad());
        assert!(errors[0].contains("not an array"));

        let (typed, errors) = check_expr("a[x]");
        assert!(typed.is_bad());
        assert!(errors[0].contains("integer term"));
    }

    #[test]
    fn test_int_assign() {
        let (typed, errors) = check_stmt("i=i+1");
        assert_eq!(typed.ty, StmtType::IntAssign);
        assert!(errors.is_empty());

        let (typed, errors) = check_stmt("a[2]=i");
        assert_eq!(typed.ty, StmtType::IntAssign);
        assert!(errors.is_empty());
    }

    #[test]
    fn test_clock_reset() {
        let (typed, errors) = check_stmt("x=0");
        assert_eq!(typed.ty, StmtType::ClockReset);
        assert!(errors.is_empty());

        // constant folding keeps 1-1 legal
        let (typed, errors) = check_stmt("x=1-1");
        assert_eq!(typed.ty, StmtType::ClockReset);
        assert!(errors.is_empty());

        let (typed, errors) = check_stmt("x=1");
        assert!(typed.is_bad());
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("literal 0"));
    }

    #[test]
    fn test_assign_to_non_lvalue_type() {
        // assigning to a whole array is invalid
        let (typed, errors) = check_stmt("a=1");
        assert!(typed.is_bad());
        assert!(errors[0].contains("invalid assignment"));

        // assigning a clock to an integer is invalid
        let (typed, errors) = check_stmt("i=x");
        assert!(typed.is_bad());
        assert!(errors[0].contains("invalid assignment"));
    }

    #[test]
    fn test_sequence_poisoning() {
        let (typed, errors) = check_stmt("i=1; x=3");
        assert!(typed.is_bad());
        assert_eq!(errors.len(), 1);

        let TypedStmtKind::Seq(first, second) = &typed.kind else {
            panic!("expected sequence");
        };
        assert_eq!(first.ty, StmtType::IntAssign);
        assert!(second.is_bad());
    }

    #[test]
    fn test_erase_roundtrip() {
        for source in ["x<=5&&i<3", "a[i+1]>=2||true", "-(i+1)*2==4"] {
            let (typed, _) = check_expr(source);
            assert_eq!(typed.erase(), parse_expr(source).unwrap());
        }
        for source in ["i=i+1; x=0", "nop"] {
            let (typed, _) = check_stmt(source);
            assert_eq!(typed.erase(), parse_stmt(source).unwrap());
        }
    }
}
