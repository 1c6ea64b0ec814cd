//! Canonical compact printing of expressions and statements.
//!
//! The printed form is what diagnostics embed in their context strings
//! (`x<=5`, `i=i+1`) and what the parser accepts back; parentheses are
//! emitted only where precedence requires them, plus wherever the tree
//! carries an explicit parenthesisation.

use crate::ast::{Expr, Stmt};
use std::fmt;

/// Precedence of unary operators (binds tighter than any binary operator).
const UNARY_PREC: u8 = 6;
/// Precedence of array access.
const POSTFIX_PREC: u8 = 7;

/// Pretty print an expression to a string.
pub fn pretty_expr(expr: &Expr) -> String {
    let mut out = String::new();
    print_expr(&mut out, expr, 0);
    out
}

/// Pretty print a statement to a string.
pub fn pretty_stmt(stmt: &Stmt) -> String {
    let mut out = String::new();
    print_stmt(&mut out, stmt);
    out
}

fn print_expr(out: &mut String, expr: &Expr, min_prec: u8) {
    match expr {
        Expr::Int(n) => out.push_str(&n.to_string()),
        Expr::Bool(true) => out.push_str("true"),
        Expr::Bool(false) => out.push_str("false"),
        Expr::Var(name) => out.push_str(name),
        Expr::Index { base, index } => {
            print_expr(out, base, POSTFIX_PREC);
            out.push('[');
            print_expr(out, index, 0);
            out.push(']');
        }
        Expr::Unary { op, operand } => {
            if UNARY_PREC < min_prec {
                out.push('(');
                out.push_str(op.symbol());
                print_expr(out, operand, UNARY_PREC);
                out.push(')');
            } else {
                out.push_str(op.symbol());
                print_expr(out, operand, UNARY_PREC);
            }
        }
        Expr::Binary { op, left, right } => {
            let prec = op.precedence();
            if prec < min_prec {
                out.push('(');
                print_expr(out, left, prec);
                out.push_str(op.symbol());
                print_expr(out, right, prec + 1);
                out.push(')');
            } else {
                print_expr(out, left, prec);
                out.push_str(op.symbol());
                print_expr(out, right, prec + 1);
            }
        }
        Expr::Paren(inner) => {
            out.push('(');
            print_expr(out, inner, 0);
            out.push(')');
        }
    }
}

fn print_stmt(out: &mut String, stmt: &Stmt) {
    match stmt {
        Stmt::Nop => out.push_str("nop"),
        Stmt::Assign { lhs, rhs } => {
            print_expr(out, lhs, 0);
            out.push('=');
            print_expr(out, rhs, 0);
        }
        Stmt::Seq(first, second) => {
            print_stmt(out, first);
            out.push_str("; ");
            print_stmt(out, second);
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&pretty_expr(self))
    }
}

impl fmt::Display for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&pretty_stmt(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BinOp, UnaryOp};

    #[test]
    fn test_print_guard() {
        let e = Expr::binary(BinOp::Le, Expr::var("x"), Expr::Int(5));
        assert_eq!(pretty_expr(&e), "x<=5");
    }

    #[test]
    fn test_print_statement() {
        let s = Stmt::assign(
            Expr::var("i"),
            Expr::binary(BinOp::Add, Expr::var("i"), Expr::Int(1)),
        )
        .unwrap();
        assert_eq!(pretty_stmt(&s), "i=i+1");
    }

    #[test]
    fn test_print_sequence() {
        let s = Stmt::seq(
            Stmt::Nop,
            Stmt::assign(Expr::var("x"), Expr::Int(0)).unwrap(),
        );
        assert_eq!(pretty_stmt(&s), "nop; x=0");
    }

    #[test]
    fn test_minimal_parens() {
        // (a+b)*c needs parens on the left, a*(b+c) on the right
        let left = Expr::binary(
            BinOp::Mul,
            Expr::binary(BinOp::Add, Expr::var("a"), Expr::var("b")),
            Expr::var("c"),
        );
        assert_eq!(pretty_expr(&left), "(a+b)*c");

        // a+b*c needs none
        let flat = Expr::binary(
            BinOp::Add,
            Expr::var("a"),
            Expr::binary(BinOp::Mul, Expr::var("b"), Expr::var("c")),
        );
        assert_eq!(pretty_expr(&flat), "a+b*c");
    }

    #[test]
    fn test_left_associative_parens() {
        // a-(b-c) must keep the parens, (a-b)-c must not
        let right_nested = Expr::binary(
            BinOp::Sub,
            Expr::var("a"),
            Expr::binary(BinOp::Sub, Expr::var("b"), Expr::var("c")),
        );
        assert_eq!(pretty_expr(&right_nested), "a-(b-c)");

        let left_nested = Expr::binary(
            BinOp::Sub,
            Expr::binary(BinOp::Sub, Expr::var("a"), Expr::var("b")),
            Expr::var("c"),
        );
        assert_eq!(pretty_expr(&left_nested), "a-b-c");
    }

    #[test]
    fn test_unary_parens() {
        let e = Expr::unary(
            UnaryOp::Not,
            Expr::binary(BinOp::Lt, Expr::var("a"), Expr::var("b")),
        );
        assert_eq!(pretty_expr(&e), "!(a<b)");

        let tight = Expr::binary(
            BinOp::Mul,
            Expr::unary(UnaryOp::Neg, Expr::var("a")),
            Expr::var("b"),
        );
        assert_eq!(pretty_expr(&tight), "-a*b");
    }

    #[test]
    fn test_explicit_parens_preserved() {
        let e = Expr::paren(Expr::var("x"));
        assert_eq!(pretty_expr(&e), "(x)");
    }
}
