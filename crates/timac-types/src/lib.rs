//! Typed AST and type checker for timac annotations.
//!
//! Typing distinguishes the integer and clock universes: clocks never enter
//! arithmetic, compare only against integer bounds, and may only be reset
//! to zero. User errors flow through an injected reporter; untypable nodes
//! are tagged and poison their ancestors.

pub mod check;
pub mod diag;
pub mod infer;
pub mod typed;

pub use check::{typecheck_expr, typecheck_stmt};
pub use diag::{Diagnostic, DiagnosticSink, Diagnostics};
pub use typed::{
    ExprType, StmtType, TypedExpr, TypedExprKind, TypedExprVisitor, TypedStmt, TypedStmtKind,
    TypedStmtVisitor, VarRef,
};
