//! Typed abstract syntax trees.
//!
//! A typed tree mirrors its raw counterpart one-to-one; every node carries a
//! value type (expressions) or statement kind (statements), and variable
//! nodes carry their resolved id and flat offset. A `Bad` tag marks a node
//! that could not be typed and poisons every ancestor.

use std::fmt;
use timac_syntax::{BinOp, Expr, Stmt, UnaryOp};
use timac_system::VarId;

/// Value type of a typed expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExprType {
    /// Boolean formula.
    Bool,
    /// Integer term.
    IntTerm,
    /// Clock term.
    ClockTerm,
    /// Assignable integer cell; the payload is the lvalue width.
    IntLvalue(u32),
    /// Assignable clock cell; the payload is the lvalue width.
    ClockLvalue(u32),
    /// Whole integer array of the given size.
    IntArray(u32),
    /// Whole clock array of the given size.
    ClockArray(u32),
    /// Could not be typed.
    Bad,
}

impl ExprType {
    /// Whether this is the ill-typed tag.
    pub fn is_bad(self) -> bool {
        self == ExprType::Bad
    }
}

impl fmt::Display for ExprType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExprType::Bool => write!(f, "bool"),
            ExprType::IntTerm => write!(f, "int term"),
            ExprType::ClockTerm => write!(f, "clock term"),
            ExprType::IntLvalue(_) => write!(f, "int lvalue"),
            ExprType::ClockLvalue(_) => write!(f, "clock lvalue"),
            ExprType::IntArray(size) => write!(f, "int array[{}]", size),
            ExprType::ClockArray(size) => write!(f, "clock array[{}]", size),
            ExprType::Bad => write!(f, "ill-typed"),
        }
    }
}

/// Kind of a typed statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StmtType {
    /// No operation.
    Nop,
    /// Integer assignment.
    IntAssign,
    /// Clock reset to zero.
    ClockReset,
    /// Sequential composition of well-typed statements.
    Seq,
    /// Could not be typed.
    Bad,
}

impl StmtType {
    /// Whether this is the ill-typed tag.
    pub fn is_bad(self) -> bool {
        self == StmtType::Bad
    }
}

/// A resolved variable occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarRef {
    /// Source name.
    pub name: String,
    /// Id within the variable's catalog.
    pub id: VarId,
    /// First flat cell of the variable.
    pub offset: u32,
    /// Declared array size; 1 for scalars.
    pub size: u32,
}

/// A typed expression.
#[derive(Debug, Clone)]
pub struct TypedExpr {
    pub ty: ExprType,
    pub kind: TypedExprKind,
}

/// The node shape of a typed expression.
#[derive(Debug, Clone)]
pub enum TypedExprKind {
    Int(i64),
    Bool(bool),
    Var(VarRef),
    Index {
        array: Box<TypedExpr>,
        index: Box<TypedExpr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<TypedExpr>,
    },
    Binary {
        op: BinOp,
        left: Box<TypedExpr>,
        right: Box<TypedExpr>,
    },
    Paren(Box<TypedExpr>),
}

impl TypedExpr {
    pub fn new(ty: ExprType, kind: TypedExprKind) -> Self {
        Self { ty, kind }
    }

    /// Whether this node is tagged ill-typed.
    pub fn is_bad(&self) -> bool {
        self.ty.is_bad()
    }

    /// The resolved variable behind this node, looking through parentheses.
    pub fn as_var(&self) -> Option<&VarRef> {
        match &self.kind {
            TypedExprKind::Var(var) => Some(var),
            TypedExprKind::Paren(inner) => inner.as_var(),
            _ => None,
        }
    }

    /// Dispatch to a visitor callback for this node.
    pub fn visit<V: TypedExprVisitor + ?Sized>(&self, visitor: &mut V) {
        match &self.kind {
            TypedExprKind::Int(value) => visitor.visit_int(*value, self.ty),
            TypedExprKind::Bool(value) => visitor.visit_bool(*value, self.ty),
            TypedExprKind::Var(var) => visitor.visit_var(var, self.ty),
            TypedExprKind::Index { array, index } => visitor.visit_index(array, index, self.ty),
            TypedExprKind::Unary { op, operand } => visitor.visit_unary(*op, operand, self.ty),
            TypedExprKind::Binary { op, left, right } => {
                visitor.visit_binary(*op, left, right, self.ty)
            }
            TypedExprKind::Paren(inner) => visitor.visit_paren(inner, self.ty),
        }
    }

    /// Whether this expression contains a clock constraint (a comparison
    /// whose left operand is a clock).
    pub fn has_clock_constraint(&self) -> bool {
        let mut scan = ConstraintScan { found: false };
        self.visit(&mut scan);
        scan.found
    }

    /// Erase type information, recovering the raw expression.
    pub fn erase(&self) -> Expr {
        match &self.kind {
            TypedExprKind::Int(value) => Expr::Int(*value),
            TypedExprKind::Bool(value) => Expr::Bool(*value),
            TypedExprKind::Var(var) => Expr::Var(var.name.clone()),
            TypedExprKind::Index { array, index } => Expr::index(array.erase(), index.erase()),
            TypedExprKind::Unary { op, operand } => Expr::unary(*op, operand.erase()),
            TypedExprKind::Binary { op, left, right } => {
                Expr::binary(*op, left.erase(), right.erase())
            }
            TypedExprKind::Paren(inner) => Expr::paren(inner.erase()),
        }
    }
}

impl fmt::Display for TypedExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.erase())
    }
}

/// Visitor over typed expressions, one callback per variant.
///
/// Dispatch visits a single node; visitors recurse through the children
/// they are handed.
pub trait TypedExprVisitor {
    fn visit_int(&mut self, value: i64, ty: ExprType);
    fn visit_bool(&mut self, value: bool, ty: ExprType);
    fn visit_var(&mut self, var: &VarRef, ty: ExprType);
    fn visit_index(&mut self, array: &TypedExpr, index: &TypedExpr, ty: ExprType);
    fn visit_unary(&mut self, op: UnaryOp, operand: &TypedExpr, ty: ExprType);
    fn visit_binary(&mut self, op: BinOp, left: &TypedExpr, right: &TypedExpr, ty: ExprType);
    fn visit_paren(&mut self, inner: &TypedExpr, ty: ExprType);
}

struct ConstraintScan {
    found: bool,
}

impl TypedExprVisitor for ConstraintScan {
    fn visit_int(&mut self, _value: i64, _ty: ExprType) {}
    fn visit_bool(&mut self, _value: bool, _ty: ExprType) {}
    fn visit_var(&mut self, _var: &VarRef, _ty: ExprType) {}

    fn visit_index(&mut self, array: &TypedExpr, index: &TypedExpr, _ty: ExprType) {
        array.visit(self);
        index.visit(self);
    }

    fn visit_unary(&mut self, _op: UnaryOp, operand: &TypedExpr, _ty: ExprType) {
        operand.visit(self);
    }

    fn visit_binary(&mut self, op: BinOp, left: &TypedExpr, right: &TypedExpr, _ty: ExprType) {
        if op.is_comparison() && matches!(left.ty, ExprType::ClockLvalue(_)) {
            self.found = true;
        }
        left.visit(self);
        right.visit(self);
    }

    fn visit_paren(&mut self, inner: &TypedExpr, _ty: ExprType) {
        inner.visit(self);
    }
}

/// A typed statement.
#[derive(Debug, Clone)]
pub struct TypedStmt {
    pub ty: StmtType,
    pub kind: TypedStmtKind,
}

/// The node shape of a typed statement.
#[derive(Debug, Clone)]
pub enum TypedStmtKind {
    Nop,
    Assign {
        lhs: TypedExpr,
        rhs: TypedExpr,
    },
    Seq(Box<TypedStmt>, Box<TypedStmt>),
}

impl TypedStmt {
    pub fn new(ty: StmtType, kind: TypedStmtKind) -> Self {
        Self { ty, kind }
    }

    /// Whether this node is tagged ill-typed.
    pub fn is_bad(&self) -> bool {
        self.ty.is_bad()
    }

    /// Dispatch to a visitor callback for this node.
    pub fn visit<V: TypedStmtVisitor + ?Sized>(&self, visitor: &mut V) {
        match &self.kind {
            TypedStmtKind::Nop => visitor.visit_nop(self.ty),
            TypedStmtKind::Assign { lhs, rhs } => visitor.visit_assign(lhs, rhs, self.ty),
            TypedStmtKind::Seq(first, second) => visitor.visit_seq(first, second, self.ty),
        }
    }

    /// Erase type information, recovering the raw statement.
    pub fn erase(&self) -> Stmt {
        match &self.kind {
            TypedStmtKind::Nop => Stmt::Nop,
            TypedStmtKind::Assign { lhs, rhs } => Stmt::Assign {
                lhs: lhs.erase(),
                rhs: rhs.erase(),
            },
            TypedStmtKind::Seq(first, second) => Stmt::seq(first.erase(), second.erase()),
        }
    }
}

impl fmt::Display for TypedStmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.erase())
    }
}

/// Visitor over typed statements, one callback per variant.
pub trait TypedStmtVisitor {
    fn visit_nop(&mut self, ty: StmtType);
    fn visit_assign(&mut self, lhs: &TypedExpr, rhs: &TypedExpr, ty: StmtType);
    fn visit_seq(&mut self, first: &TypedStmt, second: &TypedStmt, ty: StmtType);
}
