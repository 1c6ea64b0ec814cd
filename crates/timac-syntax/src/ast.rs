//! Abstract syntax tree for invariant, guard, and update annotations.

use thiserror::Error;

/// An expression.
///
/// Expressions range over bounded integer variables and clocks; the variable
/// and array-element forms are the lvalue subset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    /// Integer literal.
    Int(i64),
    /// Boolean literal.
    Bool(bool),
    /// Variable reference (by name).
    Var(String),
    /// Array element access `base[index]`.
    Index { base: Box<Expr>, index: Box<Expr> },
    /// Unary operation.
    Unary { op: UnaryOp, operand: Box<Expr> },
    /// Binary operation.
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Explicit parenthesisation (preserved for printing fidelity).
    Paren(Box<Expr>),
}

impl Expr {
    /// Build a variable reference.
    pub fn var(name: impl Into<String>) -> Self {
        Expr::Var(name.into())
    }

    /// Build an array element access.
    pub fn index(base: Expr, index: Expr) -> Self {
        Expr::Index {
            base: Box::new(base),
            index: Box::new(index),
        }
    }

    /// Build a unary operation.
    pub fn unary(op: UnaryOp, operand: Expr) -> Self {
        Expr::Unary {
            op,
            operand: Box::new(operand),
        }
    }

    /// Build a binary operation.
    pub fn binary(op: BinOp, left: Expr, right: Expr) -> Self {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Build an explicit parenthesisation.
    pub fn paren(inner: Expr) -> Self {
        Expr::Paren(Box::new(inner))
    }

    /// Whether this expression may appear on the left of an assignment.
    pub fn is_lvalue(&self) -> bool {
        matches!(
            self.unparenthesized(),
            Expr::Var(_) | Expr::Index { .. }
        )
    }

    /// The expression with explicit parentheses stripped.
    pub fn unparenthesized(&self) -> &Expr {
        let mut e = self;
        while let Expr::Paren(inner) = e {
            e = inner;
        }
        e
    }

    /// Whether this expression is the literal `true`, possibly parenthesised.
    pub fn is_trivially_true(&self) -> bool {
        matches!(self.unparenthesized(), Expr::Bool(true))
    }

    /// A copy of this expression with all explicit parentheses removed.
    ///
    /// Two expressions that differ only in redundant parenthesisation
    /// normalise to the same tree.
    pub fn strip_parens(&self) -> Expr {
        match self {
            Expr::Int(n) => Expr::Int(*n),
            Expr::Bool(b) => Expr::Bool(*b),
            Expr::Var(name) => Expr::Var(name.clone()),
            Expr::Index { base, index } => Expr::index(base.strip_parens(), index.strip_parens()),
            Expr::Unary { op, operand } => Expr::unary(*op, operand.strip_parens()),
            Expr::Binary { op, left, right } => {
                Expr::binary(*op, left.strip_parens(), right.strip_parens())
            }
            Expr::Paren(inner) => inner.strip_parens(),
        }
    }
}

/// Binary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,

    // Comparison
    Lt,
    Le,
    Eq,
    Ne,
    Ge,
    Gt,

    // Logical
    And,
    Or,
}

impl BinOp {
    /// Get the precedence of this operator (higher = binds tighter).
    pub fn precedence(self) -> u8 {
        match self {
            BinOp::Or => 1,
            BinOp::And => 2,
            BinOp::Lt | BinOp::Le | BinOp::Eq | BinOp::Ne | BinOp::Ge | BinOp::Gt => 3,
            BinOp::Add | BinOp::Sub => 4,
            BinOp::Mul | BinOp::Div | BinOp::Mod => 5,
        }
    }

    /// Whether this is an arithmetic operator.
    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Mod
        )
    }

    /// Whether this is a comparison operator.
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinOp::Lt | BinOp::Le | BinOp::Eq | BinOp::Ne | BinOp::Ge | BinOp::Gt
        )
    }

    /// Whether this is a logical connective.
    pub fn is_logical(self) -> bool {
        matches!(self, BinOp::And | BinOp::Or)
    }

    /// The concrete syntax of this operator.
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Ge => ">=",
            BinOp::Gt => ">",
            BinOp::And => "&&",
            BinOp::Or => "||",
        }
    }
}

/// Unary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

impl UnaryOp {
    /// The concrete syntax of this operator.
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Not => "!",
        }
    }
}

/// Error from [`Stmt::assign`] when the left operand is not an lvalue.
#[derive(Debug, Error)]
#[error("assignment left-hand side must be a variable or array element, got {lhs}")]
pub struct InvalidLvalue {
    /// Printed form of the rejected left operand.
    pub lhs: String,
}

/// A statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stmt {
    /// No operation.
    Nop,
    /// Assignment `lhs = rhs`. Build through [`Stmt::assign`], which checks
    /// that `lhs` is an lvalue.
    Assign { lhs: Expr, rhs: Expr },
    /// Sequential composition `first; second`.
    Seq(Box<Stmt>, Box<Stmt>),
}

impl Stmt {
    /// Build an assignment statement.
    ///
    /// Only variables and array elements may be assigned; any other left
    /// operand is rejected.
    pub fn assign(lhs: Expr, rhs: Expr) -> Result<Stmt, InvalidLvalue> {
        if lhs.is_lvalue() {
            Ok(Stmt::Assign { lhs, rhs })
        } else {
            Err(InvalidLvalue {
                lhs: lhs.to_string(),
            })
        }
    }

    /// Build a sequential composition.
    pub fn seq(first: Stmt, second: Stmt) -> Stmt {
        Stmt::Seq(Box::new(first), Box::new(second))
    }

    /// A copy of this statement with all explicit parentheses removed from
    /// its expressions.
    pub fn strip_parens(&self) -> Stmt {
        match self {
            Stmt::Nop => Stmt::Nop,
            Stmt::Assign { lhs, rhs } => Stmt::Assign {
                lhs: lhs.strip_parens(),
                rhs: rhs.strip_parens(),
            },
            Stmt::Seq(first, second) => Stmt::seq(first.strip_parens(), second.strip_parens()),
        }
    }
}
