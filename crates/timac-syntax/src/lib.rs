//! Lexer, parser, and AST for the timac annotation language.
//!
//! Location invariants and edge guards are boolean expressions over bounded
//! integer variables and clocks; edge updates are sequences of integer
//! assignments and clock resets.

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod pretty;
pub mod token;

pub use ast::{BinOp, Expr, InvalidLvalue, Stmt, UnaryOp};
pub use lexer::Lexer;
pub use parser::{parse_expr, parse_stmt, ParseError, ParseResult, Parser};
pub use pretty::{pretty_expr, pretty_stmt};
pub use token::{Span, Token, TokenKind};
