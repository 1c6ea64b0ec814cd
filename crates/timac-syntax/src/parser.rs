//! Recursive descent parser for invariant, guard, and update annotations.

use crate::ast::{BinOp, Expr, Stmt, UnaryOp};
use crate::lexer::Lexer;
use crate::token::{Span, Token, TokenKind};
use thiserror::Error;

/// Parser error.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("unexpected token at {span}: expected {expected}, found {found}")]
    UnexpectedToken {
        expected: String,
        found: String,
        span: Span,
    },
    #[error("invalid syntax at {span}: {message}")]
    InvalidSyntax { message: String, span: Span },
}

impl ParseError {
    /// Get the source span where this error occurred.
    pub fn span(&self) -> Span {
        match self {
            ParseError::UnexpectedToken { span, .. } => *span,
            ParseError::InvalidSyntax { span, .. } => *span,
        }
    }
}

pub type ParseResult<T> = Result<T, ParseError>;

/// Parse a complete expression.
pub fn parse_expr(source: &str) -> ParseResult<Expr> {
    Parser::new(source).parse_expr()
}

/// Parse a complete statement.
pub fn parse_stmt(source: &str) -> ParseResult<Stmt> {
    Parser::new(source).parse_stmt()
}

/// Parser for annotation source text.
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    /// Create a new parser from source text.
    pub fn new(source: &str) -> Self {
        Self {
            tokens: Lexer::new(source).tokenize(),
            pos: 0,
        }
    }

    /// Parse an expression covering the whole input.
    pub fn parse_expr(&mut self) -> ParseResult<Expr> {
        let expr = self.expr(0)?;
        self.expect_eof()?;
        Ok(expr)
    }

    /// Parse a statement covering the whole input.
    pub fn parse_stmt(&mut self) -> ParseResult<Stmt> {
        let stmt = self.stmt()?;
        self.expect_eof()?;
        Ok(stmt)
    }

    // === Statements ===

    /// `stmt := simple (';' simple)*`, sequences associated to the left.
    fn stmt(&mut self) -> ParseResult<Stmt> {
        let mut stmt = self.simple_stmt()?;
        while self.match_token(&TokenKind::Semicolon) {
            let next = self.simple_stmt()?;
            stmt = Stmt::seq(stmt, next);
        }
        Ok(stmt)
    }

    /// `simple := 'nop' | lvalue '=' expr`
    fn simple_stmt(&mut self) -> ParseResult<Stmt> {
        if self.match_token(&TokenKind::Nop) {
            return Ok(Stmt::Nop);
        }

        let lhs_span = self.current_span();
        let lhs = self.expr(0)?;
        self.expect(TokenKind::Assign)?;
        let rhs = self.expr(0)?;

        Stmt::assign(lhs, rhs).map_err(|e| ParseError::InvalidSyntax {
            message: e.to_string(),
            span: lhs_span,
        })
    }

    // === Expressions ===

    /// Precedence-climbing expression parser.
    fn expr(&mut self, min_prec: u8) -> ParseResult<Expr> {
        let mut left = self.unary_expr()?;

        while let Some(op) = self.peek_binop() {
            let prec = op.precedence();
            if prec < min_prec {
                break;
            }
            self.advance();
            // All operators are left-associative.
            let right = self.expr(prec + 1)?;
            left = Expr::binary(op, left, right);
        }

        Ok(left)
    }

    fn peek_binop(&self) -> Option<BinOp> {
        match self.peek_kind() {
            TokenKind::OrOr => Some(BinOp::Or),
            TokenKind::AndAnd => Some(BinOp::And),
            TokenKind::Lt => Some(BinOp::Lt),
            TokenKind::Le => Some(BinOp::Le),
            TokenKind::EqEq => Some(BinOp::Eq),
            TokenKind::Ne => Some(BinOp::Ne),
            TokenKind::Ge => Some(BinOp::Ge),
            TokenKind::Gt => Some(BinOp::Gt),
            TokenKind::Plus => Some(BinOp::Add),
            TokenKind::Minus => Some(BinOp::Sub),
            TokenKind::Star => Some(BinOp::Mul),
            TokenKind::Slash => Some(BinOp::Div),
            TokenKind::Percent => Some(BinOp::Mod),
            _ => None,
        }
    }

    fn unary_expr(&mut self) -> ParseResult<Expr> {
        if self.match_token(&TokenKind::Minus) {
            let operand = self.unary_expr()?;
            return Ok(Expr::unary(UnaryOp::Neg, operand));
        }
        if self.match_token(&TokenKind::Bang) {
            let operand = self.unary_expr()?;
            return Ok(Expr::unary(UnaryOp::Not, operand));
        }
        self.postfix_expr()
    }

    fn postfix_expr(&mut self) -> ParseResult<Expr> {
        let mut expr = self.primary_expr()?;
        while self.match_token(&TokenKind::LBracket) {
            let index = self.expr(0)?;
            self.expect(TokenKind::RBracket)?;
            expr = Expr::index(expr, index);
        }
        Ok(expr)
    }

    fn primary_expr(&mut self) -> ParseResult<Expr> {
        let token = self.advance();
        match token.kind {
            TokenKind::Int(n) => Ok(Expr::Int(n)),
            TokenKind::True => Ok(Expr::Bool(true)),
            TokenKind::False => Ok(Expr::Bool(false)),
            TokenKind::Ident(name) => Ok(Expr::Var(name)),
            TokenKind::LParen => {
                let inner = self.expr(0)?;
                self.expect(TokenKind::RParen)?;
                Ok(Expr::paren(inner))
            }
            kind => Err(ParseError::UnexpectedToken {
                expected: "expression".to_string(),
                found: kind.to_string(),
                span: token.span,
            }),
        }
    }

    // === Token helpers ===

    fn peek_kind(&self) -> &TokenKind {
        &self.tokens[self.pos.min(self.tokens.len() - 1)].kind
    }

    fn current_span(&self) -> Span {
        self.tokens[self.pos.min(self.tokens.len() - 1)].span
    }

    fn advance(&mut self) -> Token {
        let token = self.tokens[self.pos.min(self.tokens.len() - 1)].clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn match_token(&mut self, kind: &TokenKind) -> bool {
        if self.peek_kind() == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind) -> ParseResult<Token> {
        if self.peek_kind() == &kind {
            Ok(self.advance())
        } else {
            Err(ParseError::UnexpectedToken {
                expected: kind.to_string(),
                found: self.peek_kind().to_string(),
                span: self.current_span(),
            })
        }
    }

    fn expect_eof(&mut self) -> ParseResult<()> {
        match self.peek_kind() {
            TokenKind::Eof => Ok(()),
            kind => Err(ParseError::UnexpectedToken {
                expected: "end of input".to_string(),
                found: kind.to_string(),
                span: self.current_span(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_clock_guard() {
        let e = parse_expr("x<=5").unwrap();
        assert_eq!(
            e,
            Expr::binary(BinOp::Le, Expr::var("x"), Expr::Int(5))
        );
    }

    #[test]
    fn test_parse_precedence() {
        // a+b*c parses the multiplication first
        let e = parse_expr("a+b*c").unwrap();
        assert_eq!(
            e,
            Expr::binary(
                BinOp::Add,
                Expr::var("a"),
                Expr::binary(BinOp::Mul, Expr::var("b"), Expr::var("c")),
            )
        );

        // comparisons bind looser than arithmetic, logical looser still
        let e = parse_expr("a+1<b && c>0").unwrap();
        assert_eq!(
            e,
            Expr::binary(
                BinOp::And,
                Expr::binary(
                    BinOp::Lt,
                    Expr::binary(BinOp::Add, Expr::var("a"), Expr::Int(1)),
                    Expr::var("b"),
                ),
                Expr::binary(BinOp::Gt, Expr::var("c"), Expr::Int(0)),
            )
        );
    }

    #[test]
    fn test_parse_left_associativity() {
        let e = parse_expr("a-b-c").unwrap();
        assert_eq!(
            e,
            Expr::binary(
                BinOp::Sub,
                Expr::binary(BinOp::Sub, Expr::var("a"), Expr::var("b")),
                Expr::var("c"),
            )
        );
    }

    #[test]
    fn test_parse_parens_and_unary() {
        let e = parse_expr("-(a+b)*!c").unwrap();
        assert_eq!(
            e,
            Expr::binary(
                BinOp::Mul,
                Expr::unary(
                    UnaryOp::Neg,
                    Expr::paren(Expr::binary(BinOp::Add, Expr::var("a"), Expr::var("b"))),
                ),
                Expr::unary(UnaryOp::Not, Expr::var("c")),
            )
        );
    }

    #[test]
    fn test_parse_array_access() {
        let e = parse_expr("a[i+1]<3").unwrap();
        assert_eq!(
            e,
            Expr::binary(
                BinOp::Lt,
                Expr::index(
                    Expr::var("a"),
                    Expr::binary(BinOp::Add, Expr::var("i"), Expr::Int(1)),
                ),
                Expr::Int(3),
            )
        );
    }

    #[test]
    fn test_parse_statement_sequence() {
        let s = parse_stmt("i=i+1; x=0; nop").unwrap();
        assert_eq!(
            s,
            Stmt::seq(
                Stmt::seq(
                    Stmt::assign(
                        Expr::var("i"),
                        Expr::binary(BinOp::Add, Expr::var("i"), Expr::Int(1)),
                    )
                    .unwrap(),
                    Stmt::assign(Expr::var("x"), Expr::Int(0)).unwrap(),
                ),
                Stmt::Nop,
            )
        );
    }

    #[test]
    fn test_parse_assignment_to_array_element() {
        let s = parse_stmt("a[2]=a[1]").unwrap();
        assert_eq!(
            s,
            Stmt::assign(
                Expr::index(Expr::var("a"), Expr::Int(2)),
                Expr::index(Expr::var("a"), Expr::Int(1)),
            )
            .unwrap()
        );
    }

    #[test]
    fn test_parse_rejects_non_lvalue_assignment() {
        let err = parse_stmt("1=2").unwrap_err();
        assert!(matches!(err, ParseError::InvalidSyntax { .. }));

        let err = parse_stmt("x+1=2").unwrap_err();
        assert!(matches!(err, ParseError::InvalidSyntax { .. }));
    }

    #[test]
    fn test_parse_rejects_trailing_tokens() {
        assert!(parse_expr("x<=5 5").is_err());
        assert!(parse_expr("").is_err());
        assert!(parse_stmt("x=1;").is_err());
    }

    #[test]
    fn test_roundtrip_through_pretty() {
        for src in [
            "x<=5",
            "i<3&&j>=0||!b",
            "a[i]+b[j*2]%3",
            "-(x+y)*z",
            "(x)",
        ] {
            let e = parse_expr(src).unwrap();
            let printed = e.to_string();
            let reparsed = parse_expr(&printed).unwrap();
            assert_eq!(e.strip_parens(), reparsed.strip_parens(), "source {src}");
        }
        for src in ["nop", "i=i+1", "x=0; y[i]=y[i]-1; nop"] {
            let s = parse_stmt(src).unwrap();
            let printed = s.to_string();
            let reparsed = parse_stmt(&printed).unwrap();
            assert_eq!(s.strip_parens(), reparsed.strip_parens(), "source {src}");
        }
    }
}
