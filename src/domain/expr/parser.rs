//! Recursive descent parser for indicator expressions.
//!
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := factor (('*' | '/' | '%') factor)*
//! factor  := unary ('^' factor)?
//! unary   := '-' unary | primary
//! primary := number | '(' expr ')' | field ('[' integer ']')? | call
//! call    := ident '(' args? ')'
//! ```
//!
//! Unary minus becomes `0 - operand`. Errors carry the byte offset of the
//! offending token. Trees deeper than [`MAX_DEPTH`] are rejected.

use crate::domain::error::SyntaxError;
use crate::domain::expr::ast::{BinaryOp, Expr, MathFunction, SeriesFunction};
use crate::domain::expr::token::{Token, TokenKind, tokenize};
use crate::domain::price_field::PriceField;

/// Deepest expression tree accepted. Evaluation and display recurse once per level.
pub const MAX_DEPTH: usize = 256;

/// A parsed subtree and its height.
struct Node {
    expr: Expr,
    height: usize,
}

impl Node {
    fn leaf(expr: Expr) -> Self {
        Self { expr, height: 1 }
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    /// The token stream always ends with `End`, and `advance` never moves past it.
    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if token.kind != TokenKind::End {
            self.pos += 1;
        }
        token
    }

    fn check(&self, kind: &TokenKind) -> bool {
        &self.peek().kind == kind
    }

    fn consume(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn found(&self) -> String {
        let token = self.peek();
        match token.kind {
            TokenKind::End => "end of input".to_string(),
            _ => format!("'{}'", token.text),
        }
    }

    fn error_here(&self, expected: &str) -> SyntaxError {
        SyntaxError::new(
            format!("expected {expected}, found {}", self.found()),
            self.peek().position,
        )
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token, SyntaxError> {
        if self.check(&kind) {
            Ok(self.advance())
        } else {
            Err(self.error_here(&format!("'{kind}'")))
        }
    }

    fn too_deep(position: usize) -> SyntaxError {
        SyntaxError::new(
            format!("expression nested too deeply, at most {MAX_DEPTH} levels"),
            position,
        )
    }

    /// Guard one level of parser recursion.
    fn enter(&mut self) -> Result<(), SyntaxError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(Self::too_deep(self.peek().position));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    fn node(
        expr: Expr,
        children: impl IntoIterator<Item = usize>,
        position: usize,
    ) -> Result<Node, SyntaxError> {
        let height = 1 + children.into_iter().max().unwrap_or(0);
        if height > MAX_DEPTH {
            return Err(Self::too_deep(position));
        }
        Ok(Node { expr, height })
    }

    fn binary(op: BinaryOp, left: Node, right: Node, position: usize) -> Result<Node, SyntaxError> {
        let heights = [left.height, right.height];
        Self::node(binary(op, left.expr, right.expr), heights, position)
    }

    fn parse_expr(&mut self) -> Result<Node, SyntaxError> {
        let mut left = self.parse_term()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => return Ok(left),
            };
            let position = self.advance().position;
            let right = self.parse_term()?;
            left = Self::binary(op, left, right, position)?;
        }
    }

    fn parse_term(&mut self) -> Result<Node, SyntaxError> {
        let mut left = self.parse_factor()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Percent => BinaryOp::Mod,
                _ => return Ok(left),
            };
            let position = self.advance().position;
            let right = self.parse_factor()?;
            left = Self::binary(op, left, right, position)?;
        }
    }

    fn parse_factor(&mut self) -> Result<Node, SyntaxError> {
        let base = self.parse_unary()?;
        if self.check(&TokenKind::Caret) {
            let position = self.advance().position;
            self.enter()?;
            let exponent = self.parse_factor()?;
            self.leave();
            return Self::binary(BinaryOp::Pow, base, exponent, position);
        }
        Ok(base)
    }

    fn parse_unary(&mut self) -> Result<Node, SyntaxError> {
        if self.check(&TokenKind::Minus) {
            let position = self.advance().position;
            self.enter()?;
            let operand = self.parse_unary()?;
            self.leave();
            let zero = Node::leaf(Expr::Number(0.0));
            return Self::binary(BinaryOp::Sub, zero, operand, position);
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Node, SyntaxError> {
        match self.peek().kind.clone() {
            TokenKind::Number(n) => {
                self.advance();
                Ok(Node::leaf(Expr::Number(n)))
            }
            TokenKind::LParen => {
                self.advance();
                self.enter()?;
                let inner = self.parse_expr()?;
                self.expect(TokenKind::RParen)?;
                self.leave();
                Ok(inner)
            }
            TokenKind::Ident(name) => {
                let token = self.advance();
                self.parse_ident(&name, &token)
            }
            _ => Err(self.error_here("operand")),
        }
    }

    fn parse_ident(&mut self, name: &str, token: &Token) -> Result<Node, SyntaxError> {
        if let Some(field) = PriceField::from_name(name) {
            if self.check(&TokenKind::LParen) {
                return Err(SyntaxError::new(
                    format!("'{}' is a price field and cannot be called", token.text),
                    token.position,
                ));
            }
            let offset = self.parse_offset()?;
            return Ok(Node::leaf(Expr::Field { field, offset }));
        }
        if let Some(func) = MathFunction::from_name(name) {
            return self.parse_function(func, token);
        }
        if let Some(func) = SeriesFunction::from_name(name) {
            return self.parse_indicator(func, token);
        }
        Err(SyntaxError::new(
            format!("unknown identifier '{}'", token.text),
            token.position,
        ))
    }

    fn parse_offset(&mut self) -> Result<usize, SyntaxError> {
        if !self.consume(&TokenKind::LBracket) {
            return Ok(0);
        }
        let token = self.peek().clone();
        let offset = match token.kind {
            TokenKind::Number(n) if token.is_integer_literal() && n <= u32::MAX as f64 => n as usize,
            _ => {
                return Err(SyntaxError::new(
                    format!("offset must be a non-negative integer, found {}", self.found()),
                    token.position,
                ));
            }
        };
        self.advance();
        self.expect(TokenKind::RBracket)?;
        Ok(offset)
    }

    fn expect_call_paren(&mut self, token: &Token) -> Result<(), SyntaxError> {
        if self.consume(&TokenKind::LParen) {
            Ok(())
        } else {
            Err(SyntaxError::new(
                format!("expected '(' after '{}', found {}", token.text, self.found()),
                self.peek().position,
            ))
        }
    }

    fn parse_function(&mut self, func: MathFunction, token: &Token) -> Result<Node, SyntaxError> {
        self.expect_call_paren(token)?;
        self.enter()?;
        let mut args = Vec::new();
        if !self.check(&TokenKind::RParen) {
            args.push(self.parse_expr()?);
            while self.consume(&TokenKind::Comma) {
                args.push(self.parse_expr()?);
            }
        }
        self.expect(TokenKind::RParen)?;
        self.leave();

        let (min, max) = func.arity();
        let count = args.len();
        if count < min || max.is_some_and(|max| count > max) {
            let expected = match max {
                Some(max) if max == min => format!("{min}"),
                Some(max) => format!("{min} to {max}"),
                None => format!("at least {min}"),
            };
            return Err(SyntaxError::new(
                format!("'{}' takes {expected} argument(s), got {count}", func.name()),
                token.position,
            ));
        }
        let heights: Vec<usize> = args.iter().map(|a| a.height).collect();
        let args = args.into_iter().map(|a| a.expr).collect();
        Self::node(Expr::Function { func, args }, heights, token.position)
    }

    /// `NAME(period)` over close, or `NAME(source, period)`.
    fn parse_indicator(&mut self, func: SeriesFunction, token: &Token) -> Result<Node, SyntaxError> {
        self.expect_call_paren(token)?;
        self.enter()?;
        let first_pos = self.peek().position;
        let first = self.parse_expr()?;
        let (source, period, period_pos) = if self.consume(&TokenKind::Comma) {
            let period_pos = self.peek().position;
            let period = self.parse_expr()?;
            (first, period, period_pos)
        } else {
            let close = Node::leaf(Expr::Field {
                field: PriceField::Close,
                offset: 0,
            });
            (close, first, first_pos)
        };
        self.expect(TokenKind::RParen)?;
        self.leave();

        let period = match period.expr {
            Expr::Number(n) if n >= 1.0 && n.fract() == 0.0 && n <= u32::MAX as f64 => n as usize,
            other => {
                return Err(SyntaxError::new(
                    format!(
                        "period of {} must be a positive integer literal, found {other}",
                        func.name()
                    ),
                    period_pos,
                ));
            }
        };
        let indicator = Expr::Indicator {
            func,
            source: Box::new(source.expr),
            period,
        };
        Self::node(indicator, [source.height], token.position)
    }

    fn parse(&mut self) -> Result<Expr, SyntaxError> {
        if self.check(&TokenKind::End) {
            return Err(SyntaxError::new("empty expression", self.peek().position));
        }
        let root = self.parse_expr()?;
        if !self.check(&TokenKind::End) {
            return Err(SyntaxError::new(
                format!("unexpected {} after expression", self.found()),
                self.peek().position,
            ));
        }
        Ok(root.expr)
    }
}

fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    Expr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

/// Parse an expression such as `SMA(close, 20) + ATR(14) * 2`.
pub fn parse(input: &str) -> Result<Expr, SyntaxError> {
    let tokens = tokenize(input)?;
    Parser::new(tokens).parse()
}
