//! Tokenizer for indicator expressions.

use std::fmt;

use crate::domain::error::SyntaxError;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Number(f64),
    /// Lowercased identifier.
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Caret,
    LParen,
    RParen,
    Comma,
    LBracket,
    RBracket,
    End,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Number(n) => write!(f, "{n}"),
            TokenKind::Ident(name) => f.write_str(name),
            TokenKind::Plus => f.write_str("+"),
            TokenKind::Minus => f.write_str("-"),
            TokenKind::Star => f.write_str("*"),
            TokenKind::Slash => f.write_str("/"),
            TokenKind::Percent => f.write_str("%"),
            TokenKind::Caret => f.write_str("^"),
            TokenKind::LParen => f.write_str("("),
            TokenKind::RParen => f.write_str(")"),
            TokenKind::Comma => f.write_str(","),
            TokenKind::LBracket => f.write_str("["),
            TokenKind::RBracket => f.write_str("]"),
            TokenKind::End => f.write_str("end of input"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Byte offset of the token's first character.
    pub position: usize,
    /// Source text of the token, empty for `End`.
    pub text: String,
}

impl Token {
    /// A number written without a decimal point.
    pub fn is_integer_literal(&self) -> bool {
        matches!(self.kind, TokenKind::Number(_)) && !self.text.contains('.')
    }
}

struct Lexer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) {
        while let Some(ch) = self.peek() {
            if pred(ch) {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn number(&mut self, start: usize) -> Result<Token, SyntaxError> {
        self.take_while(|c| c.is_ascii_digit());
        if self.peek() == Some('.') {
            self.advance();
            self.take_while(|c| c.is_ascii_digit());
        }
        let text = &self.input[start..self.pos];
        let value = text
            .parse::<f64>()
            .map_err(|_| SyntaxError::new(format!("invalid number '{text}'"), start))?;
        Ok(Token {
            kind: TokenKind::Number(value),
            position: start,
            text: text.to_string(),
        })
    }

    fn ident(&mut self, start: usize) -> Token {
        self.take_while(|c| c.is_ascii_alphanumeric() || c == '_');
        let text = &self.input[start..self.pos];
        Token {
            kind: TokenKind::Ident(text.to_ascii_lowercase()),
            position: start,
            text: text.to_string(),
        }
    }

    fn next_token(&mut self) -> Result<Token, SyntaxError> {
        self.skip_whitespace();
        let start = self.pos;
        let Some(ch) = self.peek() else {
            return Ok(Token {
                kind: TokenKind::End,
                position: start,
                text: String::new(),
            });
        };
        if ch.is_ascii_digit() {
            return self.number(start);
        }
        if ch.is_ascii_alphabetic() || ch == '_' {
            return Ok(self.ident(start));
        }
        let kind = match ch {
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '%' => TokenKind::Percent,
            '^' => TokenKind::Caret,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            ',' => TokenKind::Comma,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            other => {
                return Err(SyntaxError::new(
                    format!("unexpected character '{other}'"),
                    start,
                ));
            }
        };
        self.advance();
        Ok(Token {
            kind,
            position: start,
            text: ch.to_string(),
        })
    }
}

/// Split `input` into tokens, always terminated by a single `End` token.
pub fn tokenize(input: &str) -> Result<Vec<Token>, SyntaxError> {
    let mut lexer = Lexer::new(input);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token()?;
        let done = token.kind == TokenKind::End;
        tokens.push(token);
        if done {
            return Ok(tokens);
        }
    }
}
