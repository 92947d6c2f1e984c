/*
 * expr.rs
 * Copyright (c) 2026 Theta contributors
 */

//! Expression language for tag bodies and script modules.
//!
//! A deliberately small JavaScript-shaped grammar: literals (strings,
//! numbers, booleans, null, arrays, objects), identifier, member, and
//! index access, calls, arrow functions, unary `!` and `-`, the usual
//! binary operators, and `cond ? a : b`. Code tags additionally accept
//! `let` declarations and expression statements separated by `;`.

use crate::error::{EngineResult, parse_error};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Expr {
    Null,
    Bool(bool),
    Number(f64),
    Str(String),
    Ident(String),
    Array(Vec<Expr>),
    Object(Vec<(String, Expr)>),
    Member {
        object: Box<Expr>,
        property: String,
    },
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Conditional {
        condition: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Box<Expr>,
    },
    Arrow {
        params: Vec<String>,
        body: Box<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UnaryOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

/// One statement in a code tag.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Stmt {
    /// `let name = value` (also accepts `const` and `var`).
    Let { name: String, value: Expr },
    /// A bare expression evaluated for effect.
    Expr(Expr),
}

/// Parse `src` as a single expression. Trailing semicolons are tolerated.
pub(crate) fn parse_expression(src: &str) -> EngineResult<Expr> {
    let mut parser = Parser::new(lex(src)?);
    let expr = parser.parse_expr()?;
    while parser.eat_sym(";") {}
    parser.expect_end()?;
    Ok(expr)
}

/// Parse `src` as a statement list for a code tag.
pub(crate) fn parse_statement_list(src: &str) -> EngineResult<Vec<Stmt>> {
    let mut parser = Parser::new(lex(src)?);
    parser.parse_statements()
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Number(f64),
    Str(String),
    Sym(&'static str),
}

// Longest symbols first so `==` never lexes as two `=`.
const SYMBOLS: &[&str] = &[
    "=>", "==", "!=", "<=", ">=", "&&", "||", "(", ")", "[", "]", "{", "}", ",", ":", ";", ".",
    "?", "+", "-", "*", "/", "<", ">", "!", "=",
];

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

fn lex(src: &str) -> EngineResult<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = src.char_indices().peekable();

    while let Some(&(start, ch)) = chars.peek() {
        if ch.is_whitespace() {
            chars.next();
            continue;
        }

        if is_ident_start(ch) {
            let mut end = start + ch.len_utf8();
            chars.next();
            while let Some(&(idx, c)) = chars.peek() {
                if !is_ident_continue(c) {
                    break;
                }
                end = idx + c.len_utf8();
                chars.next();
            }
            tokens.push(Token::Ident(src[start..end].to_owned()));
            continue;
        }

        if ch.is_ascii_digit() {
            let mut end = start + 1;
            let mut seen_dot = false;
            chars.next();
            while let Some(&(idx, c)) = chars.peek() {
                if c.is_ascii_digit() || (c == '.' && !seen_dot) {
                    seen_dot = seen_dot || c == '.';
                    end = idx + 1;
                    chars.next();
                } else {
                    break;
                }
            }
            let text = &src[start..end];
            let value = text
                .parse::<f64>()
                .map_err(|_| parse_error(format!("invalid number `{text}`")))?;
            tokens.push(Token::Number(value));
            continue;
        }

        if ch == '"' || ch == '\'' {
            chars.next();
            let mut value = String::new();
            let mut closed = false;
            while let Some((_, c)) = chars.next() {
                if c == ch {
                    closed = true;
                    break;
                }
                if c == '\\' {
                    match chars.next() {
                        Some((_, 'n')) => value.push('\n'),
                        Some((_, 't')) => value.push('\t'),
                        Some((_, 'r')) => value.push('\r'),
                        Some((_, other)) => value.push(other),
                        None => break,
                    }
                } else {
                    value.push(c);
                }
            }
            if !closed {
                return Err(parse_error("unterminated string literal"));
            }
            tokens.push(Token::Str(value));
            continue;
        }

        let rest = &src[start..];
        match SYMBOLS.iter().find(|sym| rest.starts_with(**sym)) {
            Some(sym) => {
                // symbols are ASCII, one char per byte
                for _ in 0..sym.len() {
                    chars.next();
                }
                tokens.push(Token::Sym(sym));
            }
            None => return Err(parse_error(format!("unexpected character `{ch}`"))),
        }
    }

    Ok(tokens)
}

fn describe(token: Option<&Token>) -> String {
    match token {
        None => "end of input".to_owned(),
        Some(Token::Ident(name)) => format!("`{name}`"),
        Some(Token::Number(value)) => format!("number {value}"),
        Some(Token::Str(_)) => "string literal".to_owned(),
        Some(Token::Sym(sym)) => format!("`{sym}`"),
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Parser {
        Parser { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn sym_at(&self, pos: usize, sym: &str) -> bool {
        matches!(self.tokens.get(pos), Some(Token::Sym(s)) if *s == sym)
    }

    fn at_keyword(&self, word: &str) -> bool {
        matches!(self.tokens.get(self.pos), Some(Token::Ident(name)) if name == word)
    }

    fn eat_sym(&mut self, sym: &str) -> bool {
        if self.sym_at(self.pos, sym) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_sym(&mut self, sym: &str) -> EngineResult<()> {
        if self.eat_sym(sym) {
            Ok(())
        } else {
            Err(parse_error(format!(
                "expected `{sym}`, found {}",
                describe(self.peek())
            )))
        }
    }

    fn expect_ident(&mut self) -> EngineResult<String> {
        match self.tokens.get(self.pos) {
            Some(Token::Ident(name)) => {
                let name = name.clone();
                self.pos += 1;
                Ok(name)
            }
            other => Err(parse_error(format!(
                "expected identifier, found {}",
                describe(other)
            ))),
        }
    }

    fn expect_end(&self) -> EngineResult<()> {
        match self.peek() {
            None => Ok(()),
            Some(token) => Err(parse_error(format!(
                "unexpected trailing {}",
                describe(Some(token))
            ))),
        }
    }

    fn parse_statements(&mut self) -> EngineResult<Vec<Stmt>> {
        let mut stmts = Vec::new();
        while self.pos < self.tokens.len() {
            if self.eat_sym(";") {
                continue;
            }
            if self.at_keyword("let") || self.at_keyword("const") || self.at_keyword("var") {
                self.pos += 1;
                let name = self.expect_ident()?;
                self.expect_sym("=")?;
                let value = self.parse_expr()?;
                stmts.push(Stmt::Let { name, value });
                continue;
            }
            let expr = self.parse_expr()?;
            stmts.push(Stmt::Expr(expr));
        }
        Ok(stmts)
    }

    fn parse_expr(&mut self) -> EngineResult<Expr> {
        if let Some(arrow) = self.try_parse_arrow()? {
            return Ok(arrow);
        }
        self.parse_conditional()
    }

    /// Arrow functions need lookahead: `x => ...` or `(a, b) => ...`.
    fn try_parse_arrow(&mut self) -> EngineResult<Option<Expr>> {
        match self.peek() {
            Some(Token::Ident(_)) if self.sym_at(self.pos + 1, "=>") => {
                let param = self.expect_ident()?;
                self.pos += 1;
                let body = self.parse_expr()?;
                Ok(Some(Expr::Arrow {
                    params: vec![param],
                    body: Box::new(body),
                }))
            }
            Some(Token::Sym("(")) => {
                let Some(close) = self.matching_paren(self.pos) else {
                    return Ok(None);
                };
                if !self.sym_at(close + 1, "=>") {
                    return Ok(None);
                }
                self.pos += 1;
                let mut params = Vec::new();
                if !self.eat_sym(")") {
                    loop {
                        params.push(self.expect_ident()?);
                        if self.eat_sym(",") {
                            continue;
                        }
                        self.expect_sym(")")?;
                        break;
                    }
                }
                self.expect_sym("=>")?;
                let body = self.parse_expr()?;
                Ok(Some(Expr::Arrow {
                    params,
                    body: Box::new(body),
                }))
            }
            _ => Ok(None),
        }
    }

    fn matching_paren(&self, open: usize) -> Option<usize> {
        let mut depth = 0usize;
        for (idx, token) in self.tokens.iter().enumerate().skip(open) {
            match token {
                Token::Sym("(") => depth += 1,
                Token::Sym(")") => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(idx);
                    }
                }
                _ => {}
            }
        }
        None
    }

    fn parse_conditional(&mut self) -> EngineResult<Expr> {
        let condition = self.parse_or()?;
        if self.eat_sym("?") {
            let then_branch = self.parse_expr()?;
            self.expect_sym(":")?;
            let else_branch = self.parse_expr()?;
            return Ok(Expr::Conditional {
                condition: Box::new(condition),
                then_branch: Box::new(then_branch),
                else_branch: Box::new(else_branch),
            });
        }
        Ok(condition)
    }

    fn parse_or(&mut self) -> EngineResult<Expr> {
        let mut left = self.parse_and()?;
        while self.eat_sym("||") {
            let right = self.parse_and()?;
            left = binary(BinaryOp::Or, left, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> EngineResult<Expr> {
        let mut left = self.parse_equality()?;
        while self.eat_sym("&&") {
            let right = self.parse_equality()?;
            left = binary(BinaryOp::And, left, right);
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> EngineResult<Expr> {
        let mut left = self.parse_comparison()?;
        loop {
            let op = if self.eat_sym("==") {
                BinaryOp::Eq
            } else if self.eat_sym("!=") {
                BinaryOp::Ne
            } else {
                break;
            };
            let right = self.parse_comparison()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_comparison(&mut self) -> EngineResult<Expr> {
        let mut left = self.parse_additive()?;
        loop {
            let op = if self.eat_sym("<=") {
                BinaryOp::Le
            } else if self.eat_sym(">=") {
                BinaryOp::Ge
            } else if self.eat_sym("<") {
                BinaryOp::Lt
            } else if self.eat_sym(">") {
                BinaryOp::Gt
            } else {
                break;
            };
            let right = self.parse_additive()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> EngineResult<Expr> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = if self.eat_sym("+") {
                BinaryOp::Add
            } else if self.eat_sym("-") {
                BinaryOp::Sub
            } else {
                break;
            };
            let right = self.parse_multiplicative()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> EngineResult<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            let op = if self.eat_sym("*") {
                BinaryOp::Mul
            } else if self.eat_sym("/") {
                BinaryOp::Div
            } else {
                break;
            };
            let right = self.parse_unary()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> EngineResult<Expr> {
        if self.eat_sym("!") {
            let operand = self.parse_unary()?;
            return Ok(Expr::Unary {
                op: UnaryOp::Not,
                operand: Box::new(operand),
            });
        }
        if self.eat_sym("-") {
            let operand = self.parse_unary()?;
            return Ok(Expr::Unary {
                op: UnaryOp::Neg,
                operand: Box::new(operand),
            });
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> EngineResult<Expr> {
        let mut expr = self.parse_primary()?;
        loop {
            if self.eat_sym(".") {
                let property = self.expect_ident()?;
                expr = Expr::Member {
                    object: Box::new(expr),
                    property,
                };
            } else if self.eat_sym("[") {
                let index = self.parse_expr()?;
                self.expect_sym("]")?;
                expr = Expr::Index {
                    object: Box::new(expr),
                    index: Box::new(index),
                };
            } else if self.eat_sym("(") {
                let mut args = Vec::new();
                if !self.eat_sym(")") {
                    loop {
                        args.push(self.parse_expr()?);
                        if self.eat_sym(",") {
                            continue;
                        }
                        self.expect_sym(")")?;
                        break;
                    }
                }
                expr = Expr::Call {
                    callee: Box::new(expr),
                    args,
                };
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> EngineResult<Expr> {
        match self.tokens.get(self.pos).cloned() {
            Some(Token::Number(value)) => {
                self.pos += 1;
                Ok(Expr::Number(value))
            }
            Some(Token::Str(value)) => {
                self.pos += 1;
                Ok(Expr::Str(value))
            }
            Some(Token::Ident(name)) => {
                self.pos += 1;
                Ok(match name.as_str() {
                    "true" => Expr::Bool(true),
                    "false" => Expr::Bool(false),
                    "null" | "undefined" => Expr::Null,
                    _ => Expr::Ident(name),
                })
            }
            Some(Token::Sym("(")) => {
                self.pos += 1;
                let expr = self.parse_expr()?;
                self.expect_sym(")")?;
                Ok(expr)
            }
            Some(Token::Sym("[")) => {
                self.pos += 1;
                self.parse_array_rest()
            }
            Some(Token::Sym("{")) => {
                self.pos += 1;
                self.parse_object_rest()
            }
            other => Err(parse_error(format!(
                "expected expression, found {}",
                describe(other.as_ref())
            ))),
        }
    }

    fn parse_array_rest(&mut self) -> EngineResult<Expr> {
        let mut items = Vec::new();
        if self.eat_sym("]") {
            return Ok(Expr::Array(items));
        }
        loop {
            items.push(self.parse_expr()?);
            if self.eat_sym(",") {
                if self.eat_sym("]") {
                    break;
                }
                continue;
            }
            self.expect_sym("]")?;
            break;
        }
        Ok(Expr::Array(items))
    }

    fn parse_object_rest(&mut self) -> EngineResult<Expr> {
        let mut entries = Vec::new();
        if self.eat_sym("}") {
            return Ok(Expr::Object(entries));
        }
        loop {
            let (key, is_ident_key) = match self.tokens.get(self.pos).cloned() {
                Some(Token::Ident(name)) => {
                    self.pos += 1;
                    (name, true)
                }
                Some(Token::Str(value)) => {
                    self.pos += 1;
                    (value, false)
                }
                other => {
                    return Err(parse_error(format!(
                        "expected object key, found {}",
                        describe(other.as_ref())
                    )));
                }
            };
            // `{name}` shorthand
            let value = if is_ident_key && (self.sym_at(self.pos, ",") || self.sym_at(self.pos, "}"))
            {
                Expr::Ident(key.clone())
            } else {
                self.expect_sym(":")?;
                self.parse_expr()?
            };
            entries.push((key, value));
            if self.eat_sym(",") {
                if self.eat_sym("}") {
                    break;
                }
                continue;
            }
            self.expect_sym("}")?;
            break;
        }
        Ok(Expr::Object(entries))
    }
}

fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    Expr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}
