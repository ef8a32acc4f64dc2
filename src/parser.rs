// File: src/parser.rs
//
// Pratt / precedence-climbing parser over the token stream, producing a
// `Program`. Grammar sketch in spec.md §6.

use crate::ast::{Block, Expr, FunctionLiteral, HopeBlock, HopeCase, Program, Stmt};
use crate::errors::{HopeError, SourceLocation};
use crate::token::{Token, TokenKind};

#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
enum Precedence {
    Lowest,
    Ternary,
    Equality,
    Relational,
    Additive,
    Multiplicative,
    Prefix,
    Call,
    Index,
}

fn infix_precedence(op: &str) -> Precedence {
    match op {
        "==" | "!=" => Precedence::Equality,
        "<" | ">" | "<=" | ">=" => Precedence::Relational,
        "+" | "-" => Precedence::Additive,
        "*" | "/" | "%" => Precedence::Multiplicative,
        "?" => Precedence::Ternary,
        _ => Precedence::Lowest,
    }
}

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

type PResult<T> = Result<T, HopeError>;

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn tok(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek(&self) -> &TokenKind {
        &self.tok().kind
    }

    fn loc(&self) -> SourceLocation {
        let t = self.tok();
        SourceLocation::new(t.line, t.column)
    }

    fn advance(&mut self) -> Token {
        let t = self.tokens[self.pos.min(self.tokens.len() - 1)].clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        t
    }

    fn skip_eol(&mut self) {
        while matches!(self.peek(), TokenKind::Eol) {
            self.advance();
        }
    }

    fn expect_punct(&mut self, c: char) -> PResult<()> {
        if matches!(self.peek(), TokenKind::Punct(p) if *p == c) {
            self.advance();
            Ok(())
        } else {
            Err(HopeError::parse(format!("expected '{c}', found {}", self.peek()), self.loc()))
        }
    }

    fn expect_op(&mut self, op: &str) -> PResult<()> {
        if matches!(self.peek(), TokenKind::Operator(o) if o == op) {
            self.advance();
            Ok(())
        } else {
            Err(HopeError::parse(format!("expected '{op}', found {}", self.peek()), self.loc()))
        }
    }

    fn expect_reserved(&mut self, word: &str) -> PResult<()> {
        if matches!(self.peek(), TokenKind::Reserved(w) if w == word) {
            self.advance();
            Ok(())
        } else {
            Err(HopeError::parse(format!("expected '{word}', found {}", self.peek()), self.loc()))
        }
    }

    fn expect_identifier(&mut self) -> PResult<String> {
        match self.advance().kind {
            TokenKind::Identifier(name) => Ok(name),
            other => Err(HopeError::parse(format!("expected identifier, found {other}"), self.loc())),
        }
    }

    pub fn parse(&mut self) -> PResult<Program> {
        let mut statements = Vec::new();
        self.skip_eol();
        while !matches!(self.peek(), TokenKind::Eof) {
            statements.push(self.parse_stmt()?);
            self.skip_eol();
        }
        Ok(Program { statements })
    }

    fn parse_block(&mut self) -> PResult<Block> {
        self.expect_punct('{')?;
        self.skip_eol();
        let mut statements = Vec::new();
        while !matches!(self.peek(), TokenKind::Punct('}')) {
            statements.push(self.parse_stmt()?);
            self.skip_eol();
        }
        self.expect_punct('}')?;
        Ok(Block { statements })
    }

    fn parse_stmt(&mut self) -> PResult<Stmt> {
        match self.peek().clone() {
            TokenKind::Reserved(word) if word == "if" => self.parse_if(),
            TokenKind::Reserved(word) if word == "while" => self.parse_while(),
            TokenKind::Identifier(name) if self.next_is_define_or_assign() => {
                self.advance();
                match self.advance().kind {
                    TokenKind::Operator(op) if op == ":=" => {
                        let value = self.parse_expr(Precedence::Lowest)?;
                        Ok(Stmt::Define { name, value })
                    }
                    TokenKind::Operator(op) if op == "=" => {
                        let value = self.parse_expr(Precedence::Lowest)?;
                        Ok(Stmt::Assign { name, value })
                    }
                    _ => unreachable!("next_is_define_or_assign guarantees one of these"),
                }
            }
            _ => {
                let expr = self.parse_expr(Precedence::Lowest)?;
                Ok(Stmt::Expr(expr))
            }
        }
    }

    fn next_is_define_or_assign(&self) -> bool {
        matches!(
            self.tokens.get(self.pos + 1).map(|t| &t.kind),
            Some(TokenKind::Operator(op)) if op == ":=" || op == "="
        )
    }

    fn parse_if(&mut self) -> PResult<Stmt> {
        let mut arms = Vec::new();
        let mut else_block = None;
        self.expect_reserved("if")?;
        loop {
            let cond = self.parse_expr(Precedence::Lowest)?;
            let block = self.parse_block()?;
            arms.push((cond, block));

            if matches!(self.peek(), TokenKind::Reserved(w) if w == "else") {
                self.advance();
                if matches!(self.peek(), TokenKind::Reserved(w) if w == "if") {
                    self.advance();
                    continue;
                }
                else_block = Some(self.parse_block()?);
            }
            break;
        }
        Ok(Stmt::If { arms, else_block })
    }

    fn parse_while(&mut self) -> PResult<Stmt> {
        self.expect_reserved("while")?;
        let condition = self.parse_expr(Precedence::Lowest)?;
        let body = self.parse_block()?;
        Ok(Stmt::While { condition, body })
    }

    fn parse_expr(&mut self, min_prec: Precedence) -> PResult<Expr> {
        let mut left = self.parse_prefix()?;

        loop {
            let prec = match self.peek() {
                TokenKind::Operator(op) => infix_precedence(op),
                TokenKind::Punct('(') => Precedence::Call,
                TokenKind::Punct('[') => Precedence::Index,
                _ => Precedence::Lowest,
            };
            if prec <= min_prec {
                break;
            }
            left = self.parse_infix(left, prec)?;
        }
        Ok(left)
    }

    fn parse_infix(&mut self, left: Expr, prec: Precedence) -> PResult<Expr> {
        match self.peek().clone() {
            TokenKind::Punct('(') => self.parse_call(left),
            TokenKind::Punct('[') => {
                self.advance();
                let index = self.parse_expr(Precedence::Lowest)?;
                self.expect_punct(']')?;
                Ok(Expr::Index { left: Box::new(left), index: Box::new(index) })
            }
            TokenKind::Operator(op) if op == "?" => {
                self.advance();
                let then_expr = self.parse_expr(Precedence::Lowest)?;
                self.expect_punct_colon_or_op()?;
                let else_expr = self.parse_expr(Precedence::Ternary)?;
                Ok(Expr::Ternary {
                    condition: Box::new(left),
                    then_expr: Box::new(then_expr),
                    else_expr: Box::new(else_expr),
                })
            }
            TokenKind::Operator(op) => {
                self.advance();
                let right = self.parse_expr(prec)?;
                Ok(Expr::Infix { op, left: Box::new(left), right: Box::new(right) })
            }
            other => Err(HopeError::parse(format!("unexpected infix token {other}"), self.loc())),
        }
    }

    /// The ternary's `:` is lexed as an operator token because `:=`
    /// shares its first character; a lone `:` falls out of the lexer's
    /// operator alternative.
    fn expect_punct_colon_or_op(&mut self) -> PResult<()> {
        match self.peek() {
            TokenKind::Punct(':') => {
                self.advance();
                Ok(())
            }
            _ => Err(HopeError::parse(format!("expected ':', found {}", self.peek()), self.loc())),
        }
    }

    fn parse_call(&mut self, callee: Expr) -> PResult<Expr> {
        self.expect_punct('(')?;
        let mut args = Vec::new();
        if !matches!(self.peek(), TokenKind::Punct(')')) {
            args.push(self.parse_expr(Precedence::Lowest)?);
            while matches!(self.peek(), TokenKind::Punct(',')) {
                self.advance();
                args.push(self.parse_expr(Precedence::Lowest)?);
            }
        }
        self.expect_punct(')')?;
        Ok(Expr::Call { callee: Box::new(callee), args })
    }

    fn parse_prefix(&mut self) -> PResult<Expr> {
        match self.peek().clone() {
            TokenKind::Integer(n) => {
                self.advance();
                Ok(Expr::Integer(n))
            }
            TokenKind::Boolean(b) => {
                self.advance();
                Ok(Expr::Boolean(b))
            }
            TokenKind::String(s) => {
                self.advance();
                Ok(Expr::String(s))
            }
            TokenKind::Identifier(name) => {
                self.advance();
                Ok(Expr::Identifier(name))
            }
            TokenKind::Operator(op) if op == "!" || op == "-" => {
                self.advance();
                let right = self.parse_expr(Precedence::Prefix)?;
                Ok(Expr::Unary { op, right: Box::new(right) })
            }
            TokenKind::Punct('(') => {
                self.advance();
                let expr = self.parse_expr(Precedence::Lowest)?;
                self.expect_punct(')')?;
                Ok(expr)
            }
            TokenKind::Punct('[') => {
                self.advance();
                let mut elements = Vec::new();
                if !matches!(self.peek(), TokenKind::Punct(']')) {
                    elements.push(self.parse_expr(Precedence::Lowest)?);
                    while matches!(self.peek(), TokenKind::Punct(',')) {
                        self.advance();
                        elements.push(self.parse_expr(Precedence::Lowest)?);
                    }
                }
                self.expect_punct(']')?;
                Ok(Expr::Array(elements))
            }
            TokenKind::Reserved(word) if word == "func" => self.parse_function_literal(),
            other => Err(HopeError::parse(format!("unexpected token {other}"), self.loc())),
        }
    }

    fn parse_function_literal(&mut self) -> PResult<Expr> {
        self.expect_reserved("func")?;
        self.expect_punct('(')?;
        let mut params = Vec::new();
        let mut param_types = Vec::new();
        if !matches!(self.peek(), TokenKind::Punct(')')) {
            self.parse_param(&mut params, &mut param_types)?;
            while matches!(self.peek(), TokenKind::Punct(',')) {
                self.advance();
                self.parse_param(&mut params, &mut param_types)?;
            }
        }
        self.expect_punct(')')?;
        let body = self.parse_block()?;

        let hope = if matches!(self.peek(), TokenKind::Reserved(w) if w == "hope") {
            Some(self.parse_hope_block()?)
        } else {
            None
        };

        Ok(Expr::Function(Box::new(FunctionLiteral { params, param_types, body, hope })))
    }

    fn parse_param(&mut self, params: &mut Vec<String>, types: &mut Vec<Option<String>>) -> PResult<()> {
        let name = self.expect_identifier()?;
        let ty = if let TokenKind::Identifier(t) = self.peek() {
            let t = t.clone();
            if t == "int" || t == "bool" || t == "string" {
                self.advance();
                Some(t)
            } else {
                None
            }
        } else {
            None
        };
        params.push(name);
        types.push(ty);
        Ok(())
    }

    fn parse_hope_block(&mut self) -> PResult<HopeBlock> {
        self.expect_reserved("hope")?;
        self.expect_punct('{')?;
        self.skip_eol();
        let mut cases = Vec::new();
        let mut n_fuzz = None;

        loop {
            match self.peek().clone() {
                TokenKind::Punct('}') => break,
                TokenKind::Reserved(word) if word == "fuzzing" => {
                    self.advance();
                    match self.advance().kind {
                        TokenKind::Integer(n) => n_fuzz = Some(n as u32),
                        other => {
                            return Err(HopeError::parse(
                                format!("expected integer after 'fuzzing', found {other}"),
                                self.loc(),
                            ))
                        }
                    }
                }
                _ => {
                    let mut args = vec![self.parse_expr(Precedence::Lowest)?];
                    while matches!(self.peek(), TokenKind::Punct(',')) {
                        self.advance();
                        args.push(self.parse_expr(Precedence::Lowest)?);
                    }
                    self.expect_op("->")?;
                    let expected = self.parse_expr(Precedence::Lowest)?;
                    cases.push(HopeCase { args, expected });
                }
            }
            self.skip_eol();
        }
        self.expect_punct('}')?;
        Ok(HopeBlock { cases, n_fuzz })
    }
}

pub fn parse(tokens: Vec<Token>) -> PResult<Program> {
    Parser::new(tokens).parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn parse_source(src: &str) -> Program {
        parse(tokenize(src).unwrap()).unwrap()
    }

    #[test]
    fn parses_define_and_arithmetic() {
        let program = parse_source("n := 1 + 2");
        assert_eq!(program.statements.len(), 1);
        match &program.statements[0] {
            Stmt::Define { name, value } => {
                assert_eq!(name, "n");
                assert!(matches!(value, Expr::Infix { .. }));
            }
            other => panic!("expected Define, got {other:?}"),
        }
    }

    #[test]
    fn parses_if_else_if_else() {
        let program = parse_source(
            "if a > b {\n a\n} else if a < b {\n b\n} else {\n 0\n}",
        );
        match &program.statements[0] {
            Stmt::If { arms, else_block } => {
                assert_eq!(arms.len(), 2);
                assert!(else_block.is_some());
            }
            other => panic!("expected If, got {other:?}"),
        }
    }

    #[test]
    fn parses_function_with_hope_block() {
        let program = parse_source(
            "add := func(x,y){ x } hope { -100,100 -> 0\n0,0 -> 0\n0,1 -> 1\n }",
        );
        match &program.statements[0] {
            Stmt::Define { value: Expr::Function(func), .. } => {
                let hope = func.hope.as_ref().expect("hope block");
                assert_eq!(hope.cases.len(), 3);
                assert!(hope.n_fuzz.is_none());
            }
            other => panic!("expected function define, got {other:?}"),
        }
    }

    #[test]
    fn parses_fuzzing_clause() {
        let program = parse_source("f := func(x int){ x } hope { 1 -> 1\nfuzzing 9\n}");
        match &program.statements[0] {
            Stmt::Define { value: Expr::Function(func), .. } => {
                assert_eq!(func.hope.as_ref().unwrap().n_fuzz, Some(9));
            }
            other => panic!("expected function define, got {other:?}"),
        }
    }

    #[test]
    fn parses_call_and_array_index() {
        let program = parse_source("a := [1,2,3]\na[0]");
        assert!(matches!(program.statements[0], Stmt::Define { .. }));
        assert!(matches!(program.statements[1], Stmt::Expr(Expr::Index { .. })));
    }
}
