// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell

//! Parser for the C-like surface syntax of the mwp analyzer.
//!
//! A hand-written recursive descent parser producing the language-neutral
//! AST from `mwp-ast`. The parser is permissive where the analysis is not:
//! calls, subscripts, pointer operations and compound assignments all
//! parse into dedicated nodes, and the analyzer decides what to do with
//! them. Parse errors are collected with spans and reported together; the
//! parser recovers at statement and function boundaries.

pub mod error;
pub mod lexer;

use mwp_ast::span::Span;
use mwp_ast::*;
use smol_str::SmolStr;

use crate::lexer::{Token, TokenKind};
pub use error::{ParseError, ParseResult};

/// Parse a complete program from source text.
pub fn parse(source: &str) -> (Program, Vec<ParseError>) {
    Parser::new(source).parse_program()
}

/// Parser state over a pre-lexed token stream.
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    errors: Vec<ParseError>,
}

impl Parser {
    /// Create a new parser for the given source.
    pub fn new(source: &str) -> Self {
        Self {
            tokens: lexer::tokenize(source),
            pos: 0,
            errors: Vec::new(),
        }
    }

    /// Parse a complete program: a sequence of function definitions.
    pub fn parse_program(mut self) -> (Program, Vec<ParseError>) {
        let mut program = Program::default();
        while !self.is_eof() {
            match self.parse_function() {
                Ok(func) => program.functions.push(func),
                Err(e) => {
                    self.errors.push(e);
                    self.recover_to_function();
                }
            }
        }
        (program, self.errors)
    }

    // === Items ===

    fn parse_function(&mut self) -> ParseResult<Function> {
        let start = self.peek().span;
        // return type: int or void
        if !self.eat(&TokenKind::Int) && !self.eat(&TokenKind::Void) {
            return Err(ParseError::unexpected(self.peek(), "function definition"));
        }
        let (name, _) = self.expect_ident()?;
        self.expect(TokenKind::LParen)?;
        let params = self.parse_params()?;
        self.expect(TokenKind::RParen)?;
        let body = self.parse_block()?;
        Ok(Function {
            span: start.merge(body.span),
            name,
            params,
            body,
        })
    }

    fn parse_params(&mut self) -> ParseResult<Vec<Ident>> {
        let mut params = Vec::new();
        if self.check(&TokenKind::RParen) {
            return Ok(params);
        }
        // `void` as the whole parameter list
        if self.check(&TokenKind::Void) && self.peek_at(1).kind == TokenKind::RParen {
            self.advance();
            return Ok(params);
        }
        loop {
            self.expect(TokenKind::Int)?;
            let (name, _) = self.expect_ident()?;
            params.push(name);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        Ok(params)
    }

    // === Statements ===

    fn parse_block(&mut self) -> ParseResult<Block> {
        let start = self.expect(TokenKind::LBrace)?.span;
        let mut statements = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.is_eof() {
            match self.parse_stmt() {
                Ok(stmts) => statements.extend(stmts),
                Err(e) => {
                    self.errors.push(e);
                    self.recover_to_statement();
                }
            }
        }
        let end = self.expect(TokenKind::RBrace)?.span;
        Ok(Block {
            span: start.merge(end),
            statements,
        })
    }

    /// Parse one statement. Declaration lists (`int x, y;`) expand into
    /// one statement per declarator, hence the Vec.
    fn parse_stmt(&mut self) -> ParseResult<Vec<Stmt>> {
        match &self.peek().kind {
            TokenKind::Int => self.parse_decl(),
            TokenKind::If => Ok(vec![self.parse_if()?]),
            TokenKind::While => Ok(vec![self.parse_while()?]),
            TokenKind::For => Ok(vec![self.parse_for()?]),
            TokenKind::LBrace => Ok(vec![Stmt::Block(self.parse_block()?)]),
            TokenKind::Break => {
                let span = self.advance().span;
                self.expect(TokenKind::Semi)?;
                Ok(vec![Stmt::Break(span)])
            }
            TokenKind::Continue => {
                let span = self.advance().span;
                self.expect(TokenKind::Semi)?;
                Ok(vec![Stmt::Continue(span)])
            }
            TokenKind::Return => Ok(vec![self.parse_return()?]),
            TokenKind::Semi => {
                let span = self.advance().span;
                Ok(vec![Stmt::Empty(span)])
            }
            _ => Ok(vec![self.parse_expr_stmt(true)?]),
        }
    }

    fn parse_decl(&mut self) -> ParseResult<Vec<Stmt>> {
        let start = self.expect(TokenKind::Int)?.span;
        let mut stmts = Vec::new();
        loop {
            let (var, var_span) = self.expect_ident()?;
            let init = if self.eat(&TokenKind::Assign) {
                Some(self.parse_expr()?)
            } else {
                None
            };
            let end = init.as_ref().map(|e| e.span()).unwrap_or(var_span);
            stmts.push(Stmt::Decl(Decl {
                span: start.merge(end),
                var,
                init,
            }));
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::Semi)?;
        Ok(stmts)
    }

    fn parse_if(&mut self) -> ParseResult<Stmt> {
        let start = self.expect(TokenKind::If)?.span;
        self.expect(TokenKind::LParen)?;
        let cond = self.parse_expr()?;
        self.expect(TokenKind::RParen)?;
        let then_branch = self.parse_branch()?;
        let else_branch = if self.eat(&TokenKind::Else) {
            Some(self.parse_branch()?)
        } else {
            None
        };
        let end = else_branch
            .as_ref()
            .map(|b| b.span)
            .unwrap_or(then_branch.span);
        Ok(Stmt::If(If {
            span: start.merge(end),
            cond,
            then_branch,
            else_branch,
        }))
    }

    fn parse_while(&mut self) -> ParseResult<Stmt> {
        let start = self.expect(TokenKind::While)?.span;
        self.expect(TokenKind::LParen)?;
        let cond = self.parse_expr()?;
        self.expect(TokenKind::RParen)?;
        let body = self.parse_branch()?;
        Ok(Stmt::While(While {
            span: start.merge(body.span),
            cond,
            body,
        }))
    }

    fn parse_for(&mut self) -> ParseResult<Stmt> {
        let start = self.expect(TokenKind::For)?.span;
        self.expect(TokenKind::LParen)?;

        let init = if self.eat(&TokenKind::Semi) {
            None
        } else if self.check(&TokenKind::Int) {
            // a declaration consumes its own semicolon; wrap lists
            let mut decls = self.parse_decl()?;
            Some(Box::new(if decls.len() == 1 {
                decls.remove(0)
            } else {
                let span = decls
                    .iter()
                    .map(Stmt::span)
                    .reduce(Span::merge)
                    .unwrap_or(start);
                Stmt::Block(Block {
                    span,
                    statements: decls,
                })
            }))
        } else {
            Some(Box::new(self.parse_expr_stmt(true)?))
        };

        let cond = if self.check(&TokenKind::Semi) {
            None
        } else {
            Some(self.parse_expr()?)
        };
        self.expect(TokenKind::Semi)?;

        let step = if self.check(&TokenKind::RParen) {
            None
        } else {
            Some(Box::new(self.parse_expr_stmt(false)?))
        };
        self.expect(TokenKind::RParen)?;

        let body = self.parse_branch()?;
        Ok(Stmt::For(For {
            span: start.merge(body.span),
            init,
            cond,
            step,
            body,
        }))
    }

    fn parse_return(&mut self) -> ParseResult<Stmt> {
        let start = self.expect(TokenKind::Return)?.span;
        let value = if self.check(&TokenKind::Semi) {
            None
        } else {
            Some(self.parse_expr()?)
        };
        let end = self.expect(TokenKind::Semi)?.span;
        Ok(Stmt::Return(Return {
            span: start.merge(end),
            value,
        }))
    }

    /// Parse a branch body: either a braced block or a single statement
    /// wrapped into one.
    fn parse_branch(&mut self) -> ParseResult<Block> {
        if self.check(&TokenKind::LBrace) {
            return self.parse_block();
        }
        let statements = self.parse_stmt()?;
        let span = statements
            .iter()
            .map(Stmt::span)
            .reduce(Span::merge)
            .unwrap_or_else(|| self.peek().span);
        Ok(Block { span, statements })
    }

    /// Parse an expression statement, assignment, or compound assignment.
    /// `need_semi` is false inside a for-loop step clause.
    fn parse_expr_stmt(&mut self, need_semi: bool) -> ParseResult<Stmt> {
        let expr = self.parse_expr()?;
        let start = expr.span();

        let stmt = if self.eat(&TokenKind::Assign) {
            let value = self.parse_expr()?;
            let span = start.merge(value.span());
            match expr.as_var() {
                Some(target) => Stmt::Assign(Assign {
                    span,
                    target: target.clone(),
                    value,
                }),
                None => Stmt::Unsupported(UnsupportedStmt {
                    span,
                    construct: SmolStr::new("assignment to non-variable"),
                }),
            }
        } else if self.peek().kind.is_compound_assign() {
            self.advance();
            let value = self.parse_expr()?;
            Stmt::Unsupported(UnsupportedStmt {
                span: start.merge(value.span()),
                construct: SmolStr::new("compound assignment"),
            })
        } else {
            Stmt::Expr(ExprStmt { span: start, expr })
        };

        if need_semi {
            self.expect(TokenKind::Semi)?;
        }
        Ok(stmt)
    }

    // === Expressions ===

    fn parse_expr(&mut self) -> ParseResult<Expr> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> ParseResult<Expr> {
        let mut lhs = self.parse_and()?;
        while self.eat(&TokenKind::PipePipe) {
            let rhs = self.parse_and()?;
            lhs = binary(BinOp::Or, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> ParseResult<Expr> {
        let mut lhs = self.parse_equality()?;
        while self.eat(&TokenKind::AmpAmp) {
            let rhs = self.parse_equality()?;
            lhs = binary(BinOp::And, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_equality(&mut self) -> ParseResult<Expr> {
        let mut lhs = self.parse_relational()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::EqEq => BinOp::Eq,
                TokenKind::NotEq => BinOp::Ne,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_relational()?;
            lhs = binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_relational(&mut self) -> ParseResult<Expr> {
        let mut lhs = self.parse_additive()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Lt => BinOp::Lt,
                TokenKind::Le => BinOp::Le,
                TokenKind::Gt => BinOp::Gt,
                TokenKind::Ge => BinOp::Ge,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_additive()?;
            lhs = binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_additive(&mut self) -> ParseResult<Expr> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_multiplicative()?;
            lhs = binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_multiplicative(&mut self) -> ParseResult<Expr> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                TokenKind::Percent => BinOp::Rem,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_unary()?;
            lhs = binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> ParseResult<Expr> {
        let token = self.peek().clone();
        let op = match token.kind {
            TokenKind::Minus => Some(UnOp::Neg),
            TokenKind::Plus => Some(UnOp::Plus),
            TokenKind::Bang => Some(UnOp::Not),
            TokenKind::PlusPlus => Some(UnOp::PreInc),
            TokenKind::MinusMinus => Some(UnOp::PreDec),
            TokenKind::Sizeof => Some(UnOp::Sizeof),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let arg = self.parse_unary()?;
            let span = token.span.merge(arg.span());
            return Ok(Expr::Unary {
                span,
                op,
                arg: Box::new(arg),
            });
        }
        // pointer syntax parses into dedicated non-analyzable nodes
        if self.eat(&TokenKind::Star) {
            let arg = self.parse_unary()?;
            return Ok(Expr::Deref {
                span: token.span.merge(arg.span()),
                arg: Box::new(arg),
            });
        }
        if self.eat(&TokenKind::Amp) {
            let arg = self.parse_unary()?;
            return Ok(Expr::AddrOf {
                span: token.span.merge(arg.span()),
                arg: Box::new(arg),
            });
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> ParseResult<Expr> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.peek().kind {
                TokenKind::PlusPlus => {
                    let end = self.advance().span;
                    expr = Expr::Unary {
                        span: expr.span().merge(end),
                        op: UnOp::PostInc,
                        arg: Box::new(expr),
                    };
                }
                TokenKind::MinusMinus => {
                    let end = self.advance().span;
                    expr = Expr::Unary {
                        span: expr.span().merge(end),
                        op: UnOp::PostDec,
                        arg: Box::new(expr),
                    };
                }
                TokenKind::LParen => {
                    let Some(callee) = expr.as_var().cloned() else {
                        return Err(ParseError::unexpected(self.peek(), "postfix operator"));
                    };
                    self.advance();
                    let mut args = Vec::new();
                    if !self.check(&TokenKind::RParen) {
                        loop {
                            args.push(self.parse_expr()?);
                            if !self.eat(&TokenKind::Comma) {
                                break;
                            }
                        }
                    }
                    let end = self.expect(TokenKind::RParen)?.span;
                    expr = Expr::Call {
                        span: expr.span().merge(end),
                        callee,
                        args,
                    };
                }
                TokenKind::LBracket => {
                    self.advance();
                    let index = self.parse_expr()?;
                    let end = self.expect(TokenKind::RBracket)?.span;
                    expr = Expr::Index {
                        span: expr.span().merge(end),
                        base: Box::new(expr),
                        index: Box::new(index),
                    };
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> ParseResult<Expr> {
        let token = self.advance();
        match token.kind {
            TokenKind::Ident(name) => Ok(Expr::Var {
                span: token.span,
                name,
            }),
            TokenKind::IntLit(value) => Ok(Expr::Const {
                span: token.span,
                value,
            }),
            TokenKind::LParen => {
                let expr = self.parse_expr()?;
                self.expect(TokenKind::RParen)?;
                Ok(expr)
            }
            _ => Err(ParseError::unexpected(&token, "expression")),
        }
    }

    // === Token helpers ===

    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn peek_at(&self, offset: usize) -> &Token {
        let idx = (self.pos + offset).min(self.tokens.len() - 1);
        &self.tokens[idx]
    }

    fn advance(&mut self) -> Token {
        let token = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn is_eof(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.peek().kind) == std::mem::discriminant(kind)
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind) -> ParseResult<Token> {
        if self.check(&kind) {
            Ok(self.advance())
        } else {
            Err(ParseError::unexpected(self.peek(), format!("{kind:?}")))
        }
    }

    fn expect_ident(&mut self) -> ParseResult<(Ident, Span)> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::Ident(name) => {
                self.advance();
                Ok((name, token.span))
            }
            _ => Err(ParseError::ExpectedIdentifier { span: token.span }),
        }
    }

    // === Error recovery ===

    /// Skip to the start of the next plausible function definition.
    fn recover_to_function(&mut self) {
        while !self.is_eof() {
            if self.check(&TokenKind::Int) || self.check(&TokenKind::Void) {
                // a type followed by `name (` starts a function
                if matches!(self.peek_at(1).kind, TokenKind::Ident(_))
                    && self.peek_at(2).kind == TokenKind::LParen
                {
                    return;
                }
            }
            self.advance();
        }
    }

    /// Skip past the next statement boundary.
    fn recover_to_statement(&mut self) {
        while !self.is_eof() {
            if self.eat(&TokenKind::Semi) {
                return;
            }
            if self.check(&TokenKind::RBrace) {
                return;
            }
            self.advance();
        }
    }
}

fn binary(op: BinOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr::Binary {
        span: lhs.span().merge(rhs.span()),
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(source: &str) -> Program {
        let (program, errors) = parse(source);
        assert!(errors.is_empty(), "unexpected parse errors: {errors:?}");
        program
    }

    #[test]
    fn test_parse_function_signature() {
        let program = parse_ok("void foo(int y1, int y2){ y2 = y1 + y1; }");
        assert_eq!(program.functions.len(), 1);
        let func = &program.functions[0];
        assert_eq!(func.name, "foo");
        assert_eq!(func.params, vec![Ident::new("y1"), Ident::new("y2")]);
        assert_eq!(func.body.statements.len(), 1);
    }

    #[test]
    fn test_parse_assignment_binary() {
        let program = parse_ok("int f(int x, int y){ x = x + y; }");
        let Stmt::Assign(assign) = &program.functions[0].body.statements[0] else {
            panic!("expected assignment");
        };
        assert_eq!(assign.target, "x");
        let Expr::Binary { op, lhs, rhs, .. } = &assign.value else {
            panic!("expected binary rhs");
        };
        assert_eq!(*op, BinOp::Add);
        assert_eq!(lhs.as_var().unwrap(), "x");
        assert_eq!(rhs.as_var().unwrap(), "y");
    }

    #[test]
    fn test_parse_precedence() {
        let program = parse_ok("int f(int a, int b, int c){ a = b; while(a < b * c + 1){ a = a + b; } }");
        let Stmt::While(w) = &program.functions[0].body.statements[1] else {
            panic!("expected while");
        };
        // a < ((b * c) + 1)
        let Expr::Binary { op: BinOp::Lt, rhs, .. } = &w.cond else {
            panic!("expected comparison");
        };
        assert!(matches!(**rhs, Expr::Binary { op: BinOp::Add, .. }));
    }

    #[test]
    fn test_parse_if_without_braces() {
        let program = parse_ok("int f(int x){ if (x > 0) x = x + 1; else x = 0; }");
        let Stmt::If(stmt) = &program.functions[0].body.statements[0] else {
            panic!("expected if");
        };
        assert_eq!(stmt.then_branch.statements.len(), 1);
        assert_eq!(stmt.else_branch.as_ref().unwrap().statements.len(), 1);
    }

    #[test]
    fn test_parse_for_loop() {
        let program = parse_ok("int f(int n){ int s; for (int i = 0; i < n; i++) { s = s + 1; } }");
        let Stmt::For(stmt) = &program.functions[0].body.statements[1] else {
            panic!("expected for");
        };
        assert!(matches!(**stmt.init.as_ref().unwrap(), Stmt::Decl(_)));
        assert!(stmt.cond.is_some());
        let Stmt::Expr(step) = &**stmt.step.as_ref().unwrap() else {
            panic!("expected step expression");
        };
        assert!(matches!(
            step.expr,
            Expr::Unary { op: UnOp::PostInc, .. }
        ));
    }

    #[test]
    fn test_parse_decl_list() {
        let program = parse_ok("int f(){ int x, y = 2; }");
        let stmts = &program.functions[0].body.statements;
        assert_eq!(stmts.len(), 2);
        assert!(matches!(&stmts[0], Stmt::Decl(d) if d.var == "x" && d.init.is_none()));
        assert!(matches!(&stmts[1], Stmt::Decl(d) if d.var == "y" && d.init.is_some()));
    }

    #[test]
    fn test_parse_compound_assign_is_unsupported() {
        let program = parse_ok("int f(int x){ x += 2; }");
        assert!(matches!(
            program.functions[0].body.statements[0],
            Stmt::Unsupported(_)
        ));
    }

    #[test]
    fn test_parse_call_and_subscript() {
        let program = parse_ok("int f(int x){ g(x, 1); x = h(); }");
        let stmts = &program.functions[0].body.statements;
        let Stmt::Expr(es) = &stmts[0] else {
            panic!("expected expression statement");
        };
        assert!(matches!(es.expr, Expr::Call { .. }));
        let Stmt::Assign(assign) = &stmts[1] else {
            panic!("expected assignment");
        };
        assert!(matches!(assign.value, Expr::Call { .. }));
    }

    #[test]
    fn test_parse_error_recovery() {
        let (program, errors) = parse("int f(int x){ x = ; } int g(int y){ y = y + 1; }");
        assert!(!errors.is_empty());
        assert_eq!(program.functions.len(), 2);
        assert_eq!(program.functions[1].name, "g");
    }

    #[test]
    fn test_parse_modulo_and_division() {
        let program = parse_ok("int f(int n, int r){ if(n % 2 == 1) r = r + 1; n = n / 2; }");
        let Stmt::Assign(assign) = &program.functions[0].body.statements[1] else {
            panic!("expected assignment");
        };
        assert!(matches!(
            assign.value,
            Expr::Binary { op: BinOp::Div, .. }
        ));
    }
}
