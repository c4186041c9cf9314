//! Recursive-descent parser.
//!
//! `break`/`continue` placement is validated here so the interpreter never
//! sees a loop signal escaping a loop, and `return` is accepted at any
//! statement position including the top level.

use crate::ast::{AssignTarget, BinOp, Expr, Program, Stmt, UnaryOp};
use crate::error::ParseError;
use crate::lexer::{tokenize, Token, TokenKind};

/// Parse source text into a program.
pub fn parse(src: &str) -> Result<Program, ParseError> {
    let tokens = tokenize(src)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        loop_depth: 0,
    };
    let stmts = parser.stmt_list(false)?;
    Ok(Program { stmts })
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    loop_depth: usize,
}

impl Parser {
    fn peek(&self) -> &TokenKind {
        &self.tokens[self.pos].kind
    }

    fn peek_line(&self) -> usize {
        self.tokens[self.pos].line
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(self.peek()) == std::mem::discriminant(kind)
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind, what: &str) -> Result<Token, ParseError> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(ParseError::new(
                format!("expected {what}, found {}", describe(self.peek())),
                self.peek_line(),
            ))
        }
    }

    fn skip_newlines(&mut self) {
        while self.check(&TokenKind::Newline) {
            self.advance();
        }
    }

    fn skip_terminators(&mut self) {
        while self.check(&TokenKind::Newline) || self.check(&TokenKind::Semi) {
            self.advance();
        }
    }

    /// Parse statements until EOF (`in_block = false`) or `}`.
    fn stmt_list(&mut self, in_block: bool) -> Result<Vec<Stmt>, ParseError> {
        let mut stmts = Vec::new();
        self.skip_terminators();
        loop {
            if self.check(&TokenKind::Eof) || (in_block && self.check(&TokenKind::RBrace)) {
                break;
            }
            stmts.push(self.stmt()?);
            if self.check(&TokenKind::Newline) || self.check(&TokenKind::Semi) {
                self.skip_terminators();
            } else if !self.check(&TokenKind::Eof) && !self.check(&TokenKind::RBrace) {
                return Err(ParseError::new(
                    format!(
                        "expected newline or ';' after statement, found {}",
                        describe(self.peek())
                    ),
                    self.peek_line(),
                ));
            }
        }
        Ok(stmts)
    }

    fn block(&mut self) -> Result<Vec<Stmt>, ParseError> {
        self.expect(&TokenKind::LBrace, "'{'")?;
        let stmts = self.stmt_list(true)?;
        self.expect(&TokenKind::RBrace, "'}'")?;
        Ok(stmts)
    }

    fn stmt(&mut self) -> Result<Stmt, ParseError> {
        let line = self.peek_line();
        match self.peek() {
            TokenKind::Return => {
                self.advance();
                let value = if self.check(&TokenKind::Newline)
                    || self.check(&TokenKind::Semi)
                    || self.check(&TokenKind::Eof)
                    || self.check(&TokenKind::RBrace)
                {
                    None
                } else {
                    Some(self.expr()?)
                };
                Ok(Stmt::Return { value, line })
            }
            TokenKind::If => self.if_stmt(),
            TokenKind::While => {
                self.advance();
                let cond = self.expr()?;
                self.loop_depth += 1;
                let body = self.block();
                self.loop_depth -= 1;
                Ok(Stmt::While {
                    cond,
                    body: body?,
                    line,
                })
            }
            TokenKind::For => {
                self.advance();
                let var = self.ident("loop variable")?;
                self.expect(&TokenKind::In, "'in'")?;
                let iter = self.expr()?;
                self.loop_depth += 1;
                let body = self.block();
                self.loop_depth -= 1;
                Ok(Stmt::For {
                    var,
                    iter,
                    body: body?,
                    line,
                })
            }
            TokenKind::Break => {
                self.advance();
                if self.loop_depth == 0 {
                    return Err(ParseError::new("'break' outside of a loop", line));
                }
                Ok(Stmt::Break { line })
            }
            TokenKind::Continue => {
                self.advance();
                if self.loop_depth == 0 {
                    return Err(ParseError::new("'continue' outside of a loop", line));
                }
                Ok(Stmt::Continue { line })
            }
            TokenKind::Fn if matches!(&self.tokens[self.pos + 1].kind, TokenKind::Ident(_)) => {
                self.advance();
                let name = self.ident("function name")?;
                let (params, body) = self.fn_tail()?;
                Ok(Stmt::FnDef {
                    name,
                    params,
                    body,
                    line,
                })
            }
            _ => {
                let expr = self.expr()?;
                if self.eat(&TokenKind::Assign) {
                    let target = match expr {
                        Expr::Ident(name, _) => AssignTarget::Name(name),
                        Expr::Index { target, index, .. } => AssignTarget::Index {
                            target: *target,
                            index: *index,
                        },
                        _ => {
                            return Err(ParseError::new("invalid assignment target", line));
                        }
                    };
                    let value = self.expr()?;
                    Ok(Stmt::Assign {
                        target,
                        value,
                        line,
                    })
                } else {
                    Ok(Stmt::Expr { expr, line })
                }
            }
        }
    }

    fn if_stmt(&mut self) -> Result<Stmt, ParseError> {
        let line = self.peek_line();
        self.expect(&TokenKind::If, "'if'")?;
        let cond = self.expr()?;
        let then_body = self.block()?;
        let else_body = if self.eat(&TokenKind::Else) {
            if self.check(&TokenKind::If) {
                vec![self.if_stmt()?]
            } else {
                self.block()?
            }
        } else {
            Vec::new()
        };
        Ok(Stmt::If {
            cond,
            then_body,
            else_body,
            line,
        })
    }

    fn ident(&mut self, what: &str) -> Result<String, ParseError> {
        match self.peek().clone() {
            TokenKind::Ident(name) => {
                self.advance();
                Ok(name)
            }
            other => Err(ParseError::new(
                format!("expected {what}, found {}", describe(&other)),
                self.peek_line(),
            )),
        }
    }

    /// Parameter list and body shared by `fn name(...)` and `fn(...)` forms.
    /// Loop depth resets inside a function body.
    fn fn_tail(&mut self) -> Result<(Vec<String>, Vec<Stmt>), ParseError> {
        self.expect(&TokenKind::LParen, "'('")?;
        let mut params = Vec::new();
        self.skip_newlines();
        if !self.check(&TokenKind::RParen) {
            loop {
                params.push(self.ident("parameter name")?);
                self.skip_newlines();
                if self.eat(&TokenKind::Comma) {
                    self.skip_newlines();
                    if self.check(&TokenKind::RParen) {
                        break;
                    }
                } else {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RParen, "')'")?;
        let saved = std::mem::replace(&mut self.loop_depth, 0);
        let body = self.block();
        self.loop_depth = saved;
        Ok((params, body?))
    }

    // ── Expressions ─────────────────────────────────────────────────────────

    fn expr(&mut self) -> Result<Expr, ParseError> {
        self.or_expr()
    }

    fn or_expr(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.and_expr()?;
        while self.check(&TokenKind::OrOr) {
            let line = self.advance().line;
            let rhs = self.and_expr()?;
            lhs = Expr::Binary {
                op: BinOp::Or,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                line,
            };
        }
        Ok(lhs)
    }

    fn and_expr(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.equality()?;
        while self.check(&TokenKind::AndAnd) {
            let line = self.advance().line;
            let rhs = self.equality()?;
            lhs = Expr::Binary {
                op: BinOp::And,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                line,
            };
        }
        Ok(lhs)
    }

    fn equality(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.comparison()?;
        loop {
            let op = match self.peek() {
                TokenKind::Eq => BinOp::Eq,
                TokenKind::Ne => BinOp::Ne,
                _ => break,
            };
            let line = self.advance().line;
            let rhs = self.comparison()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                line,
            };
        }
        Ok(lhs)
    }

    fn comparison(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.additive()?;
        loop {
            let op = match self.peek() {
                TokenKind::Lt => BinOp::Lt,
                TokenKind::Le => BinOp::Le,
                TokenKind::Gt => BinOp::Gt,
                TokenKind::Ge => BinOp::Ge,
                _ => break,
            };
            let line = self.advance().line;
            let rhs = self.additive()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                line,
            };
        }
        Ok(lhs)
    }

    fn additive(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.multiplicative()?;
        loop {
            let op = match self.peek() {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => break,
            };
            let line = self.advance().line;
            let rhs = self.multiplicative()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                line,
            };
        }
        Ok(lhs)
    }

    fn multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek() {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                TokenKind::Percent => BinOp::Rem,
                _ => break,
            };
            let line = self.advance().line;
            let rhs = self.unary()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                line,
            };
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr, ParseError> {
        let op = match self.peek() {
            TokenKind::Minus => Some(UnaryOp::Neg),
            TokenKind::Bang => Some(UnaryOp::Not),
            _ => None,
        };
        if let Some(op) = op {
            let line = self.advance().line;
            let expr = self.unary()?;
            Ok(Expr::Unary {
                op,
                expr: Box::new(expr),
                line,
            })
        } else {
            self.postfix()
        }
    }

    fn postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.primary()?;
        loop {
            match self.peek() {
                TokenKind::LParen => {
                    let line = self.advance().line;
                    let args = self.expr_list(&TokenKind::RParen, "')'")?;
                    expr = Expr::Call {
                        callee: Box::new(expr),
                        args,
                        line,
                    };
                }
                TokenKind::LBracket => {
                    let line = self.advance().line;
                    self.skip_newlines();
                    let index = self.expr()?;
                    self.skip_newlines();
                    self.expect(&TokenKind::RBracket, "']'")?;
                    expr = Expr::Index {
                        target: Box::new(expr),
                        index: Box::new(index),
                        line,
                    };
                }
                TokenKind::Dot => {
                    let line = self.advance().line;
                    let field = self.ident("field name")?;
                    expr = Expr::Index {
                        target: Box::new(expr),
                        index: Box::new(Expr::Str(field)),
                        line,
                    };
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    /// Comma-separated expressions up to `end` (exclusive); trailing comma ok.
    fn expr_list(&mut self, end: &TokenKind, what: &str) -> Result<Vec<Expr>, ParseError> {
        let mut items = Vec::new();
        self.skip_newlines();
        if !self.check(end) {
            loop {
                items.push(self.expr()?);
                self.skip_newlines();
                if self.eat(&TokenKind::Comma) {
                    self.skip_newlines();
                    if self.check(end) {
                        break;
                    }
                } else {
                    break;
                }
            }
        }
        self.expect(end, what)?;
        Ok(items)
    }

    fn primary(&mut self) -> Result<Expr, ParseError> {
        let line = self.peek_line();
        match self.peek().clone() {
            TokenKind::Num(n) => {
                self.advance();
                Ok(Expr::Num(n))
            }
            TokenKind::Str(s) => {
                self.advance();
                Ok(Expr::Str(s))
            }
            TokenKind::Ident(name) => {
                self.advance();
                Ok(Expr::Ident(name, line))
            }
            TokenKind::True => {
                self.advance();
                Ok(Expr::Bool(true))
            }
            TokenKind::False => {
                self.advance();
                Ok(Expr::Bool(false))
            }
            TokenKind::Null => {
                self.advance();
                Ok(Expr::Null)
            }
            TokenKind::LParen => {
                self.advance();
                self.skip_newlines();
                let expr = self.expr()?;
                self.skip_newlines();
                self.expect(&TokenKind::RParen, "')'")?;
                Ok(expr)
            }
            TokenKind::LBracket => {
                self.advance();
                let items = self.expr_list(&TokenKind::RBracket, "']'")?;
                Ok(Expr::List(items))
            }
            TokenKind::LBrace => {
                self.advance();
                let entries = self.map_entries()?;
                Ok(Expr::Map(entries))
            }
            TokenKind::Fn => {
                self.advance();
                let (params, body) = self.fn_tail()?;
                Ok(Expr::Func { params, body })
            }
            other => Err(ParseError::new(
                format!("unexpected {}", describe(&other)),
                line,
            )),
        }
    }

    fn map_entries(&mut self) -> Result<Vec<(String, Expr)>, ParseError> {
        let mut entries = Vec::new();
        self.skip_newlines();
        if !self.check(&TokenKind::RBrace) {
            loop {
                let key = match self.peek().clone() {
                    TokenKind::Str(s) => {
                        self.advance();
                        s
                    }
                    TokenKind::Ident(name) => {
                        self.advance();
                        name
                    }
                    other => {
                        return Err(ParseError::new(
                            format!("expected object key, found {}", describe(&other)),
                            self.peek_line(),
                        ));
                    }
                };
                self.expect(&TokenKind::Colon, "':'")?;
                self.skip_newlines();
                let value = self.expr()?;
                entries.push((key, value));
                self.skip_newlines();
                if self.eat(&TokenKind::Comma) {
                    self.skip_newlines();
                    if self.check(&TokenKind::RBrace) {
                        break;
                    }
                } else {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RBrace, "'}'")?;
        Ok(entries)
    }
}

fn describe(kind: &TokenKind) -> String {
    match kind {
        TokenKind::Num(n) => format!("number {n}"),
        TokenKind::Str(_) => "string literal".into(),
        TokenKind::Ident(name) => format!("'{name}'"),
        TokenKind::Newline => "end of line".into(),
        TokenKind::Eof => "end of input".into(),
        TokenKind::True => "'true'".into(),
        TokenKind::False => "'false'".into(),
        TokenKind::Null => "'null'".into(),
        TokenKind::If => "'if'".into(),
        TokenKind::Else => "'else'".into(),
        TokenKind::While => "'while'".into(),
        TokenKind::For => "'for'".into(),
        TokenKind::In => "'in'".into(),
        TokenKind::Return => "'return'".into(),
        TokenKind::Fn => "'fn'".into(),
        TokenKind::Break => "'break'".into(),
        TokenKind::Continue => "'continue'".into(),
        TokenKind::LParen => "'('".into(),
        TokenKind::RParen => "')'".into(),
        TokenKind::LBracket => "'['".into(),
        TokenKind::RBracket => "']'".into(),
        TokenKind::LBrace => "'{'".into(),
        TokenKind::RBrace => "'}'".into(),
        TokenKind::Comma => "','".into(),
        TokenKind::Dot => "'.'".into(),
        TokenKind::Colon => "':'".into(),
        TokenKind::Semi => "';'".into(),
        TokenKind::Assign => "'='".into(),
        TokenKind::Plus => "'+'".into(),
        TokenKind::Minus => "'-'".into(),
        TokenKind::Star => "'*'".into(),
        TokenKind::Slash => "'/'".into(),
        TokenKind::Percent => "'%'".into(),
        TokenKind::Eq => "'=='".into(),
        TokenKind::Ne => "'!='".into(),
        TokenKind::Lt => "'<'".into(),
        TokenKind::Le => "'<='".into(),
        TokenKind::Gt => "'>'".into(),
        TokenKind::Ge => "'>='".into(),
        TokenKind::AndAnd => "'&&'".into(),
        TokenKind::OrOr => "'||'".into(),
        TokenKind::Bang => "'!'".into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Expr, Stmt};

    #[test]
    fn test_top_level_return_is_legal() {
        let prog = parse("return 1").unwrap();
        assert!(matches!(prog.stmts[0], Stmt::Return { .. }));
    }

    #[test]
    fn test_bare_return() {
        let prog = parse("return\n").unwrap();
        assert!(matches!(prog.stmts[0], Stmt::Return { value: None, .. }));
    }

    #[test]
    fn test_assignment_and_index_assignment() {
        let prog = parse("x = 1\nx[\"k\"] = 2\nx.k = 3").unwrap();
        assert_eq!(prog.stmts.len(), 3);
        assert!(matches!(
            &prog.stmts[1],
            Stmt::Assign {
                target: crate::ast::AssignTarget::Index { .. },
                ..
            }
        ));
    }

    #[test]
    fn test_map_literal_with_string_concat() {
        // The canonical handler shape from the calling convention.
        let prog = parse(r#"return {"message": "Hello " + input["name"]}"#).unwrap();
        assert_eq!(prog.stmts.len(), 1);
    }

    #[test]
    fn test_if_else_chain() {
        let src = "if x > 1 {\n  y = 1\n} else if x > 0 {\n  y = 2\n} else {\n  y = 3\n}";
        let prog = parse(src).unwrap();
        let Stmt::If { else_body, .. } = &prog.stmts[0] else {
            panic!("expected if");
        };
        assert!(matches!(else_body[0], Stmt::If { .. }));
    }

    #[test]
    fn test_fn_def_and_literal() {
        let prog = parse("fn add(a, b) {\n  return a + b\n}\nf = fn(x) { return x }").unwrap();
        assert!(matches!(prog.stmts[0], Stmt::FnDef { .. }));
    }

    #[test]
    fn test_break_outside_loop_rejected() {
        let err = parse("break").unwrap_err();
        assert!(err.message.contains("outside of a loop"));
    }

    #[test]
    fn test_break_inside_fn_inside_loop_rejected() {
        let err = parse("while true {\n  f = fn() { break }\n}").unwrap_err();
        assert!(err.message.contains("outside of a loop"));
    }

    #[test]
    fn test_break_inside_loop_ok() {
        parse("while true { break }").unwrap();
        parse("for x in [1, 2] { continue }").unwrap();
    }

    #[test]
    fn test_multiline_literals() {
        parse("x = [\n  1,\n  2,\n]\ny = {\n  \"a\": 1,\n  b: 2,\n}").unwrap();
    }

    #[test]
    fn test_syntax_error_reports_line() {
        let err = parse("x = 1\ny = )").unwrap_err();
        assert_eq!(err.line, 2);
    }

    #[test]
    fn test_invalid_assignment_target() {
        let err = parse("1 = 2").unwrap_err();
        assert!(err.message.contains("assignment target"));
    }

    #[test]
    fn test_precedence() {
        let prog = parse("x = 1 + 2 * 3").unwrap();
        let Stmt::Assign { value, .. } = &prog.stmts[0] else {
            panic!();
        };
        let Expr::Binary { op, .. } = value else {
            panic!();
        };
        assert_eq!(*op, crate::ast::BinOp::Add);
    }

    #[test]
    fn test_semicolon_separated() {
        let prog = parse("x = 1; y = 2; return x").unwrap();
        assert_eq!(prog.stmts.len(), 3);
    }

    #[test]
    fn test_empty_source() {
        assert!(parse("").unwrap().stmts.is_empty());
        assert!(parse("\n\n# comment only\n").unwrap().stmts.is_empty());
    }
}
