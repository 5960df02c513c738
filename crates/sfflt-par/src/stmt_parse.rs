//! Statement parsing: everything `parse_declaration`'s fallback arm and a
//! function body's `{ ... }` hand off to. `var` is legal here too — a
//! `var` nested inside a function's body (at any block depth within it)
//! declares a LOCAL; a `var` inside a bare block or loop body that isn't
//! inside any function falls back to GLOBAL, the same as a top-level one
//! (frames are only assigned to function-owned locals, so a block with
//! no enclosing function has nowhere to put one).

use sfflt_ast::{Address, Stmt};
use sfflt_lex::TokenKind;
use sfflt_util::DiagnosticCode;

use crate::scope::RibKind;
use crate::Parser;

impl<'a> Parser<'a> {
    pub(crate) fn parse_statement(&mut self) -> Stmt {
        if self.check(&TokenKind::Var) {
            return self.parse_var_stmt();
        }
        if self.check(&TokenKind::Func) {
            self.error_at_current("Nested function declarations are not allowed.");
            self.synchronize();
            return Stmt::Block(Vec::new());
        }
        if self.check(&TokenKind::Include) {
            self.error_at_current("'include' is only legal at the top level of a file.");
            self.synchronize();
            return Stmt::Block(Vec::new());
        }
        if self.check(&TokenKind::Putn) {
            return self.parse_put(true);
        }
        if self.check(&TokenKind::Putc) {
            return self.parse_put(false);
        }
        if self.check(&TokenKind::Return) {
            return self.parse_return();
        }
        if self.check(&TokenKind::Break) {
            return self.parse_break();
        }
        if self.check(&TokenKind::If) {
            return self.parse_if();
        }
        if self.check(&TokenKind::While) {
            return self.parse_while();
        }
        if self.check(&TokenKind::For) {
            return self.parse_for();
        }
        if self.check(&TokenKind::LBrace) {
            return self.parse_block();
        }
        self.parse_expr_stmt()
    }

    /// A `var` reached from statement position: LOCAL if a function scope
    /// is active, GLOBAL otherwise. The initializer is parsed before the
    /// name is bound, so `var a = a;` reads the *outer* `a`, not itself.
    fn parse_var_stmt(&mut self) -> Stmt {
        let start = self.span_here();
        self.advance(); // `var`
        let name_tok = self.expect_identifier("Expect variable name.");

        if let (Some(name), Some(scope)) = (name_tok, self.scope.as_ref()) {
            if scope.declared_in_current_scope(name) {
                self.error_with_code(
                    DiagnosticCode::E_PARSER_UNEXPECTED_TOKEN,
                    format!("'{}' is already declared in this scope.", name.as_str()),
                );
            }
        }

        self.expect(&TokenKind::Eq, "Expect '=' after variable name.");
        let init = self.with_statement_stack(|p| p.parse_expression());
        self.expect(&TokenKind::Semicolon, "Expect ';' after variable declaration.");

        let Some(name) = name_tok else {
            self.synchronize();
            return Stmt::Block(Vec::new());
        };

        let address = match self.scope.as_mut() {
            Some(scope) => scope.declare_local(name),
            None => Address::global(name.as_str()),
        };
        let span = start.merge(init.span());
        Stmt::VarDecl { address, name, init, span }
    }

    fn parse_put(&mut self, is_numeric: bool) -> Stmt {
        let start = self.span_here();
        self.advance(); // `putn`/`putc`
        let expr = self.with_statement_stack(|p| p.parse_expression());
        self.expect(&TokenKind::Semicolon, "Expect ';' after value.");
        let span = start.merge(expr.span());
        Stmt::Put { is_numeric, expr, span }
    }

    fn parse_return(&mut self) -> Stmt {
        let start = self.span_here();
        if !self.in_function() {
            self.error_at_current("'return' outside a function.");
        }
        self.advance(); // `return`
        let value = if self.check(&TokenKind::Semicolon) {
            None
        } else {
            Some(self.with_statement_stack(|p| p.parse_expression()))
        };
        self.expect(&TokenKind::Semicolon, "Expect ';' after return value.");
        let span = value.as_ref().map(|v| start.merge(v.span())).unwrap_or(start);
        Stmt::Return { value, span }
    }

    fn parse_break(&mut self) -> Stmt {
        let span = self.span_here();
        if !self.in_loop() {
            self.error_with_code(
                DiagnosticCode::E_PARSER_BREAK_OUTSIDE_LOOP,
                "'break' outside a loop.",
            );
        }
        self.advance(); // `break`
        self.expect(&TokenKind::Semicolon, "Expect ';' after 'break'.");
        Stmt::Break { span }
    }

    fn parse_if(&mut self) -> Stmt {
        let start = self.span_here();
        self.advance(); // `if`
        self.expect(&TokenKind::LParen, "Expect '(' after 'if'.");
        let cond = self.with_statement_stack(|p| p.parse_expression());
        self.expect(&TokenKind::RParen, "Expect ')' after condition.");
        let then_branch = Box::new(self.parse_statement());
        let else_branch = if self.match_token(&TokenKind::Else) {
            Some(Box::new(self.parse_statement()))
        } else {
            None
        };
        let span = start.merge(then_branch.span());
        Stmt::If { cond, then_branch, else_branch, span }
    }

    fn parse_while(&mut self) -> Stmt {
        let start = self.span_here();
        self.advance(); // `while`
        self.expect(&TokenKind::LParen, "Expect '(' after 'while'.");
        let cond = self.with_statement_stack(|p| p.parse_expression());
        self.expect(&TokenKind::RParen, "Expect ')' after condition.");
        let body = self.parse_loop_body();
        let span = start.merge(body.span());
        Stmt::While { cond, body: Box::new(body), span }
    }

    /// `for (init?; cond?; step?) body` desugars into a block holding the
    /// init statement followed by a `while` whose body is itself a block
    /// of `{ body; step; }` — a fresh block so `init`'s bindings don't
    /// leak past the loop.
    fn parse_for(&mut self) -> Stmt {
        let start = self.span_here();
        self.advance(); // `for`
        self.expect(&TokenKind::LParen, "Expect '(' after 'for'.");

        if let Some(scope) = self.scope.as_mut() {
            scope.enter_block(RibKind::Block);
        }

        let init = if self.check(&TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_statement_like_clause())
        };
        if init.is_none() {
            self.expect(&TokenKind::Semicolon, "Expect ';' after loop initializer.");
        }

        let cond = if self.check(&TokenKind::Semicolon) {
            sfflt_ast::Expr::BoolLit(true, self.span_here())
        } else {
            self.with_statement_stack(|p| p.parse_expression())
        };
        self.expect(&TokenKind::Semicolon, "Expect ';' after loop condition.");

        let step = if self.check(&TokenKind::RParen) {
            None
        } else {
            Some(self.with_statement_stack(|p| p.parse_expression()))
        };
        self.expect(&TokenKind::RParen, "Expect ')' after for clauses.");

        let body = self.parse_loop_body();
        let span = start.merge(body.span());

        let inner_block = match step {
            Some(step) => Stmt::Block(vec![body, Stmt::ExprStmt(step)]),
            None => body,
        };
        let while_stmt = Stmt::While { cond, body: Box::new(inner_block), span };

        if let Some(scope) = self.scope.as_mut() {
            scope.exit_block();
        }

        match init {
            Some(init) => Stmt::Block(vec![init, while_stmt]),
            None => while_stmt,
        }
    }

    /// Parses a `for` initializer clause: either a `var` declaration (no
    /// trailing `;` consumed here — the caller's ordinary `;` handling
    /// after `parse_var_stmt` already does that) or a bare expression
    /// statement.
    fn parse_statement_like_clause(&mut self) -> Stmt {
        if self.check(&TokenKind::Var) {
            self.parse_var_stmt()
        } else {
            let expr = self.with_statement_stack(|p| p.parse_expression());
            self.expect(&TokenKind::Semicolon, "Expect ';' after loop initializer.");
            Stmt::ExprStmt(expr)
        }
    }

    fn parse_loop_body(&mut self) -> Stmt {
        self.loop_depth += 1;
        let body = self.parse_statement();
        self.loop_depth -= 1;
        body
    }

    fn parse_block(&mut self) -> Stmt {
        self.advance(); // `{`
        if let Some(scope) = self.scope.as_mut() {
            scope.enter_block(RibKind::Block);
        }
        let mut stmts = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.is_eof() {
            stmts.push(self.parse_statement());
        }
        self.expect(&TokenKind::RBrace, "Expect '}' after block.");
        if let Some(scope) = self.scope.as_mut() {
            scope.exit_block();
        }
        Stmt::Block(stmts)
    }

    fn parse_expr_stmt(&mut self) -> Stmt {
        let expr = self.with_statement_stack(|p| p.parse_expression());
        if !self.match_token(&TokenKind::Semicolon) {
            self.error_at_current("Expect ';' after expression.");
            self.synchronize();
        }
        Stmt::ExprStmt(expr)
    }
}
