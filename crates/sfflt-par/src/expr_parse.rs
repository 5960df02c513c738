//! Expression parsing: a hand-written precedence-climbing descent from
//! assignment (lowest, right-associative) down through primary.

use sfflt_ast::{AssignTarget, BinOp, Expr, UnOp};
use sfflt_lex::TokenKind;
use sfflt_util::{DiagnosticCode, Span, Symbol};

use crate::Parser;

impl<'a> Parser<'a> {
    pub(crate) fn parse_expression(&mut self) -> Expr {
        self.parse_assignment()
    }

    /// Right-associative: `a = b = c` parses as `a = (b = c)`, each
    /// innermost assignment leaving its stored value on the stack for the
    /// outer one.
    fn parse_assignment(&mut self) -> Expr {
        let left = self.parse_or();

        if self.check(&TokenKind::Eq) {
            let eq_span = self.span_here();
            self.advance();
            let value = self.parse_assignment();
            let span = left.span().merge(value.span()).merge(eq_span);

            return match assign_target(left) {
                Some(target) => {
                    // Codegen's `compile_expr(value); DUP; <target addr>;
                    // SWAP; STORE` nets +1 (the stored value stays on top),
                    // but the LHS was already counted as a +1 read by
                    // `parse_or` before we knew it'd become an address
                    // instead. Fold that extra push back out.
                    self.fold_binary();
                    Expr::Assign { target, value: Box::new(value), span }
                }
                None => {
                    self.error_with_code(
                        DiagnosticCode::E_PARSER_INVALID_ASSIGN_TARGET,
                        "Invalid assignment target.",
                    );
                    // Recover by keeping the (invalid) left side as a plain
                    // expression so the caller still gets a well-formed tree.
                    value
                }
            };
        }

        left
    }

    fn parse_or(&mut self) -> Expr {
        let mut left = self.parse_and();
        while self.check(&TokenKind::PipePipe) {
            self.advance();
            // The RHS only ever executes along the path where `left` was
            // false, and `JUMP_WHEN_ZERO` already popped `left`'s pushed
            // value by the time it does — so it's parsed at the same
            // depth `left` was, not one deeper.
            self.stack_top -= 1;
            let right = self.parse_and();
            let span = left.span().merge(right.span());
            left = Expr::Binary { op: BinOp::Or, left: Box::new(left), right: Box::new(right), span };
        }
        left
    }

    fn parse_and(&mut self) -> Expr {
        let mut left = self.parse_equality();
        while self.check(&TokenKind::AmpAmp) {
            self.advance();
            self.stack_top -= 1;
            let right = self.parse_equality();
            let span = left.span().merge(right.span());
            left =
                Expr::Binary { op: BinOp::And, left: Box::new(left), right: Box::new(right), span };
        }
        left
    }

    fn parse_equality(&mut self) -> Expr {
        let mut left = self.parse_comparison();
        loop {
            let op = if self.check(&TokenKind::EqEq) {
                BinOp::Eq
            } else if self.check(&TokenKind::BangEq) {
                BinOp::NotEq
            } else {
                break;
            };
            self.advance();
            let right = self.parse_comparison();
            self.fold_binary();
            let span = left.span().merge(right.span());
            left = Expr::Binary { op, left: Box::new(left), right: Box::new(right), span };
        }
        left
    }

    fn parse_comparison(&mut self) -> Expr {
        let mut left = self.parse_additive();
        loop {
            let op = if self.check(&TokenKind::Lt) {
                BinOp::Lt
            } else if self.check(&TokenKind::LtEq) {
                BinOp::LtEq
            } else if self.check(&TokenKind::Gt) {
                BinOp::Gt
            } else if self.check(&TokenKind::GtEq) {
                BinOp::GtEq
            } else {
                break;
            };
            self.advance();
            let right = self.parse_additive();
            self.fold_binary();
            let span = left.span().merge(right.span());
            left = Expr::Binary { op, left: Box::new(left), right: Box::new(right), span };
        }
        left
    }

    fn parse_additive(&mut self) -> Expr {
        let mut left = self.parse_multiplicative();
        loop {
            let op = if self.check(&TokenKind::Plus) {
                BinOp::Add
            } else if self.check(&TokenKind::Minus) {
                BinOp::Sub
            } else {
                break;
            };
            self.advance();
            let right = self.parse_multiplicative();
            self.fold_binary();
            let span = left.span().merge(right.span());
            left = Expr::Binary { op, left: Box::new(left), right: Box::new(right), span };
        }
        left
    }

    fn parse_multiplicative(&mut self) -> Expr {
        let mut left = self.parse_unary();
        loop {
            let op = if self.check(&TokenKind::Star) {
                BinOp::Mul
            } else if self.check(&TokenKind::Slash) {
                BinOp::Div
            } else if self.check(&TokenKind::Percent) {
                BinOp::Mod
            } else {
                break;
            };
            self.advance();
            let right = self.parse_unary();
            self.fold_binary();
            let span = left.span().merge(right.span());
            left = Expr::Binary { op, left: Box::new(left), right: Box::new(right), span };
        }
        left
    }

    fn parse_unary(&mut self) -> Expr {
        if self.check(&TokenKind::Minus) {
            let span = self.span_here();
            self.advance();
            // `PUSH -1` pushed ahead of the operand.
            self.push_value();
            let right = self.parse_unary();
            self.fold_binary();
            let span = span.merge(right.span());
            return Expr::Unary { op: UnOp::Neg, expr: Box::new(right), span };
        }
        if self.check(&TokenKind::Bang) {
            let span = self.span_here();
            self.advance();
            let right = self.parse_unary();
            // The zero-test consumes the operand before the diamond's
            // `PUSH 1`/`PUSH 0` — net effect is the same as any ordinary
            // primary's single push, so no extra fold here.
            let span = span.merge(right.span());
            return Expr::Unary { op: UnOp::Not, expr: Box::new(right), span };
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Expr {
        let mut expr = self.parse_primary();
        loop {
            if self.check(&TokenKind::LBracket) {
                let span = self.span_here();
                self.advance();
                let index = self.parse_expression();
                self.expect(&TokenKind::RBracket, "Expect ']' after index.");
                self.fold_binary();
                let span = expr.span().merge(index.span()).merge(span);
                expr = Expr::Index { receiver: Box::new(expr), index: Box::new(index), span };
            } else {
                break;
            }
        }
        expr
    }

    fn parse_primary(&mut self) -> Expr {
        let tok = self.current().clone();
        match &tok.kind {
            TokenKind::Int(v) => {
                let v = *v;
                self.advance();
                self.push_value();
                Expr::IntLit(v, self.token_span(&tok))
            }
            TokenKind::Char(v) => {
                let v = *v;
                self.advance();
                self.push_value();
                Expr::CharLit(v, self.token_span(&tok))
            }
            TokenKind::Str(s) => {
                let s = s.clone();
                self.advance();
                self.push_value();
                Expr::StringLit(s, self.token_span(&tok))
            }
            TokenKind::True => {
                self.advance();
                self.push_value();
                Expr::BoolLit(true, self.token_span(&tok))
            }
            TokenKind::False => {
                self.advance();
                self.push_value();
                Expr::BoolLit(false, self.token_span(&tok))
            }
            TokenKind::Getn => {
                self.advance();
                self.push_value();
                Expr::Call { callee: Symbol::KW_GETN, args: Vec::new(), span: self.token_span(&tok) }
            }
            TokenKind::Getc => {
                self.advance();
                self.push_value();
                Expr::Call { callee: Symbol::KW_GETC, args: Vec::new(), span: self.token_span(&tok) }
            }
            TokenKind::LBracket => self.parse_array_literal(),
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expression();
                self.expect(&TokenKind::RParen, "Expect ')' after expression.");
                inner
            }
            TokenKind::Identifier(name) => {
                let name = *name;
                self.advance();
                if self.check(&TokenKind::LParen) {
                    self.parse_call(name, self.token_span(&tok))
                } else {
                    let kind = self.resolve_variable(name);
                    self.push_value();
                    Expr::Variable { kind, name, span: self.token_span(&tok) }
                }
            }
            _ => {
                self.error_with_code(DiagnosticCode::E_PARSER_UNEXPECTED_TOKEN, "Expect expression.");
                self.advance();
                self.push_value();
                Expr::IntLit(0, self.token_span(&tok))
            }
        }
    }

    fn parse_call(&mut self, callee: Symbol, start: Span) -> Expr {
        self.expect(&TokenKind::LParen, "Expect '(' before arguments.");
        let before = self.stack_top;
        let mut args = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                args.push(self.parse_expression());
                if !self.match_token(&TokenKind::Comma) {
                    break;
                }
            }
        }
        let end = self.expect(&TokenKind::RParen, "Expect ')' after arguments.");
        // Arguments are fully consumed by the callee; exactly one return
        // value is left, regardless of arity.
        self.stack_top = before + 1;
        Expr::Call { callee, args, span: start.merge(self.token_span(&end)) }
    }

    fn parse_array_literal(&mut self) -> Expr {
        let start = self.span_here();
        self.advance();
        let before = self.stack_top;
        let mut elements = Vec::new();
        if !self.check(&TokenKind::RBracket) {
            loop {
                // Codegen's `DUP; PUSH (2+i); ADD` leaves `[ptr, addr]` on
                // the stack while each element expression runs, so an
                // `ARGUMENT` reference inside it sees two more cells than
                // `before` would suggest. Reset per element: codegen stores
                // each one (popping both `addr` and the value) before the
                // next element's `DUP` runs, so nothing accumulates.
                self.stack_top = before + 2;
                elements.push(self.parse_expression());
                if !self.match_token(&TokenKind::Comma) {
                    break;
                }
            }
        }
        let end = self.expect(&TokenKind::RBracket, "Expect ']' after array literal.");
        // Each element is popped into the freshly allocated block as it's
        // stored; only the resulting pointer remains on the stack, so the
        // net depth change is +1 regardless of element count.
        self.stack_top = before + 1;
        Expr::ArrayLit(elements, start.merge(self.token_span(&end)))
    }

    fn token_span(&self, tok: &sfflt_lex::Token) -> Span {
        Span::new(0, 0, tok.line, tok.column).with_file_id(self.file_id)
    }
}

/// Converts a fully parsed left-hand-side expression into an
/// [`AssignTarget`] if it's one of the assignable variants. `None`
/// signals "not assignable" to the caller, which reports "Invalid
/// assignment target."
fn assign_target(expr: Expr) -> Option<AssignTarget> {
    match expr {
        Expr::Variable { kind: sfflt_ast::VarKind::Global(address), name, .. }
        | Expr::Variable { kind: sfflt_ast::VarKind::Local(address), name, .. } => {
            Some(AssignTarget::Variable { address, name })
        }
        Expr::Index { receiver, index, .. } => Some(AssignTarget::Index { receiver, index }),
        _ => None,
    }
}
