//! Top-level declarations: `var`, `func`, `include`, and bare statements
//! are all legal at the top level.

use sfflt_ast::{Address, Function, Item, Param};
use sfflt_lex::TokenKind;
use sfflt_util::{DiagnosticCode, Symbol};

use crate::scope::ScopeTree;
use crate::{parse_included, FunctionContext, Parser};

impl<'a> Parser<'a> {
    /// Dispatches one top-level declaration. Returns zero items (panic-mode
    /// recovery swallowed a malformed one, or an `include` cycle was a
    /// no-op), one item (the common case), or several (an `include`
    /// splices its whole file's worth of top-level items in place).
    pub(crate) fn parse_declaration(&mut self) -> Vec<Item> {
        if self.check(&TokenKind::Var) {
            self.parse_global_var().into_iter().collect()
        } else if self.check(&TokenKind::Func) {
            self.parse_function().into_iter().collect()
        } else if self.check(&TokenKind::Include) {
            self.parse_include_directive()
        } else {
            vec![Item::Stmt(self.parse_statement())]
        }
    }

    fn parse_global_var(&mut self) -> Option<Item> {
        let start = self.span_here();
        self.advance(); // `var`

        let name_tok = self.expect_identifier("Expect variable name.");
        self.expect(&TokenKind::Eq, "Expect '=' after variable name.");
        let init = self.with_statement_stack(|p| p.parse_expression());
        self.expect(&TokenKind::Semicolon, "Expect ';' after variable declaration.");

        let Some(name) = name_tok else {
            self.synchronize();
            return None;
        };
        let address = Address::global(name.as_str());
        let span = start.merge(init.span());
        Some(Item::GlobalVar { address, name, init, span })
    }

    /// `func name(params) { body }`. A `func` keyword reached from inside
    /// a body is rejected by `parse_statement` itself (see
    /// `stmt_parse.rs`) — this method only ever runs at the top level.
    fn parse_function(&mut self) -> Option<Item> {
        let start = self.span_here();
        self.advance(); // `func`

        let name_tok = self.expect_identifier("Expect function name.");
        self.expect(&TokenKind::LParen, "Expect '(' after function name.");

        let mut param_names = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                if let Some(p) = self.expect_identifier("Expect parameter name.") {
                    param_names.push(p);
                }
                if !self.match_token(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RParen, "Expect ')' after parameters.");

        let Some(name) = name_tok else {
            self.synchronize();
            return None;
        };

        let frame_id = self.session.next_frame_id();
        let label = sfflt_ast::function_label(name.as_str());
        let param_count = param_names.len() as u32;

        let mut scope = ScopeTree::for_function(frame_id);
        let params: Vec<Param> = param_names
            .into_iter()
            .enumerate()
            .map(|(i, p)| {
                let argument_index = (i + 1) as u32;
                scope.declare_param(p, argument_index);
                Param { name: p, argument_index }
            })
            .collect();

        let saved_scope = self.scope.replace(scope);
        let saved_function = self.current_function.replace(FunctionContext { param_count });
        let saved_stack_top = self.stack_top;
        self.stack_top = 0;

        self.expect(&TokenKind::LBrace, "Expect '{' before function body.");
        let mut body = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.is_eof() {
            body.push(self.parse_statement());
        }
        self.expect(&TokenKind::RBrace, "Expect '}' after function body.");

        self.stack_top = saved_stack_top;
        self.scope = saved_scope;
        self.current_function = saved_function;

        let span = start; // function declarations don't nest, body span not load-bearing
        Some(Item::Function(Function { name, label, params, body, span }))
    }

    /// Resolves and splices an `include`d file's top-level items in
    /// place. A cycle (path already visited) is a silent no-op — nothing
    /// is spliced, and no error is raised.
    fn parse_include_directive(&mut self) -> Vec<Item> {
        self.advance(); // `include`
        let path = match &self.current().kind {
            TokenKind::Str(s) => s.clone(),
            _ => {
                self.error_with_code(
                    DiagnosticCode::E_PARSER_UNEXPECTED_TOKEN,
                    "Expect path string after 'include'.",
                );
                self.synchronize();
                return Vec::new();
            }
        };
        self.advance();
        self.expect(&TokenKind::Semicolon, "Expect ';' after include path.");

        if self.session.has_visited(&path) {
            return Vec::new();
        }

        let Some(source) = self.session.resolver.resolve(&path) else {
            self.error_with_code(
                DiagnosticCode::E_PARSER_INCLUDE_CYCLE,
                format!("Could not resolve include '{path}'."),
            );
            return Vec::new();
        };

        // `include` only splices top-level items; the nested parse is
        // itself a full `parse_top_level`, so it can contain `var`/`func`/
        // nested `include`/bare statements just like the outer file.
        // Diagnostics share the same `Handler`, so the nested parser's
        // errors are already merged into ours without extra plumbing.
        parse_included(&path, &source, self.session).map(|p| p.items).unwrap_or_default()
    }

    fn expect_identifier(&mut self, message: &str) -> Option<Symbol> {
        if let TokenKind::Identifier(name) = &self.current().kind {
            let name = *name;
            self.advance();
            Some(name)
        } else {
            self.error_with_code(DiagnosticCode::E_PARSER_UNEXPECTED_TOKEN, message);
            None
        }
    }
}
