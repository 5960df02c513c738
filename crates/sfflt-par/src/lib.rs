//! Recursive-descent, precedence-climbing parser that builds the AST,
//! resolves variable names to addresses, and tracks the stack-depth model
//! in a single pass over the token stream.
//!
//! Why fold scope resolution into parsing rather than a later pass: by
//! the time an expression like `a + b` is built, each `a`/`b` already
//! needs to know whether it's a global, a local, or a parameter — a
//! parameter's `COPY` offset additionally depends on how many values are
//! sitting on the operand stack *at the point of reference*, something
//! only the parser (which is walking the source in the same order the
//! generated code will execute it) can know cheaply. A separate resolver
//! pass would have to re-derive that stack depth from scratch.

mod expr_parse;
pub mod include;
mod items;
mod scope;
mod stmt_parse;

use std::cell::RefCell;
use std::collections::HashSet;

use sfflt_ast::{Address, Program, VarKind};
use sfflt_lex::{Lexer, Token, TokenKind};
use sfflt_util::{DiagnosticBuilder, DiagnosticCode, FileId, Handler, SourceMap, Span, Symbol};

pub use include::{BundledLibraries, FsFallbackResolver, IncludeResolver, NullResolver};
use scope::{Binding, RibKind, ScopeTree};

/// State pushed when entering a function body, popped on exit. Holds the
/// bits code generation needs that aren't captured by `ScopeTree` itself.
struct FunctionContext {
    param_count: u32,
}

/// Shared, mutable state that must stay consistent across an `include`'s
/// recursive parse: which files have already been expanded, and the
/// frame-id counter handing out disjoint local-address spaces to every
/// function in the program (not just the current file).
pub struct ParseSession<'a> {
    pub handler: &'a Handler,
    pub source_map: &'a RefCell<SourceMap>,
    pub resolver: &'a dyn IncludeResolver,
    visited: RefCell<HashSet<String>>,
    next_frame_id: RefCell<u8>,
}

impl<'a> ParseSession<'a> {
    pub fn new(
        handler: &'a Handler,
        source_map: &'a RefCell<SourceMap>,
        resolver: &'a dyn IncludeResolver,
    ) -> Self {
        Self {
            handler,
            source_map,
            resolver,
            visited: RefCell::new(HashSet::new()),
            next_frame_id: RefCell::new(0),
        }
    }

    fn mark_visited(&self, path: &str) -> bool {
        self.visited.borrow_mut().insert(path.to_string())
    }

    fn has_visited(&self, path: &str) -> bool {
        self.visited.borrow().contains(path)
    }

    fn next_frame_id(&self) -> u8 {
        let mut counter = self.next_frame_id.borrow_mut();
        let id = *counter;
        *counter = counter.wrapping_add(1);
        id
    }
}

/// Parses `source` (registered in `session.source_map` under `filename`)
/// into a [`Program`], expanding `include`s along the way. Errors are
/// accumulated into `session.handler`; on a non-empty error set the
/// caller should not proceed to the resolver or code generator.
pub fn parse_program(source: &str, filename: &str, session: &ParseSession<'_>) -> Program {
    let file_id = session.source_map.borrow_mut().add_file(filename, source.to_string());
    session.mark_visited(filename);
    let mut parser = Parser::new(source, filename, file_id, session);
    let items = parser.parse_top_level();
    Program { items }
}

/// Top-level entry point for an `include`d file: same as [`parse_program`]
/// but checks/updates the visited set instead of assuming a fresh file.
/// Returns `None` if `path` was already visited (a silent no-op).
fn parse_included(path: &str, source: &str, session: &ParseSession<'_>) -> Option<Program> {
    if !session.mark_visited(path) {
        return None;
    }
    let file_id = session.source_map.borrow_mut().add_file(path, source.to_string());
    let mut parser = Parser::new(source, path, file_id, session);
    let items = parser.parse_top_level();
    Some(Program { items })
}

pub struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    session: &'a ParseSession<'a>,
    file_id: FileId,
    filename: String,

    /// `None` at the top level (depth 0, globals); `Some` inside a
    /// function body.
    scope: Option<ScopeTree>,
    current_function: Option<FunctionContext>,

    /// The value-stack depth the generated code will have at the point
    /// currently being parsed (the "stack-depth model").
    stack_top: u32,

    /// `while`/desugared `for` nesting, tracked independent of function
    /// scope so `break` is checked the same way at the top level as
    /// inside a function body.
    loop_depth: u32,
}

impl<'a> Parser<'a> {
    fn new(source: &str, filename: &str, file_id: FileId, session: &'a ParseSession<'a>) -> Self {
        let tokens = Self::lex_all(source, file_id, session.handler);
        Self {
            tokens,
            pos: 0,
            session,
            file_id,
            filename: filename.to_string(),
            scope: None,
            current_function: None,
            stack_top: 0,
            loop_depth: 0,
        }
    }

    fn lex_all(source: &str, file_id: FileId, handler: &Handler) -> Vec<Token> {
        let mut lexer = Lexer::new(source, handler, file_id);
        let mut tokens = Vec::new();
        loop {
            let tok = lexer.next_token();
            let eof = tok.is_eof();
            tokens.push(tok);
            if eof {
                break;
            }
        }
        tokens
    }

    // ---- token access -------------------------------------------------

    fn current(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek(&self) -> &Token {
        &self.tokens[(self.pos + 1).min(self.tokens.len() - 1)]
    }

    fn is_eof(&self) -> bool {
        self.current().is_eof()
    }

    fn advance(&mut self) -> Token {
        let tok = self.current().clone();
        if !tok.is_eof() {
            self.pos += 1;
        }
        tok
    }

    fn check(&self, kind: &TokenKind) -> bool {
        same_kind(&self.current().kind, kind)
    }

    fn match_token(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Consumes `kind`, reporting `message` at the current token if it's
    /// not there. Returns the consumed token either way so callers can
    /// keep parsing (error recovery happens at the statement level, not
    /// here).
    fn expect(&mut self, kind: &TokenKind, message: &str) -> Token {
        if self.check(kind) {
            self.advance()
        } else {
            self.error_at_current(message);
            self.current().clone()
        }
    }

    fn span_here(&self) -> Span {
        let tok = self.current();
        Span::new(0, 0, tok.line, tok.column).with_file_id(self.file_id)
    }

    fn error_at_current(&self, message: impl Into<String>) {
        let tok = self.current();
        let lexeme = if tok.is_eof() { "end".to_string() } else { tok.lexeme.clone() };
        DiagnosticBuilder::error(message)
            .code(DiagnosticCode::E_PARSER_UNEXPECTED_TOKEN)
            .span(Span::new(0, 0, tok.line, tok.column).with_file_id(self.file_id))
            .lexeme(lexeme)
            .emit(self.session.handler);
    }

    fn error_with_code(&self, code: DiagnosticCode, message: impl Into<String>) {
        let tok = self.current();
        let lexeme = if tok.is_eof() { "end".to_string() } else { tok.lexeme.clone() };
        DiagnosticBuilder::error(message)
            .code(code)
            .span(Span::new(0, 0, tok.line, tok.column).with_file_id(self.file_id))
            .lexeme(lexeme)
            .emit(self.session.handler);
    }

    /// Panic-mode recovery: skip tokens until a statement
    /// terminator `;` (consumed) or the start of a new statement keyword
    /// (left in place, so the caller's next `parse_declaration` sees it).
    fn synchronize(&mut self) {
        while !self.is_eof() {
            if self.check(&TokenKind::Semicolon) {
                self.advance();
                return;
            }
            if is_statement_start(&self.current().kind) {
                return;
            }
            self.advance();
        }
    }

    // ---- stack-depth model ---------------------------------------------

    /// One value pushed: a literal, a resolved variable read, a call's
    /// return value, an indexed read, an array/string allocation's
    /// pointer. See module docs and `sfflt_ast::expr::VarKind` for why
    /// this needs tracking at all.
    fn push_value(&mut self) {
        self.stack_top += 1;
    }

    /// Two operands folded into one result (any binary arithmetic or
    /// comparison op, unary negate's synthetic `-1`, `Index`'s address
    /// arithmetic).
    fn fold_binary(&mut self) {
        self.stack_top -= 1;
    }

    /// `relativeIndex` at the current point: the operand-stack depth an
    /// `ARGUMENT` reference sees right now.
    fn relative_index(&self) -> u32 {
        self.stack_top
    }

    /// Runs `f` with `stack_top` pinned to its value on entry: every
    /// statement's net effect on the operand stack is zero (its pushes
    /// are always consumed by a `STORE`/`DISCARD`/control transfer before
    /// the next statement starts), so resetting here keeps `stack_top`
    /// from drifting across a `Block`'s statements without every
    /// statement variant having to account for its own cleanup.
    fn with_statement_stack<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        let before = self.stack_top;
        let result = f(self);
        self.stack_top = before;
        result
    }

    // ---- scope ----------------------------------------------------------

    fn in_function(&self) -> bool {
        self.scope.is_some()
    }

    fn in_loop(&self) -> bool {
        self.loop_depth > 0
    }

    /// Resolves `name` against the active function scope, or falls back
    /// to a global: if not found at any scope, the variable is `GLOBAL`.
    fn resolve_variable(&self, name: Symbol) -> VarKind {
        if let Some(scope) = &self.scope {
            if let Some(binding) = scope.resolve(name) {
                return match binding {
                    Binding::Local(address) => VarKind::Local(address),
                    Binding::Argument(argument_index) => VarKind::Argument {
                        param_count: self
                            .current_function
                            .as_ref()
                            .map(|f| f.param_count)
                            .unwrap_or(0),
                        argument_index,
                        relative_index: self.relative_index(),
                    },
                };
            }
        }
        VarKind::Global(Address::global(name.as_str()))
    }

    fn parse_top_level(&mut self) -> Vec<sfflt_ast::Item> {
        let mut items = Vec::new();
        while !self.is_eof() {
            items.extend(self.parse_declaration());
        }
        items
    }
}

/// Compares token kinds by shape, ignoring any payload — used for
/// `check`/`match_token` where we only care "is this a `Semicolon`", not
/// which literal value an `Int`/`Identifier` carries.
fn same_kind(a: &TokenKind, b: &TokenKind) -> bool {
    std::mem::discriminant(a) == std::mem::discriminant(b)
}

fn is_statement_start(kind: &TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Var
            | TokenKind::Func
            | TokenKind::If
            | TokenKind::While
            | TokenKind::For
            | TokenKind::Return
            | TokenKind::Break
            | TokenKind::Putn
            | TokenKind::Putc
            | TokenKind::Include
            | TokenKind::LBrace
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn parse(source: &str) -> (Program, bool) {
        let handler = Handler::new();
        let source_map = RefCell::new(SourceMap::new());
        let resolver = NullResolver;
        let session = ParseSession::new(&handler, &source_map, &resolver);
        let program = parse_program(source, "test.sf", &session);
        (program, handler.has_errors())
    }

    #[test]
    fn parses_empty_program() {
        let (program, had_errors) = parse("");
        assert!(!had_errors);
        assert!(program.items.is_empty());
    }

    #[test]
    fn parses_global_var_decl() {
        let (program, had_errors) = parse("var a = 1;");
        assert!(!had_errors);
        assert_eq!(program.items.len(), 1);
        assert!(matches!(program.items[0], sfflt_ast::Item::GlobalVar { .. }));
    }

    #[test]
    fn parses_bare_top_level_statement() {
        let (program, had_errors) = parse("1 + 2;");
        assert!(!had_errors);
        assert!(matches!(program.items[0], sfflt_ast::Item::Stmt(_)));
    }

    #[test]
    fn reports_error_on_missing_semicolon() {
        let (_, had_errors) = parse("var a = 1");
        assert!(had_errors);
    }

    #[test]
    fn panic_mode_recovers_to_next_statement() {
        let (program, had_errors) = parse("var a = ;\nvar b = 2;");
        assert!(had_errors);
        // Recovery should still pick up the second, well-formed declaration.
        assert!(program.items.iter().any(
            |it| matches!(it, sfflt_ast::Item::GlobalVar { name, .. } if name.eq_str("b"))
        ));
    }
}
