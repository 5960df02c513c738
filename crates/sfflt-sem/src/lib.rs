//! Name/arity resolution over a finished AST.
//!
//! This can't ride along with parsing the way scope resolution does: a
//! call is free to name a function declared later in the same file, or in
//! a file `include`d after the call site, so every declaration has to be
//! collected before any call site can be checked. The pass therefore walks
//! the tree twice — once to gather `{name -> arity}` for every declared
//! function, once to check every `Call` against that table or the fixed
//! builtin arities.

use std::collections::HashMap;

use sfflt_ast::{AssignTarget, Expr, Function, Item, Program, Stmt};
use sfflt_util::{DiagnosticBuilder, DiagnosticCode, Handler, Span, Symbol};

/// The fixed arity of a builtin callable by name from source. `getn`/`getc`
/// need no entry: they're keyword tokens, never `Call{callee: Identifier}`,
/// so a user can't shadow or mis-arity them.
fn builtin_arity(name: Symbol) -> Option<u32> {
    match name.as_str() {
        "len" => Some(1),
        "copy" => Some(2),
        "append" => Some(2),
        "_allocate" => Some(1),
        "_reallocate" => Some(2),
        "_memCopy" => Some(4),
        _ => None,
    }
}

type DeclaredFns = HashMap<Symbol, u32>;

/// Resolves every `Call` in `program` against its declared functions and
/// builtins, emitting diagnostics into `handler`. The driver must not run
/// code generation if `handler.has_errors()` is true afterward — the same
/// boundary the parser/resolver hand-off already observes.
pub fn resolve_program(program: &Program, handler: &Handler) {
    let mut declared = DeclaredFns::new();
    for item in &program.items {
        if let Item::Function(f) = item {
            declare_function(f, &mut declared, handler);
        }
    }

    for item in &program.items {
        match item {
            Item::Function(f) => check_stmts(&f.body, &declared, handler),
            Item::GlobalVar { init, .. } => check_expr(init, &declared, handler),
            Item::Stmt(s) => check_stmt(s, &declared, handler),
        }
    }
}

fn declare_function(f: &Function, declared: &mut DeclaredFns, handler: &Handler) {
    let arity = f.params.len() as u32;
    if declared.contains_key(&f.name) {
        DiagnosticBuilder::error(format!("function '{}' is already declared.", f.name))
            .code(DiagnosticCode::E_SEMANTIC_DUPLICATE_FN)
            .span(f.span)
            .lexeme(f.name.as_str())
            .emit(handler);
        return;
    }
    declared.insert(f.name, arity);
}

fn check_stmts(stmts: &[Stmt], declared: &DeclaredFns, handler: &Handler) {
    for s in stmts {
        check_stmt(s, declared, handler);
    }
}

fn check_stmt(stmt: &Stmt, declared: &DeclaredFns, handler: &Handler) {
    match stmt {
        Stmt::VarDecl { init, .. } => check_expr(init, declared, handler),
        Stmt::Put { expr, .. } => check_expr(expr, declared, handler),
        Stmt::Return { value: Some(v), .. } => check_expr(v, declared, handler),
        Stmt::Return { value: None, .. } | Stmt::Break { .. } => {}
        Stmt::If { cond, then_branch, else_branch, .. } => {
            check_expr(cond, declared, handler);
            check_stmt(then_branch, declared, handler);
            if let Some(e) = else_branch {
                check_stmt(e, declared, handler);
            }
        }
        Stmt::While { cond, body, .. } => {
            check_expr(cond, declared, handler);
            check_stmt(body, declared, handler);
        }
        Stmt::Block(stmts) => check_stmts(stmts, declared, handler),
        Stmt::ExprStmt(e) => check_expr(e, declared, handler),
    }
}

fn check_expr(expr: &Expr, declared: &DeclaredFns, handler: &Handler) {
    match expr {
        Expr::IntLit(..)
        | Expr::CharLit(..)
        | Expr::StringLit(..)
        | Expr::BoolLit(..)
        | Expr::Variable { .. } => {}
        Expr::ArrayLit(elements, _) => {
            for e in elements {
                check_expr(e, declared, handler);
            }
        }
        Expr::Assign { target, value, .. } => {
            if let AssignTarget::Index { receiver, index } = target {
                check_expr(receiver, declared, handler);
                check_expr(index, declared, handler);
            }
            check_expr(value, declared, handler);
        }
        Expr::Binary { left, right, .. } => {
            check_expr(left, declared, handler);
            check_expr(right, declared, handler);
        }
        Expr::Unary { expr, .. } => check_expr(expr, declared, handler),
        Expr::Index { receiver, index, .. } => {
            check_expr(receiver, declared, handler);
            check_expr(index, declared, handler);
        }
        Expr::Call { callee, args, span } => {
            for a in args {
                check_expr(a, declared, handler);
            }
            check_call(*callee, args.len() as u32, *span, declared, handler);
        }
    }
}

fn check_call(callee: Symbol, arity: u32, span: Span, declared: &DeclaredFns, handler: &Handler) {
    if callee == Symbol::KW_GETN || callee == Symbol::KW_GETC {
        return;
    }
    if let Some(expected) = builtin_arity(callee) {
        if expected != arity {
            emit_arity_mismatch(callee, expected, arity, span, handler);
        }
        return;
    }
    match declared.get(&callee) {
        Some(&expected) if expected == arity => {}
        Some(&expected) => emit_arity_mismatch(callee, expected, arity, span, handler),
        None => {
            DiagnosticBuilder::error(format!("function '{}' is not declared.", callee))
                .code(DiagnosticCode::E_SEMANTIC_UNDEFINED_FN)
                .span(span)
                .lexeme(callee.as_str())
                .emit(handler);
        }
    }
}

fn emit_arity_mismatch(callee: Symbol, expected: u32, got: u32, span: Span, handler: &Handler) {
    DiagnosticBuilder::error(format!("Expected {expected} arguments, but got {got}."))
        .code(DiagnosticCode::E_SEMANTIC_ARITY_MISMATCH)
        .span(span)
        .lexeme(callee.as_str())
        .emit(handler);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn resolve(source: &str) -> bool {
        let handler = Handler::new();
        let source_map = RefCell::new(sfflt_util::SourceMap::new());
        let resolver = sfflt_par::NullResolver;
        let session = sfflt_par::ParseSession::new(&handler, &source_map, &resolver);
        let program = sfflt_par::parse_program(source, "test.sf", &session);
        assert!(!handler.has_errors(), "unexpected parse errors");
        resolve_program(&program, &handler);
        handler.has_errors()
    }

    #[test]
    fn accepts_call_to_declared_function_with_matching_arity() {
        assert!(!resolve("func add(a, b) { return a + b; } add(1, 2);"));
    }

    #[test]
    fn accepts_forward_reference_to_later_declared_function() {
        assert!(!resolve("func main() { helper(); } func helper() { return 0; }"));
    }

    #[test]
    fn rejects_call_to_undeclared_function() {
        assert!(resolve("missing(1);"));
    }

    #[test]
    fn rejects_arity_mismatch_against_declared_function() {
        assert!(resolve("func add(a, b) { return a + b; } add(1);"));
    }

    #[test]
    fn rejects_duplicate_function_declaration() {
        assert!(resolve("func f() { return 0; } func f() { return 1; }"));
    }

    #[test]
    fn accepts_builtins_with_correct_arity() {
        assert!(!resolve("var a = [1, 2, 3]; len(a); copy(a, a); append(a, 4);"));
    }

    #[test]
    fn rejects_builtin_with_wrong_arity() {
        assert!(resolve("var a = [1, 2, 3]; len(a, a);"));
    }
}
