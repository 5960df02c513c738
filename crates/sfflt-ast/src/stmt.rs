use sfflt_util::{Span, Symbol};

use crate::address::Address;
use crate::expr::Expr;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Stmt {
    VarDecl { address: Address, name: Symbol, init: Expr, span: Span },

    /// `putn`/`putc` as a statement — `newline` false means `putc`,
    /// kept as a single variant since the two only differ in which
    /// opcode they lower to.
    Put { is_numeric: bool, expr: Expr, span: Span },

    Return { value: Option<Expr>, span: Span },
    Break { span: Span },

    If { cond: Expr, then_branch: Box<Stmt>, else_branch: Option<Box<Stmt>>, span: Span },
    While { cond: Expr, body: Box<Stmt>, span: Span },
    Block(Vec<Stmt>),
    ExprStmt(Expr),
}

impl Stmt {
    pub fn span(&self) -> Span {
        match self {
            Stmt::VarDecl { span, .. }
            | Stmt::Put { span, .. }
            | Stmt::Return { span, .. }
            | Stmt::Break { span }
            | Stmt::If { span, .. }
            | Stmt::While { span, .. } => *span,
            Stmt::Block(stmts) => stmts.first().map(Stmt::span).unwrap_or(Span::DUMMY),
            Stmt::ExprStmt(e) => e.span(),
        }
    }
}

/// A function parameter: its name (for diagnostics) and its 1-based
/// position in the signature. Unlike a `var`, a parameter has no
/// [`Address`] — it's read off the operand stack with `COPY`, never
/// `STORE`d anywhere (see `sfflt_ast::expr::VarKind::Argument`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Param {
    pub name: Symbol,
    pub argument_index: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Function {
    pub name: Symbol,
    pub label: u32,
    pub params: Vec<Param>,
    pub body: Vec<Stmt>,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Item {
    Function(Function),
    GlobalVar { address: Address, name: Symbol, init: Expr, span: Span },
    /// Any other top-level construct (`putn`/`if`/`while`/expression/...):
    /// the grammar lets a bare statement appear alongside `var`/`func` at
    /// the top level.
    Stmt(Stmt),
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Program {
    pub items: Vec<Item>,
}
