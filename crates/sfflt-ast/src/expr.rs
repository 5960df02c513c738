use sfflt_util::{Span, Symbol};

use crate::address::Address;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnOp {
    Neg,
    Not,
}

/// Where an assignment or increment writes: a plain variable, or one
/// element of an array. Only `Global`/`Local` variables and `Index`
/// expressions have a storable [`Address`] — an `ARGUMENT` variable has
/// none (see [`VarKind`]), so it structurally can't appear here. The
/// parser enforces this by rejecting an argument as an assignment target
/// before an `AssignTarget` is ever built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AssignTarget {
    Variable { address: Address, name: Symbol },
    Index { receiver: Box<Expr>, index: Box<Expr> },
}

/// How a variable reference resolves, fixed at parse time.
///
/// `Global`/`Local` carry a storable [`Address`] and lower to
/// `PUSH addr; RETRIEVE`. `Argument` carries no address at all: the value
/// lives on the operand stack at the position `CALLSUB` left it, and is
/// read back with `COPY offset`, where
/// `offset = param_count - argument_index + relative_index + 1`.
/// `relative_index` is the parser's stack-depth-model reading at the
/// reference site (the `+1` compensates for the return address `CALLSUB`
/// pushes). This is what lets recursive calls work: each activation's
/// arguments stay on the stack rather than aliasing a shared address.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VarKind {
    Global(Address),
    Local(Address),
    Argument {
        param_count: u32,
        argument_index: u32,
        relative_index: u32,
    },
}

impl VarKind {
    /// `offset = paramCount − argumentIndex + relativeIndex + 1`. Only
    /// meaningful for `Argument`.
    pub fn copy_offset(&self) -> Option<u32> {
        match *self {
            VarKind::Argument { param_count, argument_index, relative_index } => {
                Some(param_count - argument_index + relative_index + 1)
            }
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Expr {
    IntLit(i64, Span),
    CharLit(i64, Span),
    StringLit(String, Span),
    BoolLit(bool, Span),
    ArrayLit(Vec<Expr>, Span),

    Variable { kind: VarKind, name: Symbol, span: Span },

    Assign { target: AssignTarget, value: Box<Expr>, span: Span },

    Binary { op: BinOp, left: Box<Expr>, right: Box<Expr>, span: Span },
    Unary { op: UnOp, expr: Box<Expr>, span: Span },

    Index { receiver: Box<Expr>, index: Box<Expr>, span: Span },

    /// `name(args)` — ordinary user calls, and the `len`/`getn`/`getc`
    /// builtins, which read the same way syntactically but lower
    /// differently in codegen (`len` degenerates to a single `RETRIEVE`;
    /// `getn`/`getc` read from stdin into the I/O scratch cell).
    Call { callee: Symbol, args: Vec<Expr>, span: Span },
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::IntLit(_, s)
            | Expr::CharLit(_, s)
            | Expr::StringLit(_, s)
            | Expr::BoolLit(_, s)
            | Expr::ArrayLit(_, s) => *s,
            Expr::Variable { span, .. }
            | Expr::Assign { span, .. }
            | Expr::Binary { span, .. }
            | Expr::Unary { span, .. }
            | Expr::Index { span, .. }
            | Expr::Call { span, .. } => *span,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copy_offset_is_param_count_minus_index_plus_relative_plus_one() {
        // func f(a, b, c) { a + c; }
        let a = VarKind::Argument { param_count: 3, argument_index: 1, relative_index: 0 };
        let c = VarKind::Argument { param_count: 3, argument_index: 3, relative_index: 1 };
        assert_eq!(a.copy_offset(), Some(3));
        assert_eq!(c.copy_offset(), Some(2));
    }

    #[test]
    fn copy_offset_is_none_for_global_and_local() {
        assert_eq!(VarKind::Global(Address::global("g")).copy_offset(), None);
        assert_eq!(VarKind::Local(Address::local(0, 0)).copy_offset(), None);
    }
}
