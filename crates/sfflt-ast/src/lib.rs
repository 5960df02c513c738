//! The abstract syntax tree produced by parsing.
//!
//! Nodes already carry resolved [`Address`]es for every variable reference
//! — scope resolution happens during parsing, not as a separate pass, so
//! by the time an AST exists every `Variable`/`VarDecl` knows exactly
//! where its value lives. Whole-program concerns that need every function
//! signature visible at once (arity checking) are left to `sfflt-sem`,
//! which walks this tree after it's complete.

pub mod address;
pub mod expr;
pub mod stmt;

pub use address::{fnv1a32, function_label, Address, FUNC_BIT, GLOBAL_BASE, HEAP_BASE, LOCAL_BASE};
pub use expr::{AssignTarget, BinOp, Expr, UnOp, VarKind};
pub use stmt::{Function, Item, Param, Program, Stmt};
