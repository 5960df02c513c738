//! Code generation: lowers a resolved [`sfflt_ast::Program`] to the
//! three-symbol `F`/`L`/`T` instruction stream, then renders it to text
//! in one of the driver's three output modes.

pub mod builtins;
pub mod codegen;
pub mod format;
pub mod instr;

pub use codegen::Generator;
pub use format::{render_program, FormatError, OutputFormat};
pub use instr::{Instr, Stream};

use sfflt_ast::Program;

/// Compiles `program` to its final, flat instruction list. A thin
/// convenience wrapper so a driver doesn't need to know about
/// [`Generator`]'s construction at all.
pub fn compile_program(program: &Program) -> Vec<Instr> {
    Generator::new().compile(program)
}
