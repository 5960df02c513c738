//! Shared infrastructure used across the compiler: interned symbols,
//! source spans, and diagnostic reporting.
//!
//! Every other crate in this workspace depends on `sfflt-util` for these
//! three concerns rather than rolling its own `String`-keyed identifier
//! table or ad-hoc error `Vec`.

pub mod diagnostic;
pub mod error;
pub mod span;
pub mod symbol;

pub use diagnostic::{Diagnostic, DiagnosticBuilder, DiagnosticCode, Handler, Level};
pub use error::{DiagnosticError, DiagnosticResult, SourceMapError, SourceMapResult, SymbolError, SymbolResult};
pub use span::{FileId, SourceFile, SourceMap, Span};
pub use symbol::Symbol;
