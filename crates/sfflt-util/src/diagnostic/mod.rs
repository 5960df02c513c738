//! Diagnostic accumulation.
//!
//! Lexical, syntax, and name/arity errors are not surfaced as `Result`
//! short-circuits: each phase keeps going after an error (so a single
//! compile reports every problem it finds, not just the first) and
//! accumulates [`Diagnostic`]s into a [`Handler`] instead. The driver
//! checks `handler.has_errors()` after each phase and aborts with exit
//! code 1 if so, printing every accumulated diagnostic first.

mod builder;
mod codes;
mod level;

pub use builder::DiagnosticBuilder;
pub use codes::DiagnosticCode;
pub use level::Level;

use crate::Span;
use std::cell::RefCell;

/// One reported problem: a level, a message, and the span it's anchored to.
#[derive(Clone, Debug)]
pub struct Diagnostic {
    pub level: Level,
    pub message: String,
    pub span: Span,
    pub code: Option<DiagnosticCode>,
    pub notes: Vec<String>,
    /// The offending token's lexeme (or `"end"` for EOF), rendered inside
    /// single quotes in the driver's output line.
    pub lexeme: Option<String>,
}

impl Diagnostic {
    pub fn new(level: Level, message: impl Into<String>, span: Span) -> Self {
        Self {
            level,
            message: message.into(),
            span,
            code: None,
            notes: Vec::new(),
            lexeme: None,
        }
    }

    pub fn error(message: impl Into<String>, span: Span) -> Self {
        Self::new(Level::Error, message, span)
    }

    pub fn warning(message: impl Into<String>, span: Span) -> Self {
        Self::new(Level::Warning, message, span)
    }

    pub fn with_lexeme(mut self, lexeme: impl Into<String>) -> Self {
        self.lexeme = Some(lexeme.into());
        self
    }

    /// Renders `{location} {level} at '{lexeme}': {message}`, e.g.
    /// `main.sf:12 Error at ')': expected ';' after expression`.
    pub fn render(&self, location: &str) -> String {
        let lexeme = self.lexeme.as_deref().unwrap_or("end");
        format!(
            "{} {} at '{}': {}",
            location,
            capitalize(self.level.name()),
            lexeme,
            self.message
        )
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Collects diagnostics emitted over the course of one compile.
pub struct Handler {
    diagnostics: RefCell<Vec<Diagnostic>>,
}

impl Handler {
    pub fn new() -> Self {
        Self {
            diagnostics: RefCell::new(Vec::new()),
        }
    }

    fn emit(&self, diagnostic: Diagnostic) {
        self.diagnostics.borrow_mut().push(diagnostic);
    }

    pub fn emit_diagnostic(&self, diagnostic: Diagnostic) {
        self.emit(diagnostic);
    }

    pub fn build_error(&self, span: Span, message: impl Into<String>) -> DiagnosticBuilder {
        DiagnosticBuilder::error(message).span(span)
    }

    pub fn build_warning(&self, span: Span, message: impl Into<String>) -> DiagnosticBuilder {
        DiagnosticBuilder::warning(message).span(span)
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.borrow().iter().any(|d| d.level.is_error())
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics.borrow().iter().filter(|d| d.level.is_error()).count()
    }

    pub fn warning_count(&self) -> usize {
        self.diagnostics
            .borrow()
            .iter()
            .filter(|d| matches!(d.level, Level::Warning))
            .count()
    }

    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics.borrow().clone()
    }

    pub fn clear(&self) {
        self.diagnostics.borrow_mut().clear();
    }
}

impl Default for Handler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_matches_driver_format() {
        let diag = Diagnostic::error("expected ';' after expression", Span::DUMMY)
            .with_lexeme(")");
        assert_eq!(
            diag.render("main.sf:12"),
            "main.sf:12 Error at ')': expected ';' after expression"
        );
    }

    #[test]
    fn render_without_lexeme_says_end() {
        let diag = Diagnostic::error("unexpected end of file", Span::DUMMY);
        assert_eq!(diag.render("main.sf:9"), "main.sf:9 Error at 'end': unexpected end of file");
    }

    #[test]
    fn handler_tracks_error_and_warning_counts() {
        let handler = Handler::new();
        handler.emit_diagnostic(Diagnostic::error("bad", Span::DUMMY));
        handler.emit_diagnostic(Diagnostic::warning("unused", Span::DUMMY));
        handler.emit_diagnostic(Diagnostic::error("worse", Span::DUMMY));

        assert!(handler.has_errors());
        assert_eq!(handler.error_count(), 2);
        assert_eq!(handler.warning_count(), 1);
        assert_eq!(handler.diagnostics().len(), 3);
    }

    #[test]
    fn handler_clear_resets_counts() {
        let handler = Handler::new();
        handler.emit_diagnostic(Diagnostic::error("bad", Span::DUMMY));
        handler.clear();
        assert!(!handler.has_errors());
        assert_eq!(handler.error_count(), 0);
    }

    #[test]
    fn builder_roundtrips_through_handler() {
        let handler = Handler::new();
        handler
            .build_error(Span::DUMMY, "duplicate function 'foo'")
            .code(DiagnosticCode::E_SEMANTIC_DUPLICATE_FN)
            .lexeme("foo")
            .emit(&handler);

        let diags = handler.diagnostics();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, Some(DiagnosticCode::E_SEMANTIC_DUPLICATE_FN));
        assert_eq!(diags[0].lexeme.as_deref(), Some("foo"));
    }
}
