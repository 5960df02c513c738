//! Fluent construction of [`Diagnostic`] values.

use super::{Diagnostic, DiagnosticCode, Level};
use crate::Span;

/// Builder for a [`Diagnostic`]. Obtained from `DiagnosticBuilder::error`/
/// `warning`, or from `Handler::build_error`/`build_warning`.
pub struct DiagnosticBuilder {
    level: Level,
    message: String,
    span: Span,
    code: Option<DiagnosticCode>,
    notes: Vec<String>,
    lexeme: Option<String>,
}

impl DiagnosticBuilder {
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            span: Span::DUMMY,
            code: None,
            notes: Vec::new(),
            lexeme: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Level::Error, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Level::Warning, message)
    }

    pub fn code(mut self, code: DiagnosticCode) -> Self {
        self.code = Some(code);
        self
    }

    pub fn span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// The offending token's lexeme, or `"end"` for an EOF diagnostic —
    /// slotted into the `'{lexeme}'` part of the rendered message.
    pub fn lexeme(mut self, lexeme: impl Into<String>) -> Self {
        self.lexeme = Some(lexeme.into());
        self
    }

    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn build(self) -> Diagnostic {
        Diagnostic {
            level: self.level,
            message: self.message,
            span: self.span,
            code: self.code,
            notes: self.notes,
            lexeme: self.lexeme,
        }
    }

    pub fn emit(self, handler: &super::Handler) {
        handler.emit_diagnostic(self.build());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults_to_dummy_span() {
        let diag = DiagnosticBuilder::error("bad token").build();
        assert_eq!(diag.span, Span::DUMMY);
        assert!(diag.lexeme.is_none());
    }

    #[test]
    fn builder_is_fluent() {
        let diag = DiagnosticBuilder::error("unexpected token")
            .code(DiagnosticCode::E_PARSER_UNEXPECTED_TOKEN)
            .span(Span::new(0, 1, 3, 5))
            .lexeme(")")
            .note("expected ';'")
            .build();

        assert_eq!(diag.level, Level::Error);
        assert_eq!(diag.code, Some(DiagnosticCode::E_PARSER_UNEXPECTED_TOKEN));
        assert_eq!(diag.lexeme.as_deref(), Some(")"));
        assert_eq!(diag.notes, vec!["expected ';'"]);
    }
}
