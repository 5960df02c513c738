//! Turns source text into a stream of [`Token`]s.
//!
//! The dispatch shape — skip whitespace and comments, record the token's
//! start position, switch on the current character — mirrors the rest of
//! this pack's lexers. Unrecognized characters are reported through the
//! [`Handler`] rather than panicking, so one lex pass can surface every bad
//! character in a file instead of stopping at the first one.

use sfflt_util::{DiagnosticBuilder, DiagnosticCode, Handler, Span};

use crate::cursor::Cursor;
use crate::token::{Token, TokenKind};

pub struct Lexer<'a> {
    cursor: Cursor<'a>,
    handler: &'a Handler,
    file_id: sfflt_util::FileId,
    token_start: usize,
    token_start_line: u32,
    token_start_column: u32,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str, handler: &'a Handler, file_id: sfflt_util::FileId) -> Self {
        Self {
            cursor: Cursor::new(source),
            handler,
            file_id,
            token_start: 0,
            token_start_line: 1,
            token_start_column: 1,
        }
    }

    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace_and_comments();

        self.token_start = self.cursor.position();
        self.token_start_line = self.cursor.line();
        self.token_start_column = self.cursor.column();

        if self.cursor.is_at_end() {
            return self.make_token(TokenKind::Eof, "");
        }

        let c = self.cursor.current_char();
        match c {
            '+' => self.single(TokenKind::Plus),
            '-' => self.single(TokenKind::Minus),
            '*' => self.single(TokenKind::Star),
            '/' => self.single(TokenKind::Slash),
            '%' => self.single(TokenKind::Percent),
            '(' => self.single(TokenKind::LParen),
            ')' => self.single(TokenKind::RParen),
            '{' => self.single(TokenKind::LBrace),
            '}' => self.single(TokenKind::RBrace),
            '[' => self.single(TokenKind::LBracket),
            ']' => self.single(TokenKind::RBracket),
            ',' => self.single(TokenKind::Comma),
            ';' => self.single(TokenKind::Semicolon),
            '=' => {
                self.cursor.advance();
                if self.cursor.match_char('=') {
                    self.finish(TokenKind::EqEq)
                } else {
                    self.finish(TokenKind::Eq)
                }
            }
            '!' => {
                self.cursor.advance();
                if self.cursor.match_char('=') {
                    self.finish(TokenKind::BangEq)
                } else {
                    self.finish(TokenKind::Bang)
                }
            }
            '<' => {
                self.cursor.advance();
                if self.cursor.match_char('=') {
                    self.finish(TokenKind::LtEq)
                } else {
                    self.finish(TokenKind::Lt)
                }
            }
            '>' => {
                self.cursor.advance();
                if self.cursor.match_char('=') {
                    self.finish(TokenKind::GtEq)
                } else {
                    self.finish(TokenKind::Gt)
                }
            }
            '&' => {
                self.cursor.advance();
                if self.cursor.match_char('&') {
                    self.finish(TokenKind::AmpAmp)
                } else {
                    self.report_error(DiagnosticCode::E_LEXER_UNEXPECTED_CHAR, "unexpected character");
                    self.next_token()
                }
            }
            '|' => {
                self.cursor.advance();
                if self.cursor.match_char('|') {
                    self.finish(TokenKind::PipePipe)
                } else {
                    self.report_error(DiagnosticCode::E_LEXER_UNEXPECTED_CHAR, "unexpected character");
                    self.next_token()
                }
            }
            '\'' => self.scan_char(),
            '"' => self.scan_string(),
            c if c.is_ascii_digit() => self.scan_number(),
            c if is_letter(c) => self.scan_identifier(),
            _ => {
                self.cursor.advance();
                self.report_error(DiagnosticCode::E_LEXER_UNEXPECTED_CHAR, "unexpected character");
                self.next_token()
            }
        }
    }

    fn single(&mut self, kind: TokenKind) -> Token {
        self.cursor.advance();
        self.finish(kind)
    }

    fn finish(&mut self, kind: TokenKind) -> Token {
        let lexeme = self.cursor.slice_from(self.token_start).to_string();
        Token::new(kind, lexeme, self.token_start_line, self.token_start_column)
    }

    fn make_token(&self, kind: TokenKind, lexeme: impl Into<String>) -> Token {
        Token::new(kind, lexeme, self.token_start_line, self.token_start_column)
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.cursor.current_char() {
                ' ' | '\r' | '\t' | '\n' => self.cursor.advance(),
                '/' if self.cursor.peek_char(1) == '/' => {
                    while !self.cursor.is_at_end() && self.cursor.current_char() != '\n' {
                        self.cursor.advance();
                    }
                }
                _ => return,
            }
        }
    }

    fn scan_number(&mut self) -> Token {
        while self.cursor.current_char().is_ascii_digit() {
            self.cursor.advance();
        }
        let lexeme = self.cursor.slice_from(self.token_start);
        let value: i64 = lexeme.parse().unwrap_or(0);
        self.make_token(TokenKind::Int(value), lexeme.to_string())
    }

    fn scan_identifier(&mut self) -> Token {
        while is_letter(self.cursor.current_char()) || self.cursor.current_char().is_ascii_digit()
        {
            self.cursor.advance();
        }
        let lexeme = self.cursor.slice_from(self.token_start).to_string();
        let kind = TokenKind::keyword_for(&lexeme)
            .unwrap_or_else(|| TokenKind::Identifier(sfflt_util::Symbol::intern(&lexeme)));
        self.make_token(kind, lexeme)
    }

    fn scan_char(&mut self) -> Token {
        self.cursor.advance();

        let value = if self.cursor.current_char() == '\\' {
            self.cursor.advance();
            let escaped = self.cursor.current_char();
            self.cursor.advance();
            match escape_value(escaped) {
                Some(v) => v,
                None => {
                    self.report_error(DiagnosticCode::E_LEXER_INVALID_ESCAPE, "unexpected escape sequence");
                    return self.next_token();
                }
            }
        } else {
            let c = self.cursor.current_char();
            self.cursor.advance();
            c as i64
        };

        if self.cursor.current_char() != '\'' {
            self.report_error(DiagnosticCode::E_LEXER_UNTERMINATED_CHAR, "unterminated char literal");
            return self.next_token();
        }
        self.cursor.advance();

        let lexeme = self.cursor.slice_from(self.token_start).to_string();
        self.make_token(TokenKind::Char(value), lexeme)
    }

    fn scan_string(&mut self) -> Token {
        self.cursor.advance();
        let mut value = String::new();

        loop {
            match self.cursor.current_char() {
                '"' => {
                    self.cursor.advance();
                    break;
                }
                '\0' => {
                    self.report_error(DiagnosticCode::E_LEXER_UNTERMINATED_STRING, "unterminated string literal");
                    return self.next_token();
                }
                '\\' => {
                    self.cursor.advance();
                    let escaped = self.cursor.current_char();
                    self.cursor.advance();
                    match escape_value(escaped) {
                        Some(v) => value.push(v as u8 as char),
                        None => {
                            self.report_error(DiagnosticCode::E_LEXER_INVALID_ESCAPE, "unexpected escape sequence");
                            return self.next_token();
                        }
                    }
                }
                c => {
                    value.push(c);
                    self.cursor.advance();
                }
            }
        }

        let lexeme = self.cursor.slice_from(self.token_start).to_string();
        self.make_token(TokenKind::Str(value), lexeme)
    }

    fn report_error(&mut self, code: DiagnosticCode, message: &str) {
        let span = Span::new(
            self.token_start,
            self.cursor.position(),
            self.token_start_line,
            self.token_start_column,
        )
        .with_file_id(self.file_id);
        let lexeme = self.cursor.slice_from(self.token_start).to_string();
        DiagnosticBuilder::error(message)
            .code(code)
            .span(span)
            .lexeme(lexeme)
            .emit(self.handler);
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        let tok = self.next_token();
        if tok.is_eof() {
            None
        } else {
            Some(tok)
        }
    }
}

fn is_letter(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn escape_value(c: char) -> Option<i64> {
    Some(match c {
        '0' => 0,
        'a' => 7,
        'b' => 8,
        't' => 9,
        'n' => 10,
        'v' => 11,
        'f' => 12,
        'r' => 13,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sfflt_util::FileId;

    fn lex_all(source: &str) -> (Vec<TokenKind>, bool) {
        let handler = Handler::new();
        let mut lexer = Lexer::new(source, &handler, FileId::DUMMY);
        let mut kinds = Vec::new();
        loop {
            let tok = lexer.next_token();
            let is_eof = tok.is_eof();
            kinds.push(tok.kind);
            if is_eof {
                break;
            }
        }
        (kinds, handler.has_errors())
    }

    #[test]
    fn scans_punctuation_and_operators() {
        let (kinds, had_errors) = lex_all("(){}[],; +-*/%=!==!=<><=>=&&||");
        assert!(!had_errors);
        assert_eq!(
            kinds[0..8],
            [
                TokenKind::LParen,
                TokenKind::RParen,
                TokenKind::LBrace,
                TokenKind::RBrace,
                TokenKind::LBracket,
                TokenKind::RBracket,
                TokenKind::Comma,
                TokenKind::Semicolon,
            ]
        );
    }

    #[test]
    fn skips_line_comments() {
        let (kinds, had_errors) = lex_all("1 // trailing comment\n2");
        assert!(!had_errors);
        assert_eq!(kinds, vec![TokenKind::Int(1), TokenKind::Int(2), TokenKind::Eof]);
    }

    #[test]
    fn scans_char_literal_with_escape() {
        let (kinds, had_errors) = lex_all("'\\n'");
        assert!(!had_errors);
        assert_eq!(kinds[0], TokenKind::Char(10));
    }

    #[test]
    fn scans_plain_char_literal() {
        let (kinds, had_errors) = lex_all("'a'");
        assert!(!had_errors);
        assert_eq!(kinds[0], TokenKind::Char('a' as i64));
    }

    #[test]
    fn scans_string_literal() {
        let (kinds, had_errors) = lex_all("\"abc\"");
        assert!(!had_errors);
        assert_eq!(kinds[0], TokenKind::Str("abc".to_string()));
    }

    #[test]
    fn reports_unterminated_string() {
        let (_, had_errors) = lex_all("\"abc");
        assert!(had_errors);
    }

    #[test]
    fn scans_keywords_and_identifiers() {
        let (kinds, had_errors) = lex_all("var func hoge_fuga0");
        assert!(!had_errors);
        assert_eq!(kinds[0], TokenKind::Var);
        assert_eq!(kinds[1], TokenKind::Func);
        assert!(matches!(kinds[2], TokenKind::Identifier(_)));
    }

    #[test]
    fn reports_unexpected_character() {
        let (_, had_errors) = lex_all("@");
        assert!(had_errors);
    }

    #[test]
    fn tracks_whole_program_from_original_fixture() {
        let (kinds, had_errors) = lex_all(
            "(){}[],; // this is comment\n+-*/%=!\n==\n!=\n<><=>=&&||\n'a'123'\\n'\"abc\"\nvar func if else while for true false return break\nputn putc getn getc include hoge_fuga0\n",
        );
        assert!(!had_errors);
        assert_eq!(kinds[kinds.len() - 1], TokenKind::Eof);
        assert!(kinds.contains(&TokenKind::Str("abc".to_string())));
        assert!(kinds.contains(&TokenKind::Char(10)));
        assert!(kinds.contains(&TokenKind::Int(123)));
    }

    #[test]
    fn test_property_arbitrary_identifier_strings() {
        use proptest::prelude::*;
        proptest!(|(input in "[a-zA-Z_][a-zA-Z0-9_]{0,100}")| {
            let (kinds, had_errors) = lex_all(&input);
            prop_assert!(!had_errors);
            prop_assert_eq!(kinds.len(), 2);
            if TokenKind::keyword_for(&input).is_some() {
                prop_assert_eq!(&kinds[0], &TokenKind::keyword_for(&input).unwrap());
            } else {
                prop_assert!(matches!(kinds[0], TokenKind::Identifier(_)));
            }
        });
    }

    #[test]
    fn test_property_arbitrary_decimal_number_strings() {
        use proptest::prelude::*;
        proptest!(|(input in "[0-9]{1,18}")| {
            let (kinds, had_errors) = lex_all(&input);
            prop_assert!(!had_errors);
            prop_assert_eq!(kinds.len(), 2);
            let expected: i64 = input.parse().unwrap();
            prop_assert_eq!(&kinds[0], &TokenKind::Int(expected));
        });
    }

    #[test]
    fn test_property_arbitrary_string_literals() {
        use proptest::prelude::*;
        proptest!(|(input in "[a-zA-Z0-9 ]{0,100}")| {
            let source = format!("\"{input}\"");
            let (kinds, had_errors) = lex_all(&source);
            prop_assert!(!had_errors);
            prop_assert_eq!(kinds.len(), 2);
            prop_assert_eq!(&kinds[0], &TokenKind::Str(input));
        });
    }
}
