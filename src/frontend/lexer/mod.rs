//! Lexer for the Vela programming language
//!
//! Handles tokenization including:
//! - Keywords (fn, class, var, const, ref, import, etc.)
//! - Identifiers and literals (int, float, string)
//! - Single- and multi-character operators (`==`, `..=`, `::`, `->`, `++`)
//! - Implicit statement terminators: an `EndOfLine` token is synthesized at a
//!   newline when the line plausibly ends a statement
//!
//! Lexical errors (unknown characters, unterminated strings) are reported to
//! the [`Reporter`] and scanning continues; the lexer never aborts.

pub mod tokens;

use crate::frontend::diagnostics::Reporter;
pub use tokens::{Token, TokenKind, KEYWORDS};

/// Lexer state
pub struct Lexer<'a, 'r> {
    source: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    current_pos: usize,
    /// 1-based line of the cursor
    line: usize,
    /// Byte offset where the current line begins
    line_start: usize,
    /// Depth inside `(` and `[`; newlines are never terminators inside.
    /// Braces stay out of the count: they delimit blocks, where implicit
    /// terminators must keep working.
    bracket_depth: usize,
    tokens: Vec<Token>,
    reporter: &'r mut Reporter,
}

impl<'a, 'r> Lexer<'a, 'r> {
    pub fn new(source: &'a str, reporter: &'r mut Reporter) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
            current_pos: 0,
            line: 1,
            line_start: 0,
            bracket_depth: 0,
            tokens: Vec::new(),
            reporter,
        }
    }

    /// Tokenize the entire source.
    pub fn tokenize(mut self) -> Vec<Token> {
        while !self.is_at_end() {
            self.scan_token();
        }

        // A final line without a trailing newline still terminates.
        let col = self.current_pos - self.line_start;
        if self.bracket_depth == 0 && self.tokens.last().map(|t| ends_statement(t.kind)).unwrap_or(false) {
            self.tokens
                .push(Token::new(TokenKind::EndOfLine, "\n", self.line, col, col + 1));
        }

        self.tokens
            .push(Token::new(TokenKind::Eof, "", self.line, col, col));
        self.tokens
    }

    fn is_at_end(&mut self) -> bool {
        self.chars.peek().is_none()
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, c)| *c)
    }

    fn peek_next(&self) -> Option<char> {
        let mut iter = self.source[self.current_pos..].chars();
        iter.next();
        iter.next()
    }

    fn advance(&mut self) -> Option<char> {
        if let Some((pos, c)) = self.chars.next() {
            self.current_pos = pos + c.len_utf8();
            Some(c)
        } else {
            None
        }
    }

    fn match_char(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn add_token(&mut self, kind: TokenKind, start: usize) {
        let lexeme = &self.source[start..self.current_pos];
        let start_col = start - self.line_start;
        let end_col = self.current_pos - self.line_start;
        self.tokens
            .push(Token::new(kind, lexeme, self.line, start_col, end_col));
    }

    fn error_at(&mut self, message: String, start: usize) {
        let token = Token::new(
            TokenKind::None,
            &self.source[start..self.current_pos.min(self.source.len())],
            self.line,
            start.saturating_sub(self.line_start),
            self.current_pos.saturating_sub(self.line_start),
        );
        self.reporter.error(message, &token);
    }

    fn scan_token(&mut self) {
        let start = self.current_pos;

        let Some(c) = self.advance() else {
            return;
        };

        match c {
            ' ' | '\t' | '\r' => {}

            '\n' => {
                self.handle_newline(start);
            }

            '+' => {
                if self.match_char('=') {
                    self.add_token(TokenKind::PlusEq, start);
                } else if self.match_char('+') {
                    self.add_token(TokenKind::PlusPlus, start);
                } else {
                    self.add_token(TokenKind::Plus, start);
                }
            }
            '-' => {
                if self.match_char('>') {
                    self.add_token(TokenKind::Arrow, start);
                } else if self.match_char('=') {
                    self.add_token(TokenKind::MinusEq, start);
                } else if self.match_char('-') {
                    self.add_token(TokenKind::MinusMinus, start);
                } else {
                    self.add_token(TokenKind::Minus, start);
                }
            }
            '*' => {
                if self.match_char('=') {
                    self.add_token(TokenKind::StarEq, start);
                } else {
                    self.add_token(TokenKind::Star, start);
                }
            }
            '/' => {
                if self.match_char('/') {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                } else if self.match_char('*') {
                    self.block_comment(start);
                } else if self.match_char('=') {
                    self.add_token(TokenKind::SlashEq, start);
                } else {
                    self.add_token(TokenKind::Slash, start);
                }
            }
            '%' => self.add_token(TokenKind::Percent, start),

            '=' => {
                if self.match_char('=') {
                    self.add_token(TokenKind::EqEq, start);
                } else {
                    self.add_token(TokenKind::Eq, start);
                }
            }
            '!' => {
                if self.match_char('=') {
                    self.add_token(TokenKind::NotEq, start);
                } else {
                    self.add_token(TokenKind::Bang, start);
                }
            }
            '<' => {
                if self.match_char('=') {
                    self.add_token(TokenKind::LtEq, start);
                } else if self.match_char('<') {
                    self.add_token(TokenKind::Shl, start);
                } else {
                    self.add_token(TokenKind::Lt, start);
                }
            }
            '>' => {
                if self.match_char('=') {
                    self.add_token(TokenKind::GtEq, start);
                } else if self.match_char('>') {
                    self.add_token(TokenKind::Shr, start);
                } else {
                    self.add_token(TokenKind::Gt, start);
                }
            }

            '&' => self.add_token(TokenKind::Amp, start),
            '|' => self.add_token(TokenKind::Pipe, start),
            '^' => self.add_token(TokenKind::Caret, start),
            '~' => self.add_token(TokenKind::Tilde, start),
            '?' => self.add_token(TokenKind::Question, start),

            ':' => {
                if self.match_char(':') {
                    self.add_token(TokenKind::ColonColon, start);
                } else {
                    self.add_token(TokenKind::Colon, start);
                }
            }
            ';' => self.add_token(TokenKind::Semicolon, start),
            ',' => self.add_token(TokenKind::Comma, start),

            '.' => {
                if self.match_char('.') {
                    if self.match_char('=') {
                        self.add_token(TokenKind::DotDotEq, start);
                    } else {
                        self.add_token(TokenKind::DotDot, start);
                    }
                } else {
                    self.add_token(TokenKind::Dot, start);
                }
            }

            '(' => {
                self.bracket_depth += 1;
                self.add_token(TokenKind::LParen, start);
            }
            ')' => {
                self.bracket_depth = self.bracket_depth.saturating_sub(1);
                self.add_token(TokenKind::RParen, start);
            }
            '[' => {
                self.bracket_depth += 1;
                self.add_token(TokenKind::LBracket, start);
            }
            ']' => {
                self.bracket_depth = self.bracket_depth.saturating_sub(1);
                self.add_token(TokenKind::RBracket, start);
            }
            '{' => self.add_token(TokenKind::LBrace, start),
            '}' => self.add_token(TokenKind::RBrace, start),

            '"' => self.string(start),

            c if c.is_ascii_digit() => self.number(start),
            c if is_ident_start(c) => self.identifier(start),

            c => {
                self.error_at(format!("Unexpected character '{}'", c), start);
            }
        }
    }

    /// Synthesize an `EndOfLine` token when the just-ended line can plausibly
    /// terminate a statement. Inside brackets newlines are plain whitespace,
    /// and consecutive terminators collapse because `EndOfLine` itself is not
    /// a plausible statement end.
    fn handle_newline(&mut self, start: usize) {
        if self.bracket_depth == 0 && self.tokens.last().map(|t| ends_statement(t.kind)).unwrap_or(false) {
            let col = start - self.line_start;
            self.tokens
                .push(Token::new(TokenKind::EndOfLine, "\n", self.line, col, col + 1));
        }
        self.line += 1;
        self.line_start = self.current_pos;
    }

    fn block_comment(&mut self, start: usize) {
        loop {
            match self.advance() {
                Some('*') if self.peek() == Some('/') => {
                    self.advance();
                    return;
                }
                Some('\n') => {
                    self.line += 1;
                    self.line_start = self.current_pos;
                }
                Some(_) => {}
                None => {
                    self.error_at("Unterminated block comment".to_string(), start);
                    return;
                }
            }
        }
    }

    fn string(&mut self, start: usize) {
        let mut value = String::new();
        loop {
            match self.peek() {
                None | Some('\n') => {
                    self.error_at("Unterminated string literal".to_string(), start);
                    return;
                }
                Some('"') => {
                    self.advance();
                    break;
                }
                Some('\\') => {
                    self.advance();
                    match self.advance() {
                        Some('n') => value.push('\n'),
                        Some('t') => value.push('\t'),
                        Some('r') => value.push('\r'),
                        Some('0') => value.push('\0'),
                        Some('\\') => value.push('\\'),
                        Some('"') => value.push('"'),
                        Some('\'') => value.push('\''),
                        Some(other) => {
                            self.error_at(format!("Unrecognized escape sequence '\\{}'", other), start);
                            value.push(other);
                        }
                        None => {
                            self.error_at("Unterminated string literal".to_string(), start);
                            return;
                        }
                    }
                }
                Some(c) => {
                    value.push(c);
                    self.advance();
                }
            }
        }

        let start_col = start - self.line_start;
        let end_col = self.current_pos - self.line_start;
        self.tokens
            .push(Token::new(TokenKind::StrLit, value, self.line, start_col, end_col));
    }

    /// Scan an integer or float literal. A float requires digits on both
    /// sides of a single dot, so `x.2.0` scans as `x` `.` `2.0` and `1..5`
    /// scans as `1` `..` `5`.
    fn number(&mut self, start: usize) {
        while self.peek().map(|c| c.is_ascii_digit()).unwrap_or(false) {
            self.advance();
        }

        if self.peek() == Some('.') && self.peek_next().map(|c| c.is_ascii_digit()).unwrap_or(false) {
            self.advance();
            while self.peek().map(|c| c.is_ascii_digit()).unwrap_or(false) {
                self.advance();
            }
            self.add_token(TokenKind::FloatLit, start);
        } else {
            self.add_token(TokenKind::IntLit, start);
        }
    }

    fn identifier(&mut self, start: usize) {
        while self.peek().map(is_ident_continue).unwrap_or(false) {
            self.advance();
        }

        let text = &self.source[start..self.current_pos];
        let kind = KEYWORDS.get(text).copied().unwrap_or(TokenKind::Ident);
        self.add_token(kind, start);
    }
}

/// Tokens that can plausibly end a statement; a newline after one of these
/// (outside brackets) becomes an implicit terminator.
fn ends_statement(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Ident
            | TokenKind::IntLit
            | TokenKind::FloatLit
            | TokenKind::StrLit
            | TokenKind::True
            | TokenKind::False
            | TokenKind::Null
            | TokenKind::This
            | TokenKind::Break
            | TokenKind::Continue
            | TokenKind::Return
            | TokenKind::RParen
            | TokenKind::RBracket
            | TokenKind::Int
            | TokenKind::Float
            | TokenKind::Str
            | TokenKind::Bool
    )
}

/// Check if a character can start an identifier (ASCII-only).
fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

/// Check if a character can continue an identifier (ASCII-only).
fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Convenience function to lex a source string.
#[tracing::instrument(skip_all, fields(source_len = source.len()))]
pub fn lex(source: &str, reporter: &mut Reporter) -> Vec<Token> {
    Lexer::new(source, reporter).tokenize()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn lex_ok(source: &str) -> Vec<Token> {
        let mut reporter = Reporter::new();
        reporter.set_source(source);
        let tokens = lex(source, &mut reporter);
        assert!(
            !reporter.had_error(),
            "unexpected lex errors: {:?}",
            reporter.diagnostics()
        );
        tokens
    }

    fn kinds(tokens: &[Token]) -> Vec<TokenKind> {
        tokens.iter().map(|t| t.kind).collect()
    }

    #[test]
    fn keywords_and_identifiers() {
        let tokens = lex_ok("fn class var const ref foo _bar");
        assert_eq!(
            kinds(&tokens),
            vec![
                TokenKind::Fn,
                TokenKind::Class,
                TokenKind::Var,
                TokenKind::Const,
                TokenKind::Ref,
                TokenKind::Ident,
                TokenKind::Ident,
                TokenKind::EndOfLine,
                TokenKind::Eof,
            ]
        );
        assert_eq!(tokens[5].lexeme, "foo");
    }

    #[test]
    fn multi_char_operators() {
        let tokens = lex_ok("== != <= >= << >> .. ..= :: -> += -= *= /= ++ --");
        assert_eq!(
            kinds(&tokens),
            vec![
                TokenKind::EqEq,
                TokenKind::NotEq,
                TokenKind::LtEq,
                TokenKind::GtEq,
                TokenKind::Shl,
                TokenKind::Shr,
                TokenKind::DotDot,
                TokenKind::DotDotEq,
                TokenKind::ColonColon,
                TokenKind::Arrow,
                TokenKind::PlusEq,
                TokenKind::MinusEq,
                TokenKind::StarEq,
                TokenKind::SlashEq,
                TokenKind::PlusPlus,
                TokenKind::MinusMinus,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn numbers() {
        let tokens = lex_ok("42 3.25 1..5");
        assert_eq!(tokens[0].kind, TokenKind::IntLit);
        assert_eq!(tokens[0].lexeme, "42");
        assert_eq!(tokens[1].kind, TokenKind::FloatLit);
        assert_eq!(tokens[1].lexeme, "3.25");
        assert_eq!(tokens[2].kind, TokenKind::IntLit);
        assert_eq!(tokens[3].kind, TokenKind::DotDot);
        assert_eq!(tokens[4].kind, TokenKind::IntLit);
    }

    #[test]
    fn float_after_dot_stays_whole() {
        // Member access on tuples: `x.2.0` must scan as `x` `.` `2.0`;
        // the parser splits the trailing float.
        let tokens = lex_ok("x.2.0");
        assert_eq!(
            kinds(&tokens),
            vec![
                TokenKind::Ident,
                TokenKind::Dot,
                TokenKind::FloatLit,
                TokenKind::EndOfLine,
                TokenKind::Eof,
            ]
        );
        assert_eq!(tokens[2].lexeme, "2.0");
    }

    #[test]
    fn string_escapes() {
        let tokens = lex_ok(r#""a\tb\n" "plain""#);
        assert_eq!(tokens[0].kind, TokenKind::StrLit);
        assert_eq!(tokens[0].lexeme, "a\tb\n");
        assert_eq!(tokens[1].lexeme, "plain");
    }

    #[test]
    fn adjacent_strings_stay_separate() {
        // Merging adjacent literals is the parser's job.
        let tokens = lex_ok(r#""a" "b""#);
        assert_eq!(tokens[0].kind, TokenKind::StrLit);
        assert_eq!(tokens[1].kind, TokenKind::StrLit);
    }

    #[test]
    fn newline_terminates_statements() {
        let tokens = lex_ok("var x = 1\nvar y = 2\n");
        let eols = tokens.iter().filter(|t| t.kind == TokenKind::EndOfLine).count();
        assert_eq!(eols, 2);
        assert_eq!(tokens[4].kind, TokenKind::EndOfLine);
        assert_eq!(tokens[4].line, 1);
    }

    #[test]
    fn blank_lines_collapse() {
        // One terminator after `1` despite three newlines, one synthesized at
        // EOF for the unterminated final line.
        let tokens = lex_ok("var x = 1\n\n\nvar y = 2");
        let eols = tokens.iter().filter(|t| t.kind == TokenKind::EndOfLine).count();
        assert_eq!(eols, 2);
    }

    #[test]
    fn no_consecutive_end_of_line_tokens() {
        let source = "var x = 1\n\nvar y = 2\n\n\nx = y\n";
        let tokens = lex_ok(source);
        for pair in tokens.windows(2) {
            assert!(
                !(pair[0].kind == TokenKind::EndOfLine && pair[1].kind == TokenKind::EndOfLine),
                "consecutive EndOfLine tokens"
            );
        }
    }

    #[test]
    fn newline_suppressed_inside_brackets() {
        let tokens = lex_ok("f(1,\n2)\n[1,\n2]");
        let eols: Vec<_> = tokens
            .iter()
            .enumerate()
            .filter(|(_, t)| t.kind == TokenKind::EndOfLine)
            .map(|(i, _)| i)
            .collect();
        // The newline after `)` produces a terminator, plus the synthesized
        // one at EOF after `]`; the newlines inside brackets produce none.
        assert_eq!(eols.len(), 2);
        assert_eq!(tokens[eols[0] - 1].kind, TokenKind::RParen);
        assert_eq!(tokens[eols[1] - 1].kind, TokenKind::RBracket);
    }

    #[test]
    fn braces_do_not_suppress_terminators() {
        // Statements inside a block still terminate at newlines.
        let tokens = lex_ok("fn f() -> null {\n    var x = 1\n}");
        let eols: Vec<_> = tokens
            .iter()
            .enumerate()
            .filter(|(_, t)| t.kind == TokenKind::EndOfLine)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(eols.len(), 1);
        assert_eq!(tokens[eols[0] - 1].lexeme, "1");
    }

    #[test]
    fn no_terminator_after_semicolon_or_brace() {
        let tokens = lex_ok("var x = 1;\nfn f() -> null {}\n");
        assert!(tokens.iter().all(|t| t.kind != TokenKind::EndOfLine));
    }

    #[test]
    fn comments_are_skipped() {
        let tokens = lex_ok("var x = 1 // trailing\n/* block\ncomment */ var y = 2\n");
        let idents: Vec<_> = tokens
            .iter()
            .filter(|t| t.kind == TokenKind::Ident)
            .map(|t| t.lexeme.clone())
            .collect();
        assert_eq!(idents, vec!["x", "y"]);
    }

    #[test]
    fn positions_point_into_source_line() {
        let source = "var total = 10\n";
        let tokens = lex_ok(source);
        for token in &tokens {
            if matches!(token.kind, TokenKind::EndOfLine | TokenKind::Eof) {
                continue;
            }
            assert_eq!(&source.lines().next().unwrap()[token.start..token.end], token.lexeme);
        }
    }

    #[test]
    fn unknown_character_is_reported_and_skipped() {
        let source = "var x = 1 @\nvar y = 2\n";
        let mut reporter = Reporter::new();
        reporter.set_source(source);
        let tokens = lex(source, &mut reporter);
        assert!(reporter.had_error());
        // Scanning continued past the bad character.
        assert!(tokens.iter().filter(|t| t.kind == TokenKind::Var).count() == 2);
    }

    #[test]
    fn unterminated_string_is_reported() {
        let source = "var s = \"oops\n";
        let mut reporter = Reporter::new();
        reporter.set_source(source);
        lex(source, &mut reporter);
        assert!(reporter.had_error());
    }

    #[test]
    fn rescanning_is_deterministic() {
        let source = "fn f(a: int) -> int {\n    return a + 1;\n}\nvar x = f(1)\n";
        let first = lex_ok(source);
        let second = lex_ok(source);
        assert_eq!(first, second);
    }
}
