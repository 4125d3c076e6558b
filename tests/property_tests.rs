//! Property-based tests for the Vela compiler front-end
//!
//! These use proptest to verify scanner and parser invariants across many
//! randomly generated inputs, catching edge cases that hand-written tests
//! might miss.

use proptest::prelude::*;

use vela::frontend::diagnostics::Reporter;
use vela::frontend::lexer::{self, tokens::TokenKind, KEYWORDS};
use vela::frontend::module::{Module, Session};
use vela::frontend::parser;

fn lex_tokens(source: &str) -> (Vec<lexer::Token>, Reporter) {
    let mut reporter = Reporter::new();
    reporter.set_source(source);
    let tokens = lexer::lex(source, &mut reporter);
    (tokens, reporter)
}

fn parse_module(source: &str) -> (Module, Session) {
    let mut session = Session::new();
    session.reporter.set_source(source);
    session.reporter.set_module_name("prop.vela");
    let tokens = lexer::lex(source, &mut session.reporter);
    let mut module = Module::new("prop.vela", ".");
    parser::parse(&tokens, &mut module, 0, &mut session);
    (module, session)
}

// Strategy for valid Vela identifiers that are not keywords
fn ident_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,12}".prop_filter("not a keyword", |s| !KEYWORDS.contains_key(s.as_str()))
}

// Strategy for simple function definitions
fn simple_function_strategy() -> impl Strategy<Value = String> {
    (ident_strategy(), ident_strategy(), 0i64..1000).prop_map(|(name, param, offset)| {
        format!(
            "fn {}({}: int) -> int {{\n    return {} + {};\n}}\n",
            name, param, param, offset
        )
    })
}

proptest! {
    /// Property: identifiers survive lexing as a single identifier token.
    #[test]
    fn identifiers_survive_lexing(ident in ident_strategy()) {
        let (tokens, reporter) = lex_tokens(&ident);
        prop_assert!(!reporter.had_error());
        prop_assert_eq!(tokens[0].kind, TokenKind::Ident);
        prop_assert_eq!(tokens[0].lexeme.clone(), ident);
        // identifier, synthesized terminator, EOF
        prop_assert_eq!(tokens.len(), 3);
    }

    /// Property: scanning then re-scanning yields identical token streams.
    #[test]
    fn rescanning_is_idempotent(source in simple_function_strategy()) {
        let (first, _) = lex_tokens(&source);
        let (second, _) = lex_tokens(&source);
        prop_assert_eq!(first, second);
    }

    /// Property: the scanner never produces two consecutive terminators.
    #[test]
    fn terminators_never_repeat(blank_lines in 1usize..5, value in 0i64..100) {
        let source = format!("var x = {}{}var y = x\n", value, "\n".repeat(blank_lines));
        let (tokens, reporter) = lex_tokens(&source);
        prop_assert!(!reporter.had_error());
        for pair in tokens.windows(2) {
            prop_assert!(
                !(pair[0].kind == TokenKind::EndOfLine && pair[1].kind == TokenKind::EndOfLine)
            );
        }
    }

    /// Property: every non-synthetic token's lexeme matches the source slice
    /// it claims to cover.
    #[test]
    fn token_positions_match_lexemes(source in simple_function_strategy()) {
        let (tokens, _) = lex_tokens(&source);
        let lines: Vec<&str> = source.lines().collect();
        for token in &tokens {
            if matches!(token.kind, TokenKind::EndOfLine | TokenKind::Eof) {
                continue;
            }
            let line = lines[token.line - 1];
            prop_assert_eq!(&line[token.start..token.end], token.lexeme.as_str());
        }
    }

    /// Property: generated functions parse without diagnostics, and parsing
    /// the same source twice yields structurally identical ASTs.
    #[test]
    fn generated_functions_parse_deterministically(source in simple_function_strategy()) {
        let (first, session) = parse_module(&source);
        prop_assert!(
            !session.reporter.had_error(),
            "diagnostics: {:?}",
            session.reporter.diagnostics()
        );
        prop_assert_eq!(first.statements.len(), 1);

        let (second, _) = parse_module(&source);
        prop_assert_eq!(first.statements, second.statements);
    }

    /// Property: integer literals round-trip through the scanner.
    #[test]
    fn int_literals_round_trip(value in 0i64..i64::MAX) {
        let source = format!("var x = {}\n", value);
        let (tokens, reporter) = lex_tokens(&source);
        prop_assert!(!reporter.had_error());
        let lit = tokens.iter().find(|t| t.kind == TokenKind::IntLit).unwrap();
        prop_assert_eq!(lit.lexeme.parse::<i64>().unwrap(), value);
    }

    /// Property: the scanner terminates and never panics on arbitrary input,
    /// even when it contains unknown characters or unterminated strings.
    #[test]
    fn scanner_is_total(source in "\\PC{0,100}") {
        let (tokens, _) = lex_tokens(&source);
        prop_assert_eq!(tokens.last().map(|t| t.kind), Some(TokenKind::Eof));
    }
}
