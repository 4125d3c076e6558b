//! Diagnostics sink for the Vela front-end
//!
//! Every phase reports through a [`Reporter`]: the scanner for lexical
//! problems, the parser for syntax problems, the type resolver for semantic
//! ones. The reporter captures the offending source line at report time, so
//! diagnostics emitted while a nested import is being compiled still render
//! with the right file context after the importer resumes.

use crate::frontend::lexer::tokens::{Token, TokenKind};

/// Severity of a recorded diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
    RuntimeError,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
            Severity::RuntimeError => write!(f, "runtime error"),
        }
    }
}

/// A recorded compile-time diagnostic with its source context
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub message: String,
    pub severity: Severity,
    pub module: String,
    pub line: usize,
    pub start: usize,
    pub end: usize,
    /// Text of the source line the diagnostic points into, captured eagerly.
    pub line_text: String,
    pub notes: Vec<String>,
}

impl Diagnostic {
    /// Render with a caret span, rustc-style:
    ///
    /// ```text
    /// error: Invalid assignment target
    ///   --> main.vela:3:5
    ///    |
    ///  3 | 1 + 2 = 3;
    ///    |       ^
    ///    = note: ...
    /// ```
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("{}: {}\n", self.severity, self.message));
        out.push_str(&format!(
            "  --> {}:{}:{}\n",
            self.module,
            self.line,
            self.start + 1
        ));

        let gutter = self.line.to_string().len();
        out.push_str(&format!("{:>width$} |\n", "", width = gutter));
        out.push_str(&format!("{:>width$} | {}\n", self.line, self.line_text, width = gutter));

        let caret_len = self.end.saturating_sub(self.start).max(1);
        let pad = self.start.min(self.line_text.len());
        out.push_str(&format!(
            "{:>width$} | {}{}\n",
            "",
            " ".repeat(pad),
            "^".repeat(caret_len),
            width = gutter
        ));

        for note in &self.notes {
            out.push_str(&format!("{:>width$} = note: {}\n", "", note, width = gutter));
        }

        out
    }
}

/// The diagnostics sink.
///
/// Holds the source and module name of whatever is currently being compiled;
/// both are swapped in and out across import boundaries in stack discipline
/// by the module pipeline. Errors latch [`Reporter::had_error`] which gates
/// later compiler stages.
#[derive(Debug, Default)]
pub struct Reporter {
    source: String,
    module_name: String,
    diagnostics: Vec<Diagnostic>,
    had_error: bool,
    had_runtime_error: bool,
}

impl Reporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_source(&mut self, source: &str) {
        self.source = source.to_string();
    }

    pub fn set_module_name(&mut self, name: &str) {
        self.module_name = name.to_string();
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn module_name(&self) -> &str {
        &self.module_name
    }

    pub fn warning(&mut self, message: impl Into<String>, token: &Token) {
        self.record(Severity::Warning, message.into(), token);
    }

    pub fn error(&mut self, message: impl Into<String>, token: &Token) {
        self.had_error = true;
        self.record(Severity::Error, message.into(), token);
    }

    pub fn runtime_error(&mut self, message: impl Into<String>, token: &Token) {
        self.had_runtime_error = true;
        self.record(Severity::RuntimeError, message.into(), token);
    }

    /// Attach a note to the most recently recorded diagnostic.
    pub fn note(&mut self, message: impl Into<String>) {
        if let Some(last) = self.diagnostics.last_mut() {
            last.notes.push(message.into());
        }
    }

    pub fn had_error(&self) -> bool {
        self.had_error
    }

    pub fn had_runtime_error(&self) -> bool {
        self.had_runtime_error
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity != Severity::Warning)
            .count()
    }

    /// Print every recorded diagnostic to stderr.
    pub fn print_all(&self) {
        for diagnostic in &self.diagnostics {
            eprintln!("{}", diagnostic.render());
        }
    }

    fn record(&mut self, severity: Severity, message: String, token: &Token) {
        let line_text = self
            .source
            .lines()
            .nth(token.line.saturating_sub(1))
            .unwrap_or("")
            .trim_end_matches('\r')
            .to_string();

        // Synthetic end-of-line tokens point just past the line they end.
        let (start, end) = if token.kind == TokenKind::EndOfLine {
            (line_text.len(), line_text.len() + 1)
        } else {
            (token.start, token.end)
        };

        self.diagnostics.push(Diagnostic {
            message,
            severity,
            module: self.module_name.clone(),
            line: token.line.max(1),
            start,
            end,
            line_text,
            notes: Vec::new(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_at(line: usize, start: usize, end: usize) -> Token {
        Token::new(TokenKind::Ident, "x", line, start, end)
    }

    #[test]
    fn error_latches_had_error() {
        let mut reporter = Reporter::new();
        reporter.set_source("var x = 1\n");
        reporter.set_module_name("main.vela");
        assert!(!reporter.had_error());

        reporter.error("Undefined name 'x'", &token_at(1, 4, 5));
        assert!(reporter.had_error());
        assert!(!reporter.had_runtime_error());
        assert_eq!(reporter.diagnostics().len(), 1);
    }

    #[test]
    fn warning_does_not_latch() {
        let mut reporter = Reporter::new();
        reporter.set_source("var x = 1\n");
        reporter.warning("unused variable", &token_at(1, 4, 5));
        assert!(!reporter.had_error());
        assert_eq!(reporter.error_count(), 0);
    }

    #[test]
    fn notes_attach_to_last_diagnostic() {
        let mut reporter = Reporter::new();
        reporter.set_source("1 + 2 = 3;\n");
        reporter.error("Invalid assignment target", &token_at(1, 6, 7));
        reporter.note("assignment requires a variable, member, or index on the left");

        let diag = &reporter.diagnostics()[0];
        assert_eq!(diag.notes.len(), 1);
    }

    #[test]
    fn render_includes_caret_and_location() {
        let mut reporter = Reporter::new();
        reporter.set_source("var x = y\n");
        reporter.set_module_name("main.vela");
        reporter.error("Undefined name 'y'", &token_at(1, 8, 9));

        let rendered = reporter.diagnostics()[0].render();
        assert!(rendered.contains("error: Undefined name 'y'"));
        assert!(rendered.contains("main.vela:1:9"));
        assert!(rendered.contains("var x = y"));
        assert!(rendered.contains('^'));
    }

    #[test]
    fn context_captured_at_report_time() {
        let mut reporter = Reporter::new();
        reporter.set_source("first\n");
        reporter.set_module_name("a.vela");
        reporter.error("from a", &token_at(1, 0, 5));

        // Swap context, as the import pipeline does, then report again.
        reporter.set_source("second\n");
        reporter.set_module_name("b.vela");
        reporter.error("from b", &token_at(1, 0, 6));

        assert_eq!(reporter.diagnostics()[0].module, "a.vela");
        assert_eq!(reporter.diagnostics()[0].line_text, "first");
        assert_eq!(reporter.diagnostics()[1].module, "b.vela");
        assert_eq!(reporter.diagnostics()[1].line_text, "second");
    }
}
