//! CLI command implementations

use std::path::Path;

use crate::frontend::diagnostics::Reporter;
use crate::frontend::lexer;
use crate::frontend::module::{self, Module, Session};
use crate::frontend::parser;

use super::{CliError, CliResult, ExitCode};

/// Run the full front-end on a file and print any diagnostics.
pub fn check_file(path: &Path) -> CliResult<ExitCode> {
    let session = module::compile_entry(path).map_err(|e| CliError::failure(e.to_string()))?;
    session.reporter.print_all();

    if session.reporter.had_error() || session.reporter.had_runtime_error() {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

/// Tokenize a file and dump the token stream.
pub fn lex_file(path: &Path) -> CliResult<ExitCode> {
    let source = read_source(path)?;

    let mut reporter = Reporter::new();
    reporter.set_source(&source);
    reporter.set_module_name(&path.to_string_lossy());

    let tokens = lexer::lex(&source, &mut reporter);
    for token in &tokens {
        let shown = if token.lexeme == "\n" { "\\n" } else { token.lexeme.as_str() };
        println!(
            "{:<12} {:>4}:{:<3} {}",
            format!("{:?}", token.kind),
            token.line,
            token.start,
            shown
        );
    }

    reporter.print_all();
    Ok(if reporter.had_error() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

/// Parse a file (without type checking) and dump the AST.
pub fn parse_file(path: &Path) -> CliResult<ExitCode> {
    let source = read_source(path)?;

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned());
    let directory = path.parent().unwrap_or(Path::new(".")).to_path_buf();

    let mut session = Session::new();
    session.reporter.set_source(&source);
    session.reporter.set_module_name(&name);

    let tokens = lexer::lex(&source, &mut session.reporter);
    let mut module = Module::new(name, directory);
    parser::parse(&tokens, &mut module, 0, &mut session);

    for stmt in &module.statements {
        println!("{:#?}", stmt);
    }

    session.reporter.print_all();
    Ok(if session.reporter.had_error() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn read_source(path: &Path) -> CliResult<String> {
    std::fs::read_to_string(path)
        .map_err(|e| CliError::failure(format!("Error reading file '{}': {}", path.display(), e)))
}
