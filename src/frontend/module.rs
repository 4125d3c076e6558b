//! Modules, the module registry, and the compile pipeline
//!
//! A [`Module`] is one source file: its statements plus index tables for
//! top-level classes and functions. The [`ModuleRegistry`] is the ordered,
//! stable-index list of `(Module, depth)` pairs a code generator consumes in
//! deepest-first order, so definitions are available before use across the
//! import graph.
//!
//! [`compile_module`] runs the scan → parse → check pipeline for one source
//! buffer. The registry slot is reserved *before* the body is parsed, so a
//! cyclic import resolves to the in-progress entry by name instead of being
//! reparsed forever; the finished module is attached afterwards.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::frontend::ast::{ClassDecl, FunctionDecl, Stmt};
use crate::frontend::diagnostics::Reporter;
use crate::frontend::{lexer, parser, typechecker};

/// Host-level failures that never reach the diagnostics sink.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("cannot read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A parsed and (eventually) type-checked source file.
#[derive(Debug, Default)]
pub struct Module {
    pub name: String,
    /// Directory imports inside this module resolve against.
    pub directory: PathBuf,
    pub statements: Vec<Stmt>,
    /// Top-level class name → index into `statements`.
    pub classes: HashMap<String, usize>,
    /// Top-level function name → index into `statements`.
    pub functions: HashMap<String, usize>,
    /// Registry indices of the modules this one imports, in import order.
    pub imported: Vec<usize>,
}

impl Module {
    pub fn new(name: impl Into<String>, directory: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            directory: directory.into(),
            ..Self::default()
        }
    }

    pub fn class(&self, name: &str) -> Option<&ClassDecl> {
        match self.statements.get(*self.classes.get(name)?) {
            Some(Stmt::Class(class)) => Some(class),
            _ => None,
        }
    }

    pub fn function(&self, name: &str) -> Option<&FunctionDecl> {
        match self.statements.get(*self.functions.get(name)?) {
            Some(Stmt::Function(function)) => Some(function),
            _ => None,
        }
    }
}

/// Ordered list of `(Module, depth)` with stable indices.
///
/// Depth is the maximum import distance from any root that reached the
/// module; a later, deeper path lifts the module and everything it imports.
#[derive(Debug, Default)]
pub struct ModuleRegistry {
    entries: Vec<(Module, usize)>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a module shell and return its index. Done before the module
    /// body is parsed so imports that cycle back find it by name.
    pub fn reserve(&mut self, module: Module, depth: usize) -> usize {
        self.entries.push((module, depth));
        self.entries.len() - 1
    }

    /// Replace the reserved shell with the finished module.
    pub fn attach(&mut self, index: usize, module: Module) {
        self.entries[index].0 = module;
    }

    pub fn find(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|(module, _)| module.name == name)
    }

    pub fn module(&self, index: usize) -> &Module {
        &self.entries[index].0
    }

    pub fn depth(&self, index: usize) -> usize {
        self.entries[index].1
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(Module, usize)> {
        self.entries.iter()
    }

    /// Raise a module's depth to at least `depth`, and its transitive imports
    /// to at least one more each. The visited set terminates import cycles.
    pub fn raise_depth(&mut self, index: usize, depth: usize) {
        let mut visited = HashSet::new();
        self.raise_depth_inner(index, depth, &mut visited);
    }

    fn raise_depth_inner(&mut self, index: usize, depth: usize, visited: &mut HashSet<usize>) {
        if !visited.insert(index) {
            return;
        }
        if self.entries[index].1 >= depth {
            return;
        }
        self.entries[index].1 = depth;

        let imports = self.entries[index].0.imported.clone();
        for import in imports {
            self.raise_depth_inner(import, depth + 1, visited);
        }
    }
}

/// The compilation context threaded through the parser and the resolver:
/// the module registry plus the diagnostics sink.
#[derive(Debug, Default)]
pub struct Session {
    pub registry: ModuleRegistry,
    pub reporter: Reporter,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Resolve an import string against the importing module's directory.
///
/// Paths starting with `/` are absolute. Returns the full file path, the
/// module name (the path's basename), and the imported module's directory.
pub fn resolve_import_path(directory: &Path, import: &str) -> (PathBuf, String, PathBuf) {
    let full_path = if import.starts_with('/') {
        PathBuf::from(import)
    } else {
        directory.join(import)
    };

    let module_name = import
        .rsplit('/')
        .next()
        .unwrap_or(import)
        .to_string();

    let module_dir = full_path
        .parent()
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."));

    (full_path, module_name, module_dir)
}

/// Compile one module source through the full front-end pipeline and register
/// it. The reporter's source and module name are swapped in for the duration
/// and restored afterwards, so diagnostics always carry the right context.
#[tracing::instrument(skip_all, fields(module = name, depth))]
pub fn compile_module(source: &str, name: &str, directory: &Path, depth: usize, session: &mut Session) -> usize {
    let index = session.registry.reserve(Module::new(name, directory), depth);

    let saved_source = session.reporter.source().to_string();
    let saved_name = session.reporter.module_name().to_string();
    session.reporter.set_source(source);
    session.reporter.set_module_name(name);

    let tokens = lexer::lex(source, &mut session.reporter);
    let mut module = Module::new(name, directory);
    parser::parse(&tokens, &mut module, depth, session);
    typechecker::check(&mut module, session);

    session.reporter.set_source(&saved_source);
    session.reporter.set_module_name(&saved_name);

    session.registry.attach(index, module);
    index
}

/// Compile a root source file and everything it imports.
///
/// Source-level problems are recorded in the returned session's reporter;
/// only host-level failures (an unreadable root file) surface as errors.
pub fn compile_entry(path: &Path) -> Result<Session, PipelineError> {
    let source = std::fs::read_to_string(path).map_err(|source| PipelineError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned());
    let directory = path
        .parent()
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."));

    let mut session = Session::new();
    compile_module(&source, &name, &directory, 0, &mut session);
    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_indices_are_stable() {
        let mut registry = ModuleRegistry::new();
        let a = registry.reserve(Module::new("a.vela", "."), 0);
        let b = registry.reserve(Module::new("b.vela", "."), 1);
        assert_eq!(a, 0);
        assert_eq!(b, 1);
        assert_eq!(registry.find("b.vela"), Some(1));
        assert_eq!(registry.module(a).name, "a.vela");
    }

    #[test]
    fn raise_depth_lifts_transitive_imports() {
        let mut registry = ModuleRegistry::new();
        let a = registry.reserve(Module::new("a.vela", "."), 1);
        let b = registry.reserve(Module::new("b.vela", "."), 2);

        let mut module_a = Module::new("a.vela", ".");
        module_a.imported.push(b);
        registry.attach(a, module_a);

        registry.raise_depth(a, 3);
        assert_eq!(registry.depth(a), 3);
        assert_eq!(registry.depth(b), 4);
    }

    #[test]
    fn raise_depth_terminates_on_cycles() {
        let mut registry = ModuleRegistry::new();
        let a = registry.reserve(Module::new("a.vela", "."), 1);
        let b = registry.reserve(Module::new("b.vela", "."), 2);

        let mut module_a = Module::new("a.vela", ".");
        module_a.imported.push(b);
        registry.attach(a, module_a);

        let mut module_b = Module::new("b.vela", ".");
        module_b.imported.push(a);
        registry.attach(b, module_b);

        registry.raise_depth(a, 5);
        assert_eq!(registry.depth(a), 5);
        assert_eq!(registry.depth(b), 6);
    }

    #[test]
    fn raise_depth_never_lowers() {
        let mut registry = ModuleRegistry::new();
        let a = registry.reserve(Module::new("a.vela", "."), 4);
        registry.raise_depth(a, 2);
        assert_eq!(registry.depth(a), 4);
    }

    #[test]
    fn import_paths_resolve_relative_and_absolute() {
        let (full, name, dir) = resolve_import_path(Path::new("/proj/src"), "util.vela");
        assert_eq!(full, PathBuf::from("/proj/src/util.vela"));
        assert_eq!(name, "util.vela");
        assert_eq!(dir, PathBuf::from("/proj/src"));

        let (full, name, dir) = resolve_import_path(Path::new("/proj/src"), "sub/helpers.vela");
        assert_eq!(full, PathBuf::from("/proj/src/sub/helpers.vela"));
        assert_eq!(name, "helpers.vela");
        assert_eq!(dir, PathBuf::from("/proj/src/sub"));

        let (full, name, _) = resolve_import_path(Path::new("/proj/src"), "/lib/shared.vela");
        assert_eq!(full, PathBuf::from("/lib/shared.vela"));
        assert_eq!(name, "shared.vela");
    }
}
