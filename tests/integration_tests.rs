//! Integration tests for the Vela compiler front-end
//!
//! These drive the full pipeline (scan, parse, type-check, import
//! resolution) against real files in temporary directories.

use std::fs;
use std::path::{Path, PathBuf};

use vela::frontend::module::{compile_entry, Session};

fn write_module(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).expect("failed to write test module");
    path
}

fn compile(path: &Path) -> Session {
    compile_entry(path).expect("root file should be readable")
}

fn messages(session: &Session) -> Vec<String> {
    session
        .reporter
        .diagnostics()
        .iter()
        .map(|d| d.message.clone())
        .collect()
}

#[test]
fn valid_program_compiles_cleanly() {
    let dir = tempfile::tempdir().unwrap();
    let main = write_module(
        dir.path(),
        "main.vela",
        "fn fib(n: int) -> int {\n\
         if n < 2 { return n; }\n\
         return fib(n - 1) + fib(n - 2);\n\
         }\n\
         fn main() -> null {\n\
         println(fib(10))\n\
         }\n",
    );

    let session = compile(&main);
    assert!(!session.reporter.had_error(), "diagnostics: {:?}", messages(&session));
    assert_eq!(session.registry.len(), 1);
}

#[test]
fn type_errors_latch_had_error() {
    let dir = tempfile::tempdir().unwrap();
    let main = write_module(dir.path(), "main.vela", "var x: int = \"not an int\"\n");

    let session = compile(&main);
    assert!(session.reporter.had_error());
    assert!(messages(&session).iter().any(|m| m.contains("Type mismatch")));
}

#[test]
fn imports_resolve_and_register_depth() {
    let dir = tempfile::tempdir().unwrap();
    write_module(
        dir.path(),
        "util.vela",
        "fn add(a: int, b: int) -> int { return a + b; }\n",
    );
    let main = write_module(
        dir.path(),
        "main.vela",
        "import \"util.vela\"\n\
         fn main() -> null {\n\
         var x: int = util::add(1, 2)\n\
         }\n",
    );

    let session = compile(&main);
    assert!(!session.reporter.had_error(), "diagnostics: {:?}", messages(&session));
    assert_eq!(session.registry.len(), 2);

    let main_index = session.registry.find("main.vela").unwrap();
    let util_index = session.registry.find("util.vela").unwrap();
    assert_eq!(session.registry.depth(main_index), 0);
    assert_eq!(session.registry.depth(util_index), 1);
    assert_eq!(session.registry.module(main_index).imported, vec![util_index]);
}

#[test]
fn cross_module_argument_types_are_checked() {
    let dir = tempfile::tempdir().unwrap();
    write_module(
        dir.path(),
        "util.vela",
        "fn add(a: int, b: int) -> int { return a + b; }\n",
    );
    let main = write_module(
        dir.path(),
        "main.vela",
        "import \"util.vela\"\n\
         fn main() -> null {\n\
         var x = util::add(1, \"two\")\n\
         }\n",
    );

    let session = compile(&main);
    assert!(session.reporter.had_error());
    assert!(messages(&session).iter().any(|m| m.contains("expects type 'int'")));
}

#[test]
fn imported_classes_can_be_constructed() {
    let dir = tempfile::tempdir().unwrap();
    write_module(
        dir.path(),
        "shapes.vela",
        "class Point {\n\
         public var x: float = 0.0;\n\
         public var y: float = 0.0;\n\
         public fn Point(ax: float, ay: float) -> null {\n\
         this.x = ax;\n\
         this.y = ay;\n\
         }\n\
         }\n",
    );
    let main = write_module(
        dir.path(),
        "main.vela",
        "import \"shapes.vela\"\n\
         fn main() -> null {\n\
         var p = shapes::Point(1.0, 2.0)\n\
         var x: float = p.x\n\
         }\n",
    );

    let session = compile(&main);
    assert!(!session.reporter.had_error(), "diagnostics: {:?}", messages(&session));
}

#[test]
fn import_cycle_short_circuits() {
    // a imports b, b imports a: the back-edge resolves to the registry entry
    // instead of reparsing, and both modules end up registered exactly once.
    let dir = tempfile::tempdir().unwrap();
    write_module(dir.path(), "b.vela", "import \"a.vela\"\nvar bee = 2\n");
    let a = write_module(dir.path(), "a.vela", "import \"b.vela\"\nvar aye = 1\n");

    let session = compile(&a);
    assert_eq!(session.registry.len(), 2, "cycle must not duplicate modules");

    let names: Vec<_> = session.registry.iter().map(|(m, _)| m.name.clone()).collect();
    assert!(names.contains(&"a.vela".to_string()));
    assert!(names.contains(&"b.vela".to_string()));

    let b_index = session.registry.find("b.vela").unwrap();
    assert!(session.registry.depth(b_index) >= 1);
}

#[test]
fn diamond_import_is_parsed_once_and_lifted() {
    let dir = tempfile::tempdir().unwrap();
    write_module(dir.path(), "shared.vela", "fn magic() -> int { return 42; }\n");
    write_module(dir.path(), "a.vela", "import \"shared.vela\"\n");
    write_module(dir.path(), "b.vela", "import \"shared.vela\"\n");
    let main = write_module(
        dir.path(),
        "main.vela",
        "import \"a.vela\"\nimport \"b.vela\"\n",
    );

    let session = compile(&main);
    assert!(!session.reporter.had_error(), "diagnostics: {:?}", messages(&session));
    assert_eq!(session.registry.len(), 4);

    let shared = session.registry.find("shared.vela").unwrap();
    assert_eq!(session.registry.depth(shared), 2);

    // Registry names are pairwise distinct.
    let mut names: Vec<_> = session.registry.iter().map(|(m, _)| m.name.clone()).collect();
    names.sort();
    names.dedup();
    assert_eq!(names.len(), 4);
}

#[test]
fn import_depths_respect_the_import_graph() {
    let dir = tempfile::tempdir().unwrap();
    write_module(dir.path(), "c.vela", "var sea = 3\n");
    write_module(dir.path(), "b.vela", "import \"c.vela\"\n");
    let main = write_module(dir.path(), "a.vela", "import \"b.vela\"\n");

    let session = compile(&main);
    assert!(!session.reporter.had_error());

    // Every import sits at least one level deeper than its importer.
    for (module, depth) in session.registry.iter() {
        for &import in &module.imported {
            assert!(
                session.registry.depth(import) >= depth + 1,
                "module '{}' at depth {} imports one at depth {}",
                module.name,
                depth,
                session.registry.depth(import)
            );
        }
    }
}

#[test]
fn missing_import_reports_and_continues() {
    let dir = tempfile::tempdir().unwrap();
    let main = write_module(
        dir.path(),
        "main.vela",
        "import \"nowhere.vela\"\nvar x = 1\n",
    );

    let session = compile(&main);
    assert!(session.reporter.had_error());
    assert!(messages(&session)
        .iter()
        .any(|m| m.contains("Unable to open module 'nowhere.vela'")));
    // The importer keeps parsing after the failed import.
    let main_index = session.registry.find("main.vela").unwrap();
    assert!(!session.registry.module(main_index).statements.is_empty());
}

#[test]
fn self_import_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let main = write_module(dir.path(), "main.vela", "import \"main.vela\"\n");

    let session = compile(&main);
    assert!(session.reporter.had_error());
    assert!(messages(&session)
        .iter()
        .any(|m| m.contains("Cannot import module with the same name")));
}

#[test]
fn diagnostics_carry_the_imported_module_context() {
    let dir = tempfile::tempdir().unwrap();
    write_module(dir.path(), "broken.vela", "var oops: int = \"string\"\n");
    let main = write_module(
        dir.path(),
        "main.vela",
        "import \"broken.vela\"\nvar fine = 1\n",
    );

    let session = compile(&main);
    assert!(session.reporter.had_error());

    let diagnostic = session
        .reporter
        .diagnostics()
        .iter()
        .find(|d| d.message.contains("Type mismatch"))
        .expect("expected the imported module's type error");
    assert_eq!(diagnostic.module, "broken.vela");
    assert!(diagnostic.line_text.contains("oops"));
}

#[test]
fn unreadable_root_file_is_a_pipeline_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.vela");
    let error = compile_entry(&missing).expect_err("expected an io error");
    assert!(error.to_string().contains("missing.vela"));
}

#[test]
fn subdirectory_imports_resolve_relative_to_the_importer() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir(dir.path().join("lib")).unwrap();
    write_module(
        dir.path(),
        "lib/inner.vela",
        "fn one() -> int { return 1; }\n",
    );
    let main = write_module(
        dir.path(),
        "main.vela",
        "import \"lib/inner.vela\"\n\
         fn main() -> null {\n\
         var x: int = inner::one()\n\
         }\n",
    );

    let session = compile(&main);
    assert!(!session.reporter.had_error(), "diagnostics: {:?}", messages(&session));
    assert!(session.registry.find("inner.vela").is_some());
}
