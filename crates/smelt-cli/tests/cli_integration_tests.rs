//! End-to-end tests for the `smelt` binary
//!
//! Tests that need a real compiler use `cat`, which echoes the source, and
//! `sh`/`false` to stand in for tools; they only run on unix.

mod common;

use common::{Project, CAT_COMPILER};
use predicates::prelude::*;
use std::fs;

// ============================================================================
// check-config
// ============================================================================

#[test]
fn test_check_config_defaults() {
    let project = Project::new();

    project
        .smelt()
        .arg("check-config")
        .assert()
        .success()
        .stdout(predicate::str::contains("compiler: civet"))
        .stdout(predicate::str::contains("output extension: .js"))
        .stdout(predicate::str::contains("build: (none)"))
        .stdout(predicate::str::contains("config ok"));
}

#[test]
fn test_check_config_shows_resolved_chain() {
    let project = Project::with_config(
        r#"
        [pipeline.stages]
        build = ["banner", "identity"]
        serve = "identity"
        "#,
    );

    project
        .smelt()
        .arg("check-config")
        .assert()
        .success()
        .stdout(predicate::str::contains("strip types: false"))
        .stdout(predicate::str::contains("build: banner -> identity"))
        .stdout(predicate::str::contains("serve: identity"));
}

#[test]
fn test_check_config_unknown_stage_fails() {
    let project = Project::with_config(
        r#"
        [pipeline]
        stages = "vite:react-babel"
        "#,
    );

    project
        .smelt()
        .arg("check-config")
        .assert()
        .failure()
        .stdout(predicate::str::contains("stage 'vite:react-babel' not found"));
}

#[test]
fn test_explicit_config_flag() {
    let project = Project::new();
    let config = project.write("conf/custom.toml", "[pipeline]\noutput_extension = \"jsx\"\n");

    project
        .smelt()
        .arg("--config")
        .arg(&config)
        .arg("check-config")
        .assert()
        .success()
        .stdout(predicate::str::contains("output extension: .jsx"));
}

#[test]
fn test_malformed_config_fails() {
    let project = Project::with_config("[pipeline\n");

    project
        .smelt()
        .arg("check-config")
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to load config"));
}

// ============================================================================
// html
// ============================================================================

#[test]
fn test_html_routes_script_references() {
    let project = Project::new();
    let index = project.write(
        "index.html",
        r#"<html><body><script type="module" src="/src/main.civet"></script><script src="/vendor.js"></script></body></html>"#,
    );

    project
        .smelt()
        .arg("html")
        .arg(&index)
        .assert()
        .success()
        .stdout(predicate::str::contains(r#"src="/src/main.civet.js?transform""#))
        .stdout(predicate::str::contains(r#"src="/vendor.js""#));
}

// ============================================================================
// transform
// ============================================================================

#[cfg(unix)]
#[test]
fn test_transform_writes_beside_source() {
    let project = Project::with_config(&format!("[pipeline]\nstages = \"banner\"\n{}", CAT_COMPILER));
    project.write("src/main.civet", "a := 1\n");

    project
        .smelt()
        .args(["transform", "src/main.civet"])
        .assert()
        .success();

    let source = project.canonical("src/main.civet");
    let output = fs::read_to_string(format!("{}.ts", source.display())).unwrap();
    assert_eq!(output, format!("// {}.ts\na := 1\n", source.display()));
}

#[cfg(unix)]
#[test]
fn test_transform_to_stdout() {
    let project = Project::with_config(CAT_COMPILER);
    project.write("a.civet", "x := 42\n");

    project
        .smelt()
        .args(["transform", "--stdout", "a.civet"])
        .assert()
        .success()
        .stdout(predicate::str::contains("x := 42"));

    assert!(!project.path().join("a.civet.js").exists());
}

#[cfg(unix)]
#[test]
fn test_transform_into_out_dir() {
    let project = Project::with_config(CAT_COMPILER);
    project.write("src/a.civet", "x := 1\n");

    project
        .smelt()
        .args(["transform", "src/a.civet", "--out-dir", "dist"])
        .assert()
        .success();

    let output = fs::read_to_string(project.path().join("dist/a.civet.js")).unwrap();
    assert_eq!(output, "x := 1\n");
}

#[cfg(unix)]
#[test]
fn test_transform_skips_unowned_files() {
    let project = Project::with_config(CAT_COMPILER);
    project.write("plain.ts", "export {};\n");

    project
        .smelt()
        .args(["transform", "plain.ts"])
        .assert()
        .success();

    assert!(!project.path().join("plain.ts.js").exists());
}

#[cfg(unix)]
#[test]
fn test_compile_failure_exits_nonzero() {
    let project = Project::with_config(
        r#"
        [tools.compiler]
        program = "false"
        args = []
        strip_types_args = []
        "#,
    );
    project.write("a.civet", "x := 1\n");
    project.write("b.civet", "y := 2\n");

    project
        .smelt()
        .args(["transform", "a.civet", "b.civet"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("2 of 2 file(s) failed"));
}

#[test]
fn test_missing_file_exits_nonzero() {
    let project = Project::new();

    project
        .smelt()
        .args(["transform", "nope.civet"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("1 of 1 file(s) failed"));
}

#[cfg(unix)]
#[test]
fn test_serve_writes_declaration_file() {
    let project = Project::with_config(&format!(
        r#"
        [pipeline.declarations]
        enabled = true

        [tools.declaration_generator]
        program = "sh"
        args = ["-c", '''cat > /dev/null; echo '{{"text":"export declare const a: number;"}}' ''']
        {}
        "#,
        CAT_COMPILER
    ));
    project.write("a.civet", "a := 1\n");

    project
        .smelt()
        .args(["transform", "--mode", "serve", "a.civet"])
        .assert()
        .success();

    let declaration = fs::read_to_string(project.path().join("a.civet.d.ts")).unwrap();
    assert_eq!(declaration.trim_end(), "export declare const a: number;");
    assert!(project.path().join("a.civet.js").exists());
}

#[cfg(unix)]
#[test]
fn test_declaration_failure_fails_the_run() {
    let project = Project::with_config(&format!(
        r#"
        [pipeline.declarations]
        enabled = true

        [tools.declaration_generator]
        program = "false"
        {}
        "#,
        CAT_COMPILER
    ));
    project.write("a.civet", "a := 1\n");

    project
        .smelt()
        .args(["transform", "--mode", "serve", "a.civet"])
        .assert()
        .failure();

    assert!(!project.path().join("a.civet.d.ts").exists());
}

#[test]
fn test_declarations_without_generator_rejected() {
    let project = Project::with_config("[pipeline.declarations]\nenabled = true\n");

    project
        .smelt()
        .arg("check-config")
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid pipeline configuration"));
}
