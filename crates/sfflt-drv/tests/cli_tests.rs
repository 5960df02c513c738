//! End-to-end CLI tests for the `sfflt_lang` binary, exercised as a
//! subprocess via `assert_cmd`.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

fn sfflt_bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_sfflt_lang"))
}

fn write_source(dir: &tempfile::TempDir, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    path
}

#[test]
fn version_flag_prints_version_and_exits_zero() {
    sfflt_bin()
        .arg("-v")
        .assert()
        .success()
        .stdout(predicate::str::contains("sfflt_lang"));
}

#[test]
fn long_version_flag_is_equivalent() {
    sfflt_bin()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("sfflt_lang"));
}

#[test]
fn missing_file_argument_exits_nonzero() {
    sfflt_bin().assert().failure();
}

#[test]
fn compiles_a_valid_program_with_oneline_format() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_source(&dir, "hello.sf", "putn 1 + 2;");

    sfflt_bin().arg("--format=oneline").arg(&input).assert().success();

    let output = input.with_extension("fflt");
    assert!(output.exists(), "expected {output:?} to be written");
    let rendered = std::fs::read_to_string(output).unwrap();
    assert!(!rendered.contains('\n'), "oneline output should not wrap");
}

#[test]
fn compiles_a_valid_program_with_pretty_format() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_source(&dir, "pretty.sf", "putn 1 + 2;");

    sfflt_bin().arg("--format=pretty").arg(&input).assert().success();

    let output = input.with_extension("fflt");
    assert!(output.exists());
}

#[test]
fn compiles_a_valid_program_with_column_format() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_source(&dir, "square.sf", "putn 1 + 2;");

    sfflt_bin().arg("--format=16").arg(&input).assert().success();

    let output = input.with_extension("fflt");
    assert!(output.exists());
}

#[test]
fn invalid_format_option_exits_nonzero() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_source(&dir, "bad_format.sf", "putn 1;");

    sfflt_bin()
        .arg("--format=sideways")
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid format option"));
}

#[test]
fn parse_error_exits_nonzero_and_reports_location() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_source(&dir, "broken.sf", "var = ;");

    sfflt_bin()
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("broken.sf"));
}

#[test]
fn nonexistent_input_file_exits_nonzero() {
    sfflt_bin().arg("/nonexistent/path/does_not_exist.sf").assert().failure();
}
