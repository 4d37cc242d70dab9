//! End-to-end tests of the command-line binary
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn cli_exe() -> &'static str {
    env!("CARGO_BIN_EXE_xml-validator")
}

fn run(args: &[&str]) -> Output {
    Command::new(cli_exe())
        .args(args)
        .output()
        .expect("run xml-validator")
}

fn write_fixture(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).expect("write fixture");
    path
}

fn stdout_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn test_valid_file_with_declaration() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = write_fixture(
        dir.path(),
        "doc.xml",
        b"<?xml version=\"1.0\"?><root>ok</root>",
    );

    let output = run(&[path.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(0));

    let stdout = stdout_of(&output);
    let rule = "-".repeat(60);
    let expected = format!(
        "File: doc.xml\nPath: {}\n{rule}\nSize: 36 bytes\nEncoding detected: utf-8\n\
         Content length: 36 characters\n{rule}\n✓ XML is valid and well-formed.\n\n\
         ✓ VALIDATION SUCCESSFUL\n  Document lines: 1\n  XML elements: 2\n  XML declaration: Present\n",
        dir.path().display(),
    );
    assert_eq!(stdout, expected);
}

#[test]
fn test_malformed_file() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = write_fixture(dir.path(), "bad.xml", b"<a><b></a>");

    let output = run(&[path.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1));

    let stdout = stdout_of(&output);
    assert!(stdout.contains("✗ XML VALIDATION ERRORS"));
    assert!(stdout.contains("ERROR 1:\n  Type:    Tag mismatch"));
    assert!(stdout.ends_with("\n✗ VALIDATION FAILED\n  Error count: 1\n"));
}

#[test]
fn test_missing_file() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("absent.xml");

    let output = run(&[path.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stdout_of(&output).contains("✗ File does not exist"));
}

#[test]
fn test_wrong_argument_count_prints_usage() {
    for args in [&[][..], &["a.xml", "b.xml"][..]] {
        let output = run(args);
        assert_eq!(output.status.code(), Some(1));

        let stdout = stdout_of(&output);
        assert!(stdout.starts_with("XML Validator - Validate XML file structure\n"));
        assert!(stdout.contains("Usage: xml-validator <xml_file>"));
    }
}

#[test]
fn test_help_exits_successfully() {
    let output = run(&["--help"]);
    assert_eq!(output.status.code(), Some(0));
}

#[test]
fn test_json_format() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = write_fixture(dir.path(), "ent.xml", b"<a>&undefined;</a>");

    let output = run(&["--format", "json", path.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1));

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json output");
    assert_eq!(value["file"], "ent.xml");
    assert_eq!(value["status"], "validated");
    assert_eq!(value["valid"], false);
    assert_eq!(value["errors"][0]["code"], 10);
    assert_eq!(value["errors"][0]["line"], 1);
}
