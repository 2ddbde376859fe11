//! CLI integration tests.
//!
//! These tests run the `arcgate` binary against archives written to a
//! temporary directory.

#![cfg(all(feature = "cli", feature = "sevenz", feature = "zip"))]

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use tempfile::TempDir;

mod common;

use common::*;

fn arcgate(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_arcgate"))
        .args(args)
        .stdin(Stdio::null())
        .output()
        .expect("Failed to run arcgate")
}

fn arcgate_with_input(args: &[&str], input: &str) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_arcgate"))
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to run arcgate");
    child
        .stdin
        .take()
        .unwrap()
        .write_all(input.as_bytes())
        .unwrap();
    child.wait_with_output().unwrap()
}

fn create_test_archive_file(name: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let bytes = if name.ends_with(".zip") {
        zip_archive(TREE_FILES, TREE_DIRS)
    } else {
        sevenz_archive(TREE_FILES, TREE_DIRS)
    };
    let path = write_file(temp_dir.path(), name, &bytes);
    (temp_dir, path)
}

fn arg(path: &Path) -> String {
    path_string(path)
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

// =============================================================================
// Listing and metadata
// =============================================================================

#[test]
fn test_list_paths() {
    let (_dir, archive) = create_test_archive_file("tree.7z");
    let output = arcgate(&["list", &arg(&archive), "--type", "f", "*.txt"]);
    assert!(output.status.success());
    assert_eq!(stdout(&output), "docs/readme.txt\n");
}

#[test]
fn test_list_json_records() {
    let (_dir, archive) = create_test_archive_file("tree.zip");
    let output = arcgate(&["--format", "json", "list", &arg(&archive), "--info", "--exact", "main.rs"]);
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let records = value.as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["path"], "main.rs");
    assert_eq!(records[0]["size"], 13);
    assert_eq!(records[0]["isdir"], false);
}

#[test]
fn test_count_and_info() {
    let (_dir, archive) = create_test_archive_file("tree.7z");
    let output = arcgate(&["count", &arg(&archive)]);
    assert_eq!(stdout(&output), "5\n");

    let output = arcgate(&["-f", "json", "info", &arg(&archive)]);
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["solid"], false);
    assert!(value["physize"].as_u64().unwrap() > 0);
}

#[test]
fn test_extensions() {
    let output = arcgate(&["extensions"]);
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.split_whitespace().any(|ext| ext == "7z"));
    assert!(text.split_whitespace().any(|ext| ext == "zip"));
}

// =============================================================================
// Extraction
// =============================================================================

#[test]
fn test_extract_to_file_and_stdout() {
    let (dir, archive) = create_test_archive_file("tree.7z");
    let dest = dir.path().join("readme.out");

    let output = arcgate(&["-q", "extract", &arg(&archive), "docs/readme.txt", &arg(&dest)]);
    assert!(output.status.success());
    assert!(output.stdout.is_empty());
    assert_eq!(std::fs::read(&dest).unwrap(), b"Read me first.\n");

    let output = arcgate(&["extract", &arg(&archive), "main.rs", "--stdout"]);
    assert!(output.status.success());
    assert_eq!(output.stdout, b"fn main() {}\n");
}

#[test]
fn test_exit_codes() {
    let (dir, archive) = create_test_archive_file("tree.zip");
    let dest = dir.path().join("x");

    let output = arcgate(&["extract", &arg(&archive), "absent.txt", &arg(&dest)]);
    assert_eq!(output.status.code(), Some(6));

    let output = arcgate(&["count", &arg(&dir.path().join("missing.zip"))]);
    assert_eq!(output.status.code(), Some(5));

    let junk = write_file(dir.path(), "junk.7z", b"definitely not an archive");
    let output = arcgate(&["count", &arg(&junk)]);
    assert_eq!(output.status.code(), Some(3));

    // a malformed pattern selects nothing instead of failing
    let output = arcgate(&["list", &arg(&archive), "[unclosed"]);
    assert!(output.status.success());
    assert!(output.stdout.is_empty());
}

// =============================================================================
// Shell
// =============================================================================

#[test]
fn test_shell_session() {
    let (dir, archive) = create_test_archive_file("tree.zip");
    let dest = dir.path().join("guide.out");
    let script = format!(
        "open {archive}\n\
         # comments and blank lines are skipped\n\
         \n\
         sevenzip0 count\n\
         sevenzip0 list -type d\n\
         sevenzip0 extract docs/Guide.TXT {dest}\n\
         sevenzip0 extract -channel main.rs stdout\n\
         sevenzip0 close\n",
        archive = arcgate::command::quote_element(&arg(&archive)),
        dest = arcgate::command::quote_element(&arg(&dest)),
    );

    let output = arcgate_with_input(&["shell"], &script);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(stdout(&output), "sevenzip0\n5\ndocs/\nfn main() {}\n");
    assert_eq!(std::fs::read(&dest).unwrap(), b"Step one. Step two.\n");
}

#[test]
fn test_shell_reports_errors_and_continues() {
    let output = arcgate_with_input(&["shell"], "bogus\nextensions\n");
    assert_eq!(output.status.code(), Some(255));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("bad subcommand \"bogus\""), "{stderr}");
    assert!(stdout(&output).contains("7z"));
}
