//! Integration tests for the command-line front end

use std::process::Command;

fn run_command(args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_sheetsim"))
        // Tests must be deterministic and not depend on a user's ~/.config/sheetsim/config.toml.
        .arg("--no-config")
        .args(args)
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let exit_code = output.status.code().unwrap_or(-1);

    (stdout, stderr, exit_code)
}

#[test]
fn test_basic_arithmetic() {
    let (stdout, _, code) = run_command(&["-c", "5 + 3"]);
    assert_eq!(stdout.trim(), "8");
    assert_eq!(code, 0);
}

#[test]
fn test_auto_prepend_equals() {
    let (stdout1, _, _) = run_command(&["-c", "10 + 5"]);
    let (stdout2, _, _) = run_command(&["-c", "=10 + 5"]);
    assert_eq!(stdout1, stdout2);
}

#[test]
fn test_command_sees_cells() {
    let (stdout, _, code) = run_command(&[
        "--set", "A1=5",
        "--set", "A2=7",
        "--set", "A3==SUM(A1:A2)",
        "-c", "A3*2",
    ]);
    assert_eq!(stdout.trim(), "24");
    assert_eq!(code, 0);
}

#[test]
fn test_nested_if_text_result() {
    let (stdout, _, code) = run_command(&[
        "--set",
        "A1=88",
        "-c",
        r#"IF(A1>=90,"A",IF(A1>=80,"B","C"))"#,
    ]);
    assert_eq!(stdout.trim(), "B");
    assert_eq!(code, 0);
}

#[test]
fn test_error_exit_code() {
    let (stdout, stderr, code) = run_command(&["-c", "FOO(1)"]);
    assert!(stdout.starts_with("#ERR"));
    assert!(stderr.contains("unknown function"));
    assert_eq!(code, 1);
}

#[test]
fn test_division_by_zero() {
    let (stdout, _, code) = run_command(&["-c", "1/0"]);
    assert!(stdout.starts_with("#ERR"));
    assert_eq!(code, 1);
}

#[test]
fn test_disallowed_characters_are_rejected() {
    let (stdout, _, code) = run_command(&["-c", "1; 2"]);
    assert!(stdout.starts_with("#ERR"));
    assert_eq!(code, 1);
}

#[test]
fn test_invalid_label_in_set() {
    let (_, stderr, code) = run_command(&["--set", "K1=5", "-c", "1"]);
    assert!(stderr.contains("K1"));
    assert_eq!(code, 1);
}

#[test]
fn test_grid_size_flags() {
    let (stdout, _, code) = run_command(&["--cols", "12", "--set", "L1=4", "-c", "L1+1"]);
    assert_eq!(stdout.trim(), "5");
    assert_eq!(code, 0);
}

#[test]
fn test_oversized_grid_flag_is_clamped() {
    let (stdout, stderr, code) = run_command(&["--rows", "5000", "--set", "A1000=3", "-c", "A1000*2"]);
    assert!(stderr.contains("--rows = 5000 exceeds the maximum of 1000"));
    assert_eq!(stdout.trim(), "6");
    assert_eq!(code, 0);
}

#[test]
fn test_prints_markdown_table() {
    let (stdout, _, code) = run_command(&["--set", "A1=10", "--set", "B1==A1*2"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("|   | A | B |"));
    assert!(stdout.contains("| 1 | 10 | 20 |"));
}

#[test]
fn test_circular_cells_display_error() {
    let (stdout, _, code) = run_command(&["--set", "A1==B1", "--set", "B1==A1"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("| 1 | #ERROR | #ERROR |"));
}

#[test]
fn test_save_then_reload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sheet.grd");
    let path_str = path.to_str().unwrap();

    let (_, _, code) = run_command(&["--set", "A1=6", "--set", "A2==A1*7", "--save", path_str]);
    assert_eq!(code, 0);

    let (stdout, _, code) = run_command(&[path_str, "-c", "A2"]);
    assert_eq!(stdout.trim(), "42");
    assert_eq!(code, 0);
}

#[test]
fn test_snapshot_export_then_import() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("snap.json");
    let path_str = path.to_str().unwrap();

    let (_, _, code) = run_command(&[
        "--set", "B2=3",
        "--set", "C3==B2*B2",
        "--export-snapshot", path_str,
        "-c", "0",
    ]);
    assert_eq!(code, 0);
    let json = std::fs::read_to_string(&path).unwrap();
    assert!(json.contains("\"rawInput\": \"=B2*B2\""));

    let (stdout, _, code) = run_command(&["--import-snapshot", path_str, "-c", "C3+1"]);
    assert_eq!(stdout.trim(), "10");
    assert_eq!(code, 0);
}

#[test]
fn test_markdown_output_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.md");

    let (stdout, _, code) = run_command(&["--set", "A1=x|y", "-o", path.to_str().unwrap()]);
    assert_eq!(code, 0);
    assert!(stdout.is_empty());
    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.contains("| 1 | x\\|y |"));
}
