use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

const PAGE: &str = r#"
<div id="main" class="content">
  <p class="lead">First paragraph</p>
  <p>Second paragraph</p>
</div>
"#;

fn page() -> (TempDir, std::path::PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("page.html");
    fs::write(&path, PAGE).unwrap();
    (temp_dir, path)
}

#[test]
fn test_cli_select_lists_matches() {
    let (_temp_dir, path) = page();

    let mut cmd = Command::cargo_bin("fathom").unwrap();
    cmd.arg("select").arg(&path).arg("#main > p");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("2 element(s) match '#main > p'"))
        .stdout(predicate::str::contains("First paragraph"))
        .stdout(predicate::str::contains("Second paragraph"))
        .stdout(predicate::str::contains("lead"));
}

#[test]
fn test_cli_select_no_matches() {
    let (_temp_dir, path) = page();

    let mut cmd = Command::cargo_bin("fathom").unwrap();
    cmd.arg("select").arg(&path).arg("section");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("0 element(s) match 'section'"));
}

#[test]
fn test_cli_select_invalid_selector() {
    let (_temp_dir, path) = page();

    let mut cmd = Command::cargo_bin("fathom").unwrap();
    cmd.arg("select").arg(&path).arg("div >");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Invalid selector"));
}

#[test]
fn test_cli_select_verbose_is_accepted() {
    let (_temp_dir, path) = page();

    let mut cmd = Command::cargo_bin("fathom").unwrap();
    cmd.arg("--verbose").arg("select").arg(&path).arg("p");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("2 element(s)"));
}
