use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

const PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
  <title>Plain title</title>
  <meta name="hdl" content="Headline">
  <meta property="og:title" content="OpenGraph title">
</head>
<body><p>Body</p></body>
</html>
"#;

#[test]
fn test_cli_title_of_a_file() {
    let temp_dir = TempDir::new().unwrap();
    let page = temp_dir.path().join("page.html");
    fs::write(&page, PAGE).unwrap();

    let mut cmd = Command::cargo_bin("fathom").unwrap();
    cmd.arg("title").arg(&page);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("page.html"))
        .stdout(predicate::str::contains("OpenGraph title"))
        .stdout(predicate::str::contains("40"))
        .stdout(predicate::str::contains("og:title"));
}

#[test]
fn test_cli_title_walks_directories() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("a.html"), PAGE).unwrap();
    fs::create_dir(temp_dir.path().join("nested")).unwrap();
    fs::write(
        temp_dir.path().join("nested").join("b.htm"),
        "<title>Nested</title>",
    )
    .unwrap();
    fs::write(temp_dir.path().join("notes.txt"), "<title>Skipped</title>").unwrap();

    let mut cmd = Command::cargo_bin("fathom").unwrap();
    cmd.arg("title").arg(temp_dir.path()).arg("--json");

    let output = cmd.assert().success().get_output().stdout.clone();
    let json: serde_json::Value = serde_json::from_slice(&output).unwrap();
    let results = json.as_array().unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["title"], "OpenGraph title");
    assert_eq!(results[0]["score"], 40.0);
    assert_eq!(results[1]["title"], "Nested");
    assert_eq!(results[1]["source"], "title");
}

#[test]
fn test_cli_title_without_candidates() {
    let temp_dir = TempDir::new().unwrap();
    let page = temp_dir.path().join("empty.html");
    fs::write(&page, "<p>No title</p>").unwrap();

    let mut cmd = Command::cargo_bin("fathom").unwrap();
    cmd.arg("title").arg(&page).arg("--json");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("\"title\": null"));
}

#[test]
fn test_cli_title_missing_file() {
    let temp_dir = TempDir::new().unwrap();

    let mut cmd = Command::cargo_bin("fathom").unwrap();
    cmd.arg("title").arg(temp_dir.path().join("missing.html"));

    cmd.assert().failure().stderr(predicate::str::contains("Error"));
}

#[test]
fn test_cli_title_requires_a_path() {
    let mut cmd = Command::cargo_bin("fathom").unwrap();
    cmd.arg("title");

    cmd.assert().failure();
}
