//! Runs the compiled binary end to end.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;
use tempfile::NamedTempFile;

fn fanout() -> Command {
    let mut cmd = Command::cargo_bin("fanout").unwrap();
    cmd.env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_default_run_prints_one_line_per_recipient() {
    let output = fanout()
        .args(["--delay-ms", "0", "--workers", "2"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let stdout = String::from_utf8(output).unwrap();
    let mut lines: Vec<&str> = stdout.lines().collect();
    lines.sort();
    assert_eq!(
        lines,
        vec![
            "Sending notification to User 1 - Delivery Agent: Your order is on the way!",
            "Sending notification to User 2 - Staff: Your order is on the way!",
            "Sending notification to User 3 - End User: Your order is on the way!",
        ]
    );
}

#[test]
fn test_message_flag_and_json_output() {
    fanout()
        .args(["--delay-ms", "0", "--json", "--message", "hello"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""message":"hello""#))
        .stdout(predicate::str::contains(r#""channel":"push""#))
        .stdout(predicate::str::contains("Sending notification").not());
}

#[test]
fn test_unknown_category_fails_loudly() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
        [[recipients]]
        id = 1
        name = "Robot"
        category = "Robot"
        "#
    )
    .unwrap();

    fanout()
        .args(["--delay-ms", "0", "--config", file.path().to_str().unwrap()])
        .assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("unknown recipient category"));
}

#[test]
fn test_zero_workers_fails() {
    fanout()
        .args(["--delay-ms", "0", "--workers", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("worker count must be at least 1"));
}
