use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

fn cli_cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("bloomlog"))
}

#[test]
fn create_put_contains_info() {
    let tmp = tempdir().expect("tempdir");
    let dir = tmp.path().to_str().unwrap();

    cli_cmd()
        .args(["create", "--dir", dir, "--name", "users", "--max", "500", "--fpp", "0.0005"])
        .assert()
        .success()
        .stdout(predicate::str::contains("500:11:7911:0"));

    cli_cmd()
        .args(["create", "--dir", dir, "--name", "users", "--max", "500"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    cli_cmd()
        .args(["put", "--dir", dir, "--name", "users", "123456", "123456"])
        .assert()
        .success()
        .stdout(predicate::str::contains("123456\tnew").and(predicate::str::contains("123456\tpresent")));

    cli_cmd()
        .args(["contains", "--dir", dir, "--name", "users", "123456", "1234567"])
        .assert()
        .success()
        .stdout(predicate::str::contains("123456\ttrue").and(predicate::str::contains("1234567\tfalse")));

    cli_cmd()
        .args(["info", "--dir", dir, "--name", "users", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"total\": 1"));
}

#[test]
fn put_with_log_dir_records_new_keys() {
    let tmp = tempdir().expect("tempdir");
    let dir = tmp.path().to_str().unwrap();
    let logs = tmp.path().join("logs");

    cli_cmd()
        .args(["create", "--dir", dir, "--name", "f", "--max", "100"])
        .assert()
        .success();

    cli_cmd()
        .args(["put", "--dir", dir, "--name", "f", "--log-dir", logs.to_str().unwrap(), "a", "b", "a"])
        .assert()
        .success();

    let text = fs::read_to_string(logs.join("bloomlog.aof")).unwrap();
    assert_eq!(text.lines().count(), 2);
}

#[test]
fn missing_filter_fails() {
    let tmp = tempdir().expect("tempdir");
    cli_cmd()
        .args(["contains", "--dir", tmp.path().to_str().unwrap(), "--name", "nope", "k"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Missing file"));
}

#[test]
fn estimate_prints_sizing() {
    cli_cmd()
        .args(["estimate", "--max", "1000", "--fpp", "0.01"])
        .assert()
        .success()
        .stdout(predicate::str::contains("bit_size=9586 hash_size=7 bytes=1200"));
}
