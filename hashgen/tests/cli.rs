use std::io::Write;
use std::process::{Command, Output, Stdio};

use tempfile::NamedTempFile;

const ENV_VARS: &[&str] = &[
    "HASHGEN_PASSWORD",
    "HASHGEN_SCHEME",
    "HASHGEN_COST",
    "HASHGEN_BCRYPT_VERSION",
    "HASHGEN_CONFIG",
    "HASHGEN_LOG",
];

fn hashgen() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_hashgen"));
    for var in ENV_VARS {
        cmd.env_remove(var);
    }
    cmd
}

fn run_with_stdin(mut cmd: Command, stdin: &str) -> Output {
    let mut child = cmd
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("binary should start");
    child
        .stdin
        .take()
        .expect("stdin is piped")
        .write_all(stdin.as_bytes())
        .expect("stdin should accept the password");
    child.wait_with_output().expect("binary should finish")
}

fn stdout_lines(output: &Output) -> Vec<String> {
    String::from_utf8(output.stdout.clone())
        .expect("stdout is UTF-8")
        .lines()
        .map(str::to_owned)
        .collect()
}

#[test]
fn bare_invocation_prints_label_and_hash() {
    let output = hashgen()
        .env("HASHGEN_PASSWORD", "adminuser")
        .env("HASHGEN_COST", "4")
        .output()
        .expect("binary should run");

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let lines = stdout_lines(&output);
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], "Bcrypt hash for the supplied password:");
    assert!(lines[1].starts_with("$2b$04$"));
    assert_eq!(lines[1].len(), 60);
}

#[test]
fn hash_then_verify_through_the_binary() {
    let mut cmd = hashgen();
    cmd.args(["hash", "--raw", "--cost", "4", "--password-stdin"]);
    let output = run_with_stdin(cmd, "adminuser\n");
    assert!(output.status.success());
    let lines = stdout_lines(&output);
    assert_eq!(lines.len(), 1);
    let hash = lines[0].clone();

    let mut cmd = hashgen();
    cmd.args(["verify", &hash, "--password-stdin"]);
    let matched = run_with_stdin(cmd, "adminuser\n");
    assert_eq!(matched.status.code(), Some(0));
    assert_eq!(stdout_lines(&matched), vec!["match"]);

    let mut cmd = hashgen();
    cmd.args(["verify", &hash, "--password-stdin"]);
    let rejected = run_with_stdin(cmd, "wrongpass\n");
    assert_eq!(rejected.status.code(), Some(1));
    assert_eq!(stdout_lines(&rejected), vec!["no-match"]);
}

#[test]
fn cli_flag_beats_environment_and_config_file() {
    let mut config = NamedTempFile::new().expect("temp file");
    config
        .write_all(br#"{ "cost": 5, "bcrypt_version": "2a" }"#)
        .expect("config should be written");

    let output = hashgen()
        .env("HASHGEN_CONFIG", config.path())
        .env("HASHGEN_COST", "6")
        .args(["hash", "--raw", "--cost", "4", "adminuser"])
        .output()
        .expect("binary should run");
    assert!(output.status.success());
    assert!(stdout_lines(&output)[0].starts_with("$2a$04$"));

    let output = hashgen()
        .env("HASHGEN_CONFIG", config.path())
        .args(["hash", "--raw", "adminuser"])
        .output()
        .expect("binary should run");
    assert!(output.status.success());
    assert!(stdout_lines(&output)[0].starts_with("$2a$05$"));
}

#[test]
fn empty_password_fails_with_diagnostic() {
    let mut cmd = hashgen();
    cmd.args(["hash", "--cost", "4", "--password-stdin"]);
    let output = run_with_stdin(cmd, "\n");
    assert_eq!(output.status.code(), Some(2));
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("password must not be empty"));
}

#[test]
fn invalid_cost_fails_before_reading_the_password() {
    let output = hashgen()
        .args(["hash", "--cost", "3", "adminuser"])
        .output()
        .expect("binary should run");
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("bcrypt cost 3"));
}

#[test]
fn inspect_describes_a_hash() {
    let output = hashgen()
        .args([
            "inspect",
            "$2a$05$CCCCCCCCCCCCCCCCCCCCC.E5YPO9kmyuRGyh0XouQYb4YMJKvyOeW",
        ])
        .output()
        .expect("binary should run");
    assert!(output.status.success());
    assert_eq!(
        stdout_lines(&output),
        vec!["scheme: bcrypt", "version: 2a", "cost: 5", "salt: CCCCCCCCCCCCCCCCCCCCC."]
    );
}

#[test]
fn oversized_argon2_hash_fails_with_diagnostic() {
    let hash = concat!(
        "$argon2id$v=19$m=4294967295,t=1,p=1",
        "$c29tZXNhbHQ$iWh06vD8Fy27wf9npn6FXWiCX4K6pW6Ue1Bnzz07Z8A"
    );
    let output = hashgen()
        .args(["verify", hash, "adminuser"])
        .output()
        .expect("binary should run");
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("error: argon2 memory_kib"));
}

#[test]
fn oversized_argon2_config_fails_with_diagnostic() {
    let mut config = NamedTempFile::new().expect("temp file");
    config
        .write_all(br#"{ "scheme": "argon2id", "argon2": { "memory_kib": 4294967295 } }"#)
        .expect("config should be written");

    let output = hashgen()
        .env("HASHGEN_CONFIG", config.path())
        .args(["hash", "adminuser"])
        .output()
        .expect("binary should run");
    assert_eq!(output.status.code(), Some(2));
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("invalid argon2 parameters"));
}

#[test]
fn malformed_hash_is_an_error() {
    let output = hashgen()
        .args(["verify", "not-a-hash", "adminuser"])
        .output()
        .expect("binary should run");
    assert_eq!(output.status.code(), Some(2));
}
