//! Integration tests for handshake classification and its failure modes,
//! using real processes and scripted stand-in "shells".

#![cfg(unix)]

use std::io::Write as _;
use std::process::Command;
use std::time::{Duration, Instant};

use tempfile::NamedTempFile;

use shellmux::{ChildProcess, Error, PrivilegeFlag, SessionConfig, ShellSession, Status};

fn script(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp script");
    file.write_all(contents.as_bytes()).expect("write script");
    file.flush().expect("flush script");
    file
}

fn spawn_script(file: &NamedTempFile, config: SessionConfig) -> shellmux::Result<std::sync::Arc<ShellSession>> {
    let path = file.path().to_str().expect("utf-8 temp path");
    ShellSession::spawn("sh", &[path], config)
}

#[test]
fn test_already_exited_process_is_rejected() {
    let mut child = Command::new("true")
        .stdin(std::process::Stdio::piped())
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped())
        .spawn()
        .expect("spawn true");
    // Poll rather than wait(): wait() would close the child's stdin handle,
    // and the point here is to hand over a fully piped but dead process.
    while child.try_wait().expect("probe exit").is_none() {
        std::thread::sleep(Duration::from_millis(10));
    }

    let result = ShellSession::connect(
        Box::new(ChildProcess::new(child)),
        SessionConfig::default(),
    );
    assert!(matches!(result, Err(Error::ProcessAlreadyExited)));
}

#[test]
fn test_process_that_answers_wrong_is_not_a_shell() {
    let file = script("read line\necho \"handshake declined\"\nwhile read more; do :; done\n");
    let result = spawn_script(&file, SessionConfig::default());
    assert!(matches!(result, Err(Error::NotAShell)));
}

#[test]
fn test_unresponsive_process_times_out_within_bounds() {
    let started = Instant::now();
    let result = ShellSession::spawn("sleep", &["30"], SessionConfig::with_timeout_secs(1));
    let elapsed = started.elapsed();

    assert!(matches!(result, Err(Error::HandshakeTimeout { secs: 1 })));
    assert!(elapsed >= Duration::from_secs(1));
    assert!(elapsed < Duration::from_secs(5));
}

#[test]
fn test_zero_uid_reply_classifies_privileged() {
    let file = script(concat!(
        "read line\n",
        "echo \"$line\"\n",
        "read ignored\n",
        "echo \"uid=0(root) gid=0(root) groups=0(root)\"\n",
        "while read more; do :; done\n",
    ));
    let flag = PrivilegeFlag::new();
    let config = SessionConfig::default().with_privilege_flag(flag.clone());

    let session = spawn_script(&file, config).expect("scripted root shell should connect");
    assert_eq!(session.status(), Status::Privileged);
    assert!(flag.confirmed());
    session.close();
}

#[test]
fn test_nonzero_uid_reply_classifies_unprivileged() {
    let file = script(concat!(
        "read line\n",
        "echo \"$line\"\n",
        "read ignored\n",
        "echo \"uid=1000(user) gid=1000(user)\"\n",
        "while read more; do :; done\n",
    ));
    let flag = PrivilegeFlag::new();
    let config = SessionConfig::default().with_privilege_flag(flag.clone());

    let session = spawn_script(&file, config).expect("scripted shell should connect");
    assert_eq!(session.status(), Status::Unprivileged);
    assert!(!flag.confirmed());
    session.close();
}

#[test]
fn test_missing_identity_reply_still_connects_unprivileged() {
    // Answers the probe, swallows the identity query, then exits without
    // replying: "not proven privileged" rather than a failed handshake.
    let file = script("read line\necho \"$line\"\nread ignored\nexit 0\n");
    let flag = PrivilegeFlag::new();
    let config = SessionConfig::default().with_privilege_flag(flag.clone());

    let session = spawn_script(&file, config).expect("half-cooperative shell should connect");
    assert_eq!(session.status(), Status::Unprivileged);
    assert!(!flag.confirmed());
    session.close();
}

#[test]
fn test_real_shell_classification_matches_uid() {
    let session =
        ShellSession::spawn("sh", &[], SessionConfig::default()).expect("sh should connect");
    // Whichever way this test environment runs, the session must land on a
    // definite classification.
    assert!(session.status().runnable());
    session.close();
}
