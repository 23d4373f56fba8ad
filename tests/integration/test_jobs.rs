//! Integration tests for command batches running over one shared shell.

#![cfg(unix)]

use std::sync::Arc;
use std::time::Duration;

use shellmux::{SessionConfig, ShellSession, JOB_NOT_RUN};

fn connect_sh() -> Arc<ShellSession> {
    ShellSession::spawn("sh", &[], SessionConfig::default()).expect("sh session should connect")
}

#[test]
fn test_single_command_output() {
    let session = connect_sh();
    let output = session.new_job().add("echo hello").exec().expect("job runs");
    assert_eq!(output.stdout, vec!["hello"]);
    assert!(output.stderr.is_empty());
    assert_eq!(output.code, 0);
    assert!(output.success());
    session.close();
}

#[test]
fn test_batch_runs_in_order_with_shared_state() {
    let session = connect_sh();
    let output = session
        .new_job()
        .add("greeting=hi")
        .add_all(["echo $greeting", "echo again"])
        .exec()
        .expect("job runs");
    assert_eq!(output.stdout, vec!["hi", "again"]);
    assert!(output.success());
    session.close();
}

#[test]
fn test_exit_code_of_last_command() {
    let session = connect_sh();
    let output = session.new_job().add("false").exec().expect("job runs");
    assert_eq!(output.code, 1);
    assert!(!output.success());
    session.close();
}

#[test]
fn test_stderr_is_collected_separately() {
    let session = connect_sh();
    let output = session
        .new_job()
        .add("echo visible")
        .add("echo oops >&2")
        .exec()
        .expect("job runs");
    assert_eq!(output.stdout, vec!["visible"]);
    assert_eq!(output.stderr, vec!["oops"]);
    session.close();
}

#[test]
fn test_shell_state_persists_between_jobs() {
    let session = connect_sh();
    session
        .new_job()
        .add("kept=7")
        .exec()
        .expect("first job runs");
    let output = session
        .new_job()
        .add("echo $kept")
        .exec()
        .expect("second job runs");
    assert_eq!(output.stdout, vec!["7"]);
    session.close();
}

#[test]
fn test_submit_delivers_output_to_callback() {
    let session = connect_sh();
    let (tx, rx) = std::sync::mpsc::channel();
    session.new_job().add("echo async").submit(move |output| {
        tx.send(output).ok();
    });

    let output = rx.recv_timeout(Duration::from_secs(5)).expect("callback fires");
    assert_eq!(output.stdout, vec!["async"]);
    assert!(output.success());
    session.close();
}

#[test]
fn test_submitted_jobs_keep_queue_order() {
    let session = connect_sh();
    let (tx, rx) = std::sync::mpsc::channel();
    for tag in 0..5 {
        let tx = tx.clone();
        session
            .new_job()
            .add(format!("echo {}", tag))
            .submit(move |output| {
                tx.send(output.stdout.first().cloned().unwrap_or_default()).ok();
            });
    }
    drop(tx);

    let order: Vec<String> = rx.iter().take(5).collect();
    assert_eq!(order, vec!["0", "1", "2", "3", "4"]);
    session.close();
}

#[test]
fn test_job_against_closed_session_reports_not_run() {
    let session = connect_sh();
    session.close();

    let output = session
        .new_job()
        .add("echo never")
        .exec()
        .expect("dead-shell jobs resolve without an I/O error");
    assert_eq!(output.code, JOB_NOT_RUN);
    assert!(output.stdout.is_empty());
    assert!(!output.success());
}

#[test]
fn test_submit_against_closed_session_still_fires_callback() {
    let session = connect_sh();
    session.close();

    let (tx, rx) = std::sync::mpsc::channel();
    session.new_job().add("echo never").submit(move |output| {
        tx.send(output.code).ok();
    });
    assert_eq!(rx.recv_timeout(Duration::from_secs(2)), Ok(JOB_NOT_RUN));
}
