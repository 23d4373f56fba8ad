//! Shell process acquisition
//!
//! The session core is written against the [`ProcessHandle`] seam rather than
//! a concrete process type, so tests and embedders can supply their own.
//! [`ChildProcess`] is the shipped implementation over a piped
//! `std::process::Child`.

use std::io::{Read, Write};
use std::process::{Child, Command, Stdio};

use crate::error::{Error, Result};

/// The raw byte channels of a spawned process, taken exactly once.
pub struct RawStreams {
    /// Writable end of the process's standard input
    pub stdin: Box<dyn Write + Send>,
    /// Readable end of the process's standard output
    pub stdout: Box<dyn Read + Send>,
    /// Readable end of the process's standard error
    pub stderr: Box<dyn Read + Send>,
}

/// A spawned interpreter process, as the session core sees it.
pub trait ProcessHandle: Send {
    /// Take ownership of the standard streams. Called once, during session
    /// construction.
    fn take_streams(&mut self) -> Result<RawStreams>;

    /// Non-blocking probe: has the process exited?
    fn has_exited(&mut self) -> bool;

    /// Forcibly terminate the process and reap it. Must tolerate being
    /// called on an already dead process.
    fn destroy(&mut self);
}

/// [`ProcessHandle`] over a `std::process::Child` spawned with piped
/// standard streams.
#[derive(Debug)]
pub struct ChildProcess {
    child: Child,
}

impl ChildProcess {
    pub fn new(child: Child) -> Self {
        Self { child }
    }

    /// OS process identifier.
    pub fn pid(&self) -> u32 {
        self.child.id()
    }
}

impl From<Child> for ChildProcess {
    fn from(child: Child) -> Self {
        Self::new(child)
    }
}

impl ProcessHandle for ChildProcess {
    fn take_streams(&mut self) -> Result<RawStreams> {
        let stdin = self.child.stdin.take().ok_or(Error::StdinUnavailable)?;
        let stdout = self.child.stdout.take().ok_or(Error::StdoutUnavailable)?;
        let stderr = self.child.stderr.take().ok_or(Error::StderrUnavailable)?;
        Ok(RawStreams {
            stdin: Box::new(stdin),
            stdout: Box::new(stdout),
            stderr: Box::new(stderr),
        })
    }

    fn has_exited(&mut self) -> bool {
        match self.child.try_wait() {
            Ok(Some(_)) => true,
            Ok(None) => false,
            Err(e) => {
                warn!("exit probe for pid {} failed: {}", self.child.id(), e);
                false
            }
        }
    }

    fn destroy(&mut self) {
        if let Err(e) = self.child.kill() {
            // Usual cause: the process is already gone.
            debug!("kill pid {}: {}", self.child.id(), e);
        }
        match self.child.wait() {
            Ok(status) => debug!("reaped pid {} ({})", self.child.id(), status),
            Err(e) => warn!("failed to reap pid {}: {}", self.child.id(), e),
        }
    }
}

/// Spawn `program` with all three standard streams piped, ready to hand to
/// [`ShellSession::connect`](crate::session::ShellSession::connect).
pub fn spawn_shell(program: &str, args: &[&str]) -> Result<ChildProcess> {
    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| Error::SpawnFailed {
            program: program.to_string(),
            source,
        })?;
    debug!("spawned '{}' (pid {})", program, child.id());
    Ok(ChildProcess::new(child))
}
