//! Error types and Result aliases for shellmux

use std::io;

use thiserror::Error;

/// Result type alias for shellmux operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for shellmux
#[derive(Debug, Error)]
pub enum Error {
    // === Handshake errors (fatal to construction) ===
    /// The process exited before the handshake could start
    #[error("created process has already exited")]
    ProcessAlreadyExited,

    /// The process did not echo the probe back
    #[error("created process is not a shell")]
    NotAShell,

    /// The handshake did not finish within the configured deadline
    #[error("shell handshake timed out after {secs}s")]
    HandshakeTimeout { secs: u64 },

    /// A stream failed while the handshake was running
    #[error("shell handshake I/O failure: {0}")]
    HandshakeIo(#[source] io::Error),

    // === Process acquisition errors ===
    /// Spawning the interpreter process failed
    #[error("failed to spawn '{program}': {source}")]
    SpawnFailed { program: String, source: io::Error },

    /// The process was spawned without a piped stdin
    #[error("process has no piped stdin")]
    StdinUnavailable,

    /// The process was spawned without a piped stdout
    #[error("process has no piped stdout")]
    StdoutUnavailable,

    /// The process was spawned without a piped stderr
    #[error("process has no piped stderr")]
    StderrUnavailable,

    // === Task errors (scoped to one execution attempt) ===
    /// A stream failed during a single task's execution
    #[error("task I/O failure: {0}")]
    TaskIo(#[from] io::Error),
}
