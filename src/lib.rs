//! shellmux — exclusive, ordered task execution over one long-lived shell
//!
//! A [`ShellSession`] owns a single interpreter process (privileged or not)
//! and guarantees that exactly one task at a time touches its standard
//! streams, in submission order, no matter how many threads submit
//! concurrently.
//!
//! ## Module Organization
//!
//! - [`session`] - Session manager: handshake, stream guards, task queue
//! - [`job`] - Command batches built on top of a session
//! - [`process`] - The process-handle seam and the `std::process` impl
//! - [`config`] - Session configuration
//! - [`privilege`] - Process-wide privilege witness
//! - [`mod@error`] - Error types and Result aliases
//!
//! ## Quick Start
//!
//! ```no_run
//! use shellmux::{SessionConfig, ShellSession};
//!
//! # fn main() -> shellmux::Result<()> {
//! let session = ShellSession::spawn("sh", &[], SessionConfig::default())?;
//!
//! let output = session.new_job().add("echo hello").exec()?;
//! assert_eq!(output.stdout, vec!["hello".to_string()]);
//!
//! session.close();
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! The session runs blocking I/O on background threads:
//!
//! - **Handshake Thread:** classifies the process under a bounded wait
//! - **Bridge Threads:** read the process's output pipes (blocking I/O)
//! - **Drain Worker:** executes queued tasks one at a time, in order
//!
//! Synchronous execution blocks the calling thread until queued work has
//! drained, then runs on that thread; the two modes are mutually exclusive
//! over the shared streams.
//!
//! ## Safety and Reliability
//!
//! - **No Panics:** All fallible operations return `Result`
//! - **Single Teardown:** Streams and process are released exactly once
//! - **Abrupt Death:** A shell dying mid-task terminates the session; later
//!   tasks are notified instead of executed

#[macro_use]
extern crate tracing;

pub mod config;
pub mod error;
pub mod job;
pub mod privilege;
pub mod process;
pub mod session;

// Re-exports for core functionality
pub use config::{SessionConfig, DEFAULT_HANDSHAKE_TIMEOUT_SECS};
pub use error::{Error, Result};
pub use job::{Job, JobOutput, JOB_NOT_RUN};
pub use privilege::PrivilegeFlag;
pub use process::{spawn_shell, ChildProcess, ProcessHandle, RawStreams};
pub use session::{read_line, FnTask, ShellSession, Status, Task};

// Version information
/// The current version of shellmux from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The crate name from Cargo.toml
pub const NAME: &str = env!("CARGO_PKG_NAME");
