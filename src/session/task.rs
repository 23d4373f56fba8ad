//! The task contract
//!
//! A task is one unit of work executed against a session's streams. An
//! accepted task is consumed exactly once: either `run` (against a live
//! shell) or `on_shell_died` (when the session can no longer execute),
//! never both.

use std::io::{self, Read, Write};

/// A unit of work executed against a live session's standard streams.
pub trait Task: Send {
    /// Execute against the shell. The streams are exclusively this task's
    /// for the duration of the call; nothing else reads or writes them.
    fn run(
        &mut self,
        stdin: &mut dyn Write,
        stdout: &mut dyn Read,
        stderr: &mut dyn Read,
    ) -> io::Result<()>;

    /// Called instead of [`run`](Task::run) when the session is no longer
    /// able to execute tasks.
    fn on_shell_died(&mut self) {}
}

/// Adapter turning a closure into a [`Task`] (the dead-shell notification is
/// a no-op).
pub struct FnTask<F>(F);

impl<F> FnTask<F>
where
    F: FnMut(&mut dyn Write, &mut dyn Read, &mut dyn Read) -> io::Result<()> + Send,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> Task for FnTask<F>
where
    F: FnMut(&mut dyn Write, &mut dyn Read, &mut dyn Read) -> io::Result<()> + Send,
{
    fn run(
        &mut self,
        stdin: &mut dyn Write,
        stdout: &mut dyn Read,
        stderr: &mut dyn Read,
    ) -> io::Result<()> {
        (self.0)(stdin, stdout, stderr)
    }
}
