//! Command batches
//!
//! [`Job`] is the higher-level hook for running an ordered list of commands
//! against a session and collecting their output. It is an ordinary
//! [`Task`] underneath: commands are written to the shell followed by
//! marker echoes, and lines are collected until the markers come back, so
//! a job leaves no unread bytes behind for the next task.

use std::io::{self, Read, Write};
use std::sync::Weak;

use uuid::Uuid;

use crate::error::Result;
use crate::session::{read_line, ShellSession, Task};

/// Exit code reported for a job that never reached a live shell.
pub const JOB_NOT_RUN: i32 = -1;

/// Collected output of one executed job.
#[derive(Debug, Clone)]
pub struct JobOutput {
    /// Lines the batch wrote to standard output
    pub stdout: Vec<String>,
    /// Lines the batch wrote to standard error
    pub stderr: Vec<String>,
    /// Exit code of the last command, or [`JOB_NOT_RUN`]
    pub code: i32,
}

impl JobOutput {
    /// Whether the batch ran and its last command exited zero.
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

impl Default for JobOutput {
    fn default() -> Self {
        Self {
            stdout: Vec::new(),
            stderr: Vec::new(),
            code: JOB_NOT_RUN,
        }
    }
}

/// Ordered batch of commands bound to a session.
///
/// Built through [`ShellSession::new_job`]; executed either synchronously
/// with [`exec`](Job::exec) or in the background with
/// [`submit`](Job::submit).
pub struct Job {
    session: Weak<ShellSession>,
    commands: Vec<String>,
}

impl Job {
    pub(crate) fn new(session: Weak<ShellSession>) -> Self {
        Self {
            session,
            commands: Vec::new(),
        }
    }

    /// Append one command line to the batch.
    pub fn add(mut self, command: impl Into<String>) -> Self {
        self.commands.push(command.into());
        self
    }

    /// Append several command lines to the batch.
    pub fn add_all<I, S>(mut self, commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.commands.extend(commands.into_iter().map(Into::into));
        self
    }

    /// Run on the calling thread, after queued work drains.
    ///
    /// A session that is already gone (dropped or terminated) yields the
    /// dead-shell output rather than an error; an I/O failure inside the
    /// batch itself is returned.
    pub fn exec(self) -> Result<JobOutput> {
        let mut task = BatchTask::new(self.commands);
        match self.session.upgrade() {
            Some(session) => session.exec_task(&mut task)?,
            None => task.on_shell_died(),
        }
        Ok(task.output)
    }

    /// Enqueue for background execution; `done` receives the output when
    /// the batch finishes (or the dead-shell output if it never ran).
    pub fn submit<F>(self, done: F)
    where
        F: FnOnce(JobOutput) + Send + 'static,
    {
        let task = CallbackTask {
            inner: BatchTask::new(self.commands),
            done: Some(done),
        };
        match self.session.upgrade() {
            Some(session) => session.submit_task(Box::new(task)),
            None => {
                let mut task = task;
                task.on_shell_died();
            }
        }
    }
}

struct BatchTask {
    commands: Vec<String>,
    marker: String,
    output: JobOutput,
}

impl BatchTask {
    fn new(commands: Vec<String>) -> Self {
        Self {
            commands,
            marker: Uuid::new_v4().simple().to_string(),
            output: JobOutput::default(),
        }
    }
}

impl Task for BatchTask {
    fn run(
        &mut self,
        stdin: &mut dyn Write,
        stdout: &mut dyn Read,
        stderr: &mut dyn Read,
    ) -> io::Result<()> {
        for command in &self.commands {
            stdin.write_all(command.as_bytes())?;
            stdin.write_all(b"\n")?;
        }
        // The stdout marker carries the last command's exit code; the
        // stderr marker just delimits that stream.
        stdin.write_all(format!("echo {} $?\necho {} >&2\n", self.marker, self.marker).as_bytes())?;
        stdin.flush()?;

        loop {
            let Some(line) = read_line(stdout)? else {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "shell output ended mid-batch",
                ));
            };
            if let Some(rest) = line.strip_prefix(self.marker.as_str()) {
                self.output.code = rest.trim().parse().unwrap_or(JOB_NOT_RUN);
                break;
            }
            self.output.stdout.push(line);
        }

        while let Some(line) = read_line(stderr)? {
            if line.starts_with(self.marker.as_str()) {
                break;
            }
            self.output.stderr.push(line);
        }

        Ok(())
    }
}

struct CallbackTask<F: FnOnce(JobOutput) + Send> {
    inner: BatchTask,
    done: Option<F>,
}

impl<F: FnOnce(JobOutput) + Send> CallbackTask<F> {
    fn finish(&mut self) {
        if let Some(done) = self.done.take() {
            done(std::mem::take(&mut self.inner.output));
        }
    }
}

impl<F: FnOnce(JobOutput) + Send> Task for CallbackTask<F> {
    fn run(
        &mut self,
        stdin: &mut dyn Write,
        stdout: &mut dyn Read,
        stderr: &mut dyn Read,
    ) -> io::Result<()> {
        let result = self.inner.run(stdin, stdout, stderr);
        self.finish();
        result
    }

    fn on_shell_died(&mut self) {
        self.inner.on_shell_died();
        self.finish();
    }
}
