//! Shell session management
//!
//! A [`ShellSession`] owns one long-lived interpreter process and its
//! standard streams, and guarantees that exactly one task at a time touches
//! those streams, in submission order. Construction runs the classification
//! handshake under a deadline; teardown is idempotent and survives abrupt
//! process death mid-task.

pub(crate) mod guard;
mod handshake;
mod queue;
mod task;

pub use guard::read_line;
pub use task::{FnTask, Task};

use std::fmt;
use std::io::Write;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Weak};
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::SessionConfig;
use crate::error::{Error, Result};
use crate::job::Job;
use crate::process::{spawn_shell, ProcessHandle, RawStreams};

use guard::{GuardedReader, GuardedWriter};
use queue::TaskQueue;

/// Classification of a managed interpreter process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Status {
    /// Not classified yet, or reset after a timed-out graceful close:
    /// "state unknown, do not trust prior classification".
    #[default]
    Unclassified,
    /// The handshake saw a zero-valued user identity.
    Privileged,
    /// A live shell without proven elevated privilege.
    Unprivileged,
    /// Torn down: streams released, process destroyed. Absorbing.
    Terminated,
}

impl Status {
    /// Only a classified live session may execute tasks.
    pub fn runnable(self) -> bool {
        matches!(self, Status::Privileged | Status::Unprivileged)
    }

    fn as_u8(self) -> u8 {
        match self {
            Status::Unclassified => 0,
            Status::Privileged => 1,
            Status::Unprivileged => 2,
            Status::Terminated => 3,
        }
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Status::Privileged,
            2 => Status::Unprivileged,
            3 => Status::Terminated,
            _ => Status::Unclassified,
        }
    }
}

/// Lock-free status cell. Written only by the handshake, teardown, and the
/// graceful-close reset; read anywhere, tolerating eventually-consistent
/// observations of a monotonically progressing lifecycle.
struct StatusCell(AtomicU8);

impl StatusCell {
    fn new(status: Status) -> Self {
        Self(AtomicU8::new(status.as_u8()))
    }

    fn load(&self) -> Status {
        Status::from_u8(self.0.load(Ordering::Acquire))
    }

    fn store(&self, status: Status) {
        self.0.store(status.as_u8(), Ordering::Release);
    }

    fn swap(&self, status: Status) -> Status {
        Status::from_u8(self.0.swap(status.as_u8(), Ordering::AcqRel))
    }
}

/// The three guarded streams. The mutex around this struct is the
/// single-slot exclusivity token: it is held for the whole of one task
/// execution, so at most one task is ever in flight.
struct IoChannels {
    stdin: GuardedWriter,
    stdout: GuardedReader,
    stderr: GuardedReader,
}

/// One live interpreter process with exclusive, ordered stream access.
///
/// Sessions are constructed behind an `Arc` (see [`ShellSession::connect`]
/// and [`ShellSession::spawn`]) so that background drain workers can share
/// ownership with callers.
pub struct ShellSession {
    id: Uuid,
    spawned_at: DateTime<Utc>,
    myself: Weak<ShellSession>,
    status: StatusCell,
    process: Mutex<Box<dyn ProcessHandle>>,
    io: Mutex<IoChannels>,
    queue: Mutex<TaskQueue>,
    idle: Condvar,
}

impl ShellSession {
    /// Wrap an already spawned process and run the classification handshake.
    ///
    /// The handshake is bounded by the configured timeout; on any failure
    /// the session tears itself down before the error is returned, so a
    /// half-initialized session is never observable.
    pub fn connect(mut process: Box<dyn ProcessHandle>, config: SessionConfig) -> Result<Arc<Self>> {
        let RawStreams {
            stdin,
            stdout,
            stderr,
        } = process.take_streams()?;

        let session = Arc::new_cyclic(|myself| Self {
            id: Uuid::new_v4(),
            spawned_at: Utc::now(),
            myself: myself.clone(),
            status: StatusCell::new(Status::Unclassified),
            process: Mutex::new(process),
            io: Mutex::new(IoChannels {
                stdin: GuardedWriter::new(stdin),
                stdout: GuardedReader::bridge("stdout", stdout),
                stderr: GuardedReader::bridge("stderr", stderr),
            }),
            queue: Mutex::new(TaskQueue::default()),
            idle: Condvar::new(),
        });

        // The handshake can get stuck indefinitely on an uncooperative
        // process, so it runs on its own thread and the wait is bounded.
        // Teardown is also the cancellation path: destroying the process
        // EOFs the pipes and unblocks a stuck handshake read.
        let (tx, rx) = mpsc::channel();
        let worker = Arc::clone(&session);
        let worker_config = config.clone();
        thread::spawn(move || {
            let _ = tx.send(worker.run_handshake(&worker_config));
        });

        let outcome = match rx.recv_timeout(Duration::from_secs(config.handshake_timeout_secs)) {
            Ok(result) => result,
            Err(_) => Err(Error::HandshakeTimeout {
                secs: config.handshake_timeout_secs,
            }),
        };

        match outcome {
            Ok(status) => {
                session.status.store(status);
                debug!("session {} classified {:?}", session.id, status);
                Ok(session)
            }
            Err(e) => {
                session.release();
                Err(e)
            }
        }
    }

    /// Spawn `program` with piped standard streams and connect to it.
    pub fn spawn(program: &str, args: &[&str], config: SessionConfig) -> Result<Arc<Self>> {
        let process = spawn_shell(program, args)?;
        Self::connect(Box::new(process), config)
    }

    fn run_handshake(&self, config: &SessionConfig) -> Result<Status> {
        if self.process.lock().has_exited() {
            return Err(Error::ProcessAlreadyExited);
        }
        let mut io = self.io.lock();
        let IoChannels {
            stdin,
            stdout,
            stderr,
        } = &mut *io;
        handshake::classify(stdin, stdout, stderr, config)
    }

    /// Session identifier, carried in log output.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// When this session wrapped its process.
    pub fn spawned_at(&self) -> DateTime<Utc> {
        self.spawned_at
    }

    /// Current classification. A point-in-time read.
    pub fn status(&self) -> Status {
        self.status.load()
    }

    /// Point-in-time liveness: the session is classified and the process
    /// has not exited. The process may still die between this check and any
    /// subsequent operation.
    pub fn is_alive(&self) -> bool {
        if !self.status().runnable() {
            return false;
        }
        !self.process.lock().has_exited()
    }

    /// Start building a command batch against this session.
    pub fn new_job(&self) -> Job {
        Job::new(self.myself.clone())
    }

    /// Enqueue a task for background execution. Never blocks; tasks
    /// submitted this way run strictly in submission order.
    pub fn submit_task(&self, task: Box<dyn Task>) {
        let mut queue = self.queue.lock();
        queue.push(task);
        if !queue.draining {
            if let Some(worker) = self.myself.upgrade() {
                queue.draining = true;
                thread::spawn(move || worker.drain());
            }
        }
    }

    /// Execute a task on the calling thread, after every previously
    /// submitted asynchronous task has finished.
    ///
    /// The returned error is the task's own failure (or the resync-write
    /// failure of the attempt itself); either way the caller's view of the
    /// session is unchanged except where teardown already happened.
    pub fn exec_task(&self, task: &mut dyn Task) -> Result<()> {
        {
            let mut queue = self.queue.lock();
            self.idle.wait_while(&mut queue, |q| q.draining);
        }
        self.exec_one(task)
    }

    /// Run queued tasks to completion, then hand the exclusivity token back.
    fn drain(&self) {
        loop {
            let mut task = {
                let mut queue = self.queue.lock();
                match queue.pop() {
                    Some(task) => task,
                    None => {
                        queue.draining = false;
                        self.idle.notify_all();
                        return;
                    }
                }
            };
            if let Err(e) = self.exec_one(task.as_mut()) {
                // The failure belongs to that task alone; the loop moves on.
                debug!("session {}: queued task failed: {}", self.id, e);
            }
        }
    }

    /// Execute one task against the streams. Shared by both submission
    /// modes; the `io` lock makes executions mutually exclusive.
    fn exec_one(&self, task: &mut dyn Task) -> Result<()> {
        let mut io = self.io.lock();
        if !self.status().runnable() {
            drop(io);
            task.on_shell_died();
            return Ok(());
        }

        let IoChannels {
            stdin,
            stdout,
            stderr,
        } = &mut *io;

        // Leftovers from a task that did not read everything it caused.
        stdout.discard_pending();
        stderr.discard_pending();

        // One newline re-synchronizes the interpreter's prompt before the
        // task writes its own commands. Failing here means the shell is
        // gone, which is fatal to the session; a failure from inside the
        // task's own run is not.
        if let Err(e) = stdin.write_all(b"\n").and_then(|_| stdin.flush()) {
            drop(io);
            self.release();
            task.on_shell_died();
            return Err(Error::TaskIo(e));
        }

        task.run(stdin, stdout, stderr).map_err(Error::TaskIo)
    }

    /// Tear down immediately. A no-op once the session is `Terminated`.
    pub fn close(&self) {
        if self.status() == Status::Terminated {
            return;
        }
        self.release();
    }

    /// Graceful close: abandon queued-but-unstarted tasks, wait up to
    /// `timeout` for the in-flight one, then tear down.
    ///
    /// Returns `false` when the wait expires with a task still running; the
    /// classification is reset to [`Status::Unclassified`] and the process
    /// is left alone, so the caller can wait again or fall back to
    /// [`close`](ShellSession::close).
    pub fn wait_and_close(&self, timeout: Duration) -> bool {
        if self.status() == Status::Terminated {
            return true;
        }

        let mut queue = self.queue.lock();
        if queue.draining {
            let abandoned = queue.abandon_pending();
            if abandoned > 0 {
                debug!("session {}: abandoned {} queued tasks", self.id, abandoned);
            }
            self.idle.wait_while_for(&mut queue, |q| q.draining, timeout);
        }
        if !queue.draining {
            drop(queue);
            self.release();
            return true;
        }
        drop(queue);

        self.status.store(Status::Unclassified);
        warn!("session {}: task still running after graceful-close wait", self.id);
        false
    }

    /// The single teardown path: mark terminated, destroy the process
    /// (which EOFs the pipes and unblocks any stream-bound thread), then
    /// truly close the guards. Runs at most once; close errors are
    /// swallowed.
    fn release(&self) {
        if self.status.swap(Status::Terminated) == Status::Terminated {
            return;
        }
        debug!("session {} releasing", self.id);
        self.process.lock().destroy();
        let mut io = self.io.lock();
        io.stdin.shut();
        io.stdout.shut();
        io.stderr.shut();
    }
}

impl Drop for ShellSession {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for ShellSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShellSession")
            .field("id", &self.id)
            .field("status", &self.status.load())
            .field("spawned_at", &self.spawned_at)
            .finish()
    }
}
