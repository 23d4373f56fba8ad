//! Stream guards
//!
//! Wrappers over the process's raw standard streams. Collaborators — the
//! handshake and tasks — only ever see `&mut dyn Write` / `&mut dyn Read`
//! borrows of these, so the operations that release the underlying OS
//! handles stay out of their reach: the true close is the crate-private
//! `shut`, called only from session teardown.
//!
//! The read side bridges blocking pipe reads to a channel on a background
//! thread, which is also what makes "discard whatever is buffered right now
//! without blocking" expressible.

use std::io::{self, BufWriter, Read, Write};
use std::sync::mpsc::{self, Receiver};
use std::thread;

/// Buffered, guarded writer over the process's stdin.
///
/// Small writes from consecutive tasks coalesce in the buffer instead of
/// fragmenting on the pipe. `flush` is the strongest operation reachable
/// through the public `Write` view; after `shut`, writes fail with
/// `NotConnected` and `flush` is a no-op.
pub(crate) struct GuardedWriter {
    inner: Option<BufWriter<Box<dyn Write + Send>>>,
}

impl GuardedWriter {
    pub(crate) fn new(raw: Box<dyn Write + Send>) -> Self {
        Self {
            inner: Some(BufWriter::new(raw)),
        }
    }

    /// True close: flush what we can, then drop the OS handle.
    pub(crate) fn shut(&mut self) {
        if let Some(mut writer) = self.inner.take() {
            let _ = writer.flush();
        }
    }
}

impl Write for GuardedWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.inner.as_mut() {
            Some(writer) => writer.write(buf),
            None => Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "stream guard is shut",
            )),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.inner.as_mut() {
            Some(writer) => writer.flush(),
            None => Ok(()),
        }
    }
}

/// Guarded reader over one of the process's output pipes.
///
/// A bridge thread does the blocking reads and forwards chunks over a
/// channel; the guard reads from the channel, carrying partially consumed
/// chunks across calls. End of stream (process death, or `shut`) reads as
/// EOF, never as an error.
pub(crate) struct GuardedReader {
    rx: Option<Receiver<Vec<u8>>>,
    chunk: Vec<u8>,
    pos: usize,
}

impl GuardedReader {
    /// Spawn the bridge thread moving bytes from `raw` into the channel.
    /// The thread exits when the pipe reports EOF or a hard error, which is
    /// what destroying the process produces.
    pub(crate) fn bridge(label: &'static str, mut raw: Box<dyn Read + Send>) -> Self {
        let (tx, rx) = mpsc::channel::<Vec<u8>>();
        thread::spawn(move || {
            let mut buf = [0u8; 4096];
            loop {
                match raw.read(&mut buf) {
                    Ok(0) => break,
                    Ok(n) => {
                        if tx.send(buf[..n].to_vec()).is_err() {
                            // Guard is shut; nobody is listening anymore.
                            break;
                        }
                    }
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => {
                        debug!("{} bridge read error: {}", label, e);
                        break;
                    }
                }
            }
            debug!("{} bridge exiting", label);
        });
        Self::from_channel(rx)
    }

    pub(crate) fn from_channel(rx: Receiver<Vec<u8>>) -> Self {
        Self {
            rx: Some(rx),
            chunk: Vec::new(),
            pos: 0,
        }
    }

    /// Throw away everything currently buffered, without blocking. Returns
    /// the number of bytes discarded.
    pub(crate) fn discard_pending(&mut self) -> usize {
        let mut discarded = self.chunk.len() - self.pos;
        self.chunk.clear();
        self.pos = 0;
        if let Some(rx) = &self.rx {
            while let Ok(chunk) = rx.try_recv() {
                discarded += chunk.len();
            }
        }
        discarded
    }

    /// True close: detach from the bridge. Subsequent reads are EOF, and the
    /// bridge thread stops at its next forward attempt.
    pub(crate) fn shut(&mut self) {
        self.rx = None;
        self.chunk.clear();
        self.pos = 0;
    }
}

impl Read for GuardedReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        if self.pos >= self.chunk.len() {
            let Some(rx) = self.rx.as_ref() else {
                return Ok(0);
            };
            match rx.recv() {
                Ok(chunk) => {
                    self.chunk = chunk;
                    self.pos = 0;
                }
                Err(_) => return Ok(0),
            }
        }
        let n = (self.chunk.len() - self.pos).min(buf.len());
        buf[..n].copy_from_slice(&self.chunk[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

/// Read one `\n`-terminated line, one byte at a time so nothing past the
/// newline is consumed from the stream. A trailing `\r` is stripped.
/// Returns `None` on EOF before the first byte.
pub fn read_line(reader: &mut (impl Read + ?Sized)) -> io::Result<Option<String>> {
    let mut line = Vec::new();
    let mut byte = [0u8; 1];
    loop {
        if reader.read(&mut byte)? == 0 {
            if line.is_empty() {
                return Ok(None);
            }
            break;
        }
        if byte[0] == b'\n' {
            break;
        }
        line.push(byte[0]);
    }
    if line.last() == Some(&b'\r') {
        line.pop();
    }
    Ok(Some(String::from_utf8_lossy(&line).into_owned()))
}
