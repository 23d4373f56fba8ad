//! Session classification handshake
//!
//! Runs once, right after the process is wrapped: decide whether it is a
//! live, cooperative shell, and whether it runs with elevated privilege.
//! The caller bounds the whole sequence with a deadline; any failure here is
//! fatal to construction.

use std::io::Write;

use crate::config::SessionConfig;
use crate::error::{Error, Result};

use super::guard::{read_line, GuardedReader, GuardedWriter};
use super::Status;

/// Token a cooperative shell echoes back during the probe step.
const PROBE_TOKEN: &str = "SHELLMUX_PROBE";

/// Classify the process behind the given streams.
///
/// The exited-probe has already been done by the caller; this runs the
/// line-based protocol: drain startup noise, `echo` probe, `id` query, and
/// on a privileged shell record the fact and align its working directory
/// with ours.
pub(super) fn classify(
    stdin: &mut GuardedWriter,
    stdout: &mut GuardedReader,
    stderr: &mut GuardedReader,
    config: &SessionConfig,
) -> Result<Status> {
    // Startup noise (motd, profile warnings) must not corrupt the probe.
    stdout.discard_pending();
    stderr.discard_pending();

    stdin
        .write_all(format!("echo {}\n", PROBE_TOKEN).as_bytes())
        .and_then(|_| stdin.flush())
        .map_err(Error::HandshakeIo)?;
    let reply = read_line(stdout)
        .map_err(Error::HandshakeIo)?
        .unwrap_or_default();
    if reply.is_empty() || !reply.contains(PROBE_TOKEN) {
        return Err(Error::NotAShell);
    }

    stdin
        .write_all(b"id\n")
        .and_then(|_| stdin.flush())
        .map_err(Error::HandshakeIo)?;
    let identity = read_line(stdout)
        .map_err(Error::HandshakeIo)?
        .unwrap_or_default();
    if identity.contains("uid=0") {
        config.privilege_flag.confirm();
        align_working_directory(stdin).map_err(Error::HandshakeIo)?;
        Ok(Status::Privileged)
    } else {
        // An empty or unreadable identity reply means "not proven
        // privileged", not a failed handshake.
        Ok(Status::Unprivileged)
    }
}

/// Privileged shells start in their own working directory; move them to the
/// caller's so relative paths in later commands line up.
fn align_working_directory(stdin: &mut GuardedWriter) -> std::io::Result<()> {
    let cwd = std::env::current_dir()?;
    let cwd = cwd.to_string_lossy();
    match shlex::try_quote(cwd.as_ref()) {
        Ok(quoted) => {
            stdin.write_all(format!("cd {}\n", quoted).as_bytes())?;
            stdin.flush()
        }
        Err(e) => {
            warn!("cannot quote working directory {:?}: {}", cwd, e);
            Ok(())
        }
    }
}
