//! Process-wide privilege witness
//!
//! Records that at least one handshake in this process classified its shell
//! as privileged. The flag only ever moves from `false` to `true`; it is set
//! by the handshake and read by collaborators that want to know whether
//! elevated access has been proven at some point in the process lifetime.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use once_cell::sync::Lazy;

static GLOBAL: Lazy<PrivilegeFlag> = Lazy::new(PrivilegeFlag::new);

/// Cloneable handle to a shared, monotonic "privilege confirmed" bit.
///
/// Sessions take one through [`SessionConfig`](crate::config::SessionConfig);
/// by default they share the process-wide instance from [`PrivilegeFlag::global`],
/// but tests and embedders can inject their own.
#[derive(Debug, Clone, Default)]
pub struct PrivilegeFlag {
    confirmed: Arc<AtomicBool>,
}

impl PrivilegeFlag {
    /// Create a fresh, unset flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide default instance.
    pub fn global() -> Self {
        GLOBAL.clone()
    }

    /// Whether a privileged classification has been observed.
    pub fn confirmed(&self) -> bool {
        self.confirmed.load(Ordering::Acquire)
    }

    pub(crate) fn confirm(&self) {
        self.confirmed.store(true, Ordering::Release);
    }
}
