//! Session configuration

use serde::{Deserialize, Serialize};

use crate::privilege::PrivilegeFlag;

/// Default handshake deadline, in whole seconds.
pub const DEFAULT_HANDSHAKE_TIMEOUT_SECS: u64 = 20;

/// Configuration for constructing a [`ShellSession`](crate::session::ShellSession).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// How long the classification handshake may take, in whole seconds.
    pub handshake_timeout_secs: u64,

    /// Where a privileged classification is recorded. Defaults to the
    /// process-wide flag.
    #[serde(skip, default = "PrivilegeFlag::global")]
    pub privilege_flag: PrivilegeFlag,
}

impl SessionConfig {
    /// Configuration with the given handshake deadline and the process-wide
    /// privilege flag.
    pub fn with_timeout_secs(handshake_timeout_secs: u64) -> Self {
        Self {
            handshake_timeout_secs,
            ..Self::default()
        }
    }

    /// Replace the privilege flag this session reports into.
    pub fn with_privilege_flag(mut self, flag: PrivilegeFlag) -> Self {
        self.privilege_flag = flag;
        self
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            handshake_timeout_secs: DEFAULT_HANDSHAKE_TIMEOUT_SECS,
            privilege_flag: PrivilegeFlag::global(),
        }
    }
}
