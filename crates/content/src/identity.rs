//! Calling identity
//!
//! Passed explicitly through every gateway and authority call.

use std::fmt;

use serde::{Deserialize, Serialize};

/// uid with unrestricted access
pub const ROOT_UID: u32 = 0;

/// uid of the platform itself
pub const SYSTEM_UID: u32 = 1000;

/// A caller: the uid grants attach to, and the pid whose exit ends its session
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    pub uid: u32,
    pub pid: u32,
    pub package: String,
}

impl Identity {
    pub fn new(uid: u32, pid: u32, package: &str) -> Self {
        Self {
            uid,
            pid,
            package: package.to_string(),
        }
    }

    pub fn system() -> Self {
        Self::new(SYSTEM_UID, 0, "android")
    }

    /// Root and system hold every mode on every URI
    pub fn is_privileged(&self) -> bool {
        self.uid == ROOT_UID || self.uid == SYSTEM_UID
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (uid {}, pid {})", self.package, self.uid, self.pid)
    }
}
