//! Descriptor flag sets
//!
//! Bit values match the platform constants so flags survive the textual
//! `launchFlags=0x..` form unchanged.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Behavioral modifiers carried by a descriptor
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct IntentFlags: u32 {
        const GRANT_READ_URI_PERMISSION = 0x0000_0001;
        const GRANT_WRITE_URI_PERMISSION = 0x0000_0002;
        const FROM_BACKGROUND = 0x0000_0004;
        const DEBUG_LOG_RESOLUTION = 0x0000_0008;
        const EXCLUDE_STOPPED_PACKAGES = 0x0000_0010;
        const INCLUDE_STOPPED_PACKAGES = 0x0000_0020;
        const GRANT_PERSISTABLE_URI_PERMISSION = 0x0000_0040;
        const GRANT_PREFIX_URI_PERMISSION = 0x0000_0080;
        const ACTIVITY_CLEAR_TASK = 0x0000_8000;
        const ACTIVITY_CLEAR_TOP = 0x0400_0000;
        const ACTIVITY_MULTIPLE_TASK = 0x0800_0000;
        const ACTIVITY_NEW_TASK = 0x1000_0000;
        const ACTIVITY_SINGLE_TOP = 0x2000_0000;
        const ACTIVITY_NO_HISTORY = 0x4000_0000;
    }
}

impl IntentFlags {
    /// Every flag that asks for a URI permission grant on dispatch
    pub const URI_GRANT_MASK: IntentFlags = IntentFlags::GRANT_READ_URI_PERMISSION
        .union(IntentFlags::GRANT_WRITE_URI_PERMISSION)
        .union(IntentFlags::GRANT_PERSISTABLE_URI_PERMISSION)
        .union(IntentFlags::GRANT_PREFIX_URI_PERMISSION);

    /// Grant-related subset of these flags
    pub fn uri_grant_flags(&self) -> IntentFlags {
        self.intersection(Self::URI_GRANT_MASK)
    }

    /// True when a read or write grant is requested
    pub fn requests_uri_grant(&self) -> bool {
        self.intersects(IntentFlags::GRANT_READ_URI_PERMISSION | IntentFlags::GRANT_WRITE_URI_PERMISSION)
    }
}

bitflags! {
    /// Fields a merge may overwrite even when already set
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct FillInFlags: u32 {
        const ACTION = 0x001;
        const DATA = 0x002;
        const CATEGORIES = 0x004;
        const COMPONENT = 0x008;
        const PACKAGE = 0x010;
        const SOURCE_BOUNDS = 0x020;
        const SELECTOR = 0x040;
        const CLIP_DATA = 0x080;
        const IDENTIFIER = 0x100;
    }
}

bitflags! {
    /// Options for the textual descriptor form
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct UriFlags: u32 {
        /// Use the `intent:` scheme
        const INTENT_SCHEME = 0x1;
        /// Use the `android-app:` scheme
        const ANDROID_APP_SCHEME = 0x2;
        /// Accept selectors and other unsafe fields when parsing
        const ALLOW_UNSAFE = 0x4;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grant_mask() {
        let flags = IntentFlags::ACTIVITY_NEW_TASK
            | IntentFlags::GRANT_READ_URI_PERMISSION
            | IntentFlags::GRANT_PREFIX_URI_PERMISSION;
        assert_eq!(
            flags.uri_grant_flags(),
            IntentFlags::GRANT_READ_URI_PERMISSION | IntentFlags::GRANT_PREFIX_URI_PERMISSION
        );
        assert!(flags.requests_uri_grant());
        assert!(!IntentFlags::GRANT_PREFIX_URI_PERMISSION.requests_uri_grant());
    }

    #[test]
    fn test_platform_values() {
        assert_eq!(FillInFlags::IDENTIFIER.bits(), 256);
        assert_eq!(IntentFlags::GRANT_PERSISTABLE_URI_PERMISSION.bits(), 64);
    }
}
