//! URI permission grants
//!
//! A grant is keyed by `(grantee uid, uri, prefix)`. Its mode is split into
//! three sets: transient bits that die with the grantee's session,
//! persistable bits the grantee may promote, and persisted bits that live in
//! the durable store.

use bitflags::bitflags;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use r_droid_intent::{IntentFlags, Uri};

bitflags! {
    /// Access modes on a URI
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct ModeFlags: u32 {
        const READ = 0x1;
        const WRITE = 0x2;
    }
}

impl ModeFlags {
    pub fn describe(&self) -> &'static str {
        match (self.contains(ModeFlags::READ), self.contains(ModeFlags::WRITE)) {
            (true, true) => "read/write",
            (true, false) => "read",
            (false, true) => "write",
            (false, false) => "no",
        }
    }
}

bitflags! {
    /// Options of one grant call; values match the descriptor grant flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct GrantFlags: u32 {
        const READ = 0x01;
        const WRITE = 0x02;
        const PERSISTABLE = 0x40;
        const PREFIX = 0x80;
    }
}

impl GrantFlags {
    /// Grant options carried by descriptor flags
    pub fn from_intent_flags(flags: IntentFlags) -> Self {
        Self::from_bits_truncate(flags.uri_grant_flags().bits())
    }

    pub fn from_mode(mode: ModeFlags) -> Self {
        Self::from_bits_truncate(mode.bits())
    }

    pub fn mode(&self) -> ModeFlags {
        ModeFlags::from_bits_truncate(self.bits())
    }

    pub fn is_prefix(&self) -> bool {
        self.contains(GrantFlags::PREFIX)
    }

    pub fn is_persistable(&self) -> bool {
        self.contains(GrantFlags::PERSISTABLE)
    }
}

/// Identity of a grant in the table
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GrantKey {
    pub grantee_uid: u32,
    pub uri: Uri,
    pub prefix: bool,
}

/// One grant record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UriGrant {
    pub uri: Uri,
    pub prefix: bool,
    pub grantee_uid: u32,
    pub grantor_uid: u32,
    /// Grantee pid whose exit drops the transient mode
    pub session_pid: Option<u32>,
    pub transient_mode: ModeFlags,
    pub persistable_mode: ModeFlags,
    pub persisted_mode: ModeFlags,
    pub granted_at: DateTime<Utc>,
    pub persisted_at: Option<DateTime<Utc>>,
}

impl UriGrant {
    pub fn new(key: &GrantKey, grantor_uid: u32) -> Self {
        Self {
            uri: key.uri.clone(),
            prefix: key.prefix,
            grantee_uid: key.grantee_uid,
            grantor_uid,
            session_pid: None,
            transient_mode: ModeFlags::empty(),
            persistable_mode: ModeFlags::empty(),
            persisted_mode: ModeFlags::empty(),
            granted_at: Utc::now(),
            persisted_at: None,
        }
    }

    pub fn key(&self) -> GrantKey {
        GrantKey {
            grantee_uid: self.grantee_uid,
            uri: self.uri.clone(),
            prefix: self.prefix,
        }
    }

    /// Modes currently usable for access
    pub fn effective_mode(&self) -> ModeFlags {
        self.transient_mode | self.persisted_mode
    }

    /// True once no mode is held or promotable
    pub fn is_empty(&self) -> bool {
        self.effective_mode().is_empty() && self.persistable_mode.is_empty()
    }

    /// Whether this grant's scope includes `uri`
    pub fn covers(&self, uri: &Uri) -> bool {
        if self.prefix {
            uri.is_path_prefix_match(&self.uri)
        } else {
            &self.uri == uri
        }
    }

    pub fn to_persisted(&self) -> Option<PersistedGrant> {
        if self.persisted_mode.is_empty() {
            return None;
        }
        Some(PersistedGrant {
            uri: self.uri.clone(),
            prefix: self.prefix,
            grantee_uid: self.grantee_uid,
            grantor_uid: self.grantor_uid,
            mode: self.persisted_mode,
            persisted_at: self.persisted_at.unwrap_or(self.granted_at),
        })
    }

    pub(crate) fn from_persisted(persisted: &PersistedGrant) -> Self {
        Self {
            uri: persisted.uri.clone(),
            prefix: persisted.prefix,
            grantee_uid: persisted.grantee_uid,
            grantor_uid: persisted.grantor_uid,
            session_pid: None,
            transient_mode: ModeFlags::empty(),
            persistable_mode: persisted.mode,
            persisted_mode: persisted.mode,
            granted_at: persisted.persisted_at,
            persisted_at: Some(persisted.persisted_at),
        }
    }
}

/// Durable form of a persisted grant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedGrant {
    pub uri: Uri,
    #[serde(default)]
    pub prefix: bool,
    pub grantee_uid: u32,
    pub grantor_uid: u32,
    pub mode: ModeFlags,
    pub persisted_at: DateTime<Utc>,
}

impl PersistedGrant {
    pub fn is_read(&self) -> bool {
        self.mode.contains(ModeFlags::READ)
    }

    pub fn is_write(&self) -> bool {
        self.mode.contains(ModeFlags::WRITE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn key(uri: &str, prefix: bool) -> GrantKey {
        GrantKey {
            grantee_uid: 10_001,
            uri: Uri::parse(uri).unwrap(),
            prefix,
        }
    }

    #[test]
    fn test_flags_from_intent() {
        let flags = IntentFlags::GRANT_READ_URI_PERMISSION
            | IntentFlags::GRANT_PREFIX_URI_PERMISSION
            | IntentFlags::ACTIVITY_NEW_TASK;
        let grant = GrantFlags::from_intent_flags(flags);
        assert_eq!(grant, GrantFlags::READ | GrantFlags::PREFIX);
        assert_eq!(grant.mode(), ModeFlags::READ);
        assert!(grant.is_prefix());
    }

    #[test]
    fn test_covers() {
        let exact = UriGrant::new(&key("content://media/images/1", false), 10_000);
        assert!(exact.covers(&Uri::parse("content://media/images/1").unwrap()));
        assert!(!exact.covers(&Uri::parse("content://media/images/1/thumb").unwrap()));

        let prefix = UriGrant::new(&key("content://media/images", true), 10_000);
        assert!(prefix.covers(&Uri::parse("content://media/images/1/thumb").unwrap()));
        assert!(!prefix.covers(&Uri::parse("content://media/imagesX").unwrap()));
        assert!(!prefix.covers(&Uri::parse("content://other/images/1").unwrap()));
    }

    #[test]
    fn test_persisted_roundtrip_through_json() {
        let mut grant = UriGrant::new(&key("content://notes/1", false), 10_000);
        grant.persisted_mode = ModeFlags::READ;
        grant.persistable_mode = ModeFlags::READ | ModeFlags::WRITE;

        let persisted = grant.to_persisted().unwrap();
        let json = serde_json::to_string(&persisted).unwrap();
        let back: PersistedGrant = serde_json::from_str(&json).unwrap();
        assert_eq!(back, persisted);

        let restored = UriGrant::from_persisted(&back);
        assert_eq!(restored.effective_mode(), ModeFlags::READ);
        assert!(restored.transient_mode.is_empty());
    }

    #[test]
    fn test_empty_record() {
        let grant = UriGrant::new(&key("content://notes/1", false), 10_000);
        assert!(grant.is_empty());
        assert!(grant.to_persisted().is_none());
    }

    proptest! {
        #[test]
        fn prefix_grant_covers_every_descendant(
            base in proptest::collection::vec("[a-z0-9]{1,8}", 0..4),
            rest in proptest::collection::vec("[a-z0-9]{1,8}", 0..4),
        ) {
            let root = format!("content://media/{}", base.join("/"));
            let grant = UriGrant::new(&key(root.trim_end_matches('/'), true), 10_000);
            let mut child = base.clone();
            child.extend(rest);
            let target = Uri::parse(&format!("content://media/{}", child.join("/"))).unwrap();
            prop_assert!(grant.covers(&target));
        }
    }
}
