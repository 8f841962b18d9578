//! Grant propagation on dispatch
//!
//! When a descriptor that carries grant flags is delivered to a receiver,
//! the receiver is granted access to every `content:` URI the descriptor
//! reaches: its data, its clip items, and the data and clip items of
//! descriptors nested inside clip items. Only the outer descriptor's flags
//! count; flags on nested descriptors and anything in extras are ignored.

use std::collections::HashSet;

use tracing::debug;

use r_droid_core::Result;
use r_droid_intent::{Intent, Uri};

use crate::authority::UriPermissionAuthority;
use crate::grant::{GrantFlags, UriGrant};
use crate::identity::Identity;

impl UriPermissionAuthority {
    /// Grant `receiver` the access requested by `intent`'s grant flags.
    ///
    /// Stops at the first failing grant. Grants made before the failure are
    /// left in place; the caller decides whether to abort the dispatch.
    pub fn grant_for_dispatch(
        &self,
        caller: &Identity,
        intent: &Intent,
        receiver: &Identity,
    ) -> Result<Vec<UriGrant>> {
        let flags = GrantFlags::from_intent_flags(intent.flags());
        if flags.mode().is_empty() {
            return Ok(Vec::new());
        }

        let mut uris = Vec::new();
        collect_uris(intent, &mut uris);

        let mut seen = HashSet::new();
        let mut granted = Vec::new();
        for uri in uris {
            if !uri.is_content() {
                debug!("Not granting on non-content URI {}", uri);
                continue;
            }
            if !seen.insert(uri.clone()) {
                continue;
            }
            granted.push(self.grant_with_flags(caller, uri, flags, receiver)?);
        }

        debug!(
            "Dispatch granted {} URIs from {} to {}",
            granted.len(),
            caller,
            receiver
        );
        Ok(granted)
    }
}

fn collect_uris<'a>(intent: &'a Intent, out: &mut Vec<&'a Uri>) {
    if let Some(data) = intent.data() {
        out.push(data);
    }
    if let Some(clip) = intent.clip_data() {
        for item in &clip.items {
            if let Some(uri) = &item.uri {
                out.push(uri);
            }
            if let Some(nested) = &item.intent {
                collect_uris(nested, out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grant::ModeFlags;
    use crate::provider::ProviderInfo;
    use crate::store::MemoryGrantStore;
    use r_droid_core::config::PermissionConfig;
    use r_droid_intent::{actions, ClipData, ClipItem, IntentFlags};
    use std::sync::Arc;

    fn uri(s: &str) -> Uri {
        Uri::parse(s).unwrap()
    }

    fn setup() -> (UriPermissionAuthority, Identity, Identity) {
        let authority = UriPermissionAuthority::new(&PermissionConfig::default(), Arc::new(MemoryGrantStore::new()));
        authority.register_provider(&ProviderInfo::new("media", "com.example.media", 10_010).granting());
        (
            authority,
            Identity::new(10_010, 10, "com.example.media"),
            Identity::new(10_020, 20, "com.example.editor"),
        )
    }

    #[test]
    fn test_no_flags_no_grants() {
        let (authority, caller, receiver) = setup();
        let intent = Intent::with_data(actions::VIEW, uri("content://media/1"));
        assert!(authority.grant_for_dispatch(&caller, &intent, &receiver).unwrap().is_empty());
    }

    #[test]
    fn test_data_and_clip_deduplicated() {
        let (authority, caller, receiver) = setup();
        let mut intent = Intent::with_data(actions::SEND, uri("content://media/1"));
        let mut clip = ClipData::new_uri("media", uri("content://media/1"));
        clip.add_item(ClipItem::uri(uri("content://media/2")));
        clip.add_item(ClipItem::uri(uri("https://example.com/3")));
        intent.set_clip_data(Some(clip));
        intent.add_flags(IntentFlags::GRANT_READ_URI_PERMISSION);

        let granted = authority.grant_for_dispatch(&caller, &intent, &receiver).unwrap();
        assert_eq!(granted.len(), 2);
        assert!(authority.check(&receiver, &uri("content://media/2"), ModeFlags::READ));
        assert!(!authority.check(&receiver, &uri("content://media/2"), ModeFlags::WRITE));
    }
}
