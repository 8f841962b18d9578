//! URI Permission Authority
//!
//! Owns the grant table. The table is split into shards keyed by the hash
//! of `(scheme, authority)`, so every grant that can cover a given URI
//! (exact or prefix) lives in the same shard as that URI. Operations on one
//! URI are linearizable under its shard lock while unrelated authorities
//! never contend.
//!
//! `check` is a pure function of the caller, the URI, the mode and the
//! table: owner access first, then an exact grant, then prefix grants.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use r_droid_core::config::PermissionConfig;
use r_droid_core::{Event, EventBus, RDroidError, Result};
use r_droid_intent::Uri;

use crate::grant::{GrantFlags, GrantKey, ModeFlags, PersistedGrant, UriGrant};
use crate::identity::Identity;
use crate::provider::ProviderInfo;
use crate::store::GrantStore;

#[derive(Default)]
struct Shard {
    grants: HashMap<GrantKey, UriGrant>,
}

/// Grants, revokes, persists and checks URI access
pub struct UriPermissionAuthority {
    shards: Vec<RwLock<Shard>>,
    providers: RwLock<HashMap<String, ProviderInfo>>,
    store: Arc<dyn GrantStore>,
    /// Serializes snapshot-and-save so saves land in order
    persist_lock: Mutex<()>,
    prefix_grants_enabled: bool,
    max_persisted_per_grantee: usize,
    event_bus: Option<Arc<EventBus>>,
}

impl UriPermissionAuthority {
    /// Create an empty authority backed by `store`
    pub fn new(config: &PermissionConfig, store: Arc<dyn GrantStore>) -> Self {
        let shards = (0..config.effective_shard_count())
            .map(|_| RwLock::new(Shard::default()))
            .collect();

        Self {
            shards,
            providers: RwLock::new(HashMap::new()),
            store,
            persist_lock: Mutex::new(()),
            prefix_grants_enabled: config.prefix_grants_enabled,
            max_persisted_per_grantee: config.max_persisted_per_grantee.max(1),
            event_bus: None,
        }
    }

    /// Create an authority and restore persisted grants from `store`
    pub fn load(config: &PermissionConfig, store: Arc<dyn GrantStore>) -> Result<Self> {
        let authority = Self::new(config, store);
        let persisted = authority.store.load()?;

        for record in &persisted {
            let grant = UriGrant::from_persisted(record);
            authority.shard_for(&grant.uri).write().grants.insert(grant.key(), grant);
        }

        info!("Restored {} persisted URI grants", persisted.len());
        Ok(authority)
    }

    pub fn with_event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    // Providers

    /// Record the owner and grant policy of a provider authority
    pub fn register_provider(&self, info: &ProviderInfo) {
        debug!("Registering provider {} owned by uid {}", info.authority, info.owner_uid);
        self.providers.write().insert(info.authority.clone(), info.clone());
    }

    pub fn unregister_provider(&self, authority: &str) -> Option<ProviderInfo> {
        self.providers.write().remove(authority)
    }

    pub fn provider(&self, authority: &str) -> Option<ProviderInfo> {
        self.providers.read().get(authority).cloned()
    }

    // Checks

    /// Whether `caller` may use `uri` with every bit of `mode`
    pub fn check(&self, caller: &Identity, uri: &Uri, mode: ModeFlags) -> bool {
        if mode.is_empty() {
            return true;
        }
        if self.holds_owner_access(caller, uri) {
            return true;
        }
        if !uri.is_content() {
            return false;
        }

        let shard = self.shard_for(uri).read();
        let exact = GrantKey {
            grantee_uid: caller.uid,
            uri: uri.clone(),
            prefix: false,
        };
        let mut held = shard
            .grants
            .get(&exact)
            .map(UriGrant::effective_mode)
            .unwrap_or_default();
        if held.contains(mode) {
            return true;
        }

        if self.prefix_grants_enabled {
            for grant in shard.grants.values() {
                if grant.prefix && grant.grantee_uid == caller.uid && grant.covers(uri) {
                    held |= grant.effective_mode();
                    if held.contains(mode) {
                        return true;
                    }
                }
            }
        }
        false
    }

    /// Same-uid ownership of the provider, or a privileged uid
    pub fn holds_owner_access(&self, caller: &Identity, uri: &Uri) -> bool {
        if caller.is_privileged() {
            return true;
        }
        match uri.authority() {
            Some(authority) if uri.is_content() => self
                .providers
                .read()
                .get(authority)
                .map_or(false, |provider| provider.owner_uid == caller.uid),
            _ => false,
        }
    }

    // Grants

    /// Non-persistable grant of `mode` on `uri` (or everything beneath it when `prefix`)
    pub fn grant(
        &self,
        grantor: &Identity,
        uri: &Uri,
        mode: ModeFlags,
        grantee: &Identity,
        prefix: bool,
    ) -> Result<UriGrant> {
        let mut flags = GrantFlags::from_mode(mode);
        if prefix {
            flags |= GrantFlags::PREFIX;
        }
        self.grant_with_flags(grantor, uri, flags, grantee)
    }

    /// General grant form, accepting the persistable and prefix options
    pub fn grant_with_flags(
        &self,
        grantor: &Identity,
        uri: &Uri,
        flags: GrantFlags,
        grantee: &Identity,
    ) -> Result<UriGrant> {
        let mode = flags.mode();
        if mode.is_empty() {
            return Err(RDroidError::InvalidState("grant requires read or write mode".into()));
        }
        if !uri.is_content() {
            return Err(RDroidError::MalformedDescriptor(format!(
                "can only grant access to content URIs, not {}",
                uri
            )));
        }

        let authority = uri.authority().unwrap_or_default();
        let provider = self
            .provider(authority)
            .ok_or_else(|| RDroidError::NotFound(format!("no provider for authority {:?}", authority)))?;

        if !provider.grant_uri_permissions && !grantor.is_privileged() {
            return Err(RDroidError::PermissionDenied(format!(
                "provider {} does not allow granting of URI permissions",
                provider.authority
            )));
        }
        if !self.check(grantor, uri, mode) {
            return Err(RDroidError::PermissionDenied(format!(
                "{} does not hold {} access to {}",
                grantor,
                mode.describe(),
                uri
            )));
        }

        let key = GrantKey {
            grantee_uid: grantee.uid,
            uri: uri.clone(),
            prefix: flags.is_prefix(),
        };
        let snapshot = {
            let mut shard = self.shard_for(uri).write();
            let grant = shard
                .grants
                .entry(key.clone())
                .or_insert_with(|| UriGrant::new(&key, grantor.uid));
            grant.grantor_uid = grantor.uid;
            grant.transient_mode |= mode;
            grant.session_pid = Some(grantee.pid);
            if flags.is_persistable() {
                grant.persistable_mode |= mode;
            }
            grant.clone()
        };

        debug!(
            "Granted {} on {}{} to uid {}",
            mode.describe(),
            uri,
            if key.prefix { " (prefix)" } else { "" },
            grantee.uid
        );
        self.emit(Event::UriPermissionGranted {
            uri: uri.to_string(),
            grantee_uid: grantee.uid,
            mode: mode.bits(),
        });
        Ok(snapshot)
    }

    /// Remove `mode` from grants on `uri` and every URI beneath it.
    ///
    /// With no grantee every grantee loses the mode. Returns the number of
    /// grants touched.
    pub fn revoke(&self, uri: &Uri, mode: ModeFlags, grantee: Option<&Identity>) -> usize {
        let mut touched = 0;
        let mut persisted_changed = false;
        {
            let mut shard = self.shard_for(uri).write();
            shard.grants.retain(|key, grant| {
                let in_scope = key.uri.is_path_prefix_match(uri);
                let for_grantee = grantee.map_or(true, |g| g.uid == key.grantee_uid);
                if !in_scope || !for_grantee || !grant.effective_mode().intersects(mode) {
                    return true;
                }

                touched += 1;
                if grant.persisted_mode.intersects(mode) {
                    persisted_changed = true;
                }
                grant.transient_mode.remove(mode);
                grant.persisted_mode.remove(mode);
                grant.persistable_mode.remove(mode);
                !grant.is_empty()
            });
        }

        if touched > 0 {
            debug!("Revoked {} on {} from {} grants", mode.describe(), uri, touched);
            self.emit(Event::UriPermissionRevoked {
                uri: uri.to_string(),
                grantee_uid: grantee.map(|g| g.uid),
                mode: mode.bits(),
            });
        }
        if persisted_changed {
            if let Err(e) = self.persist() {
                warn!("Failed to persist revocation on {}: {}", uri, e);
            }
        }
        touched
    }

    /// Promote the grantee's persistable grant on `uri` to durable storage.
    ///
    /// If the store cannot be written the promotion is rolled back.
    pub fn take_persistable(&self, grantee: &Identity, uri: &Uri, mode: ModeFlags) -> Result<()> {
        let now = Utc::now();
        let mut found = false;
        let mut previous = Vec::new();
        {
            let mut shard = self.shard_for(uri).write();
            for prefix in [false, true] {
                let key = GrantKey {
                    grantee_uid: grantee.uid,
                    uri: uri.clone(),
                    prefix,
                };
                if let Some(grant) = shard.grants.get_mut(&key) {
                    found = true;
                    if grant.persistable_mode.contains(mode) {
                        previous.push(grant.clone());
                        grant.persisted_mode |= mode;
                        grant.persisted_at = Some(now);
                    }
                }
            }
        }

        if !found {
            return Err(RDroidError::NotFound(format!(
                "no grant on {} for uid {}",
                uri, grantee.uid
            )));
        }
        if previous.is_empty() {
            return Err(RDroidError::PermissionDenied(format!(
                "no persistable {} grant on {} for uid {}",
                mode.describe(),
                uri,
                grantee.uid
            )));
        }

        previous.extend(self.evict_over_limit(grantee.uid));
        self.persist_or_restore(previous, "grant", uri)?;

        debug!("Persisted {} on {} for uid {}", mode.describe(), uri, grantee.uid);
        self.emit(Event::UriPermissionPersisted {
            uri: uri.to_string(),
            grantee_uid: grantee.uid,
            mode: mode.bits(),
        });
        Ok(())
    }

    /// Release a persisted grant; transient access on the same scope remains
    pub fn release_persistable(&self, grantee: &Identity, uri: &Uri, mode: ModeFlags) -> Result<()> {
        let mut previous = Vec::new();
        {
            let mut shard = self.shard_for(uri).write();
            for prefix in [false, true] {
                let key = GrantKey {
                    grantee_uid: grantee.uid,
                    uri: uri.clone(),
                    prefix,
                };
                let now_empty = match shard.grants.get_mut(&key) {
                    Some(grant) if grant.persisted_mode.intersects(mode) => {
                        previous.push(grant.clone());
                        grant.persisted_mode.remove(mode);
                        grant.persistable_mode.remove(mode);
                        if grant.persisted_mode.is_empty() {
                            grant.persisted_at = None;
                        }
                        grant.is_empty()
                    }
                    _ => false,
                };
                if now_empty {
                    shard.grants.remove(&key);
                }
            }
        }

        if previous.is_empty() {
            return Err(RDroidError::NotFound(format!(
                "no persisted {} grant on {} for uid {}",
                mode.describe(),
                uri,
                grantee.uid
            )));
        }

        self.persist_or_restore(previous, "release", uri)?;

        debug!("Released persisted {} on {} for uid {}", mode.describe(), uri, grantee.uid);
        self.emit(Event::UriPermissionReleased {
            uri: uri.to_string(),
            grantee_uid: grantee.uid,
            mode: mode.bits(),
        });
        Ok(())
    }

    /// Drop the transient mode of every grant whose session is `pid`.
    ///
    /// Persisted modes survive. Returns the number of records removed.
    pub fn on_process_exit(&self, pid: u32) -> usize {
        let mut removed = 0;
        for shard in &self.shards {
            let mut shard = shard.write();
            shard.grants.retain(|_, grant| {
                if grant.session_pid != Some(pid) {
                    return true;
                }
                grant.transient_mode = ModeFlags::empty();
                grant.session_pid = None;
                // Unpersisted promotable bits die with the session.
                grant.persistable_mode &= grant.persisted_mode;
                let keep = !grant.is_empty();
                if !keep {
                    removed += 1;
                }
                keep
            });
        }

        if removed > 0 {
            debug!("Process {} exited; dropped {} transient grants", pid, removed);
        }
        removed
    }

    // Queries

    /// Persisted grants held by `grantee_uid`, oldest first
    pub fn persisted_uri_permissions(&self, grantee_uid: u32) -> Vec<PersistedGrant> {
        self.collect_persisted(|grant| grant.grantee_uid == grantee_uid)
    }

    /// Persisted grants made by `grantor_uid`, oldest first
    pub fn outgoing_persisted_uri_permissions(&self, grantor_uid: u32) -> Vec<PersistedGrant> {
        self.collect_persisted(|grant| grant.grantor_uid == grantor_uid)
    }

    /// Every grant record held by `grantee_uid`
    pub fn grants_for(&self, grantee_uid: u32) -> Vec<UriGrant> {
        let mut grants: Vec<UriGrant> = self
            .shards
            .iter()
            .flat_map(|shard| {
                shard
                    .read()
                    .grants
                    .values()
                    .filter(|grant| grant.grantee_uid == grantee_uid)
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .collect();
        grants.sort_by(|a, b| a.uri.cmp(&b.uri).then(a.prefix.cmp(&b.prefix)));
        grants
    }

    fn collect_persisted<F>(&self, include: F) -> Vec<PersistedGrant>
    where
        F: Fn(&UriGrant) -> bool,
    {
        let mut persisted: Vec<PersistedGrant> = self
            .shards
            .iter()
            .flat_map(|shard| {
                shard
                    .read()
                    .grants
                    .values()
                    .filter(|grant| include(grant))
                    .filter_map(UriGrant::to_persisted)
                    .collect::<Vec<_>>()
            })
            .collect();
        persisted.sort_by(|a, b| a.persisted_at.cmp(&b.persisted_at).then_with(|| a.uri.cmp(&b.uri)));
        persisted
    }

    /// Release the oldest persisted grants of `grantee_uid` above the limit.
    ///
    /// Returns the evicted records as they were before eviction.
    fn evict_over_limit(&self, grantee_uid: u32) -> Vec<UriGrant> {
        let persisted = self.persisted_uri_permissions(grantee_uid);
        if persisted.len() <= self.max_persisted_per_grantee {
            return Vec::new();
        }

        let mut evicted = Vec::new();

        let excess = persisted.len() - self.max_persisted_per_grantee;
        for victim in persisted.iter().take(excess) {
            let key = GrantKey {
                grantee_uid,
                uri: victim.uri.clone(),
                prefix: victim.prefix,
            };
            let mut shard = self.shard_for(&victim.uri).write();
            let now_empty = match shard.grants.get_mut(&key) {
                Some(grant) => {
                    evicted.push(grant.clone());
                    grant.persisted_mode = ModeFlags::empty();
                    grant.persistable_mode = ModeFlags::empty();
                    grant.persisted_at = None;
                    grant.is_empty()
                }
                None => false,
            };
            if now_empty {
                shard.grants.remove(&key);
            }
            debug!("Evicted persisted grant on {} for uid {}", victim.uri, grantee_uid);
        }
        evicted
    }

    fn persist(&self) -> Result<()> {
        let _guard = self.persist_lock.lock();
        let all = self.collect_persisted(|_| true);
        self.store.save(&all)
    }

    /// Save the table, putting the persisted state of `previous` back on failure
    fn persist_or_restore(&self, previous: Vec<UriGrant>, what: &str, uri: &Uri) -> Result<()> {
        self.persist().map_err(|e| {
            warn!("Failed to persist {} on {}: {}", what, uri, e);
            self.restore_persisted_state(previous);
            e
        })
    }

    fn restore_persisted_state(&self, previous: Vec<UriGrant>) {
        for prior in previous {
            let key = prior.key();
            let mut shard = self.shard_for(&prior.uri).write();
            match shard.grants.get_mut(&key) {
                Some(grant) => {
                    grant.persisted_mode = prior.persisted_mode;
                    grant.persistable_mode |= prior.persistable_mode;
                    grant.persisted_at = prior.persisted_at;
                }
                None => {
                    shard.grants.insert(key, prior);
                }
            }
        }
    }

    fn shard_for(&self, uri: &Uri) -> &RwLock<Shard> {
        let mut hasher = DefaultHasher::new();
        uri.scheme().hash(&mut hasher);
        uri.authority().hash(&mut hasher);
        let index = (hasher.finish() % self.shards.len() as u64) as usize;
        &self.shards[index]
    }

    fn emit(&self, event: Event) {
        if let Some(bus) = &self.event_bus {
            bus.emit(event);
        }
    }
}
