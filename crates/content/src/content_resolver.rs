//! Enforcing front end of the gateway
//!
//! Every operation names the calling identity explicitly. The resolver
//! checks the required mode with the permission authority, then hands the
//! request to the provider registered for the URI's authority.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use r_droid_core::{RDroidError, Result};
use r_droid_intent::{Bundle, TypeResolver, Uri};

use crate::authority::UriPermissionAuthority;
use crate::cursor::{AssetStream, RowStream};
use crate::grant::{ModeFlags, PersistedGrant};
use crate::identity::Identity;
use crate::provider::{ContentProvider, ContentValues, FileMode, ProviderInfo};

struct Installed {
    info: ProviderInfo,
    provider: Arc<dyn ContentProvider>,
}

/// Routes gateway calls to providers after checking access
pub struct ContentResolver {
    authority: Arc<UriPermissionAuthority>,
    providers: RwLock<HashMap<String, Installed>>,
}

impl ContentResolver {
    pub fn new(authority: Arc<UriPermissionAuthority>) -> Self {
        Self {
            authority,
            providers: RwLock::new(HashMap::new()),
        }
    }

    pub fn permissions(&self) -> &Arc<UriPermissionAuthority> {
        &self.authority
    }

    /// Create `provider` and serve it under `info.authority`
    pub fn install_provider(&self, info: ProviderInfo, provider: Arc<dyn ContentProvider>) -> Result<()> {
        if self.providers.read().contains_key(&info.authority) {
            return Err(RDroidError::InvalidState(format!(
                "authority {} is already installed",
                info.authority
            )));
        }

        provider.on_create()?;
        self.authority.register_provider(&info);
        info!("Installed provider {} for {}", info.authority, info.package);
        self.providers
            .write()
            .insert(info.authority.clone(), Installed { info, provider });
        Ok(())
    }

    /// Stop serving `authority`; grants on it stay in the table
    pub fn remove_provider(&self, authority: &str) -> Option<ProviderInfo> {
        let installed = self.providers.write().remove(authority)?;
        self.authority.unregister_provider(authority);
        installed.provider.shutdown();
        info!("Removed provider {}", authority);
        Some(installed.info)
    }

    pub fn provider_info(&self, authority: &str) -> Option<ProviderInfo> {
        self.providers.read().get(authority).map(|p| p.info.clone())
    }

    pub fn authorities(&self) -> Vec<String> {
        let mut authorities: Vec<String> = self.providers.read().keys().cloned().collect();
        authorities.sort();
        authorities
    }

    // Reads

    pub fn query(
        &self,
        caller: &Identity,
        uri: &Uri,
        projection: Option<&[String]>,
        args: &Bundle,
        cancel: &CancellationToken,
    ) -> Result<RowStream> {
        check_cancelled(cancel)?;
        let provider = self.acquire(caller, uri, ModeFlags::READ)?;
        let rows = provider.query(uri, projection, args, cancel)?;
        Ok(rows.with_cancellation(cancel.clone()))
    }

    /// Type of the data at `uri`; needs no grant
    pub fn get_type(&self, uri: &Uri) -> Option<String> {
        let provider = self.provider_for(uri).ok()?;
        provider.get_type(uri)
    }

    pub fn get_stream_types(&self, caller: &Identity, uri: &Uri, mime_filter: &str) -> Result<Vec<String>> {
        let provider = self.acquire(caller, uri, ModeFlags::READ)?;
        Ok(provider.get_stream_types(uri, mime_filter))
    }

    /// Open a byte stream; `mode` is one of `r`, `w`, `wa`, `wt`, `rw`, `rwt`
    pub fn open_file(
        &self,
        caller: &Identity,
        uri: &Uri,
        mode: &str,
        cancel: &CancellationToken,
    ) -> Result<AssetStream> {
        let mode: FileMode = mode.parse()?;
        check_cancelled(cancel)?;
        let provider = self.acquire(caller, uri, mode.required_access())?;
        let stream = provider.open_file(uri, mode, cancel)?;
        Ok(stream.with_cancellation(cancel.clone()))
    }

    pub fn open_typed_asset_file(
        &self,
        caller: &Identity,
        uri: &Uri,
        mime_filter: &str,
        opts: &Bundle,
        cancel: &CancellationToken,
    ) -> Result<AssetStream> {
        check_cancelled(cancel)?;
        let provider = self.acquire(caller, uri, ModeFlags::READ)?;
        let stream = provider.open_typed_asset_file(uri, mime_filter, opts, cancel)?;
        Ok(stream.with_cancellation(cancel.clone()))
    }

    pub fn canonicalize(&self, caller: &Identity, uri: &Uri) -> Result<Option<Uri>> {
        let provider = self.acquire(caller, uri, ModeFlags::READ)?;
        Ok(provider.canonicalize(uri))
    }

    pub fn uncanonicalize(&self, caller: &Identity, uri: &Uri) -> Result<Uri> {
        let provider = self.acquire(caller, uri, ModeFlags::READ)?;
        Ok(provider.uncanonicalize(uri))
    }

    pub fn refresh(&self, caller: &Identity, uri: &Uri, args: &Bundle, cancel: &CancellationToken) -> Result<bool> {
        check_cancelled(cancel)?;
        let provider = self.acquire(caller, uri, ModeFlags::READ)?;
        Ok(provider.refresh(uri, args, cancel))
    }

    // Writes

    pub fn insert(&self, caller: &Identity, uri: &Uri, values: &ContentValues, extras: &Bundle) -> Result<Option<Uri>> {
        let provider = self.acquire(caller, uri, ModeFlags::WRITE)?;
        provider.insert(uri, values, extras)
    }

    pub fn bulk_insert(&self, caller: &Identity, uri: &Uri, values: &[ContentValues]) -> Result<usize> {
        let provider = self.acquire(caller, uri, ModeFlags::WRITE)?;
        provider.bulk_insert(uri, values)
    }

    pub fn update(&self, caller: &Identity, uri: &Uri, values: &ContentValues, args: &Bundle) -> Result<usize> {
        let provider = self.acquire(caller, uri, ModeFlags::WRITE)?;
        provider.update(uri, values, args)
    }

    pub fn delete(&self, caller: &Identity, uri: &Uri, args: &Bundle) -> Result<usize> {
        let provider = self.acquire(caller, uri, ModeFlags::WRITE)?;
        provider.delete(uri, args)
    }

    /// Provider-specific call; requires read access to the authority root
    pub fn call(
        &self,
        caller: &Identity,
        uri: &Uri,
        method: &str,
        arg: Option<&str>,
        extras: &Bundle,
    ) -> Result<Option<Bundle>> {
        let root = uri
            .authority_root()
            .ok_or_else(|| RDroidError::MalformedDescriptor(format!("{} has no authority", uri)))?;
        let provider = self.acquire(caller, &root, ModeFlags::READ)?;
        provider.call(method, arg, extras)
    }

    // Persistable grants

    pub fn take_persistable_uri_permission(&self, caller: &Identity, uri: &Uri, mode: ModeFlags) -> Result<()> {
        self.authority.take_persistable(caller, uri, mode)
    }

    pub fn release_persistable_uri_permission(&self, caller: &Identity, uri: &Uri, mode: ModeFlags) -> Result<()> {
        self.authority.release_persistable(caller, uri, mode)
    }

    pub fn persisted_uri_permissions(&self, caller: &Identity) -> Vec<PersistedGrant> {
        self.authority.persisted_uri_permissions(caller.uid)
    }

    pub fn outgoing_persisted_uri_permissions(&self, caller: &Identity) -> Vec<PersistedGrant> {
        self.authority.outgoing_persisted_uri_permissions(caller.uid)
    }

    fn provider_for(&self, uri: &Uri) -> Result<Arc<dyn ContentProvider>> {
        if !uri.is_content() {
            return Err(RDroidError::MalformedDescriptor(format!("not a content URI: {}", uri)));
        }
        let authority = uri.authority().unwrap_or_default();
        self.providers
            .read()
            .get(authority)
            .map(|p| Arc::clone(&p.provider))
            .ok_or_else(|| RDroidError::NotFound(format!("no provider for authority {:?}", authority)))
    }

    /// Look up the provider and enforce `mode` for `caller`
    fn acquire(&self, caller: &Identity, uri: &Uri, mode: ModeFlags) -> Result<Arc<dyn ContentProvider>> {
        let provider = self.provider_for(uri)?;
        if !self.authority.check(caller, uri, mode) {
            warn!("Denied {} access to {} for {}", mode.describe(), uri, caller);
            return Err(RDroidError::PermissionDenied(format!(
                "{} requires {} access to {}",
                caller,
                mode.describe(),
                uri
            )));
        }
        debug!("Granted {} access to {} for {}", mode.describe(), uri, caller);
        Ok(provider)
    }
}

impl TypeResolver for ContentResolver {
    fn resolve_type(&self, uri: &Uri) -> Option<String> {
        self.get_type(uri)
    }
}

fn check_cancelled(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(RDroidError::CancellationRequested);
    }
    Ok(())
}
