//! R-Droid Content
//!
//! URI permission grants and the content access gateway: calling
//! identities, the grant table and its durable store, grant propagation on
//! dispatch, the provider contract and the enforcing resolver.

pub mod identity;
pub mod grant;
pub mod store;
pub mod authority;
pub mod propagation;
pub mod query_args;
pub mod cursor;
pub mod provider;
pub mod content_resolver;

pub use identity::{Identity, ROOT_UID, SYSTEM_UID};
pub use grant::{GrantFlags, GrantKey, ModeFlags, PersistedGrant, UriGrant};
pub use store::{GrantStore, JsonGrantStore, MemoryGrantStore};
pub use authority::UriPermissionAuthority;
pub use cursor::{AssetStream, Row, RowStream};
pub use provider::{ContentProvider, ContentValues, FileMode, ProviderInfo};
pub use content_resolver::ContentResolver;
