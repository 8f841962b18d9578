//! R-Droid Intent
//!
//! Capability descriptors and their routing: URIs, MIME types, typed
//! extras, descriptor merge, the textual intent form, filter rules, the
//! filter registry and the resolver.

pub mod uri;
pub mod mime;
pub mod bundle;
pub mod component;
pub mod flags;
pub mod clip;
pub mod intent;
pub mod fill_in;
pub mod intent_uri;
pub mod pattern;
pub mod filter;
pub mod registry;
pub mod resolver;

pub use uri::Uri;
pub use bundle::{Bundle, Value};
pub use component::{ComponentKind, ComponentName};
pub use flags::{FillInFlags, IntentFlags, UriFlags};
pub use clip::{ClipData, ClipItem};
pub use intent::{actions, categories, extras, Intent, NoTypeResolver, Rect, TypeResolver};
pub use fill_in::fill_in;
pub use pattern::{PatternKind, PatternMatcher};
pub use filter::{IntentData, IntentFilter, MatchCategory, NoMatch};
pub use registry::{FilterRegistry, HandlerInfo, RegistrySnapshot};
pub use resolver::{Candidate, PreferredHandlers, Resolver};
