//! Capability Descriptor
//!
//! The normalized representation of an action request: action, data
//! reference, MIME type, categories, explicit target, flags and extras.
//!
//! Filter identity ([`Intent::filter_equals`]) covers action, data, type,
//! component and categories. Extras, identifier, flags and selector never
//! take part in it.

use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeSet;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use r_droid_core::{RDroidError, Result};

use crate::bundle::{Bundle, Value};
use crate::clip::ClipData;
use crate::component::ComponentName;
use crate::flags::IntentFlags;
use crate::mime::normalize_mime_type;
use crate::uri::Uri;

/// Common intent actions
pub mod actions {
    pub const MAIN: &str = "android.intent.action.MAIN";
    pub const VIEW: &str = "android.intent.action.VIEW";
    pub const EDIT: &str = "android.intent.action.EDIT";
    pub const PICK: &str = "android.intent.action.PICK";
    pub const SEND: &str = "android.intent.action.SEND";
    pub const SEND_MULTIPLE: &str = "android.intent.action.SEND_MULTIPLE";
    pub const SENDTO: &str = "android.intent.action.SENDTO";
    pub const INSERT: &str = "android.intent.action.INSERT";
    pub const DELETE: &str = "android.intent.action.DELETE";
    pub const SEARCH: &str = "android.intent.action.SEARCH";
    pub const OPEN_DOCUMENT: &str = "android.intent.action.OPEN_DOCUMENT";
    pub const GET_CONTENT: &str = "android.intent.action.GET_CONTENT";
    pub const BOOT_COMPLETED: &str = "android.intent.action.BOOT_COMPLETED";
}

/// Common intent categories
pub mod categories {
    pub const DEFAULT: &str = "android.intent.category.DEFAULT";
    pub const BROWSABLE: &str = "android.intent.category.BROWSABLE";
    pub const LAUNCHER: &str = "android.intent.category.LAUNCHER";
    pub const HOME: &str = "android.intent.category.HOME";
    pub const OPENABLE: &str = "android.intent.category.OPENABLE";
    pub const ALTERNATIVE: &str = "android.intent.category.ALTERNATIVE";
}

/// Common extra keys
pub mod extras {
    pub const EXTRA_STREAM: &str = "android.intent.extra.STREAM";
    pub const EXTRA_TEXT: &str = "android.intent.extra.TEXT";
    pub const EXTRA_INTENT: &str = "android.intent.extra.INTENT";
}

/// Screen rectangle a request originated from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self { left, top, right, bottom }
    }

    /// `"left top right bottom"`
    pub fn flatten_to_string(&self) -> String {
        format!("{} {} {} {}", self.left, self.top, self.right, self.bottom)
    }

    pub fn unflatten_from_string(s: &str) -> Result<Self> {
        let parts: Vec<i32> = s
            .split_whitespace()
            .map(|p| p.parse::<i32>())
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| RDroidError::MalformedDescriptor(format!("bad bounds {:?}: {}", s, e)))?;
        match parts.as_slice() {
            [left, top, right, bottom] => Ok(Self::new(*left, *top, *right, *bottom)),
            _ => Err(RDroidError::MalformedDescriptor(format!("bad bounds {:?}", s))),
        }
    }
}

/// Lazily resolves the MIME type of a data reference
pub trait TypeResolver {
    /// MIME type of the resource behind `uri`, if it can be determined
    fn resolve_type(&self, uri: &Uri) -> Option<String>;
}

/// Resolver that never knows a type
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTypeResolver;

impl TypeResolver for NoTypeResolver {
    fn resolve_type(&self, _uri: &Uri) -> Option<String> {
        None
    }
}

/// Capability Descriptor
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    pub(crate) action: Option<String>,
    pub(crate) data: Option<Uri>,
    pub(crate) mime_type: Option<String>,
    pub(crate) identifier: Option<String>,
    pub(crate) categories: BTreeSet<String>,
    pub(crate) package: Option<String>,
    pub(crate) component: Option<ComponentName>,
    pub(crate) selector: Option<Box<Intent>>,
    pub(crate) flags: IntentFlags,
    pub(crate) extras: Bundle,
    pub(crate) clip_data: Option<ClipData>,
    pub(crate) source_bounds: Option<Rect>,
}

impl Intent {
    /// Create a descriptor for an action
    pub fn new(action: &str) -> Self {
        Self {
            action: Some(action.to_string()),
            ..Default::default()
        }
    }

    /// Create an explicit descriptor for a component
    pub fn explicit(component: ComponentName) -> Self {
        Self {
            component: Some(component),
            ..Default::default()
        }
    }

    /// Create a descriptor for an action on a data reference
    pub fn with_data(action: &str, data: Uri) -> Self {
        Self {
            action: Some(action.to_string()),
            data: Some(data),
            ..Default::default()
        }
    }

    // Accessors

    pub fn action(&self) -> Option<&str> {
        self.action.as_deref()
    }

    pub fn data(&self) -> Option<&Uri> {
        self.data.as_ref()
    }

    /// Scheme of the data reference
    pub fn scheme(&self) -> Option<&str> {
        self.data.as_ref().and_then(|d| d.scheme())
    }

    /// Explicitly set MIME type
    pub fn mime_type(&self) -> Option<&str> {
        self.mime_type.as_deref()
    }

    pub fn identifier(&self) -> Option<&str> {
        self.identifier.as_deref()
    }

    pub fn categories(&self) -> &BTreeSet<String> {
        &self.categories
    }

    pub fn has_category(&self, category: &str) -> bool {
        self.categories.contains(category)
    }

    pub fn package(&self) -> Option<&str> {
        self.package.as_deref()
    }

    pub fn component(&self) -> Option<&ComponentName> {
        self.component.as_ref()
    }

    pub fn selector(&self) -> Option<&Intent> {
        self.selector.as_deref()
    }

    pub fn flags(&self) -> IntentFlags {
        self.flags
    }

    pub fn extras(&self) -> &Bundle {
        &self.extras
    }

    pub fn extras_mut(&mut self) -> &mut Bundle {
        &mut self.extras
    }

    pub fn clip_data(&self) -> Option<&ClipData> {
        self.clip_data.as_ref()
    }

    pub fn source_bounds(&self) -> Option<Rect> {
        self.source_bounds
    }

    // Mutators

    pub fn set_action(&mut self, action: Option<&str>) -> &mut Self {
        self.action = action.map(str::to_string);
        self
    }

    /// Set the data reference, clearing any explicit type
    pub fn set_data(&mut self, data: Option<Uri>) -> &mut Self {
        self.data = data;
        self.mime_type = None;
        self
    }

    /// Set the data reference with a lower-cased scheme
    pub fn set_data_and_normalize(&mut self, data: Uri) -> &mut Self {
        self.set_data(Some(data.normalize_scheme()))
    }

    /// Set the explicit type, clearing any data reference
    pub fn set_type(&mut self, mime_type: Option<&str>) -> &mut Self {
        self.mime_type = mime_type.map(str::to_string);
        self.data = None;
        self
    }

    /// Set the explicit type after normalizing it
    pub fn set_type_and_normalize(&mut self, mime_type: Option<&str>) -> &mut Self {
        let normalized = mime_type.map(normalize_mime_type);
        self.set_type(normalized.as_deref())
    }

    /// Set both data and type in one call
    pub fn set_data_and_type(&mut self, data: Option<Uri>, mime_type: Option<&str>) -> &mut Self {
        self.data = data;
        self.mime_type = mime_type.map(str::to_string);
        self
    }

    /// Set both, normalizing the scheme and the type
    pub fn set_data_and_type_and_normalize(&mut self, data: Uri, mime_type: Option<&str>) -> &mut Self {
        let normalized = mime_type.map(normalize_mime_type);
        self.set_data_and_type(Some(data.normalize_scheme()), normalized.as_deref())
    }

    pub fn set_identifier(&mut self, identifier: Option<&str>) -> &mut Self {
        self.identifier = identifier.map(str::to_string);
        self
    }

    pub fn add_category(&mut self, category: &str) -> &mut Self {
        self.categories.insert(category.to_string());
        self
    }

    pub fn remove_category(&mut self, category: &str) -> &mut Self {
        self.categories.remove(category);
        self
    }

    /// Narrow resolution to one package.
    ///
    /// Fails when a selector is set: the selector already decides matching.
    pub fn set_package(&mut self, package: Option<&str>) -> Result<&mut Self> {
        if package.is_some() && self.selector.is_some() {
            return Err(RDroidError::InvalidState(
                "can't set package name when selector is already set".into(),
            ));
        }
        self.package = package.map(str::to_string);
        Ok(self)
    }

    /// Set the descriptor used in place of this one for matching.
    ///
    /// Fails when a package is already set.
    pub fn set_selector(&mut self, selector: Option<Intent>) -> Result<&mut Self> {
        if selector.is_some() && self.package.is_some() {
            return Err(RDroidError::InvalidState(
                "can't set selector when package name is already set".into(),
            ));
        }
        self.selector = selector.map(Box::new);
        Ok(self)
    }

    pub fn set_component(&mut self, component: Option<ComponentName>) -> &mut Self {
        self.component = component;
        self
    }

    pub fn set_class_name(&mut self, package: &str, class: &str) -> &mut Self {
        self.set_component(Some(ComponentName::new(package, class)))
    }

    pub fn set_flags(&mut self, flags: IntentFlags) -> &mut Self {
        self.flags = flags;
        self
    }

    pub fn add_flags(&mut self, flags: IntentFlags) -> &mut Self {
        self.flags |= flags;
        self
    }

    pub fn remove_flags(&mut self, flags: IntentFlags) -> &mut Self {
        self.flags.remove(flags);
        self
    }

    pub fn put_extra(&mut self, key: &str, value: impl Into<Value>) -> &mut Self {
        self.extras.put(key, value);
        self
    }

    pub fn set_clip_data(&mut self, clip: Option<ClipData>) -> &mut Self {
        self.clip_data = clip;
        self
    }

    pub fn set_source_bounds(&mut self, bounds: Option<Rect>) -> &mut Self {
        self.source_bounds = bounds;
        self
    }

    /// Effective MIME type: the explicit type, else the type of `content:`
    /// data as reported by `resolver`
    pub fn resolve_type(&self, resolver: &dyn TypeResolver) -> Option<String> {
        if let Some(mime_type) = &self.mime_type {
            return Some(mime_type.clone());
        }
        match &self.data {
            Some(data) if data.is_content() => resolver.resolve_type(data),
            _ => None,
        }
    }

    /// Copy of the fields that take part in matching only
    pub fn clone_filter(&self) -> Intent {
        Intent {
            action: self.action.clone(),
            data: self.data.clone(),
            mime_type: self.mime_type.clone(),
            identifier: self.identifier.clone(),
            categories: self.categories.clone(),
            package: self.package.clone(),
            component: self.component.clone(),
            selector: self.selector.clone(),
            ..Default::default()
        }
    }

    /// Equality over action, data, type, component and categories
    pub fn filter_equals(&self, other: &Intent) -> bool {
        self.action == other.action
            && self.data == other.data
            && self.mime_type == other.mime_type
            && self.component == other.component
            && self.categories == other.categories
    }

    /// Hash consistent with [`Intent::filter_equals`]
    pub fn filter_hash_code(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.action.hash(&mut hasher);
        self.data.hash(&mut hasher);
        self.mime_type.hash(&mut hasher);
        self.component.hash(&mut hasher);
        self.categories.hash(&mut hasher);
        hasher.finish()
    }

    /// Descriptor used for matching: the selector when present
    pub fn matching_view(&self) -> &Intent {
        self.selector.as_deref().unwrap_or(self)
    }
}
