//! Manifest component declarations
//!
//! Activities (and aliases), services, receivers and providers as declared
//! in the manifest, with conversions into registry handlers and gateway
//! provider metadata.

use serde::{Deserialize, Serialize};

use r_droid_content::ProviderInfo;
use r_droid_intent::{ComponentKind, ComponentName, HandlerInfo, IntentFilter};

use crate::manifest::ManifestMetadata;

/// Component that can declare intent filters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestComponent {
    /// Class name (.MainActivity or full package.Class)
    pub name: String,

    pub kind: ComponentKind,

    /// Display label
    pub label: Option<String>,

    /// Explicit `android:exported`
    pub exported: Option<bool>,

    /// `android:enabled`, true unless declared false
    pub enabled: bool,

    /// Target of an `<activity-alias>`
    pub target_activity: Option<String>,

    /// Intent filters
    pub intent_filters: Vec<IntentFilter>,

    /// Metadata
    pub metadata: Vec<ManifestMetadata>,
}

impl ManifestComponent {
    pub fn new(name: &str, kind: ComponentKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            label: None,
            exported: None,
            enabled: true,
            target_activity: None,
            intent_filters: Vec::new(),
            metadata: Vec::new(),
        }
    }

    /// Create a launcher activity (main entry point)
    pub fn launcher(name: &str) -> Self {
        let mut activity = Self::new(name, ComponentKind::Activity);
        activity.exported = Some(true);
        activity.intent_filters.push(IntentFilter::launcher());
        activity
    }

    pub fn is_alias(&self) -> bool {
        self.target_activity.is_some()
    }

    /// Check if this is the main launcher activity
    pub fn is_launcher(&self) -> bool {
        self.kind == ComponentKind::Activity && self.intent_filters.iter().any(|f| f.is_launcher())
    }

    /// Exported state, defaulting to "has intent filters" when not declared
    pub fn is_exported(&self) -> bool {
        self.exported.unwrap_or(!self.intent_filters.is_empty())
    }

    /// Registry entry for this component
    pub fn to_handler(&self, package: &str) -> HandlerInfo {
        HandlerInfo {
            component: ComponentName::new(package, &self.name),
            kind: self.kind,
            filters: self.intent_filters.clone(),
            enabled: self.enabled,
            exported: self.is_exported(),
        }
    }
}

/// Content Provider component
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Provider {
    /// Class name
    pub name: String,

    /// Semicolon-separated authorities
    pub authorities: String,

    /// Whether the provider is exported
    pub exported: Option<bool>,

    /// Enabled state
    pub enabled: bool,

    /// Grant URI permissions
    pub grant_uri_permissions: Option<bool>,

    /// Metadata
    pub metadata: Vec<ManifestMetadata>,
}

impl Provider {
    /// Create a new provider
    pub fn new(name: &str, authorities: &str) -> Self {
        Self {
            name: name.to_string(),
            authorities: authorities.to_string(),
            enabled: true,
            ..Default::default()
        }
    }

    /// Create a FileProvider
    pub fn file_provider(package: &str) -> Self {
        let mut provider = Self::new(
            "androidx.core.content.FileProvider",
            &format!("{}.fileprovider", package),
        );
        provider.exported = Some(false);
        provider.grant_uri_permissions = Some(true);
        provider.metadata.push(ManifestMetadata {
            name: "android.support.FILE_PROVIDER_PATHS".to_string(),
            value: None,
            resource: Some("@xml/file_paths".to_string()),
        });
        provider
    }

    pub fn authority_list(&self) -> impl Iterator<Item = &str> {
        self.authorities.split(';').map(str::trim).filter(|a| !a.is_empty())
    }

    /// One gateway entry per declared authority
    pub fn to_provider_infos(&self, package: &str, owner_uid: u32) -> Vec<ProviderInfo> {
        let class_name = ComponentName::full_class_name(package, &self.name);
        self.authority_list()
            .map(|authority| ProviderInfo {
                authority: authority.to_string(),
                package: package.to_string(),
                owner_uid,
                class_name: Some(class_name.clone()),
                exported: self.exported.unwrap_or(false),
                grant_uri_permissions: self.grant_uri_permissions.unwrap_or(false),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exported_defaults_to_having_filters() {
        let plain = ManifestComponent::new(".Settings", ComponentKind::Activity);
        assert!(!plain.is_exported());

        let launcher = ManifestComponent::launcher(".MainActivity");
        assert!(launcher.is_exported());
        assert!(launcher.is_launcher());

        let mut hidden = ManifestComponent::launcher(".Hidden");
        hidden.exported = Some(false);
        assert!(!hidden.is_exported());
    }

    #[test]
    fn test_handler_expands_class_name() {
        let handler = ManifestComponent::launcher(".MainActivity").to_handler("com.example.app");
        assert_eq!(handler.component.class, "com.example.app.MainActivity");
        assert_eq!(handler.kind, ComponentKind::Activity);
    }

    #[test]
    fn test_file_provider_infos() {
        let infos = Provider::file_provider("com.example.app").to_provider_infos("com.example.app", 10_050);
        assert_eq!(infos.len(), 1);
        assert_eq!(infos[0].authority, "com.example.app.fileprovider");
        assert!(infos[0].grant_uri_permissions);
        assert!(!infos[0].exported);
        assert_eq!(infos[0].class_name.as_deref(), Some("androidx.core.content.FileProvider"));
    }

    #[test]
    fn test_authorities_split() {
        let provider = Provider::new(".Data", "a.one; a.two;");
        let authorities: Vec<_> = provider.authority_list().collect();
        assert_eq!(authorities, vec!["a.one", "a.two"]);
    }
}
