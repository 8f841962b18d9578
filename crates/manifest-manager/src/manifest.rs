//! Android Manifest Data Structures
//!
//! The parts of AndroidManifest.xml that matter for routing: the package,
//! its components with their intent filters, and its providers.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use r_droid_content::ProviderInfo;
use r_droid_core::Result;
use r_droid_intent::{actions, categories, FilterRegistry, HandlerInfo};

use crate::components::{ManifestComponent, Provider};

/// Parsed manifest
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AndroidManifest {
    /// Package name (e.g., "com.example.app")
    pub package: String,

    /// Version code (integer)
    pub version_code: Option<u32>,

    /// Version name (string, e.g., "1.0.0")
    pub version_name: Option<String>,

    /// Minimum SDK version
    pub min_sdk: Option<u32>,

    /// Target SDK version
    pub target_sdk: Option<u32>,

    /// Application block
    pub application: Option<ManifestApplication>,
}

/// Application element
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ManifestApplication {
    /// Application class name
    pub name: Option<String>,

    /// Application label (@string/app_name or literal)
    pub label: Option<String>,

    /// Activities, activity aliases, services and receivers in document order
    pub components: Vec<ManifestComponent>,

    /// Content providers
    pub providers: Vec<Provider>,

    /// Metadata
    pub metadata: Vec<ManifestMetadata>,
}

/// Meta-data element
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ManifestMetadata {
    pub name: String,
    pub value: Option<String>,
    pub resource: Option<String>,
}

impl AndroidManifest {
    /// Create an empty manifest for `package`
    pub fn new(package: &str) -> Self {
        Self {
            package: package.to_string(),
            application: Some(ManifestApplication::default()),
            ..Default::default()
        }
    }

    pub fn components(&self) -> &[ManifestComponent] {
        self.application.as_ref().map_or(&[], |app| app.components.as_slice())
    }

    pub fn providers(&self) -> &[Provider] {
        self.application.as_ref().map_or(&[], |app| app.providers.as_slice())
    }

    /// Get the main activity
    pub fn main_activity(&self) -> Option<&ManifestComponent> {
        self.components().iter().find(|c| {
            c.intent_filters
                .iter()
                .any(|f| f.has_action(actions::MAIN) && f.has_category(categories::LAUNCHER))
        })
    }

    /// Registry entries for every activity, alias, service and receiver
    pub fn handlers(&self) -> Vec<HandlerInfo> {
        self.components().iter().map(|c| c.to_handler(&self.package)).collect()
    }

    /// Replace this package's handlers in `registry`
    pub fn install_into(&self, registry: &FilterRegistry) -> Result<()> {
        let handlers = self.handlers();
        debug!("Installing {} handlers from {}", handlers.len(), self.package);
        registry.install_package(&self.package, handlers)
    }

    /// Gateway metadata for the declared providers, owned by `owner_uid`
    pub fn provider_infos(&self, owner_uid: u32) -> Vec<ProviderInfo> {
        self.providers()
            .iter()
            .filter(|p| p.enabled)
            .flat_map(|p| p.to_provider_infos(&self.package, owner_uid))
            .collect()
    }

    /// Validate the manifest
    pub fn validate(&self) -> Vec<ManifestWarning> {
        let mut warnings = Vec::new();

        if self.package.is_empty() {
            warnings.push(ManifestWarning::Error("Package name is required".into()));
        }

        for component in self.components() {
            if component.exported.is_none() && !component.intent_filters.is_empty() {
                warnings.push(ManifestWarning::Warning(format!(
                    "{} '{}' has intent-filter but android:exported not specified",
                    component.kind.as_str(),
                    component.name
                )));
            }
            for (index, filter) in component.intent_filters.iter().enumerate() {
                if let Err(e) = filter.validate() {
                    warn!("Filter {} of {} is malformed: {}", index, component.name, e);
                    warnings.push(ManifestWarning::Error(format!(
                        "intent-filter {} of '{}' will never match: {}",
                        index, component.name, e
                    )));
                }
            }
        }

        for provider in self.providers() {
            if provider.authority_list().next().is_none() {
                warnings.push(ManifestWarning::Error(format!(
                    "provider '{}' declares no authorities",
                    provider.name
                )));
            }
        }

        warnings
    }
}

/// Manifest validation warning
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestWarning {
    Error(String),
    Warning(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use r_droid_intent::{ComponentKind, IntentData, IntentFilter};

    fn sample() -> AndroidManifest {
        let mut manifest = AndroidManifest::new("com.example.app");
        let app = manifest.application.as_mut().unwrap();
        app.components.push(ManifestComponent::launcher(".MainActivity"));

        let mut share = ManifestComponent::new(".ShareActivity", ComponentKind::Activity);
        share.intent_filters.push(IntentFilter::mime(actions::SEND, "image/*"));
        app.components.push(share);

        let mut provider = Provider::new(".NotesProvider", "com.example.notes");
        provider.grant_uri_permissions = Some(true);
        app.providers.push(provider);
        manifest
    }

    #[test]
    fn test_handlers_and_install() {
        let manifest = sample();
        assert_eq!(manifest.main_activity().unwrap().name, ".MainActivity");

        let registry = FilterRegistry::new();
        manifest.install_into(&registry).unwrap();
        let snapshot = registry.snapshot();
        assert_eq!(snapshot.handler_count(), 2);
        assert_eq!(snapshot.package_handlers("com.example.app").unwrap().len(), 2);
    }

    #[test]
    fn test_provider_infos() {
        let infos = sample().provider_infos(10_077);
        assert_eq!(infos.len(), 1);
        assert_eq!(infos[0].owner_uid, 10_077);
        assert_eq!(infos[0].class_name.as_deref(), Some("com.example.app.NotesProvider"));
        assert!(infos[0].grant_uri_permissions);
    }

    #[test]
    fn test_validate_flags_unexported_and_malformed() {
        let mut manifest = sample();
        let mut broken = ManifestComponent::new(".Broken", ComponentKind::Activity);
        broken.exported = Some(true);
        broken
            .intent_filters
            .push(IntentFilter::new(actions::VIEW).add_data(IntentData::mime("not a type")));
        manifest.application.as_mut().unwrap().components.push(broken);

        let warnings = manifest.validate();
        assert!(warnings
            .iter()
            .any(|w| matches!(w, ManifestWarning::Warning(m) if m.contains(".ShareActivity"))));
        assert!(warnings
            .iter()
            .any(|w| matches!(w, ManifestWarning::Error(m) if m.contains(".Broken"))));
    }
}
