//! CLI commands for R-Droid Router
//!
//! Each command is a plain options struct with an `execute` method that
//! returns the text to print, so commands can be scripted and tested
//! without a terminal.

use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{debug, info};

use r_droid_content::{GrantStore, JsonGrantStore};
use r_droid_core::config::ResolverConfig;
use r_droid_intent::mime::{normalize_mime_type, validate_mime_type};
use r_droid_intent::{FilterRegistry, Intent, Resolver, UriFlags};
use r_droid_manifest_manager::ManifestParser;

fn parse_intent(text: &str) -> Result<Intent> {
    Intent::parse_uri(text, UriFlags::INTENT_SCHEME).with_context(|| format!("Cannot parse intent URI {:?}", text))
}

/// Resolve an intent against installed manifests
pub struct ResolveCommand {
    pub manifests: Vec<PathBuf>,
    pub intent_uri: String,
    pub mime_type: Option<String>,
    pub all: bool,
    pub resolver: ResolverConfig,
}

impl ResolveCommand {
    /// Execute the resolve command
    pub async fn execute(&self) -> Result<String> {
        let registry = FilterRegistry::new();
        for path in &self.manifests {
            let manifest = ManifestParser::parse_file(path)
                .await
                .with_context(|| format!("Failed to parse {:?}", path))?;
            for warning in manifest.validate() {
                debug!("{:?}: {:?}", path, warning);
            }
            manifest.install_into(&registry)?;
            info!("Installed {} from {:?}", manifest.package, path);
        }

        let mut intent = parse_intent(&self.intent_uri)?;
        if let Some(mime_type) = &self.mime_type {
            let data = intent.data().cloned();
            intent.set_data_and_type(data, Some(mime_type.as_str()));
        }

        let resolver = Resolver::without_type_resolver().with_config(&self.resolver);
        let mut out = String::new();
        if self.all {
            let candidates =
                resolver.query_intent_handlers(&intent, &registry.snapshot(), self.resolver.default_only, None)?;
            if candidates.is_empty() {
                out.push_str("no matching handlers\n");
            }
            for candidate in candidates {
                writeln!(
                    out,
                    "{}\t{}\tpriority={}\tmatch={:?}",
                    candidate.component.flatten_to_short_string(),
                    candidate.kind.as_str(),
                    candidate.priority,
                    candidate.match_category
                )?;
            }
        } else {
            let winner = resolver.resolve(&intent, &registry, self.resolver.default_only)?;
            writeln!(out, "{}", winner.component.flatten_to_short_string())?;
        }
        Ok(out)
    }
}

/// Show how an intent URI parses
pub struct InspectCommand {
    pub intent_uri: String,
}

impl InspectCommand {
    /// Execute the inspect command
    pub fn execute(&self) -> Result<String> {
        let intent = parse_intent(&self.intent_uri)?;
        let mut out = serde_json::to_string_pretty(&intent)?;
        out.push('\n');
        writeln!(out, "{}", intent.to_uri(UriFlags::INTENT_SCHEME)?)?;
        Ok(out)
    }
}

/// Normalize MIME types
pub struct MimeCommand {
    pub types: Vec<String>,
}

impl MimeCommand {
    /// Execute the mime command
    pub fn execute(&self) -> Result<String> {
        let mut out = String::new();
        for mime_type in &self.types {
            let normalized = normalize_mime_type(mime_type);
            match validate_mime_type(&normalized) {
                Ok(()) => writeln!(out, "{}", normalized)?,
                Err(e) => writeln!(out, "{}\tinvalid: {}", mime_type, e)?,
            }
        }
        Ok(out)
    }
}

/// List persisted grants from the grant store
pub struct GrantsCommand {
    pub store_path: PathBuf,
    pub uid: Option<u32>,
}

impl GrantsCommand {
    /// Execute the grants command
    pub fn execute(&self) -> Result<String> {
        let store = JsonGrantStore::new(&self.store_path);
        let grants = store
            .load()
            .with_context(|| format!("Failed to read grant store {:?}", self.store_path))?;

        let mut out = String::new();
        for grant in grants.iter().filter(|g| self.uid.map_or(true, |uid| g.grantee_uid == uid)) {
            writeln!(
                out,
                "{}{}\tuid={}\tfrom={}\t{}\t{}",
                grant.uri,
                if grant.prefix { " (prefix)" } else { "" },
                grant.grantee_uid,
                grant.grantor_uid,
                grant.mode.describe(),
                grant.persisted_at.to_rfc3339()
            )?;
        }
        if out.is_empty() {
            out.push_str("no persisted grants\n");
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const VIEWER: &str = r#"<manifest xmlns:android="http://schemas.android.com/apk/res/android" package="com.example.viewer">
        <application>
            <activity android:name=".PdfActivity" android:exported="true">
                <intent-filter>
                    <action android:name="android.intent.action.VIEW"/>
                    <category android:name="android.intent.category.DEFAULT"/>
                    <data android:scheme="https" android:host="docs.example" android:pathSuffix=".pdf"/>
                </intent-filter>
            </activity>
        </application>
    </manifest>"#;

    fn resolve(dir: &TempDir, uri: &str, all: bool) -> ResolveCommand {
        ResolveCommand {
            manifests: vec![dir.path().join("AndroidManifest.xml")],
            intent_uri: uri.to_string(),
            mime_type: None,
            all,
            resolver: ResolverConfig::default(),
        }
    }

    #[tokio::test]
    async fn test_resolve_command() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("AndroidManifest.xml"), VIEWER).unwrap();

        let out = resolve(&dir, "https://docs.example/a/report.pdf", false).execute().await.unwrap();
        assert_eq!(out, "com.example.viewer/.PdfActivity\n");

        let out = resolve(&dir, "https://docs.example/a/report.txt", true).execute().await.unwrap();
        assert_eq!(out, "no matching handlers\n");

        assert!(resolve(&dir, "https://docs.example/a/report.txt", false).execute().await.is_err());
    }

    #[test]
    fn test_mime_command() {
        let out = MimeCommand {
            types: vec!["Text/HTML; charset=utf-8".into(), "bogus".into()],
        }
        .execute()
        .unwrap();
        let lines: Vec<_> = out.lines().collect();
        assert_eq!(lines[0], "text/html");
        assert!(lines[1].starts_with("bogus\tinvalid"));
    }

    #[test]
    fn test_inspect_round_trips() {
        let out = InspectCommand {
            intent_uri: "intent://docs.example/a#Intent;scheme=https;package=com.example.viewer;end".into(),
        }
        .execute()
        .unwrap();
        let last = out.lines().last().unwrap();
        assert!(last.starts_with("intent://docs.example/a#Intent;"));
        assert!(last.contains("package=com.example.viewer"));
    }

    #[test]
    fn test_grants_command_empty_store() {
        let dir = TempDir::new().unwrap();
        let out = GrantsCommand {
            store_path: dir.path().join("uri_grants.json"),
            uid: Some(10_001),
        }
        .execute()
        .unwrap();
        assert_eq!(out, "no persisted grants\n");
    }
}
