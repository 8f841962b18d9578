//! Manifests on disk feeding the registry and the gateway.

use std::sync::Arc;

use tempfile::TempDir;

use r_droid_content::{Identity, MemoryGrantStore, ModeFlags, UriPermissionAuthority};
use r_droid_core::config::PermissionConfig;
use r_droid_core::RDroidError;
use r_droid_intent::{actions, categories, ComponentName, FilterRegistry, Intent, Resolver, Uri};
use r_droid_manifest_manager::ManifestParser;

const BROWSER: &str = r#"<manifest xmlns:android="http://schemas.android.com/apk/res/android" package="com.example.browser">
    <application>
        <activity android:name=".BrowserActivity" android:exported="true">
            <intent-filter>
                <action android:name="android.intent.action.VIEW"/>
                <category android:name="android.intent.category.DEFAULT"/>
                <category android:name="android.intent.category.BROWSABLE"/>
                <data android:scheme="http"/>
                <data android:scheme="https"/>
            </intent-filter>
        </activity>
    </application>
</manifest>"#;

const SHOP: &str = r#"<manifest xmlns:android="http://schemas.android.com/apk/res/android" package="com.example.shop">
    <application>
        <activity android:name=".ItemActivity" android:exported="true">
            <intent-filter android:priority="10">
                <action android:name="android.intent.action.VIEW"/>
                <category android:name="android.intent.category.DEFAULT"/>
                <category android:name="android.intent.category.BROWSABLE"/>
                <data android:scheme="https" android:host="*.shop.example" android:pathPrefix="/items"/>
            </intent-filter>
        </activity>
        <provider android:name=".CartProvider"
            android:authorities="com.example.shop.cart"
            android:grantUriPermissions="true"/>
    </application>
</manifest>"#;

async fn write_and_parse(dir: &TempDir, name: &str, xml: &str) -> r_droid_manifest_manager::AndroidManifest {
    let path = dir.path().join(name);
    tokio::fs::write(&path, xml).await.unwrap();
    ManifestParser::parse_file(&path).await.unwrap()
}

fn browse(url: &str) -> Intent {
    let mut intent = Intent::with_data(actions::VIEW, Uri::parse(url).unwrap());
    intent.add_category(categories::BROWSABLE);
    intent
}

#[tokio::test]
async fn priority_decides_between_installed_apps() {
    let dir = TempDir::new().unwrap();
    let registry = FilterRegistry::new();
    for (name, xml) in [("browser.xml", BROWSER), ("shop.xml", SHOP)] {
        write_and_parse(&dir, name, xml).await.install_into(&registry).unwrap();
    }
    let resolver = Resolver::without_type_resolver();

    let winner = resolver
        .resolve(&browse("https://www.shop.example/items/9"), &registry, true)
        .unwrap();
    assert_eq!(winner.component, ComponentName::new("com.example.shop", ".ItemActivity"));

    let all = resolver.query_intent_handlers(
        &browse("https://www.shop.example/items/9"),
        &registry.snapshot(),
        true,
        None,
    ).unwrap();
    assert_eq!(all.len(), 2);

    let elsewhere = resolver.resolve(&browse("https://news.example/today"), &registry, true).unwrap();
    assert_eq!(elsewhere.component.package, "com.example.browser");
}

#[tokio::test]
async fn reinstall_replaces_filters() {
    let dir = TempDir::new().unwrap();
    let registry = FilterRegistry::new();
    let shop = write_and_parse(&dir, "shop.xml", SHOP).await;
    shop.install_into(&registry).unwrap();
    let before = registry.generation();

    shop.install_into(&registry).unwrap();
    assert!(registry.generation() > before);
    assert_eq!(registry.snapshot().handler_count(), 1);

    assert!(registry.uninstall_package("com.example.shop"));
    assert!(matches!(
        Resolver::without_type_resolver().resolve(&browse("https://a.shop.example/items/1"), &registry, true),
        Err(RDroidError::NoMatchingHandler(_))
    ));
}

#[tokio::test]
async fn declared_providers_allow_grants() {
    let dir = TempDir::new().unwrap();
    let shop = write_and_parse(&dir, "shop.xml", SHOP).await;

    let authority = UriPermissionAuthority::new(&PermissionConfig::default(), Arc::new(MemoryGrantStore::new()));
    for info in shop.provider_infos(10_300) {
        authority.register_provider(&info);
    }

    let owner = Identity::new(10_300, 30, "com.example.shop");
    let browser = Identity::new(10_400, 40, "com.example.browser");
    let cart = Uri::parse("content://com.example.shop.cart/lines/1").unwrap();
    authority.grant(&owner, &cart, ModeFlags::READ, &browser, false).unwrap();
    assert!(authority.check(&browser, &cart, ModeFlags::READ));
}

#[tokio::test]
async fn missing_file_is_io_error() {
    let dir = TempDir::new().unwrap();
    let err: RDroidError = ManifestParser::parse_file(dir.path().join("absent.xml"))
        .await
        .unwrap_err()
        .into();
    assert!(matches!(err, RDroidError::Io(_)));
}
