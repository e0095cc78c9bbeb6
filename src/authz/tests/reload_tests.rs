//! Hot reload of the rule file
//!
//! The rule file is rewritten under a running manager; a broken file must
//! deny every call until it is fixed again.

use sqlguard_authz::{
    AccessControlManager, FileBasedSystemAccessControl, Properties, INVALID_RULES_PREFIX, SECURITY_CONFIG_FILE,
    SECURITY_REFRESH_PERIOD,
};
use sqlguard_core::{CatalogSchemaTableName, Identity, TransactionId};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::NamedTempFile;

fn fixture(name: &str) -> String {
    format!("{}/tests/fixtures/{}", env!("CARGO_MANIFEST_DIR"), name)
}

fn install(fixture_name: &str, target: &Path) {
    fs::copy(fixture(fixture_name), target).unwrap();
}

fn reloading_manager(rules: &Path, refresh_period: &str) -> AccessControlManager {
    let manager = AccessControlManager::new();
    let mut properties = Properties::new();
    properties.insert(SECURITY_CONFIG_FILE.to_string(), rules.display().to_string());
    properties.insert(SECURITY_REFRESH_PERIOD.to_string(), refresh_period.to_string());
    manager
        .set_system_access_control(FileBasedSystemAccessControl::NAME, &properties)
        .unwrap();
    manager
}

fn alice_view() -> CatalogSchemaTableName {
    CatalogSchemaTableName::new("alice-catalog", "schema", "view")
}

// ============================================================================
// FAIL-CLOSED ROUND TRIP
// ============================================================================

#[test]
fn test_refreshing() {
    let rules = NamedTempFile::new().unwrap();
    install("catalog.json", rules.path());
    let manager = reloading_manager(rules.path(), "1ms");
    let alice = Identity::new("alice");
    let tx = TransactionId::new();

    for _ in 0..3 {
        manager.check_can_create_view(tx, &alice, &alice_view()).unwrap();
    }

    install("security-config-file-with-unknown-rules.json", rules.path());
    std::thread::sleep(Duration::from_millis(2));

    let err = manager.check_can_create_view(tx, &alice, &alice_view()).unwrap_err();
    assert!(err.is_invalid_rules());
    assert!(err.to_string().starts_with(INVALID_RULES_PREFIX));

    // The failure is not masked by anything cached from the good file
    let err = manager.check_can_create_view(tx, &alice, &alice_view()).unwrap_err();
    assert!(err.to_string().starts_with(INVALID_RULES_PREFIX));

    install("catalog.json", rules.path());
    std::thread::sleep(Duration::from_millis(2));

    manager.check_can_create_view(tx, &alice, &alice_view()).unwrap();
}

#[test]
fn test_filters_fail_closed_while_rules_are_broken() {
    let rules = NamedTempFile::new().unwrap();
    install("catalog.json", rules.path());
    let manager = reloading_manager(rules.path(), "1ms");
    let catalogs: BTreeSet<String> = ["alice-catalog", "open-to-all"].iter().map(|s| s.to_string()).collect();

    install("security-config-file-with-unknown-rules.json", rules.path());
    std::thread::sleep(Duration::from_millis(2));

    let err = manager
        .filter_catalogs(TransactionId::new(), &Identity::new("alice"), catalogs)
        .unwrap_err();
    assert!(err.is_invalid_rules());
}

#[test]
fn test_edits_are_ignored_within_refresh_period() {
    let rules = NamedTempFile::new().unwrap();
    install("catalog.json", rules.path());
    let manager = reloading_manager(rules.path(), "1h");
    let alice = Identity::new("alice");

    install("security-config-file-with-unknown-rules.json", rules.path());
    std::thread::sleep(Duration::from_millis(2));

    manager
        .check_can_create_view(TransactionId::new(), &alice, &alice_view())
        .unwrap();
}

#[test]
fn test_static_rules_ignore_edits() {
    let rules = NamedTempFile::new().unwrap();
    install("catalog.json", rules.path());

    let manager = AccessControlManager::new();
    let mut properties = Properties::new();
    properties.insert(SECURITY_CONFIG_FILE.to_string(), rules.path().display().to_string());
    manager
        .set_system_access_control(FileBasedSystemAccessControl::NAME, &properties)
        .unwrap();

    install("security-config-file-with-unknown-rules.json", rules.path());
    std::thread::sleep(Duration::from_millis(2));

    manager
        .check_can_create_view(TransactionId::new(), &Identity::new("alice"), &alice_view())
        .unwrap();
}

// ============================================================================
// CONCURRENT ACCESS
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_checks_during_reloads() {
    let rules = NamedTempFile::new().unwrap();
    install("catalog.json", rules.path());
    let manager = Arc::new(reloading_manager(rules.path(), "1ms"));

    let handles: Vec<_> = (0..32)
        .map(|i| {
            let manager = Arc::clone(&manager);
            tokio::task::spawn_blocking(move || {
                let user = if i % 2 == 0 { "alice" } else { "bob" };
                let allowed = manager
                    .check_can_create_view(TransactionId::new(), &Identity::new(user), &alice_view())
                    .is_ok();
                (user, allowed)
            })
        })
        .collect();

    for handle in handles {
        let (user, allowed) = handle.await.unwrap();
        assert_eq!(allowed, user == "alice", "user {}", user);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_checks_never_see_partial_rules() {
    let rules = NamedTempFile::new().unwrap();
    install("catalog.json", rules.path());
    let manager = Arc::new(reloading_manager(rules.path(), "1ms"));
    let path = rules.path().to_path_buf();

    let writer = tokio::task::spawn_blocking(move || {
        for i in 0..20 {
            let name = if i % 2 == 0 {
                "security-config-file-with-unknown-rules.json"
            } else {
                "catalog.json"
            };
            install(name, &path);
            std::thread::sleep(Duration::from_millis(2));
        }
        install("catalog.json", &path);
    });

    let readers: Vec<_> = (0..8)
        .map(|_| {
            let manager = Arc::clone(&manager);
            tokio::task::spawn_blocking(move || {
                for _ in 0..50 {
                    // bob never gains access, whatever state the file is in
                    let result =
                        manager.check_can_create_view(TransactionId::new(), &Identity::new("bob"), &alice_view());
                    assert!(result.is_err());
                }
            })
        })
        .collect();

    writer.await.unwrap();
    for reader in readers {
        reader.await.unwrap();
    }
}
