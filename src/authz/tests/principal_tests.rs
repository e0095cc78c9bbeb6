//! Principal-to-user mapping through the file-based access control
//!
//! Covers `${USER}` substitution with usernames that are also regex syntax,
//! and checks that an escaped username can only ever match itself.

use proptest::prelude::*;
use sqlguard_authz::rules::{PrincipalUserMatcher, USER_PLACEHOLDER};
use sqlguard_authz::{AccessControlManager, FileBasedSystemAccessControl, Properties, SECURITY_CONFIG_FILE};

fn fixture(name: &str) -> String {
    format!("{}/tests/fixtures/{}", env!("CARGO_MANIFEST_DIR"), name)
}

fn manager_for(rules: &str) -> AccessControlManager {
    let manager = AccessControlManager::new();
    let mut properties = Properties::new();
    properties.insert(SECURITY_CONFIG_FILE.to_string(), fixture(rules));
    manager
        .set_system_access_control(FileBasedSystemAccessControl::NAME, &properties)
        .unwrap();
    manager
}

// ============================================================================
// SET USER
// ============================================================================

#[test]
fn test_set_user_requires_principal() {
    let manager = manager_for("catalog_principal.json");
    let err = manager.check_can_set_user(None, "alice").unwrap_err();
    assert!(err.is_access_denied());
}

#[test]
fn test_set_user_with_matching_principal() {
    let manager = manager_for("catalog_principal.json");

    manager.check_can_set_user(Some("alice/example.com@EXAMPLE.COM"), "alice").unwrap();
    manager
        .check_can_set_user(Some("\u{0194}\u{0194}\u{0194}/example.com@EXAMPLE.COM"), "\u{0194}\u{0194}\u{0194}")
        .unwrap();

    let err = manager
        .check_can_set_user(Some("mallory/example.com@EXAMPLE.COM"), "alice")
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Access Denied: Principal mallory/example.com@EXAMPLE.COM cannot become user alice"
    );
}

#[test]
fn test_set_user_with_shared_principal() {
    let manager = manager_for("catalog_principal.json");

    manager.check_can_set_user(Some("valid/example.com@EXAMPLE.COM"), "alice").unwrap();
    assert!(manager
        .check_can_set_user(Some("invalid/example.com@EXAMPLE.COM"), "alice")
        .is_err());
}

#[test]
fn test_first_applicable_rule_decides() {
    let manager = manager_for("catalog_principal.json");

    // mallory's own rule denies even though the catch-all rule below would match
    assert!(manager
        .check_can_set_user(Some("mallory/example.com@EXAMPLE.COM"), "mallory")
        .is_err());
}

#[test]
fn test_regex_syntax_in_username_is_literal() {
    let manager = manager_for("catalog_principal.json");

    manager.check_can_set_user(Some("special/.*@EXAMPLE.COM"), ".*").unwrap();
    manager.check_can_set_user(Some("special/\\E@EXAMPLE.COM"), "\\E").unwrap();

    // alice's rule is the first applicable one and does not match
    assert!(manager.check_can_set_user(Some("special/.*@EXAMPLE.COM"), "alice").is_err());
}

#[test]
fn test_no_principal_rules_allows_any_user() {
    let manager = manager_for("catalog.json");
    manager.check_can_set_user(Some("alice/example.com@EXAMPLE.COM"), "alice").unwrap();
    manager.check_can_set_user(None, "alice").unwrap();
}

// ============================================================================
// ESCAPING PROPERTIES
// ============================================================================

fn template_matcher() -> PrincipalUserMatcher {
    let json = format!(
        r#"[{{"principal_pattern": "{}@EXAMPLE\\.COM", "allow": true}}]"#,
        USER_PLACEHOLDER
    );
    serde_json::from_str(&json).unwrap()
}

proptest! {
    #[test]
    fn prop_escaped_username_matches_itself(user in "[ -~]{1,16}") {
        let matcher = template_matcher();
        let principal = format!("{}@EXAMPLE.COM", user);
        prop_assert!(matcher.validate(&user, Some(&principal)));
    }

    #[test]
    fn prop_escaped_username_matches_nothing_else(user in "[ -~]{1,16}", other in "[ -~]{1,16}") {
        prop_assume!(user != other);
        let matcher = template_matcher();
        let principal = format!("{}@EXAMPLE.COM", other);
        prop_assert!(!matcher.validate(&user, Some(&principal)));
    }
}
