//! Catalog rules and the catalog permission lattice

use serde::Deserialize;
use std::fmt;

use super::pattern::{matches_optional, RulePattern};

/// Access level granted on a catalog, ordered `None < ReadOnly < All`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Deserialize)]
#[serde(try_from = "PermissionValue")]
pub enum Permission {
    #[default]
    None,
    ReadOnly,
    All,
}

impl Permission {
    /// Whether holding `self` satisfies a requirement of `required`
    pub fn implies(self, required: Permission) -> bool {
        self >= required
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "none",
            Self::ReadOnly => "read-only",
            Self::All => "all",
        };
        f.write_str(name)
    }
}

/// Wire forms of a permission: a level name, or a boolean for older files
#[derive(Deserialize)]
#[serde(untagged)]
enum PermissionValue {
    Flag(bool),
    Level(String),
}

impl TryFrom<PermissionValue> for Permission {
    type Error = String;

    fn try_from(value: PermissionValue) -> Result<Self, Self::Error> {
        match value {
            PermissionValue::Flag(true) => Ok(Self::All),
            PermissionValue::Flag(false) => Ok(Self::None),
            PermissionValue::Level(level) => match level.as_str() {
                "none" => Ok(Self::None),
                "read-only" => Ok(Self::ReadOnly),
                "all" => Ok(Self::All),
                other => Err(format!(
                    "unknown catalog permission '{}', expected one of: none, read-only, all",
                    other
                )),
            },
        }
    }
}

/// Grants a permission level on the catalogs matching `catalog_pattern` to the
/// users matching `user_pattern`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogRule {
    #[serde(default, alias = "user")]
    user_pattern: Option<RulePattern>,

    #[serde(default, alias = "catalog")]
    catalog_pattern: Option<RulePattern>,

    #[serde(default)]
    allow: Permission,
}

impl CatalogRule {
    pub fn new(
        user_pattern: Option<RulePattern>,
        catalog_pattern: Option<RulePattern>,
        allow: Permission,
    ) -> Self {
        Self {
            user_pattern,
            catalog_pattern,
            allow,
        }
    }

    /// The granted permission, if this rule applies to `user` and `catalog`
    pub fn matches(&self, user: &str, catalog: &str) -> Option<Permission> {
        (matches_optional(&self.user_pattern, user)
            && matches_optional(&self.catalog_pattern, catalog))
        .then_some(self.allow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_ordering() {
        assert!(Permission::All.implies(Permission::ReadOnly));
        assert!(Permission::All.implies(Permission::All));
        assert!(Permission::ReadOnly.implies(Permission::ReadOnly));
        assert!(!Permission::ReadOnly.implies(Permission::All));
        assert!(!Permission::None.implies(Permission::ReadOnly));
    }

    #[test]
    fn test_permission_wire_forms() {
        let levels: Vec<Permission> =
            serde_json::from_str(r#"["none", "read-only", "all", true, false]"#).unwrap();
        assert_eq!(
            levels,
            vec![
                Permission::None,
                Permission::ReadOnly,
                Permission::All,
                Permission::All,
                Permission::None
            ]
        );

        assert!(serde_json::from_str::<Permission>(r#""READ_ONLY""#).is_err());
    }

    #[test]
    fn test_catalog_rule_matching() {
        let rule: CatalogRule = serde_json::from_str(
            r#"{"user_pattern": "alice", "catalog_pattern": "alice-.*", "allow": "read-only"}"#,
        )
        .unwrap();

        assert_eq!(rule.matches("alice", "alice-catalog"), Some(Permission::ReadOnly));
        assert_eq!(rule.matches("bob", "alice-catalog"), None);
        assert_eq!(rule.matches("alice", "bob-catalog"), None);
    }

    #[test]
    fn test_catalog_rule_defaults() {
        // Missing patterns match everything, missing allow grants nothing
        let rule: CatalogRule = serde_json::from_str(r#"{"catalog": "allowed-absent"}"#).unwrap();
        assert_eq!(rule.matches("anyone", "allowed-absent"), Some(Permission::None));
    }

    #[test]
    fn test_catalog_rule_rejects_unknown_fields() {
        let err = serde_json::from_str::<CatalogRule>(r#"{"catalog": "x", "owner": true}"#).unwrap_err();
        assert!(err.to_string().contains("unknown field `owner`"));
    }
}
