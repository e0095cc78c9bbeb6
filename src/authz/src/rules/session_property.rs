//! Session property rules

use serde::Deserialize;

use super::pattern::{matches_optional, RulePattern};

/// Allows or denies setting catalog session properties
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionPropertyRule {
    #[serde(default, alias = "user")]
    user_pattern: Option<RulePattern>,

    #[serde(default, alias = "catalog")]
    catalog_pattern: Option<RulePattern>,

    #[serde(default, alias = "property")]
    property_pattern: Option<RulePattern>,

    #[serde(default)]
    allow: bool,
}

impl SessionPropertyRule {
    pub fn matches(&self, user: &str, catalog: &str, property: &str) -> Option<bool> {
        (matches_optional(&self.user_pattern, user)
            && matches_optional(&self.catalog_pattern, catalog)
            && matches_optional(&self.property_pattern, property))
        .then_some(self.allow)
    }
}

/// Allows or denies setting platform-wide (non-catalog) session properties
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SystemSessionPropertyRule {
    #[serde(default, alias = "user")]
    user_pattern: Option<RulePattern>,

    #[serde(default, alias = "property")]
    property_pattern: Option<RulePattern>,

    #[serde(default)]
    allow: bool,
}

impl SystemSessionPropertyRule {
    pub fn matches(&self, user: &str, property: &str) -> Option<bool> {
        (matches_optional(&self.user_pattern, user)
            && matches_optional(&self.property_pattern, property))
        .then_some(self.allow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_property_rule() {
        let rule: SessionPropertyRule = serde_json::from_str(
            r#"{"user_pattern": "alice", "catalog_pattern": "alice-catalog", "property_pattern": "prop.*", "allow": true}"#,
        )
        .unwrap();

        assert_eq!(rule.matches("alice", "alice-catalog", "property"), Some(true));
        assert_eq!(rule.matches("alice", "other", "property"), None);
        assert_eq!(rule.matches("alice", "alice-catalog", "query_max_memory"), None);
    }

    #[test]
    fn test_system_property_rule() {
        let rule: SystemSessionPropertyRule =
            serde_json::from_str(r#"{"property": "query_max_memory", "allow": false}"#).unwrap();

        assert_eq!(rule.matches("anyone", "query_max_memory"), Some(false));
        assert_eq!(rule.matches("anyone", "join_distribution_type"), None);
    }
}
