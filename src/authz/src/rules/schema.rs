//! Schema rules

use serde::Deserialize;
use sqlguard_core::CatalogSchemaName;

use super::pattern::{matches_optional, RulePattern};

/// Allows or denies control of the schemas matching the catalog and schema
/// patterns for the users matching `user_pattern`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaRule {
    #[serde(default, alias = "user")]
    user_pattern: Option<RulePattern>,

    #[serde(default, alias = "catalog")]
    catalog_pattern: Option<RulePattern>,

    #[serde(default, alias = "schema")]
    schema_pattern: Option<RulePattern>,

    #[serde(default)]
    allow: bool,
}

impl SchemaRule {
    /// The rule's decision, if it applies to `user` and `schema`
    pub fn matches(&self, user: &str, schema: &CatalogSchemaName) -> Option<bool> {
        (matches_optional(&self.user_pattern, user)
            && matches_optional(&self.catalog_pattern, schema.catalog())
            && matches_optional(&self.schema_pattern, schema.schema()))
        .then_some(self.allow)
    }
}
