//! Table rules
//!
//! Views are addressed exactly like tables, so the same rules govern both.

use serde::Deserialize;
use sqlguard_core::{CatalogSchemaTableName, Privilege};
use std::collections::BTreeSet;

use super::pattern::{matches_optional, RulePattern};

/// Grants a set of privileges on the tables matching the catalog, schema, and
/// table patterns to the users matching `user_pattern`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TableRule {
    #[serde(default, alias = "user")]
    user_pattern: Option<RulePattern>,

    #[serde(default, alias = "catalog")]
    catalog_pattern: Option<RulePattern>,

    #[serde(default, alias = "schema")]
    schema_pattern: Option<RulePattern>,

    #[serde(default, alias = "table")]
    table_pattern: Option<RulePattern>,

    #[serde(default)]
    privileges: BTreeSet<Privilege>,
}

impl TableRule {
    /// The granted privileges, if this rule applies to `user` and `table`
    pub fn matches(&self, user: &str, table: &CatalogSchemaTableName) -> Option<TablePrivileges<'_>> {
        (matches_optional(&self.user_pattern, user)
            && matches_optional(&self.catalog_pattern, table.catalog())
            && matches_optional(&self.schema_pattern, table.schema())
            && matches_optional(&self.table_pattern, table.table()))
        .then_some(TablePrivileges(&self.privileges))
    }
}

/// Privileges granted by the first matching table rule
#[derive(Debug, Clone, Copy)]
pub struct TablePrivileges<'a>(&'a BTreeSet<Privilege>);

impl TablePrivileges<'_> {
    /// `OWNERSHIP` implies every privilege and `GRANT_SELECT` implies `SELECT`
    pub fn grants(&self, required: Privilege) -> bool {
        self.0.contains(&required)
            || self.0.contains(&Privilege::Ownership)
            || (required == Privilege::Select && self.0.contains(&Privilege::GrantSelect))
    }

    /// A table is visible when the rule grants anything at all
    pub fn is_visible(&self) -> bool {
        !self.0.is_empty()
    }
}
