//! Declarative access control rules
//!
//! A rule file is a JSON document with up to six optional sections:
//!
//! ```json
//! {
//!   "principals": [{"principal_pattern": "${USER}@EXAMPLE\\.COM", "allow": true}],
//!   "catalogs": [{"user_pattern": "admin", "catalog_pattern": ".*", "allow": "all"}],
//!   "schemas": [{"user_pattern": "alice", "schema_pattern": ".*", "allow": true}],
//!   "tables": [{"user_pattern": "alice", "privileges": ["SELECT", "OWNERSHIP"]}],
//!   "session_properties": [{"property_pattern": ".*", "allow": true}],
//!   "system_session_properties": [{"user_pattern": "admin", "allow": true}]
//! }
//! ```
//!
//! A missing section leaves its resource class unrestricted. A present
//! section is evaluated top to bottom, the first matching rule decides, and
//! no match means deny.

pub mod catalog;
pub mod pattern;
pub mod principal;
pub mod schema;
pub mod session_property;
pub mod table;

pub use catalog::{CatalogRule, Permission};
pub use pattern::RulePattern;
pub use principal::{PrincipalRule, PrincipalTemplate, PrincipalUserMatcher, USER_PLACEHOLDER};
pub use schema::SchemaRule;
pub use session_property::{SessionPropertyRule, SystemSessionPropertyRule};
pub use table::{TablePrivileges, TableRule};

use serde::Deserialize;
use std::path::Path;

use crate::error::RuleLoadError;

/// Catalog every user can read so the platform can serve its own status tables
pub const SYSTEM_CATALOG: &str = "system";

/// Immutable snapshot of every rule section
///
/// Built once per successful load and shared behind an `Arc`; a reload
/// replaces the whole snapshot.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleSet {
    #[serde(default)]
    principals: Option<PrincipalUserMatcher>,

    #[serde(default)]
    catalogs: Option<Vec<CatalogRule>>,

    #[serde(default)]
    schemas: Option<Vec<SchemaRule>>,

    #[serde(default)]
    tables: Option<Vec<TableRule>>,

    #[serde(default)]
    session_properties: Option<Vec<SessionPropertyRule>>,

    #[serde(default)]
    system_session_properties: Option<Vec<SystemSessionPropertyRule>>,
}

impl RuleSet {
    /// Read and parse a rule file
    pub fn load(path: &Path) -> Result<Self, RuleLoadError> {
        let label = path.display().to_string();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| RuleLoadError::new(label.clone(), format!("failed to read file: {}", e)))?;
        Self::parse(&label, &contents)
    }

    /// Parse rule JSON; `source` names the document in error messages
    pub fn parse(source: &str, json: &str) -> Result<Self, RuleLoadError> {
        let mut rules: RuleSet =
            serde_json::from_str(json).map_err(|e| RuleLoadError::new(source, e.to_string()))?;

        if let Some(catalogs) = rules.catalogs.as_mut() {
            let system = RulePattern::literal(SYSTEM_CATALOG)
                .map_err(|e| RuleLoadError::new(source, e.to_string()))?;
            catalogs.push(CatalogRule::new(None, Some(system), Permission::ReadOnly));
        }

        Ok(rules)
    }

    pub fn principals(&self) -> Option<&PrincipalUserMatcher> {
        self.principals.as_ref()
    }

    pub fn catalogs(&self) -> Option<&[CatalogRule]> {
        self.catalogs.as_deref()
    }

    pub fn schemas(&self) -> Option<&[SchemaRule]> {
        self.schemas.as_deref()
    }

    pub fn tables(&self) -> Option<&[TableRule]> {
        self.tables.as_deref()
    }

    pub fn session_properties(&self) -> Option<&[SessionPropertyRule]> {
        self.session_properties.as_deref()
    }

    pub fn system_session_properties(&self) -> Option<&[SystemSessionPropertyRule]> {
        self.system_session_properties.as_deref()
    }
}
