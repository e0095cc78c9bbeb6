//! # sqlguard Authorization
//!
//! Rule-driven system access control for a distributed SQL platform.
//!
//! ## Features
//!
//! - **Declarative JSON rules** for principals, catalogs, schemas, tables,
//!   and session properties, evaluated first-match-wins
//! - **Principal mapping** with a `${USER}` template that is always
//!   regex-escaped before substitution
//! - **Hot reload** of the rule file with fail-closed behavior on bad edits
//! - **Pluggable providers** selected by name and composable in a manager
//!
//! ## Example
//!
//! ```rust,no_run
//! use sqlguard_authz::{AccessControlManager, Properties, SECURITY_CONFIG_FILE};
//! use sqlguard_core::{Identity, TransactionId};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let manager = AccessControlManager::new();
//!
//!     let mut properties = Properties::new();
//!     properties.insert(SECURITY_CONFIG_FILE.to_string(), "/etc/sqlguard/rules.json".to_string());
//!     manager.set_system_access_control("file", &properties)?;
//!
//!     let alice = Identity::new("alice");
//!     manager.check_can_access_catalog(TransactionId::new(), &alice, "alice-catalog")?;
//!
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod file_based;
pub mod manager;
pub mod provider;
pub mod rules;

// Re-export commonly used types
pub use cache::{ReloadingRuleSet, RuleLoader, RuleSource};
pub use config::{
    AccessControlConfigFile, FileBasedAccessControlConfig, Properties, SECURITY_CONFIG_FILE,
    SECURITY_REFRESH_PERIOD,
};
pub use error::{AccessControlError, Result, RuleLoadError, INVALID_RULES_PREFIX};
pub use file_based::{FileBasedAccessControlFactory, FileBasedSystemAccessControl};
pub use manager::AccessControlManager;
pub use provider::{
    AllowAllFactory, AllowAllSystemAccessControl, ReadOnlyFactory, ReadOnlySystemAccessControl,
    SystemAccessControl, SystemAccessControlFactory,
};
pub use rules::{Permission, RuleSet};

/// Version of the authorization crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
