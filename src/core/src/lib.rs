//! # sqlguard Core
//!
//! Shared identity, naming, and error types for the sqlguard access control
//! layer. The planner, the session layer, and the authorization providers all
//! speak in these types, so they live apart from the rule engine itself.

pub mod error;
pub mod types;

// Re-export commonly used types
pub use error::AccessDeniedError;
pub use types::{
    CatalogSchemaName, CatalogSchemaTableName, GrantPrincipal, Identity, Operation, PrincipalKind,
    Privilege, SchemaTableName, TransactionId,
};
