//! Shared types for the access control layer

pub mod identity;
pub mod names;
pub mod operation;
pub mod privilege;
pub mod transaction;

// Re-export commonly used types
pub use identity::Identity;
pub use names::{CatalogSchemaName, CatalogSchemaTableName, SchemaTableName};
pub use operation::Operation;
pub use privilege::{GrantPrincipal, PrincipalKind, Privilege};
pub use transaction::TransactionId;
