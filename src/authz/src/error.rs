//! Error types for the access control layer

use sqlguard_core::AccessDeniedError;
use thiserror::Error;

/// Leading text of every rule-file load failure
///
/// Operators and tests key off this prefix, so it must stay stable.
pub const INVALID_RULES_PREFIX: &str = "Invalid JSON file";

/// A rule file could not be read, parsed, or compiled
///
/// Cloneable so the reloading cache can hand the same failure to every
/// caller until a later reload succeeds.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid JSON file '{path}': {reason}")]
pub struct RuleLoadError {
    path: String,
    reason: String,
}

impl RuleLoadError {
    pub fn new(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Path of the offending rule file
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// Access control errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessControlError {
    /// Provider activation options are missing or invalid
    #[error("Invalid access control configuration: {0}")]
    Configuration(String),

    /// The rule file is malformed; raised at activation and on every call
    /// while a failed reload is in effect
    #[error(transparent)]
    InvalidRules(#[from] RuleLoadError),

    /// The caller lacks the required permission
    #[error(transparent)]
    AccessDenied(#[from] AccessDeniedError),
}

impl AccessControlError {
    pub fn is_access_denied(&self) -> bool {
        matches!(self, Self::AccessDenied(_))
    }

    pub fn is_invalid_rules(&self) -> bool {
        matches!(self, Self::InvalidRules(_))
    }
}

/// Result type for access control operations
pub type Result<T> = std::result::Result<T, AccessControlError>;
