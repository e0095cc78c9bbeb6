//! Access denial raised by every check operation

use std::fmt;

use thiserror::Error;

use crate::types::Operation;

/// The caller lacks the permission required for an operation.
///
/// Carries the operation and the resource it was attempted on so the
/// platform can surface the message verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct AccessDeniedError {
    operation: Operation,
    resource: String,
    principal: Option<String>,
    detail: Option<String>,
}

impl AccessDeniedError {
    /// Create a denial for `operation` on `resource`
    pub fn new(operation: Operation, resource: impl fmt::Display) -> Self {
        Self {
            operation,
            resource: resource.to_string(),
            principal: None,
            detail: None,
        }
    }

    /// Denial of a principal acting as `user`
    pub fn set_user(principal: Option<&str>, user: &str) -> Self {
        Self {
            principal: principal.map(str::to_string),
            ..Self::new(Operation::SetUser, user)
        }
    }

    /// Attach extra context, appended after the resource in the message
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Operation that was refused
    pub fn operation(&self) -> Operation {
        self.operation
    }

    /// Textual identity of the resource the operation targeted
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Authenticated principal, for set-user denials
    pub fn principal(&self) -> Option<&str> {
        self.principal.as_deref()
    }

    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }
}

impl fmt::Display for AccessDeniedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.principal {
            Some(principal) => write!(
                f,
                "Access Denied: Principal {} cannot {} {}",
                principal, self.operation, self.resource
            )?,
            None => write!(f, "Access Denied: Cannot {} {}", self.operation, self.resource)?,
        }
        if let Some(detail) = &self.detail {
            write!(f, ": {}", detail)?;
        }
        Ok(())
    }
}
