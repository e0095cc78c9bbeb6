//! Caller identity

use serde::{Deserialize, Serialize};
use std::fmt;

/// The acting caller: a claimed username plus the principal the transport
/// authenticated, if any.
///
/// The username is compared case-sensitively and is never treated as a
/// pattern. The principal is absent when the transport did no
/// principal-level authentication.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    user: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    principal: Option<String>,
}

impl Identity {
    /// Create an identity with no authenticated principal
    pub fn new(user: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            principal: None,
        }
    }

    /// Attach the authenticated principal (e.g. `alice/example.com@EXAMPLE.COM`)
    pub fn with_principal(mut self, principal: impl Into<String>) -> Self {
        self.principal = Some(principal.into());
        self
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn principal(&self) -> Option<&str> {
        self.principal.as_deref()
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.principal {
            Some(principal) => write!(f, "{} ({})", self.user, principal),
            None => f.write_str(&self.user),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_creation() {
        let alice = Identity::new("alice");
        assert_eq!(alice.user(), "alice");
        assert_eq!(alice.principal(), None);
        assert_eq!(alice.to_string(), "alice");

        let kerberos = Identity::new("alice").with_principal("alice/example.com@EXAMPLE.COM");
        assert_eq!(kerberos.principal(), Some("alice/example.com@EXAMPLE.COM"));
        assert_eq!(kerberos.to_string(), "alice (alice/example.com@EXAMPLE.COM)");
    }

    #[test]
    fn test_identity_is_case_sensitive() {
        assert_ne!(Identity::new("alice"), Identity::new("Alice"));
    }
}
