//! Table privileges and grant targets

use serde::{Deserialize, Serialize};
use std::fmt;

/// Privilege on a table or view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Privilege {
    Select,
    Insert,
    Delete,
    Update,
    /// Owner-level control: DDL on the table and granting to others
    Ownership,
    /// Select, plus the right to expose the data through a view
    GrantSelect,
}

impl fmt::Display for Privilege {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Select => "SELECT",
            Self::Insert => "INSERT",
            Self::Delete => "DELETE",
            Self::Update => "UPDATE",
            Self::Ownership => "OWNERSHIP",
            Self::GrantSelect => "GRANT_SELECT",
        };
        f.write_str(name)
    }
}

/// Kind of principal a privilege is granted to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PrincipalKind {
    User,
    Role,
}

/// Grantee or revokee of a table privilege
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GrantPrincipal {
    pub kind: PrincipalKind,
    pub name: String,
}

impl GrantPrincipal {
    pub fn user(name: impl Into<String>) -> Self {
        Self {
            kind: PrincipalKind::User,
            name: name.into(),
        }
    }

    pub fn role(name: impl Into<String>) -> Self {
        Self {
            kind: PrincipalKind::Role,
            name: name.into(),
        }
    }
}

impl fmt::Display for GrantPrincipal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            PrincipalKind::User => write!(f, "user {}", self.name),
            PrincipalKind::Role => write!(f, "role {}", self.name),
        }
    }
}
