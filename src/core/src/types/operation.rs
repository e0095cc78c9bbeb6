//! Operations guarded by the access control surface

use serde::{Deserialize, Serialize};
use std::fmt;

/// Every check operation a provider answers
///
/// The `Display` form reads as the verb phrase of a denial message
/// ("Cannot create schema ...").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    SetUser,
    AccessCatalog,
    CreateSchema,
    DropSchema,
    RenameSchema,
    ShowSchemas,
    ShowTablesMetadata,
    CreateTable,
    DropTable,
    RenameTable,
    AddColumn,
    DropColumn,
    RenameColumn,
    SelectFromColumns,
    InsertIntoTable,
    DeleteFromTable,
    CreateView,
    DropView,
    CreateViewWithSelectFromColumns,
    SetSystemSessionProperty,
    SetCatalogSessionProperty,
    GrantTablePrivilege,
    RevokeTablePrivilege,
}

impl Operation {
    /// Verb phrase used in denial messages
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SetUser => "become user",
            Self::AccessCatalog => "access catalog",
            Self::CreateSchema => "create schema",
            Self::DropSchema => "drop schema",
            Self::RenameSchema => "rename schema",
            Self::ShowSchemas => "show schemas of catalog",
            Self::ShowTablesMetadata => "show tables of schema",
            Self::CreateTable => "create table",
            Self::DropTable => "drop table",
            Self::RenameTable => "rename table",
            Self::AddColumn => "add a column to table",
            Self::DropColumn => "drop a column from table",
            Self::RenameColumn => "rename a column in table",
            Self::SelectFromColumns => "select from table",
            Self::InsertIntoTable => "insert into table",
            Self::DeleteFromTable => "delete from table",
            Self::CreateView => "create view",
            Self::DropView => "drop view",
            Self::CreateViewWithSelectFromColumns => "create view that selects from",
            Self::SetSystemSessionProperty => "set system session property",
            Self::SetCatalogSessionProperty => "set catalog session property",
            Self::GrantTablePrivilege => "grant privilege on",
            Self::RevokeTablePrivilege => "revoke privilege on",
        }
    }

    /// Whether the operation only reads data or metadata
    ///
    /// Session-level operations (becoming a user, setting session
    /// properties) count as reads: they change no stored state. Selecting
    /// from a relation on behalf of a new view is a read of that relation;
    /// the view itself is checked by create view.
    pub fn is_read_only(&self) -> bool {
        matches!(
            self,
            Self::SetUser
                | Self::AccessCatalog
                | Self::ShowSchemas
                | Self::ShowTablesMetadata
                | Self::SelectFromColumns
                | Self::CreateViewWithSelectFromColumns
                | Self::SetSystemSessionProperty
                | Self::SetCatalogSessionProperty
        )
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
