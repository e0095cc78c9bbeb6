//! System access control providers
//!
//! A provider answers the full set of check and filter operations. Checks
//! return `Ok(())` or an [`AccessControlError::AccessDenied`]; filters return
//! the subset of their input the identity may see. Providers are created by
//! name through a [`SystemAccessControlFactory`].

use sqlguard_core::{
    AccessDeniedError, CatalogSchemaName, CatalogSchemaTableName, GrantPrincipal, Identity, Operation,
    Privilege, SchemaTableName,
};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use crate::config::Properties;
use crate::error::{AccessControlError, Result};

/// Platform-wide access control capability
pub trait SystemAccessControl: Send + Sync + fmt::Debug {
    /// May `principal` act as `user`? Called once while establishing a session.
    fn check_can_set_user(&self, principal: Option<&str>, user: &str) -> Result<()>;

    fn check_can_set_system_session_property(&self, identity: &Identity, property: &str) -> Result<()>;

    fn check_can_access_catalog(&self, identity: &Identity, catalog: &str) -> Result<()>;

    fn filter_catalogs(&self, identity: &Identity, catalogs: BTreeSet<String>) -> Result<BTreeSet<String>>;

    fn check_can_create_schema(&self, identity: &Identity, schema: &CatalogSchemaName) -> Result<()>;

    fn check_can_drop_schema(&self, identity: &Identity, schema: &CatalogSchemaName) -> Result<()>;

    fn check_can_rename_schema(&self, identity: &Identity, schema: &CatalogSchemaName, new_name: &str) -> Result<()>;

    fn check_can_show_schemas(&self, identity: &Identity, catalog: &str) -> Result<()>;

    fn filter_schemas(
        &self,
        identity: &Identity,
        catalog: &str,
        schemas: BTreeSet<String>,
    ) -> Result<BTreeSet<String>>;

    fn check_can_show_tables_metadata(&self, identity: &Identity, schema: &CatalogSchemaName) -> Result<()>;

    fn filter_tables(
        &self,
        identity: &Identity,
        catalog: &str,
        tables: BTreeSet<SchemaTableName>,
    ) -> Result<BTreeSet<SchemaTableName>>;

    fn check_can_create_table(&self, identity: &Identity, table: &CatalogSchemaTableName) -> Result<()>;

    fn check_can_drop_table(&self, identity: &Identity, table: &CatalogSchemaTableName) -> Result<()>;

    fn check_can_rename_table(
        &self,
        identity: &Identity,
        table: &CatalogSchemaTableName,
        new_table: &CatalogSchemaTableName,
    ) -> Result<()>;

    fn check_can_add_column(&self, identity: &Identity, table: &CatalogSchemaTableName) -> Result<()>;

    fn check_can_drop_column(&self, identity: &Identity, table: &CatalogSchemaTableName) -> Result<()>;

    fn check_can_rename_column(&self, identity: &Identity, table: &CatalogSchemaTableName) -> Result<()>;

    fn check_can_select_from_columns(
        &self,
        identity: &Identity,
        table: &CatalogSchemaTableName,
        columns: &BTreeSet<String>,
    ) -> Result<()>;

    fn check_can_insert_into_table(&self, identity: &Identity, table: &CatalogSchemaTableName) -> Result<()>;

    fn check_can_delete_from_table(&self, identity: &Identity, table: &CatalogSchemaTableName) -> Result<()>;

    fn check_can_create_view(&self, identity: &Identity, view: &CatalogSchemaTableName) -> Result<()>;

    fn check_can_drop_view(&self, identity: &Identity, view: &CatalogSchemaTableName) -> Result<()>;

    /// May `identity` define a view that selects `columns` from `table`?
    /// `table` is the referenced relation, which may itself be a view.
    fn check_can_create_view_with_select_from_columns(
        &self,
        identity: &Identity,
        table: &CatalogSchemaTableName,
        columns: &BTreeSet<String>,
    ) -> Result<()>;

    fn check_can_set_catalog_session_property(&self, identity: &Identity, catalog: &str, property: &str)
        -> Result<()>;

    fn check_can_grant_table_privilege(
        &self,
        identity: &Identity,
        privilege: Privilege,
        table: &CatalogSchemaTableName,
        grantee: &GrantPrincipal,
        with_grant_option: bool,
    ) -> Result<()>;

    fn check_can_revoke_table_privilege(
        &self,
        identity: &Identity,
        privilege: Privilege,
        table: &CatalogSchemaTableName,
        revokee: &GrantPrincipal,
        grant_option_for: bool,
    ) -> Result<()>;
}

/// Creates a provider from its configuration properties
pub trait SystemAccessControlFactory: Send + Sync {
    /// Name the provider is registered under
    fn name(&self) -> &str;

    fn create(&self, properties: &Properties) -> Result<Arc<dyn SystemAccessControl>>;
}

/// Shorthand for building a denial inside a provider
pub(crate) fn deny(operation: Operation, resource: impl fmt::Display) -> AccessControlError {
    AccessControlError::AccessDenied(AccessDeniedError::new(operation, resource))
}

fn reject_properties(name: &str, properties: &Properties) -> Result<()> {
    if properties.is_empty() {
        Ok(())
    } else {
        Err(AccessControlError::Configuration(format!(
            "the '{}' access control does not take any properties",
            name
        )))
    }
}

/// Allows everything
#[derive(Debug, Default, Clone, Copy)]
pub struct AllowAllSystemAccessControl;

impl AllowAllSystemAccessControl {
    pub const NAME: &'static str = "allow-all";
}

impl SystemAccessControl for AllowAllSystemAccessControl {
    fn check_can_set_user(&self, _principal: Option<&str>, _user: &str) -> Result<()> {
        Ok(())
    }

    fn check_can_set_system_session_property(&self, _identity: &Identity, _property: &str) -> Result<()> {
        Ok(())
    }

    fn check_can_access_catalog(&self, _identity: &Identity, _catalog: &str) -> Result<()> {
        Ok(())
    }

    fn filter_catalogs(&self, _identity: &Identity, catalogs: BTreeSet<String>) -> Result<BTreeSet<String>> {
        Ok(catalogs)
    }

    fn check_can_create_schema(&self, _identity: &Identity, _schema: &CatalogSchemaName) -> Result<()> {
        Ok(())
    }

    fn check_can_drop_schema(&self, _identity: &Identity, _schema: &CatalogSchemaName) -> Result<()> {
        Ok(())
    }

    fn check_can_rename_schema(&self, _identity: &Identity, _schema: &CatalogSchemaName, _new_name: &str) -> Result<()> {
        Ok(())
    }

    fn check_can_show_schemas(&self, _identity: &Identity, _catalog: &str) -> Result<()> {
        Ok(())
    }

    fn filter_schemas(
        &self,
        _identity: &Identity,
        _catalog: &str,
        schemas: BTreeSet<String>,
    ) -> Result<BTreeSet<String>> {
        Ok(schemas)
    }

    fn check_can_show_tables_metadata(&self, _identity: &Identity, _schema: &CatalogSchemaName) -> Result<()> {
        Ok(())
    }

    fn filter_tables(
        &self,
        _identity: &Identity,
        _catalog: &str,
        tables: BTreeSet<SchemaTableName>,
    ) -> Result<BTreeSet<SchemaTableName>> {
        Ok(tables)
    }

    fn check_can_create_table(&self, _identity: &Identity, _table: &CatalogSchemaTableName) -> Result<()> {
        Ok(())
    }

    fn check_can_drop_table(&self, _identity: &Identity, _table: &CatalogSchemaTableName) -> Result<()> {
        Ok(())
    }

    fn check_can_rename_table(
        &self,
        _identity: &Identity,
        _table: &CatalogSchemaTableName,
        _new_table: &CatalogSchemaTableName,
    ) -> Result<()> {
        Ok(())
    }

    fn check_can_add_column(&self, _identity: &Identity, _table: &CatalogSchemaTableName) -> Result<()> {
        Ok(())
    }

    fn check_can_drop_column(&self, _identity: &Identity, _table: &CatalogSchemaTableName) -> Result<()> {
        Ok(())
    }

    fn check_can_rename_column(&self, _identity: &Identity, _table: &CatalogSchemaTableName) -> Result<()> {
        Ok(())
    }

    fn check_can_select_from_columns(
        &self,
        _identity: &Identity,
        _table: &CatalogSchemaTableName,
        _columns: &BTreeSet<String>,
    ) -> Result<()> {
        Ok(())
    }

    fn check_can_insert_into_table(&self, _identity: &Identity, _table: &CatalogSchemaTableName) -> Result<()> {
        Ok(())
    }

    fn check_can_delete_from_table(&self, _identity: &Identity, _table: &CatalogSchemaTableName) -> Result<()> {
        Ok(())
    }

    fn check_can_create_view(&self, _identity: &Identity, _view: &CatalogSchemaTableName) -> Result<()> {
        Ok(())
    }

    fn check_can_drop_view(&self, _identity: &Identity, _view: &CatalogSchemaTableName) -> Result<()> {
        Ok(())
    }

    fn check_can_create_view_with_select_from_columns(
        &self,
        _identity: &Identity,
        _table: &CatalogSchemaTableName,
        _columns: &BTreeSet<String>,
    ) -> Result<()> {
        Ok(())
    }

    fn check_can_set_catalog_session_property(
        &self,
        _identity: &Identity,
        _catalog: &str,
        _property: &str,
    ) -> Result<()> {
        Ok(())
    }

    fn check_can_grant_table_privilege(
        &self,
        _identity: &Identity,
        _privilege: Privilege,
        _table: &CatalogSchemaTableName,
        _grantee: &GrantPrincipal,
        _with_grant_option: bool,
    ) -> Result<()> {
        Ok(())
    }

    fn check_can_revoke_table_privilege(
        &self,
        _identity: &Identity,
        _privilege: Privilege,
        _table: &CatalogSchemaTableName,
        _revokee: &GrantPrincipal,
        _grant_option_for: bool,
    ) -> Result<()> {
        Ok(())
    }
}

/// Factory for [`AllowAllSystemAccessControl`]
#[derive(Debug, Default)]
pub struct AllowAllFactory;

impl SystemAccessControlFactory for AllowAllFactory {
    fn name(&self) -> &str {
        AllowAllSystemAccessControl::NAME
    }

    fn create(&self, properties: &Properties) -> Result<Arc<dyn SystemAccessControl>> {
        reject_properties(self.name(), properties)?;
        Ok(Arc::new(AllowAllSystemAccessControl))
    }
}

/// Allows reads, visibility, and session setup; denies every mutation
#[derive(Debug, Default, Clone, Copy)]
pub struct ReadOnlySystemAccessControl;

impl ReadOnlySystemAccessControl {
    pub const NAME: &'static str = "read-only";
}

fn permit(operation: Operation, resource: impl fmt::Display) -> Result<()> {
    if operation.is_read_only() {
        Ok(())
    } else {
        Err(deny(operation, resource))
    }
}

impl SystemAccessControl for ReadOnlySystemAccessControl {
    fn check_can_set_user(&self, _principal: Option<&str>, _user: &str) -> Result<()> {
        Ok(())
    }

    fn check_can_set_system_session_property(&self, _identity: &Identity, _property: &str) -> Result<()> {
        Ok(())
    }

    fn check_can_access_catalog(&self, _identity: &Identity, _catalog: &str) -> Result<()> {
        Ok(())
    }

    fn filter_catalogs(&self, _identity: &Identity, catalogs: BTreeSet<String>) -> Result<BTreeSet<String>> {
        Ok(catalogs)
    }

    fn check_can_create_schema(&self, _identity: &Identity, schema: &CatalogSchemaName) -> Result<()> {
        permit(Operation::CreateSchema, schema)
    }

    fn check_can_drop_schema(&self, _identity: &Identity, schema: &CatalogSchemaName) -> Result<()> {
        permit(Operation::DropSchema, schema)
    }

    fn check_can_rename_schema(&self, _identity: &Identity, schema: &CatalogSchemaName, _new_name: &str) -> Result<()> {
        permit(Operation::RenameSchema, schema)
    }

    fn check_can_show_schemas(&self, _identity: &Identity, _catalog: &str) -> Result<()> {
        Ok(())
    }

    fn filter_schemas(
        &self,
        _identity: &Identity,
        _catalog: &str,
        schemas: BTreeSet<String>,
    ) -> Result<BTreeSet<String>> {
        Ok(schemas)
    }

    fn check_can_show_tables_metadata(&self, _identity: &Identity, _schema: &CatalogSchemaName) -> Result<()> {
        Ok(())
    }

    fn filter_tables(
        &self,
        _identity: &Identity,
        _catalog: &str,
        tables: BTreeSet<SchemaTableName>,
    ) -> Result<BTreeSet<SchemaTableName>> {
        Ok(tables)
    }

    fn check_can_create_table(&self, _identity: &Identity, table: &CatalogSchemaTableName) -> Result<()> {
        permit(Operation::CreateTable, table)
    }

    fn check_can_drop_table(&self, _identity: &Identity, table: &CatalogSchemaTableName) -> Result<()> {
        permit(Operation::DropTable, table)
    }

    fn check_can_rename_table(
        &self,
        _identity: &Identity,
        table: &CatalogSchemaTableName,
        _new_table: &CatalogSchemaTableName,
    ) -> Result<()> {
        permit(Operation::RenameTable, table)
    }

    fn check_can_add_column(&self, _identity: &Identity, table: &CatalogSchemaTableName) -> Result<()> {
        permit(Operation::AddColumn, table)
    }

    fn check_can_drop_column(&self, _identity: &Identity, table: &CatalogSchemaTableName) -> Result<()> {
        permit(Operation::DropColumn, table)
    }

    fn check_can_rename_column(&self, _identity: &Identity, table: &CatalogSchemaTableName) -> Result<()> {
        permit(Operation::RenameColumn, table)
    }

    fn check_can_select_from_columns(
        &self,
        _identity: &Identity,
        _table: &CatalogSchemaTableName,
        _columns: &BTreeSet<String>,
    ) -> Result<()> {
        Ok(())
    }

    fn check_can_insert_into_table(&self, _identity: &Identity, table: &CatalogSchemaTableName) -> Result<()> {
        permit(Operation::InsertIntoTable, table)
    }

    fn check_can_delete_from_table(&self, _identity: &Identity, table: &CatalogSchemaTableName) -> Result<()> {
        permit(Operation::DeleteFromTable, table)
    }

    fn check_can_create_view(&self, _identity: &Identity, view: &CatalogSchemaTableName) -> Result<()> {
        permit(Operation::CreateView, view)
    }

    fn check_can_drop_view(&self, _identity: &Identity, view: &CatalogSchemaTableName) -> Result<()> {
        permit(Operation::DropView, view)
    }

    fn check_can_create_view_with_select_from_columns(
        &self,
        _identity: &Identity,
        table: &CatalogSchemaTableName,
        _columns: &BTreeSet<String>,
    ) -> Result<()> {
        permit(Operation::CreateViewWithSelectFromColumns, table)
    }

    fn check_can_set_catalog_session_property(
        &self,
        _identity: &Identity,
        _catalog: &str,
        _property: &str,
    ) -> Result<()> {
        Ok(())
    }

    fn check_can_grant_table_privilege(
        &self,
        _identity: &Identity,
        privilege: Privilege,
        table: &CatalogSchemaTableName,
        _grantee: &GrantPrincipal,
        _with_grant_option: bool,
    ) -> Result<()> {
        Err(AccessControlError::AccessDenied(
            AccessDeniedError::new(Operation::GrantTablePrivilege, table).with_detail(format!("privilege {}", privilege)),
        ))
    }

    fn check_can_revoke_table_privilege(
        &self,
        _identity: &Identity,
        privilege: Privilege,
        table: &CatalogSchemaTableName,
        _revokee: &GrantPrincipal,
        _grant_option_for: bool,
    ) -> Result<()> {
        Err(AccessControlError::AccessDenied(
            AccessDeniedError::new(Operation::RevokeTablePrivilege, table).with_detail(format!("privilege {}", privilege)),
        ))
    }
}

/// Factory for [`ReadOnlySystemAccessControl`]
#[derive(Debug, Default)]
pub struct ReadOnlyFactory;

impl SystemAccessControlFactory for ReadOnlyFactory {
    fn name(&self) -> &str {
        ReadOnlySystemAccessControl::NAME
    }

    fn create(&self, properties: &Properties) -> Result<Arc<dyn SystemAccessControl>> {
        reject_properties(self.name(), properties)?;
        Ok(Arc::new(ReadOnlySystemAccessControl))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_only_denies_mutations() {
        let control = ReadOnlySystemAccessControl;
        let alice = Identity::new("alice");
        let table = CatalogSchemaTableName::new("c", "s", "t");

        assert!(control.check_can_select_from_columns(&alice, &table, &BTreeSet::new()).is_ok());
        assert!(control.check_can_show_schemas(&alice, "c").is_ok());

        // Selecting from a base relation for a view is a read; the view itself is not
        let view = CatalogSchemaTableName::new("c", "s", "v");
        assert!(control
            .check_can_create_view_with_select_from_columns(&alice, &table, &BTreeSet::new())
            .is_ok());
        let err = control.check_can_create_view(&alice, &view).unwrap_err();
        assert_eq!(err.to_string(), "Access Denied: Cannot create view c.s.v");

        let err = control.check_can_insert_into_table(&alice, &table).unwrap_err();
        assert_eq!(err.to_string(), "Access Denied: Cannot insert into table c.s.t");

        let err = control
            .check_can_grant_table_privilege(&alice, Privilege::Select, &table, &GrantPrincipal::user("bob"), false)
            .unwrap_err();
        assert_eq!(err.to_string(), "Access Denied: Cannot grant privilege on c.s.t: privilege SELECT");
    }

    #[test]
    fn test_allow_all_filters_are_identity() {
        let control = AllowAllSystemAccessControl;
        let catalogs: BTreeSet<String> = ["a", "b"].iter().map(|s| s.to_string()).collect();
        assert_eq!(control.filter_catalogs(&Identity::new("x"), catalogs.clone()).unwrap(), catalogs);
    }

    #[test]
    fn test_builtin_factories_reject_properties() {
        let mut properties = Properties::new();
        assert!(AllowAllFactory.create(&properties).is_ok());

        properties.insert("security.config-file".to_string(), "/etc/rules.json".to_string());
        let err = ReadOnlyFactory.create(&properties).unwrap_err();
        assert!(matches!(err, AccessControlError::Configuration(_)));
    }
}
