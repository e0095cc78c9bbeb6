//! Rule-based system access control backed by a JSON rule file
//!
//! Every check resolves the caller's catalog permission first and then
//! consults the rule section for the resource class:
//!
//! - reads and visibility need at least `read-only` on the catalog,
//!   mutations need `all`;
//! - schema operations need a matching schema rule with `allow: true`;
//! - table and view operations need the matching table privilege;
//! - session properties need a matching session property rule.
//!
//! A section missing from the rule file leaves its class unrestricted.

use sqlguard_core::{
    AccessDeniedError, CatalogSchemaName, CatalogSchemaTableName, GrantPrincipal, Identity, Operation,
    Privilege, SchemaTableName,
};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

use crate::cache::{ReloadingRuleSet, RuleSource};
use crate::config::{FileBasedAccessControlConfig, Properties};
use crate::error::{AccessControlError, Result};
use crate::provider::{deny, SystemAccessControl, SystemAccessControlFactory};
use crate::rules::{Permission, RuleSet, TablePrivileges};

/// Access control evaluating the rules of a [`RuleSource`]
#[derive(Debug)]
pub struct FileBasedSystemAccessControl {
    rules: RuleSource,
}

impl FileBasedSystemAccessControl {
    /// Name the provider is registered under
    pub const NAME: &'static str = "file";

    pub fn new(rules: RuleSource) -> Self {
        Self { rules }
    }

    /// Load the configured rule file, reloading it periodically when a
    /// refresh period is configured
    pub fn from_config(config: &FileBasedAccessControlConfig) -> Result<Self> {
        let path = config.config_file();
        let rules = match config.refresh_period() {
            Some(period) => RuleSource::Reloading(ReloadingRuleSet::from_file(path.to_path_buf(), period)?),
            None => RuleSource::from(RuleSet::load(path)?),
        };

        info!(
            "File-based access control loaded from {} (refresh period: {})",
            path.display(),
            config
                .refresh_period()
                .map(|period| humantime::format_duration(period).to_string())
                .unwrap_or_else(|| "never".to_string())
        );

        Ok(Self::new(rules))
    }

    fn rules(&self) -> Result<Arc<RuleSet>> {
        Ok(self.rules.current()?)
    }

    fn check_schema(&self, identity: &Identity, schema: &CatalogSchemaName, operation: Operation) -> Result<()> {
        let rules = self.rules()?;
        let user = identity.user();
        require(
            catalog_access(&rules, user, schema.catalog()).implies(Permission::All)
                && schema_allowed(&rules, user, schema),
            user,
            operation,
            schema,
        )
    }

    fn check_table(
        &self,
        identity: &Identity,
        table: &CatalogSchemaTableName,
        operation: Operation,
        catalog_required: Permission,
        privilege: Privilege,
    ) -> Result<()> {
        let rules = self.rules()?;
        require(
            can_use_table(&rules, identity.user(), table, catalog_required, privilege),
            identity.user(),
            operation,
            table,
        )
    }

    fn check_table_privilege_change(
        &self,
        identity: &Identity,
        operation: Operation,
        privilege: Privilege,
        table: &CatalogSchemaTableName,
        target: &GrantPrincipal,
    ) -> Result<()> {
        let rules = self.rules()?;
        if can_use_table(&rules, identity.user(), table, Permission::All, Privilege::Ownership) {
            return Ok(());
        }
        debug!(user = identity.user(), %operation, %table, "denied by rules");
        Err(AccessControlError::AccessDenied(
            AccessDeniedError::new(operation, table).with_detail(format!("privilege {} for {}", privilege, target)),
        ))
    }
}

/// Outcome of the table rule section for one table
enum TableAccess<'a> {
    /// No `tables` section
    Unrestricted,
    Granted(TablePrivileges<'a>),
    /// A `tables` section exists but no rule matched
    NoMatch,
}

impl TableAccess<'_> {
    fn grants(&self, privilege: Privilege) -> bool {
        match self {
            Self::Unrestricted => true,
            Self::Granted(privileges) => privileges.grants(privilege),
            Self::NoMatch => false,
        }
    }

    fn is_visible(&self) -> bool {
        match self {
            Self::Unrestricted => true,
            Self::Granted(privileges) => privileges.is_visible(),
            Self::NoMatch => false,
        }
    }
}

fn catalog_access(rules: &RuleSet, user: &str, catalog: &str) -> Permission {
    match rules.catalogs() {
        None => Permission::All,
        Some(catalog_rules) => catalog_rules
            .iter()
            .find_map(|rule| rule.matches(user, catalog))
            .unwrap_or(Permission::None),
    }
}

fn schema_allowed(rules: &RuleSet, user: &str, schema: &CatalogSchemaName) -> bool {
    rules.schemas().map_or(true, |schema_rules| {
        schema_rules
            .iter()
            .find_map(|rule| rule.matches(user, schema))
            .unwrap_or(false)
    })
}

fn table_access<'a>(rules: &'a RuleSet, user: &str, table: &CatalogSchemaTableName) -> TableAccess<'a> {
    match rules.tables() {
        None => TableAccess::Unrestricted,
        Some(table_rules) => table_rules
            .iter()
            .find_map(|rule| rule.matches(user, table))
            .map_or(TableAccess::NoMatch, TableAccess::Granted),
    }
}

fn can_use_table(
    rules: &RuleSet,
    user: &str,
    table: &CatalogSchemaTableName,
    catalog_required: Permission,
    privilege: Privilege,
) -> bool {
    catalog_access(rules, user, table.catalog()).implies(catalog_required)
        && table_access(rules, user, table).grants(privilege)
}

fn require(allowed: bool, user: &str, operation: Operation, resource: impl fmt::Display) -> Result<()> {
    if allowed {
        Ok(())
    } else {
        debug!(user, %operation, %resource, "denied by rules");
        Err(deny(operation, resource))
    }
}

impl SystemAccessControl for FileBasedSystemAccessControl {
    fn check_can_set_user(&self, principal: Option<&str>, user: &str) -> Result<()> {
        let rules = self.rules()?;
        let allowed = rules
            .principals()
            .map_or(true, |matcher| matcher.validate(user, principal));
        if allowed {
            return Ok(());
        }

        debug!(user, principal, "principal may not act as user");
        let denied = AccessDeniedError::set_user(principal, user);
        Err(AccessControlError::AccessDenied(match principal {
            Some(_) => denied,
            None => denied.with_detail("no authenticated principal"),
        }))
    }

    fn check_can_set_system_session_property(&self, identity: &Identity, property: &str) -> Result<()> {
        let rules = self.rules()?;
        let user = identity.user();
        let allowed = rules.system_session_properties().map_or(true, |property_rules| {
            property_rules
                .iter()
                .find_map(|rule| rule.matches(user, property))
                .unwrap_or(false)
        });
        require(allowed, user, Operation::SetSystemSessionProperty, property)
    }

    fn check_can_access_catalog(&self, identity: &Identity, catalog: &str) -> Result<()> {
        let rules = self.rules()?;
        let user = identity.user();
        require(
            catalog_access(&rules, user, catalog).implies(Permission::ReadOnly),
            user,
            Operation::AccessCatalog,
            catalog,
        )
    }

    fn filter_catalogs(&self, identity: &Identity, catalogs: BTreeSet<String>) -> Result<BTreeSet<String>> {
        let rules = self.rules()?;
        let user = identity.user();
        Ok(catalogs
            .into_iter()
            .filter(|catalog| catalog_access(&rules, user, catalog).implies(Permission::ReadOnly))
            .collect())
    }

    fn check_can_create_schema(&self, identity: &Identity, schema: &CatalogSchemaName) -> Result<()> {
        self.check_schema(identity, schema, Operation::CreateSchema)
    }

    fn check_can_drop_schema(&self, identity: &Identity, schema: &CatalogSchemaName) -> Result<()> {
        self.check_schema(identity, schema, Operation::DropSchema)
    }

    fn check_can_rename_schema(&self, identity: &Identity, schema: &CatalogSchemaName, new_name: &str) -> Result<()> {
        self.check_schema(identity, schema, Operation::RenameSchema)?;
        self.check_schema(
            identity,
            &CatalogSchemaName::new(schema.catalog(), new_name),
            Operation::RenameSchema,
        )
    }

    fn check_can_show_schemas(&self, identity: &Identity, catalog: &str) -> Result<()> {
        let rules = self.rules()?;
        let user = identity.user();
        require(
            catalog_access(&rules, user, catalog).implies(Permission::ReadOnly),
            user,
            Operation::ShowSchemas,
            catalog,
        )
    }

    fn filter_schemas(
        &self,
        identity: &Identity,
        catalog: &str,
        schemas: BTreeSet<String>,
    ) -> Result<BTreeSet<String>> {
        let rules = self.rules()?;
        let user = identity.user();
        if !catalog_access(&rules, user, catalog).implies(Permission::ReadOnly) {
            return Ok(BTreeSet::new());
        }
        Ok(schemas
            .into_iter()
            .filter(|schema| schema_allowed(&rules, user, &CatalogSchemaName::new(catalog, schema.as_str())))
            .collect())
    }

    fn check_can_show_tables_metadata(&self, identity: &Identity, schema: &CatalogSchemaName) -> Result<()> {
        let rules = self.rules()?;
        let user = identity.user();
        require(
            catalog_access(&rules, user, schema.catalog()).implies(Permission::ReadOnly)
                && schema_allowed(&rules, user, schema),
            user,
            Operation::ShowTablesMetadata,
            schema,
        )
    }

    fn filter_tables(
        &self,
        identity: &Identity,
        catalog: &str,
        tables: BTreeSet<SchemaTableName>,
    ) -> Result<BTreeSet<SchemaTableName>> {
        let rules = self.rules()?;
        let user = identity.user();
        if !catalog_access(&rules, user, catalog).implies(Permission::ReadOnly) {
            return Ok(BTreeSet::new());
        }
        Ok(tables
            .into_iter()
            .filter(|table| {
                let qualified = CatalogSchemaTableName::from_parts(catalog, table.clone());
                table_access(&rules, user, &qualified).is_visible()
            })
            .collect())
    }

    fn check_can_create_table(&self, identity: &Identity, table: &CatalogSchemaTableName) -> Result<()> {
        self.check_table(identity, table, Operation::CreateTable, Permission::All, Privilege::Ownership)
    }

    fn check_can_drop_table(&self, identity: &Identity, table: &CatalogSchemaTableName) -> Result<()> {
        self.check_table(identity, table, Operation::DropTable, Permission::All, Privilege::Ownership)
    }

    fn check_can_rename_table(
        &self,
        identity: &Identity,
        table: &CatalogSchemaTableName,
        new_table: &CatalogSchemaTableName,
    ) -> Result<()> {
        self.check_table(identity, table, Operation::RenameTable, Permission::All, Privilege::Ownership)?;
        self.check_table(identity, new_table, Operation::RenameTable, Permission::All, Privilege::Ownership)
    }

    fn check_can_add_column(&self, identity: &Identity, table: &CatalogSchemaTableName) -> Result<()> {
        self.check_table(identity, table, Operation::AddColumn, Permission::All, Privilege::Ownership)
    }

    fn check_can_drop_column(&self, identity: &Identity, table: &CatalogSchemaTableName) -> Result<()> {
        self.check_table(identity, table, Operation::DropColumn, Permission::All, Privilege::Ownership)
    }

    fn check_can_rename_column(&self, identity: &Identity, table: &CatalogSchemaTableName) -> Result<()> {
        self.check_table(identity, table, Operation::RenameColumn, Permission::All, Privilege::Ownership)
    }

    fn check_can_select_from_columns(
        &self,
        identity: &Identity,
        table: &CatalogSchemaTableName,
        _columns: &BTreeSet<String>,
    ) -> Result<()> {
        self.check_table(identity, table, Operation::SelectFromColumns, Permission::ReadOnly, Privilege::Select)
    }

    fn check_can_insert_into_table(&self, identity: &Identity, table: &CatalogSchemaTableName) -> Result<()> {
        self.check_table(identity, table, Operation::InsertIntoTable, Permission::All, Privilege::Insert)
    }

    fn check_can_delete_from_table(&self, identity: &Identity, table: &CatalogSchemaTableName) -> Result<()> {
        self.check_table(identity, table, Operation::DeleteFromTable, Permission::All, Privilege::Delete)
    }

    fn check_can_create_view(&self, identity: &Identity, view: &CatalogSchemaTableName) -> Result<()> {
        self.check_table(identity, view, Operation::CreateView, Permission::All, Privilege::Ownership)
    }

    fn check_can_drop_view(&self, identity: &Identity, view: &CatalogSchemaTableName) -> Result<()> {
        self.check_table(identity, view, Operation::DropView, Permission::All, Privilege::Ownership)
    }

    fn check_can_create_view_with_select_from_columns(
        &self,
        identity: &Identity,
        table: &CatalogSchemaTableName,
        _columns: &BTreeSet<String>,
    ) -> Result<()> {
        // Same evaluation as a plain select on the referenced relation
        self.check_table(
            identity,
            table,
            Operation::CreateViewWithSelectFromColumns,
            Permission::ReadOnly,
            Privilege::Select,
        )
    }

    fn check_can_set_catalog_session_property(
        &self,
        identity: &Identity,
        catalog: &str,
        property: &str,
    ) -> Result<()> {
        let rules = self.rules()?;
        let user = identity.user();
        let property_allowed = rules.session_properties().map_or(true, |property_rules| {
            property_rules
                .iter()
                .find_map(|rule| rule.matches(user, catalog, property))
                .unwrap_or(false)
        });
        require(
            catalog_access(&rules, user, catalog).implies(Permission::ReadOnly) && property_allowed,
            user,
            Operation::SetCatalogSessionProperty,
            format_args!("{}.{}", catalog, property),
        )
    }

    fn check_can_grant_table_privilege(
        &self,
        identity: &Identity,
        privilege: Privilege,
        table: &CatalogSchemaTableName,
        grantee: &GrantPrincipal,
        _with_grant_option: bool,
    ) -> Result<()> {
        self.check_table_privilege_change(identity, Operation::GrantTablePrivilege, privilege, table, grantee)
    }

    fn check_can_revoke_table_privilege(
        &self,
        identity: &Identity,
        privilege: Privilege,
        table: &CatalogSchemaTableName,
        revokee: &GrantPrincipal,
        _grant_option_for: bool,
    ) -> Result<()> {
        self.check_table_privilege_change(identity, Operation::RevokeTablePrivilege, privilege, table, revokee)
    }
}

/// Factory registered as [`FileBasedSystemAccessControl::NAME`]
#[derive(Debug, Default)]
pub struct FileBasedAccessControlFactory;

impl SystemAccessControlFactory for FileBasedAccessControlFactory {
    fn name(&self) -> &str {
        FileBasedSystemAccessControl::NAME
    }

    fn create(&self, properties: &Properties) -> Result<Arc<dyn SystemAccessControl>> {
        let config = FileBasedAccessControlConfig::from_properties(properties)?;
        Ok(Arc::new(FileBasedSystemAccessControl::from_config(&config)?))
    }
}
