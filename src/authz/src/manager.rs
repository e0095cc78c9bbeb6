//! Access Control Manager
//!
//! Single entry point the platform calls for every authorization decision.
//! Dispatches to the active providers: a check passes only if every provider
//! allows it, and filters are applied provider by provider so the result is
//! the intersection of what each provider keeps.
//!
//! With no provider configured every check passes and every filter returns
//! its input unchanged.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::RwLock;
use sqlguard_core::{
    CatalogSchemaName, CatalogSchemaTableName, GrantPrincipal, Identity, Operation, Privilege, SchemaTableName,
    TransactionId,
};
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug_span, info, warn};

use crate::config::{AccessControlConfigFile, Properties};
use crate::error::{AccessControlError, Result};
use crate::file_based::FileBasedAccessControlFactory;
use crate::provider::{deny, AllowAllFactory, ReadOnlyFactory, SystemAccessControl, SystemAccessControlFactory};

/// Dispatcher over the registered access control providers
pub struct AccessControlManager {
    factories: DashMap<String, Arc<dyn SystemAccessControlFactory>>,
    providers: RwLock<Vec<Arc<dyn SystemAccessControl>>>,
}

impl AccessControlManager {
    /// Manager with the built-in factories registered and no active provider
    pub fn new() -> Self {
        let manager = Self {
            factories: DashMap::new(),
            providers: RwLock::new(Vec::new()),
        };

        let builtins: [Arc<dyn SystemAccessControlFactory>; 3] = [
            Arc::new(FileBasedAccessControlFactory),
            Arc::new(AllowAllFactory),
            Arc::new(ReadOnlyFactory),
        ];
        for factory in builtins {
            manager.factories.insert(factory.name().to_string(), factory);
        }

        info!("No system access control configured, allowing all operations");
        manager
    }

    /// Register an additional factory; names must be unique
    pub fn add_factory(&self, factory: Arc<dyn SystemAccessControlFactory>) -> Result<()> {
        let name = factory.name().to_string();
        match self.factories.entry(name) {
            Entry::Occupied(entry) => Err(AccessControlError::Configuration(format!(
                "access control '{}' is already registered",
                entry.key()
            ))),
            Entry::Vacant(entry) => {
                entry.insert(factory);
                Ok(())
            }
        }
    }

    /// Names of every registered factory, sorted
    pub fn factory_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.iter().map(|entry| entry.key().clone()).collect();
        names.sort();
        names
    }

    /// Replace the active providers with a single newly created one
    pub fn set_system_access_control(&self, name: &str, properties: &Properties) -> Result<()> {
        let provider = self.create(name, properties)?;
        *self.providers.write() = vec![provider];
        info!("Using system access control {}", name);
        Ok(())
    }

    /// Add a provider next to the active ones; every provider must allow a check
    pub fn add_system_access_control(&self, name: &str, properties: &Properties) -> Result<()> {
        let provider = self.create(name, properties)?;
        let mut providers = self.providers.write();
        providers.push(provider);
        info!("Added system access control {} ({} active)", name, providers.len());
        Ok(())
    }

    /// Activate the provider described by a TOML configuration file
    pub fn load_system_access_control(&self, path: &Path) -> Result<()> {
        let config = AccessControlConfigFile::load(path)?;
        info!("Loading system access control from {}", path.display());
        self.set_system_access_control(&config.name, &config.properties)
    }

    /// Number of active providers; zero means everything is allowed
    pub fn provider_count(&self) -> usize {
        self.providers.read().len()
    }

    fn create(&self, name: &str, properties: &Properties) -> Result<Arc<dyn SystemAccessControl>> {
        let factory = self
            .factories
            .get(name)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| {
                AccessControlError::Configuration(format!("access control '{}' is not registered", name))
            })?;
        factory.create(properties)
    }

    fn providers(&self) -> Vec<Arc<dyn SystemAccessControl>> {
        self.providers.read().clone()
    }

    /// Run a check against every provider, stopping at the first denial
    fn check_all<F>(&self, user: &str, check: F) -> Result<()>
    where
        F: Fn(&dyn SystemAccessControl) -> Result<()>,
    {
        for provider in self.providers() {
            if let Err(e) = check(provider.as_ref()) {
                warn!(user, error = %e, "access control check failed");
                return Err(e);
            }
        }
        Ok(())
    }

    /// Thread a set through every provider's filter
    fn filter_all<T, F>(&self, user: &str, items: BTreeSet<T>, filter: F) -> Result<BTreeSet<T>>
    where
        F: Fn(&dyn SystemAccessControl, BTreeSet<T>) -> Result<BTreeSet<T>>,
    {
        self.providers().iter().try_fold(items, |items, provider| {
            filter(provider.as_ref(), items).map_err(|e| {
                warn!(user, error = %e, "access control filter failed");
                e
            })
        })
    }

    // ============================================================================
    // Identity
    // ============================================================================

    /// Whether `principal` may act as `user`
    pub fn check_can_set_user(&self, principal: Option<&str>, user: &str) -> Result<()> {
        let _span = debug_span!("access_control", user, ?principal).entered();
        if user.is_empty() {
            return Err(deny(Operation::SetUser, "''"));
        }
        self.check_all(user, |provider| provider.check_can_set_user(principal, user))
    }

    pub fn check_can_set_system_session_property(&self, identity: &Identity, property: &str) -> Result<()> {
        let _span = debug_span!("access_control", user = identity.user()).entered();
        self.check_all(identity.user(), |provider| {
            provider.check_can_set_system_session_property(identity, property)
        })
    }

    // ============================================================================
    // Catalogs and schemas
    // ============================================================================

    pub fn check_can_access_catalog(&self, transaction: TransactionId, identity: &Identity, catalog: &str) -> Result<()> {
        let _span = debug_span!("access_control", %transaction, user = identity.user()).entered();
        self.check_all(identity.user(), |provider| provider.check_can_access_catalog(identity, catalog))
    }

    pub fn filter_catalogs(
        &self,
        transaction: TransactionId,
        identity: &Identity,
        catalogs: BTreeSet<String>,
    ) -> Result<BTreeSet<String>> {
        let _span = debug_span!("access_control", %transaction, user = identity.user()).entered();
        self.filter_all(identity.user(), catalogs, |provider, catalogs| {
            provider.filter_catalogs(identity, catalogs)
        })
    }

    pub fn check_can_create_schema(
        &self,
        transaction: TransactionId,
        identity: &Identity,
        schema: &CatalogSchemaName,
    ) -> Result<()> {
        let _span = debug_span!("access_control", %transaction, user = identity.user()).entered();
        self.check_all(identity.user(), |provider| provider.check_can_create_schema(identity, schema))
    }

    pub fn check_can_drop_schema(
        &self,
        transaction: TransactionId,
        identity: &Identity,
        schema: &CatalogSchemaName,
    ) -> Result<()> {
        let _span = debug_span!("access_control", %transaction, user = identity.user()).entered();
        self.check_all(identity.user(), |provider| provider.check_can_drop_schema(identity, schema))
    }

    pub fn check_can_rename_schema(
        &self,
        transaction: TransactionId,
        identity: &Identity,
        schema: &CatalogSchemaName,
        new_name: &str,
    ) -> Result<()> {
        let _span = debug_span!("access_control", %transaction, user = identity.user()).entered();
        self.check_all(identity.user(), |provider| {
            provider.check_can_rename_schema(identity, schema, new_name)
        })
    }

    pub fn check_can_show_schemas(&self, transaction: TransactionId, identity: &Identity, catalog: &str) -> Result<()> {
        let _span = debug_span!("access_control", %transaction, user = identity.user()).entered();
        self.check_all(identity.user(), |provider| provider.check_can_show_schemas(identity, catalog))
    }

    pub fn filter_schemas(
        &self,
        transaction: TransactionId,
        identity: &Identity,
        catalog: &str,
        schemas: BTreeSet<String>,
    ) -> Result<BTreeSet<String>> {
        let _span = debug_span!("access_control", %transaction, user = identity.user()).entered();
        self.filter_all(identity.user(), schemas, |provider, schemas| {
            provider.filter_schemas(identity, catalog, schemas)
        })
    }

    // ============================================================================
    // Tables, columns and views
    // ============================================================================

    pub fn check_can_show_tables_metadata(
        &self,
        transaction: TransactionId,
        identity: &Identity,
        schema: &CatalogSchemaName,
    ) -> Result<()> {
        let _span = debug_span!("access_control", %transaction, user = identity.user()).entered();
        self.check_all(identity.user(), |provider| {
            provider.check_can_show_tables_metadata(identity, schema)
        })
    }

    pub fn filter_tables(
        &self,
        transaction: TransactionId,
        identity: &Identity,
        catalog: &str,
        tables: BTreeSet<SchemaTableName>,
    ) -> Result<BTreeSet<SchemaTableName>> {
        let _span = debug_span!("access_control", %transaction, user = identity.user()).entered();
        self.filter_all(identity.user(), tables, |provider, tables| {
            provider.filter_tables(identity, catalog, tables)
        })
    }

    pub fn check_can_create_table(
        &self,
        transaction: TransactionId,
        identity: &Identity,
        table: &CatalogSchemaTableName,
    ) -> Result<()> {
        let _span = debug_span!("access_control", %transaction, user = identity.user()).entered();
        self.check_all(identity.user(), |provider| provider.check_can_create_table(identity, table))
    }

    pub fn check_can_drop_table(
        &self,
        transaction: TransactionId,
        identity: &Identity,
        table: &CatalogSchemaTableName,
    ) -> Result<()> {
        let _span = debug_span!("access_control", %transaction, user = identity.user()).entered();
        self.check_all(identity.user(), |provider| provider.check_can_drop_table(identity, table))
    }

    pub fn check_can_rename_table(
        &self,
        transaction: TransactionId,
        identity: &Identity,
        table: &CatalogSchemaTableName,
        new_table: &CatalogSchemaTableName,
    ) -> Result<()> {
        let _span = debug_span!("access_control", %transaction, user = identity.user()).entered();
        self.check_all(identity.user(), |provider| {
            provider.check_can_rename_table(identity, table, new_table)
        })
    }

    pub fn check_can_add_column(
        &self,
        transaction: TransactionId,
        identity: &Identity,
        table: &CatalogSchemaTableName,
    ) -> Result<()> {
        let _span = debug_span!("access_control", %transaction, user = identity.user()).entered();
        self.check_all(identity.user(), |provider| provider.check_can_add_column(identity, table))
    }

    pub fn check_can_drop_column(
        &self,
        transaction: TransactionId,
        identity: &Identity,
        table: &CatalogSchemaTableName,
    ) -> Result<()> {
        let _span = debug_span!("access_control", %transaction, user = identity.user()).entered();
        self.check_all(identity.user(), |provider| provider.check_can_drop_column(identity, table))
    }

    pub fn check_can_rename_column(
        &self,
        transaction: TransactionId,
        identity: &Identity,
        table: &CatalogSchemaTableName,
    ) -> Result<()> {
        let _span = debug_span!("access_control", %transaction, user = identity.user()).entered();
        self.check_all(identity.user(), |provider| provider.check_can_rename_column(identity, table))
    }

    pub fn check_can_select_from_columns(
        &self,
        transaction: TransactionId,
        identity: &Identity,
        table: &CatalogSchemaTableName,
        columns: &BTreeSet<String>,
    ) -> Result<()> {
        let _span = debug_span!("access_control", %transaction, user = identity.user()).entered();
        self.check_all(identity.user(), |provider| {
            provider.check_can_select_from_columns(identity, table, columns)
        })
    }

    pub fn check_can_insert_into_table(
        &self,
        transaction: TransactionId,
        identity: &Identity,
        table: &CatalogSchemaTableName,
    ) -> Result<()> {
        let _span = debug_span!("access_control", %transaction, user = identity.user()).entered();
        self.check_all(identity.user(), |provider| provider.check_can_insert_into_table(identity, table))
    }

    pub fn check_can_delete_from_table(
        &self,
        transaction: TransactionId,
        identity: &Identity,
        table: &CatalogSchemaTableName,
    ) -> Result<()> {
        let _span = debug_span!("access_control", %transaction, user = identity.user()).entered();
        self.check_all(identity.user(), |provider| provider.check_can_delete_from_table(identity, table))
    }

    pub fn check_can_create_view(
        &self,
        transaction: TransactionId,
        identity: &Identity,
        view: &CatalogSchemaTableName,
    ) -> Result<()> {
        let _span = debug_span!("access_control", %transaction, user = identity.user()).entered();
        self.check_all(identity.user(), |provider| provider.check_can_create_view(identity, view))
    }

    pub fn check_can_drop_view(
        &self,
        transaction: TransactionId,
        identity: &Identity,
        view: &CatalogSchemaTableName,
    ) -> Result<()> {
        let _span = debug_span!("access_control", %transaction, user = identity.user()).entered();
        self.check_all(identity.user(), |provider| provider.check_can_drop_view(identity, view))
    }

    pub fn check_can_create_view_with_select_from_columns(
        &self,
        transaction: TransactionId,
        identity: &Identity,
        table: &CatalogSchemaTableName,
        columns: &BTreeSet<String>,
    ) -> Result<()> {
        let _span = debug_span!("access_control", %transaction, user = identity.user()).entered();
        self.check_all(identity.user(), |provider| {
            provider.check_can_create_view_with_select_from_columns(identity, table, columns)
        })
    }

    // ============================================================================
    // Session properties and privileges
    // ============================================================================

    pub fn check_can_set_catalog_session_property(
        &self,
        transaction: TransactionId,
        identity: &Identity,
        catalog: &str,
        property: &str,
    ) -> Result<()> {
        let _span = debug_span!("access_control", %transaction, user = identity.user()).entered();
        self.check_all(identity.user(), |provider| {
            provider.check_can_set_catalog_session_property(identity, catalog, property)
        })
    }

    pub fn check_can_grant_table_privilege(
        &self,
        transaction: TransactionId,
        identity: &Identity,
        privilege: Privilege,
        table: &CatalogSchemaTableName,
        grantee: &GrantPrincipal,
        with_grant_option: bool,
    ) -> Result<()> {
        let _span = debug_span!("access_control", %transaction, user = identity.user()).entered();
        self.check_all(identity.user(), |provider| {
            provider.check_can_grant_table_privilege(identity, privilege, table, grantee, with_grant_option)
        })
    }

    pub fn check_can_revoke_table_privilege(
        &self,
        transaction: TransactionId,
        identity: &Identity,
        privilege: Privilege,
        table: &CatalogSchemaTableName,
        revokee: &GrantPrincipal,
        grant_option_for: bool,
    ) -> Result<()> {
        let _span = debug_span!("access_control", %transaction, user = identity.user()).entered();
        self.check_all(identity.user(), |provider| {
            provider.check_can_revoke_table_privilege(identity, privilege, table, revokee, grant_option_for)
        })
    }
}

impl Default for AccessControlManager {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for AccessControlManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessControlManager")
            .field("factories", &self.factory_names())
            .field("providers", &*self.providers.read())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::AllowAllSystemAccessControl;

    #[derive(Debug)]
    struct NamedFactory(&'static str);

    impl SystemAccessControlFactory for NamedFactory {
        fn name(&self) -> &str {
            self.0
        }

        fn create(&self, _properties: &Properties) -> Result<Arc<dyn SystemAccessControl>> {
            Ok(Arc::new(AllowAllSystemAccessControl))
        }
    }

    #[test]
    fn test_builtin_factories_are_registered() {
        let manager = AccessControlManager::new();
        assert_eq!(manager.factory_names(), vec!["allow-all", "file", "read-only"]);
        assert_eq!(manager.provider_count(), 0);
    }

    #[test]
    fn test_duplicate_factory_is_rejected() {
        let manager = AccessControlManager::new();
        manager.add_factory(Arc::new(NamedFactory("custom"))).unwrap();

        let err = manager.add_factory(Arc::new(NamedFactory("custom"))).unwrap_err();
        assert!(matches!(err, AccessControlError::Configuration(_)));
        let err = manager.add_factory(Arc::new(NamedFactory("file"))).unwrap_err();
        assert!(err.to_string().contains("file"));
    }

    #[test]
    fn test_unknown_provider_is_a_configuration_error() {
        let manager = AccessControlManager::new();
        let err = manager.set_system_access_control("ldap", &Properties::new()).unwrap_err();
        assert!(matches!(err, AccessControlError::Configuration(_)));
        assert_eq!(manager.provider_count(), 0);
    }

    #[test]
    fn test_set_replaces_and_add_appends() {
        let manager = AccessControlManager::new();
        manager.set_system_access_control("allow-all", &Properties::new()).unwrap();
        manager.set_system_access_control("read-only", &Properties::new()).unwrap();
        assert_eq!(manager.provider_count(), 1);

        manager.add_system_access_control("allow-all", &Properties::new()).unwrap();
        assert_eq!(manager.provider_count(), 2);
    }

    #[test]
    fn test_empty_user_is_denied() {
        let manager = AccessControlManager::new();
        assert!(manager.check_can_set_user(Some("alice"), "").unwrap_err().is_access_denied());
        assert!(manager.check_can_set_user(Some("alice"), "alice").is_ok());
    }
}
