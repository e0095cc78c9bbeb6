//! Qualified resource names
//!
//! The platform addresses resources in a three level hierarchy: catalog,
//! schema, table. Views are addressed exactly like tables.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A schema inside a catalog, displayed as `catalog.schema`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CatalogSchemaName {
    catalog: String,
    schema: String,
}

impl CatalogSchemaName {
    pub fn new(catalog: impl Into<String>, schema: impl Into<String>) -> Self {
        Self {
            catalog: catalog.into(),
            schema: schema.into(),
        }
    }

    pub fn catalog(&self) -> &str {
        &self.catalog
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }
}

impl fmt::Display for CatalogSchemaName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.catalog, self.schema)
    }
}

/// A table or view within a catalog that is known from context
///
/// This is the element type of table filtering, where the catalog is passed
/// separately.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SchemaTableName {
    schema: String,
    table: String,
}

impl SchemaTableName {
    pub fn new(schema: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
        }
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn table(&self) -> &str {
        &self.table
    }
}

impl fmt::Display for SchemaTableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.table)
    }
}

/// A fully qualified table or view, displayed as `catalog.schema.table`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CatalogSchemaTableName {
    catalog: String,
    schema_table: SchemaTableName,
}

impl CatalogSchemaTableName {
    pub fn new(
        catalog: impl Into<String>,
        schema: impl Into<String>,
        table: impl Into<String>,
    ) -> Self {
        Self {
            catalog: catalog.into(),
            schema_table: SchemaTableName::new(schema, table),
        }
    }

    /// Qualify a catalog-relative table name
    pub fn from_parts(catalog: impl Into<String>, schema_table: SchemaTableName) -> Self {
        Self {
            catalog: catalog.into(),
            schema_table,
        }
    }

    pub fn catalog(&self) -> &str {
        &self.catalog
    }

    pub fn schema(&self) -> &str {
        self.schema_table.schema()
    }

    pub fn table(&self) -> &str {
        self.schema_table.table()
    }

    pub fn schema_table(&self) -> &SchemaTableName {
        &self.schema_table
    }

    /// The schema this table lives in
    pub fn catalog_schema(&self) -> CatalogSchemaName {
        CatalogSchemaName::new(self.catalog.clone(), self.schema_table.schema())
    }
}

impl fmt::Display for CatalogSchemaTableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.catalog, self.schema_table)
    }
}
