use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use super::table::Table;
use super::error::DatabaseError;

/// Catalog of tables, keyed by lower-cased name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Database {
    pub name: String,
    pub tables: BTreeMap<String, Table>,
}

impl Database {
    #[must_use]
    pub fn new(name: String) -> Self {
        Self {
            name,
            tables: BTreeMap::new(),
        }
    }

    pub fn create_table(&mut self, table: Table) -> Result<(), DatabaseError> {
        let key = table.name.to_lowercase();
        if self.tables.contains_key(&key) {
            return Err(DatabaseError::TableAlreadyExists(table.name));
        }
        self.tables.insert(key, table);
        Ok(())
    }

    #[must_use]
    pub fn get_table(&self, name: &str) -> Option<&Table> {
        self.tables.get(&name.to_lowercase())
    }

    pub fn get_table_mut(&mut self, name: &str) -> Option<&mut Table> {
        self.tables.get_mut(&name.to_lowercase())
    }

    pub fn table(&self, name: &str) -> Result<&Table, DatabaseError> {
        self.get_table(name)
            .ok_or_else(|| DatabaseError::TableNotFound(name.to_string()))
    }

    pub fn drop_table(&mut self, name: &str) -> Result<(), DatabaseError> {
        self.tables
            .remove(&name.to_lowercase())
            .ok_or_else(|| DatabaseError::TableNotFound(name.to_string()))?;
        Ok(())
    }
}
