/// DDL (Data Definition Language) operations
///
/// CREATE TABLE, DROP TABLE, SHOW TABLES

use crate::types::{Column, Database, DatabaseError, Table, Value};
use crate::parser::ColumnDef;
use crate::storage::StorageEngine;
use super::conditions::Binding;
use super::queries::Relation;
use tracing::info;

pub struct DdlExecutor;

impl DdlExecutor {
    /// Execute CREATE TABLE statement
    ///
    /// The table is validated locally, written to the WAL, then picked up
    /// through catch-up like any other writer's entry.
    pub fn create_table(
        db: &mut Database,
        storage: &mut StorageEngine,
        name: &str,
        column_defs: &[ColumnDef],
        if_not_exists: bool,
    ) -> Result<(), DatabaseError> {
        if db.get_table(name).is_some() {
            if if_not_exists {
                return Ok(());
            }
            return Err(DatabaseError::TableAlreadyExists(name.to_string()));
        }

        let columns = column_defs
            .iter()
            .map(|def| {
                let default = match &def.default {
                    Some(v) => Some(v.clone().cast(&def.data_type)?),
                    None => None,
                };
                Ok(Column {
                    name: def.name.clone(),
                    data_type: def.data_type.clone(),
                    nullable: def.nullable,
                    primary_key: def.primary_key,
                    unique: def.unique,
                    default,
                })
            })
            .collect::<Result<Vec<Column>, DatabaseError>>()?;

        let table = Table::new(name.to_string(), columns)?;
        storage.log_create_table(&table)?;
        storage.catch_up(db)?;

        info!(table = name, "table created");
        Ok(())
    }

    /// Execute DROP TABLE statement
    pub fn drop_table(
        db: &mut Database,
        storage: &mut StorageEngine,
        name: &str,
        if_exists: bool,
    ) -> Result<(), DatabaseError> {
        if db.get_table(name).is_none() {
            if if_exists {
                return Ok(());
            }
            return Err(DatabaseError::TableNotFound(name.to_string()));
        }

        storage.log_drop_table(name)?;
        storage.catch_up(db)?;

        info!(table = name, "table dropped");
        Ok(())
    }

    /// SHOW TABLES, one `table_name` row per table in name order
    #[must_use]
    pub fn show_tables(db: &Database) -> Relation {
        Relation {
            columns: vec![Binding::new(None, "table_name")],
            rows: db
                .tables
                .values()
                .map(|t| vec![Value::Text(t.name.clone())])
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DataType;
    use tempfile::TempDir;

    fn def(name: &str, data_type: DataType) -> ColumnDef {
        ColumnDef {
            name: name.to_string(),
            data_type,
            nullable: true,
            primary_key: false,
            unique: false,
            default: None,
        }
    }

    #[test]
    fn test_create_and_drop_table() {
        let temp_dir = TempDir::new().unwrap();
        let mut storage = StorageEngine::new(temp_dir.path()).unwrap();
        let mut db = Database::new("main".to_string());

        DdlExecutor::create_table(&mut db, &mut storage, "users", &[def("name", DataType::Text)], false)
            .unwrap();
        let table = db.get_table("users").unwrap();
        assert_eq!(table.columns.len(), 2);
        assert!(table.columns[0].is_rowtime());

        assert!(matches!(
            DdlExecutor::create_table(&mut db, &mut storage, "USERS", &[], false),
            Err(DatabaseError::TableAlreadyExists(_))
        ));
        DdlExecutor::create_table(&mut db, &mut storage, "users", &[], true).unwrap();

        let shown = DdlExecutor::show_tables(&db);
        assert_eq!(shown.rows, vec![vec![Value::Text("users".to_string())]]);

        DdlExecutor::drop_table(&mut db, &mut storage, "users", false).unwrap();
        assert!(db.get_table("users").is_none());
        assert!(matches!(
            DdlExecutor::drop_table(&mut db, &mut storage, "users", false),
            Err(DatabaseError::TableNotFound(_))
        ));
        DdlExecutor::drop_table(&mut db, &mut storage, "users", true).unwrap();
    }

    #[test]
    fn test_create_table_casts_default() {
        let temp_dir = TempDir::new().unwrap();
        let mut storage = StorageEngine::new(temp_dir.path()).unwrap();
        let mut db = Database::new("main".to_string());

        let mut score = def("score", DataType::Real);
        score.default = Some(Value::Integer(1));
        DdlExecutor::create_table(&mut db, &mut storage, "t", &[score], false).unwrap();
        assert_eq!(db.get_table("t").unwrap().columns[1].default, Some(Value::Real(1.0)));

        let mut bad = def("n", DataType::Integer);
        bad.default = Some(Value::Text("abc".to_string()));
        assert!(matches!(
            DdlExecutor::create_table(&mut db, &mut storage, "u", &[bad], false),
            Err(DatabaseError::TypeMismatch(_))
        ));
        assert!(db.get_table("u").is_none());
    }

    #[test]
    fn test_invalid_rowtime_is_not_logged() {
        let temp_dir = TempDir::new().unwrap();
        let mut storage = StorageEngine::new(temp_dir.path()).unwrap();
        let mut db = Database::new("main".to_string());

        let rowtime = def("rowtime", DataType::Text);
        assert!(DdlExecutor::create_table(&mut db, &mut storage, "t", &[rowtime], false).is_err());

        let mut fresh = Database::new("main".to_string());
        let mut reader = StorageEngine::new(temp_dir.path()).unwrap();
        assert_eq!(reader.catch_up(&mut fresh).unwrap(), 0);
    }
}
