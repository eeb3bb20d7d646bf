// Module declarations
pub mod error;
pub mod value;
pub mod data_type;
pub mod column;
pub mod row;
pub mod table;
pub mod database;

// Re-exports for convenience
pub use error::DatabaseError;
pub use value::Value;
pub use data_type::{Affinity, DataType};
pub use column::{Column, ROWTIME_COLUMN};
pub use row::Row;
pub use table::Table;
pub use database::Database;

#[cfg(test)]
mod tests {
    use super::*;

    fn column(name: &str, data_type: DataType) -> Column {
        Column {
            name: name.to_string(),
            data_type,
            nullable: true,
            primary_key: false,
            unique: false,
            default: None,
        }
    }

    #[test]
    fn test_value_display() {
        assert_eq!(Value::Null.to_string(), "NULL");
        assert_eq!(Value::Integer(42).to_string(), "42");
        assert_eq!(Value::Real(3.5).to_string(), "3.5");
        assert_eq!(Value::Text("hello".to_string()).to_string(), "hello");
        assert_eq!(Value::Boolean(true).to_string(), "true");
    }

    #[test]
    fn test_table_prepends_rowtime() {
        let table = Table::new("events".to_string(), vec![column("name", DataType::Text)]).unwrap();
        assert_eq!(table.columns.len(), 2);
        assert!(table.columns[0].is_rowtime());
        assert!(table.columns[0].primary_key);
        assert!(!table.columns[0].nullable);
        assert_eq!(table.rowtime_index, 0);
    }

    #[test]
    fn test_table_accepts_declared_rowtime() {
        let mut rowtime = column("rowtime", DataType::BigInt);
        rowtime.nullable = false;
        let table = Table::new(
            "events".to_string(),
            vec![column("name", DataType::Text), rowtime],
        )
        .unwrap();
        assert_eq!(table.columns.len(), 2);
        assert_eq!(table.rowtime_index, 1);
        assert!(table.columns[1].primary_key);
    }

    #[test]
    fn test_table_rejects_bad_rowtime() {
        let not_int = {
            let mut c = column("rowtime", DataType::Text);
            c.nullable = false;
            c
        };
        assert!(matches!(
            Table::new("t".to_string(), vec![not_int]),
            Err(DatabaseError::InvalidRowtime(_))
        ));

        let nullable = column("rowtime", DataType::BigInt);
        assert!(matches!(
            Table::new("t".to_string(), vec![nullable]),
            Err(DatabaseError::InvalidRowtime(_))
        ));
    }

    #[test]
    fn test_table_insert() {
        let mut table = Table::new("users".to_string(), vec![column("name", DataType::Text)]).unwrap();
        let row = Row::new(vec![Value::Integer(10), Value::Text("Alice".to_string())]);

        assert!(table.insert(row).is_ok());
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.max_rowtime, 10);
        assert_eq!(table.next_rowtime(5), 11);
        assert_eq!(table.next_rowtime(50), 50);
    }

    #[test]
    fn test_table_insert_wrong_column_count() {
        let mut table = Table::new("users".to_string(), vec![]).unwrap();
        let row = Row::new(vec![Value::Integer(1), Value::Text("Alice".to_string())]);

        assert!(matches!(
            table.insert(row),
            Err(DatabaseError::ColumnCountMismatch { expected: 1, actual: 2 })
        ));
    }

    #[test]
    fn test_table_insert_rowtime_must_increase() {
        let mut table = Table::new("users".to_string(), vec![]).unwrap();
        table.insert(Row::new(vec![Value::Integer(20)])).unwrap();
        assert!(matches!(
            table.insert(Row::new(vec![Value::Integer(20)])),
            Err(DatabaseError::InvalidRowtime(_))
        ));
        assert!(matches!(
            table.insert(Row::new(vec![Value::Integer(0)])),
            Err(DatabaseError::InvalidRowtime(_))
        ));
    }

    #[test]
    fn test_table_unique_and_not_null() {
        let mut email = column("email", DataType::Text);
        email.unique = true;
        email.nullable = false;
        let mut table = Table::new("users".to_string(), vec![email]).unwrap();
        table
            .insert(Row::new(vec![Value::Integer(1), Value::Text("a@x".to_string())]))
            .unwrap();
        assert!(matches!(
            table.insert(Row::new(vec![Value::Integer(2), Value::Text("a@x".to_string())])),
            Err(DatabaseError::UniqueViolation { .. })
        ));
        assert!(matches!(
            table.insert(Row::new(vec![Value::Integer(3), Value::Null])),
            Err(DatabaseError::NotNullViolation(_))
        ));
    }

    #[test]
    fn test_table_get_column_index() {
        let table = Table::new("users".to_string(), vec![column("name", DataType::Text)]).unwrap();
        assert_eq!(table.get_column_index("rowtime"), Some(0));
        assert_eq!(table.get_column_index("NAME"), Some(1));
        assert_eq!(table.get_column_index("age"), None);
    }

    #[test]
    fn test_database_create_duplicate_table() {
        let mut db = Database::new("test_db".to_string());
        let table1 = Table::new("users".to_string(), vec![]).unwrap();
        let table2 = Table::new("Users".to_string(), vec![]).unwrap();

        assert!(db.create_table(table1).is_ok());
        assert!(matches!(
            db.create_table(table2),
            Err(DatabaseError::TableAlreadyExists(_))
        ));
        assert!(db.get_table("USERS").is_some());
    }

    #[test]
    fn test_database_drop_nonexistent_table() {
        let mut db = Database::new("test_db".to_string());
        assert!(matches!(
            db.drop_table("users"),
            Err(DatabaseError::TableNotFound(_))
        ));
    }

    #[test]
    fn test_affinity_mapping() {
        assert_eq!(DataType::BigInt.affinity(), Affinity::Integer);
        assert_eq!(DataType::Boolean.affinity(), Affinity::Integer);
        assert_eq!(DataType::Real.affinity(), Affinity::Real);
        assert_eq!(DataType::Numeric { precision: 10, scale: 2 }.affinity(), Affinity::Numeric);
        assert_eq!(DataType::Timestamp.affinity(), Affinity::Text);
        assert_eq!(DataType::Bytea.affinity(), Affinity::Blob);
    }
}
