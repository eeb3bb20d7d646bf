use serde::{Deserialize, Serialize};
use super::data_type::DataType;
use super::value::Value;

/// Name of the insertion-order column every table carries.
pub const ROWTIME_COLUMN: &str = "rowtime";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Column {
    pub name: String,
    pub data_type: DataType,
    pub nullable: bool,
    pub primary_key: bool,
    pub unique: bool,
    pub default: Option<Value>,
}

impl Column {
    /// The column prepended to tables declared without one.
    #[must_use]
    pub fn rowtime() -> Self {
        Self {
            name: ROWTIME_COLUMN.to_string(),
            data_type: DataType::BigInt,
            nullable: false,
            primary_key: true,
            unique: true,
            default: None,
        }
    }

    #[must_use]
    pub fn is_rowtime(&self) -> bool {
        self.name.eq_ignore_ascii_case(ROWTIME_COLUMN)
    }
}
