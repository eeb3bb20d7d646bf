use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum DataType {
    // Numeric types
    SmallInt,
    Integer,
    BigInt,
    Real,
    Numeric { precision: u8, scale: u8 }, // NUMERIC(p, s)
    // String types
    Text,
    Varchar { max_length: usize },  // VARCHAR(n)
    Char { length: usize },         // CHAR(n)
    // Boolean
    Boolean,
    // Date/Time types
    Date,
    Timestamp,
    TimestampTz,
    // Special types
    Uuid,
    Json,
    Bytea,
}

/// Storage class a declared type collapses to.
///
/// Inserted values are coerced through the affinity first and then checked
/// against the declared type, the same way `SQLite` treats `MySQL` column types.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Affinity {
    Integer,
    Real,
    Numeric,
    Text,
    Blob,
}

impl DataType {
    #[must_use]
    pub const fn affinity(&self) -> Affinity {
        match self {
            Self::SmallInt | Self::Integer | Self::BigInt | Self::Boolean => Affinity::Integer,
            Self::Real => Affinity::Real,
            Self::Numeric { .. } => Affinity::Numeric,
            Self::Bytea => Affinity::Blob,
            // Dates keep fractional seconds only as text
            Self::Text
            | Self::Varchar { .. }
            | Self::Char { .. }
            | Self::Date
            | Self::Timestamp
            | Self::TimestampTz
            | Self::Uuid
            | Self::Json => Affinity::Text,
        }
    }

    /// True for the types that can back a `rowtime` column.
    #[must_use]
    pub const fn is_int64(&self) -> bool {
        matches!(self, Self::BigInt | Self::Integer)
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SmallInt => write!(f, "SMALLINT"),
            Self::Integer => write!(f, "INTEGER"),
            Self::BigInt => write!(f, "BIGINT"),
            Self::Real => write!(f, "REAL"),
            Self::Numeric { precision, scale } => write!(f, "NUMERIC({precision}, {scale})"),
            Self::Text => write!(f, "TEXT"),
            Self::Varchar { max_length } => write!(f, "VARCHAR({max_length})"),
            Self::Char { length } => write!(f, "CHAR({length})"),
            Self::Boolean => write!(f, "BOOLEAN"),
            Self::Date => write!(f, "DATE"),
            Self::Timestamp => write!(f, "TIMESTAMP"),
            Self::TimestampTz => write!(f, "TIMESTAMPTZ"),
            Self::Uuid => write!(f, "UUID"),
            Self::Json => write!(f, "JSON"),
            Self::Bytea => write!(f, "BYTEA"),
        }
    }
}
