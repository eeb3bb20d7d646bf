use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Table '{0}' not found")]
    TableNotFound(String),
    #[error("Table '{0}' already exists")]
    TableAlreadyExists(String),
    #[error("Column '{0}' not found")]
    ColumnNotFound(String),
    #[error("Column reference '{0}' is ambiguous")]
    AmbiguousColumn(String),
    #[error("Column count mismatch: expected {expected}, got {actual}")]
    ColumnCountMismatch { expected: usize, actual: usize },
    #[error("Type mismatch: {0}")]
    TypeMismatch(String),
    #[error("Column '{0}' may not be NULL")]
    NotNullViolation(String),
    #[error("Duplicate value for unique column '{column}': {value}")]
    UniqueViolation { column: String, value: String },
    #[error("Invalid rowtime column: {0}")]
    InvalidRowtime(String),
    #[error("Unsupported: {0}")]
    Unsupported(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Binary Serialization error: {0}")]
    BinarySerialization(String),
    #[error("Parse error: {0}")]
    ParseError(String),
}
