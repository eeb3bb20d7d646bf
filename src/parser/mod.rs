// Module declarations
mod statement;
mod common;
mod expr;
mod ddl;
mod dml;
mod queries;
mod meta;

// Re-export all public types
pub use statement::{
    Statement,
    ColumnDef,
    SelectStatement,
    Select,
    SelectItem,
    FromItem,
    JoinKind,
    OrderByExpr,
    SortOrder,
    Expr,
    ColumnRef,
    UnaryOp,
    BinaryOp,
    AggregateFunction,
};
pub use common::quote_identifier;
pub use expr::parse_expr;

use crate::types::DatabaseError;
use nom::branch::alt;

/// Parse one SQL statement; a trailing `;` is allowed.
pub fn parse_statement(input: &str) -> Result<Statement, DatabaseError> {
    let input = input.trim();
    let input = input.trim_end_matches(';');

    let result = alt((
        meta::show_tables,
        ddl::create_table,
        ddl::drop_table,
        dml::insert,
        queries::select,
    ))(input);

    match result {
        Ok((remaining, stmt)) => {
            if remaining.trim().is_empty() {
                Ok(stmt)
            } else {
                Err(DatabaseError::ParseError(format!(
                    "Unexpected input after statement: {}",
                    remaining.trim()
                )))
            }
        }
        Err(e) => Err(DatabaseError::ParseError(format!("{e:?}"))),
    }
}
