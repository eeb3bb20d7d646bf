//! Base-table discovery over a SELECT statement's FROM structure.

use crate::executor::DUAL_TABLE;
use crate::parser::{quote_identifier, FromItem, Select, SelectStatement};
use std::fmt;
use std::hash::{Hash, Hasher};

/// One FROM-clause occurrence of a base table. Names and aliases compare
/// case-insensitively, like the catalog and column qualifiers.
#[derive(Debug, Clone)]
pub struct TableRef {
    pub name: String,
    pub alias: Option<String>,
}

impl TableRef {
    #[must_use]
    pub fn new(name: &str, alias: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            alias: alias.map(str::to_string),
        }
    }

    /// Name the table's columns are qualified with inside the query.
    #[must_use]
    pub fn qualifier(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    fn is_dual(&self) -> bool {
        self.name.eq_ignore_ascii_case(DUAL_TABLE)
    }
}

impl PartialEq for TableRef {
    fn eq(&self, other: &Self) -> bool {
        self.name.eq_ignore_ascii_case(&other.name)
            && match (&self.alias, &other.alias) {
                (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
                (None, None) => true,
                _ => false,
            }
    }
}

impl Eq for TableRef {}

impl Hash for TableRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.to_ascii_lowercase().hash(state);
        self.alias.as_deref().map(str::to_ascii_lowercase).hash(state);
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", quote_identifier(&self.name))?;
        if let Some(alias) = &self.alias {
            write!(f, " AS {}", quote_identifier(alias))?;
        }
        Ok(())
    }
}

pub struct AliasCollector;

impl AliasCollector {
    /// Every base table the statement reads, through joins, parentheses,
    /// subqueries and UNION branches. First occurrence wins; `dual` is dropped.
    #[must_use]
    pub fn collect(stmt: &SelectStatement) -> Vec<TableRef> {
        let mut found = Vec::new();
        Self::statement(stmt, &mut found);
        Self::finish(found)
    }

    /// Base tables visible in one SELECT's own FROM clause, without
    /// descending into subqueries.
    #[must_use]
    pub fn scope_tables(select: &Select) -> Vec<TableRef> {
        let mut found = Vec::new();
        for item in &select.from {
            Self::from_item(item, false, &mut found);
        }
        Self::finish(found)
    }

    fn finish(found: Vec<TableRef>) -> Vec<TableRef> {
        let mut unique: Vec<TableRef> = Vec::with_capacity(found.len());
        for table in found {
            if !table.is_dual() && !unique.contains(&table) {
                unique.push(table);
            }
        }
        unique
    }

    fn statement(stmt: &SelectStatement, found: &mut Vec<TableRef>) {
        match stmt {
            SelectStatement::Select(select) => {
                for item in &select.from {
                    Self::from_item(item, true, found);
                }
            }
            SelectStatement::Union { left, right, .. } => {
                Self::statement(left, found);
                Self::statement(right, found);
            }
            SelectStatement::Parenthesized(inner) => Self::statement(inner, found),
        }
    }

    fn from_item(item: &FromItem, into_subqueries: bool, found: &mut Vec<TableRef>) {
        match item {
            FromItem::Table { name, alias } => found.push(TableRef::new(name, alias.as_deref())),
            // The subquery's own alias names a derived table, not a base table
            FromItem::Subquery { query, .. } => {
                if into_subqueries {
                    Self::statement(query, found);
                }
            }
            FromItem::Parenthesized(items) => {
                for inner in items {
                    Self::from_item(inner, into_subqueries, found);
                }
            }
            FromItem::Join { left, right, .. } => {
                Self::from_item(left, into_subqueries, found);
                Self::from_item(right, into_subqueries, found);
            }
        }
    }
}
