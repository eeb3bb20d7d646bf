use crate::types::{DataType, Value};
use super::common::quote_identifier;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    CreateTable {
        name: String,
        columns: Vec<ColumnDef>,
        if_not_exists: bool,
    },
    DropTable {
        name: String,
        if_exists: bool,
    },
    Insert {
        table: String,
        columns: Option<Vec<String>>,
        rows: Vec<Vec<Value>>,
    },
    ShowTables,
    /// Any SELECT-family statement
    Query(SelectStatement),
}

/// SELECT-family statement: the shapes a streaming query can take.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectStatement {
    Select(Box<Select>),
    Union {
        left: Box<SelectStatement>,
        right: Box<SelectStatement>,
        all: bool,  // UNION ALL if true, UNION (DISTINCT) if false
        /// Trailing ORDER BY / LIMIT / OFFSET apply to the combined result
        order_by: Vec<OrderByExpr>,
        limit: Option<u64>,
        offset: Option<u64>,
    },
    Parenthesized(Box<SelectStatement>),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Select {
    pub distinct: bool,
    pub projection: Vec<SelectItem>,
    pub from: Vec<FromItem>,
    pub selection: Option<Expr>,
    pub group_by: Vec<Expr>,
    pub having: Option<Expr>,
    pub order_by: Vec<OrderByExpr>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectItem {
    Wildcard,                  // *
    QualifiedWildcard(String), // t.*
    Expr { expr: Expr, alias: Option<String> },
}

/// One entry of a FROM clause.
#[derive(Debug, Clone, PartialEq)]
pub enum FromItem {
    Table {
        name: String,
        alias: Option<String>,
    },
    Subquery {
        query: Box<SelectStatement>,
        alias: Option<String>,
    },
    Parenthesized(Vec<FromItem>),
    Join {
        left: Box<FromItem>,
        right: Box<FromItem>,
        kind: JoinKind,
        on: Option<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Cross,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderByExpr {
    pub expr: Expr,
    pub order: SortOrder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRef {
    pub qualifier: Option<String>,
    pub name: String,
}

impl ColumnRef {
    #[must_use]
    pub fn new(qualifier: Option<&str>, name: &str) -> Self {
        Self {
            qualifier: qualifier.map(str::to_string),
            name: name.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Column(ColumnRef),
    Literal(Value),
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },
    IsNull {
        expr: Box<Expr>,
        negated: bool,
    },
    Between {
        expr: Box<Expr>,
        low: Box<Expr>,
        high: Box<Expr>,
        negated: bool,
    },
    InList {
        expr: Box<Expr>,
        list: Vec<Expr>,
        negated: bool,
    },
    Like {
        expr: Box<Expr>,
        pattern: Box<Expr>,
        negated: bool,
    },
    /// Scalar function call (COALESCE, UPPER, ...), name kept upper-case
    Function {
        name: String,
        args: Vec<Expr>,
    },
    Aggregate {
        func: AggregateFunction,
        /// `None` means `*` (only valid for COUNT)
        arg: Option<Box<Expr>>,
        distinct: bool,
    },
}

impl Expr {
    #[must_use]
    pub fn column(qualifier: Option<&str>, name: &str) -> Self {
        Self::Column(ColumnRef::new(qualifier, name))
    }

    #[must_use]
    pub fn binary(left: Self, op: BinaryOp, right: Self) -> Self {
        Self::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    #[must_use]
    pub fn and(left: Self, right: Self) -> Self {
        Self::binary(left, BinaryOp::And, right)
    }

    /// True if an aggregate appears anywhere in the expression.
    #[must_use]
    pub fn contains_aggregate(&self) -> bool {
        match self {
            Self::Aggregate { .. } => true,
            Self::Column(_) | Self::Literal(_) => false,
            Self::Unary { expr, .. } | Self::IsNull { expr, .. } => expr.contains_aggregate(),
            Self::Binary { left, right, .. } => left.contains_aggregate() || right.contains_aggregate(),
            Self::Between { expr, low, high, .. } => {
                expr.contains_aggregate() || low.contains_aggregate() || high.contains_aggregate()
            }
            Self::InList { expr, list, .. } => {
                expr.contains_aggregate() || list.iter().any(Self::contains_aggregate)
            }
            Self::Like { expr, pattern, .. } => expr.contains_aggregate() || pattern.contains_aggregate(),
            Self::Function { args, .. } => args.iter().any(Self::contains_aggregate),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Minus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Plus,
    Minus,
    Multiply,
    Divide,
    Modulo,
    Concat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunction {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggregateFunction {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Count => "COUNT",
            Self::Sum => "SUM",
            Self::Avg => "AVG",
            Self::Min => "MIN",
            Self::Max => "MAX",
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "COUNT" => Some(Self::Count),
            "SUM" => Some(Self::Sum),
            "AVG" => Some(Self::Avg),
            "MIN" => Some(Self::Min),
            "MAX" => Some(Self::Max),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    pub name: String,
    pub data_type: DataType,
    pub nullable: bool,
    pub primary_key: bool,
    pub unique: bool,
    pub default: Option<Value>,
}

// SQL rendering. Parenthesizes only where the parser's precedence would
// otherwise regroup the tree, so printed text parses back to an equal AST.

const PREC_OR: u8 = 1;
const PREC_AND: u8 = 2;
const PREC_NOT: u8 = 3;
const PREC_CMP: u8 = 4;
const PREC_ADD: u8 = 5;
const PREC_MUL: u8 = 6;
const PREC_NEG: u8 = 7;
const PREC_ATOM: u8 = 8;

impl BinaryOp {
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Or => "OR",
            Self::And => "AND",
            Self::Eq => "=",
            Self::NotEq => "<>",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::Modulo => "%",
            Self::Concat => "||",
        }
    }

    #[must_use]
    pub const fn is_comparison(self) -> bool {
        matches!(
            self,
            Self::Eq | Self::NotEq | Self::Lt | Self::LtEq | Self::Gt | Self::GtEq
        )
    }

    const fn precedence(self) -> u8 {
        match self {
            Self::Or => PREC_OR,
            Self::And => PREC_AND,
            Self::Eq | Self::NotEq | Self::Lt | Self::LtEq | Self::Gt | Self::GtEq => PREC_CMP,
            Self::Plus | Self::Minus | Self::Concat => PREC_ADD,
            Self::Multiply | Self::Divide | Self::Modulo => PREC_MUL,
        }
    }
}

impl Expr {
    fn precedence(&self) -> u8 {
        match self {
            Self::Binary { op, .. } => op.precedence(),
            Self::Unary { op: UnaryOp::Not, .. } => PREC_NOT,
            Self::Unary { op: UnaryOp::Minus, .. } => PREC_NEG,
            Self::IsNull { .. } | Self::Between { .. } | Self::InList { .. } | Self::Like { .. } => PREC_CMP,
            // A negative literal prints with a leading '-'
            Self::Literal(v) if v.to_sql_literal().starts_with('-') => PREC_NEG,
            _ => PREC_ATOM,
        }
    }
}

struct Grouped<'a>(&'a Expr, bool);

impl fmt::Display for Grouped<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.1 {
            write!(f, "({})", self.0)
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// Operand of a predicate (IS NULL, BETWEEN, IN, LIKE): parsed at additive level.
fn operand(expr: &Expr) -> Grouped<'_> {
    Grouped(expr, expr.precedence() <= PREC_CMP)
}

fn comma_list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

const fn not_kw(negated: bool) -> &'static str {
    if negated { "NOT " } else { "" }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(q) = &self.qualifier {
            write!(f, "{}.", quote_identifier(q))?;
        }
        write!(f, "{}", quote_identifier(&self.name))
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Column(col) => write!(f, "{col}"),
            Self::Literal(v) => write!(f, "{}", v.to_sql_literal()),
            Self::Unary { op: UnaryOp::Not, expr } => {
                write!(f, "NOT {}", Grouped(expr, expr.precedence() < PREC_NOT))
            }
            Self::Unary { op: UnaryOp::Minus, expr } => {
                write!(f, "-{}", Grouped(expr, expr.precedence() <= PREC_NEG))
            }
            Self::Binary { left, op, right } => {
                let prec = op.precedence();
                let lp = left.precedence();
                let group_left = lp < prec || (op.is_comparison() && lp == prec);
                write!(
                    f,
                    "{} {} {}",
                    Grouped(left, group_left),
                    op.symbol(),
                    Grouped(right, right.precedence() <= prec)
                )
            }
            Self::IsNull { expr, negated } => {
                write!(f, "{} IS {}NULL", operand(expr), not_kw(*negated))
            }
            Self::Between { expr, low, high, negated } => write!(
                f,
                "{} {}BETWEEN {} AND {}",
                operand(expr),
                not_kw(*negated),
                operand(low),
                operand(high)
            ),
            Self::InList { expr, list, negated } => {
                write!(f, "{} {}IN (", operand(expr), not_kw(*negated))?;
                comma_list(f, list)?;
                write!(f, ")")
            }
            Self::Like { expr, pattern, negated } => {
                write!(f, "{} {}LIKE {}", operand(expr), not_kw(*negated), operand(pattern))
            }
            Self::Function { name, args } => {
                write!(f, "{}(", name.to_ascii_uppercase())?;
                comma_list(f, args)?;
                write!(f, ")")
            }
            Self::Aggregate { func, arg, distinct } => match arg {
                None => write!(f, "{}(*)", func.name()),
                Some(arg) => write!(
                    f,
                    "{}({}{arg})",
                    func.name(),
                    if *distinct { "DISTINCT " } else { "" }
                ),
            },
        }
    }
}

impl fmt::Display for SelectItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Wildcard => write!(f, "*"),
            Self::QualifiedWildcard(q) => write!(f, "{}.*", quote_identifier(q)),
            Self::Expr { expr, alias: None } => write!(f, "{expr}"),
            Self::Expr { expr, alias: Some(alias) } => {
                write!(f, "{expr} AS {}", quote_identifier(alias))
            }
        }
    }
}

fn write_alias(f: &mut fmt::Formatter<'_>, alias: Option<&String>) -> fmt::Result {
    match alias {
        Some(alias) => write!(f, " AS {}", quote_identifier(alias)),
        None => Ok(()),
    }
}

impl fmt::Display for FromItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Table { name, alias } => {
                write!(f, "{}", quote_identifier(name))?;
                write_alias(f, alias.as_ref())
            }
            Self::Subquery { query, alias } => {
                write!(f, "({query})")?;
                write_alias(f, alias.as_ref())
            }
            Self::Parenthesized(items) => {
                write!(f, "(")?;
                comma_list(f, items)?;
                write!(f, ")")
            }
            Self::Join { left, right, kind, on } => {
                let keyword = match kind {
                    JoinKind::Inner => "JOIN",
                    JoinKind::Left => "LEFT JOIN",
                    JoinKind::Right => "RIGHT JOIN",
                    JoinKind::Cross => "CROSS JOIN",
                };
                write!(f, "{left} {keyword} ")?;
                // Joins associate to the left
                if matches!(**right, Self::Join { .. }) {
                    write!(f, "({right})")?;
                } else {
                    write!(f, "{right}")?;
                }
                match on {
                    Some(on) => write!(f, " ON {on}"),
                    None => Ok(()),
                }
            }
        }
    }
}

impl fmt::Display for OrderByExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.order {
            SortOrder::Asc => write!(f, "{}", self.expr),
            SortOrder::Desc => write!(f, "{} DESC", self.expr),
        }
    }
}

fn write_tail(
    f: &mut fmt::Formatter<'_>,
    order_by: &[OrderByExpr],
    limit: Option<u64>,
    offset: Option<u64>,
) -> fmt::Result {
    if !order_by.is_empty() {
        write!(f, " ORDER BY ")?;
        comma_list(f, order_by)?;
    }
    if let Some(limit) = limit {
        write!(f, " LIMIT {limit}")?;
    }
    if let Some(offset) = offset {
        write!(f, " OFFSET {offset}")?;
    }
    Ok(())
}

impl fmt::Display for Select {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SELECT ")?;
        if self.distinct {
            write!(f, "DISTINCT ")?;
        }
        comma_list(f, &self.projection)?;
        if !self.from.is_empty() {
            write!(f, " FROM ")?;
            comma_list(f, &self.from)?;
        }
        if let Some(selection) = &self.selection {
            write!(f, " WHERE {selection}")?;
        }
        if !self.group_by.is_empty() {
            write!(f, " GROUP BY ")?;
            comma_list(f, &self.group_by)?;
        }
        if let Some(having) = &self.having {
            write!(f, " HAVING {having}")?;
        }
        write_tail(f, &self.order_by, self.limit, self.offset)
    }
}

impl SelectStatement {
    /// A plain SELECT with a trailing clause must be wrapped to sit inside a UNION.
    fn has_tail(&self) -> bool {
        match self {
            Self::Select(select) => {
                !select.order_by.is_empty() || select.limit.is_some() || select.offset.is_some()
            }
            Self::Union { order_by, limit, offset, .. } => {
                !order_by.is_empty() || limit.is_some() || offset.is_some()
            }
            Self::Parenthesized(_) => false,
        }
    }
}

impl fmt::Display for SelectStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Select(select) => write!(f, "{select}"),
            Self::Parenthesized(inner) => write!(f, "({inner})"),
            Self::Union { left, right, all, order_by, limit, offset } => {
                if left.has_tail() {
                    write!(f, "({left})")?;
                } else {
                    write!(f, "{left}")?;
                }
                write!(f, " UNION {}", if *all { "ALL " } else { "" })?;
                if right.has_tail() || matches!(**right, Self::Union { .. }) {
                    write!(f, "({right})")?;
                } else {
                    write!(f, "{right}")?;
                }
                write_tail(f, order_by, *limit, *offset)
            }
        }
    }
}

impl fmt::Display for ColumnDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", quote_identifier(&self.name), self.data_type)?;
        if !self.nullable {
            write!(f, " NOT NULL")?;
        }
        if self.primary_key {
            write!(f, " PRIMARY KEY")?;
        }
        if self.unique {
            write!(f, " UNIQUE")?;
        }
        if let Some(default) = &self.default {
            write!(f, " DEFAULT {}", default.to_sql_literal())?;
        }
        Ok(())
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateTable { name, columns, if_not_exists } => {
                write!(f, "CREATE TABLE ")?;
                if *if_not_exists {
                    write!(f, "IF NOT EXISTS ")?;
                }
                write!(f, "{} (", quote_identifier(name))?;
                comma_list(f, columns)?;
                write!(f, ")")
            }
            Self::DropTable { name, if_exists } => write!(
                f,
                "DROP TABLE {}{}",
                if *if_exists { "IF EXISTS " } else { "" },
                quote_identifier(name)
            ),
            Self::Insert { table, columns, rows } => {
                write!(f, "INSERT INTO {}", quote_identifier(table))?;
                if let Some(columns) = columns {
                    let names: Vec<String> = columns.iter().map(|c| quote_identifier(c)).collect();
                    write!(f, " ({})", names.join(", "))?;
                }
                write!(f, " VALUES ")?;
                for (i, row) in rows.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    let values: Vec<String> = row.iter().map(Value::to_sql_literal).collect();
                    write!(f, "({})", values.join(", "))?;
                }
                Ok(())
            }
            Self::ShowTables => write!(f, "SHOW TABLES"),
            Self::Query(query) => write!(f, "{query}"),
        }
    }
}
