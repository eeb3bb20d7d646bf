/// Query (SELECT) operations
///
/// FROM (tables, subqueries, joins), WHERE, GROUP BY / aggregates, HAVING,
/// projection, DISTINCT, ORDER BY, OFFSET / LIMIT and UNION.

use crate::types::{Database, DatabaseError, Value};
use crate::parser::{
    Expr, FromItem, JoinKind, OrderByExpr, Select, SelectItem, SelectStatement, SortOrder,
};
use super::conditions::{Binding, EvalContext, ExprEvaluator};
use std::cmp::Ordering;

/// Name of the always-present one-row table.
pub const DUAL_TABLE: &str = "dual";

/// Intermediate result: named columns and materialized rows.
#[derive(Debug, Clone, Default)]
pub struct Relation {
    pub columns: Vec<Binding>,
    pub rows: Vec<Vec<Value>>,
}

impl Relation {
    /// One row with no columns: the input of a FROM-less SELECT.
    fn unit() -> Self {
        Self {
            columns: Vec::new(),
            rows: vec![Vec::new()],
        }
    }

    #[must_use]
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|b| b.name.clone()).collect()
    }

    fn cross(self, other: Self) -> Self {
        let mut columns = self.columns;
        columns.extend(other.columns);
        let mut rows = Vec::with_capacity(self.rows.len() * other.rows.len());
        for l in &self.rows {
            for r in &other.rows {
                rows.push(concat(l, r));
            }
        }
        Self { columns, rows }
    }
}

fn concat(l: &[Value], r: &[Value]) -> Vec<Value> {
    let mut row = Vec::with_capacity(l.len() + r.len());
    row.extend_from_slice(l);
    row.extend_from_slice(r);
    row
}

fn rows_equal(a: &[Value], b: &[Value]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.sort_cmp(y) == Ordering::Equal)
}

/// Keep the first occurrence of each row (paired with its sort keys).
fn dedup(rows: Vec<(Vec<Value>, Vec<Value>)>) -> Vec<(Vec<Value>, Vec<Value>)> {
    let mut unique: Vec<(Vec<Value>, Vec<Value>)> = Vec::with_capacity(rows.len());
    for row in rows {
        if !unique.iter().any(|u| rows_equal(&u.0, &row.0)) {
            unique.push(row);
        }
    }
    unique
}

fn sort_and_slice(
    mut rows: Vec<(Vec<Value>, Vec<Value>)>,
    order_by: &[OrderByExpr],
    limit: Option<u64>,
    offset: Option<u64>,
) -> Vec<Vec<Value>> {
    if !order_by.is_empty() {
        rows.sort_by(|(_, a), (_, b)| {
            for (i, item) in order_by.iter().enumerate() {
                let ord = a[i].sort_cmp(&b[i]);
                let ord = if item.order == SortOrder::Desc { ord.reverse() } else { ord };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            Ordering::Equal
        });
    }

    let offset = usize::try_from(offset.unwrap_or(0)).unwrap_or(usize::MAX);
    let limit = limit.map_or(usize::MAX, |l| usize::try_from(l).unwrap_or(usize::MAX));
    rows.into_iter().skip(offset).take(limit).map(|(row, _)| row).collect()
}

pub struct QueryExecutor;

impl QueryExecutor {
    /// Run any SELECT-family statement to a materialized relation.
    pub fn execute(db: &Database, statement: &SelectStatement) -> Result<Relation, DatabaseError> {
        match statement {
            SelectStatement::Select(select) => Self::select(db, select),
            SelectStatement::Parenthesized(inner) => Self::execute(db, inner),
            SelectStatement::Union { left, right, all, order_by, limit, offset } => {
                let left = Self::execute(db, left)?;
                let right = Self::execute(db, right)?;
                if left.columns.len() != right.columns.len() {
                    return Err(DatabaseError::ColumnCountMismatch {
                        expected: left.columns.len(),
                        actual: right.columns.len(),
                    });
                }

                // Output columns carry the left branch's names, unqualified
                let columns: Vec<Binding> = left
                    .columns
                    .iter()
                    .map(|b| Binding::new(None, &b.name))
                    .collect();
                let mut rows = Vec::with_capacity(left.rows.len() + right.rows.len());
                for row in left.rows.into_iter().chain(right.rows) {
                    let keys = Self::output_keys(&columns, &row, order_by)?;
                    rows.push((row, keys));
                }
                if !*all {
                    rows = dedup(rows);
                }

                Ok(Relation {
                    rows: sort_and_slice(rows, order_by, *limit, *offset),
                    columns,
                })
            }
        }
    }

    /// ORDER BY keys evaluated against already-projected rows.
    fn output_keys(
        columns: &[Binding],
        row: &[Value],
        order_by: &[OrderByExpr],
    ) -> Result<Vec<Value>, DatabaseError> {
        order_by
            .iter()
            .map(|item| match Self::positional(&item.expr, columns.len())? {
                Some(idx) => Ok(row[idx].clone()),
                None => ExprEvaluator::evaluate(&item.expr, &EvalContext::row(columns, row)),
            })
            .collect()
    }

    /// `ORDER BY 2` refers to the second output column.
    fn positional(expr: &Expr, width: usize) -> Result<Option<usize>, DatabaseError> {
        match expr {
            Expr::Literal(Value::Integer(n)) => match usize::try_from(*n) {
                Ok(n) if (1..=width).contains(&n) => Ok(Some(n - 1)),
                _ => Err(DatabaseError::ColumnNotFound(format!("ORDER BY position {n}"))),
            },
            _ => Ok(None),
        }
    }

    fn from_item(db: &Database, item: &FromItem) -> Result<Relation, DatabaseError> {
        match item {
            FromItem::Table { name, alias } => {
                let Some(table) = db.get_table(name) else {
                    if name.eq_ignore_ascii_case(DUAL_TABLE) {
                        return Ok(Relation::unit());
                    }
                    return Err(DatabaseError::TableNotFound(name.clone()));
                };
                let qualifier = alias.as_deref().unwrap_or(name);
                Ok(Relation {
                    columns: table
                        .columns
                        .iter()
                        .map(|c| Binding::new(Some(qualifier), &c.name))
                        .collect(),
                    rows: table.rows.iter().map(|r| r.values.clone()).collect(),
                })
            }
            FromItem::Subquery { query, alias } => {
                let inner = Self::execute(db, query)?;
                Ok(Relation {
                    columns: inner
                        .columns
                        .iter()
                        .map(|b| Binding::new(alias.as_deref(), &b.name))
                        .collect(),
                    rows: inner.rows,
                })
            }
            FromItem::Parenthesized(items) => Self::from_list(db, items),
            FromItem::Join { left, right, kind, on } => {
                let left = Self::from_item(db, left)?;
                let right = Self::from_item(db, right)?;
                Self::join(left, right, *kind, on.as_ref())
            }
        }
    }

    fn from_list(db: &Database, items: &[FromItem]) -> Result<Relation, DatabaseError> {
        let mut relation = Relation::unit();
        for item in items {
            relation = relation.cross(Self::from_item(db, item)?);
        }
        Ok(relation)
    }

    /// Nested-loop join.
    fn join(
        left: Relation,
        right: Relation,
        kind: JoinKind,
        on: Option<&Expr>,
    ) -> Result<Relation, DatabaseError> {
        let mut columns = left.columns.clone();
        columns.extend(right.columns.iter().cloned());

        let matches = |l: &[Value], r: &[Value]| -> Result<bool, DatabaseError> {
            match on {
                Some(cond) => ExprEvaluator::is_true(cond, &EvalContext::row(&columns, &concat(l, r))),
                None => Ok(true),
            }
        };

        let mut rows = Vec::new();
        match kind {
            JoinKind::Inner | JoinKind::Cross | JoinKind::Left => {
                let padding = vec![Value::Null; right.columns.len()];
                for l in &left.rows {
                    let mut matched = false;
                    for r in &right.rows {
                        if matches(l, r)? {
                            rows.push(concat(l, r));
                            matched = true;
                        }
                    }
                    if !matched && kind == JoinKind::Left {
                        rows.push(concat(l, &padding));
                    }
                }
            }
            JoinKind::Right => {
                let padding = vec![Value::Null; left.columns.len()];
                for r in &right.rows {
                    let mut matched = false;
                    for l in &left.rows {
                        if matches(l, r)? {
                            rows.push(concat(l, r));
                            matched = true;
                        }
                    }
                    if !matched {
                        rows.push(concat(&padding, r));
                    }
                }
            }
        }

        Ok(Relation { columns, rows })
    }

    /// Column name a projected expression gets when it has no alias.
    fn derived_name(expr: &Expr) -> String {
        match expr {
            Expr::Column(col) => col.name.clone(),
            Expr::Function { name, .. } => name.to_lowercase(),
            Expr::Aggregate { func, .. } => func.name().to_lowercase(),
            _ => "?column?".to_string(),
        }
    }

    fn output_columns(select: &Select, source: &[Binding]) -> Result<Vec<Binding>, DatabaseError> {
        let mut columns = Vec::new();
        for item in &select.projection {
            match item {
                SelectItem::Wildcard => {
                    columns.extend(source.iter().map(|b| Binding::new(None, &b.name)));
                }
                SelectItem::QualifiedWildcard(q) => {
                    let before = columns.len();
                    columns.extend(
                        source
                            .iter()
                            .filter(|b| b.qualifier.as_deref().is_some_and(|bq| bq.eq_ignore_ascii_case(q)))
                            .map(|b| Binding::new(None, &b.name)),
                    );
                    if columns.len() == before {
                        return Err(DatabaseError::TableNotFound(q.clone()));
                    }
                }
                SelectItem::Expr { expr, alias } => {
                    let name = alias.clone().unwrap_or_else(|| Self::derived_name(expr));
                    columns.push(Binding::new(None, &name));
                }
            }
        }
        Ok(columns)
    }

    fn project(select: &Select, ctx: &EvalContext<'_>) -> Result<Vec<Value>, DatabaseError> {
        let mut values = Vec::new();
        for item in &select.projection {
            match item {
                SelectItem::Wildcard => values.extend_from_slice(ctx.row),
                SelectItem::QualifiedWildcard(q) => {
                    for (b, v) in ctx.bindings.iter().zip(ctx.row) {
                        if b.qualifier.as_deref().is_some_and(|bq| bq.eq_ignore_ascii_case(q)) {
                            values.push(v.clone());
                        }
                    }
                }
                SelectItem::Expr { expr, .. } => values.push(ExprEvaluator::evaluate(expr, ctx)?),
            }
        }
        Ok(values)
    }

    /// ORDER BY keys for one output row: a position, an output column name,
    /// or an expression over the source row.
    fn sort_keys(
        order_by: &[OrderByExpr],
        output: &[Binding],
        projected: &[Value],
        ctx: &EvalContext<'_>,
    ) -> Result<Vec<Value>, DatabaseError> {
        let mut keys = Vec::with_capacity(order_by.len());
        for item in order_by {
            if let Some(idx) = Self::positional(&item.expr, output.len())? {
                keys.push(projected[idx].clone());
                continue;
            }
            if let Expr::Column(col) = &item.expr
                && col.qualifier.is_none()
            {
                let mut named = output.iter().enumerate().filter(|(_, b)| b.name.eq_ignore_ascii_case(&col.name));
                if let (Some((idx, _)), None) = (named.next(), named.next()) {
                    keys.push(projected[idx].clone());
                    continue;
                }
            }
            keys.push(ExprEvaluator::evaluate(&item.expr, ctx)?);
        }
        Ok(keys)
    }

    fn is_grouped(select: &Select) -> bool {
        !select.group_by.is_empty()
            || select.having.is_some()
            || select.projection.iter().any(|item| match item {
                SelectItem::Expr { expr, .. } => expr.contains_aggregate(),
                _ => false,
            })
            || select.order_by.iter().any(|o| o.expr.contains_aggregate())
    }

    /// Split rows into groups by the GROUP BY keys, in first-seen order.
    /// Without GROUP BY everything is one group, even when there are no rows.
    fn group_rows(
        select: &Select,
        source: &Relation,
    ) -> Result<Vec<Vec<Vec<Value>>>, DatabaseError> {
        if select.group_by.is_empty() {
            return Ok(vec![source.rows.clone()]);
        }
        let mut groups: Vec<(Vec<Value>, Vec<Vec<Value>>)> = Vec::new();
        for row in &source.rows {
            let ctx = EvalContext::row(&source.columns, row);
            let key = select
                .group_by
                .iter()
                .map(|e| ExprEvaluator::evaluate(e, &ctx))
                .collect::<Result<Vec<_>, _>>()?;
            match groups.iter_mut().find(|(k, _)| rows_equal(k, &key)) {
                Some((_, members)) => members.push(row.clone()),
                None => groups.push((key, vec![row.clone()])),
            }
        }
        Ok(groups.into_iter().map(|(_, members)| members).collect())
    }

    /// SELECT execution order:
    /// 1. FROM (cross product of items, joins)
    /// 2. WHERE filter
    /// 3. GROUP BY / aggregates, HAVING
    /// 4. Projection
    /// 5. DISTINCT
    /// 6. ORDER BY
    /// 7. OFFSET, LIMIT
    fn select(db: &Database, select: &Select) -> Result<Relation, DatabaseError> {
        let mut source = Self::from_list(db, &select.from)?;

        if let Some(selection) = &select.selection {
            let mut kept = Vec::with_capacity(source.rows.len());
            for row in source.rows {
                if ExprEvaluator::is_true(selection, &EvalContext::row(&source.columns, &row))? {
                    kept.push(row);
                }
            }
            source.rows = kept;
        }

        let columns = Self::output_columns(select, &source.columns)?;
        let mut rows = Vec::new();

        if Self::is_grouped(select) {
            let null_row = vec![Value::Null; source.columns.len()];
            for group in Self::group_rows(select, &source)? {
                let representative = group.first().unwrap_or(&null_row);
                let ctx = EvalContext::group(&source.columns, representative, &group);
                if let Some(having) = &select.having
                    && !ExprEvaluator::is_true(having, &ctx)?
                {
                    continue;
                }
                let projected = Self::project(select, &ctx)?;
                let keys = Self::sort_keys(&select.order_by, &columns, &projected, &ctx)?;
                rows.push((projected, keys));
            }
        } else {
            for row in &source.rows {
                let ctx = EvalContext::row(&source.columns, row);
                let projected = Self::project(select, &ctx)?;
                let keys = Self::sort_keys(&select.order_by, &columns, &projected, &ctx)?;
                rows.push((projected, keys));
            }
        }

        if select.distinct {
            rows = dedup(rows);
        }

        Ok(Relation {
            rows: sort_and_slice(rows, &select.order_by, select.limit, select.offset),
            columns,
        })
    }
}
