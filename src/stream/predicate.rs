//! Rowtime bound injection into WHERE clauses.

use super::tables::{AliasCollector, TableRef};
use super::watermark::WatermarkSnapshot;
use crate::parser::{BinaryOp, Expr, FromItem, Select, SelectStatement};
use crate::types::{Value, ROWTIME_COLUMN};

/// The table being advanced in a delta round and its previous watermark.
#[derive(Debug, Clone, Copy)]
pub struct Delta<'a> {
    pub table: &'a TableRef,
    pub previous: i64,
}

pub struct PredicateInjector;

impl PredicateInjector {
    /// `q.rowtime <= mark` for every table, then the original predicate,
    /// all joined left to right with AND.
    #[must_use]
    pub fn bound_all(original: Option<&Expr>, snapshot: &WatermarkSnapshot) -> Option<Expr> {
        Self::inject(original, snapshot, None)
    }

    /// [`Self::bound_all`] led by `q.rowtime > previous` for the advancing
    /// table, which keeps its upper bound as well.
    #[must_use]
    pub fn bound_delta(
        original: Option<&Expr>,
        snapshot: &WatermarkSnapshot,
        advancing: &TableRef,
        previous: i64,
    ) -> Option<Expr> {
        Self::inject(original, snapshot, Some(Delta { table: advancing, previous }))
    }

    fn bound(table: &TableRef, op: BinaryOp, mark: i64) -> Expr {
        Expr::binary(
            Expr::column(Some(table.qualifier()), ROWTIME_COLUMN),
            op,
            Expr::Literal(Value::Integer(mark)),
        )
    }

    fn inject(original: Option<&Expr>, snapshot: &WatermarkSnapshot, delta: Option<Delta<'_>>) -> Option<Expr> {
        // A delta only applies where its table is in scope
        let lower = delta
            .filter(|d| snapshot.get(d.table).is_some())
            .map(|d| Self::bound(d.table, BinaryOp::Gt, d.previous));
        let upper = snapshot
            .iter()
            .map(|(table, mark)| Self::bound(table, BinaryOp::LtEq, mark));

        lower
            .into_iter()
            .chain(upper)
            .chain(original.cloned())
            .reduce(Expr::and)
    }

    /// Rewrite a whole statement: every plain SELECT scope (top level, UNION
    /// branches, parenthesized selects, FROM subqueries) gets the bounds of
    /// the tables visible in its own FROM clause. The input is left untouched.
    #[must_use]
    pub fn bound_statement(
        stmt: &SelectStatement,
        snapshot: &WatermarkSnapshot,
        delta: Option<Delta<'_>>,
    ) -> SelectStatement {
        match stmt {
            SelectStatement::Select(select) => {
                SelectStatement::Select(Box::new(Self::bound_select(select, snapshot, delta)))
            }
            SelectStatement::Union { left, right, all, order_by, limit, offset } => SelectStatement::Union {
                left: Box::new(Self::bound_branch(stmt, left, snapshot, delta)),
                right: Box::new(Self::bound_branch(stmt, right, snapshot, delta)),
                all: *all,
                order_by: order_by.clone(),
                limit: *limit,
                offset: *offset,
            },
            SelectStatement::Parenthesized(inner) => {
                SelectStatement::Parenthesized(Box::new(Self::bound_statement(inner, snapshot, delta)))
            }
        }
    }

    /// A UNION branch that does not read the advancing table contributes
    /// nothing new in that table's delta round, so it is emptied.
    fn bound_branch(
        union: &SelectStatement,
        branch: &SelectStatement,
        snapshot: &WatermarkSnapshot,
        delta: Option<Delta<'_>>,
    ) -> SelectStatement {
        let bounded = Self::bound_statement(branch, snapshot, delta);
        match delta {
            Some(d) if Self::reads(union, d.table) && !Self::reads(branch, d.table) => Self::emptied(bounded),
            _ => bounded,
        }
    }

    fn reads(stmt: &SelectStatement, table: &TableRef) -> bool {
        AliasCollector::collect(stmt).contains(table)
    }

    /// Conjoin `FALSE` into every plain SELECT of the statement.
    fn emptied(stmt: SelectStatement) -> SelectStatement {
        match stmt {
            SelectStatement::Select(mut select) => {
                let never = Expr::Literal(Value::Boolean(false));
                select.selection = Some(match select.selection.take() {
                    Some(selection) => Expr::and(selection, never),
                    None => never,
                });
                SelectStatement::Select(select)
            }
            SelectStatement::Union { left, right, all, order_by, limit, offset } => SelectStatement::Union {
                left: Box::new(Self::emptied(*left)),
                right: Box::new(Self::emptied(*right)),
                all,
                order_by,
                limit,
                offset,
            },
            SelectStatement::Parenthesized(inner) => SelectStatement::Parenthesized(Box::new(Self::emptied(*inner))),
        }
    }

    fn bound_select(select: &Select, snapshot: &WatermarkSnapshot, delta: Option<Delta<'_>>) -> Select {
        let scope = snapshot.restrict(&AliasCollector::scope_tables(select));

        let mut bounded = select.clone();
        bounded.from = select
            .from
            .iter()
            .map(|item| Self::bound_from(item, snapshot, delta))
            .collect();
        bounded.selection = Self::inject(select.selection.as_ref(), &scope, delta);
        bounded
    }

    fn bound_from(item: &FromItem, snapshot: &WatermarkSnapshot, delta: Option<Delta<'_>>) -> FromItem {
        match item {
            FromItem::Table { .. } => item.clone(),
            FromItem::Subquery { query, alias } => FromItem::Subquery {
                query: Box::new(Self::bound_statement(query, snapshot, delta)),
                alias: alias.clone(),
            },
            FromItem::Parenthesized(items) => FromItem::Parenthesized(
                items.iter().map(|i| Self::bound_from(i, snapshot, delta)).collect(),
            ),
            FromItem::Join { left, right, kind, on } => FromItem::Join {
                left: Box::new(Self::bound_from(left, snapshot, delta)),
                right: Box::new(Self::bound_from(right, snapshot, delta)),
                kind: *kind,
                on: on.clone(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse_expr, parse_statement, Statement};

    fn query(sql: &str) -> SelectStatement {
        match parse_statement(sql).unwrap() {
            Statement::Query(q) => q,
            other => panic!("not a query: {other:?}"),
        }
    }

    fn snapshot(marks: &[(&str, Option<&str>, i64)]) -> WatermarkSnapshot {
        marks
            .iter()
            .map(|(name, alias, mark)| (TableRef::new(name, *alias), *mark))
            .collect()
    }

    fn render(expr: Option<Expr>) -> String {
        expr.map(|e| e.to_string()).unwrap_or_default()
    }

    #[test]
    fn test_bound_all_without_where_is_the_chain() {
        let snap = snapshot(&[("a", None, 10), ("b", Some("x"), 0), ("c", None, 7)]);
        assert_eq!(
            render(PredicateInjector::bound_all(None, &snap)),
            "a.rowtime <= 10 AND x.rowtime <= 0 AND c.rowtime <= 7"
        );
    }

    #[test]
    fn test_original_is_rightmost_conjunct() {
        let original = parse_expr("v = 1 OR v = 2").unwrap();
        let snap = snapshot(&[("a", None, 10)]);
        let bounded = PredicateInjector::bound_all(Some(&original), &snap).unwrap();

        let Expr::Binary { right, op: BinaryOp::And, .. } = &bounded else {
            panic!("expected AND, got {bounded}");
        };
        assert_eq!(**right, original);
        assert_eq!(bounded.to_string(), "a.rowtime <= 10 AND (v = 1 OR v = 2)");
        // Reparses to the same tree
        assert_eq!(parse_expr(&bounded.to_string()).unwrap(), bounded);
    }

    #[test]
    fn test_empty_snapshot_returns_original() {
        let original = parse_expr("v > 3").unwrap();
        let empty = WatermarkSnapshot::new();
        assert_eq!(PredicateInjector::bound_all(Some(&original), &empty), Some(original));
        assert_eq!(PredicateInjector::bound_all(None, &empty), None);
    }

    #[test]
    fn test_bound_delta_replaces_advancing_table() {
        let snap = snapshot(&[("a", None, 40), ("b", None, 5)]);
        let a = TableRef::new("a", None);
        let original = parse_expr("a.k = b.k").unwrap();
        assert_eq!(
            render(PredicateInjector::bound_delta(Some(&original), &snap, &a, 30)),
            "a.rowtime > 30 AND a.rowtime <= 40 AND b.rowtime <= 5 AND a.k = b.k"
        );
    }

    #[test]
    fn test_bound_statement_scopes() {
        let q = query(
            "SELECT * FROM a JOIN (SELECT * FROM d WHERE d.v > 1) sub ON a.id = sub.id \
             UNION ALL SELECT * FROM d",
        );
        let snap = snapshot(&[("a", None, 10), ("d", None, 7)]);
        let d = TableRef::new("d", None);

        let bounded = PredicateInjector::bound_statement(&q, &snap, Some(Delta { table: &d, previous: 3 }));
        let expected = query(
            "SELECT * FROM a JOIN (SELECT * FROM d WHERE d.rowtime > 3 AND d.rowtime <= 7 AND d.v > 1) sub ON a.id = sub.id \
             WHERE a.rowtime <= 10 \
             UNION ALL SELECT * FROM d WHERE d.rowtime > 3 AND d.rowtime <= 7",
        );
        assert_eq!(bounded, expected);

        // Input untouched
        assert_eq!(q, query(&q.to_string()));
        assert!(!q.to_string().contains("rowtime"));
    }

    #[test]
    fn test_union_branch_without_advancing_table_is_emptied() {
        let q = query("SELECT rowtime FROM a UNION ALL (SELECT rowtime FROM b WHERE b.v > 1)");
        let snap = snapshot(&[("a", None, 12), ("b", None, 11)]);
        let a = TableRef::new("a", None);
        let b = TableRef::new("b", None);

        let for_a = PredicateInjector::bound_statement(&q, &snap, Some(Delta { table: &a, previous: 10 }));
        assert_eq!(
            for_a,
            query(
                "SELECT rowtime FROM a WHERE a.rowtime > 10 AND a.rowtime <= 12 \
                 UNION ALL (SELECT rowtime FROM b WHERE b.rowtime <= 11 AND b.v > 1 AND FALSE)"
            )
        );

        let for_b = PredicateInjector::bound_statement(&q, &snap, Some(Delta { table: &b, previous: 11 }));
        assert_eq!(
            for_b,
            query(
                "SELECT rowtime FROM a WHERE a.rowtime <= 12 AND FALSE \
                 UNION ALL (SELECT rowtime FROM b WHERE b.rowtime > 11 AND b.rowtime <= 11 AND b.v > 1)"
            )
        );

        // Bootstrap reads every branch
        let all = PredicateInjector::bound_statement(&q, &snap, None);
        assert!(!all.to_string().contains("FALSE"));
    }

    #[test]
    fn test_union_inside_subquery_kept_for_outer_delta() {
        let q = query("SELECT * FROM c JOIN (SELECT k FROM a UNION ALL SELECT k FROM b) u ON c.k = u.k");
        let snap = snapshot(&[("c", None, 5), ("a", None, 3), ("b", None, 4)]);
        let c = TableRef::new("c", None);

        let bounded = PredicateInjector::bound_statement(&q, &snap, Some(Delta { table: &c, previous: 2 }));
        assert!(!bounded.to_string().contains("FALSE"));
    }

    #[test]
    fn test_bound_statement_plain_select_matches_bound_all() {
        let q = query("SELECT * FROM t WHERE t.v = 2");
        let snap = snapshot(&[("t", None, 99)]);
        let SelectStatement::Select(bounded) = PredicateInjector::bound_statement(&q, &snap, None) else {
            panic!("expected plain select");
        };
        let SelectStatement::Select(original) = &q else {
            panic!("expected plain select");
        };
        assert_eq!(
            bounded.selection,
            PredicateInjector::bound_all(original.selection.as_ref(), &snap)
        );
    }
}
