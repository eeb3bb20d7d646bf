/// Expression evaluation for WHERE / ON / HAVING clauses and projections
///
/// Values follow SQL three-valued logic: a comparison with NULL yields NULL,
/// and only a TRUE condition keeps a row.

use crate::types::{DatabaseError, Value};
use crate::parser::{AggregateFunction, BinaryOp, ColumnRef, Expr, UnaryOp};
use crate::core::value::Number;
use rust_decimal::Decimal;
use std::cmp::Ordering;

/// A column visible in the current scope: `qualifier.name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub qualifier: Option<String>,
    pub name: String,
}

impl Binding {
    #[must_use]
    pub fn new(qualifier: Option<&str>, name: &str) -> Self {
        Self {
            qualifier: qualifier.map(str::to_string),
            name: name.to_string(),
        }
    }

    fn matches(&self, col: &ColumnRef) -> bool {
        if !self.name.eq_ignore_ascii_case(&col.name) {
            return false;
        }
        match (&col.qualifier, &self.qualifier) {
            (None, _) => true,
            (Some(wanted), Some(q)) => wanted.eq_ignore_ascii_case(q),
            (Some(_), None) => false,
        }
    }
}

/// Position of a column reference among the bindings.
pub fn resolve(bindings: &[Binding], col: &ColumnRef) -> Result<usize, DatabaseError> {
    let mut found = bindings.iter().enumerate().filter(|(_, b)| b.matches(col));
    match (found.next(), found.next()) {
        (Some((idx, _)), None) => Ok(idx),
        (Some(_), Some(_)) => Err(DatabaseError::AmbiguousColumn(col.to_string())),
        (None, _) => Err(DatabaseError::ColumnNotFound(col.to_string())),
    }
}

/// Row being evaluated, plus its group when aggregates are in play.
pub struct EvalContext<'a> {
    pub bindings: &'a [Binding],
    pub row: &'a [Value],
    pub group: Option<&'a [Vec<Value>]>,
}

impl<'a> EvalContext<'a> {
    #[must_use]
    pub const fn row(bindings: &'a [Binding], row: &'a [Value]) -> Self {
        Self { bindings, row, group: None }
    }

    #[must_use]
    pub const fn group(bindings: &'a [Binding], row: &'a [Value], group: &'a [Vec<Value>]) -> Self {
        Self { bindings, row, group: Some(group) }
    }
}

pub struct ExprEvaluator;

impl ExprEvaluator {
    pub fn evaluate(expr: &Expr, ctx: &EvalContext<'_>) -> Result<Value, DatabaseError> {
        match expr {
            Expr::Literal(v) => Ok(v.clone()),
            Expr::Column(col) => {
                let idx = resolve(ctx.bindings, col)?;
                Ok(ctx.row.get(idx).cloned().unwrap_or(Value::Null))
            }
            Expr::Unary { op: UnaryOp::Not, expr } => {
                let v = Self::evaluate(expr, ctx)?;
                Ok(match Self::truth(&v)? {
                    Some(b) => Value::Boolean(!b),
                    None => Value::Null,
                })
            }
            Expr::Unary { op: UnaryOp::Minus, expr } => {
                let v = Self::evaluate(expr, ctx)?;
                if v.is_null() {
                    return Ok(Value::Null);
                }
                let n = v.as_number().ok_or_else(|| {
                    DatabaseError::TypeMismatch(format!("cannot negate {}", v.type_name()))
                })?;
                Number::Int(0).apply(n, '-')
            }
            Expr::Binary { left, op: BinaryOp::And, right } => {
                let l = Self::truth(&Self::evaluate(left, ctx)?)?;
                if l == Some(false) {
                    return Ok(Value::Boolean(false));
                }
                let r = Self::truth(&Self::evaluate(right, ctx)?)?;
                Ok(match (l, r) {
                    (_, Some(false)) => Value::Boolean(false),
                    (Some(true), Some(true)) => Value::Boolean(true),
                    _ => Value::Null,
                })
            }
            Expr::Binary { left, op: BinaryOp::Or, right } => {
                let l = Self::truth(&Self::evaluate(left, ctx)?)?;
                if l == Some(true) {
                    return Ok(Value::Boolean(true));
                }
                let r = Self::truth(&Self::evaluate(right, ctx)?)?;
                Ok(match (l, r) {
                    (_, Some(true)) => Value::Boolean(true),
                    (Some(false), Some(false)) => Value::Boolean(false),
                    _ => Value::Null,
                })
            }
            Expr::Binary { left, op, right } => {
                let l = Self::evaluate(left, ctx)?;
                let r = Self::evaluate(right, ctx)?;
                Self::binary(&l, *op, &r)
            }
            Expr::IsNull { expr, negated } => {
                let v = Self::evaluate(expr, ctx)?;
                Ok(Value::Boolean(v.is_null() != *negated))
            }
            Expr::Between { expr, low, high, negated } => {
                let v = Self::evaluate(expr, ctx)?;
                let low = Self::evaluate(low, ctx)?;
                let high = Self::evaluate(high, ctx)?;
                let ge = Self::binary(&v, BinaryOp::GtEq, &low)?;
                let le = Self::binary(&v, BinaryOp::LtEq, &high)?;
                let inside = match (Self::truth(&ge)?, Self::truth(&le)?) {
                    (Some(false), _) | (_, Some(false)) => Some(false),
                    (Some(true), Some(true)) => Some(true),
                    _ => None,
                };
                Ok(Self::negate_if(inside, *negated))
            }
            Expr::InList { expr, list, negated } => {
                let v = Self::evaluate(expr, ctx)?;
                if v.is_null() {
                    return Ok(Value::Null);
                }
                let mut saw_null = false;
                for item in list {
                    let item = Self::evaluate(item, ctx)?;
                    match v.compare(&item)? {
                        Some(Ordering::Equal) => return Ok(Value::Boolean(!*negated)),
                        None => saw_null = true,
                        Some(_) => {}
                    }
                }
                Ok(if saw_null { Value::Null } else { Value::Boolean(*negated) })
            }
            Expr::Like { expr, pattern, negated } => {
                let v = Self::evaluate(expr, ctx)?;
                let p = Self::evaluate(pattern, ctx)?;
                if v.is_null() || p.is_null() {
                    return Ok(Value::Null);
                }
                let text = v.to_string();
                let matched = Self::like_pattern_match(text.trim_end_matches(' '), &p.to_string());
                Ok(Value::Boolean(matched != *negated))
            }
            Expr::Function { name, args } => Self::function(name, args, ctx),
            Expr::Aggregate { func, arg, distinct } => {
                let group = ctx.group.ok_or_else(|| {
                    DatabaseError::Unsupported(format!(
                        "aggregate function {} is not allowed here",
                        func.name()
                    ))
                })?;
                Self::aggregate(*func, arg.as_deref(), *distinct, ctx.bindings, group)
            }
        }
    }

    /// WHERE / ON / HAVING semantics: only TRUE keeps the row.
    pub fn is_true(expr: &Expr, ctx: &EvalContext<'_>) -> Result<bool, DatabaseError> {
        Ok(Self::truth(&Self::evaluate(expr, ctx)?)? == Some(true))
    }

    fn truth(value: &Value) -> Result<Option<bool>, DatabaseError> {
        match value {
            Value::Null => Ok(None),
            Value::Boolean(b) => Ok(Some(*b)),
            other => match other.as_number() {
                Some(n) => Ok(Some(n.compare(Number::Int(0)) != Some(Ordering::Equal))),
                None => Err(DatabaseError::TypeMismatch(format!(
                    "{} is not a boolean",
                    other.type_name()
                ))),
            },
        }
    }

    fn negate_if(value: Option<bool>, negated: bool) -> Value {
        value.map_or(Value::Null, |b| Value::Boolean(b != negated))
    }

    fn binary(l: &Value, op: BinaryOp, r: &Value) -> Result<Value, DatabaseError> {
        if op.is_comparison() {
            let ordering = l.compare(r)?;
            return Ok(ordering.map_or(Value::Null, |o| {
                Value::Boolean(match op {
                    BinaryOp::Eq => o == Ordering::Equal,
                    BinaryOp::NotEq => o != Ordering::Equal,
                    BinaryOp::Lt => o == Ordering::Less,
                    BinaryOp::LtEq => o != Ordering::Greater,
                    BinaryOp::Gt => o == Ordering::Greater,
                    _ => o != Ordering::Less,
                })
            }));
        }
        if l.is_null() || r.is_null() {
            return Ok(Value::Null);
        }
        if op == BinaryOp::Concat {
            return Ok(Value::Text(format!("{l}{r}")));
        }
        let symbol = match op {
            BinaryOp::Plus => '+',
            BinaryOp::Minus => '-',
            BinaryOp::Multiply => '*',
            BinaryOp::Divide => '/',
            BinaryOp::Modulo => '%',
            other => {
                return Err(DatabaseError::Unsupported(format!("operator {}", other.symbol())));
            }
        };
        match (l.as_number(), r.as_number()) {
            (Some(a), Some(b)) => a.apply(b, symbol),
            _ => Err(DatabaseError::TypeMismatch(format!(
                "operator {symbol} is not defined for {} and {}",
                l.type_name(),
                r.type_name()
            ))),
        }
    }

    fn function(name: &str, args: &[Expr], ctx: &EvalContext<'_>) -> Result<Value, DatabaseError> {
        let arity = |n: usize| {
            if args.len() == n {
                Ok(())
            } else {
                Err(DatabaseError::TypeMismatch(format!(
                    "{name} expects {n} argument(s), got {}",
                    args.len()
                )))
            }
        };

        match name.to_ascii_uppercase().as_str() {
            "COALESCE" => {
                for arg in args {
                    let v = Self::evaluate(arg, ctx)?;
                    if !v.is_null() {
                        return Ok(v);
                    }
                }
                Ok(Value::Null)
            }
            "UPPER" | "LOWER" | "LENGTH" | "ABS" => {
                arity(1)?;
                let v = Self::evaluate(&args[0], ctx)?;
                if v.is_null() {
                    return Ok(Value::Null);
                }
                match name.to_ascii_uppercase().as_str() {
                    "UPPER" => Ok(Value::Text(v.to_string().to_uppercase())),
                    "LOWER" => Ok(Value::Text(v.to_string().to_lowercase())),
                    "LENGTH" => {
                        let len = v.to_string().trim_end_matches(' ').chars().count();
                        Ok(Value::Integer(len as i64))
                    }
                    _ => match v.as_number() {
                        Some(n) if n.compare(Number::Int(0)) == Some(Ordering::Less) => {
                            Number::Int(0).apply(n, '-')
                        }
                        Some(n) => Ok(n.into_value()),
                        None => Err(DatabaseError::TypeMismatch(format!(
                            "ABS is not defined for {}",
                            v.type_name()
                        ))),
                    },
                }
            }
            other => Err(DatabaseError::Unsupported(format!("function {other}"))),
        }
    }

    fn aggregate(
        func: AggregateFunction,
        arg: Option<&Expr>,
        distinct: bool,
        bindings: &[Binding],
        group: &[Vec<Value>],
    ) -> Result<Value, DatabaseError> {
        let Some(arg) = arg else {
            // COUNT(*)
            return Ok(Value::Integer(group.len() as i64));
        };

        let mut values = Vec::with_capacity(group.len());
        for row in group {
            let v = Self::evaluate(arg, &EvalContext::row(bindings, row))?;
            if !v.is_null() {
                values.push(v);
            }
        }
        if distinct {
            let mut unique: Vec<Value> = Vec::with_capacity(values.len());
            for v in values {
                if !unique.iter().any(|u| u.sort_cmp(&v) == Ordering::Equal) {
                    unique.push(v);
                }
            }
            values = unique;
        }

        match func {
            AggregateFunction::Count => Ok(Value::Integer(values.len() as i64)),
            AggregateFunction::Sum => Self::sum(&values),
            AggregateFunction::Avg => {
                let count = values.len() as i64;
                match Self::sum(&values)? {
                    Value::Null => Ok(Value::Null),
                    Value::Real(f) => Ok(Value::Real(f / count as f64)),
                    Value::Integer(i) => Self::decimal_avg(Decimal::from(i), count),
                    Value::Numeric(d) => Self::decimal_avg(d, count),
                    other => Err(DatabaseError::TypeMismatch(format!(
                        "AVG is not defined for {}",
                        other.type_name()
                    ))),
                }
            }
            AggregateFunction::Min | AggregateFunction::Max => {
                let wanted = if func == AggregateFunction::Min {
                    Ordering::Less
                } else {
                    Ordering::Greater
                };
                let mut best: Option<Value> = None;
                for v in values {
                    best = match best {
                        Some(b) if v.compare(&b)? != Some(wanted) => Some(b),
                        _ => Some(v),
                    };
                }
                Ok(best.unwrap_or(Value::Null))
            }
        }
    }

    fn sum(values: &[Value]) -> Result<Value, DatabaseError> {
        let mut total: Option<Number> = None;
        for v in values {
            let n = v.as_number().ok_or_else(|| {
                DatabaseError::TypeMismatch(format!("SUM is not defined for {}", v.type_name()))
            })?;
            total = Some(match total {
                None => n,
                Some(t) => t
                    .apply(n, '+')?
                    .as_number()
                    .ok_or_else(|| DatabaseError::TypeMismatch("numeric overflow".to_string()))?,
            });
        }
        Ok(total.map_or(Value::Null, Number::into_value))
    }

    fn decimal_avg(sum: Decimal, count: i64) -> Result<Value, DatabaseError> {
        sum.checked_div(Decimal::from(count))
            .map(Value::Numeric)
            .ok_or_else(|| DatabaseError::TypeMismatch("numeric overflow".to_string()))
    }

    /// Simple LIKE pattern matching
    /// % matches zero or more characters
    /// _ matches exactly one character
    fn like_pattern_match(text: &str, pattern: &str) -> bool {
        let text_chars: Vec<char> = text.chars().collect();
        let pattern_chars: Vec<char> = pattern.chars().collect();

        Self::match_recursive(&text_chars, &pattern_chars, 0, 0)
    }

    fn match_recursive(text: &[char], pattern: &[char], ti: usize, pi: usize) -> bool {
        if pi >= pattern.len() {
            return ti >= text.len();
        }

        if pattern[pi] == '%' {
            // Zero characters, or one more and stay on the %
            return Self::match_recursive(text, pattern, ti, pi + 1)
                || (ti < text.len() && Self::match_recursive(text, pattern, ti + 1, pi));
        }

        if ti >= text.len() {
            return false;
        }

        (pattern[pi] == '_' || text[ti] == pattern[pi])
            && Self::match_recursive(text, pattern, ti + 1, pi + 1)
    }
}
