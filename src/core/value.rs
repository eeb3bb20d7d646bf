use serde::{Deserialize, Serialize};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use uuid::Uuid;
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use std::cmp::Ordering;
use std::str::FromStr;
use super::data_type::{Affinity, DataType};
use super::error::DatabaseError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Value {
    Null,
    // Numeric types
    SmallInt(i16),
    Integer(i64),
    Real(f64),
    Numeric(Decimal),  // NUMERIC/DECIMAL with precision
    // String types
    Text(String),
    Char(String),      // Fixed-length CHAR(n)
    // Boolean
    Boolean(bool),
    // Date/Time types
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<Utc>),
    // Special types
    Uuid(Uuid),
    Json(String),      // JSON as text
    Bytea(Vec<u8>),    // Binary data
}

/// Numeric view of a value, widened just enough to compare or combine two operands.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Number {
    Int(i64),
    Dec(Decimal),
    Float(f64),
}

impl Number {
    fn to_f64(self) -> f64 {
        match self {
            Self::Int(i) => i as f64,
            Self::Dec(d) => d.to_f64().unwrap_or(f64::NAN),
            Self::Float(f) => f,
        }
    }

    fn to_decimal(self) -> Option<Decimal> {
        match self {
            Self::Int(i) => Some(Decimal::from(i)),
            Self::Dec(d) => Some(d),
            Self::Float(f) => Decimal::from_f64(f),
        }
    }

    pub(crate) fn compare(self, other: Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => Some(a.cmp(&b)),
            (Self::Float(_), _) | (_, Self::Float(_)) => self.to_f64().partial_cmp(&other.to_f64()),
            _ => Some(self.to_decimal()?.cmp(&other.to_decimal()?)),
        }
    }

    pub(crate) fn into_value(self) -> Value {
        match self {
            Self::Int(i) => Value::Integer(i),
            Self::Dec(d) => Value::Numeric(d),
            Self::Float(f) => Value::Real(f),
        }
    }

    /// Apply a binary arithmetic operator, promoting int -> decimal -> float.
    pub(crate) fn apply(self, other: Self, op: char) -> Result<Value, DatabaseError> {
        if matches!(op, '/' | '%') && other.to_f64() == 0.0 {
            return Err(DatabaseError::TypeMismatch("division by zero".to_string()));
        }
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => {
                let result = match op {
                    '+' => a.checked_add(b),
                    '-' => a.checked_sub(b),
                    '*' => a.checked_mul(b),
                    '/' => a.checked_div(b),
                    '%' => a.checked_rem(b),
                    _ => None,
                };
                result
                    .map(Value::Integer)
                    .ok_or_else(|| DatabaseError::TypeMismatch(format!("integer overflow in {a} {op} {b}")))
            }
            (Self::Float(_), _) | (_, Self::Float(_)) => {
                let (a, b) = (self.to_f64(), other.to_f64());
                Ok(Value::Real(match op {
                    '+' => a + b,
                    '-' => a - b,
                    '*' => a * b,
                    '/' => a / b,
                    _ => a % b,
                }))
            }
            _ => {
                let overflow = || DatabaseError::TypeMismatch("numeric overflow".to_string());
                let a = self.to_decimal().ok_or_else(overflow)?;
                let b = other.to_decimal().ok_or_else(overflow)?;
                let result = match op {
                    '+' => a.checked_add(b),
                    '-' => a.checked_sub(b),
                    '*' => a.checked_mul(b),
                    '/' => a.checked_div(b),
                    _ => a.checked_rem(b),
                };
                result.map(Value::Numeric).ok_or_else(overflow)
            }
        }
    }
}

impl Value {
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            Self::SmallInt(i) => Some(*i as i64),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) | Self::Char(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub(crate) fn as_number(&self) -> Option<Number> {
        match self {
            Self::SmallInt(i) => Some(Number::Int(i64::from(*i))),
            Self::Integer(i) => Some(Number::Int(*i)),
            Self::Numeric(d) => Some(Number::Dec(*d)),
            Self::Real(f) => Some(Number::Float(*f)),
            _ => None,
        }
    }

    /// Lossless conversion to `i64`: integral numerics and decimal text qualify.
    #[must_use]
    pub fn to_i64(&self) -> Option<i64> {
        match self {
            Self::SmallInt(i) => Some(i64::from(*i)),
            Self::Integer(i) => Some(*i),
            Self::Numeric(d) if d.fract().is_zero() => d.to_i64(),
            Self::Real(f) if f.fract() == 0.0 && f.is_finite() => Some(*f as i64),
            Self::Text(s) | Self::Char(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Three-valued comparison: `Ok(None)` when either side is NULL.
    pub fn compare(&self, other: &Self) -> Result<Option<Ordering>, DatabaseError> {
        if self.is_null() || other.is_null() {
            return Ok(None);
        }
        if let (Some(a), Some(b)) = (self.as_number(), other.as_number()) {
            return Ok(a.compare(b));
        }
        let ordering = match (self, other) {
            (Self::Text(a) | Self::Char(a), Self::Text(b) | Self::Char(b)) => a.trim_end().cmp(b.trim_end()),
            (Self::Boolean(a), Self::Boolean(b)) => a.cmp(b),
            (Self::Date(a), Self::Date(b)) => a.cmp(b),
            (Self::Timestamp(a), Self::Timestamp(b)) => a.cmp(b),
            (Self::TimestampTz(a), Self::TimestampTz(b)) => a.cmp(b),
            (Self::Uuid(a), Self::Uuid(b)) => a.cmp(b),
            (Self::Json(a), Self::Json(b)) => a.cmp(b),
            (Self::Bytea(a), Self::Bytea(b)) => a.cmp(b),
            // Typed literals arrive as text; compare through the typed side
            (Self::Date(_) | Self::Timestamp(_) | Self::TimestampTz(_) | Self::Uuid(_), Self::Text(s)) => {
                let cast = Self::Text(s.clone()).cast_like(self)?;
                return self.compare(&cast);
            }
            (Self::Text(_), Self::Date(_) | Self::Timestamp(_) | Self::TimestampTz(_) | Self::Uuid(_)) => {
                return other.compare(self).map(|o| o.map(Ordering::reverse));
            }
            _ => {
                return Err(DatabaseError::TypeMismatch(format!(
                    "cannot compare {} with {}",
                    self.type_name(),
                    other.type_name()
                )));
            }
        };
        Ok(Some(ordering))
    }

    /// Total order used by ORDER BY and DISTINCT: NULLs first, incomparable values equal.
    #[must_use]
    pub fn sort_cmp(&self, other: &Self) -> Ordering {
        match (self.is_null(), other.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => self.compare(other).ok().flatten().unwrap_or(Ordering::Equal),
        }
    }

    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::SmallInt(_) => "smallint",
            Self::Integer(_) => "integer",
            Self::Real(_) => "real",
            Self::Numeric(_) => "numeric",
            Self::Text(_) => "text",
            Self::Char(_) => "char",
            Self::Boolean(_) => "boolean",
            Self::Date(_) => "date",
            Self::Timestamp(_) => "timestamp",
            Self::TimestampTz(_) => "timestamptz",
            Self::Uuid(_) => "uuid",
            Self::Json(_) => "json",
            Self::Bytea(_) => "bytea",
        }
    }

    fn cast_like(self, target: &Self) -> Result<Self, DatabaseError> {
        let data_type = match target {
            Self::Date(_) => DataType::Date,
            Self::Timestamp(_) => DataType::Timestamp,
            Self::TimestampTz(_) => DataType::TimestampTz,
            Self::Uuid(_) => DataType::Uuid,
            _ => return Ok(self),
        };
        self.cast(&data_type)
    }

    /// Coerce a value into a column's declared type, going through the type's affinity.
    pub fn cast(self, data_type: &DataType) -> Result<Self, DatabaseError> {
        if self.is_null() {
            return Ok(Self::Null);
        }
        let mismatch = |v: &Self| {
            DatabaseError::TypeMismatch(format!("cannot store {} '{v}' as {data_type}", v.type_name()))
        };
        let value = match (data_type.affinity(), self) {
            (Affinity::Integer, Self::Text(s)) if *data_type != DataType::Boolean => s
                .trim()
                .parse::<i64>()
                .map(Self::Integer)
                .map_err(|_| mismatch(&Self::Text(s)))?,
            (Affinity::Real, Self::Text(s)) => s
                .trim()
                .parse::<f64>()
                .map(Self::Real)
                .map_err(|_| mismatch(&Self::Text(s)))?,
            (Affinity::Numeric, Self::Text(s)) => Decimal::from_str(s.trim())
                .map(Self::Numeric)
                .map_err(|_| mismatch(&Self::Text(s)))?,
            (_, other) => other,
        };

        match (data_type, value) {
            (DataType::SmallInt, v) => match v.to_i64().map(i16::try_from) {
                Some(Ok(i)) => Ok(Self::SmallInt(i)),
                _ => Err(mismatch(&v)),
            },
            (DataType::Integer | DataType::BigInt, v) => v.to_i64().map(Self::Integer).ok_or_else(|| mismatch(&v)),
            (DataType::Real, v) => match v.as_number() {
                Some(n) => Ok(Self::Real(n.to_f64())),
                None => Err(mismatch(&v)),
            },
            (DataType::Numeric { scale, .. }, v) => match v.as_number().and_then(Number::to_decimal) {
                Some(d) => Ok(Self::Numeric(d.round_dp(u32::from(*scale)))),
                None => Err(mismatch(&v)),
            },
            (DataType::Boolean, Self::Boolean(b)) => Ok(Self::Boolean(b)),
            (DataType::Boolean, v) => match v.to_i64() {
                Some(0) => Ok(Self::Boolean(false)),
                Some(1) => Ok(Self::Boolean(true)),
                _ => match v.as_text().map(str::to_ascii_lowercase).as_deref() {
                    Some("true" | "t" | "yes") => Ok(Self::Boolean(true)),
                    Some("false" | "f" | "no") => Ok(Self::Boolean(false)),
                    _ => Err(mismatch(&v)),
                },
            },
            (DataType::Text, Self::Text(s) | Self::Char(s)) => Ok(Self::Text(s)),
            (DataType::Varchar { max_length }, Self::Text(s) | Self::Char(s)) => {
                if s.chars().count() > *max_length {
                    return Err(DatabaseError::TypeMismatch(format!(
                        "value too long for VARCHAR({max_length}): '{s}'"
                    )));
                }
                Ok(Self::Text(s))
            }
            (DataType::Char { length }, Self::Text(s) | Self::Char(s)) => {
                let len = s.chars().count();
                if len > *length {
                    return Err(DatabaseError::TypeMismatch(format!(
                        "value too long for CHAR({length}): '{s}'"
                    )));
                }
                Ok(Self::Char(format!("{s}{}", " ".repeat(length - len))))
            }
            (DataType::Text | DataType::Varchar { .. } | DataType::Char { .. }, v) => {
                Self::Text(v.to_string()).cast(data_type)
            }
            (DataType::Date, Self::Date(d)) => Ok(Self::Date(d)),
            (DataType::Date, Self::Text(s)) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
                .map(Self::Date)
                .map_err(|_| mismatch(&Self::Text(s))),
            (DataType::Timestamp, Self::Timestamp(t)) => Ok(Self::Timestamp(t)),
            (DataType::Timestamp, Self::Text(s)) => parse_timestamp(&s)
                .map(Self::Timestamp)
                .ok_or_else(|| mismatch(&Self::Text(s))),
            (DataType::TimestampTz, Self::TimestampTz(t)) => Ok(Self::TimestampTz(t)),
            (DataType::TimestampTz, Self::Text(s)) => DateTime::parse_from_rfc3339(s.trim())
                .map(|t| t.with_timezone(&Utc))
                .ok()
                .or_else(|| parse_timestamp(&s).map(|t| t.and_utc()))
                .map(Self::TimestampTz)
                .ok_or_else(|| mismatch(&Self::Text(s))),
            (DataType::Uuid, Self::Uuid(u)) => Ok(Self::Uuid(u)),
            (DataType::Uuid, Self::Text(s)) => Uuid::parse_str(s.trim())
                .map(Self::Uuid)
                .map_err(|_| mismatch(&Self::Text(s))),
            (DataType::Json, Self::Json(j)) => Ok(Self::Json(j)),
            (DataType::Json, Self::Text(s)) => {
                serde_json::from_str::<serde_json::Value>(&s)?;
                Ok(Self::Json(s))
            }
            (DataType::Bytea, Self::Bytea(b)) => Ok(Self::Bytea(b)),
            (DataType::Bytea, Self::Text(s)) => match s.strip_prefix("\\x") {
                Some(encoded) => hex::decode(encoded)
                    .map(Self::Bytea)
                    .map_err(|_| mismatch(&Self::Text(s.clone()))),
                None => Ok(Self::Bytea(s.into_bytes())),
            },
            (_, v) => Err(mismatch(&v)),
        }
    }

    /// Render as a SQL literal that the parser reads back as an equal value.
    #[must_use]
    pub fn to_sql_literal(&self) -> String {
        match self {
            Self::Null => "NULL".to_string(),
            Self::SmallInt(i) => i.to_string(),
            Self::Integer(i) => i.to_string(),
            Self::Real(r) if r.fract() == 0.0 && r.is_finite() => format!("{r:.1}"),
            Self::Real(r) => r.to_string(),
            Self::Numeric(d) if d.fract().is_zero() && d.scale() == 0 => format!("{d}.0"),
            Self::Numeric(d) => d.to_string(),
            Self::Boolean(b) => if *b { "TRUE".to_string() } else { "FALSE".to_string() },
            other => format!("'{}'", other.to_string().replace('\'', "''")),
        }
    }

    /// Output representation used for emitted records.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;
        match self {
            Self::Null => Json::Null,
            Self::SmallInt(i) => Json::from(*i),
            Self::Integer(i) => Json::from(*i),
            Self::Real(r) => serde_json::Number::from_f64(*r).map_or(Json::Null, Json::Number),
            Self::Boolean(b) => Json::Bool(*b),
            Self::Json(j) => serde_json::from_str(j).unwrap_or_else(|_| Json::String(j.clone())),
            other => Json::String(other.to_string()),
        }
    }
}

fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f"))
        .ok()
        .or_else(|| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()?.and_hms_opt(0, 0, 0))
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::SmallInt(i) => write!(f, "{i}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Real(r) => write!(f, "{r}"),
            Self::Numeric(d) => write!(f, "{d}"),
            Self::Text(s) => write!(f, "{s}"),
            Self::Char(s) => write!(f, "{s}"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Self::Timestamp(t) => write!(f, "{}", t.format("%Y-%m-%d %H:%M:%S%.f")),
            Self::TimestampTz(t) => write!(f, "{}", t.to_rfc3339()),
            Self::Uuid(u) => write!(f, "{u}"),
            Self::Json(j) => write!(f, "{j}"),
            Self::Bytea(b) => write!(f, "\\x{}", hex::encode(b)),
        }
    }
}
