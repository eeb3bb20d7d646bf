use crate::types::{DataType, Value};
use rust_decimal::Decimal;
use std::str::FromStr;
use nom::{
    branch::alt,
    bytes::complete::{tag, tag_no_case, take_while},
    character::complete::{char, digit1, multispace0, none_of, satisfy},
    combinator::{map, map_res, not, opt, peek, recognize, verify},
    multi::fold_many0,
    sequence::{delimited, pair, preceded, terminated, tuple},
    IResult,
};

/// Words that terminate an expression or a FROM item and so can never be bare identifiers.
pub const RESERVED: &[&str] = &[
    "ALL", "AND", "AS", "ASC", "BETWEEN", "BY", "CREATE", "CROSS", "DESC", "DISTINCT", "DROP",
    "EXISTS", "FALSE", "FROM", "FULL", "GROUP", "HAVING", "IN", "INNER", "INSERT", "INTO", "IS",
    "JOIN", "LEFT", "LIKE", "LIMIT", "NOT", "NULL", "OFFSET", "ON", "OR", "ORDER", "OUTER",
    "RIGHT", "SELECT", "TABLE", "TRUE", "UNION", "VALUES", "WHERE",
];

pub fn is_reserved(word: &str) -> bool {
    RESERVED.iter().any(|kw| kw.eq_ignore_ascii_case(word))
}

const fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

pub fn ws<'a, F, O>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    delimited(multispace0, inner, multispace0)
}

/// Case-insensitive keyword that must end on a word boundary (`AND` does not match `ANDROID`).
pub fn keyword<'a>(word: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
    ws(terminated(tag_no_case(word), not(peek(satisfy(is_ident_char)))))
}

fn bare_word(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        satisfy(|c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(is_ident_char),
    ))(input)
}

fn quoted_identifier(input: &str) -> IResult<&str, String> {
    delimited(
        char('"'),
        fold_many0(
            alt((map(tag("\"\""), |_| '"'), none_of("\""))),
            String::new,
            |mut acc, c| {
                acc.push(c);
                acc
            },
        ),
        char('"'),
    )(input)
}

/// Bare (non-reserved) or double-quoted identifier.
pub fn identifier(input: &str) -> IResult<&str, String> {
    alt((
        quoted_identifier,
        map(verify(bare_word, |w: &str| !is_reserved(w)), str::to_string),
    ))(input)
}

/// Identifier with no reserved-word check, for positions where any word is a name.
pub fn any_identifier(input: &str) -> IResult<&str, String> {
    alt((quoted_identifier, map(bare_word, str::to_string)))(input)
}

/// Render an identifier, quoting it when it would not read back as the same bare word.
#[must_use]
pub fn quote_identifier(name: &str) -> String {
    let plain = name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && name.chars().all(is_ident_char)
        && !is_reserved(name);
    if plain {
        name.to_string()
    } else {
        format!("\"{}\"", name.replace('"', "\"\""))
    }
}

fn length(input: &str) -> IResult<&str, usize> {
    delimited(
        ws(char('(')),
        ws(map_res(digit1, |s: &str| s.parse::<usize>())),
        ws(char(')')),
    )(input)
}

pub fn data_type(input: &str) -> IResult<&str, DataType> {
    alt((
        // Numeric types with precision/scale
        map(
            tuple((
                alt((keyword("NUMERIC"), keyword("DECIMAL"))),
                opt(delimited(
                    ws(char('(')),
                    tuple((
                        ws(map_res(digit1, |s: &str| s.parse::<u8>())),
                        opt(preceded(
                            ws(char(',')),
                            ws(map_res(digit1, |s: &str| s.parse::<u8>())),
                        )),
                    )),
                    ws(char(')')),
                )),
            )),
            |(_, params)| match params {
                Some((p, Some(s))) => DataType::Numeric { precision: p, scale: s },
                Some((p, None)) => DataType::Numeric { precision: p, scale: 0 },
                None => DataType::Numeric { precision: 10, scale: 0 },
            },
        ),
        // Integer types
        map(keyword("SMALLINT"), |_| DataType::SmallInt),
        map(keyword("BIGINT"), |_| DataType::BigInt),
        map(alt((keyword("INTEGER"), keyword("INT"))), |_| DataType::Integer),
        // Floating point
        map(tuple((keyword("DOUBLE"), keyword("PRECISION"))), |_| DataType::Real),
        map(alt((keyword("REAL"), keyword("FLOAT"), keyword("DOUBLE"))), |_| DataType::Real),
        // String types with length
        map(preceded(keyword("VARCHAR"), opt(length)), |len| DataType::Varchar {
            max_length: len.unwrap_or(255),
        }),
        map(preceded(keyword("CHAR"), opt(length)), |len| DataType::Char {
            length: len.unwrap_or(1),
        }),
        map(keyword("TEXT"), |_| DataType::Text),
        map(alt((keyword("BOOLEAN"), keyword("BOOL"))), |_| DataType::Boolean),
        // Date/Time types
        map(keyword("TIMESTAMPTZ"), |_| DataType::TimestampTz),
        map(alt((keyword("TIMESTAMP"), keyword("DATETIME"))), |_| DataType::Timestamp),
        map(keyword("DATE"), |_| DataType::Date),
        // Special types
        map(keyword("UUID"), |_| DataType::Uuid),
        map(alt((keyword("JSONB"), keyword("JSON"))), |_| DataType::Json),
        map(alt((keyword("BYTEA"), keyword("BLOB"))), |_| DataType::Bytea),
    ))(input)
}

pub fn string_literal(input: &str) -> IResult<&str, String> {
    delimited(
        char('\''),
        fold_many0(
            alt((map(tag("''"), |_| '\''), none_of("'"))),
            String::new,
            |mut acc, c| {
                acc.push(c);
                acc
            },
        ),
        char('\''),
    )(input)
}

/// Unsigned numeric literal: `12` is an integer, `1.50` an exact decimal.
pub fn number(input: &str) -> IResult<&str, Value> {
    alt((
        map_res(
            recognize(tuple((digit1, char('.'), digit1))),
            |s: &str| Decimal::from_str(s).map(Value::Numeric),
        ),
        map_res(
            terminated(digit1, not(peek(satisfy(is_ident_char)))),
            |s: &str| s.parse::<i64>().map(Value::Integer),
        ),
    ))(input)
}

/// Literal value as it appears in VALUES lists and DEFAULT clauses.
pub fn value(input: &str) -> IResult<&str, Value> {
    ws(alt((
        map(keyword("NULL"), |_| Value::Null),
        map(keyword("TRUE"), |_| Value::Boolean(true)),
        map(keyword("FALSE"), |_| Value::Boolean(false)),
        map(string_literal, Value::Text),
        map(preceded(char('-'), number), |v| match v {
            Value::Integer(i) => Value::Integer(-i),
            Value::Numeric(d) => Value::Numeric(-d),
            other => other,
        }),
        number,
    )))(input)
}
