use crate::types::Value;
use super::common::{any_identifier, identifier, keyword, number, string_literal, ws};
use super::statement::{AggregateFunction, BinaryOp, ColumnRef, Expr, UnaryOp};
use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::char,
    combinator::{map, opt},
    multi::{fold_many0, separated_list0, separated_list1},
    sequence::{delimited, pair, preceded, terminated, tuple},
    IResult,
};

// Grammar, loosest binding first:
//   or        := and (OR and)*
//   and       := not (AND not)*
//   not       := NOT not | predicate
//   predicate := additive [cmp additive | IS [NOT] NULL | [NOT] BETWEEN .. AND ..
//                          | [NOT] IN (..) | [NOT] LIKE additive]
//   additive  := multiplicative ((+ | - | ||) multiplicative)*
//   multiplicative := unary ((* | / | %) unary)*
//   unary     := - unary | primary

pub fn expr(input: &str) -> IResult<&str, Expr> {
    or_expr(input)
}

fn or_expr(input: &str) -> IResult<&str, Expr> {
    let (input, first) = and_expr(input)?;
    fold_many0(
        preceded(keyword("OR"), and_expr),
        move || first.clone(),
        |acc, e| Expr::binary(acc, BinaryOp::Or, e),
    )(input)
}

fn and_expr(input: &str) -> IResult<&str, Expr> {
    let (input, first) = not_expr(input)?;
    fold_many0(
        preceded(keyword("AND"), not_expr),
        move || first.clone(),
        Expr::and,
    )(input)
}

fn not_expr(input: &str) -> IResult<&str, Expr> {
    alt((
        map(preceded(keyword("NOT"), not_expr), |e| Expr::Unary {
            op: UnaryOp::Not,
            expr: Box::new(e),
        }),
        predicate,
    ))(input)
}

fn comparison_op(input: &str) -> IResult<&str, BinaryOp> {
    ws(alt((
        map(tag("<>"), |_| BinaryOp::NotEq),
        map(tag("!="), |_| BinaryOp::NotEq),
        map(tag("<="), |_| BinaryOp::LtEq),
        map(tag(">="), |_| BinaryOp::GtEq),
        map(char('<'), |_| BinaryOp::Lt),
        map(char('>'), |_| BinaryOp::Gt),
        map(char('='), |_| BinaryOp::Eq),
    )))(input)
}

fn negation(input: &str) -> IResult<&str, bool> {
    map(opt(keyword("NOT")), |n| n.is_some())(input)
}

fn predicate(input: &str) -> IResult<&str, Expr> {
    let (input, left) = additive(input)?;

    if let Ok((rest, negated)) = delimited(keyword("IS"), negation, keyword("NULL"))(input) {
        return Ok((rest, Expr::IsNull { expr: Box::new(left), negated }));
    }

    let (after_not, negated) = negation(input)?;
    if let Ok((rest, (low, high))) = preceded(
        keyword("BETWEEN"),
        pair(terminated(additive, keyword("AND")), additive),
    )(after_not)
    {
        return Ok((
            rest,
            Expr::Between {
                expr: Box::new(left),
                low: Box::new(low),
                high: Box::new(high),
                negated,
            },
        ));
    }
    if let Ok((rest, list)) = preceded(
        keyword("IN"),
        delimited(ws(char('(')), separated_list1(ws(char(',')), expr), ws(char(')'))),
    )(after_not)
    {
        return Ok((rest, Expr::InList { expr: Box::new(left), list, negated }));
    }
    if let Ok((rest, pattern)) = preceded(keyword("LIKE"), additive)(after_not) {
        return Ok((
            rest,
            Expr::Like {
                expr: Box::new(left),
                pattern: Box::new(pattern),
                negated,
            },
        ));
    }

    if let Ok((rest, (op, right))) = pair(comparison_op, additive)(input) {
        return Ok((rest, Expr::binary(left, op, right)));
    }
    Ok((input, left))
}

fn additive(input: &str) -> IResult<&str, Expr> {
    let (input, first) = multiplicative(input)?;
    fold_many0(
        pair(
            ws(alt((
                map(tag("||"), |_| BinaryOp::Concat),
                map(char('+'), |_| BinaryOp::Plus),
                map(char('-'), |_| BinaryOp::Minus),
            ))),
            multiplicative,
        ),
        move || first.clone(),
        |acc, (op, e)| Expr::binary(acc, op, e),
    )(input)
}

fn multiplicative(input: &str) -> IResult<&str, Expr> {
    let (input, first) = unary(input)?;
    fold_many0(
        pair(
            ws(alt((
                map(char('*'), |_| BinaryOp::Multiply),
                map(char('/'), |_| BinaryOp::Divide),
                map(char('%'), |_| BinaryOp::Modulo),
            ))),
            unary,
        ),
        move || first.clone(),
        |acc, (op, e)| Expr::binary(acc, op, e),
    )(input)
}

fn unary(input: &str) -> IResult<&str, Expr> {
    alt((
        // `-5` is a literal, `-(5)` and `-x` are negations
        map(preceded(ws(char('-')), number), |v| {
            Expr::Literal(match v {
                Value::Integer(i) => Value::Integer(-i),
                Value::Numeric(d) => Value::Numeric(-d),
                other => other,
            })
        }),
        map(preceded(ws(char('-')), unary), |e| Expr::Unary {
            op: UnaryOp::Minus,
            expr: Box::new(e),
        }),
        primary,
    ))(input)
}

fn function_call(input: &str) -> IResult<&str, Expr> {
    let (input, name) = terminated(identifier, ws(char('(')))(input)?;

    if let Some(func) = AggregateFunction::from_name(&name) {
        if func == AggregateFunction::Count {
            if let Ok((rest, _)) = pair(ws(char('*')), ws(char(')')))(input) {
                return Ok((rest, Expr::Aggregate { func, arg: None, distinct: false }));
            }
        }
        let (input, (distinct, arg)) = terminated(
            pair(map(opt(keyword("DISTINCT")), |d| d.is_some()), expr),
            ws(char(')')),
        )(input)?;
        return Ok((
            input,
            Expr::Aggregate {
                func,
                arg: Some(Box::new(arg)),
                distinct,
            },
        ));
    }

    let (input, args) = terminated(separated_list0(ws(char(',')), expr), ws(char(')')))(input)?;
    Ok((
        input,
        Expr::Function {
            name: name.to_ascii_uppercase(),
            args,
        },
    ))
}

pub fn column_ref(input: &str) -> IResult<&str, ColumnRef> {
    map(
        pair(identifier, opt(preceded(char('.'), any_identifier))),
        |(first, second)| match second {
            Some(name) => ColumnRef { qualifier: Some(first), name },
            None => ColumnRef { qualifier: None, name: first },
        },
    )(input)
}

fn primary(input: &str) -> IResult<&str, Expr> {
    ws(alt((
        map(keyword("NULL"), |_| Expr::Literal(Value::Null)),
        map(keyword("TRUE"), |_| Expr::Literal(Value::Boolean(true))),
        map(keyword("FALSE"), |_| Expr::Literal(Value::Boolean(false))),
        map(string_literal, |s| Expr::Literal(Value::Text(s))),
        map(number, Expr::Literal),
        function_call,
        map(column_ref, Expr::Column),
        delimited(ws(char('(')), expr, ws(char(')'))),
    )))(input)
}

/// Parses a complete expression, used by tests and by callers holding loose SQL fragments.
pub fn parse_expr(input: &str) -> Result<Expr, String> {
    match tuple((expr, nom::character::complete::multispace0))(input) {
        Ok(("", (e, _))) => Ok(e),
        Ok((rest, _)) => Err(format!("Unexpected input after expression: {rest}")),
        Err(e) => Err(format!("Parse error: {e:?}")),
    }
}
