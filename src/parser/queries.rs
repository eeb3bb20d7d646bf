use super::common::{any_identifier, identifier, keyword, ws};
use super::expr::expr;
use super::statement::{
    FromItem, JoinKind, OrderByExpr, Select, SelectItem, SelectStatement, SortOrder, Statement,
};
use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{char, digit1},
    combinator::{map, map_res, opt},
    multi::{many0, separated_list1},
    sequence::{delimited, pair, preceded, terminated, tuple},
    IResult,
};

fn alias(input: &str) -> IResult<&str, String> {
    alt((preceded(keyword("AS"), ws(any_identifier)), ws(identifier)))(input)
}

fn select_item(input: &str) -> IResult<&str, SelectItem> {
    alt((
        map(ws(char('*')), |_| SelectItem::Wildcard),
        map(ws(terminated(identifier, tag(".*"))), SelectItem::QualifiedWildcard),
        map(pair(expr, opt(alias)), |(expr, alias)| SelectItem::Expr { expr, alias }),
    ))(input)
}

fn join_kind(input: &str) -> IResult<&str, JoinKind> {
    alt((
        map(keyword("JOIN"), |_| JoinKind::Inner),
        map(pair(keyword("INNER"), keyword("JOIN")), |_| JoinKind::Inner),
        map(tuple((keyword("LEFT"), opt(keyword("OUTER")), keyword("JOIN"))), |_| JoinKind::Left),
        map(tuple((keyword("RIGHT"), opt(keyword("OUTER")), keyword("JOIN"))), |_| JoinKind::Right),
        map(pair(keyword("CROSS"), keyword("JOIN")), |_| JoinKind::Cross),
    ))(input)
}

fn table_factor(input: &str) -> IResult<&str, FromItem> {
    alt((
        map(
            pair(
                delimited(ws(char('(')), select_statement, ws(char(')'))),
                opt(alias),
            ),
            |(query, alias)| FromItem::Subquery { query: Box::new(query), alias },
        ),
        map(delimited(ws(char('(')), from_list, ws(char(')'))), FromItem::Parenthesized),
        map(pair(ws(identifier), opt(alias)), |(name, alias)| FromItem::Table { name, alias }),
    ))(input)
}

/// A table factor followed by any number of joins, grouped to the left.
fn table_with_joins(input: &str) -> IResult<&str, FromItem> {
    let (mut input, mut item) = table_factor(input)?;
    loop {
        let Ok((rest, kind)) = join_kind(input) else {
            break;
        };
        let (rest, right) = table_factor(rest)?;
        let (rest, on) = if kind == JoinKind::Cross {
            (rest, None)
        } else {
            opt(preceded(keyword("ON"), expr))(rest)?
        };
        item = FromItem::Join {
            left: Box::new(item),
            right: Box::new(right),
            kind,
            on,
        };
        input = rest;
    }
    Ok((input, item))
}

fn from_list(input: &str) -> IResult<&str, Vec<FromItem>> {
    separated_list1(ws(char(',')), table_with_joins)(input)
}

fn order_item(input: &str) -> IResult<&str, OrderByExpr> {
    map(
        pair(
            expr,
            opt(alt((
                map(keyword("ASC"), |_| SortOrder::Asc),
                map(keyword("DESC"), |_| SortOrder::Desc),
            ))),
        ),
        |(expr, order)| OrderByExpr {
            expr,
            order: order.unwrap_or(SortOrder::Asc),
        },
    )(input)
}

fn count(input: &str) -> IResult<&str, u64> {
    ws(map_res(digit1, |s: &str| s.parse::<u64>()))(input)
}

type Tail = (Vec<OrderByExpr>, Option<u64>, Option<u64>);

/// ORDER BY / LIMIT / OFFSET, shared by plain selects and unions.
fn tail(input: &str) -> IResult<&str, Tail> {
    tuple((
        map(
            opt(preceded(
                pair(keyword("ORDER"), keyword("BY")),
                separated_list1(ws(char(',')), order_item),
            )),
            Option::unwrap_or_default,
        ),
        opt(preceded(keyword("LIMIT"), count)),
        opt(preceded(keyword("OFFSET"), count)),
    ))(input)
}

fn select_core(input: &str) -> IResult<&str, Select> {
    let (input, _) = keyword("SELECT")(input)?;
    let (input, distinct) = map(opt(keyword("DISTINCT")), |d| d.is_some())(input)?;
    let (input, projection) = separated_list1(ws(char(',')), select_item)(input)?;
    let (input, from) = map(opt(preceded(keyword("FROM"), from_list)), Option::unwrap_or_default)(input)?;
    let (input, selection) = opt(preceded(keyword("WHERE"), expr))(input)?;
    let (input, group_by) = map(
        opt(preceded(
            pair(keyword("GROUP"), keyword("BY")),
            separated_list1(ws(char(',')), expr),
        )),
        Option::unwrap_or_default,
    )(input)?;
    let (input, having) = opt(preceded(keyword("HAVING"), expr))(input)?;

    Ok((
        input,
        Select {
            distinct,
            projection,
            from,
            selection,
            group_by,
            having,
            ..Select::default()
        },
    ))
}

fn select_term(input: &str) -> IResult<&str, SelectStatement> {
    alt((
        map(select_core, |s| SelectStatement::Select(Box::new(s))),
        map(
            delimited(ws(char('(')), select_statement, ws(char(')'))),
            |s| SelectStatement::Parenthesized(Box::new(s)),
        ),
    ))(input)
}

/// SELECT, UNION [ALL] chains (left-associative) and parenthesized selects.
pub fn select_statement(input: &str) -> IResult<&str, SelectStatement> {
    let (input, first) = select_term(input)?;
    let (input, rest) = many0(pair(
        preceded(keyword("UNION"), map(opt(keyword("ALL")), |a| a.is_some())),
        select_term,
    ))(input)?;
    let (after_tail, (order_by, limit, offset)) = tail(input)?;
    let has_tail = !order_by.is_empty() || limit.is_some() || offset.is_some();

    let mut statement = first;
    for (all, right) in rest {
        statement = SelectStatement::Union {
            left: Box::new(statement),
            right: Box::new(right),
            all,
            order_by: Vec::new(),
            limit: None,
            offset: None,
        };
    }

    if !has_tail {
        return Ok((input, statement));
    }
    match &mut statement {
        SelectStatement::Select(select) => {
            select.order_by = order_by;
            select.limit = limit;
            select.offset = offset;
        }
        SelectStatement::Union { order_by: o, limit: l, offset: off, .. } => {
            *o = order_by;
            *l = limit;
            *off = offset;
        }
        // `(SELECT ...) ORDER BY x` has nowhere to keep the clause
        SelectStatement::Parenthesized(_) => {
            return Err(nom::Err::Error(nom::error::Error::new(
                input,
                nom::error::ErrorKind::Verify,
            )));
        }
    }
    Ok((after_tail, statement))
}

pub fn select(input: &str) -> IResult<&str, Statement> {
    map(select_statement, Statement::Query)(input)
}
