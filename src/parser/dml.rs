use super::common::{identifier, keyword, value, ws};
use super::statement::Statement;
use nom::{
    character::complete::char,
    combinator::opt,
    multi::separated_list1,
    sequence::{delimited, pair},
    IResult,
};

pub fn insert(input: &str) -> IResult<&str, Statement> {
    let (input, _) = pair(keyword("INSERT"), keyword("INTO"))(input)?;
    let (input, table) = ws(identifier)(input)?;
    let (input, columns) = opt(delimited(
        ws(char('(')),
        separated_list1(ws(char(',')), ws(identifier)),
        ws(char(')')),
    ))(input)?;
    let (input, _) = keyword("VALUES")(input)?;
    let (input, rows) = separated_list1(
        ws(char(',')),
        delimited(
            ws(char('(')),
            separated_list1(ws(char(',')), value),
            ws(char(')')),
        ),
    )(input)?;

    Ok((input, Statement::Insert { table, columns, rows }))
}
