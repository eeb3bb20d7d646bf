use super::common::{keyword, ws};
use super::statement::Statement;
use nom::{
    branch::alt,
    bytes::complete::tag,
    combinator::map,
    sequence::pair,
    IResult,
};

pub fn show_tables(input: &str) -> IResult<&str, Statement> {
    // Support both "SHOW TABLES" and "\dt" (psql-style)
    map(
        alt((
            map(pair(keyword("SHOW"), keyword("TABLES")), |_| ()),
            map(ws(tag("\\dt")), |_| ()),
        )),
        |()| Statement::ShowTables,
    )(input)
}
