use crate::types::Value;
use super::common::{data_type, identifier, keyword, value, ws};
use super::statement::{ColumnDef, Statement};
use nom::{
    branch::alt,
    character::complete::char,
    combinator::{map, opt},
    multi::{many0, separated_list1},
    sequence::{delimited, pair, preceded, tuple},
    IResult,
};

enum ColumnOption {
    NotNull,
    Null,
    PrimaryKey,
    Unique,
    Default(Value),
}

fn column_option(input: &str) -> IResult<&str, ColumnOption> {
    alt((
        map(pair(keyword("NOT"), keyword("NULL")), |_| ColumnOption::NotNull),
        map(keyword("NULL"), |_| ColumnOption::Null),
        map(pair(keyword("PRIMARY"), keyword("KEY")), |_| ColumnOption::PrimaryKey),
        map(keyword("UNIQUE"), |_| ColumnOption::Unique),
        map(preceded(keyword("DEFAULT"), value), ColumnOption::Default),
    ))(input)
}

fn column_def(input: &str) -> IResult<&str, ColumnDef> {
    let (input, name) = ws(identifier)(input)?;
    let (input, data_type) = ws(data_type)(input)?;
    let (input, options) = many0(column_option)(input)?;

    let mut column = ColumnDef {
        name,
        data_type,
        nullable: true,
        primary_key: false,
        unique: false,
        default: None,
    };
    for option in options {
        match option {
            ColumnOption::NotNull => column.nullable = false,
            ColumnOption::Null => column.nullable = true,
            // PRIMARY KEY implies NOT NULL UNIQUE
            ColumnOption::PrimaryKey => {
                column.primary_key = true;
                column.nullable = false;
                column.unique = true;
            }
            ColumnOption::Unique => column.unique = true,
            ColumnOption::Default(v) => column.default = Some(v),
        }
    }

    Ok((input, column))
}

pub fn create_table(input: &str) -> IResult<&str, Statement> {
    let (input, _) = pair(keyword("CREATE"), keyword("TABLE"))(input)?;
    let (input, if_not_exists) = map(
        opt(tuple((keyword("IF"), keyword("NOT"), keyword("EXISTS")))),
        |o| o.is_some(),
    )(input)?;
    let (input, name) = ws(identifier)(input)?;
    let (input, columns) = delimited(
        ws(char('(')),
        separated_list1(ws(char(',')), column_def),
        ws(char(')')),
    )(input)?;

    Ok((input, Statement::CreateTable { name, columns, if_not_exists }))
}

pub fn drop_table(input: &str) -> IResult<&str, Statement> {
    let (input, _) = pair(keyword("DROP"), keyword("TABLE"))(input)?;
    let (input, if_exists) = map(opt(pair(keyword("IF"), keyword("EXISTS"))), |o| o.is_some())(input)?;
    let (input, name) = ws(identifier)(input)?;

    Ok((input, Statement::DropTable { name, if_exists }))
}
