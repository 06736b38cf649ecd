#![warn(clippy::uninlined_format_args)]

//! Recognizer for the treasury command surface.
//!
//! A message is either an expense
//! (`AMOUNT|PARTICIPANT(,PARTICIPANT)*( "DESCRIPTION")?`), one of the literal
//! queries `BALANCE` / `HISTORY`, or a group command (`CREATE <group>`,
//! `ADD <user> <group>`, `DELETE <user> <group>`). The whole message must
//! match; anything else is unrecognized and the caller stays silent.

use std::str::FromStr;

use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag, take_while1, take_while_m_n},
    character::complete::{char, digit1, none_of},
    combinator::{all_consuming, map_res, opt, recognize, value},
    multi::{fold_many0, separated_list1},
    sequence::{delimited, preceded},
};
use rust_decimal::Decimal;

/// A participant reference inside an expense: either a single user handle
/// (exactly two uppercase letters) or a group handle (3 to 12).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handle<'a> {
    User(&'a str),
    Group(&'a str),
}

/// One participant entry with its optional uneven-split modifiers. A group
/// handle's modifiers apply to every member of the group.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParticipantSpec<'a> {
    pub handle: Handle<'a>,
    pub plus_mod: Option<Decimal>,
    pub star_mod: Option<Decimal>,
}

/// A recognized expense message, before participant expansion.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpenseDraft<'a> {
    pub amount: Decimal,
    pub participants: Vec<ParticipantSpec<'a>>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command<'a> {
    Expense(ExpenseDraft<'a>),
    Balance,
    History,
    CreateGroup { group: &'a str },
    AddMember { user: &'a str, group: &'a str },
    RemoveMember { user: &'a str, group: &'a str },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("message does not match any command form")]
    UnrecognizedMessage,
}

/// Parses one message. The input is trimmed first; the remainder must match
/// a command form completely.
pub fn parse_message(input: &str) -> Result<Command<'_>, ParseError> {
    all_consuming(command)
        .parse(input.trim())
        .map(|(_, command)| command)
        .map_err(|_| ParseError::UnrecognizedMessage)
}

fn command(input: &str) -> IResult<&str, Command<'_>> {
    alt((
        expense,
        value(Command::Balance, tag("BALANCE")),
        value(Command::History, tag("HISTORY")),
        preceded(tag("CREATE "), group_handle).map(|group| Command::CreateGroup { group }),
        (tag("ADD "), user_handle, char(' '), group_handle)
            .map(|(_, user, _, group)| Command::AddMember { user, group }),
        (tag("DELETE "), user_handle, char(' '), group_handle)
            .map(|(_, user, _, group)| Command::RemoveMember { user, group }),
    ))
    .parse(input)
}

fn expense(input: &str) -> IResult<&str, Command<'_>> {
    (
        amount,
        char('|'),
        separated_list1(char(','), participant),
        opt(preceded(char(' '), description)),
    )
        .map(|(amount, _, participants, description)| {
            Command::Expense(ExpenseDraft {
                amount,
                participants,
                description: description.flatten(),
            })
        })
        .parse(input)
}

// Up to two fractional digits, like the plus modifier.
fn amount(input: &str) -> IResult<&str, Decimal> {
    decimal_literal(input, 2)
}

fn plus_mod(input: &str) -> IResult<&str, Decimal> {
    preceded(char('+'), |input| decimal_literal(input, 2)).parse(input)
}

// The star modifier grammar allows a single fractional digit only.
fn star_mod(input: &str) -> IResult<&str, Decimal> {
    preceded(char('*'), |input| decimal_literal(input, 1)).parse(input)
}

fn decimal_literal(input: &str, max_fraction_digits: usize) -> IResult<&str, Decimal> {
    map_res(
        recognize((
            digit1,
            opt(preceded(
                char('.'),
                take_while_m_n(1, max_fraction_digits, |c: char| c.is_ascii_digit()),
            )),
        )),
        Decimal::from_str,
    )
    .parse(input)
}

// Both orders are accepted: `+1.50*2` and `*2+1.50`.
fn modifier(input: &str) -> IResult<&str, (Option<Decimal>, Option<Decimal>)> {
    alt((
        (plus_mod, opt(star_mod)).map(|(plus, star)| (Some(plus), star)),
        (star_mod, opt(plus_mod)).map(|(star, plus)| (plus, Some(star))),
    ))
    .parse(input)
}

fn participant(input: &str) -> IResult<&str, ParticipantSpec<'_>> {
    (handle, opt(modifier))
        .map(|(handle, modifier)| {
            let (plus_mod, star_mod) = modifier.unwrap_or((None, None));
            ParticipantSpec {
                handle,
                plus_mod,
                star_mod,
            }
        })
        .parse(input)
}

fn uppercase_run(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_ascii_uppercase())(input)
}

// Handle length decides the kind: 2 letters name a user, 3 to 12 a group.
fn handle(input: &str) -> IResult<&str, Handle<'_>> {
    let (rest, run) = uppercase_run(input)?;
    match run.len() {
        2 => Ok((rest, Handle::User(run))),
        3..=12 => Ok((rest, Handle::Group(run))),
        _ => Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Verify,
        ))),
    }
}

fn user_handle(input: &str) -> IResult<&str, &str> {
    let (rest, run) = uppercase_run(input)?;
    if run.len() == 2 {
        Ok((rest, run))
    } else {
        Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Verify,
        )))
    }
}

fn group_handle(input: &str) -> IResult<&str, &str> {
    let (rest, run) = uppercase_run(input)?;
    if (3..=12).contains(&run.len()) {
        Ok((rest, run))
    } else {
        Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Verify,
        )))
    }
}

// `""` means no description; otherwise quotes may be escaped as `\"`.
fn description(input: &str) -> IResult<&str, Option<String>> {
    alt((
        value(None, tag("\"\"")),
        delimited(char('"'), description_body, char('"')).map(Some),
    ))
    .parse(input)
}

fn description_body(input: &str) -> IResult<&str, String> {
    fold_many0(
        alt((value('"', tag("\\\"")), none_of("\""))),
        String::new,
        |mut body, c| {
            body.push(c);
            body
        },
    )
    .parse(input)
}
