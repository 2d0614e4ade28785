//! Parser for CSS-class-like layout tokens.
//!
//! Grammar: `(col-offset|offset|col|order)(-<breakpoint>)?(-<width>)?`,
//! case-insensitive. Anything else is not a token and stays verbatim as a
//! custom class on the enclosing column.

use std::fmt;

use nom::{
    branch::alt,
    bytes::complete::tag_no_case,
    character::complete::{char, digit1},
    combinator::{all_consuming, map, map_opt, map_res, opt},
    sequence::{preceded, tuple},
    IResult,
};

use crate::model::Breakpoint;


/// Layout role of one recognized class token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Span,
    Offset,
    Order,
}

/// One parsed layout class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassToken {
    pub kind: TokenKind,
    /// `None` means breakpoint-unspecific ("smallest viewport and up").
    pub breakpoint: Option<Breakpoint>,
    pub width: Option<u32>,
}

impl fmt::Display for ClassToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            TokenKind::Span => "col",
            TokenKind::Offset => "offset",
            TokenKind::Order => "order",
        };
        f.write_str(kind)?;
        if let Some(bp) = self.breakpoint {
            write!(f, "-{bp}")?;
        }
        if let Some(width) = self.width {
            write!(f, "-{width}")?;
        }
        Ok(())
    }
}

/// The type group of the grammar. Alternatives ordered so a longer literal
/// is never shadowed by its prefix.
fn type_group(input: &str) -> IResult<&str, &str> {
    alt((
        tag_no_case("col-offset"),
        tag_no_case("offset"),
        tag_no_case("order"),
        tag_no_case("col"),
    ))(input)
}

/// Substring containment decides the kind, not which alternative matched:
/// anything carrying "offset" is an offset, then "order", else a span.
fn classify(group: &str) -> TokenKind {
    let group = group.to_ascii_lowercase();
    if group.contains("offset") {
        TokenKind::Offset
    } else if group.contains("order") {
        TokenKind::Order
    } else {
        TokenKind::Span
    }
}

fn breakpoint(input: &str) -> IResult<&str, Breakpoint> {
    map_opt(
        alt((
            tag_no_case("xxs"),
            tag_no_case("xxl"),
            tag_no_case("xs"),
            tag_no_case("sm"),
            tag_no_case("md"),
            tag_no_case("lg"),
            tag_no_case("xl"),
        )),
        Breakpoint::parse,
    )(input)
}

fn width(input: &str) -> IResult<&str, u32> {
    map_res(digit1, str::parse)(input)
}

/// Parse one whitespace-delimited class string into a token.
///
/// Returns `None` when the string is not a layout class; the caller keeps it
/// as a custom class.
pub fn parse_class(class: &str) -> Option<ClassToken> {
    let result: IResult<&str, ClassToken> = all_consuming(map(
        tuple((
            type_group,
            opt(preceded(char('-'), breakpoint)),
            opt(preceded(char('-'), width)),
        )),
        |(group, breakpoint, width)| ClassToken {
            kind: classify(group),
            breakpoint,
            width,
        },
    ))(class);

    result.ok().map(|(_, token)| token)
}

/// Split a class attribute on whitespace and parse every token.
///
/// Unrecognized classes are collected verbatim into the custom accumulator.
pub fn tokenize_classes(classes: &str) -> (Vec<ClassToken>, Vec<String>) {
    let mut tokens = Vec::new();
    let mut custom = Vec::new();
    for class in classes.split_whitespace() {
        match parse_class(class) {
            Some(token) => tokens.push(token),
            None => custom.push(class.to_string()),
        }
    }
    (tokens, custom)
}
