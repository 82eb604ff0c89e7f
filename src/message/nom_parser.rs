//! Nom-based IRC line parser.
//!
//! Splits a line into borrowed slices; the owned [`Message`](super::Message)
//! is assembled from these in `parse.rs`.

use nom::{
    bytes::complete::{take_till, take_till1, take_until, take_while1},
    character::complete::{char, space0, space1},
    combinator::{opt, verify},
    error::{context, VerboseError, VerboseErrorKind},
    multi::many0,
    sequence::{pair, preceded},
    IResult,
};

type ParseResult<I, O> = IResult<I, O, VerboseError<I>>;

fn is_line_end(c: char) -> bool {
    c == '\r' || c == '\n'
}

/// `@tags`, up to the first space.
fn parse_tags(input: &str) -> ParseResult<&str, &str> {
    context("parsing IRCv3 message tags", preceded(char('@'), take_until(" ")))(input)
}

/// `:prefix`, up to the first space.
fn parse_prefix(input: &str) -> ParseResult<&str, &str> {
    context(
        "parsing message prefix",
        preceded(char(':'), take_while1(|c| c != ' ')),
    )(input)
}

/// Letters, or a three digit numeric.
fn parse_command(input: &str) -> ParseResult<&str, &str> {
    context(
        "parsing IRC command",
        take_while1(|c: char| c.is_ascii_alphanumeric()),
    )(input)
}

/// ` middle`: one or more spaces, then a non-empty word that does not
/// open with `:`.
fn parse_middle(input: &str) -> ParseResult<&str, &str> {
    preceded(
        space1,
        verify(take_till1(|c| c == ' ' || is_line_end(c)), |p: &str| {
            !p.starts_with(':')
        }),
    )(input)
}

/// ` :trailing`, running to the end of the line.
fn parse_trailing(input: &str) -> ParseResult<&str, &str> {
    preceded(pair(space1, char(':')), take_till(is_line_end))(input)
}

/// Parse a complete IRC line into its components.
///
/// ```text
/// [@tags ][:prefix ]<command>[ middle...][ :trailing]
/// ```
pub fn parse_message(input: &str) -> ParseResult<&str, ParsedMessage<'_>> {
    let (input, tags) = context("parsing optional tags", opt(parse_tags))(input)?;
    let (input, _) = space0(input)?;
    let (input, prefix) = context("parsing optional prefix", opt(parse_prefix))(input)?;
    let (input, _) = space0(input)?;
    let (input, command) = context("parsing required command", parse_command)(input)?;

    let (input, mut params) = many0(parse_middle)(input)?;
    let (input, last) = opt(parse_trailing)(input)?;
    let trailing = last.is_some();
    params.extend(last);

    Ok((
        input,
        ParsedMessage {
            tags,
            prefix,
            command,
            params,
            trailing,
        },
    ))
}

/// A parsed IRC line with borrowed string slices.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedMessage<'a> {
    /// Raw tags string (without the leading `@`), if present.
    pub tags: Option<&'a str>,
    /// Raw prefix string (without the leading `:`), if present.
    pub prefix: Option<&'a str>,
    /// The command name, verbatim.
    pub command: &'a str,
    /// Command parameters, including trailing.
    pub params: Vec<&'a str>,
    /// Whether the last parameter was introduced with `:`.
    pub trailing: bool,
}

impl<'a> ParsedMessage<'a> {
    /// Parse a line, reporting where parsing stopped on failure.
    pub fn parse(input: &'a str) -> Result<Self, DetailedParseError> {
        match parse_message(input) {
            Ok((rest, msg)) => {
                // Only padding and the line ending may follow the last parameter.
                let leftover = rest.trim_start_matches(' ');
                if leftover.chars().all(is_line_end) {
                    Ok(msg)
                } else {
                    Err(DetailedParseError {
                        position: input.len() - leftover.len(),
                        context: Some("parsing parameters"),
                    })
                }
            }
            Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
                // The outermost entry marks where the failing component began.
                let position = e
                    .errors
                    .last()
                    .map_or(input.len(), |(rest, _)| input.len() - rest.len());
                let context = e.errors.iter().rev().find_map(|(_, kind)| match kind {
                    VerboseErrorKind::Context(ctx) => Some(*ctx),
                    _ => None,
                });
                Err(DetailedParseError { position, context })
            }
            Err(nom::Err::Incomplete(_)) => Err(DetailedParseError {
                position: input.len(),
                context: Some("incomplete input"),
            }),
        }
    }
}

/// Where and while doing what the parser gave up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailedParseError {
    /// Byte position where parsing failed.
    pub position: usize,
    /// Innermost context label, if any.
    pub context: Option<&'static str>,
}

impl std::fmt::Display for DetailedParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "parse error at position {}", self.position)?;
        if let Some(ctx) = self.context {
            write!(f, " while {}", ctx)?;
        }
        Ok(())
    }
}

impl std::error::Error for DetailedParseError {}
