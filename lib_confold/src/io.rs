use nom::{
    IResult, Parser,
    bytes::complete::take_till1,
    character::complete::{char, satisfy},
    combinator::verify,
    multi::many0,
};

use crate::error::{Error, Result};

/// A named aligned sequence as read from the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignmentRecord {
    pub name: String,
    pub sequence: String,
}

/// Parses a whole alignment, either in FASTA format or as one plain
/// sequence per line.
pub fn parse_alignment(input: &str) -> Result<Vec<AlignmentRecord>> {
    if input.trim_start().starts_with('>') {
        parse_fasta(input)
    } else {
        parse_plain(input)
    }
}

pub fn parse_fasta(input: &str) -> Result<Vec<AlignmentRecord>> {
    let mut records = Vec::new();
    let mut rest = skip_any_whitespace(input).map_err(translate_nom_error)?;
    while !rest.is_empty() {
        let (next, record) = parse_fasta_record(rest).map_err(translate_nom_error)?;
        records.push(record);
        rest = skip_any_whitespace(next).map_err(translate_nom_error)?;
    }
    if records.is_empty() {
        return Err(Error::EmptyAlignment);
    }
    Ok(records)
}

pub fn parse_plain(input: &str) -> Result<Vec<AlignmentRecord>> {
    let records: Vec<_> = input
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .enumerate()
        .map(|(index, line)| AlignmentRecord {
            name: format!("sequence_{}", index + 1),
            sequence: line.to_string(),
        })
        .collect();
    if records.is_empty() {
        return Err(Error::EmptyAlignment);
    }
    Ok(records)
}

pub fn parse_fasta_record(input: &str) -> IResult<&str, AlignmentRecord> {
    let input = char('>')(input)?.0;
    let (input, name) = take_till1(is_any_line_break)(input)?;
    let (input, lines) = many0(parse_sequence_line).parse(input)?;

    let mut sequence = String::new();
    for line in lines {
        sequence.extend(line.chars().filter(|c| !c.is_whitespace()));
    }
    Ok((
        input,
        AlignmentRecord {
            name: name.trim().to_string(),
            sequence,
        },
    ))
}

fn parse_sequence_line(input: &str) -> IResult<&str, &str> {
    let input = skip_any_whitespace(input)?;
    verify(take_till1(is_any_line_break), |line: &str| {
        !line.starts_with('>')
    })
    .parse(input)
}

pub fn skip_any_whitespace(
    input: &str,
) -> std::result::Result<&str, nom::Err<nom::error::Error<&str>>> {
    many0(satisfy(char::is_whitespace))
        .parse(input)
        .map(|(input, _)| input)
}

pub fn is_any_line_break(c: char) -> bool {
    c == '\n' || c == '\r'
}

pub fn translate_nom_error(error: nom::Err<nom::error::Error<&str>>) -> Error {
    match error {
        nom::Err::Incomplete(needed) => Error::ParserIncomplete(needed),
        nom::Err::Error(error) | nom::Err::Failure(error) => Error::Parser {
            input: error.input.to_string(),
            kind: error.code,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fasta_with_wrapped_lines() {
        let records = parse_alignment(">first\nGGAA\nACC\n>second\nGG-AACC\n").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "first");
        assert_eq!(records[0].sequence, "GGAAACC");
        assert_eq!(records[1].sequence, "GG-AACC");
    }

    #[test]
    fn parses_plain_lines() {
        let records = parse_alignment("GGAAACC\nGG-AACC\n").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "sequence_1");
        assert_eq!(records[1].sequence, "GG-AACC");
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(matches!(parse_alignment("\n  \n"), Err(Error::EmptyAlignment)));
    }
}
