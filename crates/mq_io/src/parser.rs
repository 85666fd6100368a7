//! Text parsers for bracketed index lists and edge lists.
//!
//! Measurement orders and catalogued edge lists are stored as Python-style
//! literals: `[3, 1, 2]`, `(3, 1, 2)` or `[(0, 1), (1, 2)]`. Both bracket
//! kinds are accepted, as are trailing commas and arbitrary whitespace.

use anyhow::{Result, anyhow};
use nom::IResult;
use nom::branch::alt;
use nom::character::complete::{char, digit1, multispace0};
use nom::combinator::{all_consuming, map_res, opt};
use nom::multi::separated_list0;
use nom::sequence::{delimited, separated_pair, terminated};

fn ws<'a, O, F>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    delimited(multispace0, inner, multispace0)
}

fn index(input: &str) -> IResult<&str, usize> {
    map_res(digit1, str::parse)(input)
}

fn index_items(input: &str) -> IResult<&str, Vec<usize>> {
    terminated(
        separated_list0(char(','), ws(index)),
        opt(ws(char(','))),
    )(input)
}

fn index_list(input: &str) -> IResult<&str, Vec<usize>> {
    alt((
        delimited(char('['), ws(index_items), char(']')),
        delimited(char('('), ws(index_items), char(')')),
    ))(input)
}

fn pair_items(input: &str) -> IResult<&str, (usize, usize)> {
    separated_pair(ws(index), char(','), ws(index))(input)
}

fn edge(input: &str) -> IResult<&str, (usize, usize)> {
    alt((
        delimited(char('('), pair_items, char(')')),
        delimited(char('['), pair_items, char(']')),
    ))(input)
}

fn edge_items(input: &str) -> IResult<&str, Vec<(usize, usize)>> {
    terminated(separated_list0(char(','), ws(edge)), opt(ws(char(','))))(input)
}

fn edge_list(input: &str) -> IResult<&str, Vec<(usize, usize)>> {
    alt((
        delimited(char('['), ws(edge_items), char(']')),
        delimited(char('('), ws(edge_items), char(')')),
    ))(input)
}

/// Parses a bracketed list of qubit labels such as `[3, 1, 2]`.
pub fn parse_index_list(text: &str) -> Result<Vec<usize>> {
    all_consuming(ws(index_list))(text)
        .map(|(_, list)| list)
        .map_err(|e| anyhow!("invalid index list {text:?}: {e}"))
}

/// Parses a bracketed list of pairs such as `[(0, 1), (1, 2)]`.
pub fn parse_edge_list(text: &str) -> Result<Vec<(usize, usize)>> {
    all_consuming(ws(edge_list))(text)
        .map(|(_, list)| list)
        .map_err(|e| anyhow!("invalid edge list {text:?}: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_lists() {
        assert_eq!(parse_index_list("[3, 1, 2]").unwrap(), vec![3, 1, 2]);
        assert_eq!(parse_index_list(" (4,5 ,6,) ").unwrap(), vec![4, 5, 6]);
        assert_eq!(parse_index_list("[]").unwrap(), Vec::<usize>::new());
        assert!(parse_index_list("[1, 2").is_err());
        assert!(parse_index_list("[1, -2]").is_err());
        assert!(parse_index_list("[1, 2] x").is_err());
    }

    #[test]
    fn edge_lists() {
        assert_eq!(
            parse_edge_list("[(0, 1), (1, 2)]").unwrap(),
            vec![(0, 1), (1, 2)]
        );
        assert_eq!(
            parse_edge_list("[[0,1],[2, 3],]").unwrap(),
            vec![(0, 1), (2, 3)]
        );
        assert!(parse_edge_list("[(0, 1, 2)]").is_err());
    }
}
