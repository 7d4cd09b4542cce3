use std::fmt::Display;

use nom::{
    character::complete::{char, digit1},
    combinator::{all_consuming, map_res, opt},
    sequence::preceded,
    IResult,
};

/// The body of a counted repetition, i.e. whatever sits between `{` and `}`.
#[derive(Debug, Hash, Clone, Copy, PartialEq, Eq)]
pub enum Bounds {
    Exactly(usize),
    AtLeast(usize),
    Between(usize, usize),
}

impl Display for Bounds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exactly(m) => write!(f, "{{{}}}", m),
            Self::AtLeast(m) => write!(f, "{{{},}}", m),
            Self::Between(m, n) => write!(f, "{{{},{}}}", m, n),
        }
    }
}

fn parse_count(input: &str) -> IResult<&str, usize> {
    map_res(digit1, |digits: &str| digits.parse::<usize>())(input)
}

fn parse_upper_bound(input: &str) -> IResult<&str, Option<Option<usize>>> {
    opt(preceded(char(','), opt(parse_count)))(input)
}

fn parse_bounds_body(input: &str) -> IResult<&str, Bounds> {
    let (input, lower) = parse_count(input)?;
    let (input, upper) = parse_upper_bound(input)?;
    let bounds = match upper {
        None => Bounds::Exactly(lower),
        Some(None) => Bounds::AtLeast(lower),
        Some(Some(upper)) => Bounds::Between(lower, upper),
    };
    Ok((input, bounds))
}

/// Parses `m`, `m,` or `m,n`. A missing lower bound, trailing garbage or
/// `m > n` yields `None`.
pub fn parse_bounds(body: &str) -> Option<Bounds> {
    match all_consuming(parse_bounds_body)(body) {
        Ok((_, Bounds::Between(lower, upper))) if lower > upper => None,
        Ok((_, bounds)) => Some(bounds),
        Err(_) => None,
    }
}
