use colored::Colorize;
use itertools::Itertools;
use log::{debug, trace};
use std::{error::Error, fmt::Display, iter};

use crate::bounds::{parse_bounds, Bounds};

use self::state::{OpenKind, ParsingState, Slot};

mod state {
    // the scan threads one of these through every consume_* function

    use log::trace;

    use super::{ParserError, Token};

    /// One entry of the output buffer. `Conjunction` is the `&&` of a
    /// character set and never survives the closing `]`.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Slot {
        Token(Token),
        Conjunction(usize),
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum OpenKind {
        Group,
        Set,
        NegatedSet,
        Count,
    }

    /// A construct still waiting for its closing character.
    #[derive(Debug, Clone, Copy)]
    pub struct Open {
        pub kind: OpenKind,
        pub position: usize,
        pub offset: usize,
    }

    #[derive(Debug)]
    pub struct ParsingState {
        pattern: Vec<char>,
        cursor: usize,
        pub slots: Vec<Slot>,
        pub open: Vec<Open>,
        pub fully_parenthesized: bool,
    }

    impl ParsingState {
        pub fn new(pattern: &str) -> ParsingState {
            ParsingState {
                pattern: pattern.chars().collect(),
                cursor: 0,
                slots: Vec::new(),
                open: Vec::new(),
                fully_parenthesized: false,
            }
        }

        pub fn len(&self) -> usize {
            self.pattern.len()
        }

        pub fn next_char(&mut self) -> Option<(usize, char)> {
            let c = *self.pattern.get(self.cursor)?;
            self.cursor += 1;
            Some((self.cursor - 1, c))
        }

        pub fn peek(&self) -> Option<char> {
            self.pattern.get(self.cursor).copied()
        }

        pub fn emit(&mut self, token: Token) {
            self.slots.push(Slot::Token(token));
        }

        pub fn push_open(&mut self, kind: OpenKind, offset: usize) {
            trace!("push: {:?} at offset {}", kind, offset);
            self.open.push(Open {
                kind,
                position: self.slots.len(),
                offset,
            });
        }

        pub fn pop_open(&mut self, expected: &[OpenKind], offset: usize) -> Result<Open, ParserError> {
            match self.open.pop() {
                Some(open) if expected.contains(&open.kind) => {
                    trace!("pop: {:?} opened at offset {}", open.kind, open.offset);
                    Ok(open)
                }
                _ => Err(ParserError::UnmatchedOperator(offset)),
            }
        }

        pub fn in_set(&self) -> bool {
            self.open
                .iter()
                .any(|open| matches!(open.kind, OpenKind::Set | OpenKind::NegatedSet))
        }

        /// First buffer position owned by the innermost open construct.
        pub fn floor(&self) -> usize {
            self.open.last().map_or(0, |open| open.position)
        }

        pub fn last_literal(&self) -> Option<char> {
            match self.slots.last() {
                Some(Slot::Token(Token::Literal(c))) => Some(*c),
                _ => None,
            }
        }

        pub fn finish(self) -> Result<Vec<Token>, ParserError> {
            let wrap = !self.fully_parenthesized;
            let mut tokens = Vec::with_capacity(self.slots.len() + 2);
            if wrap {
                tokens.push(Token::Operator(super::Operator::OpenParen));
            }
            for slot in self.slots {
                match slot {
                    Slot::Token(token) => tokens.push(token),
                    Slot::Conjunction(offset) => {
                        return Err(ParserError::InvalidIntersectionExpression(offset))
                    }
                }
            }
            if wrap {
                tokens.push(Token::Operator(super::Operator::CloseParen));
            }
            Ok(tokens)
        }
    }
}

static METACHARACTERS: &'static [char] = &[
    '\\', '.', '?', '+', '*', '|', '(', ')', '[', ']', '^', '{', '}', '-', '&',
];

/// Structural tokens. They never match a character and only shape the
/// epsilon transitions of the automaton.
#[derive(Debug, Hash, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    OpenParen,
    CloseParen,
    Or,
    Star,
    Plus,
    Optional,
}

impl Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let symbol = match self {
            Self::OpenParen => '(',
            Self::CloseParen => ')',
            Self::Or => '|',
            Self::Star => '*',
            Self::Plus => '+',
            Self::Optional => '?',
        };
        write!(f, "{}", symbol)
    }
}

/// One atomic unit of a compiled pattern. Position `i` of a token sequence
/// doubles as vertex `i` of the automaton.
#[derive(Debug, Hash, Clone, PartialEq, Eq)]
pub enum Token {
    Literal(char),
    Wildcard,
    Range(char, char),
    Intersection(Box<Token>, Box<Token>),
    Set(Vec<Token>, bool),
    Operator(Operator),
}

impl Token {
    /// Builds `lo-hi`, rejecting empty and single-character ranges.
    pub fn range(lo: char, hi: char, offset: usize) -> Result<Token, ParserError> {
        if lo < hi {
            Ok(Token::Range(lo, hi))
        } else {
            Err(ParserError::InvalidCharacterRange(offset))
        }
    }

    pub fn matches(&self, c: char) -> bool {
        match self {
            Token::Literal(literal) => *literal == c,
            Token::Wildcard => true,
            Token::Range(lo, hi) => *lo <= c && c <= *hi,
            Token::Intersection(left, right) => left.matches(c) && right.matches(c),
            Token::Set(members, negated) => negated ^ members.iter().any(|member| member.matches(c)),
            Token::Operator(_) => false,
        }
    }

    pub fn is_operator(&self, operator: Operator) -> bool {
        matches!(self, Token::Operator(op) if *op == operator)
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Literal(c) if METACHARACTERS.contains(c) => write!(f, "\\{}", c),
            Self::Literal(c) => write!(f, "{}", c),
            Self::Wildcard => write!(f, "."),
            Self::Range(lo, hi) => write!(f, "{}-{}", Token::Literal(*lo), Token::Literal(*hi)),
            Self::Intersection(left, right) => write!(f, "{}&&{}", left, right),
            Self::Set(members, negated) => write!(
                f,
                "[{}{}]",
                if *negated { "^" } else { "" },
                members.iter().join("")
            ),
            Self::Operator(operator) => write!(f, "{}", operator),
        }
    }
}

/// Every variant carries the char offset in the pattern where parsing gave
/// up, except `MalformedGroupExpression` which carries a token position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserError {
    UnmatchedOperator(usize),
    InvalidCharacterRange(usize),
    InvalidClosureExpression(usize),
    InvalidIntersectionExpression(usize),
    MalformedGroupExpression(usize),
    DanglingEscape(usize),
}

impl ParserError {
    pub fn offset(&self) -> usize {
        match *self {
            Self::UnmatchedOperator(offset)
            | Self::InvalidCharacterRange(offset)
            | Self::InvalidClosureExpression(offset)
            | Self::InvalidIntersectionExpression(offset)
            | Self::MalformedGroupExpression(offset)
            | Self::DanglingEscape(offset) => offset,
        }
    }

    fn code(&self) -> u8 {
        match self {
            Self::UnmatchedOperator(_) => 1,
            Self::InvalidCharacterRange(_) => 2,
            Self::InvalidClosureExpression(_) => 3,
            Self::InvalidIntersectionExpression(_) => 4,
            Self::MalformedGroupExpression(_) => 5,
            Self::DanglingEscape(_) => 6,
        }
    }

    fn description(&self) -> &'static str {
        match self {
            Self::UnmatchedOperator(_) => "unmatched operator",
            Self::InvalidCharacterRange(_) => "bad character range",
            Self::InvalidClosureExpression(_) => "bad closure expression",
            Self::InvalidIntersectionExpression(_) => "bad && expression",
            Self::MalformedGroupExpression(_) => "malformed group expression",
            Self::DanglingEscape(_) => "dangling escape",
        }
    }

    /// The pattern with a caret under the offending character.
    pub fn render(&self, pattern: &str) -> String {
        format!(
            "{} {}:\n | {}\n | {}{}",
            format!("[{:0>3}]", self.code()).red().bold(),
            self.description(),
            pattern,
            " ".repeat(self.offset()),
            "^".green()
        )
    }
}

impl Display for ParserError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} at offset {}",
            format!("[{:0>3}]", self.code()).red().bold(),
            self.description(),
            self.offset()
        )
    }
}

impl Error for ParserError {}

/// Rewrites a pattern into a flat token sequence: character classes become
/// `Set` tokens, counted repetition is expanded, and the result is wrapped
/// in one outer group unless the pattern already is one.
pub fn tokenize(pattern: &str) -> Result<Vec<Token>, ParserError> {
    let mut state = ParsingState::new(pattern);
    while let Some((offset, c)) = state.next_char() {
        consume_token(&mut state, offset, c)?;
    }
    if !state.open.is_empty() {
        return Err(ParserError::UnmatchedOperator(state.len()));
    }
    let tokens = state.finish()?;
    debug!("tokenized {:?} into {}", pattern, tokens.iter().join(" "));
    Ok(tokens)
}

fn consume_token(state: &mut ParsingState, offset: usize, c: char) -> Result<(), ParserError> {
    match c {
        '\\' => match state.next_char() {
            Some((_, escaped)) => state.emit(Token::Literal(escaped)),
            None => return Err(ParserError::DanglingEscape(offset)),
        },
        '.' => state.emit(Token::Wildcard),
        '?' => state.emit(Token::Operator(Operator::Optional)),
        '+' => state.emit(Token::Operator(Operator::Plus)),
        '*' => state.emit(Token::Operator(Operator::Star)),
        '|' => state.emit(Token::Operator(Operator::Or)),
        '(' => {
            state.push_open(OpenKind::Group, offset);
            state.emit(Token::Operator(Operator::OpenParen));
        }
        ')' => consume_close_paren(state, offset)?,
        '[' => state.push_open(OpenKind::Set, offset),
        '^' => consume_caret(state, offset)?,
        ']' => consume_close_bracket(state, offset)?,
        '{' => state.push_open(OpenKind::Count, offset),
        '}' => consume_close_brace(state, offset)?,
        '-' => consume_range(state, offset)?,
        '&' if state.in_set() && state.peek() == Some('&') => {
            state.next_char();
            state.slots.push(Slot::Conjunction(offset));
        }
        literal => state.emit(Token::Literal(literal)),
    }
    Ok(())
}

fn consume_close_paren(state: &mut ParsingState, offset: usize) -> Result<(), ParserError> {
    let open = state.pop_open(&[OpenKind::Group], offset)?;
    state.emit(Token::Operator(Operator::CloseParen));
    if open.offset == 0 && offset + 1 == state.len() {
        state.fully_parenthesized = true;
    }
    Ok(())
}

fn consume_caret(state: &mut ParsingState, offset: usize) -> Result<(), ParserError> {
    let emitted = state.slots.len();
    let negates = matches!(
        state.open.last(),
        Some(open) if open.kind == OpenKind::Set && open.position == emitted
    );
    if negates {
        if let Some(open) = state.open.last_mut() {
            open.kind = OpenKind::NegatedSet;
        }
    } else if state.in_set() {
        state.emit(Token::Literal('^'));
    } else {
        return Err(ParserError::UnmatchedOperator(offset));
    }
    Ok(())
}

fn consume_close_bracket(state: &mut ParsingState, offset: usize) -> Result<(), ParserError> {
    let open = state.pop_open(&[OpenKind::Set, OpenKind::NegatedSet], offset)?;
    let members = fold_intersections(state.slots.split_off(open.position))?;
    trace!("building set from {}", members.iter().join(" "));
    state.emit(Token::Set(members, open.kind == OpenKind::NegatedSet));
    Ok(())
}

fn fold_intersections(slots: Vec<Slot>) -> Result<Vec<Token>, ParserError> {
    let mut members: Vec<Token> = Vec::with_capacity(slots.len());
    let mut slots = slots.into_iter();
    while let Some(slot) = slots.next() {
        match slot {
            Slot::Token(token) => members.push(token),
            Slot::Conjunction(offset) => match (members.pop(), slots.next()) {
                (Some(left), Some(Slot::Token(right))) => {
                    members.push(Token::Intersection(Box::new(left), Box::new(right)))
                }
                _ => return Err(ParserError::InvalidIntersectionExpression(offset)),
            },
        }
    }
    Ok(members)
}

fn consume_range(state: &mut ParsingState, offset: usize) -> Result<(), ParserError> {
    let lo = match state.last_literal() {
        Some(lo) if state.slots.len() > state.floor() => lo,
        _ => return Err(ParserError::InvalidCharacterRange(offset)),
    };
    let (next_offset, next) = state
        .next_char()
        .ok_or(ParserError::InvalidCharacterRange(offset))?;
    let emitted = state.slots.len();
    consume_token(state, next_offset, next)?;
    let hi = match state.last_literal() {
        Some(hi) if state.slots.len() == emitted + 1 => hi,
        _ => return Err(ParserError::InvalidCharacterRange(next_offset)),
    };
    state.slots.truncate(emitted - 1);
    state.emit(Token::range(lo, hi, next_offset)?);
    Ok(())
}

fn consume_close_brace(state: &mut ParsingState, offset: usize) -> Result<(), ParserError> {
    let open = state.pop_open(&[OpenKind::Count], offset)?;
    let body = state
        .slots
        .split_off(open.position)
        .into_iter()
        .map(|slot| match slot {
            Slot::Token(Token::Literal(c)) => Ok(c),
            _ => Err(ParserError::InvalidClosureExpression(offset)),
        })
        .collect::<Result<String, _>>()?;
    let bounds = parse_bounds(&body).ok_or(ParserError::InvalidClosureExpression(offset))?;
    // counts repeat a unit of the enclosing group, never a set member
    let start = match unit_start(&state.slots) {
        Some(start) if start >= state.floor() && !state.in_set() => start,
        _ => return Err(ParserError::InvalidClosureExpression(offset)),
    };
    let unit = state
        .slots
        .split_off(start)
        .into_iter()
        .map(|slot| match slot {
            Slot::Token(token) => Ok(token),
            Slot::Conjunction(_) => Err(ParserError::InvalidClosureExpression(offset)),
        })
        .collect::<Result<Vec<Token>, _>>()?;
    debug!("replicating {}{}", unit.iter().join(""), bounds);
    let tokens = replicate(&unit, bounds).ok_or(ParserError::InvalidClosureExpression(offset))?;
    state.slots.extend(tokens.into_iter().map(Slot::Token));
    Ok(())
}

/// Finds where the unit preceding a `{` starts: the last token, or the whole
/// group when the last token closes one.
fn unit_start(slots: &[Slot]) -> Option<usize> {
    match slots.last()? {
        Slot::Token(Token::Operator(Operator::CloseParen)) => {
            let mut depth = 0usize;
            for (index, slot) in slots.iter().enumerate().rev() {
                match slot {
                    Slot::Token(Token::Operator(Operator::CloseParen)) => depth += 1,
                    Slot::Token(Token::Operator(Operator::OpenParen)) => {
                        depth -= 1;
                        if depth == 0 {
                            return Some(index);
                        }
                    }
                    _ => {}
                }
            }
            None
        }
        Slot::Token(Token::Operator(_)) | Slot::Conjunction(_) => None,
        Slot::Token(_) => Some(slots.len() - 1),
    }
}

/// `None` when the expansion would not fit in a `usize` count.
fn replicate(unit: &[Token], bounds: Bounds) -> Option<Vec<Token>> {
    let copies = |count: usize| iter::repeat(unit).take(count).flatten().cloned();
    let mut tokens = vec![Token::Operator(Operator::OpenParen)];
    match bounds {
        Bounds::Exactly(count) => tokens.extend(copies(count)),
        Bounds::AtLeast(count) => {
            tokens.extend(copies(count.checked_add(1)?));
            tokens.push(Token::Operator(Operator::Star));
        }
        Bounds::Between(lower, upper) => {
            for count in lower..=upper {
                if count > lower {
                    tokens.push(Token::Operator(Operator::Or));
                }
                tokens.extend(copies(count));
            }
        }
    }
    tokens.push(Token::Operator(Operator::CloseParen));
    Some(tokens)
}
