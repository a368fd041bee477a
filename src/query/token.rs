//! Tokenizer
//!
//! Splits raw filter text into tokens. Words cover field paths, bare numbers
//! and unquoted values such as `10/20` or `now-2d`. Characters that start no
//! token are skipped.

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::char,
    combinator::{map, recognize, value},
    sequence::delimited,
    IResult,
};

use crate::query::ast::{LogicGate, Operator};

/// A lexical unit of the filter language
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Identifier, dotted path or bare value
    Word(String),
    /// Double-quoted string, quotes included
    Quoted(String),
    /// Comparison operator
    Op(Operator),
    /// `and` / `or`
    Gate(LogicGate),
    /// `(`
    Open,
    /// `)`
    Close,
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Word(w) | Self::Quoted(w) => write!(f, "{}", w),
            Self::Op(op) => write!(f, "{}", op),
            Self::Gate(gate) => write!(f, "{}", gate),
            Self::Open => write!(f, "("),
            Self::Close => write!(f, ")"),
        }
    }
}

/// Tokenize a filter expression
pub fn tokenize(input: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut rest = input.trim_start();

    while !rest.is_empty() {
        match parse_token(rest) {
            Ok((remaining, token)) => {
                tokens.push(token);
                rest = remaining;
            }
            Err(_) => {
                let mut chars = rest.chars();
                if let Some(skipped) = chars.next() {
                    tracing::trace!(%skipped, "skipping unrecognized character");
                }
                rest = chars.as_str();
            }
        }
        rest = rest.trim_start();
    }

    tokens
}

fn parse_token(input: &str) -> IResult<&str, Token> {
    alt((parse_quoted, parse_operator, parse_paren, parse_word))(input)
}

/// Parse a double-quoted string, keeping the quotes
fn parse_quoted(input: &str) -> IResult<&str, Token> {
    map(
        recognize(delimited(char('"'), take_while(|c| c != '"'), char('"'))),
        |s: &str| Token::Quoted(s.to_string()),
    )(input)
}

/// Parse comparison operator
fn parse_operator(input: &str) -> IResult<&str, Token> {
    map(
        alt((
            value(Operator::Gte, tag(">=")),
            value(Operator::Lte, tag("<=")),
            value(Operator::Ne, tag("!=")),
            value(Operator::Eq, tag("=")),
            value(Operator::Gt, tag(">")),
            value(Operator::Lt, tag("<")),
            value(Operator::Exists, tag(":")),
        )),
        Token::Op,
    )(input)
}

fn parse_paren(input: &str) -> IResult<&str, Token> {
    alt((value(Token::Open, char('(')), value(Token::Close, char(')'))))(input)
}

/// Parse a word; `and`/`or` become gates
fn parse_word(input: &str) -> IResult<&str, Token> {
    map(take_while1(is_word_char), |w: &str| match LogicGate::from_str(w) {
        Some(gate) => Token::Gate(gate),
        None => Token::Word(w.to_string()),
    })(input)
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '.' | '/' | '-' | '+')
}
