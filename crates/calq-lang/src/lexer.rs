pub mod error;
pub mod token;

use error::LexerError;
use nom::Parser;
use nom::{
    IResult,
    branch::alt,
    bytes::complete::tag,
    character::complete::{alpha1, alphanumeric1, char, digit1, multispace0, one_of},
    combinator::{map, map_res, opt, recognize},
    multi::many0,
    sequence::{pair, preceded, terminated},
};
use smol_str::SmolStr;
use token::{Operator, Token, TokenKind};

use crate::number::Number;
use crate::range::{Position, Span};

macro_rules! define_token_parser {
    ($name:ident, $tag:expr, $kind:expr) => {
        fn $name(input: Span) -> IResult<Span, Token> {
            map(tag($tag), |span: Span| Token {
                range: span.into(),
                kind: $kind,
            })
            .parse(input)
        }
    };
}

#[derive(Debug, Clone)]
pub struct Options {
    /// Character separating the integral and fractional parts of a number literal.
    pub decimal_separator: char,
}

impl Default for Options {
    fn default() -> Self {
        Self { decimal_separator: '.' }
    }
}

impl Options {
    /// Function arguments are separated by `;` when `,` is taken by decimals.
    pub fn argument_separator(&self) -> char {
        if self.decimal_separator == ',' { ';' } else { ',' }
    }
}

pub struct Lexer {
    options: Options,
}

impl Lexer {
    pub fn new(options: Options) -> Self {
        Self { options }
    }

    pub fn tokenize(&self, input: &str) -> Result<Vec<Token>, LexerError> {
        match tokens(Span::new(input), &self.options) {
            Ok((rest, mut tokens)) => {
                if let Some(c) = rest.fragment().chars().next() {
                    let position = Position::from(rest);

                    return Err(if c.is_ascii_digit() {
                        let literal = rest
                            .fragment()
                            .chars()
                            .take_while(|c| c.is_ascii_alphanumeric() || *c == self.options.decimal_separator)
                            .collect();
                        LexerError::InvalidNumber(literal, position)
                    } else {
                        LexerError::UnexpectedCharacter(c, position)
                    });
                }

                mark_unary_minus(&mut tokens);
                Ok(tokens)
            }
            Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(LexerError::UnexpectedCharacter(
                e.input.fragment().chars().next().unwrap_or_default(),
                e.input.into(),
            )),
            Err(nom::Err::Incomplete(_)) => Err(LexerError::UnexpectedCharacter('\0', Position::default())),
        }
    }
}

/// Rewrites `-` into a unary minus when it opens the formula or follows an operator, a left
/// bracket or an argument separator.
fn mark_unary_minus(tokens: &mut [Token]) {
    let mut previous: Option<TokenKind> = None;

    for token in tokens.iter_mut() {
        if token.kind == TokenKind::Operator(Operator::Subtract)
            && matches!(
                previous,
                None | Some(TokenKind::Operator(_))
                    | Some(TokenKind::LeftBracket)
                    | Some(TokenKind::ArgumentSeparator)
            )
        {
            token.kind = TokenKind::Operator(Operator::UnaryMinus);
        }

        previous = Some(token.kind.clone());
    }
}

define_token_parser!(l_paren, "(", TokenKind::LeftBracket);
define_token_parser!(r_paren, ")", TokenKind::RightBracket);
define_token_parser!(plus, "+", TokenKind::Operator(Operator::Add));
define_token_parser!(minus, "-", TokenKind::Operator(Operator::Subtract));
define_token_parser!(asterisk, "*", TokenKind::Operator(Operator::Multiply));
define_token_parser!(slash, "/", TokenKind::Operator(Operator::Divide));
define_token_parser!(percent, "%", TokenKind::Operator(Operator::Modulo));
define_token_parser!(caret, "^", TokenKind::Operator(Operator::Power));
define_token_parser!(and_and, "&&", TokenKind::Operator(Operator::And));
define_token_parser!(and, "&", TokenKind::Operator(Operator::And));
define_token_parser!(or_or, "||", TokenKind::Operator(Operator::Or));
define_token_parser!(or, "|", TokenKind::Operator(Operator::Or));
define_token_parser!(lte, "<=", TokenKind::Operator(Operator::LessOrEqualThan));
define_token_parser!(lte_symbol, "≤", TokenKind::Operator(Operator::LessOrEqualThan));
define_token_parser!(lt, "<", TokenKind::Operator(Operator::LessThan));
define_token_parser!(gte, ">=", TokenKind::Operator(Operator::GreaterOrEqualThan));
define_token_parser!(gte_symbol, "≥", TokenKind::Operator(Operator::GreaterOrEqualThan));
define_token_parser!(gt, ">", TokenKind::Operator(Operator::GreaterThan));
define_token_parser!(ne, "!=", TokenKind::Operator(Operator::NotEqual));
define_token_parser!(ne_symbol, "≠", TokenKind::Operator(Operator::NotEqual));
define_token_parser!(eq_eq, "==", TokenKind::Operator(Operator::Equal));
define_token_parser!(eq, "=", TokenKind::Operator(Operator::Equal));

fn comparison_operators(input: Span) -> IResult<Span, Token> {
    alt((lte, lte_symbol, lt, gte, gte_symbol, gt, ne, ne_symbol, eq_eq, eq)).parse(input)
}

fn operators(input: Span) -> IResult<Span, Token> {
    alt((
        plus,
        minus,
        asterisk,
        slash,
        percent,
        caret,
        and_and,
        and,
        or_or,
        or,
        comparison_operators,
    ))
    .parse(input)
}

fn number_kind(literal: &str, decimal_separator: char) -> Result<TokenKind, rust_decimal::Error> {
    if !literal.contains([decimal_separator, 'e', 'E'])
        && let Ok(n) = literal.parse::<i64>()
    {
        return Ok(TokenKind::Integer(n));
    }

    let literal = if decimal_separator == '.' {
        literal.to_string()
    } else {
        literal.replace(decimal_separator, ".")
    };

    literal.parse::<Number>().map(TokenKind::FloatingPoint)
}

fn number_literal<'a>(decimal_separator: char) -> impl FnMut(Span<'a>) -> IResult<Span<'a>, Token> {
    move |input: Span<'a>| {
        map_res(
            recognize((
                digit1,
                opt((char(decimal_separator), digit1)),
                opt((one_of("eE"), opt(one_of("+-")), digit1)),
            )),
            |span: Span<'a>| {
                number_kind(span.fragment(), decimal_separator).map(|kind| Token {
                    range: span.into(),
                    kind,
                })
            },
        )
        .parse(input)
    }
}

fn argument_separator<'a>(separator: char) -> impl FnMut(Span<'a>) -> IResult<Span<'a>, Token> {
    move |input: Span<'a>| {
        map(recognize(char(separator)), |span: Span<'a>| Token {
            range: span.into(),
            kind: TokenKind::ArgumentSeparator,
        })
        .parse(input)
    }
}

fn identifier(input: Span) -> IResult<Span, Token> {
    map(
        recognize(pair(
            alt((alpha1, tag("_"))),
            many0(alt((alphanumeric1, tag("_")))),
        )),
        |span: Span| Token {
            range: span.into(),
            kind: TokenKind::Identifier(SmolStr::new(span.fragment())),
        },
    )
    .parse(input)
}

fn token<'a>(input: Span<'a>, options: &Options) -> IResult<Span<'a>, Token> {
    alt((
        number_literal(options.decimal_separator),
        identifier,
        l_paren,
        r_paren,
        argument_separator(options.argument_separator()),
        operators,
    ))
    .parse(input)
}

fn tokens<'a>(input: Span<'a>, options: &Options) -> IResult<Span<'a>, Vec<Token>> {
    preceded(multispace0, many0(terminated(|input| token(input, options), multispace0))).parse(input)
}
