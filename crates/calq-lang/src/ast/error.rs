use smol_str::SmolStr;
use thiserror::Error;

use crate::{lexer::token::Operator, range::Range};

#[derive(Error, Debug, PartialEq)]
pub enum ParseError {
    #[error("No matching left bracket found for the right bracket at position {}.", .0.start)]
    UnmatchedRightBracket(Range),
    #[error("No matching right bracket found for the left bracket at position {}.", .0.start)]
    UnmatchedLeftBracket(Range),
    #[error(
        "There is a syntax issue for the operation \"{0}\" at position {pos}. The number of arguments does not match with what is expected.",
        pos = .1.start
    )]
    OperatorArgumentMismatch(Operator, Range),
    #[error(
        "There is a syntax issue for the function \"{0}\" at position {pos}. The number of arguments does not match with what is expected.",
        pos = .1.start
    )]
    FunctionArgumentMismatch(SmolStr, Range),
    #[error("The function \"{0}\" is not defined.")]
    UnknownFunction(SmolStr, Range),
    #[error("Unexpected integer constant \"{0}\" found.")]
    UnexpectedIntegerConstant(i64),
    #[error("Unexpected floating point constant \"{0}\" found.")]
    UnexpectedFloatingPointConstant(String),
    #[error("The syntax of the provided formula is not valid.")]
    InvalidSyntax,
    #[error("The provided formula is empty.")]
    EmptyFormula,
    #[error("Unexpected argument separator at position {}.", .0.start)]
    MisplacedArgumentSeparator(Range),
}

impl ParseError {
    pub fn range(&self) -> Option<Range> {
        match self {
            ParseError::UnmatchedRightBracket(range)
            | ParseError::UnmatchedLeftBracket(range)
            | ParseError::OperatorArgumentMismatch(_, range)
            | ParseError::FunctionArgumentMismatch(_, range)
            | ParseError::UnknownFunction(_, range)
            | ParseError::MisplacedArgumentSeparator(range) => Some(*range),
            ParseError::UnexpectedIntegerConstant(_)
            | ParseError::UnexpectedFloatingPointConstant(_)
            | ParseError::InvalidSyntax
            | ParseError::EmptyFormula => None,
        }
    }
}
