use thiserror::Error;

use crate::range::Position;

#[derive(Error, Debug, PartialEq)]
pub enum LexerError {
    #[error("Unexpected character `{0}` at position {1}")]
    UnexpectedCharacter(char, Position),
    #[error("Invalid number literal `{0}` at position {1}")]
    InvalidNumber(String, Position),
}

impl LexerError {
    pub fn position(&self) -> Position {
        match self {
            LexerError::UnexpectedCharacter(_, position) | LexerError::InvalidNumber(_, position) => *position,
        }
    }
}
