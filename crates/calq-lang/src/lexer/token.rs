use std::fmt::{self, Display, Formatter};

use smol_str::SmolStr;

use crate::{number::Number, range::Range};

#[derive(PartialEq, Eq, Debug, Clone, Copy, Hash)]
pub enum Operator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Power,
    UnaryMinus,
    And,
    Or,
    LessThan,
    LessOrEqualThan,
    GreaterThan,
    GreaterOrEqualThan,
    Equal,
    NotEqual,
}

impl Operator {
    /// Binding strength used by the shunting-yard builder. Higher binds tighter.
    pub fn precedence(&self) -> u8 {
        match self {
            Operator::And | Operator::Or => 1,
            Operator::LessThan
            | Operator::LessOrEqualThan
            | Operator::GreaterThan
            | Operator::GreaterOrEqualThan
            | Operator::Equal
            | Operator::NotEqual => 2,
            Operator::Add | Operator::Subtract => 3,
            Operator::Multiply | Operator::Divide | Operator::Modulo => 4,
            Operator::Power => 5,
            Operator::UnaryMinus => 6,
        }
    }

    /// Only the four basic arithmetic operators associate to the left.
    pub fn is_left_associative(&self) -> bool {
        matches!(
            self,
            Operator::Multiply | Operator::Add | Operator::Subtract | Operator::Divide
        )
    }
}

impl Display for Operator {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        let s = match self {
            Operator::Add => "+",
            Operator::Subtract => "-",
            Operator::Multiply => "*",
            Operator::Divide => "/",
            Operator::Modulo => "%",
            Operator::Power => "^",
            Operator::UnaryMinus => "_",
            Operator::And => "&",
            Operator::Or => "|",
            Operator::LessThan => "<",
            Operator::LessOrEqualThan => "≤",
            Operator::GreaterThan => ">",
            Operator::GreaterOrEqualThan => "≥",
            Operator::Equal => "=",
            Operator::NotEqual => "≠",
        };
        write!(f, "{}", s)
    }
}

#[derive(PartialEq, Eq, Debug, Clone)]
pub struct Token {
    pub range: Range,
    pub kind: TokenKind,
}

#[derive(PartialEq, Eq, Debug, Clone)]
pub enum TokenKind {
    Integer(i64),
    FloatingPoint(Number),
    Identifier(SmolStr),
    Operator(Operator),
    LeftBracket,
    RightBracket,
    ArgumentSeparator,
}

impl Display for Token {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "{}", self.kind)
    }
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            TokenKind::Integer(n) => write!(f, "{}", n),
            TokenKind::FloatingPoint(n) => write!(f, "{}", n),
            TokenKind::Identifier(name) => write!(f, "{}", name),
            TokenKind::Operator(op) => write!(f, "{}", op),
            TokenKind::LeftBracket => write!(f, "("),
            TokenKind::RightBracket => write!(f, ")"),
            TokenKind::ArgumentSeparator => write!(f, ","),
        }
    }
}
