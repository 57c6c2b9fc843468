use miette::{Diagnostic, SourceOffset, SourceSpan};

use crate::{ast::error::ParseError, eval::error::EvalError, lexer::error::LexerError, range::Range};

pub mod argument;

pub use argument::ArgumentError;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum InnerError {
    #[error(transparent)]
    Lexer(#[from] LexerError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Eval(#[from] EvalError),
    #[error(transparent)]
    InvalidArgument(#[from] ArgumentError),
}

impl InnerError {
    fn range(&self) -> Option<Range> {
        match self {
            InnerError::Lexer(err) => {
                let start = err.position();
                Some(Range {
                    start,
                    end: crate::range::Position::new(start.line, start.column + 1),
                })
            }
            InnerError::Parse(err) => err.range(),
            InnerError::Eval(_) | InnerError::InvalidArgument(_) => None,
        }
    }
}

/// Represents a high-level error with diagnostic information for the user.
#[derive(PartialEq, Debug, thiserror::Error)]
#[error("{cause}")]
pub struct Error {
    /// The underlying cause of the error.
    pub cause: InnerError,
    /// The formula the error refers to.
    pub source_code: String,
    /// The location in the formula for diagnostics.
    pub location: SourceSpan,
}

impl Error {
    pub fn from_error(source_code: impl Into<String>, cause: impl Into<InnerError>) -> Self {
        let source_code = source_code.into();
        let cause = cause.into();

        let location = match cause.range() {
            Some(range) => {
                // Columns count characters, spans count bytes.
                let line = range.start.line as usize;
                let start = SourceOffset::from_location(&source_code, line, range.start.column);
                let end = SourceOffset::from_location(&source_code, line, range.start.column + range.width());
                SourceSpan::new(start, end.offset().saturating_sub(start.offset()))
            }
            None => SourceSpan::new(SourceOffset::from(0), source_code.len()),
        };

        Self {
            cause,
            source_code,
            location,
        }
    }

    /// Tokenizing or parsing the formula failed.
    pub fn is_parse_error(&self) -> bool {
        matches!(self.cause, InnerError::Lexer(_) | InnerError::Parse(_))
    }

    pub fn is_variable_not_defined(&self) -> bool {
        matches!(self.cause, InnerError::Eval(EvalError::VariableNotDefined(_)))
    }

    pub fn is_invalid_argument(&self) -> bool {
        matches!(self.cause, InnerError::InvalidArgument(_))
    }
}

impl Diagnostic for Error {
    fn code<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        let c = match &self.cause {
            InnerError::Lexer(LexerError::UnexpectedCharacter(..)) => "LexerError::UnexpectedCharacter",
            InnerError::Lexer(LexerError::InvalidNumber(..)) => "LexerError::InvalidNumber",
            InnerError::Parse(ParseError::UnmatchedRightBracket(_)) => "ParseError::UnmatchedRightBracket",
            InnerError::Parse(ParseError::UnmatchedLeftBracket(_)) => "ParseError::UnmatchedLeftBracket",
            InnerError::Parse(ParseError::OperatorArgumentMismatch(..)) => "ParseError::OperatorArgumentMismatch",
            InnerError::Parse(ParseError::FunctionArgumentMismatch(..)) => "ParseError::FunctionArgumentMismatch",
            InnerError::Parse(ParseError::UnknownFunction(..)) => "ParseError::UnknownFunction",
            InnerError::Parse(ParseError::UnexpectedIntegerConstant(_)) => "ParseError::UnexpectedIntegerConstant",
            InnerError::Parse(ParseError::UnexpectedFloatingPointConstant(_)) => {
                "ParseError::UnexpectedFloatingPointConstant"
            }
            InnerError::Parse(ParseError::InvalidSyntax) => "ParseError::InvalidSyntax",
            InnerError::Parse(ParseError::EmptyFormula) => "ParseError::EmptyFormula",
            InnerError::Parse(ParseError::MisplacedArgumentSeparator(_)) => "ParseError::MisplacedArgumentSeparator",
            InnerError::Eval(EvalError::VariableNotDefined(_)) => "EvalError::VariableNotDefined",
            InnerError::Eval(EvalError::FunctionNotDefined(_)) => "EvalError::FunctionNotDefined",
            InnerError::Eval(EvalError::ZeroDivision) => "EvalError::ZeroDivision",
            InnerError::Eval(EvalError::Overflow) => "EvalError::Overflow",
            InnerError::Eval(EvalError::NonFiniteResult(_)) => "EvalError::NonFiniteResult",
            InnerError::Eval(EvalError::ArityMismatch { .. }) => "EvalError::ArityMismatch",
            InnerError::Eval(EvalError::EmptyArguments(_)) => "EvalError::EmptyArguments",
            InnerError::InvalidArgument(_) => "InvalidArgument",
        };

        Some(Box::new(c))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        let msg = match &self.cause {
            InnerError::Lexer(_) => Some("Check for characters that are not part of a formula.".to_string()),
            InnerError::Parse(ParseError::UnmatchedRightBracket(_) | ParseError::UnmatchedLeftBracket(_)) => {
                Some("Make sure every `(` has a matching `)`.".to_string())
            }
            InnerError::Parse(ParseError::FunctionArgumentMismatch(name, _)) => {
                Some(format!("Check the number of arguments passed to `{name}`."))
            }
            InnerError::Parse(ParseError::UnknownFunction(name, _)) => {
                Some(format!("Register `{name}` on the engine before using it."))
            }
            InnerError::Parse(
                ParseError::UnexpectedIntegerConstant(_) | ParseError::UnexpectedFloatingPointConstant(_),
            ) => Some("Two operands are not joined by an operator.".to_string()),
            InnerError::Eval(EvalError::VariableNotDefined(name)) => {
                Some(format!("Provide a value for `{name}` when evaluating the formula."))
            }
            InnerError::Eval(EvalError::ZeroDivision) => Some("Check the divisor for zero values.".to_string()),
            _ => None,
        };

        msg.map(|m| Box::new(m) as Box<dyn std::fmt::Display>)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = miette::LabeledSpan> + '_>> {
        Some(Box::new(std::iter::once(miette::LabeledSpan::new_with_span(
            Some(format!("{}", self.cause)),
            self.location,
        ))))
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        Some(&self.source_code)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::lexer::token::Operator;
    use crate::range::Position;
    use rstest::rstest;

    #[rstest]
    #[case::lexer(
        "1 $ 2",
        InnerError::Lexer(LexerError::UnexpectedCharacter('$', Position::new(1, 3))),
        SourceSpan::new(2.into(), 1)
    )]
    #[case::parse(
        "1 + 2)",
        InnerError::Parse(ParseError::UnmatchedRightBracket(Range { start: Position::new(1, 6), end: Position::new(1, 7) })),
        SourceSpan::new(5.into(), 1)
    )]
    #[case::function(
        "x + foo(1)",
        InnerError::Parse(ParseError::FunctionArgumentMismatch("foo".into(), Range { start: Position::new(1, 5), end: Position::new(1, 8) })),
        SourceSpan::new(4.into(), 3)
    )]
    #[case::multibyte_operator(
        "1 ≤",
        InnerError::Parse(ParseError::OperatorArgumentMismatch(Operator::LessOrEqualThan, Range { start: Position::new(1, 3), end: Position::new(1, 4) })),
        SourceSpan::new(2.into(), 3)
    )]
    #[case::multibyte_character(
        "ä + 1 € 2",
        InnerError::Lexer(LexerError::UnexpectedCharacter('€', Position::new(1, 7))),
        SourceSpan::new(7.into(), 3)
    )]
    #[case::eval(
        "a + 1",
        InnerError::Eval(EvalError::VariableNotDefined("a".into())),
        SourceSpan::new(0.into(), 5)
    )]
    fn test_from_error_location(#[case] source: &str, #[case] cause: InnerError, #[case] expected: SourceSpan) {
        assert_eq!(Error::from_error(source, cause).location, expected);
    }

    #[test]
    fn test_predicates() {
        let parse = Error::from_error("1 +", ParseError::OperatorArgumentMismatch(Operator::Add, Range::default()));
        assert!(parse.is_parse_error());
        assert!(!parse.is_invalid_argument());

        let lexer = Error::from_error("#", LexerError::UnexpectedCharacter('#', Position::default()));
        assert!(lexer.is_parse_error());

        let undefined = Error::from_error("a", EvalError::VariableNotDefined("a".into()));
        assert!(undefined.is_variable_not_defined());

        let invalid = Error::from_error("", ArgumentError::BlankFormula);
        assert!(invalid.is_invalid_argument());
    }

    #[test]
    fn test_diagnostic() {
        let error = Error::from_error("foo(1)", ParseError::UnknownFunction("foo".into(), Range::default()));
        assert_eq!(error.code().unwrap().to_string(), "ParseError::UnknownFunction");
        assert_eq!(error.help().unwrap().to_string(), "Register `foo` on the engine before using it.");
        assert_eq!(error.to_string(), "The function \"foo\" is not defined.");
        assert_eq!(error.labels().unwrap().count(), 1);
    }
}
