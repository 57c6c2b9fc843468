use smol_str::SmolStr;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Clone)]
pub enum EvalError {
    #[error("The variable \"{0}\" used is not defined.")]
    VariableNotDefined(SmolStr),
    #[error("The function \"{0}\" is not defined.")]
    FunctionNotDefined(SmolStr),
    #[error("Attempted to divide by zero.")]
    ZeroDivision,
    #[error("The result is outside the representable range.")]
    Overflow,
    #[error("\"{0}\" did not produce a finite number.")]
    NonFiniteResult(SmolStr),
    #[error("Expected {expected} arguments but got {got}.")]
    ArityMismatch { expected: usize, got: usize },
    #[error("The function \"{0}\" requires at least one argument.")]
    EmptyArguments(SmolStr),
}
