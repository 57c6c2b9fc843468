use smol_str::SmolStr;
use thiserror::Error;

use crate::registry::RegistryError;

/// Rejected input to an engine operation, as opposed to a problem inside the formula text.
#[derive(Error, Debug, PartialEq, Clone)]
pub enum ArgumentError {
    #[error("The parameter text cannot be empty.")]
    BlankFormula,
    #[error("The name \"{0}\" is a reserved constant name and cannot be used as a variable.")]
    ReservedConstantName(SmolStr),
    #[error("The name \"{0}\" is a function name and cannot be used as a variable.")]
    FunctionNameAsVariable(SmolStr),
    #[error("The name \"{0}\" is bound more than once.")]
    DuplicateName(SmolStr),
    #[error(transparent)]
    Registry(#[from] RegistryError),
}
