use smol_str::SmolStr;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Clone)]
pub enum RegistryError {
    #[error("The name must not be empty.")]
    BlankName,
    #[error("The function \"{0}\" cannot be overwritten.")]
    FunctionNotOverwritable(SmolStr),
    #[error("The constant \"{0}\" cannot be overwritten.")]
    ConstantNotOverwritable(SmolStr),
    #[error("The function \"{0}\" does not exist.")]
    FunctionNotFound(SmolStr),
    #[error("The constant \"{0}\" does not exist.")]
    ConstantNotFound(SmolStr),
}
