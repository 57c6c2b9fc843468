use smol_str::SmolStr;

pub mod constant;
pub mod error;
pub mod function;
pub mod native;

pub use constant::{ConstantInfo, ConstantRegistry};
pub use error::RegistryError;
pub use function::{Arity, Callable, FunctionInfo, FunctionRegistry};
pub use native::NativeFunction;

/// ASCII lowercase fold applied to every name when lookups are case-insensitive.
pub fn fold_case(name: &str) -> SmolStr {
    if name.bytes().any(|b| b.is_ascii_uppercase()) {
        SmolStr::new(name.to_ascii_lowercase())
    } else {
        SmolStr::new(name)
    }
}

pub(crate) fn normalize_name(name: &str, case_sensitive: bool) -> Result<SmolStr, RegistryError> {
    if name.trim().is_empty() {
        return Err(RegistryError::BlankName);
    }

    Ok(if case_sensitive { SmolStr::new(name) } else { fold_case(name) })
}
