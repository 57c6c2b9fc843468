//! Compiled expression types.

use crate::eval::error::EvalError;
use crate::executor::Variables;
use crate::number::Number;
use crate::registry::{ConstantRegistry, FunctionRegistry};

/// Everything a compiled closure may read while it runs.
pub struct Context<'a> {
    pub variables: &'a Variables,
    pub functions: &'a FunctionRegistry,
    pub constants: &'a ConstantRegistry,
}

/// A compiled node, callable any number of times and from any thread.
///
/// ```rust,ignore
/// let compiled: CompiledExpr = Box::new(|_ctx| Ok(Number::from(42)));
/// assert_eq!(compiled(&ctx)?, Number::from(42));
/// ```
pub type CompiledExpr = Box<dyn Fn(&Context<'_>) -> Result<Number, EvalError> + Send + Sync>;
