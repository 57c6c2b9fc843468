//! Closure-based executor.
//!
//! Every node of an operation tree is turned into a boxed closure once, when the formula is
//! built. Evaluating the formula afterwards only calls closures, the tree itself is no longer
//! inspected.
//!
//! Two behaviours differ from the [`Interpreter`](crate::Interpreter):
//! - a variable missing from the bindings is looked up in the constant registry before failing,
//! - overwritable functions are fetched from the function registry on every call, so a
//!   replacement registered after the build is picked up. Other functions are bound at build
//!   time.
//!
//! ## Example
//!
//! ```rust
//! use calq_lang::{Engine, ExecutionMode, Number, Options, Variables};
//!
//! let engine = Engine::new(Options {
//!     execution_mode: ExecutionMode::Compiled,
//!     ..Options::default()
//! });
//! let formula = engine.build("x * 2 + 1", None).unwrap();
//! let variables: Variables = [("x".into(), Number::from(4))].into_iter().collect();
//! assert_eq!(formula(&variables).unwrap(), Number::from(9));
//! ```

mod compile;
pub(crate) mod compiled;
#[cfg(test)]
mod test_compiler;

pub use compile::Compiler;
