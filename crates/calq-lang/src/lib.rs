//! `calq-lang` parses, optimizes and evaluates numeric formulas such as `max(a, 2) * sin(x) + pi`.
//!
//! Formulas are exact decimals. Built formulas are cached by the [`Engine`], so evaluating the same
//! text again only runs the prepared evaluator.
//!
//! ## Examples
//!
//! ```rust
//! use calq_lang::{Engine, Number, Variables};
//!
//! let engine = Engine::default();
//!
//! // Evaluate once
//! let variables: Variables = [("a".into(), Number::from(3))].into_iter().collect();
//! assert_eq!(engine.calculate("a * 2 + 1", &variables).unwrap(), Number::from(7));
//!
//! // Build once with a bound constant, evaluate many times
//! let constants: Variables = [("k".into(), Number::from(10))].into_iter().collect();
//! let formula = engine.build("x + k", Some(&constants)).unwrap();
//! for x in 0..3 {
//!     let variables: Variables = [("x".into(), Number::from(x))].into_iter().collect();
//!     assert_eq!(formula(&variables).unwrap(), Number::from(x + 10));
//! }
//!
//! // Register a function of your own
//! engine.add_function("double", |n: Number| n * Number::from(2)).unwrap();
//! assert_eq!(engine.calculate("double(21)", &Variables::default()).unwrap(), Number::from(42));
//! ```
mod ast;
mod builtin;
mod cache;
mod compiler;
mod engine;
mod error;
mod eval;
mod executor;
mod lexer;
mod number;
mod optimizer;
mod range;
mod registry;

use std::sync::Arc;

pub use ast::error::ParseError;
pub use ast::{Args, AstBuilder, BinaryOp, DataType, Expr, Name, Operation};
pub use cache::FormulaCache;
pub use compiler::Compiler;
pub use engine::{Engine, Options};
pub use error::{ArgumentError, Error, InnerError};
pub use eval::Interpreter;
pub use eval::error::EvalError;
pub use executor::{ExecutionMode, Executor, Formula, Variables};
pub use lexer::Lexer;
pub use lexer::Options as LexerOptions;
pub use lexer::error::LexerError;
pub use lexer::token::{Operator, Token, TokenKind};
pub use number::Number;
pub use optimizer::Optimizer;
pub use range::{Position, Range};
pub use registry::{
    Arity, Callable, ConstantInfo, ConstantRegistry, FunctionInfo, FunctionRegistry, NativeFunction, RegistryError,
};

pub type CalqResult = Result<Number, Error>;

/// Registers the built-in functions and constants on fresh registries.
pub fn default_registries(case_sensitive: bool) -> (FunctionRegistry, ConstantRegistry) {
    let functions = FunctionRegistry::new(case_sensitive);
    let constants = ConstantRegistry::new(case_sensitive);
    builtin::register_functions(&functions);
    builtin::register_constants(&constants);
    (functions, constants)
}

#[allow(clippy::result_large_err)]
pub fn tokenize(code: &str, options: LexerOptions) -> Result<Vec<Token>, Error> {
    Lexer::new(options)
        .tokenize(code)
        .map_err(|e| Error::from_error(code, InnerError::Lexer(e)))
}

/// Parses `code` into an operation tree without optimizing it.
#[allow(clippy::result_large_err)]
pub fn parse(code: &str, functions: &FunctionRegistry, case_sensitive: bool) -> Result<Arc<Operation>, Error> {
    let tokens = tokenize(code, LexerOptions::default())?;
    AstBuilder::new(functions, &ConstantRegistry::new(case_sensitive), case_sensitive)
        .build(&tokens)
        .map_err(|e| Error::from_error(code, InnerError::Parse(e)))
}
