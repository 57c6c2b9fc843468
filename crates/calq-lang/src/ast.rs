use smol_str::SmolStr;

pub mod builder;
pub mod error;
pub mod node;

pub type Name = SmolStr;

pub use builder::AstBuilder;
pub use node::{Args, BinaryOp, DataType, Expr, Operation};
