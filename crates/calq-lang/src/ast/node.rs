use std::fmt::{self, Display, Formatter};
use std::sync::Arc;

use itertools::Itertools;
use smallvec::SmallVec;

use crate::number::Number;

use super::Name;

pub type Args = SmallVec<[Arc<Operation>; 4]>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Integer,
    FloatingPoint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Addition,
    Subtraction,
    Multiplication,
    Division,
    Modulo,
    Exponentiation,
    And,
    Or,
    LessThan,
    LessOrEqualThan,
    GreaterThan,
    GreaterOrEqualThan,
    Equal,
    NotEqual,
}

impl BinaryOp {
    /// `/`, `%` and `^` always produce floating point results. Everything else stays integral when
    /// both operands are.
    pub fn result_type(&self, left: DataType, right: DataType) -> DataType {
        match self {
            BinaryOp::Division | BinaryOp::Modulo | BinaryOp::Exponentiation => DataType::FloatingPoint,
            _ if left == DataType::Integer && right == DataType::Integer => DataType::Integer,
            _ => DataType::FloatingPoint,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Addition => "+",
            BinaryOp::Subtraction => "-",
            BinaryOp::Multiplication => "*",
            BinaryOp::Division => "/",
            BinaryOp::Modulo => "%",
            BinaryOp::Exponentiation => "^",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::LessThan => "<",
            BinaryOp::LessOrEqualThan => "<=",
            BinaryOp::GreaterThan => ">",
            BinaryOp::GreaterOrEqualThan => ">=",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    IntegerConstant(i64),
    FloatingPointConstant(Number),
    Variable(Name),
    Binary(BinaryOp, Arc<Operation>, Arc<Operation>),
    UnaryMinus(Arc<Operation>),
    Function(Name, Args),
}

/// A node of the formula tree.
///
/// The derived attributes are computed once by the constructors from the children, so
/// `depends_on_variables` is always the OR and `is_idempotent` the AND of the children's flags.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    expr: Expr,
    data_type: DataType,
    depends_on_variables: bool,
    is_idempotent: bool,
}

impl Operation {
    pub fn integer(value: i64) -> Self {
        Self {
            expr: Expr::IntegerConstant(value),
            data_type: DataType::Integer,
            depends_on_variables: false,
            is_idempotent: true,
        }
    }

    pub fn floating_point(value: Number) -> Self {
        Self {
            expr: Expr::FloatingPointConstant(value),
            data_type: DataType::FloatingPoint,
            depends_on_variables: false,
            is_idempotent: true,
        }
    }

    pub fn variable(name: impl Into<Name>) -> Self {
        Self {
            expr: Expr::Variable(name.into()),
            data_type: DataType::FloatingPoint,
            depends_on_variables: true,
            is_idempotent: true,
        }
    }

    pub fn binary(op: BinaryOp, left: Arc<Operation>, right: Arc<Operation>) -> Self {
        Self {
            data_type: op.result_type(left.data_type, right.data_type),
            depends_on_variables: left.depends_on_variables || right.depends_on_variables,
            is_idempotent: left.is_idempotent && right.is_idempotent,
            expr: Expr::Binary(op, left, right),
        }
    }

    pub fn unary_minus(argument: Arc<Operation>) -> Self {
        Self {
            data_type: argument.data_type,
            depends_on_variables: argument.depends_on_variables,
            is_idempotent: argument.is_idempotent,
            expr: Expr::UnaryMinus(argument),
        }
    }

    /// `is_idempotent` is the registered idempotency of the function itself.
    pub fn function(name: impl Into<Name>, arguments: Args, is_idempotent: bool) -> Self {
        Self {
            data_type: DataType::FloatingPoint,
            depends_on_variables: arguments.iter().any(|arg| arg.depends_on_variables),
            is_idempotent: is_idempotent && arguments.iter().all(|arg| arg.is_idempotent),
            expr: Expr::Function(name.into(), arguments),
        }
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn depends_on_variables(&self) -> bool {
        self.depends_on_variables
    }

    pub fn is_idempotent(&self) -> bool {
        self.is_idempotent
    }

    /// Returns `true` for integer and floating point literals.
    pub fn is_constant(&self) -> bool {
        matches!(
            self.expr,
            Expr::IntegerConstant(_) | Expr::FloatingPointConstant(_)
        )
    }
}

impl Display for Operation {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match &self.expr {
            Expr::IntegerConstant(n) => write!(f, "{}", n),
            Expr::FloatingPointConstant(n) => write!(f, "{}", n),
            Expr::Variable(name) => write!(f, "{}", name),
            Expr::Binary(op, left, right) => write!(f, "({} {} {})", left, op.symbol(), right),
            Expr::UnaryMinus(arg) => write!(f, "-{}", arg),
            Expr::Function(name, args) => write!(f, "{}({})", name, args.iter().join(", ")),
        }
    }
}
