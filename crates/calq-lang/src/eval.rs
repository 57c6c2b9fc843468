use std::sync::Arc;

use smallvec::SmallVec;
use smol_str::SmolStr;

use crate::ast::{BinaryOp, Expr, Operation};
use crate::executor::{Executor, Formula, Variables, fold_variables};
use crate::number::Number;
use crate::registry::{ConstantRegistry, FunctionRegistry};

pub mod error;

use error::EvalError;

pub(crate) type BinaryFn = fn(Number, Number) -> Result<Number, EvalError>;

/// Arithmetic, logical and comparison semantics shared by every executor.
///
/// Logical operators see both operands already evaluated, there is no short-circuiting.
pub(crate) fn binary_fn(op: BinaryOp) -> BinaryFn {
    match op {
        BinaryOp::Addition => |a, b| a.checked_add(b).ok_or(EvalError::Overflow),
        BinaryOp::Subtraction => |a, b| a.checked_sub(b).ok_or(EvalError::Overflow),
        BinaryOp::Multiplication => |a, b| a.checked_mul(b).ok_or(EvalError::Overflow),
        BinaryOp::Division => |a, b| {
            if b.is_zero() {
                return Err(EvalError::ZeroDivision);
            }
            a.checked_div(b).ok_or(EvalError::Overflow)
        },
        BinaryOp::Modulo => |a, b| {
            if b.is_zero() {
                return Err(EvalError::ZeroDivision);
            }
            a.checked_rem(b).ok_or(EvalError::Overflow)
        },
        BinaryOp::Exponentiation => |a, b| {
            let result = a.to_f64().powf(b.to_f64());
            if !result.is_finite() {
                return Err(EvalError::NonFiniteResult(SmolStr::new_static("^")));
            }
            Number::from_f64(result).ok_or(EvalError::Overflow)
        },
        BinaryOp::And => |a, b| Ok(Number::from_bool(a.is_truthy() && b.is_truthy())),
        BinaryOp::Or => |a, b| Ok(Number::from_bool(a.is_truthy() || b.is_truthy())),
        BinaryOp::LessThan => |a, b| Ok(Number::from_bool(a < b)),
        BinaryOp::LessOrEqualThan => |a, b| Ok(Number::from_bool(a <= b)),
        BinaryOp::GreaterThan => |a, b| Ok(Number::from_bool(a > b)),
        BinaryOp::GreaterOrEqualThan => |a, b| Ok(Number::from_bool(a >= b)),
        BinaryOp::Equal => |a, b| Ok(Number::from_bool(a == b)),
        BinaryOp::NotEqual => |a, b| Ok(Number::from_bool(a != b)),
    }
}

/// Tree-walking executor.
///
/// Variables resolve strictly against the bindings passed in. Constants the caller wants
/// visible have to be merged into those bindings first.
#[derive(Debug, Clone, Copy, Default)]
pub struct Interpreter {
    case_sensitive: bool,
}

impl Interpreter {
    pub fn new(case_sensitive: bool) -> Self {
        Self { case_sensitive }
    }

    pub fn evaluate(
        &self,
        operation: &Operation,
        functions: &FunctionRegistry,
        variables: &Variables,
    ) -> Result<Number, EvalError> {
        match operation.expr() {
            Expr::IntegerConstant(n) => Ok(Number::from(*n)),
            Expr::FloatingPointConstant(n) => Ok(*n),
            Expr::Variable(name) => variables
                .get(name)
                .copied()
                .ok_or_else(|| EvalError::VariableNotDefined(name.clone())),
            Expr::Binary(op, left, right) => {
                let left = self.evaluate(left, functions, variables)?;
                let right = self.evaluate(right, functions, variables)?;
                binary_fn(*op)(left, right)
            }
            Expr::UnaryMinus(argument) => Ok(-self.evaluate(argument, functions, variables)?),
            Expr::Function(name, args) => {
                let info = functions
                    .function_info(name)
                    .map_err(|_| EvalError::FunctionNotDefined(name.clone()))?;
                let args = args
                    .iter()
                    .map(|arg| self.evaluate(arg, functions, variables))
                    .collect::<Result<SmallVec<[Number; 8]>, _>>()?;

                info.call(&args)
            }
        }
    }
}

impl Executor for Interpreter {
    fn execute(
        &self,
        operation: &Operation,
        functions: &FunctionRegistry,
        _constants: &ConstantRegistry,
        variables: &Variables,
    ) -> Result<Number, EvalError> {
        self.evaluate(operation, functions, &fold_variables(variables, self.case_sensitive))
    }

    fn build_formula(
        &self,
        operation: Arc<Operation>,
        functions: Arc<FunctionRegistry>,
        _constants: Arc<ConstantRegistry>,
    ) -> Result<Formula, EvalError> {
        let interpreter = *self;

        Ok(Arc::new(move |variables: &Variables| {
            interpreter.evaluate(
                &operation,
                &functions,
                &fold_variables(variables, interpreter.case_sensitive),
            )
        }))
    }
}
