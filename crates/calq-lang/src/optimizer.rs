use std::sync::Arc;

use tracing::trace;

use crate::ast::{BinaryOp, Expr, Operation};
use crate::eval::Interpreter;
use crate::eval::error::EvalError;
use crate::executor::Variables;
use crate::number::Number;
use crate::registry::FunctionRegistry;

/// Constant folding over operation trees.
///
/// Any subtree that is idempotent and independent of variables is evaluated once with the
/// [`Interpreter`] and replaced by its value. The walk only descends into arithmetic
/// (`+ - * / ^`) and function nodes. Comparison and logical nodes that depend on a variable keep
/// their operands as written.
#[derive(Debug)]
pub struct Optimizer<'a> {
    interpreter: Interpreter,
    functions: &'a FunctionRegistry,
}

impl<'a> Optimizer<'a> {
    pub fn new(functions: &'a FunctionRegistry, case_sensitive: bool) -> Self {
        Self {
            interpreter: Interpreter::new(case_sensitive),
            functions,
        }
    }

    /// Returns the folded tree. Folding a subtree that fails to evaluate, such as `1 / 0`,
    /// reports the evaluation error.
    pub fn optimize(&self, operation: &Arc<Operation>) -> Result<Arc<Operation>, EvalError> {
        if !operation.is_constant() && !operation.depends_on_variables() && operation.is_idempotent() {
            let value = self
                .interpreter
                .evaluate(operation, self.functions, &Variables::default())?;
            trace!(operation = %operation, value = %value, "folded constant subtree");
            return Ok(Arc::new(Operation::floating_point(value)));
        }

        match operation.expr() {
            Expr::Binary(BinaryOp::Multiplication, left, right) => {
                let left = self.optimize(left)?;
                let right = self.optimize(right)?;

                if is_zero(&left) || is_zero(&right) {
                    trace!(operation = %operation, "multiplication by zero");
                    return Ok(Arc::new(Operation::floating_point(Number::ZERO)));
                }

                Ok(Arc::new(Operation::binary(BinaryOp::Multiplication, left, right)))
            }
            Expr::Binary(
                op @ (BinaryOp::Addition | BinaryOp::Subtraction | BinaryOp::Division | BinaryOp::Exponentiation),
                left,
                right,
            ) => Ok(Arc::new(Operation::binary(
                *op,
                self.optimize(left)?,
                self.optimize(right)?,
            ))),
            Expr::Function(name, args) => {
                let args = args.iter().map(|arg| self.optimize(arg)).collect::<Result<_, _>>()?;
                Ok(Arc::new(Operation::function(name.clone(), args, operation.is_idempotent())))
            }
            _ => Ok(Arc::clone(operation)),
        }
    }
}

fn is_zero(operation: &Operation) -> bool {
    matches!(operation.expr(), Expr::FloatingPointConstant(n) if n.is_zero())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::AstBuilder;
    use crate::builtin;
    use crate::lexer::{Lexer, Options};
    use crate::registry::ConstantRegistry;
    use rstest::{fixture, rstest};

    #[fixture]
    fn functions() -> FunctionRegistry {
        let functions = FunctionRegistry::new(false);
        builtin::register_functions(&functions);
        functions
    }

    fn parse(functions: &FunctionRegistry, input: &str) -> Arc<Operation> {
        let tokens = Lexer::new(Options::default()).tokenize(input).unwrap();
        AstBuilder::new(functions, &ConstantRegistry::new(false), false)
            .build(&tokens)
            .unwrap()
    }

    fn optimize(functions: &FunctionRegistry, input: &str) -> Result<Arc<Operation>, EvalError> {
        Optimizer::new(functions, false).optimize(&parse(functions, input))
    }

    #[rstest]
    #[case::whole_tree("1 + 2 * 3", "7")]
    #[case::left_operand("(2 + 3) * x", "(5 * x)")]
    #[case::function_arguments("max(x, 2 ^ 3, sin(0))", "max(x, 8, 0)")]
    #[case::function_call("sqrt(16) + x", "(4 + x)")]
    #[case::zero_times_variable("2 * 0 * x", "0")]
    #[case::variable_times_zero("x * (1 - 1)", "0")]
    #[case::integer_zero_literal_is_kept("x * 0", "(x * 0)")]
    #[case::comparison_operands_not_folded("x < 1 + 1", "(x < (1 + 1))")]
    #[case::logical_operands_not_folded("x && 2 * 3", "(x && (2 * 3))")]
    #[case::modulo_operands_not_folded("x % (2 + 2)", "(x % (2 + 2))")]
    #[case::unary_minus_not_descended("-(x + (1 + 1))", "-(x + (1 + 1))")]
    #[case::non_idempotent_kept("random() * (1 + 1)", "(random() * 2)")]
    #[case::constant_literal("3", "3")]
    fn test_optimize(functions: FunctionRegistry, #[case] input: &str, #[case] expected: &str) {
        assert_eq!(optimize(&functions, input).unwrap().to_string(), expected);
    }

    #[rstest]
    fn test_folded_nodes_are_floating_point_constants(functions: FunctionRegistry) {
        let op = optimize(&functions, "2 + 3").unwrap();
        assert_eq!(op.expr(), &Expr::FloatingPointConstant(Number::from(5)));
    }

    #[rstest]
    #[case("1 + 2 * 3")]
    #[case("(2 + 3) * x")]
    #[case("2 * 0 * x")]
    #[case("max(x, 2 ^ 3) - sin(y * (1 + 1))")]
    #[case("x < 1 + 1")]
    #[case("random() * (1 + 1)")]
    fn test_optimize_is_a_fixed_point(functions: FunctionRegistry, #[case] input: &str) {
        let optimizer = Optimizer::new(&functions, false);
        let once = optimizer.optimize(&parse(&functions, input)).unwrap();
        let twice = optimizer.optimize(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[rstest]
    fn test_fold_error(functions: FunctionRegistry) {
        assert_eq!(optimize(&functions, "x + 1 / 0"), Err(EvalError::ZeroDivision));
    }
}
