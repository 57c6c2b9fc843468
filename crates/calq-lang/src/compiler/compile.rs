//! Transformation of operation trees into compiled closures.

use std::sync::Arc;

use smallvec::SmallVec;

use super::compiled::{CompiledExpr, Context};
use crate::ast::{Expr, Operation};
use crate::eval::binary_fn;
use crate::eval::error::EvalError;
use crate::executor::{Executor, Formula, Variables, fold_variables};
use crate::number::Number;
use crate::registry::{ConstantRegistry, FunctionRegistry};

#[derive(Debug, Clone, Copy, Default)]
pub struct Compiler {
    case_sensitive: bool,
}

impl Compiler {
    pub fn new(case_sensitive: bool) -> Self {
        Self { case_sensitive }
    }

    /// Compiles a single node and, recursively, its children.
    ///
    /// Functions must already be registered: an unknown name fails here rather than at
    /// evaluation time.
    pub fn compile_node(&self, operation: &Operation, functions: &FunctionRegistry) -> Result<CompiledExpr, EvalError> {
        match operation.expr() {
            Expr::IntegerConstant(n) => {
                let value = Number::from(*n);
                Ok(Box::new(move |_ctx| Ok(value)))
            }
            Expr::FloatingPointConstant(n) => {
                let value = *n;
                Ok(Box::new(move |_ctx| Ok(value)))
            }
            Expr::Variable(name) => {
                let name = name.clone();
                Ok(Box::new(move |ctx: &Context<'_>| {
                    if let Some(value) = ctx.variables.get(&name) {
                        return Ok(*value);
                    }

                    ctx.constants
                        .constant_info(&name)
                        .map(|info| info.value)
                        .map_err(|_| EvalError::VariableNotDefined(name.clone()))
                }))
            }
            Expr::Binary(op, left, right) => {
                let apply = binary_fn(*op);
                let left = self.compile_node(left, functions)?;
                let right = self.compile_node(right, functions)?;
                Ok(Box::new(move |ctx| apply(left(ctx)?, right(ctx)?)))
            }
            Expr::UnaryMinus(argument) => {
                let argument = self.compile_node(argument, functions)?;
                Ok(Box::new(move |ctx| Ok(-argument(ctx)?)))
            }
            Expr::Function(name, args) => {
                let info = functions
                    .function_info(name)
                    .map_err(|_| EvalError::FunctionNotDefined(name.clone()))?;
                let args = args
                    .iter()
                    .map(|arg| self.compile_node(arg, functions))
                    .collect::<Result<Vec<_>, _>>()?;
                let evaluate_args = move |ctx: &Context<'_>| {
                    args.iter()
                        .map(|arg| arg(ctx))
                        .collect::<Result<SmallVec<[Number; 8]>, _>>()
                };

                if info.is_overwritable {
                    let name = name.clone();
                    Ok(Box::new(move |ctx: &Context<'_>| {
                        let args = evaluate_args(ctx)?;
                        ctx.functions
                            .function_info(&name)
                            .map_err(|_| EvalError::FunctionNotDefined(name.clone()))?
                            .call(&args)
                    }))
                } else {
                    let function = Arc::clone(&info.function);
                    Ok(Box::new(move |ctx: &Context<'_>| function(&evaluate_args(ctx)?)))
                }
            }
        }
    }
}

impl Executor for Compiler {
    fn execute(
        &self,
        operation: &Operation,
        functions: &FunctionRegistry,
        constants: &ConstantRegistry,
        variables: &Variables,
    ) -> Result<Number, EvalError> {
        let compiled = self.compile_node(operation, functions)?;
        let variables = fold_variables(variables, self.case_sensitive);

        compiled(&Context {
            variables: &variables,
            functions,
            constants,
        })
    }

    fn build_formula(
        &self,
        operation: Arc<Operation>,
        functions: Arc<FunctionRegistry>,
        constants: Arc<ConstantRegistry>,
    ) -> Result<Formula, EvalError> {
        let compiled = self.compile_node(&operation, &functions)?;
        let case_sensitive = self.case_sensitive;

        Ok(Arc::new(move |variables: &Variables| {
            let variables = fold_variables(variables, case_sensitive);
            compiled(&Context {
                variables: &variables,
                functions: &functions,
                constants: &constants,
            })
        }))
    }
}
