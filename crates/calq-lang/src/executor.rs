use std::borrow::Cow;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::ast::Operation;
use crate::eval::error::EvalError;
use crate::number::Number;
use crate::registry::{ConstantRegistry, FunctionRegistry, fold_case};

pub type Variables = FxHashMap<SmolStr, Number>;

/// A ready-to-call evaluator for one formula.
pub type Formula = Arc<dyn Fn(&Variables) -> Result<Number, EvalError> + Send + Sync>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Walk the tree on every call.
    Interpreted,
    /// Turn the tree into nested closures once.
    #[default]
    Compiled,
}

/// Strategy turning an operation tree into numbers.
pub trait Executor: Send + Sync {
    /// Evaluates `operation` once.
    fn execute(
        &self,
        operation: &Operation,
        functions: &FunctionRegistry,
        constants: &ConstantRegistry,
        variables: &Variables,
    ) -> Result<Number, EvalError>;

    /// Prepares an evaluator that can be called any number of times, from any thread.
    fn build_formula(
        &self,
        operation: Arc<Operation>,
        functions: Arc<FunctionRegistry>,
        constants: Arc<ConstantRegistry>,
    ) -> Result<Formula, EvalError>;
}

/// Lowercases variable names, borrowing when nothing needs folding.
pub fn fold_variables(variables: &Variables, case_sensitive: bool) -> Cow<'_, Variables> {
    if case_sensitive
        || !variables
            .keys()
            .any(|name| name.bytes().any(|b| b.is_ascii_uppercase()))
    {
        return Cow::Borrowed(variables);
    }

    Cow::Owned(
        variables
            .iter()
            .map(|(name, value)| (fold_case(name), *value))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn vars(names: &[&str]) -> Variables {
        names
            .iter()
            .enumerate()
            .map(|(i, name)| (SmolStr::new(name), Number::from(i)))
            .collect()
    }

    #[rstest]
    #[case::already_lowercase(vars(&["a", "b"]), false, true)]
    #[case::case_sensitive(vars(&["A"]), true, true)]
    #[case::needs_folding(vars(&["A", "b"]), false, false)]
    fn test_fold_variables_borrows(#[case] variables: Variables, #[case] case_sensitive: bool, #[case] borrowed: bool) {
        let folded = fold_variables(&variables, case_sensitive);
        assert_eq!(matches!(folded, Cow::Borrowed(_)), borrowed);
    }

    #[test]
    fn test_fold_variables() {
        let variables = vars(&["Alpha", "beta"]);
        let folded = fold_variables(&variables, false);
        assert_eq!(folded.get("alpha"), Some(&Number::from(0)));
        assert_eq!(folded.get("beta"), Some(&Number::from(1)));
        assert_eq!(folded.get("Alpha"), None);
    }

    #[test]
    fn test_execution_mode_serde() {
        assert_eq!(serde_json::to_string(&ExecutionMode::Interpreted).unwrap(), "\"interpreted\"");
        assert_eq!(
            serde_json::from_str::<ExecutionMode>("\"compiled\"").unwrap(),
            ExecutionMode::Compiled
        );
    }
}
