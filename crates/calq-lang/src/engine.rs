use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use tracing::debug_span;

use crate::ast::{AstBuilder, Operation};
use crate::builtin;
use crate::cache::{self, FormulaCache};
use crate::compiler::Compiler;
use crate::error::{ArgumentError, Error};
use crate::eval::Interpreter;
use crate::eval::error::EvalError;
use crate::executor::{ExecutionMode, Executor, Formula, Variables, fold_variables};
use crate::lexer::{self, Lexer};
use crate::number::Number;
use crate::optimizer::Optimizer;
use crate::registry::{Arity, Callable, ConstantRegistry, FunctionRegistry, NativeFunction, RegistryError, fold_case};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    pub case_sensitive: bool,
    pub cache_enabled: bool,
    pub cache_maximum_size: usize,
    pub cache_reduction_size: usize,
    pub optimizer_enabled: bool,
    pub execution_mode: ExecutionMode,
    /// Preregister the built-in function set.
    pub default_functions: bool,
    /// Preregister `e` and `pi`.
    pub default_constants: bool,
    pub decimal_separator: char,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            case_sensitive: false,
            cache_enabled: true,
            cache_maximum_size: cache::DEFAULT_MAXIMUM_SIZE,
            cache_reduction_size: cache::DEFAULT_REDUCTION_SIZE,
            optimizer_enabled: true,
            execution_mode: ExecutionMode::default(),
            default_functions: true,
            default_constants: true,
            decimal_separator: '.',
        }
    }
}

/// Entry point for evaluating formulas.
///
/// An engine owns its function and constant registries and a cache of built formulas. All
/// methods take `&self`, so one engine can be shared behind an `Arc` by many threads.
pub struct Engine {
    options: Options,
    functions: Arc<FunctionRegistry>,
    constants: Arc<ConstantRegistry>,
    executor: Arc<dyn Executor>,
    cache: FormulaCache,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("options", &self.options)
            .field("functions", &self.functions.len())
            .field("constants", &self.constants.len())
            .field("cached_formulas", &self.cache.len())
            .finish_non_exhaustive()
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(Options::default())
    }
}

impl Engine {
    pub fn new(options: Options) -> Self {
        let executor: Arc<dyn Executor> = match options.execution_mode {
            ExecutionMode::Interpreted => Arc::new(Interpreter::new(options.case_sensitive)),
            ExecutionMode::Compiled => Arc::new(Compiler::new(options.case_sensitive)),
        };

        Self::with_executor(options, executor)
    }

    /// Creates an engine that builds formulas with `executor` instead of the one selected by
    /// `options.execution_mode`.
    pub fn with_executor(options: Options, executor: Arc<dyn Executor>) -> Self {
        let functions = FunctionRegistry::new(options.case_sensitive);
        let constants = ConstantRegistry::new(options.case_sensitive);

        if options.default_functions {
            builtin::register_functions(&functions);
        }

        if options.default_constants {
            builtin::register_constants(&constants);
        }

        Self {
            cache: FormulaCache::new(options.cache_maximum_size, options.cache_reduction_size),
            functions: Arc::new(functions),
            constants: Arc::new(constants),
            executor,
            options,
        }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn function_registry(&self) -> &FunctionRegistry {
        &self.functions
    }

    pub fn constant_registry(&self) -> &ConstantRegistry {
        &self.constants
    }

    pub fn cache(&self) -> &FormulaCache {
        &self.cache
    }

    /// Evaluates `text` once against `variables`.
    ///
    /// Engine constants are visible to the formula unless a binding with the same name is
    /// supplied, which is only allowed for overwritable constants.
    #[allow(clippy::result_large_err)]
    pub fn calculate(&self, text: &str, variables: &Variables) -> Result<Number, Error> {
        if text.trim().is_empty() {
            return Err(Error::from_error(text, ArgumentError::BlankFormula));
        }

        let mut variables = fold_bindings(variables, self.options.case_sensitive)
            .map_err(|e| Error::from_error(text, e))?
            .into_owned();
        self.verify_variable_names(&variables)
            .map_err(|e| Error::from_error(text, e))?;

        for constant in self.constants.iter() {
            variables.entry(constant.name).or_insert(constant.value);
        }

        let formula = self.formula(text, text, &ConstantRegistry::new(self.options.case_sensitive))?;
        formula(&variables).map_err(|e| Error::from_error(text, e))
    }

    /// Builds a reusable evaluator for `text`.
    ///
    /// `constants` are substituted into the formula at build time. They are part of the cache
    /// key, so the same text built with different constants yields independent formulas.
    #[allow(clippy::result_large_err)]
    pub fn build(&self, text: &str, constants: Option<&Variables>) -> Result<Formula, Error> {
        if text.trim().is_empty() {
            return Err(Error::from_error(text, ArgumentError::BlankFormula));
        }

        let constants = match constants {
            Some(constants) => fold_bindings(constants, self.options.case_sensitive)
                .map_err(|e| Error::from_error(text, e))?,
            None => Cow::Owned(Variables::default()),
        };

        let bound = ConstantRegistry::new(self.options.case_sensitive);
        for (name, value) in constants.iter() {
            bound
                .register_constant(name, *value, true)
                .map_err(|e| Error::from_error(text, ArgumentError::from(e)))?;
        }

        self.formula(text, &cache_key(text, &bound), &bound)
    }

    /// Registers a fixed-arity function taking up to eight numbers. The function is idempotent
    /// and can be replaced later.
    #[allow(clippy::result_large_err)]
    pub fn add_function<Args, F>(&self, name: &str, function: F) -> Result<(), Error>
    where
        F: NativeFunction<Args>,
    {
        self.register_function(name, Arity::Fixed(F::ARITY), true, true, function.into_callable())
    }

    /// Registers a function receiving every argument of the call as one slice.
    #[allow(clippy::result_large_err)]
    pub fn add_dynamic_function<F>(&self, name: &str, function: F) -> Result<(), Error>
    where
        F: Fn(&[Number]) -> Result<Number, EvalError> + Send + Sync + 'static,
    {
        self.register_function(name, Arity::Dynamic, true, true, Arc::new(function))
    }

    #[allow(clippy::result_large_err)]
    pub fn register_function(
        &self,
        name: &str,
        arity: Arity,
        is_idempotent: bool,
        is_overwritable: bool,
        function: Callable,
    ) -> Result<(), Error> {
        self.functions
            .register_function(name, arity, is_idempotent, is_overwritable, function)
            .map_err(|e| registry_error(name, e))
    }

    /// Registers an overwritable constant.
    #[allow(clippy::result_large_err)]
    pub fn add_constant(&self, name: &str, value: impl Into<Number>) -> Result<(), Error> {
        self.register_constant(name, value.into(), true)
    }

    #[allow(clippy::result_large_err)]
    pub fn register_constant(&self, name: &str, value: Number, is_overwritable: bool) -> Result<(), Error> {
        self.constants
            .register_constant(name, value, is_overwritable)
            .map_err(|e| registry_error(name, e))
    }

    fn verify_variable_names(&self, variables: &Variables) -> Result<(), ArgumentError> {
        for name in variables.keys() {
            if self.constants.is_constant_name(name)? && !self.constants.constant_info(name)?.is_overwritable {
                return Err(ArgumentError::ReservedConstantName(name.clone()));
            }

            if self.functions.is_function_name(name)? {
                return Err(ArgumentError::FunctionNameAsVariable(name.clone()));
            }
        }

        Ok(())
    }

    #[allow(clippy::result_large_err)]
    fn formula(&self, text: &str, key: &str, constants: &ConstantRegistry) -> Result<Formula, Error> {
        if self.options.cache_enabled {
            self.cache.get_or_add(key, || self.build_formula(text, constants))
        } else {
            self.build_formula(text, constants)
        }
    }

    #[allow(clippy::result_large_err)]
    fn build_formula(&self, text: &str, constants: &ConstantRegistry) -> Result<Formula, Error> {
        let _span = debug_span!("build_formula", formula = text).entered();

        let operation = self.parse(text, constants)?;
        self.executor
            .build_formula(operation, Arc::clone(&self.functions), Arc::clone(&self.constants))
            .map_err(|e| Error::from_error(text, e))
    }

    #[allow(clippy::result_large_err)]
    fn parse(&self, text: &str, constants: &ConstantRegistry) -> Result<Arc<Operation>, Error> {
        let tokens = Lexer::new(lexer::Options {
            decimal_separator: self.options.decimal_separator,
        })
        .tokenize(text)
        .map_err(|e| Error::from_error(text, e))?;

        let operation = AstBuilder::new(&self.functions, constants, self.options.case_sensitive)
            .build(&tokens)
            .map_err(|e| Error::from_error(text, e))?;

        if !self.options.optimizer_enabled {
            return Ok(operation);
        }

        Optimizer::new(&self.functions, self.options.case_sensitive)
            .optimize(&operation)
            .map_err(|e| Error::from_error(text, e))
    }
}

/// Folds binding names, rejecting two bindings that only differ by case.
fn fold_bindings(variables: &Variables, case_sensitive: bool) -> Result<Cow<'_, Variables>, ArgumentError> {
    let folded = fold_variables(variables, case_sensitive);
    if folded.len() == variables.len() {
        return Ok(folded);
    }

    let name = variables.keys().map(|name| fold_case(name)).duplicates().next();
    Err(ArgumentError::DuplicateName(name.unwrap_or_default()))
}

fn registry_error(name: &str, error: RegistryError) -> Error {
    Error::from_error(name, ArgumentError::from(error))
}

/// `text`, or `text@name:value,...` with the bound constants sorted by name.
fn cache_key(text: &str, constants: &ConstantRegistry) -> SmolStr {
    if constants.is_empty() {
        return SmolStr::new(text);
    }

    let bound = constants
        .iter()
        .sorted_by(|a, b| a.name.cmp(&b.name))
        .map(|constant| format!("{}:{}", constant.name, constant.value))
        .join(",");

    SmolStr::new(format!("{text}@{bound}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InnerError;
    use crate::registry::RegistryError;
    use rstest::{fixture, rstest};

    #[fixture]
    fn engine() -> Engine {
        Engine::default()
    }

    fn vars(bindings: &[(&str, i64)]) -> Variables {
        bindings
            .iter()
            .map(|(name, value)| (SmolStr::new(name), Number::from(*value)))
            .collect()
    }

    #[rstest]
    #[case::precedence("1 + 2 * 3", vars(&[]), Number::from(7))]
    #[case::left_associative("1 - 2 - 3", vars(&[]), Number::from(-4))]
    #[case::right_associative_power("2 ^ 3 ^ 2", vars(&[]), Number::from(512))]
    #[case::dynamic_function("max(1, 5, 3)", vars(&[]), Number::from(5))]
    #[case::fixed_function("if(1, 2, 3)", vars(&[]), Number::from(2))]
    #[case::variables("a * b + 1", vars(&[("a", 3), ("b", 4)]), Number::from(13))]
    #[case::zero_product_skips_unbound("2 * 0 * x", vars(&[]), Number::ZERO)]
    #[case::case_insensitive_binding("X + 1", vars(&[("x", 1)]), Number::from(2))]
    fn test_calculate(engine: Engine, #[case] text: &str, #[case] variables: Variables, #[case] expected: Number) {
        assert_eq!(engine.calculate(text, &variables), Ok(expected));
    }

    #[rstest]
    fn test_calculate_sees_engine_constants(engine: Engine) {
        let value = engine.calculate("pi * r ^ 2", &vars(&[("r", 1)])).unwrap();
        assert!((value.to_f64() - std::f64::consts::PI).abs() < 1e-12);
    }

    #[rstest]
    #[case::blank("  ", vars(&[]), InnerError::InvalidArgument(ArgumentError::BlankFormula))]
    #[case::reserved_constant("x + 1", vars(&[("PI", 3)]), InnerError::InvalidArgument(ArgumentError::ReservedConstantName("pi".into())))]
    #[case::function_name("x + 1", vars(&[("sin", 3)]), InnerError::InvalidArgument(ArgumentError::FunctionNameAsVariable("sin".into())))]
    #[case::undefined_variable("x + 1", vars(&[]), InnerError::Eval(EvalError::VariableNotDefined("x".into())))]
    #[case::case_colliding_bindings("x + 1", vars(&[("X", 1), ("x", 2)]), InnerError::InvalidArgument(ArgumentError::DuplicateName("x".into())))]
    fn test_calculate_errors(engine: Engine, #[case] text: &str, #[case] variables: Variables, #[case] expected: InnerError) {
        assert_eq!(engine.calculate(text, &variables).unwrap_err().cause, expected);
    }

    #[test]
    fn test_case_sensitive() {
        let engine = Engine::new(Options {
            case_sensitive: true,
            ..Options::default()
        });

        assert!(engine.calculate("X + 1", &vars(&[("x", 1)])).unwrap_err().is_variable_not_defined());
        assert_eq!(engine.calculate("X + 1", &vars(&[("X", 1)])), Ok(Number::from(2)));
    }

    #[rstest]
    fn test_binding_wins_over_overwritable_constant(engine: Engine) {
        engine.add_constant("rate", 2).unwrap();
        assert_eq!(engine.calculate("rate * 10", &vars(&[])), Ok(Number::from(20)));
        assert_eq!(engine.calculate("rate * 10", &vars(&[("rate", 3)])), Ok(Number::from(30)));
    }

    #[rstest]
    fn test_build_with_constants(engine: Engine) {
        let one = engine.build("x + k", Some(&vars(&[("k", 1)]))).unwrap();
        let two = engine.build("x + k", Some(&vars(&[("k", 2)]))).unwrap();
        let x = vars(&[("x", 5)]);

        assert_eq!(one(&x), Ok(Number::from(6)));
        assert_eq!(two(&x), Ok(Number::from(7)));
        assert!(engine.cache().contains_key("x + k@k:1"));
        assert!(engine.cache().contains_key("x + k@k:2"));
    }

    #[rstest]
    fn test_build_rejects_case_colliding_constants(engine: Engine) {
        let Err(error) = engine.build("x + k", Some(&vars(&[("K", 1), ("k", 2)]))) else {
            panic!("`K` and `k` should collide");
        };
        assert_eq!(error.cause, InnerError::InvalidArgument(ArgumentError::DuplicateName("k".into())));
        assert!(engine.cache().is_empty());
    }

    #[test]
    fn test_build_case_sensitive_keeps_both_constants() {
        let engine = Engine::new(Options {
            case_sensitive: true,
            ..Options::default()
        });

        let formula = engine.build("K - k", Some(&vars(&[("K", 5), ("k", 2)]))).unwrap();
        assert_eq!(formula(&Variables::default()), Ok(Number::from(3)));
        assert!(engine.cache().contains_key("K - k@K:5,k:2"));
    }

    #[rstest]
    fn test_build_returns_cached_formula(engine: Engine) {
        let first = engine.build("a * 2", None).unwrap();
        let second = engine.build("a * 2", None).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(engine.cache().len(), 1);
    }

    #[test]
    fn test_cache_disabled() {
        let engine = Engine::new(Options {
            cache_enabled: false,
            ..Options::default()
        });

        let first = engine.build("a * 2", None).unwrap();
        let second = engine.build("a * 2", None).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert!(engine.cache().is_empty());
    }

    #[rstest]
    fn test_failed_build_is_not_cached(engine: Engine) {
        let Err(error) = engine.build("foo(1)", None) else {
            panic!("`foo(1)` should not build");
        };
        assert!(error.is_parse_error());
        assert!(engine.cache().is_empty());
    }

    #[rstest]
    #[case("1 +")]
    #[case("(1 + 2")]
    #[case("1 $ 2")]
    #[case("max(1, 2")]
    fn test_parse_errors(engine: Engine, #[case] text: &str) {
        assert!(engine.calculate(text, &vars(&[])).unwrap_err().is_parse_error());
    }

    #[rstest]
    fn test_optimizer_fold_error(engine: Engine) {
        assert_eq!(
            engine.calculate("x + 1 / 0", &vars(&[("x", 1)])).unwrap_err().cause,
            InnerError::Eval(EvalError::ZeroDivision)
        );
    }

    #[rstest]
    fn test_add_function(engine: Engine) {
        engine.add_function("hypot", |a: Number, b: Number| a * a + b * b).unwrap();
        engine
            .add_dynamic_function("sum", |args: &[Number]| Ok(args.iter().copied().fold(Number::ZERO, |acc, n| acc + n)))
            .unwrap();

        assert_eq!(engine.calculate("hypot(3, 4)", &vars(&[])), Ok(Number::from(25)));
        assert_eq!(engine.calculate("sum(1, 2, 3, a)", &vars(&[("a", 4)])), Ok(Number::from(10)));
    }

    #[rstest]
    fn test_register_errors(engine: Engine) {
        let error = engine.add_function("sin", |a: Number| a).unwrap_err();
        assert_eq!(
            error.cause,
            InnerError::InvalidArgument(ArgumentError::Registry(RegistryError::FunctionNotOverwritable("sin".into())))
        );

        let error = engine.add_constant("e", 1).unwrap_err();
        assert!(error.is_invalid_argument());

        let error = engine.add_constant(" ", 1).unwrap_err();
        assert_eq!(
            error.cause,
            InnerError::InvalidArgument(ArgumentError::Registry(RegistryError::BlankName))
        );
    }

    #[rstest]
    #[case::interpreted(ExecutionMode::Interpreted)]
    #[case::compiled(ExecutionMode::Compiled)]
    fn test_execution_modes(#[case] execution_mode: ExecutionMode) {
        let engine = Engine::new(Options {
            execution_mode,
            optimizer_enabled: false,
            ..Options::default()
        });

        assert_eq!(engine.calculate("median(a, 1, 7) % 4", &vars(&[("a", 5)])), Ok(Number::from(1)));
    }

    #[test]
    fn test_decimal_separator() {
        let engine = Engine::new(Options {
            decimal_separator: ',',
            ..Options::default()
        });

        assert_eq!(engine.calculate("max(1,5; 2)", &vars(&[])), Ok(Number::from(2)));
        assert_eq!(engine.calculate("1,5 * 2", &vars(&[])), Ok(Number::from(3)));
    }

    #[test]
    fn test_without_defaults() {
        let engine = Engine::new(Options {
            default_functions: false,
            default_constants: false,
            ..Options::default()
        });

        assert!(engine.function_registry().is_empty());
        assert!(engine.constant_registry().is_empty());
        assert!(engine.calculate("sin(1)", &vars(&[])).unwrap_err().is_parse_error());
    }

    #[test]
    fn test_options_serde() {
        let options: Options =
            serde_json::from_str(r#"{"case_sensitive": true, "execution_mode": "interpreted"}"#).unwrap();

        assert!(options.case_sensitive);
        assert_eq!(options.execution_mode, ExecutionMode::Interpreted);
        assert_eq!(options.cache_maximum_size, 500);
        assert_eq!(options.decimal_separator, '.');
    }

    #[test]
    fn test_cache_key() {
        let constants = ConstantRegistry::new(false);
        assert_eq!(cache_key("a + b", &constants), "a + b");

        constants.register_constant("B", Number::from(2), true).unwrap();
        constants.register_constant("a", "1.50".parse().unwrap(), true).unwrap();
        assert_eq!(cache_key("a + b", &constants), "a + b@a:1.5,b:2");
    }

    #[test]
    fn test_engine_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Engine>();
    }
}
