//! Equivalence tests between the compiled closures and the tree-walking interpreter.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rstest::{fixture, rstest};
    use smol_str::SmolStr;

    use crate::ast::{AstBuilder, Operation};
    use crate::builtin;
    use crate::compiler::Compiler;
    use crate::eval::Interpreter;
    use crate::eval::error::EvalError;
    use crate::executor::{Executor, Variables};
    use crate::lexer::{Lexer, Options};
    use crate::number::Number;
    use crate::registry::{Arity, ConstantRegistry, FunctionRegistry};

    struct Env {
        functions: Arc<FunctionRegistry>,
        constants: Arc<ConstantRegistry>,
    }

    #[fixture]
    fn env() -> Env {
        let functions = FunctionRegistry::new(false);
        builtin::register_functions(&functions);
        let constants = ConstantRegistry::new(false);
        builtin::register_constants(&constants);
        Env {
            functions: Arc::new(functions),
            constants: Arc::new(constants),
        }
    }

    fn parse(env: &Env, input: &str) -> Arc<Operation> {
        let tokens = Lexer::new(Options::default()).tokenize(input).unwrap();
        AstBuilder::new(&env.functions, &ConstantRegistry::new(false), false)
            .build(&tokens)
            .unwrap()
    }

    fn vars(bindings: &[(&str, &str)]) -> Variables {
        bindings
            .iter()
            .map(|(name, value)| (SmolStr::new(name), value.parse::<Number>().unwrap()))
            .collect()
    }

    fn run(executor: &dyn Executor, env: &Env, input: &str, variables: &Variables) -> Result<Number, EvalError> {
        let formula = executor
            .build_formula(parse(env, input), Arc::clone(&env.functions), Arc::clone(&env.constants))
            .unwrap();
        formula(variables)
    }

    #[rstest]
    fn test_compiler_interpreter_equivalence(env: Env) {
        let variables = vars(&[("a", "3"), ("b", "-4.5"), ("c", "0"), ("x", "0.25")]);
        let test_cases = vec![
            // Literals and variables
            "42",
            "4.75",
            "a",
            "-a",
            "--b",
            // Arithmetic
            "a + b * 2",
            "(a + b) * 2",
            "a - b - 1",
            "a / 4 / 2",
            "a % 2",
            "2 ^ a ^ 2",
            "-2 ^ 2",
            "a * 0.1 + 0.2",
            // Comparisons and logic
            "a < b",
            "a <= 3",
            "a > b",
            "a >= 4",
            "a == 3",
            "a != 3",
            "a && c",
            "a || c",
            "a > 1 && b < 0 || c",
            // Functions
            "max(a, b, c)",
            "min(a, b, c, x)",
            "avg(a, b)",
            "median(a, b, c, x)",
            "if(c, 1, 2)",
            "ifless(a, b, 1, 2)",
            "ifmore(a, b, 1, 2)",
            "ifequal(a, 3, 1, 2)",
            "abs(b) + ceiling(x) + floor(b) + truncate(b) + round(b)",
            "sin(x) + cos(x) * tan(x)",
            "asin(x) + acos(x) + atan(x) + acot(a)",
            "sqrt(a) * loge(a) + log10(a) + logn(a, 2)",
            "csc(x) + sec(x) + cot(x)",
            // Failures
            "a / c",
            "a % c",
            "undefined + 1",
            "c ^ -1",
            "loge(c)",
        ];

        for input in test_cases {
            let interpreted = run(&Interpreter::new(false), &env, input, &variables);
            let compiled = run(&Compiler::new(false), &env, input, &variables);
            assert_eq!(interpreted, compiled, "results differ for `{input}`");
        }
    }

    #[rstest]
    fn test_execute_matches_build_formula(env: Env) {
        let variables = vars(&[("a", "7")]);
        let op = parse(&env, "a * 3 - max(a, 10)");
        let compiler = Compiler::new(false);
        let executed = compiler.execute(&op, &env.functions, &env.constants, &variables);
        assert_eq!(executed, Ok(Number::from(11)));
        assert_eq!(run(&compiler, &env, "a * 3 - max(a, 10)", &variables), executed);
    }

    #[rstest]
    fn test_constant_registry_fallback(env: Env) {
        let interpreted = run(&Interpreter::new(false), &env, "pi * 2", &Variables::default());
        let compiled = run(&Compiler::new(false), &env, "pi * 2", &Variables::default());

        assert_eq!(interpreted, Err(EvalError::VariableNotDefined("pi".into())));
        let value = compiled.unwrap().to_f64();
        assert!((value - std::f64::consts::TAU).abs() < 1e-12);
    }

    #[rstest]
    fn test_constant_registered_after_build(env: Env) {
        let formula = Compiler::new(false)
            .build_formula(parse(&env, "late + 1"), Arc::clone(&env.functions), Arc::clone(&env.constants))
            .unwrap();
        assert_eq!(
            formula(&Variables::default()),
            Err(EvalError::VariableNotDefined("late".into()))
        );

        env.constants.register_constant("late", Number::from(41), true).unwrap();
        assert_eq!(formula(&Variables::default()), Ok(Number::from(42)));
    }

    #[rstest]
    fn test_overwritable_function_is_fetched_per_call(env: Env) {
        env.functions
            .register_function("twice", Arity::Fixed(1), true, true, Arc::new(|args: &[Number]| Ok(args[0] * Number::from(2))))
            .unwrap();
        let formula = Compiler::new(false)
            .build_formula(parse(&env, "twice(a)"), Arc::clone(&env.functions), Arc::clone(&env.constants))
            .unwrap();
        let variables = vars(&[("a", "5")]);
        assert_eq!(formula(&variables), Ok(Number::from(10)));

        env.functions
            .register_function("twice", Arity::Fixed(1), true, true, Arc::new(|args: &[Number]| Ok(args[0] * Number::from(3))))
            .unwrap();
        assert_eq!(formula(&variables), Ok(Number::from(15)));
    }

    #[rstest]
    fn test_unknown_function_fails_at_build(env: Env) {
        let op = parse(&env, "sin(1)");
        let empty = Arc::new(FunctionRegistry::new(false));
        let result = Compiler::new(false).build_formula(op, empty, Arc::clone(&env.constants));
        assert!(matches!(result, Err(EvalError::FunctionNotDefined(name)) if name == "sin"));
    }

    #[rstest]
    fn test_case_insensitive_bindings(env: Env) {
        let variables = vars(&[("A", "2"), ("B", "5")]);
        assert_eq!(run(&Compiler::new(false), &env, "a * b", &variables), Ok(Number::from(10)));
        assert_eq!(run(&Interpreter::new(false), &env, "a * b", &variables), Ok(Number::from(10)));
    }
}
