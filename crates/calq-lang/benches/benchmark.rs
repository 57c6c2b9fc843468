use calq_lang::{Engine, ExecutionMode, Number, Options, Variables};

fn main() {
    divan::main();
}

const FORMULA: &str = "sin(x) * max(a, b, 3) + if(a > b, a ^ 2, b / 4) - logn(x + 10, 2)";

fn engine(execution_mode: ExecutionMode) -> Engine {
    Engine::new(Options {
        execution_mode,
        ..Options::default()
    })
}

fn variables() -> Variables {
    [
        ("a".into(), Number::from(7)),
        ("b".into(), Number::from(-3)),
        ("x".into(), "0.25".parse::<Number>().unwrap()),
    ]
    .into_iter()
    .collect()
}

#[divan::bench(args = [ExecutionMode::Interpreted, ExecutionMode::Compiled])]
fn evaluate_built_formula(bencher: divan::Bencher, execution_mode: ExecutionMode) {
    let formula = engine(execution_mode).build(FORMULA, None).unwrap();
    let variables = variables();

    bencher.bench_local(|| formula(divan::black_box(&variables)).unwrap());
}

#[divan::bench(args = [ExecutionMode::Interpreted, ExecutionMode::Compiled])]
fn calculate_cached(bencher: divan::Bencher, execution_mode: ExecutionMode) {
    let engine = engine(execution_mode);
    let variables = variables();

    bencher.bench_local(|| engine.calculate(divan::black_box(FORMULA), &variables).unwrap());
}

#[divan::bench(args = [ExecutionMode::Interpreted, ExecutionMode::Compiled])]
fn build_uncached(bencher: divan::Bencher, execution_mode: ExecutionMode) {
    let engine = Engine::new(Options {
        execution_mode,
        cache_enabled: false,
        ..Options::default()
    });

    bencher.bench_local(|| engine.build(divan::black_box(FORMULA), None).unwrap());
}

#[divan::bench]
fn tokenize() -> Vec<calq_lang::Token> {
    calq_lang::tokenize(divan::black_box(FORMULA), calq_lang::LexerOptions::default()).unwrap()
}
