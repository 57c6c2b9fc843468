use std::sync::Arc;

use rust_decimal::Decimal;
use smol_str::SmolStr;

use crate::eval::error::EvalError;
use crate::number::Number;
use crate::registry::{Arity, Callable, ConstantRegistry, FunctionRegistry, NativeFunction};

fn native<Args, F>(registry: &FunctionRegistry, name: &'static str, function: F)
where
    F: NativeFunction<Args>,
{
    registry.insert(name, Arity::Fixed(F::ARITY), true, function.into_callable());
}

fn float(registry: &FunctionRegistry, name: &'static str, function: fn(f64) -> f64) {
    let callable: Callable = Arc::new(move |args: &[Number]| match args {
        [x] => from_f64(name, function(x.to_f64())),
        _ => Err(EvalError::ArityMismatch {
            expected: 1,
            got: args.len(),
        }),
    });

    registry.insert(name, Arity::Fixed(1), true, callable);
}

fn dynamic(
    registry: &FunctionRegistry,
    name: &'static str,
    function: fn(&'static str, &[Number]) -> Result<Number, EvalError>,
) {
    let callable: Callable = Arc::new(move |args: &[Number]| function(name, args));
    registry.insert(name, Arity::Dynamic, true, callable);
}

fn from_f64(name: &'static str, value: f64) -> Result<Number, EvalError> {
    Number::from_f64(value).ok_or_else(|| EvalError::NonFiniteResult(SmolStr::new_static(name)))
}

/// Fills `registry` with the default function set. Every entry is locked against overwriting.
pub fn register_functions(registry: &FunctionRegistry) {
    float(registry, "sin", f64::sin);
    float(registry, "cos", f64::cos);
    float(registry, "csc", |x| 1.0 / x.sin());
    float(registry, "sec", |x| 1.0 / x.cos());
    float(registry, "asin", f64::asin);
    float(registry, "acos", f64::acos);
    float(registry, "tan", f64::tan);
    float(registry, "cot", |x| 1.0 / x.tan());
    float(registry, "atan", f64::atan);
    float(registry, "acot", |x| (1.0 / x).atan());
    float(registry, "loge", f64::ln);
    float(registry, "log10", f64::log10);
    float(registry, "sqrt", f64::sqrt);

    let logn: Callable = Arc::new(|args: &[Number]| match args {
        [value, base] => from_f64("logn", value.to_f64().ln() / base.to_f64().ln()),
        _ => Err(EvalError::ArityMismatch {
            expected: 2,
            got: args.len(),
        }),
    });
    registry.insert("logn", Arity::Fixed(2), true, logn);

    native(registry, "abs", |a: Number| a.abs());
    native(registry, "ceiling", |a: Number| a.ceil());
    native(registry, "floor", |a: Number| a.floor());
    native(registry, "truncate", |a: Number| a.trunc());
    native(registry, "round", |a: Number| a.round());

    native(registry, "if", |condition: Number, then: Number, otherwise: Number| {
        if condition.is_truthy() { then } else { otherwise }
    });
    native(registry, "ifless", |a: Number, b: Number, then: Number, otherwise: Number| {
        if a < b { then } else { otherwise }
    });
    native(registry, "ifmore", |a: Number, b: Number, then: Number, otherwise: Number| {
        if a > b { then } else { otherwise }
    });
    native(registry, "ifequal", |a: Number, b: Number, then: Number, otherwise: Number| {
        if a == b { then } else { otherwise }
    });

    dynamic(registry, "max", max);
    dynamic(registry, "min", min);
    dynamic(registry, "avg", avg);
    dynamic(registry, "median", median);

    let random: Callable = Arc::new(|_: &[Number]| from_f64("random", fastrand::f64()));
    registry.insert("random", Arity::Fixed(0), false, random);
}

pub fn register_constants(registry: &ConstantRegistry) {
    registry.insert("e", Number::new(Decimal::E));
    registry.insert("pi", Number::new(Decimal::PI));
}

fn max(name: &'static str, args: &[Number]) -> Result<Number, EvalError> {
    args.iter()
        .copied()
        .max()
        .ok_or_else(|| EvalError::EmptyArguments(SmolStr::new_static(name)))
}

fn min(name: &'static str, args: &[Number]) -> Result<Number, EvalError> {
    args.iter()
        .copied()
        .min()
        .ok_or_else(|| EvalError::EmptyArguments(SmolStr::new_static(name)))
}

fn avg(name: &'static str, args: &[Number]) -> Result<Number, EvalError> {
    if args.is_empty() {
        return Err(EvalError::EmptyArguments(SmolStr::new_static(name)));
    }

    let sum = args
        .iter()
        .try_fold(Number::ZERO, |acc, n| acc.checked_add(*n))
        .ok_or(EvalError::Overflow)?;

    sum.checked_div(Number::from(args.len())).ok_or(EvalError::Overflow)
}

fn median(name: &'static str, args: &[Number]) -> Result<Number, EvalError> {
    let mut sorted = args.to_vec();
    sorted.sort_unstable();

    let middle = sorted.len() / 2;
    match sorted.len() {
        0 => Err(EvalError::EmptyArguments(SmolStr::new_static(name))),
        len if len % 2 == 1 => Ok(sorted[middle]),
        _ => sorted[middle - 1]
            .checked_add(sorted[middle])
            .and_then(|sum| sum.checked_div(Number::from(2)))
            .ok_or(EvalError::Overflow),
    }
}
