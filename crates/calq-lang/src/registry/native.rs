use std::sync::Arc;

use crate::eval::error::EvalError;
use crate::number::Number;

use super::function::Callable;

/// Plain Rust closures taking up to eight `Number` parameters and returning a `Number`.
///
/// `Args` is a tuple of the parameter types and only serves to keep the impls apart.
pub trait NativeFunction<Args>: Send + Sync + 'static {
    const ARITY: usize;

    fn into_callable(self) -> Callable;
}

macro_rules! number_type {
    ($_arg:ident) => {
        Number
    };
}

macro_rules! count_args {
    () => { 0usize };
    ($head:ident $($tail:ident)*) => { 1usize + count_args!($($tail)*) };
}

macro_rules! impl_native_function {
    ($($arg:ident),*) => {
        impl<Func> NativeFunction<($(number_type!($arg),)*)> for Func
        where
            Func: Fn($(number_type!($arg)),*) -> Number + Send + Sync + 'static,
        {
            const ARITY: usize = count_args!($($arg)*);

            fn into_callable(self) -> Callable {
                let function = self;
                Arc::new(move |args: &[Number]| match args {
                    [$($arg),*] => Ok(function($(*$arg),*)),
                    _ => Err(EvalError::ArityMismatch {
                        expected: Self::ARITY,
                        got: args.len(),
                    }),
                })
            }
        }
    };
}

impl_native_function!();
impl_native_function!(a);
impl_native_function!(a, b);
impl_native_function!(a, b, c);
impl_native_function!(a, b, c, d);
impl_native_function!(a, b, c, d, e);
impl_native_function!(a, b, c, d, e, f);
impl_native_function!(a, b, c, d, e, f, g);
impl_native_function!(a, b, c, d, e, f, g, h);
