use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Rem, Sub};
use std::str::FromStr;

/// Decimal number used for every value a formula produces.
///
/// Arithmetic on the fast path is exact base-10 arithmetic. Operations that have no exact decimal
/// counterpart (powers, trigonometry, logarithms) go through `f64` and are converted back with
/// [`Number::from_f64`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Number(Decimal);

impl Number {
    pub const ZERO: Number = Number(Decimal::ZERO);
    pub const ONE: Number = Number(Decimal::ONE);

    /// Creates a new `Number` from a `Decimal` value.
    pub const fn new(value: Decimal) -> Self {
        Number(value)
    }

    /// Returns the underlying `Decimal` value.
    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Converts a float into a `Number`.
    ///
    /// Returns `None` for NaN, infinities and values outside the decimal range.
    pub fn from_f64(value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }

        Decimal::from_f64(value).map(Number)
    }

    /// Returns the nearest `f64` to this number.
    pub fn to_f64(self) -> f64 {
        self.0.to_f64().unwrap_or(f64::NAN)
    }

    /// Maps a boolean onto the numeric truth values `1` and `0`.
    pub fn from_bool(value: bool) -> Self {
        if value { Number::ONE } else { Number::ZERO }
    }

    /// Every non-zero number is truthy.
    pub fn is_truthy(&self) -> bool {
        !self.0.is_zero()
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn abs(&self) -> Self {
        Number(self.0.abs())
    }

    pub fn ceil(&self) -> Self {
        Number(self.0.ceil())
    }

    pub fn floor(&self) -> Self {
        Number(self.0.floor())
    }

    pub fn trunc(&self) -> Self {
        Number(self.0.trunc())
    }

    /// Rounds half to even.
    pub fn round(&self) -> Self {
        Number(self.0.round())
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Number)
    }

    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Number)
    }

    pub fn checked_mul(self, other: Self) -> Option<Self> {
        self.0.checked_mul(other.0).map(Number)
    }

    /// Returns `None` when `other` is zero or the quotient overflows.
    pub fn checked_div(self, other: Self) -> Option<Self> {
        self.0.checked_div(other.0).map(Number)
    }

    /// Returns `None` when `other` is zero.
    pub fn checked_rem(self, other: Self) -> Option<Self> {
        self.0.checked_rem(other.0).map(Number)
    }
}

impl Neg for Number {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Number(-self.0)
    }
}

impl Add for Number {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Number(self.0 + other.0)
    }
}

impl Sub for Number {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Number(self.0 - other.0)
    }
}

impl Mul for Number {
    type Output = Self;

    fn mul(self, other: Self) -> Self {
        Number(self.0 * other.0)
    }
}

impl Div for Number {
    type Output = Self;

    fn div(self, other: Self) -> Self {
        Number(self.0 / other.0)
    }
}

impl Rem for Number {
    type Output = Self;

    fn rem(self, other: Self) -> Self {
        Number(self.0 % other.0)
    }
}

impl From<Decimal> for Number {
    fn from(value: Decimal) -> Self {
        Number(value)
    }
}

impl From<Number> for Decimal {
    fn from(value: Number) -> Self {
        value.0
    }
}

impl From<i64> for Number {
    fn from(value: i64) -> Self {
        Number(Decimal::from(value))
    }
}

impl From<i32> for Number {
    fn from(value: i32) -> Self {
        Number(Decimal::from(value))
    }
}

impl From<u32> for Number {
    fn from(value: u32) -> Self {
        Number(Decimal::from(value))
    }
}

impl From<usize> for Number {
    fn from(value: usize) -> Self {
        Number(Decimal::from(value))
    }
}

impl FromStr for Number {
    type Err = rust_decimal::Error;

    /// Accepts plain decimals (`1.5`) and scientific notation (`1.5e-3`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.contains(['e', 'E']) {
            Decimal::from_scientific(&s.to_ascii_lowercase()).map(Number)
        } else {
            Decimal::from_str(s).map(Number)
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}
