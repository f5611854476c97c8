//! Dual numbers with a fixed number of derivative slots.
//!
//! A dual number $a + \sum_k a'_k \varepsilon_k$ carries a value $a$ and the partial
//! derivatives $a'_k = \pd{a}{p_k}$ with respect to $N$ upstream parameters $p_k$. Every
//! operation updates all $N$ slots at once:
//!
//! - $(a, a') + (b, b') = (a + b, a' + b')$
//! - $(a, a') (b, b') = (ab, a' b + a b')$
//! - $(a, a') / (b, b') = (a / b, (a' - (a / b) b') / b)$
//! - $f((a, a')) = (f(a), f'(a) a')$ for elementary functions $f$.
use crate::scalar::{EvalScalar, LocalScalar};
use crate::Real;
use nalgebra::ComplexField;
use num::{One, Zero};
use std::array;
use std::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign};

/// A value together with its partial derivatives with respect to `N` parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dual<T, const N: usize> {
    value: T,
    derivatives: [T; N],
}

impl<T: Real, const N: usize> Dual<T, N> {
    pub fn new(value: T, derivatives: [T; N]) -> Self {
        Self { value, derivatives }
    }

    /// A dual number whose derivatives all vanish.
    pub fn constant(value: T) -> Self {
        Self {
            value,
            derivatives: [T::zero(); N],
        }
    }

    /// The parameter associated with the given slot, i.e. a unit derivative in `slot`.
    ///
    /// # Panics
    ///
    /// Panics if `slot >= N`.
    pub fn variable(value: T, slot: usize) -> Self {
        assert!(slot < N, "slot {} out of bounds for {} derivative slots", slot, N);
        let mut derivatives = [T::zero(); N];
        derivatives[slot] = T::one();
        Self { value, derivatives }
    }

    pub fn value(&self) -> T {
        self.value
    }

    pub fn derivatives(&self) -> &[T; N] {
        &self.derivatives
    }

    pub fn derivatives_mut(&mut self) -> &mut [T; N] {
        &mut self.derivatives
    }

    /// Applies the chain rule for a function with value `value` and derivative `slope` at `self`.
    fn chain(&self, value: T, slope: T) -> Self {
        Self {
            value,
            derivatives: self.derivatives.map(|d| d * slope),
        }
    }
}

impl<T: Real, const N: usize> Add for Dual<T, N> {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            value: self.value + rhs.value,
            derivatives: array::from_fn(|k| self.derivatives[k] + rhs.derivatives[k]),
        }
    }
}

impl<T: Real, const N: usize> Sub for Dual<T, N> {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self {
            value: self.value - rhs.value,
            derivatives: array::from_fn(|k| self.derivatives[k] - rhs.derivatives[k]),
        }
    }
}

impl<T: Real, const N: usize> Mul for Dual<T, N> {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        Self {
            value: self.value * rhs.value,
            derivatives: array::from_fn(|k| self.derivatives[k] * rhs.value + self.value * rhs.derivatives[k]),
        }
    }
}

impl<T: Real, const N: usize> Div for Dual<T, N> {
    type Output = Self;

    fn div(self, rhs: Self) -> Self {
        let quotient = self.value / rhs.value;
        Self {
            value: quotient,
            derivatives: array::from_fn(|k| (self.derivatives[k] - quotient * rhs.derivatives[k]) / rhs.value),
        }
    }
}

impl<T: Real, const N: usize> Neg for Dual<T, N> {
    type Output = Self;

    fn neg(self) -> Self {
        Self {
            value: -self.value,
            derivatives: self.derivatives.map(|d| -d),
        }
    }
}

impl<T: Real, const N: usize> AddAssign for Dual<T, N> {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl<T: Real, const N: usize> SubAssign for Dual<T, N> {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl<T: Real, const N: usize> MulAssign for Dual<T, N> {
    fn mul_assign(&mut self, rhs: Self) {
        *self = *self * rhs;
    }
}

impl<T: Real, const N: usize> DivAssign for Dual<T, N> {
    fn div_assign(&mut self, rhs: Self) {
        *self = *self / rhs;
    }
}

impl<T: Real, const N: usize> Zero for Dual<T, N> {
    fn zero() -> Self {
        Self::constant(T::zero())
    }

    fn is_zero(&self) -> bool {
        self.value.is_zero() && self.derivatives.iter().all(T::is_zero)
    }
}

impl<T: Real, const N: usize> One for Dual<T, N> {
    fn one() -> Self {
        Self::constant(T::one())
    }
}

impl<T: Real, const N: usize> LocalScalar for Dual<T, N> {
    type Real = T;

    const NUM_DERIVATIVES: usize = N;

    fn from_real(value: T) -> Self {
        Self::constant(value)
    }

    fn value(&self) -> T {
        self.value
    }

    fn derivative(&self, slot: usize) -> T {
        self.derivatives[slot]
    }

    fn set_derivative(&mut self, slot: usize, derivative: T) {
        self.derivatives[slot] = derivative;
    }

    fn scale(self, factor: T) -> Self {
        self.chain(self.value * factor, factor)
    }

    fn sqrt(self) -> Self {
        let root = ComplexField::sqrt(self.value);
        self.chain(root, T::one() / (root + root))
    }

    fn exp(self) -> Self {
        let e = ComplexField::exp(self.value);
        self.chain(e, e)
    }

    fn ln(self) -> Self {
        self.chain(ComplexField::ln(self.value), T::one() / self.value)
    }

    fn powi(self, n: i32) -> Self {
        let slope = match n {
            0 => T::zero(),
            _ => nalgebra::convert::<f64, T>(f64::from(n)) * ComplexField::powi(self.value, n - 1),
        };
        self.chain(ComplexField::powi(self.value, n), slope)
    }

    fn powf(self, exponent: T) -> Self {
        let slope = exponent * ComplexField::powf(self.value, exponent - T::one());
        self.chain(ComplexField::powf(self.value, exponent), slope)
    }

    fn abs(self) -> Self {
        let sign = if self.value > T::zero() {
            T::one()
        } else if self.value < T::zero() {
            -T::one()
        } else {
            T::zero()
        };
        self.chain(ComplexField::abs(self.value), sign)
    }

    fn sin(self) -> Self {
        let (sin, cos) = ComplexField::sin_cos(self.value);
        self.chain(sin, cos)
    }

    fn cos(self) -> Self {
        let (sin, cos) = ComplexField::sin_cos(self.value);
        self.chain(cos, -sin)
    }
}

impl<T: Real, const N: usize> EvalScalar<Dual<T, N>> for Dual<T, N> {
    fn from_input(input: Self) -> Self {
        input
    }
}

impl<T: Real, const N: usize> EvalScalar<Dual<T, N>> for T {
    fn from_input(input: Dual<T, N>) -> T {
        input.value
    }
}
