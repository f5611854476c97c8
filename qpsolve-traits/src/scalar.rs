//! Differentiable scalars.
use crate::Real;
use nalgebra::{ClosedAdd, ClosedDiv, ClosedMul, ClosedSub, ComplexField, Scalar};
use num::{One, Zero};
use std::ops::Neg;

/// A scalar carrying a value together with a fixed number of partial derivatives
/// with respect to some upstream parameters.
///
/// Plain real numbers are local scalars with zero derivative slots, while [`Dual`](crate::Dual)
/// numbers carry `N` slots and propagate them through arithmetic with the usual rules of
/// forward-mode differentiation.
pub trait LocalScalar:
    Scalar
    + Copy
    + Send
    + Sync
    + Zero
    + One
    + ClosedAdd
    + ClosedSub
    + ClosedMul
    + ClosedDiv
    + Neg<Output = Self>
{
    /// The plain real type holding values and derivatives.
    type Real: Real;

    /// Number of derivative slots carried by every value of this type.
    const NUM_DERIVATIVES: usize;

    /// Constructs a scalar with the given value and all derivatives zero.
    fn from_real(value: Self::Real) -> Self;

    /// Constructs a scalar with all derivatives zero from a floating-point literal.
    fn from_literal(literal: f64) -> Self {
        Self::from_real(nalgebra::convert(literal))
    }

    fn value(&self) -> Self::Real;

    /// Returns the partial derivative stored in the given slot.
    ///
    /// # Panics
    ///
    /// Panics if `slot >= Self::NUM_DERIVATIVES`.
    fn derivative(&self, slot: usize) -> Self::Real;

    /// Overwrites the partial derivative stored in the given slot.
    ///
    /// # Panics
    ///
    /// Panics if `slot >= Self::NUM_DERIVATIVES`.
    fn set_derivative(&mut self, slot: usize, derivative: Self::Real);

    /// Multiplies the scalar by a plain factor.
    fn scale(self, factor: Self::Real) -> Self;

    fn sqrt(self) -> Self;
    fn exp(self) -> Self;
    fn ln(self) -> Self;
    fn powi(self, n: i32) -> Self;
    fn powf(self, exponent: Self::Real) -> Self;

    /// Absolute value. The derivative at zero is taken to be zero.
    fn abs(self) -> Self;

    fn sin(self) -> Self;
    fn cos(self) -> Self;
}

/// Returns `true` if values of `S` carry at least one derivative slot.
///
/// Resolved at compile time, so branching on it costs nothing at runtime.
pub const fn has_derivatives<S: LocalScalar>() -> bool {
    S::NUM_DERIVATIVES > 0
}

/// A scalar type in which a function closing over inputs of type `S` can be evaluated.
///
/// For any local scalar `S`, both `S` itself and its plain type `S::Real` are evaluation
/// scalars. Converting an input into the plain type discards its derivatives.
pub trait EvalScalar<S: LocalScalar>: LocalScalar {
    fn from_input(input: S) -> Self;

    /// Lifts a plain value of the input type, with all derivatives zero.
    fn from_plain(value: S::Real) -> Self {
        Self::from_input(S::from_real(value))
    }
}

impl<T: Real> LocalScalar for T {
    type Real = T;

    const NUM_DERIVATIVES: usize = 0;

    fn from_real(value: T) -> T {
        value
    }

    fn value(&self) -> T {
        *self
    }

    fn derivative(&self, slot: usize) -> T {
        panic!("plain scalars have no derivative slots (requested slot {slot})")
    }

    fn set_derivative(&mut self, slot: usize, _derivative: T) {
        panic!("plain scalars have no derivative slots (requested slot {slot})")
    }

    fn scale(self, factor: T) -> T {
        self * factor
    }

    fn sqrt(self) -> T {
        ComplexField::sqrt(self)
    }

    fn exp(self) -> T {
        ComplexField::exp(self)
    }

    fn ln(self) -> T {
        ComplexField::ln(self)
    }

    fn powi(self, n: i32) -> T {
        ComplexField::powi(self, n)
    }

    fn powf(self, exponent: T) -> T {
        ComplexField::powf(self, exponent)
    }

    fn abs(self) -> T {
        ComplexField::abs(self)
    }

    fn sin(self) -> T {
        ComplexField::sin(self)
    }

    fn cos(self) -> T {
        ComplexField::cos(self)
    }
}

impl<T: Real> EvalScalar<T> for T {
    fn from_input(input: T) -> T {
        input
    }
}
