//! Core traits used by `qpsolve`.
//!
//! The central abstraction is [`LocalScalar`], which lets the local solver and its
//! sensitivity propagation be written once for plain real numbers and for dual numbers
//! alike.
use nalgebra::RealField;

pub use nalgebra;

pub trait Real: RealField + Copy {}

impl<T: RealField + Copy> Real for T {}

pub mod dual;
pub mod scalar;

pub use dual::Dual;
pub use scalar::{has_derivatives, EvalScalar, LocalScalar};
