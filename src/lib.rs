//! Local nonlinear solves with forward-mode sensitivities.
//!
//! Constitutive models frequently need to solve a small nonlinear system
//! $\vec r(\vec x; \vec p) = \vec 0$ at every quadrature point, while the inputs $\vec p$ may
//! carry derivative information as [`Dual`] numbers. [`solve`] runs the iteration in plain
//! arithmetic and afterwards recovers $\pd{\vec x}{\vec p}$ with the implicit function theorem,
//! at the cost of a single linear solve.
//!
//! Step methods and the [`Minimizer`](optimize::minimizer::Minimizer) only operate on plain
//! real scalars,
//!
//! ```
//! use qpsolve::optimize::minimizer::Minimizer;
//!
//! let minimizer = Minimizer::<f64>::default();
//! ```
//!
//! so a solve can never be differentiated through its own iterations:
//!
//! ```compile_fail
//! use qpsolve::optimize::minimizer::Minimizer;
//! use qpsolve::Dual;
//!
//! let minimizer = Minimizer::<Dual<f64, 1>>::default();
//! ```
pub mod batch;
pub mod error;
pub mod residual;
pub mod sensitivity;

mod solve;

pub mod optimize {
    pub use qpsolve_optimize::*;
}

pub use batch::{solve_batch, solve_batch_serial};
pub use error::LocalSolveError;
pub use qpsolve_traits::{has_derivatives, Dual, EvalScalar, LocalScalar, Real};
pub use residual::ResidualFunction;
pub use sensitivity::propagate_sensitivities;
pub use solve::solve;

pub extern crate nalgebra;
