//! Plain-value machinery for small local nonlinear systems.
//!
//! Everything in this crate operates on plain real numbers (`T: Real`). Derivative
//! information is handled one level up, in `qpsolve`.

/// Numerical differentiation helpers
pub mod calculus;
/// Dense linear solves with singularity detection
pub mod linear;
/// The minimizer driving step methods to convergence
pub mod minimizer;
/// Newton steps, with and without line search
pub mod newton;
/// The step method abstraction
pub mod step;
/// Local nonlinear systems
pub mod system;
/// Powell's dogleg trust region step
pub mod trust_region;
