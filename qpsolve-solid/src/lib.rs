//! Constitutive models for `qpsolve`.
//!
//! Every model solves a small nonlinear problem per evaluation point with [`qpsolve::solve`],
//! so stresses and internal variables carry derivatives with respect to any dual-valued input.
pub mod error;
pub mod materials;
pub mod plasticity;
pub mod viscoplasticity;

pub use error::ConstitutiveError;
