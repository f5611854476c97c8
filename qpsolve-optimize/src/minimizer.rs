use crate::step::{StepError, StepMethod};
use crate::system::LocalSystem;
use log::{debug, trace};
use nalgebra::{DMatrix, DMatrixViewMut, DVector, DVectorView, DVectorViewMut};
use numeric_literals::replace_float_literals;
use qpsolve_traits::Real;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::Display;
use thiserror::Error;

/// Tolerances and iteration limits for the [`Minimizer`].
///
/// A solve is considered converged when
/// ```text
/// |r|_2 <= max(residual_tolerance, relative_residual_tolerance * |r_0|_2),
/// ```
/// where `r_0` is the residual at the initial guess, or when an undamped Newton correction
/// satisfies `|dx|_2 <= step_tolerance`.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, bound(deserialize = "T: Real + Deserialize<'de>"))]
pub struct MinimizerSettings<T> {
    pub residual_tolerance: T,
    pub relative_residual_tolerance: T,
    pub step_tolerance: T,
    pub max_iterations: usize,
}

impl<T: Real> Default for MinimizerSettings<T> {
    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    fn default() -> Self {
        Self {
            residual_tolerance: 1e-10,
            relative_residual_tolerance: 1e-12,
            step_tolerance: 1e-14,
            max_iterations: 50,
        }
    }
}

impl<T: Real> MinimizerSettings<T> {
    /// Checks that all tolerances are finite and non-negative and that at least one iteration
    /// is allowed.
    pub fn validate(&self) -> Result<(), MinimizerError> {
        if self.max_iterations == 0 {
            return Err(MinimizerError::InvalidSettings(
                "max_iterations must be positive".to_string(),
            ));
        }
        let tolerances = [
            ("residual_tolerance", self.residual_tolerance),
            ("relative_residual_tolerance", self.relative_residual_tolerance),
            ("step_tolerance", self.step_tolerance),
        ];
        for (name, tolerance) in tolerances {
            if !(tolerance.is_finite() && tolerance >= T::zero()) {
                return Err(MinimizerError::InvalidSettings(format!(
                    "{} must be finite and non-negative, but is {}",
                    name, tolerance
                )));
            }
        }
        Ok(())
    }
}

/// How a local solve terminated.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConvergenceStatus {
    Converged,
    /// The iteration limit was reached before convergence.
    MaxIterationsExceeded,
    /// The iteration diverged or stalled: the residual became non-finite, or the step method
    /// could not make progress.
    NonConvergence,
    /// The Jacobian could not be inverted during the solve.
    NumericalSingularity,
}

impl Display for ConvergenceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let description = match self {
            ConvergenceStatus::Converged => "converged",
            ConvergenceStatus::MaxIterationsExceeded => "maximum number of iterations exceeded",
            ConvergenceStatus::NonConvergence => "failed to converge",
            ConvergenceStatus::NumericalSingularity => "numerically singular Jacobian",
        };
        write!(f, "{}", description)
    }
}

/// Diagnostics of a single local solve.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvergenceRecord<T> {
    pub status: ConvergenceStatus,
    pub iterations: usize,
    pub initial_residual_norm: T,
    /// Residual norm at the final iterate.
    pub residual_norm: T,
    /// Norm of the last step taken, or zero if no step was taken.
    pub step_norm: T,
}

impl<T> ConvergenceRecord<T> {
    pub fn is_converged(&self) -> bool {
        self.status == ConvergenceStatus::Converged
    }
}

/// Errors in the setup of a solve. Convergence failures are reported through
/// [`ConvergenceRecord::status`] instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MinimizerError {
    #[error("dimension mismatch: {what} has dimension {actual}, expected {expected}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("invalid solver settings: {0}")]
    InvalidSettings(String),
}

/// Drives a [`StepMethod`] to convergence on a [`LocalSystem`].
///
/// The minimizer holds no state besides its settings, so a single instance can be shared by any
/// number of concurrent solves.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Minimizer<T> {
    settings: MinimizerSettings<T>,
}

impl<T: Real> Default for Minimizer<T> {
    fn default() -> Self {
        Self::new(MinimizerSettings::default())
    }
}

impl<T: Real> Minimizer<T> {
    pub fn new(settings: MinimizerSettings<T>) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &MinimizerSettings<T> {
        &self.settings
    }

    /// Attempts to solve $\vec r(\vec x) = \vec 0$, starting from the initial guess stored in `x`.
    ///
    /// Upon returning, `x` holds the final iterate. It is a solution only if the returned record
    /// reports [`ConvergenceStatus::Converged`].
    ///
    /// Returns an error if the dimension of `x` does not match the system or if the settings
    /// are invalid. Both are checked before the system is evaluated.
    pub fn minimize<'a, F, M>(
        &self,
        step_method: &mut M,
        system: &F,
        x: impl Into<DVectorViewMut<'a, T>>,
    ) -> Result<ConvergenceRecord<T>, MinimizerError>
    where
        F: LocalSystem<T> + ?Sized,
        M: StepMethod<T> + ?Sized,
    {
        let mut x = x.into();
        let n = system.dimension();
        if x.nrows() != n {
            return Err(MinimizerError::DimensionMismatch {
                what: "initial guess",
                expected: n,
                actual: x.nrows(),
            });
        }
        self.settings.validate()?;
        step_method.reset();

        let mut r = DVector::zeros(n);
        let mut jacobian = DMatrix::zeros(n, n);
        let mut dx = DVector::zeros(n);

        system.eval_residual_into(DVectorViewMut::from(&mut r), DVectorView::from(&x));
        let initial_residual_norm = r.norm();
        let tolerance = T::max(
            self.settings.residual_tolerance,
            self.settings.relative_residual_tolerance * initial_residual_norm,
        );

        let mut record = ConvergenceRecord {
            status: ConvergenceStatus::NonConvergence,
            iterations: 0,
            initial_residual_norm,
            residual_norm: initial_residual_norm,
            step_norm: T::zero(),
        };

        record.status = loop {
            if !record.residual_norm.is_finite() {
                break ConvergenceStatus::NonConvergence;
            }
            if record.residual_norm <= tolerance {
                break ConvergenceStatus::Converged;
            }
            if record.iterations >= self.settings.max_iterations {
                break ConvergenceStatus::MaxIterationsExceeded;
            }

            jacobian.fill(T::zero());
            system.eval_jacobian_into(DMatrixViewMut::from(&mut jacobian), DVectorView::from(&x));

            let step_result = step_method.compute_step(
                system,
                DVectorView::from(&x),
                DVectorView::from(&r),
                &jacobian,
                DVectorViewMut::from(&mut dx),
            );
            let outcome = match step_result {
                Ok(outcome) => outcome,
                Err(StepError::SingularJacobian) => break ConvergenceStatus::NumericalSingularity,
                Err(err) => {
                    debug!("Step method failed at iteration {}: {}", record.iterations, err);
                    break ConvergenceStatus::NonConvergence;
                }
            };

            x.axpy(T::one(), &dx, T::one());
            r.fill(T::zero());
            system.eval_residual_into(DVectorViewMut::from(&mut r), DVectorView::from(&x));

            record.iterations += 1;
            record.step_norm = dx.norm();
            record.residual_norm = r.norm();
            trace!(
                "Iteration {}: |r| = {}, |dx| = {}",
                record.iterations,
                record.residual_norm,
                record.step_norm
            );

            if outcome.full_newton_step
                && record.step_norm <= self.settings.step_tolerance
                && record.residual_norm.is_finite()
            {
                break ConvergenceStatus::Converged;
            }
        };

        debug!(
            "Local solve finished after {} iterations: {} (|r| = {}, |r_0| = {})",
            record.iterations, record.status, record.residual_norm, record.initial_residual_norm
        );
        Ok(record)
    }
}
