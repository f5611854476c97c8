use crate::linear::solve_in_place;
use crate::system::LocalSystem;
use nalgebra::{DMatrix, DVector, DVectorView, DVectorViewMut};
use qpsolve_traits::Real;
use thiserror::Error;

/// Information about an accepted step.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct StepOutcome {
    /// Whether the step is the undamped Newton correction $-\vec J^{-1} \vec r$.
    ///
    /// Only undamped Newton corrections are small exactly when the residual is small, so the
    /// minimizer uses the step norm as a convergence criterion only for these steps.
    pub full_newton_step: bool,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Error)]
pub enum StepError {
    #[error("Jacobian is singular to working precision")]
    SingularJacobian,
    #[error("line search failed to find a step with sufficient decrease")]
    LineSearchFailed,
    #[error("trust region radius collapsed below its minimum")]
    TrustRegionCollapsed,
    #[error("iterate is a stationary point of the residual norm but not a root")]
    StationaryPoint,
}

/// An update rule used by the [`Minimizer`](crate::minimizer::Minimizer).
pub trait StepMethod<T: Real> {
    /// Clears any state carried between iterations. Called at the start of every solve.
    fn reset(&mut self) {}

    /// Computes a step `dx` from the state `x`, given the residual `r` and the Jacobian at `x`.
    ///
    /// The step is applied by the caller as `x + dx`. Implementations may evaluate the system
    /// at trial states, but must not assume anything about `dx` on entry.
    fn compute_step<F>(
        &mut self,
        system: &F,
        x: DVectorView<T>,
        r: DVectorView<T>,
        jacobian: &DMatrix<T>,
        dx: DVectorViewMut<T>,
    ) -> Result<StepOutcome, StepError>
    where
        F: LocalSystem<T> + ?Sized;
}

impl<T, M> StepMethod<T> for &mut M
where
    T: Real,
    M: StepMethod<T> + ?Sized,
{
    fn reset(&mut self) {
        M::reset(self)
    }

    fn compute_step<F>(
        &mut self,
        system: &F,
        x: DVectorView<T>,
        r: DVectorView<T>,
        jacobian: &DMatrix<T>,
        dx: DVectorViewMut<T>,
    ) -> Result<StepOutcome, StepError>
    where
        F: LocalSystem<T> + ?Sized,
    {
        M::compute_step(self, system, x, r, jacobian, dx)
    }
}

/// Solves $\vec J \vec p = - \vec r$ for the Newton direction $\vec p$.
pub fn newton_direction<T: Real>(jacobian: &DMatrix<T>, r: DVectorView<T>) -> Result<DVector<T>, StepError> {
    let mut p = -r.clone_owned();
    solve_in_place(jacobian.clone(), &mut p).map_err(|_| StepError::SingularJacobian)?;
    Ok(p)
}

/// Half the squared residual norm of `system` at `x`, stored in `r` as a by-product.
pub(crate) fn eval_merit<T, F>(system: &F, r: &mut DVector<T>, x: &DVector<T>) -> T
where
    T: Real,
    F: LocalSystem<T> + ?Sized,
{
    r.fill(T::zero());
    system.eval_residual_into(DVectorViewMut::from(&mut *r), DVectorView::from(x));
    r.norm_squared() * nalgebra::convert::<f64, T>(0.5)
}
