use crate::error::LocalSolveError;
use crate::optimize::minimizer::{ConvergenceRecord, Minimizer, MinimizerSettings};
use crate::optimize::step::StepMethod;
use crate::residual::{PlainSystem, ResidualFunction};
use crate::sensitivity::{check_dimension, propagate_sensitivities};
use nalgebra::{DVectorView, DVectorViewMut};
use qpsolve_traits::{has_derivatives, EvalScalar, LocalScalar};

/// Solves the local problem $\vec r(\vec x; \vec p) = \vec 0$ for the state $\vec x$,
/// starting from the initial guess stored in `state`.
///
/// The iteration always runs in the plain arithmetic of `S::Real`, driven by `step_method`.
/// If `S` carries derivatives, the derivative slots of the solution are then recovered with
/// [`propagate_sensitivities`], so that they hold $\pd{\vec x}{\vec p}$ for the parameters
/// $\vec p$ the residual closes over. Derivatives stored in the initial guess are ignored.
///
/// On convergence, `state` holds the solution. If the iteration fails, `state` is left
/// untouched and the status of the returned record says why.
///
/// # Errors
///
/// Returns an error if the dimension of `state` does not match the residual, if the settings
/// are invalid, or if the Jacobian at the converged solution is singular. In the last case,
/// `state` holds the plain solution with all derivatives zero.
pub fn solve<'a, S, R, M>(
    step_method: &mut M,
    residual: &R,
    state: impl Into<DVectorViewMut<'a, S>>,
    settings: MinimizerSettings<S::Real>,
) -> Result<ConvergenceRecord<S::Real>, LocalSolveError>
where
    S: LocalScalar + EvalScalar<S>,
    S::Real: EvalScalar<S>,
    R: ResidualFunction<S> + ?Sized,
    M: StepMethod<S::Real> + ?Sized,
{
    let mut state = state.into();
    check_dimension("initial guess", residual.dimension(), state.nrows())?;

    let mut x = state.map(|s_i| s_i.value());
    let system = PlainSystem::<S, R>::new(residual);
    let record = Minimizer::new(settings).minimize(step_method, &system, &mut x)?;
    if !record.is_converged() {
        return Ok(record);
    }

    if has_derivatives::<S>() {
        propagate_sensitivities(residual, DVectorView::from(&x), state)?;
    } else {
        for (s_i, x_i) in state.iter_mut().zip(x.iter()) {
            *s_i = S::from_real(*x_i);
        }
    }

    Ok(record)
}
