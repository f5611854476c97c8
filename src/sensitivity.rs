//! Sensitivities of local solutions by the implicit function theorem.
use crate::error::LocalSolveError;
use crate::optimize::linear::solve_in_place;
use crate::residual::ResidualFunction;
use log::{trace, warn};
use nalgebra::{DMatrix, DMatrixViewMut, DVector, DVectorView, DVectorViewMut};
use qpsolve_traits::{has_derivatives, EvalScalar, LocalScalar};

pub(crate) fn check_dimension(what: &'static str, expected: usize, actual: usize) -> Result<(), LocalSolveError> {
    if expected == actual {
        Ok(())
    } else {
        Err(LocalSolveError::DimensionMismatch { what, expected, actual })
    }
}

/// Writes the converged plain solution $\vec x^*$ of a local problem into `state`, and fills
/// the derivative slots of `state` with the sensitivities of the solution.
///
/// Differentiating $\vec r(\vec x(\vec p); \vec p) = \vec 0$ with respect to the parameter
/// $p_k$ gives
/// $$
/// \pd{\vec x}{p_k} = - \vec J^{-1} \pd{\vec r}{p_k},
/// $$
/// where $\vec J$ is the Jacobian at $\vec x^*$. The right-hand sides for all parameters are
/// obtained from a single evaluation of the residual with dual scalars at $\vec x^*$, whose
/// derivatives come only from the inputs the residual closes over. The Jacobian is evaluated
/// once in plain arithmetic and factorized once for all parameters.
///
/// If `S` carries no derivative slots, only the values are written.
///
/// # Errors
///
/// Returns [`LocalSolveError::SingularJacobian`] if the Jacobian at the solution is not
/// invertible. In that case `state` still holds the plain solution, with all derivatives zero.
pub fn propagate_sensitivities<'a, S, R>(
    residual: &R,
    solution: DVectorView<S::Real>,
    state: impl Into<DVectorViewMut<'a, S>>,
) -> Result<(), LocalSolveError>
where
    S: LocalScalar + EvalScalar<S>,
    S::Real: EvalScalar<S>,
    R: ResidualFunction<S> + ?Sized,
{
    let mut state = state.into();
    let n = residual.dimension();
    check_dimension("solution", n, solution.nrows())?;
    check_dimension("state", n, state.nrows())?;

    for (s_i, x_i) in state.iter_mut().zip(solution.iter()) {
        *s_i = S::from_real(*x_i);
    }

    if !has_derivatives::<S>() || n == 0 {
        return Ok(());
    }

    let x_dual: DVector<S> = solution.map(S::from_real);
    let mut r_dual = DVector::<S>::zeros(n);
    residual.eval_residual(DVectorViewMut::from(&mut r_dual), DVectorView::from(&x_dual));

    // Negated, so that the solve yields dx/dp directly
    let mut dx_dp = DMatrix::from_fn(n, S::NUM_DERIVATIVES, |i, k| -r_dual[i].derivative(k));

    let mut jacobian = DMatrix::zeros(n, n);
    residual.eval_jacobian(DMatrixViewMut::from(&mut jacobian), solution);

    solve_in_place(jacobian, &mut dx_dp).map_err(|_| {
        warn!("Jacobian is singular at the converged solution, discarding sensitivities");
        LocalSolveError::SingularJacobian
    })?;
    trace!("Sensitivities of local solution: {}", dx_dp);

    for (i, s_i) in state.iter_mut().enumerate() {
        for (k, dxi_dpk) in dx_dp.row(i).iter().enumerate() {
            s_i.set_derivative(k, *dxi_dpk);
        }
    }

    Ok(())
}
