use crate::minimizer::{ConvergenceRecord, Minimizer, MinimizerError, MinimizerSettings};
use crate::step::{eval_merit, newton_direction, StepError, StepMethod, StepOutcome};
use crate::system::LocalSystem;
use itertools::iterate;
use log::trace;
use nalgebra::{DMatrix, DVector, DVectorView, DVectorViewMut};
use numeric_literals::replace_float_literals;
use qpsolve_traits::Real;
use serde::{Deserialize, Serialize};

/// Attempts to solve the nonlinear system $\vec r(\vec x) = \vec 0$ with full Newton steps.
///
/// The solution is written to `x`, which also holds the initial guess.
pub fn newton<'a, T, F>(
    system: &F,
    x: impl Into<DVectorViewMut<'a, T>>,
    settings: MinimizerSettings<T>,
) -> Result<ConvergenceRecord<T>, MinimizerError>
where
    T: Real,
    F: LocalSystem<T> + ?Sized,
{
    Minimizer::new(settings).minimize(&mut NewtonStep, system, x)
}

/// A single, full Newton step.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewtonStep;

impl<T: Real> StepMethod<T> for NewtonStep {
    fn compute_step<F>(
        &mut self,
        _system: &F,
        _x: DVectorView<T>,
        r: DVectorView<T>,
        jacobian: &DMatrix<T>,
        mut dx: DVectorViewMut<T>,
    ) -> Result<StepOutcome, StepError>
    where
        F: LocalSystem<T> + ?Sized,
    {
        let p = newton_direction(jacobian, r)?;
        dx.copy_from(&p);
        Ok(StepOutcome { full_newton_step: true })
    }
}

/// Newton direction combined with a standard backtracking line search using the Armijo condition.
///
/// See Jorge & Nocedal (2006), Numerical Optimization, Chapter 3.1.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktrackingLineSearch<T> {
    /// The constant $c \in (0, 1)$ of the sufficient decrease condition.
    pub sufficient_decrease: T,
    /// Smallest step length tried before giving up.
    pub min_step_length: T,
}

impl<T: Real> Default for BacktrackingLineSearch<T> {
    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    fn default() -> Self {
        Self {
            sufficient_decrease: 1e-4,
            min_step_length: 1e-6,
        }
    }
}

impl<T: Real> StepMethod<T> for BacktrackingLineSearch<T> {
    #[replace_float_literals(T::from_f64(literal).unwrap())]
    fn compute_step<F>(
        &mut self,
        system: &F,
        x: DVectorView<T>,
        r: DVectorView<T>,
        jacobian: &DMatrix<T>,
        mut dx: DVectorViewMut<T>,
    ) -> Result<StepOutcome, StepError>
    where
        F: LocalSystem<T> + ?Sized,
    {
        // We seek to solve
        //  r(x) = 0
        // by minimizing
        //  g(x) = (1/2) || r(x) ||^2
        // along the Newton direction p. Since J p = -r, the directional derivative of g is
        //  (grad g)^T p = r^T J p = -|| r ||^2 = -2 g(x),
        // and the sufficient decrease condition
        //  g(x + alpha p) <= g(x) + c * alpha * (grad g)^T p
        // becomes
        //  g(x + alpha p) <= (1 - 2 c alpha) g(x).
        let c = self.sufficient_decrease;
        let p = newton_direction(jacobian, r)?;
        let g_initial = 0.5 * r.norm_squared();

        let x = x.clone_owned();
        let mut x_trial = x.clone();
        let mut r_trial = DVector::zeros(r.len());

        // Start out with some alphas that don't decrease too quickly, then
        // start decreasing them much faster if the first few steps are rejected.
        let initial_alphas = [1.0, 0.75, 0.5];
        let alphas = initial_alphas
            .iter()
            .copied()
            .chain(iterate(0.25, |alpha_i| 0.25 * *alpha_i));

        for alpha in alphas {
            if alpha < self.min_step_length {
                break;
            }

            x_trial.copy_from(&x);
            x_trial.axpy(alpha, &p, 1.0);
            let g = eval_merit(system, &mut r_trial, &x_trial);
            trace!("Line search: alpha = {}, merit = {} (initial {})", alpha, g, g_initial);

            if g.is_finite() && g <= (1.0 - 2.0 * c * alpha) * g_initial {
                dx.copy_from(&(&p * alpha));
                return Ok(StepOutcome {
                    full_newton_step: alpha == 1.0,
                });
            }
        }

        Err(StepError::LineSearchFailed)
    }
}
