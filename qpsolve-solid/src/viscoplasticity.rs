//! One-dimensional overstress viscoplasticity with a Norton power law.
//!
//! The viscous strain rate is
//! $$
//! \dot \varepsilon^v = \left\langle \frac{|\sigma| - \sigma_y}{K} \right\rangle^n
//!     \operatorname{sign}(\sigma),
//! $$
//! with the stress $\sigma = E (\varepsilon - \varepsilon^v)$. A backward Euler step over
//! the time step $\Delta t$ gives the scalar residual
//! $$
//! r(\sigma) = \frac{\sigma - \sigma^{tr}}{\sigma_y}
//!     + \frac{E \Delta t}{\sigma_y} \left\langle \frac{|\sigma| - \sigma_y}{K} \right\rangle^n
//!     \operatorname{sign}(\sigma),
//! $$
//! where $\sigma^{tr} = E (\varepsilon_{n+1} - \varepsilon^v_n)$ is the elastic trial stress.
//!
//! For large exponents and large increments, Newton's method converges slowly from the trial
//! stress. Updates that fail to converge are retried by recursively splitting the increment
//! into two halves.
use crate::error::ConstitutiveError;
use log::{debug, trace};
use qpsolve::nalgebra::{self, DMatrixViewMut, DVector, DVectorView, DVectorViewMut};
use qpsolve::optimize::minimizer::{ConvergenceStatus, MinimizerSettings};
use qpsolve::optimize::step::StepMethod;
use qpsolve::{solve, EvalScalar, LocalScalar, ResidualFunction};
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NortonViscoplasticity<T> {
    /// Young's modulus $E$.
    pub young_modulus: T,
    pub yield_stress: T,
    /// The drag stress $K$.
    pub drag_stress: T,
    /// The Norton exponent $n$.
    pub exponent: i32,
    /// How many times an increment may be halved recursively after a failed update.
    pub max_substep_depth: usize,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ViscoplasticState<S> {
    /// Total strain at the end of the last update.
    pub strain: S,
    pub viscous_strain: S,
}

impl<S: LocalScalar> ViscoplasticState<S> {
    pub fn initial() -> Self {
        Self {
            strain: S::zero(),
            viscous_strain: S::zero(),
        }
    }
}

#[derive(Debug)]
pub struct OverstressResidual<'a, S: LocalScalar> {
    model: &'a NortonViscoplasticity<S>,
    trial_stress: S,
    time_step: S::Real,
}

impl<'a, S: LocalScalar> OverstressResidual<'a, S> {
    /// The flow function and its derivative with respect to the stress.
    fn flow<U: EvalScalar<S>>(&self, stress: U) -> (U, U) {
        let yield_stress = U::from_input(self.model.yield_stress);
        let drag_stress = U::from_input(self.model.drag_stress);
        let n = self.model.exponent;

        let overstress = stress.abs() - yield_stress;
        let zero = nalgebra::zero::<U::Real>();
        if overstress.value() <= zero {
            return (U::zero(), U::zero());
        }

        let ratio = overstress / drag_stress;
        let magnitude = ratio.powi(n);
        let rate = if stress.value() >= zero { magnitude } else { -magnitude };
        let rate_derivative = U::from_literal(f64::from(n)) * ratio.powi(n - 1) / drag_stress;
        (rate, rate_derivative)
    }
}

impl<'a, S: LocalScalar> ResidualFunction<S> for OverstressResidual<'a, S> {
    fn dimension(&self) -> usize {
        1
    }

    fn eval_residual<U: EvalScalar<S>>(&self, mut r: DVectorViewMut<U>, x: DVectorView<U>) {
        let stress = x[0];
        let trial_stress = U::from_input(self.trial_stress);
        let young_modulus = U::from_input(self.model.young_modulus);
        let yield_stress = U::from_input(self.model.yield_stress);
        let time_step = U::from_plain(self.time_step);
        let (rate, _) = self.flow(stress);

        r[0] = (stress - trial_stress + young_modulus * rate * time_step) / yield_stress;
    }

    fn eval_jacobian<U: EvalScalar<S>>(&self, mut jacobian: DMatrixViewMut<U>, x: DVectorView<U>) {
        let young_modulus = U::from_input(self.model.young_modulus);
        let yield_stress = U::from_input(self.model.yield_stress);
        let time_step = U::from_plain(self.time_step);
        let (_, rate_derivative) = self.flow(x[0]);

        jacobian[(0, 0)] = (U::one() + young_modulus * rate_derivative * time_step) / yield_stress;
    }
}

fn is_recoverable(status: ConvergenceStatus) -> bool {
    matches!(
        status,
        ConvergenceStatus::NonConvergence | ConvergenceStatus::MaxIterationsExceeded
    )
}

impl<S: LocalScalar> NortonViscoplasticity<S> {
    pub fn validate(&self) -> Result<(), ConstitutiveError> {
        let zero = nalgebra::zero::<S::Real>();
        if !(self.young_modulus.value() > zero && self.drag_stress.value() > zero) {
            return Err(ConstitutiveError::InvalidParameters(
                "Young's modulus and drag stress must be positive".to_string(),
            ));
        }
        if !(self.yield_stress.value() > zero) {
            return Err(ConstitutiveError::InvalidParameters(
                "yield stress must be positive".to_string(),
            ));
        }
        if self.exponent < 1 {
            return Err(ConstitutiveError::InvalidParameters(format!(
                "Norton exponent must be at least 1, but is {}",
                self.exponent
            )));
        }
        Ok(())
    }

    pub fn overstress_residual(&self, trial_stress: S, time_step: S::Real) -> OverstressResidual<'_, S> {
        OverstressResidual {
            model: self,
            trial_stress,
            time_step,
        }
    }

    /// Computes the stress at the total strain `strain` after the time step `time_step`,
    /// updating `state`.
    ///
    /// If the local solve does not converge or exceeds its iteration limit, the increment from
    /// `state.strain` to `strain` is split into two halves, each taking half the time step,
    /// up to [`max_substep_depth`](Self::max_substep_depth) times. A numerically singular
    /// Jacobian or a failed sensitivity computation ends the update immediately.
    ///
    /// On error, `state` is left untouched.
    pub fn update<M>(
        &self,
        step_method: &mut M,
        strain: S,
        time_step: S::Real,
        state: &mut ViscoplasticState<S>,
        settings: MinimizerSettings<S::Real>,
    ) -> Result<S, ConstitutiveError>
    where
        S: EvalScalar<S>,
        S::Real: EvalScalar<S>,
        M: StepMethod<S::Real> + ?Sized,
    {
        self.validate()?;
        let (stress, viscous_strain) = self.update_substepped(
            step_method,
            state.strain,
            strain,
            time_step,
            state.viscous_strain,
            0,
            settings,
        )?;
        state.strain = strain;
        state.viscous_strain = viscous_strain;
        Ok(stress)
    }

    #[allow(clippy::too_many_arguments)]
    fn update_substepped<M>(
        &self,
        step_method: &mut M,
        strain_start: S,
        strain_end: S,
        time_step: S::Real,
        viscous_strain: S,
        depth: usize,
        settings: MinimizerSettings<S::Real>,
    ) -> Result<(S, S), ConstitutiveError>
    where
        S: EvalScalar<S>,
        S::Real: EvalScalar<S>,
        M: StepMethod<S::Real> + ?Sized,
    {
        match self.update_single(step_method, strain_end, time_step, viscous_strain, settings) {
            Err(ConstitutiveError::NotConverged { status }) if is_recoverable(status) => {
                if depth >= self.max_substep_depth {
                    return Err(ConstitutiveError::SubsteppingExhausted {
                        max_depth: self.max_substep_depth,
                        status,
                    });
                }
                debug!(
                    "Norton update failed ({}), retrying with sub-steps at depth {}",
                    status,
                    depth + 1
                );
                let strain_mid = (strain_start + strain_end) * S::from_literal(0.5);
                let half_step = time_step * nalgebra::convert::<f64, S::Real>(0.5);
                let (_, viscous_strain_mid) = self.update_substepped(
                    step_method,
                    strain_start,
                    strain_mid,
                    half_step,
                    viscous_strain,
                    depth + 1,
                    settings,
                )?;
                self.update_substepped(
                    step_method,
                    strain_mid,
                    strain_end,
                    half_step,
                    viscous_strain_mid,
                    depth + 1,
                    settings,
                )
            }
            result => result,
        }
    }

    /// A single backward Euler step. Returns the stress and the viscous strain.
    fn update_single<M>(
        &self,
        step_method: &mut M,
        strain: S,
        time_step: S::Real,
        viscous_strain: S,
        settings: MinimizerSettings<S::Real>,
    ) -> Result<(S, S), ConstitutiveError>
    where
        S: EvalScalar<S>,
        S::Real: EvalScalar<S>,
        M: StepMethod<S::Real> + ?Sized,
    {
        let trial_stress = self.young_modulus * (strain - viscous_strain);
        if trial_stress.abs().value() <= self.yield_stress.value() {
            return Ok((trial_stress, viscous_strain));
        }

        let residual = self.overstress_residual(trial_stress, time_step);
        let mut stress = DVector::from_element(1, trial_stress);
        let record = solve(step_method, &residual, &mut stress, settings)?;
        if !record.is_converged() {
            return Err(ConstitutiveError::NotConverged { status: record.status });
        }
        trace!("Norton update converged in {} iterations", record.iterations);

        let stress = stress[0];
        let viscous_strain = viscous_strain + (trial_stress - stress) / self.young_modulus;
        Ok((stress, viscous_strain))
    }
}
