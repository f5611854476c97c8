//! Small-strain von Mises plasticity with isotropic hardening.
//!
//! The elastic domain is bounded by the yield function
//! $$
//! f(\vec \sigma, \alpha) = q(\vec \sigma) - \sigma_y(\alpha) \leq 0,
//! $$
//! where $q$ is the von Mises stress and $\alpha$ the equivalent plastic strain. Plastic flow
//! follows the associative flow rule, and the stress is updated with the radial return
//! algorithm: for a trial stress $\vec \sigma^{tr}$ outside the elastic domain, the plastic
//! multiplier $\Delta \gamma$ solves the scalar consistency condition
//! $$
//! q^{tr} - 3 \mu \Delta \gamma - \sigma_y(\alpha + \Delta \gamma) = 0.
//! $$
use crate::error::ConstitutiveError;
use crate::materials::{deviatoric_part, von_mises_stress, LameParameters};
use log::{debug, trace};
use numeric_literals::replace_float_literals;
use qpsolve::nalgebra::{self, DMatrixViewMut, DVector, DVectorView, DVectorViewMut, Matrix3};
use qpsolve::optimize::minimizer::MinimizerSettings;
use qpsolve::optimize::step::StepMethod;
use qpsolve::{solve, EvalScalar, LocalScalar, ResidualFunction};
use serde::{Deserialize, Serialize};

/// Isotropic hardening with a linear and an exponentially saturating (Voce) contribution,
/// $$
/// \sigma_y(\alpha) = \sigma_{y0} + H \alpha + Q (1 - e^{-b \alpha}).
/// $$
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VoceHardening<T> {
    /// The initial yield stress $\sigma_{y0}$.
    pub initial_yield_stress: T,
    /// The linear hardening modulus $H$.
    pub linear_modulus: T,
    /// The saturation stress $Q$.
    pub saturation_stress: T,
    /// The saturation rate $b$.
    pub saturation_rate: T,
}

impl<S: LocalScalar> VoceHardening<S> {
    /// Hardening without the saturating contribution.
    pub fn linear(initial_yield_stress: S, linear_modulus: S) -> Self {
        Self {
            initial_yield_stress,
            linear_modulus,
            saturation_stress: S::zero(),
            saturation_rate: S::zero(),
        }
    }

    pub fn yield_stress(&self, equivalent_plastic_strain: S) -> S {
        let alpha = equivalent_plastic_strain;
        let saturation = S::one() - (-self.saturation_rate * alpha).exp();
        self.initial_yield_stress + self.linear_modulus * alpha + self.saturation_stress * saturation
    }

    /// The hardening modulus $\sigma_y'(\alpha)$.
    pub fn yield_stress_derivative(&self, equivalent_plastic_strain: S) -> S {
        let alpha = equivalent_plastic_strain;
        self.linear_modulus + self.saturation_stress * self.saturation_rate * (-self.saturation_rate * alpha).exp()
    }

    pub fn to_eval<U: EvalScalar<S>>(&self) -> VoceHardening<U> {
        VoceHardening {
            initial_yield_stress: U::from_input(self.initial_yield_stress),
            linear_modulus: U::from_input(self.linear_modulus),
            saturation_stress: U::from_input(self.saturation_stress),
            saturation_rate: U::from_input(self.saturation_rate),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct J2Plasticity<T> {
    pub elasticity: LameParameters<T>,
    pub hardening: VoceHardening<T>,
}

/// Internal variables of [`J2Plasticity`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PlasticState<S> {
    pub plastic_strain: Matrix3<S>,
    pub equivalent_plastic_strain: S,
}

impl<S: LocalScalar> PlasticState<S> {
    /// The virgin state without plastic deformation.
    pub fn initial() -> Self {
        Self {
            plastic_strain: Matrix3::zeros(),
            equivalent_plastic_strain: S::zero(),
        }
    }
}

/// The consistency condition of the radial return, normalized by the initial yield stress.
///
/// The unknown is the plastic multiplier $\Delta \gamma$.
#[derive(Debug)]
pub struct ReturnMappingResidual<'a, S> {
    trial_von_mises_stress: S,
    equivalent_plastic_strain: S,
    shear_modulus: S,
    hardening: &'a VoceHardening<S>,
}

impl<'a, S: LocalScalar> ResidualFunction<S> for ReturnMappingResidual<'a, S> {
    fn dimension(&self) -> usize {
        1
    }

    #[replace_float_literals(U::from_literal(literal))]
    fn eval_residual<U: EvalScalar<S>>(&self, mut r: DVectorViewMut<U>, x: DVectorView<U>) {
        let delta_gamma = x[0];
        let q_trial = U::from_input(self.trial_von_mises_stress);
        let alpha = U::from_input(self.equivalent_plastic_strain);
        let mu = U::from_input(self.shear_modulus);
        let hardening = self.hardening.to_eval::<U>();

        r[0] = (q_trial - 3.0 * mu * delta_gamma - hardening.yield_stress(alpha + delta_gamma))
            / hardening.initial_yield_stress;
    }

    #[replace_float_literals(U::from_literal(literal))]
    fn eval_jacobian<U: EvalScalar<S>>(&self, mut jacobian: DMatrixViewMut<U>, x: DVectorView<U>) {
        let delta_gamma = x[0];
        let alpha = U::from_input(self.equivalent_plastic_strain);
        let mu = U::from_input(self.shear_modulus);
        let hardening = self.hardening.to_eval::<U>();

        jacobian[(0, 0)] =
            -(3.0 * mu + hardening.yield_stress_derivative(alpha + delta_gamma)) / hardening.initial_yield_stress;
    }
}

impl<S: LocalScalar> J2Plasticity<S> {
    pub fn validate(&self) -> Result<(), ConstitutiveError> {
        let zero = nalgebra::zero::<S::Real>();
        if !(self.elasticity.mu.value() > zero) {
            return Err(ConstitutiveError::InvalidParameters(
                "shear modulus must be positive".to_string(),
            ));
        }
        if !(self.hardening.initial_yield_stress.value() > zero) {
            return Err(ConstitutiveError::InvalidParameters(
                "initial yield stress must be positive".to_string(),
            ));
        }
        if self.hardening.linear_modulus.value() < zero
            || self.hardening.saturation_stress.value() < zero
            || self.hardening.saturation_rate.value() < zero
        {
            return Err(ConstitutiveError::InvalidParameters(
                "hardening parameters must be non-negative".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the return mapping residual for the given trial state.
    pub fn return_mapping_residual(
        &self,
        trial_von_mises_stress: S,
        equivalent_plastic_strain: S,
    ) -> ReturnMappingResidual<'_, S> {
        ReturnMappingResidual {
            trial_von_mises_stress,
            equivalent_plastic_strain,
            shear_modulus: self.elasticity.mu,
            hardening: &self.hardening,
        }
    }

    /// Computes the stress for the total strain `strain`, updating the internal variables in
    /// `state`.
    ///
    /// If the strain or the material parameters carry derivatives, so do the returned stress
    /// and the updated state. With derivatives taken with respect to the strain, the stress
    /// derivatives form the consistent tangent.
    ///
    /// On error, `state` is left untouched.
    #[replace_float_literals(S::from_literal(literal))]
    pub fn update<M>(
        &self,
        step_method: &mut M,
        strain: &Matrix3<S>,
        state: &mut PlasticState<S>,
        settings: MinimizerSettings<S::Real>,
    ) -> Result<Matrix3<S>, ConstitutiveError>
    where
        S: EvalScalar<S>,
        S::Real: EvalScalar<S>,
        M: StepMethod<S::Real> + ?Sized,
    {
        self.validate()?;
        let mu = self.elasticity.mu;
        let alpha = state.equivalent_plastic_strain;

        let trial_stress = self.elasticity.stress(&(strain - state.plastic_strain));
        let q_trial = von_mises_stress(&trial_stress);
        let trial_yield_function = q_trial - self.hardening.yield_stress(alpha);
        if trial_yield_function.value() <= nalgebra::zero::<S::Real>() {
            return Ok(trial_stress);
        }

        let residual = self.return_mapping_residual(q_trial, alpha);
        let mut delta_gamma = DVector::from_element(1, S::zero());
        let record = solve(step_method, &residual, &mut delta_gamma, settings)?;
        if !record.is_converged() {
            debug!("J2 return mapping failed: {}", record.status);
            return Err(ConstitutiveError::NotConverged { status: record.status });
        }
        trace!("J2 return mapping converged in {} iterations", record.iterations);

        let delta_gamma = delta_gamma[0];
        let flow_direction = deviatoric_part(&trial_stress) * (1.5 / q_trial);
        state.plastic_strain += flow_direction * delta_gamma;
        state.equivalent_plastic_strain = alpha + delta_gamma;
        Ok(trial_stress - flow_direction * (2.0 * mu * delta_gamma))
    }
}
