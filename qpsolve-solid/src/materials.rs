use numeric_literals::replace_float_literals;
use qpsolve::nalgebra::Matrix3;
use qpsolve::{EvalScalar, LocalScalar};
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LameParameters<T> {
    pub mu: T,
    pub lambda: T,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct YoungPoisson<T> {
    pub young: T,
    pub poisson: T,
}

impl<S> From<YoungPoisson<S>> for LameParameters<S>
where
    S: LocalScalar,
{
    #[replace_float_literals(S::from_literal(literal))]
    fn from(params: YoungPoisson<S>) -> Self {
        let YoungPoisson { young, poisson } = params;
        let mu = 0.5 * young / (1.0 + poisson);
        let lambda = 2.0 * mu * poisson / (1.0 - 2.0 * poisson);
        Self { mu, lambda }
    }
}

impl<S: LocalScalar> LameParameters<S> {
    #[replace_float_literals(S::from_literal(literal))]
    pub fn bulk_modulus(&self) -> S {
        self.lambda + 2.0 * self.mu / 3.0
    }

    /// Computes the linear elastic stress
    /// $$
    /// \vec \sigma = 2 \mu \vec \epsilon + \lambda \operatorname{tr}(\vec \epsilon) \vec I
    /// $$
    /// of the infinitesimal strain $\vec \epsilon$.
    #[replace_float_literals(S::from_literal(literal))]
    pub fn stress(&self, strain: &Matrix3<S>) -> Matrix3<S> {
        strain * (2.0 * self.mu) + Matrix3::<S>::identity() * (self.lambda * strain.trace())
    }

    /// Converts the parameters into an evaluation scalar of `S`.
    pub fn to_eval<U: EvalScalar<S>>(&self) -> LameParameters<U> {
        LameParameters {
            mu: U::from_input(self.mu),
            lambda: U::from_input(self.lambda),
        }
    }
}

/// The deviatoric part $\vec A - \frac{1}{3} \operatorname{tr}(\vec A) \vec I$ of a tensor.
#[replace_float_literals(S::from_literal(literal))]
pub fn deviatoric_part<S: LocalScalar>(tensor: &Matrix3<S>) -> Matrix3<S> {
    tensor - Matrix3::<S>::identity() * (tensor.trace() / 3.0)
}

/// The von Mises equivalent stress $\sqrt{\frac{3}{2} \vec s : \vec s}$, where $\vec s$ is the
/// deviatoric part of `stress`.
#[replace_float_literals(S::from_literal(literal))]
pub fn von_mises_stress<S: LocalScalar>(stress: &Matrix3<S>) -> S {
    let s = deviatoric_part(stress);
    (1.5 * s.dot(&s)).sqrt()
}
