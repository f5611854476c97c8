//! Powell's dogleg method.
//!
//! The step minimizes the quadratic model
//! $$
//! m(\vec p) = \frac{1}{2} \norm{\vec r + \vec J \vec p}^2
//! $$
//! along the piecewise linear path from the current iterate through the Cauchy point
//! $\vec p_c = -\alpha \vec g$, with $\vec g = \vec J^T \vec r$ and
//! $\alpha = \norm{\vec g}^2 / \norm{\vec J \vec g}^2$, to the Newton point
//! $\vec p_n = -\vec J^{-1} \vec r$, truncated at the trust region radius $\Delta$.
//!
//! When the Jacobian is singular the Newton point does not exist and the step falls back to
//! the (truncated) Cauchy point, so the method still makes progress on rank-deficient systems.
use crate::step::{eval_merit, newton_direction, StepError, StepMethod, StepOutcome};
use crate::system::LocalSystem;
use log::trace;
use nalgebra::{DMatrix, DVector, DVectorView, DVectorViewMut};
use numeric_literals::replace_float_literals;
use qpsolve_traits::Real;
use serde::{Deserialize, Serialize};

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoglegTrustRegion<T> {
    pub initial_radius: T,
    pub max_radius: T,
    /// The method fails once the radius shrinks below this value.
    pub min_radius: T,
    /// Minimum ratio of actual to predicted reduction for a step to be accepted.
    pub acceptance_ratio: T,
    #[serde(skip)]
    radius: Option<T>,
}

impl<T: Real> Default for DoglegTrustRegion<T> {
    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    fn default() -> Self {
        Self {
            initial_radius: 1.0,
            max_radius: 1e6,
            min_radius: 1e-12,
            acceptance_ratio: 1e-4,
            radius: None,
        }
    }
}

impl<T: Real> DoglegTrustRegion<T> {
    pub fn with_initial_radius(initial_radius: T) -> Self {
        Self {
            initial_radius,
            ..Self::default()
        }
    }

    /// The current trust region radius.
    pub fn radius(&self) -> T {
        self.radius.unwrap_or(self.initial_radius)
    }
}

/// Returns the dogleg point for radius `delta`, and whether it is the Newton point.
#[replace_float_literals(T::from_f64(literal).unwrap())]
fn dogleg_point<T: Real>(newton: Option<&DVector<T>>, cauchy: &DVector<T>, delta: T) -> (DVector<T>, bool) {
    if let Some(p_n) = newton {
        if p_n.norm() <= delta {
            return (p_n.clone(), true);
        }
    }

    let cauchy_norm = cauchy.norm();
    if cauchy_norm >= delta {
        return (cauchy * (delta / cauchy_norm), false);
    }

    match newton {
        Some(p_n) => {
            // Find beta in [0, 1] with || p_c + beta v || = delta, v = p_n - p_c.
            // The two forms of the root avoid cancellation.
            let v = p_n - cauchy;
            let a = v.norm_squared();
            let b = cauchy.dot(&v);
            let c = cauchy.norm_squared() - delta * delta;
            let sqrt_discriminant = (b * b - a * c).sqrt();
            let beta = if b <= 0.0 {
                (sqrt_discriminant - b) / a
            } else {
                -c / (b + sqrt_discriminant)
            };
            (cauchy + v * beta, false)
        }
        None => (cauchy.clone(), false),
    }
}

impl<T: Real> StepMethod<T> for DoglegTrustRegion<T> {
    fn reset(&mut self) {
        self.radius = None;
    }

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
        let g = jacobian.tr_mul(&r);
        let j_g = jacobian * &g;
        let j_g_norm_squared = j_g.norm_squared();
        if j_g_norm_squared == 0.0 {
            // J^T r = 0 while r != 0
            return Err(StepError::StationaryPoint);
        }

        let cauchy = &g * (-g.norm_squared() / j_g_norm_squared);
        let newton = newton_direction(jacobian, r).ok();
        let merit_initial = 0.5 * r.norm_squared();

        let x = x.clone_owned();
        let mut r_trial = DVector::zeros(r.len());
        let mut delta = self.radius();

        loop {
            let (p, is_newton_point) = dogleg_point(newton.as_ref(), &cauchy, delta);
            let p_norm = p.norm();

            // m(0) - m(p) = -(g^T p + 1/2 || J p ||^2)
            let predicted = -(g.dot(&p) + 0.5 * (jacobian * &p).norm_squared());
            let merit = eval_merit(system, &mut r_trial, &(&x + &p));
            let actual = merit_initial - merit;
            let rho = if predicted > 0.0 && merit.is_finite() {
                actual / predicted
            } else {
                -1.0
            };
            trace!("Dogleg: radius = {}, |p| = {}, rho = {}", delta, p_norm, rho);

            if rho > self.acceptance_ratio {
                if rho < 0.25 {
                    delta = 0.25 * p_norm;
                } else if rho > 0.75 && p_norm >= 0.99 * delta {
                    delta = T::min(2.0 * delta, self.max_radius);
                }
                self.radius = Some(delta);
                dx.copy_from(&p);
                return Ok(StepOutcome {
                    full_newton_step: is_newton_point,
                });
            }

            delta = 0.25 * p_norm;
            if delta < self.min_radius {
                self.radius = Some(delta);
                return Err(StepError::TrustRegionCollapsed);
            }
        }
    }
}
