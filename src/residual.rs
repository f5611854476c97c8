//! Residual functions of local problems.
use crate::optimize::system::LocalSystem;
use nalgebra::{DMatrixViewMut, DVectorView, DVectorViewMut};
use qpsolve_traits::{EvalScalar, LocalScalar};
use std::marker::PhantomData;

/// A square nonlinear system $\vec r(\vec x; \vec p) = \vec 0$ whose inputs $\vec p$ are
/// local scalars of type `S`.
///
/// The residual and its Jacobian must be computable for every evaluation scalar `U` of `S`,
/// i.e. both for `S` itself and for its plain type `S::Real`. Inputs the function closes over
/// are converted with [`EvalScalar::from_input`], which drops their derivatives when `U` is
/// the plain type.
///
/// The plain evaluation drives the iterative solve, while a single evaluation with `U = S`
/// at the converged state provides the parameter sensitivities $\pd{\vec r}{\vec p}$.
pub trait ResidualFunction<S: LocalScalar> {
    fn dimension(&self) -> usize;

    /// Evaluates the residual $\vec r(\vec x)$ into `r`, overwriting every entry.
    fn eval_residual<U>(&self, r: DVectorViewMut<U>, x: DVectorView<U>)
    where
        U: EvalScalar<S>;

    /// Evaluates the Jacobian $\pd{r_i}{x_j}(\vec x)$ into `jacobian`.
    ///
    /// The output matrix is zeroed before the call.
    fn eval_jacobian<U>(&self, jacobian: DMatrixViewMut<U>, x: DVectorView<U>)
    where
        U: EvalScalar<S>;
}

impl<S, R> ResidualFunction<S> for &R
where
    S: LocalScalar,
    R: ResidualFunction<S> + ?Sized,
{
    fn dimension(&self) -> usize {
        R::dimension(self)
    }

    fn eval_residual<U>(&self, r: DVectorViewMut<U>, x: DVectorView<U>)
    where
        U: EvalScalar<S>,
    {
        R::eval_residual(self, r, x)
    }

    fn eval_jacobian<U>(&self, jacobian: DMatrixViewMut<U>, x: DVectorView<U>)
    where
        U: EvalScalar<S>,
    {
        R::eval_jacobian(self, jacobian, x)
    }
}

/// Views a residual function as a [`LocalSystem`] in the plain arithmetic of `S::Real`.
pub struct PlainSystem<'a, S, R: ?Sized> {
    residual: &'a R,
    marker: PhantomData<fn() -> S>,
}

impl<'a, S, R: ?Sized> PlainSystem<'a, S, R> {
    pub fn new(residual: &'a R) -> Self {
        Self {
            residual,
            marker: PhantomData,
        }
    }
}

impl<S, R> LocalSystem<S::Real> for PlainSystem<'_, S, R>
where
    S: LocalScalar,
    S::Real: EvalScalar<S>,
    R: ResidualFunction<S> + ?Sized,
{
    fn dimension(&self) -> usize {
        <R as ResidualFunction<S>>::dimension(self.residual)
    }

    fn eval_residual_into(&self, r: DVectorViewMut<S::Real>, x: DVectorView<S::Real>) {
        <R as ResidualFunction<S>>::eval_residual(self.residual, r, x)
    }

    fn eval_jacobian_into(&self, jacobian: DMatrixViewMut<S::Real>, x: DVectorView<S::Real>) {
        <R as ResidualFunction<S>>::eval_jacobian(self.residual, jacobian, x)
    }
}
