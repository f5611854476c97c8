//! Finite-difference approximations, mostly useful for verifying hand-written Jacobians and
//! sensitivities obtained from local solves.
use crate::system::LocalSystem;
use nalgebra::{DMatrix, DMatrixViewMut, DVector, DVectorView, DVectorViewMut};
use numeric_literals::replace_float_literals;
use qpsolve_traits::Real;

/// Approximates the Jacobian of `system` at `x` with central differences of resolution `h`.
pub fn approximate_jacobian<T, F>(system: &F, x: &DVector<T>, h: T) -> DMatrix<T>
where
    T: Real,
    F: LocalSystem<T> + ?Sized,
{
    let mut x_work = x.clone();
    approximate_jacobian_fd(
        system.dimension(),
        |x, r| system.eval_residual_into(r, x),
        &mut x_work,
        h,
    )
}

/// Approximates the $m \times n$ Jacobian $J_{ij} = \pd{f_i}{x_j}$ of a function
/// $f: \mathbb{R}^n \rightarrow \mathbb{R}^m$, given as `f(x, output)`.
///
/// `x` is used as scratch space for the perturbed arguments, but holds its original content
/// again when the function returns.
pub fn approximate_jacobian_fd<'a, T>(
    m: usize,
    f: impl FnMut(DVectorView<T>, DVectorViewMut<T>),
    x: impl Into<DVectorViewMut<'a, T>>,
    h: T,
) -> DMatrix<T>
where
    T: Real,
{
    let x = x.into();
    let mut jacobian = DMatrix::zeros(m, x.len());
    approximate_jacobian_fd_into(&mut jacobian, f, x, h);
    jacobian
}

/// Same as [`approximate_jacobian_fd`], writing into an existing matrix.
///
/// # Panics
///
/// Panics if the number of columns of `jacobian` differs from the dimension of `x`.
pub fn approximate_jacobian_fd_into<'a, 'b, T>(
    jacobian: impl Into<DMatrixViewMut<'b, T>>,
    mut f: impl FnMut(DVectorView<T>, DVectorViewMut<T>),
    x: impl Into<DVectorViewMut<'a, T>>,
    h: T,
) where
    T: Real,
{
    let mut jacobian = jacobian.into();
    let mut x = x.into();
    assert_eq!(
        jacobian.ncols(),
        x.len(),
        "Jacobian must have one column per argument."
    );

    let mut f_forward = DVector::zeros(jacobian.nrows());
    let mut f_backward = DVector::zeros(jacobian.nrows());
    for j in 0..x.len() {
        let x_j = x[j];
        let mut eval_shifted = |shift: T, output: &mut DVector<T>| {
            x[j] = x_j + shift;
            f(DVectorView::from(&x), DVectorViewMut::from(output));
        };
        eval_shifted(h, &mut f_forward);
        eval_shifted(-h, &mut f_backward);
        x[j] = x_j;

        jacobian
            .column_mut(j)
            .copy_from(&central_difference(&f_forward, &f_backward, h));
    }
}

/// Approximates the derivative of a vector-valued function of a single parameter,
/// $\vec f: \mathbb{R} \rightarrow \mathbb{R}^m$, at `p`.
///
/// Typically `f` re-solves a local problem for a perturbed parameter.
pub fn approximate_derivative_fd<T>(mut f: impl FnMut(T) -> DVector<T>, p: T, h: T) -> DVector<T>
where
    T: Real,
{
    let f_forward = f(p + h);
    let f_backward = f(p - h);
    central_difference(&f_forward, &f_backward, h)
}

#[replace_float_literals(T::from_f64(literal).unwrap())]
fn central_difference<T: Real>(f_forward: &DVector<T>, f_backward: &DVector<T>, h: T) -> DVector<T> {
    (f_forward - f_backward) / (2.0 * h)
}
