use nalgebra::storage::StorageMut;
use nalgebra::{DMatrix, Dim, Dyn, Matrix};
use qpsolve_traits::Real;
use thiserror::Error;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Error)]
#[error("matrix is singular to working precision")]
pub struct SingularMatrixError;

/// Solves the square system `A X = B`, overwriting `B` with `X`.
///
/// The rows of the system are equilibrated by their largest entry before factorization, so the
/// singularity test does not depend on how individual equations are scaled. The matrix is deemed
/// singular if a row vanishes, if a pivot of the equilibrated LU factorization is smaller than
/// `n * eps` relative to the largest pivot, or if the computed solution is not finite.
///
/// # Panics
///
/// Panics if `A` is not square or if the number of rows of `A` and `B` differ.
pub fn solve_in_place<T, C, S>(mut matrix: DMatrix<T>, rhs: &mut Matrix<T, Dyn, C, S>) -> Result<(), SingularMatrixError>
where
    T: Real,
    C: Dim,
    S: StorageMut<T, Dyn, C>,
{
    assert!(matrix.is_square(), "Matrix must be square.");
    assert_eq!(matrix.nrows(), rhs.nrows(), "Right-hand side must have as many rows as the matrix.");

    let n = matrix.nrows();
    if n == 0 {
        return Ok(());
    }

    for i in 0..n {
        let row_scale = matrix.row(i).amax();
        if !(row_scale > T::zero() && row_scale.is_finite()) {
            return Err(SingularMatrixError);
        }
        matrix.row_mut(i).unscale_mut(row_scale);
        rhs.row_mut(i).unscale_mut(row_scale);
    }

    let lu = matrix.lu();
    let pivots = lu.u().diagonal();
    let largest = pivots.amax();
    let smallest = pivots.amin();
    let threshold = largest * T::default_epsilon() * nalgebra::convert::<f64, T>(n as f64);

    if !(largest > T::zero()) || smallest <= threshold {
        return Err(SingularMatrixError);
    }

    if lu.solve_mut(rhs) && rhs.iter().all(|x_i| x_i.is_finite()) {
        Ok(())
    } else {
        Err(SingularMatrixError)
    }
}
