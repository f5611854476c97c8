use nalgebra::{DMatrixViewMut, DVectorView, DVectorViewMut, Matrix3, Vector3};
use numeric_literals::replace_numeric_literals;
use qpsolve_optimize::system::LocalSystem;

mod linear;

/// The linear system A x = b.
pub struct MockLinearSystem;

impl MockLinearSystem {
    #[replace_numeric_literals(f64::from(literal))]
    fn matrix() -> Matrix3<f64> {
        Matrix3::new(5, 1, 2, 1, 4, 2, 2, 2, 4)
    }

    pub fn solution() -> Vector3<f64> {
        Vector3::new(-0.125, 0.16666666666666666, 0.7291666666666666)
    }
}

impl LocalSystem<f64> for MockLinearSystem {
    fn dimension(&self) -> usize {
        3
    }

    fn eval_residual_into(&self, mut r: DVectorViewMut<f64>, x: DVectorView<f64>) {
        let b = Vector3::new(1.0, 2.0, 3.0);
        r.copy_from(&(Self::matrix() * x - b));
    }

    fn eval_jacobian_into(&self, mut jacobian: DMatrixViewMut<f64>, _x: DVectorView<f64>) {
        jacobian.copy_from(&Self::matrix());
    }
}

/// The system r(x) = (10 (x_1 - x_0^2), 1 - x_0), whose only root is (1, 1).
pub struct RosenbrockSystem;

impl LocalSystem<f64> for RosenbrockSystem {
    fn dimension(&self) -> usize {
        2
    }

    fn eval_residual_into(&self, mut r: DVectorViewMut<f64>, x: DVectorView<f64>) {
        r[0] = 10.0 * (x[1] - x[0] * x[0]);
        r[1] = 1.0 - x[0];
    }

    fn eval_jacobian_into(&self, mut jacobian: DMatrixViewMut<f64>, x: DVectorView<f64>) {
        jacobian[(0, 0)] = -20.0 * x[0];
        jacobian[(0, 1)] = 10.0;
        jacobian[(1, 0)] = -1.0;
        jacobian[(1, 1)] = 0.0;
    }
}

/// The scalar residual r(x) = x^2 + 1, which has no real root.
pub struct NoRealRootSystem;

impl LocalSystem<f64> for NoRealRootSystem {
    fn dimension(&self) -> usize {
        1
    }

    fn eval_residual_into(&self, mut r: DVectorViewMut<f64>, x: DVectorView<f64>) {
        r[0] = x[0] * x[0] + 1.0;
    }

    fn eval_jacobian_into(&self, mut jacobian: DMatrixViewMut<f64>, x: DVectorView<f64>) {
        jacobian[(0, 0)] = 2.0 * x[0];
    }
}

/// The scalar residual r(x) = atan(x), for which full Newton steps diverge if |x_0| > 1.39.
pub struct ArctanSystem;

impl LocalSystem<f64> for ArctanSystem {
    fn dimension(&self) -> usize {
        1
    }

    fn eval_residual_into(&self, mut r: DVectorViewMut<f64>, x: DVectorView<f64>) {
        r[0] = x[0].atan();
    }

    fn eval_jacobian_into(&self, mut jacobian: DMatrixViewMut<f64>, x: DVectorView<f64>) {
        jacobian[(0, 0)] = 1.0 / (1.0 + x[0] * x[0]);
    }
}

/// The rank-deficient system r(x) = (x_0 + x_1 - 1, x_0 + x_1 - 1).
pub struct RankDeficientSystem;

impl LocalSystem<f64> for RankDeficientSystem {
    fn dimension(&self) -> usize {
        2
    }

    fn eval_residual_into(&self, mut r: DVectorViewMut<f64>, x: DVectorView<f64>) {
        r[0] = x[0] + x[1] - 1.0;
        r[1] = x[0] + x[1] - 1.0;
    }

    fn eval_jacobian_into(&self, mut jacobian: DMatrixViewMut<f64>, _x: DVectorView<f64>) {
        jacobian.fill(1.0);
    }
}
