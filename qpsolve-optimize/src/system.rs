use nalgebra::{DMatrixViewMut, DVectorView, DVectorViewMut, Scalar};

/// A square nonlinear system $\vec r(\vec x) = \vec 0$ in plain arithmetic.
///
/// Evaluation takes `&self`: a system is a read-only description of the problem and may be
/// shared between threads.
pub trait LocalSystem<T>
where
    T: Scalar,
{
    fn dimension(&self) -> usize;

    /// Evaluates the residual $\vec r(\vec x)$ into `r`, overwriting every entry.
    fn eval_residual_into(&self, r: DVectorViewMut<T>, x: DVectorView<T>);

    /// Evaluates the Jacobian $\pd{r_i}{x_j}(\vec x)$ into `jacobian`.
    ///
    /// The output matrix is zeroed before the call.
    fn eval_jacobian_into(&self, jacobian: DMatrixViewMut<T>, x: DVectorView<T>);
}

impl<T, X> LocalSystem<T> for &X
where
    T: Scalar,
    X: LocalSystem<T> + ?Sized,
{
    fn dimension(&self) -> usize {
        X::dimension(self)
    }

    fn eval_residual_into(&self, r: DVectorViewMut<T>, x: DVectorView<T>) {
        X::eval_residual_into(self, r, x)
    }

    fn eval_jacobian_into(&self, jacobian: DMatrixViewMut<T>, x: DVectorView<T>) {
        X::eval_jacobian_into(self, jacobian, x)
    }
}

#[derive(Debug, Clone)]
pub struct LocalSystemBuilder {
    dimension: usize,
}

/// A local system defined by a pair of closures.
#[derive(Debug, Clone)]
pub struct ConcreteLocalSystem<F, J> {
    dimension: usize,
    residual: F,
    jacobian: J,
}

impl LocalSystemBuilder {
    pub fn with_dimension(dimension: usize) -> Self {
        Self { dimension }
    }

    pub fn with_residual<F, T>(self, residual: F) -> ConcreteLocalSystem<F, ()>
    where
        T: Scalar,
        F: Fn(DVectorViewMut<T>, DVectorView<T>),
    {
        ConcreteLocalSystem {
            dimension: self.dimension,
            residual,
            jacobian: (),
        }
    }
}

impl<F> ConcreteLocalSystem<F, ()> {
    pub fn with_jacobian<J, T>(self, jacobian: J) -> ConcreteLocalSystem<F, J>
    where
        T: Scalar,
        J: Fn(DMatrixViewMut<T>, DVectorView<T>),
    {
        ConcreteLocalSystem {
            dimension: self.dimension,
            residual: self.residual,
            jacobian,
        }
    }
}

impl<F, J, T> LocalSystem<T> for ConcreteLocalSystem<F, J>
where
    T: Scalar,
    F: Fn(DVectorViewMut<T>, DVectorView<T>),
    J: Fn(DMatrixViewMut<T>, DVectorView<T>),
{
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn eval_residual_into(&self, r: DVectorViewMut<T>, x: DVectorView<T>) {
        (self.residual)(r, x)
    }

    fn eval_jacobian_into(&self, jacobian: DMatrixViewMut<T>, x: DVectorView<T>) {
        (self.jacobian)(jacobian, x)
    }
}
