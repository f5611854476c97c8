//! Errors of local solves.
use crate::optimize::minimizer::MinimizerError;
use thiserror::Error;

/// Errors returned by [`solve`](crate::solve) and
/// [`propagate_sensitivities`](crate::propagate_sensitivities).
///
/// Failure of the iteration itself is not an error: it is reported through the status of the
/// returned [`ConvergenceRecord`](crate::optimize::minimizer::ConvergenceRecord).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocalSolveError {
    #[error("dimension mismatch: {what} has dimension {actual}, expected {expected}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("invalid solver settings: {0}")]
    InvalidSettings(String),
    /// The Jacobian at the converged solution is not invertible, so sensitivities are undefined.
    #[error("Jacobian is singular at the converged solution")]
    SingularJacobian,
}

impl From<MinimizerError> for LocalSolveError {
    fn from(error: MinimizerError) -> Self {
        match error {
            MinimizerError::DimensionMismatch {
                what,
                expected,
                actual,
            } => Self::DimensionMismatch {
                what,
                expected,
                actual,
            },
            MinimizerError::InvalidSettings(message) => Self::InvalidSettings(message),
        }
    }
}
