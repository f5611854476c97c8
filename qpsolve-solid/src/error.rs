use qpsolve::optimize::minimizer::ConvergenceStatus;
use qpsolve::LocalSolveError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConstitutiveError {
    #[error(transparent)]
    LocalSolve(#[from] LocalSolveError),
    #[error("local solve did not converge: {status}")]
    NotConverged { status: ConvergenceStatus },
    #[error("local solve did not converge with {max_depth} levels of sub-stepping: {status}")]
    SubsteppingExhausted {
        max_depth: usize,
        status: ConvergenceStatus,
    },
    #[error("invalid material parameters: {0}")]
    InvalidParameters(String),
}
