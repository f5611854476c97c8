//! Parallel solves of many independent local problems.
use crate::error::LocalSolveError;
use crate::optimize::minimizer::{ConvergenceRecord, MinimizerSettings};
use crate::optimize::step::StepMethod;
use crate::residual::ResidualFunction;
use crate::solve;
use nalgebra::DVector;
use qpsolve_traits::{EvalScalar, LocalScalar};
use rayon::iter::{IndexedParallelIterator, IntoParallelRefIterator, IntoParallelRefMutIterator, ParallelIterator};

/// The result of a single local solve.
pub type LocalSolveResult<T> = Result<ConvergenceRecord<T>, LocalSolveError>;

/// Solves the local problem `residuals[i]` with initial guess `states[i]` for every `i`, in
/// parallel.
///
/// Every solve uses a fresh step method created by `make_step_method`. The result of each
/// solve is returned at the same index, and the states are updated as by [`solve`].
///
/// # Panics
///
/// Panics if the number of residuals and states differ.
pub fn solve_batch<S, R, M, MakeStep>(
    make_step_method: MakeStep,
    residuals: &[R],
    states: &mut [DVector<S>],
    settings: MinimizerSettings<S::Real>,
) -> Vec<LocalSolveResult<S::Real>>
where
    S: LocalScalar + EvalScalar<S>,
    S::Real: EvalScalar<S>,
    R: ResidualFunction<S> + Sync,
    M: StepMethod<S::Real>,
    MakeStep: Fn() -> M + Sync,
{
    assert_eq!(
        residuals.len(),
        states.len(),
        "Number of residuals and states must be the same."
    );

    residuals
        .par_iter()
        .zip(states.par_iter_mut())
        .map(|(residual, state)| {
            let mut step_method = make_step_method();
            solve(&mut step_method, residual, state, settings)
        })
        .collect()
}

/// Same as [`solve_batch`], but solves the problems one after another on the current thread.
pub fn solve_batch_serial<S, R, M, MakeStep>(
    make_step_method: MakeStep,
    residuals: &[R],
    states: &mut [DVector<S>],
    settings: MinimizerSettings<S::Real>,
) -> Vec<LocalSolveResult<S::Real>>
where
    S: LocalScalar + EvalScalar<S>,
    S::Real: EvalScalar<S>,
    R: ResidualFunction<S>,
    M: StepMethod<S::Real>,
    MakeStep: Fn() -> M,
{
    assert_eq!(
        residuals.len(),
        states.len(),
        "Number of residuals and states must be the same."
    );

    residuals
        .iter()
        .zip(states.iter_mut())
        .map(|(residual, state)| {
            let mut step_method = make_step_method();
            solve(&mut step_method, residual, state, settings)
        })
        .collect()
}
