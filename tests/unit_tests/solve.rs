use super::{CountingResidual, DegenerateShift, Power, Shift, ShiftedSquare, SumAndDifference};
use matrixcompare::{assert_matrix_eq, assert_scalar_eq};
use nalgebra::{DVector, DVectorViewMut};
use proptest::prelude::*;
use qpsolve::optimize::calculus::approximate_derivative_fd;
use qpsolve::optimize::minimizer::{ConvergenceStatus, MinimizerSettings};
use qpsolve::optimize::newton::{BacktrackingLineSearch, NewtonStep};
use qpsolve::optimize::trust_region::DoglegTrustRegion;
use qpsolve::{solve, Dual, EvalScalar, LocalScalar, LocalSolveError};

fn settings() -> MinimizerSettings<f64> {
    MinimizerSettings::default()
}

/// Settings that iterate until the solution is accurate to machine precision.
fn precise_settings() -> MinimizerSettings<f64> {
    MinimizerSettings {
        residual_tolerance: 1e-14,
        relative_residual_tolerance: 0.0,
        ..MinimizerSettings::default()
    }
}

/// Solves x = p for any scalar type, bounded the way downstream generic code is.
fn generic_shift_root<S>(p: S) -> S
where
    S: LocalScalar + EvalScalar<S>,
    S::Real: EvalScalar<S>,
{
    let mut x = DVector::from_element(1, S::zero());
    let record = solve(&mut NewtonStep, &Shift { p }, &mut x, MinimizerSettings::default()).unwrap();
    assert!(record.is_converged());
    x[0]
}

/// Solves x^2 = p in plain arithmetic, starting from x = 1.
fn plain_square_root(p: f64) -> DVector<f64> {
    let mut x = DVector::from_element(1, 1.0);
    let record = solve(&mut NewtonStep, &Power { k: 2, p }, &mut x, precise_settings()).unwrap();
    assert!(record.is_converged());
    x
}

#[test]
fn shift_has_unit_sensitivity() {
    let residual = Shift {
        p: Dual::<f64, 1>::variable(3.0, 0),
    };
    let mut x = DVector::from_element(1, Dual::constant(0.0));
    let record = solve(&mut NewtonStep, &residual, &mut x, settings()).unwrap();

    assert!(record.is_converged());
    assert_scalar_eq!(x[0].value(), 3.0, comp = abs, tol = 1e-12);
    assert_eq!(x[0].derivative(0), 1.0);
}

#[test]
fn square_root_sensitivity() {
    let residual = Power {
        k: 2,
        p: Dual::<f64, 1>::variable(2.0, 0),
    };
    let mut x = DVector::from_element(1, Dual::constant(1.0));
    let record = solve(&mut NewtonStep, &residual, &mut x, precise_settings()).unwrap();

    assert!(record.is_converged());
    let sqrt_2 = 2.0f64.sqrt();
    assert_scalar_eq!(x[0].value(), sqrt_2, comp = abs, tol = 1e-12);
    assert_scalar_eq!(x[0].derivative(0), 1.0 / (2.0 * sqrt_2), comp = abs, tol = 1e-12);

    let dx_dp_fd = approximate_derivative_fd(plain_square_root, 2.0, 1e-6);
    assert_scalar_eq!(x[0].derivative(0), dx_dp_fd[0], comp = abs, tol = 1e-8);
}

#[test]
fn cube_root_sensitivity() {
    let residual = Power {
        k: 3,
        p: Dual::<f64, 1>::variable(8.0, 0),
    };
    let mut x = DVector::from_element(1, Dual::constant(1.0));
    let record = solve(&mut NewtonStep, &residual, &mut x, precise_settings()).unwrap();

    assert!(record.is_converged());
    assert_scalar_eq!(x[0].value(), 2.0, comp = abs, tol = 1e-12);
    assert_scalar_eq!(x[0].derivative(0), 1.0 / 12.0, comp = abs, tol = 1e-12);
}

#[test]
fn plain_and_dual_solves_agree_on_values() {
    let mut x_plain = DVector::from_element(1, 1.0);
    let plain_record = solve(&mut NewtonStep, &Power { k: 3, p: 5.0 }, &mut x_plain, settings()).unwrap();

    let residual = Power {
        k: 3,
        p: Dual::<f64, 1>::variable(5.0, 0),
    };
    let mut x_dual = DVector::from_element(1, Dual::constant(1.0));
    let dual_record = solve(&mut NewtonStep, &residual, &mut x_dual, settings()).unwrap();

    // The iteration only ever sees plain values, so the results are identical
    assert_eq!(plain_record, dual_record);
    assert_eq!(x_plain[0], x_dual[0].value());
}

#[test]
fn dual_without_slots_behaves_like_plain() {
    let mut x_plain = DVector::from_element(1, 1.0);
    solve(&mut NewtonStep, &Power { k: 2, p: 7.0 }, &mut x_plain, settings()).unwrap();

    let mut x = DVector::from_element(1, Dual::<f64, 0>::constant(1.0));
    let residual = Power {
        k: 2,
        p: Dual::<f64, 0>::constant(7.0),
    };
    let record = solve(&mut NewtonStep, &residual, &mut x, settings()).unwrap();

    assert!(record.is_converged());
    assert_eq!(x[0].value(), x_plain[0]);
    assert_eq!(x[0].derivatives(), &[0.0f64; 0]);
}

#[test]
fn two_parameter_sensitivities() {
    let residual = SumAndDifference {
        p: [Dual::<f64, 2>::variable(3.0, 0), Dual::variable(1.0, 1)],
    };
    let mut x = DVector::from_element(2, Dual::constant(0.0));
    solve(&mut NewtonStep, &residual, &mut x, settings()).unwrap();

    let values = x.map(|x_i| x_i.value());
    let dx_dp = nalgebra::DMatrix::from_fn(2, 2, |i, k| x[i].derivative(k));
    assert_matrix_eq!(values, DVector::from_column_slice(&[2.0, 1.0]), comp = abs, tol = 1e-12);
    #[rustfmt::skip]
    let expected = nalgebra::DMatrix::from_row_slice(2, 2,
                                                     &[0.5, 0.5,
                                                       0.5, -0.5]);
    assert_matrix_eq!(dx_dp, expected, comp = abs, tol = 1e-12);
}

#[test]
fn derivatives_of_initial_guess_are_ignored() {
    let residual = Power {
        k: 2,
        p: Dual::<f64, 1>::variable(2.0, 0),
    };
    let mut x_clean = DVector::from_element(1, Dual::constant(1.0));
    let mut x_seeded = DVector::from_element(1, Dual::new(1.0, [42.0]));
    solve(&mut NewtonStep, &residual, &mut x_clean, settings()).unwrap();
    solve(&mut NewtonStep, &residual, &mut x_seeded, settings()).unwrap();
    assert_eq!(x_clean, x_seeded);
}

#[test]
fn sensitivities_use_single_dual_evaluation() {
    let residual = CountingResidual::new(Power {
        k: 3,
        p: Dual::<f64, 1>::variable(8.0, 0),
    });
    let mut x = DVector::from_element(1, Dual::constant(1.0));
    let record = solve(&mut NewtonStep, &residual, &mut x, settings()).unwrap();

    assert_eq!(residual.dual_residual_evals.get(), 1);
    assert_eq!(residual.dual_jacobian_evals.get(), 0);
    // One Jacobian per iteration, plus one at the solution
    assert_eq!(residual.plain_jacobian_evals.get(), record.iterations + 1);
}

#[test]
fn plain_solve_never_evaluates_dual_residual() {
    let residual = CountingResidual::new(Power { k: 3, p: 8.0 });
    let mut x = DVector::from_element(1, 1.0);
    let record = solve(&mut NewtonStep, &residual, &mut x, settings()).unwrap();

    assert!(record.is_converged());
    assert_eq!(residual.dual_residual_evals.get(), 0);
    assert_eq!(residual.plain_jacobian_evals.get(), record.iterations);
}

#[test]
fn failed_solve_leaves_state_untouched() {
    let residual = ShiftedSquare {
        p: Dual::<f64, 1>::variable(1.0, 0),
    };
    let initial = DVector::from_element(1, Dual::new(0.3, [5.0]));
    let mut x = initial.clone();
    let settings = MinimizerSettings {
        max_iterations: 20,
        ..settings()
    };
    let record = solve(&mut NewtonStep, &residual, &mut x, settings).unwrap();

    assert_eq!(record.status, ConvergenceStatus::MaxIterationsExceeded);
    assert_eq!(record.iterations, 20);
    assert_eq!(x, initial);
}

#[test]
fn singularity_during_iteration_is_reported_in_record() {
    let residual = ShiftedSquare {
        p: Dual::<f64, 1>::variable(1.0, 0),
    };
    let mut x = DVector::from_element(1, Dual::constant(0.0));
    let record = solve(&mut NewtonStep, &residual, &mut x, settings()).unwrap();

    assert_eq!(record.status, ConvergenceStatus::NumericalSingularity);
    assert_eq!(x[0], Dual::constant(0.0));
}

#[test]
fn singular_jacobian_at_solution_is_an_error() {
    let residual = DegenerateShift {
        p: Dual::<f64, 1>::variable(2.0, 0),
    };

    // Starting at the solution, Newton's method converges without taking a step
    let mut x = DVector::from_column_slice(&[Dual::new(2.0, [7.0]), Dual::new(5.0, [1.0])]);
    let result = solve(&mut NewtonStep, &residual, &mut x, settings());
    assert_eq!(result, Err(LocalSolveError::SingularJacobian));
    assert_eq!(x, DVector::from_column_slice(&[Dual::constant(2.0), Dual::constant(5.0)]));

    // The dogleg method falls back to Cauchy steps away from the solution
    let mut x = DVector::from_column_slice(&[Dual::constant(2.5), Dual::constant(5.0)]);
    let result = solve(&mut DoglegTrustRegion::<f64>::default(), &residual, &mut x, settings());
    assert_eq!(result, Err(LocalSolveError::SingularJacobian));
    assert_scalar_eq!(x[0].value(), 2.0, comp = abs, tol = 1e-12);
    assert_eq!(x[0].derivative(0), 0.0);
    assert_eq!(x[1].derivative(0), 0.0);
}

#[test]
fn singular_jacobian_at_solution_is_fine_without_derivatives() {
    let mut x = DVector::from_column_slice(&[2.5, 5.0]);
    let record = solve(
        &mut DoglegTrustRegion::<f64>::default(),
        &DegenerateShift { p: 2.0 },
        &mut x,
        settings(),
    )
    .unwrap();

    assert!(record.is_converged());
    assert_scalar_eq!(x[0], 2.0, comp = abs, tol = 1e-12);
    assert_eq!(x[1], 5.0);
}

#[test]
fn dimension_mismatch_is_an_error() {
    let mut x = DVector::from_element(2, Dual::<f64, 1>::constant(0.0));
    let residual = Shift {
        p: Dual::<f64, 1>::variable(3.0, 0),
    };
    let result = solve(&mut NewtonStep, &residual, &mut x, settings());
    assert_eq!(
        result,
        Err(LocalSolveError::DimensionMismatch {
            what: "initial guess",
            expected: 1,
            actual: 2
        })
    );
    assert_eq!(x, DVector::from_element(2, Dual::constant(0.0)));
}

#[test]
fn invalid_settings_are_an_error() {
    let mut x = DVector::from_element(1, 0.0);
    let settings = MinimizerSettings {
        step_tolerance: -1.0,
        ..settings()
    };
    let result = solve(&mut NewtonStep, &Shift { p: 1.0 }, &mut x, settings);
    assert!(matches!(result, Err(LocalSolveError::InvalidSettings(_))));
}

#[test]
fn step_methods_agree_on_sensitivities() {
    let residual = Power {
        k: 3,
        p: Dual::<f64, 1>::variable(8.0, 0),
    };

    let mut x_newton = DVector::from_element(1, Dual::constant(1.0));
    let mut x_line_search = x_newton.clone();
    let mut x_dogleg = x_newton.clone();
    solve(&mut NewtonStep, &residual, &mut x_newton, precise_settings()).unwrap();
    solve(
        &mut BacktrackingLineSearch::<f64>::default(),
        &residual,
        &mut x_line_search,
        precise_settings(),
    )
    .unwrap();
    solve(&mut DoglegTrustRegion::<f64>::default(), &residual, &mut x_dogleg, precise_settings()).unwrap();

    for x in [x_line_search, x_dogleg] {
        assert_scalar_eq!(x[0].value(), x_newton[0].value(), comp = abs, tol = 1e-12);
        assert_scalar_eq!(x[0].derivative(0), x_newton[0].derivative(0), comp = abs, tol = 1e-12);
    }
}

#[test]
fn solve_accepts_views() {
    let residual = Shift {
        p: Dual::<f64, 1>::variable(-1.5, 0),
    };
    let mut states = DVector::from_element(3, Dual::constant(0.0));
    solve(
        &mut NewtonStep,
        &residual,
        DVectorViewMut::from(states.rows_mut(1, 1)),
        settings(),
    )
    .unwrap();

    assert_eq!(states[0], Dual::constant(0.0));
    assert_eq!(states[1], Dual::new(-1.5, [1.0]));
    assert_eq!(states[2], Dual::constant(0.0));
}

proptest! {
    #[test]
    fn square_root_sensitivity_matches_finite_differences(p in 0.1..100.0f64) {
        let residual = Power { k: 2, p: Dual::<f64, 1>::variable(p, 0) };
        let mut x = DVector::from_element(1, Dual::constant(1.0));
        let record = solve(&mut NewtonStep, &residual, &mut x, precise_settings()).unwrap();
        prop_assert!(record.is_converged());

        let sqrt_p = p.sqrt();
        assert_scalar_eq!(x[0].value(), sqrt_p, comp = abs, tol = 1e-14 * sqrt_p);
        assert_scalar_eq!(x[0].derivative(0), 0.5 / sqrt_p, comp = abs, tol = 1e-10 * (0.5 / sqrt_p));

        let dx_dp_fd = approximate_derivative_fd(plain_square_root, p, 1e-6 * p);
        assert_scalar_eq!(x[0].derivative(0), dx_dp_fd[0], comp = abs, tol = 1e-6 * (0.5 / sqrt_p));
    }

    #[test]
    fn residual_without_root_is_never_converged(x0 in -10.0..10.0f64, p in 0.1..10.0f64) {
        let residual = ShiftedSquare { p: Dual::<f64, 1>::variable(p, 0) };
        let initial = DVector::from_element(1, Dual::constant(x0));
        let mut x = initial.clone();
        let record = solve(&mut NewtonStep, &residual, &mut x, settings()).unwrap();
        prop_assert!(!record.is_converged());
        prop_assert_eq!(x, initial);
    }
}

#[test]
fn solve_with_settings_loaded_from_json() {
    let json = r#"{ "residual_tolerance": 1e-13, "max_iterations": 8 }"#;
    let settings: MinimizerSettings<f64> = serde_json::from_str(json).unwrap();
    assert_eq!(settings.relative_residual_tolerance, MinimizerSettings::<f64>::default().relative_residual_tolerance);

    let mut x = DVector::from_element(1, Dual::<f64, 1>::constant(1.0));
    let residual = Power {
        k: 2,
        p: Dual::variable(9.0, 0),
    };
    let record = solve(&mut NewtonStep, &residual, &mut x, settings).unwrap();
    assert!(record.is_converged());
    assert!(record.iterations <= 8);
    assert_scalar_eq!(x[0].value(), 3.0, comp = abs, tol = 1e-12);
    assert_scalar_eq!(x[0].derivative(0), 1.0 / 6.0, comp = abs, tol = 1e-12);
}

#[test]
fn solve_from_generic_code() {
    assert_scalar_eq!(generic_shift_root(2.5), 2.5, comp = abs, tol = 1e-12);

    let x = generic_shift_root(Dual::<f64, 2>::new(2.5, [1.0, -3.0]));
    assert_scalar_eq!(x.value(), 2.5, comp = abs, tol = 1e-12);
    assert_eq!(x.derivatives(), &[1.0, -3.0]);
}
