use super::{Power, ShiftedSquare};
use nalgebra::DVector;
use proptest::prelude::*;
use qpsolve::optimize::minimizer::{ConvergenceStatus, MinimizerSettings};
use qpsolve::optimize::newton::NewtonStep;
use qpsolve::optimize::trust_region::DoglegTrustRegion;
use qpsolve::{solve_batch, solve_batch_serial, Dual, LocalSolveError};

#[test]
fn batch_reports_results_per_point() {
    let residuals = vec![
        ShiftedSquare {
            p: Dual::<f64, 1>::variable(-4.0, 0),
        },
        ShiftedSquare {
            p: Dual::<f64, 1>::variable(1.0, 0),
        },
    ];
    let mut states = vec![
        DVector::from_element(1, Dual::constant(1.0)),
        DVector::from_element(1, Dual::constant(0.0)),
    ];

    let results = solve_batch(|| NewtonStep, &residuals, &mut states, MinimizerSettings::default());

    assert_eq!(results.len(), 2);
    assert!(results[0].as_ref().unwrap().is_converged());
    assert_eq!(
        results[1].as_ref().unwrap().status,
        ConvergenceStatus::NumericalSingularity
    );
    // x = sqrt(-p), dx/dp = -1 / (2 x)
    assert!((states[0][0].value() - 2.0).abs() < 1e-10);
    assert!((states[0][0].derivatives()[0] + 0.25).abs() < 1e-10);
    assert_eq!(states[1][0], Dual::constant(0.0));
}

#[test]
fn batch_reports_errors_per_point() {
    let residuals = vec![Power { k: 2, p: 9.0 }, Power { k: 2, p: 16.0 }];
    let mut states = vec![DVector::from_element(1, 1.0), DVector::from_element(2, 1.0)];

    let results = solve_batch(|| NewtonStep, &residuals, &mut states, MinimizerSettings::default());

    assert!(results[0].is_ok());
    assert_eq!(
        results[1],
        Err(LocalSolveError::DimensionMismatch {
            what: "initial guess",
            expected: 1,
            actual: 2
        })
    );
}

#[test]
#[should_panic]
fn batch_panics_on_length_mismatch() {
    let residuals = vec![Power { k: 2, p: 9.0 }];
    let mut states: Vec<DVector<f64>> = Vec::new();
    solve_batch(|| NewtonStep, &residuals, &mut states, MinimizerSettings::default());
}

proptest! {
    #[test]
    fn parallel_and_serial_batches_agree(p in prop::collection::vec(0.5..50.0f64, 0..40)) {
        let residuals: Vec<_> = p
            .iter()
            .map(|&p_i| Power { k: 3, p: Dual::<f64, 1>::variable(p_i, 0) })
            .collect();
        let initial_states = vec![DVector::from_element(1, Dual::constant(1.0)); p.len()];

        let mut parallel_states = initial_states.clone();
        let mut serial_states = initial_states;
        let parallel_results = solve_batch(
            DoglegTrustRegion::<f64>::default,
            &residuals,
            &mut parallel_states,
            MinimizerSettings::default(),
        );
        let serial_results = solve_batch_serial(
            DoglegTrustRegion::<f64>::default,
            &residuals,
            &mut serial_states,
            MinimizerSettings::default(),
        );

        prop_assert_eq!(parallel_results, serial_results);
        prop_assert_eq!(parallel_states, serial_states);
    }
}
