use matrixcompare::assert_matrix_eq;
use nalgebra::{DMatrix, DVector};
use qpsolve_optimize::linear::{solve_in_place, SingularMatrixError};

#[test]
fn solve_with_multiple_right_hand_sides() {
    let a = DMatrix::from_row_slice(2, 2, &[2.0, 1.0, 1.0, 3.0]);
    let mut b = DMatrix::from_row_slice(2, 2, &[3.0, 1.0, 4.0, 0.0]);
    let expected = a.clone().try_inverse().unwrap() * &b;

    solve_in_place(a, &mut b).unwrap();
    assert_matrix_eq!(b, expected, comp = abs, tol = 1e-14);
}

#[test]
fn exactly_singular_matrix_is_rejected() {
    let a = DMatrix::from_row_slice(2, 2, &[1.0, 1.0, 2.0, 2.0]);
    let mut b = DVector::from_column_slice(&[1.0, 2.0]);
    assert_eq!(solve_in_place(a, &mut b), Err(SingularMatrixError));
}

#[test]
fn numerically_singular_matrix_is_rejected() {
    let a = DMatrix::from_row_slice(2, 2, &[1.0, 1.0, 1.0, 1.0 + 1e-17]);
    let mut b = DVector::from_column_slice(&[1.0, 2.0]);
    assert_eq!(solve_in_place(a, &mut b), Err(SingularMatrixError));
}

#[test]
fn matrix_with_non_finite_entries_is_rejected() {
    let a = DMatrix::from_row_slice(2, 2, &[f64::NAN, 1.0, 0.0, 1.0]);
    let mut b = DVector::from_column_slice(&[1.0, 2.0]);
    assert_eq!(solve_in_place(a, &mut b), Err(SingularMatrixError));
}

#[test]
fn badly_scaled_matrix_is_not_singular() {
    let a = DMatrix::from_diagonal(&DVector::from_column_slice(&[1e9, 1e-3]));
    let mut b = DVector::from_column_slice(&[1e9, 1e-3]);
    solve_in_place(a, &mut b).unwrap();
    assert_matrix_eq!(b, DVector::from_column_slice(&[1.0, 1.0]), comp = abs, tol = 1e-12);
}

#[test]
fn empty_system_is_trivially_solvable() {
    let mut b = DVector::<f64>::zeros(0);
    assert_eq!(solve_in_place(DMatrix::zeros(0, 0), &mut b), Ok(()));
}

#[test]
fn rows_of_very_different_scale_are_not_singular() {
    let a = DMatrix::from_diagonal(&DVector::from_column_slice(&[1e12, 1e-5]));
    let mut b = DVector::from_column_slice(&[2e12, 3e-5]);
    solve_in_place(a, &mut b).unwrap();
    assert_matrix_eq!(b, DVector::from_column_slice(&[2.0, 3.0]), comp = abs, tol = 1e-12);
}

#[test]
fn badly_scaled_coupled_matrix_is_solved() {
    let a = DMatrix::from_row_slice(2, 2, &[1e12, 2e12, 3e-5, -1e-5]);
    let expected = DVector::from_column_slice(&[1.0, -2.0]);
    let mut b = &a * &expected;
    solve_in_place(a, &mut b).unwrap();
    assert_matrix_eq!(b, expected, comp = abs, tol = 1e-12);
}

#[test]
fn zero_row_is_rejected() {
    let a = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 0.0, 0.0]);
    let mut b = DVector::from_column_slice(&[1.0, 0.0]);
    assert_eq!(solve_in_place(a, &mut b), Err(SingularMatrixError));
}
