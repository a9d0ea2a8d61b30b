//! Ordinary least squares for the market model.
//!
//! Each event fits one small regression:
//!
//! ```text
//! target_t = α + β · market_t + ε_t
//! ```
//!
//! over its estimation window (typically 60 rows, 2 columns). We solve it with
//! nalgebra's SVD, which handles tall design matrices directly and exposes the
//! numerical rank, so a degenerate regressor (e.g. a flat market series) is
//! reported as a failure instead of producing a minimum-norm answer.

use nalgebra::{DMatrix, DVector};

/// Singular values below `RANK_TOL * σ_max` count as zero.
const RANK_TOL: f64 = 1e-10;

/// Fitted intercept and slope of the market model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub alpha: f64,
    pub beta: f64,
}

impl LinearFit {
    pub fn predict(&self, x: f64) -> f64 {
        self.alpha + self.beta * x
    }
}

/// Solve a least squares problem using SVD.
///
/// Returns `None` when the system is underdetermined, rank deficient, or the
/// solution is not finite.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    if x.nrows() < x.ncols() || x.nrows() != y.len() {
        return None;
    }

    let svd = x.clone().svd(true, true);
    let tol = svd.singular_values.max() * RANK_TOL;
    if svd.rank(tol) < x.ncols() {
        return None;
    }

    let beta = svd.solve(y, tol).ok()?;
    beta.iter().all(|v| v.is_finite()).then_some(beta)
}

/// Fit `y = α + β·x` with an intercept column.
pub fn fit_market_model(x: &[f64], y: &[f64]) -> Option<LinearFit> {
    if x.len() != y.len() {
        return None;
    }
    let n = x.len();
    let design = DMatrix::from_fn(n, 2, |i, j| if j == 0 { 1.0 } else { x[i] });
    let rhs = DVector::from_column_slice(y);

    let coef = solve_least_squares(&design, &rhs)?;
    Some(LinearFit {
        alpha: coef[0],
        beta: coef[1],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn least_squares_solves_simple_system() {
        // Fit y = 2 + 3x on x = [0,1,2]
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[2.0, 5.0, 8.0]);

        let beta = solve_least_squares(&x, &y).unwrap();
        assert!((beta[0] - 2.0).abs() < 1e-10);
        assert!((beta[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn market_model_recovers_noiseless_coefficients() {
        let x: Vec<f64> = (0..60).map(|i| ((i as f64) * 0.37).sin() * 0.02).collect();
        let y: Vec<f64> = x.iter().map(|m| 0.0005 + 1.3 * m).collect();

        let fit = fit_market_model(&x, &y).unwrap();
        assert!((fit.alpha - 0.0005).abs() < 1e-12);
        assert!((fit.beta - 1.3).abs() < 1e-9);
        assert!((fit.predict(0.01) - 0.0135).abs() < 1e-9);
    }

    #[test]
    fn flat_regressor_is_rank_deficient() {
        let x = vec![0.01; 60];
        let y: Vec<f64> = (0..60).map(|i| i as f64 * 1e-4).collect();
        assert!(fit_market_model(&x, &y).is_none());
    }

    #[test]
    fn mismatched_or_short_inputs_fail() {
        assert!(fit_market_model(&[0.1, 0.2], &[0.1]).is_none());
        assert!(fit_market_model(&[0.1], &[0.1]).is_none());
        assert!(fit_market_model(&[], &[]).is_none());
    }
}
