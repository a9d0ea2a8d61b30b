//! Student-t distribution functions.
//!
//! The two-tailed tail probability is evaluated through the regularized
//! incomplete beta function:
//!
//! ```text
//! P(|T| >= t) = I_{ν/(ν+t²)}(ν/2, 1/2)
//! ```
//!
//! which avoids the cancellation in `1 - cdf(t)` for large |t|.
//!
//! Numerical notes:
//! - `ln_gamma` uses the Lanczos approximation (g = 7, 9 terms), accurate to
//!   ~1e-15 for positive arguments.
//! - The continued fraction for `I_x(a, b)` is evaluated with the modified
//!   Lentz method, switching to the symmetric form when `x` is past the mean.

use std::f64::consts::PI;

const LANCZOS_G: f64 = 7.0;
const LANCZOS_COEF: [f64; 9] = [
    0.999_999_999_999_809_9,
    676.520_368_121_885_1,
    -1_259.139_216_722_402_8,
    771.323_428_777_653_1,
    -176.615_029_162_140_6,
    12.507_343_278_686_905,
    -0.138_571_095_265_720_12,
    9.984_369_578_019_572e-6,
    1.505_632_735_149_311_6e-7,
];

const CF_MAX_ITER: usize = 300;
const CF_EPS: f64 = 1e-15;
const CF_TINY: f64 = 1e-300;

/// Natural log of the gamma function for `x > 0`.
pub fn ln_gamma(x: f64) -> f64 {
    if x < 0.5 {
        // Reflection: Γ(x)Γ(1-x) = π / sin(πx)
        return (PI / (PI * x).sin()).ln() - ln_gamma(1.0 - x);
    }

    let x = x - 1.0;
    let t = x + LANCZOS_G + 0.5;
    let mut sum = LANCZOS_COEF[0];
    for (i, c) in LANCZOS_COEF.iter().enumerate().skip(1) {
        sum += c / (x + i as f64);
    }
    0.5 * (2.0 * PI).ln() + (x + 0.5) * t.ln() - t + sum.ln()
}

/// Regularized incomplete beta function `I_x(a, b)` for `a, b > 0`.
pub fn regularized_incomplete_beta(a: f64, b: f64, x: f64) -> f64 {
    if x.is_nan() || a <= 0.0 || b <= 0.0 {
        return f64::NAN;
    }
    if x <= 0.0 {
        return 0.0;
    }
    if x >= 1.0 {
        return 1.0;
    }

    let ln_front = ln_gamma(a + b) - ln_gamma(a) - ln_gamma(b) + a * x.ln() + b * (1.0 - x).ln();
    let front = ln_front.exp();

    if x < (a + 1.0) / (a + b + 2.0) {
        front * beta_continued_fraction(a, b, x) / a
    } else {
        1.0 - front * beta_continued_fraction(b, a, 1.0 - x) / b
    }
}

fn beta_continued_fraction(a: f64, b: f64, x: f64) -> f64 {
    let qab = a + b;
    let qap = a + 1.0;
    let qam = a - 1.0;

    let mut c = 1.0;
    let mut d = clamp_tiny(1.0 - qab * x / qap).recip();
    let mut h = d;

    for m in 1..=CF_MAX_ITER {
        let m = m as f64;
        let m2 = 2.0 * m;

        let aa = m * (b - m) * x / ((qam + m2) * (a + m2));
        d = clamp_tiny(1.0 + aa * d).recip();
        c = clamp_tiny(1.0 + aa / c);
        h *= d * c;

        let aa = -(a + m) * (qab + m) * x / ((a + m2) * (qap + m2));
        d = clamp_tiny(1.0 + aa * d).recip();
        c = clamp_tiny(1.0 + aa / c);
        let delta = d * c;
        h *= delta;

        if (delta - 1.0).abs() < CF_EPS {
            break;
        }
    }

    h
}

fn clamp_tiny(v: f64) -> f64 {
    if v.abs() < CF_TINY { CF_TINY } else { v }
}

/// Two-tailed probability `P(|T| >= |t|)` for `df` degrees of freedom.
///
/// NaN `t` or `df == 0` yields NaN; infinite `t` maps to 0.
pub fn two_tailed_p_value(t: f64, df: usize) -> f64 {
    if t.is_nan() || df == 0 {
        return f64::NAN;
    }
    if t.is_infinite() {
        return 0.0;
    }
    let nu = df as f64;
    let x = nu / (nu + t * t);
    regularized_incomplete_beta(nu / 2.0, 0.5, x).clamp(0.0, 1.0)
}

/// Student-t cumulative distribution function `P(T <= t)`.
pub fn student_t_cdf(t: f64, df: usize) -> f64 {
    let tail = 0.5 * two_tailed_p_value(t, df);
    if t >= 0.0 { 1.0 - tail } else { tail }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn ln_gamma_matches_known_values() {
        assert_abs_diff_eq!(ln_gamma(0.5), 0.5 * PI.ln(), epsilon = 1e-12);
        assert_abs_diff_eq!(ln_gamma(1.0), 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(ln_gamma(5.0), 24.0_f64.ln(), epsilon = 1e-12);
        assert_abs_diff_eq!(ln_gamma(29.0), (1..29).map(|k| (k as f64).ln()).sum::<f64>(), epsilon = 1e-9);
    }

    #[test]
    fn incomplete_beta_edges_and_symmetry() {
        assert_eq!(regularized_incomplete_beta(2.0, 3.0, 0.0), 0.0);
        assert_eq!(regularized_incomplete_beta(2.0, 3.0, 1.0), 1.0);
        // I_x(1, 1) = x
        assert_abs_diff_eq!(regularized_incomplete_beta(1.0, 1.0, 0.3), 0.3, epsilon = 1e-12);
        // I_x(a, b) = 1 - I_{1-x}(b, a)
        let lhs = regularized_incomplete_beta(2.5, 4.0, 0.35);
        let rhs = 1.0 - regularized_incomplete_beta(4.0, 2.5, 0.65);
        assert_abs_diff_eq!(lhs, rhs, epsilon = 1e-12);
    }

    #[test]
    fn two_tailed_p_matches_closed_forms() {
        // df = 1 is Cauchy: P(|T| >= 1) = 1/2.
        assert_abs_diff_eq!(two_tailed_p_value(1.0, 1), 0.5, epsilon = 1e-10);
        // df = 2: P(|T| >= t) = 1 - t / sqrt(2 + t²).
        let t: f64 = 2.0;
        assert_abs_diff_eq!(two_tailed_p_value(t, 2), 1.0 - t / (2.0 + t * t).sqrt(), epsilon = 1e-10);
        assert_abs_diff_eq!(two_tailed_p_value(0.0, 58), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn two_tailed_p_near_critical_value() {
        // The 97.5% quantile for 58 df is about 2.0017.
        let p = two_tailed_p_value(2.0017, 58);
        assert!((p - 0.05).abs() < 5e-4, "p={p}");
        assert!(two_tailed_p_value(8.0, 58) < 1e-9);
    }

    #[test]
    fn p_value_is_symmetric_and_bounded() {
        for &t in &[0.1, 0.7, 1.5, 3.0, 12.0] {
            let p_pos = two_tailed_p_value(t, 58);
            let p_neg = two_tailed_p_value(-t, 58);
            assert_eq!(p_pos, p_neg);
            assert!((0.0..=1.0).contains(&p_pos));
        }
        assert!(two_tailed_p_value(f64::NAN, 58).is_nan());
        assert_eq!(two_tailed_p_value(f64::INFINITY, 58), 0.0);
    }

    #[test]
    fn cdf_is_monotone_around_zero() {
        assert_abs_diff_eq!(student_t_cdf(0.0, 10), 0.5, epsilon = 1e-12);
        assert!(student_t_cdf(-1.0, 10) < 0.5);
        assert!(student_t_cdf(1.0, 10) > 0.5);
        assert_abs_diff_eq!(student_t_cdf(1.3, 10) + student_t_cdf(-1.3, 10), 1.0, epsilon = 1e-12);
    }
}
