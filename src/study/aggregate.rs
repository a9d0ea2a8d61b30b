//! Cross-sectional aggregation of abnormal returns.
//!
//! Given `N` events, each with an abnormal-return vector of the same length:
//!
//! - `AAR[k]  = mean_i AR[i][k]`
//! - `CAAR[k] = Σ_{j<=k} AAR[j]`
//! - `CAR[i]  = Σ_k AR[i][k]`
//!
//! The CAR variance is estimated per event as `L' · Σ_k AR[i][k]² / (M - 2)`
//! (with `L' = event_window_length + 1`, `M = estimation_window_length`) and
//! then averaged across events. The square root of that average is the
//! standard error of the mean CAR, and the t-statistic is tested against a
//! Student-t with `M - 2` degrees of freedom.

use thiserror::Error;

use crate::domain::{AbnormalReturnVector, CaarPoint, EventCar, StudyConfig, StudyResult};
use crate::math::two_tailed_p_value;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AggregateError {
    #[error("no valid events")]
    Empty,
    #[error("event {index} has {found} abnormal returns, expected {expected}")]
    RaggedWindows { index: usize, expected: usize, found: usize },
}

/// Combine per-event abnormal returns into a category result.
///
/// Event labels follow input order, so callers should pass events sorted
/// chronologically for reproducible CAR lists.
pub fn aggregate(vectors: &[AbnormalReturnVector], config: &StudyConfig) -> Result<StudyResult, AggregateError> {
    let Some(first) = vectors.first() else {
        return Err(AggregateError::Empty);
    };
    let width = first.len();
    for (index, v) in vectors.iter().enumerate() {
        if v.len() != width {
            return Err(AggregateError::RaggedWindows {
                index,
                expected: width,
                found: v.len(),
            });
        }
    }

    let n = vectors.len() as f64;

    let mut caar = Vec::with_capacity(width);
    let mut running = 0.0;
    for k in 0..width {
        let aar = vectors.iter().map(|v| v.returns[k].value).sum::<f64>() / n;
        running += aar;
        caar.push(CaarPoint {
            offset: first.returns[k].offset,
            aar,
            caar: running,
        });
    }

    let cars: Vec<EventCar> = vectors
        .iter()
        .enumerate()
        .map(|(i, v)| EventCar {
            label: format!("Event_{i}"),
            event_date: v.event_date,
            car: v.car(),
        })
        .collect();
    let mean_car = cars.iter().map(|c| c.car).sum::<f64>() / n;

    let scale = config.event_window_size() as f64 / config.degrees_of_freedom() as f64;
    let car_variance = vectors.iter().map(|v| scale * v.sum_of_squares()).sum::<f64>() / n;
    let standard_error = car_variance.sqrt();

    let t_statistic = if standard_error > 0.0 && standard_error.is_finite() {
        mean_car / standard_error
    } else {
        f64::NAN
    };
    let p_value = two_tailed_p_value(t_statistic.abs(), config.degrees_of_freedom());

    Ok(StudyResult {
        event_count: vectors.len(),
        mean_car,
        car_variance,
        standard_error,
        t_statistic,
        p_value,
        caar,
        cars,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AbnormalReturn;
    use approx::assert_abs_diff_eq;
    use chrono::{Duration, NaiveDate};

    fn vector(event: usize, values: &[f64]) -> AbnormalReturnVector {
        let base = NaiveDate::from_ymd_opt(2022, 1, 1).unwrap() + Duration::days(event as i64 * 30);
        AbnormalReturnVector {
            event_date: base,
            anchor_day: base,
            alpha: 0.0,
            beta: 1.0,
            returns: values
                .iter()
                .enumerate()
                .map(|(k, &value)| AbnormalReturn {
                    date: base + Duration::days(k as i64 - 1),
                    offset: k as i32 - 1,
                    value,
                })
                .collect(),
        }
    }

    fn sample() -> Vec<AbnormalReturnVector> {
        vec![
            vector(0, &[0.01, -0.02, 0.005, 0.0, 0.003, -0.001, 0.002, 0.0, -0.004, 0.001, 0.002]),
            vector(1, &[-0.003, -0.015, 0.001, 0.002, 0.0, 0.004, -0.002, 0.001, 0.0, 0.0, -0.001]),
            vector(2, &[0.0, -0.03, -0.01, 0.006, 0.002, 0.001, 0.0, 0.0, 0.003, -0.002, 0.0]),
        ]
    }

    #[test]
    fn empty_input_is_empty() {
        assert_eq!(aggregate(&[], &StudyConfig::default()), Err(AggregateError::Empty));
    }

    #[test]
    fn ragged_vectors_are_rejected() {
        let vectors = vec![vector(0, &[0.0; 11]), vector(1, &[0.0; 10])];
        assert_eq!(
            aggregate(&vectors, &StudyConfig::default()),
            Err(AggregateError::RaggedWindows {
                index: 1,
                expected: 11,
                found: 10
            })
        );
    }

    #[test]
    fn caar_is_prefix_sum_of_aar() {
        let result = aggregate(&sample(), &StudyConfig::default()).unwrap();
        assert_eq!(result.caar.len(), 11);
        let mut running = 0.0;
        for point in &result.caar {
            running += point.aar;
            assert_abs_diff_eq!(point.caar, running, epsilon = 1e-15);
        }
        assert_eq!(result.caar[0].offset, -1);
        assert_eq!(result.caar[10].offset, 9);
        assert_abs_diff_eq!(result.caar[1].aar, (-0.02 - 0.015 - 0.03) / 3.0, epsilon = 1e-15);
    }

    #[test]
    fn mean_car_matches_direct_recomputation() {
        let vectors = sample();
        let result = aggregate(&vectors, &StudyConfig::default()).unwrap();
        let cars: Vec<f64> = vectors.iter().map(|v| v.returns.iter().map(|r| r.value).sum()).collect();
        assert_eq!(result.car_values().len(), 3);
        for (got, want) in result.car_values().iter().zip(&cars) {
            assert_abs_diff_eq!(*got, *want, epsilon = 1e-15);
        }
        assert_abs_diff_eq!(result.mean_car, cars.iter().sum::<f64>() / 3.0, epsilon = 1e-15);
        // Final CAAR equals the mean CAR.
        assert_abs_diff_eq!(result.caar[10].caar, result.mean_car, epsilon = 1e-15);
        assert_eq!(result.cars[2].label, "Event_2");
    }

    #[test]
    fn variance_scales_each_event_then_averages() {
        let vectors = sample();
        let result = aggregate(&vectors, &StudyConfig::default()).unwrap();
        let expected = vectors
            .iter()
            .map(|v| 11.0 * (1.0 / 58.0) * v.returns.iter().map(|r| r.value * r.value).sum::<f64>())
            .sum::<f64>()
            / 3.0;
        assert_abs_diff_eq!(result.car_variance, expected, epsilon = 1e-18);
        assert_abs_diff_eq!(result.standard_error, expected.sqrt(), epsilon = 1e-15);
        assert_abs_diff_eq!(result.t_statistic, result.mean_car / expected.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn t_sign_follows_mean_car_and_p_is_symmetric() {
        let vectors = sample();
        let result = aggregate(&vectors, &StudyConfig::default()).unwrap();
        assert!(result.mean_car < 0.0);
        assert!(result.t_statistic < 0.0);

        let flipped: Vec<AbnormalReturnVector> = vectors
            .iter()
            .map(|v| {
                let mut v = v.clone();
                v.returns.iter_mut().for_each(|r| r.value = -r.value);
                v
            })
            .collect();
        let flipped = aggregate(&flipped, &StudyConfig::default()).unwrap();
        assert!(flipped.t_statistic > 0.0);
        assert_abs_diff_eq!(flipped.t_statistic, -result.t_statistic, epsilon = 1e-12);
        assert_eq!(flipped.p_value, result.p_value);
        assert!((0.0..=1.0).contains(&result.p_value));
    }

    #[test]
    fn all_zero_abnormal_returns_give_undefined_statistic() {
        let vectors = vec![vector(0, &[0.0; 11]), vector(1, &[0.0; 11])];
        let result = aggregate(&vectors, &StudyConfig::default()).unwrap();
        assert_eq!(result.mean_car, 0.0);
        assert_eq!(result.standard_error, 0.0);
        assert!(result.t_statistic.is_nan());
        assert!(result.p_value.is_nan());
    }

    #[test]
    fn single_event_study_is_defined() {
        let vectors = vec![vector(0, &[0.01; 11])];
        let result = aggregate(&vectors, &StudyConfig::default()).unwrap();
        assert_eq!(result.event_count, 1);
        assert_abs_diff_eq!(result.mean_car, 0.11, epsilon = 1e-12);
        assert!(result.t_statistic > 0.0);
    }
}
