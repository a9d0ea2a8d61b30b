//! Per-event abnormal return estimation.
//!
//! Pipeline for one event:
//!
//! 1. locate the estimation and event windows
//! 2. gather (market, target) return pairs on the estimation window
//! 3. fit the market model by OLS
//! 4. predict target returns over the event window
//! 5. abnormal return = observed - predicted
//!
//! Each stage either hands its output to the next or returns a `Rejection`;
//! nothing is shared between events.

use chrono::NaiveDate;
use thiserror::Error;

use crate::domain::{AbnormalReturn, AbnormalReturnVector, ReturnSeries, StudyConfig};
use crate::math::{LinearFit, fit_market_model};
use crate::study::StudyContext;
use crate::study::window::{AlignmentFailure, locate};

/// Why an event was excluded from its category's study.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Rejection {
    #[error("alignment failed: {0}")]
    Alignment(#[from] AlignmentFailure),
    #[error("estimation window has {observed} paired returns, at least {required:.1} required")]
    DataSparsity { observed: usize, required: f64 },
    #[error("no paired market/target return on event-window date {date}")]
    MissingEventData { date: NaiveDate },
    #[error("market model fit failed: {reason}")]
    Regression { reason: String },
}

impl Rejection {
    /// Short stable name used for tallies and reports.
    pub fn kind(&self) -> RejectionKind {
        match self {
            Rejection::Alignment(_) => RejectionKind::Alignment,
            Rejection::DataSparsity { .. } => RejectionKind::DataSparsity,
            Rejection::MissingEventData { .. } => RejectionKind::MissingEventData,
            Rejection::Regression { .. } => RejectionKind::Regression,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
pub enum RejectionKind {
    Alignment,
    DataSparsity,
    MissingEventData,
    Regression,
}

impl RejectionKind {
    pub const ALL: [RejectionKind; 4] = [
        RejectionKind::Alignment,
        RejectionKind::DataSparsity,
        RejectionKind::MissingEventData,
        RejectionKind::Regression,
    ];

    pub fn label(self) -> &'static str {
        match self {
            RejectionKind::Alignment => "alignment",
            RejectionKind::DataSparsity => "data sparsity",
            RejectionKind::MissingEventData => "missing event data",
            RejectionKind::Regression => "regression",
        }
    }
}

/// Estimate abnormal returns for a single event.
pub fn estimate(
    event_date: NaiveDate,
    ctx: &StudyContext,
    config: &StudyConfig,
) -> Result<AbnormalReturnVector, Rejection> {
    let window = locate(event_date, &ctx.calendar, config)?;

    let (market_est, target_est) = paired_returns(&window.estimation_window, &ctx.market_returns, &ctx.target_returns);
    let required = config.min_estimation_observations();
    if (market_est.len() as f64) < required {
        return Err(Rejection::DataSparsity {
            observed: market_est.len(),
            required,
        });
    }

    let fit = fit_market_model(&market_est, &target_est).ok_or_else(|| Rejection::Regression {
        reason: "design matrix is rank deficient".to_string(),
    })?;

    let returns = abnormal_returns(&window.event_window, &fit, ctx)?;

    Ok(AbnormalReturnVector {
        event_date,
        anchor_day: window.anchor_day,
        alpha: fit.alpha,
        beta: fit.beta,
        returns,
    })
}

/// Return pairs on `dates` where both series have an observation.
fn paired_returns(dates: &[NaiveDate], market: &ReturnSeries, target: &ReturnSeries) -> (Vec<f64>, Vec<f64>) {
    dates
        .iter()
        .filter_map(|&d| Some((market.get(d)?, target.get(d)?)))
        .unzip()
}

fn abnormal_returns(
    event_window: &[NaiveDate],
    fit: &LinearFit,
    ctx: &StudyContext,
) -> Result<Vec<AbnormalReturn>, Rejection> {
    event_window
        .iter()
        .enumerate()
        .map(|(k, &date)| {
            let (Some(market), Some(target)) = (ctx.market_returns.get(date), ctx.target_returns.get(date)) else {
                return Err(Rejection::MissingEventData { date });
            };
            let value = target - fit.predict(market);
            if !value.is_finite() {
                return Err(Rejection::Regression {
                    reason: format!("non-finite prediction on {date}"),
                });
            }
            Ok(AbnormalReturn {
                date,
                offset: k as i32 - 1,
                value,
            })
        })
        .collect()
}
