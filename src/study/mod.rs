//! Event study core.
//!
//! Responsibilities:
//!
//! - derive the trading calendar from the market series (`calendar`)
//! - place each event's estimation and event windows (`window`)
//! - fit the market model and compute abnormal returns per event (`estimator`)
//! - aggregate abnormal returns into AAR/CAAR/CAR and a t-test (`aggregate`)
//! - run one study per severity category (`driver`)

use chrono::{Duration, NaiveDate};

use crate::domain::{PriceSeries, ReturnSeries, StudyConfig};
use crate::error::AppError;

pub mod aggregate;
pub mod calendar;
pub mod driver;
pub mod estimator;
pub mod window;

pub use aggregate::*;
pub use calendar::*;
pub use driver::*;
pub use estimator::*;
pub use window::*;

/// Read-only inputs shared by every event of a run.
///
/// Built once, after loading and before any category study.
#[derive(Debug, Clone, PartialEq)]
pub struct StudyContext {
    pub calendar: TradingCalendar,
    pub market_returns: ReturnSeries,
    pub target_returns: ReturnSeries,
    /// First date with a target-security price.
    pub target_start: NaiveDate,
}

impl StudyContext {
    pub fn from_prices(market: &PriceSeries, target: &PriceSeries) -> Result<Self, AppError> {
        let target_start = target
            .first_date()
            .ok_or_else(|| AppError::no_data("Target price series is empty."))?;
        Ok(Self::from_parts(market, market.returns(), target.returns(), target_start))
    }

    pub fn from_parts(
        market_prices: &PriceSeries,
        market_returns: ReturnSeries,
        target_returns: ReturnSeries,
        target_start: NaiveDate,
    ) -> Self {
        Self {
            calendar: TradingCalendar::from_prices(market_prices),
            market_returns,
            target_returns,
            target_start,
        }
    }

    /// Earliest event date admitted to a study.
    ///
    /// Measured in calendar days from the first target price, so it is a
    /// coarse pre-filter; the locator still enforces the trading-day history.
    pub fn min_valid_event_date(&self, config: &StudyConfig) -> NaiveDate {
        self.target_start + Duration::days(config.estimation_window_length as i64)
    }
}
