//! Shared domain types.
//!
//! Inputs (`PriceSeries`, `EventRecord`) are immutable once loaded. Outputs
//! (`StudyResult`, `SummaryRow`) are serializable so they can be exported to
//! JSON/CSV unchanged.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Date-indexed price observations for one instrument.
///
/// Backed by a `BTreeMap`, so iteration is always chronological and each date
/// appears at most once.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceSeries {
    points: BTreeMap<NaiveDate, f64>,
}

impl PriceSeries {
    pub fn new(points: BTreeMap<NaiveDate, f64>) -> Self {
        Self { points }
    }

    pub fn from_points(points: impl IntoIterator<Item = (NaiveDate, f64)>) -> Self {
        Self {
            points: points.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn get(&self, date: NaiveDate) -> Option<f64> {
        self.points.get(&date).copied()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.keys().next().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.keys().next_back().copied()
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.points.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.points.iter().map(|(d, p)| (*d, *p))
    }

    /// Simple returns between consecutive available dates.
    ///
    /// The first date has no return. Gaps in the series are not filled: the
    /// return on a date is always relative to the previous observation.
    pub fn returns(&self) -> ReturnSeries {
        let mut out = BTreeMap::new();
        let mut prev: Option<f64> = None;
        for (date, price) in self.iter() {
            if let Some(p0) = prev {
                out.insert(date, price / p0 - 1.0);
            }
            prev = Some(price);
        }
        ReturnSeries { points: out }
    }
}

/// Date-indexed simple returns derived from a `PriceSeries`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReturnSeries {
    points: BTreeMap<NaiveDate, f64>,
}

impl ReturnSeries {
    pub fn from_points(points: impl IntoIterator<Item = (NaiveDate, f64)>) -> Self {
        Self {
            points: points.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn get(&self, date: NaiveDate) -> Option<f64> {
        self.points.get(&date).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.points.iter().map(|(d, r)| (*d, *r))
    }
}

/// Injury counts reported for a single incident.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InjuryCounts {
    pub fatal: u32,
    pub serious: u32,
    pub minor: u32,
}

impl InjuryCounts {
    pub fn total(&self) -> u32 {
        self.fatal
            .saturating_add(self.serious)
            .saturating_add(self.minor)
    }
}

/// Severity bucket an event is studied under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SeverityCategory {
    MajorInjury,
    MinorInjury,
}

impl SeverityCategory {
    /// Categories in the order the driver studies and reports them.
    pub const ALL: [SeverityCategory; 2] = [SeverityCategory::MajorInjury, SeverityCategory::MinorInjury];

    /// `total > threshold` is major; everything else (including zero) is minor.
    pub fn classify(total_injuries: u32, major_threshold: u32) -> Self {
        if total_injuries > major_threshold {
            SeverityCategory::MajorInjury
        } else {
            SeverityCategory::MinorInjury
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SeverityCategory::MajorInjury => "Major Injury",
            SeverityCategory::MinorInjury => "Minor Injury",
        }
    }
}

impl std::fmt::Display for SeverityCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One dated incident with its derived severity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    /// `None` when the raw date could not be parsed; such events are dropped
    /// by the driver rather than at load time.
    pub date: Option<NaiveDate>,
    pub injuries: InjuryCounts,
    pub total_injuries: u32,
    pub category: SeverityCategory,
}

impl EventRecord {
    pub fn new(date: Option<NaiveDate>, injuries: InjuryCounts, major_threshold: u32) -> Self {
        let total_injuries = injuries.total();
        Self {
            date,
            injuries,
            total_injuries,
            category: SeverityCategory::classify(total_injuries, major_threshold),
        }
    }
}

/// Window lengths and thresholds for one study run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyConfig {
    /// Trading days of history used to fit the market model (M).
    pub estimation_window_length: usize,
    /// Trading days accumulated after the pre-anchor day (L2).
    pub event_window_length: usize,
    /// Events with more total injuries than this are `MajorInjury`.
    pub major_injury_threshold: u32,
    /// Minimum share of estimation dates that must carry both returns.
    pub min_coverage: f64,
    /// Two-tailed significance level for the reject decision.
    pub significance_level: f64,
}

impl Default for StudyConfig {
    fn default() -> Self {
        Self {
            estimation_window_length: 60,
            event_window_length: 10,
            major_injury_threshold: 100,
            min_coverage: 0.9,
            significance_level: 0.05,
        }
    }
}

impl StudyConfig {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.estimation_window_length < 3 {
            return Err(AppError::input(format!(
                "Estimation window must be at least 3 trading days (got {}).",
                self.estimation_window_length
            )));
        }
        if !(self.min_coverage.is_finite() && self.min_coverage > 0.0 && self.min_coverage <= 1.0) {
            return Err(AppError::input(format!(
                "Minimum coverage must be in (0, 1] (got {}).",
                self.min_coverage
            )));
        }
        if !(self.significance_level.is_finite() && self.significance_level > 0.0 && self.significance_level < 1.0) {
            return Err(AppError::input(format!(
                "Significance level must be in (0, 1) (got {}).",
                self.significance_level
            )));
        }
        Ok(())
    }

    /// Number of dates in every event window.
    pub fn event_window_size(&self) -> usize {
        self.event_window_length.saturating_add(1)
    }

    /// Degrees of freedom of the market-model residuals, `M - 2`.
    pub fn degrees_of_freedom(&self) -> usize {
        self.estimation_window_length.saturating_sub(2)
    }

    /// Estimation observations below this count reject the event.
    pub fn min_estimation_observations(&self) -> f64 {
        self.estimation_window_length as f64 * self.min_coverage
    }
}

/// Estimation and event windows for one event, on the trading calendar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventWindowSpec {
    pub estimation_window: Vec<NaiveDate>,
    pub pre_anchor_day: NaiveDate,
    pub anchor_day: NaiveDate,
    /// Starts at the pre-anchor day (offset -1).
    pub event_window: Vec<NaiveDate>,
}

/// Abnormal return on one event-window date.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AbnormalReturn {
    pub date: NaiveDate,
    /// Trading days relative to the anchor day (-1 is the pre-anchor day).
    pub offset: i32,
    pub value: f64,
}

/// Abnormal returns for one event, aligned to its event window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AbnormalReturnVector {
    pub event_date: NaiveDate,
    pub anchor_day: NaiveDate,
    pub alpha: f64,
    pub beta: f64,
    pub returns: Vec<AbnormalReturn>,
}

impl AbnormalReturnVector {
    pub fn len(&self) -> usize {
        self.returns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.returns.is_empty()
    }

    /// Cumulative abnormal return over the whole window.
    pub fn car(&self) -> f64 {
        self.returns.iter().map(|r| r.value).sum()
    }

    pub fn sum_of_squares(&self) -> f64 {
        self.returns.iter().map(|r| r.value * r.value).sum()
    }
}

/// Cross-sectional average at one event-window offset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CaarPoint {
    pub offset: i32,
    pub aar: f64,
    pub caar: f64,
}

/// CAR of one event within a category study.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventCar {
    /// Stable column label (`Event_0`, `Event_1`, ...) in chronological order.
    pub label: String,
    pub event_date: NaiveDate,
    pub car: f64,
}

/// Aggregated result for one severity category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudyResult {
    pub event_count: usize,
    pub mean_car: f64,
    pub car_variance: f64,
    pub standard_error: f64,
    /// NaN when the standard error is zero.
    pub t_statistic: f64,
    /// NaN when the t-statistic is undefined.
    pub p_value: f64,
    pub caar: Vec<CaarPoint>,
    pub cars: Vec<EventCar>,
}

impl StudyResult {
    pub fn car_values(&self) -> Vec<f64> {
        self.cars.iter().map(|c| c.car).collect()
    }
}

/// One line of the final summary table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    pub category: SeverityCategory,
    pub label: String,
    pub mean_car: f64,
    pub t_statistic: f64,
    pub p_value: f64,
    pub reject_null: bool,
}

impl SummaryRow {
    pub fn from_result(category: SeverityCategory, result: &StudyResult, significance_level: f64) -> Self {
        Self {
            category,
            label: category.label().to_string(),
            mean_car: result.mean_car,
            t_statistic: result.t_statistic,
            p_value: result.p_value,
            // NaN compares false, so undefined p-values never reject.
            reject_null: result.p_value < significance_level,
        }
    }
}
