//! Study driver: one event study per severity category.
//!
//! Per category:
//! - keep events of that category with a resolvable date
//! - deduplicate and sort the dates
//! - drop dates before the earliest date a full estimation window can exist
//! - estimate each event (in parallel; order is preserved)
//! - aggregate the survivors
//!
//! Per-event rejections are tallied, never surfaced as errors. A category with
//! no survivors is reported as a warning and left out of the summary.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::domain::{EventRecord, SeverityCategory, StudyConfig, StudyResult, SummaryRow};
use crate::study::StudyContext;
use crate::study::aggregate::{AggregateError, aggregate};
use crate::study::estimator::{Rejection, RejectionKind, estimate};

/// An event that was dropped during estimation, with the reason.
#[derive(Debug, Clone, PartialEq)]
pub struct EventRejection {
    pub event_date: NaiveDate,
    pub reason: Rejection,
}

/// Dates selected for one category before estimation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventSelection {
    pub dates: Vec<NaiveDate>,
    pub undated: usize,
    pub before_min_date: usize,
}

/// Outcome for a category that produced a result.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryStudy {
    pub category: SeverityCategory,
    pub selection: EventSelection,
    pub rejections: Vec<EventRejection>,
    pub result: StudyResult,
}

impl CategoryStudy {
    pub fn rejection_counts(&self) -> BTreeMap<RejectionKind, usize> {
        rejection_counts(&self.rejections)
    }
}

/// Outcome of a whole run across categories.
#[derive(Debug, Clone, PartialEq)]
pub struct StudyRun {
    pub config: StudyConfig,
    pub min_valid_event_date: NaiveDate,
    pub categories: Vec<CategoryStudy>,
    pub warnings: Vec<String>,
}

impl StudyRun {
    pub fn summary(&self) -> Vec<SummaryRow> {
        self.categories
            .iter()
            .map(|c| SummaryRow::from_result(c.category, &c.result, self.config.significance_level))
            .collect()
    }

    pub fn category(&self, category: SeverityCategory) -> Option<&CategoryStudy> {
        self.categories.iter().find(|c| c.category == category)
    }
}

pub fn rejection_counts(rejections: &[EventRejection]) -> BTreeMap<RejectionKind, usize> {
    let mut counts = BTreeMap::new();
    for r in rejections {
        *counts.entry(r.reason.kind()).or_insert(0) += 1;
    }
    counts
}

/// Pick the unique, sorted, eligible event dates of one category.
pub fn select_event_dates(
    events: &[EventRecord],
    category: SeverityCategory,
    min_valid_event_date: NaiveDate,
) -> EventSelection {
    let mut undated = 0usize;
    let mut dates: Vec<NaiveDate> = events
        .iter()
        .filter(|e| e.category == category)
        .filter_map(|e| {
            if e.date.is_none() {
                undated += 1;
            }
            e.date
        })
        .collect();
    dates.sort_unstable();
    dates.dedup();

    let total = dates.len();
    dates.retain(|d| *d >= min_valid_event_date);

    EventSelection {
        before_min_date: total - dates.len(),
        dates,
        undated,
    }
}

/// Run the study for a single category.
///
/// Returns the rejections alongside the aggregation outcome so an empty
/// category can still explain why its events were dropped.
pub fn run_category(
    category: SeverityCategory,
    events: &[EventRecord],
    ctx: &StudyContext,
    config: &StudyConfig,
) -> (EventSelection, Vec<EventRejection>, Result<StudyResult, AggregateError>) {
    let selection = select_event_dates(events, category, ctx.min_valid_event_date(config));

    let outcomes: Vec<(NaiveDate, Result<_, Rejection>)> = selection
        .dates
        .par_iter()
        .map(|&date| (date, estimate(date, ctx, config)))
        .collect();

    let mut vectors = Vec::with_capacity(outcomes.len());
    let mut rejections = Vec::new();
    for (event_date, outcome) in outcomes {
        match outcome {
            Ok(v) => vectors.push(v),
            Err(reason) => {
                debug!(%category, %event_date, %reason, "event excluded");
                rejections.push(EventRejection { event_date, reason });
            }
        }
    }

    let result = aggregate(&vectors, config);
    (selection, rejections, result)
}

/// Run every severity category and collect the non-empty results.
pub fn run_study(events: &[EventRecord], ctx: &StudyContext, config: &StudyConfig) -> StudyRun {
    let mut categories = Vec::new();
    let mut warnings = Vec::new();

    for category in SeverityCategory::ALL {
        let (selection, rejections, result) = run_category(category, events, ctx, config);
        match result {
            Ok(result) => {
                info!(
                    %category,
                    events = result.event_count,
                    rejected = rejections.len(),
                    mean_car = result.mean_car,
                    t = result.t_statistic,
                    p = result.p_value,
                    "category study complete"
                );
                categories.push(CategoryStudy {
                    category,
                    selection,
                    rejections,
                    result,
                });
            }
            Err(err) => {
                let message = format!(
                    "No valid event data for {category} category ({err}; {} candidate dates, {} rejected).",
                    selection.dates.len(),
                    rejections.len()
                );
                warn!("{message}");
                warnings.push(message);
            }
        }
    }

    StudyRun {
        config: config.clone(),
        min_valid_event_date: ctx.min_valid_event_date(config),
        categories,
        warnings,
    }
}
