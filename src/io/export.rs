//! Export study results to CSV and JSON.
//!
//! - summary CSV: one row per reported category (same columns as the terminal table)
//! - CAAR CSV: AAR/CAAR per category and event-window offset
//! - JSON: the full run (config, per-category results, rejections, warnings)

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::NaiveDate;
use serde::Serialize;

use crate::domain::{StudyConfig, StudyResult, SummaryRow};
use crate::error::AppError;
use crate::report::significance_label;
use crate::study::{RejectionKind, StudyRun};

/// Portable representation of a whole run.
#[derive(Debug, Clone, Serialize)]
pub struct StudyReport {
    pub tool: String,
    pub config: StudyConfig,
    pub min_valid_event_date: NaiveDate,
    pub summary: Vec<SummaryRow>,
    pub categories: Vec<CategoryReport>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryReport {
    pub category: String,
    pub candidate_events: usize,
    pub undated_events: usize,
    pub before_min_date: usize,
    pub rejection_counts: BTreeMap<&'static str, usize>,
    pub rejections: Vec<RejectionReport>,
    pub result: StudyResult,
}

#[derive(Debug, Clone, Serialize)]
pub struct RejectionReport {
    pub event_date: NaiveDate,
    pub kind: RejectionKind,
    pub reason: String,
}

impl StudyReport {
    pub fn from_run(run: &StudyRun) -> Self {
        let categories = run
            .categories
            .iter()
            .map(|c| CategoryReport {
                category: c.category.label().to_string(),
                candidate_events: c.selection.dates.len(),
                undated_events: c.selection.undated,
                before_min_date: c.selection.before_min_date,
                rejection_counts: c
                    .rejection_counts()
                    .into_iter()
                    .map(|(kind, n)| (kind.label(), n))
                    .collect(),
                rejections: c
                    .rejections
                    .iter()
                    .map(|r| RejectionReport {
                        event_date: r.event_date,
                        kind: r.reason.kind(),
                        reason: r.reason.to_string(),
                    })
                    .collect(),
                result: c.result.clone(),
            })
            .collect();

        Self {
            tool: "car".to_string(),
            config: run.config.clone(),
            min_valid_event_date: run.min_valid_event_date,
            summary: run.summary(),
            categories,
            warnings: run.warnings.clone(),
        }
    }
}

/// Write the summary table to a CSV file.
pub fn write_summary_csv(path: &Path, rows: &[SummaryRow], significance_level: f64) -> Result<(), AppError> {
    let mut file = create(path, "summary CSV")?;

    writeln!(
        file,
        "Event Category,Average CAR,t-statistic,p-value,Reject at {}",
        significance_label(significance_level)
    )
    .map_err(|e| AppError::output(format!("Failed to write summary CSV header: {e}")))?;

    for r in rows {
        writeln!(
            file,
            "{},{:.10},{:.10},{:.10},{}",
            r.label,
            r.mean_car,
            r.t_statistic,
            r.p_value,
            if r.reject_null { "Yes" } else { "No" },
        )
        .map_err(|e| AppError::output(format!("Failed to write summary CSV row: {e}")))?;
    }

    file.flush()
        .map_err(|e| AppError::output(format!("Failed to flush summary CSV: {e}")))
}

/// Write AAR/CAAR per category and offset to a CSV file.
pub fn write_caar_csv(path: &Path, run: &StudyRun) -> Result<(), AppError> {
    let mut file = create(path, "CAAR CSV")?;

    writeln!(file, "category,offset,aar,caar")
        .map_err(|e| AppError::output(format!("Failed to write CAAR CSV header: {e}")))?;

    for c in &run.categories {
        for p in &c.result.caar {
            writeln!(file, "{},{},{:.10},{:.10}", c.category.label(), p.offset, p.aar, p.caar)
                .map_err(|e| AppError::output(format!("Failed to write CAAR CSV row: {e}")))?;
        }
    }

    file.flush()
        .map_err(|e| AppError::output(format!("Failed to flush CAAR CSV: {e}")))
}

/// Write the full run as pretty JSON. Undefined statistics are written as `null`.
pub fn write_study_json(path: &Path, run: &StudyRun) -> Result<(), AppError> {
    let mut file = create(path, "study JSON")?;
    serde_json::to_writer_pretty(&mut file, &StudyReport::from_run(run))
        .map_err(|e| AppError::output(format!("Failed to write study JSON: {e}")))?;
    file.flush()
        .map_err(|e| AppError::output(format!("Failed to flush study JSON: {e}")))
}

fn create(path: &Path, what: &str) -> Result<BufWriter<File>, AppError> {
    File::create(path)
        .map(BufWriter::new)
        .map_err(|e| AppError::output(format!("Failed to create {what} '{}': {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CaarPoint, EventCar, SeverityCategory};
    use crate::study::{CategoryStudy, EventSelection};

    fn run() -> StudyRun {
        let date = NaiveDate::from_ymd_opt(2021, 6, 1).unwrap();
        let result = StudyResult {
            event_count: 1,
            mean_car: -0.02,
            car_variance: 0.0001,
            standard_error: 0.01,
            t_statistic: -2.0,
            p_value: 0.0502,
            caar: vec![
                CaarPoint { offset: -1, aar: 0.001, caar: 0.001 },
                CaarPoint { offset: 0, aar: -0.021, caar: -0.02 },
            ],
            cars: vec![EventCar {
                label: "Event_0".to_string(),
                event_date: date,
                car: -0.02,
            }],
        };
        StudyRun {
            config: StudyConfig::default(),
            min_valid_event_date: date,
            categories: vec![CategoryStudy {
                category: SeverityCategory::MinorInjury,
                selection: EventSelection {
                    dates: vec![date],
                    undated: 0,
                    before_min_date: 0,
                },
                rejections: vec![],
                result,
            }],
            warnings: vec!["No valid event data for Major Injury category (no valid events).".to_string()],
        }
    }

    #[test]
    fn summary_csv_has_reject_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.csv");
        let run = run();
        write_summary_csv(&path, &run.summary(), 0.05).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("Event Category,Average CAR,t-statistic,p-value,Reject at 5%")
        );
        let row = lines.next().unwrap();
        assert!(row.starts_with("Minor Injury,-0.0200000000,"));
        assert!(row.ends_with(",No"));
    }

    #[test]
    fn caar_csv_lists_offsets() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("caar.csv");
        write_caar_csv(&path, &run()).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 3);
        assert!(text.contains("Minor Injury,0,-0.0210000000,-0.0200000000"));
    }

    #[test]
    fn json_export_round_trips_through_serde_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("study.json");
        write_study_json(&path, &run()).unwrap();

        let value: serde_json::Value = serde_json::from_reader(File::open(&path).unwrap()).unwrap();
        assert_eq!(value["tool"], "car");
        assert_eq!(value["config"]["estimation_window_length"], 60);
        assert_eq!(value["summary"][0]["label"], "Minor Injury");
        assert_eq!(value["categories"][0]["result"]["cars"][0]["event_date"], "2021-06-01");
        assert_eq!(value["warnings"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn export_to_missing_directory_fails_with_output_code() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("summary.csv");
        let err = write_summary_csv(&path, &[], 0.05).unwrap_err();
        assert_eq!(err.exit_code(), crate::error::EXIT_OUTPUT);
    }
}
