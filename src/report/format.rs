//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the study code stays clean and testable
//! - output changes are localized (important for snapshot-style tests)

use crate::domain::{StudyConfig, SummaryRow};
use crate::io::ingest::StudyInputs;
use crate::study::{CategoryStudy, RejectionKind, StudyRun};

/// `0.05` -> `"5%"`.
pub fn significance_label(level: f64) -> String {
    let pct = (level * 10_000.0).round() / 100.0;
    format!("{pct}%")
}

/// Format the run header: inputs actually used and the study settings.
pub fn format_run_header(inputs: &StudyInputs, run: &StudyRun) -> String {
    let mut out = String::new();

    out.push_str("=== car - Event Study (market model) ===\n");
    out.push_str(&format_series_line("Market", &inputs.market));
    out.push_str(&format_series_line("Target", &inputs.target));
    out.push_str(&format!(
        "Events: rows={} | used={} | undated={} | skipped={}\n",
        inputs.events.rows_read,
        inputs.events.events.len(),
        inputs.events.undated(),
        inputs.events.row_errors.len(),
    ));
    out.push_str(&format_config_line(&run.config));
    out.push_str(&format!("Earliest eligible event date: {}\n", run.min_valid_event_date));
    out.push('\n');

    out
}

fn format_series_line(name: &str, data: &crate::io::ingest::PriceData) -> String {
    let range = match (data.series.first_date(), data.series.last_date()) {
        (Some(a), Some(b)) => format!("{a}..{b}"),
        _ => "-".to_string(),
    };
    format!(
        "{name}: n={} | range={range} | skipped={}\n",
        data.series.len(),
        data.row_errors.len()
    )
}

fn format_config_line(config: &StudyConfig) -> String {
    format!(
        "Windows: estimation={}d | event=[-1, {:+}] | major>{} injuries | coverage>={:.0}%\n",
        config.estimation_window_length,
        config.event_window_length as i64 - 1,
        config.major_injury_threshold,
        config.min_coverage * 100.0,
    )
}

/// Format the summary table, one row per reported category.
pub fn format_summary_table(rows: &[SummaryRow], significance_level: f64) -> String {
    let reject_header = format!("Reject at {}", significance_label(significance_level));

    let mut out = String::new();
    out.push_str(
        format!(
            "{:<16} {:>12} {:>12} {:>10} {:<12}\n",
            "Event Category", "Average CAR", "t-statistic", "p-value", reject_header
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(format!("{:-<16} {:-<12} {:-<12} {:-<10} {:-<12}\n", "", "", "", "", "").trim_end());
    out.push('\n');

    for r in rows {
        out.push_str(
            format!(
                "{:<16} {:>12} {:>12} {:>10} {:<12}\n",
                r.label,
                fmt_stat(r.mean_car, 6),
                fmt_stat(r.t_statistic, 4),
                fmt_stat(r.p_value, 4),
                if r.reject_null { "Yes" } else { "No" },
            )
            .trim_end(),
        );
        out.push('\n');
    }

    out
}

/// Format CAAR, the per-event CARs and rejection tallies for one category.
pub fn format_category_details(study: &CategoryStudy) -> String {
    let mut out = String::new();
    let result = &study.result;

    out.push_str(&format!(
        "{} (events={}, candidates={}, before cutoff={}, undated={})\n",
        study.category,
        result.event_count,
        study.selection.dates.len(),
        study.selection.before_min_date,
        study.selection.undated,
    ));
    out.push_str(&format!(
        "  mean CAR={} | SE={} | t={} | p={}\n",
        fmt_stat(result.mean_car, 6),
        fmt_stat(result.standard_error, 6),
        fmt_stat(result.t_statistic, 4),
        fmt_stat(result.p_value, 4),
    ));

    let counts = study.rejection_counts();
    if !counts.is_empty() {
        let parts: Vec<String> = RejectionKind::ALL
            .iter()
            .filter_map(|k| counts.get(k).map(|n| format!("{}={n}", k.label())))
            .collect();
        out.push_str(&format!("  rejected: {}\n", parts.join(", ")));
    }

    out.push_str(&format!("  {:>6} {:>12} {:>12}\n", "offset", "AAR", "CAAR"));
    for p in &result.caar {
        out.push_str(&format!(
            "  {:>6} {:>12} {:>12}\n",
            format!("{:+}", p.offset),
            fmt_stat(p.aar, 6),
            fmt_stat(p.caar, 6)
        ));
    }

    out.push_str("  CARs:\n");
    for c in &result.cars {
        out.push_str(&format!("    {:<10} {} {:>12}\n", c.label, c.event_date, fmt_stat(c.car, 6)));
    }

    out
}

/// Format warnings (e.g. empty categories), or nothing if there are none.
pub fn format_warnings(warnings: &[String]) -> String {
    let mut out = String::new();
    for w in warnings {
        out.push_str(&format!("Warning: {w}\n"));
    }
    out
}

fn fmt_stat(v: f64, decimals: usize) -> String {
    if v.is_nan() {
        "NaN".to_string()
    } else {
        format!("{v:.decimals$}")
    }
}
