//! Synthetic market, target and event data.
//!
//! Used by `car demo` and by tests that need realistic-looking inputs without
//! shipping CSV fixtures. Generation is fully determined by the seed.
//!
//! Model:
//! - weekday trading calendar
//! - market returns `m_t ~ N(μ_m, σ_m)`
//! - target returns `α + β·m_t + ε_t`, `ε_t ~ N(0, σ_ε)`
//! - each event adds a per-day shock to the target for `shock_days` trading
//!   days starting at its anchor day (stronger for major events)

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::{EventRecord, InjuryCounts, PriceSeries};
use crate::error::AppError;
use crate::io::ingest::InputPaths;

/// Parameters of the synthetic data set.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleConfig {
    pub seed: u64,
    pub start_date: NaiveDate,
    pub trading_days: usize,
    /// Trading days the market series leads the target series.
    pub target_lag_days: usize,
    pub event_count: usize,
    /// Probability that an event is a major one.
    pub major_share: f64,
    pub market_drift: f64,
    pub market_vol: f64,
    pub alpha: f64,
    pub beta: f64,
    pub idio_vol: f64,
    pub major_shock: f64,
    pub minor_shock: f64,
    pub shock_days: usize,
}

impl Default for SampleConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            start_date: NaiveDate::from_ymd_opt(2015, 1, 2).unwrap_or_default(),
            trading_days: 1500,
            target_lag_days: 20,
            event_count: 40,
            major_share: 0.3,
            market_drift: 0.0003,
            market_vol: 0.01,
            alpha: 0.0001,
            beta: 1.1,
            idio_vol: 0.012,
            major_shock: -0.02,
            minor_shock: -0.001,
            shock_days: 3,
        }
    }
}

/// A generated data set, shaped like the loaded inputs.
#[derive(Debug, Clone)]
pub struct SampleData {
    pub market: PriceSeries,
    pub target: PriceSeries,
    pub events: Vec<EventRecord>,
}

pub fn generate_sample(config: &SampleConfig, major_threshold: u32) -> Result<SampleData, AppError> {
    if config.trading_days < 2 || config.target_lag_days >= config.trading_days {
        return Err(AppError::input("Sample needs at least 2 trading days and a shorter target lag."));
    }
    // Events anchor after the target's first day, so they need at least one later date.
    if config.event_count > 0 && config.trading_days <= config.target_lag_days + 1 {
        return Err(AppError::input(format!(
            "Sample with events needs more than {} trading days (got {}).",
            config.target_lag_days + 1,
            config.trading_days
        )));
    }
    if !(0.0..=1.0).contains(&config.major_share) {
        return Err(AppError::input("Major share must be in [0, 1]."));
    }
    for (name, vol) in [("market", config.market_vol), ("idiosyncratic", config.idio_vol)] {
        if !(vol.is_finite() && vol >= 0.0) {
            return Err(AppError::input(format!("Invalid {name} volatility {vol}; must be finite and >= 0.")));
        }
    }
    let market_noise = Normal::new(config.market_drift, config.market_vol)
        .map_err(|e| AppError::input(format!("Invalid market volatility: {e}")))?;
    let idio_noise = Normal::new(0.0, config.idio_vol)
        .map_err(|e| AppError::input(format!("Invalid idiosyncratic volatility: {e}")))?;

    let mut rng = StdRng::seed_from_u64(config.seed);
    let dates = weekday_calendar(config.start_date, config.trading_days);

    // Draw events first so their shocks can be applied while building prices.
    let first_event_idx = config.target_lag_days + 1;
    let mut events = Vec::with_capacity(config.event_count);
    let mut shocks = vec![0.0; dates.len()];
    for _ in 0..config.event_count {
        let anchor_idx = rng.gen_range(first_event_idx..dates.len());
        let is_major = rng.r#gen::<f64>() < config.major_share;

        let injuries = draw_injuries(&mut rng, is_major, major_threshold);
        let per_day = if is_major { config.major_shock } else { config.minor_shock };
        for k in anchor_idx..(anchor_idx + config.shock_days).min(dates.len()) {
            shocks[k] += per_day;
        }

        let anchor = dates[anchor_idx];
        // Friday incidents are sometimes reported on Saturday; they snap back to Friday.
        let date = if anchor.weekday() == Weekday::Fri && rng.r#gen::<f64>() < 0.5 {
            anchor + Duration::days(1)
        } else {
            anchor
        };
        events.push(EventRecord::new(Some(date), injuries, major_threshold));
    }

    let mut market_points = Vec::with_capacity(dates.len());
    let mut target_points = Vec::with_capacity(dates.len() - config.target_lag_days);
    let mut market_price = 2000.0;
    let mut target_price = 50.0;
    for (i, &date) in dates.iter().enumerate() {
        if i > 0 {
            let m: f64 = market_noise.sample(&mut rng);
            let eps: f64 = idio_noise.sample(&mut rng);
            market_price *= 1.0 + m;
            target_price *= 1.0 + config.alpha + config.beta * m + eps + shocks[i];
        }
        market_points.push((date, market_price));
        if i >= config.target_lag_days {
            target_points.push((date, target_price));
        }
    }

    Ok(SampleData {
        market: PriceSeries::from_points(market_points),
        target: PriceSeries::from_points(target_points),
        events,
    })
}

fn weekday_calendar(start: NaiveDate, n: usize) -> Vec<NaiveDate> {
    start
        .iter_days()
        .filter(|d| !matches!(d.weekday(), Weekday::Sat | Weekday::Sun))
        .take(n)
        .collect()
}

fn draw_injuries(rng: &mut StdRng, is_major: bool, major_threshold: u32) -> InjuryCounts {
    let total = if is_major {
        let low = major_threshold.saturating_add(1);
        rng.gen_range(low..=major_threshold.saturating_mul(3).max(low))
    } else {
        rng.gen_range(0..=major_threshold)
    };
    let fatal = rng.gen_range(0..=total);
    let serious = rng.gen_range(0..=total - fatal);
    InjuryCounts {
        fatal,
        serious,
        minor: total - fatal - serious,
    }
}

/// Write the sample as `market.csv`, `target.csv` and `events.csv` in `dir`.
pub fn write_sample_csvs(dir: &Path, sample: &SampleData) -> Result<InputPaths, AppError> {
    std::fs::create_dir_all(dir)
        .map_err(|e| AppError::output(format!("Failed to create '{}': {e}", dir.display())))?;

    let paths = InputPaths {
        market: dir.join("market.csv"),
        target: dir.join("target.csv"),
        events: dir.join("events.csv"),
        market_column: "Adj Close".to_string(),
        target_column: "Close".to_string(),
    };

    write_lines(&paths.market, "Date,Adj Close", sample.market.iter().map(|(d, p)| format!("{d},{p:.6}")))?;
    write_lines(&paths.target, "Date,Close", sample.target.iter().map(|(d, p)| format!("{d},{p:.6}")))?;
    write_lines(
        &paths.events,
        "EventDate,FatalInjuryCount,SeriousInjuryCount,MinorInjuryCount",
        sample.events.iter().map(|e| {
            let date = e.date.map(|d| d.to_string()).unwrap_or_default();
            format!("{date},{},{},{}", e.injuries.fatal, e.injuries.serious, e.injuries.minor)
        }),
    )?;

    Ok(paths)
}

fn write_lines(path: &Path, header: &str, rows: impl Iterator<Item = String>) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::output(format!("Failed to create '{}': {e}", path.display())))?;
    let mut out = BufWriter::new(file);
    writeln!(out, "{header}").map_err(|e| AppError::output(format!("Failed to write '{}': {e}", path.display())))?;
    for row in rows {
        writeln!(out, "{row}").map_err(|e| AppError::output(format!("Failed to write '{}': {e}", path.display())))?;
    }
    out.flush()
        .map_err(|e| AppError::output(format!("Failed to flush '{}': {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SeverityCategory;

    #[test]
    fn same_seed_same_sample() {
        let config = SampleConfig::default();
        let a = generate_sample(&config, 100).unwrap();
        let b = generate_sample(&config, 100).unwrap();
        assert_eq!(a.market, b.market);
        assert_eq!(a.target, b.target);
        assert_eq!(a.events, b.events);

        let other = generate_sample(&SampleConfig { seed: 7, ..config }, 100).unwrap();
        assert_ne!(a.target, other.target);
    }

    #[test]
    fn sample_shapes_match_config() {
        let config = SampleConfig::default();
        let sample = generate_sample(&config, 100).unwrap();

        assert_eq!(sample.market.len(), config.trading_days);
        assert_eq!(sample.target.len(), config.trading_days - config.target_lag_days);
        assert!(sample.target.first_date() > sample.market.first_date());
        assert_eq!(sample.events.len(), config.event_count);
        assert!(sample.market.dates().all(|d| !matches!(d.weekday(), Weekday::Sat | Weekday::Sun)));
        assert!(sample.market.iter().all(|(_, p)| p > 0.0));
    }

    #[test]
    fn injury_counts_match_category() {
        let sample = generate_sample(&SampleConfig::default(), 100).unwrap();
        for e in &sample.events {
            match e.category {
                SeverityCategory::MajorInjury => assert!(e.total_injuries > 100),
                SeverityCategory::MinorInjury => assert!(e.total_injuries <= 100),
            }
        }
        assert!(sample.events.iter().any(|e| e.category == SeverityCategory::MajorInjury));
        assert!(sample.events.iter().any(|e| e.category == SeverityCategory::MinorInjury));
    }

    #[test]
    fn invalid_sample_config_is_rejected() {
        let bad = SampleConfig {
            trading_days: 10,
            target_lag_days: 10,
            ..SampleConfig::default()
        };
        assert!(generate_sample(&bad, 100).is_err());

        let bad_vol = SampleConfig {
            market_vol: -1.0,
            ..SampleConfig::default()
        };
        let err = generate_sample(&bad_vol, 100).unwrap_err();
        assert_eq!(err.exit_code(), crate::error::EXIT_INPUT);

        let nan_idio = SampleConfig {
            idio_vol: f64::NAN,
            ..SampleConfig::default()
        };
        assert!(generate_sample(&nan_idio, 100).is_err());
    }

    #[test]
    fn too_few_days_for_events_is_an_error() {
        let tight = SampleConfig {
            trading_days: 21,
            target_lag_days: 20,
            ..SampleConfig::default()
        };
        let err = generate_sample(&tight, 100).unwrap_err();
        assert_eq!(err.exit_code(), crate::error::EXIT_INPUT);

        // Without events the same calendar is fine.
        let no_events = SampleConfig { event_count: 0, ..tight.clone() };
        let sample = generate_sample(&no_events, 100).unwrap();
        assert_eq!(sample.target.len(), 1);
        assert!(sample.events.is_empty());

        let one_spare_day = SampleConfig { trading_days: 22, ..tight };
        assert!(generate_sample(&one_spare_day, 100).is_ok());
    }
}
