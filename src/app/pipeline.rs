//! Shared "study pipeline" logic used by both `car run` and `car demo`.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! load inputs -> trading calendar -> returns -> per-category studies
//!
//! The commands can then focus on presentation and exports.

use crate::data::SampleData;
use crate::domain::{PriceSeries, StudyConfig};
use crate::error::AppError;
use crate::io::ingest::{EventData, InputPaths, PriceData, StudyInputs, load_inputs};
use crate::study::{StudyContext, StudyRun, run_study};

/// All computed outputs of a single run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub inputs: StudyInputs,
    pub context: StudyContext,
    pub run: StudyRun,
}

/// Load the three CSV files and run the study.
pub fn run_from_files(paths: &InputPaths, config: &StudyConfig) -> Result<RunOutput, AppError> {
    config.validate()?;
    let inputs = load_inputs(paths, config.major_injury_threshold)?;
    run_with_inputs(inputs, config)
}

/// Run the study on synthetic data.
pub fn run_from_sample(sample: SampleData, config: &StudyConfig) -> Result<RunOutput, AppError> {
    let rows = sample.events.len();
    let inputs = StudyInputs {
        market: price_data(sample.market),
        target: price_data(sample.target),
        events: EventData {
            events: sample.events,
            row_errors: Vec::new(),
            rows_read: rows,
        },
    };
    run_with_inputs(inputs, config)
}

/// Run the study on already-loaded inputs.
pub fn run_with_inputs(inputs: StudyInputs, config: &StudyConfig) -> Result<RunOutput, AppError> {
    config.validate()?;
    let context = StudyContext::from_prices(&inputs.market.series, &inputs.target.series)?;
    let run = run_study(&inputs.events.events, &context, config);

    Ok(RunOutput { inputs, context, run })
}

fn price_data(series: PriceSeries) -> PriceData {
    let rows_read = series.len();
    PriceData {
        series,
        row_errors: Vec::new(),
        rows_read,
    }
}
